// 7.0 config.rs: the one value object that separates chain deployments.
// fee caps, leverage cap, funding cadence, liquidation fee. logic is shared, numbers differ.
// 7.1 ChainProfile presets. 7.2 validate() enforces the hard caps.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{AccountId, Bps};

pub const MAX_TRADING_FEE_BPS: u16 = 500; // 5%
pub const MAX_LIQUIDATION_FEE_BPS: u16 = 1_000; // 10%
pub const LEVERAGE_CEILING: u16 = 100;
pub const MAX_QUOTE_DECIMALS: u32 = 18;

const ONE_HOUR_MS: i64 = 3_600_000;

/** funding cadence and rate shaping */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingParams {
    // minimum spacing between two index updates on one market
    pub interval_ms: i64,
    // rate per interval per unit of (max/min OI ratio - 1), as a fraction of notional
    pub rate_factor: Decimal,
    // index units per unit of quote per unit of size
    pub index_scale: Decimal,
    // cap on |rate| in index units per interval. None = uncapped
    pub max_rate: Option<Decimal>,
}

impl Default for FundingParams {
    fn default() -> Self {
        Self {
            interval_ms: ONE_HOUR_MS,
            rate_factor: dec!(0.0001),
            index_scale: dec!(1_000_000),
            max_rate: None,
        }
    }
}

// what happens to equity left over after the liquidator is paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidationRemainder {
    // protocol keeps it
    #[default]
    Retain,
    // whatever equity is left after the liquidator fee goes back to the trader
    RefundTrader,
}

/** 7.1: per-chain economics. everything a deployment is allowed to differ on */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub name: String,
    // fee charged on size at close
    pub trading_fee_bps: u16,
    // liquidator reward as a share of the position's margin
    pub liquidation_fee_bps: u16,
    // upper bound for any market's max_leverage on this chain
    pub max_leverage: u16,
    // precision of the collateral token. amounts truncate here
    pub quote_decimals: u32,
    // receives trading fees
    pub fee_collector: AccountId,
    pub funding: FundingParams,
    pub liquidation_remainder: LiquidationRemainder,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            trading_fee_bps: 10,      // 0.1%
            liquidation_fee_bps: 300, // 3%
            max_leverage: LEVERAGE_CEILING,
            quote_decimals: 6,
            fee_collector: AccountId(0),
            funding: FundingParams::default(),
            liquidation_remainder: LiquidationRemainder::Retain,
        }
    }
}

impl ChainConfig {
    pub fn trading_fee(&self) -> Bps {
        Bps::new(self.trading_fee_bps)
    }

    pub fn liquidation_fee(&self) -> Bps {
        Bps::new(self.liquidation_fee_bps)
    }

    pub fn with_fee_collector(mut self, collector: AccountId) -> Self {
        self.fee_collector = collector;
        self
    }

    // 7.2: hard caps. a deployment outside these never gets a ledger
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trading_fee_bps > MAX_TRADING_FEE_BPS {
            return Err(ConfigError::TradingFeeTooHigh {
                bps: self.trading_fee_bps,
                max: MAX_TRADING_FEE_BPS,
            });
        }

        if self.liquidation_fee_bps > MAX_LIQUIDATION_FEE_BPS {
            return Err(ConfigError::LiquidationFeeTooHigh {
                bps: self.liquidation_fee_bps,
                max: MAX_LIQUIDATION_FEE_BPS,
            });
        }

        if self.max_leverage == 0 || self.max_leverage > LEVERAGE_CEILING {
            return Err(ConfigError::InvalidLeverageCap(self.max_leverage));
        }

        if self.quote_decimals > MAX_QUOTE_DECIMALS {
            return Err(ConfigError::InvalidPrecision(self.quote_decimals));
        }

        if self.funding.interval_ms <= 0 {
            return Err(ConfigError::InvalidFunding {
                reason: "interval must be positive".to_string(),
            });
        }

        if self.funding.index_scale <= Decimal::ZERO {
            return Err(ConfigError::InvalidFunding {
                reason: "index scale must be positive".to_string(),
            });
        }

        if self.funding.rate_factor < Decimal::ZERO {
            return Err(ConfigError::InvalidFunding {
                reason: "rate factor cannot be negative".to_string(),
            });
        }

        if matches!(self.funding.max_rate, Some(cap) if cap < Decimal::ZERO) {
            return Err(ConfigError::InvalidFunding {
                reason: "max rate cannot be negative".to_string(),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Trading fee {bps}bps exceeds cap of {max}bps")]
    TradingFeeTooHigh { bps: u16, max: u16 },

    #[error("Liquidation fee {bps}bps exceeds cap of {max}bps")]
    LiquidationFeeTooHigh { bps: u16, max: u16 },

    #[error("Leverage cap {0} outside 1..=100")]
    InvalidLeverageCap(u16),

    #[error("Quote precision {0} exceeds 18 decimals")]
    InvalidPrecision(u32),

    #[error("Invalid funding params: {reason}")]
    InvalidFunding { reason: String },
}

// the four chains the venue ships on. same engine, different numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainProfile {
    Solana,
    Ethereum,
    Arbitrum,
    Bnb,
}

impl ChainProfile {
    pub fn config(&self) -> ChainConfig {
        match self {
            ChainProfile::Solana => ChainConfig {
                name: "solana".to_string(),
                ..ChainConfig::default()
            },
            // fewer, larger trades on mainnet: lower leverage cap, slower funding
            ChainProfile::Ethereum => ChainConfig {
                name: "ethereum".to_string(),
                trading_fee_bps: 8,
                liquidation_fee_bps: 500,
                max_leverage: 50,
                funding: FundingParams {
                    interval_ms: 8 * ONE_HOUR_MS,
                    rate_factor: dec!(0.0008),
                    ..FundingParams::default()
                },
                ..ChainConfig::default()
            },
            ChainProfile::Arbitrum => ChainConfig {
                name: "arbitrum".to_string(),
                trading_fee_bps: 6,
                liquidation_fee_bps: 400,
                ..ChainConfig::default()
            },
            ChainProfile::Bnb => ChainConfig {
                name: "bnb".to_string(),
                trading_fee_bps: 5,
                liquidation_fee_bps: 300,
                quote_decimals: 18,
                funding: FundingParams {
                    max_rate: Some(dec!(10_000)), // 1% of notional per interval
                    ..FundingParams::default()
                },
                ..ChainConfig::default()
            },
        }
    }
}

/// Engine-local knobs that are not part of a deployment's economics.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
    /// Log every emitted event at info level.
    pub verbose: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
            verbose: false,
        }
    }
}
