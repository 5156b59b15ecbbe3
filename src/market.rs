//! Market configuration and state.
//!
//! A market is one tradable contract: its oracle, its admission rules for new positions,
//! and the aggregates the ledger and funding engine keep on it.

use crate::config::LEVERAGE_CEILING;
use crate::types::{Bps, Direction, MarketId, OracleRef, Quote, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Parameters for a new market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMarket {
    pub oracle: OracleRef,
    /// Smallest margin a position may open with
    pub min_collateral: Quote,
    /// Integer leverage cap, 1..=100
    pub max_leverage: u16,
    /// Maintenance margin in bps of size, strictly between 0 and 10000
    pub maintenance_margin_bps: u16,
}

/// Partial update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketUpdate {
    pub oracle: Option<OracleRef>,
    pub min_collateral: Option<Quote>,
    pub max_leverage: Option<u16>,
    pub maintenance_margin_bps: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: MarketId,
    pub oracle: OracleRef,
    pub min_collateral: Quote,
    pub max_leverage: u16,
    pub maintenance_margin_bps: u16,
    pub is_active: bool,
    /// Aggregate notional size of open longs
    pub open_interest_long: Decimal,
    /// Aggregate notional size of open shorts
    pub open_interest_short: Decimal,
    /// Signed, in index units. Only the funding engine moves it.
    pub cumulative_funding_index: Decimal,
    pub last_funding_time: Timestamp,
    pub created_at: Timestamp,
}

impl Market {
    pub(crate) fn new(id: MarketId, params: NewMarket, now: Timestamp) -> Self {
        Self {
            id,
            oracle: params.oracle,
            min_collateral: params.min_collateral,
            max_leverage: params.max_leverage,
            maintenance_margin_bps: params.maintenance_margin_bps,
            is_active: true,
            open_interest_long: Decimal::ZERO,
            open_interest_short: Decimal::ZERO,
            cumulative_funding_index: Decimal::ZERO,
            last_funding_time: now,
            created_at: now,
        }
    }

    pub fn maintenance_margin(&self) -> Bps {
        Bps::new(self.maintenance_margin_bps)
    }

    pub fn total_open_interest(&self) -> Decimal {
        self.open_interest_long.saturating_add(self.open_interest_short)
    }

    pub fn net_open_interest(&self) -> Decimal {
        self.open_interest_long.saturating_sub(self.open_interest_short)
    }

    pub fn open_interest(&self, direction: Direction) -> Decimal {
        match direction {
            Direction::Long => self.open_interest_long,
            Direction::Short => self.open_interest_short,
        }
    }

    pub fn accepts_leverage(&self, leverage: u16) -> bool {
        leverage >= 1 && leverage <= self.max_leverage
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarketError {
    #[error("Market {0:?} already exists")]
    AlreadyExists(MarketId),

    #[error("Market {0:?} not found")]
    NotFound(MarketId),

    #[error("Oracle reference is empty")]
    MissingOracle,

    #[error("Max leverage {leverage} outside 1..={cap}")]
    InvalidMaxLeverage { leverage: u16, cap: u16 },

    #[error("Maintenance margin {0}bps outside (0, 10000)")]
    InvalidMaintenanceMargin(u16),

    #[error("Minimum collateral {0} is negative")]
    NegativeMinCollateral(Quote),

    #[error("Open interest on market {0:?} is out of range")]
    OpenInterestOverflow(MarketId),

    #[error("Funding index on market {0:?} is out of range")]
    FundingIndexOverflow(MarketId),
}

pub(crate) fn validate_oracle(oracle: &OracleRef) -> Result<(), MarketError> {
    if oracle.is_blank() {
        return Err(MarketError::MissingOracle);
    }
    Ok(())
}

// chain_cap narrows the 1..=100 range for deployments with a lower ceiling
pub(crate) fn validate_max_leverage(leverage: u16, chain_cap: u16) -> Result<(), MarketError> {
    let cap = chain_cap.min(LEVERAGE_CEILING);
    if leverage == 0 || leverage > cap {
        return Err(MarketError::InvalidMaxLeverage { leverage, cap });
    }
    Ok(())
}

pub(crate) fn validate_maintenance_margin(bps: u16) -> Result<(), MarketError> {
    if bps == 0 || bps >= Bps::DENOMINATOR {
        return Err(MarketError::InvalidMaintenanceMargin(bps));
    }
    Ok(())
}

pub(crate) fn validate_min_collateral(amount: Quote) -> Result<(), MarketError> {
    if amount.is_negative() {
        return Err(MarketError::NegativeMinCollateral(amount));
    }
    Ok(())
}

impl NewMarket {
    pub fn validate(&self, chain_cap: u16) -> Result<(), MarketError> {
        validate_oracle(&self.oracle)?;
        validate_max_leverage(self.max_leverage, chain_cap)?;
        validate_maintenance_margin(self.maintenance_margin_bps)?;
        validate_min_collateral(self.min_collateral)?;
        Ok(())
    }
}

impl MarketUpdate {
    pub fn validate(&self, chain_cap: u16) -> Result<(), MarketError> {
        if let Some(oracle) = &self.oracle {
            validate_oracle(oracle)?;
        }
        if let Some(leverage) = self.max_leverage {
            validate_max_leverage(leverage, chain_cap)?;
        }
        if let Some(bps) = self.maintenance_margin_bps {
            validate_maintenance_margin(bps)?;
        }
        if let Some(amount) = self.min_collateral {
            validate_min_collateral(amount)?;
        }
        Ok(())
    }

    // caller validates first so a half-applied update is impossible
    pub(crate) fn apply_to(self, market: &mut Market) {
        if let Some(oracle) = self.oracle {
            market.oracle = oracle;
        }
        if let Some(amount) = self.min_collateral {
            market.min_collateral = amount;
        }
        if let Some(leverage) = self.max_leverage {
            market.max_leverage = leverage;
        }
        if let Some(bps) = self.maintenance_margin_bps {
            market.maintenance_margin_bps = bps;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn btc_params() -> NewMarket {
        NewMarket {
            oracle: OracleRef::new("BTC/USD"),
            min_collateral: Quote::new(dec!(100)),
            max_leverage: 10,
            maintenance_margin_bps: 500,
        }
    }

    #[test]
    fn valid_market_params() {
        assert!(btc_params().validate(100).is_ok());
    }

    #[test]
    fn leverage_bounds() {
        let mut params = btc_params();
        params.max_leverage = 0;
        assert!(matches!(params.validate(100), Err(MarketError::InvalidMaxLeverage { .. })));

        params.max_leverage = 101;
        assert!(matches!(params.validate(100), Err(MarketError::InvalidMaxLeverage { .. })));

        params.max_leverage = 100;
        assert!(params.validate(100).is_ok());
        // a 50x chain refuses a 100x market
        assert!(params.validate(50).is_err());
    }

    #[test]
    fn maintenance_margin_bounds() {
        let mut params = btc_params();
        for bad in [0, 10_000, 12_000] {
            params.maintenance_margin_bps = bad;
            assert_eq!(params.validate(100), Err(MarketError::InvalidMaintenanceMargin(bad)));
        }
        params.maintenance_margin_bps = 9_999;
        assert!(params.validate(100).is_ok());
    }

    #[test]
    fn blank_oracle_rejected() {
        let mut params = btc_params();
        params.oracle = OracleRef::new("");
        assert_eq!(params.validate(100), Err(MarketError::MissingOracle));
    }

    #[test]
    fn new_market_starts_active_and_flat() {
        let market = Market::new(MarketId(1), btc_params(), Timestamp::from_millis(5));

        assert!(market.is_active);
        assert_eq!(market.total_open_interest(), Decimal::ZERO);
        assert_eq!(market.cumulative_funding_index, Decimal::ZERO);
        assert_eq!(market.last_funding_time, Timestamp::from_millis(5));
    }

    #[test]
    fn update_applies_only_supplied_fields() {
        let mut market = Market::new(MarketId(1), btc_params(), Timestamp::from_millis(0));
        let update = MarketUpdate {
            max_leverage: Some(20),
            ..MarketUpdate::default()
        };
        assert!(update.validate(100).is_ok());
        update.apply_to(&mut market);

        assert_eq!(market.max_leverage, 20);
        assert_eq!(market.maintenance_margin_bps, 500);
        assert_eq!(market.min_collateral.value(), dec!(100));
    }

    #[test]
    fn accepts_leverage_range() {
        let market = Market::new(MarketId(1), btc_params(), Timestamp::from_millis(0));
        assert!(!market.accepts_leverage(0));
        assert!(market.accepts_leverage(1));
        assert!(market.accepts_leverage(10));
        assert!(!market.accepts_leverage(11));
    }
}
