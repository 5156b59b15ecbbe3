// 8.0.2: request/result types and errors for ledger operations.

use crate::config::ConfigError;
use crate::custody::CustodyError;
use crate::funding::FundingError;
use crate::market::MarketError;
use crate::oracle::OracleError;
use crate::types::{AccountId, Direction, MarketId, PositionId, Price, Quote};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenRequest {
    pub market_id: MarketId,
    pub trader: AccountId,
    pub direction: Direction,
    pub margin: Quote,
    pub leverage: u16,
    // accepted but not enforced; the oracle price is the fill price
    pub price_hint: Option<Price>,
    pub max_slippage_bps: Option<u16>,
}

impl OpenRequest {
    pub fn new(
        market_id: MarketId,
        trader: AccountId,
        direction: Direction,
        margin: Quote,
        leverage: u16,
    ) -> Self {
        Self {
            market_id,
            trader,
            direction,
            margin,
            leverage,
            price_hint: None,
            max_slippage_bps: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CloseResult {
    pub position_id: PositionId,
    pub trader: AccountId,
    pub exit_price: Price,
    pub pnl: Quote,
    /// Positive when the position paid funding.
    pub funding: Quote,
    pub fee: Quote,
    /// Part of `fee` the position's equity could cover. This is what the collector receives.
    pub fee_collected: Quote,
    pub payout: Quote,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiquidationResult {
    pub position_id: PositionId,
    pub trader: AccountId,
    pub liquidator: AccountId,
    pub price: Price,
    pub equity: Quote,
    pub liquidator_fee: Quote,
    pub trader_refund: Quote,
}

/// Coarse failure class, for callers that only need to know what went wrong in kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Authorization,
    State,
    Oracle,
    NotLiquidatable,
    Custody,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("Position {0} not found")]
    PositionNotFound(PositionId),

    #[error("Market {0:?} is not active")]
    MarketInactive(MarketId),

    #[error("Account {caller:?} does not own position {position}")]
    Unauthorized {
        position: PositionId,
        caller: AccountId,
    },

    #[error("Ledger is paused")]
    Paused,

    #[error("Leverage {leverage} outside 1..={max}")]
    InvalidLeverage { leverage: u16, max: u16 },

    #[error("Margin {provided} below minimum {minimum}")]
    InsufficientMargin { provided: Quote, minimum: Quote },

    #[error("Margin {margin} is finer than {decimals} decimals")]
    MarginPrecision { margin: Quote, decimals: u32 },

    #[error("Position size overflows: margin {margin} x {leverage}")]
    SizeOverflow { margin: Quote, leverage: u16 },

    #[error("Valuation of position {0} is out of range")]
    ArithmeticOverflow(PositionId),

    #[error("Position {0} is above maintenance margin")]
    NotLiquidatable(PositionId),

    #[error("Ledger call already in progress")]
    Reentrant,

    #[error("Market error: {0}")]
    Market(#[from] MarketError),

    #[error("Funding error: {0}")]
    Funding(#[from] FundingError),

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Custody error: {0}")]
    Custody(#[from] CustodyError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::PositionNotFound(_) => ErrorKind::NotFound,
            LedgerError::Unauthorized { .. } => ErrorKind::Authorization,
            LedgerError::MarketInactive(_) | LedgerError::Paused | LedgerError::Reentrant => {
                ErrorKind::State
            }
            LedgerError::InvalidLeverage { .. }
            | LedgerError::InsufficientMargin { .. }
            | LedgerError::MarginPrecision { .. }
            | LedgerError::SizeOverflow { .. }
            | LedgerError::ArithmeticOverflow(_)
            | LedgerError::Config(_) => ErrorKind::Validation,
            LedgerError::NotLiquidatable(_) => ErrorKind::NotLiquidatable,
            LedgerError::Oracle(_) => ErrorKind::Oracle,
            LedgerError::Custody(_) => ErrorKind::Custody,
            LedgerError::Market(e) => match e {
                MarketError::NotFound(_) => ErrorKind::NotFound,
                MarketError::AlreadyExists(_) => ErrorKind::State,
                _ => ErrorKind::Validation,
            },
            LedgerError::Funding(e) => match e {
                FundingError::MarketNotFound(_) => ErrorKind::NotFound,
                FundingError::MarketInactive(_) | FundingError::TooEarly { .. } => ErrorKind::State,
                FundingError::RateOverflow { .. } | FundingError::IndexOverflow(_) => {
                    ErrorKind::Validation
                }
            },
        }
    }
}
