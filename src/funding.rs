// 5.0: funding. the heavier side of the book pays the lighter side, through a per-market
// cumulative index. positions snapshot the index at open and settle the difference at exit.
// 5.1 rate formula. 5.2 rate-limited index advance.
//
// sign convention: a positive rate means longs pay shorts. an index that went up since a
// position opened is a cost for a long and income for a short (see pnl::funding_settlement).

use rust_decimal::Decimal;
use tracing::debug;

use crate::config::FundingParams;
use crate::market::MarketError;
use crate::registry::MarketRegistry;
use crate::types::{MarketId, Timestamp};

#[derive(Debug, Clone, PartialEq)]
pub struct FundingUpdate {
    pub market_id: MarketId,
    /// Index units added this interval.
    pub rate: Decimal,
    pub new_index: Decimal,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FundingError {
    #[error("Market {0:?} not found")]
    MarketNotFound(MarketId),

    #[error("Market {0:?} is not active")]
    MarketInactive(MarketId),

    #[error("Funding for market {market:?} not due until {next_allowed:?}")]
    TooEarly {
        market: MarketId,
        next_allowed: Timestamp,
    },

    #[error("Funding rate out of range for open interest {long_oi} long / {short_oi} short")]
    RateOverflow { long_oi: Decimal, short_oi: Decimal },

    #[error("Funding index on market {0:?} is out of range")]
    IndexOverflow(MarketId),
}

// 5.1: imbalance-driven rate in index units per interval.
// zero if either side is empty; otherwise scaled (max/min - 1), signed toward the heavy side.
pub fn calculate_funding_rate(
    long_oi: Decimal,
    short_oi: Decimal,
    params: &FundingParams,
) -> Result<Decimal, FundingError> {
    if long_oi <= Decimal::ZERO || short_oi <= Decimal::ZERO || long_oi == short_oi {
        return Ok(Decimal::ZERO);
    }

    let (heavy, light) = if long_oi > short_oi {
        (long_oi, short_oi)
    } else {
        (short_oi, long_oi)
    };

    let overflow = FundingError::RateOverflow { long_oi, short_oi };
    let mut magnitude = heavy
        .checked_div(light)
        .and_then(|ratio| ratio.checked_sub(Decimal::ONE))
        .and_then(|imbalance| imbalance.checked_mul(params.rate_factor))
        .and_then(|scaled| scaled.checked_mul(params.index_scale))
        .ok_or(overflow)?
        .trunc();
    if let Some(cap) = params.max_rate {
        magnitude = magnitude.min(cap);
    }

    Ok(if long_oi > short_oi { magnitude } else { -magnitude })
}

/// Advances each market's cumulative funding index, at most once per interval.
#[derive(Debug, Clone)]
pub struct FundingAccrualEngine {
    params: FundingParams,
}

impl FundingAccrualEngine {
    pub fn new(params: FundingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &FundingParams {
        &self.params
    }

    fn next_update_at(&self, last_update: Timestamp) -> Timestamp {
        last_update.plus_millis(self.params.interval_ms)
    }

    // 5.2: calls inside the window are rejected, not queued
    pub fn update_funding(
        &self,
        registry: &mut MarketRegistry,
        market_id: MarketId,
        now: Timestamp,
    ) -> Result<FundingUpdate, FundingError> {
        let market = registry
            .get(market_id)
            .ok_or(FundingError::MarketNotFound(market_id))?;

        if !market.is_active {
            return Err(FundingError::MarketInactive(market_id));
        }

        let next_allowed = self.next_update_at(market.last_funding_time);
        if now < next_allowed {
            return Err(FundingError::TooEarly {
                market: market_id,
                next_allowed,
            });
        }

        let rate = calculate_funding_rate(
            market.open_interest_long,
            market.open_interest_short,
            &self.params,
        )?;

        let new_index = registry
            .apply_funding(market_id, rate, now)
            .map_err(|e| match e {
                MarketError::FundingIndexOverflow(id) => FundingError::IndexOverflow(id),
                _ => FundingError::MarketNotFound(market_id),
            })?;

        debug!(market = market_id.0, %rate, %new_index, "funding index advanced");

        Ok(FundingUpdate {
            market_id,
            rate,
            new_index,
            updated_at: now,
        })
    }
}
