//! Liquidation detection and execution.

use tracing::{debug, info, warn};

use super::core::PositionLedger;
use super::results::{LedgerError, LiquidationResult};
use crate::custody::CollateralCustody;
use crate::events::{EventPayload, PositionLiquidatedEvent};
use crate::liquidation::split_liquidation;
use crate::oracle::PricingAdapter;
use crate::pnl::is_liquidatable;
use crate::types::{AccountId, MarketId, PositionId};

impl<P: PricingAdapter, C: CollateralCustody> PositionLedger<P, C> {
    /// Liquidates a position whose equity has fallen below maintenance. Anyone may call
    /// this; the caller receives the liquidator fee.
    pub fn liquidate(
        &mut self,
        position_id: PositionId,
        liquidator: AccountId,
    ) -> Result<LiquidationResult, LedgerError> {
        let _guard = self.lock.try_enter()?;
        self.ensure_running()?;

        let position = self.position_or_err(position_id)?;
        let valuation = self.value_position(position)?;
        let maintenance = self.market_or_err(position.market_id)?.maintenance_margin();

        if !is_liquidatable(valuation.equity, position.size, maintenance) {
            debug!(position = position_id.0, price = %valuation.price, "liquidation refused, position healthy");
            return Err(LedgerError::NotLiquidatable(position_id));
        }

        let equity = valuation.equity;
        let split = split_liquidation(
            position.margin,
            equity,
            self.chain.liquidation_fee(),
            self.chain.liquidation_remainder,
            self.chain.quote_decimals,
        );
        let trader = position.trader;

        if let Err(e) = self.pay_out(&[(liquidator, split.liquidator_fee), (trader, split.trader_refund)]) {
            warn!(position = position_id.0, error = %e, "liquidation settlement failed");
            return Err(e);
        }

        // commit
        self.remove_position(position_id)?;

        info!(position = position_id.0, trader = trader.0, liquidator = liquidator.0, price = %valuation.price, %equity, fee = %split.liquidator_fee, "position liquidated");
        self.emit_event(EventPayload::PositionLiquidated(PositionLiquidatedEvent {
            id: position_id,
            trader,
            liquidator,
            price: valuation.price,
            fee: split.liquidator_fee,
        }));

        Ok(LiquidationResult {
            position_id,
            trader,
            liquidator,
            price: valuation.price,
            equity,
            liquidator_fee: split.liquidator_fee,
            trader_refund: split.trader_refund,
        })
    }

    /// Positions in `market_id` that `liquidate` would currently accept, lowest id first.
    /// Read-only: nothing is liquidated. Positions that cannot be valued are skipped.
    pub fn liquidation_candidates(&self, market_id: MarketId) -> Result<Vec<PositionId>, LedgerError> {
        let market = self.market_or_err(market_id)?;
        let price = self.oracle_price(market)?;
        let maintenance = market.maintenance_margin();
        let decimals = self.chain.quote_decimals;
        let index_scale = self.chain.funding.index_scale;

        let mut candidates: Vec<PositionId> = self
            .positions
            .values()
            .filter(|p| p.market_id == market_id)
            .filter(|p| {
                match Self::valuation_at(p, price, market.cumulative_funding_index, index_scale, decimals) {
                    Some(valuation) => is_liquidatable(valuation.equity, p.size, maintenance),
                    None => {
                        warn!(position = p.id.0, %price, "position valuation out of range");
                        false
                    }
                }
            })
            .map(|p| p.id)
            .collect();

        candidates.sort();
        Ok(candidates)
    }
}
