//! Funding accrual through the ledger.

use tracing::debug;

use super::core::PositionLedger;
use super::results::LedgerError;
use crate::custody::CollateralCustody;
use crate::events::{EventPayload, FundingUpdatedEvent};
use crate::funding::FundingUpdate;
use crate::oracle::PricingAdapter;
use crate::types::{MarketId, Timestamp};

impl<P: PricingAdapter, C: CollateralCustody> PositionLedger<P, C> {
    /// Advances the market's funding index if a full interval has passed since the last
    /// update. Open positions settle the change when they exit.
    pub fn update_funding(&mut self, market_id: MarketId, now: Timestamp) -> Result<FundingUpdate, LedgerError> {
        let _guard = self.lock.try_enter()?;
        self.ensure_running()?;

        let update = self.funding.update_funding(&mut self.registry, market_id, now)?;

        debug!(market = market_id.0, rate = %update.rate, index = %update.new_index, "funding settled into index");
        self.emit_event(EventPayload::FundingUpdated(FundingUpdatedEvent {
            market_id,
            rate: update.rate,
            new_index: update.new_index,
        }));
        Ok(update)
    }

    /// Same as [`update_funding`](Self::update_funding) at the ledger's clock.
    pub fn update_funding_now(&mut self, market_id: MarketId) -> Result<FundingUpdate, LedgerError> {
        let now = self.current_time;
        self.update_funding(market_id, now)
    }
}
