//! Administrative market management.
//!
//! Who may call these is decided outside the ledger.

use tracing::info;

use super::core::PositionLedger;
use super::results::LedgerError;
use crate::custody::CollateralCustody;
use crate::events::{EventPayload, MarketAddedEvent, MarketUpdatedEvent};
use crate::market::{MarketUpdate, NewMarket};
use crate::oracle::PricingAdapter;
use crate::types::MarketId;

impl<P: PricingAdapter, C: CollateralCustody> PositionLedger<P, C> {
    pub fn add_market(&mut self, id: MarketId, params: NewMarket) -> Result<MarketId, LedgerError> {
        let _guard = self.lock.try_enter()?;

        let now = self.current_time;
        let market = self.registry.add_market(id, params, now)?;
        let event = MarketAddedEvent {
            id,
            oracle: market.oracle.clone(),
            max_leverage: market.max_leverage,
        };

        info!(market = id.0, oracle = %event.oracle, max_leverage = event.max_leverage, "market listed");
        self.emit_event(EventPayload::MarketAdded(event));
        Ok(id)
    }

    /// Applies the supplied fields and sets the active flag. Existing positions keep their
    /// terms; new limits only gate later opens.
    pub fn update_market(
        &mut self,
        id: MarketId,
        update: MarketUpdate,
        is_active: bool,
    ) -> Result<(), LedgerError> {
        let _guard = self.lock.try_enter()?;

        self.registry.update_market(id, update, is_active)?;

        info!(market = id.0, is_active, "market updated");
        self.emit_event(EventPayload::MarketUpdated(MarketUpdatedEvent { id, is_active }));
        Ok(())
    }
}
