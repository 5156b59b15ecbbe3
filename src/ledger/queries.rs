// 8.6: read-only views. none of these take the entry lock or touch custody.

use rust_decimal::Decimal;

use super::core::PositionLedger;
use super::results::LedgerError;
use crate::custody::CollateralCustody;
use crate::liquidation::estimated_liquidation_price;
use crate::market::Market;
use crate::oracle::PricingAdapter;
use crate::pnl::is_liquidatable;
use crate::position::{Position, PositionView};
use crate::types::{AccountId, MarketId, PositionId};

impl<P: PricingAdapter, C: CollateralCustody> PositionLedger<P, C> {
    // order is unspecified
    pub fn positions_of(&self, trader: AccountId) -> Vec<PositionId> {
        self.trader_index.get(&trader).cloned().unwrap_or_default()
    }

    pub fn position(&self, id: PositionId) -> Option<&Position> {
        self.positions.get(&id)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    /// Live valuation of a position at the current oracle price and funding index.
    pub fn position_view(&self, id: PositionId) -> Result<PositionView, LedgerError> {
        let position = self.position_or_err(id)?;
        let valuation = self.value_position(position)?;
        let maintenance = self.market_or_err(position.market_id)?.maintenance_margin();

        Ok(PositionView {
            position: position.clone(),
            current_price: valuation.price,
            unrealized_pnl: valuation.pnl,
            funding_owed: valuation.funding,
            equity: valuation.equity,
            maintenance_margin: maintenance,
            liquidatable: is_liquidatable(valuation.equity, position.size, maintenance),
            estimated_liquidation_price: estimated_liquidation_price(
                position.direction,
                position.entry_price,
                position.margin,
                valuation.funding,
                position.size,
                maintenance,
            ),
        })
    }

    pub fn market(&self, id: MarketId) -> Option<&Market> {
        self.registry.get(id)
    }

    pub fn markets(&self) -> impl Iterator<Item = &Market> {
        self.registry.iter()
    }

    /// (long, short) aggregate size.
    pub fn open_interest(&self, id: MarketId) -> Option<(Decimal, Decimal)> {
        self.registry.open_interest(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChainConfig, LedgerConfig};
    use crate::custody::InMemoryCustody;
    use crate::ledger::{ErrorKind, OpenRequest};
    use crate::market::NewMarket;
    use crate::oracle::StaticPriceFeed;
    use crate::types::{Direction, OracleRef, Quote};
    use rust_decimal_macros::dec;

    fn oracle() -> OracleRef {
        OracleRef::new("BTC/USD")
    }

    fn setup() -> (PositionLedger<StaticPriceFeed, InMemoryCustody>, PositionId) {
        let mut custody = InMemoryCustody::new();
        custody.fund(AccountId(1), dec!(1_000));

        let mut ledger = PositionLedger::new(
            ChainConfig::default(),
            LedgerConfig::default(),
            StaticPriceFeed::new().with_price(&oracle(), dec!(1000)),
            custody,
        )
        .unwrap();
        ledger
            .add_market(
                MarketId(1),
                NewMarket {
                    oracle: oracle(),
                    min_collateral: Quote::new(dec!(10)),
                    max_leverage: 10,
                    maintenance_margin_bps: 500,
                },
            )
            .unwrap();
        let id = ledger
            .open(OpenRequest::new(MarketId(1), AccountId(1), Direction::Long, Quote::new(dec!(100)), 10))
            .unwrap();
        (ledger, id)
    }

    #[test]
    fn view_tracks_oracle() {
        let (mut ledger, id) = setup();

        let view = ledger.position_view(id).unwrap();
        assert!(view.unrealized_pnl.is_zero());
        assert_eq!(view.equity.value(), dec!(100));
        assert!(!view.liquidatable);
        assert_eq!(view.estimated_liquidation_price.map(|p| p.value()), Some(dec!(950)));

        ledger.pricing_mut().set_price(&oracle(), dec!(940));
        let view = ledger.position_view(id).unwrap();
        assert_eq!(view.unrealized_pnl.value(), dec!(-60));
        assert!(view.liquidatable);
    }

    #[test]
    fn view_of_missing_position() {
        let (ledger, _) = setup();
        let err = ledger.position_view(PositionId(42)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn view_without_oracle_price() {
        let (mut ledger, id) = setup();
        ledger.pricing_mut().remove_price(&oracle());
        assert_eq!(ledger.position_view(id).unwrap_err().kind(), ErrorKind::Oracle);
    }

    #[test]
    fn unknown_trader_has_no_positions() {
        let (ledger, _) = setup();
        assert!(ledger.positions_of(AccountId(77)).is_empty());
        assert_eq!(ledger.position_count(), 1);
    }
}
