// 12.0 registry.rs: owns every market. the ledger and funding engine go through here,
// nothing else holds a &mut Market.
// 12.1 admin ops (add/update). 12.2 open interest. 12.3 funding hook.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::market::{Market, MarketError, MarketUpdate, NewMarket};
use crate::types::{Direction, MarketId, Quote, Timestamp};

#[derive(Debug, Clone)]
pub struct MarketRegistry {
    markets: HashMap<MarketId, Market>,
    // chain-wide ceiling applied on top of the 1..=100 rule
    leverage_cap: u16,
}

impl MarketRegistry {
    pub fn new(leverage_cap: u16) -> Self {
        Self {
            markets: HashMap::new(),
            leverage_cap,
        }
    }

    // 12.1
    pub fn add_market(
        &mut self,
        id: MarketId,
        params: NewMarket,
        now: Timestamp,
    ) -> Result<&Market, MarketError> {
        if self.markets.contains_key(&id) {
            return Err(MarketError::AlreadyExists(id));
        }
        params.validate(self.leverage_cap)?;

        debug!(market = id.0, oracle = %params.oracle, max_leverage = params.max_leverage, "market added");
        Ok(&*self.markets.entry(id).or_insert(Market::new(id, params, now)))
    }

    // every supplied field is checked before any is written
    pub fn update_market(
        &mut self,
        id: MarketId,
        update: MarketUpdate,
        is_active: bool,
    ) -> Result<&Market, MarketError> {
        let cap = self.leverage_cap;
        let market = self.markets.get_mut(&id).ok_or(MarketError::NotFound(id))?;
        update.validate(cap)?;

        update.apply_to(market);
        market.is_active = is_active;

        debug!(market = id.0, is_active, "market updated");
        Ok(&*market)
    }

    pub fn get(&self, id: MarketId) -> Option<&Market> {
        self.markets.get(&id)
    }

    pub fn contains(&self, id: MarketId) -> bool {
        self.markets.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Market> {
        self.markets.values()
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    /// (long, short) open interest.
    pub fn open_interest(&self, id: MarketId) -> Option<(Decimal, Decimal)> {
        self.markets
            .get(&id)
            .map(|m| (m.open_interest_long, m.open_interest_short))
    }

    // 12.2
    pub(crate) fn add_open_interest(
        &mut self,
        id: MarketId,
        direction: Direction,
        size: Quote,
    ) -> Result<(), MarketError> {
        let market = self.markets.get_mut(&id).ok_or(MarketError::NotFound(id))?;
        let side = match direction {
            Direction::Long => &mut market.open_interest_long,
            Direction::Short => &mut market.open_interest_short,
        };
        *side = side
            .checked_add(size.value())
            .ok_or(MarketError::OpenInterestOverflow(id))?;
        Ok(())
    }

    // saturates at zero. going negative would mean the position table and OI disagree
    pub(crate) fn remove_open_interest(
        &mut self,
        id: MarketId,
        direction: Direction,
        size: Quote,
    ) -> Result<(), MarketError> {
        let market = self.markets.get_mut(&id).ok_or(MarketError::NotFound(id))?;
        let side = match direction {
            Direction::Long => &mut market.open_interest_long,
            Direction::Short => &mut market.open_interest_short,
        };

        let current = *side;
        if current < size.value() {
            warn!(market = id.0, %direction, open_interest = %current, size = %size, "open interest underflow, clamping to zero");
            *side = Decimal::ZERO;
        } else {
            *side -= size.value();
        }
        Ok(())
    }

    // 12.3: the only writer of the funding index. called by FundingAccrualEngine
    pub(crate) fn apply_funding(
        &mut self,
        id: MarketId,
        rate: Decimal,
        now: Timestamp,
    ) -> Result<Decimal, MarketError> {
        let market = self.markets.get_mut(&id).ok_or(MarketError::NotFound(id))?;
        market.cumulative_funding_index = market
            .cumulative_funding_index
            .checked_add(rate)
            .ok_or(MarketError::FundingIndexOverflow(id))?;
        market.last_funding_time = now;
        Ok(market.cumulative_funding_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OracleRef;
    use rust_decimal_macros::dec;

    fn params() -> NewMarket {
        NewMarket {
            oracle: OracleRef::new("ETH/USD"),
            min_collateral: Quote::new(dec!(10)),
            max_leverage: 20,
            maintenance_margin_bps: 250,
        }
    }

    #[test]
    fn add_then_duplicate() {
        let mut registry = MarketRegistry::new(100);
        registry.add_market(MarketId(7), params(), Timestamp::from_millis(0)).unwrap();

        let again = registry.add_market(MarketId(7), params(), Timestamp::from_millis(0));
        assert_eq!(again.unwrap_err(), MarketError::AlreadyExists(MarketId(7)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn invalid_params_insert_nothing() {
        let mut registry = MarketRegistry::new(100);
        let mut bad = params();
        bad.maintenance_margin_bps = 0;

        assert!(registry.add_market(MarketId(1), bad, Timestamp::from_millis(0)).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn update_unknown_market() {
        let mut registry = MarketRegistry::new(100);
        let result = registry.update_market(MarketId(3), MarketUpdate::default(), false);
        assert_eq!(result.unwrap_err(), MarketError::NotFound(MarketId(3)));
    }

    #[test]
    fn rejected_update_changes_nothing() {
        let mut registry = MarketRegistry::new(100);
        registry.add_market(MarketId(1), params(), Timestamp::from_millis(0)).unwrap();

        let update = MarketUpdate {
            min_collateral: Some(Quote::new(dec!(50))),
            max_leverage: Some(500),
            ..MarketUpdate::default()
        };
        assert!(registry.update_market(MarketId(1), update, false).is_err());

        let market = registry.get(MarketId(1)).unwrap();
        assert_eq!(market.min_collateral.value(), dec!(10));
        assert!(market.is_active);
    }

    #[test]
    fn activation_flag_always_applied() {
        let mut registry = MarketRegistry::new(100);
        registry.add_market(MarketId(1), params(), Timestamp::from_millis(0)).unwrap();

        let market = registry.update_market(MarketId(1), MarketUpdate::default(), false).unwrap();
        assert!(!market.is_active);
        assert_eq!(market.max_leverage, 20);
    }

    #[test]
    fn open_interest_never_negative() {
        let mut registry = MarketRegistry::new(100);
        registry.add_market(MarketId(1), params(), Timestamp::from_millis(0)).unwrap();

        registry.add_open_interest(MarketId(1), Direction::Long, Quote::new(dec!(500))).unwrap();
        registry.add_open_interest(MarketId(1), Direction::Short, Quote::new(dec!(200))).unwrap();
        registry.remove_open_interest(MarketId(1), Direction::Long, Quote::new(dec!(100))).unwrap();
        assert_eq!(registry.open_interest(MarketId(1)), Some((dec!(400), dec!(200))));

        registry.remove_open_interest(MarketId(1), Direction::Short, Quote::new(dec!(999))).unwrap();
        assert_eq!(registry.open_interest(MarketId(1)), Some((dec!(400), dec!(0))));
    }

    #[test]
    fn funding_index_accumulates() {
        let mut registry = MarketRegistry::new(100);
        registry.add_market(MarketId(1), params(), Timestamp::from_millis(0)).unwrap();

        registry.apply_funding(MarketId(1), dec!(300), Timestamp::from_millis(10)).unwrap();
        let index = registry.apply_funding(MarketId(1), dec!(-500), Timestamp::from_millis(20)).unwrap();

        assert_eq!(index, dec!(-200));
        assert_eq!(registry.get(MarketId(1)).unwrap().last_funding_time, Timestamp::from_millis(20));
    }

    #[test]
    fn out_of_range_updates_leave_market_untouched() {
        let mut registry = MarketRegistry::new(100);
        registry.add_market(MarketId(1), params(), Timestamp::from_millis(0)).unwrap();

        registry.add_open_interest(MarketId(1), Direction::Long, Quote::new(Decimal::MAX)).unwrap();
        assert_eq!(
            registry.add_open_interest(MarketId(1), Direction::Long, Quote::new(dec!(1))),
            Err(MarketError::OpenInterestOverflow(MarketId(1)))
        );
        assert_eq!(registry.open_interest(MarketId(1)), Some((Decimal::MAX, dec!(0))));

        registry.apply_funding(MarketId(1), Decimal::MIN, Timestamp::from_millis(10)).unwrap();
        assert_eq!(
            registry.apply_funding(MarketId(1), dec!(-1), Timestamp::from_millis(20)),
            Err(MarketError::FundingIndexOverflow(MarketId(1)))
        );
        let market = registry.get(MarketId(1)).unwrap();
        assert_eq!(market.cumulative_funding_index, Decimal::MIN);
        assert_eq!(market.last_funding_time, Timestamp::from_millis(10));
    }
}
