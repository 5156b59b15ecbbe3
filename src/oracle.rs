// 9.0 oracle.rs: the ledger never talks to Pyth/Chainlink directly. it asks a PricingAdapter
// for the price behind a market's oracle ref and gets a scalar or an error back.
// no caching or staleness policy here. that is the adapter's business.

use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::types::{OracleRef, Price};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("No price available for oracle {0}")]
    Unavailable(OracleRef),

    #[error("Oracle {oracle} returned non-positive price {price}")]
    NonPositive { oracle: OracleRef, price: Decimal },
}

/// Supplies the current reference price for a market's oracle.
pub trait PricingAdapter {
    /// Raw price for `oracle`. The ledger rejects anything that is not strictly positive.
    fn price(&self, oracle: &OracleRef) -> Result<Decimal, OracleError>;
}

impl<T: PricingAdapter + ?Sized> PricingAdapter for &T {
    fn price(&self, oracle: &OracleRef) -> Result<Decimal, OracleError> {
        (**self).price(oracle)
    }
}

// validated read used by every ledger entry point
pub fn fetch_price<P: PricingAdapter + ?Sized>(
    adapter: &P,
    oracle: &OracleRef,
) -> Result<Price, OracleError> {
    let raw = adapter.price(oracle)?;
    Price::new(raw).ok_or_else(|| OracleError::NonPositive {
        oracle: oracle.clone(),
        price: raw,
    })
}

/// In-memory feed. Prices are set by hand; used by tests and the simulator.
#[derive(Debug, Clone, Default)]
pub struct StaticPriceFeed {
    prices: HashMap<OracleRef, Decimal>,
}

impl StaticPriceFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, oracle: &OracleRef, price: Decimal) -> Self {
        self.set_price(oracle, price);
        self
    }

    pub fn set_price(&mut self, oracle: &OracleRef, price: Decimal) {
        self.prices.insert(oracle.clone(), price);
    }

    // simulate an outage
    pub fn remove_price(&mut self, oracle: &OracleRef) {
        self.prices.remove(oracle);
    }
}

impl PricingAdapter for StaticPriceFeed {
    fn price(&self, oracle: &OracleRef) -> Result<Decimal, OracleError> {
        self.prices
            .get(oracle)
            .copied()
            .ok_or_else(|| OracleError::Unavailable(oracle.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn fetch_known_price() {
        let btc = OracleRef::new("BTC/USD");
        let feed = StaticPriceFeed::new().with_price(&btc, dec!(50000));

        assert_eq!(fetch_price(&feed, &btc).unwrap().value(), dec!(50000));
    }

    #[test]
    fn missing_price_is_unavailable() {
        let feed = StaticPriceFeed::new();
        let eth = OracleRef::new("ETH/USD");

        assert_eq!(fetch_price(&feed, &eth), Err(OracleError::Unavailable(eth)));
    }

    #[test]
    fn zero_or_negative_price_rejected() {
        let sol = OracleRef::new("SOL/USD");
        let mut feed = StaticPriceFeed::new().with_price(&sol, dec!(0));
        assert!(matches!(fetch_price(&feed, &sol), Err(OracleError::NonPositive { .. })));

        feed.set_price(&sol, dec!(-5));
        assert!(matches!(fetch_price(&feed, &sol), Err(OracleError::NonPositive { .. })));
    }

    #[test]
    fn outage_then_recovery() {
        let btc = OracleRef::new("BTC/USD");
        let mut feed = StaticPriceFeed::new().with_price(&btc, dec!(100));
        feed.remove_price(&btc);
        assert!(fetch_price(&feed, &btc).is_err());

        feed.set_price(&btc, dec!(101));
        assert_eq!(fetch_price(&feed, &btc).unwrap().value(), dec!(101));
    }
}
