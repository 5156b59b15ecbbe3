//! Opening and closing positions.
//!
//! Both entry points follow the same three phases: validate and compute against current
//! state, instruct custody, then commit. Anything that fails before the commit leaves
//! the ledger exactly as it was.

use rust_decimal::Decimal;
use tracing::{info, warn};

use super::core::PositionLedger;
use super::results::{CloseResult, LedgerError, OpenRequest};
use crate::custody::CollateralCustody;
use crate::events::{EventPayload, PositionClosedEvent, PositionOpenedEvent};
use crate::oracle::PricingAdapter;
use crate::pnl::{close_payout, trading_fee};
use crate::position::Position;
use crate::types::{AccountId, PositionId, Quote};

impl<P: PricingAdapter, C: CollateralCustody> PositionLedger<P, C> {
    /// Opens an isolated-margin position at the market's oracle price.
    ///
    /// Size is `margin * leverage`. The margin moves from the trader to the vault before
    /// the position exists.
    pub fn open(&mut self, request: OpenRequest) -> Result<PositionId, LedgerError> {
        let _guard = self.lock.try_enter()?;
        self.ensure_running()?;

        let OpenRequest {
            market_id,
            trader,
            direction,
            margin,
            leverage,
            ..
        } = request;

        let (size, entry_price, entry_funding_index) = {
            let market = self.market_or_err(market_id)?;

            if !market.is_active {
                return Err(LedgerError::MarketInactive(market_id));
            }
            if !market.accepts_leverage(leverage) {
                return Err(LedgerError::InvalidLeverage {
                    leverage,
                    max: market.max_leverage,
                });
            }
            let decimals = self.chain.quote_decimals;
            let minimum = market.min_collateral.max(Quote::base_unit(decimals));
            if margin < minimum {
                return Err(LedgerError::InsufficientMargin {
                    provided: margin,
                    minimum,
                });
            }
            if !margin.fits_precision(decimals) {
                return Err(LedgerError::MarginPrecision { margin, decimals });
            }

            let size = margin
                .value()
                .checked_mul(Decimal::from(leverage))
                .map(Quote::new)
                .ok_or(LedgerError::SizeOverflow { margin, leverage })?;
            market
                .open_interest(direction)
                .checked_add(size.value())
                .ok_or(LedgerError::SizeOverflow { margin, leverage })?;

            let entry_price = self.oracle_price(market)?;
            (size, entry_price, market.cumulative_funding_index)
        };

        if let Err(e) = self.custody.transfer_in(trader, margin) {
            warn!(trader = trader.0, %margin, error = %e, "margin deposit failed");
            return Err(e.into());
        }

        // commit
        let id = PositionId(self.next_position_id);
        self.registry.add_open_interest(market_id, direction, size)?;
        self.next_position_id += 1;
        self.positions.insert(
            id,
            Position {
                id,
                trader,
                market_id,
                direction,
                size,
                margin,
                leverage,
                entry_price,
                entry_funding_index,
                opened_at: self.current_time,
            },
        );
        self.trader_index.entry(trader).or_default().push(id);

        info!(position = id.0, trader = trader.0, market = market_id.0, %direction, %size, %entry_price, "position opened");
        self.emit_event(EventPayload::PositionOpened(PositionOpenedEvent {
            id,
            trader,
            market_id,
            direction,
            size,
            margin,
            entry_price,
            leverage,
        }));

        Ok(id)
    }

    /// Closes a position at the oracle price. Only its owner may close it.
    ///
    /// The trader receives `max(0, margin + pnl - funding - fee)`. The fee goes to the
    /// chain's fee collector, limited to what the position's equity can cover. Both
    /// payments go to custody as one batch.
    pub fn close(&mut self, position_id: PositionId, caller: AccountId) -> Result<CloseResult, LedgerError> {
        let _guard = self.lock.try_enter()?;
        self.ensure_running()?;

        let position = self.position_or_err(position_id)?;
        if position.trader != caller {
            return Err(LedgerError::Unauthorized {
                position: position_id,
                caller,
            });
        }

        let valuation = self.value_position(position)?;
        let decimals = self.chain.quote_decimals;
        let fee = trading_fee(position.size, self.chain.trading_fee(), decimals);
        let payout = close_payout(valuation.equity, fee);
        let fee_collected = fee.min(valuation.equity.max_zero());
        let trader = position.trader;
        let collector = self.chain.fee_collector;

        if let Err(e) = self.pay_out(&[(trader, payout), (collector, fee_collected)]) {
            warn!(position = position_id.0, error = %e, "close settlement failed");
            return Err(e);
        }

        // commit
        self.remove_position(position_id)?;

        info!(position = position_id.0, trader = trader.0, pnl = %valuation.pnl, funding = %valuation.funding, %fee, %payout, "position closed");
        self.emit_event(EventPayload::PositionClosed(PositionClosedEvent {
            id: position_id,
            trader,
            exit_price: valuation.price,
            pnl: valuation.pnl,
            fee,
        }));

        Ok(CloseResult {
            position_id,
            trader,
            exit_price: valuation.price,
            pnl: valuation.pnl,
            funding: valuation.funding,
            fee,
            fee_collected,
            payout,
        })
    }

    // zero amounts never reach custody
    pub(super) fn pay_out(&mut self, transfers: &[(AccountId, Quote)]) -> Result<(), LedgerError> {
        let batch: Vec<(AccountId, Quote)> = transfers
            .iter()
            .copied()
            .filter(|(_, amount)| amount.is_positive())
            .collect();
        if batch.is_empty() {
            return Ok(());
        }
        self.custody.transfer_out_all(&batch)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChainConfig, LedgerConfig};
    use crate::custody::InMemoryCustody;
    use crate::ledger::ErrorKind;
    use crate::market::NewMarket;
    use crate::oracle::StaticPriceFeed;
    use crate::types::{Direction, MarketId, OracleRef};
    use rust_decimal_macros::dec;

    const TRADER: AccountId = AccountId(7);
    const COLLECTOR: AccountId = AccountId(99);

    fn oracle() -> OracleRef {
        OracleRef::new("BTC/USD")
    }

    fn setup() -> PositionLedger<StaticPriceFeed, InMemoryCustody> {
        let feed = StaticPriceFeed::new().with_price(&oracle(), dec!(1000));
        let mut custody = InMemoryCustody::new();
        custody.fund(TRADER, dec!(10_000));
        custody.seed_vault(dec!(1_000));

        let mut ledger = PositionLedger::new(
            ChainConfig::default().with_fee_collector(COLLECTOR),
            LedgerConfig::default(),
            feed,
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
        ledger
    }

    fn long(margin: Decimal, leverage: u16) -> OpenRequest {
        OpenRequest::new(MarketId(1), TRADER, Direction::Long, Quote::new(margin), leverage)
    }

    #[test]
    fn open_records_position_and_open_interest() {
        let mut ledger = setup();
        let id = ledger.open(long(dec!(100), 5)).unwrap();

        let position = ledger.position(id).unwrap();
        assert_eq!(position.size.value(), dec!(500));
        assert_eq!(position.entry_price.value(), dec!(1000));
        assert_eq!(ledger.open_interest(MarketId(1)), Some((dec!(500), dec!(0))));
        assert_eq!(ledger.custody().wallet(TRADER), dec!(9_900));
        assert_eq!(ledger.positions_of(TRADER), vec![id]);
    }

    #[test]
    fn ids_increase_from_one() {
        let mut ledger = setup();
        let a = ledger.open(long(dec!(100), 2)).unwrap();
        let b = ledger.open(long(dec!(100), 2)).unwrap();
        assert_eq!(a, PositionId(1));
        assert_eq!(b, PositionId(2));
    }

    #[test]
    fn open_validation_order() {
        let mut ledger = setup();

        let err = ledger
            .open(OpenRequest::new(MarketId(5), TRADER, Direction::Long, Quote::new(dec!(100)), 2))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        assert_eq!(
            ledger.open(long(dec!(100), 0)).unwrap_err(),
            LedgerError::InvalidLeverage { leverage: 0, max: 10 }
        );
        assert_eq!(
            ledger.open(long(dec!(100), 11)).unwrap_err(),
            LedgerError::InvalidLeverage { leverage: 11, max: 10 }
        );
        assert_eq!(ledger.open(long(dec!(5), 2)).unwrap_err().kind(), ErrorKind::Validation);
        assert_eq!(ledger.open(long(dec!(0), 2)).unwrap_err().kind(), ErrorKind::Validation);

        // nothing committed by any of the failures
        assert!(ledger.positions_of(TRADER).is_empty());
        assert_eq!(ledger.custody().wallet(TRADER), dec!(10_000));
    }

    #[test]
    fn margin_must_be_whole_base_units() {
        let mut ledger = setup();

        let margin = Quote::new(dec!(100.0000001));
        assert_eq!(
            ledger.open(long(margin.value(), 2)).unwrap_err(),
            LedgerError::MarginPrecision { margin, decimals: 6 }
        );

        // a market with no floor still needs one base unit
        ledger
            .add_market(
                MarketId(2),
                NewMarket {
                    oracle: oracle(),
                    min_collateral: Quote::zero(),
                    max_leverage: 10,
                    maintenance_margin_bps: 500,
                },
            )
            .unwrap();
        let dust = Quote::new(dec!(0.00000000000000000000000001));
        assert_eq!(
            ledger
                .open(OpenRequest::new(MarketId(2), TRADER, Direction::Short, dust, 1))
                .unwrap_err(),
            LedgerError::InsufficientMargin {
                provided: dust,
                minimum: Quote::new(dec!(0.000001)),
            }
        );

        let id = ledger
            .open(OpenRequest::new(MarketId(2), TRADER, Direction::Short, Quote::new(dec!(0.000001)), 1))
            .unwrap();
        assert_eq!(ledger.position(id).unwrap().size.value(), dec!(0.000001));
        assert_eq!(ledger.custody().wallet(TRADER), dec!(10_000) - dec!(0.000001));
    }

    #[test]
    fn failed_open_does_not_consume_an_id() {
        let mut ledger = setup();
        assert!(ledger.open(long(dec!(100), 50)).is_err());
        assert_eq!(ledger.open(long(dec!(100), 2)).unwrap(), PositionId(1));
    }

    #[test]
    fn close_pays_trader_and_collector() {
        let mut ledger = setup();
        let id = ledger.open(long(dec!(100), 5)).unwrap();
        ledger.pricing_mut().set_price(&oracle(), dec!(1100));

        let result = ledger.close(id, TRADER).unwrap();
        assert_eq!(result.pnl.value(), dec!(50));
        assert_eq!(result.fee.value(), dec!(0.5));
        assert_eq!(result.payout.value(), dec!(149.5));

        assert_eq!(ledger.custody().wallet(COLLECTOR), dec!(0.5));
        assert_eq!(ledger.custody().wallet(TRADER), dec!(10_049.5));
        assert!(ledger.position(id).is_none());
        assert_eq!(ledger.open_interest(MarketId(1)), Some((dec!(0), dec!(0))));
    }

    #[test]
    fn close_by_stranger_rejected() {
        let mut ledger = setup();
        let id = ledger.open(long(dec!(100), 5)).unwrap();

        let err = ledger.close(id, AccountId(8)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert!(ledger.position(id).is_some());
    }

    #[test]
    fn underwater_close_pays_nothing() {
        let mut ledger = setup();
        let id = ledger.open(long(dec!(100), 10)).unwrap();
        ledger.pricing_mut().set_price(&oracle(), dec!(850));

        let result = ledger.close(id, TRADER).unwrap();
        // -150 pnl against 100 margin
        assert!(result.payout.is_zero());
        assert!(result.fee_collected.is_zero());
        assert_eq!(ledger.custody().wallet(TRADER), dec!(9_900));
        assert_eq!(ledger.custody().wallet(COLLECTOR), dec!(0));
    }

    #[test]
    fn trader_index_tracks_open_positions() {
        let mut ledger = setup();
        let a = ledger.open(long(dec!(100), 2)).unwrap();
        let b = ledger.open(long(dec!(100), 2)).unwrap();
        let c = ledger.open(long(dec!(100), 2)).unwrap();

        ledger.close(a, TRADER).unwrap();
        let mut remaining = ledger.positions_of(TRADER);
        remaining.sort();
        assert_eq!(remaining, vec![b, c]);

        ledger.close(b, TRADER).unwrap();
        ledger.close(c, TRADER).unwrap();
        assert!(ledger.positions_of(TRADER).is_empty());
    }
}
