//! Liquidation economics.
//!
//! Eligibility itself lives in [`crate::pnl::is_liquidatable`]. This module covers what
//! happens once a position is eligible: the liquidator's reward, what (if anything) goes
//! back to the trader, and an estimate of the price at which eligibility flips.

use rust_decimal::Decimal;

use crate::config::LiquidationRemainder;
use crate::pnl::maintenance_requirement;
use crate::types::{Bps, Direction, Price, Quote};

/// Split of a liquidated position's margin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidationSplit {
    /// Paid to whoever triggered the liquidation.
    pub liquidator_fee: Quote,
    /// Returned to the trader. Zero under [`LiquidationRemainder::Retain`].
    pub trader_refund: Quote,
}

/// Liquidator reward: a fixed share of the position's margin, rounded down.
/// Never exceeds the margin itself.
pub fn liquidator_fee(margin: Quote, fee_rate: Bps, decimals: u32) -> Quote {
    fee_rate.apply(margin, decimals).min(margin)
}

pub fn split_liquidation(
    margin: Quote,
    equity: Quote,
    fee_rate: Bps,
    policy: LiquidationRemainder,
    decimals: u32,
) -> LiquidationSplit {
    let liquidator_fee = liquidator_fee(margin, fee_rate, decimals);

    let trader_refund = match policy {
        LiquidationRemainder::Retain => Quote::zero(),
        LiquidationRemainder::RefundTrader => equity.saturating_sub(liquidator_fee).max_zero(),
    };

    LiquidationSplit {
        liquidator_fee,
        trader_refund,
    }
}

/// Price at which equity equals the maintenance requirement.
///
/// Longs become liquidatable strictly below it, shorts strictly above it. Ignores the
/// sub-unit truncation applied to pnl, so treat it as an estimate. `None` when the
/// boundary is at or below zero (a long that no positive price can liquidate) or out of
/// Decimal's range.
pub fn estimated_liquidation_price(
    direction: Direction,
    entry_price: Price,
    margin: Quote,
    funding_owed: Quote,
    size: Quote,
    maintenance_margin: Bps,
) -> Option<Price> {
    if size.is_zero() {
        return None;
    }

    let mm = maintenance_requirement(size, maintenance_margin);
    // equity shortfall per unit of size at entry: (mm + funding - margin) / size
    let shortfall = mm.checked_add(funding_owed)?.checked_sub(margin)?;
    let buffer = shortfall.value().checked_div(size.value())?;

    let move_factor = match direction {
        Direction::Long => Decimal::ONE.checked_add(buffer)?,
        Direction::Short => Decimal::ONE.checked_sub(buffer)?,
    };

    Price::new(entry_price.value().checked_mul(move_factor)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pnl::{is_liquidatable, remaining_equity, unrealized_pnl};
    use rust_decimal_macros::dec;

    fn q(value: Decimal) -> Quote {
        Quote::new(value)
    }

    #[test]
    fn liquidator_gets_three_percent_of_margin() {
        let fee = liquidator_fee(q(dec!(100)), Bps::new(300), 6);
        assert_eq!(fee.value(), dec!(3));
    }

    #[test]
    fn retain_policy_refunds_nothing() {
        let split = split_liquidation(
            q(dec!(100)),
            q(dec!(40)),
            Bps::new(300),
            LiquidationRemainder::Retain,
            6,
        );
        assert_eq!(split.liquidator_fee.value(), dec!(3));
        assert!(split.trader_refund.is_zero());
    }

    #[test]
    fn refund_policy_returns_leftover_equity() {
        // equity 40, minus 3 to the liquidator
        let split = split_liquidation(
            q(dec!(100)),
            q(dec!(40)),
            Bps::new(300),
            LiquidationRemainder::RefundTrader,
            6,
        );
        assert_eq!(split.trader_refund.value(), dec!(37));
    }

    #[test]
    fn refund_never_negative() {
        let split = split_liquidation(
            q(dec!(100)),
            q(dec!(-100)),
            Bps::new(300),
            LiquidationRemainder::RefundTrader,
            6,
        );
        assert!(split.trader_refund.is_zero());
    }

    #[test]
    fn long_liquidation_price() {
        // margin 100, size 1000, mm 5% -> boundary at entry * (1 + (50 - 100)/1000) = 950
        let price = estimated_liquidation_price(
            Direction::Long,
            Price::new_unchecked(dec!(1000)),
            q(dec!(100)),
            Quote::zero(),
            q(dec!(1000)),
            Bps::new(500),
        )
        .unwrap();
        assert_eq!(price.value(), dec!(950));

        let entry = Price::new_unchecked(dec!(1000));
        let equity_at = |current: Price| {
            let pnl = unrealized_pnl(Direction::Long, entry, current, q(dec!(1000)), 6).unwrap();
            remaining_equity(q(dec!(100)), pnl, Quote::zero()).unwrap()
        };
        assert!(is_liquidatable(equity_at(Price::new_unchecked(dec!(949))), q(dec!(1000)), Bps::new(500)));
        assert!(!is_liquidatable(equity_at(price), q(dec!(1000)), Bps::new(500)));
    }

    #[test]
    fn short_liquidation_price() {
        let price = estimated_liquidation_price(
            Direction::Short,
            Price::new_unchecked(dec!(1000)),
            q(dec!(100)),
            Quote::zero(),
            q(dec!(1000)),
            Bps::new(500),
        )
        .unwrap();
        assert_eq!(price.value(), dec!(1050));
    }

    #[test]
    fn unlevered_long_has_no_liquidation_price() {
        // 1x long with 5% maintenance: boundary at 1000 * (1 + (5 - 100)/100) = 50
        let price = estimated_liquidation_price(
            Direction::Long,
            Price::new_unchecked(dec!(1000)),
            q(dec!(100)),
            Quote::zero(),
            q(dec!(100)),
            Bps::new(500),
        );
        assert_eq!(price.map(|p| p.value()), Some(dec!(50)));

        // no maintenance at all would put it at zero
        let price = estimated_liquidation_price(
            Direction::Long,
            Price::new_unchecked(dec!(1000)),
            q(dec!(100)),
            Quote::zero(),
            q(dec!(100)),
            Bps::new(0),
        );
        assert!(price.is_none());
    }

    #[test]
    fn liquidation_price_out_of_range_is_none() {
        let price = estimated_liquidation_price(
            Direction::Short,
            Price::new_unchecked(dec!(70_000_000_000_000_000_000_000_000_000)),
            q(dec!(100)),
            Quote::zero(),
            q(dec!(150)),
            Bps::new(500),
        );
        assert!(price.is_none());
    }
}
