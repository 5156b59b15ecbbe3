// 4.0 pnl.rs: all the money math, no state. every other module calls into here.
//
// every quotient is truncated toward zero at the collateral token's precision, the same
// thing an integer division in base units does on chain. for a positive result that is
// a small downward bias (at most one base unit); for a negative result it rounds toward
// zero. the bias is consistent across open/close/liquidate because everything goes
// through these functions.
//
// products of a size with a price move or an index move can leave Decimal's range for
// extreme inputs. those return None and the caller turns it into an error.

use rust_decimal::Decimal;

use crate::types::{Bps, Direction, Price, Quote};

// 4.1: (current - entry) for longs, (entry - current) for shorts, over entry, times size
pub fn unrealized_pnl(
    direction: Direction,
    entry_price: Price,
    current_price: Price,
    size: Quote,
    decimals: u32,
) -> Option<Quote> {
    let delta = current_price.value().checked_sub(entry_price.value())?;
    let pnl = (direction.sign() * delta)
        .checked_mul(size.value())?
        .checked_div(entry_price.value())?;
    Some(Quote::new(pnl).truncate(decimals))
}

// 4.2: what the position owes (positive) or is owed (negative) since entry.
// index up = longs pay, shorts receive.
pub fn funding_settlement(
    direction: Direction,
    entry_index: Decimal,
    current_index: Decimal,
    size: Quote,
    index_scale: Decimal,
    decimals: u32,
) -> Option<Quote> {
    if entry_index == current_index || index_scale.is_zero() {
        return Some(Quote::zero());
    }
    let moved = current_index.checked_sub(entry_index)?;
    let owed = (direction.sign() * moved)
        .checked_mul(size.value())?
        .checked_div(index_scale)?;
    Some(Quote::new(owed).truncate(decimals))
}

// 4.3: size * bps / 10000, rounded down
pub fn trading_fee(size: Quote, fee_rate: Bps, decimals: u32) -> Quote {
    fee_rate.apply(size, decimals)
}

// margin + pnl - funding
pub fn remaining_equity(margin: Quote, pnl: Quote, funding: Quote) -> Option<Quote> {
    margin.checked_add(pnl)?.checked_sub(funding)
}

pub fn maintenance_requirement(size: Quote, maintenance_margin: Bps) -> Quote {
    Quote::new(size.value() * maintenance_margin.as_fraction())
}

// 4.4: equity strictly below maintenance
pub fn is_liquidatable(equity: Quote, size: Quote, maintenance_margin: Bps) -> bool {
    equity < maintenance_requirement(size, maintenance_margin)
}

// 4.5: what the trader gets back on a voluntary close. losses past margin are eaten.
pub fn close_payout(equity: Quote, fee: Quote) -> Quote {
    equity.saturating_sub(fee).max_zero()
}
