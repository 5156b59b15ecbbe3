// 4.0 position.rs: an open position. created whole by open(), destroyed whole by close()
// or liquidate(). never edited in between: pnl and funding are recomputed from the
// stored entry price and index snapshot every time they are needed.
// valuations are None when the numbers leave Decimal's range.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pnl::{funding_settlement, unrealized_pnl};
use crate::types::{AccountId, Bps, Direction, MarketId, PositionId, Price, Quote, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub trader: AccountId,
    pub market_id: MarketId,
    pub direction: Direction,
    // margin * leverage, fixed for life
    pub size: Quote,
    pub margin: Quote,
    pub leverage: u16,
    pub entry_price: Price,
    pub entry_funding_index: Decimal,
    pub opened_at: Timestamp,
}

impl Position {
    pub fn unrealized_pnl(&self, current_price: Price, decimals: u32) -> Option<Quote> {
        unrealized_pnl(self.direction, self.entry_price, current_price, self.size, decimals)
    }

    // positive = owed by this position
    pub fn funding_owed(&self, current_index: Decimal, index_scale: Decimal, decimals: u32) -> Option<Quote> {
        funding_settlement(
            self.direction,
            self.entry_funding_index,
            current_index,
            self.size,
            index_scale,
            decimals,
        )
    }
}

/// Position snapshot with everything recomputed at the current price and index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionView {
    pub position: Position,
    pub current_price: Price,
    pub unrealized_pnl: Quote,
    pub funding_owed: Quote,
    pub equity: Quote,
    pub maintenance_margin: Bps,
    pub liquidatable: bool,
    pub estimated_liquidation_price: Option<Price>,
}
