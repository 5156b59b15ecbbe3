// 11.0: every committed state change produces an event. used for audit trails and for
// notifying whatever sits outside the core. EventPayload lists all of them.
// events are only recorded after an operation commits, so a failed call leaves no trace here.

use crate::types::{AccountId, Direction, MarketId, OracleRef, PositionId, Price, Quote, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    // Market events
    MarketAdded(MarketAddedEvent),
    MarketUpdated(MarketUpdatedEvent),

    // Position events
    PositionOpened(PositionOpenedEvent),
    PositionClosed(PositionClosedEvent),
    PositionLiquidated(PositionLiquidatedEvent),

    // Funding events
    FundingUpdated(FundingUpdatedEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAddedEvent {
    pub id: MarketId,
    pub oracle: OracleRef,
    pub max_leverage: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketUpdatedEvent {
    pub id: MarketId,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionOpenedEvent {
    pub id: PositionId,
    pub trader: AccountId,
    pub market_id: MarketId,
    pub direction: Direction,
    pub size: Quote,
    pub margin: Quote,
    pub entry_price: Price,
    pub leverage: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionClosedEvent {
    pub id: PositionId,
    pub trader: AccountId,
    pub exit_price: Price,
    pub pnl: Quote,
    pub fee: Quote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionLiquidatedEvent {
    pub id: PositionId,
    pub trader: AccountId,
    pub liquidator: AccountId,
    pub price: Price,
    pub fee: Quote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingUpdatedEvent {
    pub market_id: MarketId,
    pub rate: Decimal,
    pub new_index: Decimal,
}

/// Append-only event log that drops its oldest entries past `capacity`.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: Vec<Event>,
    next_id: u64,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Vec::new(),
            next_id: 1,
            capacity,
        }
    }

    // ids keep counting even after old entries are dropped
    pub fn record(&mut self, timestamp: Timestamp, payload: EventPayload) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        self.events.push(Event::new(id, timestamp, payload));

        if self.events.len() > self.capacity {
            let drain_count = self.events.len() - self.capacity;
            self.events.drain(0..drain_count);
        }
        id
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn recent(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
