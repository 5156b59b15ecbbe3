// 8.0 ledger/core.rs: the ledger itself. owns markets, positions, the event log and both
// collaborators. every mutating entry point lives in a sibling file as another impl block.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::info;

use super::guard::EntryLock;
use super::results::LedgerError;
use crate::config::{ChainConfig, LedgerConfig};
use crate::custody::CollateralCustody;
use crate::events::{Event, EventLog, EventPayload};
use crate::funding::FundingAccrualEngine;
use crate::market::Market;
use crate::oracle::{fetch_price, PricingAdapter};
use crate::pnl::remaining_equity;
use crate::position::Position;
use crate::registry::MarketRegistry;
use crate::types::{AccountId, MarketId, PositionId, Price, Quote, Timestamp};

/** 8.1: all ledger state lives here */
#[derive(Debug)]
pub struct PositionLedger<P, C> {
    pub(super) chain: ChainConfig,
    pub(super) config: LedgerConfig,
    pub(super) registry: MarketRegistry,
    pub(super) funding: FundingAccrualEngine,
    pub(super) positions: HashMap<PositionId, Position>,
    pub(super) trader_index: HashMap<AccountId, Vec<PositionId>>,
    pub(super) events: EventLog,
    // only advanced when an open commits
    pub(super) next_position_id: u64,
    pub(super) current_time: Timestamp,
    pub(super) paused: bool,
    pub(super) lock: EntryLock,
    pub(super) pricing: P,
    pub(super) custody: C,
}

/// Everything a position's exit needs, evaluated at one price.
#[derive(Debug, Clone, Copy)]
pub(super) struct Valuation {
    pub price: Price,
    pub pnl: Quote,
    pub funding: Quote,
    pub equity: Quote,
}

impl<P: PricingAdapter, C: CollateralCustody> PositionLedger<P, C> {
    pub fn new(
        chain: ChainConfig,
        config: LedgerConfig,
        pricing: P,
        custody: C,
    ) -> Result<Self, LedgerError> {
        chain.validate()?;

        Ok(Self {
            registry: MarketRegistry::new(chain.max_leverage),
            funding: FundingAccrualEngine::new(chain.funding.clone()),
            events: EventLog::new(config.max_events),
            chain,
            config,
            positions: HashMap::new(),
            trader_index: HashMap::new(),
            next_position_id: 1,
            current_time: Timestamp::from_millis(0),
            paused: false,
            lock: EntryLock::new(),
            pricing,
            custody,
        })
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = self.current_time.plus_millis(millis);
    }

    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    pub fn registry(&self) -> &MarketRegistry {
        &self.registry
    }

    pub fn pricing(&self) -> &P {
        &self.pricing
    }

    pub fn pricing_mut(&mut self) -> &mut P {
        &mut self.pricing
    }

    pub fn custody(&self) -> &C {
        &self.custody
    }

    pub fn custody_mut(&mut self) -> &mut C {
        &mut self.custody
    }

    /// Clone of the entry lock, for collaborators that may call back into the ledger.
    pub fn entry_lock(&self) -> EntryLock {
        self.lock.clone()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    // blocks open/close/liquidate/funding. admin calls keep working
    pub fn set_paused(&mut self, paused: bool) -> Result<(), LedgerError> {
        let _guard = self.lock.try_enter()?;
        if self.paused != paused {
            info!(paused, "ledger pause state changed");
        }
        self.paused = paused;
        Ok(())
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        self.events.recent(count)
    }

    pub(super) fn ensure_running(&self) -> Result<(), LedgerError> {
        if self.paused {
            return Err(LedgerError::Paused);
        }
        Ok(())
    }

    pub(super) fn market_or_err(&self, market_id: MarketId) -> Result<&Market, LedgerError> {
        self.registry
            .get(market_id)
            .ok_or_else(|| crate::market::MarketError::NotFound(market_id).into())
    }

    pub(super) fn position_or_err(&self, id: PositionId) -> Result<&Position, LedgerError> {
        self.positions.get(&id).ok_or(LedgerError::PositionNotFound(id))
    }

    pub(super) fn oracle_price(&self, market: &Market) -> Result<Price, LedgerError> {
        Ok(fetch_price(&self.pricing, &market.oracle)?)
    }

    // pnl, funding and equity for a position at the market's current oracle price and index
    pub(super) fn value_position(&self, position: &Position) -> Result<Valuation, LedgerError> {
        let market = self.market_or_err(position.market_id)?;
        let price = self.oracle_price(market)?;
        Self::valuation_at(
            position,
            price,
            market.cumulative_funding_index,
            self.chain.funding.index_scale,
            self.chain.quote_decimals,
        )
        .ok_or(LedgerError::ArithmeticOverflow(position.id))
    }

    pub(super) fn valuation_at(
        position: &Position,
        price: Price,
        index: Decimal,
        index_scale: Decimal,
        decimals: u32,
    ) -> Option<Valuation> {
        let pnl = position.unrealized_pnl(price, decimals)?;
        let funding = position.funding_owed(index, index_scale, decimals)?;
        let equity = remaining_equity(position.margin, pnl, funding)?;
        Some(Valuation {
            price,
            pnl,
            funding,
            equity,
        })
    }

    // drops the position from the table, the trader index and the market's open interest
    pub(super) fn remove_position(&mut self, id: PositionId) -> Result<Position, LedgerError> {
        let position = self
            .positions
            .remove(&id)
            .ok_or(LedgerError::PositionNotFound(id))?;

        if let Some(ids) = self.trader_index.get_mut(&position.trader) {
            if let Some(slot) = ids.iter().position(|p| *p == id) {
                ids.swap_remove(slot);
            }
            if ids.is_empty() {
                self.trader_index.remove(&position.trader);
            }
        }

        self.registry
            .remove_open_interest(position.market_id, position.direction, position.size)?;
        Ok(position)
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let timestamp = self.current_time;
        if self.config.verbose {
            info!(time = timestamp.as_millis(), event = ?payload, "ledger event");
        }
        self.events.record(timestamp, payload);
    }
}
