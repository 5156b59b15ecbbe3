// 8.0: the position ledger. the only thing that creates, settles or removes positions.
// coordinates the registry, funding engine, pnl math and the two collaborators
// (pricing, custody). deterministic; time only moves when the caller moves it.

mod core;
mod funding;
mod guard;
mod liquidations;
mod markets;
mod positions;
mod queries;
mod results;

pub use core::PositionLedger;
pub use guard::{EntryGuard, EntryLock};
pub use results::{CloseResult, ErrorKind, LedgerError, LiquidationResult, OpenRequest};
