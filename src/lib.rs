// perps-ledger: accounting core for a perpetual-contract venue.
// isolated-margin positions against an oracle price, per-market funding index,
// permissionless liquidation. custody and pricing sit behind traits.
// all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: MarketId, PositionId, Direction, Price, Quote, Bps
//   4.x  pnl.rs: pnl, funding settlement, fees, liquidation test (pure)
//   4.0  position.rs: position record + live view
//   5.x  funding.rs: imbalance rate, rate-limited index advance
//   6.x  liquidation.rs: liquidator fee, remainder split, liq price estimate
//   7.x  config.rs: fees, caps, funding params, chain presets
//   8.x  ledger/: position ledger: open, close, liquidate, funding, admin, queries
//   9.0  oracle.rs: PricingAdapter seam + static feed
//   9.2  custody.rs: CollateralCustody seam + in-memory vault
//   11.x events.rs: state transition events for audit
//   12.x market.rs: market params + runtime state
//   12.x registry.rs: market registry

pub mod config;
pub mod custody;
pub mod events;
pub mod funding;
pub mod ledger;
pub mod liquidation;
pub mod market;
pub mod oracle;
pub mod pnl;
pub mod position;
pub mod registry;
pub mod types;

// re exports for convenience
pub use config::{ChainConfig, ChainProfile, ConfigError, FundingParams, LedgerConfig, LiquidationRemainder};
pub use custody::{CollateralCustody, CustodyError, InMemoryCustody};
pub use events::*;
pub use funding::{calculate_funding_rate, FundingAccrualEngine, FundingError, FundingUpdate};
pub use ledger::*;
pub use market::{Market, MarketError, MarketUpdate, NewMarket};
pub use oracle::{OracleError, PricingAdapter, StaticPriceFeed};
pub use position::{Position, PositionView};
pub use registry::MarketRegistry;
pub use types::*;
