//! Hermes Market Data
//!
//! Rebuilds per-symbol L2 order books from the adapter's streaming feed and
//! publishes immutable snapshots downstream:
//!
//! - [`OrderBook`]: top-N book from snapshot + incremental updates, with a
//!   crossed-book stale latch
//! - [`TradeTape`]: bounded ring of recent trade prints
//! - [`MarketDataHub`]: demultiplexes the stream, applies updates in feed
//!   order, coalesces publication, and drives snapshot resyncs and
//!   reconnects

pub mod book;
pub mod hub;
pub mod tape;

pub use book::{ApplyOutcome, OrderBook};
pub use hub::{HubConfig, MarketDataHub, SnapshotReceiver};
pub use tape::TradeTape;
