//! Hermes Core
//!
//! Shared entities and value types for the Hermes trading engine:
//! orders, trades, positions, signal scores, and market snapshots. Every
//! monetary quantity is a `rust_decimal::Decimal`; floats appear only in
//! signal scalars and statistics.
//!
//! The crate also carries two small pieces of infrastructure used across
//! the workspace: the [`Clock`] abstraction (so executors and monitors are
//! deterministic under test) and the [`CancelToken`] observed at every
//! suspension point.

pub mod cancel;
pub mod clock;
pub mod entities;
pub mod values;

pub use cancel::{CancelHandle, CancelToken};
pub use clock::{Clock, ManualClock, SystemClock};
pub use entities::{
    Attribution, Confidence, Fill, Level, MarketSnapshot, Order, OrderId, OrderKind, OrderStatus,
    Position, Side, SignalScore, Trade,
};
pub use values::{Price, Quantity, Symbol, Timestamp};

/// Event target used for audit-relevant records (terminal order events,
/// risk breaches, fallback decisions). An external sink can route on it.
pub const AUDIT_TARGET: &str = "audit";
