//! Hermes Risk
//!
//! Hard-limit admission control and position accounting:
//!
//! - [`RiskGate`]: pre-validates every intended order against position and
//!   drawdown limits, tracks NAV and daily PnL, and owns the process-wide
//!   sticky halt latch
//! - [`PositionManager`]: per-symbol positions with exactly-once fill
//!   application (idempotent on order id + fill sequence)
//!
//! ```text
//! intent ──► RiskGate::allow ──► {approved | denied(reason)}
//! fill ────► PositionManager::apply_fill ──► realized PnL
//! PnL ─────► RiskGate::on_trade ──► may set halt latch (sticky)
//! ```

pub mod gate;
pub mod position;

pub use gate::{DenyReason, RiskConfig, RiskDecision, RiskGate, RiskStateSnapshot};
pub use position::{AppliedFill, PositionManager};
