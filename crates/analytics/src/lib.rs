//! Hermes Analytics
//!
//! The feedback half of the engine:
//!
//! - [`FillRateMonitor`]: sliding-window maker fill rate per confidence
//!   band with health classification; critical state recommends a
//!   classifier recalibration (it never halts trading by itself)
//! - [`PnlAttributor`]: per-fill decomposition into alpha, fee, slippage,
//!   impact, and rebate, with a rolling alpha-share health signal

pub mod attribution;
pub mod fill_rate;

pub use attribution::{AttributionReport, AttributorConfig, PnlAttributor};
pub use fill_rate::{FillRateConfig, FillRateMonitor, Health};
