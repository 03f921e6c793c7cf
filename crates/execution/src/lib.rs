//! Hermes Execution
//!
//! The maker/taker execution layer:
//!
//! - [`SlippageEstimator`]: book-walk pre-trade estimates plus a rolling
//!   (symbol, side) history of realized slippage
//! - [`CostEstimator`]: pre-trade fee/slippage/impact decomposition and
//!   post-trade actualization with drift statistics
//! - [`ShallowMakerExecutor`]: passive limit one tick inside the touch,
//!   deadline-bounded, cancel on timeout
//! - [`IocExecutor`]: immediate-or-cancel crossing the spread
//! - [`HybridExecutor`]: per-signal routing between them with a fallback
//!   state machine and per-symbol coalescing

pub mod cost;
pub mod error;
pub mod hybrid;
pub mod ioc;
pub mod shallow_maker;
pub mod slippage;

pub use cost::{AccuracyReport, CostActual, CostEstimate, CostEstimator, CostEstimatorConfig};
pub use error::{ExecutionError, Result};
pub use hybrid::{AttemptOutcome, ExecutionReport, HybridConfig, HybridExecutor, HybridStats};
pub use ioc::{IocConfig, IocExecutor};
pub use shallow_maker::{MakerAttempt, MakerConfig, ShallowMakerExecutor};
pub use slippage::{BookWalk, SlippageConfig, SlippageEstimator};

use hermes_core::Order;
use hermes_gateway::FillEvent;

/// A terminal order together with the fills it produced.
#[derive(Debug, Clone)]
pub struct ExecutedOrder {
    pub order: Order,
    pub fills: Vec<FillEvent>,
    /// Reference price at submission (best opposite quote), used for
    /// slippage actualization.
    pub reference_price: rust_decimal::Decimal,
}
