//! Hermes Gateway
//!
//! The seam between the engine core and the exchange. Provides:
//! - Wire message types for market data and orders
//! - The [`ExchangeAdapter`] trait the core consumes (streaming + REST)
//! - [`SimAdapter`], an in-memory venue used by tests and `--dry-run`
//!
//! ```text
//! External venue (or SimAdapter)
//!         │ stream: L2 updates, trades, snapshots
//!    ┌────▼─────────┐
//!    │ExchangeAdapter│ place / cancel / get_order / get_fills
//!    └────┬─────────┘
//!         │ mpsc<MarketEvent>
//!    MarketDataHub → books → signals → executors
//! ```
//!
//! The live wire adapter (REST + streaming client) is an external
//! collaborator; the engine only depends on the trait defined here.

pub mod adapter;
pub mod error;
pub mod messages;
pub mod simulator;

pub use adapter::ExchangeAdapter;
pub use error::{GatewayError, Result};
pub use messages::{
    market_data::{BookLevel, L2Update, MarketEvent, TradeMessage},
    order::{FillEvent, OrderAck, OrderRequest, OrderState},
};
pub use simulator::{SimAdapter, SimBehavior};
