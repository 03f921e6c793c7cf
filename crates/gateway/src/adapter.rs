//! The exchange adapter contract.
//!
//! The engine consumes the venue through this trait only. The live
//! implementation (websocket + signed REST) lives outside the core; tests
//! and dry runs use [`crate::SimAdapter`].

use async_trait::async_trait;
use hermes_core::{OrderId, Symbol};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::messages::market_data::MarketEvent;
use crate::messages::order::{FillEvent, OrderAck, OrderRequest, OrderState};

/// Venue access: one streaming subscription plus an idempotent REST
/// surface.
///
/// Contract:
/// - `subscribe` yields a stream that starts with a `Snapshot` per symbol
///   and preserves feed order within a symbol.
/// - `request_snapshot` makes the stream emit a fresh `Snapshot` for the
///   symbol (used on crossed-book resync).
/// - REST calls are idempotent on the request's client nonce; callers wrap
///   them in their own timeouts and reconcile with `get_order`.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// Open (or reopen) the market data stream for `symbols`.
    async fn subscribe(&self, symbols: &[Symbol]) -> Result<mpsc::Receiver<MarketEvent>>;

    /// Ask the venue to emit a fresh book snapshot for `symbol`.
    async fn request_snapshot(&self, symbol: &str) -> Result<()>;

    /// Submit an order.
    async fn place_order(&self, request: OrderRequest) -> Result<OrderAck>;

    /// Request cancellation of a working order.
    async fn cancel_order(&self, order_id: OrderId) -> Result<()>;

    /// Current state of an order.
    async fn get_order(&self, order_id: OrderId) -> Result<OrderState>;

    /// All fills recorded for an order so far.
    async fn get_fills(&self, order_id: OrderId) -> Result<Vec<FillEvent>>;
}
