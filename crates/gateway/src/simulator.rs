//! In-memory simulated venue.
//!
//! Used by the integration tests and by `--dry-run`: accepts orders,
//! produces fills according to a scripted [`SimBehavior`], and replays
//! injected market events on the subscription stream. Fill timing uses the
//! tokio clock, so tests can pause and advance time deterministically.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use hermes_core::{Level, OrderId, OrderKind, OrderStatus, Symbol};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{GatewayError, Result};
use crate::messages::market_data::{L2Update, MarketEvent};
use crate::messages::order::{FillEvent, OrderAck, OrderRequest, OrderState};

/// How the simulated venue treats incoming orders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimBehavior {
    /// Fill the full size at the request price after `delay`.
    FillAfter(Duration),
    /// Fill `fraction` (0..=1) of the size after `delay`; the remainder
    /// never fills.
    PartialFillAfter { delay: Duration, fraction: Decimal },
    /// Leave the order resting forever (maker timeout path).
    NeverFill,
    /// Reject post-only orders as would-take; others rest unfilled.
    RejectPostOnly,
}

struct SimOrder {
    request: OrderRequest,
    status: OrderStatus,
    filled_size: Decimal,
    avg_fill_price: Option<Decimal>,
    fills: Vec<FillEvent>,
    submitted_at: Instant,
    behavior: SimBehavior,
}

struct SimState {
    behavior: SimBehavior,
    orders: HashMap<OrderId, SimOrder>,
    books: HashMap<Symbol, (Vec<Level>, Vec<Level>)>,
    events_tx: Option<mpsc::Sender<MarketEvent>>,
    maker_fee_bps: Decimal,
    taker_fee_bps: Decimal,
}

/// Scripted in-memory venue implementing [`crate::ExchangeAdapter`].
#[derive(Clone)]
pub struct SimAdapter {
    state: Arc<Mutex<SimState>>,
}

impl SimAdapter {
    pub fn new(behavior: SimBehavior) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                behavior,
                orders: HashMap::new(),
                books: HashMap::new(),
                events_tx: None,
                maker_fee_bps: Decimal::new(15, 1),
                taker_fee_bps: Decimal::new(45, 1),
            })),
        }
    }

    /// Change the behavior applied to subsequently placed orders.
    pub fn set_behavior(&self, behavior: SimBehavior) {
        self.state.lock().behavior = behavior;
    }

    /// Seed the book replayed on `request_snapshot`.
    pub fn set_book(&self, symbol: impl Into<Symbol>, bids: Vec<Level>, asks: Vec<Level>) {
        self.state.lock().books.insert(symbol.into(), (bids, asks));
    }

    /// Inject a market event into the subscription stream.
    pub async fn push_event(&self, event: MarketEvent) -> Result<()> {
        let tx = self
            .state
            .lock()
            .events_tx
            .clone()
            .ok_or(GatewayError::Disconnected)?;
        tx.send(event).await.map_err(|_| GatewayError::Disconnected)
    }

    /// Advance an order's scripted lifecycle based on elapsed tokio time.
    fn settle(order: &mut SimOrder, maker_fee_bps: Decimal, taker_fee_bps: Decimal) {
        if order.status.is_terminal() {
            return;
        }
        let elapsed = order.submitted_at.elapsed();
        let (delay, fraction) = match order.behavior {
            SimBehavior::FillAfter(delay) => (delay, Decimal::ONE),
            SimBehavior::PartialFillAfter { delay, fraction } => (delay, fraction),
            SimBehavior::NeverFill | SimBehavior::RejectPostOnly => return,
        };
        if elapsed < delay || !order.fills.is_empty() {
            return;
        }

        let size = order.request.size * fraction;
        if size.is_zero() {
            return;
        }
        let price = order.request.price;
        let fee_bps = match order.request.kind {
            OrderKind::Limit => maker_fee_bps,
            OrderKind::Ioc => taker_fee_bps,
        };
        let fee = price * size * fee_bps / Decimal::from(10_000);

        order.fills.push(FillEvent {
            order_id: order.request.order_id,
            seq: 0,
            price,
            size,
            fee,
            timestamp: Utc::now(),
        });
        order.filled_size = size;
        order.avg_fill_price = Some(price);
        order.status = if size >= order.request.size {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
    }
}

#[async_trait::async_trait]
impl crate::adapter::ExchangeAdapter for SimAdapter {
    async fn subscribe(&self, symbols: &[Symbol]) -> Result<mpsc::Receiver<MarketEvent>> {
        let (tx, rx) = mpsc::channel(1024);
        let snapshots: Vec<MarketEvent> = {
            let mut state = self.state.lock();
            state.events_tx = Some(tx.clone());
            symbols
                .iter()
                .filter_map(|symbol| {
                    state.books.get(symbol).map(|(bids, asks)| {
                        MarketEvent::L2(L2Update::snapshot(
                            symbol.clone(),
                            bids.clone(),
                            asks.clone(),
                            Utc::now(),
                        ))
                    })
                })
                .collect()
        };
        for event in snapshots {
            tx.send(event).await.map_err(|_| GatewayError::Disconnected)?;
        }
        Ok(rx)
    }

    async fn request_snapshot(&self, symbol: &str) -> Result<()> {
        let (tx, snapshot) = {
            let state = self.state.lock();
            let tx = state.events_tx.clone().ok_or(GatewayError::Disconnected)?;
            let (bids, asks) = state
                .books
                .get(symbol)
                .cloned()
                .ok_or_else(|| GatewayError::UnknownSymbol(symbol.to_string()))?;
            (
                tx,
                MarketEvent::L2(L2Update::snapshot(symbol, bids, asks, Utc::now())),
            )
        };
        tx.send(snapshot).await.map_err(|_| GatewayError::Disconnected)
    }

    async fn place_order(&self, request: OrderRequest) -> Result<OrderAck> {
        let mut state = self.state.lock();
        let behavior = state.behavior;
        let now = Utc::now();

        // Idempotency on the client nonce.
        if let Some(existing) = state
            .orders
            .values()
            .find(|o| o.request.nonce == request.nonce)
        {
            return Ok(OrderAck::accepted(existing.request.order_id, now));
        }

        if behavior == SimBehavior::RejectPostOnly && request.post_only {
            debug!(order_id = %request.order_id, "sim rejecting post-only order");
            return Ok(OrderAck::rejected(request.order_id, "post-only would take", now));
        }

        let order_id = request.order_id;
        let ioc_unfilled = request.kind == OrderKind::Ioc
            && matches!(behavior, SimBehavior::NeverFill | SimBehavior::RejectPostOnly);
        let mut order = SimOrder {
            request,
            status: OrderStatus::Submitted,
            filled_size: Decimal::ZERO,
            avg_fill_price: None,
            fills: Vec::new(),
            submitted_at: Instant::now(),
            behavior,
        };
        // An IOC that cannot fill immediately cancels instead of resting.
        if ioc_unfilled {
            order.status = OrderStatus::Canceled;
        }
        state.orders.insert(order_id, order);
        Ok(OrderAck::accepted(order_id, now))
    }

    async fn cancel_order(&self, order_id: OrderId) -> Result<()> {
        let mut state = self.state.lock();
        let (maker, taker) = (state.maker_fee_bps, state.taker_fee_bps);
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or(GatewayError::UnknownOrder(order_id))?;
        Self::settle(order, maker, taker);
        if !order.status.is_terminal() {
            order.status = OrderStatus::Canceled;
        }
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<OrderState> {
        let mut state = self.state.lock();
        let (maker, taker) = (state.maker_fee_bps, state.taker_fee_bps);
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or(GatewayError::UnknownOrder(order_id))?;
        Self::settle(order, maker, taker);
        Ok(OrderState {
            order_id,
            status: order.status,
            filled_size: order.filled_size,
            avg_fill_price: order.avg_fill_price,
            timestamp: Utc::now(),
        })
    }

    async fn get_fills(&self, order_id: OrderId) -> Result<Vec<FillEvent>> {
        let mut state = self.state.lock();
        let (maker, taker) = (state.maker_fee_bps, state.taker_fee_bps);
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or(GatewayError::UnknownOrder(order_id))?;
        Self::settle(order, maker, taker);
        Ok(order.fills.clone())
    }
}
