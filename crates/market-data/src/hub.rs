//! Market data hub.
//!
//! Owns the adapter's streaming subscription. Demultiplexes events by
//! symbol, applies them to the per-symbol [`OrderBook`] and [`TradeTape`]
//! in feed order, and publishes coalesced [`MarketSnapshot`]s through
//! per-symbol `watch` channels (downstream always reads the latest view,
//! non-blocking).
//!
//! Failure handling: a crossed book triggers a snapshot resync request; a
//! dropped stream reconnects with exponential backoff and full resync.
//! Persistent cross-after-resync escalates through the configured handler
//! (wired to the risk halt latch by the runner).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hermes_core::{CancelToken, Clock, MarketSnapshot, Symbol, Trade};
use hermes_gateway::{ExchangeAdapter, MarketEvent};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::book::{ApplyOutcome, OrderBook};
use crate::tape::TradeTape;

/// Latest-snapshot receiver handed to a trading loop.
pub type SnapshotReceiver = watch::Receiver<Option<Arc<MarketSnapshot>>>;

/// Handler invoked when book inconsistency persists across resyncs.
pub type EscalationHandler = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct HubConfig {
    pub symbols: Vec<Symbol>,
    /// Top-N depth maintained per side
    pub book_depth: usize,
    /// Minimum interval between published ticks per symbol
    pub coalesce: Duration,
    /// Trade tape window in milliseconds
    pub trade_window_ms: i64,
    /// Trade tape capacity
    pub trade_capacity: usize,
    /// Consecutive failed resyncs before escalation
    pub max_resyncs: u32,
    /// Reconnect backoff base / cap
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            book_depth: 10,
            coalesce: Duration::from_millis(1),
            trade_window_ms: 100,
            trade_capacity: 1024,
            max_resyncs: 3,
            backoff_base: Duration::from_millis(250),
            backoff_max: Duration::from_secs(10),
        }
    }
}

struct SymbolState {
    book: OrderBook,
    tape: TradeTape,
    publisher: watch::Sender<Option<Arc<MarketSnapshot>>>,
    last_publish: Option<DateTime<Utc>>,
    consecutive_resyncs: u32,
}

/// Multiplexes the exchange stream into per-symbol books and trade tapes.
pub struct MarketDataHub {
    adapter: Arc<dyn ExchangeAdapter>,
    clock: Arc<dyn Clock>,
    config: HubConfig,
    symbols: HashMap<Symbol, SymbolState>,
    escalation: Option<EscalationHandler>,
}

impl MarketDataHub {
    pub fn new(adapter: Arc<dyn ExchangeAdapter>, clock: Arc<dyn Clock>, config: HubConfig) -> Self {
        let symbols = config
            .symbols
            .iter()
            .map(|symbol| {
                let (tx, _) = watch::channel(None);
                (
                    symbol.clone(),
                    SymbolState {
                        book: OrderBook::new(symbol.clone(), config.book_depth),
                        tape: TradeTape::new(config.trade_window_ms, config.trade_capacity),
                        publisher: tx,
                        last_publish: None,
                        consecutive_resyncs: 0,
                    },
                )
            })
            .collect();
        Self {
            adapter,
            clock,
            config,
            symbols,
            escalation: None,
        }
    }

    /// Install the handler called when inconsistency persists across
    /// `max_resyncs` snapshot requests.
    pub fn set_escalation_handler(&mut self, handler: EscalationHandler) {
        self.escalation = Some(handler);
    }

    /// Receiver of the latest snapshot for `symbol`.
    pub fn snapshots(&self, symbol: &str) -> Option<SnapshotReceiver> {
        self.symbols.get(symbol).map(|s| s.publisher.subscribe())
    }

    /// Run until cancelled: subscribe, pump, reconnect with backoff.
    pub async fn run(mut self, cancel: CancelToken) {
        let mut attempt: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                break;
            }
            match self.adapter.subscribe(&self.config.symbols).await {
                Ok(rx) => {
                    info!(symbols = ?self.config.symbols, "market data stream connected");
                    attempt = 0;
                    self.pump(rx, &cancel).await;
                    if cancel.is_cancelled() {
                        break;
                    }
                    warn!("market data stream ended, reconnecting");
                }
                Err(e) => {
                    error!(error = %e, "market data subscribe failed");
                }
            }

            // Exponential backoff before the next subscribe attempt.
            let backoff = self
                .config
                .backoff_base
                .saturating_mul(2u32.saturating_pow(attempt))
                .min(self.config.backoff_max);
            attempt = attempt.saturating_add(1);
            debug!(?backoff, attempt, "reconnect backoff");
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(backoff) => {}
            }
        }
        info!("market data hub stopped");
    }

    async fn pump(&mut self, mut rx: mpsc::Receiver<MarketEvent>, cancel: &CancelToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                event = rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event).await,
                        None => return,
                    }
                }
            }
        }
    }

    async fn handle_event(&mut self, event: MarketEvent) {
        let symbol = event.symbol().to_string();
        let Some(state) = self.symbols.get_mut(&symbol) else {
            debug!(%symbol, "event for unsubscribed symbol dropped");
            return;
        };

        match event {
            MarketEvent::L2(update) => {
                let was_snapshot = update.is_snapshot();
                match state.book.apply(&update) {
                    ApplyOutcome::Applied => {
                        if was_snapshot && state.consecutive_resyncs > 0 {
                            info!(%symbol, "book resynced");
                        }
                        state.consecutive_resyncs = 0;
                    }
                    ApplyOutcome::Crossed => {
                        state.consecutive_resyncs += 1;
                        if state.consecutive_resyncs > self.config.max_resyncs {
                            error!(
                                target: hermes_core::AUDIT_TARGET,
                                %symbol,
                                resyncs = state.consecutive_resyncs,
                                "book inconsistency persists, escalating"
                            );
                            if let Some(handler) = &self.escalation {
                                handler(&symbol);
                            }
                        } else if let Err(e) = self.adapter.request_snapshot(&symbol).await {
                            warn!(%symbol, error = %e, "snapshot request failed");
                        }
                        return;
                    }
                    ApplyOutcome::IgnoredStale => return,
                }
            }
            MarketEvent::Trade(trade) => {
                state.tape.push(Trade::new(
                    trade.symbol.clone(),
                    trade.timestamp,
                    trade.side,
                    trade.price,
                    trade.size,
                ));
            }
        }

        Self::publish(state, &*self.clock, self.config.coalesce);
    }

    /// Publish the latest snapshot, at most once per coalescing interval.
    fn publish(state: &mut SymbolState, clock: &dyn Clock, coalesce: Duration) {
        let now = clock.now();
        if let Some(last) = state.last_publish {
            let elapsed = (now - last).num_microseconds().unwrap_or(i64::MAX);
            if elapsed >= 0 && (elapsed as u128) < coalesce.as_micros() {
                return;
            }
        }
        if let Some(snapshot) = state.book.snapshot(state.tape.recent(now)) {
            state.last_publish = Some(now);
            let _ = state.publisher.send(Some(Arc::new(snapshot)));
        }
    }
}
