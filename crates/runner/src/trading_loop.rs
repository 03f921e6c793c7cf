//! Per-symbol trading loop.
//!
//! Single-threaded cooperative sequencer: read the latest snapshot
//! (non-blocking, skip if stale), compute and classify the signal, size
//! the intent, run the risk gate, hand off to the executor, and account
//! the outcome into positions, attribution, fill-rate, slippage, and cost
//! monitors. Strictly sequential per symbol; loops for different symbols
//! interleave freely.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hermes_analytics::{FillRateMonitor, PnlAttributor};
use hermes_core::{CancelToken, Clock, Fill, MarketSnapshot, OrderKind, Side, Symbol};
use hermes_execution::{
    CostEstimate, CostEstimator, ExecutedOrder, HybridExecutor, IocExecutor, SlippageEstimator,
};
use hermes_market_data::SnapshotReceiver;
use hermes_risk::{PositionManager, RiskDecision, RiskGate};
use hermes_signals::{SignalAggregator, SignalClassifier};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

/// How intents are executed.
pub enum ExecutionRouter {
    /// Maker-first with confidence-based IOC fallback
    Hybrid(Arc<HybridExecutor>),
    /// Taker-only: HIGH confidence crosses, everything else skips
    IocOnly(Arc<IocExecutor>),
}

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub symbol: Symbol,
    pub tick_size: Decimal,
    pub base_size: Decimal,
    /// Sizing coefficient: size = min(base, k * |value| * nav / mid)
    pub size_scale_k: Decimal,
    pub max_staleness_ms: i64,
    pub iteration_target: Duration,
}

/// Retained signal magnitudes for classifier recalibration.
const SIGNAL_HISTORY_CAPACITY: usize = 2000;

pub struct TradingLoop {
    config: LoopConfig,
    snapshots: SnapshotReceiver,
    aggregator: SignalAggregator,
    classifier: SignalClassifier,
    router: ExecutionRouter,
    gate: Arc<RiskGate>,
    positions: Arc<PositionManager>,
    fill_monitor: Arc<FillRateMonitor>,
    attributor: Arc<PnlAttributor>,
    cost: Arc<CostEstimator>,
    slippage: Arc<SlippageEstimator>,
    clock: Arc<dyn Clock>,
    signal_history: VecDeque<f64>,
}

impl TradingLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: LoopConfig,
        snapshots: SnapshotReceiver,
        aggregator: SignalAggregator,
        classifier: SignalClassifier,
        router: ExecutionRouter,
        gate: Arc<RiskGate>,
        positions: Arc<PositionManager>,
        fill_monitor: Arc<FillRateMonitor>,
        attributor: Arc<PnlAttributor>,
        cost: Arc<CostEstimator>,
        slippage: Arc<SlippageEstimator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            snapshots,
            aggregator,
            classifier,
            router,
            gate,
            positions,
            fill_monitor,
            attributor,
            cost,
            slippage,
            clock,
            signal_history: VecDeque::with_capacity(SIGNAL_HISTORY_CAPACITY),
        }
    }

    /// Run until cancelled or the snapshot source closes.
    pub async fn run(mut self, cancel: CancelToken) {
        info!(symbol = %self.config.symbol, "trading loop started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = self.snapshots.changed() => {
                    if changed.is_err() {
                        warn!(symbol = %self.config.symbol, "snapshot source closed");
                        break;
                    }
                }
            }

            let Some(snapshot) = self.snapshots.borrow_and_update().clone() else {
                continue;
            };

            let age_ms = (self.clock.now() - snapshot.timestamp).num_milliseconds();
            if age_ms > self.config.max_staleness_ms {
                debug!(symbol = %self.config.symbol, age_ms, "stale snapshot skipped");
                continue;
            }

            let started = Instant::now();
            self.process(&snapshot, &cancel).await;
            let elapsed = started.elapsed();
            if elapsed > self.config.iteration_target {
                warn!(
                    symbol = %self.config.symbol,
                    elapsed_ms = elapsed.as_millis() as u64,
                    target_ms = self.config.iteration_target.as_millis() as u64,
                    "iteration exceeded budget"
                );
            }
        }
        info!(symbol = %self.config.symbol, "trading loop stopped");
    }

    async fn process(&mut self, snapshot: &MarketSnapshot, cancel: &CancelToken) {
        let score = self.aggregator.aggregate(snapshot, self.clock.now());
        self.remember(score.value);
        self.maybe_recalibrate();

        let confidence = self.classifier.classify(score.value);
        let score = score.with_confidence(confidence);

        if !confidence.is_actionable() {
            debug!(symbol = %self.config.symbol, value = score.value, "low confidence, skipped");
            return;
        }
        let Some(side) = score.direction() else {
            return;
        };

        let size = self.size_intent(score.value, snapshot.mid_price);
        if size <= Decimal::ZERO {
            return;
        }

        let position = self.positions.position(&self.config.symbol);
        match self.gate.allow(side, size, snapshot, &position) {
            RiskDecision::Approved => {}
            RiskDecision::Denied { reason } => {
                info!(
                    symbol = %self.config.symbol,
                    code = reason.code(),
                    detail = %reason,
                    "intent denied by risk gate"
                );
                return;
            }
        }

        // Pre-trade estimates for both legs the router may take; cached
        // against the concrete orders once they exist.
        let maker_estimate = self.cost.estimate(OrderKind::Limit, side, size, snapshot);
        let ioc_estimate = self.cost.estimate(OrderKind::Ioc, side, size, snapshot);

        match &self.router {
            ExecutionRouter::Hybrid(hybrid) => {
                match hybrid
                    .execute(&score, snapshot, size, self.config.tick_size, cancel)
                    .await
                {
                    Ok(report) => {
                        if report.maker_attempted {
                            self.fill_monitor.record(confidence, report.maker_filled);
                        }
                        for executed in &report.executions {
                            self.settle(executed, snapshot, &maker_estimate, &ioc_estimate);
                        }
                    }
                    Err(e) => warn!(symbol = %self.config.symbol, error = %e, "execution failed"),
                }
            }
            ExecutionRouter::IocOnly(ioc) => {
                if confidence == hermes_core::Confidence::High {
                    match ioc
                        .execute(&score, snapshot, size, self.config.tick_size, cancel)
                        .await
                    {
                        Ok(Some(executed)) => {
                            self.settle(&executed, snapshot, &maker_estimate, &ioc_estimate)
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!(symbol = %self.config.symbol, error = %e, "ioc execution failed")
                        }
                    }
                }
            }
        }

        // Mark the book's latest mid into the position.
        if let Some(latest) = self.snapshots.borrow().clone() {
            self.positions.mark(&self.config.symbol, latest.mid_price);
        }
    }

    /// Account one terminal order: cost actualization, slippage history,
    /// per-fill position/attribution updates, and risk accounting.
    fn settle(
        &self,
        executed: &ExecutedOrder,
        snapshot: &MarketSnapshot,
        maker_estimate: &CostEstimate,
        ioc_estimate: &CostEstimate,
    ) {
        let order = &executed.order;
        if order.filled_size.is_zero() {
            return;
        }

        let estimate = match order.kind {
            OrderKind::Limit => maker_estimate,
            OrderKind::Ioc => ioc_estimate,
        };
        self.cost.cache(order.id, estimate.clone());

        let fill_price = order.avg_fill_price.unwrap_or(order.price);
        let best_price = match order.side {
            Side::Buy => snapshot.best_ask().map(|l| l.price),
            Side::Sell => snapshot.best_bid().map(|l| l.price),
        }
        .unwrap_or(executed.reference_price);

        let now = self.clock.now();
        let actual = self
            .cost
            .record(order, fill_price, executed.reference_price, best_price, now);
        self.slippage.record(
            &order.symbol,
            order.side,
            actual.slippage_bps,
            order.filled_notional(),
        );

        let current_mid = self
            .snapshots
            .borrow()
            .as_ref()
            .map(|s| s.mid_price)
            .unwrap_or(snapshot.mid_price);

        for fill_event in &executed.fills {
            let fill = Fill {
                order_id: order.id,
                seq: fill_event.seq,
                symbol: order.symbol.clone(),
                side: order.side,
                price: fill_event.price,
                size: fill_event.size,
                fee: fill_event.fee,
                timestamp: fill_event.timestamp,
            };
            // Exactly-once: a replayed fill neither moves the position nor
            // double-counts PnL.
            if self.positions.apply_fill(&fill).is_none() {
                continue;
            }
            let attribution = self.attributor.record_fill(
                order.id,
                &order.symbol,
                order.kind,
                order.side,
                fill.size,
                fill.price,
                executed.reference_price,
                current_mid,
                estimate.impact_bps,
                fill.timestamp,
            );
            self.gate.on_trade(attribution.total);
        }
    }

    fn size_intent(&self, value: f64, mid: Decimal) -> Decimal {
        if mid.is_zero() {
            return Decimal::ZERO;
        }
        let nav = self.gate.state().nav;
        let magnitude = Decimal::from_f64(value.abs()).unwrap_or(Decimal::ZERO);
        let scaled = self.config.size_scale_k * magnitude * nav / mid;
        self.config.base_size.min(scaled)
    }

    fn remember(&mut self, value: f64) {
        if self.signal_history.len() == SIGNAL_HISTORY_CAPACITY {
            self.signal_history.pop_front();
        }
        self.signal_history.push_back(value);
    }

    /// Recalibrate thresholds between intents when the fill-rate monitor
    /// flagged a critical band. Never changes thresholds mid-execution:
    /// this runs before the next classification.
    fn maybe_recalibrate(&mut self) {
        if !self.fill_monitor.take_recalibration_recommendation() {
            return;
        }
        if self.signal_history.len() < SignalClassifier::MIN_CALIBRATION_SAMPLES {
            debug!(
                symbol = %self.config.symbol,
                samples = self.signal_history.len(),
                "recalibration recommended but history too small"
            );
            return;
        }
        let values: Vec<f64> = self.signal_history.iter().copied().collect();
        match self.classifier.calibrate(&values) {
            Ok((theta_1, theta_2)) => info!(
                symbol = %self.config.symbol,
                theta_1,
                theta_2,
                "classifier thresholds recalibrated"
            ),
            Err(e) => warn!(symbol = %self.config.symbol, error = %e, "recalibration failed"),
        }
    }
}
