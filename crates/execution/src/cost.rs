//! Dynamic cost estimation.
//!
//! Pre-trade: decompose the expected round-trip cost of an order into
//! fee + slippage + impact (all bps). Post-trade: record the realized
//! breakdown next to the estimate and report drift, so the attributor's
//! inputs are continuously validated.
//!
//! Impact model: `alpha * (size / liquidity)^beta * (1 + (1 - liquidity_score))`,
//! clamped to `[floor, cap]` bps, where `liquidity` is the top-K size on
//! the passive side and `liquidity_score` normalizes two-sided depth
//! against a reference.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use hermes_core::{MarketSnapshot, Order, OrderId, OrderKind, Side, Symbol};
use parking_lot::Mutex;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::slippage::SlippageEstimator;

#[derive(Debug, Clone)]
pub struct CostEstimatorConfig {
    /// Maker fee for resting limits (positive cost)
    pub maker_fee_bps: Decimal,
    /// Taker fee for IOC
    pub taker_fee_bps: Decimal,
    /// Impact model coefficient
    pub impact_alpha: f64,
    /// Impact model exponent
    pub impact_beta: f64,
    /// Levels of passive-side depth treated as available liquidity
    pub liquidity_depth: usize,
    /// Two-sided size that maps to liquidity_score = 1
    pub liquidity_reference: Decimal,
    /// Impact clamp, bps
    pub impact_floor_bps: Decimal,
    pub impact_cap_bps: Decimal,
    /// Impact fallback when the passive side is empty
    pub impact_fallback_bps: Decimal,
    /// Retained actual-cost records
    pub history_capacity: usize,
}

impl Default for CostEstimatorConfig {
    fn default() -> Self {
        Self {
            maker_fee_bps: Decimal::new(15, 1),
            taker_fee_bps: Decimal::new(45, 1),
            impact_alpha: 0.01,
            impact_beta: 1.0,
            liquidity_depth: 3,
            liquidity_reference: Decimal::from(100),
            impact_floor_bps: Decimal::new(5, 1),
            impact_cap_bps: Decimal::from(10),
            impact_fallback_bps: Decimal::from(5),
            history_capacity: 10_000,
        }
    }
}

impl CostEstimatorConfig {
    /// Fee schedule dispatch on the order kind tag.
    pub fn fee_bps(&self, kind: OrderKind) -> Decimal {
        match kind {
            OrderKind::Limit => self.maker_fee_bps,
            OrderKind::Ioc => self.taker_fee_bps,
        }
    }
}

/// Pre-trade cost decomposition, all components in bps.
#[derive(Debug, Clone)]
pub struct CostEstimate {
    pub symbol: Symbol,
    pub kind: OrderKind,
    pub side: Side,
    pub size: Decimal,
    pub fee_bps: Decimal,
    pub slippage_bps: Decimal,
    pub impact_bps: Decimal,
    pub total_bps: Decimal,
    pub spread_bps: Decimal,
    /// Normalized two-sided depth in [0, 1]
    pub liquidity_score: f64,
    pub timestamp: DateTime<Utc>,
}

/// Realized cost breakdown recorded post-trade.
#[derive(Debug, Clone)]
pub struct CostActual {
    pub order_id: OrderId,
    pub symbol: Symbol,
    pub kind: OrderKind,
    pub side: Side,
    pub filled_size: Decimal,
    pub fee_bps: Decimal,
    pub slippage_bps: Decimal,
    pub impact_bps: Decimal,
    pub total_bps: Decimal,
    pub estimated_total_bps: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

/// Estimate-vs-actual drift statistics.
#[derive(Debug, Clone, Default)]
pub struct AccuracyReport {
    pub samples: usize,
    /// Mean of (actual - estimated) / estimated, percent
    pub mean_error_pct: f64,
    /// Mean |actual - estimated| in bps
    pub mae_bps: f64,
    pub within_10pct: f64,
    pub within_20pct: f64,
}

/// Shared cost estimator; pre-trade estimates are cached per order id so
/// the post-trade record can measure drift.
pub struct CostEstimator {
    config: CostEstimatorConfig,
    slippage: Arc<SlippageEstimator>,
    pending: Mutex<HashMap<OrderId, CostEstimate>>,
    actuals: Mutex<VecDeque<CostActual>>,
}

impl CostEstimator {
    pub fn new(config: CostEstimatorConfig, slippage: Arc<SlippageEstimator>) -> Self {
        Self {
            config,
            slippage,
            pending: Mutex::new(HashMap::new()),
            actuals: Mutex::new(VecDeque::new()),
        }
    }

    pub fn config(&self) -> &CostEstimatorConfig {
        &self.config
    }

    /// Pre-trade cost estimate for an intended order.
    pub fn estimate(
        &self,
        kind: OrderKind,
        side: Side,
        size: Decimal,
        snapshot: &MarketSnapshot,
    ) -> CostEstimate {
        let fee_bps = self.config.fee_bps(kind);
        let notional = size * snapshot.mid_price;
        // Takers sweep the book, so walk it; a resting maker leans on the
        // rolling history instead.
        let slippage_bps = match kind {
            OrderKind::Ioc => match self.slippage.book_walk(snapshot, side, size) {
                Some(walk) => walk.slippage_bps.max(Decimal::ZERO),
                None => {
                    warn!(symbol = %snapshot.symbol, "book walk failed, assuming zero slippage");
                    Decimal::ZERO
                }
            },
            OrderKind::Limit => self
                .slippage
                .estimate(&snapshot.symbol, side, notional)
                .max(Decimal::ZERO),
        };
        let liquidity_score = self.liquidity_score(snapshot);
        let impact_bps = self.impact_bps(side, size, snapshot, liquidity_score);
        let spread_bps = snapshot.spread_bps().unwrap_or(Decimal::ZERO);

        let estimate = CostEstimate {
            symbol: snapshot.symbol.clone(),
            kind,
            side,
            size,
            fee_bps,
            slippage_bps,
            impact_bps,
            total_bps: fee_bps + slippage_bps + impact_bps,
            spread_bps,
            liquidity_score,
            timestamp: snapshot.timestamp,
        };
        debug!(
            symbol = %estimate.symbol,
            kind = kind.as_str(),
            side = side.as_str(),
            fee = %fee_bps,
            slippage = %slippage_bps,
            impact = %impact_bps,
            "cost estimated"
        );
        estimate
    }

    /// Cache `estimate` under the order that was created from it.
    pub fn cache(&self, order_id: OrderId, estimate: CostEstimate) {
        self.pending.lock().insert(order_id, estimate);
    }

    pub fn cached(&self, order_id: OrderId) -> Option<CostEstimate> {
        self.pending.lock().get(&order_id).cloned()
    }

    /// Record the realized cost of a (partially) filled order and return
    /// the breakdown. `reference_price` is the signal-time reference;
    /// `best_price` the best opposite quote at submission.
    pub fn record(
        &self,
        order: &Order,
        fill_price: Decimal,
        reference_price: Decimal,
        best_price: Decimal,
        timestamp: DateTime<Utc>,
    ) -> CostActual {
        let estimated = self.pending.lock().remove(&order.id);

        let fee_bps = self.config.fee_bps(order.kind);
        let slippage_bps =
            SlippageEstimator::actual_slippage_bps(fill_price, reference_price, order.side);
        let impact_bps = if best_price.is_zero() {
            Decimal::ZERO
        } else {
            SlippageEstimator::actual_slippage_bps(fill_price, best_price, order.side)
        };

        let actual = CostActual {
            order_id: order.id,
            symbol: order.symbol.clone(),
            kind: order.kind,
            side: order.side,
            filled_size: order.filled_size,
            fee_bps,
            slippage_bps,
            impact_bps,
            total_bps: fee_bps + slippage_bps + impact_bps,
            estimated_total_bps: estimated.as_ref().map(|e| e.total_bps),
            timestamp,
        };

        let mut actuals = self.actuals.lock();
        if actuals.len() == self.config.history_capacity {
            actuals.pop_front();
        }
        actuals.push_back(actual.clone());
        actual
    }

    /// Drift statistics over recorded actuals that had a cached estimate.
    pub fn accuracy(&self) -> AccuracyReport {
        let actuals = self.actuals.lock();
        let paired: Vec<(f64, f64)> = actuals
            .iter()
            .filter_map(|a| {
                let estimated = a.estimated_total_bps?.to_f64()?;
                let actual = a.total_bps.to_f64()?;
                if estimated == 0.0 {
                    None
                } else {
                    Some((actual, estimated))
                }
            })
            .collect();

        if paired.is_empty() {
            return AccuracyReport::default();
        }

        let n = paired.len() as f64;
        let errors: Vec<f64> = paired
            .iter()
            .map(|(actual, estimated)| (actual - estimated) / estimated * 100.0)
            .collect();
        let mean_error_pct = errors.iter().sum::<f64>() / n;
        let mae_bps = paired
            .iter()
            .map(|(actual, estimated)| (actual - estimated).abs())
            .sum::<f64>()
            / n;
        let within_10pct = errors.iter().filter(|e| e.abs() < 10.0).count() as f64 / n;
        let within_20pct = errors.iter().filter(|e| e.abs() < 20.0).count() as f64 / n;

        AccuracyReport {
            samples: paired.len(),
            mean_error_pct,
            mae_bps,
            within_10pct,
            within_20pct,
        }
    }

    fn liquidity_score(&self, snapshot: &MarketSnapshot) -> f64 {
        let depth = self.config.liquidity_depth;
        let two_sided = snapshot.depth_size(Side::Buy, depth) + snapshot.depth_size(Side::Sell, depth);
        if self.config.liquidity_reference.is_zero() {
            return 0.0;
        }
        (two_sided / self.config.liquidity_reference)
            .to_f64()
            .unwrap_or(0.0)
            .clamp(0.0, 1.0)
    }

    fn impact_bps(
        &self,
        side: Side,
        size: Decimal,
        snapshot: &MarketSnapshot,
        liquidity_score: f64,
    ) -> Decimal {
        let passive: Decimal = snapshot
            .opposite_levels(side)
            .iter()
            .take(self.config.liquidity_depth)
            .map(|l| l.size)
            .sum();
        if passive.is_zero() {
            warn!(symbol = %snapshot.symbol, "no passive liquidity, fallback impact");
            return self.config.impact_fallback_bps;
        }

        let ratio = (size / passive).to_f64().unwrap_or(0.0);
        let raw = self.config.impact_alpha * ratio.powf(self.config.impact_beta) * 10_000.0;
        let adjusted = raw * (1.0 + (1.0 - liquidity_score));
        let bps = Decimal::from_f64(adjusted).unwrap_or(self.config.impact_fallback_bps);
        bps.clamp(self.config.impact_floor_bps, self.config.impact_cap_bps)
    }
}
