//! Hybrid maker/taker execution coordinator.
//!
//! Routes each classified signal:
//!
//! ```text
//! LOW    -> skip
//! HIGH   -> shallow maker (5s); unfilled remainder -> IOC fallback
//! MEDIUM -> shallow maker (3s); unfilled -> skip (never cross)
//! ```
//!
//! At most one intent is in flight per symbol: a signal arriving while a
//! prior attempt is working is dropped and logged as coalesced. Every
//! HIGH/MEDIUM invocation produces exactly one fill-rate record (taken
//! from the report by the trading loop); maker success means fully filled
//! within the maker window.

use std::collections::HashSet;
use std::sync::Arc;

use hermes_core::{
    CancelToken, Confidence, MarketSnapshot, OrderStatus, SignalScore, Symbol, AUDIT_TARGET,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::error::Result;
use crate::ioc::IocExecutor;
use crate::shallow_maker::{MakerAttempt, ShallowMakerExecutor};
use crate::ExecutedOrder;

#[derive(Debug, Clone)]
pub struct HybridConfig {
    /// Cross the spread for the remainder after a HIGH maker timeout
    pub fallback_on_high: bool,
    /// Cross after a MEDIUM maker timeout (off by default)
    pub fallback_on_medium: bool,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            fallback_on_high: true,
            fallback_on_medium: false,
        }
    }
}

/// Terminal classification of one executor invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Maker filled fully within its window
    MakerFilled,
    /// Maker did not complete; IOC fallback ran to a terminal state
    FallbackExecuted,
    /// Maker did not complete; routing forbids crossing
    SkippedAfterTimeout,
    /// LOW confidence, nothing placed
    SkippedLowConfidence,
    /// Venue rejected the maker order and no fallback applies
    Rejected,
    /// Nothing could be placed (one-sided book, zero direction)
    NotPlaced,
    /// Dropped: an intent for this symbol is already in flight
    Coalesced,
}

/// What one invocation did; the trading loop feeds this to the monitors.
#[derive(Debug)]
pub struct ExecutionReport {
    pub symbol: Symbol,
    pub confidence: Confidence,
    pub outcome: AttemptOutcome,
    /// True for every non-coalesced HIGH/MEDIUM invocation; exactly these
    /// produce a fill-rate record.
    pub maker_attempted: bool,
    /// Maker success per the fill-rate convention
    pub maker_filled: bool,
    /// Terminal orders produced, in execution order
    pub executions: Vec<ExecutedOrder>,
}

impl ExecutionReport {
    fn skipped(symbol: Symbol, confidence: Confidence, outcome: AttemptOutcome) -> Self {
        Self {
            symbol,
            confidence,
            outcome,
            maker_attempted: false,
            maker_filled: false,
            executions: Vec::new(),
        }
    }

    /// Total size filled across all executions.
    pub fn filled_size(&self) -> Decimal {
        self.executions.iter().map(|e| e.order.filled_size).sum()
    }
}

/// Running counters, exposed for health reporting.
#[derive(Debug, Clone, Copy, Default)]
pub struct HybridStats {
    pub total_signals: u64,
    pub high_confidence: u64,
    pub medium_confidence: u64,
    pub low_confidence: u64,
    pub maker_fills: u64,
    pub ioc_fills: u64,
    pub fallbacks: u64,
    pub skips: u64,
    pub coalesced: u64,
}

pub struct HybridExecutor {
    maker: ShallowMakerExecutor,
    ioc: IocExecutor,
    config: HybridConfig,
    in_flight: Arc<Mutex<HashSet<Symbol>>>,
    stats: Mutex<HybridStats>,
}

/// Releases the per-symbol in-flight slot when the attempt finishes.
struct InFlightGuard {
    set: Arc<Mutex<HashSet<Symbol>>>,
    symbol: Symbol,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.lock().remove(&self.symbol);
    }
}

impl HybridExecutor {
    pub fn new(maker: ShallowMakerExecutor, ioc: IocExecutor, config: HybridConfig) -> Self {
        Self {
            maker,
            ioc,
            config,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            stats: Mutex::new(HybridStats::default()),
        }
    }

    pub fn stats(&self) -> HybridStats {
        *self.stats.lock()
    }

    pub fn reset_stats(&self) {
        *self.stats.lock() = HybridStats::default();
    }

    /// Execute one classified signal.
    pub async fn execute(
        &self,
        score: &SignalScore,
        snapshot: &MarketSnapshot,
        size: Decimal,
        tick_size: Decimal,
        cancel: &CancelToken,
    ) -> Result<ExecutionReport> {
        let symbol = snapshot.symbol.clone();
        self.stats.lock().total_signals += 1;

        if score.confidence == Confidence::Low {
            let mut stats = self.stats.lock();
            stats.low_confidence += 1;
            stats.skips += 1;
            return Ok(ExecutionReport::skipped(
                symbol,
                score.confidence,
                AttemptOutcome::SkippedLowConfidence,
            ));
        }

        // One outstanding intent per symbol.
        let guard = {
            let mut in_flight = self.in_flight.lock();
            if !in_flight.insert(symbol.clone()) {
                drop(in_flight);
                self.stats.lock().coalesced += 1;
                warn!(symbol = %symbol, value = score.value, "signal coalesced: intent in flight");
                return Ok(ExecutionReport::skipped(
                    symbol,
                    score.confidence,
                    AttemptOutcome::Coalesced,
                ));
            }
            InFlightGuard {
                set: Arc::clone(&self.in_flight),
                symbol: symbol.clone(),
            }
        };
        let _guard = guard;

        match score.confidence {
            Confidence::High => self.stats.lock().high_confidence += 1,
            Confidence::Medium => self.stats.lock().medium_confidence += 1,
            Confidence::Low => unreachable!("handled above"),
        }

        let fallback_allowed = match score.confidence {
            Confidence::High => self.config.fallback_on_high,
            Confidence::Medium => self.config.fallback_on_medium,
            Confidence::Low => false,
        };

        let attempt = self
            .maker
            .execute(score, snapshot, size, tick_size, cancel)
            .await?;

        let mut report = ExecutionReport {
            symbol: symbol.clone(),
            confidence: score.confidence,
            outcome: AttemptOutcome::NotPlaced,
            maker_attempted: true,
            maker_filled: false,
            executions: Vec::new(),
        };

        match attempt {
            MakerAttempt::NotPlaced => {
                self.stats.lock().skips += 1;
                report.outcome = AttemptOutcome::NotPlaced;
            }
            MakerAttempt::Rejected {
                reason,
                post_only_violation,
            } => {
                // A post-only violation means the passive price would have
                // taken: the signal's premise is gone, never fall back.
                if post_only_violation || !fallback_allowed {
                    self.stats.lock().skips += 1;
                    report.outcome = AttemptOutcome::Rejected;
                    warn!(symbol = %symbol, %reason, "maker rejected, no fallback");
                } else {
                    report.outcome = self
                        .fallback(score, snapshot, size, tick_size, cancel, &mut report)
                        .await?;
                }
            }
            MakerAttempt::Terminal(executed) => {
                let filled = executed.order.status == OrderStatus::Filled;
                let remaining = executed.order.remaining_size();
                report.executions.push(executed);

                if filled {
                    self.stats.lock().maker_fills += 1;
                    report.maker_filled = true;
                    report.outcome = AttemptOutcome::MakerFilled;
                    info!(symbol = %symbol, "maker attempt filled");
                } else if fallback_allowed && remaining > Decimal::ZERO {
                    info!(
                        target: AUDIT_TARGET,
                        symbol = %symbol,
                        confidence = score.confidence.as_str(),
                        %remaining,
                        "maker timeout, falling back to ioc"
                    );
                    report.outcome = self
                        .fallback(score, snapshot, remaining, tick_size, cancel, &mut report)
                        .await?;
                } else {
                    self.stats.lock().skips += 1;
                    report.outcome = AttemptOutcome::SkippedAfterTimeout;
                    info!(symbol = %symbol, confidence = score.confidence.as_str(), "maker timeout, skipping");
                }
            }
        }

        Ok(report)
    }

    async fn fallback(
        &self,
        score: &SignalScore,
        snapshot: &MarketSnapshot,
        size: Decimal,
        tick_size: Decimal,
        cancel: &CancelToken,
        report: &mut ExecutionReport,
    ) -> Result<AttemptOutcome> {
        {
            let mut stats = self.stats.lock();
            stats.fallbacks += 1;
        }
        match self
            .ioc
            .execute(score, snapshot, size, tick_size, cancel)
            .await?
        {
            Some(executed) => {
                if executed.order.filled_size > Decimal::ZERO {
                    self.stats.lock().ioc_fills += 1;
                }
                report.executions.push(executed);
                Ok(AttemptOutcome::FallbackExecuted)
            }
            None => {
                self.stats.lock().skips += 1;
                Ok(AttemptOutcome::FallbackExecuted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hermes_core::{Level, SystemClock};
    use hermes_gateway::{SimAdapter, SimBehavior};
    use rust_decimal_macros::dec;
    use std::time::Duration;

    use crate::ioc::IocConfig;
    use crate::shallow_maker::MakerConfig;

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot {
            symbol: "ETH".to_string(),
            timestamp: Utc::now(),
            bids: vec![Level::new(dec!(1499.9), dec!(10)), Level::new(dec!(1499.8), dec!(5))],
            asks: vec![Level::new(dec!(1500.1), dec!(10))],
            mid_price: dec!(1500.0),
            recent_trades: Vec::new(),
        }
    }

    fn score(value: f64, confidence: Confidence) -> SignalScore {
        SignalScore::new(value, vec![value], Utc::now()).with_confidence(confidence)
    }

    fn hybrid(sim: &SimAdapter, config: HybridConfig) -> HybridExecutor {
        let adapter: Arc<dyn hermes_gateway::ExchangeAdapter> = Arc::new(sim.clone());
        let clock = Arc::new(SystemClock);
        let maker = ShallowMakerExecutor::new(
            Arc::clone(&adapter),
            clock.clone(),
            MakerConfig {
                timeout_high: Duration::from_millis(120),
                timeout_medium: Duration::from_millis(60),
                poll_interval: Duration::from_millis(10),
                reconcile_grace: Duration::from_millis(100),
                ..MakerConfig::default()
            },
        );
        let ioc = IocExecutor::new(
            adapter,
            clock,
            IocConfig {
                poll_interval: Duration::from_millis(10),
                reconcile_grace: Duration::from_millis(100),
                ..IocConfig::default()
            },
        );
        HybridExecutor::new(maker, ioc, config)
    }

    #[tokio::test]
    async fn test_low_confidence_skips() {
        let sim = SimAdapter::new(SimBehavior::FillAfter(Duration::ZERO));
        let executor = hybrid(&sim, HybridConfig::default());
        let token = CancelToken::never();

        let report = executor
            .execute(&score(0.1, Confidence::Low), &snapshot(), dec!(1), dec!(0.1), &token)
            .await
            .unwrap();

        assert_eq!(report.outcome, AttemptOutcome::SkippedLowConfidence);
        assert!(!report.maker_attempted);
        assert!(report.executions.is_empty());
        assert_eq!(executor.stats().skips, 1);
    }

    #[tokio::test]
    async fn test_high_maker_fill() {
        let sim = SimAdapter::new(SimBehavior::FillAfter(Duration::from_millis(20)));
        let executor = hybrid(&sim, HybridConfig::default());
        let token = CancelToken::never();

        let report = executor
            .execute(&score(0.6, Confidence::High), &snapshot(), dec!(1), dec!(0.1), &token)
            .await
            .unwrap();

        assert_eq!(report.outcome, AttemptOutcome::MakerFilled);
        assert!(report.maker_filled);
        assert_eq!(report.executions.len(), 1);
        assert_eq!(report.filled_size(), dec!(1));
        assert_eq!(executor.stats().maker_fills, 1);
    }

    #[tokio::test]
    async fn test_high_timeout_falls_back_to_ioc() {
        // Maker never fills; the fallback IOC (same behavior would also
        // never fill) still runs to a terminal state.
        let sim = SimAdapter::new(SimBehavior::NeverFill);
        let executor = hybrid(&sim, HybridConfig::default());
        let token = CancelToken::never();

        let report = executor
            .execute(&score(0.6, Confidence::High), &snapshot(), dec!(1), dec!(0.1), &token)
            .await
            .unwrap();

        assert_eq!(report.outcome, AttemptOutcome::FallbackExecuted);
        assert!(!report.maker_filled);
        // Maker (canceled) + IOC (canceled).
        assert_eq!(report.executions.len(), 2);
        assert_eq!(executor.stats().fallbacks, 1);
    }

    #[tokio::test]
    async fn test_medium_timeout_never_crosses() {
        let sim = SimAdapter::new(SimBehavior::NeverFill);
        let executor = hybrid(&sim, HybridConfig::default());
        let token = CancelToken::never();

        let report = executor
            .execute(&score(0.3, Confidence::Medium), &snapshot(), dec!(1), dec!(0.1), &token)
            .await
            .unwrap();

        assert_eq!(report.outcome, AttemptOutcome::SkippedAfterTimeout);
        assert!(!report.maker_filled);
        // Only the canceled maker order, no IOC.
        assert_eq!(report.executions.len(), 1);
        assert_eq!(report.executions[0].order.kind, hermes_core::OrderKind::Limit);
    }

    #[tokio::test]
    async fn test_post_only_reject_no_fallback() {
        let sim = SimAdapter::new(SimBehavior::RejectPostOnly);
        let executor = hybrid(&sim, HybridConfig::default());
        let token = CancelToken::never();

        let report = executor
            .execute(&score(0.6, Confidence::High), &snapshot(), dec!(1), dec!(0.1), &token)
            .await
            .unwrap();

        assert_eq!(report.outcome, AttemptOutcome::Rejected);
        assert!(report.maker_attempted);
        assert!(report.executions.is_empty());
        assert_eq!(executor.stats().fallbacks, 0);
    }

    #[tokio::test]
    async fn test_coalescing_one_intent_per_symbol() {
        let sim = SimAdapter::new(SimBehavior::NeverFill);
        let executor = Arc::new(hybrid(&sim, HybridConfig::default()));
        let token = CancelToken::never();

        let first = {
            let executor = Arc::clone(&executor);
            let token = token.clone();
            tokio::spawn(async move {
                executor
                    .execute(&score(0.6, Confidence::High), &snapshot(), dec!(1), dec!(0.1), &token)
                    .await
                    .unwrap()
            })
        };

        // Give the first attempt time to claim the in-flight slot.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = executor
            .execute(&score(0.7, Confidence::High), &snapshot(), dec!(1), dec!(0.1), &token)
            .await
            .unwrap();
        assert_eq!(second.outcome, AttemptOutcome::Coalesced);

        let first = first.await.unwrap();
        assert_ne!(first.outcome, AttemptOutcome::Coalesced);
        assert_eq!(executor.stats().coalesced, 1);

        // The slot is free again after the first attempt finished.
        let third = executor
            .execute(&score(0.3, Confidence::Medium), &snapshot(), dec!(1), dec!(0.1), &token)
            .await
            .unwrap();
        assert_ne!(third.outcome, AttemptOutcome::Coalesced);
    }

    #[tokio::test]
    async fn test_partial_maker_fallback_covers_remainder() {
        let sim = SimAdapter::new(SimBehavior::PartialFillAfter {
            delay: Duration::from_millis(20),
            fraction: dec!(0.5),
        });
        let executor = hybrid(&sim, HybridConfig::default());
        let token = CancelToken::never();

        let report = executor
            .execute(&score(0.6, Confidence::High), &snapshot(), dec!(2), dec!(0.1), &token)
            .await
            .unwrap();

        assert_eq!(report.outcome, AttemptOutcome::FallbackExecuted);
        // Partial counts against the maker rate.
        assert!(!report.maker_filled);
        assert_eq!(report.executions.len(), 2);
        // The IOC was sized to the remaining 1.
        assert_eq!(report.executions[1].order.size, dec!(1));
    }
}
