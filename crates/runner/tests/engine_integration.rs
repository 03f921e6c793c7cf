//! End-to-end engine tests against the simulated venue.
//!
//! Each test seeds the sim book so the signal pipeline produces a known
//! confidence band, runs the full engine (hub, signals, risk, executors,
//! monitors), then asserts the accounting that should have happened.

use std::sync::Arc;
use std::time::Duration;

use hermes_core::{CancelHandle, Confidence, Level, SystemClock};
use hermes_gateway::{ExchangeAdapter, SimAdapter, SimBehavior};
use hermes_runner::{config::EngineConfig, engine::Engine};
use rust_decimal_macros::dec;

fn test_config() -> EngineConfig {
    let json = r#"{
        "symbols": [{"name": "ETH", "tick_size": "0.1", "base_size": "0.01"}],
        "execution": {
            "shallow_maker": {"timeout_high_secs": 0.4, "timeout_medium_secs": 0.2,
                               "tick_offset": "1", "post_only": true}
        },
        "loop": {"max_staleness_ms": 5000, "iteration_target_ms": 2000,
                 "size_scale_k": "0.001", "health_check_secs": 3600}
    }"#;
    let config: EngineConfig = serde_json::from_str(json).expect("test config parses");
    config.validate().expect("test config is valid");
    config
}

/// Bid-heavy book: OBI 0.8, microprice lean +0.53 -> aggregate ~0.48,
/// classified HIGH with the default thresholds.
fn high_signal_book(sim: &SimAdapter) {
    sim.set_book(
        "ETH",
        vec![Level::new(dec!(1499.9), dec!(90))],
        vec![Level::new(dec!(1500.1), dec!(10))],
    );
}

/// Milder imbalance: aggregate ~0.3 -> MEDIUM.
fn medium_signal_book(sim: &SimAdapter) {
    sim.set_book(
        "ETH",
        vec![Level::new(dec!(1499.9), dec!(30))],
        vec![Level::new(dec!(1500.1), dec!(10))],
    );
}

/// Balanced book: aggregate ~0 -> LOW.
fn low_signal_book(sim: &SimAdapter) {
    sim.set_book(
        "ETH",
        vec![Level::new(dec!(1499.9), dec!(10))],
        vec![Level::new(dec!(1500.1), dec!(10))],
    );
}

/// Shared-component handles kept for assertions after the engine is
/// consumed by `run`.
struct EngineView {
    gate: Arc<hermes_risk::RiskGate>,
    positions: Arc<hermes_risk::PositionManager>,
    fill_monitor: Arc<hermes_analytics::FillRateMonitor>,
    attributor: Arc<hermes_analytics::PnlAttributor>,
}

async fn run_engine_for(sim: SimAdapter, config: EngineConfig, duration: Duration) -> EngineView {
    let adapter: Arc<dyn ExchangeAdapter> = Arc::new(sim);
    let engine = Engine::new(config, adapter, Arc::new(SystemClock)).expect("engine builds");
    let view = EngineView {
        gate: engine.gate(),
        positions: engine.positions(),
        fill_monitor: engine.fill_monitor(),
        attributor: engine.attributor(),
    };

    let (handle, token) = CancelHandle::new();
    let task = tokio::spawn(engine.run(token));
    tokio::time::sleep(duration).await;
    handle.cancel();
    task.await.expect("engine task joins");

    view
}

#[tokio::test(flavor = "multi_thread")]
async fn test_high_signal_maker_fill_flows_through() {
    let sim = SimAdapter::new(SimBehavior::FillAfter(Duration::from_millis(30)));
    high_signal_book(&sim);

    let view = run_engine_for(sim, test_config(), Duration::from_millis(800)).await;

    // The maker order filled: long position at the passive price.
    let position = view.positions.position("ETH");
    assert_eq!(position.size, dec!(0.01));
    assert_eq!(position.avg_entry_price, dec!(1500.0));

    // Exactly one HIGH attempt recorded, and it filled.
    assert_eq!(view.fill_monitor.fill_rate(Confidence::High), Some(1.0));
    assert_eq!(view.fill_monitor.totals(Confidence::High), (1, 1));
    assert_eq!(view.fill_monitor.fill_rate(Confidence::Medium), None);

    // One attributed fill, maker fee only (fill at reference mid).
    let report = view.attributor.report();
    assert_eq!(report.trades, 1);
    assert_eq!(report.slippage, dec!(0));
    // 1.5 bps of 0.01 * 1500 notional.
    assert_eq!(report.fee, dec!(0.00225));

    // The risk gate accounted the costs.
    let risk = view.gate.state();
    assert!(risk.daily_pnl < dec!(0));
    assert!(!risk.halted);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_medium_signal_timeout_skips_without_crossing() {
    let sim = SimAdapter::new(SimBehavior::NeverFill);
    medium_signal_book(&sim);

    let view = run_engine_for(sim, test_config(), Duration::from_millis(800)).await;

    // The maker attempt timed out and MEDIUM never crosses.
    assert_eq!(view.fill_monitor.fill_rate(Confidence::Medium), Some(0.0));
    let (attempts, filled) = view.fill_monitor.totals(Confidence::Medium);
    assert_eq!(filled, 0);
    assert!(attempts >= 1);

    // No fills anywhere: flat position, no attribution, untouched PnL.
    assert!(view.positions.position("ETH").is_flat());
    assert_eq!(view.attributor.report().trades, 0);
    assert_eq!(view.gate.state().daily_pnl, dec!(0));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_low_signal_produces_no_records() {
    let sim = SimAdapter::new(SimBehavior::FillAfter(Duration::ZERO));
    low_signal_book(&sim);

    let view = run_engine_for(sim, test_config(), Duration::from_millis(400)).await;

    assert!(view.positions.position("ETH").is_flat());
    assert_eq!(view.fill_monitor.fill_rate(Confidence::High), None);
    assert_eq!(view.fill_monitor.fill_rate(Confidence::Medium), None);
    assert_eq!(view.attributor.report().trades, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_halted_gate_blocks_execution() {
    let sim = SimAdapter::new(SimBehavior::FillAfter(Duration::from_millis(10)));
    high_signal_book(&sim);

    let adapter: Arc<dyn ExchangeAdapter> = Arc::new(sim);
    let engine = Engine::new(test_config(), adapter, Arc::new(SystemClock)).expect("engine builds");
    let gate = engine.gate();
    let positions = engine.positions();

    // Halt before any market data is processed.
    gate.halt("test halt");

    let (handle, token) = CancelHandle::new();
    let task = tokio::spawn(engine.run(token));
    tokio::time::sleep(Duration::from_millis(500)).await;
    handle.cancel();
    task.await.expect("engine task joins");

    // The HIGH signal was denied admission: nothing executed.
    assert!(positions.position("ETH").is_flat());
    assert!(gate.is_halted());
}
