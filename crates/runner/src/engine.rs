//! Engine bootstrap.
//!
//! Builds every component from the validated configuration, wires the
//! shared monitors through explicit constructor injection (no global
//! state besides the risk gate's halt latch), and runs one market data
//! hub task plus one trading loop per symbol until cancelled.

use std::sync::Arc;
use std::time::Duration;

use hermes_analytics::{AttributorConfig, FillRateConfig, FillRateMonitor, PnlAttributor};
use hermes_core::{CancelToken, Clock, Confidence};
use hermes_execution::{
    CostEstimator, CostEstimatorConfig, HybridConfig, HybridExecutor, IocConfig, IocExecutor,
    MakerConfig, ShallowMakerExecutor, SlippageConfig, SlippageEstimator,
};
use hermes_gateway::ExchangeAdapter;
use hermes_market_data::{HubConfig, MarketDataHub};
use hermes_risk::{PositionManager, RiskConfig, RiskGate};
use hermes_signals::{Impact, Microprice, Obi, Signal, SignalAggregator, SignalClassifier};
use tracing::{info, warn};

use crate::config::{ConfigError, EngineConfig, ExecutionStrategy};
use crate::trading_loop::{ExecutionRouter, LoopConfig, TradingLoop};

pub struct Engine {
    hub: MarketDataHub,
    loops: Vec<TradingLoop>,
    gate: Arc<RiskGate>,
    positions: Arc<PositionManager>,
    fill_monitor: Arc<FillRateMonitor>,
    attributor: Arc<PnlAttributor>,
    cost: Arc<CostEstimator>,
    health_check: Duration,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        adapter: Arc<dyn ExchangeAdapter>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let slippage = Arc::new(SlippageEstimator::new(SlippageConfig::default()));
        let cost = Arc::new(CostEstimator::new(
            CostEstimatorConfig {
                maker_fee_bps: config.cost.maker_fee_bps,
                taker_fee_bps: config.cost.taker_fee_bps,
                ..CostEstimatorConfig::default()
            },
            Arc::clone(&slippage),
        ));
        let gate = Arc::new(RiskGate::new(
            RiskConfig {
                initial_nav: config.initial_nav,
                max_single_loss_pct: config.risk.max_single_loss_pct,
                max_daily_drawdown_pct: config.risk.max_daily_drawdown_pct,
                max_position_usd: config.risk.max_position_usd,
                worst_adverse_move_bps: config.risk.worst_adverse_move_bps,
            },
            Arc::clone(&clock),
        ));
        let positions = Arc::new(PositionManager::new());
        let fill_monitor = Arc::new(FillRateMonitor::new(FillRateConfig {
            window_size: config.monitoring.fill_rate.window_size,
            alert_threshold_high: config.monitoring.fill_rate.alert_threshold_high,
            alert_threshold_medium: config.monitoring.fill_rate.alert_threshold_medium,
            critical_threshold: config.monitoring.fill_rate.critical_threshold,
        }));
        let attributor = Arc::new(PnlAttributor::new(AttributorConfig {
            maker_fee_bps: config.cost.maker_fee_bps,
            taker_fee_bps: config.cost.taker_fee_bps,
            ..AttributorConfig::default()
        }));

        // Market data hub: book inconsistency that survives resyncs trips
        // the halt latch.
        let mut hub = MarketDataHub::new(
            Arc::clone(&adapter),
            Arc::clone(&clock),
            HubConfig {
                symbols: config.symbol_names(),
                ..HubConfig::default()
            },
        );
        {
            let gate = Arc::clone(&gate);
            hub.set_escalation_handler(Arc::new(move |symbol: &str| {
                gate.halt(&format!("persistent book inconsistency on {symbol}"));
            }));
        }

        // Executors, shared across symbol loops.
        let maker_config = MakerConfig {
            timeout_high: Duration::from_secs_f64(config.execution.shallow_maker.timeout_high_secs),
            timeout_medium: Duration::from_secs_f64(
                config.execution.shallow_maker.timeout_medium_secs,
            ),
            tick_offset: config.execution.shallow_maker.tick_offset,
            post_only: config.execution.shallow_maker.post_only,
            ..MakerConfig::default()
        };
        let ioc_config = IocConfig {
            price_adjustment_bps: config.execution.ioc.price_adjustment_bps,
            max_cross_bps: config.execution.ioc.max_cross_bps,
            ..IocConfig::default()
        };
        let hybrid = match config.execution.strategy {
            ExecutionStrategy::Hybrid => {
                let maker = ShallowMakerExecutor::new(
                    Arc::clone(&adapter),
                    Arc::clone(&clock),
                    maker_config,
                );
                let ioc =
                    IocExecutor::new(Arc::clone(&adapter), Arc::clone(&clock), ioc_config.clone());
                Some(Arc::new(HybridExecutor::new(
                    maker,
                    ioc,
                    HybridConfig {
                        fallback_on_high: config.execution.ioc.fallback_on_high,
                        fallback_on_medium: config.execution.ioc.fallback_on_medium,
                    },
                )))
            }
            ExecutionStrategy::IocOnly => None,
        };

        let mut loops = Vec::with_capacity(config.symbols.len());
        for symbol in &config.symbols {
            let snapshots = hub
                .snapshots(&symbol.name)
                .expect("hub created for every configured symbol");

            let signals: Vec<Box<dyn Signal>> = vec![
                Box::new(Obi::new(
                    config.signals.obi_levels,
                    config.signals.weights.obi,
                )),
                Box::new(Microprice::new(config.signals.weights.microprice)),
                Box::new(Impact::new(
                    config.signals.impact_window_ms,
                    config.signals.weights.impact,
                )),
            ];
            let aggregator = SignalAggregator::new(signals);
            let classifier = SignalClassifier::new(
                config.signals.thresholds.theta_1,
                config.signals.thresholds.theta_2,
            )
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

            let loop_router = match &hybrid {
                Some(executor) => ExecutionRouter::Hybrid(Arc::clone(executor)),
                None => ExecutionRouter::IocOnly(Arc::new(IocExecutor::new(
                    Arc::clone(&adapter),
                    Arc::clone(&clock),
                    ioc_config.clone(),
                ))),
            };

            loops.push(TradingLoop::new(
                LoopConfig {
                    symbol: symbol.name.clone(),
                    tick_size: symbol.tick_size,
                    base_size: symbol.base_size,
                    size_scale_k: config.loop_cfg.size_scale_k,
                    max_staleness_ms: config.loop_cfg.max_staleness_ms,
                    iteration_target: Duration::from_millis(config.loop_cfg.iteration_target_ms),
                },
                snapshots,
                aggregator,
                classifier,
                loop_router,
                Arc::clone(&gate),
                Arc::clone(&positions),
                Arc::clone(&fill_monitor),
                Arc::clone(&attributor),
                Arc::clone(&cost),
                Arc::clone(&slippage),
                Arc::clone(&clock),
            ));
        }

        Ok(Self {
            hub,
            loops,
            gate,
            positions,
            fill_monitor,
            attributor,
            cost,
            health_check: Duration::from_secs(config.loop_cfg.health_check_secs),
        })
    }

    pub fn gate(&self) -> Arc<RiskGate> {
        Arc::clone(&self.gate)
    }

    pub fn positions(&self) -> Arc<PositionManager> {
        Arc::clone(&self.positions)
    }

    pub fn fill_monitor(&self) -> Arc<FillRateMonitor> {
        Arc::clone(&self.fill_monitor)
    }

    pub fn attributor(&self) -> Arc<PnlAttributor> {
        Arc::clone(&self.attributor)
    }

    pub fn cost(&self) -> Arc<CostEstimator> {
        Arc::clone(&self.cost)
    }

    /// Run until `cancel` fires. Shutdown is graceful: executors unwind
    /// any working order to a terminal state before their loop exits.
    pub async fn run(self, cancel: CancelToken) {
        let mut tasks = Vec::new();

        tasks.push(tokio::spawn(self.hub.run(cancel.clone())));
        for trading_loop in self.loops {
            tasks.push(tokio::spawn(trading_loop.run(cancel.clone())));
        }
        tasks.push(tokio::spawn(Self::health_task(
            Arc::clone(&self.gate),
            Arc::clone(&self.positions),
            Arc::clone(&self.fill_monitor),
            Arc::clone(&self.attributor),
            Arc::clone(&self.cost),
            self.health_check,
            cancel.clone(),
        )));

        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "engine task panicked");
            }
        }
        info!("engine stopped");
    }

    /// Periodic health report: alpha share, fill rates, risk state, and
    /// cost-estimate drift.
    async fn health_task(
        gate: Arc<RiskGate>,
        positions: Arc<PositionManager>,
        fill_monitor: Arc<FillRateMonitor>,
        attributor: Arc<PnlAttributor>,
        cost: Arc<CostEstimator>,
        interval: Duration,
        cancel: CancelToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(interval) => {}
            }

            let risk = gate.state();
            let report = attributor.report();
            let accuracy = cost.accuracy();
            info!(
                nav = %risk.nav,
                daily_pnl = %risk.daily_pnl,
                halted = risk.halted,
                realized_pnl = %positions.total_realized_pnl(),
                unrealized_pnl = %positions.total_unrealized_pnl(),
                gross_notional = %positions.total_notional(),
                trades = report.trades,
                alpha_share = report.alpha_share.unwrap_or(0.0),
                alpha_healthy = report.alpha_healthy,
                fill_rate_high = fill_monitor.fill_rate(Confidence::High).unwrap_or(0.0),
                fill_rate_medium = fill_monitor.fill_rate(Confidence::Medium).unwrap_or(0.0),
                cost_samples = accuracy.samples,
                cost_mae_bps = accuracy.mae_bps,
                "health check"
            );
            if risk.halted {
                warn!(reason = ?risk.halt_reason, "risk gate is halted, admission closed");
            }
        }
    }
}
