//! Engine configuration.
//!
//! One JSON file deserialized into typed sections with serde defaults,
//! then validated as a whole (`EngineConfig::validate`): signal weights
//! must sum to ~1, classifier thresholds must be ordered, percentages must
//! be proper fractions. `--check-config` parses and validates without
//! starting the engine.

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

fn default_nav() -> Decimal {
    Decimal::from(100_000)
}

/// One tradeable symbol.
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolConfig {
    pub name: String,
    /// Minimum price increment
    pub tick_size: Decimal,
    /// Base order size in contracts
    #[serde(default = "SymbolConfig::default_base_size")]
    pub base_size: Decimal,
}

impl SymbolConfig {
    fn default_base_size() -> Decimal {
        Decimal::new(1, 2)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SignalWeights {
    pub obi: f64,
    pub microprice: f64,
    pub impact: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            obi: 0.4,
            microprice: 0.3,
            impact: 0.3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub theta_1: f64,
    pub theta_2: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            theta_1: 0.45,
            theta_2: 0.25,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SignalsConfig {
    pub weights: SignalWeights,
    pub thresholds: Thresholds,
    pub obi_levels: usize,
    pub impact_window_ms: i64,
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            weights: SignalWeights::default(),
            thresholds: Thresholds::default(),
            obi_levels: 5,
            impact_window_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// Taker only, HIGH confidence signals
    IocOnly,
    /// Shallow maker first with confidence-based IOC fallback
    Hybrid,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShallowMakerSection {
    pub timeout_high_secs: f64,
    pub timeout_medium_secs: f64,
    /// Passive offset in ticks
    pub tick_offset: Decimal,
    pub post_only: bool,
}

impl Default for ShallowMakerSection {
    fn default() -> Self {
        Self {
            timeout_high_secs: 5.0,
            timeout_medium_secs: 3.0,
            tick_offset: Decimal::ONE,
            post_only: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IocSection {
    pub fallback_on_high: bool,
    pub fallback_on_medium: bool,
    pub price_adjustment_bps: Decimal,
    pub max_cross_bps: Decimal,
}

impl Default for IocSection {
    fn default() -> Self {
        Self {
            fallback_on_high: true,
            fallback_on_medium: false,
            price_adjustment_bps: Decimal::from(10),
            max_cross_bps: Decimal::from(20),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutionSection {
    pub strategy: ExecutionStrategy,
    pub shallow_maker: ShallowMakerSection,
    pub ioc: IocSection,
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            strategy: ExecutionStrategy::Hybrid,
            shallow_maker: ShallowMakerSection::default(),
            ioc: IocSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskSection {
    pub max_single_loss_pct: Decimal,
    pub max_daily_drawdown_pct: Decimal,
    pub max_position_usd: Decimal,
    pub worst_adverse_move_bps: Decimal,
}

impl Default for RiskSection {
    fn default() -> Self {
        Self {
            max_single_loss_pct: Decimal::new(8, 3),
            max_daily_drawdown_pct: Decimal::new(5, 2),
            max_position_usd: Decimal::from(10_000),
            worst_adverse_move_bps: Decimal::from(30),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FillRateSection {
    pub window_size: usize,
    pub alert_threshold_high: f64,
    pub alert_threshold_medium: f64,
    pub critical_threshold: f64,
}

impl Default for FillRateSection {
    fn default() -> Self {
        Self {
            window_size: 100,
            alert_threshold_high: 0.80,
            alert_threshold_medium: 0.75,
            critical_threshold: 0.60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct MonitoringSection {
    pub fill_rate: FillRateSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CostSection {
    pub maker_fee_bps: Decimal,
    pub taker_fee_bps: Decimal,
}

impl Default for CostSection {
    fn default() -> Self {
        Self {
            maker_fee_bps: Decimal::new(15, 1),
            taker_fee_bps: Decimal::new(45, 1),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoopSection {
    /// Skip an iteration when the snapshot is older than this
    pub max_staleness_ms: i64,
    /// Warn when one iteration exceeds this budget
    pub iteration_target_ms: u64,
    /// Sizing coefficient: size = min(base, k * |value| * nav / mid)
    pub size_scale_k: Decimal,
    /// Health check cadence
    pub health_check_secs: u64,
}

impl Default for LoopSection {
    fn default() -> Self {
        Self {
            max_staleness_ms: 500,
            iteration_target_ms: 100,
            size_scale_k: Decimal::new(1, 3),
            health_check_secs: 60,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub symbols: Vec<SymbolConfig>,
    #[serde(default = "default_nav")]
    pub initial_nav: Decimal,
    #[serde(default)]
    pub signals: SignalsConfig,
    #[serde(default)]
    pub execution: ExecutionSection,
    #[serde(default)]
    pub risk: RiskSection,
    #[serde(default)]
    pub monitoring: MonitoringSection,
    #[serde(default)]
    pub cost: CostSection,
    #[serde(default, rename = "loop")]
    pub loop_cfg: LoopSection,
}

impl EngineConfig {
    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::Invalid("symbols must not be empty".into()));
        }
        for symbol in &self.symbols {
            if symbol.tick_size <= Decimal::ZERO {
                return Err(ConfigError::Invalid(format!(
                    "symbol {} tick_size must be positive",
                    symbol.name
                )));
            }
            if symbol.base_size <= Decimal::ZERO {
                return Err(ConfigError::Invalid(format!(
                    "symbol {} base_size must be positive",
                    symbol.name
                )));
            }
        }

        let weights = &self.signals.weights;
        let weight_sum = weights.obi + weights.microprice + weights.impact;
        if !(0.99..=1.01).contains(&weight_sum) {
            return Err(ConfigError::Invalid(format!(
                "signal weights must sum to ~1.0, got {weight_sum:.3}"
            )));
        }

        let thresholds = &self.signals.thresholds;
        if !(thresholds.theta_1 > thresholds.theta_2 && thresholds.theta_2 > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "thresholds must satisfy theta_1 > theta_2 > 0, got {} and {}",
                thresholds.theta_1, thresholds.theta_2
            )));
        }
        if thresholds.theta_1 > 1.0 {
            return Err(ConfigError::Invalid(
                "theta_1 must be within [0, 1]".into(),
            ));
        }

        for (name, pct) in [
            ("risk.max_single_loss_pct", self.risk.max_single_loss_pct),
            (
                "risk.max_daily_drawdown_pct",
                self.risk.max_daily_drawdown_pct,
            ),
        ] {
            if pct <= Decimal::ZERO || pct >= Decimal::ONE {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a fraction in (0, 1), got {pct}"
                )));
            }
        }

        let fill_rate = &self.monitoring.fill_rate;
        for (name, value) in [
            ("alert_threshold_high", fill_rate.alert_threshold_high),
            ("alert_threshold_medium", fill_rate.alert_threshold_medium),
            ("critical_threshold", fill_rate.critical_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "monitoring.fill_rate.{name} must be in [0, 1], got {value}"
                )));
            }
        }

        if self.initial_nav <= Decimal::ZERO {
            return Err(ConfigError::Invalid("initial_nav must be positive".into()));
        }
        Ok(())
    }

    pub fn symbol_names(&self) -> Vec<String> {
        self.symbols.iter().map(|s| s.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn minimal_json() -> &'static str {
        r#"{
            "symbols": [{"name": "ETH", "tick_size": "0.1"}]
        }"#
    }

    #[test]
    fn test_minimal_config_with_defaults() {
        let config: EngineConfig = serde_json::from_str(minimal_json()).unwrap();
        config.validate().unwrap();

        assert_eq!(config.symbols[0].name, "ETH");
        assert_eq!(config.symbols[0].base_size, dec!(0.01));
        assert_eq!(config.initial_nav, dec!(100000));
        assert_eq!(config.execution.strategy, ExecutionStrategy::Hybrid);
        assert_eq!(config.signals.thresholds.theta_1, 0.45);
        assert_eq!(config.cost.maker_fee_bps, dec!(1.5));
        assert!(config.execution.ioc.fallback_on_high);
        assert!(!config.execution.ioc.fallback_on_medium);
    }

    #[test]
    fn test_full_sections_parse() {
        let json = r#"{
            "symbols": [{"name": "ETH", "tick_size": "0.1", "base_size": "0.5"}],
            "initial_nav": "250000",
            "signals": {
                "weights": {"obi": 0.5, "microprice": 0.25, "impact": 0.25},
                "thresholds": {"theta_1": 0.5, "theta_2": 0.2}
            },
            "execution": {
                "strategy": "ioc_only",
                "shallow_maker": {"timeout_high_secs": 4.0, "timeout_medium_secs": 2.0,
                                   "tick_offset": "2", "post_only": false},
                "ioc": {"fallback_on_high": false, "fallback_on_medium": true,
                        "price_adjustment_bps": "5", "max_cross_bps": "15"}
            },
            "risk": {"max_single_loss_pct": "0.01", "max_daily_drawdown_pct": "0.03",
                     "max_position_usd": "50000", "worst_adverse_move_bps": "25"},
            "monitoring": {"fill_rate": {"window_size": 50, "alert_threshold_high": 0.7,
                           "alert_threshold_medium": 0.65, "critical_threshold": 0.5}},
            "cost": {"maker_fee_bps": "1", "taker_fee_bps": "5"},
            "loop": {"max_staleness_ms": 250, "iteration_target_ms": 50,
                     "size_scale_k": "0.002", "health_check_secs": 30}
        }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        config.validate().unwrap();

        assert_eq!(config.execution.strategy, ExecutionStrategy::IocOnly);
        assert_eq!(config.execution.shallow_maker.tick_offset, dec!(2));
        assert_eq!(config.risk.max_position_usd, dec!(50000));
        assert_eq!(config.monitoring.fill_rate.window_size, 50);
        assert_eq!(config.loop_cfg.max_staleness_ms, 250);
    }

    #[test]
    fn test_rejects_bad_weights() {
        let json = r#"{
            "symbols": [{"name": "ETH", "tick_size": "0.1"}],
            "signals": {"weights": {"obi": 0.9, "microprice": 0.3, "impact": 0.3}}
        }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_unordered_thresholds() {
        let json = r#"{
            "symbols": [{"name": "ETH", "tick_size": "0.1"}],
            "signals": {"thresholds": {"theta_1": 0.2, "theta_2": 0.4}}
        }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_symbols() {
        let config: EngineConfig = serde_json::from_str(r#"{"symbols": []}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_percentage_out_of_range() {
        let json = r#"{
            "symbols": [{"name": "ETH", "tick_size": "0.1"}],
            "risk": {"max_daily_drawdown_pct": "1.5"}
        }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }
}
