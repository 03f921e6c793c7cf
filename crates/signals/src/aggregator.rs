//! Signal aggregation.
//!
//! Weighted blend of the configured signals, normalized by the weight sum
//! (equal to the plain weighted sum when weights sum to 1) and clamped to
//! [-1, 1]. Individual component values are preserved on the score for
//! attribution.

use chrono::{DateTime, Utc};
use hermes_core::SignalScore;
use tracing::debug;

use crate::Signal;

pub struct SignalAggregator {
    signals: Vec<Box<dyn Signal>>,
}

impl SignalAggregator {
    pub fn new(signals: Vec<Box<dyn Signal>>) -> Self {
        Self { signals }
    }

    /// Evaluate all signals against `snapshot` and blend them.
    ///
    /// The returned score carries `Confidence::Low`; the caller classifies
    /// it (see [`crate::SignalClassifier`]).
    pub fn aggregate(
        &self,
        snapshot: &hermes_core::MarketSnapshot,
        timestamp: DateTime<Utc>,
    ) -> SignalScore {
        let mut components = Vec::with_capacity(self.signals.len());
        let mut weighted_sum = 0.0;
        let mut weight_sum = 0.0;

        for signal in &self.signals {
            let value = signal.evaluate(snapshot);
            debug!(
                signal = signal.name(),
                value,
                weight = signal.weight(),
                "signal evaluated"
            );
            components.push(value);
            weighted_sum += value * signal.weight();
            weight_sum += signal.weight();
        }

        let value = if weight_sum == 0.0 {
            0.0
        } else {
            weighted_sum / weight_sum
        };

        SignalScore::new(value, components, timestamp)
    }

    /// (name, weight) of each configured signal, in evaluation order.
    pub fn weights(&self) -> Vec<(&'static str, f64)> {
        self.signals.iter().map(|s| (s.name(), s.weight())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::{Level, MarketSnapshot};
    use rust_decimal_macros::dec;

    struct Constant {
        value: f64,
        weight: f64,
    }

    impl Signal for Constant {
        fn name(&self) -> &'static str {
            "constant"
        }
        fn weight(&self) -> f64 {
            self.weight
        }
        fn evaluate(&self, _snapshot: &MarketSnapshot) -> f64 {
            self.value
        }
    }

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot {
            symbol: "ETH".to_string(),
            timestamp: Utc::now(),
            bids: vec![Level::new(dec!(1499.9), dec!(10))],
            asks: vec![Level::new(dec!(1500.1), dec!(10))],
            mid_price: dec!(1500.0),
            recent_trades: Vec::new(),
        }
    }

    #[test]
    fn test_weighted_blend() {
        let aggregator = SignalAggregator::new(vec![
            Box::new(Constant { value: 0.8, weight: 0.5 }),
            Box::new(Constant { value: 0.2, weight: 0.5 }),
        ]);
        let score = aggregator.aggregate(&snapshot(), Utc::now());
        assert!((score.value - 0.5).abs() < 1e-9);
        assert_eq!(score.components, vec![0.8, 0.2]);
    }

    #[test]
    fn test_identical_components_equal_aggregate() {
        // With weights summing to 1, equal components yield that value.
        let aggregator = SignalAggregator::new(vec![
            Box::new(Constant { value: 0.6, weight: 0.4 }),
            Box::new(Constant { value: 0.6, weight: 0.3 }),
            Box::new(Constant { value: 0.6, weight: 0.3 }),
        ]);
        let score = aggregator.aggregate(&snapshot(), Utc::now());
        assert!((score.value - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_zero_weights_give_zero() {
        let aggregator = SignalAggregator::new(vec![Box::new(Constant {
            value: 0.9,
            weight: 0.0,
        })]);
        let score = aggregator.aggregate(&snapshot(), Utc::now());
        assert_eq!(score.value, 0.0);
    }

    #[test]
    fn test_aggregate_stays_in_unit_range() {
        let aggregator = SignalAggregator::new(vec![
            Box::new(Constant { value: 1.0, weight: 0.7 }),
            Box::new(Constant { value: 1.0, weight: 0.3 }),
        ]);
        let score = aggregator.aggregate(&snapshot(), Utc::now());
        assert!(score.value <= 1.0 && score.value >= -1.0);
    }
}
