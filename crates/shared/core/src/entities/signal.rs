use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Confidence, Side};

/// Aggregated signal score.
///
/// Immutable once built; "changing" a field means constructing a new record
/// (see [`SignalScore::with_confidence`]). The value's sign encodes
/// direction: positive means buy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalScore {
    /// Aggregate value in [-1, 1]
    pub value: f64,
    pub confidence: Confidence,
    /// Individual component values, in aggregator order
    pub components: Vec<f64>,
    pub timestamp: DateTime<Utc>,
}

impl SignalScore {
    /// Build a score, clamping the value into [-1, 1].
    pub fn new(value: f64, components: Vec<f64>, timestamp: DateTime<Utc>) -> Self {
        Self {
            value: value.clamp(-1.0, 1.0),
            confidence: Confidence::Low,
            components,
            timestamp,
        }
    }

    /// New record with the confidence attached.
    pub fn with_confidence(self, confidence: Confidence) -> Self {
        Self { confidence, ..self }
    }

    /// Direction implied by the value's sign; `None` for an exactly-zero
    /// signal.
    pub fn direction(&self) -> Option<Side> {
        if self.value > 0.0 {
            Some(Side::Buy)
        } else if self.value < 0.0 {
            Some(Side::Sell)
        } else {
            None
        }
    }
}
