//! Confidence classification.
//!
//! Two thresholds `theta_1 > theta_2 > 0` partition the aggregate's
//! magnitude into {HIGH, MEDIUM, LOW}. Thresholds can be recalibrated from
//! a sample of historical magnitudes (90th / 70th percentiles), but never
//! mid-execution of an order: the trading loop classifies before handing
//! off to the executor and recalibrates only between intents.

use hermes_core::Confidence;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("thresholds must satisfy theta_1 > theta_2 > 0 (got {theta_1}, {theta_2})")]
    InvalidThresholds { theta_1: f64, theta_2: f64 },

    #[error("insufficient calibration data: {got} < {required}")]
    InsufficientData { got: usize, required: usize },
}

/// Share of each band in a classified sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandDistribution {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone)]
pub struct SignalClassifier {
    theta_1: f64,
    theta_2: f64,
}

impl SignalClassifier {
    pub const MIN_CALIBRATION_SAMPLES: usize = 100;

    pub fn new(theta_1: f64, theta_2: f64) -> Result<Self, ClassifierError> {
        if !(theta_1 > theta_2 && theta_2 > 0.0) {
            return Err(ClassifierError::InvalidThresholds { theta_1, theta_2 });
        }
        Ok(Self { theta_1, theta_2 })
    }

    pub fn thresholds(&self) -> (f64, f64) {
        (self.theta_1, self.theta_2)
    }

    /// Map a signal value to a confidence band by magnitude.
    pub fn classify(&self, value: f64) -> Confidence {
        let magnitude = value.abs();
        if magnitude > self.theta_1 {
            Confidence::High
        } else if magnitude > self.theta_2 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    /// Recalibrate from historical signal values: theta_1 becomes the 90th
    /// percentile of |value|, theta_2 the 70th. Requires at least
    /// [`Self::MIN_CALIBRATION_SAMPLES`] samples.
    pub fn calibrate(&mut self, values: &[f64]) -> Result<(f64, f64), ClassifierError> {
        if values.len() < Self::MIN_CALIBRATION_SAMPLES {
            return Err(ClassifierError::InsufficientData {
                got: values.len(),
                required: Self::MIN_CALIBRATION_SAMPLES,
            });
        }

        let mut magnitudes: Vec<f64> = values.iter().map(|v| v.abs()).collect();
        magnitudes.sort_by(|a, b| a.partial_cmp(b).expect("magnitudes are finite"));

        let theta_1 = percentile(&magnitudes, 0.90);
        let theta_2 = percentile(&magnitudes, 0.70);
        if !(theta_1 > theta_2 && theta_2 > 0.0) {
            return Err(ClassifierError::InvalidThresholds { theta_1, theta_2 });
        }

        self.theta_1 = theta_1;
        self.theta_2 = theta_2;
        info!(theta_1, theta_2, samples = values.len(), "classifier recalibrated");
        Ok((theta_1, theta_2))
    }

    /// Band shares over a sample, for health reporting.
    pub fn distribution(&self, values: &[f64]) -> BandDistribution {
        let mut dist = BandDistribution {
            total: values.len(),
            high: 0,
            medium: 0,
            low: 0,
        };
        for value in values {
            match self.classify(*value) {
                Confidence::High => dist.high += 1,
                Confidence::Medium => dist.medium += 1,
                Confidence::Low => dist.low += 1,
            }
        }
        dist
    }
}

/// Linear-interpolated percentile of a sorted slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = q * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let frac = rank - lower as f64;
    sorted[lower] * (1.0 - frac) + sorted[upper] * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_validation() {
        assert!(SignalClassifier::new(0.45, 0.25).is_ok());
        assert!(SignalClassifier::new(0.25, 0.45).is_err());
        assert!(SignalClassifier::new(0.45, 0.0).is_err());
        assert!(SignalClassifier::new(0.45, -0.1).is_err());
    }

    #[test]
    fn test_classification_partition() {
        let classifier = SignalClassifier::new(0.45, 0.25).unwrap();
        assert_eq!(classifier.classify(0.60), Confidence::High);
        assert_eq!(classifier.classify(-0.60), Confidence::High);
        assert_eq!(classifier.classify(0.30), Confidence::Medium);
        assert_eq!(classifier.classify(-0.30), Confidence::Medium);
        assert_eq!(classifier.classify(0.10), Confidence::Low);
        assert_eq!(classifier.classify(0.0), Confidence::Low);
        // Boundary: exactly theta_1 is MEDIUM, exactly theta_2 is LOW.
        assert_eq!(classifier.classify(0.45), Confidence::Medium);
        assert_eq!(classifier.classify(0.25), Confidence::Low);
    }

    #[test]
    fn test_calibration_percentiles() {
        let mut classifier = SignalClassifier::new(0.45, 0.25).unwrap();
        // |values| uniform over (0.01, 0.02, ..., 2.00) / 2 -> 0.005..1.0
        let values: Vec<f64> = (1..=200).map(|i| i as f64 / 200.0).collect();
        let (theta_1, theta_2) = classifier.calibrate(&values).unwrap();

        assert!((theta_1 - 0.9).abs() < 0.02);
        assert!((theta_2 - 0.7).abs() < 0.02);
        // Roughly 10% of the sample classifies HIGH afterwards.
        let dist = classifier.distribution(&values);
        assert!(dist.high >= 15 && dist.high <= 25);
    }

    #[test]
    fn test_calibration_rejects_small_samples() {
        let mut classifier = SignalClassifier::new(0.45, 0.25).unwrap();
        let values = vec![0.5; 99];
        assert!(matches!(
            classifier.calibrate(&values),
            Err(ClassifierError::InsufficientData { got: 99, .. })
        ));
    }

    #[test]
    fn test_calibration_rejects_degenerate_distribution() {
        let mut classifier = SignalClassifier::new(0.45, 0.25).unwrap();
        // All-zero signals would produce theta_2 == 0.
        let values = vec![0.0; 200];
        assert!(classifier.calibrate(&values).is_err());
        // Original thresholds survive the failed calibration.
        assert_eq!(classifier.thresholds(), (0.45, 0.25));
    }
}
