//! Maker fill-rate monitoring.
//!
//! One bounded window of attempt outcomes per confidence band, recorded
//! directly as `(confidence, filled)`, without an order reference. An
//! attempt is "filled" only when the maker order completed within its
//! window; partials count as failures.
//!
//! Health bands (defaults): HIGH healthy >= 0.80, MEDIUM healthy >= 0.75,
//! both critical < 0.60. Critical raises an audit event and flags a
//! recalibration recommendation for the classifier.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use hermes_core::{Confidence, AUDIT_TARGET};
use parking_lot::Mutex;
use tracing::{debug, error, warn};

#[derive(Debug, Clone)]
pub struct FillRateConfig {
    /// Attempts retained per band
    pub window_size: usize,
    /// Healthy threshold for HIGH
    pub alert_threshold_high: f64,
    /// Healthy threshold for MEDIUM
    pub alert_threshold_medium: f64,
    /// Below this the band is critical
    pub critical_threshold: f64,
}

impl Default for FillRateConfig {
    fn default() -> Self {
        Self {
            window_size: 100,
            alert_threshold_high: 0.80,
            alert_threshold_medium: 0.75,
            critical_threshold: 0.60,
        }
    }
}

/// Band health classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Healthy,
    Degraded,
    Critical,
}

#[derive(Default)]
struct BandWindow {
    window: VecDeque<bool>,
    total_attempts: u64,
    total_filled: u64,
}

impl BandWindow {
    fn record(&mut self, filled: bool, capacity: usize) {
        if self.window.len() == capacity {
            self.window.pop_front();
        }
        self.window.push_back(filled);
        self.total_attempts += 1;
        if filled {
            self.total_filled += 1;
        }
    }

    fn rate(&self) -> Option<f64> {
        if self.window.is_empty() {
            return None;
        }
        let filled = self.window.iter().filter(|f| **f).count();
        Some(filled as f64 / self.window.len() as f64)
    }
}

/// Shared fill-rate monitor; every operation is atomic.
pub struct FillRateMonitor {
    config: FillRateConfig,
    high: Mutex<BandWindow>,
    medium: Mutex<BandWindow>,
    recalibration_recommended: AtomicBool,
}

impl FillRateMonitor {
    pub fn new(config: FillRateConfig) -> Self {
        Self {
            config,
            high: Mutex::new(BandWindow::default()),
            medium: Mutex::new(BandWindow::default()),
            recalibration_recommended: AtomicBool::new(false),
        }
    }

    fn band(&self, confidence: Confidence) -> Option<&Mutex<BandWindow>> {
        match confidence {
            Confidence::High => Some(&self.high),
            Confidence::Medium => Some(&self.medium),
            Confidence::Low => None,
        }
    }

    /// Record one maker attempt outcome. LOW is ignored (no maker attempt
    /// exists for it).
    pub fn record(&self, confidence: Confidence, filled: bool) {
        let Some(band) = self.band(confidence) else {
            return;
        };
        band.lock().record(filled, self.config.window_size);
        debug!(confidence = confidence.as_str(), filled, "maker attempt recorded");
        self.check_alert(confidence);
    }

    /// Window fill rate for a band; `None` until an attempt is recorded.
    pub fn fill_rate(&self, confidence: Confidence) -> Option<f64> {
        self.band(confidence)?.lock().rate()
    }

    /// Lifetime (attempts, filled) counters for a band.
    pub fn totals(&self, confidence: Confidence) -> (u64, u64) {
        match self.band(confidence) {
            Some(band) => {
                let band = band.lock();
                (band.total_attempts, band.total_filled)
            }
            None => (0, 0),
        }
    }

    /// Health classification; an empty window is healthy.
    pub fn health(&self, confidence: Confidence) -> Health {
        let Some(rate) = self.fill_rate(confidence) else {
            return Health::Healthy;
        };
        let healthy_threshold = match confidence {
            Confidence::High => self.config.alert_threshold_high,
            _ => self.config.alert_threshold_medium,
        };
        if rate < self.config.critical_threshold {
            Health::Critical
        } else if rate < healthy_threshold {
            Health::Degraded
        } else {
            Health::Healthy
        }
    }

    /// Consume the recalibration recommendation raised by a critical
    /// band, if any.
    pub fn take_recalibration_recommendation(&self) -> bool {
        self.recalibration_recommended.swap(false, Ordering::SeqCst)
    }

    fn check_alert(&self, confidence: Confidence) {
        match self.health(confidence) {
            Health::Critical => {
                let rate = self.fill_rate(confidence).unwrap_or(0.0);
                error!(
                    target: AUDIT_TARGET,
                    confidence = confidence.as_str(),
                    fill_rate = rate,
                    critical_threshold = self.config.critical_threshold,
                    "maker fill rate critical, recommending threshold recalibration"
                );
                self.recalibration_recommended.store(true, Ordering::SeqCst);
            }
            Health::Degraded => {
                let rate = self.fill_rate(confidence).unwrap_or(0.0);
                warn!(
                    confidence = confidence.as_str(),
                    fill_rate = rate,
                    "maker fill rate below threshold"
                );
            }
            Health::Healthy => {}
        }
    }
}
