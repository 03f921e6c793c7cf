//! Order book imbalance.
//!
//! `OBI = (Σ bid_size − Σ ask_size) / (Σ bid_size + Σ ask_size)` over the
//! top K levels. Positive means stacked bids (buy pressure). With distance
//! weighting enabled (the default), level i of n carries weight
//! `(n − i) / Σ(1..n)` so size near the touch dominates.

use hermes_core::{Level, MarketSnapshot};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::{clamp_unit, Signal};

#[derive(Debug, Clone)]
pub struct Obi {
    levels: usize,
    weight: f64,
    distance_weighted: bool,
}

impl Obi {
    pub fn new(levels: usize, weight: f64) -> Self {
        Self {
            levels,
            weight,
            distance_weighted: true,
        }
    }

    /// Plain (unweighted) volume sums.
    pub fn unweighted(mut self) -> Self {
        self.distance_weighted = false;
        self
    }

    fn volume(&self, levels: &[Level]) -> Decimal {
        let levels = &levels[..levels.len().min(self.levels)];
        if levels.is_empty() {
            return Decimal::ZERO;
        }
        if !self.distance_weighted {
            return levels.iter().map(|l| l.size).sum();
        }

        let n = levels.len();
        let weight_sum = Decimal::from((n * (n + 1)) / 2);
        levels
            .iter()
            .enumerate()
            .map(|(i, level)| level.size * Decimal::from(n - i) / weight_sum)
            .sum()
    }
}

impl Signal for Obi {
    fn name(&self) -> &'static str {
        "obi"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn evaluate(&self, snapshot: &MarketSnapshot) -> f64 {
        let bid_volume = self.volume(&snapshot.bids);
        let ask_volume = self.volume(&snapshot.asks);
        let total = bid_volume + ask_volume;
        if total.is_zero() {
            return 0.0;
        }
        let obi = ((bid_volume - ask_volume) / total).to_f64().unwrap_or(0.0);
        clamp_unit(obi)
    }
}
