//! Microprice deviation.
//!
//! `microprice = (ask·bid_size + bid·ask_size) / (bid_size + ask_size)`;
//! the signal is `(microprice − mid) / mid` scaled by `scale_factor` and
//! clamped to [-1, 1]. The raw deviation is sub-bp in a liquid book, so
//! the scale (default 1e4) maps a 1 bp lean to a full-scale signal.

use hermes_core::MarketSnapshot;
use rust_decimal::prelude::ToPrimitive;

use crate::{clamp_unit, Signal};

#[derive(Debug, Clone)]
pub struct Microprice {
    weight: f64,
    scale_factor: f64,
}

impl Microprice {
    pub fn new(weight: f64) -> Self {
        Self {
            weight,
            scale_factor: 10_000.0,
        }
    }

    pub fn with_scale(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }
}

impl Signal for Microprice {
    fn name(&self) -> &'static str {
        "microprice"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn evaluate(&self, snapshot: &MarketSnapshot) -> f64 {
        if snapshot.mid_price.is_zero() {
            return 0.0;
        }
        let Some(microprice) = snapshot.microprice() else {
            return 0.0;
        };
        let deviation = (microprice - snapshot.mid_price) / snapshot.mid_price;
        let scaled = deviation.to_f64().unwrap_or(0.0) * self.scale_factor;
        clamp_unit(scaled)
    }
}
