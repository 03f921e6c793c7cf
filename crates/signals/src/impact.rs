//! Taker pressure over the recent trade window.
//!
//! `impact = (buy_volume − sell_volume) / (buy_volume + sell_volume)`
//! across trades inside the last `window_ms`, using the aggressor side.
//! No trades (or zero total volume) yields 0.

use chrono::Duration;
use hermes_core::{MarketSnapshot, Side};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::{clamp_unit, Signal};

#[derive(Debug, Clone)]
pub struct Impact {
    window_ms: i64,
    weight: f64,
}

impl Impact {
    pub fn new(window_ms: i64, weight: f64) -> Self {
        Self { window_ms, weight }
    }
}

impl Signal for Impact {
    fn name(&self) -> &'static str {
        "impact"
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn evaluate(&self, snapshot: &MarketSnapshot) -> f64 {
        let window_start = snapshot.timestamp - Duration::milliseconds(self.window_ms);

        let mut buy_volume = Decimal::ZERO;
        let mut sell_volume = Decimal::ZERO;
        for trade in &snapshot.recent_trades {
            if trade.timestamp < window_start {
                continue;
            }
            match trade.side {
                Side::Buy => buy_volume += trade.size,
                Side::Sell => sell_volume += trade.size,
            }
        }

        let total = buy_volume + sell_volume;
        if total.is_zero() {
            return 0.0;
        }
        let impact = ((buy_volume - sell_volume) / total).to_f64().unwrap_or(0.0);
        clamp_unit(impact)
    }
}
