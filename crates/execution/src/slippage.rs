//! Slippage estimation.
//!
//! Two views of slippage, both in bps and always positive-is-adverse:
//!
//! - a pre-trade **book walk** that sweeps the passive side of a snapshot
//!   and compares the weighted fill price against the best quote
//! - a rolling **(symbol, side) history** of realized slippage; `estimate`
//!   returns the median of recent observations scaled by a bounded,
//!   non-decreasing size factor

use std::collections::{HashMap, VecDeque};

use hermes_core::{MarketSnapshot, Side, Symbol};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SlippageConfig {
    /// Returned when a segment has no history yet
    pub default_bps: Decimal,
    /// Max retained observations per (symbol, side)
    pub capacity: usize,
    /// Book-walk acceptance bound
    pub max_slippage_bps: Decimal,
}

impl Default for SlippageConfig {
    fn default() -> Self {
        Self {
            default_bps: Decimal::new(15, 1),
            capacity: 1000,
            max_slippage_bps: Decimal::from(20),
        }
    }
}

/// Result of sweeping the book for a hypothetical order.
#[derive(Debug, Clone)]
pub struct BookWalk {
    pub estimated_price: Decimal,
    pub slippage_bps: Decimal,
    pub levels_consumed: usize,
    pub acceptable: bool,
}

#[derive(Debug, Clone, Copy)]
struct Observation {
    slippage_bps: Decimal,
    notional: Decimal,
}

/// Shared slippage estimator; every operation is atomic.
pub struct SlippageEstimator {
    config: SlippageConfig,
    history: Mutex<HashMap<(Symbol, Side), VecDeque<Observation>>>,
}

impl SlippageEstimator {
    pub fn new(config: SlippageConfig) -> Self {
        Self {
            config,
            history: Mutex::new(HashMap::new()),
        }
    }

    /// Sweep the passive side of `snapshot` with an order of `size`.
    ///
    /// Returns `None` when the passive side is empty. Partial liquidity
    /// walks as far as the book goes; the weighted price covers the
    /// fillable quantity.
    pub fn book_walk(&self, snapshot: &MarketSnapshot, side: Side, size: Decimal) -> Option<BookWalk> {
        let levels = snapshot.opposite_levels(side);
        let reference = levels.first()?.price;
        if reference.is_zero() {
            return None;
        }

        let mut remaining = size;
        let mut cost = Decimal::ZERO;
        let mut filled = Decimal::ZERO;
        let mut consumed = 0usize;
        for level in levels {
            if remaining <= Decimal::ZERO {
                break;
            }
            let take = remaining.min(level.size);
            cost += take * level.price;
            filled += take;
            remaining -= take;
            consumed += 1;
        }
        if filled.is_zero() {
            return None;
        }

        let estimated_price = cost / filled;
        let slippage_bps = Self::signed_bps(estimated_price, reference, side);
        Some(BookWalk {
            estimated_price,
            slippage_bps,
            levels_consumed: consumed,
            acceptable: slippage_bps <= self.config.max_slippage_bps,
        })
    }

    /// Realized slippage of a fill against its reference price, positive
    /// when adverse (paid up on a buy, hit down on a sell).
    pub fn actual_slippage_bps(fill_price: Decimal, reference_price: Decimal, side: Side) -> Decimal {
        if reference_price.is_zero() {
            return Decimal::ZERO;
        }
        Self::signed_bps(fill_price, reference_price, side)
    }

    fn signed_bps(price: Decimal, reference: Decimal, side: Side) -> Decimal {
        let mut diff = price - reference;
        if side == Side::Sell {
            diff = -diff;
        }
        diff / reference * Decimal::from(10_000)
    }

    /// Append a realized observation for `(symbol, side)`.
    pub fn record(&self, symbol: &str, side: Side, slippage_bps: Decimal, notional: Decimal) {
        let mut history = self.history.lock();
        let segment = history
            .entry((symbol.to_string(), side))
            .or_insert_with(VecDeque::new);
        if segment.len() == self.config.capacity {
            segment.pop_front();
        }
        segment.push_back(Observation {
            slippage_bps,
            notional,
        });
        debug!(symbol, side = side.as_str(), %slippage_bps, "slippage recorded");
    }

    /// Expected slippage for an order of `notional` on `(symbol, side)`:
    /// `median(recent) * size_factor(notional)`. Empty history returns the
    /// configured default.
    pub fn estimate(&self, symbol: &str, side: Side, notional: Decimal) -> Decimal {
        let history = self.history.lock();
        let Some(segment) = history.get(&(symbol.to_string(), side)) else {
            return self.config.default_bps;
        };
        if segment.is_empty() {
            return self.config.default_bps;
        }

        let median_bps = median(segment.iter().map(|o| o.slippage_bps));
        let median_notional = median(segment.iter().map(|o| o.notional));
        median_bps * size_factor(notional, median_notional)
    }

    /// Observations retained for `(symbol, side)`.
    pub fn history_len(&self, symbol: &str, side: Side) -> usize {
        self.history
            .lock()
            .get(&(symbol.to_string(), side))
            .map_or(0, |s| s.len())
    }
}

/// Non-decreasing size scaling: identity up to the median notional, then
/// linear growth reaching 2x at 10x the median.
fn size_factor(notional: Decimal, median_notional: Decimal) -> Decimal {
    if median_notional <= Decimal::ZERO || notional <= median_notional {
        return Decimal::ONE;
    }
    let ratio = notional / median_notional;
    let factor = Decimal::ONE + (ratio - Decimal::ONE) / Decimal::from(9);
    factor.min(Decimal::TWO)
}

fn median(values: impl Iterator<Item = Decimal>) -> Decimal {
    let mut sorted: Vec<Decimal> = values.collect();
    sorted.sort();
    let n = sorted.len();
    if n == 0 {
        return Decimal::ZERO;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / Decimal::TWO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hermes_core::Level;
    use rust_decimal_macros::dec;

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot {
            symbol: "ETH".to_string(),
            timestamp: Utc::now(),
            bids: vec![Level::new(dec!(1499.9), dec!(10))],
            asks: vec![Level::new(dec!(1500.1), dec!(1)), Level::new(dec!(1500.3), dec!(2))],
            mid_price: dec!(1500.0),
            recent_trades: Vec::new(),
        }
    }

    #[test]
    fn test_book_walk_single_level() {
        let estimator = SlippageEstimator::new(SlippageConfig::default());
        let walk = estimator.book_walk(&snapshot(), Side::Buy, dec!(1)).unwrap();
        assert_eq!(walk.estimated_price, dec!(1500.1));
        assert_eq!(walk.slippage_bps, dec!(0));
        assert_eq!(walk.levels_consumed, 1);
        assert!(walk.acceptable);
    }

    #[test]
    fn test_book_walk_multi_level() {
        let estimator = SlippageEstimator::new(SlippageConfig::default());
        // 1 @ 1500.1 + 1 @ 1500.3 -> weighted 1500.2, 0.67 bps over best
        let walk = estimator.book_walk(&snapshot(), Side::Buy, dec!(2)).unwrap();
        assert_eq!(walk.estimated_price, dec!(1500.2));
        assert!(walk.slippage_bps > dec!(0.6) && walk.slippage_bps < dec!(0.7));
        assert_eq!(walk.levels_consumed, 2);
    }

    #[test]
    fn test_book_walk_empty_side() {
        let estimator = SlippageEstimator::new(SlippageConfig::default());
        let mut snap = snapshot();
        snap.asks.clear();
        assert!(estimator.book_walk(&snap, Side::Buy, dec!(1)).is_none());
    }

    #[test]
    fn test_actual_slippage_sign_convention() {
        // Buy above reference: adverse, positive.
        let bps = SlippageEstimator::actual_slippage_bps(dec!(1500.1), dec!(1500.0), Side::Buy);
        assert!(bps > dec!(0));
        // Sell above reference: favorable, negative.
        let bps = SlippageEstimator::actual_slippage_bps(dec!(1500.1), dec!(1500.0), Side::Sell);
        assert!(bps < dec!(0));
    }

    #[test]
    fn test_estimate_defaults_then_tracks_median() {
        let estimator = SlippageEstimator::new(SlippageConfig::default());
        assert_eq!(estimator.estimate("ETH", Side::Buy, dec!(1500)), dec!(1.5));

        estimator.record("ETH", Side::Buy, dec!(2), dec!(1500));
        estimator.record("ETH", Side::Buy, dec!(4), dec!(1500));
        estimator.record("ETH", Side::Buy, dec!(6), dec!(1500));

        // Median 4 bps at the median notional (identity factor).
        assert_eq!(estimator.estimate("ETH", Side::Buy, dec!(1500)), dec!(4));
        // Sides are segmented.
        assert_eq!(estimator.estimate("ETH", Side::Sell, dec!(1500)), dec!(1.5));
    }

    #[test]
    fn test_size_factor_bounds() {
        assert_eq!(size_factor(dec!(100), dec!(100)), dec!(1));
        assert_eq!(size_factor(dec!(50), dec!(100)), dec!(1));
        // 10x the median notional doubles the estimate.
        assert_eq!(size_factor(dec!(1000), dec!(100)), dec!(2));
        // And it never exceeds the cap.
        assert_eq!(size_factor(dec!(5000), dec!(100)), dec!(2));
    }

    #[test]
    fn test_history_trimmed_to_capacity() {
        let estimator = SlippageEstimator::new(SlippageConfig {
            capacity: 3,
            ..SlippageConfig::default()
        });
        for i in 0..5 {
            estimator.record("ETH", Side::Buy, Decimal::from(i), dec!(1000));
        }
        assert_eq!(estimator.history_len("ETH", Side::Buy), 3);
        // Median over the surviving {2, 3, 4}.
        assert_eq!(estimator.estimate("ETH", Side::Buy, dec!(1000)), dec!(3));
    }
}
