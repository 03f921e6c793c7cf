use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Level, Side, Trade};
use crate::values::Symbol;

/// Immutable market data view handed to signals and executors.
///
/// Bids are sorted descending, asks ascending, both truncated to the book
/// depth. Lives for one iteration of the per-symbol loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: Symbol,
    pub timestamp: DateTime<Utc>,
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
    pub mid_price: Decimal,
    /// Trades within the tape window, oldest first
    pub recent_trades: Vec<Trade>,
}

impl MarketSnapshot {
    pub fn best_bid(&self) -> Option<&Level> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&Level> {
        self.asks.first()
    }

    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.price - bid.price),
            _ => None,
        }
    }

    /// Spread in basis points of the mid price.
    pub fn spread_bps(&self) -> Option<Decimal> {
        match self.spread() {
            Some(spread) if !self.mid_price.is_zero() => {
                Some(spread / self.mid_price * Decimal::from(10_000))
            }
            _ => None,
        }
    }

    /// Depth-weighted mid:
    /// `(ask·bid_size + bid·ask_size) / (bid_size + ask_size)`.
    pub fn microprice(&self) -> Option<Decimal> {
        let (bid, ask) = (self.best_bid()?, self.best_ask()?);
        let total = bid.size + ask.size;
        if total.is_zero() {
            return None;
        }
        Some((bid.price * ask.size + ask.price * bid.size) / total)
    }

    /// The passive side an order of `side` would consume.
    pub fn opposite_levels(&self, side: Side) -> &[Level] {
        match side {
            Side::Buy => &self.asks,
            Side::Sell => &self.bids,
        }
    }

    /// Total size stacked on the top `depth` levels of one side.
    pub fn depth_size(&self, side: Side, depth: usize) -> Decimal {
        let levels = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        levels.iter().take(depth).map(|l| l.size).sum()
    }
}
