//! Bounded ring of recent trade prints.
//!
//! Retains trades inside a rolling time window, capped by capacity. The
//! hot path never blocks: when the ring is full the oldest entry is dropped
//! and a counter incremented.

use chrono::{DateTime, Duration, Utc};
use hermes_core::Trade;
use std::collections::VecDeque;

#[derive(Debug)]
pub struct TradeTape {
    window: Duration,
    capacity: usize,
    trades: VecDeque<Trade>,
    dropped: u64,
}

impl TradeTape {
    pub fn new(window_ms: i64, capacity: usize) -> Self {
        Self {
            window: Duration::milliseconds(window_ms),
            capacity,
            trades: VecDeque::with_capacity(capacity),
            dropped: 0,
        }
    }

    /// Append a trade, evicting entries that fell out of the window.
    pub fn push(&mut self, trade: Trade) {
        let cutoff = trade.timestamp - self.window;
        while let Some(front) = self.trades.front() {
            if front.timestamp < cutoff {
                self.trades.pop_front();
            } else {
                break;
            }
        }
        if self.trades.len() == self.capacity {
            self.trades.pop_front();
            self.dropped += 1;
        }
        self.trades.push_back(trade);
    }

    /// Trades still inside the window as of `now`, oldest first.
    pub fn recent(&self, now: DateTime<Utc>) -> Vec<Trade> {
        let cutoff = now - self.window;
        self.trades
            .iter()
            .filter(|t| t.timestamp >= cutoff)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Number of entries evicted due to capacity pressure.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
