//! Per-symbol L2 order book.
//!
//! BTreeMaps keep each side sorted; bids are read in descending key order,
//! asks ascending. After every batch the book is trimmed to the configured
//! depth. A crossed top of book latches the `stale` flag: no snapshot is
//! produced until a fresh venue snapshot arrives.

use chrono::{DateTime, Utc};
use hermes_core::{Level, MarketSnapshot, Symbol, Trade};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use hermes_gateway::L2Update;

/// Result of applying one update to the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Update applied; book is consistent.
    Applied,
    /// Update produced `best_bid >= best_ask`; book is now stale.
    Crossed,
    /// Delta ignored because the book is awaiting a resync snapshot.
    IgnoredStale,
}

/// Top-N L2 order book for one symbol.
#[derive(Debug)]
pub struct OrderBook {
    symbol: Symbol,
    depth: usize,
    /// price -> size, read in descending order
    bids: BTreeMap<Decimal, Decimal>,
    /// price -> size, read in ascending order
    asks: BTreeMap<Decimal, Decimal>,
    last_update: Option<DateTime<Utc>>,
    stale: bool,
    update_count: u64,
}

impl OrderBook {
    pub fn new(symbol: impl Into<Symbol>, depth: usize) -> Self {
        Self {
            symbol: symbol.into(),
            depth,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            last_update: None,
            stale: false,
            update_count: 0,
        }
    }

    /// Apply a snapshot or delta from the feed.
    pub fn apply(&mut self, update: &L2Update) -> ApplyOutcome {
        match update {
            L2Update::Snapshot {
                symbol,
                bids,
                asks,
                timestamp,
            } => {
                if symbol != &self.symbol {
                    return ApplyOutcome::Applied;
                }
                self.bids.clear();
                self.asks.clear();
                for level in bids {
                    if !level.size.is_zero() {
                        self.bids.insert(level.price, level.size);
                    }
                }
                for level in asks {
                    if !level.size.is_zero() {
                        self.asks.insert(level.price, level.size);
                    }
                }
                self.finish_batch(*timestamp)
            }
            L2Update::Delta {
                symbol,
                bids,
                asks,
                timestamp,
            } => {
                if symbol != &self.symbol {
                    return ApplyOutcome::Applied;
                }
                if self.stale {
                    debug!(symbol = %self.symbol, "delta dropped while awaiting resync");
                    return ApplyOutcome::IgnoredStale;
                }
                for level in bids {
                    if level.is_removal() {
                        self.bids.remove(&level.price);
                    } else {
                        self.bids.insert(level.price, level.size);
                    }
                }
                for level in asks {
                    if level.is_removal() {
                        self.asks.remove(&level.price);
                    } else {
                        self.asks.insert(level.price, level.size);
                    }
                }
                self.finish_batch(*timestamp)
            }
        }
    }

    fn finish_batch(&mut self, timestamp: DateTime<Utc>) -> ApplyOutcome {
        // Trim to the top N on each side.
        while self.bids.len() > self.depth {
            let lowest = *self.bids.keys().next().expect("non-empty");
            self.bids.remove(&lowest);
        }
        while self.asks.len() > self.depth {
            let highest = *self.asks.keys().next_back().expect("non-empty");
            self.asks.remove(&highest);
        }

        self.last_update = Some(timestamp);
        self.update_count += 1;

        if let (Some((bid, _)), Some((ask, _))) = (self.best_bid(), self.best_ask()) {
            if bid >= ask {
                warn!(
                    symbol = %self.symbol,
                    best_bid = %bid,
                    best_ask = %ask,
                    "crossed book, marking stale"
                );
                self.stale = true;
                return ApplyOutcome::Crossed;
            }
        }
        self.stale = false;
        ApplyOutcome::Applied
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn best_bid(&self) -> Option<(Decimal, Decimal)> {
        self.bids.iter().next_back().map(|(p, q)| (*p, *q))
    }

    pub fn best_ask(&self) -> Option<(Decimal, Decimal)> {
        self.asks.iter().next().map(|(p, q)| (*p, *q))
    }

    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some((bid + ask) / Decimal::TWO),
            _ => None,
        }
    }

    pub fn spread_bps(&self) -> Option<Decimal> {
        let (bid, _) = self.best_bid()?;
        let (ask, _) = self.best_ask()?;
        let mid = self.mid_price()?;
        if mid.is_zero() {
            return None;
        }
        Some((ask - bid) / mid * Decimal::from(10_000))
    }

    fn top_bids(&self) -> Vec<Level> {
        self.bids
            .iter()
            .rev()
            .take(self.depth)
            .map(|(p, q)| Level::new(*p, *q))
            .collect()
    }

    fn top_asks(&self) -> Vec<Level> {
        self.asks
            .iter()
            .take(self.depth)
            .map(|(p, q)| Level::new(*p, *q))
            .collect()
    }

    /// Immutable snapshot for signals and executors.
    ///
    /// Returns `None` while the book is stale, one-sided, or empty; no
    /// crossed or partial view is ever published downstream.
    pub fn snapshot(&self, recent_trades: Vec<Trade>) -> Option<MarketSnapshot> {
        if self.stale {
            return None;
        }
        let mid_price = self.mid_price()?;
        Some(MarketSnapshot {
            symbol: self.symbol.clone(),
            timestamp: self.last_update?,
            bids: self.top_bids(),
            asks: self.top_asks(),
            mid_price,
            recent_trades,
        })
    }
}
