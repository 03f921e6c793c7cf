//! Position accounting.
//!
//! Per-symbol positions updated exactly once per fill: applications are
//! idempotent on `(order_id, fill_seq)`, so replayed fill events are
//! no-ops on position and PnL.

use std::collections::{HashMap, HashSet};

use hermes_core::{Fill, OrderId, Position, Symbol};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, info};

/// Result of applying a fill.
#[derive(Debug, Clone)]
pub struct AppliedFill {
    pub symbol: Symbol,
    pub realized_pnl: Decimal,
    pub new_size: Decimal,
}

/// Shared position tracker; every operation is atomic.
#[derive(Default)]
pub struct PositionManager {
    positions: Mutex<HashMap<Symbol, Position>>,
    applied: Mutex<HashSet<(OrderId, u32)>>,
}

impl PositionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a fill. Returns `None` when this `(order_id, seq)` was
    /// already applied.
    pub fn apply_fill(&self, fill: &Fill) -> Option<AppliedFill> {
        if !self.applied.lock().insert(fill.key()) {
            debug!(order_id = %fill.order_id, seq = fill.seq, "duplicate fill ignored");
            return None;
        }

        let mut positions = self.positions.lock();
        let position = positions
            .entry(fill.symbol.clone())
            .or_insert_with(|| Position::new(fill.symbol.clone()));

        let realized = position.apply_fill(fill.side, fill.size, fill.price, fill.timestamp);
        position.mark(fill.price);

        info!(
            symbol = %fill.symbol,
            side = fill.side.as_str(),
            size = %fill.size,
            price = %fill.price,
            new_size = %position.size,
            realized = %realized,
            "fill applied"
        );

        Some(AppliedFill {
            symbol: fill.symbol.clone(),
            realized_pnl: realized,
            new_size: position.size,
        })
    }

    /// Current position for `symbol` (flat default when unknown).
    pub fn position(&self, symbol: &str) -> Position {
        self.positions
            .lock()
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| Position::new(symbol))
    }

    /// Mark a symbol's position to `mid`.
    pub fn mark(&self, symbol: &str, mid: Decimal) {
        if let Some(position) = self.positions.lock().get_mut(symbol) {
            position.mark(mid);
        }
    }

    pub fn all(&self) -> Vec<Position> {
        self.positions.lock().values().cloned().collect()
    }

    pub fn total_realized_pnl(&self) -> Decimal {
        self.positions.lock().values().map(|p| p.realized_pnl).sum()
    }

    pub fn total_unrealized_pnl(&self) -> Decimal {
        self.positions
            .lock()
            .values()
            .map(|p| p.unrealized_pnl)
            .sum()
    }

    /// Total absolute notional across symbols at the last mark.
    pub fn total_notional(&self) -> Decimal {
        self.positions
            .lock()
            .values()
            .map(|p| {
                if p.size.is_zero() {
                    Decimal::ZERO
                } else {
                    // unrealized = size * (mark - entry), so mark price is
                    // recoverable; avoid carrying a second price field.
                    let mark = if p.size > Decimal::ZERO {
                        p.avg_entry_price + p.unrealized_pnl / p.size
                    } else {
                        p.avg_entry_price - p.unrealized_pnl / p.size.abs()
                    };
                    p.size.abs() * mark
                }
            })
            .sum()
    }
}
