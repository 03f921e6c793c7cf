use chrono::{DateTime, Utc};
use rust_decimal::prelude::Signed;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Side;
use crate::values::Symbol;

/// Net position for a single symbol.
///
/// `size` is signed: positive = long, negative = short. The average entry
/// price uses a size-weighted moving average when the position grows,
/// proportional realization when it shrinks, and close-then-open semantics
/// across a sign change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: Symbol,
    pub size: Decimal,
    pub avg_entry_price: Decimal,
    pub unrealized_pnl: Decimal,
    pub realized_pnl: Decimal,
    /// When the current position was opened; cleared when flat.
    pub opened_at: Option<DateTime<Utc>>,
}

impl Position {
    pub fn new(symbol: impl Into<Symbol>) -> Self {
        Self {
            symbol: symbol.into(),
            size: Decimal::ZERO,
            avg_entry_price: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            opened_at: None,
        }
    }

    pub fn is_long(&self) -> bool {
        self.size > Decimal::ZERO
    }

    pub fn is_short(&self) -> bool {
        self.size < Decimal::ZERO
    }

    pub fn is_flat(&self) -> bool {
        self.size.is_zero()
    }

    /// Absolute notional of the position at `mark_price`.
    pub fn notional(&self, mark_price: Decimal) -> Decimal {
        self.size.abs() * mark_price
    }

    /// Apply a fill to this position, returning the realized PnL of the
    /// closing portion (zero when the fill only opens or adds).
    pub fn apply_fill(
        &mut self,
        side: Side,
        size: Decimal,
        price: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Decimal {
        let signed = side.signed(size);
        let old_size = self.size;
        let new_size = old_size + signed;

        let mut realized = Decimal::ZERO;

        // Realize the closing portion when the fill reduces exposure.
        if (old_size > Decimal::ZERO && signed < Decimal::ZERO)
            || (old_size < Decimal::ZERO && signed > Decimal::ZERO)
        {
            let close_size = signed.abs().min(old_size.abs());
            realized = if old_size > Decimal::ZERO {
                close_size * (price - self.avg_entry_price)
            } else {
                close_size * (self.avg_entry_price - price)
            };
            self.realized_pnl += realized;
        }

        if new_size.is_zero() {
            // Fully flat: reset entry bookkeeping.
            self.avg_entry_price = Decimal::ZERO;
            self.opened_at = None;
        } else if old_size.is_zero() {
            // Fresh open.
            self.avg_entry_price = price;
            self.opened_at = Some(timestamp);
        } else if old_size.signum() == new_size.signum() {
            if old_size.signum() == signed.signum() {
                // Adding to the position: size-weighted average.
                let total_cost = old_size.abs() * self.avg_entry_price + size * price;
                self.avg_entry_price = total_cost / new_size.abs();
            }
            // Reducing without flipping keeps the entry price.
        } else {
            // Sign change: the residual is a new position at the fill price.
            self.avg_entry_price = price;
            self.opened_at = Some(timestamp);
        }

        self.size = new_size;
        realized
    }

    /// Recompute unrealized PnL against `mark_price`.
    pub fn mark(&mut self, mark_price: Decimal) {
        self.unrealized_pnl = if self.size.is_zero() {
            Decimal::ZERO
        } else if self.size > Decimal::ZERO {
            self.size * (mark_price - self.avg_entry_price)
        } else {
            self.size.abs() * (self.avg_entry_price - mark_price)
        };
    }

    /// Age of the open position at `now`, if any.
    pub fn age(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.opened_at.map(|opened| now - opened)
    }
}
