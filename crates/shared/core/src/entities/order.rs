use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{OrderKind, OrderStatus, Side};
use crate::values::Symbol;

/// Unique identifier for an order
pub type OrderId = Uuid;

/// Full order details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub kind: OrderKind,
    pub price: Decimal,
    pub size: Decimal,
    pub filled_size: Decimal,
    /// Size-weighted average price of fills received so far
    pub avg_fill_price: Option<Decimal>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub last_update_at: DateTime<Utc>,
}

impl Order {
    /// Create a new order in `Created` status.
    pub fn new(
        symbol: impl Into<Symbol>,
        side: Side,
        kind: OrderKind,
        price: Decimal,
        size: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.into(),
            side,
            kind,
            price,
            size,
            filled_size: Decimal::ZERO,
            avg_fill_price: None,
            status: OrderStatus::Created,
            created_at: timestamp,
            last_update_at: timestamp,
        }
    }

    /// Remaining quantity to be filled
    pub fn remaining_size(&self) -> Decimal {
        self.size - self.filled_size
    }

    /// True if the order is completely filled
    pub fn is_filled(&self) -> bool {
        self.filled_size >= self.size
    }

    /// Notional of the filled quantity at the average fill price
    /// (falls back to the limit price when no average is known).
    pub fn filled_notional(&self) -> Decimal {
        self.filled_size * self.avg_fill_price.unwrap_or(self.price)
    }

    /// Record a cumulative fill observation from the venue.
    ///
    /// `filled_size` is cumulative, never per-fill; observations that move
    /// backwards are ignored.
    pub fn observe_fill(
        &mut self,
        cumulative_size: Decimal,
        avg_price: Option<Decimal>,
        timestamp: DateTime<Utc>,
    ) {
        if cumulative_size < self.filled_size {
            return;
        }
        self.filled_size = cumulative_size.min(self.size);
        if avg_price.is_some() {
            self.avg_fill_price = avg_price;
        }
        self.status = if self.is_filled() {
            OrderStatus::Filled
        } else if self.filled_size > Decimal::ZERO {
            OrderStatus::PartiallyFilled
        } else {
            self.status
        };
        self.last_update_at = timestamp;
    }

    /// Transition to a new status, stamping the update time.
    pub fn transition(&mut self, status: OrderStatus, timestamp: DateTime<Utc>) {
        self.status = status;
        self.last_update_at = timestamp;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_order() -> Order {
        Order::new("ETH", Side::Buy, OrderKind::Limit, dec!(1500.0), dec!(2), Utc::now())
    }

    #[test]
    fn test_new_order_is_created() {
        let order = sample_order();
        assert_eq!(order.status, OrderStatus::Created);
        assert_eq!(order.remaining_size(), dec!(2));
        assert!(!order.is_filled());
    }

    #[test]
    fn test_observe_partial_then_full() {
        let mut order = sample_order();
        let ts = Utc::now();

        order.observe_fill(dec!(0.5), Some(dec!(1500.0)), ts);
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        assert_eq!(order.remaining_size(), dec!(1.5));

        order.observe_fill(dec!(2), Some(dec!(1500.0)), ts);
        assert_eq!(order.status, OrderStatus::Filled);
        assert!(order.is_filled());
        assert_eq!(order.filled_notional(), dec!(3000.0));
    }

    #[test]
    fn test_backwards_fill_observation_ignored() {
        let mut order = sample_order();
        let ts = Utc::now();

        order.observe_fill(dec!(1), Some(dec!(1500.0)), ts);
        order.observe_fill(dec!(0.5), Some(dec!(1499.0)), ts);
        assert_eq!(order.filled_size, dec!(1));
        assert_eq!(order.avg_fill_price, Some(dec!(1500.0)));
    }
}
