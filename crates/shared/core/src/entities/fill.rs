use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{OrderId, Side};
use crate::values::Symbol;

/// A single fill of one of our own orders.
///
/// `(order_id, seq)` identifies a fill uniquely; position and PnL updates
/// are idempotent on that key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: OrderId,
    /// Venue-assigned fill sequence within the order (0, 1, ...)
    pub seq: u32,
    pub symbol: Symbol,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    /// Exchange fee in quote currency (positive = cost)
    pub fee: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Fill {
    pub fn notional(&self) -> Decimal {
        self.price * self.size
    }

    /// Signed size: positive for buys, negative for sells.
    pub fn signed_size(&self) -> Decimal {
        self.side.signed(self.size)
    }

    /// Idempotency key for position/PnL application.
    pub fn key(&self) -> (OrderId, u32) {
        (self.order_id, self.seq)
    }
}
