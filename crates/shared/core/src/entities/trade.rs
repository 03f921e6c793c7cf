use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Side;
use crate::values::Symbol;

/// A public trade print from the venue's trade stream.
///
/// `side` is the aggressor side: `Buy` means a taker lifted the offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: Symbol,
    pub timestamp: DateTime<Utc>,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
}

impl Trade {
    pub fn new(
        symbol: impl Into<Symbol>,
        timestamp: DateTime<Utc>,
        side: Side,
        price: Decimal,
        size: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            side,
            price,
            size,
        }
    }

    pub fn notional(&self) -> Decimal {
        self.price * self.size
    }
}
