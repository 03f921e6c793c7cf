//! Market data message types

use chrono::{DateTime, Utc};
use hermes_core::{Level, Side, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order book level on the wire (price + aggregated size)
pub type BookLevel = Level;

/// L2 order book update message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum L2Update {
    /// Full snapshot of the top of book
    Snapshot {
        symbol: Symbol,
        bids: Vec<BookLevel>,
        asks: Vec<BookLevel>,
        timestamp: DateTime<Utc>,
    },
    /// Incremental update (size = 0 removes the level)
    Delta {
        symbol: Symbol,
        bids: Vec<BookLevel>,
        asks: Vec<BookLevel>,
        timestamp: DateTime<Utc>,
    },
}

impl L2Update {
    pub fn snapshot(
        symbol: impl Into<Symbol>,
        bids: Vec<BookLevel>,
        asks: Vec<BookLevel>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::Snapshot {
            symbol: symbol.into(),
            bids,
            asks,
            timestamp,
        }
    }

    pub fn delta(
        symbol: impl Into<Symbol>,
        bids: Vec<BookLevel>,
        asks: Vec<BookLevel>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::Delta {
            symbol: symbol.into(),
            bids,
            asks,
            timestamp,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Self::Snapshot { symbol, .. } => symbol,
            Self::Delta { symbol, .. } => symbol,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Snapshot { timestamp, .. } => *timestamp,
            Self::Delta { timestamp, .. } => *timestamp,
        }
    }

    pub fn is_snapshot(&self) -> bool {
        matches!(self, Self::Snapshot { .. })
    }
}

/// Public trade print on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeMessage {
    pub symbol: Symbol,
    pub price: Decimal,
    pub size: Decimal,
    /// Aggressor side
    pub side: Side,
    pub timestamp: DateTime<Utc>,
}

impl TradeMessage {
    pub fn new(
        symbol: impl Into<Symbol>,
        price: Decimal,
        size: Decimal,
        side: Side,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            size,
            side,
            timestamp,
        }
    }

    pub fn notional(&self) -> Decimal {
        self.price * self.size
    }
}

/// Everything the streaming side of the adapter can emit.
///
/// Within one symbol, events arrive in feed order; across symbols there is
/// no ordering guarantee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MarketEvent {
    L2(L2Update),
    Trade(TradeMessage),
}

impl MarketEvent {
    pub fn symbol(&self) -> &str {
        match self {
            Self::L2(update) => update.symbol(),
            Self::Trade(trade) => &trade.symbol,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_update_accessors() {
        let ts = Utc::now();
        let update = L2Update::snapshot(
            "ETH",
            vec![BookLevel::new(dec!(1499.9), dec!(10))],
            vec![BookLevel::new(dec!(1500.1), dec!(10))],
            ts,
        );
        assert_eq!(update.symbol(), "ETH");
        assert!(update.is_snapshot());
        assert_eq!(update.timestamp(), ts);
    }

    #[test]
    fn test_trade_notional() {
        let trade = TradeMessage::new("ETH", dec!(1500), dec!(0.5), Side::Buy, Utc::now());
        assert_eq!(trade.notional(), dec!(750));
        assert_eq!(MarketEvent::Trade(trade).symbol(), "ETH");
    }
}
