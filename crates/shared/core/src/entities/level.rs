use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order book price level (price + aggregated size)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub price: Decimal,
    pub size: Decimal,
}

impl Level {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }

    /// On incremental updates a zero size means "remove this price level".
    pub fn is_removal(&self) -> bool {
        self.size.is_zero()
    }

    pub fn notional(&self) -> Decimal {
        self.price * self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_removal_marker() {
        assert!(Level::new(dec!(1500.0), dec!(0)).is_removal());
        assert!(!Level::new(dec!(1500.0), dec!(1)).is_removal());
    }
}
