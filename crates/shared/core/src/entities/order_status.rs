use serde::{Deserialize, Serialize};

/// Order lifecycle status
///
/// `Created → Submitted → (PartiallyFilled)* → {Filled, Canceled, Rejected,
/// Expired}`. The executor exclusively owns an order from `Created` until a
/// terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Built locally, not yet sent to the venue
    Created,
    /// Accepted by the venue, resting or matching
    Submitted,
    /// Some quantity filled, remainder still working
    PartiallyFilled,
    /// Completely filled
    Filled,
    /// Canceled (by timeout or explicit request)
    Canceled,
    /// Rejected by the venue
    Rejected,
    /// Declared terminal after a reconcile grace period
    Expired,
}

impl OrderStatus {
    /// Returns true if the order is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Rejected | OrderStatus::Expired
        )
    }

    /// Returns true if the order is still working
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            OrderStatus::Created | OrderStatus::Submitted | OrderStatus::PartiallyFilled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_partition() {
        let all = [
            OrderStatus::Created,
            OrderStatus::Submitted,
            OrderStatus::PartiallyFilled,
            OrderStatus::Filled,
            OrderStatus::Canceled,
            OrderStatus::Rejected,
            OrderStatus::Expired,
        ];
        for status in all {
            assert_ne!(status.is_terminal(), status.is_active());
        }
    }
}
