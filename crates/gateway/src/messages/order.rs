//! Order message types

use chrono::{DateTime, Utc};
use hermes_core::{OrderId, OrderKind, OrderStatus, Side, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order submission request.
///
/// `nonce` is a client-generated idempotency key: resubmitting the same
/// nonce must not create a second order on the venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Engine-assigned order id, echoed back in acks and state
    pub order_id: OrderId,
    /// Client idempotency nonce
    pub nonce: Uuid,
    pub symbol: Symbol,
    pub side: Side,
    pub kind: OrderKind,
    pub price: Decimal,
    pub size: Decimal,
    /// Reject instead of taking liquidity (maker path only)
    pub post_only: bool,
    pub timestamp: DateTime<Utc>,
}

impl OrderRequest {
    /// Build a resting limit request (the shallow-maker path).
    pub fn limit(
        order_id: OrderId,
        symbol: impl Into<Symbol>,
        side: Side,
        price: Decimal,
        size: Decimal,
        post_only: bool,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            nonce: Uuid::new_v4(),
            symbol: symbol.into(),
            side,
            kind: OrderKind::Limit,
            price,
            size,
            post_only,
            timestamp,
        }
    }

    /// Build an immediate-or-cancel request (the taker path).
    pub fn ioc(
        order_id: OrderId,
        symbol: impl Into<Symbol>,
        side: Side,
        price: Decimal,
        size: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            nonce: Uuid::new_v4(),
            symbol: symbol.into(),
            side,
            kind: OrderKind::Ioc,
            price,
            size,
            post_only: false,
            timestamp,
        }
    }
}

/// Immediate response to a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: OrderId,
    pub status: OrderStatus,
    /// Populated when the venue rejects the order
    pub reject_reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl OrderAck {
    pub fn accepted(order_id: OrderId, timestamp: DateTime<Utc>) -> Self {
        Self {
            order_id,
            status: OrderStatus::Submitted,
            reject_reason: None,
            timestamp,
        }
    }

    pub fn rejected(
        order_id: OrderId,
        reason: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            status: OrderStatus::Rejected,
            reject_reason: Some(reason.into()),
            timestamp,
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.status == OrderStatus::Rejected
    }
}

/// Point-in-time order state from `get_order`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderState {
    pub order_id: OrderId,
    pub status: OrderStatus,
    /// Cumulative filled quantity
    pub filled_size: Decimal,
    /// Size-weighted average fill price, if any quantity filled
    pub avg_fill_price: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

impl OrderState {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// A single fill from `get_fills`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillEvent {
    pub order_id: OrderId,
    /// Fill sequence within the order (0, 1, ...)
    pub seq: u32,
    pub price: Decimal,
    pub size: Decimal,
    /// Fee in quote currency (positive = cost)
    pub fee: Decimal,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_limit_request() {
        let id = Uuid::new_v4();
        let req = OrderRequest::limit(id, "ETH", Side::Buy, dec!(1500.0), dec!(1), true, Utc::now());
        assert_eq!(req.kind, OrderKind::Limit);
        assert!(req.post_only);
        assert_eq!(req.order_id, id);
    }

    #[test]
    fn test_ioc_request_never_post_only() {
        let req = OrderRequest::ioc(Uuid::new_v4(), "ETH", Side::Sell, dec!(1499.9), dec!(1), Utc::now());
        assert_eq!(req.kind, OrderKind::Ioc);
        assert!(!req.post_only);
    }

    #[test]
    fn test_ack_constructors() {
        let id = Uuid::new_v4();
        let ts = Utc::now();
        assert!(!OrderAck::accepted(id, ts).is_rejected());

        let rejected = OrderAck::rejected(id, "post-only would take", ts);
        assert!(rejected.is_rejected());
        assert_eq!(rejected.reject_reason.as_deref(), Some("post-only would take"));
    }
}
