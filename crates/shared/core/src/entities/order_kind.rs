use serde::{Deserialize, Serialize};

/// Order kind.
///
/// The engine only places two kinds of orders: a resting limit (the shallow
/// maker path) and an immediate-or-cancel (the taker path). Fee selection
/// dispatches on this tag; see `CostEstimatorConfig::fee_bps`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    /// Resting limit order (maker fee when it rests).
    Limit,
    /// Immediate-or-cancel (taker fee).
    Ioc,
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Limit => "limit",
            Self::Ioc => "ioc",
        }
    }

    /// True if this kind crosses the spread by construction.
    pub fn is_taker(&self) -> bool {
        matches!(self, Self::Ioc)
    }
}
