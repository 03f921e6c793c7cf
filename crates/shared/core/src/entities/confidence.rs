use serde::{Deserialize, Serialize};

/// Signal confidence band.
///
/// Discretization of the aggregate signal magnitude: `High` routes to the
/// maker-with-fallback path, `Medium` to maker-only, `Low` is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Bands that actually place orders.
    pub fn is_actionable(&self) -> bool {
        !matches!(self, Self::Low)
    }
}
