use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-fill PnL decomposition in quote currency.
///
/// `alpha` is the price move in the traded direction against a reference
/// mid; `fee`, `slippage`, and `impact` are costs (stored positive, signed
/// negative in the total); `rebate` is zero unless the venue confirms
/// rebate eligibility. The identity `total = alpha - fee - slippage -
/// impact + rebate` holds by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribution {
    pub alpha: Decimal,
    pub fee: Decimal,
    pub slippage: Decimal,
    pub impact: Decimal,
    pub rebate: Decimal,
    pub total: Decimal,
}

impl Attribution {
    pub fn new(
        alpha: Decimal,
        fee: Decimal,
        slippage: Decimal,
        impact: Decimal,
        rebate: Decimal,
    ) -> Self {
        Self {
            alpha,
            fee,
            slippage,
            impact,
            rebate,
            total: alpha - fee - slippage - impact + rebate,
        }
    }

    /// Sum of the cost components (positive number).
    pub fn total_cost(&self) -> Decimal {
        self.fee + self.slippage + self.impact
    }
}
