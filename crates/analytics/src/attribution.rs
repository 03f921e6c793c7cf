//! Online PnL attribution.
//!
//! Decomposes every fill into alpha, fee, slippage, impact, and rebate in
//! quote currency. Alpha is measured independently as the reference-mid
//! move in the traded direction (never back-solved from the total); the
//! identity `total = alpha - fee - slippage - impact + rebate` then
//! defines the total.
//!
//! Health: the rolling alpha share `sum(alpha) / sum(|total|)` is expected
//! to stay >= 0.70 in steady state. Informational only, never a gate.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use hermes_core::{Attribution, OrderId, OrderKind, Side, Symbol};
use parking_lot::Mutex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct AttributorConfig {
    /// Maker fee in bps (positive cost); matches the cost estimator
    pub maker_fee_bps: Decimal,
    /// Taker fee in bps
    pub taker_fee_bps: Decimal,
    /// Alpha share health expectation
    pub alpha_share_threshold: f64,
    /// Rolling window for the alpha share
    pub window: usize,
}

impl Default for AttributorConfig {
    fn default() -> Self {
        Self {
            maker_fee_bps: Decimal::new(15, 1),
            taker_fee_bps: Decimal::new(45, 1),
            alpha_share_threshold: 0.70,
            window: 500,
        }
    }
}

/// Cumulative attribution totals and health.
#[derive(Debug, Clone)]
pub struct AttributionReport {
    pub trades: usize,
    pub alpha: Decimal,
    pub fee: Decimal,
    pub slippage: Decimal,
    pub impact: Decimal,
    pub rebate: Decimal,
    pub total: Decimal,
    /// Rolling-window alpha share, if any trades recorded
    pub alpha_share: Option<f64>,
    pub alpha_healthy: bool,
}

#[derive(Debug, Clone)]
struct Record {
    alpha: Decimal,
    total_abs: Decimal,
}

#[derive(Default)]
struct Totals {
    trades: usize,
    alpha: Decimal,
    fee: Decimal,
    slippage: Decimal,
    impact: Decimal,
    rebate: Decimal,
    total: Decimal,
}

/// Shared attributor; every operation is atomic.
pub struct PnlAttributor {
    config: AttributorConfig,
    window: Mutex<VecDeque<Record>>,
    totals: Mutex<Totals>,
}

impl PnlAttributor {
    pub fn new(config: AttributorConfig) -> Self {
        Self {
            config,
            window: Mutex::new(VecDeque::new()),
            totals: Mutex::new(Totals::default()),
        }
    }

    fn fee_bps(&self, kind: OrderKind) -> Decimal {
        match kind {
            OrderKind::Limit => self.config.maker_fee_bps,
            OrderKind::Ioc => self.config.taker_fee_bps,
        }
    }

    /// Attribute one fill.
    ///
    /// - `reference_mid`: mid at signal time (slippage/alpha reference)
    /// - `current_mid`: mid at attribution time (alpha mark)
    /// - `impact_bps`: the cost estimator's pre-trade impact figure
    #[allow(clippy::too_many_arguments)]
    pub fn record_fill(
        &self,
        order_id: OrderId,
        symbol: &Symbol,
        kind: OrderKind,
        side: Side,
        size: Decimal,
        fill_price: Decimal,
        reference_mid: Decimal,
        current_mid: Decimal,
        impact_bps: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Attribution {
        let notional = size * fill_price;
        let signed_size = side.signed(size);

        let alpha = (current_mid - reference_mid) * signed_size;
        let fee = notional * self.fee_bps(kind) / Decimal::from(10_000);
        let slippage = (fill_price - reference_mid).abs() * size;
        let impact = notional * impact_bps / Decimal::from(10_000);
        // No rebate unless the venue confirms eligibility.
        let rebate = Decimal::ZERO;

        let attribution = Attribution::new(alpha, fee, slippage, impact, rebate);

        {
            let mut totals = self.totals.lock();
            totals.trades += 1;
            totals.alpha += attribution.alpha;
            totals.fee += attribution.fee;
            totals.slippage += attribution.slippage;
            totals.impact += attribution.impact;
            totals.rebate += attribution.rebate;
            totals.total += attribution.total;
        }
        {
            let mut window = self.window.lock();
            if window.len() == self.config.window {
                window.pop_front();
            }
            window.push_back(Record {
                alpha: attribution.alpha,
                total_abs: attribution.total.abs(),
            });
        }

        info!(
            order_id = %order_id,
            %symbol,
            kind = kind.as_str(),
            side = side.as_str(),
            alpha = %attribution.alpha,
            fee = %attribution.fee,
            slippage = %attribution.slippage,
            impact = %attribution.impact,
            total = %attribution.total,
            ts = %timestamp,
            "fill attributed"
        );
        attribution
    }

    /// Rolling alpha share: `sum(alpha) / sum(|total|)` over the window.
    pub fn alpha_share(&self) -> Option<f64> {
        let window = self.window.lock();
        if window.is_empty() {
            return None;
        }
        let alpha: Decimal = window.iter().map(|r| r.alpha).sum();
        let base: Decimal = window.iter().map(|r| r.total_abs).sum();
        if base.is_zero() {
            return None;
        }
        (alpha / base).to_f64()
    }

    pub fn report(&self) -> AttributionReport {
        let totals = self.totals.lock();
        let alpha_share = self.alpha_share();
        let alpha_healthy = match alpha_share {
            Some(share) => share >= self.config.alpha_share_threshold,
            None => true,
        };
        if !alpha_healthy {
            warn!(
                alpha_share = alpha_share.unwrap_or(0.0),
                threshold = self.config.alpha_share_threshold,
                "alpha share below expectation"
            );
        }
        AttributionReport {
            trades: totals.trades,
            alpha: totals.alpha,
            fee: totals.fee,
            slippage: totals.slippage,
            impact: totals.impact,
            rebate: totals.rebate,
            total: totals.total,
            alpha_share,
            alpha_healthy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn attributor() -> PnlAttributor {
        PnlAttributor::new(AttributorConfig::default())
    }

    #[test]
    fn test_maker_fill_at_reference() {
        let attributor = attributor();
        let symbol = "ETH".to_string();
        // Maker buy filled exactly at the reference mid: fee only.
        let attribution = attributor.record_fill(
            Uuid::new_v4(),
            &symbol,
            OrderKind::Limit,
            Side::Buy,
            dec!(1),
            dec!(1500.0),
            dec!(1500.0),
            dec!(1500.0),
            dec!(0),
            Utc::now(),
        );

        // 1.5 bps of 1500 notional.
        assert_eq!(attribution.fee, dec!(0.225));
        assert_eq!(attribution.slippage, dec!(0));
        assert_eq!(attribution.alpha, dec!(0));
        assert_eq!(attribution.total, dec!(-0.225));
    }

    #[test]
    fn test_taker_fill_pays_spread() {
        let attributor = attributor();
        let symbol = "ETH".to_string();
        // IOC buy at 1500.1 against a 1500.0 reference.
        let attribution = attributor.record_fill(
            Uuid::new_v4(),
            &symbol,
            OrderKind::Ioc,
            Side::Buy,
            dec!(1),
            dec!(1500.1),
            dec!(1500.0),
            dec!(1500.0),
            dec!(1),
            Utc::now(),
        );

        // 4.5 bps taker fee on 1500.1 notional.
        assert_eq!(attribution.fee, dec!(0.675045));
        assert_eq!(attribution.slippage, dec!(0.1));
        // Pre-trade impact figure carried through: 1 bp of notional.
        assert_eq!(attribution.impact, dec!(0.15001));
        assert_eq!(
            attribution.total,
            attribution.alpha - attribution.fee - attribution.slippage - attribution.impact
        );
    }

    #[test]
    fn test_alpha_from_mid_move() {
        let attributor = attributor();
        let symbol = "ETH".to_string();
        // Mid moved +2 since the signal on a long 0.5: alpha = +1.
        let attribution = attributor.record_fill(
            Uuid::new_v4(),
            &symbol,
            OrderKind::Limit,
            Side::Buy,
            dec!(0.5),
            dec!(1500.0),
            dec!(1500.0),
            dec!(1502.0),
            dec!(0),
            Utc::now(),
        );
        assert_eq!(attribution.alpha, dec!(1.0));

        // A short against a rising mid has negative alpha.
        let attribution = attributor.record_fill(
            Uuid::new_v4(),
            &symbol,
            OrderKind::Limit,
            Side::Sell,
            dec!(0.5),
            dec!(1502.0),
            dec!(1500.0),
            dec!(1502.0),
            dec!(0),
            Utc::now(),
        );
        assert_eq!(attribution.alpha, dec!(-1.0));
    }

    #[test]
    fn test_report_accumulates() {
        let attributor = attributor();
        let symbol = "ETH".to_string();
        for _ in 0..3 {
            attributor.record_fill(
                Uuid::new_v4(),
                &symbol,
                OrderKind::Limit,
                Side::Buy,
                dec!(1),
                dec!(1500.0),
                dec!(1500.0),
                dec!(1510.0),
                dec!(0),
                Utc::now(),
            );
        }

        let report = attributor.report();
        assert_eq!(report.trades, 3);
        assert_eq!(report.alpha, dec!(30));
        // Alpha dominates costs: healthy.
        let share = report.alpha_share.unwrap();
        assert!(share > 0.9);
        assert!(report.alpha_healthy);
    }

    #[test]
    fn test_alpha_share_unhealthy_when_costs_dominate() {
        let attributor = attributor();
        let symbol = "ETH".to_string();
        // No mid move, taker fees and slippage only.
        attributor.record_fill(
            Uuid::new_v4(),
            &symbol,
            OrderKind::Ioc,
            Side::Buy,
            dec!(1),
            dec!(1500.1),
            dec!(1500.0),
            dec!(1500.0),
            dec!(1),
            Utc::now(),
        );
        let report = attributor.report();
        assert!(report.alpha_share.unwrap() < 0.70);
        assert!(!report.alpha_healthy);
    }

    #[test]
    fn test_empty_report_is_healthy() {
        let report = attributor().report();
        assert_eq!(report.trades, 0);
        assert!(report.alpha_share.is_none());
        assert!(report.alpha_healthy);
    }
}
