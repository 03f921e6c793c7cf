//! Hard-limit risk gate.
//!
//! Admission control for every intended order plus NAV/drawdown
//! accounting. The halt latch is monotone: once set by a breach (or by an
//! external escalation) every subsequent `allow` denies until an explicit
//! `reset`. Daily statistics roll over on UTC date change; the latch does
//! not.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use hermes_core::{Clock, MarketSnapshot, Position, Side, AUDIT_TARGET};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct RiskConfig {
    /// Starting net asset value, quote currency
    pub initial_nav: Decimal,
    /// Per-trade worst-case loss cap as a fraction of NAV
    pub max_single_loss_pct: Decimal,
    /// Daily drawdown cap as a fraction of NAV
    pub max_daily_drawdown_pct: Decimal,
    /// Per-symbol position notional cap
    pub max_position_usd: Decimal,
    /// Adverse-move envelope used for worst-case loss estimates
    pub worst_adverse_move_bps: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            initial_nav: Decimal::from(100_000),
            max_single_loss_pct: Decimal::new(8, 3),
            max_daily_drawdown_pct: Decimal::new(5, 2),
            max_position_usd: Decimal::from(10_000),
            worst_adverse_move_bps: Decimal::from(30),
        }
    }
}

/// Why the gate denied an order.
#[derive(Debug, Clone, PartialEq)]
pub enum DenyReason {
    Halted { reason: String },
    PositionLimitExceeded { notional: Decimal, limit: Decimal },
    SingleLossLimitExceeded { worst_case: Decimal, limit: Decimal },
    DailyDrawdownWouldExceed { projected: Decimal, limit: Decimal },
}

impl DenyReason {
    /// Stable code for logs and tests.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Halted { .. } => "halted",
            Self::PositionLimitExceeded { .. } => "position_limit_exceeded",
            Self::SingleLossLimitExceeded { .. } => "single_loss_limit_exceeded",
            Self::DailyDrawdownWouldExceed { .. } => "daily_drawdown_would_exceed",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Halted { reason } => write!(f, "halted: {reason}"),
            Self::PositionLimitExceeded { notional, limit } => {
                write!(f, "position notional {notional} exceeds limit {limit}")
            }
            Self::SingleLossLimitExceeded { worst_case, limit } => {
                write!(f, "worst-case loss {worst_case} exceeds limit {limit}")
            }
            Self::DailyDrawdownWouldExceed { projected, limit } => {
                write!(f, "projected daily pnl {projected} breaches drawdown limit {limit}")
            }
        }
    }
}

/// Admission result.
#[derive(Debug, Clone, PartialEq)]
pub enum RiskDecision {
    Approved,
    Denied { reason: DenyReason },
}

impl RiskDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

/// Point-in-time view of the gate's accounting.
#[derive(Debug, Clone)]
pub struct RiskStateSnapshot {
    pub nav: Decimal,
    pub daily_pnl: Decimal,
    pub daily_realized: Decimal,
    pub daily_peak_nav: Decimal,
    pub halted: bool,
    pub halt_reason: Option<String>,
}

struct NavState {
    nav: Decimal,
    daily_pnl: Decimal,
    daily_realized: Decimal,
    daily_peak_nav: Decimal,
    trading_date: NaiveDate,
}

/// Process-wide risk gate; shared by every symbol loop.
pub struct RiskGate {
    config: RiskConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<NavState>,
    halted: AtomicBool,
    halt_reason: Mutex<Option<String>>,
}

impl RiskGate {
    pub fn new(config: RiskConfig, clock: Arc<dyn Clock>) -> Self {
        let today = clock.now().date_naive();
        let state = NavState {
            nav: config.initial_nav,
            daily_pnl: Decimal::ZERO,
            daily_realized: Decimal::ZERO,
            daily_peak_nav: config.initial_nav,
            trading_date: today,
        };
        Self {
            config,
            clock,
            state: Mutex::new(state),
            halted: AtomicBool::new(false),
            halt_reason: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    /// Pre-trade admission check for an intended order.
    pub fn allow(
        &self,
        side: Side,
        size: Decimal,
        snapshot: &MarketSnapshot,
        position: &Position,
    ) -> RiskDecision {
        if self.is_halted() {
            let reason = self
                .halt_reason
                .lock()
                .clone()
                .unwrap_or_else(|| "halted".to_string());
            return RiskDecision::Denied {
                reason: DenyReason::Halted { reason },
            };
        }

        let mut state = self.state.lock();
        Self::roll_day(&mut state, self.clock.now().date_naive());

        let mid = snapshot.mid_price;
        let nav = state.nav;

        // 1. Position notional cap.
        let new_position = position.size + side.signed(size);
        let new_notional = new_position.abs() * mid;
        if new_notional > self.config.max_position_usd {
            return self.deny(DenyReason::PositionLimitExceeded {
                notional: new_notional,
                limit: self.config.max_position_usd,
            });
        }

        // 2. Worst-case single-trade loss against the adverse-move
        // envelope.
        let worst_case_loss =
            size * mid * self.config.worst_adverse_move_bps / Decimal::from(10_000);
        let single_loss_limit = self.config.max_single_loss_pct * nav;
        if worst_case_loss > single_loss_limit {
            return self.deny(DenyReason::SingleLossLimitExceeded {
                worst_case: worst_case_loss,
                limit: single_loss_limit,
            });
        }

        // 3. Would the trade push the day through the drawdown limit?
        let drawdown_limit = self.config.max_daily_drawdown_pct * nav;
        let projected = state.daily_pnl - worst_case_loss;
        if projected < -drawdown_limit {
            return self.deny(DenyReason::DailyDrawdownWouldExceed {
                projected,
                limit: drawdown_limit,
            });
        }

        debug!(
            side = side.as_str(),
            %size,
            %new_notional,
            %worst_case_loss,
            "order admitted"
        );
        RiskDecision::Approved
    }

    fn deny(&self, reason: DenyReason) -> RiskDecision {
        warn!(code = reason.code(), detail = %reason, "order denied");
        RiskDecision::Denied { reason }
    }

    /// Post-fill accounting. Called once per attributed fill with its
    /// total PnL; trips the halt latch on a hard-limit breach.
    pub fn on_trade(&self, total_pnl: Decimal) {
        let breach: Option<String> = {
            let mut state = self.state.lock();
            Self::roll_day(&mut state, self.clock.now().date_naive());

            state.nav += total_pnl;
            state.daily_pnl += total_pnl;
            state.daily_realized += total_pnl;
            if state.nav > state.daily_peak_nav {
                state.daily_peak_nav = state.nav;
            }

            let nav = state.nav.max(Decimal::ONE);
            let single_loss_limit = self.config.max_single_loss_pct * nav;
            let drawdown_limit = self.config.max_daily_drawdown_pct * nav;

            if total_pnl < -single_loss_limit {
                Some(format!(
                    "single trade loss {} exceeds limit {}",
                    -total_pnl, single_loss_limit
                ))
            } else if state.daily_pnl < -drawdown_limit {
                Some(format!(
                    "daily drawdown {} exceeds limit {}",
                    -state.daily_pnl, drawdown_limit
                ))
            } else {
                None
            }
        };

        if let Some(reason) = breach {
            self.halt(&reason);
        }
    }

    /// Record realized PnL that should not re-run breach checks (e.g.
    /// funding adjustments). Currently unused by the loop but part of the
    /// accounting surface.
    pub fn adjust_nav(&self, delta: Decimal) {
        let mut state = self.state.lock();
        state.nav += delta;
    }

    /// Set the sticky halt latch.
    pub fn halt(&self, reason: &str) {
        if self.halted.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.halt_reason.lock() = Some(reason.to_string());
        error!(
            target: AUDIT_TARGET,
            reason,
            "trading halted"
        );
    }

    /// External reset of the halt latch. Daily statistics are preserved.
    pub fn reset(&self) {
        let previous = self.halt_reason.lock().take();
        self.halted.store(false, Ordering::SeqCst);
        info!(previous = ?previous, "halt latch reset");
    }

    pub fn state(&self) -> RiskStateSnapshot {
        let state = self.state.lock();
        RiskStateSnapshot {
            nav: state.nav,
            daily_pnl: state.daily_pnl,
            daily_realized: state.daily_realized,
            daily_peak_nav: state.daily_peak_nav,
            halted: self.is_halted(),
            halt_reason: self.halt_reason.lock().clone(),
        }
    }

    fn roll_day(state: &mut NavState, today: NaiveDate) {
        if today != state.trading_date {
            info!(
                old_date = %state.trading_date,
                new_date = %today,
                daily_pnl = %state.daily_pnl,
                "new trading day, resetting daily statistics"
            );
            state.trading_date = today;
            state.daily_pnl = Decimal::ZERO;
            state.daily_realized = Decimal::ZERO;
            state.daily_peak_nav = state.nav;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use hermes_core::{Level, ManualClock, Position};
    use rust_decimal_macros::dec;

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot {
            symbol: "ETH".to_string(),
            timestamp: Utc::now(),
            bids: vec![Level::new(dec!(1499.9), dec!(10))],
            asks: vec![Level::new(dec!(1500.1), dec!(10))],
            mid_price: dec!(1500.0),
            recent_trades: Vec::new(),
        }
    }

    fn gate() -> RiskGate {
        RiskGate::new(
            RiskConfig::default(),
            Arc::new(hermes_core::SystemClock),
        )
    }

    #[test]
    fn test_approves_within_limits() {
        let gate = gate();
        let position = Position::new("ETH");
        let decision = gate.allow(Side::Buy, dec!(1), &snapshot(), &position);
        assert!(decision.is_approved());
    }

    #[test]
    fn test_position_limit() {
        let gate = gate();
        let mut position = Position::new("ETH");
        position.size = dec!(6);

        // 6 + 1 = 7 ETH at 1500 = 10500 > 10000 cap.
        let decision = gate.allow(Side::Buy, dec!(1), &snapshot(), &position);
        match decision {
            RiskDecision::Denied { reason } => {
                assert_eq!(reason.code(), "position_limit_exceeded")
            }
            _ => panic!("expected denial"),
        }

        // Reducing the position is fine.
        let decision = gate.allow(Side::Sell, dec!(1), &snapshot(), &position);
        assert!(decision.is_approved());
    }

    #[test]
    fn test_single_loss_limit() {
        let gate = RiskGate::new(
            RiskConfig {
                max_position_usd: Decimal::from(1_000_000),
                ..RiskConfig::default()
            },
            Arc::new(hermes_core::SystemClock),
        );
        let position = Position::new("ETH");
        // Worst case = 300 * 1500 * 30bps = 1350 > 0.8% of 100k = 800.
        let decision = gate.allow(Side::Buy, dec!(300), &snapshot(), &position);
        match decision {
            RiskDecision::Denied { reason } => {
                assert_eq!(reason.code(), "single_loss_limit_exceeded")
            }
            _ => panic!("expected denial"),
        }
    }

    #[test]
    fn test_drawdown_projection_denies() {
        let gate = gate();
        let position = Position::new("ETH");

        // Walk the day down to -4750 without tripping any limit: each
        // loss is under the single-trade cap and the running total stays
        // inside 5% of the (shrinking) NAV.
        for _ in 0..10 {
            gate.on_trade(dec!(-475));
        }
        assert!(!gate.is_halted());

        // A buy whose worst case (4 * 1500 * 30bps = 18) projects past
        // the remaining headroom is denied up front.
        let decision = gate.allow(Side::Buy, dec!(4), &snapshot(), &position);
        match decision {
            RiskDecision::Denied { reason } => {
                assert_eq!(reason.code(), "daily_drawdown_would_exceed")
            }
            _ => panic!("expected denial"),
        }
    }

    #[test]
    fn test_halt_on_drawdown_breach_is_sticky() {
        let gate = gate();
        let position = Position::new("ETH");

        for _ in 0..11 {
            gate.on_trade(dec!(-475));
        }
        // Cumulative -5225 breaches 5% of NAV.
        assert!(gate.is_halted());

        let decision = gate.allow(Side::Buy, dec!(0.01), &snapshot(), &position);
        match decision {
            RiskDecision::Denied { reason } => assert_eq!(reason.code(), "halted"),
            _ => panic!("expected halt denial"),
        }

        // Winning trades do not clear the latch.
        gate.on_trade(dec!(10_000));
        assert!(gate.is_halted());

        // Only an explicit reset does.
        gate.reset();
        assert!(!gate.is_halted());
        assert!(gate
            .allow(Side::Buy, dec!(0.01), &snapshot(), &position)
            .is_approved());
    }

    #[test]
    fn test_halt_on_single_loss() {
        let gate = gate();
        // One catastrophic fill beyond 0.8% of NAV.
        gate.on_trade(dec!(-900));
        assert!(gate.is_halted());
        assert!(gate.state().halt_reason.is_some());
    }

    #[test]
    fn test_daily_rollover_resets_pnl_not_halt() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 23, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let gate = RiskGate::new(RiskConfig::default(), clock.clone());

        gate.on_trade(dec!(-900));
        assert!(gate.is_halted());
        assert_eq!(gate.state().daily_pnl, dec!(-900));

        clock.advance(Duration::hours(2));
        gate.on_trade(dec!(0));
        let state = gate.state();
        assert_eq!(state.daily_pnl, dec!(0));
        // The latch survives the date change.
        assert!(state.halted);
    }
}
