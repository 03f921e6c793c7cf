//! Immediate-or-cancel execution.
//!
//! Crosses the spread: a buy prices at the best ask plus a small
//! aggression envelope (capped by `max_cross_bps`), a sell symmetric.
//! Whatever fills immediately fills; the remainder cancels at the venue.
//! Terminal outcomes only.

use std::sync::Arc;
use std::time::Duration;

use hermes_core::{
    CancelToken, Clock, MarketSnapshot, Order, OrderKind, OrderStatus, Side, SignalScore,
    AUDIT_TARGET,
};
use hermes_gateway::{ExchangeAdapter, GatewayError, OrderRequest};
use rust_decimal::Decimal;
use tokio::time::{sleep, timeout, Instant};
use tracing::{error, info, warn};

use crate::error::Result;
use crate::ExecutedOrder;

#[derive(Debug, Clone)]
pub struct IocConfig {
    /// Aggression over the touch, bps
    pub price_adjustment_bps: Decimal,
    /// Hard cap on crossing depth, bps
    pub max_cross_bps: Decimal,
    /// Per-request timeout for adapter calls
    pub request_timeout: Duration,
    /// How long to chase a terminal status
    pub reconcile_grace: Duration,
    /// Status poll cadence during reconcile
    pub poll_interval: Duration,
}

impl Default for IocConfig {
    fn default() -> Self {
        Self {
            price_adjustment_bps: Decimal::from(10),
            max_cross_bps: Decimal::from(20),
            request_timeout: Duration::from_secs(2),
            reconcile_grace: Duration::from_secs(2),
            poll_interval: Duration::from_millis(50),
        }
    }
}

pub struct IocExecutor {
    adapter: Arc<dyn ExchangeAdapter>,
    clock: Arc<dyn Clock>,
    config: IocConfig,
}

impl IocExecutor {
    pub fn new(adapter: Arc<dyn ExchangeAdapter>, clock: Arc<dyn Clock>, config: IocConfig) -> Self {
        Self {
            adapter,
            clock,
            config,
        }
    }

    /// Crossing price: the touch pushed through by the aggression
    /// envelope, rounded outward to a tick multiple.
    fn crossing_price(
        &self,
        snapshot: &MarketSnapshot,
        side: Side,
        tick_size: Decimal,
    ) -> Option<Decimal> {
        let adjustment = self
            .config
            .price_adjustment_bps
            .min(self.config.max_cross_bps)
            / Decimal::from(10_000);
        let raw = match side {
            Side::Buy => snapshot.best_ask()?.price * (Decimal::ONE + adjustment),
            Side::Sell => snapshot.best_bid()?.price * (Decimal::ONE - adjustment),
        };
        if tick_size.is_zero() {
            return Some(raw);
        }
        let ticks = raw / tick_size;
        let rounded = match side {
            // Round toward the aggressive side so the limit stays
            // marketable after rounding.
            Side::Buy => ticks.ceil(),
            Side::Sell => ticks.floor(),
        };
        Some(rounded * tick_size)
    }

    /// Execute an IOC for `score`'s direction and `size`. Returns `None`
    /// when nothing was submitted.
    pub async fn execute(
        &self,
        score: &SignalScore,
        snapshot: &MarketSnapshot,
        size: Decimal,
        tick_size: Decimal,
        cancel: &CancelToken,
    ) -> Result<Option<ExecutedOrder>> {
        let Some(side) = score.direction() else {
            return Ok(None);
        };
        let Some(price) = self.crossing_price(snapshot, side, tick_size) else {
            warn!(symbol = %snapshot.symbol, "ioc skipped: one-sided book");
            return Ok(None);
        };
        let reference_price = snapshot.mid_price;

        let mut order = Order::new(
            snapshot.symbol.clone(),
            side,
            OrderKind::Ioc,
            price,
            size,
            self.clock.now(),
        );
        let request = OrderRequest::ioc(
            order.id,
            order.symbol.clone(),
            side,
            price,
            size,
            order.created_at,
        );

        info!(
            symbol = %order.symbol,
            order_id = %order.id,
            side = side.as_str(),
            %price,
            %size,
            "submitting ioc order"
        );

        match timeout(self.config.request_timeout, self.adapter.place_order(request)).await {
            Ok(Ok(ack)) => {
                if ack.is_rejected() {
                    warn!(
                        order_id = %order.id,
                        reason = ack.reject_reason.as_deref().unwrap_or("rejected"),
                        "ioc order rejected"
                    );
                    return Ok(None);
                }
                order.transition(OrderStatus::Submitted, self.clock.now());
            }
            Ok(Err(GatewayError::Rejected(reason))) => {
                warn!(order_id = %order.id, %reason, "ioc order rejected");
                return Ok(None);
            }
            Ok(Err(e)) if e.is_transient() => {
                warn!(order_id = %order.id, error = %e, "ioc submit unconfirmed, reconciling");
            }
            Ok(Err(e)) => {
                error!(order_id = %order.id, error = %e, "ioc submit failed");
                return Err(e.into());
            }
            Err(_) => {
                warn!(order_id = %order.id, "ioc submit timed out, reconciling");
            }
        }

        // An IOC is terminal at the venue almost immediately; chase the
        // terminal observation within the grace period.
        let grace_deadline = Instant::now() + self.config.reconcile_grace;
        loop {
            match timeout(self.config.request_timeout, self.adapter.get_order(order.id)).await {
                Ok(Ok(state)) => {
                    order.observe_fill(state.filled_size, state.avg_fill_price, state.timestamp);
                    if state.status.is_terminal() {
                        order.transition(state.status, state.timestamp);
                        break;
                    }
                }
                Ok(Err(GatewayError::UnknownOrder(_))) => {
                    // Submit never reached the venue.
                    return Ok(None);
                }
                Ok(Err(e)) => warn!(order_id = %order.id, error = %e, "ioc status poll failed"),
                Err(_) => warn!(order_id = %order.id, "ioc status poll timed out"),
            }
            if Instant::now() >= grace_deadline || cancel.is_cancelled() {
                error!(
                    target: AUDIT_TARGET,
                    order_id = %order.id,
                    symbol = %order.symbol,
                    "ioc not terminal within grace, declaring expired"
                );
                order.transition(OrderStatus::Expired, self.clock.now());
                break;
            }
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = sleep(self.config.poll_interval) => {}
            }
        }

        let fills = match timeout(self.config.request_timeout, self.adapter.get_fills(order.id)).await
        {
            Ok(Ok(fills)) => fills,
            _ => Vec::new(),
        };

        info!(
            target: AUDIT_TARGET,
            order_id = %order.id,
            symbol = %order.symbol,
            status = ?order.status,
            filled_size = %order.filled_size,
            "ioc order terminal"
        );

        Ok(Some(ExecutedOrder {
            order,
            fills,
            reference_price,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hermes_core::{Confidence, Level, SystemClock};
    use hermes_gateway::{SimAdapter, SimBehavior};
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

    fn score(value: f64) -> SignalScore {
        SignalScore::new(value, vec![value], Utc::now()).with_confidence(Confidence::High)
    }

    fn executor(sim: &SimAdapter) -> IocExecutor {
        IocExecutor::new(
            Arc::new(sim.clone()),
            Arc::new(SystemClock),
            IocConfig {
                poll_interval: Duration::from_millis(10),
                reconcile_grace: Duration::from_millis(200),
                ..IocConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_immediate_fill() {
        let sim = SimAdapter::new(SimBehavior::FillAfter(Duration::ZERO));
        let executor = executor(&sim);
        let token = CancelToken::never();

        let executed = executor
            .execute(&score(0.6), &snapshot(), dec!(1), dec!(0.1), &token)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(executed.order.status, OrderStatus::Filled);
        assert_eq!(executed.order.kind, OrderKind::Ioc);
        assert_eq!(executed.fills.len(), 1);
        assert_eq!(executed.reference_price, dec!(1500.0));
        // Priced through the ask, rounded up to a tick: 1500.1 * 1.001.
        assert_eq!(executed.order.price, dec!(1501.7));
    }

    #[tokio::test]
    async fn test_no_fill_cancels() {
        let sim = SimAdapter::new(SimBehavior::NeverFill);
        let executor = executor(&sim);
        let token = CancelToken::never();

        let executed = executor
            .execute(&score(-0.6), &snapshot(), dec!(1), dec!(0.1), &token)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(executed.order.status, OrderStatus::Canceled);
        assert_eq!(executed.order.filled_size, dec!(0));
        assert!(executed.fills.is_empty());
    }

    #[tokio::test]
    async fn test_zero_signal_skips() {
        let sim = SimAdapter::new(SimBehavior::FillAfter(Duration::ZERO));
        let executor = executor(&sim);
        let token = CancelToken::never();

        let result = executor
            .execute(&score(0.0), &snapshot(), dec!(1), dec!(0.1), &token)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_crossing_price_cap() {
        let sim = SimAdapter::new(SimBehavior::NeverFill);
        let executor = IocExecutor::new(
            Arc::new(sim),
            Arc::new(SystemClock),
            IocConfig {
                price_adjustment_bps: dec!(100),
                max_cross_bps: dec!(10),
                ..IocConfig::default()
            },
        );
        // Envelope capped at 10 bps: 1500.1 * 1.001 rounded up.
        let price = executor
            .crossing_price(&snapshot(), Side::Buy, dec!(0.1))
            .unwrap();
        assert_eq!(price, dec!(1501.7));
    }
}
