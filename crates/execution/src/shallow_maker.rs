//! Shallow passive maker execution.
//!
//! Places a post-only limit one tick inside the touch (buy: best_bid +
//! tick, sell: best_ask - tick), then waits for a fill under a
//! confidence-dependent deadline, polling order status at >= 10 Hz. On
//! expiry the order is canceled and reconciled; partial fills received by
//! then still count toward position and attribution, but only a full fill
//! within the window counts as maker success.

use std::sync::Arc;
use std::time::Duration;

use hermes_core::{
    CancelToken, Clock, Confidence, MarketSnapshot, Order, OrderKind, OrderStatus, Side,
    SignalScore, AUDIT_TARGET,
};
use hermes_gateway::{ExchangeAdapter, GatewayError, OrderRequest, OrderState};
use rust_decimal::Decimal;
use tokio::time::{sleep, timeout, Instant};
use tracing::{error, info, warn};

use crate::error::Result;
use crate::ExecutedOrder;

#[derive(Debug, Clone)]
pub struct MakerConfig {
    /// Fill deadline for HIGH confidence
    pub timeout_high: Duration,
    /// Fill deadline for MEDIUM confidence
    pub timeout_medium: Duration,
    /// Passive offset in ticks inside the touch
    pub tick_offset: Decimal,
    /// Enforce maker status at the venue
    pub post_only: bool,
    /// Status poll cadence (>= 10 Hz)
    pub poll_interval: Duration,
    /// Per-request timeout for adapter calls
    pub request_timeout: Duration,
    /// How long to chase a terminal status after cancel
    pub reconcile_grace: Duration,
}

impl Default for MakerConfig {
    fn default() -> Self {
        Self {
            timeout_high: Duration::from_secs(5),
            timeout_medium: Duration::from_secs(3),
            tick_offset: Decimal::ONE,
            post_only: true,
            poll_interval: Duration::from_millis(100),
            request_timeout: Duration::from_secs(2),
            reconcile_grace: Duration::from_secs(2),
        }
    }
}

/// Outcome of one maker attempt.
#[derive(Debug)]
pub enum MakerAttempt {
    /// No order was placed (no direction, empty book, low confidence).
    NotPlaced,
    /// The venue rejected the submission.
    Rejected {
        reason: String,
        /// True when the request was post-only (reject means would-take).
        post_only_violation: bool,
    },
    /// The order reached a terminal state; inspect `order.status`.
    Terminal(ExecutedOrder),
}

pub struct ShallowMakerExecutor {
    adapter: Arc<dyn ExchangeAdapter>,
    clock: Arc<dyn Clock>,
    config: MakerConfig,
}

impl ShallowMakerExecutor {
    pub fn new(adapter: Arc<dyn ExchangeAdapter>, clock: Arc<dyn Clock>, config: MakerConfig) -> Self {
        Self {
            adapter,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &MakerConfig {
        &self.config
    }

    /// Deadline applied for a confidence band.
    pub fn deadline_for(&self, confidence: Confidence) -> Duration {
        match confidence {
            Confidence::High => self.config.timeout_high,
            _ => self.config.timeout_medium,
        }
    }

    /// One tick inside the opposite side: join the queue ahead of the
    /// current touch without crossing.
    fn passive_price(&self, snapshot: &MarketSnapshot, side: Side, tick_size: Decimal) -> Option<Decimal> {
        let offset = self.config.tick_offset * tick_size;
        match side {
            Side::Buy => snapshot.best_bid().map(|l| l.price + offset),
            Side::Sell => snapshot.best_ask().map(|l| l.price - offset),
        }
    }

    /// Execute a maker attempt for `score` against `snapshot`.
    pub async fn execute(
        &self,
        score: &SignalScore,
        snapshot: &MarketSnapshot,
        size: Decimal,
        tick_size: Decimal,
        cancel: &CancelToken,
    ) -> Result<MakerAttempt> {
        if !score.confidence.is_actionable() {
            return Ok(MakerAttempt::NotPlaced);
        }
        let Some(side) = score.direction() else {
            return Ok(MakerAttempt::NotPlaced);
        };
        let Some(price) = self.passive_price(snapshot, side, tick_size) else {
            warn!(symbol = %snapshot.symbol, "maker skipped: one-sided book");
            return Ok(MakerAttempt::NotPlaced);
        };
        let reference_price = snapshot.mid_price;

        let mut order = Order::new(
            snapshot.symbol.clone(),
            side,
            OrderKind::Limit,
            price,
            size,
            self.clock.now(),
        );
        let request = OrderRequest::limit(
            order.id,
            order.symbol.clone(),
            side,
            price,
            size,
            self.config.post_only,
            order.created_at,
        );

        info!(
            symbol = %order.symbol,
            order_id = %order.id,
            side = side.as_str(),
            %price,
            %size,
            confidence = score.confidence.as_str(),
            "submitting shallow maker order"
        );

        match timeout(self.config.request_timeout, self.adapter.place_order(request)).await {
            Ok(Ok(ack)) => {
                if ack.is_rejected() {
                    let reason = ack
                        .reject_reason
                        .unwrap_or_else(|| "rejected".to_string());
                    warn!(order_id = %order.id, %reason, "maker order rejected");
                    return Ok(MakerAttempt::Rejected {
                        reason,
                        post_only_violation: self.config.post_only,
                    });
                }
                order.transition(OrderStatus::Submitted, self.clock.now());
            }
            Ok(Err(GatewayError::Rejected(reason))) => {
                warn!(order_id = %order.id, %reason, "maker order rejected");
                return Ok(MakerAttempt::Rejected {
                    reason,
                    post_only_violation: self.config.post_only,
                });
            }
            Ok(Err(e)) if e.is_transient() => {
                // Submission outcome unknown: reconcile before giving up.
                if !self.reconcile_submission(&mut order).await {
                    return Ok(MakerAttempt::NotPlaced);
                }
            }
            Ok(Err(e)) => {
                error!(order_id = %order.id, error = %e, "maker submit failed");
                return Err(e.into());
            }
            Err(_) => {
                if !self.reconcile_submission(&mut order).await {
                    return Ok(MakerAttempt::NotPlaced);
                }
            }
        }

        let deadline = Instant::now() + self.deadline_for(score.confidence);
        self.wait_for_fill(order, reference_price, deadline, cancel)
            .await
    }

    /// After a submit timeout, find out whether the venue knows the order.
    async fn reconcile_submission(&self, order: &mut Order) -> bool {
        match timeout(self.config.request_timeout, self.adapter.get_order(order.id)).await {
            Ok(Ok(state)) => {
                self.sync(order, &state);
                true
            }
            _ => {
                warn!(order_id = %order.id, "submit unconfirmed, treating as not placed");
                false
            }
        }
    }

    fn sync(&self, order: &mut Order, state: &OrderState) {
        order.observe_fill(state.filled_size, state.avg_fill_price, state.timestamp);
        if state.status.is_terminal() {
            order.transition(state.status, state.timestamp);
        } else if order.status == OrderStatus::Created {
            order.transition(OrderStatus::Submitted, state.timestamp);
        }
    }

    async fn wait_for_fill(
        &self,
        mut order: Order,
        reference_price: Decimal,
        deadline: Instant,
        cancel: &CancelToken,
    ) -> Result<MakerAttempt> {
        loop {
            let now = Instant::now();
            if now >= deadline || cancel.is_cancelled() {
                break;
            }
            let next_poll = (deadline - now).min(self.config.poll_interval);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(next_poll) => {}
            }

            match timeout(self.config.request_timeout, self.adapter.get_order(order.id)).await {
                Ok(Ok(state)) => {
                    self.sync(&mut order, &state);
                    if order.status == OrderStatus::Filled {
                        info!(
                            target: AUDIT_TARGET,
                            order_id = %order.id,
                            symbol = %order.symbol,
                            filled_size = %order.filled_size,
                            "maker order filled"
                        );
                        return Ok(MakerAttempt::Terminal(
                            self.collect(order, reference_price).await,
                        ));
                    }
                    if order.status.is_terminal() {
                        // Canceled or rejected from the venue side.
                        return Ok(MakerAttempt::Terminal(
                            self.collect(order, reference_price).await,
                        ));
                    }
                }
                Ok(Err(e)) => warn!(order_id = %order.id, error = %e, "status poll failed"),
                Err(_) => warn!(order_id = %order.id, "status poll timed out"),
            }
        }

        // Deadline or cancellation: cancel the remainder and reconcile.
        self.cancel_and_reconcile(&mut order).await;
        info!(
            target: AUDIT_TARGET,
            order_id = %order.id,
            symbol = %order.symbol,
            status = ?order.status,
            filled_size = %order.filled_size,
            "maker order closed on timeout"
        );
        Ok(MakerAttempt::Terminal(
            self.collect(order, reference_price).await,
        ))
    }

    /// Best-effort venue cancel followed by a terminal-status chase. If no
    /// terminal status is observed within the grace period the order is
    /// declared `Expired`.
    async fn cancel_and_reconcile(&self, order: &mut Order) {
        if let Err(e) = timeout(
            self.config.request_timeout,
            self.adapter.cancel_order(order.id),
        )
        .await
        .unwrap_or(Err(GatewayError::Timeout))
        {
            warn!(order_id = %order.id, error = %e, "cancel request failed");
        }

        let grace_deadline = Instant::now() + self.config.reconcile_grace;
        while Instant::now() < grace_deadline {
            match timeout(self.config.request_timeout, self.adapter.get_order(order.id)).await {
                Ok(Ok(state)) => {
                    self.sync(order, &state);
                    if order.status.is_terminal() {
                        return;
                    }
                }
                Ok(Err(e)) => warn!(order_id = %order.id, error = %e, "reconcile poll failed"),
                Err(_) => warn!(order_id = %order.id, "reconcile poll timed out"),
            }
            sleep(self.config.poll_interval).await;
        }

        error!(
            target: AUDIT_TARGET,
            order_id = %order.id,
            symbol = %order.symbol,
            "no terminal status within grace, declaring expired"
        );
        order.transition(OrderStatus::Expired, self.clock.now());
    }

    async fn collect(&self, order: Order, reference_price: Decimal) -> ExecutedOrder {
        let fills = match timeout(self.config.request_timeout, self.adapter.get_fills(order.id)).await
        {
            Ok(Ok(fills)) => fills,
            _ => {
                warn!(order_id = %order.id, "fill fetch failed");
                Vec::new()
            }
        };
        ExecutedOrder {
            order,
            fills,
            reference_price,
        }
    }
}
