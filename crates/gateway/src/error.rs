//! Error types for the gateway crate

use thiserror::Error;

/// Adapter operation errors.
///
/// `Timeout` and `Disconnected` are transient: callers retry with bounded
/// backoff or reconcile via `get_order`. `Rejected` is terminal for the
/// order that triggered it.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("stream disconnected")]
    Disconnected,

    #[error("request timed out")]
    Timeout,

    #[error("rate limited")]
    RateLimited,

    #[error("order rejected: {0}")]
    Rejected(String),

    #[error("unknown order: {0}")]
    UnknownOrder(uuid::Uuid),

    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    /// Transient errors are retried; everything else surfaces immediately.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GatewayError::Connection(_)
                | GatewayError::Disconnected
                | GatewayError::Timeout
                | GatewayError::RateLimited
        )
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
