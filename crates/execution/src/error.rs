//! Execution errors

use thiserror::Error;

/// Errors surfaced by the executors.
///
/// Transient adapter failures (timeouts, disconnects) are handled inside
/// the executors by reconciliation; what propagates here is
/// non-recoverable for the current attempt. The trading loop logs it and
/// continues with the next signal.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("gateway error: {0}")]
    Gateway(#[from] hermes_gateway::GatewayError),
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
