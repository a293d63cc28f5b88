//! Error types for dispatch.

use std::fmt;

use crate::TargetId;

/// Errors returned to callers of a dispatcher or its proxies.
#[derive(thiserror::Error, Debug)]
pub enum DispatchError {
    #[error("dispatcher for protocol '{protocol}' has been terminated")]
    Terminated { protocol: &'static str },

    #[error("failed to start dispatch worker pool: {0}")]
    Pool(#[source] std::io::Error),

    #[error("invalid dispatcher configuration: {message}")]
    InvalidConfig { message: String },
}

/// How a single target failed to handle a dispatched call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureReason {
    /// The target returned an error.
    Returned(String),
    /// The target panicked.
    Panicked(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Returned(message) => write!(f, "returned error: {}", message),
            FailureReason::Panicked(message) => write!(f, "panicked: {}", message),
        }
    }
}

/// A target's failure, contained at the dispatcher and reported to its observer.
///
/// Never returned to the caller that triggered the dispatch.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{protocol}::{method} on target {target} {reason}")]
pub struct DispatchTargetError {
    pub protocol: &'static str,
    pub method: &'static str,
    pub target: TargetId,
    pub reason: FailureReason,
}
