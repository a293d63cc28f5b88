//! Observability hooks for dispatchers.

use crate::DispatchTargetError;

/// Receives events a dispatcher contains instead of propagating.
///
/// Injected at construction; [`TracingObserver`] is the default.
pub trait DispatchObserver: Send + Sync {
    /// A target returned an error or panicked.
    fn target_failed(&self, error: &DispatchTargetError);

    /// An asynchronous delivery was dropped because the pool was full or shut down.
    fn dispatch_dropped(&self, protocol: &'static str, method: &'static str) {
        let _ = (protocol, method);
    }
}

/// Logs contained failures with `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl DispatchObserver for TracingObserver {
    fn target_failed(&self, error: &DispatchTargetError) {
        tracing::warn!(
            protocol = error.protocol,
            method = error.method,
            target = %error.target,
            reason = %error.reason,
            "dispatch target failed"
        );
    }

    fn dispatch_dropped(&self, protocol: &'static str, method: &'static str) {
        tracing::warn!(protocol, method, "dispatch dropped");
    }
}

/// Ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl DispatchObserver for NoopObserver {
    fn target_failed(&self, _error: &DispatchTargetError) {}
}
