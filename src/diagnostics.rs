//! Side channel for errors that arrive after a stream has closed.
//!
//! Once a subscriber cancels, it must not receive further signals, but a
//! read that was already in flight can still fail. Those errors are routed
//! to a [`DroppedErrorSink`] instead of vanishing. Every drop also bumps
//! [`ERRORS_DROPPED_TOTAL`](crate::telemetry::ERRORS_DROPPED_TOTAL).

use tracing::warn;

use crate::SluiceError;

/// Receives errors the adapter could not deliver to its subscriber.
pub trait DroppedErrorSink: Send + Sync + 'static {
    fn on_error_dropped(&self, error: SluiceError);
}

/// Logs dropped errors at warn level. The default sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDropSink;

impl DroppedErrorSink for TracingDropSink {
    fn on_error_dropped(&self, error: SluiceError) {
        warn!(error = %error, "dropping read error after stream closed");
    }
}

impl<F> DroppedErrorSink for F
where
    F: Fn(SluiceError) + Send + Sync + 'static,
{
    fn on_error_dropped(&self, error: SluiceError) {
        self(error)
    }
}
