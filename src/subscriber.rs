//! Consumer side of the adapter.
//!
//! A [`Subscriber`] receives zero or more buffers followed by at most one
//! terminal signal. The [`Subscription`] handle returned on subscribe lets
//! the consumer signal demand and cancel.
//!
//! # Signal rules
//!
//! - `on_next` is never called more often than the cumulative demand
//!   requested through [`Subscription::request`].
//! - Signals are serialised: no two callbacks run at the same time, though
//!   they may run on different threads.
//! - Exactly one of `on_complete` / `on_error` ends a stream that was not
//!   cancelled. A cancelled stream receives no terminal signal.

use std::sync::Arc;

use bytes::Bytes;

use crate::SluiceError;
use crate::adapter::AdapterState;

/// Receives the buffers and terminal signal of a stream.
///
/// The adapter owns the subscriber until the stream is dropped. A
/// subscriber that stores its own [`Subscription`] forms a reference cycle;
/// clear it once the stream terminates.
pub trait Subscriber: Send + Sync + 'static {
    /// A buffer holding the bytes of one completed read.
    fn on_next(&self, buffer: Bytes);

    /// The stream failed. No further signals follow.
    fn on_error(&self, error: SluiceError);

    /// The source reached end of stream. No further signals follow.
    fn on_complete(&self);
}

/// Demand and cancellation handle for one subscription.
///
/// Cheap to clone; all clones control the same stream. Both operations are
/// non-blocking and safe to call from any thread, including from inside
/// subscriber callbacks.
///
/// Once every clone is dropped and no read is pending, an open stream is
/// closed and its source released, without a terminal signal.
#[derive(Clone)]
pub struct Subscription {
    state: Arc<AdapterState>,
}

impl Subscription {
    pub(crate) fn new(state: Arc<AdapterState>) -> Self {
        Self { state }
    }

    /// Signal demand for `n` more buffers.
    ///
    /// Demand accumulates and saturates at `u64::MAX`. `request(0)` is a
    /// no-op.
    pub fn request(&self, n: u64) {
        self.state.request(n);
    }

    /// Stop the stream and release the source.
    ///
    /// Idempotent. No terminal signal is delivered after cancellation.
    pub fn cancel(&self) {
        self.state.cancel();
    }

    /// Whether [`cancel`](Self::cancel) has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }

    /// Whether the stream is closed, by cancellation or a terminal signal.
    /// A closed stream issues no further reads.
    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("cancelled", &self.state.is_cancelled())
            .field("closed", &self.state.is_closed())
            .field("demand", &self.state.demand())
            .finish()
    }
}
