//! The backpressure adapter.
//!
//! Turns a pull-based [`ByteSource`] into a push-based, demand-driven
//! sequence of buffers delivered to a [`Subscriber`].
//!
//! # State
//!
//! [`AdapterState`] is shared between every thread that signals demand or
//! cancellation and every thread that completes a read. All coordination
//! goes through three atomics (see [`state`]):
//!
//! - demand counter, saturating;
//! - lifecycle flag, Open→Closed exactly once, which also closes the source;
//! - read token, the single-owner marker for the one outstanding read.
//!
//! # Drain loop
//!
//! ```text
//! while not closed and demand > 0 and token.try_acquire():
//!     issue one read
//! ```
//!
//! Both [`Subscription::request`](crate::Subscription::request) and the
//! completion handler run the loop; the token ensures only one of them
//! issues the next read. The loop is wrapped in a work-in-progress
//! counter: a call that finds another drain active (on this thread, via a
//! synchronous completion, or on another) records a missed pass and
//! returns, and the active drainer loops again. Stack depth stays constant
//! no matter how many reads complete synchronously in a row.

mod state;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::buffer::{BufferFactory, TransportBuffer, copy_out};
use crate::diagnostics::DroppedErrorSink;
use crate::source::{ByteSource, ReadCompletion, ReadOutcome};
use crate::subscriber::Subscriber;
use crate::{SluiceError, telemetry};

use state::{DemandCounter, LifecycleFlag, ReadToken};

/// Shared state behind a [`Subscription`](crate::Subscription).
pub(crate) struct AdapterState {
    demand: DemandCounter,
    lifecycle: LifecycleFlag,
    token: ReadToken,
    terminated: AtomicBool,
    cancelled: AtomicBool,
    wip: AtomicUsize,
    buffer_size: usize,
    // Only touched by the read-token holder.
    transport: Mutex<Option<TransportBuffer>>,
    source: Box<dyn ByteSource>,
    factory: Arc<dyn BufferFactory>,
    subscriber: Box<dyn Subscriber>,
    dropped: Arc<dyn DroppedErrorSink>,
}

impl AdapterState {
    pub(crate) fn new(
        source: Box<dyn ByteSource>,
        factory: Arc<dyn BufferFactory>,
        subscriber: Box<dyn Subscriber>,
        dropped: Arc<dyn DroppedErrorSink>,
        buffer_size: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            demand: DemandCounter::default(),
            lifecycle: LifecycleFlag::default(),
            token: ReadToken::default(),
            terminated: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            wip: AtomicUsize::new(0),
            buffer_size,
            transport: Mutex::new(None),
            source,
            factory,
            subscriber,
            dropped,
        })
    }

    // ========================================================================
    // Consumer signals
    // ========================================================================

    pub(crate) fn request(self: &Arc<Self>, n: u64) {
        if n == 0 {
            trace!("ignoring request for zero buffers");
            return;
        }
        self.demand.add(n);
        self.drain();
    }

    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        if self.close() {
            debug!("stream cancelled");
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lifecycle.is_closed()
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub(crate) fn demand(&self) -> u64 {
        self.demand.current()
    }

    /// Close the lifecycle flag and release the source, once.
    ///
    /// Returns whether this call performed the transition.
    fn close(&self) -> bool {
        if !self.lifecycle.close() {
            return false;
        }
        match self.source.close() {
            Ok(()) => {
                metrics::counter!(telemetry::SOURCES_CLOSED_TOTAL, "status" => "ok").increment(1);
                debug!("byte source closed");
            }
            Err(e) => {
                metrics::counter!(telemetry::SOURCES_CLOSED_TOTAL, "status" => "error")
                    .increment(1);
                warn!(error = %e, "failed to close byte source");
            }
        }
        true
    }

    // ========================================================================
    // Drain loop
    // ========================================================================

    fn drain(self: &Arc<Self>) {
        if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
            return;
        }
        let mut missed = 1;
        loop {
            while self.should_read() {
                self.issue_read();
            }
            missed = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
            if missed == 0 {
                break;
            }
        }
    }

    /// Closed, then demand, then the token; the token is only taken when
    /// a read will actually be issued.
    fn should_read(&self) -> bool {
        !self.is_closed() && self.demand.current() > 0 && self.token.try_acquire()
    }

    fn issue_read(self: &Arc<Self>) {
        let transport = self
            .transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or_else(|| TransportBuffer::new(self.buffer_size));
        trace!(capacity = transport.capacity(), "issuing read");
        self.source
            .read(transport, ReadCompletion::new(Arc::clone(self)));
    }

    fn restore_transport(&self, transport: TransportBuffer) {
        *self
            .transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(transport);
    }

    // ========================================================================
    // Read completion
    // ========================================================================

    pub(crate) fn on_read_complete(
        self: &Arc<Self>,
        transport: TransportBuffer,
        outcome: ReadOutcome,
    ) {
        let (count, last) = match outcome {
            ReadOutcome::Data(n) => (n, false),
            ReadOutcome::Final(n) => (n, true),
            ReadOutcome::EndOfStream => (0, true),
        };
        let label = if last { "end_of_stream" } else { "data" };
        metrics::counter!(telemetry::READS_TOTAL, "outcome" => label).increment(1);

        if self.is_closed() {
            trace!(count, "discarding read completed after close");
            self.restore_transport(transport);
            self.token.release();
            return;
        }

        let capacity = transport.capacity();
        if count > capacity {
            self.restore_transport(transport);
            // close before the token frees up, so no read follows the error
            self.error(SluiceError::InvalidReadCount { count, capacity });
            self.token.release();
            return;
        }

        if count > 0 {
            let buffer = copy_out(self.factory.as_ref(), transport.filled(count));
            self.restore_transport(transport);
            self.emit(buffer);
        } else {
            self.restore_transport(transport);
        }

        if last {
            self.complete();
            self.token.release();
            return;
        }

        self.token.release();
        self.drain();
    }

    pub(crate) fn on_read_failed(&self, error: SluiceError) {
        metrics::counter!(telemetry::READS_TOTAL, "outcome" => "error").increment(1);
        if self.is_closed() {
            self.token.release();
            self.drop_error(error);
            return;
        }
        self.error(error);
        self.token.release();
    }

    // ========================================================================
    // Subscriber signals
    // ========================================================================

    fn emit(&self, buffer: Bytes) {
        if self.terminated.load(Ordering::Acquire) || self.is_closed() {
            trace!("discarding buffer after close");
            return;
        }
        let len = buffer.len();
        self.subscriber.on_next(buffer);
        self.demand.consume_one();
        metrics::counter!(telemetry::BUFFERS_EMITTED_TOTAL).increment(1);
        metrics::counter!(telemetry::BYTES_EMITTED_TOTAL).increment(len as u64);
        trace!(len, "emitted buffer");
    }

    fn complete(&self) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            debug!("suppressing completion after terminal signal");
            return;
        }
        if !self.close() {
            debug!("suppressing completion after cancel");
            return;
        }
        debug!("stream completed");
        self.subscriber.on_complete();
    }

    fn error(&self, error: SluiceError) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            debug!(error = %error, "suppressing error after terminal signal");
            self.drop_error(error);
            return;
        }
        if !self.close() {
            self.drop_error(error);
            return;
        }
        debug!(error = %error, "stream failed");
        self.subscriber.on_error(error);
    }

    fn drop_error(&self, error: SluiceError) {
        metrics::counter!(telemetry::ERRORS_DROPPED_TOTAL).increment(1);
        self.dropped.on_error_dropped(error);
    }
}

impl Drop for AdapterState {
    // Every subscription handle and pending completion is gone; nothing can
    // drive the stream any more.
    fn drop(&mut self) {
        if self.close() {
            debug!("subscription dropped while open");
        }
    }
}
