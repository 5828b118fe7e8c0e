//! [`Stream`] view over the adapter.
//!
//! Bridges the push-based subscriber protocol into a pull-based
//! `futures` stream. Each poll that finds nothing queued and no request
//! outstanding signals demand for exactly one buffer, so at most one
//! buffer ever waits in the channel. Dropping the stream cancels the
//! subscription and releases the source.

use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::subscriber::{Subscriber, Subscription};
use crate::{Result, SluiceError};

/// Stream of buffers read from a [`ByteSource`](crate::ByteSource).
///
/// Created by [`BinaryPublisher::into_stream`](crate::BinaryPublisher::into_stream).
/// Yields `Ok(buffer)` items, then ends after completion or after a single
/// `Err` item.
pub struct BufferStream {
    rx: UnboundedReceiverStream<Result<Bytes>>,
    subscription: Subscription,
    requested: bool,
}

impl BufferStream {
    pub(crate) fn new(
        rx: UnboundedReceiverStream<Result<Bytes>>,
        subscription: Subscription,
    ) -> Self {
        Self {
            rx,
            subscription,
            requested: false,
        }
    }

    /// Handle to the underlying subscription.
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }
}

impl Stream for BufferStream {
    type Item = Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match self.rx.poll_next_unpin(cx) {
                Poll::Ready(item) => {
                    self.requested = false;
                    return Poll::Ready(item);
                }
                Poll::Pending if self.subscription.is_cancelled() => return Poll::Ready(None),
                Poll::Pending if !self.requested => {
                    // may deliver synchronously, so poll again afterwards
                    self.requested = true;
                    self.subscription.request(1);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl Drop for BufferStream {
    fn drop(&mut self) {
        self.subscription.cancel();
    }
}

impl std::fmt::Debug for BufferStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferStream")
            .field("subscription", &self.subscription)
            .field("requested", &self.requested)
            .finish()
    }
}

/// Forwards subscriber signals into the stream's channel.
pub(crate) struct ChannelSubscriber {
    tx: Mutex<Option<UnboundedSender<Result<Bytes>>>>,
}

impl ChannelSubscriber {
    pub(crate) fn channel() -> (Self, UnboundedReceiverStream<Result<Bytes>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber = Self {
            tx: Mutex::new(Some(tx)),
        };
        (subscriber, UnboundedReceiverStream::new(rx))
    }
}

impl Subscriber for ChannelSubscriber {
    fn on_next(&self, buffer: Bytes) {
        if let Some(tx) = self.tx.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            // receiver gone means the stream was dropped and is cancelling
            let _ = tx.send(Ok(buffer));
        }
    }

    fn on_error(&self, error: SluiceError) {
        if let Some(tx) = self.tx.lock().unwrap_or_else(PoisonError::into_inner).take() {
            let _ = tx.send(Err(error));
        }
    }

    fn on_complete(&self) {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}
