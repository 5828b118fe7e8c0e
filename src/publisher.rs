//! Entry point: wire a source, allocator and subscriber together.

use std::sync::Arc;

use crate::Result;
use crate::adapter::AdapterState;
use crate::buffer::{BufferFactory, HeapBufferFactory};
use crate::config::AdapterConfig;
use crate::diagnostics::{DroppedErrorSink, TracingDropSink};
use crate::source::ByteSource;
use crate::stream::{BufferStream, ChannelSubscriber};
use crate::subscriber::{Subscriber, Subscription};

/// Publishes the contents of a [`ByteSource`] as demand-driven buffers.
///
/// Single-use: the publisher owns the source and hands it to exactly one
/// subscription, which closes it when the stream completes, fails or is
/// cancelled.
///
/// ```rust
/// # use sluicegate::{BinaryPublisher, ChunkSource};
/// # use futures_util::StreamExt;
/// # tokio_test::block_on(async {
/// let source = ChunkSource::new(vec![&b"hello "[..], &b"world"[..]]);
/// let mut stream = BinaryPublisher::new(source)
///     .buffer_size(4)
///     .into_stream()?;
///
/// let mut out = Vec::new();
/// while let Some(buf) = stream.next().await {
///     out.extend_from_slice(&buf?);
/// }
/// assert_eq!(out, b"hello world");
/// # Ok::<_, sluicegate::SluiceError>(())
/// # }).unwrap();
/// ```
pub struct BinaryPublisher {
    source: Box<dyn ByteSource>,
    config: AdapterConfig,
    factory: Arc<dyn BufferFactory>,
    dropped: Arc<dyn DroppedErrorSink>,
}

impl BinaryPublisher {
    pub fn new(source: impl ByteSource) -> Self {
        Self {
            source: Box::new(source),
            config: AdapterConfig::default(),
            factory: Arc::new(HeapBufferFactory),
            dropped: Arc::new(TracingDropSink),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: AdapterConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the number of bytes requested per read.
    pub fn buffer_size(mut self, bytes: usize) -> Self {
        self.config = self.config.buffer_size(bytes);
        self
    }

    /// Allocator for emitted buffers. Default: [`HeapBufferFactory`].
    pub fn buffer_factory(mut self, factory: impl BufferFactory) -> Self {
        self.factory = Arc::new(factory);
        self
    }

    /// Sink for errors arriving after the stream closed.
    /// Default: [`TracingDropSink`].
    pub fn dropped_errors(mut self, sink: impl DroppedErrorSink) -> Self {
        self.dropped = Arc::new(sink);
        self
    }

    /// Subscribe `subscriber`. No read happens until demand is requested
    /// through the returned [`Subscription`].
    pub fn subscribe(self, subscriber: impl Subscriber) -> Result<Subscription> {
        self.config.validate()?;
        let state = AdapterState::new(
            self.source,
            self.factory,
            Box::new(subscriber),
            self.dropped,
            self.config.buffer_size,
        );
        Ok(Subscription::new(state))
    }

    /// Subscribe with a [`BufferStream`] that requests one buffer at a time.
    pub fn into_stream(self) -> Result<BufferStream> {
        let (subscriber, rx) = ChannelSubscriber::channel();
        let subscription = self.subscribe(subscriber)?;
        Ok(BufferStream::new(rx, subscription))
    }
}

impl std::fmt::Debug for BinaryPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryPublisher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
