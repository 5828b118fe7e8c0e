//! Sluicegate - demand-driven buffer streams over single-reader byte sources
//!
//! This crate adapts a pull-based asynchronous [`ByteSource`], which
//! tolerates only one outstanding read, into a push-based stream of
//! [`Bytes`](bytes::Bytes) buffers that only reads when a consumer has
//! signalled demand. The source is released exactly once, whichever of
//! completion, failure or cancellation comes first.
//!
//! # Stream Example
//!
//! ```rust,no_run
//! use futures_util::StreamExt;
//! use sluicegate::{AsyncReadSource, BinaryPublisher};
//!
//! #[tokio::main]
//! async fn main() -> sluicegate::Result<()> {
//!     let file = tokio::fs::File::open("blob.bin").await?;
//!     let mut stream = BinaryPublisher::new(AsyncReadSource::new(file))
//!         .buffer_size(64 * 1024)
//!         .into_stream()?;
//!
//!     while let Some(chunk) = stream.next().await {
//!         println!("read {} bytes", chunk?.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Subscriber Example
//!
//! ```rust
//! use std::sync::Mutex;
//!
//! use bytes::Bytes;
//! use sluicegate::{BinaryPublisher, ChunkSource, SluiceError, Subscriber};
//!
//! #[derive(Default)]
//! struct Collect(Mutex<Vec<Bytes>>);
//!
//! impl Subscriber for Collect {
//!     fn on_next(&self, buffer: Bytes) {
//!         self.0.lock().unwrap().push(buffer);
//!     }
//!     fn on_error(&self, _error: SluiceError) {}
//!     fn on_complete(&self) {}
//! }
//!
//! let subscription = BinaryPublisher::new(ChunkSource::new(vec![&b"a"[..], &b"b"[..]]))
//!     .subscribe(Collect::default())?;
//! subscription.request(1);
//! # Ok::<_, SluiceError>(())
//! ```

mod adapter;
pub mod buffer;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod publisher;
pub mod source;
pub mod stream;
pub mod subscriber;
pub mod telemetry;

// Re-export main types at crate root
pub use buffer::{BufferFactory, HeapBufferFactory, TransportBuffer};
pub use config::AdapterConfig;
pub use diagnostics::{DroppedErrorSink, TracingDropSink};
pub use error::{Result, SluiceError};
pub use publisher::BinaryPublisher;
pub use source::{AsyncReadSource, ByteSource, ChunkSource, ReadCompletion, ReadOutcome};
pub use stream::BufferStream;
pub use subscriber::{Subscriber, Subscription};
