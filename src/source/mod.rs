//! Byte sources: the pull side of the adapter.
//!
//! A [`ByteSource`] tolerates a single outstanding read. The adapter
//! guarantees it never issues a second read before the first completes,
//! so implementations need no internal locking for that purpose.
//!
//! Reads are continuation-passing. The source receives a
//! [`TransportBuffer`] and a [`ReadCompletion`], fills the buffer, and
//! resolves the completion exactly once, either inline on the calling
//! thread or later from any other thread:
//!
//! ```ignore
//! fn read(&self, mut transport: TransportBuffer, completion: ReadCompletion) {
//!     match self.file.read(&mut transport) {
//!         Ok(0) => completion.complete(transport, ReadOutcome::EndOfStream),
//!         Ok(n) => completion.complete(transport, ReadOutcome::Data(n)),
//!         Err(e) => completion.fail(e.into()),
//!     }
//! }
//! ```
//!
//! A completion that is dropped unresolved reports
//! [`SluiceError::ReadAbandoned`] to the adapter, so a source that bails
//! out early can never leave the stream stuck.

pub mod async_read;
pub mod chunks;

pub use async_read::AsyncReadSource;
pub use chunks::ChunkSource;

use std::sync::Arc;

use crate::adapter::AdapterState;
use crate::buffer::TransportBuffer;
use crate::{Result, SluiceError};

/// Outcome of one successful read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were written to the front of the transport buffer.
    Data(usize),
    /// `n` bytes were written and the source is now exhausted.
    Final(usize),
    /// Nothing was read; the source is exhausted.
    EndOfStream,
}

/// A pull-based asynchronous byte source allowing one read at a time.
pub trait ByteSource: Send + Sync + 'static {
    /// Start a read into `transport` and resolve `completion` when done.
    fn read(&self, transport: TransportBuffer, completion: ReadCompletion);

    /// Release the source.
    ///
    /// Must not block. Called at most once by the adapter, but must also
    /// tolerate a source that already closed itself. Errors are logged and
    /// never reach the subscriber.
    fn close(&self) -> Result<()>;
}

impl<S: ByteSource> ByteSource for Box<S> {
    fn read(&self, transport: TransportBuffer, completion: ReadCompletion) {
        (**self).read(transport, completion)
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }
}

impl<S: ByteSource> ByteSource for Arc<S> {
    fn read(&self, transport: TransportBuffer, completion: ReadCompletion) {
        (**self).read(transport, completion)
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }
}

/// Continuation for a single read. Resolve it exactly once.
#[must_use = "an unresolved completion fails the stream with ReadAbandoned"]
pub struct ReadCompletion {
    state: Option<Arc<AdapterState>>,
}

impl ReadCompletion {
    pub(crate) fn new(state: Arc<AdapterState>) -> Self {
        Self { state: Some(state) }
    }

    /// Report a successful read, handing the transport buffer back.
    pub fn complete(mut self, transport: TransportBuffer, outcome: ReadOutcome) {
        if let Some(state) = self.state.take() {
            state.on_read_complete(transport, outcome);
        }
    }

    /// Report a failed read.
    pub fn fail(mut self, error: SluiceError) {
        if let Some(state) = self.state.take() {
            state.on_read_failed(error);
        }
    }
}

impl Drop for ReadCompletion {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            state.on_read_failed(SluiceError::ReadAbandoned);
        }
    }
}

impl std::fmt::Debug for ReadCompletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadCompletion")
            .field("resolved", &self.state.is_none())
            .finish()
    }
}
