//! [`ByteSource`] over any tokio [`AsyncRead`].
//!
//! Each read runs as a task on a tokio runtime and resolves its completion
//! from that task, so demand signalled from one thread is served on a
//! runtime worker. `Ok(0)` from the reader is end of stream.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tracing::trace;

use super::{ByteSource, ReadCompletion, ReadOutcome};
use crate::buffer::TransportBuffer;
use crate::{Result, SluiceError};

/// Adapts an [`AsyncRead`] (file, socket, decoder, ...) into a [`ByteSource`].
///
/// Closing drops the reader. A read already in flight finishes first; the
/// reader is released as soon as it does.
pub struct AsyncReadSource<R> {
    reader: Arc<Mutex<Option<R>>>,
    handle: Handle,
    closed: AtomicBool,
}

impl<R> AsyncReadSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    /// Wrap `reader`, running reads on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Requires a tokio runtime context.
    pub fn new(reader: R) -> Self {
        Self::with_handle(reader, Handle::current())
    }

    /// Wrap `reader`, running reads on the runtime behind `handle`.
    pub fn with_handle(reader: R, handle: Handle) -> Self {
        Self {
            reader: Arc::new(Mutex::new(Some(reader))),
            handle,
            closed: AtomicBool::new(false),
        }
    }
}

impl<R> ByteSource for AsyncReadSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    fn read(&self, mut transport: TransportBuffer, completion: ReadCompletion) {
        if self.closed.load(Ordering::Acquire) {
            completion.fail(SluiceError::SourceClosed);
            return;
        }

        let reader = Arc::clone(&self.reader);
        self.handle.spawn(async move {
            let result = {
                let mut guard = reader.lock().await;
                match guard.as_mut() {
                    Some(r) => Some(r.read(&mut transport[..]).await),
                    None => None,
                }
            };
            match result {
                None => completion.fail(SluiceError::SourceClosed),
                Some(Ok(0)) => completion.complete(transport, ReadOutcome::EndOfStream),
                Some(Ok(n)) => completion.complete(transport, ReadOutcome::Data(n)),
                Some(Err(e)) => completion.fail(e.into()),
            }
        });
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        match self.reader.try_lock() {
            Ok(mut guard) => {
                guard.take();
            }
            Err(_) => {
                trace!("read in flight; deferring reader release");
                let reader = Arc::clone(&self.reader);
                self.handle.spawn(async move {
                    reader.lock().await.take();
                });
            }
        }
        Ok(())
    }
}

impl<R> std::fmt::Debug for AsyncReadSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncReadSource")
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
