//! In-memory source over pre-split chunks.
//!
//! Completes every read synchronously on the calling thread, which makes it
//! useful both as a fixture and for serving data that is already resident.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;

use super::{ByteSource, ReadCompletion, ReadOutcome};
use crate::buffer::TransportBuffer;
use crate::{Result, SluiceError};

/// A [`ByteSource`] that yields a fixed sequence of chunks.
///
/// Each read returns at most one chunk. Chunks larger than the transport
/// buffer are split across consecutive reads.
#[derive(Debug)]
pub struct ChunkSource {
    chunks: Mutex<VecDeque<Bytes>>,
    report_final: bool,
    closed: AtomicBool,
}

impl ChunkSource {
    /// Create a source that yields `chunks` in order, then end of stream.
    pub fn new<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            chunks: Mutex::new(chunks.into_iter().map(Into::into).collect()),
            report_final: false,
            closed: AtomicBool::new(false),
        }
    }

    /// Report the last chunk together with end of stream
    /// ([`ReadOutcome::Final`]) instead of a separate empty read.
    pub fn report_final(mut self, enabled: bool) -> Self {
        self.report_final = enabled;
        self
    }

    /// Whether [`close`](ByteSource::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl ByteSource for ChunkSource {
    fn read(&self, mut transport: TransportBuffer, completion: ReadCompletion) {
        if self.is_closed() {
            completion.fail(SluiceError::SourceClosed);
            return;
        }

        let outcome = {
            let mut chunks = self.chunks.lock().unwrap_or_else(PoisonError::into_inner);
            match chunks.pop_front() {
                None => ReadOutcome::EndOfStream,
                Some(mut chunk) => {
                    let n = chunk.len().min(transport.capacity());
                    transport[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        chunks.push_front(chunk.split_off(n));
                    }
                    if self.report_final && chunks.is_empty() {
                        ReadOutcome::Final(n)
                    } else {
                        ReadOutcome::Data(n)
                    }
                }
            }
        };

        completion.complete(transport, outcome);
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        self.chunks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}
