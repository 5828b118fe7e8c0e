//! Buffer allocation for emitted chunks.
//!
//! Each emitted item is copied out of the shared transport buffer into a
//! fresh allocation from a [`BufferFactory`], then frozen into [`Bytes`].
//! Factories have no concurrency requirements beyond `Send + Sync`.

use std::ops::{Deref, DerefMut};

use bytes::{Bytes, BytesMut};

/// Produces buffers of a requested capacity.
pub trait BufferFactory: Send + Sync + 'static {
    /// Allocate an empty buffer able to hold at least `capacity` bytes.
    fn allocate(&self, capacity: usize) -> BytesMut;
}

/// Plain heap allocation via [`BytesMut::with_capacity`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapBufferFactory;

impl BufferFactory for HeapBufferFactory {
    fn allocate(&self, capacity: usize) -> BytesMut {
        BytesMut::with_capacity(capacity)
    }
}

/// Copy `filled` into a buffer from `factory` and freeze it.
pub(crate) fn copy_out(factory: &dyn BufferFactory, filled: &[u8]) -> Bytes {
    let mut buf = factory.allocate(filled.len());
    buf.extend_from_slice(filled);
    buf.freeze()
}

/// Scratch memory handed to a [`ByteSource`](crate::ByteSource) for one read.
///
/// Always `capacity` bytes long; the source writes into the prefix and
/// reports how many bytes it filled. Only the holder of the read token ever
/// owns it, so it is moved into the read and handed back on completion.
#[derive(Debug)]
pub struct TransportBuffer {
    inner: BytesMut,
}

impl TransportBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            inner: BytesMut::zeroed(capacity),
        }
    }

    /// Number of bytes a single read may fill.
    pub fn capacity(&self) -> usize {
        self.inner.len()
    }

    /// The first `count` bytes, as filled by the last read.
    pub(crate) fn filled(&self, count: usize) -> &[u8] {
        &self.inner[..count]
    }
}

impl Deref for TransportBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.inner
    }
}

impl DerefMut for TransportBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.inner
    }
}
