//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use sluicegate::{
    ByteSource, ReadCompletion, ReadOutcome, SluiceError, Subscriber, TransportBuffer,
};

// ============================================================================
// Instrumentation
// ============================================================================

/// Counters every test source exposes.
#[derive(Debug, Default)]
pub struct Probe {
    pub reads: AtomicUsize,
    pub closes: AtomicUsize,
    pub overlaps: AtomicUsize,
    pub max_depth: AtomicUsize,
    in_read: AtomicBool,
    depth: AtomicUsize,
}

impl Probe {
    /// Mark a read as started; counts an overlap if one is already running.
    fn enter(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.in_read.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_depth.fetch_max(depth, Ordering::SeqCst);
    }

    /// Mark the read as finished, just before its completion is resolved.
    fn finish(&self) {
        self.in_read.store(false, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.depth.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Scripted source: completes synchronously on the calling thread
// ============================================================================

#[derive(Debug, Clone)]
pub enum Step {
    Data(Vec<u8>),
    Final(Vec<u8>),
    Eof,
    Fail(&'static str),
    /// Fail from a spawned thread after a short delay.
    FailOnThread(&'static str),
    /// Report more bytes than the transport holds.
    Overflow,
    /// Drop the completion without resolving it.
    Abandon,
}

pub struct ScriptedSource {
    pub probe: Arc<Probe>,
    steps: Mutex<VecDeque<Step>>,
    close_error: Option<&'static str>,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> (Self, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        let source = Self {
            probe: Arc::clone(&probe),
            steps: Mutex::new(steps.into()),
            close_error: None,
        };
        (source, probe)
    }

    /// `count` one-chunk reads named `chunk-0`, `chunk-1`, ..., then end of stream.
    pub fn numbered(count: usize) -> (Self, Arc<Probe>) {
        let mut steps: Vec<Step> = (0..count)
            .map(|i| Step::Data(format!("chunk-{i}").into_bytes()))
            .collect();
        steps.push(Step::Eof);
        Self::new(steps)
    }

    /// Make `close` return an error with `msg`.
    pub fn failing_close(mut self, msg: &'static str) -> Self {
        self.close_error = Some(msg);
        self
    }
}

impl ByteSource for ScriptedSource {
    fn read(&self, mut transport: TransportBuffer, completion: ReadCompletion) {
        self.probe.enter();
        let step = self.steps.lock().unwrap().pop_front().unwrap_or(Step::Eof);
        self.probe.finish();
        match step {
            Step::Data(bytes) => {
                transport[..bytes.len()].copy_from_slice(&bytes);
                completion.complete(transport, ReadOutcome::Data(bytes.len()));
            }
            Step::Final(bytes) => {
                transport[..bytes.len()].copy_from_slice(&bytes);
                completion.complete(transport, ReadOutcome::Final(bytes.len()));
            }
            Step::Eof => completion.complete(transport, ReadOutcome::EndOfStream),
            Step::Fail(msg) => completion.fail(SluiceError::Source(msg.into())),
            Step::FailOnThread(msg) => {
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(2));
                    completion.fail(SluiceError::Source(msg.into()));
                });
            }
            Step::Overflow => {
                let n = transport.capacity() + 1;
                completion.complete(transport, ReadOutcome::Data(n));
            }
            Step::Abandon => drop(completion),
        }
        self.probe.leave();
    }

    fn close(&self) -> sluicegate::Result<()> {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
        match self.close_error {
            Some(msg) => Err(SluiceError::Source(msg.into())),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Repeating source: `remaining` one-byte reads, all synchronous
// ============================================================================

pub struct RepeatSource {
    pub probe: Arc<Probe>,
    remaining: AtomicUsize,
}

impl RepeatSource {
    pub fn new(count: usize) -> (Self, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        let source = Self {
            probe: Arc::clone(&probe),
            remaining: AtomicUsize::new(count),
        };
        (source, probe)
    }
}

impl ByteSource for RepeatSource {
    fn read(&self, mut transport: TransportBuffer, completion: ReadCompletion) {
        self.probe.enter();
        let left = self.remaining.load(Ordering::SeqCst);
        self.probe.finish();
        if left == 0 {
            completion.complete(transport, ReadOutcome::EndOfStream);
        } else {
            self.remaining.store(left - 1, Ordering::SeqCst);
            transport[0] = b'x';
            completion.complete(transport, ReadOutcome::Data(1));
        }
        self.probe.leave();
    }

    fn close(&self) -> sluicegate::Result<()> {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Manual source: the test resolves each read explicitly
// ============================================================================

type Pending = (TransportBuffer, ReadCompletion);

pub struct ManualSource {
    pub probe: Arc<Probe>,
    pending: Arc<Mutex<Option<Pending>>>,
}

/// Test-side handle for resolving a [`ManualSource`]'s pending read.
#[derive(Clone)]
pub struct ManualHandle {
    pending: Arc<Mutex<Option<Pending>>>,
    probe: Arc<Probe>,
}

impl ManualSource {
    pub fn new() -> (Self, ManualHandle) {
        let probe = Arc::new(Probe::default());
        let pending = Arc::new(Mutex::new(None));
        let source = Self {
            probe: Arc::clone(&probe),
            pending: Arc::clone(&pending),
        };
        (source, ManualHandle { pending, probe })
    }
}

impl ByteSource for ManualSource {
    fn read(&self, transport: TransportBuffer, completion: ReadCompletion) {
        self.probe.enter();
        self.probe.leave();
        let previous = self.pending.lock().unwrap().replace((transport, completion));
        assert!(previous.is_none(), "read issued while another was pending");
    }

    fn close(&self) -> sluicegate::Result<()> {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl ManualHandle {
    pub fn probe(&self) -> &Probe {
        &self.probe
    }

    pub fn has_pending(&self) -> bool {
        self.pending.lock().unwrap().is_some()
    }

    fn take(&self) -> Pending {
        let pending = self.pending.lock().unwrap().take();
        self.probe.finish();
        pending.expect("no read pending")
    }

    pub fn complete_data(&self, bytes: &[u8]) {
        let (mut transport, completion) = self.take();
        transport[..bytes.len()].copy_from_slice(bytes);
        completion.complete(transport, ReadOutcome::Data(bytes.len()));
    }

    pub fn complete_eof(&self) {
        let (transport, completion) = self.take();
        completion.complete(transport, ReadOutcome::EndOfStream);
    }

    pub fn fail(&self, msg: &'static str) {
        let (_, completion) = self.take();
        completion.fail(SluiceError::Source(msg.into()));
    }
}

// ============================================================================
// Threaded source: every read completes on a fresh thread
// ============================================================================

pub struct ThreadedSource {
    pub probe: Arc<Probe>,
    next: Arc<AtomicUsize>,
    count: usize,
}

impl ThreadedSource {
    /// `count` numbered chunks, then end of stream.
    pub fn new(count: usize) -> (Self, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        let source = Self {
            probe: Arc::clone(&probe),
            next: Arc::new(AtomicUsize::new(0)),
            count,
        };
        (source, probe)
    }
}

impl ByteSource for ThreadedSource {
    fn read(&self, mut transport: TransportBuffer, completion: ReadCompletion) {
        self.probe.enter();
        self.probe.leave();
        let probe = Arc::clone(&self.probe);
        let next = Arc::clone(&self.next);
        let count = self.count;
        thread::spawn(move || {
            thread::sleep(Duration::from_micros(50));
            let i = next.fetch_add(1, Ordering::SeqCst);
            probe.finish();
            if i >= count {
                completion.complete(transport, ReadOutcome::EndOfStream);
            } else {
                let bytes = format!("chunk-{i}").into_bytes();
                transport[..bytes.len()].copy_from_slice(&bytes);
                completion.complete(transport, ReadOutcome::Data(bytes.len()));
            }
        });
    }

    fn close(&self) -> sluicegate::Result<()> {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Recording subscriber
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Next(Bytes),
    Error(String),
    Complete,
}

/// Records every signal. Cloning shares the same log.
#[derive(Clone, Default)]
pub struct Recorder {
    inner: Arc<(Mutex<Vec<Event>>, Condvar)>,
    next_count: Arc<AtomicUsize>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: Event) {
        let (log, cvar) = &*self.inner;
        log.lock().unwrap().push(event);
        cvar.notify_all();
    }

    pub fn events(&self) -> Vec<Event> {
        self.inner.0.lock().unwrap().clone()
    }

    pub fn buffers(&self) -> Vec<Bytes> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Next(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    pub fn next_count(&self) -> usize {
        self.next_count.load(Ordering::SeqCst)
    }

    pub fn completions(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::Complete))
            .count()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Error(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    pub fn is_terminated(&self) -> bool {
        self.events()
            .iter()
            .any(|e| matches!(e, Event::Complete | Event::Error(_)))
    }

    /// Block until a terminal signal arrives or `timeout` passes.
    pub fn wait_terminated(&self, timeout: Duration) -> bool {
        let (log, cvar) = &*self.inner;
        let guard = log.lock().unwrap();
        let (guard, _) = cvar
            .wait_timeout_while(guard, timeout, |events| {
                !events
                    .iter()
                    .any(|e| matches!(e, Event::Complete | Event::Error(_)))
            })
            .unwrap();
        guard
            .iter()
            .any(|e| matches!(e, Event::Complete | Event::Error(_)))
    }
}

impl Subscriber for Recorder {
    fn on_next(&self, buffer: Bytes) {
        self.next_count.fetch_add(1, Ordering::SeqCst);
        self.push(Event::Next(buffer));
    }

    fn on_error(&self, error: SluiceError) {
        self.push(Event::Error(error.to_string()));
    }

    fn on_complete(&self) {
        self.push(Event::Complete);
    }
}
