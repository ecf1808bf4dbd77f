use std::{
    io,
    sync::atomic::{AtomicU64, Ordering},
    thread::{self, JoinHandle},
};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use stats::StatsdDataFactory;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::LegacyCall;

/// Default number of calls that can wait in the queue before new calls are dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

const DEFAULT_THREAD_NAME: &str = "stats-legacy-sink";

/// Errors that could occur while building a [`QueuedSink`].
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue capacity was zero.
    #[error("queue capacity must be greater than zero")]
    ZeroCapacity,

    /// The worker thread could not be spawned.
    #[error("failed to spawn queue worker thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Moves legacy sink calls off the recording path.
///
/// Calls are pushed onto a bounded queue and delivered to the wrapped sink by a dedicated worker
/// thread, in order. When the queue is full, the call is dropped and counted instead of blocking
/// the caller; the count is available from [`dropped`](QueuedSink::dropped).
///
/// Dropping a `QueuedSink` closes the queue and waits for the worker to deliver every call that
/// was already queued.
pub struct QueuedSink {
    tx: Option<Sender<LegacyCall>>,
    worker: Option<JoinHandle<()>>,
    dropped: AtomicU64,
    capacity: usize,
}

impl QueuedSink {
    /// Wraps `inner` with the default configuration.
    ///
    /// # Errors
    ///
    /// If the worker thread cannot be spawned, an error variant will be returned describing the
    /// error.
    pub fn new<S>(inner: S) -> Result<QueuedSink, QueueError>
    where
        S: StatsdDataFactory + 'static,
    {
        QueuedSinkBuilder::default().build(inner)
    }

    /// Creates a [`QueuedSinkBuilder`].
    pub fn builder() -> QueuedSinkBuilder {
        QueuedSinkBuilder::default()
    }

    /// Number of calls dropped because the queue was full or the worker had stopped.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Maximum number of calls that can wait in the queue.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn enqueue(&self, call: LegacyCall) {
        let Some(tx) = &self.tx else {
            return;
        };

        match tx.try_send(call) {
            Ok(()) => {}
            Err(TrySendError::Full(call)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                trace!(namespace = call.namespace(), "Legacy sink queue full, dropping call.");
            }
            Err(TrySendError::Disconnected(call)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                trace!(namespace = call.namespace(), "Legacy sink worker stopped, dropping call.");
            }
        }
    }
}

impl StatsdDataFactory for QueuedSink {
    fn update_count(&self, namespace: &str, delta: f64) {
        self.enqueue(LegacyCall::UpdateCount(namespace.to_string(), delta));
    }

    fn timing(&self, namespace: &str, milliseconds: f64) {
        self.enqueue(LegacyCall::Timing(namespace.to_string(), milliseconds));
    }

    fn gauge(&self, namespace: &str, value: f64) {
        self.enqueue(LegacyCall::Gauge(namespace.to_string(), value));
    }
}

impl Drop for QueuedSink {
    fn drop(&mut self) {
        // Closing the sender ends the worker loop once the queue is drained.
        drop(self.tx.take());

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Legacy sink worker panicked; queued calls were lost.");
            }
        }

        debug!(dropped = self.dropped(), "Legacy sink queue closed.");
    }
}

fn run_worker<S: StatsdDataFactory>(inner: S, rx: Receiver<LegacyCall>) {
    for call in rx {
        match call {
            LegacyCall::UpdateCount(namespace, delta) => inner.update_count(&namespace, delta),
            LegacyCall::Timing(namespace, milliseconds) => inner.timing(&namespace, milliseconds),
            LegacyCall::Gauge(namespace, value) => inner.gauge(&namespace, value),
        }
    }
}

/// Builder for [`QueuedSink`].
#[derive(Debug)]
pub struct QueuedSinkBuilder {
    capacity: usize,
    thread_name: String,
}

impl QueuedSinkBuilder {
    /// Sets the queue capacity.
    ///
    /// Defaults to [`DEFAULT_QUEUE_CAPACITY`].
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the name of the worker thread.
    #[must_use]
    pub fn with_thread_name<N: Into<String>>(mut self, name: N) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Spawns the worker and returns the sink feeding it.
    ///
    /// # Errors
    ///
    /// If the capacity is zero, or the worker thread cannot be spawned, an error variant will be
    /// returned describing the error.
    pub fn build<S>(self, inner: S) -> Result<QueuedSink, QueueError>
    where
        S: StatsdDataFactory + 'static,
    {
        if self.capacity == 0 {
            return Err(QueueError::ZeroCapacity);
        }

        let (tx, rx) = bounded(self.capacity);
        let worker = thread::Builder::new()
            .name(self.thread_name)
            .spawn(move || run_worker(inner, rx))
            .map_err(QueueError::Spawn)?;

        debug!(capacity = self.capacity, "Spawned legacy sink worker.");

        Ok(QueuedSink {
            tx: Some(tx),
            worker: Some(worker),
            dropped: AtomicU64::new(0),
            capacity: self.capacity,
        })
    }
}

impl Default for QueuedSinkBuilder {
    fn default() -> Self {
        QueuedSinkBuilder {
            capacity: DEFAULT_QUEUE_CAPACITY,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}
