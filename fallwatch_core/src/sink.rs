//! Bounded, non-blocking event hand-off.
//!
//! `QueuedSink` owns a worker thread that drains a bounded channel into the
//! real delivery sink. `publish` never waits: a full queue is reported back to
//! the caller and the event is dropped.
//!
//! Each `QueuedSink` spawns exactly one thread, joined when the sink is dropped
//! after the queue has been drained.
use crossbeam_channel as xch;
use fallwatch_traits::{EventSink, FallEvent, PublishError};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
struct Counters {
    delivered: AtomicU64,
    failed: AtomicU64,
}

pub struct QueuedSink {
    tx: Option<xch::Sender<FallEvent>>,
    counters: Arc<Counters>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl QueuedSink {
    /// Spawn the delivery worker. `capacity` is clamped to at least 1.
    pub fn spawn<D: EventSink + Send + 'static>(mut inner: D, capacity: usize) -> Self {
        let (tx, rx) = xch::bounded::<FallEvent>(capacity.max(1));
        let counters = Arc::new(Counters::default());
        let worker_counters = counters.clone();

        let join_handle = std::thread::spawn(move || {
            // Ends once every sender is gone and the queue is empty.
            for event in rx.iter() {
                match inner.publish(event) {
                    Ok(()) => {
                        worker_counters.delivered.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        worker_counters.failed.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(error = %e, "fall event delivery failed");
                    }
                }
            }
            tracing::trace!("event delivery thread exiting cleanly");
        });

        Self {
            tx: Some(tx),
            counters,
            join_handle: Some(join_handle),
        }
    }

    pub fn delivered(&self) -> u64 {
        self.counters.delivered.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.counters.failed.load(Ordering::Relaxed)
    }

    /// Events waiting for the worker.
    pub fn pending(&self) -> usize {
        self.tx.as_ref().map_or(0, xch::Sender::len)
    }
}

impl core::fmt::Debug for QueuedSink {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("QueuedSink")
            .field("pending", &self.pending())
            .field("delivered", &self.delivered())
            .field("failed", &self.failed())
            .finish()
    }
}

impl EventSink for QueuedSink {
    fn publish(&mut self, event: FallEvent) -> Result<(), PublishError> {
        let Some(tx) = self.tx.as_ref() else {
            return Err(PublishError::Disconnected);
        };
        tx.try_send(event).map_err(|e| match e {
            xch::TrySendError::Full(_) => PublishError::QueueFull,
            xch::TrySendError::Disconnected(_) => PublishError::Disconnected,
        })
    }
}

impl Drop for QueuedSink {
    fn drop(&mut self) {
        // Closing the sender lets the worker drain what is queued and exit.
        self.tx.take();
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("event delivery thread joined"),
                Err(e) => tracing::warn!(?e, "event delivery thread panicked during shutdown"),
            }
        }
    }
}
