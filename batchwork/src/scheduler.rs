use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::debug;

use crate::{Batch, BatchCallable};

/// BatchScheduler collects deferred callables from unbounded concurrent callers and hands them
/// out as atomic batches. The queue mutex is held only while enqueueing or draining, never while
/// a batch executes.
pub struct BatchScheduler {
    queue: Mutex<VecDeque<BatchCallable>>,
    enqueued: Notify,
}

impl Default for BatchScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchScheduler {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            enqueued: Notify::new(),
        }
    }

    /// Enqueues one unit of deferred work and signals [work_enqueued](Self::work_enqueued).
    /// Never blocks the caller.
    pub fn schedule(&self, work: BatchCallable) {
        self.queue.lock().push_back(work);
        // notify_one stores a permit when nobody is waiting, so a trigger loop that starts
        // listening after the enqueue still wakes up. The signal is advisory, not counted.
        self.enqueued.notify_one();
    }

    /// Advisory check whether any work is queued. A stale `false` only delays processing until
    /// the next trigger; it never loses work.
    pub fn has_pending(&self) -> bool {
        !self.queue.lock().is_empty()
    }

    /// Completes when work has been enqueued since the last wakeup. This is the hook for the
    /// external trigger that decides when to call [dispatch](Self::dispatch); the scheduler
    /// never flushes on its own.
    pub async fn work_enqueued(&self) {
        self.enqueued.notified().await;
    }

    /// Atomically drains everything queued so far and hands it to `submit` as one [Batch].
    /// A callable scheduled concurrently lands either in this batch or in the next, never in
    /// both and never in neither. No-op when the queue is empty.
    pub fn dispatch(&self, submit: impl FnOnce(Batch)) {
        let drained = {
            let mut queue = self.queue.lock();
            if queue.is_empty() {
                return;
            }
            queue.drain(..).collect::<Vec<BatchCallable>>()
        };
        debug!(len = drained.len(), "drained batch of deferred work");
        submit(Batch::new(drained));
    }
}
