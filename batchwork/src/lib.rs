//! Batchwork coalesces independently scheduled units of deferred async work so they can be run
//! together in one pass. Callers [schedule](BatchScheduler::schedule) zero-argument callables
//! without blocking; an external trigger decides when to [dispatch](BatchScheduler::dispatch),
//! which atomically drains everything queued so far into a single [Batch]. Running the batch
//! awaits every callable in drained order and isolates per-callable failures, so one slow or
//! failing unit of work never starves or aborts its siblings.
//!
//! The crate never self-triggers a dispatch; deciding *when* to flush is the caller's policy.
//! [BatchScheduler::work_enqueued] and [BatchScheduler::has_pending] are the inputs to that
//! decision.

mod batch;
mod scheduler;

pub use crate::batch::Batch;
pub use crate::scheduler::BatchScheduler;

/// Failure produced by a single callable, reported to the batch's error sink.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A zero-argument unit of deferred async work. Side effects happen by resolving some other
/// caller-visible handle; the returned error is only for reporting to the error sink.
pub type BatchCallable =
    Box<dyn FnOnce() -> futures::future::BoxFuture<'static, Result<(), BoxError>> + Send>;
