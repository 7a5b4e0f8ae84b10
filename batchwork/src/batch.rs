use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{BatchCallable, BoxError};

/// Batch is one dispatch cycle's worth of deferred callables, drained atomically from the
/// scheduler. Running it awaits every callable in drained order; a callable's failure goes to
/// the error sink and the remaining callables still run. The batch is complete only once every
/// callable has settled.
pub struct Batch {
    tasks: Vec<BatchCallable>,
}

impl Batch {
    pub(crate) fn new(tasks: Vec<BatchCallable>) -> Self {
        Self { tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Runs every callable to completion. Failures are reported through `errors` and never
    /// abort or skip sibling callables.
    pub async fn run(self, errors: mpsc::Sender<BoxError>) {
        let total = self.tasks.len();
        debug!(total, "batch started");
        for (i, task) in self.tasks.into_iter().enumerate() {
            if let Err(e) = task().await {
                warn!(index = i, error = %e, "deferred callable failed");
                // the sink may be unbounded-consumed or dropped; either way the batch goes on
                let _ = errors.send(e).await;
            }
        }
        debug!(total, "batch completed");
    }
}
