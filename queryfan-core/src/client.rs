//! QueryClient is the caller-facing seam: callers hand in a request and get back a receiver
//! for its eventual outcome, while the requests themselves accumulate in a buffer. An external
//! trigger decides when to flush; flushing swaps the buffer out atomically and forwards the
//! requests, in submission order, to the [FanoutDispatcher]. The client can also defer its
//! flush through a [BatchScheduler] so that many clients' flushes run as one batch of work.

use std::sync::Arc;

use batchwork::BatchScheduler;
use parking_lot::Mutex;
use tokio::sync::{Notify, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::Result;
use crate::config::config;
use crate::dispatch::{FanoutDispatcher, QueryExecutor};
use crate::request::{PendingRequest, QueryRequest, QueryResponse};

pub struct QueryClient<E> {
    dispatcher: FanoutDispatcher<E>,
    buffer: Mutex<Vec<PendingRequest>>,
    buffered: Notify,
}

impl<E> QueryClient<E>
where
    E: QueryExecutor,
{
    pub fn new(executor: E) -> Self {
        Self {
            dispatcher: FanoutDispatcher::new(executor),
            buffer: Mutex::new(Vec::with_capacity(config().request_buffer_capacity)),
            buffered: Notify::new(),
        }
    }

    /// Buffers a request and returns the receiver its caller awaits. Never blocks; the request
    /// sits in the buffer until the next [dispatch](Self::dispatch).
    pub fn execute(&self, request: QueryRequest) -> oneshot::Receiver<Result<QueryResponse>> {
        let (pending, receiver) = PendingRequest::new(request);
        self.buffer.lock().push(pending);
        self.buffered.notify_one();
        receiver
    }

    /// Advisory count of buffered requests.
    pub fn buffered_requests(&self) -> usize {
        self.buffer.lock().len()
    }

    /// Completes when a request has been buffered since the last wakeup; the input for the
    /// external trigger that decides when to flush.
    pub async fn request_buffered(&self) {
        self.buffered.notified().await;
    }

    /// Flushes the buffer through the dispatcher. The swap is atomic with respect to
    /// concurrent [execute](Self::execute) calls, and an empty buffer is a no-op. With
    /// batching disabled in [config] every request goes through the single-request path
    /// instead of being merged.
    pub async fn dispatch(&self, cln_token: CancellationToken) {
        let drained = {
            let mut buffer = self.buffer.lock();
            std::mem::replace(
                &mut *buffer,
                Vec::with_capacity(config().request_buffer_capacity),
            )
        };
        if drained.is_empty() {
            return;
        }
        debug!(requests = drained.len(), "flushing buffered requests");

        if config().batching_enabled {
            self.dispatcher.dispatch(drained, cln_token).await;
        } else {
            for request in drained {
                self.dispatcher
                    .dispatch(vec![request], cln_token.clone())
                    .await;
            }
        }
    }
}

impl<E> QueryClient<E>
where
    E: QueryExecutor + Sync + Send + 'static,
{
    /// Defers this client's flush into a [BatchScheduler], so an execution engine can run the
    /// flushes of many clients together in one drained batch.
    pub fn schedule_dispatch(
        self: &Arc<Self>,
        scheduler: &BatchScheduler,
        cln_token: CancellationToken,
    ) {
        let client = Arc::clone(self);
        scheduler.schedule(Box::new(move || {
            Box::pin(async move {
                client.dispatch(cln_token).await;
                Ok(())
            })
        }));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::sync::mpsc;
    use tokio::time::{Duration, timeout};

    use super::*;
    use crate::dispatch::tests_support::StubExecutor;
    use crate::query::{FieldSelection, QueryDocument};

    fn named_request(field: &str) -> QueryRequest {
        QueryRequest::new(QueryDocument {
            variable_definitions: vec![],
            selections: vec![FieldSelection::new(field)],
        })
    }

    #[tokio::test]
    async fn test_buffering_preserves_submission_order() {
        let response = QueryResponse {
            data: [
                ("__0_a".to_string(), json!(1)),
                ("__1_b".to_string(), json!(2)),
            ]
            .into_iter()
            .collect(),
            ..Default::default()
        };
        let executor = StubExecutor::returning(Ok(response));
        let client = QueryClient::new(executor.clone());

        let a_rx = client.execute(named_request("a"));
        let b_rx = client.execute(named_request("b"));
        assert_eq!(client.buffered_requests(), 2);

        client.dispatch(CancellationToken::new()).await;
        assert_eq!(client.buffered_requests(), 0);

        // the composite was built in submission order, so "a" got prefix __0_
        let a = a_rx.await.unwrap().unwrap();
        assert_eq!(a.data.get("a"), Some(&json!(1)));
        let b = b_rx.await.unwrap().unwrap();
        assert_eq!(b.data.get("b"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_dispatch_with_empty_buffer_is_noop() {
        let executor = StubExecutor::returning(Ok(QueryResponse::default()));
        let client = QueryClient::new(executor.clone());
        client.dispatch(CancellationToken::new()).await;
        assert!(executor.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_request_buffered_signal() {
        let executor = StubExecutor::returning(Ok(QueryResponse::default()));
        let client = QueryClient::new(executor);
        let _rx = client.execute(named_request("a"));
        timeout(Duration::from_secs(1), client.request_buffered())
            .await
            .expect("buffered notification should be stored");
    }

    #[tokio::test]
    async fn test_schedule_dispatch_runs_in_batch() {
        let response = QueryResponse {
            data: [("a".to_string(), json!(1))].into_iter().collect(),
            ..Default::default()
        };
        let client = Arc::new(QueryClient::new(StubExecutor::returning(Ok(response))));
        let scheduler = BatchScheduler::new();

        let rx = client.execute(named_request("a"));
        client.schedule_dispatch(&scheduler, CancellationToken::new());

        let mut drained = None;
        scheduler.dispatch(|batch| drained = Some(batch));
        let (error_tx, _error_rx) = mpsc::channel(1);
        drained.expect("flush was scheduled").run(error_tx).await;

        let result = timeout(Duration::from_secs(1), rx).await.unwrap();
        assert_eq!(result.unwrap().unwrap().data.get("a"), Some(&json!(1)));
    }
}
