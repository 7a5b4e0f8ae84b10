//! Request and response shapes that flow across the executor boundary, and the buffered
//! [PendingRequest] that pairs a request with its write-once completion handle. A
//! PendingRequest is created when a caller submits a request, gains its [AliasMap] during
//! merging, and is completed exactly once when its result or failure is known.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::oneshot;
use tracing::warn;

use crate::Result;
use crate::query::QueryDocument;

/// Variable bindings of a request. Ordered so the composite request is deterministic.
pub type VariableMap = Map<String, Value>;

/// Per-request mapping from namespaced composite response key to the original response key the
/// caller expects. Ordered by selection order so reconstructed data keeps the caller's order;
/// built during merge, read-only during result splitting.
pub type AliasMap = Vec<(String, String)>;

#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub document: QueryDocument,
    pub variables: VariableMap,
    pub operation_name: Option<String>,
    /// Marks documents built by machinery rather than authored by a caller. Their aliases and
    /// operation names carry no caller-visible meaning.
    pub auto_generated: bool,
}

impl QueryRequest {
    pub fn new(document: QueryDocument) -> Self {
        Self {
            document,
            variables: VariableMap::new(),
            operation_name: None,
            auto_generated: false,
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}

/// The executor's answer for one request, composite or single: response data as an ordered
/// mapping, the errors in execution order, and ambient context data that is copied verbatim to
/// every caller of a composite.
#[derive(Debug, Clone, Default)]
pub struct QueryResponse {
    pub data: Map<String, Value>,
    pub errors: Vec<QueryError>,
    pub context_data: HashMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryError {
    pub message: String,
    pub path: Vec<PathSegment>,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
        }
    }

    pub fn at(mut self, path: Vec<PathSegment>) -> Self {
        self.path = path;
        self
    }
}

/// One step of an error path: a response key or a list index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// One caller's request awaiting individual or merged dispatch. The promise is write-once:
/// completing an already-completed request is a no-op, never an overwrite, so the caller's
/// observed result is always the first resolution.
pub struct PendingRequest {
    pub request: QueryRequest,
    aliases: AliasMap,
    promise: Option<oneshot::Sender<Result<QueryResponse>>>,
}

impl PendingRequest {
    /// Creates a buffered request and the receiver on which its caller awaits the outcome.
    pub fn new(request: QueryRequest) -> (Self, oneshot::Receiver<Result<QueryResponse>>) {
        let (sender, receiver) = oneshot::channel();
        (
            Self {
                request,
                aliases: AliasMap::new(),
                promise: Some(sender),
            },
            receiver,
        )
    }

    pub(crate) fn set_aliases(&mut self, aliases: AliasMap) {
        self.aliases = aliases;
    }

    pub(crate) fn aliases(&self) -> &AliasMap {
        &self.aliases
    }

    pub fn is_resolved(&self) -> bool {
        self.promise.is_none()
    }

    /// Resolves the completion handle. Returns false when the request was already resolved
    /// (the outcome is dropped) or the caller stopped waiting.
    pub(crate) fn complete(&mut self, outcome: Result<QueryResponse>) -> bool {
        let Some(promise) = self.promise.take() else {
            warn!("attempted to resolve an already-resolved request");
            return false;
        };
        promise.send(outcome).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::FieldSelection;

    fn request() -> QueryRequest {
        QueryRequest::new(QueryDocument {
            variable_definitions: vec![],
            selections: vec![FieldSelection::new("user")],
        })
    }

    #[tokio::test]
    async fn test_complete_is_write_once() {
        let (mut pending, receiver) = PendingRequest::new(request());
        assert!(!pending.is_resolved());

        let first = QueryResponse {
            data: [("user".to_string(), Value::from(1))].into_iter().collect(),
            ..Default::default()
        };
        assert!(pending.complete(Ok(first)));
        assert!(pending.is_resolved());

        // the second resolution is dropped, the caller sees the first
        assert!(!pending.complete(Ok(QueryResponse::default())));

        let observed = receiver.await.unwrap().unwrap();
        assert_eq!(observed.data.get("user"), Some(&Value::from(1)));
    }

    #[tokio::test]
    async fn test_complete_reports_gone_caller() {
        let (mut pending, receiver) = PendingRequest::new(request());
        drop(receiver);
        assert!(!pending.complete(Ok(QueryResponse::default())));
        assert!(pending.is_resolved());
    }
}
