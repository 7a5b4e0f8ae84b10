//! Queryfan merges many independently-issued structured query requests into one composite
//! request, executes it once, and splits the composite response back into per-request results
//! with exact error attribution. The flow is:
//! - callers submit requests through the [client::QueryClient], which buffers them without
//!   blocking and hands each caller a write-once completion handle
//! - an external trigger flushes the buffer; the [dispatch::FanoutDispatcher] either executes
//!   a lone request directly or namespaces every request under a per-request prefix via the
//!   [merge::RequestMerger] and executes the composite exactly once
//! - the composite response is demultiplexed through each request's alias map; errors are
//!   re-attributed by path, unattributable errors fall back to the last request so nothing is
//!   silently dropped, and failures settle every still-pending handle
//!
//! Validating, parsing, and actually executing a query against a data source all live behind
//! the [dispatch::QueryExecutor] boundary.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod merge;
pub mod query;
pub mod request;

pub use crate::client::QueryClient;
pub use crate::dispatch::{FanoutDispatcher, QueryExecutor};
pub use crate::error::{Error, Result};
pub use crate::merge::RequestMerger;
pub use crate::request::{
    AliasMap, PathSegment, PendingRequest, QueryError, QueryRequest, QueryResponse, VariableMap,
};
