//! FanoutDispatcher sends many buffered requests through one executor invocation. A single
//! request bypasses merging entirely; two or more are rewritten under per-request prefixes
//! into one composite request, executed once, and the composite response is split back into
//! per-request results with the errors re-attributed to the request they belong to. Every
//! pending request's completion handle is resolved exactly once, also on failure and
//! cancellation.

use std::collections::BTreeSet;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::merge::{RequestMerger, merge_variables};
use crate::request::{
    AliasMap, PathSegment, PendingRequest, QueryRequest, QueryResponse, VariableMap,
};

/// Executes one request, composite or single, against whatever data source the surrounding
/// system provides. The dispatcher only relies on the response shape coming back.
#[trait_variant::make(QueryExecutor: Send)]
pub trait LocalQueryExecutor {
    async fn execute(
        &self,
        request: QueryRequest,
        cln_token: CancellationToken,
    ) -> Result<QueryResponse>;
}

pub struct FanoutDispatcher<E> {
    executor: E,
}

impl<E> FanoutDispatcher<E>
where
    E: QueryExecutor,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Dispatches the buffered requests, resolving every completion handle. Requests are
    /// processed for result splitting in submission order; the unclaimed-error fallback
    /// depends on that order being preserved.
    pub async fn dispatch(&self, mut requests: Vec<PendingRequest>, cln_token: CancellationToken) {
        match requests.len() {
            0 => {}
            1 => {
                let request = requests.pop().expect("len checked");
                self.dispatch_single(request, cln_token).await;
            }
            _ => self.dispatch_merged(requests, cln_token).await,
        }
    }

    /// Fast path: one request means no fan-in, so no composite is built and the single
    /// outcome goes straight to the caller.
    async fn dispatch_single(&self, mut request: PendingRequest, cln_token: CancellationToken) {
        let outcome = self.execute_once(request.request.clone(), cln_token).await;
        request.complete(outcome);
    }

    async fn dispatch_merged(
        &self,
        mut requests: Vec<PendingRequest>,
        cln_token: CancellationToken,
    ) {
        let composite = build_composite(&mut requests);
        debug!(requests = requests.len(), "executing composite request");

        match self.execute_once(composite, cln_token).await {
            Ok(response) => split_response(&mut requests, response),
            Err(e) => {
                // every request that has not settled yet gets the composite failure; requests
                // resolved before the failure are never revisited
                warn!(error = %e, "composite execution failed");
                for request in requests.iter_mut().filter(|r| !r.is_resolved()) {
                    request.complete(Err(e.clone()));
                }
            }
        }
    }

    /// The one shared suspension point. Cancellation abandons the in-flight execution and
    /// surfaces as [Error::Cancelled], handled identically to an execution failure.
    async fn execute_once(
        &self,
        request: QueryRequest,
        cln_token: CancellationToken,
    ) -> Result<QueryResponse> {
        tokio::select! {
            _ = cln_token.cancelled() => Err(Error::Cancelled),
            result = self.executor.execute(request, cln_token.clone()) => result,
        }
    }
}

/// Merges every request (in submission order) into one composite request, recording each
/// request's alias map as a side effect. Request `i` gets the prefix `__{i}_`.
fn build_composite(requests: &mut [PendingRequest]) -> QueryRequest {
    let mut merger = RequestMerger::new();
    let mut variables = VariableMap::new();

    // the composite gets an operation name only when the distinct non-null operation names
    // collapse to exactly one
    let names: BTreeSet<&str> = requests
        .iter()
        .filter_map(|r| r.request.operation_name.as_deref())
        .collect();
    if names.len() == 1 {
        merger.set_operation_name(*names.first().expect("len checked"));
    }

    for (i, request) in requests.iter_mut().enumerate() {
        let prefix = format!("__{i}_");
        merge_variables(&request.request.variables, &mut variables, &prefix);
        let aliases = merger.add_request(
            &request.request.document,
            &prefix,
            request.request.auto_generated,
        );
        request.set_aliases(aliases);
    }

    let operation_name = merger.operation_name().map(str::to_string);
    QueryRequest {
        document: merger.merge(),
        variables,
        operation_name,
        auto_generated: true,
    }
}

/// Splits the composite response into per-request results and resolves every handle. Errors
/// whose path starts with one of a request's namespaced keys are rewritten and claimed by that
/// request; whatever stays unclaimed is attached verbatim to the last request only, so no
/// error is ever dropped.
fn split_response(requests: &mut [PendingRequest], response: QueryResponse) {
    let mut claimed = vec![false; response.errors.len()];
    let last = requests.len().saturating_sub(1);

    for (i, request) in requests.iter_mut().enumerate() {
        let mut result = extract_result(request.aliases(), &response, &mut claimed);
        if i == last {
            for (error, claimed) in response.errors.iter().zip(claimed.iter()) {
                if !claimed {
                    result.errors.push(error.clone());
                }
            }
        }
        request.complete(Ok(result));
    }
}

/// Builds one request's result from the composite response: data entries re-keyed through the
/// alias map, claimed errors with their first path segment rewritten to the original key (the
/// rest of the path untouched), and the shared context data copied verbatim.
fn extract_result(
    aliases: &AliasMap,
    response: &QueryResponse,
    claimed: &mut [bool],
) -> QueryResponse {
    let mut result = QueryResponse {
        context_data: response.context_data.clone(),
        ..Default::default()
    };

    for (namespaced, original) in aliases {
        if let Some(value) = response.data.get(namespaced) {
            result.data.insert(original.clone(), value.clone());
        }
    }

    for (error, claimed) in response.errors.iter().zip(claimed.iter_mut()) {
        if *claimed {
            continue;
        }
        let Some(PathSegment::Key(first)) = error.path.first() else {
            continue;
        };
        if let Some((_, original)) = aliases.iter().find(|(namespaced, _)| namespaced == first) {
            let mut rewritten = error.clone();
            if let Some(segment) = rewritten.path.first_mut() {
                *segment = PathSegment::Key(original.clone());
            }
            result.errors.push(rewritten);
            *claimed = true;
        }
    }

    result
}
