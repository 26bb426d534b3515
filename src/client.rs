//! Client facade
//!
//! One handle per portal, sharing a single [`RemoteCaller`] between plain
//! calls, grouped calls and list traversals.

use crate::batch::CommandMultiplexer;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::pagination::{CursorPaginator, ListRequest, Traversal};
use crate::remote::{ApiResponse, RemoteCaller};
use crate::transport::HttpCaller;
use crate::types::Params;
use serde_json::Value;
use std::sync::Arc;

/// Handle to one portal
#[derive(Clone)]
pub struct CrmClient {
    caller: Arc<dyn RemoteCaller>,
    parallel: bool,
}

impl CrmClient {
    /// Connect over HTTP with the given settings
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let caller = HttpCaller::new(config.caller_config()?)?;
        Ok(Self::with_caller(Arc::new(caller)))
    }

    /// Use a custom remote caller
    pub fn with_caller(caller: Arc<dyn RemoteCaller>) -> Self {
        Self {
            caller,
            parallel: false,
        }
    }

    /// Ask the remote side to run grouped commands concurrently
    #[must_use]
    pub fn with_parallel_hint(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Underlying remote caller
    pub fn caller(&self) -> Arc<dyn RemoteCaller> {
        Arc::clone(&self.caller)
    }

    /// Call a single method
    pub async fn call(&self, method: &str, params: &Params) -> Result<ApiResponse> {
        self.caller.call(method, params).await
    }

    /// Fresh multiplexer for grouped calls
    pub fn batch(&self) -> CommandMultiplexer {
        CommandMultiplexer::new(self.caller())
    }

    /// Paginator over this portal
    pub fn paginator(&self) -> CursorPaginator {
        CursorPaginator::new(self.caller()).with_parallel_hint(self.parallel)
    }

    /// Start a lazy traversal of a list method
    pub fn list(&self, request: ListRequest) -> Result<Traversal> {
        self.paginator().traverse(request)
    }

    /// Fetch every record of a list method
    pub async fn list_all(&self, request: ListRequest) -> Result<Vec<Value>> {
        self.list(request)?.collect_all().await
    }
}

impl std::fmt::Debug for CrmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrmClient")
            .field("parallel", &self.parallel)
            .finish_non_exhaustive()
    }
}
