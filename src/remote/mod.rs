//! Remote caller module
//!
//! The narrow interface through which the SDK reaches the CRM REST API.
//! Authentication and HTTP details live behind it; the batch and pagination
//! layers only ever see [`RemoteCaller`].

mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use types::{ApiResponse, BatchResponse, PageResult, Pagination, ResponseTime};

pub(crate) use types::as_u64;

use crate::batch::Command;
use crate::error::Result;
use crate::types::Params;
use async_trait::async_trait;

/// Executes remote method calls
#[async_trait]
pub trait RemoteCaller: Send + Sync {
    /// Call a single remote method
    async fn call(&self, method: &str, params: &Params) -> Result<ApiResponse>;

    /// Call several methods in one round trip.
    ///
    /// `parallel` tells the remote side it may run the sub-commands
    /// concurrently. An `Err` means the grouped call as a whole failed.
    async fn call_batch(&self, commands: &[Command], parallel: bool) -> Result<BatchResponse>;
}
