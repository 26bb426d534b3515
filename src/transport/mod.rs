//! HTTP transport module
//!
//! The default [`RemoteCaller`](crate::remote::RemoteCaller): posts method
//! calls to the portal's REST endpoint with retry, rate limiting and
//! backoff strategies.
//!
//! # Features
//!
//! - **Grouped Calls**: Commands encoded as `method?query` inside one `batch` call
//! - **Automatic Retries**: Configurable retry logic with backoff
//! - **Request Budget**: Local mirror of the portal's leaky bucket (governor)

mod client;
mod encode;
mod rate_limit;

pub use client::{HttpCaller, HttpCallerConfig, HttpCallerConfigBuilder};
pub use encode::{encode_command, encode_query};
pub use rate_limit::{RateLimiterConfig, RequestBudget};
