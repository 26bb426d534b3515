// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # CRM Batch SDK
//!
//! Reads list methods of a CRM REST API without offset paging, by splitting
//! the key range into page-sized windows and fetching them through grouped
//! (`batch`) calls.
//!
//! ## Features
//!
//! - **Command Multiplexing**: Up to 50 method calls per round trip, one outcome per command
//! - **Windowed Pagination**: Two boundary probes, then key-range windows without total counting
//! - **Lazy Traversal**: Records are pulled on demand; dropping a traversal cancels it
//! - **HTTP Transport**: Retry with backoff and a token-bucket request budget
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use crm_batch_sdk::{ClientConfig, CrmClient, ListRequest, Filter, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ClientConfig::from_file("portal.yaml")?;
//!     let client = CrmClient::new(&config)?;
//!
//!     let mut deals = client.list(
//!         ListRequest::new("crm.deal.list").filter(Filter::new().equals("STAGE_ID", "WON")),
//!     )?;
//!     while let Some(deal) = deals.next().await {
//!         println!("{}", deal?);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        CrmClient                         │
//! │    call()        batch()        list() → Traversal       │
//! └──────────────────────────────────────────────────────────┘
//!                              │
//! ┌──────────────┬─────────────┴───────────┬─────────────────┐
//! │  Pagination  │          Batch          │    Transport    │
//! ├──────────────┼─────────────────────────┼─────────────────┤
//! │ Probes       │ CommandQueue            │ HttpCaller      │
//! │ Windows      │ CommandMultiplexer      │ Retry / Backoff │
//! │ Sequential   │ Per-command outcomes    │ Rate Limit      │
//! └──────────────┴─────────────────────────┴─────────────────┘
//!                              │
//!                     RemoteCaller (trait)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)] // TODO: Add docs before 1.0 release

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the SDK
pub mod error;

/// Common types and remote-contract constants
pub mod types;

/// Remote caller interface and response types
pub mod remote;

/// Command multiplexing into grouped calls
pub mod batch;

/// Order, filter and select builders
pub mod query;

/// Windowed cursor pagination
pub mod pagination;

/// HTTP transport with retry and rate limiting
pub mod transport;

/// Client configuration
pub mod config;

/// Client facade
pub mod client;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{CommandError, CommandErrorKind, Error, Result};
pub use types::*;

// Re-export commonly used types
pub use batch::{CommandKey, CommandMultiplexer, CommandOutcome};
pub use client::CrmClient;
pub use config::ClientConfig;
pub use pagination::{CursorPaginator, ListRequest, Traversal, VariantHints};
pub use query::{Direction, Filter, Order, Select};
pub use remote::{ApiResponse, BatchResponse, PageResult, RemoteCaller};
pub use transport::HttpCaller;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
