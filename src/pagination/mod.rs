//! Pagination module
//!
//! Traverses list methods of any size through page-sized key windows.
//!
//! # Overview
//!
//! List methods return at most 50 records per call and offer no continuation
//! token. The paginator probes the first page, and when the set is larger,
//! probes the last record in reversed order to learn the key range. The range
//! in between is split into page-sized windows fetched through grouped calls
//! with total counting disabled.
//!
//! ```rust,ignore
//! use crm_batch_sdk::pagination::{CursorPaginator, ListRequest};
//! use crm_batch_sdk::query::Filter;
//!
//! let paginator = CursorPaginator::new(caller);
//! let mut deals = paginator.traverse(
//!     ListRequest::new("crm.deal.list")
//!         .filter(Filter::new().equals("STAGE_ID", "WON"))
//!         .limit(500),
//! )?;
//! while let Some(deal) = deals.next().await {
//!     println!("{}", deal?);
//! }
//! ```

mod traversal;
mod types;
mod windows;

pub use traversal::{CursorPaginator, Traversal};
pub use types::{ListRequest, ResponseShape, Strategy, TraversalStats, VariantHints};
pub use windows::{split_windows, IdWindow};
