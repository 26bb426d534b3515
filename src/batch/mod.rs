//! Batch module
//!
//! Multiplexes many remote method invocations into grouped calls.
//!
//! # Overview
//!
//! Commands are registered into a [`CommandMultiplexer`] without any network
//! traffic. `execute` sends them in chunks of at most
//! [`MAX_BATCH_COMMANDS`](crate::types::MAX_BATCH_COMMANDS) and returns one
//! [`CommandOutcome`] per command in registration order.

mod command;
mod multiplexer;

pub use command::{Command, CommandKey, CommandQueue};
pub use multiplexer::{CommandMultiplexer, CommandOutcome};
