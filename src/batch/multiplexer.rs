//! Command multiplexer
//!
//! Accumulates commands and executes them through the grouped-call endpoint,
//! splitting the queue into chunks the endpoint accepts.

use super::command::{Command, CommandKey, CommandQueue};
use crate::error::{CommandError, Result};
use crate::remote::{BatchResponse, PageResult, RemoteCaller};
use crate::types::{Params, MAX_BATCH_COMMANDS};
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of one executed command
pub type CommandOutcome = std::result::Result<PageResult, CommandError>;

/// Queues commands and runs them as grouped calls
pub struct CommandMultiplexer {
    caller: Arc<dyn RemoteCaller>,
    queue: CommandQueue,
}

impl CommandMultiplexer {
    /// Create a multiplexer with an empty queue
    pub fn new(caller: Arc<dyn RemoteCaller>) -> Self {
        Self {
            caller,
            queue: CommandQueue::new(),
        }
    }

    /// Queue a command; the returned key is its queue position
    pub fn register(&mut self, method: impl Into<String>, params: Params) -> CommandKey {
        self.queue.push(method, params)
    }

    /// Queue a command under a caller-supplied key
    pub fn register_with_key(
        &mut self,
        key: impl Into<String>,
        method: impl Into<String>,
        params: Params,
    ) -> Result<CommandKey> {
        self.queue.push_named(key, method, params)
    }

    /// Drop every queued command without executing it
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Commands waiting for the next `execute`
    pub fn pending(&self) -> &[Command] {
        self.queue.commands()
    }

    /// Number of queued commands
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Execute every queued command and empty the queue.
    ///
    /// Returns exactly one outcome per queued command, in registration order.
    /// A grouped call that fails as a whole yields the same error for every
    /// command it carried; other chunks are unaffected.
    pub async fn execute(&mut self, parallel: bool) -> Vec<(CommandKey, CommandOutcome)> {
        let commands = self.queue.take();
        let mut outcomes = Vec::with_capacity(commands.len());
        let chunk_count = commands.len().div_ceil(MAX_BATCH_COMMANDS);

        for (index, chunk) in commands.chunks(MAX_BATCH_COMMANDS).enumerate() {
            debug!(
                "Executing batch chunk {}/{} with {} commands",
                index + 1,
                chunk_count,
                chunk.len()
            );

            match self.caller.call_batch(chunk, parallel).await {
                Ok(response) => {
                    outcomes.extend(
                        chunk
                            .iter()
                            .map(|command| (command.key().clone(), demultiplex(&response, command))),
                    );
                }
                Err(err) => {
                    warn!(
                        "Batch chunk {}/{} failed, {} commands affected: {err}",
                        index + 1,
                        chunk_count,
                        chunk.len()
                    );
                    let shared = CommandError::from(&err);
                    outcomes.extend(
                        chunk
                            .iter()
                            .map(|command| (command.key().clone(), Err(shared.clone()))),
                    );
                }
            }
        }

        outcomes
    }
}

impl std::fmt::Debug for CommandMultiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandMultiplexer")
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

/// Pick one command's outcome out of a grouped response
fn demultiplex(response: &BatchResponse, command: &Command) -> CommandOutcome {
    let key = command.key().wire_key();

    if let Some(err) = response.error(&key) {
        debug!("Command {key} ({}) failed: {err}", command.method());
        return Err(err.clone());
    }

    match response.result(&key) {
        Some(payload) => Ok(PageResult {
            payload: payload.clone(),
            pagination: response.pagination(&key),
            time: response.time(&key).cloned(),
        }),
        None => Err(CommandError::api(
            "MISSING_RESULT",
            format!("no result for command {key} ({})", command.method()),
        )),
    }
}
