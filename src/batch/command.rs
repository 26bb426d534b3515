//! Commands and the pending command queue

use crate::error::{Error, Result};
use crate::types::Params;
use std::fmt;

/// Correlation key of a registered command
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CommandKey {
    /// Position of the command in the queue at registration time
    Ordinal(usize),
    /// Key supplied by the caller
    Named(String),
}

impl CommandKey {
    /// Key as sent in the `cmd` map of a grouped call
    pub fn wire_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CommandKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ordinal(position) => write!(f, "{position}"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// A remote method invocation waiting in a queue
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    key: CommandKey,
    method: String,
    params: Params,
}

impl Command {
    /// Create a command
    pub fn new(key: CommandKey, method: impl Into<String>, params: Params) -> Self {
        Self {
            key,
            method: method.into(),
            params,
        }
    }

    /// Correlation key
    pub fn key(&self) -> &CommandKey {
        &self.key
    }

    /// Remote method name
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Method parameters
    pub fn params(&self) -> &Params {
        &self.params
    }
}

/// Ordered collection of commands awaiting execution
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    commands: Vec<Command>,
}

impl CommandQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command keyed by its position
    pub fn push(&mut self, method: impl Into<String>, params: Params) -> CommandKey {
        let key = CommandKey::Ordinal(self.commands.len());
        self.commands
            .push(Command::new(key.clone(), method, params));
        key
    }

    /// Append a command under a caller-supplied key
    pub fn push_named(
        &mut self,
        key: impl Into<String>,
        method: impl Into<String>,
        params: Params,
    ) -> Result<CommandKey> {
        let name = key.into();
        if name.is_empty() {
            return Err(Error::invalid_argument("command key must not be empty"));
        }
        // All-digit keys would collide with ordinal keys on the wire
        if name.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid_argument(format!(
                "command key '{name}' is reserved for positional keys"
            )));
        }
        if self.contains(&name) {
            return Err(Error::invalid_argument(format!(
                "command key '{name}' is already registered"
            )));
        }

        let key = CommandKey::Named(name);
        self.commands
            .push(Command::new(key.clone(), method, params));
        Ok(key)
    }

    /// Check whether a wire key is already queued
    pub fn contains(&self, wire_key: &str) -> bool {
        self.commands
            .iter()
            .any(|c| c.key.wire_key() == wire_key)
    }

    /// Queued commands in registration order
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of queued commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drop every queued command
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Remove and return every queued command, leaving the queue empty
    pub fn take(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }
}
