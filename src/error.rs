//! Error types for the CRM batch SDK
//!
//! This module defines the error hierarchy for the entire SDK.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Per-command failures inside a grouped call are carried as [`CommandError`],
//! which is cheap to clone so one transport failure can be reported for every
//! command of the chunk it broke.

use thiserror::Error;

/// Remote error codes that signal an exhausted request or operation-time budget
const RATE_LIMIT_CODES: &[&str] = &["QUERY_LIMIT_EXCEEDED", "OPERATION_TIME_LIMIT"];

/// The main error type for the SDK
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Transport Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Transport error: {message}")]
    Transport { message: String },

    // ============================================================================
    // Remote API Errors
    // ============================================================================
    #[error("Remote API error {code}: {description}")]
    Api { code: String, description: String },

    #[error("Rate limited by remote ({code}): {description}")]
    RateLimited { code: String, description: String },

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    // ============================================================================
    // Caller Errors
    // ============================================================================
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a remote error, classifying rate-limit codes separately
    pub fn api(code: impl Into<String>, description: impl Into<String>) -> Self {
        let code = code.into();
        let description = description.into();
        if is_rate_limit_code(&code) {
            Self::RateLimited { code, description }
        } else {
            Self::Api { code, description }
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Check if this error is retryable at the transport level
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::Timeout { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Check if the remote side rejected the call for exceeding its budget
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Error::RateLimited { .. })
    }

    /// Check if the error happened before reaching the remote application
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Http(_)
                | Error::HttpStatus { .. }
                | Error::Timeout { .. }
                | Error::Transport { .. }
        )
    }
}

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 500 | 502 | 503 | 504)
}

/// Check if a remote error code belongs to the rate-limit family
pub fn is_rate_limit_code(code: &str) -> bool {
    RATE_LIMIT_CODES.contains(&code)
}

/// Result type alias for the SDK
pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Command Errors
// ============================================================================

/// Category of a per-command failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandErrorKind {
    /// The grouped call carrying the command never produced a usable response
    Transport,
    /// The remote application rejected this command
    Api,
    /// The remote application rejected this command for budget reasons
    RateLimit,
}

/// Failure of a single command within a grouped call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {description}")]
pub struct CommandError {
    /// Failure category
    pub kind: CommandErrorKind,
    /// Remote error code (or a local code for transport failures)
    pub code: String,
    /// Human readable message
    pub description: String,
}

impl CommandError {
    /// Create an error from a remote error entry
    pub fn api(code: impl Into<String>, description: impl Into<String>) -> Self {
        let code = code.into();
        let kind = if is_rate_limit_code(&code) {
            CommandErrorKind::RateLimit
        } else {
            CommandErrorKind::Api
        };
        Self {
            kind,
            code,
            description: description.into(),
        }
    }

    /// Create an error shared by every command of a failed grouped call
    pub fn transport(description: impl Into<String>) -> Self {
        Self {
            kind: CommandErrorKind::Transport,
            code: "TRANSPORT".to_string(),
            description: description.into(),
        }
    }

    /// Check if this is a rate-limit rejection
    pub fn is_rate_limit(&self) -> bool {
        self.kind == CommandErrorKind::RateLimit
    }
}

impl From<&Error> for CommandError {
    fn from(err: &Error) -> Self {
        match err {
            Error::Api { code, description } | Error::RateLimited { code, description } => {
                Self::api(code.clone(), description.clone())
            }
            other => Self::transport(other.to_string()),
        }
    }
}

impl From<CommandError> for Error {
    fn from(err: CommandError) -> Self {
        match err.kind {
            CommandErrorKind::Transport => Error::Transport {
                message: err.description,
            },
            CommandErrorKind::Api => Error::Api {
                code: err.code,
                description: err.description,
            },
            CommandErrorKind::RateLimit => Error::RateLimited {
                code: err.code,
                description: err.description,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::missing_field("webhook_url");
        assert_eq!(err.to_string(), "Missing required config field: webhook_url");

        let err = Error::http_status(404, "Not found");
        assert_eq!(err.to_string(), "HTTP 404: Not found");

        let err = Error::api("ACCESS_DENIED", "Access denied!");
        assert_eq!(err.to_string(), "Remote API error ACCESS_DENIED: Access denied!");
    }

    #[test]
    fn test_api_classifies_rate_limit_codes() {
        assert!(Error::api("QUERY_LIMIT_EXCEEDED", "Too many requests").is_rate_limit());
        assert!(Error::api("OPERATION_TIME_LIMIT", "Method is blocked").is_rate_limit());
        assert!(!Error::api("NOT_FOUND", "Not found").is_rate_limit());
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::Timeout { timeout_ms: 1000 }.is_retryable());
        assert!(Error::http_status(500, "").is_retryable());
        assert!(Error::http_status(502, "").is_retryable());

        assert!(!Error::http_status(400, "").is_retryable());
        assert!(!Error::http_status(401, "").is_retryable());
        assert!(!Error::api("QUERY_LIMIT_EXCEEDED", "").is_retryable());
        assert!(!Error::config("test").is_retryable());
    }

    #[test]
    fn test_command_error_round_trips_kind() {
        let err: Error = CommandError::api("OPERATION_TIME_LIMIT", "blocked").into();
        assert!(err.is_rate_limit());

        let err: Error = CommandError::api("ERROR_CORE", "boom").into();
        assert!(matches!(err, Error::Api { ref code, .. } if code == "ERROR_CORE"));

        let err: Error = CommandError::transport("connection reset").into();
        assert!(err.is_transport());
    }

    #[test]
    fn test_command_error_from_transport_error() {
        let cmd = CommandError::from(&Error::http_status(503, "unavailable"));
        assert_eq!(cmd.kind, CommandErrorKind::Transport);
        assert!(cmd.description.contains("503"));

        let cmd = CommandError::from(&Error::api("QUERY_LIMIT_EXCEEDED", "slow down"));
        assert!(cmd.is_rate_limit());
    }
}
