//! Common types used throughout the SDK
//!
//! This module contains shared type definitions, type aliases,
//! and the constants fixed by the remote REST contract.

use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// Ordered string-keyed parameter map sent with every remote method call
pub type Params = serde_json::Map<String, JsonValue>;

// ============================================================================
// Remote Contract
// ============================================================================

/// Records returned by one list page
pub const PAGE_SIZE: usize = 50;

/// Commands accepted by a single `batch` call
pub const MAX_BATCH_COMMANDS: usize = 50;

/// Page-start value that disables total counting on the remote side
pub const NO_COUNT_START: i64 = -1;

/// Key field of classic list endpoints
pub const DEFAULT_KEY_FIELD: &str = "ID";

/// Key field of item-style list endpoints
pub const ITEMS_KEY_FIELD: &str = "id";

/// Name of the grouped-call method
pub const BATCH_METHOD: &str = "batch";

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_contract_constants() {
        assert_eq!(PAGE_SIZE, 50);
        assert_eq!(MAX_BATCH_COMMANDS, 50);
        assert_eq!(NO_COUNT_START, -1);
        assert_eq!(DEFAULT_KEY_FIELD, "ID");
        assert_eq!(ITEMS_KEY_FIELD, "id");
    }

    #[test]
    fn test_params_preserve_insertion_order() {
        let mut params = Params::new();
        params.insert("order".to_string(), JsonValue::Null);
        params.insert("filter".to_string(), JsonValue::Null);
        params.insert("select".to_string(), JsonValue::Null);
        let keys: Vec<&str> = params.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["order", "filter", "select"]);
    }

    #[test]
    fn test_backoff_type_serde() {
        let parsed: BackoffType = serde_json::from_str("\"linear\"").unwrap();
        assert_eq!(parsed, BackoffType::Linear);
        assert_eq!(BackoffType::default(), BackoffType::Exponential);
    }
}
