//! Response types for remote method calls
//!
//! A plain call returns `{result, total?, next?, time}`; a grouped call returns
//! the per-command maps `result`, `result_error`, `result_total`, `result_next`
//! and `result_time`, keyed by the command keys sent in `cmd`.

use crate::error::{CommandError, Error, Result};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Timing metadata attached to every remote response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseTime {
    /// Unix timestamp with fractions when processing started
    pub start: f64,
    /// Unix timestamp with fractions when processing finished
    pub finish: f64,
    /// Wall time spent on the request, seconds
    pub duration: f64,
    /// Time spent inside the method itself, seconds
    pub processing: f64,
    /// Processing start in the portal's timezone
    pub date_start: DateTime<FixedOffset>,
    /// Processing finish in the portal's timezone
    pub date_finish: DateTime<FixedOffset>,
    /// When the operation-time budget of this method resets
    #[serde(default)]
    pub operating_reset_at: Option<i64>,
    /// Operation time already consumed within the current budget window, seconds
    #[serde(default)]
    pub operating: Option<f64>,
}

/// List pagination metadata
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    /// Size of the whole filtered set, absent when counting was disabled
    pub total: Option<u64>,
    /// Offset of the next page, absent on the last page
    pub next: Option<u64>,
}

/// Response of a single remote method call
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// Opaque method payload
    pub result: Value,
    /// Pagination metadata for list methods
    pub pagination: Pagination,
    /// Timing metadata
    pub time: Option<ResponseTime>,
}

impl ApiResponse {
    /// Create a response without metadata
    pub fn new(result: Value) -> Self {
        Self {
            result,
            pagination: Pagination::default(),
            time: None,
        }
    }

    /// Parse a decoded response body, turning `{error, error_description}` into an error
    pub fn from_body(body: Value) -> Result<Self> {
        if let Some(err) = extract_error(&body) {
            return Err(Error::from(err));
        }

        let Value::Object(mut map) = body else {
            return Err(Error::decode("response body is not an object"));
        };

        let result = map
            .remove("result")
            .ok_or_else(|| Error::decode("response body has no 'result' field"))?;

        Ok(Self {
            result,
            pagination: Pagination {
                total: map.get("total").and_then(as_u64),
                next: map.get("next").and_then(as_u64),
            },
            time: map.get("time").and_then(parse_time),
        })
    }
}

/// Result of one executed page command
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    /// Opaque payload, shaped by the method family
    pub payload: Value,
    /// Pagination metadata
    pub pagination: Pagination,
    /// Timing metadata of this command
    pub time: Option<ResponseTime>,
}

impl PageResult {
    /// Create a page result without timing
    pub fn new(payload: Value, pagination: Pagination) -> Self {
        Self {
            payload,
            pagination,
            time: None,
        }
    }
}

impl From<ApiResponse> for PageResult {
    fn from(response: ApiResponse) -> Self {
        Self {
            payload: response.result,
            pagination: response.pagination,
            time: response.time,
        }
    }
}

/// Response of a grouped call, keyed by command key
#[derive(Debug, Clone, Default)]
pub struct BatchResponse {
    results: HashMap<String, Value>,
    errors: HashMap<String, CommandError>,
    totals: HashMap<String, u64>,
    nexts: HashMap<String, u64>,
    times: HashMap<String, ResponseTime>,
    /// Timing metadata of the grouped call itself
    pub time: Option<ResponseTime>,
}

impl BatchResponse {
    /// Create an empty batch response
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the `result` field of a grouped call response
    pub fn from_result(result: &Value, time: Option<ResponseTime>) -> Result<Self> {
        if !result.is_object() {
            return Err(Error::decode("batch result is not an object"));
        }

        let mut response = Self {
            time,
            ..Self::default()
        };

        for (key, value) in keyed_entries(result.get("result")) {
            response.results.insert(key, value);
        }

        for (key, value) in keyed_entries(result.get("result_error")) {
            let err = extract_error(&value).unwrap_or_else(|| {
                CommandError::api("UNKNOWN_ERROR", value.to_string())
            });
            response.errors.insert(key, err);
        }

        for (key, value) in keyed_entries(result.get("result_total")) {
            if let Some(total) = as_u64(&value) {
                response.totals.insert(key, total);
            }
        }

        for (key, value) in keyed_entries(result.get("result_next")) {
            if let Some(next) = as_u64(&value) {
                response.nexts.insert(key, next);
            }
        }

        for (key, value) in keyed_entries(result.get("result_time")) {
            match parse_time(&value) {
                Some(time) => {
                    response.times.insert(key, time);
                }
                None => debug!("Skipping unparseable result_time for command {key}"),
            }
        }

        Ok(response)
    }

    /// Record a successful command payload
    #[must_use]
    pub fn with_result(mut self, key: impl Into<String>, payload: Value, total: Option<u64>) -> Self {
        let key = key.into();
        if let Some(total) = total {
            self.totals.insert(key.clone(), total);
        }
        self.results.insert(key, payload);
        self
    }

    /// Record a failed command
    #[must_use]
    pub fn with_error(mut self, key: impl Into<String>, error: CommandError) -> Self {
        self.errors.insert(key.into(), error);
        self
    }

    /// Payload of a command
    pub fn result(&self, key: &str) -> Option<&Value> {
        self.results.get(key)
    }

    /// Error entry of a command
    pub fn error(&self, key: &str) -> Option<&CommandError> {
        self.errors.get(key)
    }

    /// Pagination metadata of a command
    pub fn pagination(&self, key: &str) -> Pagination {
        Pagination {
            total: self.totals.get(key).copied(),
            next: self.nexts.get(key).copied(),
        }
    }

    /// Timing metadata of a command
    pub fn time(&self, key: &str) -> Option<&ResponseTime> {
        self.times.get(key)
    }

    /// Number of commands with a payload
    pub fn result_count(&self) -> usize {
        self.results.len()
    }

    /// Number of commands with an error entry
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

/// Extract an `{error, error_description}` pair if present
fn extract_error(value: &Value) -> Option<CommandError> {
    let code = value.get("error")?;
    let code = match code {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let description = value
        .get("error_description")
        .and_then(Value::as_str)
        .unwrap_or_default();
    Some(CommandError::api(code, description))
}

/// Flatten a per-command map into `(key, value)` pairs.
///
/// The remote side serializes these maps as JSON arrays when the command keys
/// form a `0..n` sequence, so array positions are read back as keys.
fn keyed_entries(value: Option<&Value>) -> Vec<(String, Value)> {
    match value {
        Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v.clone()))
            .collect(),
        _ => Vec::new(),
    }
}

/// Read a non-negative integer that may be encoded as a number or a string
pub(crate) fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_time(value: &Value) -> Option<ResponseTime> {
    serde_json::from_value(value.clone()).ok()
}
