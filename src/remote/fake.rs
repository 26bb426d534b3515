//! In-memory CRM list endpoint used by unit tests

use super::{ApiResponse, BatchResponse, Pagination, RemoteCaller};
use crate::batch::Command;
use crate::error::{CommandError, Error, Result};
use crate::types::{Params, DEFAULT_KEY_FIELD, ITEMS_KEY_FIELD, PAGE_SIZE};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Static record set answering list commands the way the remote side does
pub(crate) struct FakeCrm {
    records: Vec<Value>,
    key_field: &'static str,
    items_shape: bool,
    log: Mutex<CallLog>,
    command_failures: Mutex<HashMap<usize, CommandError>>,
    batch_failures: Mutex<HashSet<usize>>,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct CallLog {
    /// Every command executed, in execution order
    pub commands: Vec<Command>,
    /// Size of every grouped call, in order
    pub batch_sizes: Vec<usize>,
    /// Parallel hint of every grouped call
    pub parallel_flags: Vec<bool>,
    /// Methods called outside of grouped calls
    pub single_calls: Vec<String>,
}

impl CallLog {
    pub fn batch_count(&self) -> usize {
        self.batch_sizes.len()
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }
}

impl FakeCrm {
    /// Classic endpoint: `[{"ID": "1", ...}]`, string IDs
    pub fn with_ids(ids: impl IntoIterator<Item = u64>) -> Self {
        let mut records: Vec<Value> = ids
            .into_iter()
            .map(|id| json!({"ID": id.to_string(), "TITLE": format!("Deal {id}"), "STAGE_ID": stage(id)}))
            .collect();
        records.sort_by_key(|r| key_of(r, DEFAULT_KEY_FIELD));
        Self::from_records(records, DEFAULT_KEY_FIELD, false)
    }

    /// Item-style endpoint: `{"items": [{"id": 1, ...}]}`, numeric IDs
    pub fn items_with_ids(ids: impl IntoIterator<Item = u64>) -> Self {
        let mut records: Vec<Value> = ids
            .into_iter()
            .map(|id| json!({"id": id, "title": format!("Item {id}"), "stageId": stage(id)}))
            .collect();
        records.sort_by_key(|r| key_of(r, ITEMS_KEY_FIELD));
        Self::from_records(records, ITEMS_KEY_FIELD, true)
    }

    fn from_records(records: Vec<Value>, key_field: &'static str, items_shape: bool) -> Self {
        Self {
            records,
            key_field,
            items_shape,
            log: Mutex::new(CallLog::default()),
            command_failures: Mutex::new(HashMap::new()),
            batch_failures: Mutex::new(HashSet::new()),
        }
    }

    /// Fail the n-th executed command (0-based, across all grouped calls)
    pub fn fail_command(&self, index: usize, error: CommandError) {
        self.command_failures.lock().unwrap().insert(index, error);
    }

    /// Fail the n-th grouped call (0-based) as a whole
    pub fn fail_batch(&self, index: usize) {
        self.batch_failures.lock().unwrap().insert(index);
    }

    pub fn log(&self) -> CallLog {
        self.log.lock().unwrap().clone()
    }

    /// Answer one list command
    fn list(&self, params: &Params) -> (Value, Pagination) {
        let key = self.key_field;
        let descending = params
            .get("order")
            .and_then(|o| o.get(key))
            .and_then(Value::as_str)
            .is_some_and(|d| d.eq_ignore_ascii_case("desc"));

        let mut matching: Vec<&Value> = self
            .records
            .iter()
            .filter(|record| matches_filter(record, params.get("filter"), key))
            .collect();
        if descending {
            matching.reverse();
        }

        let start = params.get("start").and_then(Value::as_i64).unwrap_or(0);
        let (offset, total) = if start < 0 {
            (0, None)
        } else {
            (start as usize, Some(matching.len() as u64))
        };

        let page: Vec<Value> = matching
            .iter()
            .skip(offset)
            .take(PAGE_SIZE)
            .map(|record| project(record, params.get("select")))
            .collect();

        let next = total.and_then(|t| {
            let next = (offset + PAGE_SIZE) as u64;
            (next < t).then_some(next)
        });

        let payload = if self.items_shape {
            json!({ "items": page })
        } else {
            Value::Array(page)
        };
        (payload, Pagination { total, next })
    }
}

#[async_trait]
impl RemoteCaller for FakeCrm {
    async fn call(&self, method: &str, params: &Params) -> Result<ApiResponse> {
        self.log.lock().unwrap().single_calls.push(method.to_string());
        let (payload, pagination) = self.list(params);
        Ok(ApiResponse {
            result: payload,
            pagination,
            time: None,
        })
    }

    async fn call_batch(&self, commands: &[Command], parallel: bool) -> Result<BatchResponse> {
        let batch_index = {
            let mut log = self.log.lock().unwrap();
            log.batch_sizes.push(commands.len());
            log.parallel_flags.push(parallel);
            log.batch_sizes.len() - 1
        };

        if self.batch_failures.lock().unwrap().contains(&batch_index) {
            return Err(Error::http_status(502, "Bad Gateway"));
        }

        let mut response = BatchResponse::new();
        for command in commands {
            let command_index = {
                let mut log = self.log.lock().unwrap();
                log.commands.push(command.clone());
                log.commands.len() - 1
            };

            let wire_key = command.key().wire_key();
            if let Some(err) = self.command_failures.lock().unwrap().get(&command_index) {
                response = response.with_error(wire_key, err.clone());
                continue;
            }

            let (payload, pagination) = self.list(command.params());
            response = response.with_result(wire_key, payload, pagination.total);
        }
        Ok(response)
    }
}

/// Key value of a fixture record
pub(crate) fn key_of(record: &Value, key_field: &str) -> u64 {
    record
        .get(key_field)
        .and_then(super::as_u64)
        .unwrap_or_default()
}

fn stage(id: u64) -> &'static str {
    if id % 3 == 0 {
        "WON"
    } else {
        "NEW"
    }
}

fn matches_filter(record: &Value, filter: Option<&Value>, key_field: &str) -> bool {
    let Some(Value::Object(conditions)) = filter else {
        return true;
    };

    conditions.iter().all(|(raw, expected)| {
        let (op, field) = split_operator(raw);
        if field == key_field {
            let actual = key_of(record, key_field);
            let Some(bound) = super::as_u64(expected) else {
                return false;
            };
            match op {
                ">=" => actual >= bound,
                "<=" => actual <= bound,
                ">" => actual > bound,
                "<" => actual < bound,
                _ => actual == bound,
            }
        } else {
            record.get(field) == Some(expected)
        }
    })
}

fn split_operator(raw: &str) -> (&str, &str) {
    for op in [">=", "<=", ">", "<", "="] {
        if let Some(field) = raw.strip_prefix(op) {
            return (op, field);
        }
    }
    ("=", raw)
}

fn project(record: &Value, select: Option<&Value>) -> Value {
    let fields: Vec<&str> = select
        .and_then(Value::as_array)
        .map(|fields| fields.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    if fields.is_empty() || fields.contains(&"*") {
        return record.clone();
    }

    let mut projected = serde_json::Map::new();
    for field in fields {
        if let Some(value) = record.get(field) {
            projected.insert(field.to_string(), value.clone());
        }
    }
    Value::Object(projected)
}
