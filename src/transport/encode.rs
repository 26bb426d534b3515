//! Command encoding for grouped calls
//!
//! Sub-commands of a `batch` call travel as `method?query` strings, with
//! nested parameters flattened into bracket notation:
//! `{"filter": {">=ID": 51}}` becomes `filter[>=ID]=51`.

use crate::batch::Command;
use crate::types::{JsonValue, Params};
use url::form_urlencoded::Serializer;

/// Encode one command as `method?query`
pub fn encode_command(command: &Command) -> String {
    let query = encode_query(command.params());
    if query.is_empty() {
        command.method().to_string()
    } else {
        format!("{}?{query}", command.method())
    }
}

/// Form-encode parameters with bracket notation for nested values
pub fn encode_query(params: &Params) -> String {
    let mut pairs = Vec::new();
    for (key, value) in params {
        flatten(key.clone(), value, &mut pairs);
    }

    let mut serializer = Serializer::new(String::new());
    for (key, value) in &pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

fn flatten(prefix: String, value: &JsonValue, pairs: &mut Vec<(String, String)>) {
    match value {
        // Nulls are dropped, empty containers still name the parameter
        JsonValue::Null => {}
        JsonValue::Bool(b) => pairs.push((prefix, if *b { "1" } else { "0" }.to_string())),
        JsonValue::Number(n) => pairs.push((prefix, n.to_string())),
        JsonValue::String(s) => pairs.push((prefix, s.clone())),
        JsonValue::Array(items) if items.is_empty() => pairs.push((prefix, String::new())),
        JsonValue::Object(map) if map.is_empty() => pairs.push((prefix, String::new())),
        JsonValue::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten(format!("{prefix}[{index}]"), item, pairs);
            }
        }
        JsonValue::Object(map) => {
            for (key, item) in map {
                flatten(format!("{prefix}[{key}]"), item, pairs);
            }
        }
    }
}
