//! Pagination types
//!
//! Request description, response-shape adapters and traversal statistics.

use crate::error::{Error, Result};
use crate::query::{Direction, Filter, Order, Select};
use crate::remote::as_u64;
use crate::types::{JsonValue, Params, DEFAULT_KEY_FIELD, ITEMS_KEY_FIELD};
use serde_json::Value;

// ============================================================================
// Response Shapes
// ============================================================================

/// Layout of a list method's payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseShape {
    /// Payload is the record array itself
    #[default]
    Flat,
    /// Payload is an object with the records under `items`
    Items,
}

impl ResponseShape {
    /// Key field used by this family of methods
    pub fn default_key_field(self) -> &'static str {
        match self {
            Self::Flat => DEFAULT_KEY_FIELD,
            Self::Items => ITEMS_KEY_FIELD,
        }
    }

    /// Extract the records of one page
    pub fn records(self, payload: Value) -> Result<Vec<Value>> {
        match (self, payload) {
            (_, Value::Null) => Ok(Vec::new()),
            (Self::Flat, Value::Array(records)) => Ok(records),
            (Self::Items, Value::Object(mut map)) => match map.remove("items") {
                Some(Value::Array(records)) => Ok(records),
                Some(Value::Null) | None => Ok(Vec::new()),
                Some(_) => Err(Error::decode("'items' is not an array")),
            },
            (shape, other) => Err(Error::decode(format!(
                "unexpected {shape:?} list payload: {}",
                type_name(&other)
            ))),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Variant Hints
// ============================================================================

/// Per-method-family behaviour of a list endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantHints {
    /// Payload layout
    pub shape: ResponseShape,
    /// Key field override
    pub key_field: Option<String>,
    /// Whether the endpoint can be probed in reversed order
    pub reverse_probe: bool,
}

impl VariantHints {
    /// Classic list endpoint (`crm.deal.list` and friends)
    pub fn flat() -> Self {
        Self {
            shape: ResponseShape::Flat,
            key_field: None,
            reverse_probe: true,
        }
    }

    /// Item-style endpoint (`crm.item.list`)
    pub fn items() -> Self {
        Self {
            shape: ResponseShape::Items,
            key_field: None,
            reverse_probe: true,
        }
    }

    /// Hints for a known method name
    pub fn for_method(method: &str) -> Self {
        if method.starts_with("crm.item.") {
            Self::items()
        } else {
            Self::flat()
        }
    }

    /// Override the key field
    #[must_use]
    pub fn with_key_field(mut self, field: impl Into<String>) -> Self {
        self.key_field = Some(field.into());
        self
    }

    /// Mark the endpoint as not supporting reversed order
    #[must_use]
    pub fn without_reverse_probe(mut self) -> Self {
        self.reverse_probe = false;
        self
    }

    /// Effective key field
    pub fn key_field(&self) -> &str {
        self.key_field
            .as_deref()
            .unwrap_or_else(|| self.shape.default_key_field())
    }
}

impl Default for VariantHints {
    fn default() -> Self {
        Self::flat()
    }
}

// ============================================================================
// List Request
// ============================================================================

/// A list method call to traverse
#[derive(Debug, Clone, PartialEq)]
pub struct ListRequest {
    /// Remote list method
    pub method: String,
    /// Sort order
    pub order: Order,
    /// Filter conditions
    pub filter: Filter,
    /// Returned fields
    pub select: Select,
    /// Maximum number of records to yield
    pub limit: Option<usize>,
    /// Method family behaviour
    pub hints: VariantHints,
    /// Extra method parameters (e.g. `entityTypeId`)
    pub params: Params,
}

impl ListRequest {
    /// Create a request with hints derived from the method name
    pub fn new(method: impl Into<String>) -> Self {
        let method = method.into();
        let hints = VariantHints::for_method(&method);
        Self {
            method,
            order: Order::new(),
            filter: Filter::new(),
            select: Select::new(),
            limit: None,
            hints,
            params: Params::new(),
        }
    }

    /// Set the sort order
    #[must_use]
    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    /// Set the filter
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Set the returned fields
    #[must_use]
    pub fn select(mut self, select: Select) -> Self {
        self.select = select;
        self
    }

    /// Limit the number of yielded records
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the method family hints
    #[must_use]
    pub fn hints(mut self, hints: VariantHints) -> Self {
        self.hints = hints;
        self
    }

    /// Add an extra method parameter
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Traversal Session
// ============================================================================

/// Validated, normalized state of one traversal
#[derive(Debug, Clone)]
pub(crate) struct TraversalSession {
    pub method: String,
    pub order: Order,
    pub filter: Filter,
    pub select: Select,
    pub limit: Option<usize>,
    pub key_field: String,
    pub key_direction: Direction,
    pub shape: ResponseShape,
    pub reverse_probe: bool,
    pub extra: Params,
    pub emitted: usize,
}

impl TraversalSession {
    /// Validate a request; no network traffic happens here
    pub fn from_request(request: ListRequest) -> Result<Self> {
        let ListRequest {
            method,
            mut order,
            filter,
            mut select,
            limit,
            hints,
            params,
        } = request;

        if method.trim().is_empty() {
            return Err(Error::invalid_argument("list method name is empty"));
        }
        if limit == Some(0) {
            return Err(Error::invalid_argument("limit must be at least 1"));
        }

        let key_field = hints.key_field().to_string();
        if order.is_empty() {
            order.set(key_field.clone(), Direction::Asc);
        }
        if let Some((field, _)) = order.primary() {
            if field != key_field {
                return Err(Error::invalid_argument(format!(
                    "traversal must be ordered by '{key_field}' first, got '{field}'"
                )));
            }
        }
        let key_direction = order.direction_of(&key_field).unwrap_or_default();

        if !select.is_empty() && !select.covers(&key_field) {
            select.ensure(key_field.clone());
        }

        Ok(Self {
            method,
            order,
            filter,
            select,
            limit,
            key_field,
            key_direction,
            shape: hints.shape,
            reverse_probe: hints.reverse_probe,
            extra: params,
            emitted: 0,
        })
    }

    /// Parameters of one list command
    pub fn params(&self, order: &Order, filter: &Filter, select: &Select, start: i64) -> Params {
        let mut params = self.extra.clone();
        params.insert("order".to_string(), order.to_value());
        params.insert("filter".to_string(), filter.to_value());
        if !select.is_empty() {
            params.insert("select".to_string(), select.to_value());
        }
        params.insert("start".to_string(), Value::from(start));
        params
    }

    /// Records still allowed by the limit
    pub fn remaining(&self) -> Option<usize> {
        self.limit.map(|limit| limit.saturating_sub(self.emitted))
    }

    /// Check if the limit has been reached
    pub fn limit_reached(&self) -> bool {
        self.remaining() == Some(0)
    }

    /// Key value of a record
    pub fn key_of(&self, record: &Value) -> Result<u64> {
        record
            .get(&self.key_field)
            .and_then(as_u64)
            .ok_or_else(|| {
                Error::decode(format!(
                    "record has no numeric '{}' key field",
                    self.key_field
                ))
            })
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Strategy picked after the first page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Whole set fit in the first page
    SinglePage,
    /// Key-range windows fetched through grouped calls
    Windowed,
    /// Page after page past the last seen key
    Sequential,
}

/// Counters of one traversal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraversalStats {
    /// Strategy picked after the first page
    pub strategy: Option<Strategy>,
    /// Commands registered so far
    pub commands: usize,
    /// Grouped calls issued so far
    pub grouped_calls: usize,
    /// Windows planned after the boundary probes
    pub windows_planned: usize,
    /// Records yielded so far
    pub emitted: usize,
}
