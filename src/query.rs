//! Order, filter and select builders for list methods
//!
//! Conditions are encoded the way list methods expect them: the comparison
//! operator is a prefix of the field name (`">=ID"`, `"!STAGE_ID"`, `"><OPPORTUNITY"`).

use crate::error::{Error, Result};
use crate::types::{JsonValue, Params};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Order
// ============================================================================

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// Wire representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Opposite direction
    #[must_use]
    pub fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ASC" => Ok(Self::Asc),
            "DESC" => Ok(Self::Desc),
            other => Err(Error::invalid_argument(format!(
                "unknown sort direction '{other}'"
            ))),
        }
    }
}

/// Ordered list of sort fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Order {
    fields: Vec<(String, Direction)>,
}

impl Order {
    /// Create an empty order
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort by a field, replacing any earlier direction for it
    #[must_use]
    pub fn by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.set(field, direction);
        self
    }

    /// Sort ascending by a field
    #[must_use]
    pub fn asc(self, field: impl Into<String>) -> Self {
        self.by(field, Direction::Asc)
    }

    /// Sort descending by a field
    #[must_use]
    pub fn desc(self, field: impl Into<String>) -> Self {
        self.by(field, Direction::Desc)
    }

    /// Set the direction of a field in place
    pub fn set(&mut self, field: impl Into<String>, direction: Direction) {
        let field = field.into();
        match self.fields.iter_mut().find(|(f, _)| *f == field) {
            Some(entry) => entry.1 = direction,
            None => self.fields.push((field, direction)),
        }
    }

    /// Direction of a field, if sorted by it
    pub fn direction_of(&self, field: &str) -> Option<Direction> {
        self.fields
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, d)| *d)
    }

    /// First sort field
    pub fn primary(&self) -> Option<(&str, Direction)> {
        self.fields.first().map(|(f, d)| (f.as_str(), *d))
    }

    /// Same fields with every direction flipped
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            fields: self
                .fields
                .iter()
                .map(|(f, d)| (f.clone(), d.reversed()))
                .collect(),
        }
    }

    /// Check if no sort field is set
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parse `{"FIELD": "ASC", ...}`
    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::invalid_argument("order must be a JSON object"));
        };
        let mut order = Self::new();
        for (field, direction) in map {
            let direction = direction.as_str().ok_or_else(|| {
                Error::invalid_argument(format!("order direction for '{field}' must be a string"))
            })?;
            order.set(field.clone(), direction.parse()?);
        }
        Ok(order)
    }

    /// Encode as a parameter value
    pub fn to_value(&self) -> JsonValue {
        let map: Params = self
            .fields
            .iter()
            .map(|(f, d)| (f.clone(), Value::String(d.as_str().to_string())))
            .collect();
        Value::Object(map)
    }
}

// ============================================================================
// Filter
// ============================================================================

/// Ordered set of filter conditions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Params,
}

impl Filter {
    /// Create an empty filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a raw condition (operator already prefixed), replacing an earlier one
    #[must_use]
    pub fn raw(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a raw condition in place
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.conditions.insert(key.into(), value.into());
    }

    /// `field = value`
    #[must_use]
    pub fn equals(self, field: &str, value: impl Into<JsonValue>) -> Self {
        self.raw(format!("={field}"), value)
    }

    /// `field != value`
    #[must_use]
    pub fn not_equals(self, field: &str, value: impl Into<JsonValue>) -> Self {
        self.raw(format!("!{field}"), value)
    }

    /// `field > value`
    #[must_use]
    pub fn gt(self, field: &str, value: impl Into<JsonValue>) -> Self {
        self.raw(format!(">{field}"), value)
    }

    /// `field >= value`
    #[must_use]
    pub fn gte(self, field: &str, value: impl Into<JsonValue>) -> Self {
        self.raw(format!(">={field}"), value)
    }

    /// `field < value`
    #[must_use]
    pub fn lt(self, field: &str, value: impl Into<JsonValue>) -> Self {
        self.raw(format!("<{field}"), value)
    }

    /// `field <= value`
    #[must_use]
    pub fn lte(self, field: &str, value: impl Into<JsonValue>) -> Self {
        self.raw(format!("<={field}"), value)
    }

    /// `from <= field <= to`; a range with `from > to` is rejected
    pub fn between<T>(self, field: &str, from: T, to: T) -> Result<Self>
    where
        T: PartialOrd + fmt::Debug + Into<JsonValue>,
    {
        if from > to {
            return Err(Error::invalid_argument(format!(
                "malformed range for '{field}': {from:?} is greater than {to:?}"
            )));
        }
        Ok(self.raw(format!("><{field}"), Value::Array(vec![from.into(), to.into()])))
    }

    /// Check if there are no conditions
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Raw condition lookup
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.conditions.get(key)
    }

    /// Parse a JSON object of raw conditions
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self {
                conditions: map.clone(),
            }),
            Value::Null => Ok(Self::new()),
            _ => Err(Error::invalid_argument("filter must be a JSON object")),
        }
    }

    /// Encode as a parameter value
    pub fn to_value(&self) -> JsonValue {
        Value::Object(self.conditions.clone())
    }
}

// ============================================================================
// Select
// ============================================================================

/// Fields to return; empty means the method's default field set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Select {
    fields: Vec<String>,
}

impl Select {
    /// Create an empty select
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the given fields
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut select = Self::new();
        for field in fields {
            select.ensure(field);
        }
        select
    }

    /// Select every field
    pub fn all() -> Self {
        Self::fields(["*"])
    }

    /// Add a field unless already selected
    pub fn ensure(&mut self, field: impl Into<String>) {
        let field = field.into();
        if !self.fields.contains(&field) {
            self.fields.push(field);
        }
    }

    /// Check if a field is selected explicitly or through `*`
    pub fn covers(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field || f == "*")
    }

    /// Check if no field is selected
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Encode as a parameter value
    pub fn to_value(&self) -> JsonValue {
        Value::Array(
            self.fields
                .iter()
                .map(|f| Value::String(f.clone()))
                .collect(),
        )
    }
}
