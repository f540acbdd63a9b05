//! Values bound by callers when populating a body.
//!
//! A body is populated against a set of named [`Value`]s. Scalars are used
//! directly; domain objects implement [`Attributes`] so that replacement
//! entities with a member name can read a single attribute off them.
//!
//! # Example
//!
//! ```
//! use mailforge::value::{BoundValues, Record, Value};
//!
//! let user = Record::new().with("first_name", "Ann");
//! let values = BoundValues::new()
//!     .with("user", Value::object(user))
//!     .with("age", 32);
//!
//! let first_name = values.get("user").and_then(|user| user.attribute("first_name"));
//! assert_eq!(first_name.and_then(|v| v.as_text()).as_deref(), Some("Ann"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};

/// Attribute lookup on a caller-supplied domain object.
///
/// Lookups never fail loudly: a missing attribute is `None`.
pub trait Attributes: fmt::Debug + Send + Sync {
    /// Read the attribute called `name`.
    fn attribute(&self, name: &str) -> Option<Value>;

    /// Text used when the object itself is substituted into a body.
    ///
    /// Objects without a textual form return `None` and are reported as
    /// unpopulated.
    fn display(&self) -> Option<String> {
        None
    }
}

/// A value bound to an argument name.
#[derive(Debug, Clone)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(DateTime<FixedOffset>),
    Object(Arc<dyn Attributes>),
}

impl Value {
    /// Wrap a domain object.
    pub fn object<A: Attributes + 'static>(object: A) -> Self {
        Value::Object(Arc::new(object))
    }

    /// Stringified form used for substitution.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s.clone()),
            Value::Integer(n) => Some(n.to_string()),
            Value::Float(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Date(d) => Some(d.to_string()),
            Value::Time(t) => Some(t.to_string()),
            Value::DateTime(dt) => Some(dt.to_string()),
            Value::Object(object) => object.display(),
        }
    }

    /// Read an attribute; only objects have attributes.
    pub fn attribute(&self, name: &str) -> Option<Value> {
        match self {
            Value::Object(object) => object.attribute(name),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::Object(_) => "object",
        }
    }

    /// Convert a JSON value. `null` has no value.
    pub fn from_json(value: serde_json::Value) -> Option<Value> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(b) => Some(Value::Bool(b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Value::Integer(i)),
                None => n.as_f64().map(Value::Float),
            },
            serde_json::Value::String(s) => Some(Value::Text(s)),
            serde_json::Value::Array(_) => Some(Value::Text(value.to_string())),
            serde_json::Value::Object(map) => Some(Value::object(JsonObject(map))),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<NaiveTime> for Value {
    fn from(value: NaiveTime) -> Self {
        Value::Time(value)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Value::DateTime(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value.fixed_offset())
    }
}

/// A JSON object exposed as a domain object; its keys are its attributes.
#[derive(Debug, Clone)]
pub struct JsonObject(pub serde_json::Map<String, serde_json::Value>);

impl Attributes for JsonObject {
    fn attribute(&self, name: &str) -> Option<Value> {
        self.0.get(name).cloned().and_then(Value::from_json)
    }
}

/// A plain attribute bag, handy for callers without their own domain type.
#[derive(Debug, Clone, Default)]
pub struct Record {
    fields: HashMap<String, Value>,
    label: Option<String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Text used when the record itself is substituted.
    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl Attributes for Record {
    fn attribute(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }

    fn display(&self) -> Option<String> {
        self.label.clone()
    }
}

/// Named values supplied to a population or build call.
#[derive(Debug, Clone, Default)]
pub struct BoundValues {
    values: HashMap<String, Value>,
}

impl BoundValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bind every key of a JSON object; `null` members are skipped.
    ///
    /// Returns `None` when `value` is not an object.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Object(map) => {
                let values = map
                    .into_iter()
                    .filter_map(|(k, v)| Value::from_json(v).map(|v| (k, v)))
                    .collect();
                Some(Self { values })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_text() {
        assert_eq!(Value::from(32).as_text().as_deref(), Some("32"));
        assert_eq!(Value::from("Ann").as_text().as_deref(), Some("Ann"));
        assert_eq!(Value::from(true).as_text().as_deref(), Some("true"));
        assert_eq!(Value::from(2.5).as_text().as_deref(), Some("2.5"));
    }

    #[test]
    fn test_record_attributes() {
        let user = Value::object(Record::new().with("first_name", "Ann"));

        assert_eq!(
            user.attribute("first_name").and_then(|v| v.as_text()).as_deref(),
            Some("Ann")
        );
        assert!(user.attribute("last_name").is_none());
        assert!(user.as_text().is_none());
    }

    #[test]
    fn test_scalars_have_no_attributes() {
        assert!(Value::from("Ann").attribute("len").is_none());
    }

    #[test]
    fn test_bound_values_from_json() {
        let values = BoundValues::from_json(json!({
            "user": {"first_name": "Ann", "middle_name": null},
            "age": 32,
            "missing": null
        }))
        .unwrap();

        assert_eq!(values.len(), 2);
        assert!(!values.contains("missing"));

        let user = values.get("user").unwrap();
        assert_eq!(
            user.attribute("first_name").and_then(|v| v.as_text()).as_deref(),
            Some("Ann")
        );
        assert!(user.attribute("middle_name").is_none());
        assert!(BoundValues::from_json(json!([1, 2])).is_none());
    }
}
