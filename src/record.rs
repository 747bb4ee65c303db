use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::domain::SourceError;

pub const ID_FIELD: &str = "id";

static MISSING: Value = Value::Missing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    Text(String),
    Number(f64),
    #[default]
    Missing,
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn from_json(value: &JsonValue) -> Value {
        match value {
            JsonValue::Null => Value::Missing,
            JsonValue::Bool(b) => Value::Text(b.to_string()),
            JsonValue::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Missing),
            JsonValue::String(s) => Value::Text(s.clone()),
            // Nested structures are kept as their json text so search still sees them
            other => Value::Text(other.to_string()),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Text(s) => JsonValue::String(s.clone()),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => JsonValue::from(*n as i64),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Missing => JsonValue::Null,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            // Whole numbers render without a trailing ".0", ages and ids are integers
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{n}"),
            Value::Missing => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n as f64)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Missing)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RecordId,
    fields: HashMap<String, Value>,
}

impl Record {
    pub fn new(id: RecordId) -> Self {
        let mut fields = HashMap::new();
        fields.insert(ID_FIELD.to_string(), Value::from(id.0));
        Record { id, fields }
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn get(&self, name: &str) -> &Value {
        self.fields.get(name).unwrap_or(&MISSING)
    }

    /// Sets a field. The identifier is immutable, writes to `id` are ignored.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        if name == ID_FIELD {
            return;
        }
        self.fields.insert(name.to_string(), value.into());
    }

    pub fn merge(&mut self, other: &Record) {
        for (name, value) in other.fields.iter() {
            self.set(name, value.clone());
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    pub fn from_json(value: &JsonValue) -> Result<Record, SourceError> {
        let object = value.as_object().ok_or_else(|| {
            SourceError::MalformedPayload(format!("expected a record object, got {value}"))
        })?;
        let id = parse_id(object.get(ID_FIELD))?;
        let mut record = Record::new(id);
        for (name, field) in object.iter() {
            record.set(name, Value::from_json(field));
        }
        Ok(record)
    }

    pub fn to_json(&self) -> JsonValue {
        let mut object = Map::new();
        for (name, value) in self.fields.iter() {
            object.insert(name.clone(), value.to_json());
        }
        JsonValue::Object(object)
    }
}

fn parse_id(value: Option<&JsonValue>) -> Result<RecordId, SourceError> {
    match value {
        Some(JsonValue::Number(n)) => n.as_u64().map(RecordId).ok_or_else(|| {
            SourceError::MalformedPayload(format!("record id {n} is not a non-negative integer"))
        }),
        Some(JsonValue::String(s)) => s.trim().parse::<u64>().map(RecordId).map_err(|_| {
            SourceError::MalformedPayload(format!("record id \"{s}\" is not numeric"))
        }),
        Some(other) => Err(SourceError::MalformedPayload(format!(
            "unsupported record id {other}"
        ))),
        None => Err(SourceError::MalformedPayload("record without id".to_string())),
    }
}

/// Parses a collection payload. Anything other than an array of objects with
/// unique ids is rejected as a whole.
pub fn records_from_json(payload: &JsonValue) -> Result<Vec<Record>, SourceError> {
    let items = payload.as_array().ok_or_else(|| {
        SourceError::MalformedPayload("expected an array of records".to_string())
    })?;

    let mut seen = HashSet::with_capacity(items.len());
    let mut records = Vec::with_capacity(items.len());
    for item in items {
        let record = Record::from_json(item)?;
        if !seen.insert(record.id()) {
            return Err(SourceError::MalformedPayload(format!(
                "duplicate record id {}",
                record.id()
            )));
        }
        records.push(record);
    }
    Ok(records)
}
