//! Response payload model.
//!
//! A payload is a JSON object mapping category names to arrays of flat
//! records. Key order of both the payload and every record is kept as it
//! appeared in the response body.

use serde_json::{Map, Value};
use thiserror::Error;

pub type Record = Map<String, Value>;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("response is not valid JSON: {source}")]
    Json {
        #[source]
        source: serde_json::Error,
    },

    #[error("response is a JSON {found}, expected an object of categories")]
    NotAnObject { found: &'static str },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultPayload {
    categories: Map<String, Value>,
}

/// One category as seen by the renderer.
#[derive(Clone, Copy, Debug)]
pub enum Category<'a> {
    Records(&'a [Value]),
    /// The category value was not an array.
    Malformed(&'a Value),
}

impl ResultPayload {
    pub fn parse(body: &str) -> Result<Self, PayloadError> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| PayloadError::Json { source: e })?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, PayloadError> {
        match value {
            Value::Object(categories) => Ok(Self { categories }),
            other => Err(PayloadError::NotAnObject {
                found: json_kind(&other),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, Category<'_>)> {
        self.categories.iter().map(|(name, value)| {
            let category = match value {
                Value::Array(items) => Category::Records(items.as_slice()),
                other => Category::Malformed(other),
            };
            (name.as_str(), category)
        })
    }

    pub fn record_count(&self) -> usize {
        self.categories
            .values()
            .filter_map(Value::as_array)
            .map(Vec::len)
            .sum()
    }
}

pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Keys of a record in their original order. Non-object records have none.
pub fn record_keys(record: &Value) -> Vec<String> {
    match record {
        Value::Object(map) => map.keys().cloned().collect(),
        _ => Vec::new(),
    }
}

/// Display text for the value stored under `key`, empty when absent.
pub fn cell_text(record: &Value, key: &str) -> String {
    record
        .as_object()
        .and_then(|map| map.get(key))
        .map(display_value)
        .unwrap_or_default()
}

/// String coercion of a JSON value the way a browser shows it as text.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => display_number(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => display_value(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

// integers beyond this lose precision as f64
const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

fn display_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        if i.unsigned_abs() <= MAX_SAFE_INTEGER {
            return i.to_string();
        }
    }
    if let Some(u) = n.as_u64() {
        if u <= MAX_SAFE_INTEGER {
            return u.to_string();
        }
    }
    match n.as_f64() {
        Some(f) => display_f64(f),
        None => n.to_string(),
    }
}

/// Shortest round-trip form, switching to `1e+21` style exponents outside
/// `[1e-6, 1e21)`.
fn display_f64(f: f64) -> String {
    if f == 0.0 {
        return "0".to_string();
    }
    let abs = f.abs();
    if (1e-6..1e21).contains(&abs) {
        return f.to_string();
    }
    let sci = format!("{f:e}");
    match sci.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
        _ => sci,
    }
}
