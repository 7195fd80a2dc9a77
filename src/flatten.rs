//! Nested records back to flat dotted paths.

use std::borrow::Cow;

use serde_json::{Number, Value};

use crate::path::PathCursor;
use crate::Result;

/// Dotted paths and the leaf values found at them, in walk order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Flattened {
    pub paths: Vec<String>,
    pub values: Vec<Value>,
}

impl Flattened {
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.paths.iter().map(String::as_str).zip(self.values.iter())
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Value>) {
        (self.paths, self.values)
    }

    /// Paths joined with commas, usable as a CSV header line.
    pub fn headers_line(&self) -> String {
        self.paths.join(",")
    }

    /// Leaf values as text joined with commas.
    pub fn values_line(&self) -> String {
        let mut line = String::new();
        for (idx, value) in self.values.iter().enumerate() {
            if idx > 0 {
                line.push(',');
            }
            line.push_str(&leaf_text(value));
        }
        line
    }
}

/// Walk `value` and collect every leaf with its dotted path.
///
/// Sequence children are addressed by position and mapping children by key.
/// Empty collections contribute nothing; `null` is a leaf like any other.
///
/// # Examples
/// ```
/// use csv2json::flatten;
/// use serde_json::json;
///
/// let flat = flatten(&json!({"a": "true", "b": [1, {"f": 2}, 234]}));
/// assert_eq!(flat.paths, vec!["a", "b.0", "b.1.f", "b.2"]);
/// assert_eq!(flat.values, vec![json!("true"), json!(1), json!(2), json!(234)]);
/// ```
pub fn flatten(value: &Value) -> Flattened {
    let mut out = Flattened::default();
    let mut cursor = PathCursor::new();
    walk(value, &mut cursor, &mut out);
    out
}

/// Parse JSON text and flatten it.
pub fn json_to_flat(input: &str) -> Result<Flattened> {
    let value: Value = serde_json::from_str(input)?;
    Ok(flatten(&value))
}

fn walk(value: &Value, cursor: &mut PathCursor, out: &mut Flattened) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                cursor.push(key);
                walk(child, cursor, out);
                cursor.pop();
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                cursor.push_index(index);
                walk(child, cursor, out);
                cursor.pop();
            }
        }
        leaf => {
            out.paths.push(cursor.as_str().to_string());
            out.values.push(leaf.clone());
        }
    }
}

/// Text form of a leaf for flat output: strings as-is, numbers in their
/// shortest form, `null` as an empty field.
pub fn leaf_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Null => Cow::Borrowed(""),
        Value::Bool(true) => Cow::Borrowed("true"),
        Value::Bool(false) => Cow::Borrowed("false"),
        Value::String(text) => Cow::Borrowed(text.as_str()),
        Value::Number(number) => Cow::Owned(number_text(number)),
        other => Cow::Owned(other.to_string()),
    }
}

fn number_text(number: &Number) -> String {
    if let Some(value) = number.as_u64() {
        let mut buffer = itoa::Buffer::new();
        return buffer.format(value).to_string();
    }
    if let Some(value) = number.as_i64() {
        let mut buffer = itoa::Buffer::new();
        return buffer.format(value).to_string();
    }
    match number.as_f64() {
        Some(value) if value.is_finite() => {
            if value.fract() == 0.0 && value.abs() < 1e15 {
                let mut buffer = itoa::Buffer::new();
                return buffer.format(value as i64).to_string();
            }
            let mut buffer = ryu::Buffer::new();
            buffer.format_finite(value).to_string()
        }
        _ => number.to_string(),
    }
}
