//! Per-path options and the option-aware render hooks.
//!
//! Options are keyed by the exact dotted path of a leaf or collection; there
//! is no prefix or wildcard matching.

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Number, Value};

use crate::error::BoxError;
use crate::render::{Hooks, Rendered};
use crate::shape::Shape;
use crate::{Error, Result};

type RenderFn = dyn Fn(Value) -> std::result::Result<Value, BoxError> + Send + Sync;
type PredicateFn = dyn Fn(&Value) -> bool + Send + Sync;

/// Builtin leaf transforms that can be named in an options file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    Trim,
    Lowercase,
    Uppercase,
    Integer,
    Float,
    NullIfEmpty,
}

impl Transform {
    /// String transforms leave non-string values untouched; numeric parses
    /// fail on strings that are not numbers.
    pub fn apply(self, value: Value) -> std::result::Result<Value, BoxError> {
        let Value::String(text) = value else {
            return Ok(value);
        };
        let out = match self {
            Transform::Trim => Value::String(text.trim().to_string()),
            Transform::Lowercase => Value::String(text.to_lowercase()),
            Transform::Uppercase => Value::String(text.to_uppercase()),
            Transform::Integer => {
                let parsed: i64 = text
                    .trim()
                    .parse()
                    .map_err(|err| format!("`{text}` is not an integer: {err}"))?;
                Value::Number(parsed.into())
            }
            Transform::Float => {
                let parsed: f64 = text
                    .trim()
                    .parse()
                    .map_err(|err| format!("`{text}` is not a number: {err}"))?;
                Number::from_f64(parsed)
                    .map(Value::Number)
                    .ok_or_else(|| format!("`{text}` is not a finite number"))?
            }
            Transform::NullIfEmpty => {
                if text.is_empty() {
                    Value::Null
                } else {
                    Value::String(text)
                }
            }
        };
        Ok(out)
    }
}

#[derive(Clone)]
pub enum Render {
    Builtin(Transform),
    Custom(Arc<RenderFn>),
}

impl Render {
    pub fn apply(&self, value: Value) -> std::result::Result<Value, BoxError> {
        match self {
            Render::Builtin(transform) => transform.apply(value),
            Render::Custom(f) => f(value),
        }
    }
}

impl fmt::Debug for Render {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Render::Builtin(transform) => f.debug_tuple("Builtin").field(transform).finish(),
            Render::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Decides whether an optional value is kept.
#[derive(Clone)]
pub enum Predicate {
    /// Keep values with a non-zero length: non-empty strings, sequences and
    /// mappings. Null is dropped; numbers and booleans are kept.
    NonEmpty,
    Custom(Arc<PredicateFn>),
}

impl Predicate {
    pub fn keep(&self, value: &Value) -> bool {
        match self {
            Predicate::NonEmpty => is_non_empty(value),
            Predicate::Custom(f) => f(value),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::NonEmpty => f.write_str("NonEmpty"),
            Predicate::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

fn is_non_empty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Options for one dotted path.
///
/// # Examples
/// ```
/// use csv2json::FieldOptions;
/// use serde_json::json;
///
/// let opts = FieldOptions::new().with_infer_type(true).with_fill_value(json!(0));
/// assert!(opts.infer_type);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FieldOptions {
    pub infer_type: bool,
    pub render: Option<Render>,
    pub optional: Option<Predicate>,
    pub fill_value: Option<Value>,
}

impl FieldOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_infer_type(mut self, infer_type: bool) -> Self {
        self.infer_type = infer_type;
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.render = Some(Render::Builtin(transform));
        self
    }

    pub fn with_render<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.render = Some(Render::Custom(Arc::new(f)));
        self
    }

    /// Drop the value when it is empty.
    pub fn with_optional(mut self) -> Self {
        self.optional = Some(Predicate::NonEmpty);
        self
    }

    /// Drop the value when `keep` returns false.
    pub fn with_optional_if<F>(mut self, keep: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.optional = Some(Predicate::Custom(Arc::new(keep)));
        self
    }

    pub fn with_fill_value(mut self, fill_value: Value) -> Self {
        self.fill_value = Some(fill_value);
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldOptionsFile {
    #[serde(default)]
    infer_type: bool,
    #[serde(default)]
    render: Option<Transform>,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    fill_value: Option<Value>,
}

impl From<FieldOptionsFile> for FieldOptions {
    fn from(file: FieldOptionsFile) -> Self {
        FieldOptions {
            infer_type: file.infer_type,
            render: file.render.map(Render::Builtin),
            optional: file.optional.then_some(Predicate::NonEmpty),
            fill_value: file.fill_value,
        }
    }
}

/// Table of [`FieldOptions`] keyed by dotted path.
#[derive(Debug, Clone, Default)]
pub struct Options {
    fields: HashMap<String, FieldOptions>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<String>, options: FieldOptions) -> Self {
        self.insert(path, options);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, options: FieldOptions) -> Option<FieldOptions> {
        self.fields.insert(path.into(), options)
    }

    pub fn get(&self, path: &str) -> Option<&FieldOptions> {
        self.fields.get(path)
    }

    pub fn fill_value(&self, path: &str) -> Option<&Value> {
        self.get(path).and_then(|options| options.fill_value.as_ref())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Overlay `other` on top of `self`; entries of `other` win per path.
    pub fn merge(mut self, other: Options) -> Self {
        self.fields.extend(other.fields);
        self
    }

    /// Parse an options file: a JSON object from dotted path to entry.
    ///
    /// # Examples
    /// ```
    /// use csv2json::Options;
    ///
    /// let options = Options::from_json_str(
    ///     r#"{"abc.3": {"infer_type": true}, "abc": {"fill_value": 0}, "foo": {"optional": true}}"#,
    /// )
    /// .unwrap();
    /// assert_eq!(options.len(), 3);
    /// ```
    pub fn from_json_str(input: &str) -> Result<Self> {
        let raw: HashMap<String, FieldOptionsFile> =
            serde_json::from_str(input).map_err(|err| Error::options(err.to_string()))?;
        Ok(Self::from_file(raw))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let raw: HashMap<String, FieldOptionsFile> =
            serde_json::from_reader(reader).map_err(|err| Error::options(err.to_string()))?;
        Ok(Self::from_file(raw))
    }

    fn from_file(raw: HashMap<String, FieldOptionsFile>) -> Self {
        raw.into_iter()
            .map(|(path, entry)| (path, FieldOptions::from(entry)))
            .collect()
    }
}

impl FromIterator<(String, FieldOptions)> for Options {
    fn from_iter<I: IntoIterator<Item = (String, FieldOptions)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl Extend<(String, FieldOptions)> for Options {
    fn extend<I: IntoIterator<Item = (String, FieldOptions)>>(&mut self, iter: I) {
        self.fields.extend(iter);
    }
}

/// Guess a typed value from CSV text: all-digit strings become integers,
/// `true`/`false` in any case become booleans, comma-separated text becomes a
/// sequence of strings. Anything else, including non-string values, is
/// returned unchanged.
pub fn infer_type(value: Value) -> Value {
    let Value::String(text) = value else {
        return value;
    };
    if !text.is_empty() && text.bytes().all(|byte| byte.is_ascii_digit()) {
        if let Ok(number) = text.parse::<u64>() {
            return Value::Number(number.into());
        }
        return Value::String(text);
    }
    if text.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if text.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if text.contains(',') {
        return Value::Array(
            text.split(',')
                .map(|part| Value::String(part.to_string()))
                .collect(),
        );
    }
    Value::String(text)
}

/// Hooks applying [`Options`] to an already resolved record.
///
/// With a shape attached, only collections the shape built are walked;
/// collections bound as values are treated as leaves.
#[derive(Debug, Clone, Copy)]
pub struct OptionHooks<'o> {
    options: &'o Options,
    shape: Option<&'o Shape>,
}

impl<'o> OptionHooks<'o> {
    pub fn new(options: &'o Options) -> Self {
        Self {
            options,
            shape: None,
        }
    }

    pub fn with_shape(mut self, shape: &'o Shape) -> Self {
        self.shape = Some(shape);
        self
    }
}

impl Hooks<Value> for OptionHooks<'_> {
    type Output = Value;

    fn descend(&self, path: &str) -> bool {
        match self.shape {
            Some(shape) => shape
                .at(path)
                .is_some_and(|node| node.is_sequence() || node.is_mapping()),
            None => true,
        }
    }

    fn on_leaf(&self, leaf: &Value, path: &str) -> Result<Rendered<Value>> {
        let Some(options) = self.options.get(path) else {
            return Ok(Rendered::Keep(leaf.clone()));
        };
        let mut value = leaf.clone();
        if options.infer_type {
            value = infer_type(value);
        }
        if let Some(render) = &options.render {
            value = render
                .apply(value)
                .map_err(|source| Error::transform(path, source))?;
        }
        if let Some(predicate) = &options.optional {
            if !predicate.keep(&value) {
                log::trace!("dropping optional value at `{path}`");
                return Ok(Rendered::Drop);
            }
        }
        Ok(Rendered::Keep(value))
    }

    fn on_collection(&self, collection: Value, path: &str) -> Result<Rendered<Value>> {
        if let Some(predicate) = self.options.get(path).and_then(|o| o.optional.as_ref()) {
            if !predicate.keep(&collection) {
                log::trace!("dropping optional collection at `{path}`");
                return Ok(Rendered::Drop);
            }
        }
        Ok(Rendered::Keep(collection))
    }

    fn fill_value(&self, path: &str) -> Value {
        self.options.fill_value(path).cloned().unwrap_or(Value::Null)
    }
}
