//! Response decoding and field-level validation
//!
//! Oracle replies are a single JSON document, optionally wrapped in a fenced
//! code block. [`decode`] strips the fence and parses; [`Validator`]s check
//! field rules on the parsed value. Batches are all-or-nothing: one bad
//! element rejects the whole list.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Reply text was not valid structured data
#[derive(Debug, Clone, Error)]
#[error("{reason} (response: {excerpt:?})")]
pub struct DecodeError {
    pub reason: String,
    pub excerpt: String,
}

impl DecodeError {
    pub fn new(reason: impl Into<String>, text: &str) -> Self {
        Self {
            reason: reason.into(),
            excerpt: text.chars().take(200).collect(),
        }
    }
}

/// Parsed data broke a field rule
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("expected an object")]
    NotAnObject,

    #[error("expected a list")]
    NotAList,

    #[error("missing field `{0}`")]
    MissingField(String),

    #[error("field `{field}` {problem}")]
    InvalidField { field: String, problem: String },

    #[error("element {index}: {source}")]
    InBatch {
        index: usize,
        #[source]
        source: Box<ValidationError>,
    },

    #[error("unexpected shape: {0}")]
    Shape(String),
}

/// Remove a surrounding ```json ... ``` (or bare ```) fence and whitespace
pub fn strip_fences(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```") {
        s = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
        };
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// Strip fences and parse into `T`
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, DecodeError> {
    serde_json::from_str(strip_fences(text)).map_err(|e| DecodeError::new(e.to_string(), text))
}

/// Strip fences, parse, and pull out the top-level `key` of the envelope
pub fn decode_envelope(text: &str, key: &str) -> Result<Value, DecodeError> {
    let mut doc: Value = decode(text)?;
    doc.get_mut(key)
        .map(Value::take)
        .ok_or_else(|| DecodeError::new(format!("missing `{}` envelope", key), text))
}

/// Deserialize an already-parsed value, reporting mismatches as shape errors
pub fn from_value<T: DeserializeOwned>(raw: Value) -> Result<T, ValidationError> {
    serde_json::from_value(raw).map_err(|e| ValidationError::Shape(e.to_string()))
}

/// Runtime shape check for a raw value, producing a typed result
pub trait Validator<T>: Send + Sync {
    fn validate(&self, raw: &Value) -> Result<T, ValidationError>;

    /// JSON-Schema style description, rendered into prompts
    fn describe(&self) -> Value;
}

/// Validate every element of a list; the first failure rejects the batch
pub fn validate_batch<T, V: Validator<T> + ?Sized>(
    raw: &Value,
    validator: &V,
) -> Result<Vec<T>, ValidationError> {
    let items = raw.as_array().ok_or(ValidationError::NotAList)?;
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            validator.validate(item).map_err(|e| ValidationError::InBatch {
                index,
                source: Box::new(e),
            })
        })
        .collect()
}

/// Rule for a single field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRule {
    Text,
    NonEmptyText,
    Number,
    PositiveNumber,
    Range { min: f64, max: f64 },
    OneOf(Vec<String>),
    Boolean,
    TextList,
    Any,
}

impl FieldRule {
    pub fn one_of(options: &[&str]) -> Self {
        FieldRule::OneOf(options.iter().map(|s| s.to_string()).collect())
    }

    fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            FieldRule::Text => value.as_str().map(|_| ()).ok_or_else(|| "must be a string".into()),
            FieldRule::NonEmptyText => match value.as_str() {
                Some(s) if !s.is_empty() => Ok(()),
                _ => Err("must be a non-empty string".into()),
            },
            FieldRule::Number => value.as_f64().map(|_| ()).ok_or_else(|| "must be a number".into()),
            FieldRule::PositiveNumber => match value.as_f64() {
                Some(n) if n > 0.0 => Ok(()),
                _ => Err("must be a positive number".into()),
            },
            FieldRule::Range { min, max } => match value.as_f64() {
                Some(n) if n >= *min && n <= *max => Ok(()),
                _ => Err(format!("must be a number in [{}, {}]", min, max)),
            },
            FieldRule::OneOf(options) => match value.as_str() {
                Some(s) if options.iter().any(|o| o == s) => Ok(()),
                _ => Err(format!("must be one of {:?}", options)),
            },
            FieldRule::Boolean => value.as_bool().map(|_| ()).ok_or_else(|| "must be a boolean".into()),
            FieldRule::TextList => match value.as_array() {
                Some(items) if items.iter().all(Value::is_string) => Ok(()),
                _ => Err("must be a list of strings".into()),
            },
            FieldRule::Any => Ok(()),
        }
    }

    fn describe(&self) -> Value {
        match self {
            FieldRule::Text => json!({"type": "string"}),
            FieldRule::NonEmptyText => json!({"type": "string", "minLength": 1}),
            FieldRule::Number => json!({"type": "number"}),
            FieldRule::PositiveNumber => json!({"type": "number", "exclusiveMinimum": 0}),
            FieldRule::Range { min, max } => json!({"type": "number", "minimum": min, "maximum": max}),
            FieldRule::OneOf(options) => json!({"type": "string", "enum": options}),
            FieldRule::Boolean => json!({"type": "boolean"}),
            FieldRule::TextList => json!({"type": "array", "items": {"type": "string"}}),
            FieldRule::Any => json!({}),
        }
    }
}

#[derive(Debug, Clone)]
struct FieldSpec {
    name: String,
    rule: FieldRule,
    required: bool,
}

/// Field rules for a JSON object; unlisted fields are allowed through
#[derive(Debug, Clone, Default)]
pub struct RecordSchema {
    fields: Vec<FieldSpec>,
}

impl RecordSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: &str, rule: FieldRule) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            rule,
            required: true,
        });
        self
    }

    pub fn optional(mut self, name: &str, rule: FieldRule) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            rule,
            required: false,
        });
        self
    }

    /// Field names in declaration order
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Wrap into a validator that also deserializes into `T`
    pub fn typed<T: DeserializeOwned>(self) -> TypedSchema<T> {
        TypedSchema {
            schema: self,
            _marker: PhantomData,
        }
    }
}

impl Validator<Map<String, Value>> for RecordSchema {
    fn validate(&self, raw: &Value) -> Result<Map<String, Value>, ValidationError> {
        let object = raw.as_object().ok_or(ValidationError::NotAnObject)?;
        for spec in &self.fields {
            match object.get(&spec.name) {
                None | Some(Value::Null) if spec.required => {
                    return Err(ValidationError::MissingField(spec.name.clone()));
                }
                None | Some(Value::Null) => {}
                Some(value) => spec.rule.check(value).map_err(|problem| ValidationError::InvalidField {
                    field: spec.name.clone(),
                    problem,
                })?,
            }
        }
        Ok(object.clone())
    }

    fn describe(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.rule.describe()))
            .collect();
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// A [`RecordSchema`] whose validated output is deserialized into `T`
#[derive(Debug, Clone)]
pub struct TypedSchema<T> {
    schema: RecordSchema,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Validator<T> for TypedSchema<T> {
    fn validate(&self, raw: &Value) -> Result<T, ValidationError> {
        let object = self.schema.validate(raw)?;
        from_value(Value::Object(object))
    }

    fn describe(&self) -> Value {
        Validator::<Map<String, Value>>::describe(&self.schema)
    }
}
