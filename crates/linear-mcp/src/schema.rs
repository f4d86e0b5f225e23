//! Declarative tool input shapes.
//!
//! A shape is a static slice of [`Field`]s. The same slice renders the
//! `inputSchema` advertised in `tools/list` and checks call arguments at
//! runtime, so the two cannot drift apart.
//!
//! Validation is permissive about extra keys: members not named by the shape
//! are ignored.

use serde_json::{json, Map, Value};
use std::fmt;

use crate::error::ToolError;

/// Primitive kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Integer,
    Boolean,
    StringArray,
}

impl FieldKind {
    fn schema_type(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
            FieldKind::StringArray => "array",
        }
    }

    fn admits(self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::StringArray => value.is_array(),
        }
    }
}

/// Enumerated values a field may take.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Allowed {
    Strings(&'static [&'static str]),
    Numbers(&'static [i64]),
}

impl Allowed {
    fn contains(&self, value: &Value) -> bool {
        match self {
            Allowed::Strings(values) => value.as_str().is_some_and(|s| values.contains(&s)),
            Allowed::Numbers(values) => value
                .as_f64()
                .is_some_and(|n| values.iter().any(|&v| v as f64 == n)),
        }
    }

    fn to_json(self) -> Value {
        match self {
            Allowed::Strings(values) => json!(values),
            Allowed::Numbers(values) => json!(values),
        }
    }

    fn describe(&self) -> String {
        match self {
            Allowed::Strings(values) => values.join(", "),
            Allowed::Numbers(values) => values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// One named member of a tool's input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub description: &'static str,
    pub required: bool,
    pub allowed: Option<Allowed>,
    pub minimum: Option<i64>,
    pub maximum: Option<i64>,
}

impl Field {
    const fn new(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: false,
            allowed: None,
            minimum: None,
            maximum: None,
        }
    }

    pub const fn string(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldKind::String, description)
    }

    pub const fn number(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldKind::Number, description)
    }

    pub const fn integer(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldKind::Integer, description)
    }

    pub const fn boolean(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldKind::Boolean, description)
    }

    pub const fn string_array(name: &'static str, description: &'static str) -> Self {
        Self::new(name, FieldKind::StringArray, description)
    }

    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }

    pub const fn one_of_strings(self, values: &'static [&'static str]) -> Self {
        Self {
            allowed: Some(Allowed::Strings(values)),
            ..self
        }
    }

    pub const fn one_of_numbers(self, values: &'static [i64]) -> Self {
        Self {
            allowed: Some(Allowed::Numbers(values)),
            ..self
        }
    }

    pub const fn minimum(self, minimum: i64) -> Self {
        Self {
            minimum: Some(minimum),
            ..self
        }
    }

    pub const fn maximum(self, maximum: i64) -> Self {
        Self {
            maximum: Some(maximum),
            ..self
        }
    }

    /// JSON-schema fragment for this field.
    fn schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".into(), json!(self.kind.schema_type()));
        if self.kind == FieldKind::StringArray {
            schema.insert("items".into(), json!({ "type": "string" }));
        }
        schema.insert("description".into(), json!(self.description));
        if let Some(allowed) = self.allowed {
            schema.insert("enum".into(), allowed.to_json());
        }
        if let Some(minimum) = self.minimum {
            schema.insert("minimum".into(), json!(minimum));
        }
        if let Some(maximum) = self.maximum {
            schema.insert("maximum".into(), json!(maximum));
        }
        Value::Object(schema)
    }

    /// Why `value` is not acceptable for this field, if it is not.
    fn check(&self, value: &Value) -> Option<String> {
        if !self.kind.admits(value) {
            return Some(format!(
                "expected {}, got {}",
                expected_name(self.kind),
                json_type(value)
            ));
        }

        if let (FieldKind::StringArray, Some(items)) = (self.kind, value.as_array()) {
            if let Some(index) = items.iter().position(|item| !item.is_string()) {
                return Some(format!("element {} is not a string", index));
            }
        }

        if let Some(allowed) = &self.allowed {
            if !allowed.contains(value) {
                return Some(format!("must be one of {}", allowed.describe()));
            }
        }

        if let (Some(minimum), Some(n)) = (self.minimum, value.as_f64()) {
            if n < minimum as f64 {
                return Some(format!("must be at least {}", minimum));
            }
        }

        if let (Some(maximum), Some(n)) = (self.maximum, value.as_f64()) {
            if n > maximum as f64 {
                return Some(format!("must be at most {}", maximum));
            }
        }

        None
    }
}

fn expected_name(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::String => "string",
        FieldKind::Number => "number",
        FieldKind::Integer => "integer",
        FieldKind::Boolean => "boolean",
        FieldKind::StringArray => "array of strings",
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A single reason an argument payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub reason: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Render the `inputSchema` object for a shape.
pub fn input_schema(fields: &[Field]) -> Value {
    let properties: Map<String, Value> = fields
        .iter()
        .map(|f| (f.name.to_string(), f.schema()))
        .collect();
    let required: Vec<&str> = fields.iter().filter(|f| f.required).map(|f| f.name).collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Check a payload against a shape, collecting every violation.
pub fn validate(fields: &[Field], payload: &Value) -> Result<(), Vec<Violation>> {
    let Some(obj) = payload.as_object() else {
        return Err(vec![Violation {
            field: "arguments".to_string(),
            reason: format!("expected object, got {}", json_type(payload)),
        }]);
    };

    let violations: Vec<Violation> = fields
        .iter()
        .filter_map(|field| {
            let reason = match obj.get(field.name) {
                None if field.required => Some("is required".to_string()),
                None => None,
                Some(value) => field.check(value),
            };
            reason.map(|reason| Violation {
                field: field.name.to_string(),
                reason,
            })
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// Check a tool call payload, turning violations into a [`ToolError`].
pub fn check(tool: &str, fields: &[Field], payload: &Value) -> Result<(), ToolError> {
    validate(fields, payload).map_err(|violations| ToolError::InvalidArguments {
        tool: tool.to_string(),
        violations,
    })
}
