use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

/// Current valve values keyed by field name, in server order.
pub type ValveValues = serde_json::Map<String, Value>;

/// Primitive type names accepted verbatim from a spec's `type`.
const PRIMITIVES: [&str; 6] = ["string", "number", "integer", "boolean", "array", "object"];

/// The widget-relevant type of a valve field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Enum,
}

impl FieldType {
    /// Map a JSON Schema type name. Unknown names fall back to `String`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "number" => FieldType::Number,
            "integer" => FieldType::Integer,
            "boolean" => FieldType::Boolean,
            "array" => FieldType::Array,
            "object" => FieldType::Object,
            "enum" => FieldType::Enum,
            _ => FieldType::String,
        }
    }

    /// Schema-style name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
            FieldType::Enum => "enum",
        }
    }

    /// Whether values of this type are edited as JSON text.
    pub fn is_json(&self) -> bool {
        matches!(self, FieldType::Array | FieldType::Object)
    }

    /// Whether values of this type are edited as numbers.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Number | FieldType::Integer)
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schema fragment describing one valve.
///
/// Everything is optional and loosely typed; a spec that does not look like
/// anything known behaves like the empty spec (a non-nullable string).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub type_name: Option<Value>,
    #[serde(rename = "enum")]
    pub enum_values: Option<Value>,
    #[serde(rename = "anyOf")]
    pub any_of: Option<Value>,
    pub minimum: Option<Value>,
    pub maximum: Option<Value>,
    pub title: Option<Value>,
    pub description: Option<Value>,
}

impl FieldSpec {
    /// Build a spec from a raw JSON entry, degrading to the empty spec.
    pub fn from_value(key: &str, value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_else(|e| {
            warn!("ignoring malformed spec for `{key}`: {e}");
            FieldSpec::default()
        })
    }

    /// Infer the field type.
    ///
    /// In order: a primitive `type`, then a non-empty `enum`, then the first
    /// non-null `anyOf` variant, else `String`.
    pub fn field_type(&self) -> FieldType {
        if let Some(name) = self.type_name.as_ref().and_then(Value::as_str)
            && PRIMITIVES.contains(&name)
        {
            return FieldType::from_name(name);
        }

        if !self.enum_options().is_empty() {
            return FieldType::Enum;
        }

        if let Some(variants) = self.any_of.as_ref().and_then(Value::as_array) {
            let first = variants
                .iter()
                .map(|v| v.get("type").and_then(Value::as_str))
                .find(|ty| *ty != Some("null"));
            if let Some(ty) = first {
                return ty.map(FieldType::from_name).unwrap_or(FieldType::String);
            }
        }

        FieldType::String
    }

    /// A field is nullable when one `anyOf` variant has type `null`.
    pub fn is_nullable(&self) -> bool {
        self.any_of
            .as_ref()
            .and_then(Value::as_array)
            .is_some_and(|variants| {
                variants
                    .iter()
                    .any(|v| v.get("type").and_then(Value::as_str) == Some("null"))
            })
    }

    /// Enum choices as raw JSON values.
    pub fn enum_values(&self) -> &[Value] {
        self.enum_values
            .as_ref()
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Enum choices in their string form.
    pub fn enum_options(&self) -> Vec<String> {
        self.enum_values().iter().map(js_string).collect()
    }

    /// Lower bound, when it is a number.
    pub fn minimum(&self) -> Option<serde_json::Number> {
        as_number(self.minimum.as_ref())
    }

    /// Upper bound, when it is a number.
    pub fn maximum(&self) -> Option<serde_json::Number> {
        as_number(self.maximum.as_ref())
    }

    /// Display title, falling back to the field key.
    pub fn title_or<'a>(&'a self, key: &'a str) -> &'a str {
        self.title
            .as_ref()
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .unwrap_or(key)
    }
}

fn as_number(value: Option<&Value>) -> Option<serde_json::Number> {
    match value {
        Some(Value::Number(n)) => Some(n.clone()),
        _ => None,
    }
}

/// String form of a JSON value as a browser form would show it.
///
/// Strings are unquoted, `null` is `"null"`, containers are compact JSON.
pub fn js_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Field specs keyed by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecMap {
    fields: HashMap<String, FieldSpec>,
}

impl SpecMap {
    /// Parse a spec map from the backend's JSON document.
    ///
    /// Non-object documents give an empty map.
    pub fn from_json(doc: Value) -> Self {
        let fields = match doc {
            Value::Object(map) => map
                .into_iter()
                .map(|(key, value)| {
                    let spec = FieldSpec::from_value(&key, value);
                    (key, spec)
                })
                .collect(),
            Value::Null => HashMap::new(),
            other => {
                warn!("valve spec is not an object: {other}");
                HashMap::new()
            }
        };
        SpecMap { fields }
    }

    /// Spec for `key`, if the backend declared one.
    pub fn get(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.get(key)
    }

    /// Spec for `key`, or the empty spec.
    pub fn get_or_default(&self, key: &str) -> FieldSpec {
        self.fields.get(key).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
