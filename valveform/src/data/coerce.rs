use serde_json::{Number, Value};

use crate::{
    data::{
        control::{FieldInput, JsonKind},
        form::FormState,
        spec::{FieldType, SpecMap, ValveValues},
    },
    error::{Result, ValveError},
};

/// Conversion applied to a specific valve name regardless of its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Always an array: JSON array, wrapped JSON value, or comma list.
    PipelineList,
    /// Integer; blank is `0`, never `null`.
    IntegerOrZero,
    /// Integer; blank is `null` even for non-nullable fields.
    IntegerOrNull,
}

/// Per-name rules, checked before the type-based ones.
pub const FIELD_OVERRIDES: &[(&str, Coercion)] = &[
    ("pipelines", Coercion::PipelineList),
    ("priority", Coercion::IntegerOrZero),
    ("requests_per_minute", Coercion::IntegerOrNull),
    ("requests_per_hour", Coercion::IntegerOrNull),
    ("sliding_window_limit", Coercion::IntegerOrNull),
    ("sliding_window_minutes", Coercion::IntegerOrNull),
];

pub fn override_for(key: &str) -> Option<Coercion> {
    FIELD_OVERRIDES
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, rule)| *rule)
}

/// Convert one edited input to the JSON value submitted for it.
pub fn coerce_field(
    key: &str,
    field_type: FieldType,
    nullable: bool,
    input: &FieldInput,
) -> Result<Value> {
    if let Some(rule) = override_for(key) {
        let text = input.as_text();
        return apply_override(key, rule, nullable, &text);
    }

    let text = match input {
        FieldInput::Checked(checked) => return Ok(Value::Bool(*checked)),
        FieldInput::Text(text) => text.as_str(),
    };

    match field_type {
        FieldType::Number | FieldType::Integer => {
            if text.trim().is_empty() {
                Ok(if nullable { Value::Null } else { Value::from(0) })
            } else {
                parse_number(key, text).map(Value::Number)
            }
        }
        FieldType::Array => parse_json(key, text, nullable, JsonKind::Array),
        FieldType::Object => parse_json(key, text, nullable, JsonKind::Object),
        _ => Ok(Value::String(text.to_string())),
    }
}

fn apply_override(key: &str, rule: Coercion, nullable: bool, text: &str) -> Result<Value> {
    let blank = text.trim().is_empty();
    match rule {
        Coercion::PipelineList if blank => Ok(if nullable {
            Value::Null
        } else {
            Value::Array(Vec::new())
        }),
        Coercion::PipelineList => Ok(pipeline_list(text)),
        Coercion::IntegerOrZero if blank => Ok(Value::from(0)),
        Coercion::IntegerOrNull if blank => Ok(Value::Null),
        Coercion::IntegerOrZero | Coercion::IntegerOrNull => {
            parse_integer(key, text).map(Value::from)
        }
    }
}

/// Parse a pipeline list.
///
/// JSON arrays pass through, other JSON is wrapped, anything else is split
/// on commas with blank entries dropped.
pub fn pipeline_list(text: &str) -> Value {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Array(items)) => Value::Array(items),
        Ok(other) => Value::Array(vec![other]),
        Err(_) => Value::Array(
            text.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
                .collect(),
        ),
    }
}

/// Integer with `parseInt`-style truncation of decimal input.
fn parse_integer(key: &str, text: &str) -> Result<i64> {
    let t = text.trim();
    if let Ok(i) = t.parse::<i64>() {
        return Ok(i);
    }
    match t.parse::<f64>() {
        Ok(f) if f.is_finite() && f.trunc() >= i64::MIN as f64 && f.trunc() <= i64::MAX as f64 => {
            Ok(f.trunc() as i64)
        }
        _ => Err(ValveError::InvalidNumber {
            key: key.to_string(),
            input: text.to_string(),
        }),
    }
}

/// Text containing `.` becomes a float. Other text is tried as an integer
/// first and falls back to a float, so exponent forms like `1e3` parse.
fn parse_number(key: &str, text: &str) -> Result<Number> {
    let t = text.trim();
    let invalid = || ValveError::InvalidNumber {
        key: key.to_string(),
        input: text.to_string(),
    };

    if !t.contains('.')
        && let Ok(i) = t.parse::<i64>()
    {
        return Ok(Number::from(i));
    }
    t.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(invalid)
}

fn parse_json(key: &str, text: &str, nullable: bool, kind: JsonKind) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(if nullable { Value::Null } else { kind.empty_value() });
    }
    serde_json::from_str(text).map_err(|source| {
        error!("JSON parse error in `{key}`: {source}");
        ValveError::InvalidJson {
            key: key.to_string(),
            source,
        }
    })
}

/// Assemble the update document for a whole form.
///
/// Nullability comes from `specs` (fetched at save time), the type from the
/// form. The first failing field aborts the whole document.
pub fn serialize_form(form: &FormState, specs: &SpecMap) -> Result<ValveValues> {
    let mut out = ValveValues::new();
    for field in form.fields() {
        let nullable = specs
            .get(&field.key)
            .is_some_and(|spec| spec.is_nullable());
        let value = coerce_field(&field.key, field.field_type, nullable, &field.current)?;
        out.insert(field.key.clone(), value);
    }
    Ok(out)
}
