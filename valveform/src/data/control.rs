use serde_json::{Number, Value};

use crate::data::spec::{FieldSpec, FieldType, js_string};

/// Shape of JSON text edited in a multi-line control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Array,
    Object,
}

impl JsonKind {
    /// Value submitted for an empty, non-nullable field.
    pub fn empty_value(&self) -> Value {
        match self {
            JsonKind::Array => Value::Array(Vec::new()),
            JsonKind::Object => Value::Object(serde_json::Map::new()),
        }
    }
}

/// Widget used to edit one valve.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    /// On/off toggle.
    Checkbox,
    /// Numeric entry with optional bounds.
    Number {
        integer: bool,
        minimum: Option<Number>,
        maximum: Option<Number>,
    },
    /// Multi-line JSON editor.
    JsonText { kind: JsonKind },
    /// Choice among the field's enum values.
    Select { options: Vec<String>, nullable: bool },
    /// Single-line text entry.
    Text,
}

impl Control {
    /// Choose the control for a field type.
    pub fn for_field(field_type: FieldType, spec: &FieldSpec) -> Self {
        match field_type {
            FieldType::Boolean => Control::Checkbox,
            FieldType::Integer | FieldType::Number => Control::Number {
                integer: field_type == FieldType::Integer,
                minimum: spec.minimum(),
                maximum: spec.maximum(),
            },
            FieldType::Array => Control::JsonText {
                kind: JsonKind::Array,
            },
            FieldType::Object => Control::JsonText {
                kind: JsonKind::Object,
            },
            FieldType::Enum => Control::Select {
                options: spec.enum_options(),
                nullable: spec.is_nullable(),
            },
            FieldType::String => Control::Text,
        }
    }

    /// Whether this control holds a checked state instead of text.
    pub fn is_checkbox(&self) -> bool {
        matches!(self, Control::Checkbox)
    }

    /// Derive the input shown when the form is first rendered.
    ///
    /// The boolean in the result is `true` when the stored value could not
    /// be shown in its intended form and was displayed raw instead.
    pub fn initial_input(&self, value: &Value) -> (FieldInput, bool) {
        match self {
            Control::Checkbox => {
                let checked = matches!(value, Value::Bool(true))
                    || matches!(value, Value::String(s) if s == "true");
                (FieldInput::Checked(checked), false)
            }
            Control::JsonText { .. } => json_display(value),
            Control::Select { options, nullable } => {
                let current = plain_text(value);
                let selected = if options.iter().any(|o| *o == js_string(value)) {
                    js_string(value)
                } else if *nullable || options.is_empty() {
                    String::new()
                } else {
                    debug!("value {current:?} is not an option, showing the first one");
                    options[0].clone()
                };
                (FieldInput::Text(selected), false)
            }
            Control::Number { .. } | Control::Text => (FieldInput::Text(plain_text(value)), false),
        }
    }
}

/// Live content of a control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldInput {
    Checked(bool),
    Text(String),
}

impl FieldInput {
    pub fn text(s: impl Into<String>) -> Self {
        FieldInput::Text(s.into())
    }

    /// String form, `"true"`/`"false"` for checkboxes.
    pub fn as_text(&self) -> std::borrow::Cow<'_, str> {
        match self {
            FieldInput::Checked(true) => "true".into(),
            FieldInput::Checked(false) => "false".into(),
            FieldInput::Text(s) => s.as_str().into(),
        }
    }
}

impl std::fmt::Display for FieldInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// Text of a scalar value in an input box; `null` is empty.
fn plain_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => js_string(other),
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

/// Pretty-print an array/object value for editing.
///
/// A string holding JSON is unpacked; anything else is shown as-is.
fn json_display(value: &Value) -> (FieldInput, bool) {
    if is_falsy(value) {
        return (FieldInput::Text(String::new()), false);
    }
    match value {
        Value::Array(_) | Value::Object(_) => (FieldInput::Text(pretty(value)), false),
        Value::String(raw) => match reformat_json(raw) {
            Reformat::Formatted(text) => (FieldInput::Text(text), false),
            Reformat::Empty => (FieldInput::Text(String::new()), false),
            Reformat::Invalid => (FieldInput::Text(raw.clone()), true),
        },
        other => (FieldInput::Text(other.to_string()), false),
    }
}

/// Two-space indented JSON.
pub fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Result of reformatting JSON text when a JSON editor loses focus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reformat {
    /// Blank input, left alone.
    Empty,
    /// Parsed and re-indented.
    Formatted(String),
    /// Not valid JSON; the caller keeps the text and flags the control.
    Invalid,
}

pub fn reformat_json(text: &str) -> Reformat {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Reformat::Empty;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(v) => Reformat::Formatted(pretty(&v)),
        Err(e) => {
            warn!("JSON format failed: {e}");
            Reformat::Invalid
        }
    }
}
