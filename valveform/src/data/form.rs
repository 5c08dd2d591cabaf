use serde_json::Value;

use crate::{
    data::{
        control::{Control, FieldInput, Reformat, reformat_json},
        spec::{FieldType, SpecMap, ValveValues},
    },
    error::{Result, ValveError},
};

/// Edit state of one valve while its form is mounted.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldState {
    /// Valve key.
    pub key: String,
    /// Label shown next to the control.
    pub title: String,
    /// Type inferred from the field spec at render time.
    pub field_type: FieldType,
    /// Whether the field spec allowed `null` at render time.
    pub nullable: bool,
    /// Widget kind.
    pub control: Control,
    /// Value the server reported.
    pub original: Value,
    /// Input as first rendered.
    pub initial: FieldInput,
    /// Input as currently edited.
    pub current: FieldInput,
    /// Differs from `initial`.
    pub dirty: bool,
    /// JSON text that failed to parse on the last blur (or at render).
    pub invalid: bool,
}

impl FieldState {
    fn new(key: &str, value: &Value, specs: &SpecMap) -> Self {
        let spec = specs.get_or_default(key);
        let field_type = spec.field_type();
        let control = Control::for_field(field_type, &spec);
        let (initial, invalid) = control.initial_input(value);

        FieldState {
            key: key.to_string(),
            title: spec.title_or(key).to_string(),
            field_type,
            nullable: spec.is_nullable(),
            control,
            original: value.clone(),
            current: initial.clone(),
            initial,
            dirty: false,
            invalid,
        }
    }

    /// Compare the live input with the rendered one.
    pub fn differs(&self) -> bool {
        match (&self.initial, &self.current) {
            (FieldInput::Text(a), FieldInput::Text(b)) if self.field_type.is_json() => {
                normalize_json(a) != normalize_json(b)
            }
            (a, b) => a != b,
        }
    }
}

/// Comparable form of JSON text: parsed when possible, raw otherwise.
#[derive(Debug, PartialEq)]
enum JsonText<'a> {
    Empty,
    Parsed(Value),
    Raw(&'a str),
}

fn normalize_json(text: &str) -> JsonText<'_> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return JsonText::Empty;
    }
    match serde_json::from_str(trimmed) {
        Ok(v) => JsonText::Parsed(v),
        Err(_) => JsonText::Raw(trimmed),
    }
}

/// Editable valve form for one pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    fields: Vec<FieldState>,
    unsaved: bool,
}

impl FormState {
    /// Build one field per valve, in the order the values arrived.
    ///
    /// Keys without a spec get the empty spec.
    pub fn build(values: &ValveValues, specs: &SpecMap) -> Self {
        let fields = values
            .iter()
            .map(|(key, value)| FieldState::new(key, value, specs))
            .collect();
        FormState {
            fields,
            unsaved: false,
        }
    }

    pub fn fields(&self) -> &[FieldState] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, key: &str) -> Option<&FieldState> {
        self.fields.iter().find(|f| f.key == key)
    }

    fn field_mut(&mut self, key: &str) -> Result<&mut FieldState> {
        self.fields
            .iter_mut()
            .find(|f| f.key == key)
            .ok_or_else(|| ValveError::UnknownField(key.to_string()))
    }

    /// Whether any field differs from what was rendered.
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    /// Record a change event on one control.
    ///
    /// Returns whether that field is now dirty. A clean field triggers a
    /// rescan of the whole form to settle the unsaved flag.
    pub fn set_input(&mut self, key: &str, input: FieldInput) -> Result<bool> {
        let field = self.field_mut(key)?;
        match (&field.control, &input) {
            (Control::Checkbox, FieldInput::Text(_)) => {
                return Err(ValveError::InputMismatch {
                    key: key.to_string(),
                    expected: "a checked state",
                });
            }
            (c, FieldInput::Checked(_)) if !c.is_checkbox() => {
                return Err(ValveError::InputMismatch {
                    key: key.to_string(),
                    expected: "text",
                });
            }
            _ => {}
        }

        field.current = input;
        field.dirty = field.differs();
        let dirty = field.dirty;

        if dirty {
            self.unsaved = true;
        } else {
            self.unsaved = self.fields.iter().any(FieldState::differs);
        }
        debug!("valve `{key}` dirty={dirty}, form unsaved={}", self.unsaved);
        Ok(dirty)
    }

    /// Set a field from its textual form, as typed on a command line.
    ///
    /// Checkbox fields accept `true/false`, `1/0`, `on/off`, `yes/no`.
    pub fn set_text(&mut self, key: &str, text: &str) -> Result<bool> {
        let is_checkbox = self
            .field(key)
            .ok_or_else(|| ValveError::UnknownField(key.to_string()))?
            .control
            .is_checkbox();
        let input = if is_checkbox {
            let checked = match text.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "on" | "yes" => true,
                "false" | "0" | "off" | "no" | "" => false,
                _ => {
                    return Err(ValveError::InputMismatch {
                        key: key.to_string(),
                        expected: "a boolean",
                    });
                }
            };
            FieldInput::Checked(checked)
        } else {
            FieldInput::text(text)
        };
        self.set_input(key, input)
    }

    /// Reformat a JSON editor after it loses focus.
    ///
    /// Invalid JSON is left untouched and the field is flagged. Returns
    /// whether the content is valid (blank counts as valid).
    pub fn blur(&mut self, key: &str) -> Result<bool> {
        let field = self.field_mut(key)?;
        if !field.field_type.is_json() {
            return Ok(true);
        }
        let FieldInput::Text(text) = &field.current else {
            return Ok(true);
        };
        match reformat_json(text) {
            Reformat::Empty => Ok(true),
            Reformat::Formatted(pretty) => {
                field.current = FieldInput::Text(pretty);
                field.invalid = false;
                Ok(true)
            }
            Reformat::Invalid => {
                field.invalid = true;
                Ok(false)
            }
        }
    }

    /// Restore one field to its rendered input.
    pub fn revert(&mut self, key: &str) -> Result<()> {
        let initial = self.field_mut(key)?.initial.clone();
        self.set_input(key, initial).map(|_| ())
    }

    /// Restore every field.
    pub fn revert_all(&mut self) {
        for field in &mut self.fields {
            field.current = field.initial.clone();
            field.dirty = false;
        }
        self.unsaved = false;
    }

    /// Forget pending changes after the backend accepted them.
    pub fn mark_saved(&mut self) {
        for field in &mut self.fields {
            field.initial = field.current.clone();
            field.dirty = false;
        }
        self.unsaved = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form() -> FormState {
        let specs = SpecMap::from_json(json!({
            "enabled": {"type": "boolean"},
            "limit": {"anyOf": [{"type": "integer"}, {"type": "null"}], "title": "Limit"},
            "tags": {"type": "array"},
        }));
        let values = json!({
            "name": "demo",
            "enabled": true,
            "limit": null,
            "tags": ["a"],
        });
        FormState::build(values.as_object().unwrap(), &specs)
    }

    #[test]
    fn test_fields_follow_value_order() {
        let f = form();
        let keys: Vec<_> = f.fields().iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, ["name", "enabled", "limit", "tags"]);
        assert_eq!(f.field("name").unwrap().field_type, FieldType::String);
        assert_eq!(f.field("limit").unwrap().title, "Limit");
        assert!(f.field("limit").unwrap().nullable);
    }

    #[test]
    fn test_checkbox_toggle_back_clears_flags() {
        let mut f = form();
        assert!(f.set_input("enabled", FieldInput::Checked(false)).unwrap());
        assert!(f.has_unsaved_changes());

        assert!(!f.set_input("enabled", FieldInput::Checked(true)).unwrap());
        assert!(!f.field("enabled").unwrap().dirty);
        assert!(!f.has_unsaved_changes());
    }

    #[test]
    fn test_clean_field_keeps_other_dirty_fields() {
        let mut f = form();
        f.set_text("name", "other").unwrap();
        f.set_input("enabled", FieldInput::Checked(false)).unwrap();
        f.set_input("enabled", FieldInput::Checked(true)).unwrap();
        assert!(f.has_unsaved_changes());

        f.set_text("name", "demo").unwrap();
        assert!(!f.has_unsaved_changes());
    }

    #[test]
    fn test_json_reformat_is_not_a_change() {
        let mut f = form();
        assert!(!f.set_text("tags", "[\"a\"]").unwrap());
        assert!(f.set_text("tags", "[\"a\", \"b\"]").unwrap());
    }

    #[test]
    fn test_blur_flags_invalid_json() {
        let mut f = form();
        f.set_text("tags", "[1, ").unwrap();
        assert!(!f.blur("tags").unwrap());
        let tags = f.field("tags").unwrap();
        assert!(tags.invalid);
        assert_eq!(tags.current, FieldInput::text("[1, "));

        f.set_text("tags", "[1,2]").unwrap();
        assert!(f.blur("tags").unwrap());
        let tags = f.field("tags").unwrap();
        assert!(!tags.invalid);
        assert_eq!(tags.current, FieldInput::text("[\n  1,\n  2\n]"));
    }

    #[test]
    fn test_input_shape_checked() {
        let mut f = form();
        assert!(matches!(
            f.set_input("enabled", FieldInput::text("true")),
            Err(ValveError::InputMismatch { .. })
        ));
        assert!(matches!(
            f.set_input("missing", FieldInput::text("x")),
            Err(ValveError::UnknownField(_))
        ));
        assert!(f.set_text("enabled", "off").unwrap());
    }

    #[test]
    fn test_revert_and_mark_saved() {
        let mut f = form();
        f.set_text("name", "x").unwrap();
        f.revert("name").unwrap();
        assert!(!f.has_unsaved_changes());
        assert_eq!(f.field("name").unwrap().current, FieldInput::text("demo"));

        f.set_text("limit", "5").unwrap();
        f.mark_saved();
        assert!(!f.has_unsaved_changes());
        assert_eq!(f.field("limit").unwrap().initial, FieldInput::text("5"));

        f.set_text("name", "y").unwrap();
        f.revert_all();
        assert!(!f.has_unsaved_changes());
    }
}
