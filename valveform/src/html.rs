//! HTML rendering of a valve form.
//!
//! Produces the markup of the valve settings panel: one labelled control per
//! field, tagged with `data-valve-id` / `data-valve-type` so a page script
//! can find the controls again.

use std::fmt::Write;

use crate::data::{Control, FieldInput, FieldState, FormState};

/// Notice shown when a pipeline exposes no valves.
pub const NO_VALVES: &str = "This pipeline has no configurable valves.";

/// Escape text for use in HTML content and attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Render the whole form.
pub fn render_form(form: &FormState) -> String {
    if form.is_empty() {
        return format!("<p class=\"valves-empty\">{}</p>", escape_html(NO_VALVES));
    }

    let mut html = String::from("<div class=\"valves\">\n");
    for field in form.fields() {
        render_field(&mut html, field);
    }
    html.push_str("</div>\n");
    html
}

fn classes(field: &FieldState) -> String {
    let mut class = String::from("valve-input");
    if field.dirty {
        class.push_str(" dirty");
    }
    if field.invalid {
        class.push_str(" invalid");
    }
    class
}

fn render_field(html: &mut String, field: &FieldState) {
    let id = format!("valve_{}", escape_html(&field.key));
    let data = format!(
        "data-valve-id=\"{}\" data-valve-type=\"{}\"",
        escape_html(&field.key),
        field.field_type
    );
    let class = classes(field);
    let text = field.current.as_text();

    let _ = writeln!(html, "<div class=\"valve\">");
    let _ = writeln!(
        html,
        "<label for=\"{id}\">{}</label>",
        escape_html(&field.title)
    );

    match &field.control {
        Control::Checkbox => {
            let checked = matches!(field.current, FieldInput::Checked(true));
            let _ = writeln!(
                html,
                "<input type=\"checkbox\" id=\"{id}\" class=\"{class}\" {data}{}>",
                if checked { " checked" } else { "" }
            );
        }
        Control::Number {
            minimum, maximum, ..
        } => {
            let mut bounds = String::new();
            if let Some(min) = minimum {
                let _ = write!(bounds, " min=\"{min}\"");
            }
            if let Some(max) = maximum {
                let _ = write!(bounds, " max=\"{max}\"");
            }
            let _ = writeln!(
                html,
                "<input type=\"number\" id=\"{id}\" class=\"{class}\" value=\"{}\"{bounds} {data}>",
                escape_html(&text)
            );
        }
        Control::JsonText { .. } => {
            let _ = writeln!(
                html,
                "<textarea id=\"{id}\" class=\"{class} json\" rows=\"4\" {data}>{}</textarea>",
                escape_html(&text)
            );
        }
        Control::Select { options, nullable } => {
            let _ = writeln!(html, "<select id=\"{id}\" class=\"{class}\" {data}>");
            if *nullable {
                let selected = if text.is_empty() { " selected" } else { "" };
                let _ = writeln!(html, "<option value=\"\"{selected}>-- select --</option>");
            }
            for option in options {
                let selected = if *option == *text { " selected" } else { "" };
                let escaped = escape_html(option);
                let _ = writeln!(
                    html,
                    "<option value=\"{escaped}\"{selected}>{escaped}</option>"
                );
            }
            let _ = writeln!(html, "</select>");
        }
        Control::Text => {
            let _ = writeln!(
                html,
                "<input type=\"text\" id=\"{id}\" class=\"{class}\" value=\"{}\" {data}>",
                escape_html(&text)
            );
        }
    }

    if field.nullable && matches!(field.control, Control::Number { .. } | Control::Text) {
        let _ = writeln!(html, "<p class=\"hint\">May be left empty.</p>");
    }
    let _ = writeln!(html, "</div>");
}
