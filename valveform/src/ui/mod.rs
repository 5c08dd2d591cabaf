//! Terminal editor for valve forms.
//!
//! Each field gets a widget matching its [`Control`]: checkboxes, single
//! line edits for numbers and text, text areas for JSON, and popup selects
//! for enums. Edits flow into the [`FormState`] held as Cursive user data,
//! so labels and the status line track dirty state live.
//!
//! The editor never talks to the backend; it returns an [`EditOutcome`] and
//! the caller decides what to do with it.

use cursive::{
    Cursive, CursiveExt,
    event::Key,
    view::{Nameable, Resizable, Scrollable},
    views::{Checkbox, Dialog, DummyView, EditView, LinearLayout, SelectView, TextArea, TextView},
};

use crate::{
    api::Pipeline,
    data::{Control, FieldInput, FieldState, FormState},
    error::{Result, ValveError},
};

/// What the user asked for when leaving the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    Save,
    Switch,
    Quit,
}

/// Form as edited, plus the requested action.
#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub form: FormState,
    pub action: EditAction,
}

struct Editor {
    title: String,
    form: FormState,
    notice: Option<String>,
    action: EditAction,
}

fn field_name(key: &str) -> String {
    format!("valve.{key}")
}

fn label_name(key: &str) -> String {
    format!("label.{key}")
}

fn label_text(field: &FieldState) -> String {
    let mut label = field.title.clone();
    if let Control::Number {
        minimum, maximum, ..
    } = &field.control
        && (minimum.is_some() || maximum.is_some())
    {
        let lo = minimum.as_ref().map(ToString::to_string).unwrap_or_default();
        let hi = maximum.as_ref().map(ToString::to_string).unwrap_or_default();
        label.push_str(&format!(" [{lo}..{hi}]"));
    }
    if field.nullable {
        label.push_str(" (optional)");
    }
    if field.dirty {
        label.push_str(" *");
    }
    if field.invalid {
        label.push_str("  ! invalid JSON");
    }
    label
}

fn status_text(form: &FormState, notice: Option<&str>) -> String {
    let state = if form.has_unsaved_changes() {
        "Unsaved changes"
    } else {
        "No changes"
    };
    match notice {
        Some(n) => format!("{state}  |  {n}"),
        None => state.to_string(),
    }
}

/// Run the editor for one form until the user saves, switches or quits.
///
/// `notice` is shown in the status line, e.g. the error of a failed save.
///
/// # Errors
///
/// Returns an error if the editor state cannot be recovered after the UI
/// loop ends.
pub fn edit_form(title: &str, form: FormState, notice: Option<&str>) -> Result<EditOutcome> {
    let mut siv = Cursive::default();
    siv.set_user_data(Editor {
        title: title.to_string(),
        form,
        notice: notice.map(str::to_string),
        action: EditAction::Quit,
    });
    siv.add_global_callback('~', Cursive::toggle_debug_console);
    show_editor(&mut siv);
    siv.run();

    let editor = siv
        .take_user_data::<Editor>()
        .ok_or_else(|| ValveError::Ui("editor state lost".to_string()))?;
    Ok(EditOutcome {
        form: editor.form,
        action: editor.action,
    })
}

fn show_editor(siv: &mut Cursive) {
    let Some((title, view)) = siv.with_user_data(|ed: &mut Editor| {
        (ed.title.clone(), editor_view(&ed.form, ed.notice.as_deref()))
    }) else {
        return;
    };

    let dialog = Dialog::around(view.scrollable())
        .title(title)
        .button("Save", |s| finish(s, EditAction::Save))
        .button("Revert", on_revert)
        .button("Switch", |s| finish(s, EditAction::Switch))
        .button("Quit", on_quit);
    siv.add_fullscreen_layer(dialog.full_screen());
}

fn editor_view(form: &FormState, notice: Option<&str>) -> LinearLayout {
    let mut layout = LinearLayout::vertical();
    layout.add_child(TextView::new(status_text(form, notice)).with_name("status"));
    layout.add_child(DummyView);

    if form.is_empty() {
        layout.add_child(TextView::new(crate::html::NO_VALVES));
        return layout;
    }

    for field in form.fields() {
        layout.add_child(TextView::new(label_text(field)).with_name(label_name(&field.key)));
        add_control(&mut layout, field);
        layout.add_child(DummyView);
    }
    layout
}

fn add_control(layout: &mut LinearLayout, field: &FieldState) {
    let key = field.key.clone();
    let name = field_name(&field.key);
    let text = field.current.as_text().to_string();

    match &field.control {
        Control::Checkbox => {
            let checked = matches!(field.current, FieldInput::Checked(true));
            let view = Checkbox::new()
                .with_checked(checked)
                .on_change(move |s, checked| on_input(s, &key, FieldInput::Checked(checked)));
            layout.add_child(view.with_name(name));
        }
        Control::Number { .. } | Control::Text => {
            let view = EditView::new()
                .content(text)
                .on_edit(move |s, text, _| on_input(s, &key, FieldInput::text(text)));
            layout.add_child(view.with_name(name).min_width(40));
        }
        Control::JsonText { .. } => {
            let view = TextArea::new().content(text);
            layout.add_child(view.with_name(name).min_height(4).min_width(40));
        }
        Control::Select { options, nullable } => {
            let mut view = SelectView::<String>::new().popup();
            if *nullable {
                view.add_item("-- select --", String::new());
            }
            for option in options {
                view.add_item(option.clone(), option.clone());
            }
            let offset = usize::from(*nullable);
            let selected = options
                .iter()
                .position(|o| *o == text)
                .map(|i| i + offset)
                .unwrap_or(0);
            let view = view
                .selected(selected)
                .on_submit(move |s, value: &String| on_input(s, &key, FieldInput::text(value.as_str())));
            layout.add_child(view.with_name(name));
        }
    }
}

fn on_input(siv: &mut Cursive, key: &str, input: FieldInput) {
    let updated = siv.with_user_data(|ed: &mut Editor| match ed.form.set_input(key, input) {
        Ok(_) => ed.form.field(key).map(|f| {
            (
                label_text(f),
                status_text(&ed.form, ed.notice.as_deref()),
            )
        }),
        Err(e) => {
            warn!("{e}");
            None
        }
    });
    if let Some(Some((label, status))) = updated {
        siv.call_on_name(&label_name(key), |v: &mut TextView| v.set_content(label));
        siv.call_on_name("status", |v: &mut TextView| v.set_content(status));
    }
}

/// Read every widget back into the form; JSON areas get their blur pass.
fn sync_from_views(siv: &mut Cursive) {
    let Some(fields) = siv.with_user_data(|ed: &mut Editor| {
        ed.form
            .fields()
            .iter()
            .map(|f| (f.key.clone(), f.control.clone()))
            .collect::<Vec<_>>()
    }) else {
        return;
    };

    for (key, control) in fields {
        let name = field_name(&key);
        let input = match control {
            Control::Checkbox => siv
                .call_on_name(&name, |v: &mut Checkbox| v.is_checked())
                .map(FieldInput::Checked),
            Control::Number { .. } | Control::Text => siv
                .call_on_name(&name, |v: &mut EditView| v.get_content().to_string())
                .map(FieldInput::Text),
            Control::JsonText { .. } => siv
                .call_on_name(&name, |v: &mut TextArea| v.get_content().to_string())
                .map(FieldInput::Text),
            Control::Select { .. } => siv
                .call_on_name(&name, |v: &mut SelectView<String>| {
                    v.selection().map(|s| s.to_string()).unwrap_or_default()
                })
                .map(FieldInput::Text),
        };
        let Some(input) = input else {
            continue;
        };

        siv.with_user_data(|ed: &mut Editor| {
            if let Err(e) = ed
                .form
                .set_input(&key, input)
                .and_then(|_| ed.form.blur(&key))
            {
                warn!("{e}");
            }
        });
    }
}

fn finish(siv: &mut Cursive, action: EditAction) {
    sync_from_views(siv);
    siv.with_user_data(|ed: &mut Editor| ed.action = action);
    siv.quit();
}

fn on_revert(siv: &mut Cursive) {
    siv.with_user_data(|ed: &mut Editor| {
        ed.form.revert_all();
        ed.notice = None;
    });
    siv.pop_layer();
    show_editor(siv);
}

fn on_quit(siv: &mut Cursive) {
    sync_from_views(siv);
    let unsaved = siv
        .with_user_data(|ed: &mut Editor| ed.form.has_unsaved_changes())
        .unwrap_or(false);
    if !unsaved {
        finish(siv, EditAction::Quit);
        return;
    }

    siv.add_layer(
        Dialog::text("Discard unsaved changes?")
            .title("Unsaved changes")
            .button("Discard", |s| {
                s.with_user_data(|ed: &mut Editor| ed.action = EditAction::Quit);
                s.quit();
            })
            .button("Cancel", |s| {
                s.pop_layer();
            }),
    );
}

/// Let the user pick a pipeline. `None` when cancelled.
pub fn pick_pipeline(pipelines: &[Pipeline], current: Option<&str>) -> Option<String> {
    let mut siv = Cursive::default();
    siv.set_user_data(None::<String>);

    let mut select = SelectView::<String>::new();
    for p in pipelines {
        select.add_item(format!("{} ({})", p.display_name(), p.id), p.id.clone());
    }
    let selected = current
        .and_then(|id| pipelines.iter().position(|p| p.id == id))
        .unwrap_or(0);
    let select = select.selected(selected).on_submit(|s, id: &String| {
        s.set_user_data(Some(id.clone()));
        s.quit();
    });

    siv.add_global_callback(Key::Esc, |s| s.quit());
    siv.add_layer(
        Dialog::around(select.scrollable())
            .title("Select a pipeline")
            .button("Cancel", |s| s.quit()),
    );
    siv.run();

    siv.take_user_data::<Option<String>>().flatten()
}
