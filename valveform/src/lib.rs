//! # valveform
//!
//! Schema-driven editing of pipeline "valves" (plugin settings).
//!
//! A pipeline backend publishes, per pipeline, a map of JSON-Schema-like
//! field specs and a map of current values. `valveform` turns those into an
//! editable form, tracks which fields changed, and converts the edited
//! inputs back into a correctly typed JSON document for the update call.
//!
//! ## Features
//!
//! - Type inference from `type`, `enum` and nullable `anyOf` specs
//! - One control per field: checkbox, number, JSON text, select, text
//! - Per-field and whole-form dirty tracking
//! - Save-time coercion with per-field overrides (`pipelines`, `priority`,
//!   rate-limit fields)
//! - REST client for the pipeline admin API
//! - Selection guard against out-of-order responses
//! - HTML and terminal (Cursive) front ends
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use valveform::data::{FormState, SpecMap, coerce::serialize_form};
//!
//! let specs = SpecMap::from_json(json!({
//!     "priority": {"type": "integer"},
//!     "enabled": {"type": "boolean"},
//! }));
//! let values = json!({"priority": 1, "enabled": false});
//!
//! let mut form = FormState::build(values.as_object().unwrap(), &specs);
//! form.set_text("priority", "").unwrap();
//! assert!(form.has_unsaved_changes());
//!
//! let doc = serialize_form(&form, &specs).unwrap();
//! assert_eq!(doc["priority"], json!(0));
//! ```
//!
//! ## Modules
//!
//! - [`data`] - Specs, form state and save-time coercion
//! - [`api`] - REST client
//! - [`session`] - Selection and save orchestration
//! - [`html`] - HTML rendering
//! - [`ui`] - Terminal editor

#[macro_use]
extern crate log;

/// REST client for the pipeline admin API.
pub mod api;

/// Valve specs, form state and save-time coercion.
pub mod data;

/// Error types.
pub mod error;

/// HTML rendering of valve forms.
pub mod html;

/// Selection and save orchestration.
pub mod session;

/// Cursive-based terminal editor.
pub mod ui;

pub use error::{Result, ValveError};
pub use serde_json::Value;
