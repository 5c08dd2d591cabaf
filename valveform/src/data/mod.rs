//! Valve form data structures.
//!
//! This module turns a pipeline's valve spec and values into editable form
//! state and back into a typed update document:
//!
//! - [`spec`] - Field specs and type inference
//! - [`control`] - Widget choice and initial inputs per field type
//! - [`form`] - Per-field edit state and dirty tracking
//! - [`coerce`] - Save-time conversion to typed JSON

/// Save-time conversion of edited inputs to JSON values.
pub mod coerce;

/// Widget selection and rendering of initial inputs.
pub mod control;

/// Form state and dirty tracking.
pub mod form;

/// Field specs, type inference and nullability.
pub mod spec;

pub use control::{Control, FieldInput, JsonKind};
pub use form::{FieldState, FormState};
pub use spec::{FieldSpec, FieldType, SpecMap, ValveValues};
