//! # valvectl
//!
//! Command-line administration of pipeline valves.
//!
//! `valvectl` connects to a pipeline backend and lets you inspect and edit
//! the valves (settings) of each pipeline, either one assignment at a time
//! or in a full-screen terminal form.
//!
//! ## Features
//!
//! - **Listing**: pipelines with their type and location
//! - **Inspection**: typed valve values, or the settings panel as HTML
//! - **Editing**: `key=value` assignments or an interactive editor with
//!   dirty tracking and confirmation before discarding changes
//! - **Management**: upload and delete pipeline files
//!
//! ## Modules
//!
//! - [`config`] - `valvectl.toml` loading
//! - [`ctx`] - Application context
//! - [`edit`] - Interactive editor loop
//! - [`pipelines`] - Non-interactive commands
//! - [`utils`] - Common utilities and helper functions

/// Configuration file loading.
pub mod config;

/// Application context and state management.
pub mod ctx;

/// Interactive valve editor.
pub mod edit;

/// Pipeline listing, inspection and management commands.
pub mod pipelines;

/// Common utilities and helper functions.
pub mod utils;

#[macro_use]
extern crate log;

pub use valveform;
