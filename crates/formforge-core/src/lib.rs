//! # formforge-core
//!
//! Core types, settings, and error types for formforge.
//! This crate has no framework dependencies and provides the foundation for all other crates.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy, field errors, and result aliases
//! - [`value`] - The loosely-typed [`Value`] model shared by wire and native data
//! - [`settings`] - Compilation mode, unit storage, and logging configuration
//! - [`settings_loader`] - Loading settings from TOML/JSON files and the environment
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;
pub mod value;

// Re-export the most commonly used types at the crate root.
pub use error::{ErrorMap, ErrorNode, FieldError, FormResult, FormforgeError};
pub use settings::{CompileMode, Settings};
pub use value::{FromValue, ToValue, Value, ValueMap};
