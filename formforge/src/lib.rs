//! # formforge
//!
//! Declarative form processing for Rust.
//!
//! This is the meta-crate that re-exports all sub-crates for convenient access.
//! You can depend on `formforge` to get everything, or depend on individual
//! crates for finer-grained control.
//!
//! Types deriving [`FormData`](macro@FormData) through this crate must point
//! the derive at the re-exported forms crate:
//!
//! ```ignore
//! use formforge::FormData;
//!
//! #[derive(FormData)]
//! #[form(crate = "formforge::forms")]
//! struct Login {
//!     #[form_field(min_length = 3)]
//!     user: String,
//! }
//! ```

/// Value model, settings, logging, and error types.
pub use formforge_core as core;

/// Schemas, constraints, transforms, views, and the runtime strategies.
pub use formforge_forms as forms;

/// The unit compiler, generated-unit factories, and [`FormFactory`](codegen::FormFactory).
#[cfg(feature = "codegen")]
pub use formforge_codegen as codegen;

/// Procedural macros.
#[cfg(feature = "macros")]
pub use formforge_macros as macros;

/// `#[derive(FormData)]`.
#[cfg(feature = "macros")]
pub use formforge_macros::FormData;

/// Third-party crates that appear in the public API.
pub use chrono;
pub use serde;
pub use serde_json;
pub use tracing;
pub use tracing_subscriber;
