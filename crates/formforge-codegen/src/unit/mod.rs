//! The generated-unit language.
//!
//! A unit is the persisted, compiled form of one strategy object. Its text
//! is an s-expression document:
//!
//! ```text
//! ; Generated by formforge. Do not edit.
//! (unit validator "app_SignupValidator" "<fingerprint>"
//!   (method validate
//!     (field "username" "username"
//!       (let $t_3f09a1c2b4d5 (get $data "username")
//!         (?? (if (blank? $t_3f09a1c2b4d5) (error "..." "is_blank" {}) null)
//!             ...)))))
//! ```
//!
//! Loading a unit means [`parse_unit`] followed by
//! [`Unit::check_contract`]; running one goes through [`eval`].

pub mod ast;
pub mod builtins;
pub mod eval;
pub mod lexer;
pub mod parser;

use sha2::{Digest, Sha256};

pub use ast::{Expr, FieldStmt, Method, Unit, UnitKind};
pub use builtins::Builtin;
pub use parser::parse_unit;

/// Bumped whenever generated text would change for an unchanged schema.
pub const UNIT_FORMAT_VERSION: u32 = 1;

/// The first line of every unit.
pub const UNIT_HEADER: &str = "; Generated by formforge. Do not edit.";

/// File extension of persisted units.
pub const UNIT_EXTENSION: &str = "ffu";

/// Digest identifying the schema and unit format a unit was generated from.
pub fn unit_fingerprint(schema_fingerprint: &str) -> String {
    let digest = Sha256::digest(format!("{UNIT_FORMAT_VERSION}:{schema_fingerprint}").as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
