//! Class emitters.
//!
//! An emitter assembles per-field expressions into one unit. All three
//! emitters follow the same life cycle:
//!
//! ```text
//! Declaring --append--> Appending --finalize--> Finalized
//! ```
//!
//! Fields are declared first, expressions are appended per declared field,
//! and `finalize` renders the unit text exactly once.

pub mod instantiator;
pub mod transformer;
pub mod validator;

use std::fmt::Write as _;

use formforge_core::{FormResult, FormforgeError};

use crate::expr::Expression;
use crate::unit::{UnitKind, UNIT_HEADER};

pub use instantiator::InstantiatorEmitter;
pub use transformer::{StepClosure, TransformerEmitter};
pub use validator::{ConstraintClosure, ValidatorEmitter};

/// Where an emitter is in its life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterState {
    Declaring,
    Appending,
    Finalized,
}

/// Enforces the emitter life cycle.
#[derive(Debug, Clone)]
pub(crate) struct Lifecycle {
    state: EmitterState,
    kind: UnitKind,
}

impl Lifecycle {
    pub(crate) const fn new(kind: UnitKind) -> Self {
        Self {
            state: EmitterState::Declaring,
            kind,
        }
    }

    pub(crate) const fn state(&self) -> EmitterState {
        self.state
    }

    fn misuse(&self, message: &str) -> FormforgeError {
        FormforgeError::EmitterState(format!("{} emitter: {message}", self.kind))
    }

    pub(crate) fn declare(&self) -> FormResult<()> {
        match self.state {
            EmitterState::Declaring => Ok(()),
            EmitterState::Appending => {
                Err(self.misuse("fields must be declared before expressions are appended"))
            }
            EmitterState::Finalized => Err(self.misuse("cannot declare fields after finalize")),
        }
    }

    pub(crate) fn append(&mut self) -> FormResult<()> {
        match self.state {
            EmitterState::Declaring | EmitterState::Appending => {
                self.state = EmitterState::Appending;
                Ok(())
            }
            EmitterState::Finalized => Err(self.misuse("cannot append after finalize")),
        }
    }

    pub(crate) fn finalize(&mut self) -> FormResult<()> {
        if self.state == EmitterState::Finalized {
            return Err(self.misuse("already finalized"));
        }
        self.state = EmitterState::Finalized;
        Ok(())
    }

    pub(crate) fn undeclared(&self, field: &str) -> FormforgeError {
        self.misuse(&format!("field '{field}' was not declared"))
    }

    pub(crate) fn duplicate(&self, field: &str) -> FormforgeError {
        self.misuse(&format!("field '{field}' declared twice"))
    }
}

/// Renders unit text.
#[derive(Debug)]
pub struct UnitWriter {
    out: String,
    open_method: bool,
}

fn quote(s: &str) -> String {
    crate::expr::string(s).text().to_string()
}

impl UnitWriter {
    /// Starts a unit with its header form.
    pub fn new(kind: UnitKind, name: &str, fingerprint: &str) -> Self {
        let mut out = String::new();
        let _ = writeln!(out, "{UNIT_HEADER}");
        let _ = write!(out, "(unit {kind} {} {}", quote(name), quote(fingerprint));
        Self {
            out,
            open_method: false,
        }
    }

    fn close_method(&mut self) {
        if self.open_method {
            self.out.push(')');
            self.open_method = false;
        }
    }

    /// Opens a method; the previous one is closed.
    pub fn method(&mut self, name: &str) -> &mut Self {
        self.close_method();
        let _ = write!(self.out, "\n  (method {name}");
        self.open_method = true;
        self
    }

    /// Writes one field statement into the open method.
    pub fn field(&mut self, field: &str, key: &str, expression: &Expression) -> &mut Self {
        let _ = write!(
            self.out,
            "\n    (field {} {}\n      {})",
            quote(field),
            quote(key),
            expression
        );
        self
    }

    /// Closes everything and returns the text.
    pub fn finish(mut self) -> String {
        self.close_method();
        self.out.push_str(")\n");
        self.out
    }
}
