//! Error types for formforge.
//!
//! Two very different kinds of failure live here:
//!
//! - [`FieldError`] and [`ErrorNode`] are *data*. They describe why a submitted
//!   field was rejected and are returned as part of normal results, never as `Err`.
//! - [`FormforgeError`] covers operational failures: generation-time programmer
//!   errors, storage problems, and corrupt generated units.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single validation failure for one field.
///
/// The message is a template; `{name}` placeholders are filled from `params`
/// by [`rendered`](Self::rendered). The `code` is stable and meant for
/// programmatic matching.
///
/// # Examples
///
/// ```
/// use formforge_core::error::FieldError;
///
/// let err = FieldError::new("It should have {limit} characters or more.", "too_short")
///     .with_param("limit", "5");
/// assert_eq!(err.rendered(), "It should have 5 characters or more.");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// The message template.
    pub message: String,
    /// Named placeholder values.
    pub params: BTreeMap<String, String>,
    /// A short code identifying the failure (e.g. "is_blank", "too_short").
    pub code: String,
}

impl FieldError {
    /// Creates a new `FieldError` with a message template and code.
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            params: BTreeMap::new(),
            code: code.into(),
        }
    }

    /// Adds a placeholder parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Returns the message with every `{name}` placeholder replaced.
    pub fn rendered(&self) -> String {
        self.params
            .iter()
            .fold(self.message.clone(), |msg, (key, value)| {
                msg.replace(&format!("{{{key}}}"), value)
            })
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rendered())
    }
}

/// The error outcome of a single field.
///
/// A field either has one [`FieldError`] or, for list and composite fields, a
/// nested mapping of errors keyed by element index or sub-field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorNode {
    /// One failure.
    Leaf(FieldError),
    /// Failures of nested elements.
    Tree(BTreeMap<String, ErrorNode>),
}

impl ErrorNode {
    /// Returns the leaf error, if this node is one.
    pub const fn as_leaf(&self) -> Option<&FieldError> {
        match self {
            Self::Leaf(err) => Some(err),
            Self::Tree(_) => None,
        }
    }

    /// Looks up a nested node by key.
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Leaf(_) => None,
            Self::Tree(children) => children.get(key),
        }
    }

    /// Returns the first leaf in key order.
    pub fn first(&self) -> Option<&FieldError> {
        match self {
            Self::Leaf(err) => Some(err),
            Self::Tree(children) => children.values().find_map(Self::first),
        }
    }
}

impl From<FieldError> for ErrorNode {
    fn from(err: FieldError) -> Self {
        Self::Leaf(err)
    }
}

impl fmt::Display for ErrorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf(err) => write!(f, "{err}"),
            Self::Tree(children) => {
                let mut first = true;
                for (key, child) in children {
                    if !first {
                        write!(f, "; ")?;
                    }
                    write!(f, "{key}: {child}")?;
                    first = false;
                }
                Ok(())
            }
        }
    }
}

/// Errors of a whole form, keyed by field name.
pub type ErrorMap = BTreeMap<String, ErrorNode>;

/// The operational error type for formforge.
///
/// None of these variants describe bad user input; that is reported through
/// [`ErrorMap`]. These are configuration, generation, and storage failures.
#[derive(Error, Debug)]
pub enum FormforgeError {
    // ── Generation ───────────────────────────────────────────────────

    /// A value has no literal form in unit text.
    #[error("Unrepresentable literal: {0}")]
    UnrepresentableLiteral(String),

    /// An emitter was driven out of order.
    #[error("Emitter state error: {0}")]
    EmitterState(String),

    // ── Configuration ────────────────────────────────────────────────

    /// A schema, registry, or setting is invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A generated unit could not be persisted.
    #[error("Cannot write generated unit to '{}': {source}", path.display())]
    Storage {
        /// The target location.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    // ── Generated units ──────────────────────────────────────────────

    /// Unit text is not syntactically valid.
    #[error("Unit syntax error at line {line}: {message}")]
    UnitSyntax {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// A parsed unit does not satisfy the expected contract.
    #[error("Unit contract violation: {0}")]
    UnitContract(String),

    /// A unit failed while executing.
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    // ── Data ─────────────────────────────────────────────────────────

    /// An error occurred during serialization or deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Native data could not be built from validated values.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FormforgeError {
    /// Returns `true` for errors meaning "this persisted unit is unusable".
    ///
    /// The loader recovers from these by rebuilding the unit.
    pub const fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::UnitSyntax { .. } | Self::UnitContract(_) | Self::Serialization(_)
        )
    }
}

/// A convenience type alias for `Result<T, FormforgeError>`.
pub type FormResult<T> = Result<T, FormforgeError>;
