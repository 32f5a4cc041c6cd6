//! The parsed form of a generated unit.

use std::fmt;
use std::sync::Arc;

use formforge_core::{FormResult, FormforgeError, Value};
use formforge_forms::{Constraint, Transform, ViewConfig};

use super::builtins::Builtin;

/// Which strategy contract a unit implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    Validator,
    Transformer,
    Instantiator,
}

impl UnitKind {
    /// The keyword used in the unit header.
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Validator => "validator",
            Self::Transformer => "transformer",
            Self::Instantiator => "instantiator",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "validator" => Some(Self::Validator),
            "transformer" => Some(Self::Transformer),
            "instantiator" => Some(Self::Instantiator),
            _ => None,
        }
    }

    /// The methods a unit of this kind must define, in emission order.
    pub const fn methods(self) -> &'static [&'static str] {
        match self {
            Self::Validator => &["validate"],
            Self::Transformer => &["from-wire", "to-wire"],
            Self::Instantiator => &["submitted", "default"],
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// The variables bound on entry to a method.
pub fn method_params(method: &str) -> Option<&'static [&'static str]> {
    match method {
        "validate" => Some(&["$data"]),
        "from-wire" | "to-wire" => Some(&["$input"]),
        "submitted" => Some(&["$values", "$errors", "$parent"]),
        "default" => Some(&["$parent"]),
        _ => None,
    }
}

/// A parsed unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub kind: UnitKind,
    pub name: String,
    pub fingerprint: String,
    pub methods: Vec<Method>,
}

impl Unit {
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Verifies that this unit is the one the loader asked for.
    ///
    /// # Errors
    ///
    /// Returns [`FormforgeError::UnitContract`] on a kind, name or fingerprint
    /// mismatch, or when a required method is missing.
    pub fn check_contract(&self, kind: UnitKind, name: &str, fingerprint: &str) -> FormResult<()> {
        if self.kind != kind {
            return Err(FormforgeError::UnitContract(format!(
                "expected a {kind} unit, found a {} unit",
                self.kind
            )));
        }
        if self.name != name {
            return Err(FormforgeError::UnitContract(format!(
                "expected unit '{name}', found '{}'",
                self.name
            )));
        }
        if self.fingerprint != fingerprint {
            return Err(FormforgeError::UnitContract(format!(
                "unit '{name}' is stale (fingerprint {} != {fingerprint})",
                self.fingerprint
            )));
        }
        for method in kind.methods() {
            if self.method(method).is_none() {
                return Err(FormforgeError::UnitContract(format!(
                    "unit '{name}' does not define method '{method}'"
                )));
            }
        }
        Ok(())
    }
}

/// One method: an ordered list of field statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    pub fields: Vec<FieldStmt>,
}

/// `(field "<name>" "<key>" expr)`.
///
/// `name` is the field the statement belongs to (errors are keyed by it);
/// `key` is where a produced value is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldStmt {
    pub field: String,
    pub key: String,
    pub expr: Expr,
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A constant, including folded list and map literals.
    Literal(Value),
    /// A list with non-constant elements.
    List(Vec<Expr>),
    /// A map with non-constant values.
    Map(Vec<(String, Expr)>),
    Var(String),
    Let {
        name: String,
        value: Box<Expr>,
        body: Box<Expr>,
    },
    /// The first non-null operand; later operands are not evaluated.
    Coalesce(Vec<Expr>),
    If {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// Evaluates `body` per element of `list` with `var` bound, collecting errors by index.
    Each {
        var: String,
        list: Box<Expr>,
        body: Box<Expr>,
    },
    /// A reconstructed constraint.
    Constraint(Arc<Constraint>),
    /// A reconstructed transform step.
    Transform(Arc<Transform>),
    /// A reconstructed view configuration.
    ViewConfig(Arc<ViewConfig>),
    Call {
        builtin: Builtin,
        args: Vec<Expr>,
    },
}
