//! Evaluation of parsed units.

use std::collections::BTreeMap;
use std::sync::Arc;

use formforge_core::{ErrorMap, ErrorNode, FieldError, FormResult, FormforgeError, Value, ValueMap};
use formforge_forms::{
    Constraint, FieldView, FormView, StrategyRegistry, Transform, Transformed, ViewConfig,
};

use super::ast::{Expr, FieldStmt, Unit};

/// A runtime value of the unit language.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Value(Value),
    /// A single error outcome.
    Error(ErrorNode),
    /// Per-element outcomes collected by `each`.
    Errors(BTreeMap<String, ErrorNode>),
    View(FieldView),
    Constraint(Arc<Constraint>),
    Transform(Arc<Transform>),
    ViewConfig(Arc<ViewConfig>),
}

impl Datum {
    pub const NULL: Self = Self::Value(Value::Null);

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Value(Value::Null))
    }

    /// Everything except null, `false`, and an empty error collection is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Value(Value::Null | Value::Bool(false)) => false,
            Self::Errors(errors) => !errors.is_empty(),
            _ => true,
        }
    }

    /// A short description used in fault messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Value(value) => value.type_name(),
            Self::Error(_) => "error",
            Self::Errors(_) => "errors",
            Self::View(_) => "view",
            Self::Constraint(_) => "constraint",
            Self::Transform(_) => "transform",
            Self::ViewConfig(_) => "view config",
        }
    }
}

impl From<bool> for Datum {
    fn from(b: bool) -> Self {
        Self::Value(Value::Bool(b))
    }
}

impl From<String> for Datum {
    fn from(s: String) -> Self {
        Self::Value(Value::String(s))
    }
}

/// Why an expression did not produce a datum.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// A transform step rejected its input; reported against the field.
    Field(FieldError),
    /// The unit itself is broken.
    Fault(String),
}

impl From<FieldError> for EvalError {
    fn from(error: FieldError) -> Self {
        Self::Field(error)
    }
}

/// Evaluates expressions against a lexical scope.
pub struct Evaluator<'a> {
    registry: &'a StrategyRegistry,
    scope: Vec<(String, Datum)>,
}

impl<'a> Evaluator<'a> {
    pub fn new(registry: &'a StrategyRegistry) -> Self {
        Self {
            registry,
            scope: Vec::new(),
        }
    }

    /// Binds a method parameter for the rest of this evaluator's life.
    #[must_use]
    pub fn bind(mut self, name: &str, datum: Datum) -> Self {
        self.scope.push((name.to_string(), datum));
        self
    }

    fn lookup(&self, name: &str) -> Result<Datum, EvalError> {
        self.scope
            .iter()
            .rev()
            .find(|(bound, _)| bound == name)
            .map(|(_, datum)| datum.clone())
            .ok_or_else(|| EvalError::Fault(format!("unbound variable {name}")))
    }

    fn value(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        match self.eval(expr)? {
            Datum::Value(value) => Ok(value),
            other => Err(EvalError::Fault(format!(
                "expected a value inside a collection, found {}",
                other.describe()
            ))),
        }
    }

    fn scoped(&mut self, name: &str, datum: Datum, body: &Expr) -> Result<Datum, EvalError> {
        self.scope.push((name.to_string(), datum));
        let result = self.eval(body);
        self.scope.pop();
        result
    }

    /// Evaluates one expression.
    ///
    /// # Errors
    ///
    /// See [`EvalError`].
    pub fn eval(&mut self, expr: &Expr) -> Result<Datum, EvalError> {
        match expr {
            Expr::Literal(value) => Ok(Datum::Value(value.clone())),
            Expr::List(items) => {
                let items = items
                    .iter()
                    .map(|item| self.value(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Datum::Value(Value::List(items)))
            }
            Expr::Map(entries) => {
                let mut map = ValueMap::new();
                for (key, item) in entries {
                    let value = self.value(item)?;
                    map.insert(key.clone(), value);
                }
                Ok(Datum::Value(Value::Map(map)))
            }
            Expr::Var(name) => self.lookup(name),
            Expr::Let { name, value, body } => {
                let bound = self.eval(value)?;
                self.scoped(name, bound, body)
            }
            Expr::Coalesce(items) => {
                for item in items {
                    let datum = self.eval(item)?;
                    if !datum.is_null() {
                        return Ok(datum);
                    }
                }
                Ok(Datum::NULL)
            }
            Expr::If {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond)?.is_truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            Expr::Each { var, list, body } => {
                let items = match self.eval(list)? {
                    Datum::Value(Value::List(items)) => items,
                    _ => Vec::new(),
                };
                let mut errors = BTreeMap::new();
                for (index, item) in items.into_iter().enumerate() {
                    match self.scoped(var, Datum::Value(item), body)? {
                        Datum::Value(Value::Null) => {}
                        Datum::Error(node) => {
                            errors.insert(index.to_string(), node);
                        }
                        Datum::Errors(inner) if inner.is_empty() => {}
                        Datum::Errors(inner) => {
                            errors.insert(index.to_string(), ErrorNode::Tree(inner));
                        }
                        other => {
                            return Err(EvalError::Fault(format!(
                                "each body produced {}",
                                other.describe()
                            )))
                        }
                    }
                }
                Ok(Datum::Errors(errors))
            }
            Expr::Constraint(c) => Ok(Datum::Constraint(Arc::clone(c))),
            Expr::Transform(t) => Ok(Datum::Transform(Arc::clone(t))),
            Expr::ViewConfig(c) => Ok(Datum::ViewConfig(Arc::clone(c))),
            Expr::Call { builtin, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                builtin.apply(args, self.registry)
            }
        }
    }
}

fn fault(unit: &Unit, method: &str, stmt: &FieldStmt, message: &str) -> FormforgeError {
    FormforgeError::Evaluation(format!(
        "{} {}.{} field '{}': {message}",
        unit.kind, unit.name, method, stmt.field
    ))
}

fn statements<'u>(unit: &'u Unit, method: &str) -> FormResult<&'u [FieldStmt]> {
    unit.method(method)
        .map(|m| m.fields.as_slice())
        .ok_or_else(|| {
            FormforgeError::Evaluation(format!("{} {} has no method '{method}'", unit.kind, unit.name))
        })
}

/// Runs a validator unit's `validate` method.
///
/// # Errors
///
/// Returns [`FormforgeError::Evaluation`] if the unit faults.
pub fn run_validate(
    unit: &Unit,
    registry: &StrategyRegistry,
    data: &ValueMap,
    prior: &ErrorMap,
) -> FormResult<ErrorMap> {
    let mut errors = prior.clone();
    let mut evaluator = Evaluator::new(registry).bind("$data", Datum::Value(Value::Map(data.clone())));
    for stmt in statements(unit, "validate")? {
        if prior.contains_key(&stmt.field) {
            continue;
        }
        match evaluator.eval(&stmt.expr) {
            Ok(Datum::Value(Value::Null)) => {}
            Ok(Datum::Error(node)) => {
                errors.insert(stmt.field.clone(), node);
            }
            Ok(Datum::Errors(inner)) if inner.is_empty() => {}
            Ok(Datum::Errors(inner)) => {
                errors.insert(stmt.field.clone(), ErrorNode::Tree(inner));
            }
            Ok(other) => {
                return Err(fault(
                    unit,
                    "validate",
                    stmt,
                    &format!("produced {}", other.describe()),
                ))
            }
            Err(EvalError::Field(error)) => {
                errors.insert(stmt.field.clone(), error.into());
            }
            Err(EvalError::Fault(message)) => return Err(fault(unit, "validate", stmt, &message)),
        }
    }
    Ok(errors)
}

/// Runs a transformer unit's `from-wire` or `to-wire` method.
///
/// # Errors
///
/// Returns [`FormforgeError::Evaluation`] if the unit faults.
pub fn run_transform(
    unit: &Unit,
    method: &str,
    registry: &StrategyRegistry,
    input: &ValueMap,
) -> FormResult<Transformed> {
    let mut out = Transformed::default();
    let mut evaluator = Evaluator::new(registry).bind("$input", Datum::Value(Value::Map(input.clone())));
    for stmt in statements(unit, method)? {
        match evaluator.eval(&stmt.expr) {
            Ok(Datum::Value(value)) => {
                out.values.insert(stmt.key.clone(), value);
            }
            Ok(other) => {
                return Err(fault(unit, method, stmt, &format!("produced {}", other.describe())))
            }
            Err(EvalError::Field(error)) => {
                out.errors.insert(stmt.field.clone(), error.into());
            }
            Err(EvalError::Fault(message)) => return Err(fault(unit, method, stmt, &message)),
        }
    }
    Ok(out)
}

fn run_views(unit: &Unit, method: &str, mut evaluator: Evaluator<'_>) -> FormResult<FormView> {
    let mut fields = Vec::new();
    for stmt in statements(unit, method)? {
        match evaluator.eval(&stmt.expr) {
            Ok(Datum::View(view)) => fields.push(view),
            Ok(other) => {
                return Err(fault(unit, method, stmt, &format!("produced {}", other.describe())))
            }
            Err(EvalError::Field(error)) => {
                return Err(fault(unit, method, stmt, &error.rendered()))
            }
            Err(EvalError::Fault(message)) => return Err(fault(unit, method, stmt, &message)),
        }
    }
    Ok(FormView { fields })
}

fn parent_datum(parent: Option<&str>) -> Datum {
    parent.map_or(Datum::NULL, |p| Datum::from(p.to_string()))
}

/// Runs an instantiator unit's `submitted` method.
///
/// # Errors
///
/// Returns [`FormforgeError::Evaluation`] if the unit faults.
pub fn run_submitted(
    unit: &Unit,
    registry: &StrategyRegistry,
    values: &ValueMap,
    errors: &ErrorMap,
    parent: Option<&str>,
) -> FormResult<FormView> {
    let evaluator = Evaluator::new(registry)
        .bind("$values", Datum::Value(Value::Map(values.clone())))
        .bind("$errors", Datum::Errors(errors.clone()))
        .bind("$parent", parent_datum(parent));
    run_views(unit, "submitted", evaluator)
}

/// Runs an instantiator unit's `default` method.
///
/// # Errors
///
/// Returns [`FormforgeError::Evaluation`] if the unit faults.
pub fn run_default(
    unit: &Unit,
    registry: &StrategyRegistry,
    parent: Option<&str>,
) -> FormResult<FormView> {
    let evaluator = Evaluator::new(registry).bind("$parent", parent_datum(parent));
    run_views(unit, "default", evaluator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::builtins::Builtin;

    fn call(builtin: Builtin, args: Vec<Expr>) -> Expr {
        Expr::Call { builtin, args }
    }

    fn lit(value: impl Into<Value>) -> Expr {
        Expr::Literal(value.into())
    }

    fn eval(expr: &Expr) -> Result<Datum, EvalError> {
        let registry = StrategyRegistry::new();
        Evaluator::new(&registry).eval(expr)
    }

    #[test]
    fn test_coalesce_is_lazy() {
        // The second operand would fault if evaluated.
        let expr = Expr::Coalesce(vec![lit("first"), Expr::Var("$missing".into())]);
        assert_eq!(eval(&expr).unwrap(), Datum::from("first".to_string()));

        let expr = Expr::Coalesce(vec![lit(Value::Null), lit(2_i64)]);
        assert_eq!(eval(&expr).unwrap(), Datum::Value(Value::Int(2)));
        assert_eq!(eval(&Expr::Coalesce(vec![])).unwrap(), Datum::NULL);
    }

    #[test]
    fn test_let_scopes_nest() {
        let expr = Expr::Let {
            name: "$t".into(),
            value: Box::new(lit(1_i64)),
            body: Box::new(Expr::List(vec![
                Expr::Var("$t".into()),
                Expr::Let {
                    name: "$t".into(),
                    value: Box::new(lit(2_i64)),
                    body: Box::new(Expr::Var("$t".into())),
                },
            ])),
        };
        assert_eq!(
            eval(&expr).unwrap(),
            Datum::Value(Value::List(vec![Value::Int(1), Value::Int(2)]))
        );
    }

    #[test]
    fn test_each_collects_by_index() {
        let body = Expr::If {
            cond: Box::new(call(Builtin::Blank, vec![Expr::Var("$item".into())])),
            then: Box::new(call(
                Builtin::Error,
                vec![lit("blank"), lit("is_blank"), lit(Value::Map(ValueMap::new()))],
            )),
            otherwise: Box::new(lit(Value::Null)),
        };
        let expr = Expr::Each {
            var: "$item".into(),
            list: Box::new(lit(Value::List(vec![Value::from("a"), Value::from("")]))),
            body: Box::new(body.clone()),
        };
        let Datum::Errors(errors) = eval(&expr).unwrap() else {
            panic!("expected errors");
        };
        assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["1"]);

        let not_a_list = Expr::Each {
            var: "$item".into(),
            list: Box::new(lit("abc")),
            body: Box::new(body),
        };
        assert_eq!(eval(&not_a_list).unwrap(), Datum::Errors(BTreeMap::new()));
    }

    #[test]
    fn test_unbound_variable_faults() {
        assert!(matches!(
            eval(&Expr::Var("$nope".into())),
            Err(EvalError::Fault(_))
        ));
    }

    #[test]
    fn test_transform_error_surfaces_as_field_error() {
        let expr = call(Builtin::CastFloat, vec![lit("abc")]);
        assert!(matches!(eval(&expr), Err(EvalError::Field(e)) if e.code == "not_a_number"));
    }
}
