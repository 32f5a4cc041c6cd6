//! The expression builder.
//!
//! Generators never concatenate unit text by hand. They build [`Expression`]s
//! through the functions in this module, which take care of quoting,
//! literal rendering and single evaluation of non-trivial subexpressions.
//!
//! # Examples
//!
//! ```
//! use formforge_codegen::expr;
//!
//! let value = expr::call("get", [expr::var("$data"), expr::string("name")]);
//! let check = expr::bind(value, |v| {
//!     Ok(expr::if_(expr::call("blank?", [v.clone()]), expr::string("blank"), v))
//! })
//! .unwrap();
//! assert!(check.text().starts_with("(let $t_"));
//! ```

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

use formforge_core::{FieldError, FormResult, FormforgeError, Value};

/// The kind of error outcome an expression produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorShape {
    /// A plain value; no error outcome.
    Value,
    /// Null or one error.
    Single,
    /// A mapping of errors keyed by element, possibly empty.
    Aggregate,
    /// Null, one error, or a nested error tree.
    Either,
}

impl ErrorShape {
    /// Whether the outcome must pass through `errors.flatten` before joining a chain.
    pub const fn needs_flatten(self) -> bool {
        matches!(self, Self::Aggregate | Self::Either)
    }

    fn merge(self, other: Self) -> Self {
        match (self, other) {
            (a, b) if a == b => a,
            (Self::Value, other) | (other, Self::Value) => other,
            _ => Self::Either,
        }
    }
}

/// A fragment of unit text with its error shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    text: String,
    shape: ErrorShape,
    simple: bool,
}

impl Expression {
    fn new(text: String, shape: ErrorShape, simple: bool) -> Self {
        Self {
            text,
            shape,
            simple,
        }
    }

    /// The unit text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub const fn shape(&self) -> ErrorShape {
        self.shape
    }

    /// Literals and variables are simple: repeating them costs nothing.
    pub const fn is_simple(&self) -> bool {
        self.simple
    }

    /// Overrides the error shape.
    #[must_use]
    pub fn with_shape(mut self, shape: ErrorShape) -> Self {
        self.shape = shape;
        self
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// ── Atoms ──────────────────────────────────────────────────────────────

pub fn null() -> Expression {
    Expression::new("null".to_string(), ErrorShape::Value, true)
}

pub fn boolean(value: bool) -> Expression {
    Expression::new(value.to_string(), ErrorShape::Value, true)
}

/// A variable reference. Names start with `$`.
pub fn var(name: &str) -> Expression {
    Expression::new(name.to_string(), ErrorShape::Value, true)
}

/// A quoted string literal.
pub fn string(value: &str) -> Expression {
    Expression::new(quote(value), ErrorShape::Value, true)
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn float_text(value: f64) -> FormResult<String> {
    if value.is_finite() {
        Ok(format!("{value:?}"))
    } else {
        Err(FormforgeError::UnrepresentableLiteral(format!(
            "non-finite float {value}"
        )))
    }
}

/// Renders a value as a literal.
///
/// Dates render as a `date.parse` call, so they are valid expressions but
/// not simple ones. Non-finite floats have no literal form.
pub fn literal(value: &Value) -> FormResult<Expression> {
    let simple = |text: String| Expression::new(text, ErrorShape::Value, true);
    Ok(match value {
        Value::Null => null(),
        Value::Bool(b) => boolean(*b),
        Value::Int(i) => simple(i.to_string()),
        Value::Float(f) => simple(float_text(*f)?),
        Value::String(s) => string(s),
        Value::Date(d) => call(
            "date.parse",
            [
                string(&d.format("%Y-%m-%d").to_string()),
                string("%Y-%m-%d"),
            ],
        ),
        Value::DateTime(dt) => call(
            "date.parse",
            [
                string(&dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
                string("%Y-%m-%dT%H:%M:%S%.f"),
            ],
        ),
        Value::List(items) => {
            let items = items.iter().map(literal).collect::<FormResult<Vec<_>>>()?;
            list(items)
        }
        Value::Map(map) => {
            let entries = map
                .iter()
                .map(|(k, v)| Ok((k.clone(), literal(v)?)))
                .collect::<FormResult<Vec<_>>>()?;
            table(entries)
        }
    })
}

/// Renders plain JSON as a literal.
pub fn json_literal(value: &serde_json::Value) -> FormResult<Expression> {
    let simple = |text: String| Expression::new(text, ErrorShape::Value, true);
    Ok(match value {
        serde_json::Value::Null => null(),
        serde_json::Value::Bool(b) => boolean(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                simple(i.to_string())
            } else if n.is_u64() {
                return Err(FormforgeError::UnrepresentableLiteral(format!(
                    "integer {n} exceeds the signed 64-bit range"
                )));
            } else {
                simple(float_text(n.as_f64().unwrap_or(f64::NAN))?)
            }
        }
        serde_json::Value::String(s) => string(s),
        serde_json::Value::Array(items) => {
            list(items.iter().map(json_literal).collect::<FormResult<Vec<_>>>()?)
        }
        serde_json::Value::Object(map) => {
            let mut entries = map
                .iter()
                .map(|(k, v)| Ok((k.clone(), json_literal(v)?)))
                .collect::<FormResult<Vec<_>>>()?;
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            table(entries)
        }
    })
}

/// A list literal `[a b c]`.
pub fn list(items: Vec<Expression>) -> Expression {
    let simple = items.iter().all(Expression::is_simple);
    let text = items
        .iter()
        .map(Expression::text)
        .collect::<Vec<_>>()
        .join(" ");
    Expression::new(format!("[{text}]"), ErrorShape::Value, simple)
}

/// A map literal `{"k" v}`.
pub fn table(entries: Vec<(String, Expression)>) -> Expression {
    let simple = entries.iter().all(|(_, v)| v.is_simple());
    let text = entries
        .iter()
        .map(|(k, v)| format!("{} {}", quote(k), v.text()))
        .collect::<Vec<_>>()
        .join(" ");
    Expression::new(format!("{{{text}}}"), ErrorShape::Value, simple)
}

/// Re-creates a strategy from its serialized form: `(<head> "<kind>" {params})`.
///
/// The strategy is serialized with serde, its `kind` tag becomes the second
/// element and every remaining field becomes a parameter.
pub fn strategy<S: Serialize>(head: &str, strategy: &S) -> FormResult<Expression> {
    let json = serde_json::to_value(strategy)
        .map_err(|e| FormforgeError::Serialization(format!("cannot serialize {head}: {e}")))?;
    let serde_json::Value::Object(mut params) = json else {
        return Err(FormforgeError::UnrepresentableLiteral(format!(
            "{head} does not serialize to a tagged object"
        )));
    };
    let Some(serde_json::Value::String(kind)) = params.remove("kind") else {
        return Err(FormforgeError::UnrepresentableLiteral(format!(
            "{head} has no kind tag"
        )));
    };
    let params = json_literal(&serde_json::Value::Object(params))?;
    Ok(call(head, [string(&kind), params]))
}

/// Re-creates an untagged struct from its serialized form: `(<head> {fields})`.
pub fn struct_literal<S: Serialize>(head: &str, value: &S) -> FormResult<Expression> {
    let json = serde_json::to_value(value)
        .map_err(|e| FormforgeError::Serialization(format!("cannot serialize {head}: {e}")))?;
    Ok(call(head, [json_literal(&json)?]))
}

// ── Compound forms ─────────────────────────────────────────────────────

/// A builtin call `(name args..)`.
pub fn call(name: &str, args: impl IntoIterator<Item = Expression>) -> Expression {
    let mut text = format!("({name}");
    for arg in args {
        text.push(' ');
        text.push_str(arg.text());
    }
    text.push(')');
    Expression::new(text, ErrorShape::Value, false)
}

/// `(?? a b ..)`: the first non-null result, evaluated left to right.
pub fn coalesce(items: Vec<Expression>) -> Expression {
    match items.len() {
        0 => null(),
        1 => items.into_iter().next().unwrap_or_else(null),
        _ => {
            let shape = items
                .iter()
                .map(Expression::shape)
                .reduce(ErrorShape::merge)
                .unwrap_or(ErrorShape::Value);
            call("??", items).with_shape(shape)
        }
    }
}

/// `(if cond then otherwise)`.
pub fn if_(cond: Expression, then: Expression, otherwise: Expression) -> Expression {
    let shape = then.shape.merge(otherwise.shape);
    call("if", [cond, then, otherwise]).with_shape(shape)
}

/// `(each $var list body)`: evaluates `body` per element, collecting errors by index.
pub fn each(var_name: &str, items: Expression, body: Expression) -> Expression {
    call("each", [var(var_name), items, body]).with_shape(ErrorShape::Aggregate)
}

/// An error literal carrying the message template, code and parameters.
pub fn error(error: &FieldError) -> Expression {
    let params = error
        .params
        .iter()
        .map(|(k, v)| (k.clone(), string(v)))
        .collect();
    call(
        "error",
        [string(&error.message), string(&error.code), table(params)],
    )
    .with_shape(ErrorShape::Single)
}

/// Normalizes an aggregate or nested outcome to null or one error node.
pub fn flatten(expr: Expression) -> Expression {
    if expr.shape.needs_flatten() {
        call("errors.flatten", [expr]).with_shape(ErrorShape::Either)
    } else {
        expr
    }
}

/// A deterministic temporary variable name derived from the expression text.
pub fn temp_name(expr: &Expression) -> String {
    let digest = Sha256::digest(expr.text.as_bytes());
    let hex: String = digest.iter().take(6).map(|b| format!("{b:02x}")).collect();
    format!("$t_{hex}")
}

/// Makes `expr` available to `body` so that it is evaluated at most once.
///
/// Simple expressions are handed over as they are. Anything else is bound to
/// a temporary with `(let $t_.. expr body)`.
pub fn bind(
    expr: Expression,
    body: impl FnOnce(Expression) -> FormResult<Expression>,
) -> FormResult<Expression> {
    if expr.simple {
        return body(expr);
    }
    let name = temp_name(&expr);
    let inner = body(var(&name))?;
    let shape = inner.shape;
    Ok(call("let", [var(&name), expr, inner]).with_shape(shape))
}
