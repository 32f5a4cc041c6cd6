//! Validation constraints.
//!
//! [`Constraint`] is a closed, serializable set of validation rules. Each
//! variant is interpreted by [`Constraint::validate`]; the free functions in
//! this module are the building blocks of that interpretation and are reused
//! verbatim by generated units, which is what keeps both execution paths in
//! agreement.
//!
//! Every constraint except [`Constraint::NotBlank`] accepts an absent value
//! (null or the empty string). Requiredness is expressed with `NotBlank` alone.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use formforge_core::{ErrorNode, FieldError, Value, ValueMap};

use crate::registry::StrategyRegistry;

pub const NOT_BLANK_MESSAGE: &str = "This value should not be blank.";
pub const TOO_SHORT_MESSAGE: &str =
    "This value is too short. It should have {limit} characters or more.";
pub const TOO_LONG_MESSAGE: &str =
    "This value is too long. It should have {limit} characters or less.";
pub const NOT_NUMERIC_MESSAGE: &str = "This value should be a valid number.";
pub const TOO_LOW_MESSAGE: &str = "This value should be {limit} or more.";
pub const TOO_HIGH_MESSAGE: &str = "This value should be {limit} or less.";
pub const INVALID_FORMAT_MESSAGE: &str = "This value is not valid.";
pub const INVALID_EMAIL_MESSAGE: &str = "This value is not a valid email address.";
pub const NO_SUCH_CHOICE_MESSAGE: &str = "The value you selected is not a valid choice.";
pub const UNKNOWN_CONSTRAINT_MESSAGE: &str = "Constraint \"{name}\" is not registered.";

/// A validation rule attached to a field.
///
/// Serialized with a `kind` tag so generated units can reconstruct any
/// constraint from its literal form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    /// Rejects null, the empty string, and the empty list.
    NotBlank {
        /// Overrides the default message.
        #[serde(default)]
        message: Option<String>,
    },
    /// Bounds the character count of a string or the length of a list.
    Length {
        /// Minimum length (inclusive).
        #[serde(default)]
        min: Option<usize>,
        /// Maximum length (inclusive).
        #[serde(default)]
        max: Option<usize>,
    },
    /// Bounds a numeric value.
    Range {
        /// Minimum value (inclusive).
        #[serde(default)]
        min: Option<f64>,
        /// Maximum value (inclusive).
        #[serde(default)]
        max: Option<f64>,
    },
    /// Requires a string to match a regular expression.
    Pattern {
        /// The regex pattern.
        pattern: String,
        /// Overrides the default message.
        #[serde(default)]
        message: Option<String>,
    },
    /// Requires a plausible email address.
    Email,
    /// Restricts the value to a fixed set.
    Choice {
        /// Accepted values.
        choices: Vec<Value>,
        /// Whether the value is a list whose every element must be accepted.
        #[serde(default)]
        multiple: bool,
    },
    /// Applies a constraint chain to every element of a list.
    ///
    /// Errors are reported per element, keyed by index.
    Each {
        /// The per-element chain.
        constraints: Vec<Constraint>,
    },
    /// Applies a chain and reports its first failure.
    All {
        /// The chain.
        constraints: Vec<Constraint>,
    },
    /// A constraint registered in the [`StrategyRegistry`].
    Custom {
        /// The registered name.
        name: String,
        /// Options handed to the constraint.
        #[serde(default)]
        options: ValueMap,
    },
}

impl Constraint {
    /// Shorthand for a `NotBlank` with the default message.
    pub const fn not_blank() -> Self {
        Self::NotBlank { message: None }
    }

    /// The serialized `kind` tag of this variant.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotBlank { .. } => "not_blank",
            Self::Length { .. } => "length",
            Self::Range { .. } => "range",
            Self::Pattern { .. } => "pattern",
            Self::Email => "email",
            Self::Choice { .. } => "choice",
            Self::Each { .. } => "each",
            Self::All { .. } => "all",
            Self::Custom { .. } => "custom",
        }
    }

    /// Validates `value`, returning the error outcome if it is rejected.
    pub fn validate(&self, value: &Value, registry: &StrategyRegistry) -> Option<ErrorNode> {
        match self {
            Self::NotBlank { message } => {
                is_blank(value).then(|| not_blank_error(message.as_deref()).into())
            }
            Self::Length { min, max } => check_length(value, *min, *max).map(ErrorNode::from),
            Self::Range { min, max } => check_range(value, *min, *max).map(ErrorNode::from),
            Self::Pattern { pattern, message } => pattern_violated(value, pattern)
                .then(|| pattern_error(message.as_deref()).into()),
            Self::Email => email_violated(value).then(|| email_error().into()),
            Self::Choice { choices, multiple } => {
                choice_rejected(value, choices, *multiple).then(|| choice_error().into())
            }
            Self::Each { constraints } => {
                let children: BTreeMap<String, ErrorNode> = value
                    .as_list()
                    .unwrap_or_default()
                    .iter()
                    .enumerate()
                    .filter_map(|(index, item)| {
                        validate_chain(constraints, item, registry)
                            .map(|node| (index.to_string(), node))
                    })
                    .collect();
                (!children.is_empty()).then_some(ErrorNode::Tree(children))
            }
            Self::All { constraints } => validate_chain(constraints, value, registry),
            Self::Custom { name, options } => match registry.constraint(name) {
                Some(custom) => custom.validate(value, options),
                None => Some(unknown_constraint_error(name).into()),
            },
        }
    }

    /// Visits this constraint and every nested one.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Self)) {
        visit(self);
        if let Self::Each { constraints } | Self::All { constraints } = self {
            for inner in constraints {
                inner.walk(visit);
            }
        }
    }
}

/// Runs an ordered chain and returns the first failure.
pub fn validate_chain(
    constraints: &[Constraint],
    value: &Value,
    registry: &StrategyRegistry,
) -> Option<ErrorNode> {
    constraints
        .iter()
        .find_map(|constraint| constraint.validate(value, registry))
}

// ── Predicates shared with generated units ────────────────────────────

/// Null, the empty string, and the empty list are blank.
pub fn is_blank(value: &Value) -> bool {
    value.is_empty()
}

/// Null and the empty string are absent; constraints other than `NotBlank` skip them.
pub fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Character count of a string or element count of a list.
pub fn measure(value: &Value) -> Option<i64> {
    let len = match value {
        Value::String(s) => s.chars().count(),
        Value::List(items) => items.len(),
        _ => return None,
    };
    i64::try_from(len).ok()
}

/// Returns the `Length` error for `value`, if any.
pub fn check_length(value: &Value, min: Option<usize>, max: Option<usize>) -> Option<FieldError> {
    if is_absent(value) {
        return None;
    }
    let len = usize::try_from(measure(value)?).ok()?;
    if let Some(min) = min {
        if len < min {
            return Some(too_short_error(min));
        }
    }
    if let Some(max) = max {
        if len > max {
            return Some(too_long_error(max));
        }
    }
    None
}

/// Returns the `Range` error for `value`, if any.
pub fn check_range(value: &Value, min: Option<f64>, max: Option<f64>) -> Option<FieldError> {
    if is_absent(value) {
        return None;
    }
    let Some(number) = value.as_float() else {
        return Some(not_numeric_error());
    };
    if let Some(min) = min {
        if number < min {
            return Some(too_low_error(min));
        }
    }
    if let Some(max) = max {
        if number > max {
            return Some(too_high_error(max));
        }
    }
    None
}

static REGEX_CACHE: Lazy<RwLock<HashMap<String, Option<Regex>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Returns `true` if `pattern` compiles.
pub fn is_valid_pattern(pattern: &str) -> bool {
    Regex::new(pattern).is_ok()
}

/// Returns `true` when `value` is a present string that does not match `pattern`.
///
/// An invalid pattern matches nothing.
pub fn pattern_violated(value: &Value, pattern: &str) -> bool {
    let Some(text) = value.as_str() else {
        return false;
    };
    if text.is_empty() {
        return false;
    }
    if let Ok(cache) = REGEX_CACHE.read() {
        if let Some(compiled) = cache.get(pattern) {
            return !compiled.as_ref().is_some_and(|re| re.is_match(text));
        }
    }
    let compiled = Regex::new(pattern).ok();
    let matched = compiled.as_ref().is_some_and(|re| re.is_match(text));
    if let Ok(mut cache) = REGEX_CACHE.write() {
        cache.insert(pattern.to_string(), compiled);
    }
    !matched
}

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

/// Returns `true` when `value` is a present string that is not an email address.
pub fn email_violated(value: &Value) -> bool {
    match value {
        Value::String(s) if !s.is_empty() => !EMAIL_RE.is_match(s),
        _ => false,
    }
}

/// Returns `true` when a present `value` is not among `choices`.
pub fn choice_rejected(value: &Value, choices: &[Value], multiple: bool) -> bool {
    if is_absent(value) {
        return false;
    }
    match (multiple, value) {
        (true, Value::List(items)) => items.iter().any(|item| !choices.contains(item)),
        _ => !choices.contains(value),
    }
}

// ── Errors ─────────────────────────────────────────────────────────────

/// Formats a numeric limit without a trailing `.0` for whole numbers.
#[allow(clippy::cast_possible_truncation)]
pub fn format_limit(limit: f64) -> String {
    if limit.fract() == 0.0 && limit.abs() < 1e15 {
        format!("{}", limit as i64)
    } else {
        format!("{limit}")
    }
}

pub fn not_blank_error(message: Option<&str>) -> FieldError {
    FieldError::new(message.unwrap_or(NOT_BLANK_MESSAGE), "is_blank")
}

pub fn too_short_error(min: usize) -> FieldError {
    FieldError::new(TOO_SHORT_MESSAGE, "too_short").with_param("limit", min.to_string())
}

pub fn too_long_error(max: usize) -> FieldError {
    FieldError::new(TOO_LONG_MESSAGE, "too_long").with_param("limit", max.to_string())
}

pub fn not_numeric_error() -> FieldError {
    FieldError::new(NOT_NUMERIC_MESSAGE, "not_numeric")
}

pub fn too_low_error(min: f64) -> FieldError {
    FieldError::new(TOO_LOW_MESSAGE, "too_low").with_param("limit", format_limit(min))
}

pub fn too_high_error(max: f64) -> FieldError {
    FieldError::new(TOO_HIGH_MESSAGE, "too_high").with_param("limit", format_limit(max))
}

pub fn pattern_error(message: Option<&str>) -> FieldError {
    FieldError::new(message.unwrap_or(INVALID_FORMAT_MESSAGE), "invalid_format")
}

pub fn email_error() -> FieldError {
    FieldError::new(INVALID_EMAIL_MESSAGE, "invalid_email")
}

pub fn choice_error() -> FieldError {
    FieldError::new(NO_SUCH_CHOICE_MESSAGE, "no_such_choice")
}

pub fn unknown_constraint_error(name: &str) -> FieldError {
    FieldError::new(UNKNOWN_CONSTRAINT_MESSAGE, "unknown_constraint").with_param("name", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(constraint: &Constraint, value: Value) -> Option<ErrorNode> {
        constraint.validate(&value, &StrategyRegistry::new())
    }

    fn code(node: Option<ErrorNode>) -> Option<String> {
        node.and_then(|n| n.first().map(|e| e.code.clone()))
    }

    #[test]
    fn test_not_blank() {
        let c = Constraint::not_blank();
        assert_eq!(code(check(&c, Value::Null)), Some("is_blank".into()));
        assert_eq!(code(check(&c, Value::from(""))), Some("is_blank".into()));
        assert_eq!(code(check(&c, Value::List(vec![]))), Some("is_blank".into()));
        assert!(check(&c, Value::from(" ")).is_none());
        assert!(check(&c, Value::Int(0)).is_none());
    }

    #[test]
    fn test_not_blank_custom_message() {
        let c = Constraint::NotBlank {
            message: Some("Name please".into()),
        };
        let node = check(&c, Value::Null).unwrap();
        assert_eq!(node.as_leaf().unwrap().message, "Name please");
    }

    #[test]
    fn test_length() {
        let c = Constraint::Length {
            min: Some(2),
            max: Some(4),
        };
        assert!(check(&c, Value::from("")).is_none());
        assert!(check(&c, Value::Null).is_none());
        let short = check(&c, Value::from("a")).unwrap();
        assert_eq!(short.as_leaf().unwrap().code, "too_short");
        assert_eq!(
            short.as_leaf().unwrap().rendered(),
            "This value is too short. It should have 2 characters or more."
        );
        assert!(check(&c, Value::from("abcd")).is_none());
        assert_eq!(code(check(&c, Value::from("abcde"))), Some("too_long".into()));
        // Counts characters, not bytes.
        assert!(check(&c, Value::from("éé")).is_none());
        assert!(check(&c, Value::Int(12345)).is_none());
    }

    #[test]
    fn test_range() {
        let c = Constraint::Range {
            min: Some(18.0),
            max: Some(99.5),
        };
        assert!(check(&c, Value::Int(18)).is_none());
        let low = check(&c, Value::Int(17)).unwrap();
        assert_eq!(low.as_leaf().unwrap().rendered(), "This value should be 18 or more.");
        let high = check(&c, Value::Float(100.0)).unwrap();
        assert_eq!(high.as_leaf().unwrap().params["limit"], "99.5");
        assert_eq!(code(check(&c, Value::from("x"))), Some("not_numeric".into()));
        assert!(check(&c, Value::Null).is_none());
    }

    #[test]
    fn test_pattern() {
        let c = Constraint::Pattern {
            pattern: "^[a-z]+$".into(),
            message: None,
        };
        assert!(check(&c, Value::from("abc")).is_none());
        assert_eq!(code(check(&c, Value::from("ab1"))), Some("invalid_format".into()));
        assert!(check(&c, Value::Int(1)).is_none());
        // Cached second lookup behaves the same.
        assert_eq!(code(check(&c, Value::from("AB"))), Some("invalid_format".into()));
    }

    #[test]
    fn test_invalid_pattern_rejects_everything() {
        assert!(!is_valid_pattern("(unclosed"));
        assert!(pattern_violated(&Value::from("x"), "(unclosed"));
    }

    #[test]
    fn test_email() {
        assert!(check(&Constraint::Email, Value::from("a@b.io")).is_none());
        assert_eq!(
            code(check(&Constraint::Email, Value::from("nope"))),
            Some("invalid_email".into())
        );
    }

    #[test]
    fn test_choice() {
        let c = Constraint::Choice {
            choices: vec![Value::from("red"), Value::from("blue")],
            multiple: true,
        };
        assert!(check(&c, Value::List(vec![Value::from("red")])).is_none());
        assert_eq!(
            code(check(&c, Value::List(vec![Value::from("red"), Value::from("pink")]))),
            Some("no_such_choice".into())
        );
        let single = Constraint::Choice {
            choices: vec![Value::Int(1)],
            multiple: false,
        };
        assert!(check(&single, Value::Int(1)).is_none());
        assert!(check(&single, Value::Int(2)).is_some());
    }

    #[test]
    fn test_each_reports_per_index() {
        let c = Constraint::Each {
            constraints: vec![
                Constraint::not_blank(),
                Constraint::Length {
                    min: Some(3),
                    max: None,
                },
            ],
        };
        let value = Value::List(vec![Value::from("abcd"), Value::from(""), Value::from("ab")]);
        let node = check(&c, value).unwrap();
        assert!(node.get("0").is_none());
        assert_eq!(node.get("1").unwrap().as_leaf().unwrap().code, "is_blank");
        assert_eq!(node.get("2").unwrap().as_leaf().unwrap().code, "too_short");
        assert!(check(&c, Value::List(vec![Value::from("abc")])).is_none());
        assert!(check(&c, Value::Null).is_none());
    }

    #[test]
    fn test_all_short_circuits() {
        let c = Constraint::All {
            constraints: vec![
                Constraint::not_blank(),
                Constraint::Length {
                    min: Some(5),
                    max: None,
                },
            ],
        };
        assert_eq!(code(check(&c, Value::from(""))), Some("is_blank".into()));
        assert_eq!(code(check(&c, Value::from("abc"))), Some("too_short".into()));
    }

    #[test]
    fn test_custom_dispatches_through_registry() {
        let registry = StrategyRegistry::new().with_constraint(
            "even",
            |value: &Value, _: &ValueMap| -> Option<ErrorNode> {
                match value.as_int() {
                    Some(n) if n % 2 != 0 => Some(FieldError::new("odd", "odd").into()),
                    _ => None,
                }
            },
        );
        let c = Constraint::Custom {
            name: "even".into(),
            options: ValueMap::new(),
        };
        assert!(c.validate(&Value::Int(2), &registry).is_none());
        assert!(c.validate(&Value::Int(3), &registry).is_some());

        let unknown = Constraint::Custom {
            name: "missing".into(),
            options: ValueMap::new(),
        };
        let node = unknown.validate(&Value::Int(3), &registry).unwrap();
        assert_eq!(node.as_leaf().unwrap().code, "unknown_constraint");
    }

    #[test]
    fn test_kind_matches_serde_tag() {
        let all = vec![
            Constraint::not_blank(),
            Constraint::Length { min: None, max: None },
            Constraint::Range { min: None, max: None },
            Constraint::Pattern {
                pattern: ".".into(),
                message: None,
            },
            Constraint::Email,
            Constraint::Choice {
                choices: vec![],
                multiple: false,
            },
            Constraint::Each { constraints: vec![] },
            Constraint::All { constraints: vec![] },
            Constraint::Custom {
                name: "x".into(),
                options: ValueMap::new(),
            },
        ];
        for constraint in all {
            let json = serde_json::to_value(&constraint).unwrap();
            assert_eq!(json["kind"], constraint.kind());
            let back: Constraint = serde_json::from_value(json).unwrap();
            assert_eq!(back, constraint);
        }
    }

    #[test]
    fn test_walk_visits_nested() {
        let c = Constraint::All {
            constraints: vec![Constraint::Each {
                constraints: vec![Constraint::Email],
            }],
        };
        let mut kinds = Vec::new();
        c.walk(&mut |inner| kinds.push(inner.kind()));
        assert_eq!(kinds, vec!["all", "each", "email"]);
    }

    #[test]
    fn test_format_limit() {
        assert_eq!(format_limit(5.0), "5");
        assert_eq!(format_limit(-2.0), "-2");
        assert_eq!(format_limit(2.25), "2.25");
    }
}
