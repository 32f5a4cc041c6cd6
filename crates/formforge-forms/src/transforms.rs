//! Transform steps between wire values and native values.
//!
//! A field's transform steps run in declared order when converting wire input
//! into native values ([`Transform::from_wire`]) and in reverse order when
//! converting native values back for display ([`Transform::to_wire`]). For
//! every well-formed wire value `w`, `to_wire(from_wire(w))` is semantically
//! equivalent to `w`.
//!
//! Absent input (null or the empty string) passes through casting steps as
//! null, so requiredness stays the job of the validator.

use std::fmt::Write as _;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use formforge_core::{FieldError, Value, ValueMap};

use crate::constraints::is_absent;
use crate::registry::StrategyRegistry;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub const NOT_AN_INTEGER_MESSAGE: &str = "This value should be an integer.";
pub const NOT_A_NUMBER_MESSAGE: &str = "This value should be a number.";
pub const INVALID_BOOLEAN_MESSAGE: &str = "This value should be a boolean.";
pub const INVALID_DATE_MESSAGE: &str = "This value is not a valid date. Expected format: {format}.";
pub const INVALID_JSON_MESSAGE: &str = "This value is not valid JSON.";
pub const UNKNOWN_TRANSFORM_MESSAGE: &str = "Transform \"{name}\" is not registered.";

/// A reversible conversion step attached to a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transform {
    /// Strips surrounding whitespace from strings.
    Trim,
    /// Uppercases strings.
    Uppercase,
    /// Lowercases strings.
    Lowercase,
    /// Parses an integer.
    ToInteger,
    /// Parses a floating-point number.
    ToFloat,
    /// Parses a checkbox-style boolean.
    ToBoolean,
    /// Renders any scalar as a string.
    ToString,
    /// Parses a date or date-time with a `chrono` format string.
    DateFormat {
        /// The strftime-style format.
        format: String,
    },
    /// Splits a delimited string into a list.
    Split {
        /// The delimiter.
        separator: String,
    },
    /// Substitutes a value for absent input.
    Default {
        /// The substitute.
        value: Value,
    },
    /// Decodes a JSON document.
    Json,
    /// A transform registered in the [`StrategyRegistry`].
    Custom {
        /// The registered name.
        name: String,
        /// Options handed to the transform.
        #[serde(default)]
        options: ValueMap,
    },
}

impl Transform {
    /// The serialized `kind` tag of this variant.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Trim => "trim",
            Self::Uppercase => "uppercase",
            Self::Lowercase => "lowercase",
            Self::ToInteger => "to_integer",
            Self::ToFloat => "to_float",
            Self::ToBoolean => "to_boolean",
            Self::ToString => "to_string",
            Self::DateFormat { .. } => "date_format",
            Self::Split { .. } => "split",
            Self::Default { .. } => "default",
            Self::Json => "json",
            Self::Custom { .. } => "custom",
        }
    }

    /// Whether this step produces a typed native value.
    ///
    /// Fields whose steps already include a typed step get no implicit cast.
    pub const fn is_typed(&self) -> bool {
        matches!(
            self,
            Self::ToInteger
                | Self::ToFloat
                | Self::ToBoolean
                | Self::DateFormat { .. }
                | Self::Json
                | Self::Custom { .. }
        )
    }

    /// Converts a wire value into its native form.
    pub fn from_wire(&self, value: Value, registry: &StrategyRegistry) -> Result<Value, FieldError> {
        match self {
            Self::Trim => Ok(trim(value)),
            Self::Uppercase => Ok(uppercase(value)),
            Self::Lowercase => Ok(lowercase(value)),
            Self::ToInteger => to_integer(value),
            Self::ToFloat => to_float(value),
            Self::ToBoolean => to_boolean(value),
            Self::ToString => Ok(to_string(value)),
            Self::DateFormat { format } => parse_date(value, format),
            Self::Split { separator } => Ok(split(value, separator)),
            Self::Default { value: default } => Ok(default_value(value, default)),
            Self::Json => json_decode(value),
            Self::Custom { name, options } => registry
                .transform(name)
                .ok_or_else(|| unknown_transform_error(name))?
                .from_wire(value, options),
        }
    }

    /// Converts a native value back into its wire form.
    pub fn to_wire(&self, value: Value, registry: &StrategyRegistry) -> Result<Value, FieldError> {
        match self {
            Self::Trim | Self::Uppercase | Self::Lowercase | Self::ToString | Self::Default { .. } => {
                Ok(value)
            }
            Self::ToInteger => Ok(integer_to_wire(value)),
            Self::ToFloat => Ok(float_to_wire(value)),
            Self::ToBoolean => Ok(boolean_to_wire(value)),
            Self::DateFormat { format } => format_date(value, format),
            Self::Split { separator } => Ok(join(value, separator)),
            Self::Json => Ok(json_encode(value)),
            Self::Custom { name, options } => registry
                .transform(name)
                .ok_or_else(|| unknown_transform_error(name))?
                .to_wire(value, options),
        }
    }
}

// ── Wire → native ──────────────────────────────────────────────────────

fn map_string(value: Value, f: impl Fn(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(&s)),
        other => other,
    }
}

pub fn trim(value: Value) -> Value {
    map_string(value, |s| s.trim().to_string())
}

pub fn uppercase(value: Value) -> Value {
    map_string(value, str::to_uppercase)
}

pub fn lowercase(value: Value) -> Value {
    map_string(value, str::to_lowercase)
}

#[allow(clippy::cast_possible_truncation)]
pub fn to_integer(value: Value) -> Result<Value, FieldError> {
    let invalid = || FieldError::new(NOT_AN_INTEGER_MESSAGE, "not_an_integer");
    match value {
        v if is_absent(&v) => Ok(Value::Null),
        Value::Int(i) => Ok(Value::Int(i)),
        Value::Float(f) if f.fract() == 0.0 && f.is_finite() && f.abs() < 9e15 => {
            Ok(Value::Int(f as i64))
        }
        Value::String(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

#[allow(clippy::cast_precision_loss)]
pub fn to_float(value: Value) -> Result<Value, FieldError> {
    let invalid = || FieldError::new(NOT_A_NUMBER_MESSAGE, "not_a_number");
    match value {
        v if is_absent(&v) => Ok(Value::Null),
        Value::Float(f) => Ok(Value::Float(f)),
        Value::Int(i) => Ok(Value::Float(i as f64)),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(Value::Float(f)),
            _ => Err(invalid()),
        },
        _ => Err(invalid()),
    }
}

/// Parses checkbox-style input. A missing value is `false`.
pub fn to_boolean(value: Value) -> Result<Value, FieldError> {
    match value {
        Value::Null => Ok(Value::Bool(false)),
        Value::Bool(b) => Ok(Value::Bool(b)),
        Value::Int(0) => Ok(Value::Bool(false)),
        Value::Int(1) => Ok(Value::Bool(true)),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => Ok(Value::Bool(true)),
            "" | "0" | "false" | "off" | "no" => Ok(Value::Bool(false)),
            _ => Err(FieldError::new(INVALID_BOOLEAN_MESSAGE, "invalid_boolean")),
        },
        _ => Err(FieldError::new(INVALID_BOOLEAN_MESSAGE, "invalid_boolean")),
    }
}

pub fn to_string(value: Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::String(s) => Value::String(s),
        other => Value::String(other.to_string()),
    }
}

/// Parses a date-time first and falls back to a plain date.
pub fn parse_date(value: Value, format: &str) -> Result<Value, FieldError> {
    match value {
        v if is_absent(&v) => Ok(Value::Null),
        v @ (Value::Date(_) | Value::DateTime(_)) => Ok(v),
        Value::String(s) => {
            let s = s.trim();
            NaiveDateTime::parse_from_str(s, format)
                .map(Value::DateTime)
                .or_else(|_| NaiveDate::parse_from_str(s, format).map(Value::Date))
                .map_err(|_| invalid_date_error(format))
        }
        _ => Err(invalid_date_error(format)),
    }
}

/// Splits on `separator`, trimming pieces and dropping empty ones.
pub fn split(value: Value, separator: &str) -> Value {
    match value {
        Value::Null => Value::List(Vec::new()),
        Value::String(s) => Value::List(
            s.split(separator)
                .map(str::trim)
                .filter(|piece| !piece.is_empty())
                .map(Value::from)
                .collect(),
        ),
        other => other,
    }
}

pub fn default_value(value: Value, default: &Value) -> Value {
    if is_absent(&value) {
        default.clone()
    } else {
        value
    }
}

pub fn json_decode(value: Value) -> Result<Value, FieldError> {
    match value {
        v if is_absent(&v) => Ok(Value::Null),
        Value::String(s) => serde_json::from_str::<serde_json::Value>(&s)
            .map(Value::from_json)
            .map_err(|_| FieldError::new(INVALID_JSON_MESSAGE, "invalid_json")),
        other => Ok(other),
    }
}

// ── Native → wire ──────────────────────────────────────────────────────

pub fn integer_to_wire(value: Value) -> Value {
    match value {
        Value::Int(i) => Value::String(i.to_string()),
        other => other,
    }
}

pub fn float_to_wire(value: Value) -> Value {
    match value {
        Value::Float(f) => Value::String(f.to_string()),
        Value::Int(i) => Value::String(i.to_string()),
        other => other,
    }
}

/// Renders a boolean the way a checked checkbox submits it.
pub fn boolean_to_wire(value: Value) -> Value {
    match value {
        Value::Bool(true) => Value::from("1"),
        Value::Bool(false) => Value::from("0"),
        other => other,
    }
}

/// Renders a date or date-time with `format`.
///
/// A plain date is formatted as midnight of that day, so formats with time
/// specifiers still render. A format chrono cannot render is a field error.
pub fn format_date(value: Value, format: &str) -> Result<Value, FieldError> {
    let moment = match value {
        Value::Date(d) => d.and_time(NaiveTime::MIN),
        Value::DateTime(dt) => dt,
        other => return Ok(other),
    };
    let mut rendered = String::new();
    write!(rendered, "{}", moment.format(format)).map_err(|_| invalid_date_error(format))?;
    Ok(Value::String(rendered))
}

pub fn join(value: Value, separator: &str) -> Value {
    match value {
        Value::List(items) => Value::String(
            items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(separator),
        ),
        other => other,
    }
}

pub fn json_encode(value: Value) -> Value {
    match value {
        Value::Null => Value::Null,
        other => Value::String(other.to_json().to_string()),
    }
}

pub fn invalid_date_error(format: &str) -> FieldError {
    FieldError::new(INVALID_DATE_MESSAGE, "invalid_date").with_param("format", format)
}

pub fn unknown_transform_error(name: &str) -> FieldError {
    FieldError::new(UNKNOWN_TRANSFORM_MESSAGE, "unknown_transform").with_param("name", name)
}
