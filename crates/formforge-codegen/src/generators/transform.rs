//! Transform generators.

use formforge_core::FormResult;
use formforge_forms::Transform;

use super::TransformGenerator;
use crate::expr::{self, Expression};

/// `(transform.from-wire (transform "<kind>" {..}) P)` and its to-wire twin.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackTransformGenerator;

impl TransformGenerator for FallbackTransformGenerator {
    fn from_wire(&self, transform: &Transform, previous: Expression) -> FormResult<Expression> {
        let literal = expr::strategy("transform", transform)?;
        Ok(expr::call("transform.from-wire", [literal, previous]))
    }

    fn to_wire(&self, transform: &Transform, previous: Expression) -> FormResult<Expression> {
        let literal = expr::strategy("transform", transform)?;
        Ok(expr::call("transform.to-wire", [literal, previous]))
    }
}

/// Trim, case changes, and `to_string`. The wire direction is the identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCaseGenerator;

impl TransformGenerator for StringCaseGenerator {
    fn from_wire(&self, transform: &Transform, previous: Expression) -> FormResult<Expression> {
        let builtin = match transform {
            Transform::Trim => "str.trim",
            Transform::Uppercase => "str.upper",
            Transform::Lowercase => "str.lower",
            Transform::ToString => "cast.string",
            other => return FallbackTransformGenerator.from_wire(other, previous),
        };
        Ok(expr::call(builtin, [previous]))
    }

    fn to_wire(&self, transform: &Transform, previous: Expression) -> FormResult<Expression> {
        match transform {
            Transform::Trim | Transform::Uppercase | Transform::Lowercase | Transform::ToString => {
                Ok(previous)
            }
            other => FallbackTransformGenerator.to_wire(other, previous),
        }
    }
}

/// Integer, float and boolean casts.
#[derive(Debug, Clone, Copy, Default)]
pub struct CastGenerator;

impl CastGenerator {
    const fn builtins(transform: &Transform) -> Option<(&'static str, &'static str)> {
        match transform {
            Transform::ToInteger => Some(("cast.int", "wire.int")),
            Transform::ToFloat => Some(("cast.float", "wire.float")),
            Transform::ToBoolean => Some(("cast.bool", "wire.bool")),
            _ => None,
        }
    }
}

impl TransformGenerator for CastGenerator {
    fn from_wire(&self, transform: &Transform, previous: Expression) -> FormResult<Expression> {
        match Self::builtins(transform) {
            Some((from, _)) => Ok(expr::call(from, [previous])),
            None => FallbackTransformGenerator.from_wire(transform, previous),
        }
    }

    fn to_wire(&self, transform: &Transform, previous: Expression) -> FormResult<Expression> {
        match Self::builtins(transform) {
            Some((_, to)) => Ok(expr::call(to, [previous])),
            None => FallbackTransformGenerator.to_wire(transform, previous),
        }
    }
}

/// `(date.parse P "<format>")` / `(date.format P "<format>")`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateFormatGenerator;

impl TransformGenerator for DateFormatGenerator {
    fn from_wire(&self, transform: &Transform, previous: Expression) -> FormResult<Expression> {
        let Transform::DateFormat { format } = transform else {
            return FallbackTransformGenerator.from_wire(transform, previous);
        };
        Ok(expr::call("date.parse", [previous, expr::string(format)]))
    }

    fn to_wire(&self, transform: &Transform, previous: Expression) -> FormResult<Expression> {
        let Transform::DateFormat { format } = transform else {
            return FallbackTransformGenerator.to_wire(transform, previous);
        };
        Ok(expr::call("date.format", [previous, expr::string(format)]))
    }
}

/// `(str.split P "<sep>")` / `(list.join P "<sep>")`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SplitGenerator;

impl TransformGenerator for SplitGenerator {
    fn from_wire(&self, transform: &Transform, previous: Expression) -> FormResult<Expression> {
        let Transform::Split { separator } = transform else {
            return FallbackTransformGenerator.from_wire(transform, previous);
        };
        Ok(expr::call("str.split", [previous, expr::string(separator)]))
    }

    fn to_wire(&self, transform: &Transform, previous: Expression) -> FormResult<Expression> {
        let Transform::Split { separator } = transform else {
            return FallbackTransformGenerator.to_wire(transform, previous);
        };
        Ok(expr::call("list.join", [previous, expr::string(separator)]))
    }
}

/// `(value.default P <literal>)`; the wire direction is the identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultGenerator;

impl TransformGenerator for DefaultGenerator {
    fn from_wire(&self, transform: &Transform, previous: Expression) -> FormResult<Expression> {
        let Transform::Default { value } = transform else {
            return FallbackTransformGenerator.from_wire(transform, previous);
        };
        Ok(expr::call("value.default", [previous, expr::literal(value)?]))
    }

    fn to_wire(&self, transform: &Transform, previous: Expression) -> FormResult<Expression> {
        match transform {
            Transform::Default { .. } => Ok(previous),
            other => FallbackTransformGenerator.to_wire(other, previous),
        }
    }
}

/// `(json.decode P)` / `(json.encode P)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonGenerator;

impl TransformGenerator for JsonGenerator {
    fn from_wire(&self, transform: &Transform, previous: Expression) -> FormResult<Expression> {
        match transform {
            Transform::Json => Ok(expr::call("json.decode", [previous])),
            other => FallbackTransformGenerator.from_wire(other, previous),
        }
    }

    fn to_wire(&self, transform: &Transform, previous: Expression) -> FormResult<Expression> {
        match transform {
            Transform::Json => Ok(expr::call("json.encode", [previous])),
            other => FallbackTransformGenerator.to_wire(other, previous),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::GeneratorRegistry;
    use formforge_core::{Value, ValueMap};

    fn both(transform: &Transform) -> (String, String) {
        let registry = GeneratorRegistry::with_builtins();
        let generator = registry.transform(transform);
        let from = generator.from_wire(transform, expr::var("$p")).unwrap();
        let to = generator.to_wire(transform, expr::var("$p")).unwrap();
        (from.text().to_string(), to.text().to_string())
    }

    #[test]
    fn test_builtin_directions() {
        assert_eq!(both(&Transform::Trim), ("(str.trim $p)".into(), "$p".into()));
        assert_eq!(
            both(&Transform::ToBoolean),
            ("(cast.bool $p)".into(), "(wire.bool $p)".into())
        );
        assert_eq!(
            both(&Transform::DateFormat {
                format: "%d/%m/%Y".into()
            }),
            (
                r#"(date.parse $p "%d/%m/%Y")"#.into(),
                r#"(date.format $p "%d/%m/%Y")"#.into()
            )
        );
        assert_eq!(
            both(&Transform::Split {
                separator: ",".into()
            }),
            (r#"(str.split $p ",")"#.into(), r#"(list.join $p ",")"#.into())
        );
        assert_eq!(
            both(&Transform::Default {
                value: Value::Int(0)
            }),
            ("(value.default $p 0)".into(), "$p".into())
        );
    }

    #[test]
    fn test_custom_uses_fallback() {
        let (from, to) = both(&Transform::Custom {
            name: "cents".into(),
            options: ValueMap::new(),
        });
        assert_eq!(
            from,
            r#"(transform.from-wire (transform "custom" {"name" "cents" "options" {}}) $p)"#
        );
        assert!(to.starts_with("(transform.to-wire (transform \"custom\""));
    }

    #[test]
    fn test_steps_nest() {
        let registry = GeneratorRegistry::with_builtins();
        let mut expression = expr::call("get", [expr::var("$input"), expr::string("a")]);
        for step in [Transform::Trim, Transform::ToInteger] {
            expression = registry.transform(&step).from_wire(&step, expression).unwrap();
        }
        assert_eq!(expression.text(), r#"(cast.int (str.trim (get $input "a")))"#);
    }
}
