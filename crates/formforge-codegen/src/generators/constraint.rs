//! Constraint generators.
//!
//! Every generator emits the same error literal the interpreter would
//! produce, built with the constructors in `formforge_forms::constraints`.

use formforge_core::{FormResult, FormforgeError, Value};
use formforge_forms::constraints::{
    choice_error, not_blank_error, not_numeric_error, pattern_error, too_high_error,
    too_long_error, too_low_error, too_short_error,
};
use formforge_forms::Constraint;

use super::{ConstraintGenerator, GenerationContext};
use crate::expr::{self, ErrorShape, Expression};

/// `(constraint.check (constraint "<kind>" {..}) V)`.
///
/// Reconstructs the constraint and runs its interpreter. Used for every
/// constraint without a specialized generator and for mismatched variants.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackConstraintGenerator;

impl ConstraintGenerator for FallbackConstraintGenerator {
    fn generate(
        &self,
        constraint: &Constraint,
        value: &Expression,
        _ctx: &GenerationContext<'_>,
    ) -> FormResult<Expression> {
        let literal = expr::strategy("constraint", constraint)?;
        Ok(expr::call("constraint.check", [literal, value.clone()]).with_shape(ErrorShape::Either))
    }
}

fn fallback(
    constraint: &Constraint,
    value: &Expression,
    ctx: &GenerationContext<'_>,
) -> FormResult<Expression> {
    FallbackConstraintGenerator.generate(constraint, value, ctx)
}

fn int_literal(n: usize) -> FormResult<Expression> {
    let n = i64::try_from(n)
        .map_err(|_| FormforgeError::UnrepresentableLiteral(format!("length limit {n}")))?;
    expr::literal(&Value::Int(n))
}

/// `(if (blank? V) ERROR null)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotBlankGenerator;

impl ConstraintGenerator for NotBlankGenerator {
    fn generate(
        &self,
        constraint: &Constraint,
        value: &Expression,
        ctx: &GenerationContext<'_>,
    ) -> FormResult<Expression> {
        let Constraint::NotBlank { message } = constraint else {
            return fallback(constraint, value, ctx);
        };
        Ok(expr::if_(
            expr::call("blank?", [value.clone()]),
            expr::error(&not_blank_error(message.as_deref())),
            expr::null(),
        ))
    }
}

/// Absent values pass; otherwise the measured length is compared against
/// the minimum, then the maximum.
#[derive(Debug, Clone, Copy, Default)]
pub struct LengthGenerator;

impl ConstraintGenerator for LengthGenerator {
    fn generate(
        &self,
        constraint: &Constraint,
        value: &Expression,
        ctx: &GenerationContext<'_>,
    ) -> FormResult<Expression> {
        let Constraint::Length { min, max } = constraint else {
            return fallback(constraint, value, ctx);
        };
        if min.is_none() && max.is_none() {
            return Ok(expr::null());
        }
        let (min, max) = (*min, *max);
        expr::bind(value.clone(), |value| {
            let checks = expr::bind(expr::call("len", [value.clone()]), |len| {
                let mut out = expr::null();
                if let Some(max) = max {
                    out = expr::if_(
                        expr::call(">", [len.clone(), int_literal(max)?]),
                        expr::error(&too_long_error(max)),
                        out,
                    );
                }
                if let Some(min) = min {
                    out = expr::if_(
                        expr::call("<", [len, int_literal(min)?]),
                        expr::error(&too_short_error(min)),
                        out,
                    );
                }
                Ok(out)
            })?;
            Ok(expr::if_(
                expr::call("absent?", [value]),
                expr::null(),
                checks,
            ))
        })
    }
}

/// Absent values pass; non-numbers fail; then minimum, then maximum.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeGenerator;

impl ConstraintGenerator for RangeGenerator {
    fn generate(
        &self,
        constraint: &Constraint,
        value: &Expression,
        ctx: &GenerationContext<'_>,
    ) -> FormResult<Expression> {
        let Constraint::Range { min, max } = constraint else {
            return fallback(constraint, value, ctx);
        };
        let (min, max) = (*min, *max);
        expr::bind(value.clone(), |value| {
            let mut out = expr::null();
            if let Some(max) = max {
                out = expr::if_(
                    expr::call(">", [value.clone(), expr::literal(&Value::Float(max))?]),
                    expr::error(&too_high_error(max)),
                    out,
                );
            }
            if let Some(min) = min {
                out = expr::if_(
                    expr::call("<", [value.clone(), expr::literal(&Value::Float(min))?]),
                    expr::error(&too_low_error(min)),
                    out,
                );
            }
            let numeric = expr::if_(
                expr::call("not", [expr::call("num?", [value.clone()])]),
                expr::error(&not_numeric_error()),
                out,
            );
            Ok(expr::if_(
                expr::call("absent?", [value]),
                expr::null(),
                numeric,
            ))
        })
    }
}

/// `(if (pattern.violated? V "<pattern>") ERROR null)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternGenerator;

impl ConstraintGenerator for PatternGenerator {
    fn generate(
        &self,
        constraint: &Constraint,
        value: &Expression,
        ctx: &GenerationContext<'_>,
    ) -> FormResult<Expression> {
        let Constraint::Pattern { pattern, message } = constraint else {
            return fallback(constraint, value, ctx);
        };
        Ok(expr::if_(
            expr::call("pattern.violated?", [value.clone(), expr::string(pattern)]),
            expr::error(&pattern_error(message.as_deref())),
            expr::null(),
        ))
    }
}

/// `(if (choice.rejects? V [choices..] multiple) ERROR null)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChoiceGenerator;

impl ConstraintGenerator for ChoiceGenerator {
    fn generate(
        &self,
        constraint: &Constraint,
        value: &Expression,
        ctx: &GenerationContext<'_>,
    ) -> FormResult<Expression> {
        let Constraint::Choice { choices, multiple } = constraint else {
            return fallback(constraint, value, ctx);
        };
        let choices = expr::literal(&Value::List(choices.clone()))?;
        Ok(expr::if_(
            expr::call(
                "choice.rejects?",
                [value.clone(), choices, expr::boolean(*multiple)],
            ),
            expr::error(&choice_error()),
            expr::null(),
        ))
    }
}

/// The inner chain, inlined.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllGenerator;

impl ConstraintGenerator for AllGenerator {
    fn generate(
        &self,
        constraint: &Constraint,
        value: &Expression,
        ctx: &GenerationContext<'_>,
    ) -> FormResult<Expression> {
        let Constraint::All { constraints } = constraint else {
            return fallback(constraint, value, ctx);
        };
        ctx.chain(constraints, value)
    }
}

/// `(each $itemN V chain)`: the inner chain per element, keyed by index.
#[derive(Debug, Clone, Copy, Default)]
pub struct EachGenerator;

impl ConstraintGenerator for EachGenerator {
    fn generate(
        &self,
        constraint: &Constraint,
        value: &Expression,
        ctx: &GenerationContext<'_>,
    ) -> FormResult<Expression> {
        let Constraint::Each { constraints } = constraint else {
            return fallback(constraint, value, ctx);
        };
        let item = ctx.item_var();
        let body = ctx.nested().chain(constraints, &expr::var(&item))?;
        Ok(expr::each(&item, value.clone(), body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::GeneratorRegistry;

    fn generate(constraint: &Constraint) -> Expression {
        let registry = GeneratorRegistry::with_builtins();
        GenerationContext::new(&registry)
            .constraint(constraint, &expr::var("$v"))
            .unwrap()
    }

    #[test]
    fn test_not_blank_uses_custom_message() {
        let text = generate(&Constraint::NotBlank {
            message: Some("Required.".into()),
        });
        assert_eq!(
            text.text(),
            r#"(if (blank? $v) (error "Required." "is_blank" {}) null)"#
        );
        assert_eq!(text.shape(), ErrorShape::Single);
    }

    #[test]
    fn test_length_checks_min_before_max() {
        let text = generate(&Constraint::Length {
            min: Some(2),
            max: Some(4),
        });
        let text = text.text();
        assert!(text.starts_with("(if (absent? $v) null (let $t_"));
        let short = text.find("too_short").unwrap();
        let long = text.find("too_long").unwrap();
        assert!(short < long);
        assert_eq!(
            generate(&Constraint::Length {
                min: None,
                max: None
            })
            .text(),
            "null"
        );
    }

    #[test]
    fn test_range_limits_render_as_floats() {
        let text = generate(&Constraint::Range {
            min: Some(0.0),
            max: None,
        });
        assert!(text.text().contains("(< $v 0.0)"));
        assert!(text.text().contains("not_numeric"));

        let registry = GeneratorRegistry::with_builtins();
        let err = GenerationContext::new(&registry)
            .constraint(
                &Constraint::Range {
                    min: Some(f64::NAN),
                    max: None,
                },
                &expr::var("$v"),
            )
            .unwrap_err();
        assert!(matches!(err, FormforgeError::UnrepresentableLiteral(_)));
    }

    #[test]
    fn test_each_nests_item_variables() {
        let text = generate(&Constraint::Each {
            constraints: vec![Constraint::Each {
                constraints: vec![Constraint::not_blank()],
            }],
        });
        assert_eq!(text.shape(), ErrorShape::Aggregate);
        assert!(text.text().starts_with("(each $item0 $v (errors.flatten (each $item1 $item0"));
    }

    #[test]
    fn test_all_inlines_chain() {
        let text = generate(&Constraint::All {
            constraints: vec![Constraint::not_blank(), Constraint::Email],
        });
        assert!(text.text().starts_with("(?? (if (blank? $v)"));
        assert!(text.text().contains("(constraint.check (constraint \"email\" {}) $v)"));
    }

    #[test]
    fn test_mismatched_variant_falls_back() {
        let registry = GeneratorRegistry::new();
        let ctx = GenerationContext::new(&registry);
        let text = NotBlankGenerator
            .generate(&Constraint::Email, &expr::var("$v"), &ctx)
            .unwrap();
        assert!(text.text().starts_with("(constraint.check"));
    }
}
