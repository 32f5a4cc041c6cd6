//! The validator emitter.

use formforge_core::FormResult;

use super::{EmitterState, Lifecycle, UnitWriter};
use crate::expr::{self, Expression};
use crate::unit::UnitKind;

/// Produces one constraint's expression from the checked value.
pub type ConstraintClosure<'a> = Box<dyn FnOnce(&Expression) -> FormResult<Expression> + 'a>;

/// Assembles a `validate` method.
///
/// Each field's constraints are joined with `??` over the field's value, so
/// only the first failing constraint is recorded. Fields without
/// constraints produce no statement.
pub struct ValidatorEmitter<'a> {
    name: String,
    fingerprint: String,
    lifecycle: Lifecycle,
    fields: Vec<(String, Vec<ConstraintClosure<'a>>)>,
}

impl<'a> ValidatorEmitter<'a> {
    pub fn new(name: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fingerprint: fingerprint.into(),
            lifecycle: Lifecycle::new(UnitKind::Validator),
            fields: Vec::new(),
        }
    }

    pub const fn state(&self) -> EmitterState {
        self.lifecycle.state()
    }

    /// Declares a field. Declaration order is statement order.
    ///
    /// # Errors
    ///
    /// Fails when the field is already declared or appending has begun.
    pub fn declare_field(&mut self, name: &str) -> FormResult<()> {
        self.lifecycle.declare()?;
        if self.fields.iter().any(|(declared, _)| declared == name) {
            return Err(self.lifecycle.duplicate(name));
        }
        self.fields.push((name.to_string(), Vec::new()));
        Ok(())
    }

    /// Appends the next constraint of `field`'s chain.
    ///
    /// # Errors
    ///
    /// Fails for undeclared fields and after finalize.
    pub fn append_constraint(
        &mut self,
        field: &str,
        constraint: ConstraintClosure<'a>,
    ) -> FormResult<()> {
        self.lifecycle.append()?;
        let Some((_, chain)) = self.fields.iter_mut().find(|(name, _)| name == field) else {
            return Err(self.lifecycle.undeclared(field));
        };
        chain.push(constraint);
        Ok(())
    }

    /// Renders the unit.
    ///
    /// # Errors
    ///
    /// Fails when called twice, or when a constraint closure fails.
    pub fn finalize(&mut self) -> FormResult<String> {
        self.lifecycle.finalize()?;
        let mut writer = UnitWriter::new(UnitKind::Validator, &self.name, &self.fingerprint);
        writer.method("validate");
        for (field, chain) in std::mem::take(&mut self.fields) {
            if chain.is_empty() {
                continue;
            }
            let accessor = expr::call("get", [expr::var("$data"), expr::string(&field)]);
            let expression = if chain.len() == 1 {
                let mut chain = chain;
                let only = chain.remove(0);
                expr::flatten(only(&accessor)?)
            } else {
                expr::bind(accessor, |value| {
                    let items = chain
                        .into_iter()
                        .map(|constraint| constraint(&value).map(expr::flatten))
                        .collect::<FormResult<Vec<_>>>()?;
                    Ok(expr::coalesce(items))
                })?
            };
            writer.field(&field, &field, &expression);
        }
        Ok(writer.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formforge_core::FormforgeError;

    fn blank_check<'a>() -> ConstraintClosure<'a> {
        Box::new(|v: &Expression| {
            Ok(expr::if_(
                expr::call("blank?", [v.clone()]),
                expr::error(&formforge_core::FieldError::new("m", "is_blank")),
                expr::null(),
            ))
        })
    }

    #[test]
    fn test_single_constraint_uses_accessor_directly() {
        let mut emitter = ValidatorEmitter::new("V", "fp");
        emitter.declare_field("a").unwrap();
        emitter.declare_field("skip").unwrap();
        emitter.append_constraint("a", blank_check()).unwrap();
        let text = emitter.finalize().unwrap();
        assert!(text.contains(r#"(if (blank? (get $data "a"))"#));
        assert!(!text.contains("\"skip\""));
    }

    #[test]
    fn test_chain_binds_accessor_once() {
        let mut emitter = ValidatorEmitter::new("V", "fp");
        emitter.declare_field("a").unwrap();
        emitter.append_constraint("a", blank_check()).unwrap();
        emitter.append_constraint("a", blank_check()).unwrap();
        let text = emitter.finalize().unwrap();
        assert_eq!(text.matches(r#"(get $data "a")"#).count(), 1);
        assert!(text.contains("(??"));
    }

    #[test]
    fn test_output_is_deterministic() {
        let render = || {
            let mut emitter = ValidatorEmitter::new("V", "fp");
            emitter.declare_field("a").unwrap();
            emitter.append_constraint("a", blank_check()).unwrap();
            emitter.append_constraint("a", blank_check()).unwrap();
            emitter.finalize().unwrap()
        };
        assert_eq!(render(), render());
    }

    #[test]
    fn test_misuse_is_rejected() {
        let mut emitter = ValidatorEmitter::new("V", "fp");
        emitter.declare_field("a").unwrap();
        assert!(emitter.declare_field("a").is_err());
        assert!(emitter.append_constraint("b", blank_check()).is_err());
        emitter.append_constraint("a", blank_check()).unwrap();
        assert!(emitter.declare_field("c").is_err());
        emitter.finalize().unwrap();
        assert_eq!(emitter.state(), EmitterState::Finalized);
        assert!(matches!(
            emitter.append_constraint("a", blank_check()),
            Err(FormforgeError::EmitterState(_))
        ));
        assert!(matches!(emitter.finalize(), Err(FormforgeError::EmitterState(_))));
    }
}
