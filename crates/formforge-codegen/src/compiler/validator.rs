//! Compiles validators.

use formforge_core::FormResult;
use formforge_forms::FormValidator;
use tracing::debug;

use crate::emitter::ValidatorEmitter;
use crate::expr::Expression;
use crate::generators::{GenerationContext, GeneratorRegistry};

/// Turns a [`FormValidator`] into `validator` unit text.
#[derive(Clone, Copy)]
pub struct ValidatorCompiler<'r> {
    generators: &'r GeneratorRegistry,
}

impl<'r> ValidatorCompiler<'r> {
    pub const fn new(generators: &'r GeneratorRegistry) -> Self {
        Self { generators }
    }

    /// Compiles `validator` into a unit named `name`.
    ///
    /// Returns `Ok(None)` when the validator has no interpreted shape.
    pub fn compile(
        &self,
        name: &str,
        fingerprint: &str,
        validator: &dyn FormValidator,
    ) -> FormResult<Option<String>> {
        let Some(runtime) = validator.runtime() else {
            debug!(unit = name, "validator has no runtime shape; not compiling");
            return Ok(None);
        };

        let mut emitter = ValidatorEmitter::new(name, fingerprint);
        for field in runtime.fields() {
            emitter.declare_field(&field.name)?;
        }
        let ctx = GenerationContext::new(self.generators);
        for field in runtime.fields() {
            for constraint in &field.constraints {
                emitter.append_constraint(
                    &field.name,
                    Box::new(move |value: &Expression| ctx.constraint(constraint, value)),
                )?;
            }
        }
        let text = emitter.finalize()?;
        debug!(unit = name, fields = runtime.fields().len(), "compiled validator");
        Ok(Some(text))
    }
}
