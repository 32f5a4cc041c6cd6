//! Compiles transformers.

use formforge_core::FormResult;
use formforge_forms::FormTransformer;
use tracing::debug;

use crate::emitter::TransformerEmitter;
use crate::expr::Expression;
use crate::generators::GeneratorRegistry;

/// Turns a [`FormTransformer`] into `transformer` unit text.
#[derive(Clone, Copy)]
pub struct TransformerCompiler<'r> {
    generators: &'r GeneratorRegistry,
}

impl<'r> TransformerCompiler<'r> {
    pub const fn new(generators: &'r GeneratorRegistry) -> Self {
        Self { generators }
    }

    /// Compiles `transformer` into a unit named `name`.
    ///
    /// Returns `Ok(None)` when the transformer has no interpreted shape.
    pub fn compile(
        &self,
        name: &str,
        fingerprint: &str,
        transformer: &dyn FormTransformer,
    ) -> FormResult<Option<String>> {
        let Some(runtime) = transformer.runtime() else {
            debug!(unit = name, "transformer has no runtime shape; not compiling");
            return Ok(None);
        };

        let mut emitter = TransformerEmitter::new(name, fingerprint);
        for field in runtime.fields() {
            emitter.declare_field(&field.name, &field.wire_name)?;
        }
        for field in runtime.fields() {
            for step in &field.steps {
                let generator = self.generators.transform(step);
                emitter.append_step(
                    &field.name,
                    Box::new(move |previous: Expression| generator.from_wire(step, previous)),
                    Box::new(move |previous: Expression| generator.to_wire(step, previous)),
                )?;
            }
        }
        let text = emitter.finalize()?;
        debug!(unit = name, fields = runtime.fields().len(), "compiled transformer");
        Ok(Some(text))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use formforge_core::{Value, ValueMap};
    use formforge_forms::{RuntimeTransformer, StrategyRegistry, Transform, TransformerField};

    use super::*;
    use crate::unit::{eval::run_transform, parse_unit};

    fn runtime() -> RuntimeTransformer {
        RuntimeTransformer::new(
            vec![
                TransformerField {
                    name: "title".into(),
                    wire_name: "t".into(),
                    steps: vec![Transform::Uppercase, Transform::Trim],
                },
                TransformerField {
                    name: "count".into(),
                    wire_name: "count".into(),
                    steps: vec![Transform::Trim, Transform::ToInteger],
                },
            ],
            Arc::new(StrategyRegistry::new()),
        )
    }

    #[test]
    fn test_both_directions_match_runtime() {
        let registry = StrategyRegistry::new();
        for generators in [GeneratorRegistry::new(), GeneratorRegistry::with_builtins()] {
            let text = TransformerCompiler::new(&generators)
                .compile("T", "fp", &runtime())
                .unwrap()
                .unwrap();
            let unit = parse_unit(&text).unwrap();

            let wire = ValueMap::from([
                ("t".to_string(), Value::from("  ab ")),
                ("count".to_string(), Value::from("x")),
            ]);
            assert_eq!(
                run_transform(&unit, "from-wire", &registry, &wire).unwrap(),
                runtime().from_wire(&wire).unwrap()
            );

            let native = ValueMap::from([
                ("title".to_string(), Value::from("AB")),
                ("count".to_string(), Value::Int(4)),
            ]);
            assert_eq!(
                run_transform(&unit, "to-wire", &registry, &native).unwrap(),
                runtime().to_wire(&native).unwrap()
            );
        }
    }
}
