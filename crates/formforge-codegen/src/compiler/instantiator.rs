//! Compiles view instantiators.

use formforge_core::FormResult;
use formforge_forms::ViewInstantiator;
use tracing::debug;

use crate::emitter::InstantiatorEmitter;
use crate::generators::{GeneratorRegistry, ViewField};

/// Turns a [`ViewInstantiator`] into `instantiator` unit text.
#[derive(Clone, Copy)]
pub struct InstantiatorCompiler<'r> {
    generators: &'r GeneratorRegistry,
}

impl<'r> InstantiatorCompiler<'r> {
    pub const fn new(generators: &'r GeneratorRegistry) -> Self {
        Self { generators }
    }

    /// Compiles `instantiator` into a unit named `name`.
    ///
    /// Returns `Ok(None)` when the instantiator has no interpreted shape.
    pub fn compile(
        &self,
        name: &str,
        fingerprint: &str,
        instantiator: &dyn ViewInstantiator,
    ) -> FormResult<Option<String>> {
        let Some(runtime) = instantiator.runtime() else {
            debug!(unit = name, "instantiator has no runtime shape; not compiling");
            return Ok(None);
        };

        let mut emitter = InstantiatorEmitter::new(name, fingerprint);
        for field in runtime.fields() {
            emitter.declare_field(&field.name, &field.wire_name)?;
        }
        for field in runtime.fields() {
            let target = ViewField {
                name: field.name.clone(),
                wire_name: field.wire_name.clone(),
                required: field.required,
            };
            let view = self
                .generators
                .view(&field.config)
                .generate(&field.config, &target)?;
            emitter.append_view(&field.name, view)?;
        }
        let text = emitter.finalize()?;
        debug!(unit = name, fields = runtime.fields().len(), "compiled instantiator");
        Ok(Some(text))
    }
}

#[cfg(test)]
mod tests {
    use formforge_core::{ErrorMap, FieldError, Value, ValueMap};
    use formforge_forms::{
        InstantiatorField, RuntimeInstantiator, StrategyRegistry, ViewConfig, WidgetType,
    };

    use super::*;
    use crate::unit::{
        eval::{run_default, run_submitted},
        parse_unit,
    };

    fn runtime() -> RuntimeInstantiator {
        RuntimeInstantiator::new(vec![
            InstantiatorField {
                name: "email".into(),
                wire_name: "e".into(),
                required: true,
                config: ViewConfig::new(WidgetType::EmailInput).attribute("placeholder", "you@"),
            },
            InstantiatorField {
                name: "agree".into(),
                wire_name: "agree".into(),
                required: false,
                config: ViewConfig::new(WidgetType::Checkbox),
            },
            InstantiatorField {
                name: "color".into(),
                wire_name: "color".into(),
                required: false,
                config: ViewConfig::new(WidgetType::Select)
                    .choices(vec![("r".into(), "Red".into()), ("g".into(), "Green".into())]),
            },
        ])
    }

    #[test]
    fn test_views_match_runtime() {
        let registry = StrategyRegistry::new();
        let values = ValueMap::from([
            ("e".to_string(), Value::from("x@")),
            ("agree".to_string(), Value::from("1")),
            ("color".to_string(), Value::from("g")),
        ]);
        let errors = ErrorMap::from([(
            "email".to_string(),
            FieldError::new("bad", "invalid_email").into(),
        )]);

        for generators in [GeneratorRegistry::new(), GeneratorRegistry::with_builtins()] {
            let text = InstantiatorCompiler::new(&generators)
                .compile("I", "fp", &runtime())
                .unwrap()
                .unwrap();
            let unit = parse_unit(&text).unwrap();

            assert_eq!(
                run_submitted(&unit, &registry, &values, &errors, Some("signup")).unwrap(),
                runtime().submitted(&values, &errors, Some("signup")).unwrap()
            );
            assert_eq!(
                run_default(&unit, &registry, None).unwrap(),
                runtime().default(None).unwrap()
            );
        }
    }
}
