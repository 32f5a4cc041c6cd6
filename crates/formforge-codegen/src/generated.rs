//! Strategy objects backed by loaded units.
//!
//! These implement the same contracts as the runtime strategy objects in
//! `formforge-forms`, executing a parsed [`Unit`] instead of walking the
//! strategy lists. They report no runtime shape, so they are never compiled
//! again.

use std::fmt;
use std::sync::Arc;

use formforge_core::{ErrorMap, FormResult, ValueMap};
use formforge_forms::{
    FormTransformer, FormValidator, FormView, StrategyRegistry, Transformed, ViewInstantiator,
};

use crate::unit::eval::{run_default, run_submitted, run_transform, run_validate};
use crate::unit::Unit;

macro_rules! generated_strategy {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name {
            unit: Arc<Unit>,
            registry: Arc<StrategyRegistry>,
        }

        impl $name {
            /// Wraps a unit that has already passed its contract check.
            pub fn new(unit: Arc<Unit>, registry: Arc<StrategyRegistry>) -> Self {
                Self { unit, registry }
            }

            /// The unit being executed.
            pub fn unit(&self) -> &Arc<Unit> {
                &self.unit
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("unit", &self.unit.name)
                    .field("fingerprint", &self.unit.fingerprint)
                    .finish_non_exhaustive()
            }
        }
    };
}

generated_strategy!(
    /// A validator executing a `validator` unit.
    GeneratedValidator
);
generated_strategy!(
    /// A transformer executing a `transformer` unit.
    GeneratedTransformer
);
generated_strategy!(
    /// A view instantiator executing an `instantiator` unit.
    GeneratedInstantiator
);

impl FormValidator for GeneratedValidator {
    fn validate(&self, data: &ValueMap, prior: &ErrorMap) -> FormResult<ErrorMap> {
        run_validate(&self.unit, &self.registry, data, prior)
    }
}

impl FormTransformer for GeneratedTransformer {
    fn from_wire(&self, input: &ValueMap) -> FormResult<Transformed> {
        run_transform(&self.unit, "from-wire", &self.registry, input)
    }

    fn to_wire(&self, input: &ValueMap) -> FormResult<Transformed> {
        run_transform(&self.unit, "to-wire", &self.registry, input)
    }
}

impl ViewInstantiator for GeneratedInstantiator {
    fn submitted(
        &self,
        values: &ValueMap,
        errors: &ErrorMap,
        parent: Option<&str>,
    ) -> FormResult<FormView> {
        run_submitted(&self.unit, &self.registry, values, errors, parent)
    }

    fn default(&self, parent: Option<&str>) -> FormResult<FormView> {
        run_default(&self.unit, &self.registry, parent)
    }
}

#[cfg(test)]
mod tests {
    use formforge_core::Value;

    use super::*;
    use crate::unit::parse_unit;

    const TRANSFORMER: &str = r#"
(unit transformer "T" "fp"
  (method from-wire
    (field "a" "a" (str.upper (get $input "x"))))
  (method to-wire
    (field "a" "x" (get $input "a"))))
"#;

    #[test]
    fn test_generated_transformer_runs_unit() {
        let unit = Arc::new(parse_unit(TRANSFORMER).unwrap());
        let transformer = GeneratedTransformer::new(unit, Arc::new(StrategyRegistry::new()));
        assert!(transformer.runtime().is_none());

        let out = transformer
            .from_wire(&ValueMap::from([("x".to_string(), Value::from("hi"))]))
            .unwrap();
        assert_eq!(out.values["a"], Value::from("HI"));

        let back = transformer.to_wire(&out.values).unwrap();
        assert_eq!(back.values["x"], Value::from("HI"));
        assert!(format!("{transformer:?}").contains("\"T\""));
    }
}
