//! Registry of user-defined strategies.
//!
//! Built-in constraints and transforms are closed enum variants. Anything
//! else is registered here under a name and referenced from a schema through
//! [`Constraint::Custom`](crate::Constraint::Custom) or
//! [`Transform::Custom`](crate::Transform::Custom). The registry is passed
//! explicitly to everything that executes strategies, interpreted or generated.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use formforge_core::{ErrorNode, FieldError, Value, ValueMap};

/// A named, user-defined validation constraint.
pub trait CustomConstraint: Send + Sync {
    /// Validates `value`, returning the error outcome if it is rejected.
    fn validate(&self, value: &Value, options: &ValueMap) -> Option<ErrorNode>;
}

/// A named, user-defined transform step.
pub trait CustomTransform: Send + Sync {
    /// Converts a wire value into its native representation.
    fn from_wire(&self, value: Value, options: &ValueMap) -> Result<Value, FieldError>;

    /// Converts a native value back into its wire representation.
    fn to_wire(&self, value: Value, options: &ValueMap) -> Result<Value, FieldError>;
}

impl<F> CustomConstraint for F
where
    F: Fn(&Value, &ValueMap) -> Option<ErrorNode> + Send + Sync,
{
    fn validate(&self, value: &Value, options: &ValueMap) -> Option<ErrorNode> {
        self(value, options)
    }
}

/// Holds custom constraints and transforms by name.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    constraints: HashMap<String, Arc<dyn CustomConstraint>>,
    transforms: HashMap<String, Arc<dyn CustomTransform>>,
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut constraints: Vec<&String> = self.constraints.keys().collect();
        let mut transforms: Vec<&String> = self.transforms.keys().collect();
        constraints.sort();
        transforms.sort();
        f.debug_struct("StrategyRegistry")
            .field("constraints", &constraints)
            .field("transforms", &transforms)
            .finish()
    }
}

impl StrategyRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a custom constraint under `name`, replacing any previous one.
    #[must_use]
    pub fn with_constraint(
        mut self,
        name: impl Into<String>,
        constraint: impl CustomConstraint + 'static,
    ) -> Self {
        self.constraints.insert(name.into(), Arc::new(constraint));
        self
    }

    /// Registers a custom transform under `name`, replacing any previous one.
    #[must_use]
    pub fn with_transform(
        mut self,
        name: impl Into<String>,
        transform: impl CustomTransform + 'static,
    ) -> Self {
        self.transforms.insert(name.into(), Arc::new(transform));
        self
    }

    /// Looks up a custom constraint.
    pub fn constraint(&self, name: &str) -> Option<&Arc<dyn CustomConstraint>> {
        self.constraints.get(name)
    }

    /// Looks up a custom transform.
    pub fn transform(&self, name: &str) -> Option<&Arc<dyn CustomTransform>> {
        self.transforms.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Reverse;

    impl CustomTransform for Reverse {
        fn from_wire(&self, value: Value, _options: &ValueMap) -> Result<Value, FieldError> {
            Ok(match value {
                Value::String(s) => Value::String(s.chars().rev().collect()),
                other => other,
            })
        }

        fn to_wire(&self, value: Value, options: &ValueMap) -> Result<Value, FieldError> {
            self.from_wire(value, options)
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = StrategyRegistry::new()
            .with_constraint("never", |_: &Value, _: &ValueMap| -> Option<ErrorNode> { None })
            .with_transform("reverse", Reverse);

        assert!(registry.constraint("never").is_some());
        assert!(registry.constraint("reverse").is_none());
        let reverse = registry.transform("reverse").unwrap();
        assert_eq!(
            reverse.from_wire(Value::from("abc"), &ValueMap::new()).unwrap(),
            Value::from("cba")
        );
    }

    #[test]
    fn test_debug_lists_names() {
        let registry = StrategyRegistry::new().with_transform("reverse", Reverse);
        let debug = format!("{registry:?}");
        assert!(debug.contains("reverse"));
    }
}
