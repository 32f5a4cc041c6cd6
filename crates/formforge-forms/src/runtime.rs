//! Builds runtime strategy objects from a schema.
//!
//! This is the fallback factory: generated-unit loaders delegate to it for the
//! strategy objects they compile, and the runtime compile mode uses its output
//! directly.

use std::sync::Arc;

use formforge_core::{FormResult, FormforgeError};

use crate::constraints::Constraint;
use crate::instantiator::{InstantiatorField, RuntimeInstantiator};
use crate::registry::StrategyRegistry;
use crate::schema::{FieldDescriptor, FormSchema};
use crate::transformer::{RuntimeTransformer, TransformerField};
use crate::transforms::Transform;
use crate::validator::{RuntimeValidator, ValidatorField};

/// Produces [`RuntimeValidator`], [`RuntimeTransformer`] and
/// [`RuntimeInstantiator`] instances for schemas.
#[derive(Debug, Clone, Default)]
pub struct RuntimeFactory {
    registry: Arc<StrategyRegistry>,
}

impl RuntimeFactory {
    pub fn new(registry: Arc<StrategyRegistry>) -> Self {
        Self { registry }
    }

    /// The strategy registry shared with the built objects.
    pub fn registry(&self) -> &Arc<StrategyRegistry> {
        &self.registry
    }

    /// Builds the validator. Required fields start with an implicit `NotBlank`.
    pub fn validator(&self, schema: &FormSchema) -> FormResult<RuntimeValidator> {
        self.check(schema)?;
        let fields = schema
            .fields
            .iter()
            .map(|field| ValidatorField {
                name: field.name.clone(),
                constraints: effective_constraints(field),
            })
            .collect();
        Ok(RuntimeValidator::new(fields, Arc::clone(&self.registry)))
    }

    /// Builds the transformer. Typed fields end with an implicit cast step.
    pub fn transformer(&self, schema: &FormSchema) -> FormResult<RuntimeTransformer> {
        self.check(schema)?;
        let fields = schema
            .fields
            .iter()
            .map(|field| TransformerField {
                name: field.name.clone(),
                wire_name: field.wire_name.clone(),
                steps: effective_transforms(field),
            })
            .collect();
        Ok(RuntimeTransformer::new(fields, Arc::clone(&self.registry)))
    }

    /// Builds the view instantiator.
    pub fn instantiator(&self, schema: &FormSchema) -> FormResult<RuntimeInstantiator> {
        self.check(schema)?;
        let fields = schema
            .fields
            .iter()
            .map(|field| InstantiatorField {
                name: field.name.clone(),
                wire_name: field.wire_name.clone(),
                required: field.required,
                config: field.view.clone(),
            })
            .collect();
        Ok(RuntimeInstantiator::new(fields))
    }

    fn check(&self, schema: &FormSchema) -> FormResult<()> {
        schema.check()?;
        for field in &schema.fields {
            for constraint in &field.constraints {
                let mut missing = None;
                constraint.walk(&mut |inner| {
                    if let Constraint::Custom { name, .. } = inner {
                        if self.registry.constraint(name).is_none() {
                            missing = Some(name.clone());
                        }
                    }
                });
                if let Some(name) = missing {
                    return Err(FormforgeError::Configuration(format!(
                        "Field '{}' uses unregistered constraint '{name}'",
                        field.name
                    )));
                }
            }
            for transform in &field.transforms {
                if let Transform::Custom { name, .. } = transform {
                    if self.registry.transform(name).is_none() {
                        return Err(FormforgeError::Configuration(format!(
                            "Field '{}' uses unregistered transform '{name}'",
                            field.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// The declared constraints with the implicit `NotBlank` of a required field.
pub fn effective_constraints(field: &FieldDescriptor) -> Vec<Constraint> {
    let starts_not_blank = matches!(field.constraints.first(), Some(Constraint::NotBlank { .. }));
    let mut constraints = Vec::with_capacity(field.constraints.len() + 1);
    if field.required && !starts_not_blank {
        constraints.push(Constraint::not_blank());
    }
    constraints.extend(field.constraints.iter().cloned());
    constraints
}

/// The declared transform steps with the implicit cast of a typed field.
pub fn effective_transforms(field: &FieldDescriptor) -> Vec<Transform> {
    let mut steps = field.transforms.clone();
    if !steps.iter().any(Transform::is_typed) {
        steps.extend(field.value_type.implicit_cast());
    }
    steps
}
