//! The validator contract and its interpreted implementation.

use std::fmt;
use std::sync::Arc;

use formforge_core::{ErrorMap, FormResult, Value, ValueMap};

use crate::constraints::{validate_chain, Constraint};
use crate::registry::StrategyRegistry;

/// Validates native values field by field.
///
/// Implemented by [`RuntimeValidator`] and by generated validator units.
pub trait FormValidator: Send + Sync + fmt::Debug {
    /// Validates `data`, returning the complete error map.
    ///
    /// Fields already present in `prior` are skipped and their prior errors
    /// are kept in the result. For every other field the first failing
    /// constraint, in declared order, is recorded.
    fn validate(&self, data: &ValueMap, prior: &ErrorMap) -> FormResult<ErrorMap>;

    /// The interpreted shape of this validator, if it has one.
    ///
    /// Custom validators return `None` and are never compiled.
    fn runtime(&self) -> Option<&RuntimeValidator> {
        None
    }
}

/// One field's constraint chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorField {
    pub name: String,
    pub constraints: Vec<Constraint>,
}

/// Interprets constraint chains directly.
#[derive(Debug, Clone)]
pub struct RuntimeValidator {
    fields: Vec<ValidatorField>,
    registry: Arc<StrategyRegistry>,
}

impl RuntimeValidator {
    /// Creates a validator over ordered field chains.
    pub fn new(fields: Vec<ValidatorField>, registry: Arc<StrategyRegistry>) -> Self {
        Self { fields, registry }
    }

    /// The field chains in declaration order.
    pub fn fields(&self) -> &[ValidatorField] {
        &self.fields
    }
}

impl FormValidator for RuntimeValidator {
    fn validate(&self, data: &ValueMap, prior: &ErrorMap) -> FormResult<ErrorMap> {
        let mut errors = prior.clone();
        for field in &self.fields {
            if prior.contains_key(&field.name) {
                continue;
            }
            let value = data.get(&field.name).unwrap_or(&Value::Null);
            if let Some(error) = validate_chain(&field.constraints, value, &self.registry) {
                errors.insert(field.name.clone(), error);
            }
        }
        Ok(errors)
    }

    fn runtime(&self) -> Option<&RuntimeValidator> {
        Some(self)
    }
}
