//! The transformer contract and its interpreted implementation.

use std::fmt;
use std::sync::Arc;

use formforge_core::{ErrorMap, FieldError, FormResult, Value, ValueMap};

use crate::registry::StrategyRegistry;
use crate::transforms::Transform;

/// The outcome of a transformation: converted values plus per-field failures.
///
/// A field whose transformation failed has an entry in `errors` and no entry
/// in `values`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transformed {
    pub values: ValueMap,
    pub errors: ErrorMap,
}

impl Transformed {
    /// Returns `true` if every field converted.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Converts between wire input and native values.
///
/// Implemented by [`RuntimeTransformer`] and by generated transformer units.
pub trait FormTransformer: Send + Sync + fmt::Debug {
    /// Converts wire input keyed by wire name into native values keyed by field name.
    fn from_wire(&self, input: &ValueMap) -> FormResult<Transformed>;

    /// Converts native values keyed by field name into wire values keyed by wire name.
    fn to_wire(&self, input: &ValueMap) -> FormResult<Transformed>;

    /// The interpreted shape of this transformer, if it has one.
    fn runtime(&self) -> Option<&RuntimeTransformer> {
        None
    }
}

/// One field's transform steps.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformerField {
    pub name: String,
    pub wire_name: String,
    pub steps: Vec<Transform>,
}

/// Interprets transform steps directly.
#[derive(Debug, Clone)]
pub struct RuntimeTransformer {
    fields: Vec<TransformerField>,
    registry: Arc<StrategyRegistry>,
}

impl RuntimeTransformer {
    /// Creates a transformer over ordered field steps.
    pub fn new(fields: Vec<TransformerField>, registry: Arc<StrategyRegistry>) -> Self {
        Self { fields, registry }
    }

    /// The field steps in declaration order.
    pub fn fields(&self) -> &[TransformerField] {
        &self.fields
    }

    fn run<'a>(
        &self,
        value: Value,
        steps: impl Iterator<Item = &'a Transform>,
        forward: bool,
    ) -> Result<Value, FieldError> {
        steps.into_iter().try_fold(value, |value, step| {
            if forward {
                step.from_wire(value, &self.registry)
            } else {
                step.to_wire(value, &self.registry)
            }
        })
    }
}

impl FormTransformer for RuntimeTransformer {
    fn from_wire(&self, input: &ValueMap) -> FormResult<Transformed> {
        let mut out = Transformed::default();
        for field in &self.fields {
            let raw = input.get(&field.wire_name).cloned().unwrap_or_default();
            match self.run(raw, field.steps.iter(), true) {
                Ok(value) => {
                    out.values.insert(field.name.clone(), value);
                }
                Err(error) => {
                    out.errors.insert(field.name.clone(), error.into());
                }
            }
        }
        Ok(out)
    }

    fn to_wire(&self, input: &ValueMap) -> FormResult<Transformed> {
        let mut out = Transformed::default();
        for field in &self.fields {
            let native = input.get(&field.name).cloned().unwrap_or_default();
            match self.run(native, field.steps.iter().rev(), false) {
                Ok(value) => {
                    out.values.insert(field.wire_name.clone(), value);
                }
                Err(error) => {
                    out.errors.insert(field.name.clone(), error.into());
                }
            }
        }
        Ok(out)
    }

    fn runtime(&self) -> Option<&RuntimeTransformer> {
        Some(self)
    }
}
