//! The mode-switching form factory.

use std::sync::Arc;

use formforge_core::{CompileMode, FormResult, Settings};
use formforge_forms::{Form, FormData, FormSchema, RuntimeFactory, StrategyRegistry};
use tracing::debug;

use crate::factory::{InstantiatorFactory, TransformerFactory, ValidatorFactory};
use crate::generators::GeneratorRegistry;

/// Builds [`Form`]s in the configured [`CompileMode`].
///
/// In `Runtime` mode every form interprets its schema. In `Generated` mode
/// the three strategies come from the generated-unit factories, which share
/// the configured unit directory.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use formforge_codegen::FormFactory;
/// use formforge_core::Settings;
/// use formforge_forms::{FieldDescriptor, FormSchema, ValueType};
///
/// let factory = FormFactory::new(&Settings::default(), Arc::default());
/// let schema = FormSchema::new(
///     "app::Contact",
///     vec![FieldDescriptor::new("email", ValueType::String)],
/// );
/// let form = factory.create_for_schema(&schema).unwrap();
/// assert!(!form.view().unwrap().has_errors());
/// ```
#[derive(Debug)]
pub struct FormFactory {
    mode: CompileMode,
    runtime: RuntimeFactory,
    validators: ValidatorFactory,
    transformers: TransformerFactory,
    instantiators: InstantiatorFactory,
}

impl FormFactory {
    pub fn new(settings: &Settings, registry: Arc<StrategyRegistry>) -> Self {
        Self {
            mode: settings.compile_mode,
            runtime: RuntimeFactory::new(Arc::clone(&registry)),
            validators: ValidatorFactory::from_settings(settings, Arc::clone(&registry)),
            transformers: TransformerFactory::from_settings(settings, Arc::clone(&registry)),
            instantiators: InstantiatorFactory::from_settings(settings, registry),
        }
    }

    /// Uses `generators` for all three unit kinds.
    #[must_use]
    pub fn with_generators(self, generators: Arc<GeneratorRegistry>) -> Self {
        Self {
            validators: self.validators.with_generators(Arc::clone(&generators)),
            transformers: self.transformers.with_generators(Arc::clone(&generators)),
            instantiators: self.instantiators.with_generators(generators),
            ..self
        }
    }

    pub const fn mode(&self) -> CompileMode {
        self.mode
    }

    /// Builds the form of a [`FormData`] type.
    pub fn create<T: FormData>(&self) -> FormResult<Form> {
        self.create_for_schema(&T::schema())
    }

    /// Builds the form of a schema.
    pub fn create_for_schema(&self, schema: &FormSchema) -> FormResult<Form> {
        debug!(form = %schema.name, mode = ?self.mode, "creating form");
        match self.mode {
            CompileMode::Runtime => Ok(Form::new(
                Arc::new(self.runtime.validator(schema)?),
                Arc::new(self.runtime.transformer(schema)?),
                Arc::new(self.runtime.instantiator(schema)?),
            )),
            CompileMode::Generated => Ok(Form::new(
                self.validators.create(schema)?,
                self.transformers.create(schema)?,
                self.instantiators.create(schema)?,
            )),
        }
    }
}
