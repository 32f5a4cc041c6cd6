//! Forms: the three strategies working together.
//!
//! A [`Form`] holds a transformer, a validator and a view instantiator, in
//! either their runtime or their generated implementation. Submitting wire
//! input runs the transformer, then the validator with the transform failures
//! as prior errors, then hydrates the data type when everything passed.

use std::fmt;
use std::sync::Arc;

use formforge_core::{ErrorMap, FormResult, ValueMap};

use crate::instantiator::ViewInstantiator;
use crate::schema::FormData;
use crate::transformer::FormTransformer;
use crate::validator::FormValidator;
use crate::views::FormView;

/// A form built from three strategy objects.
#[derive(Debug, Clone)]
pub struct Form {
    validator: Arc<dyn FormValidator>,
    transformer: Arc<dyn FormTransformer>,
    instantiator: Arc<dyn ViewInstantiator>,
    parent: Option<String>,
}

impl Form {
    pub fn new(
        validator: Arc<dyn FormValidator>,
        transformer: Arc<dyn FormTransformer>,
        instantiator: Arc<dyn ViewInstantiator>,
    ) -> Self {
        Self {
            validator,
            transformer,
            instantiator,
            parent: None,
        }
    }

    /// Nests the form's wire names under `parent`, e.g. `parent[email]`.
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn validator(&self) -> &Arc<dyn FormValidator> {
        &self.validator
    }

    pub fn transformer(&self) -> &Arc<dyn FormTransformer> {
        &self.transformer
    }

    pub fn instantiator(&self) -> &Arc<dyn ViewInstantiator> {
        &self.instantiator
    }

    /// Processes submitted wire input.
    ///
    /// Fields whose transformation failed keep that error and are not
    /// validated. The data type is hydrated only when no field has an error.
    pub fn submit<T: FormData>(&self, input: &ValueMap) -> FormResult<SubmittedForm<T>> {
        let transformed = self.transformer.from_wire(input)?;
        let errors = self
            .validator
            .validate(&transformed.values, &transformed.errors)?;
        let data = if errors.is_empty() {
            Some(T::from_values(&transformed.values)?)
        } else {
            None
        };
        tracing::debug!(
            fields = transformed.values.len(),
            errors = errors.len(),
            "form submitted"
        );
        Ok(SubmittedForm {
            input: input.clone(),
            values: transformed.values,
            errors,
            data,
            instantiator: Arc::clone(&self.instantiator),
            parent: self.parent.clone(),
        })
    }

    /// Converts existing data into wire values for editing.
    pub fn import<T: FormData>(&self, data: &T) -> FormResult<ImportedForm> {
        let transformed = self.transformer.to_wire(&data.to_values())?;
        Ok(ImportedForm {
            wire: transformed.values,
            errors: transformed.errors,
            instantiator: Arc::clone(&self.instantiator),
            parent: self.parent.clone(),
        })
    }

    /// The view of an empty form.
    pub fn view(&self) -> FormResult<FormView> {
        self.instantiator.default(self.parent.as_deref())
    }
}

/// The result of submitting wire input.
pub struct SubmittedForm<T> {
    input: ValueMap,
    values: ValueMap,
    errors: ErrorMap,
    data: Option<T>,
    instantiator: Arc<dyn ViewInstantiator>,
    parent: Option<String>,
}

impl<T: fmt::Debug> fmt::Debug for SubmittedForm<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmittedForm")
            .field("input", &self.input)
            .field("errors", &self.errors)
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

impl<T> SubmittedForm<T> {
    /// Returns `true` if no field has an error.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors keyed by field name.
    pub const fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    /// The converted native values, including those of invalid submissions.
    pub const fn values(&self) -> &ValueMap {
        &self.values
    }

    /// The raw wire input.
    pub const fn input(&self) -> &ValueMap {
        &self.input
    }

    /// The hydrated data, present only when valid.
    pub const fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Consumes the submission, returning the hydrated data if valid.
    pub fn into_data(self) -> Option<T> {
        self.data
    }

    /// The view of the submission: raw input redisplayed with errors.
    pub fn view(&self) -> FormResult<FormView> {
        self.instantiator
            .submitted(&self.input, &self.errors, self.parent.as_deref())
    }
}

/// Existing data converted to wire values.
pub struct ImportedForm {
    wire: ValueMap,
    errors: ErrorMap,
    instantiator: Arc<dyn ViewInstantiator>,
    parent: Option<String>,
}

impl fmt::Debug for ImportedForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportedForm")
            .field("wire", &self.wire)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

impl ImportedForm {
    /// Wire values keyed by wire name.
    pub const fn wire(&self) -> &ValueMap {
        &self.wire
    }

    /// Fields whose values could not be converted back.
    pub const fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    /// The view pre-filled with the imported values.
    pub fn view(&self) -> FormResult<FormView> {
        self.instantiator
            .submitted(&self.wire, &ErrorMap::new(), self.parent.as_deref())
    }
}
