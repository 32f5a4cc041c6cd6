//! The view-instantiator contract and its interpreted implementation.

use std::fmt;

use formforge_core::{ErrorMap, FormResult, Value, ValueMap};

use crate::views::{FormView, ViewConfig};

/// Builds render-ready views of a form.
///
/// Implemented by [`RuntimeInstantiator`] and by generated instantiator units.
pub trait ViewInstantiator: Send + Sync + fmt::Debug {
    /// The view of submitted input: wire values keyed by wire name and errors
    /// keyed by field name.
    fn submitted(
        &self,
        values: &ValueMap,
        errors: &ErrorMap,
        parent: Option<&str>,
    ) -> FormResult<FormView>;

    /// The view of an empty form.
    fn default(&self, parent: Option<&str>) -> FormResult<FormView>;

    /// The interpreted shape of this instantiator, if it has one.
    fn runtime(&self) -> Option<&RuntimeInstantiator> {
        None
    }
}

/// One field's view configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstantiatorField {
    pub name: String,
    pub wire_name: String,
    pub required: bool,
    pub config: ViewConfig,
}

/// Interprets view configurations directly.
#[derive(Debug, Clone)]
pub struct RuntimeInstantiator {
    fields: Vec<InstantiatorField>,
}

impl RuntimeInstantiator {
    pub fn new(fields: Vec<InstantiatorField>) -> Self {
        Self { fields }
    }

    /// The field configurations in declaration order.
    pub fn fields(&self) -> &[InstantiatorField] {
        &self.fields
    }
}

impl ViewInstantiator for RuntimeInstantiator {
    fn submitted(
        &self,
        values: &ValueMap,
        errors: &ErrorMap,
        parent: Option<&str>,
    ) -> FormResult<FormView> {
        let fields = self
            .fields
            .iter()
            .map(|field| {
                field.config.instantiate(
                    &field.name,
                    &field.wire_name,
                    field.required,
                    values.get(&field.wire_name).cloned().unwrap_or_default(),
                    errors.get(&field.name).cloned(),
                    parent,
                )
            })
            .collect();
        Ok(FormView { fields })
    }

    fn default(&self, parent: Option<&str>) -> FormResult<FormView> {
        let fields = self
            .fields
            .iter()
            .map(|field| {
                field.config.instantiate(
                    &field.name,
                    &field.wire_name,
                    field.required,
                    Value::Null,
                    None,
                    parent,
                )
            })
            .collect();
        Ok(FormView { fields })
    }

    fn runtime(&self) -> Option<&RuntimeInstantiator> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::WidgetType;
    use formforge_core::FieldError;

    fn instantiator() -> RuntimeInstantiator {
        RuntimeInstantiator::new(vec![
            InstantiatorField {
                name: "email".into(),
                wire_name: "e".into(),
                required: true,
                config: ViewConfig::new(WidgetType::EmailInput),
            },
            InstantiatorField {
                name: "agree".into(),
                wire_name: "agree".into(),
                required: false,
                config: ViewConfig::new(WidgetType::Checkbox),
            },
        ])
    }

    #[test]
    fn test_submitted_view() {
        let values = ValueMap::from([
            ("e".to_string(), Value::from("x@")),
            ("agree".to_string(), Value::from("1")),
        ]);
        let errors = ErrorMap::from([(
            "email".to_string(),
            FieldError::new("bad", "invalid_email").into(),
        )]);
        let view = instantiator()
            .submitted(&values, &errors, Some("signup"))
            .unwrap();
        let email = view.get("email").unwrap();
        assert_eq!(email.name, "signup[e]");
        assert_eq!(email.value, Value::from("x@"));
        assert!(email.has_error());
        assert!(view.get("agree").unwrap().checked);
    }

    #[test]
    fn test_default_view() {
        let view = instantiator().default(None).unwrap();
        assert!(!view.has_errors());
        assert_eq!(view.get("email").unwrap().value, Value::Null);
        assert_eq!(view.fields.len(), 2);
    }
}
