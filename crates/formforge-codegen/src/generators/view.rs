//! View generators.
//!
//! A view generator does not return an expression directly. It returns a
//! [`ViewClosure`] that builds one from [`ViewAccessors`], so the same
//! configuration serves both the submitted view (value and error known) and
//! the default view (neither known).

use std::collections::BTreeMap;

use formforge_core::FormResult;
use formforge_forms::{ViewConfig, WidgetType};

use super::ViewGenerator;
use crate::expr::{self, Expression};

/// The field a view is generated for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewField {
    pub name: String,
    pub wire_name: String,
    pub required: bool,
}

/// Accessor expressions supplied by the emitter.
#[derive(Debug, Clone)]
pub struct ViewAccessors {
    /// The field's wire value, or `null`.
    pub value: Expression,
    /// The field's error outcome, or `null`.
    pub error: Expression,
    /// The parent form's name, or `null` at the top level.
    pub parent: Expression,
}

/// Builds the view expression of one field from its accessors.
pub type ViewClosure = Box<dyn Fn(&ViewAccessors) -> FormResult<Expression> + Send + Sync>;

fn attributes(attributes: &BTreeMap<String, String>) -> Expression {
    expr::table(
        attributes
            .iter()
            .map(|(k, v)| (k.clone(), expr::string(v)))
            .collect(),
    )
}

fn qualified_name(parent: &Expression, wire: &Expression) -> Expression {
    expr::call("view.name", [parent.clone(), wire.clone()])
}

/// `(view.build (view-config {..}) "<field>" "<wire>" required V E P)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackViewGenerator;

impl ViewGenerator for FallbackViewGenerator {
    fn generate(&self, config: &ViewConfig, field: &ViewField) -> FormResult<ViewClosure> {
        let literal = expr::struct_literal("view-config", config)?;
        let name = expr::string(&field.name);
        let wire = expr::string(&field.wire_name);
        let required = expr::boolean(field.required);
        Ok(Box::new(move |acc: &ViewAccessors| {
            Ok(expr::call(
                "view.build",
                [
                    literal.clone(),
                    name.clone(),
                    wire.clone(),
                    required.clone(),
                    acc.value.clone(),
                    acc.error.clone(),
                    acc.parent.clone(),
                ],
            ))
        }))
    }
}

/// Text-like inputs: every widget that is neither a checkbox nor a select.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputViewGenerator;

impl ViewGenerator for InputViewGenerator {
    fn generate(&self, config: &ViewConfig, field: &ViewField) -> FormResult<ViewClosure> {
        if config.widget == WidgetType::Checkbox || config.widget.is_choice() {
            return FallbackViewGenerator.generate(config, field);
        }
        let name = expr::string(&field.name);
        let wire = expr::string(&field.wire_name);
        let widget = expr::string(config.widget.name());
        let required = expr::boolean(field.required);
        let attrs = attributes(&config.attributes);
        Ok(Box::new(move |acc: &ViewAccessors| {
            Ok(expr::call(
                "view.input",
                [
                    name.clone(),
                    qualified_name(&acc.parent, &wire),
                    widget.clone(),
                    required.clone(),
                    attrs.clone(),
                    acc.value.clone(),
                    acc.error.clone(),
                ],
            ))
        }))
    }
}

/// `(view.checkbox "<field>" NAME required {attrs} "<checked>" V E)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckboxViewGenerator;

impl ViewGenerator for CheckboxViewGenerator {
    fn generate(&self, config: &ViewConfig, field: &ViewField) -> FormResult<ViewClosure> {
        if config.widget != WidgetType::Checkbox {
            return FallbackViewGenerator.generate(config, field);
        }
        let name = expr::string(&field.name);
        let wire = expr::string(&field.wire_name);
        let required = expr::boolean(field.required);
        let attrs = attributes(&config.attributes);
        let checked = expr::string(config.effective_checked_value());
        Ok(Box::new(move |acc: &ViewAccessors| {
            Ok(expr::call(
                "view.checkbox",
                [
                    name.clone(),
                    qualified_name(&acc.parent, &wire),
                    required.clone(),
                    attrs.clone(),
                    checked.clone(),
                    acc.value.clone(),
                    acc.error.clone(),
                ],
            ))
        }))
    }
}

/// `(view.select "<field>" NAME "<widget>" required {attrs} [[v l]..] V E)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectViewGenerator;

impl ViewGenerator for SelectViewGenerator {
    fn generate(&self, config: &ViewConfig, field: &ViewField) -> FormResult<ViewClosure> {
        if !config.widget.is_choice() {
            return FallbackViewGenerator.generate(config, field);
        }
        let name = expr::string(&field.name);
        let wire = expr::string(&field.wire_name);
        let widget = expr::string(config.widget.name());
        let required = expr::boolean(field.required);
        let attrs = attributes(&config.attributes);
        let choices = expr::list(
            config
                .choices
                .iter()
                .map(|(value, label)| expr::list(vec![expr::string(value), expr::string(label)]))
                .collect(),
        );
        Ok(Box::new(move |acc: &ViewAccessors| {
            Ok(expr::call(
                "view.select",
                [
                    name.clone(),
                    qualified_name(&acc.parent, &wire),
                    widget.clone(),
                    required.clone(),
                    attrs.clone(),
                    choices.clone(),
                    acc.value.clone(),
                    acc.error.clone(),
                ],
            ))
        }))
    }
}
