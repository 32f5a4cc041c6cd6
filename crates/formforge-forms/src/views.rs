//! Render-ready view models.
//!
//! A [`ViewConfig`] describes how a field is presented. Instantiating it with
//! a field's current wire value and error outcome yields a [`FieldView`],
//! which carries everything a template needs and nothing it has to compute.
//! The builder functions are shared by the runtime instantiator and by
//! generated units.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use formforge_core::{ErrorNode, Value};

/// Enumerates the built-in widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetType {
    /// `<input type="text">`.
    #[default]
    TextInput,
    /// `<input type="number">`.
    NumberInput,
    /// `<input type="email">`.
    EmailInput,
    /// `<input type="password">`; never echoes its value.
    PasswordInput,
    /// `<input type="hidden">`.
    HiddenInput,
    /// `<textarea>`.
    Textarea,
    /// `<input type="checkbox">`.
    Checkbox,
    /// `<select>`.
    Select,
    /// `<select multiple>`.
    SelectMultiple,
    /// `<input type="date">`.
    DateInput,
}

impl WidgetType {
    /// All widgets, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::TextInput,
        Self::NumberInput,
        Self::EmailInput,
        Self::PasswordInput,
        Self::HiddenInput,
        Self::Textarea,
        Self::Checkbox,
        Self::Select,
        Self::SelectMultiple,
        Self::DateInput,
    ];

    /// The snake_case name used in serialized configs and unit text.
    pub const fn name(self) -> &'static str {
        match self {
            Self::TextInput => "text_input",
            Self::NumberInput => "number_input",
            Self::EmailInput => "email_input",
            Self::PasswordInput => "password_input",
            Self::HiddenInput => "hidden_input",
            Self::Textarea => "textarea",
            Self::Checkbox => "checkbox",
            Self::Select => "select",
            Self::SelectMultiple => "select_multiple",
            Self::DateInput => "date_input",
        }
    }

    /// Looks a widget up by its snake_case name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.name() == name)
    }

    /// Whether the widget offers a fixed set of choices.
    pub const fn is_choice(self) -> bool {
        matches!(self, Self::Select | Self::SelectMultiple)
    }
}

impl fmt::Display for WidgetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a field is presented.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewConfig {
    /// The widget.
    pub widget: WidgetType,
    /// Static HTML attributes.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// `(value, label)` pairs for choice widgets.
    #[serde(default)]
    pub choices: Vec<(String, String)>,
    /// The value a checked checkbox submits. Defaults to `"1"`.
    #[serde(default)]
    pub checked_value: Option<String>,
}

impl ViewConfig {
    /// Creates a config for `widget` with no attributes.
    pub fn new(widget: WidgetType) -> Self {
        Self {
            widget,
            ..Self::default()
        }
    }

    /// Adds a static attribute.
    #[must_use]
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Sets the choices.
    #[must_use]
    pub fn choices(mut self, choices: Vec<(String, String)>) -> Self {
        self.choices = choices;
        self
    }

    /// Sets the value a checked checkbox submits.
    #[must_use]
    pub fn checked_value(mut self, value: impl Into<String>) -> Self {
        self.checked_value = Some(value.into());
        self
    }

    /// The effective checked value.
    pub fn effective_checked_value(&self) -> &str {
        self.checked_value.as_deref().unwrap_or("1")
    }

    /// Builds the view of one field.
    pub fn instantiate(
        &self,
        field: &str,
        wire_name: &str,
        required: bool,
        value: Value,
        error: Option<ErrorNode>,
        parent: Option<&str>,
    ) -> FieldView {
        let name = qualified_name(parent, wire_name);
        match self.widget {
            WidgetType::Checkbox => build_checkbox_view(
                field,
                name,
                required,
                &self.attributes,
                self.effective_checked_value(),
                &value,
                error,
            ),
            WidgetType::Select | WidgetType::SelectMultiple => build_select_view(
                field,
                name,
                self.widget,
                required,
                &self.attributes,
                &self.choices,
                value,
                error,
            ),
            widget => build_input_view(field, name, widget, required, &self.attributes, value, error),
        }
    }
}

/// One option of a choice widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// The render-ready view of one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldView {
    /// The field name.
    pub field: String,
    /// The HTML `name` attribute, qualified by the parent form.
    pub name: String,
    /// The widget.
    pub widget: WidgetType,
    /// The wire value to display.
    pub value: Value,
    /// The field's error outcome, if any.
    pub error: Option<ErrorNode>,
    /// Whether the field is required.
    pub required: bool,
    /// Static HTML attributes.
    pub attributes: BTreeMap<String, String>,
    /// Options for choice widgets.
    pub choices: Vec<ChoiceView>,
    /// Whether a checkbox is checked.
    pub checked: bool,
}

impl FieldView {
    /// Returns `true` if the field has an error.
    pub const fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// The rendered first error message.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().and_then(ErrorNode::first).map(ToString::to_string)
    }
}

/// The render-ready view of a form.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormView {
    /// Field views in declaration order.
    pub fields: Vec<FieldView>,
}

impl FormView {
    /// Looks up a field view by field name.
    pub fn get(&self, field: &str) -> Option<&FieldView> {
        self.fields.iter().find(|view| view.field == field)
    }

    /// Returns `true` if any field has an error.
    pub fn has_errors(&self) -> bool {
        self.fields.iter().any(FieldView::has_error)
    }

    /// Iterates over the field views.
    pub fn iter(&self) -> std::slice::Iter<'_, FieldView> {
        self.fields.iter()
    }
}

impl<'a> IntoIterator for &'a FormView {
    type Item = &'a FieldView;
    type IntoIter = std::slice::Iter<'a, FieldView>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

// ── Builders shared with generated units ───────────────────────────────

/// Qualifies a wire name with its parent form: `parent[wire]`.
pub fn qualified_name(parent: Option<&str>, wire_name: &str) -> String {
    match parent {
        Some(parent) if !parent.is_empty() => format!("{parent}[{wire_name}]"),
        _ => wire_name.to_string(),
    }
}

/// The text a scalar wire value submits, if any.
pub fn wire_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::List(_) | Value::Map(_) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Builds a text-like input. Password inputs never echo their value.
pub fn build_input_view(
    field: &str,
    name: String,
    widget: WidgetType,
    required: bool,
    attributes: &BTreeMap<String, String>,
    value: Value,
    error: Option<ErrorNode>,
) -> FieldView {
    let value = if widget == WidgetType::PasswordInput {
        Value::Null
    } else {
        value
    };
    FieldView {
        field: field.to_string(),
        name,
        widget,
        value,
        error,
        required,
        attributes: attributes.clone(),
        choices: Vec::new(),
        checked: false,
    }
}

/// Builds a checkbox. It is checked when the value is `true` or equals the checked value.
pub fn build_checkbox_view(
    field: &str,
    name: String,
    required: bool,
    attributes: &BTreeMap<String, String>,
    checked_value: &str,
    value: &Value,
    error: Option<ErrorNode>,
) -> FieldView {
    let checked = match value {
        Value::Bool(b) => *b,
        other => wire_text(other).is_some_and(|text| text == checked_value),
    };
    FieldView {
        field: field.to_string(),
        name,
        widget: WidgetType::Checkbox,
        value: Value::from(checked_value),
        error,
        required,
        attributes: attributes.clone(),
        choices: Vec::new(),
        checked,
    }
}

/// Builds a select. Multi-selects submit a list, so their name gains `[]`.
#[allow(clippy::too_many_arguments)]
pub fn build_select_view(
    field: &str,
    name: String,
    widget: WidgetType,
    required: bool,
    attributes: &BTreeMap<String, String>,
    choices: &[(String, String)],
    value: Value,
    error: Option<ErrorNode>,
) -> FieldView {
    let selected: Vec<String> = match &value {
        Value::List(items) => items.iter().filter_map(wire_text).collect(),
        other => wire_text(other).into_iter().collect(),
    };
    let name = if widget == WidgetType::SelectMultiple {
        format!("{name}[]")
    } else {
        name
    };
    FieldView {
        field: field.to_string(),
        name,
        widget,
        value,
        error,
        required,
        attributes: attributes.clone(),
        choices: choices
            .iter()
            .map(|(value, label)| ChoiceView {
                value: value.clone(),
                label: label.clone(),
                selected: selected.contains(value),
            })
            .collect(),
        checked: false,
    }
}
