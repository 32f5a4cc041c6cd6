//! Field descriptors and form schemas.
//!
//! A [`FormSchema`] is the parsed metadata of one data type: its ordered
//! fields, each with a wire name, requiredness, constraints, transform steps
//! and view configuration. Schemas are normally produced by
//! `#[derive(FormData)]`, but can be assembled by hand with the
//! [`FieldDescriptor`] builder.
//!
//! # Examples
//!
//! ```
//! use formforge_forms::{Constraint, FieldDescriptor, FormSchema, ValueType};
//!
//! let schema = FormSchema::new(
//!     "app::Signup",
//!     vec![
//!         FieldDescriptor::new("email", ValueType::String).constraint(Constraint::Email),
//!         FieldDescriptor::new("age", ValueType::Int).required(false),
//!     ],
//! );
//! assert!(schema.check().is_ok());
//! assert_eq!(schema.fingerprint().len(), 64);
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use formforge_core::{FormResult, FormforgeError, ValueMap};

use crate::constraints::{is_valid_pattern, Constraint};
use crate::transforms::{Transform, DATETIME_FORMAT, DATE_FORMAT};
use crate::views::{ViewConfig, WidgetType};

/// The native type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    String,
    Int,
    Float,
    Bool,
    Date,
    DateTime,
    List,
    /// No implicit conversion.
    Any,
}

impl ValueType {
    /// The cast step implied by this type, if any.
    pub fn implicit_cast(self) -> Option<Transform> {
        match self {
            Self::Int => Some(Transform::ToInteger),
            Self::Float => Some(Transform::ToFloat),
            Self::Bool => Some(Transform::ToBoolean),
            Self::Date => Some(Transform::DateFormat {
                format: DATE_FORMAT.to_string(),
            }),
            Self::DateTime => Some(Transform::DateFormat {
                format: DATETIME_FORMAT.to_string(),
            }),
            Self::String | Self::List | Self::Any => None,
        }
    }
}

/// Returns the default widget for a value type.
pub const fn default_widget_for_type(value_type: ValueType) -> WidgetType {
    match value_type {
        ValueType::Int | ValueType::Float => WidgetType::NumberInput,
        ValueType::Bool => WidgetType::Checkbox,
        ValueType::Date | ValueType::DateTime => WidgetType::DateInput,
        ValueType::List => WidgetType::SelectMultiple,
        ValueType::String | ValueType::Any => WidgetType::TextInput,
    }
}

/// Describes one field of a form.
///
/// Fields are required by default; a required field gets an implicit
/// `NotBlank` as its first constraint when strategies are built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// The native field name.
    pub name: String,
    /// The key used in submitted input. Defaults to `name`.
    pub wire_name: String,
    /// The native type.
    pub value_type: ValueType,
    /// Whether the field is required.
    pub required: bool,
    /// Ordered constraints.
    pub constraints: Vec<Constraint>,
    /// Ordered transform steps.
    pub transforms: Vec<Transform>,
    /// View configuration.
    pub view: ViewConfig,
}

impl FieldDescriptor {
    /// Creates a required field with the default widget for its type.
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        let name = name.into();
        Self {
            wire_name: name.clone(),
            name,
            value_type,
            required: true,
            constraints: Vec::new(),
            transforms: Vec::new(),
            view: ViewConfig::new(default_widget_for_type(value_type)),
        }
    }

    /// Sets the wire name.
    #[must_use]
    pub fn wire_name(mut self, wire_name: impl Into<String>) -> Self {
        self.wire_name = wire_name.into();
        self
    }

    /// Sets whether the field is required.
    #[must_use]
    pub const fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Appends a constraint.
    #[must_use]
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Appends a transform step.
    #[must_use]
    pub fn transform(mut self, transform: Transform) -> Self {
        self.transforms.push(transform);
        self
    }

    /// Replaces the view configuration.
    #[must_use]
    pub fn view(mut self, view: ViewConfig) -> Self {
        self.view = view;
        self
    }

    /// Sets the widget, keeping other view settings.
    #[must_use]
    pub const fn widget(mut self, widget: WidgetType) -> Self {
        self.view.widget = widget;
        self
    }

    /// Adds a static HTML attribute.
    #[must_use]
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.view = self.view.attribute(key, value);
        self
    }

    /// Sets the `(value, label)` choices of a choice widget.
    #[must_use]
    pub fn choices(mut self, choices: Vec<(String, String)>) -> Self {
        self.view = self.view.choices(choices);
        self
    }

    fn check(&self) -> FormResult<()> {
        let mut invalid = None;
        for constraint in &self.constraints {
            constraint.walk(&mut |inner| {
                if let Constraint::Pattern { pattern, .. } = inner {
                    if invalid.is_none() && !is_valid_pattern(pattern) {
                        invalid = Some(pattern.clone());
                    }
                }
            });
        }
        match invalid {
            Some(pattern) => Err(FormforgeError::Configuration(format!(
                "Field '{}' has an invalid pattern: {pattern}",
                self.name
            ))),
            None => Ok(()),
        }
    }
}

/// The ordered field descriptors of one data type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSchema {
    /// The data type's identity, e.g. `app::forms::Signup`.
    pub name: String,
    /// Fields in declaration order.
    pub fields: Vec<FieldDescriptor>,
}

impl FormSchema {
    /// Creates a schema.
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Rejects duplicate field names, duplicate wire names, and invalid patterns.
    pub fn check(&self) -> FormResult<()> {
        let mut names = HashSet::new();
        let mut wire_names = HashSet::new();
        for field in &self.fields {
            if !names.insert(field.name.as_str()) {
                return Err(FormforgeError::Configuration(format!(
                    "Form '{}' declares field '{}' twice",
                    self.name, field.name
                )));
            }
            if !wire_names.insert(field.wire_name.as_str()) {
                return Err(FormforgeError::Configuration(format!(
                    "Form '{}' uses wire name '{}' twice",
                    self.name, field.wire_name
                )));
            }
            field.check()?;
        }
        Ok(())
    }

    /// Hex SHA-256 of the schema's canonical JSON form.
    ///
    /// Any change to a field, constraint, transform, or view changes the
    /// fingerprint, which is how persisted units are recognized as stale.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let digest = Sha256::digest(&bytes);
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// A plain data type with form metadata.
///
/// Usually implemented with `#[derive(FormData)]`.
pub trait FormData: Sized {
    /// The form schema of this type.
    fn schema() -> FormSchema;

    /// Hydrates an instance from validated native values.
    fn from_values(values: &ValueMap) -> FormResult<Self>;

    /// Extracts native values keyed by field name.
    fn to_values(&self) -> ValueMap;
}
