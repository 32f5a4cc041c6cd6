//! # formforge-forms
//!
//! Form schemas and their interpreted ("runtime") execution.
//!
//! A [`FormSchema`] lists a data type's fields together with their ordered
//! constraints, transform steps, and view configuration. The
//! [`RuntimeFactory`] turns a schema into the three runtime strategy objects:
//!
//! - [`RuntimeTransformer`] maps wire input to native values and back
//! - [`RuntimeValidator`] checks native values field by field
//! - [`RuntimeInstantiator`] builds the render-ready [`FormView`]
//!
//! The same three contracts ([`FormTransformer`], [`FormValidator`],
//! [`ViewInstantiator`]) are implemented by generated units in
//! `formforge-codegen`. [`Form`] ties them together for submission.

pub mod constraints;
pub mod form;
pub mod instantiator;
pub mod registry;
pub mod runtime;
pub mod schema;
pub mod transformer;
pub mod transforms;
pub mod validator;
pub mod views;
pub mod wire;

pub use constraints::Constraint;
pub use form::{Form, ImportedForm, SubmittedForm};
pub use instantiator::{InstantiatorField, RuntimeInstantiator, ViewInstantiator};
pub use registry::{CustomConstraint, CustomTransform, StrategyRegistry};
pub use runtime::RuntimeFactory;
pub use schema::{FieldDescriptor, FormData, FormSchema, ValueType};
pub use transformer::{FormTransformer, RuntimeTransformer, TransformerField, Transformed};
pub use transforms::Transform;
pub use validator::{FormValidator, RuntimeValidator, ValidatorField};
pub use views::{ChoiceView, FieldView, FormView, ViewConfig, WidgetType};

// Re-exported so derived code only needs to name this crate.
pub use formforge_core::{
    ErrorMap, ErrorNode, FieldError, FormResult, FormforgeError, FromValue, ToValue, Value,
    ValueMap,
};
