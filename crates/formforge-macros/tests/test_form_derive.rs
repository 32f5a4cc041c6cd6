//! Integration tests for `#[derive(FormData)]`.
//!
//! These tests check the generated schema and value conversions, and run
//! derived types through both compile modes.

use std::sync::Arc;

use chrono::NaiveDate;
use formforge_codegen::FormFactory;
use formforge_core::{CompileMode, Settings};
use formforge_forms::{
    Constraint, FormData, Transform, Value, ValueMap, ValueType, WidgetType,
};
use formforge_macros::FormData;
use tempfile::TempDir;

// ── Basic form ──────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, FormData)]
pub struct Contact {
    #[form_field(min_length = 2, max_length = 40, transforms = ["trim"])]
    pub name: String,

    #[form_field(email, wire_name = "mail", widget = "email")]
    pub email: String,

    #[form_field(widget = "textarea")]
    pub message: Option<String>,
}

#[test]
fn test_contact_schema_name() {
    assert_eq!(
        Contact::schema().name,
        concat!(module_path!(), "::Contact")
    );
}

#[test]
fn test_contact_fields_in_declaration_order() {
    let schema = Contact::schema();
    let names: Vec<&str> = schema.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["name", "email", "message"]);
}

#[test]
fn test_contact_name_field() {
    let schema = Contact::schema();
    let name = schema.field("name").unwrap();
    assert!(name.required);
    assert_eq!(name.value_type, ValueType::String);
    assert_eq!(
        name.constraints,
        vec![Constraint::Length {
            min: Some(2),
            max: Some(40),
        }]
    );
    assert_eq!(name.transforms, vec![Transform::Trim]);
}

#[test]
fn test_contact_email_field() {
    let schema = Contact::schema();
    let email = schema.field("email").unwrap();
    assert_eq!(email.wire_name, "mail");
    assert_eq!(email.constraints, vec![Constraint::Email]);
    assert_eq!(email.view.widget, WidgetType::EmailInput);
}

#[test]
fn test_contact_optional_message() {
    let schema = Contact::schema();
    let message = schema.field("message").unwrap();
    assert!(!message.required);
    assert_eq!(message.view.widget, WidgetType::Textarea);
}

#[test]
fn test_contact_value_conversions() {
    let contact = Contact {
        name: "Ada".into(),
        email: "ada@example.com".into(),
        message: None,
    };
    let values = contact.to_values();
    assert_eq!(values["name"], Value::from("Ada"));
    assert_eq!(values["message"], Value::Null);
    assert_eq!(Contact::from_values(&values).unwrap(), contact);
}

#[test]
fn test_contact_from_values_reports_type_mismatch() {
    let values = ValueMap::from([("name".to_string(), Value::Int(3))]);
    assert!(Contact::from_values(&values).is_err());
}

// ── Typed fields and transforms ─────────────────────────────────────────

#[derive(Debug, PartialEq, FormData)]
#[form(name = "shop::Order")]
pub struct Order {
    #[form_field(min = 1.0, max = 99.0)]
    pub quantity: i64,

    #[form_field(choices = ["s:Small", "m:Medium", "l"], transforms = ["trim", "lowercase", "default:m"])]
    pub size: String,

    #[form_field(transforms = ["trim", "split:,"], required = false)]
    pub tags: Vec<String>,

    #[form_field(transforms = ["date_format:%d/%m/%Y"])]
    pub ship_on: Option<NaiveDate>,

    #[form_field(pattern = "^[A-Z]{2}$", pattern_message = "Two capitals.")]
    pub country: String,

    pub gift: bool,

    #[form_field(value_type = "any", required = false)]
    pub extra: Value,
}

#[test]
fn test_order_schema_name_override() {
    assert_eq!(Order::schema().name, "shop::Order");
}

#[test]
fn test_order_inferred_types() {
    let schema = Order::schema();
    let types: Vec<ValueType> = schema.fields.iter().map(|f| f.value_type).collect();
    assert_eq!(
        types,
        vec![
            ValueType::Int,
            ValueType::String,
            ValueType::List,
            ValueType::Date,
            ValueType::String,
            ValueType::Bool,
            ValueType::Any,
        ]
    );
}

#[test]
fn test_order_choices() {
    let schema = Order::schema();
    let size = schema.field("size").unwrap();
    assert_eq!(size.view.widget, WidgetType::Select);
    assert_eq!(
        size.view.choices,
        vec![
            ("s".to_string(), "Small".to_string()),
            ("m".to_string(), "Medium".to_string()),
            ("l".to_string(), "l".to_string()),
        ]
    );
    assert_eq!(
        size.constraints,
        vec![Constraint::Choice {
            choices: vec![Value::from("s"), Value::from("m"), Value::from("l")],
            multiple: false,
        }]
    );
    assert_eq!(
        size.transforms,
        vec![
            Transform::Trim,
            Transform::Lowercase,
            Transform::Default {
                value: Value::from("m"),
            },
        ]
    );
}

#[test]
fn test_order_parameterized_transforms() {
    let schema = Order::schema();
    assert_eq!(
        schema.field("tags").unwrap().transforms,
        vec![
            Transform::Trim,
            Transform::Split {
                separator: ",".into(),
            },
        ]
    );
    assert_eq!(
        schema.field("ship_on").unwrap().transforms,
        vec![Transform::DateFormat {
            format: "%d/%m/%Y".into(),
        }]
    );
    assert!(!schema.field("ship_on").unwrap().required);
}

#[test]
fn test_order_constraints() {
    let schema = Order::schema();
    assert_eq!(
        schema.field("quantity").unwrap().constraints,
        vec![Constraint::Range {
            min: Some(1.0),
            max: Some(99.0),
        }]
    );
    assert_eq!(
        schema.field("country").unwrap().constraints,
        vec![Constraint::Pattern {
            pattern: "^[A-Z]{2}$".into(),
            message: Some("Two capitals.".into()),
        }]
    );
    assert!(schema.check().is_ok());
}

// ── Through the form factory ────────────────────────────────────────────

fn wire(pairs: &[(&str, &str)]) -> ValueMap {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), Value::from(*v)))
        .collect()
}

fn factory(mode: CompileMode, dir: &TempDir) -> FormFactory {
    let settings = Settings {
        compile_mode: mode,
        unit_dir: dir.path().to_path_buf(),
        ..Settings::default()
    };
    FormFactory::new(&settings, Arc::default())
}

#[test]
fn test_derived_order_submits_in_both_modes() {
    let dir = TempDir::new().unwrap();
    let input = wire(&[
        ("quantity", "3"),
        ("size", "  M "),
        ("tags", "red,blue"),
        ("ship_on", "05/01/2024"),
        ("country", "NL"),
        ("gift", "on"),
    ]);
    let expected = Order {
        quantity: 3,
        size: "m".into(),
        tags: vec!["red".into(), "blue".into()],
        ship_on: NaiveDate::from_ymd_opt(2024, 1, 5),
        country: "NL".into(),
        gift: true,
        extra: Value::Null,
    };

    for mode in [CompileMode::Runtime, CompileMode::Generated] {
        let form = factory(mode, &dir).create::<Order>().unwrap();
        let submitted = form.submit::<Order>(&input).unwrap();
        assert!(submitted.is_valid(), "{mode:?}: {:?}", submitted.errors());
        assert_eq!(submitted.into_data().unwrap(), expected);
    }
}

#[test]
fn test_derived_contact_errors_match_across_modes() {
    let dir = TempDir::new().unwrap();
    let input = wire(&[("name", " A "), ("mail", "not-an-email")]);

    let runtime = factory(CompileMode::Runtime, &dir)
        .create::<Contact>()
        .unwrap()
        .submit::<Contact>(&input)
        .unwrap();
    let generated = factory(CompileMode::Generated, &dir)
        .create::<Contact>()
        .unwrap()
        .submit::<Contact>(&input)
        .unwrap();

    assert_eq!(runtime.errors(), generated.errors());
    assert_eq!(
        generated.errors()["name"].as_leaf().unwrap().code,
        "too_short"
    );
    assert_eq!(
        generated.errors()["email"].as_leaf().unwrap().code,
        "invalid_email"
    );
}
