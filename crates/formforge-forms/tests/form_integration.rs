//! Integration tests for the wire -> transform -> validate -> view pipeline
//! using the runtime strategies.

use std::sync::Arc;

use chrono::NaiveDate;

use formforge_forms::wire::parse_urlencoded;
use formforge_forms::{
    Constraint, CustomTransform, ErrorNode, FieldDescriptor, FieldError, Form, FormData,
    FormResult, FormSchema, FormTransformer, FormValidator, FromValue, RuntimeFactory,
    StrategyRegistry, ToValue, Transform, Value, ValueMap, ValueType, ViewConfig, WidgetType,
};

// ============================================================================
// Shared helpers
// ============================================================================

#[derive(Debug, PartialEq)]
struct Signup {
    username: String,
    email: String,
    tags: Vec<String>,
    newsletter: bool,
    color: Option<String>,
}

impl FormData for Signup {
    fn schema() -> FormSchema {
        FormSchema::new(
            "integration::Signup",
            vec![
                FieldDescriptor::new("username", ValueType::String)
                    .transform(Transform::Trim)
                    .transform(Transform::Lowercase)
                    .constraint(Constraint::Length {
                        min: Some(3),
                        max: Some(12),
                    })
                    .constraint(Constraint::Pattern {
                        pattern: "^[a-z0-9_]+$".into(),
                        message: Some("Letters, digits and underscores only.".into()),
                    }),
                FieldDescriptor::new("email", ValueType::String)
                    .wire_name("mail")
                    .constraint(Constraint::Email)
                    .widget(WidgetType::EmailInput),
                FieldDescriptor::new("tags", ValueType::List)
                    .required(false)
                    .transform(Transform::Split {
                        separator: ",".into(),
                    })
                    .constraint(Constraint::Each {
                        constraints: vec![Constraint::Length {
                            min: None,
                            max: Some(5),
                        }],
                    })
                    .widget(WidgetType::TextInput),
                FieldDescriptor::new("newsletter", ValueType::Bool).required(false),
                FieldDescriptor::new("color", ValueType::String)
                    .required(false)
                    .constraint(Constraint::Choice {
                        choices: vec![Value::from("red"), Value::from("blue")],
                        multiple: false,
                    })
                    .view(ViewConfig::new(WidgetType::Select).choices(vec![
                        ("red".into(), "Red".into()),
                        ("blue".into(), "Blue".into()),
                    ])),
            ],
        )
    }

    fn from_values(values: &ValueMap) -> FormResult<Self> {
        let get = |key: &str| values.get(key).unwrap_or(&Value::Null);
        Ok(Self {
            username: String::from_value(get("username"))?,
            email: String::from_value(get("email"))?,
            tags: Vec::<String>::from_value(get("tags"))?,
            newsletter: bool::from_value(get("newsletter"))?,
            color: Option::<String>::from_value(get("color"))?,
        })
    }

    fn to_values(&self) -> ValueMap {
        ValueMap::from([
            ("username".to_string(), self.username.to_value()),
            ("email".to_string(), self.email.to_value()),
            ("tags".to_string(), self.tags.to_value()),
            ("newsletter".to_string(), self.newsletter.to_value()),
            ("color".to_string(), self.color.to_value()),
        ])
    }
}

fn runtime_form(schema: &FormSchema, registry: StrategyRegistry) -> Form {
    let factory = RuntimeFactory::new(Arc::new(registry));
    Form::new(
        Arc::new(factory.validator(schema).unwrap()),
        Arc::new(factory.transformer(schema).unwrap()),
        Arc::new(factory.instantiator(schema).unwrap()),
    )
}

// ============================================================================
// Submission
// ============================================================================

#[test]
fn test_urlencoded_submission_hydrates() {
    let form = runtime_form(&Signup::schema(), StrategyRegistry::new());
    let input = parse_urlencoded(
        "username=+Ada_L+&mail=ada%40example.com&tags=rust,%20web&newsletter=on&color=blue",
    );
    let submitted = form.submit::<Signup>(&input).unwrap();
    assert!(submitted.is_valid(), "{:?}", submitted.errors());
    assert_eq!(
        submitted.into_data().unwrap(),
        Signup {
            username: "ada_l".into(),
            email: "ada@example.com".into(),
            tags: vec!["rust".into(), "web".into()],
            newsletter: true,
            color: Some("blue".into()),
        }
    );
}

#[test]
fn test_invalid_submission_reports_each_field_once() {
    let form = runtime_form(&Signup::schema(), StrategyRegistry::new());
    let input = parse_urlencoded("username=a!&mail=nope&tags=ok,toolong&color=green");
    let submitted = form.submit::<Signup>(&input).unwrap();
    let errors = submitted.errors();

    assert_eq!(errors["username"].as_leaf().unwrap().code, "too_short");
    assert_eq!(errors["email"].as_leaf().unwrap().code, "invalid_email");
    assert_eq!(
        errors["tags"].get("1").and_then(ErrorNode::as_leaf).unwrap().code,
        "too_long"
    );
    assert!(errors["tags"].get("0").is_none());
    assert_eq!(errors["color"].as_leaf().unwrap().code, "no_such_choice");
    assert!(!errors.contains_key("newsletter"));
    assert!(submitted.data().is_none());
}

#[test]
fn test_submitted_view_redisplays_raw_input() {
    let form = runtime_form(&Signup::schema(), StrategyRegistry::new()).with_parent("signup");
    let input = parse_urlencoded("username=Ab&mail=x&color=red");
    let view = form.submit::<Signup>(&input).unwrap().view().unwrap();

    let username = view.get("username").unwrap();
    assert_eq!(username.name, "signup[username]");
    assert_eq!(username.value, Value::from("Ab"));
    assert!(username.has_error());

    let email = view.get("email").unwrap();
    assert_eq!(email.name, "signup[mail]");
    assert_eq!(email.widget, WidgetType::EmailInput);

    let color = view.get("color").unwrap();
    assert!(color.choices.iter().any(|c| c.value == "red" && c.selected));
    assert!(!view.get("newsletter").unwrap().checked);
}

#[test]
fn test_import_round_trips_through_submit() {
    let form = runtime_form(&Signup::schema(), StrategyRegistry::new());
    let original = Signup {
        username: "grace".into(),
        email: "grace@example.com".into(),
        tags: vec!["cobol".into()],
        newsletter: false,
        color: None,
    };
    let imported = form.import(&original).unwrap();
    assert!(imported.errors().is_empty());
    assert_eq!(imported.wire()["mail"], Value::from("grace@example.com"));
    assert_eq!(imported.wire()["newsletter"], Value::from("0"));

    let resubmitted = form.submit::<Signup>(imported.wire()).unwrap();
    assert_eq!(resubmitted.into_data().unwrap(), original);
}

#[derive(Debug, PartialEq)]
struct Delivery {
    ship_on: NaiveDate,
}

impl FormData for Delivery {
    fn schema() -> FormSchema {
        FormSchema::new(
            "integration::Delivery",
            vec![FieldDescriptor::new("ship_on", ValueType::Date).transform(
                Transform::DateFormat {
                    format: "%Y-%m-%d %H:%M".into(),
                },
            )],
        )
    }

    fn from_values(values: &ValueMap) -> FormResult<Self> {
        Ok(Self {
            ship_on: NaiveDate::from_value(values.get("ship_on").unwrap_or(&Value::Null))?,
        })
    }

    fn to_values(&self) -> ValueMap {
        ValueMap::from([("ship_on".to_string(), self.ship_on.to_value())])
    }
}

#[test]
fn test_import_formats_plain_date_with_time_format() {
    let form = runtime_form(&Delivery::schema(), StrategyRegistry::new());
    let imported = form
        .import(&Delivery {
            ship_on: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        })
        .unwrap();
    assert!(imported.errors().is_empty());
    assert_eq!(imported.wire()["ship_on"], Value::from("2024-01-31 00:00"));
}

#[test]
fn test_unrenderable_date_format_is_a_field_error() {
    let schema = FormSchema::new(
        "integration::Broken",
        vec![FieldDescriptor::new("on", ValueType::Date).transform(Transform::DateFormat {
            format: "%Q".into(),
        })],
    );
    let transformer = RuntimeFactory::new(Arc::new(StrategyRegistry::new()))
        .transformer(&schema)
        .unwrap();
    let native = ValueMap::from([(
        "on".to_string(),
        Value::Date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()),
    )]);
    let out = transformer.to_wire(&native).unwrap();
    assert_eq!(out.errors["on"].as_leaf().unwrap().code, "invalid_date");
    assert!(!out.values.contains_key("on"));
}

// ============================================================================
// Custom strategies
// ============================================================================

struct Cents;

impl CustomTransform for Cents {
    fn from_wire(&self, value: Value, _options: &ValueMap) -> Result<Value, FieldError> {
        match value {
            Value::String(s) => s
                .parse::<f64>()
                .map(|amount| Value::Int((amount * 100.0).round() as i64))
                .map_err(|_| FieldError::new("Not an amount.", "invalid_amount")),
            other => Ok(other),
        }
    }

    fn to_wire(&self, value: Value, _options: &ValueMap) -> Result<Value, FieldError> {
        Ok(match value {
            Value::Int(cents) => Value::String(format!("{}.{:02}", cents / 100, cents % 100)),
            other => other,
        })
    }
}

#[test]
fn test_custom_strategies_through_registry() {
    let registry = StrategyRegistry::new()
        .with_transform("cents", Cents)
        .with_constraint(
            "positive",
            |value: &Value, _: &ValueMap| -> Option<ErrorNode> {
                match value.as_int() {
                    Some(n) if n <= 0 => Some(FieldError::new("Must be positive.", "not_positive").into()),
                    _ => None,
                }
            },
        );
    let schema = FormSchema::new(
        "integration::Price",
        vec![FieldDescriptor::new("amount", ValueType::Int)
            .transform(Transform::Custom {
                name: "cents".into(),
                options: ValueMap::new(),
            })
            .constraint(Constraint::Custom {
                name: "positive".into(),
                options: ValueMap::new(),
            })],
    );
    let factory = RuntimeFactory::new(Arc::new(registry));
    let transformer = factory.transformer(&schema).unwrap();
    let validator = factory.validator(&schema).unwrap();

    let out = transformer
        .from_wire(&parse_urlencoded("amount=12.5"))
        .unwrap();
    assert_eq!(out.values["amount"], Value::Int(1250));
    let back = transformer.to_wire(&out.values).unwrap();
    assert_eq!(back.values["amount"], Value::from("12.50"));

    let out = transformer.from_wire(&parse_urlencoded("amount=-1")).unwrap();
    let errors = validator.validate(&out.values, &out.errors).unwrap();
    assert_eq!(errors["amount"].as_leaf().unwrap().code, "not_positive");

    let out = transformer.from_wire(&parse_urlencoded("amount=abc")).unwrap();
    assert_eq!(out.errors["amount"].as_leaf().unwrap().code, "invalid_amount");
}
