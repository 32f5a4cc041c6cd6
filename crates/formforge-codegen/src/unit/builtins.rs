//! The builtin functions of the unit language.
//!
//! Every builtin delegates to the same helper the runtime strategies use
//! (`formforge_forms::constraints`, `transforms` and `views`), so a generated
//! unit and its runtime counterpart cannot drift apart.

use std::collections::BTreeMap;
use std::sync::Arc;

use formforge_core::{ErrorNode, FieldError, Value};
use formforge_forms::constraints::{self, choice_rejected, is_absent, is_blank, measure};
use formforge_forms::views::{self, wire_text, WidgetType};
use formforge_forms::{transforms, StrategyRegistry};

use super::eval::{Datum, EvalError};

/// A builtin function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Get,
    Blank,
    Absent,
    Not,
    Len,
    Lt,
    Gt,
    IsNumber,
    PatternViolated,
    ChoiceRejects,
    Error,
    ErrorsFlatten,
    StrTrim,
    StrUpper,
    StrLower,
    CastInt,
    CastFloat,
    CastBool,
    CastString,
    DateParse,
    StrSplit,
    ValueDefault,
    JsonDecode,
    WireInt,
    WireFloat,
    WireBool,
    DateFormat,
    ListJoin,
    JsonEncode,
    ConstraintCheck,
    TransformFromWire,
    TransformToWire,
    ViewName,
    ViewInput,
    ViewCheckbox,
    ViewSelect,
    ViewBuild,
}

impl Builtin {
    pub const ALL: [Self; 37] = [
        Self::Get,
        Self::Blank,
        Self::Absent,
        Self::Not,
        Self::Len,
        Self::Lt,
        Self::Gt,
        Self::IsNumber,
        Self::PatternViolated,
        Self::ChoiceRejects,
        Self::Error,
        Self::ErrorsFlatten,
        Self::StrTrim,
        Self::StrUpper,
        Self::StrLower,
        Self::CastInt,
        Self::CastFloat,
        Self::CastBool,
        Self::CastString,
        Self::DateParse,
        Self::StrSplit,
        Self::ValueDefault,
        Self::JsonDecode,
        Self::WireInt,
        Self::WireFloat,
        Self::WireBool,
        Self::DateFormat,
        Self::ListJoin,
        Self::JsonEncode,
        Self::ConstraintCheck,
        Self::TransformFromWire,
        Self::TransformToWire,
        Self::ViewName,
        Self::ViewInput,
        Self::ViewCheckbox,
        Self::ViewSelect,
        Self::ViewBuild,
    ];

    /// The name used in unit text.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Blank => "blank?",
            Self::Absent => "absent?",
            Self::Not => "not",
            Self::Len => "len",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::IsNumber => "num?",
            Self::PatternViolated => "pattern.violated?",
            Self::ChoiceRejects => "choice.rejects?",
            Self::Error => "error",
            Self::ErrorsFlatten => "errors.flatten",
            Self::StrTrim => "str.trim",
            Self::StrUpper => "str.upper",
            Self::StrLower => "str.lower",
            Self::CastInt => "cast.int",
            Self::CastFloat => "cast.float",
            Self::CastBool => "cast.bool",
            Self::CastString => "cast.string",
            Self::DateParse => "date.parse",
            Self::StrSplit => "str.split",
            Self::ValueDefault => "value.default",
            Self::JsonDecode => "json.decode",
            Self::WireInt => "wire.int",
            Self::WireFloat => "wire.float",
            Self::WireBool => "wire.bool",
            Self::DateFormat => "date.format",
            Self::ListJoin => "list.join",
            Self::JsonEncode => "json.encode",
            Self::ConstraintCheck => "constraint.check",
            Self::TransformFromWire => "transform.from-wire",
            Self::TransformToWire => "transform.to-wire",
            Self::ViewName => "view.name",
            Self::ViewInput => "view.input",
            Self::ViewCheckbox => "view.checkbox",
            Self::ViewSelect => "view.select",
            Self::ViewBuild => "view.build",
        }
    }

    /// The exact number of arguments.
    pub const fn arity(self) -> usize {
        match self {
            Self::Blank
            | Self::Absent
            | Self::Not
            | Self::Len
            | Self::IsNumber
            | Self::ErrorsFlatten
            | Self::StrTrim
            | Self::StrUpper
            | Self::StrLower
            | Self::CastInt
            | Self::CastFloat
            | Self::CastBool
            | Self::CastString
            | Self::JsonDecode
            | Self::WireInt
            | Self::WireFloat
            | Self::WireBool
            | Self::JsonEncode => 1,
            Self::Get
            | Self::Lt
            | Self::Gt
            | Self::PatternViolated
            | Self::DateParse
            | Self::StrSplit
            | Self::ValueDefault
            | Self::DateFormat
            | Self::ListJoin
            | Self::ConstraintCheck
            | Self::TransformFromWire
            | Self::TransformToWire
            | Self::ViewName => 2,
            Self::ChoiceRejects | Self::Error => 3,
            Self::ViewInput | Self::ViewCheckbox | Self::ViewBuild => 7,
            Self::ViewSelect => 8,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    /// Applies the builtin to evaluated arguments.
    ///
    /// # Errors
    ///
    /// Transform builtins fail with [`EvalError::Field`]; argument type
    /// mismatches fail with [`EvalError::Fault`].
    pub fn apply(self, args: Vec<Datum>, registry: &StrategyRegistry) -> Result<Datum, EvalError> {
        let mut args = Args::new(self, args);
        let out = match self {
            Self::Get => {
                let container = args.datum()?;
                let key = args.string()?;
                match container {
                    Datum::Value(Value::Map(map)) => Datum::Value(map.get(&key).cloned().unwrap_or_default()),
                    Datum::Value(Value::Null) => Datum::Value(Value::Null),
                    Datum::Errors(errors) => errors.get(&key).cloned().map_or(Datum::NULL, Datum::Error),
                    other => return Err(args.mismatch("a map", &other)),
                }
            }
            Self::Blank => Datum::from(is_blank(&args.value()?)),
            Self::Absent => Datum::from(is_absent(&args.value()?)),
            Self::Not => Datum::from(!args.datum()?.is_truthy()),
            Self::Len => Datum::Value(measure(&args.value()?).map_or(Value::Null, Value::Int)),
            Self::Lt | Self::Gt => {
                let left = args.value()?.as_float();
                let right = args.value()?.as_float();
                let result = match (left, right) {
                    (Some(l), Some(r)) if self == Self::Lt => l < r,
                    (Some(l), Some(r)) => l > r,
                    _ => false,
                };
                Datum::from(result)
            }
            Self::IsNumber => Datum::from(args.value()?.as_float().is_some()),
            Self::PatternViolated => {
                let value = args.value()?;
                let pattern = args.string()?;
                Datum::from(constraints::pattern_violated(&value, &pattern))
            }
            Self::ChoiceRejects => {
                let value = args.value()?;
                let choices = args.list()?;
                let multiple = args.boolean()?;
                Datum::from(choice_rejected(&value, &choices, multiple))
            }
            Self::Error => {
                let message = args.string()?;
                let code = args.string()?;
                let params = args.string_map()?;
                let mut error = FieldError::new(message, code);
                error.params = params;
                Datum::Error(error.into())
            }
            Self::ErrorsFlatten => match args.datum()? {
                Datum::Errors(errors) if errors.is_empty() => Datum::NULL,
                Datum::Errors(errors) => Datum::Error(ErrorNode::Tree(errors)),
                other @ (Datum::Error(_) | Datum::Value(Value::Null)) => other,
                other => return Err(args.mismatch("an error outcome", &other)),
            },
            Self::StrTrim => Datum::Value(transforms::trim(args.value()?)),
            Self::StrUpper => Datum::Value(transforms::uppercase(args.value()?)),
            Self::StrLower => Datum::Value(transforms::lowercase(args.value()?)),
            Self::CastInt => Datum::Value(transforms::to_integer(args.value()?)?),
            Self::CastFloat => Datum::Value(transforms::to_float(args.value()?)?),
            Self::CastBool => Datum::Value(transforms::to_boolean(args.value()?)?),
            Self::CastString => Datum::Value(transforms::to_string(args.value()?)),
            Self::DateParse => {
                let value = args.value()?;
                let format = args.string()?;
                Datum::Value(transforms::parse_date(value, &format)?)
            }
            Self::StrSplit => {
                let value = args.value()?;
                let separator = args.string()?;
                Datum::Value(transforms::split(value, &separator))
            }
            Self::ValueDefault => {
                let value = args.value()?;
                let default = args.value()?;
                Datum::Value(transforms::default_value(value, &default))
            }
            Self::JsonDecode => Datum::Value(transforms::json_decode(args.value()?)?),
            Self::WireInt => Datum::Value(transforms::integer_to_wire(args.value()?)),
            Self::WireFloat => Datum::Value(transforms::float_to_wire(args.value()?)),
            Self::WireBool => Datum::Value(transforms::boolean_to_wire(args.value()?)),
            Self::DateFormat => {
                let value = args.value()?;
                let format = args.string()?;
                Datum::Value(transforms::format_date(value, &format)?)
            }
            Self::ListJoin => {
                let value = args.value()?;
                let separator = args.string()?;
                Datum::Value(transforms::join(value, &separator))
            }
            Self::JsonEncode => Datum::Value(transforms::json_encode(args.value()?)),
            Self::ConstraintCheck => {
                let constraint = args.constraint()?;
                let value = args.value()?;
                constraint
                    .validate(&value, registry)
                    .map_or(Datum::NULL, Datum::Error)
            }
            Self::TransformFromWire => {
                let transform = args.transform()?;
                Datum::Value(transform.from_wire(args.value()?, registry)?)
            }
            Self::TransformToWire => {
                let transform = args.transform()?;
                Datum::Value(transform.to_wire(args.value()?, registry)?)
            }
            Self::ViewName => {
                let parent = args.optional_string()?;
                let wire = args.string()?;
                Datum::from(views::qualified_name(parent.as_deref(), &wire))
            }
            Self::ViewInput => {
                let field = args.string()?;
                let name = args.string()?;
                let widget = args.widget()?;
                let required = args.boolean()?;
                let attributes = args.string_map()?;
                let value = args.value()?;
                let error = args.error()?;
                Datum::View(views::build_input_view(
                    &field, name, widget, required, &attributes, value, error,
                ))
            }
            Self::ViewCheckbox => {
                let field = args.string()?;
                let name = args.string()?;
                let required = args.boolean()?;
                let attributes = args.string_map()?;
                let checked_value = args.string()?;
                let value = args.value()?;
                let error = args.error()?;
                Datum::View(views::build_checkbox_view(
                    &field,
                    name,
                    required,
                    &attributes,
                    &checked_value,
                    &value,
                    error,
                ))
            }
            Self::ViewSelect => {
                let field = args.string()?;
                let name = args.string()?;
                let widget = args.widget()?;
                let required = args.boolean()?;
                let attributes = args.string_map()?;
                let choices = args.pairs()?;
                let value = args.value()?;
                let error = args.error()?;
                Datum::View(views::build_select_view(
                    &field,
                    name,
                    widget,
                    required,
                    &attributes,
                    &choices,
                    value,
                    error,
                ))
            }
            Self::ViewBuild => {
                let config = args.view_config()?;
                let field = args.string()?;
                let wire = args.string()?;
                let required = args.boolean()?;
                let value = args.value()?;
                let error = args.error()?;
                let parent = args.optional_string()?;
                Datum::View(config.instantiate(
                    &field,
                    &wire,
                    required,
                    value,
                    error,
                    parent.as_deref(),
                ))
            }
        };
        Ok(out)
    }
}

/// Typed access to positional arguments.
struct Args {
    builtin: Builtin,
    items: std::vec::IntoIter<Datum>,
    position: usize,
}

impl Args {
    fn new(builtin: Builtin, items: Vec<Datum>) -> Self {
        Self {
            builtin,
            items: items.into_iter(),
            position: 0,
        }
    }

    fn mismatch(&self, expected: &str, found: &Datum) -> EvalError {
        EvalError::Fault(format!(
            "{}: argument {} should be {expected}, found {}",
            self.builtin.name(),
            self.position,
            found.describe()
        ))
    }

    fn datum(&mut self) -> Result<Datum, EvalError> {
        self.position += 1;
        self.items.next().ok_or_else(|| {
            EvalError::Fault(format!(
                "{}: missing argument {}",
                self.builtin.name(),
                self.position
            ))
        })
    }

    fn value(&mut self) -> Result<Value, EvalError> {
        match self.datum()? {
            Datum::Value(value) => Ok(value),
            other => Err(self.mismatch("a value", &other)),
        }
    }

    fn string(&mut self) -> Result<String, EvalError> {
        match self.datum()? {
            Datum::Value(Value::String(s)) => Ok(s),
            other => Err(self.mismatch("a string", &other)),
        }
    }

    fn optional_string(&mut self) -> Result<Option<String>, EvalError> {
        match self.datum()? {
            Datum::Value(Value::String(s)) => Ok(Some(s)),
            Datum::Value(Value::Null) => Ok(None),
            other => Err(self.mismatch("a string or null", &other)),
        }
    }

    fn boolean(&mut self) -> Result<bool, EvalError> {
        match self.datum()? {
            Datum::Value(Value::Bool(b)) => Ok(b),
            other => Err(self.mismatch("a boolean", &other)),
        }
    }

    fn list(&mut self) -> Result<Vec<Value>, EvalError> {
        match self.datum()? {
            Datum::Value(Value::List(items)) => Ok(items),
            other => Err(self.mismatch("a list", &other)),
        }
    }

    fn string_map(&mut self) -> Result<BTreeMap<String, String>, EvalError> {
        match self.datum()? {
            Datum::Value(Value::Map(map)) => Ok(map
                .into_iter()
                .map(|(k, v)| {
                    let text = wire_text(&v).unwrap_or_default();
                    (k, text)
                })
                .collect()),
            other => Err(self.mismatch("a map", &other)),
        }
    }

    fn pairs(&mut self) -> Result<Vec<(String, String)>, EvalError> {
        let items = self.list()?;
        items
            .into_iter()
            .map(|item| match item {
                Value::List(pair) if pair.len() == 2 => Ok((
                    wire_text(&pair[0]).unwrap_or_default(),
                    wire_text(&pair[1]).unwrap_or_default(),
                )),
                other => Err(self.mismatch("a list of pairs", &Datum::Value(other))),
            })
            .collect()
    }

    fn widget(&mut self) -> Result<WidgetType, EvalError> {
        let name = self.string()?;
        WidgetType::from_name(&name).ok_or_else(|| {
            EvalError::Fault(format!("{}: unknown widget '{name}'", self.builtin.name()))
        })
    }

    fn error(&mut self) -> Result<Option<ErrorNode>, EvalError> {
        match self.datum()? {
            Datum::Error(node) => Ok(Some(node)),
            Datum::Value(Value::Null) => Ok(None),
            other => Err(self.mismatch("an error or null", &other)),
        }
    }

    fn constraint(&mut self) -> Result<Arc<formforge_forms::Constraint>, EvalError> {
        match self.datum()? {
            Datum::Constraint(c) => Ok(c),
            other => Err(self.mismatch("a constraint", &other)),
        }
    }

    fn transform(&mut self) -> Result<Arc<formforge_forms::Transform>, EvalError> {
        match self.datum()? {
            Datum::Transform(t) => Ok(t),
            other => Err(self.mismatch("a transform", &other)),
        }
    }

    fn view_config(&mut self) -> Result<Arc<formforge_forms::ViewConfig>, EvalError> {
        match self.datum()? {
            Datum::ViewConfig(c) => Ok(c),
            other => Err(self.mismatch("a view config", &other)),
        }
    }
}
