//! Per-strategy generators.
//!
//! A generator turns one configured strategy into an [`Expression`]. Each
//! family has a trait ([`ConstraintGenerator`], [`TransformGenerator`],
//! [`ViewGenerator`]) and a generic fallback that reconstructs the strategy
//! literal and calls its interpreter, so no strategy can block compilation.
//!
//! The [`GeneratorRegistry`] decides which generator handles which strategy.
//! It is passed explicitly to the compilers; there is no global lookup.

pub mod constraint;
pub mod transform;
pub mod view;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use formforge_core::FormResult;
use formforge_forms::{Constraint, Transform, ViewConfig, WidgetType};

use crate::expr::{self, Expression};

pub use constraint::{
    AllGenerator, ChoiceGenerator, EachGenerator, FallbackConstraintGenerator, LengthGenerator,
    NotBlankGenerator, PatternGenerator, RangeGenerator,
};
pub use transform::{
    CastGenerator, DateFormatGenerator, DefaultGenerator, FallbackTransformGenerator,
    JsonGenerator, SplitGenerator, StringCaseGenerator,
};
pub use view::{
    CheckboxViewGenerator, FallbackViewGenerator, InputViewGenerator, SelectViewGenerator,
    ViewAccessors, ViewClosure, ViewField,
};

/// Translates a constraint into an expression over the checked value.
pub trait ConstraintGenerator: Send + Sync {
    /// Returns an expression that evaluates to null or an error outcome.
    ///
    /// `value` may be repeated only if it is simple; otherwise bind it with
    /// [`expr::bind`]. Composite constraints recurse through `ctx`.
    fn generate(
        &self,
        constraint: &Constraint,
        value: &Expression,
        ctx: &GenerationContext<'_>,
    ) -> FormResult<Expression>;
}

/// Translates a transform step, separately for each direction.
pub trait TransformGenerator: Send + Sync {
    /// Wire to native, applied to the output of the previous step.
    fn from_wire(&self, transform: &Transform, previous: Expression) -> FormResult<Expression>;

    /// Native to wire, applied to the output of the following step.
    fn to_wire(&self, transform: &Transform, previous: Expression) -> FormResult<Expression>;
}

/// Translates a view configuration into a closure over view accessors.
pub trait ViewGenerator: Send + Sync {
    fn generate(&self, config: &ViewConfig, field: &ViewField) -> FormResult<ViewClosure>;
}

/// Key under which a `Custom` strategy's specialized generator is registered.
fn custom_key(name: &str) -> String {
    format!("custom:{name}")
}

/// Maps strategy kinds to generators.
///
/// Constraints and transforms are keyed by their `kind` tag; `Custom`
/// strategies by `custom:<name>`. Views are keyed by widget. Anything
/// without an entry goes to the family's fallback.
#[derive(Clone)]
pub struct GeneratorRegistry {
    constraints: HashMap<String, Arc<dyn ConstraintGenerator>>,
    transforms: HashMap<String, Arc<dyn TransformGenerator>>,
    views: HashMap<WidgetType, Arc<dyn ViewGenerator>>,
    constraint_fallback: Arc<dyn ConstraintGenerator>,
    transform_fallback: Arc<dyn TransformGenerator>,
    view_fallback: Arc<dyn ViewGenerator>,
}

impl GeneratorRegistry {
    /// A registry with no specialized generators: every strategy compiles
    /// through its fallback.
    pub fn new() -> Self {
        Self {
            constraints: HashMap::new(),
            transforms: HashMap::new(),
            views: HashMap::new(),
            constraint_fallback: Arc::new(FallbackConstraintGenerator),
            transform_fallback: Arc::new(FallbackTransformGenerator),
            view_fallback: Arc::new(FallbackViewGenerator),
        }
    }

    /// A registry with the built-in specialized generators.
    ///
    /// `email` and `custom` constraints, `custom` transforms, and any widget
    /// without a dedicated generator still use the fallbacks.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new()
            .with_constraint("not_blank", NotBlankGenerator)
            .with_constraint("length", LengthGenerator)
            .with_constraint("range", RangeGenerator)
            .with_constraint("pattern", PatternGenerator)
            .with_constraint("choice", ChoiceGenerator)
            .with_constraint("all", AllGenerator)
            .with_constraint("each", EachGenerator)
            .with_transform("date_format", DateFormatGenerator)
            .with_transform("split", SplitGenerator)
            .with_transform("default", DefaultGenerator)
            .with_transform("json", JsonGenerator);
        for kind in ["trim", "uppercase", "lowercase", "to_string"] {
            registry = registry.with_transform(kind, StringCaseGenerator);
        }
        for kind in ["to_integer", "to_float", "to_boolean"] {
            registry = registry.with_transform(kind, CastGenerator);
        }
        for widget in WidgetType::ALL {
            registry = match widget {
                WidgetType::Checkbox => registry.with_view(widget, CheckboxViewGenerator),
                WidgetType::Select | WidgetType::SelectMultiple => {
                    registry.with_view(widget, SelectViewGenerator)
                }
                _ => registry.with_view(widget, InputViewGenerator),
            };
        }
        registry
    }

    /// Registers a generator for a constraint kind tag.
    #[must_use]
    pub fn with_constraint(
        mut self,
        kind: impl Into<String>,
        generator: impl ConstraintGenerator + 'static,
    ) -> Self {
        self.constraints.insert(kind.into(), Arc::new(generator));
        self
    }

    /// Registers a generator for `Constraint::Custom { name, .. }`.
    #[must_use]
    pub fn with_custom_constraint(
        self,
        name: &str,
        generator: impl ConstraintGenerator + 'static,
    ) -> Self {
        self.with_constraint(custom_key(name), generator)
    }

    /// Registers a generator for a transform kind tag.
    #[must_use]
    pub fn with_transform(
        mut self,
        kind: impl Into<String>,
        generator: impl TransformGenerator + 'static,
    ) -> Self {
        self.transforms.insert(kind.into(), Arc::new(generator));
        self
    }

    /// Registers a generator for `Transform::Custom { name, .. }`.
    #[must_use]
    pub fn with_custom_transform(
        self,
        name: &str,
        generator: impl TransformGenerator + 'static,
    ) -> Self {
        self.with_transform(custom_key(name), generator)
    }

    /// Registers a generator for a widget.
    #[must_use]
    pub fn with_view(mut self, widget: WidgetType, generator: impl ViewGenerator + 'static) -> Self {
        self.views.insert(widget, Arc::new(generator));
        self
    }

    /// The generator responsible for `constraint`.
    pub fn constraint(&self, constraint: &Constraint) -> &dyn ConstraintGenerator {
        let key = match constraint {
            Constraint::Custom { name, .. } => custom_key(name),
            other => other.kind().to_string(),
        };
        self.constraints
            .get(&key)
            .map_or(self.constraint_fallback.as_ref(), Arc::as_ref)
    }

    /// The generator responsible for `transform`.
    pub fn transform(&self, transform: &Transform) -> &dyn TransformGenerator {
        let key = match transform {
            Transform::Custom { name, .. } => custom_key(name),
            other => other.kind().to_string(),
        };
        self.transforms
            .get(&key)
            .map_or(self.transform_fallback.as_ref(), Arc::as_ref)
    }

    /// The generator responsible for `config`.
    pub fn view(&self, config: &ViewConfig) -> &dyn ViewGenerator {
        self.views
            .get(&config.widget)
            .map_or(self.view_fallback.as_ref(), Arc::as_ref)
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut constraints: Vec<_> = self.constraints.keys().collect();
        constraints.sort();
        let mut transforms: Vec<_> = self.transforms.keys().collect();
        transforms.sort();
        f.debug_struct("GeneratorRegistry")
            .field("constraints", &constraints)
            .field("transforms", &transforms)
            .field("views", &self.views.len())
            .finish()
    }
}

/// The context handed to constraint generators.
///
/// Gives composite constraints access to the registry for their inner
/// chains and tracks nesting so that loop variables never collide.
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext<'a> {
    registry: &'a GeneratorRegistry,
    depth: usize,
}

impl<'a> GenerationContext<'a> {
    pub const fn new(registry: &'a GeneratorRegistry) -> Self {
        Self { registry, depth: 0 }
    }

    pub const fn registry(&self) -> &'a GeneratorRegistry {
        self.registry
    }

    /// Generates one constraint through the registry.
    pub fn constraint(&self, constraint: &Constraint, value: &Expression) -> FormResult<Expression> {
        self.registry.constraint(constraint).generate(constraint, value, self)
    }

    /// Generates a chain that reports its first failure.
    ///
    /// Each outcome is flattened to null or one error node and the results
    /// are joined with `??`, so later constraints only run while earlier
    /// ones pass. An empty chain is `null`.
    pub fn chain(&self, constraints: &[Constraint], value: &Expression) -> FormResult<Expression> {
        match constraints {
            [] => Ok(expr::null()),
            [only] => Ok(expr::flatten(self.constraint(only, value)?)),
            _ => expr::bind(value.clone(), |value| {
                let items = constraints
                    .iter()
                    .map(|c| self.constraint(c, &value).map(expr::flatten))
                    .collect::<FormResult<Vec<_>>>()?;
                Ok(expr::coalesce(items))
            }),
        }
    }

    /// The loop variable for an `each` at this depth.
    pub fn item_var(&self) -> String {
        format!("$item{}", self.depth)
    }

    /// The context for the body of an `each`.
    #[must_use]
    pub const fn nested(&self) -> Self {
        Self {
            registry: self.registry,
            depth: self.depth + 1,
        }
    }
}
