//! # formforge-codegen
//!
//! Ahead-of-time compilation of form strategies.
//!
//! The runtime strategy objects of `formforge-forms` interpret their
//! constraint, transform and view lists on every call. This crate compiles
//! them into *units*: small programs in an s-expression language that are
//! persisted next to the application, checked when loaded, and executed by
//! a compact evaluator calling the same primitives as the runtime path.
//!
//! - [`expr`] builds expression text with its error shape
//! - [`generators`] turn single strategies into expressions
//! - [`emitter`] assembles per-field expressions into unit text
//! - [`compiler`] drives an emitter from a strategy object
//! - [`unit`] parses, checks and evaluates units
//! - [`factory`] persists, caches and links units per schema
//! - [`FormFactory`] chooses between interpreted and compiled forms

pub mod compiler;
pub mod emitter;
pub mod expr;
pub mod facade;
pub mod factory;
pub mod generated;
pub mod generators;
pub mod unit;

pub use compiler::{InstantiatorCompiler, TransformerCompiler, ValidatorCompiler};
pub use emitter::{EmitterState, InstantiatorEmitter, TransformerEmitter, ValidatorEmitter};
pub use expr::{ErrorShape, Expression};
pub use facade::FormFactory;
pub use factory::{
    GeneratedFactory, InstantiatorFactory, TransformerFactory, UnitProtocol, UnitResolver,
    ValidatorFactory,
};
pub use generated::{GeneratedInstantiator, GeneratedTransformer, GeneratedValidator};
pub use generators::{GenerationContext, GeneratorRegistry};
pub use unit::{parse_unit, Unit, UnitKind};
