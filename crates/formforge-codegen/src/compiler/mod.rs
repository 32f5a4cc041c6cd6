//! Compilation orchestrators.
//!
//! An orchestrator takes a strategy object, asks it for its interpreted
//! shape, and drives the matching emitter with expressions from the
//! [`GeneratorRegistry`](crate::generators::GeneratorRegistry). Strategy
//! objects without an interpreted shape (custom backends) compile to `None`.

pub mod instantiator;
pub mod transformer;
pub mod validator;

pub use instantiator::InstantiatorCompiler;
pub use transformer::TransformerCompiler;
pub use validator::ValidatorCompiler;
