//! The generated-unit factory.
//!
//! A [`GeneratedFactory`] hands out strategy objects for schemas, preferring
//! compiled units:
//!
//! 1. a unit already linked in this process, when its fingerprint matches;
//! 2. a unit persisted at the resolved path, which is parsed, checked against
//!    the expected contract and cached;
//! 3. otherwise the runtime strategy object is built and compiled, the unit
//!    text persisted, and the fresh unit linked. Strategy objects that do not
//!    compile are returned as they are.
//!
//! A persisted unit that fails to parse or does not satisfy the contract is
//! logged and regenerated in place. Failing to write a unit is fatal.
//!
//! The three kinds share this logic through [`UnitProtocol`]; use the
//! [`ValidatorFactory`], [`TransformerFactory`] and [`InstantiatorFactory`]
//! aliases.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use formforge_core::logging::unit_span;
use formforge_core::{FormResult, FormforgeError, Settings};
use formforge_forms::{
    FormSchema, FormTransformer, FormValidator, RuntimeFactory, StrategyRegistry,
    ViewInstantiator,
};
use tracing::{debug, info, warn};

use crate::compiler::{InstantiatorCompiler, TransformerCompiler, ValidatorCompiler};
use crate::generated::{GeneratedInstantiator, GeneratedTransformer, GeneratedValidator};
use crate::generators::GeneratorRegistry;
use crate::unit::{parse_unit, unit_fingerprint, Unit, UnitKind, UNIT_EXTENSION};

/// What distinguishes the three unit kinds for the factory.
pub trait UnitProtocol: Send + Sync + 'static {
    /// The unit kind persisted units must declare.
    const KIND: UnitKind;
    /// Appended to the flattened schema name to form the unit name.
    const SUFFIX: &'static str;
    /// The contract handed out.
    type Strategy: ?Sized + Send + Sync + fmt::Debug;

    /// Builds the interpreted strategy object.
    fn build_runtime(
        runtime: &RuntimeFactory,
        schema: &FormSchema,
    ) -> FormResult<Arc<Self::Strategy>>;

    /// Compiles a strategy object; `None` when it has no runtime shape.
    fn compile(
        generators: &GeneratorRegistry,
        name: &str,
        fingerprint: &str,
        strategy: &Self::Strategy,
    ) -> FormResult<Option<String>>;

    /// Wraps a checked unit in the contract.
    fn instantiate(unit: Arc<Unit>, registry: Arc<StrategyRegistry>) -> Arc<Self::Strategy>;
}

/// Validator units.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatorProtocol;

impl UnitProtocol for ValidatorProtocol {
    const KIND: UnitKind = UnitKind::Validator;
    const SUFFIX: &'static str = "Validator";
    type Strategy = dyn FormValidator;

    fn build_runtime(
        runtime: &RuntimeFactory,
        schema: &FormSchema,
    ) -> FormResult<Arc<dyn FormValidator>> {
        Ok(Arc::new(runtime.validator(schema)?))
    }

    fn compile(
        generators: &GeneratorRegistry,
        name: &str,
        fingerprint: &str,
        strategy: &dyn FormValidator,
    ) -> FormResult<Option<String>> {
        ValidatorCompiler::new(generators).compile(name, fingerprint, strategy)
    }

    fn instantiate(unit: Arc<Unit>, registry: Arc<StrategyRegistry>) -> Arc<dyn FormValidator> {
        Arc::new(GeneratedValidator::new(unit, registry))
    }
}

/// Transformer units.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformerProtocol;

impl UnitProtocol for TransformerProtocol {
    const KIND: UnitKind = UnitKind::Transformer;
    const SUFFIX: &'static str = "Transformer";
    type Strategy = dyn FormTransformer;

    fn build_runtime(
        runtime: &RuntimeFactory,
        schema: &FormSchema,
    ) -> FormResult<Arc<dyn FormTransformer>> {
        Ok(Arc::new(runtime.transformer(schema)?))
    }

    fn compile(
        generators: &GeneratorRegistry,
        name: &str,
        fingerprint: &str,
        strategy: &dyn FormTransformer,
    ) -> FormResult<Option<String>> {
        TransformerCompiler::new(generators).compile(name, fingerprint, strategy)
    }

    fn instantiate(unit: Arc<Unit>, registry: Arc<StrategyRegistry>) -> Arc<dyn FormTransformer> {
        Arc::new(GeneratedTransformer::new(unit, registry))
    }
}

/// View-instantiator units.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstantiatorProtocol;

impl UnitProtocol for InstantiatorProtocol {
    const KIND: UnitKind = UnitKind::Instantiator;
    const SUFFIX: &'static str = "ViewInstantiator";
    type Strategy = dyn ViewInstantiator;

    fn build_runtime(
        runtime: &RuntimeFactory,
        schema: &FormSchema,
    ) -> FormResult<Arc<dyn ViewInstantiator>> {
        Ok(Arc::new(runtime.instantiator(schema)?))
    }

    fn compile(
        generators: &GeneratorRegistry,
        name: &str,
        fingerprint: &str,
        strategy: &dyn ViewInstantiator,
    ) -> FormResult<Option<String>> {
        InstantiatorCompiler::new(generators).compile(name, fingerprint, strategy)
    }

    fn instantiate(unit: Arc<Unit>, registry: Arc<StrategyRegistry>) -> Arc<dyn ViewInstantiator> {
        Arc::new(GeneratedInstantiator::new(unit, registry))
    }
}

/// Loads and compiles validators.
pub type ValidatorFactory = GeneratedFactory<ValidatorProtocol>;
/// Loads and compiles transformers.
pub type TransformerFactory = GeneratedFactory<TransformerProtocol>;
/// Loads and compiles view instantiators.
pub type InstantiatorFactory = GeneratedFactory<InstantiatorProtocol>;

/// Maps a schema name to a unit name, and a unit name to a storage path.
#[derive(Clone, Copy)]
pub struct UnitResolver {
    /// `(schema name, kind suffix) -> unit name`.
    pub name: fn(&str, &str) -> String,
    /// `(unit directory, unit name) -> unit path`.
    pub path: fn(&Path, &str) -> PathBuf,
}

impl Default for UnitResolver {
    fn default() -> Self {
        Self {
            name: default_unit_name,
            path: default_unit_path,
        }
    }
}

impl fmt::Debug for UnitResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitResolver").finish_non_exhaustive()
    }
}

/// Flattens namespace separators to `_` and appends `suffix`.
///
/// ```
/// use formforge_codegen::factory::default_unit_name;
///
/// assert_eq!(default_unit_name("app::forms::Signup", "Validator"), "app_forms_SignupValidator");
/// ```
pub fn default_unit_name(schema_name: &str, suffix: &str) -> String {
    let mut name = schema_name
        .replace("::", "_")
        .replace(['.', '\\', '/'], "_");
    name.push_str(suffix);
    name
}

/// `<dir>/<name>.ffu`.
pub fn default_unit_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.{UNIT_EXTENSION}"))
}

type CustomFallback<P> =
    dyn Fn(&FormSchema) -> FormResult<Arc<<P as UnitProtocol>::Strategy>> + Send + Sync;

/// Hands out compiled strategy objects of one kind.
pub struct GeneratedFactory<P: UnitProtocol> {
    unit_dir: PathBuf,
    registry: Arc<StrategyRegistry>,
    runtime: RuntimeFactory,
    generators: Arc<GeneratorRegistry>,
    resolver: UnitResolver,
    fallback: Option<Arc<CustomFallback<P>>>,
    linked: RwLock<HashMap<String, Arc<Unit>>>,
    protocol: PhantomData<fn() -> P>,
}

impl<P: UnitProtocol> fmt::Debug for GeneratedFactory<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedFactory")
            .field("kind", &P::KIND)
            .field("unit_dir", &self.unit_dir)
            .field("custom_fallback", &self.fallback.is_some())
            .finish_non_exhaustive()
    }
}

impl<P: UnitProtocol> GeneratedFactory<P> {
    /// Creates a factory storing units under `unit_dir`, using the built-in
    /// generators.
    pub fn new(unit_dir: impl Into<PathBuf>, registry: Arc<StrategyRegistry>) -> Self {
        Self {
            unit_dir: unit_dir.into(),
            runtime: RuntimeFactory::new(Arc::clone(&registry)),
            registry,
            generators: Arc::new(GeneratorRegistry::with_builtins()),
            resolver: UnitResolver::default(),
            fallback: None,
            linked: RwLock::new(HashMap::new()),
            protocol: PhantomData,
        }
    }

    /// Creates a factory storing units in the configured unit directory.
    pub fn from_settings(settings: &Settings, registry: Arc<StrategyRegistry>) -> Self {
        Self::new(settings.unit_dir.clone(), registry)
    }

    #[must_use]
    pub fn with_generators(mut self, generators: Arc<GeneratorRegistry>) -> Self {
        self.generators = generators;
        self
    }

    #[must_use]
    pub const fn with_resolver(mut self, resolver: UnitResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replaces the runtime factory as the source of strategy objects.
    ///
    /// Objects that report a runtime shape are still compiled; the rest are
    /// handed out uncompiled.
    #[must_use]
    pub fn with_fallback<F>(mut self, fallback: F) -> Self
    where
        F: Fn(&FormSchema) -> FormResult<Arc<P::Strategy>> + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(fallback));
        self
    }

    pub fn unit_dir(&self) -> &Path {
        &self.unit_dir
    }

    /// The unit name for `schema`.
    pub fn unit_name(&self, schema: &FormSchema) -> String {
        (self.resolver.name)(&schema.name, P::SUFFIX)
    }

    /// Where the unit for `schema` is persisted.
    pub fn unit_path(&self, schema: &FormSchema) -> PathBuf {
        (self.resolver.path)(&self.unit_dir, &self.unit_name(schema))
    }

    /// Forgets every unit linked in this process. Persisted units stay.
    pub fn clear_linked(&self) {
        self.linked
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Returns the strategy object for `schema`.
    ///
    /// # Errors
    ///
    /// Configuration errors from building the runtime object, generation
    /// errors, and [`FormforgeError::Storage`] when the unit cannot be written.
    pub fn create(&self, schema: &FormSchema) -> FormResult<Arc<P::Strategy>> {
        let name = self.unit_name(schema);
        let span = unit_span(P::KIND.keyword(), &name);
        let _guard = span.enter();
        let fingerprint = unit_fingerprint(&schema.fingerprint());

        if let Some(unit) = self.linked_unit(&name, &fingerprint) {
            debug!("unit already linked");
            return Ok(self.instantiate(unit));
        }

        let path = (self.resolver.path)(&self.unit_dir, &name);
        if let Some(unit) = self.load(&path, &name, &fingerprint)? {
            debug!(path = %path.display(), "linked persisted unit");
            return Ok(self.instantiate(self.link(&name, unit)));
        }

        let strategy = match &self.fallback {
            Some(fallback) => fallback(schema)?,
            None => P::build_runtime(&self.runtime, schema)?,
        };
        let Some(text) = P::compile(&self.generators, &name, &fingerprint, &strategy)? else {
            debug!("strategy does not compile; using it directly");
            return Ok(strategy);
        };
        persist(&path, &text)?;
        let unit = parse_unit(&text)?;
        unit.check_contract(P::KIND, &name, &fingerprint)?;
        Ok(self.instantiate(self.link(&name, unit)))
    }

    fn instantiate(&self, unit: Arc<Unit>) -> Arc<P::Strategy> {
        P::instantiate(unit, Arc::clone(&self.registry))
    }

    fn linked_unit(&self, name: &str, fingerprint: &str) -> Option<Arc<Unit>> {
        self.linked
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .filter(|unit| unit.fingerprint == fingerprint)
            .cloned()
    }

    fn link(&self, name: &str, unit: Unit) -> Arc<Unit> {
        let unit = Arc::new(unit);
        self.linked
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), Arc::clone(&unit));
        unit
    }

    /// Reads and checks a persisted unit. Missing or rejected units give `None`.
    fn load(&self, path: &Path, name: &str, fingerprint: &str) -> FormResult<Option<Unit>> {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                warn!(path = %path.display(), "persisted unit is not UTF-8; regenerating");
                return Ok(None);
            }
            Err(source) => {
                return Err(FormforgeError::Storage {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let checked = parse_unit(&source)
            .and_then(|unit| unit.check_contract(P::KIND, name, fingerprint).map(|()| unit));
        match checked {
            Ok(unit) => Ok(Some(unit)),
            Err(err) if err.is_corruption() => {
                warn!(path = %path.display(), error = %err, "rejected persisted unit; regenerating");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

/// Writes `text` to `path` through a temporary file renamed into place.
fn persist(path: &Path, text: &str) -> FormResult<()> {
    if fs::read_to_string(path).is_ok_and(|existing| existing == text) {
        return Ok(());
    }
    let storage = |source: io::Error| FormforgeError::Storage {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(storage)?;
    }
    let tmp = path.with_extension(format!("{UNIT_EXTENSION}.{}.tmp", std::process::id()));
    fs::write(&tmp, text).map_err(storage)?;
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(storage(err));
    }
    info!(path = %path.display(), bytes = text.len(), "persisted unit");
    Ok(())
}

#[cfg(test)]
mod tests {
    use formforge_core::{ErrorMap, Value, ValueMap};
    use formforge_forms::{Constraint, FieldDescriptor, ValueType};
    use tempfile::TempDir;

    use super::*;

    fn schema() -> FormSchema {
        FormSchema::new(
            "app::forms::Signup",
            vec![FieldDescriptor::new("name", ValueType::String).constraint(Constraint::Length {
                min: Some(2),
                max: None,
            })],
        )
    }

    #[test]
    fn test_default_resolver() {
        assert_eq!(default_unit_name("a.b/c\\d::E", "Transformer"), "a_b_c_d_ETransformer");
        assert_eq!(
            default_unit_path(Path::new("/units"), "X"),
            PathBuf::from("/units/X.ffu")
        );
    }

    #[test]
    fn test_create_persists_then_links() {
        let dir = TempDir::new().unwrap();
        let factory = ValidatorFactory::new(dir.path().join("nested"), Arc::default());
        let validator = factory.create(&schema()).unwrap();
        assert!(validator.runtime().is_none());

        let path = factory.unit_path(&schema());
        assert!(path.ends_with("app_forms_SignupValidator.ffu"));
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("(unit validator \"app_forms_SignupValidator\""));

        let errors = validator
            .validate(
                &ValueMap::from([("name".to_string(), Value::from("a"))]),
                &ErrorMap::new(),
            )
            .unwrap();
        assert_eq!(errors["name"].as_leaf().unwrap().code, "too_short");

        // Linked in-process: removing the file does not matter any more.
        fs::remove_file(&path).unwrap();
        assert!(factory.create(&schema()).is_ok());
        assert!(!path.exists());
    }

    #[test]
    fn test_rejected_unit_is_regenerated() {
        let dir = TempDir::new().unwrap();
        let factory = TransformerFactory::new(dir.path(), Arc::default());
        let path = factory.unit_path(&schema());
        fs::write(&path, "(unit transformer").unwrap();

        assert!(factory.create(&schema()).is_ok());
        let healed = fs::read_to_string(&path).unwrap();
        assert!(parse_unit(&healed).is_ok());
    }

    #[test]
    fn test_custom_fallback_without_runtime_shape() {
        #[derive(Debug)]
        struct Passthrough;

        impl FormValidator for Passthrough {
            fn validate(&self, _data: &ValueMap, prior: &ErrorMap) -> FormResult<ErrorMap> {
                Ok(prior.clone())
            }
        }

        let dir = TempDir::new().unwrap();
        let factory = ValidatorFactory::new(dir.path(), Arc::default())
            .with_fallback(|_schema: &FormSchema| Ok(Arc::new(Passthrough) as Arc<dyn FormValidator>));
        let validator = factory.create(&schema()).unwrap();
        assert!(format!("{validator:?}").contains("Passthrough"));
        assert!(!factory.unit_path(&schema()).exists());
    }
}
