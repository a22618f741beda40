//! Bean collection: the mutable registration phase of a container.
//!
//! Definitions, aliases, scopes, post-processors and observers are added to a
//! [`BeanCollection`]; [`BeanCollection::build`] runs definition
//! post-processing and validation, then produces an immutable [`BeanFactory`]
//! with every non-lazy singleton created.

use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;

use crate::class::BeanClass;
use crate::config::FactoryConfig;
use crate::definition::{merge, resolve_bean_classes, BeanDefinition};
use crate::error::{BeanResult, BoxError};
use crate::internal::{DisposeBag, Map};
use crate::lifecycle::{BeanFactoryPostProcessor, BeanPostProcessor, DestructionAwareBeanPostProcessor};
use crate::observer::{BeanObserver, Observers};
use crate::provider::{next_container_id, BeanFactory, FactoryInner, ResolverContext, SingletonRegistry};
use crate::registration::{AnyArc, DefinitionRegistry};
use crate::scope::{Scope, ScopeProvider};
use crate::validation::{self, ValidationContext, ValidationResult};

pub mod module_system;

pub use module_system::{BeanCollectionExt, BeanCollectionModuleExt, BeanModule, DefinitionSource};

/// Registration phase of a bean container.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{BeanCollection, Resolver};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, message: &str) -> String;
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, message: &str) -> String {
///         format!("[LOG] {}", message)
///     }
/// }
///
/// let mut beans = BeanCollection::new();
/// beans.add_singleton_trait::<dyn Logger>("logger", Arc::new(ConsoleLogger));
/// beans.register_alias("log", "logger").unwrap();
///
/// let factory = beans.build().unwrap();
/// let logger = factory.get_named_trait::<dyn Logger>("log").unwrap();
/// assert_eq!(logger.log("ready"), "[LOG] ready");
/// ```
pub struct BeanCollection {
    registry: DefinitionRegistry,
    post_processors: Vec<Arc<dyn BeanPostProcessor>>,
    destruction_processors: Vec<Arc<dyn DestructionAwareBeanPostProcessor>>,
    factory_post_processors: Vec<Arc<dyn BeanFactoryPostProcessor>>,
    scopes: Map<String, Arc<dyn ScopeProvider>>,
    observers: Observers,
    sources: Vec<Box<dyn DefinitionSource>>,
    config: FactoryConfig,
    parent: Option<BeanFactory>,
}

impl BeanCollection {
    /// Creates an empty collection with default configuration.
    pub fn new() -> Self {
        Self::with_config(FactoryConfig::default())
    }

    pub fn with_config(config: FactoryConfig) -> Self {
        Self {
            registry: DefinitionRegistry::new(),
            post_processors: Vec::new(),
            destruction_processors: Vec::new(),
            factory_post_processors: Vec::new(),
            scopes: Map::default(),
            observers: Observers::new(),
            sources: Vec::new(),
            config,
            parent: None,
        }
    }

    /// Collection whose factory delegates unknown names and unmatched
    /// capabilities to `parent`.
    pub fn with_parent(parent: BeanFactory) -> Self {
        let mut beans = Self::new();
        beans.parent = Some(parent);
        beans
    }

    pub fn set_parent(&mut self, parent: BeanFactory) -> &mut Self {
        self.parent = Some(parent);
        self
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut FactoryConfig {
        &mut self.config
    }

    /// The definitions registered so far.
    pub fn registry(&self) -> &DefinitionRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DefinitionRegistry {
        &mut self.registry
    }

    /// Registers (or overwrites) a definition.
    pub fn register_definition(&mut self, name: impl Into<String>, definition: BeanDefinition) -> &mut Self {
        self.registry.register(name, definition);
        self
    }

    /// Registers `alias` for `name`; fails if the alias would close a cycle.
    pub fn register_alias(&mut self, alias: impl Into<String>, name: impl Into<String>) -> BeanResult<&mut Self> {
        self.registry.register_alias(alias, name)?;
        Ok(self)
    }

    /// Registers a definition constructing `class`.
    pub fn add_bean(&mut self, name: impl Into<String>, class: Arc<BeanClass>) -> &mut Self {
        self.register_definition(name, BeanDefinition::of(class))
    }

    /// Registers a pre-built singleton.
    pub fn add_singleton<T: Send + Sync + 'static>(&mut self, name: impl Into<String>, value: T) -> &mut Self {
        let instance: AnyArc = Arc::new(value);
        let class = BeanClass::builder::<T>().build();
        self.register_definition(name, BeanDefinition::supplied(class, move |_| Ok(instance.clone())))
    }

    /// Registers a pre-built trait object, resolvable as `I`.
    pub fn add_singleton_trait<I>(&mut self, name: impl Into<String>, value: Arc<I>) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        let instance: AnyArc = Arc::new(value);
        let class = Arc::new(BeanClass::for_trait_object::<I>());
        self.register_definition(name, BeanDefinition::supplied(class, move |_| Ok(instance.clone())))
    }

    /// Registers a bean produced by `factory` in `scope`.
    pub fn add_factory<T, F>(&mut self, name: impl Into<String>, scope: impl Into<Scope>, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let class = BeanClass::builder::<T>().build();
        let definition =
            BeanDefinition::supplied(class, move |ctx| factory(ctx).map(|t| Arc::new(t) as AnyArc)).scope(scope);
        self.register_definition(name, definition)
    }

    pub fn add_singleton_factory<T, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.add_factory(name, Scope::Singleton, factory)
    }

    pub fn add_prototype_factory<T, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.add_factory(name, Scope::Prototype, factory)
    }

    /// Registers a trait object produced by `factory` in `scope`.
    pub fn add_trait_factory<I, F>(&mut self, name: impl Into<String>, scope: impl Into<Scope>, factory: F) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> Result<Arc<I>, BoxError> + Send + Sync + 'static,
    {
        let class = Arc::new(BeanClass::for_trait_object::<I>());
        let definition =
            BeanDefinition::supplied(class, move |ctx| factory(ctx).map(|i| Arc::new(i) as AnyArc)).scope(scope);
        self.register_definition(name, definition)
    }

    /// Adds an initialization hook; processors run in ascending order.
    pub fn add_post_processor(&mut self, processor: Arc<dyn BeanPostProcessor>) -> &mut Self {
        self.post_processors.push(processor);
        self
    }

    pub fn add_destruction_processor(&mut self, processor: Arc<dyn DestructionAwareBeanPostProcessor>) -> &mut Self {
        self.destruction_processors.push(processor);
        self
    }

    /// Adds a definition post-processor run by `build()` before validation.
    pub fn add_factory_post_processor(&mut self, processor: Arc<dyn BeanFactoryPostProcessor>) -> &mut Self {
        self.factory_post_processors.push(processor);
        self
    }

    /// Backs the custom scope `name` with `provider`.
    pub fn register_scope(&mut self, name: impl Into<String>, provider: Arc<dyn ScopeProvider>) -> &mut Self {
        self.scopes.insert(name.into(), provider);
        self
    }

    pub fn add_observer(&mut self, observer: Arc<dyn BeanObserver>) -> &mut Self {
        self.observers.add(observer);
        self
    }

    /// Registers every definition and alias of `source`.
    pub fn add_source(&mut self, source: Box<dyn DefinitionSource>) -> BeanResult<&mut Self> {
        let definitions = source.definitions();
        tracing::debug!(source = %source.describe(), definitions = definitions.len(), "loading definition source");
        for (name, definition) in definitions {
            self.registry.register(name, definition);
        }
        for (alias, target) in source.aliases() {
            self.registry.register_alias(alias, target)?;
        }
        self.sources.push(source);
        Ok(self)
    }

    /// Validates the current definitions without building.
    pub fn validate(&self) -> ValidationResult {
        let context = ValidationContext {
            scopes: &self.scopes,
            parent: self.parent.as_ref(),
            allow_overriding: self.config.allow_definition_overriding,
        };
        let mut result = validation::validate(&self.registry, &context);
        for source in &self.sources {
            if let Err(e) = source.validate() {
                result.errors.push(e);
            }
        }
        result
    }

    /// Builds the factory.
    ///
    /// Runs definition post-processors, validates (every problem reported at
    /// once as [`BeanError::Validation`](crate::BeanError::Validation)), merges
    /// parent definitions and creates non-lazy singletons in registration
    /// order. If eager creation fails the partially built factory is closed and
    /// the error returned.
    pub fn build(mut self) -> BeanResult<BeanFactory> {
        let mut factory_post_processors = std::mem::take(&mut self.factory_post_processors);
        factory_post_processors.sort_by_key(|p| p.order());
        for processor in &factory_post_processors {
            processor.post_process_definitions(&mut self.registry)?;
        }

        self.validate().into_result()?;

        let mut merged = Map::default();
        for name in self.registry.names() {
            merged.insert(name.clone(), merge(&self.registry, name)?);
        }
        resolve_bean_classes(&mut merged, &self.registry, self.parent.as_ref());

        self.post_processors.sort_by_key(|p| p.order());

        let id = uuid::Uuid::new_v4().to_string();
        let display_name = self
            .config
            .display_name
            .clone()
            .unwrap_or_else(|| format!("BeanFactory@{}", &id[..8]));
        let definitions = self.registry.len();

        let factory = BeanFactory::new(FactoryInner {
            id,
            container_id: next_container_id(),
            display_name,
            startup_time: SystemTime::now(),
            registry: self.registry,
            merged,
            post_processors: self.post_processors,
            destruction_processors: self.destruction_processors,
            scopes: self.scopes,
            singletons: SingletonRegistry::default(),
            prototypes: Mutex::new(DisposeBag::default()),
            observers: self.observers,
            config: self.config,
            parent: self.parent,
            closed: AtomicBool::new(false),
        });

        if let Err(e) = factory.preinstantiate_singletons() {
            tracing::debug!(error = %e, "eager singleton creation failed, closing factory");
            if let Err(close_error) = factory.close() {
                tracing::warn!(error = %close_error, "destroying partially built factory failed");
            }
            return Err(e);
        }

        tracing::debug!(
            id = %factory.id(),
            name = %factory.display_name(),
            definitions,
            singletons = factory.singleton_names().len(),
            "bean factory built"
        );
        Ok(factory)
    }
}

impl Default for BeanCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BeanCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanCollection")
            .field("definitions", &self.registry.names())
            .field("post_processors", &self.post_processors.len())
            .field("scopes", &self.scopes.keys().collect::<Vec<_>>())
            .field("sources", &self.sources.len())
            .field("config", &self.config)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}
