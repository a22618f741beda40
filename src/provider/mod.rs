//! The bean factory: a built, shareable container.
//!
//! A [`BeanFactory`] is produced by [`BeanCollection::build`](crate::BeanCollection::build).
//! It owns the merged definitions, the singleton cache, registered scopes and
//! post-processors, and resolves beans by name or by capability.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use parking_lot::Mutex;

use crate::config::FactoryConfig;
use crate::definition::{MergedDefinition, Value};
use crate::descriptors::{DependencyDescriptor, Injected, Multiplicity};
use crate::error::{BeanError, BeanResult, DestructionErrors};
use crate::internal::{CreationGuard, DisposeBag, Map};
use crate::key::{is_factory_dereference, transformed_bean_name, Capability, FACTORY_BEAN_PREFIX};
use crate::lifecycle::{BeanPostProcessor, DestructionAwareBeanPostProcessor, DisposableBeanAdapter};
use crate::observer::Observers;
use crate::registration::{AnyArc, DefinitionRegistry};
use crate::scope::{Scope, ScopeProvider};
use crate::traits::ResolverCore;

mod bean_provider;
mod candidates;
mod context;
mod instantiate;
mod singletons;

pub use bean_provider::BeanProvider;
pub use context::ResolverContext;
pub(crate) use singletons::SingletonRegistry;

static NEXT_CONTAINER: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_container_id() -> u64 {
    NEXT_CONTAINER.fetch_add(1, Ordering::Relaxed)
}

pub(crate) struct FactoryInner {
    pub(crate) id: String,
    pub(crate) container_id: u64,
    pub(crate) display_name: String,
    pub(crate) startup_time: SystemTime,
    pub(crate) registry: DefinitionRegistry,
    pub(crate) merged: Map<String, MergedDefinition>,
    pub(crate) post_processors: Vec<Arc<dyn BeanPostProcessor>>,
    pub(crate) destruction_processors: Vec<Arc<dyn DestructionAwareBeanPostProcessor>>,
    pub(crate) scopes: Map<String, Arc<dyn ScopeProvider>>,
    pub(crate) singletons: SingletonRegistry,
    pub(crate) prototypes: Mutex<DisposeBag>,
    pub(crate) observers: Observers,
    pub(crate) config: FactoryConfig,
    pub(crate) parent: Option<BeanFactory>,
    pub(crate) closed: AtomicBool,
}

/// Bean container resolving beans by name or capability.
///
/// Cheap to clone; clones share every cache. All methods are safe to call from
/// several threads: concurrent first requests for the same singleton create it
/// exactly once.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{BeanCollection, Resolver, Scope};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut beans = BeanCollection::new();
/// beans.add_singleton("database", Database { url: "postgres://localhost".to_string() });
/// beans.add_prototype_factory::<UserService, _>("users", |ctx| {
///     Ok(UserService { db: ctx.get::<Database>()? })
/// });
///
/// let factory = beans.build().unwrap();
/// let a = factory.get::<UserService>().unwrap();
/// let b = factory.get::<UserService>().unwrap();
/// assert!(!Arc::ptr_eq(&a, &b));
/// assert!(Arc::ptr_eq(&a.db, &b.db));
/// assert!(factory.is_prototype("users").unwrap());
/// factory.close().unwrap();
/// ```
#[derive(Clone)]
pub struct BeanFactory {
    inner: Arc<FactoryInner>,
}

/// Weak handle to a [`BeanFactory`], handed to
/// [`BeanFactoryAware`](crate::traits::BeanFactoryAware) beans.
///
/// Holding it does not keep the factory alive, so beans never form a
/// reference cycle with their container.
#[derive(Clone)]
pub struct FactoryHandle(Weak<FactoryInner>);

impl FactoryHandle {
    /// The factory, if it is still alive.
    pub fn upgrade(&self) -> Option<BeanFactory> {
        self.0.upgrade().map(|inner| BeanFactory { inner })
    }
}

impl fmt::Debug for FactoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FactoryHandle")
            .field(&if self.0.strong_count() > 0 { "alive" } else { "dropped" })
            .finish()
    }
}

impl BeanFactory {
    pub(crate) fn new(inner: FactoryInner) -> Self {
        Self { inner: Arc::new(inner) }
    }

    pub(crate) fn handle(&self) -> FactoryHandle {
        FactoryHandle(Arc::downgrade(&self.inner))
    }

    pub(crate) fn post_processors(&self) -> &[Arc<dyn BeanPostProcessor>] {
        &self.inner.post_processors
    }

    pub(crate) fn destruction_processors(&self) -> &[Arc<dyn DestructionAwareBeanPostProcessor>] {
        &self.inner.destruction_processors
    }

    pub(crate) fn observers(&self) -> &Observers {
        &self.inner.observers
    }

    pub(crate) fn ensure_open(&self) -> BeanResult<()> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(BeanError::ContainerClosed);
        }
        Ok(())
    }

    pub(crate) fn scope_provider(&self, scope: &str, bean: &str) -> BeanResult<&Arc<dyn ScopeProvider>> {
        self.inner.scopes.get(scope).ok_or_else(|| BeanError::InvalidDefinition {
            name: bean.to_string(),
            reason: format!("no scope registered for name '{}'", scope),
        })
    }

    fn local(&self, name: &str) -> BeanResult<Option<&MergedDefinition>> {
        let canonical = self.inner.registry.canonical_name(transformed_bean_name(name))?;
        Ok(self.inner.merged.get(&canonical))
    }

    /// Name to forward to the parent: aliases resolved locally, `&` kept.
    fn forwarded_name(&self, name: &str) -> String {
        let bare = transformed_bean_name(name);
        let canonical = self
            .inner
            .registry
            .canonical_name(bare)
            .unwrap_or_else(|_| bare.to_string());
        if is_factory_dereference(name) {
            format!("{}{}", FACTORY_BEAN_PREFIX, canonical)
        } else {
            canonical
        }
    }

    // ----- name-based lookup -----

    /// Looks up a bean by name or alias; `&name` returns a factory bean itself.
    ///
    /// Names not defined here are delegated to the parent factory.
    pub fn get_bean(&self, name: &str) -> BeanResult<AnyArc> {
        self.lookup_bean(name, None)
    }

    /// Creates a prototype with explicit arguments, matched by count against
    /// the bean's constructors or factory methods.
    ///
    /// ```
    /// use ferrous_beans::{BeanClass, BeanCollection, BeanDefinition, DependencyDescriptor, Scope, Value};
    ///
    /// struct Greeting { text: String }
    ///
    /// let class = BeanClass::builder::<Greeting>()
    ///     .explicit_constructor(vec![DependencyDescriptor::of::<String>()], |args| {
    ///         Ok(Greeting { text: format!("hello {}", args.get::<String>(0)?) })
    ///     })
    ///     .default_constructor(|| Greeting { text: "hello".to_string() })
    ///     .build();
    ///
    /// let mut beans = BeanCollection::new();
    /// beans.register_definition("greeting", BeanDefinition::of(class).scope(Scope::Prototype));
    /// let factory = beans.build().unwrap();
    ///
    /// let bean = factory
    ///     .get_bean_with_args("greeting", vec![Value::literal("world".to_string())])
    ///     .unwrap();
    /// assert_eq!(bean.downcast_ref::<Greeting>().unwrap().text, "hello world");
    /// ```
    pub fn get_bean_with_args(&self, name: &str, args: Vec<Value>) -> BeanResult<AnyArc> {
        self.ensure_open()?;
        let Some(merged) = self.local(name)? else {
            return match &self.inner.parent {
                Some(parent) => parent.get_bean_with_args(&self.forwarded_name(name), args),
                None => Err(BeanError::NoSuchBean(name.to_string())),
            };
        };
        if !merged.scope().is_prototype() {
            return Err(BeanError::InvalidDefinition {
                name: merged.name().to_string(),
                reason: "explicit arguments require prototype scope".to_string(),
            });
        }
        if CreationGuard::in_creation(self.inner.container_id, merged.name()) {
            return Err(BeanError::CurrentlyInCreation { name: merged.name().to_string() });
        }
        let instance = self.create_bean(merged, Some(&args))?;
        self.object_for_instance(merged, instance, is_factory_dereference(name))
    }

    /// Creates the single prototype bean of type `T` with explicit arguments.
    ///
    /// The bean is selected like [`Resolver::get`](crate::Resolver::get) and
    /// then created like [`get_bean_with_args`](Self::get_bean_with_args).
    pub fn get_with_args<T: std::any::Any + Send + Sync>(&self, args: Vec<Value>) -> BeanResult<Arc<T>> {
        let object = self.create_with_args_as(&Capability::of::<T>(), args)?;
        object.downcast::<T>().map_err(|_| BeanError::TypeMismatch {
            name: std::any::type_name::<T>().to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    pub(crate) fn lookup_bean(&self, name: &str, requesting: Option<&str>) -> BeanResult<AnyArc> {
        self.ensure_open()?;
        let deref = is_factory_dereference(name);
        let Some(merged) = self.local(name)? else {
            return match &self.inner.parent {
                Some(parent) => parent.lookup_bean(&self.forwarded_name(name), None),
                None => Err(BeanError::NoSuchBean(name.to_string())),
            };
        };
        if let Some(requesting) = requesting {
            self.inner.singletons.register_dependent(merged.name(), requesting);
        }
        let instance = self.instance_for(merged)?;
        self.object_for_instance(merged, instance, deref)
    }

    /// Name-based lookup viewed as `capability`.
    pub(crate) fn lookup_bean_as(
        &self,
        name: &str,
        capability: &Capability,
        requesting: Option<&str>,
    ) -> BeanResult<AnyArc> {
        self.ensure_open()?;
        let deref = is_factory_dereference(name);
        let Some(merged) = self.local(name)? else {
            return match &self.inner.parent {
                Some(parent) => parent.lookup_bean_as(&self.forwarded_name(name), capability, None),
                None => Err(BeanError::NoSuchBean(name.to_string())),
            };
        };
        let object = self.lookup_bean(name, requesting)?;
        let class = if deref { merged.bean_class() } else { merged.object_class() };
        let cast = match class {
            Some(class) => class.cast(&object, capability),
            None => crate::class::cast_by_runtime_type(&object, capability),
        };
        cast.ok_or_else(|| BeanError::TypeMismatch {
            name: name.to_string(),
            expected: capability.display_name(),
        })
    }

    /// Scope dispatch for a local definition.
    fn instance_for(&self, merged: &MergedDefinition) -> BeanResult<AnyArc> {
        let name = merged.name();
        let container = self.inner.container_id;
        if merged.is_abstract() {
            return Err(BeanError::AbstractBean(name.to_string()));
        }

        match merged.scope() {
            Scope::Singleton => {
                if let Some(object) = self.inner.singletons.completed(name) {
                    return Ok(object);
                }
                if CreationGuard::in_creation(container, name) {
                    if let Some(early) = self.inner.singletons.early_reference(name) {
                        return Ok(early);
                    }
                    if !self.inner.config.allow_circular_references {
                        return Err(BeanError::CurrentlyInCreation { name: name.to_string() });
                    }
                    return Err(BeanError::CircularConstructorDependency {
                        chain: CreationGuard::chain_to(container, name),
                    });
                }
                self.ensure_depends_on(merged)?;
                self.inner
                    .singletons
                    .get_or_create(name, || self.create_bean(merged, None))
            }
            Scope::Prototype => {
                if CreationGuard::in_creation(container, name) {
                    return Err(BeanError::CurrentlyInCreation { name: name.to_string() });
                }
                self.ensure_depends_on(merged)?;
                self.create_bean(merged, None)
            }
            Scope::Custom(scope) => {
                let provider = self.scope_provider(scope, name)?;
                if CreationGuard::in_creation(container, name) {
                    return Err(BeanError::CurrentlyInCreation { name: name.to_string() });
                }
                self.ensure_depends_on(merged)?;
                provider.get(name, &mut || self.create_bean(merged, None))
            }
        }
    }

    /// Initializes every `depends_on` bean first.
    fn ensure_depends_on(&self, merged: &MergedDefinition) -> BeanResult<()> {
        let name = merged.name();
        for dependency in &merged.definition().depends_on {
            let canonical = self.inner.registry.canonical_name(dependency)?;
            if self.inner.singletons.is_dependent(name, &canonical) {
                return Err(BeanError::InvalidDefinition {
                    name: name.to_string(),
                    reason: format!("circular depends-on relationship with '{}'", dependency),
                });
            }
            self.inner.singletons.register_dependent(&canonical, name);
            self.lookup_bean(dependency, None)
                .map_err(|e| BeanError::creation(name, e))?;
        }
        Ok(())
    }

    /// The object exposed for `instance`: the instance itself, or the product
    /// of a factory bean unless `&` was requested.
    fn object_for_instance(&self, merged: &MergedDefinition, instance: AnyArc, deref: bool) -> BeanResult<AnyArc> {
        let name = merged.name();
        if deref {
            if !merged.is_factory_bean() {
                return Err(BeanError::NotAFactoryBean(name.to_string()));
            }
            return Ok(instance);
        }
        let Some(binding) = merged.bean_class().and_then(|c| c.factory_bean.as_ref()) else {
            return Ok(instance);
        };

        let produce = || -> BeanResult<AnyArc> {
            let mut product = (binding.get_object)(&instance).map_err(|e| BeanError::creation(name, e))?;
            for processor in self.post_processors() {
                product = processor
                    .post_process_after_initialization(product, name)
                    .map_err(|e| BeanError::creation(name, e))?;
            }
            tracing::trace!(bean = name, "obtained object from factory bean");
            Ok(product)
        };

        if merged.scope().is_singleton() && (binding.is_singleton)(&instance) {
            self.inner.singletons.product_or_create(name, produce)
        } else {
            produce()
        }
    }

    // ----- capability-based lookup -----

    /// The single bean satisfying `capability`.
    ///
    /// With `required == false` absence yields `Ok(None)`; ambiguity is always an error.
    pub fn get_by_capability(&self, capability: &Capability, required: bool) -> BeanResult<Option<AnyArc>> {
        let mut descriptor = DependencyDescriptor::capability(*capability);
        descriptor.required = required;
        match self.resolve_dependency(&descriptor, None)? {
            Injected::One(object) => Ok(Some(object)),
            _ => Ok(None),
        }
    }

    /// Every bean satisfying `capability` with its name, in collection order.
    pub fn get_all_by_capability(&self, capability: &Capability) -> BeanResult<Vec<(String, AnyArc)>> {
        let mut descriptor = DependencyDescriptor::capability(*capability).optional();
        descriptor.multiplicity = Multiplicity::Map;
        match self.resolve_dependency(&descriptor, None)? {
            Injected::Many(all) => Ok(all),
            _ => Ok(Vec::new()),
        }
    }

    // ----- introspection -----

    /// True if a bean with this name (or alias) exists here or in an ancestor.
    pub fn contains_bean(&self, name: &str) -> bool {
        match self.local(name) {
            Ok(Some(_)) => true,
            _ => self
                .inner
                .parent
                .as_ref()
                .map(|p| p.contains_bean(&self.forwarded_name(name)))
                .unwrap_or(false),
        }
    }

    /// True if this factory itself defines `name`; ancestors are not consulted.
    pub fn contains_definition(&self, name: &str) -> bool {
        self.inner.registry.contains(transformed_bean_name(name))
    }

    /// Merged definition of `name`, searching ancestors.
    ///
    /// Every lookup built on it (`is_singleton`, `is_prototype`, `get_type`,
    /// `destroy_bean`...) fails with [`BeanError::ContainerClosed`] after close.
    pub fn definition(&self, name: &str) -> BeanResult<&MergedDefinition> {
        self.ensure_open()?;
        if let Some(merged) = self.local(name)? {
            return Ok(merged);
        }
        match &self.inner.parent {
            Some(parent) => parent.definition(&self.forwarded_name(name)),
            None => Err(BeanError::DefinitionNotFound(transformed_bean_name(name).to_string())),
        }
    }

    /// True if lookups of `name` always return the same object.
    pub fn is_singleton(&self, name: &str) -> BeanResult<bool> {
        let merged = self.definition(name)?;
        if !merged.scope().is_singleton() {
            return Ok(false);
        }
        if is_factory_dereference(name) {
            return Ok(true);
        }
        Ok(self.factory_product_is_singleton(merged).unwrap_or(true))
    }

    /// True if every lookup of `name` returns a new object.
    pub fn is_prototype(&self, name: &str) -> BeanResult<bool> {
        let merged = self.definition(name)?;
        if merged.scope().is_prototype() {
            return Ok(true);
        }
        if is_factory_dereference(name) {
            return Ok(false);
        }
        Ok(self.factory_product_is_singleton(merged) == Some(false))
    }

    /// `FactoryBean::is_singleton` of an already created factory, if known.
    fn factory_product_is_singleton(&self, merged: &MergedDefinition) -> Option<bool> {
        let binding = merged.bean_class()?.factory_bean.as_ref()?;
        let owner = if self.inner.merged.contains_key(merged.name()) {
            self
        } else {
            self.inner.parent.as_ref()?
        };
        let factory = owner.inner.singletons.completed(merged.name())?;
        Some((binding.is_singleton)(&factory))
    }

    /// Every other name `name` is known by: aliases and, for an alias, the canonical name.
    pub fn get_aliases(&self, name: &str) -> Vec<String> {
        let deref = is_factory_dereference(name);
        let bare = transformed_bean_name(name);
        let canonical = match self.inner.registry.canonical_name(bare) {
            Ok(canonical) => canonical,
            Err(_) => return Vec::new(),
        };
        if !self.inner.registry.contains(&canonical) {
            if let Some(parent) = &self.inner.parent {
                return parent.get_aliases(name);
            }
        }
        let mut names = self.inner.registry.aliases(&canonical);
        if canonical != bare {
            names.push(canonical);
        }
        names.retain(|n| n != bare);
        if deref {
            names = names.into_iter().map(|n| format!("{}{}", FACTORY_BEAN_PREFIX, n)).collect();
        }
        names
    }

    /// Capabilities of the object `name` resolves to.
    pub fn get_type(&self, name: &str) -> BeanResult<Vec<Capability>> {
        let merged = self.definition(name)?;
        let class = if is_factory_dereference(name) {
            merged.bean_class()
        } else {
            merged.object_class()
        };
        Ok(class.map(|c| c.capabilities()).unwrap_or_default())
    }

    /// True if the object `name` resolves to satisfies `capability`.
    pub fn is_type_match(&self, name: &str, capability: &Capability) -> BeanResult<bool> {
        Ok(self.get_type(name)?.contains(capability))
    }

    /// Names defined by this factory, in registration order.
    pub fn definition_names(&self) -> Vec<String> {
        self.inner.registry.names().to_vec()
    }

    /// Names of non-abstract beans whose object satisfies `capability`, local
    /// names first, then ancestors' names not shadowed locally.
    pub fn names_for_capability(&self, capability: &Capability) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .registry
            .names()
            .iter()
            .filter(|name| {
                self.inner
                    .merged
                    .get(*name)
                    .filter(|m| !m.is_abstract())
                    .and_then(|m| m.object_class())
                    .map(|c| c.provides_capability(capability))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        if let Some(parent) = &self.inner.parent {
            for name in parent.names_for_capability(capability) {
                if !self.inner.registry.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Names of the singletons created so far, in creation order.
    pub fn singleton_names(&self) -> Vec<String> {
        self.inner.singletons.names()
    }

    /// Beans recorded as depending on `name`.
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        match self.inner.registry.canonical_name(transformed_bean_name(name)) {
            Ok(canonical) => self.inner.singletons.dependents_of(&canonical),
            Err(_) => Vec::new(),
        }
    }

    // ----- destruction -----

    /// Runs the destroy sequence of `name`'s definition on a caller-owned instance.
    pub fn destroy_bean(&self, name: &str, instance: &AnyArc) -> BeanResult<()> {
        let merged = self.definition(name)?;
        let Some(adapter) = DisposableBeanAdapter::for_bean(self, merged, instance, instance)? else {
            return Ok(());
        };
        adapter.destroy().map_err(|e| {
            let mut errors = DestructionErrors::default();
            errors.push(merged.name(), e);
            BeanError::Destruction(errors)
        })
    }

    /// Removes `name` from its custom scope and destroys it.
    pub fn destroy_scoped_bean(&self, name: &str) -> BeanResult<()> {
        self.ensure_open()?;
        let merged = self
            .local(name)?
            .ok_or_else(|| BeanError::NoSuchBean(name.to_string()))?;
        let Scope::Custom(scope) = merged.scope() else {
            return Err(BeanError::InvalidDefinition {
                name: merged.name().to_string(),
                reason: format!("bean is not in a custom scope (scope '{}')", merged.scope()),
            });
        };
        match self.scope_provider(scope, merged.name())?.remove(merged.name()) {
            Some(instance) => self.destroy_bean(merged.name(), &instance),
            None => Ok(()),
        }
    }

    /// Destroys every singleton in reverse creation order, then tracked
    /// prototypes. Idempotent; later lookups fail with
    /// [`BeanError::ContainerClosed`]. Every destroy hook runs; failures are
    /// reported together.
    pub fn close(&self) -> BeanResult<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::debug!(container = %self.inner.id, name = %self.inner.display_name, "closing bean factory");
        let mut errors = self.inner.singletons.destroy_all();
        let mut prototypes = std::mem::take(&mut *self.inner.prototypes.lock());
        errors.extend(prototypes.run_all_reverse());
        if !errors.is_empty() {
            tracing::warn!(failures = errors.len(), "bean factory closed with destruction failures");
        }
        errors.into_result()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    // ----- metadata -----

    /// Unique id of this factory.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn display_name(&self) -> &str {
        &self.inner.display_name
    }

    /// When the factory finished building.
    pub fn startup_time(&self) -> SystemTime {
        self.inner.startup_time
    }

    pub fn parent(&self) -> Option<&BeanFactory> {
        self.inner.parent.as_ref()
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.inner.config
    }

    /// Creates every non-lazy, non-abstract singleton in registration order.
    ///
    /// Factory beans are created as factories; their products stay lazy.
    pub(crate) fn preinstantiate_singletons(&self) -> BeanResult<()> {
        for name in self.inner.registry.names() {
            let Some(merged) = self.inner.merged.get(name) else {
                continue;
            };
            if merged.is_abstract() || merged.is_lazy() || !merged.scope().is_singleton() {
                continue;
            }
            if merged.is_factory_bean() {
                self.get_bean(&format!("{}{}", FACTORY_BEAN_PREFIX, name))?;
            } else {
                self.get_bean(name)?;
            }
        }
        Ok(())
    }
}

impl ResolverCore for BeanFactory {
    fn resolve_named(&self, name: &str) -> BeanResult<AnyArc> {
        self.lookup_bean(name, None)
    }

    fn resolve_named_as(&self, name: &str, capability: &Capability) -> BeanResult<AnyArc> {
        self.lookup_bean_as(name, capability, None)
    }

    fn resolve_descriptor(&self, descriptor: &DependencyDescriptor) -> BeanResult<Injected> {
        self.resolve_dependency(descriptor, None)
    }

    fn origin(&self) -> (FactoryHandle, Option<&str>) {
        (self.handle(), None)
    }
}

impl fmt::Debug for BeanFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanFactory")
            .field("id", &self.inner.id)
            .field("display_name", &self.inner.display_name)
            .field("definitions", &self.inner.registry.len())
            .field("singletons", &self.inner.singletons.len())
            .field("closed", &self.is_closed())
            .field("has_parent", &self.inner.parent.is_some())
            .finish()
    }
}

impl Drop for BeanFactory {
    fn drop(&mut self) {
        // Last handle: warn about beans whose destroy hooks never ran
        if Arc::strong_count(&self.inner) == 1 && !self.is_closed() && self.inner.singletons.len() > 0 {
            tracing::warn!(
                container = %self.inner.id,
                singletons = self.inner.singletons.len(),
                "bean factory dropped without close(); destroy hooks were not run"
            );
        }
    }
}
