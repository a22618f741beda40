//! Bean classes: the injection-point metadata of a type.
//!
//! Rust has no runtime reflection, so each bean type describes itself once with
//! a [`ClassBuilder`]: the capabilities it provides, its constructors and factory
//! methods with their dependency descriptors, settable properties, named
//! lifecycle methods and the lifecycle traits it implements. The container treats
//! the resulting [`BeanClass`] as an opaque oracle.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::descriptors::{Args, DependencyDescriptor, Injected};
use crate::error::{BeanError, BoxError};
use crate::key::Capability;
use crate::provider::FactoryHandle;
use crate::registration::AnyArc;
use crate::traits::{BeanFactoryAware, BeanNameAware, DisposableBean, FactoryBean, InitializingBean};

type Caster = Arc<dyn Fn(&AnyArc) -> Option<AnyArc> + Send + Sync>;
pub(crate) type Invoker = Arc<dyn Fn(Option<&AnyArc>, &Args<'_>) -> Result<AnyArc, BoxError> + Send + Sync>;
pub(crate) type Hook = Arc<dyn Fn(&AnyArc) -> Result<(), BoxError> + Send + Sync>;
pub(crate) type Setter = Arc<dyn Fn(&AnyArc, Injected) -> Result<(), BoxError> + Send + Sync>;

/// Name of the [`InitializingBean`] hook; a named init method with this name is not run twice.
pub const AFTER_PROPERTIES_SET: &str = "after_properties_set";
/// Name of the [`DisposableBean`] hook; a named destroy method with this name is not run twice.
pub const DESTROY: &str = "destroy";

/// A constructor or factory method.
#[derive(Clone)]
pub(crate) struct Executable {
    pub(crate) name: Option<String>,
    pub(crate) params: Vec<DependencyDescriptor>,
    pub(crate) required: bool,
    pub(crate) autowire_candidate: bool,
    pub(crate) returns: Option<Arc<BeanClass>>,
    pub(crate) invoke: Invoker,
}

impl Executable {
    pub(crate) fn arity(&self) -> usize {
        self.params.len()
    }
}

/// A settable property.
#[derive(Clone)]
pub(crate) struct PropertyDef {
    pub(crate) name: String,
    pub(crate) capability: Option<Capability>,
    pub(crate) autowire: Option<DependencyDescriptor>,
    pub(crate) setter: Setter,
}

#[derive(Clone)]
pub(crate) struct FactoryBeanBinding {
    pub(crate) product: Arc<BeanClass>,
    pub(crate) get_object: Arc<dyn Fn(&AnyArc) -> Result<AnyArc, BoxError> + Send + Sync>,
    pub(crate) is_singleton: Arc<dyn Fn(&AnyArc) -> bool + Send + Sync>,
}

/// Injection-point metadata of one bean type.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{BeanClass, BeanCollection, BeanDefinition, DependencyDescriptor, Resolver};
/// use std::sync::Arc;
///
/// trait Store: Send + Sync {
///     fn get(&self) -> &str;
/// }
///
/// struct MemoryStore;
/// impl Store for MemoryStore {
///     fn get(&self) -> &str { "memory" }
/// }
///
/// struct Service { store: Arc<dyn Store> }
///
/// let store = BeanClass::builder::<MemoryStore>()
///     .default_constructor(|| MemoryStore)
///     .provides::<dyn Store>(|s| s)
///     .build();
///
/// let service = BeanClass::builder::<Service>()
///     .constructor(vec![DependencyDescriptor::of_trait::<dyn Store>()], |args| {
///         Ok(Service { store: args.get_trait::<dyn Store>(0)? })
///     })
///     .build();
///
/// let mut beans = BeanCollection::new();
/// beans.register_definition("store", BeanDefinition::of(store));
/// beans.register_definition("service", BeanDefinition::of(service));
/// let factory = beans.build().unwrap();
///
/// assert_eq!(factory.get::<Service>().unwrap().store.get(), "memory");
/// ```
pub struct BeanClass {
    type_id: TypeId,
    type_name: &'static str,
    casts: Vec<(Capability, Caster)>,
    pub(crate) constructors: Vec<Executable>,
    pub(crate) static_factories: Vec<Executable>,
    pub(crate) instance_factories: Vec<Executable>,
    pub(crate) properties: Vec<PropertyDef>,
    pub(crate) init_methods: Vec<(String, Hook)>,
    pub(crate) destroy_methods: Vec<(String, Hook)>,
    pub(crate) name_aware: Option<Arc<dyn Fn(&AnyArc, &str) -> Result<(), BoxError> + Send + Sync>>,
    pub(crate) factory_aware: Option<Arc<dyn Fn(&AnyArc, FactoryHandle) -> Result<(), BoxError> + Send + Sync>>,
    pub(crate) initializing: Option<Hook>,
    pub(crate) disposable: Option<Hook>,
    pub(crate) factory_bean: Option<FactoryBeanBinding>,
}

fn mismatch<T: ?Sized>(what: &str) -> BoxError {
    Box::new(BeanError::TypeMismatch {
        name: what.to_string(),
        expected: std::any::type_name::<T>(),
    })
}

fn target<'a, T: Any>(instance: &'a AnyArc, what: &str) -> Result<&'a T, BoxError> {
    instance.downcast_ref::<T>().ok_or_else(|| mismatch::<T>(what))
}

impl BeanClass {
    /// Starts describing bean type `T`.
    pub fn builder<T: Any + Send + Sync>() -> ClassBuilder<T> {
        ClassBuilder::new()
    }

    /// Class for a pre-built trait object stored as `Arc<Arc<dyn T>>`.
    pub(crate) fn for_trait_object<T: ?Sized + Send + Sync + 'static>() -> Self {
        let identity: Caster = Arc::new(|any: &AnyArc| Some(any.clone()));
        Self::empty(TypeId::of::<Arc<T>>(), std::any::type_name::<T>())
            .with_cast(Capability::of_trait::<T>(), identity)
    }

    fn empty(type_id: TypeId, type_name: &'static str) -> Self {
        Self {
            type_id,
            type_name,
            casts: Vec::new(),
            constructors: Vec::new(),
            static_factories: Vec::new(),
            instance_factories: Vec::new(),
            properties: Vec::new(),
            init_methods: Vec::new(),
            destroy_methods: Vec::new(),
            name_aware: None,
            factory_aware: None,
            initializing: None,
            disposable: None,
            factory_bean: None,
        }
    }

    fn with_cast(mut self, capability: Capability, caster: Caster) -> Self {
        self.casts.retain(|(c, _)| *c != capability);
        self.casts.push((capability, caster));
        self
    }

    /// Name of the described type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// TypeId of the described type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Every capability instances of this class satisfy.
    pub fn capabilities(&self) -> Vec<Capability> {
        self.casts.iter().map(|(c, _)| *c).collect()
    }

    /// True if instances satisfy `capability`.
    pub fn provides_capability(&self, capability: &Capability) -> bool {
        self.casts.iter().any(|(c, _)| c == capability)
    }

    /// True if the class is bound as a [`FactoryBean`].
    pub fn is_factory_bean(&self) -> bool {
        self.factory_bean.is_some()
    }

    /// Class of the object produced by a factory bean.
    pub fn product_class(&self) -> Option<&Arc<BeanClass>> {
        self.factory_bean.as_ref().map(|fb| &fb.product)
    }

    /// Names of the declared properties.
    pub fn property_names(&self) -> Vec<&str> {
        self.properties.iter().map(|p| p.name.as_str()).collect()
    }

    pub(crate) fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub(crate) fn init_method(&self, name: &str) -> Option<&Hook> {
        self.init_methods.iter().find(|(n, _)| n == name).map(|(_, h)| h)
    }

    pub(crate) fn destroy_method(&self, name: &str) -> Option<&Hook> {
        self.destroy_methods.iter().find(|(n, _)| n == name).map(|(_, h)| h)
    }

    pub(crate) fn static_factories_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Executable> + 'a {
        self.static_factories
            .iter()
            .filter(move |e| e.name.as_deref() == Some(name))
    }

    pub(crate) fn instance_factories_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Executable> + 'a {
        self.instance_factories
            .iter()
            .filter(move |e| e.name.as_deref() == Some(name))
    }

    /// Views `instance` as `capability`: `Arc<T>` for a concrete type,
    /// `Arc<Arc<dyn Trait>>` for a trait object.
    pub(crate) fn cast(&self, instance: &AnyArc, capability: &Capability) -> Option<AnyArc> {
        if let Some((_, caster)) = self.casts.iter().find(|(c, _)| c == capability) {
            if let Some(cast) = caster(instance) {
                return Some(cast);
            }
        }
        cast_by_runtime_type(instance, capability)
    }
}

/// Concrete-type view of an instance whose class is unknown.
pub(crate) fn cast_by_runtime_type(instance: &AnyArc, capability: &Capability) -> Option<AnyArc> {
    match capability {
        Capability::Type(id, _) if Any::type_id(&**instance) == *id => Some(instance.clone()),
        _ => None,
    }
}

impl fmt::Debug for BeanClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanClass")
            .field("type_name", &self.type_name)
            .field("capabilities", &self.capabilities())
            .field("constructors", &self.constructors.len())
            .field("properties", &self.property_names())
            .field("factory_bean", &self.is_factory_bean())
            .finish()
    }
}

/// Typed builder for a [`BeanClass`].
pub struct ClassBuilder<T> {
    class: BeanClass,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> ClassBuilder<T> {
    fn new() -> Self {
        let own: Caster = Arc::new(|any: &AnyArc| {
            any.clone().downcast::<T>().ok().map(|t| t as AnyArc)
        });
        let class = BeanClass::empty(TypeId::of::<T>(), std::any::type_name::<T>())
            .with_cast(Capability::of::<T>(), own);
        Self { class, _marker: PhantomData }
    }

    /// Declares that instances can be used as trait object `I`.
    pub fn provides<I>(mut self, cast: fn(Arc<T>) -> Arc<I>) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
    {
        let caster: Caster = Arc::new(move |any: &AnyArc| {
            any.clone()
                .downcast::<T>()
                .ok()
                .map(|t| Arc::new(cast(t)) as AnyArc)
        });
        self.class = self.class.with_cast(Capability::of_trait::<I>(), caster);
        self
    }

    fn push_constructor<F>(mut self, params: Vec<DependencyDescriptor>, required: bool, autowire: bool, f: F) -> Self
    where
        F: Fn(&Args<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let invoke: Invoker = Arc::new(move |_, args| f(args).map(|t| Arc::new(t) as AnyArc));
        self.class.constructors.push(Executable {
            name: None,
            params,
            required,
            autowire_candidate: autowire,
            returns: None,
            invoke,
        });
        self
    }

    /// Adds an autowire-candidate constructor.
    pub fn constructor<F>(self, params: Vec<DependencyDescriptor>, f: F) -> Self
    where
        F: Fn(&Args<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.push_constructor(params, false, true, f)
    }

    /// Adds the constructor that must be used exclusively for autowiring.
    ///
    /// Declaring two is reported as [`BeanError::ConflictingConstructor`] when the
    /// bean is created.
    pub fn required_constructor<F>(self, params: Vec<DependencyDescriptor>, f: F) -> Self
    where
        F: Fn(&Args<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.push_constructor(params, true, true, f)
    }

    /// Adds a constructor used only with explicit arguments.
    pub fn explicit_constructor<F>(self, params: Vec<DependencyDescriptor>, f: F) -> Self
    where
        F: Fn(&Args<'_>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.push_constructor(params, false, false, f)
    }

    /// Adds the no-argument constructor, also the fallback when no other constructor resolves.
    pub fn default_constructor<F>(self, f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.push_constructor(Vec::new(), false, true, move |_| Ok(f()))
    }

    /// Adds a static factory method producing `R`, described only by its concrete type.
    pub fn static_factory<R, F>(self, name: impl Into<String>, params: Vec<DependencyDescriptor>, f: F) -> Self
    where
        R: Any + Send + Sync,
        F: Fn(&Args<'_>) -> Result<R, BoxError> + Send + Sync + 'static,
    {
        self.static_factory_with(name, params, BeanClass::builder::<R>(), f)
    }

    /// Adds a static factory method producing `R` described by `product`.
    pub fn static_factory_with<R, F>(
        mut self,
        name: impl Into<String>,
        params: Vec<DependencyDescriptor>,
        product: ClassBuilder<R>,
        f: F,
    ) -> Self
    where
        R: Any + Send + Sync,
        F: Fn(&Args<'_>) -> Result<R, BoxError> + Send + Sync + 'static,
    {
        let invoke: Invoker = Arc::new(move |_, args| f(args).map(|r| Arc::new(r) as AnyArc));
        self.class.static_factories.push(Executable {
            name: Some(name.into()),
            params,
            required: false,
            autowire_candidate: true,
            returns: Some(product.build()),
            invoke,
        });
        self
    }

    /// Adds a factory method invoked on a bean of this class, producing `R`.
    pub fn factory_method<R, F>(self, name: impl Into<String>, params: Vec<DependencyDescriptor>, f: F) -> Self
    where
        R: Any + Send + Sync,
        F: Fn(&T, &Args<'_>) -> Result<R, BoxError> + Send + Sync + 'static,
    {
        self.factory_method_with(name, params, BeanClass::builder::<R>(), f)
    }

    /// Adds a factory method invoked on a bean of this class, producing `R` described by `product`.
    pub fn factory_method_with<R, F>(
        mut self,
        name: impl Into<String>,
        params: Vec<DependencyDescriptor>,
        product: ClassBuilder<R>,
        f: F,
    ) -> Self
    where
        R: Any + Send + Sync,
        F: Fn(&T, &Args<'_>) -> Result<R, BoxError> + Send + Sync + 'static,
    {
        let method: String = name.into();
        let label = method.clone();
        let invoke: Invoker = Arc::new(move |instance, args| {
            let instance = instance.ok_or_else(|| -> BoxError {
                format!("factory method '{}' needs a target bean", label).into()
            })?;
            let this = target::<T>(instance, &label)?;
            f(this, args).map(|r| Arc::new(r) as AnyArc)
        });
        self.class.instance_factories.push(Executable {
            name: Some(method),
            params,
            required: false,
            autowire_candidate: true,
            returns: Some(product.build()),
            invoke,
        });
        self
    }

    fn push_property(
        mut self,
        name: String,
        capability: Option<Capability>,
        autowire: Option<DependencyDescriptor>,
        setter: Setter,
    ) -> Self {
        self.class.properties.retain(|p| p.name != name);
        self.class.properties.push(PropertyDef { name, capability, autowire, setter });
        self
    }

    /// Settable property of concrete type `V`, filled from definition property values.
    pub fn property<V, F>(self, name: impl Into<String>, f: F) -> Self
    where
        V: Any + Send + Sync,
        F: Fn(&T, Arc<V>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let name = name.into();
        let label = name.clone();
        let setter: Setter = Arc::new(move |instance, value| match value.optional::<V>()? {
            Some(v) => f(target::<T>(instance, &label)?, v),
            None => Ok(()),
        });
        self.push_property(name, Some(Capability::of::<V>()), None, setter)
    }

    /// Settable property of trait object type `I`, filled from definition property values.
    pub fn property_trait<I, F>(self, name: impl Into<String>, f: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(&T, Arc<I>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let name = name.into();
        let label = name.clone();
        let setter: Setter = Arc::new(move |instance, value| match value.optional_trait::<I>()? {
            Some(v) => f(target::<T>(instance, &label)?, v),
            None => Ok(()),
        });
        self.push_property(name, Some(Capability::of_trait::<I>()), None, setter)
    }

    /// Property autowired by concrete type `V` (required).
    pub fn autowired<V, F>(self, name: impl Into<String>, f: F) -> Self
    where
        V: Any + Send + Sync,
        F: Fn(&T, Arc<V>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let name = name.into();
        let descriptor = DependencyDescriptor::of::<V>();
        let built = self.property::<V, F>(name.clone(), f);
        built.mark_autowired(&name, descriptor)
    }

    /// Property autowired by trait object type `I` (required).
    pub fn autowired_trait<I, F>(self, name: impl Into<String>, f: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(&T, Arc<I>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let name = name.into();
        let descriptor = DependencyDescriptor::of_trait::<I>();
        let built = self.property_trait::<I, F>(name.clone(), f);
        built.mark_autowired(&name, descriptor)
    }

    /// Property autowired with an arbitrary descriptor; the setter receives the raw
    /// [`Injected`] value (absent, single or many).
    pub fn inject<F>(self, name: impl Into<String>, descriptor: DependencyDescriptor, f: F) -> Self
    where
        F: Fn(&T, Injected) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let name = name.into();
        let label = name.clone();
        let capability = descriptor.expected_capability();
        let setter: Setter = Arc::new(move |instance, value| f(target::<T>(instance, &label)?, value));
        self.push_property(name, capability, Some(descriptor), setter)
    }

    fn mark_autowired(mut self, name: &str, descriptor: DependencyDescriptor) -> Self {
        if let Some(p) = self.class.properties.iter_mut().find(|p| p.name == name) {
            p.autowire = Some(descriptor);
        }
        self
    }

    /// Named init method, selected by a definition's `init_method_name`.
    pub fn init_method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let name = name.into();
        let label = name.clone();
        let hook: Hook = Arc::new(move |instance| f(target::<T>(instance, &label)?));
        self.class.init_methods.retain(|(n, _)| *n != name);
        self.class.init_methods.push((name, hook));
        self
    }

    /// Named destroy method, selected by a definition's `destroy_method_name`.
    pub fn destroy_method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let name = name.into();
        let label = name.clone();
        let hook: Hook = Arc::new(move |instance| f(target::<T>(instance, &label)?));
        self.class.destroy_methods.retain(|(n, _)| *n != name);
        self.class.destroy_methods.push((name, hook));
        self
    }

    /// Binds [`BeanNameAware`].
    pub fn name_aware(mut self) -> Self
    where
        T: BeanNameAware,
    {
        self.class.name_aware = Some(Arc::new(|instance, name| {
            target::<T>(instance, "set_bean_name")?.set_bean_name(name);
            Ok(())
        }));
        self
    }

    /// Binds [`BeanFactoryAware`].
    pub fn factory_aware(mut self) -> Self
    where
        T: BeanFactoryAware,
    {
        self.class.factory_aware = Some(Arc::new(|instance, handle| {
            target::<T>(instance, "set_bean_factory")?.set_bean_factory(handle);
            Ok(())
        }));
        self
    }

    /// Binds [`InitializingBean`].
    pub fn initializing(mut self) -> Self
    where
        T: InitializingBean,
    {
        self.class.initializing = Some(Arc::new(|instance| {
            target::<T>(instance, AFTER_PROPERTIES_SET)?.after_properties_set()
        }));
        self
    }

    /// Binds [`DisposableBean`].
    pub fn disposable(mut self) -> Self
    where
        T: DisposableBean,
    {
        self.class.disposable = Some(Arc::new(|instance| target::<T>(instance, DESTROY)?.destroy()));
        self
    }

    /// Binds [`FactoryBean`]; `product` describes the produced object.
    pub fn factory_bean(mut self, product: ClassBuilder<T::Object>) -> Self
    where
        T: FactoryBean,
    {
        self.class.factory_bean = Some(FactoryBeanBinding {
            product: product.build(),
            get_object: Arc::new(|instance| {
                let factory = target::<T>(instance, "get_object")?;
                factory.get_object().map(|object| object as AnyArc)
            }),
            is_singleton: Arc::new(|instance| {
                instance
                    .downcast_ref::<T>()
                    .map(|factory| factory.is_singleton())
                    .unwrap_or(true)
            }),
        });
        self
    }

    /// Finishes the class.
    pub fn build(self) -> Arc<BeanClass> {
        Arc::new(self.class)
    }
}

impl<T: Any + Send + Sync> Default for ClassBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
