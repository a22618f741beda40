//! Resolver traits for bean lookup.

use std::any::Any;
use std::sync::Arc;

use crate::descriptors::{DependencyDescriptor, Injected};
use crate::error::{BeanError, BeanResult};
use crate::key::Capability;
use crate::provider::{BeanProvider, FactoryHandle};
use crate::registration::AnyArc;

/// Core resolver trait for object-safe bean resolution.
///
/// Implemented by [`BeanFactory`](crate::BeanFactory) and by the
/// [`ResolverContext`](crate::ResolverContext) handed to constructors and
/// factory closures. The context variant remembers which bean is being built,
/// so resolved beans are recorded as its dependencies (for destruction
/// ordering) and the bean never autowires itself.
///
/// Most users should use the [`Resolver`] trait instead, which provides typed
/// helpers on top of this trait.
pub trait ResolverCore: Send + Sync {
    /// Resolves a bean by name or alias, returning the raw instance.
    ///
    /// For factory beans this is the produced object; prefix the name with `&`
    /// to obtain the factory itself.
    fn resolve_named(&self, name: &str) -> BeanResult<AnyArc>;

    /// Resolves a bean by name and views it as `capability`.
    ///
    /// Fails with [`BeanError::TypeMismatch`] if the bean does not provide it.
    fn resolve_named_as(&self, name: &str, capability: &Capability) -> BeanResult<AnyArc>;

    /// Resolves a dependency descriptor: single bean with tie-breaks, or every
    /// match for collection and map descriptors.
    fn resolve_descriptor(&self, descriptor: &DependencyDescriptor) -> BeanResult<Injected>;

    /// The container behind this resolver and the bean being built through
    /// it, if any. Providers created here resolve on behalf of that bean.
    fn origin(&self) -> (FactoryHandle, Option<&str>);
}

fn downcast<T: Any + Send + Sync>(name: &str, any: AnyArc) -> BeanResult<Arc<T>> {
    any.downcast::<T>().map_err(|_| BeanError::TypeMismatch {
        name: name.to_string(),
        expected: std::any::type_name::<T>(),
    })
}

fn downcast_trait_owned<T: ?Sized + 'static>(name: &str, any: AnyArc) -> BeanResult<Arc<T>>
where
    Arc<T>: Any,
{
    downcast_trait::<T>(name, &any)
}

fn downcast_trait<T: ?Sized + 'static>(name: &str, any: &AnyArc) -> BeanResult<Arc<T>>
where
    Arc<T>: Any,
{
    // Trait objects are stored as Arc<Arc<dyn Trait>>
    any.downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or_else(|| BeanError::TypeMismatch {
            name: name.to_string(),
            expected: std::any::type_name::<T>(),
        })
}

/// High-level resolver interface with generic methods for typed lookup.
///
/// Type-based lookups (`get`, `get_trait`, `get_all`...) go through candidate
/// selection: every non-abstract autowire candidate whose produced object
/// provides the capability is considered, then narrowed by primary flag and
/// explicit order. Name-based lookups (`get_named`...) bypass selection.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{BeanCollection, Resolver};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str) -> String;
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) -> String {
///         format!("LOG: {}", msg)
///     }
/// }
///
/// let mut beans = BeanCollection::new();
/// beans.add_singleton("answer", 42usize);
/// beans.add_singleton_trait::<dyn Logger>("logger", Arc::new(ConsoleLogger));
///
/// let factory = beans.build().unwrap();
///
/// let number = factory.get_required::<usize>();
/// assert_eq!(*number, 42);
///
/// let logger = factory.get_required_trait::<dyn Logger>();
/// assert_eq!(logger.log("ready"), "LOG: ready");
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves the single bean of concrete type `T`.
    ///
    /// # Errors
    ///
    /// * [`BeanError::NoMatchingBean`] - no candidate provides `T`
    /// * [`BeanError::AmbiguousBean`] / [`BeanError::AmbiguousPrimary`] - no unique winner
    /// * any creation error of the selected bean
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_beans::{BeanCollection, Resolver};
    ///
    /// let mut beans = BeanCollection::new();
    /// beans.add_singleton("config", "configuration".to_string());
    ///
    /// let factory = beans.build().unwrap();
    /// let config = factory.get::<String>().unwrap();
    /// assert_eq!(&*config, "configuration");
    /// ```
    fn get<T: Any + Send + Sync>(&self) -> BeanResult<Arc<T>> {
        let injected = self.resolve_descriptor(&DependencyDescriptor::of::<T>())?;
        match injected {
            Injected::One(any) => downcast::<T>(std::any::type_name::<T>(), any),
            _ => Err(BeanError::NoMatchingBean { capability: std::any::type_name::<T>() }),
        }
    }

    /// Resolves the single bean providing trait object `T`.
    fn get_trait<T: ?Sized + Send + Sync + 'static>(&self) -> BeanResult<Arc<T>>
    where
        Arc<T>: Any,
    {
        let injected = self.resolve_descriptor(&DependencyDescriptor::of_trait::<T>())?;
        match injected {
            Injected::One(any) => downcast_trait::<T>(std::any::type_name::<T>(), &any),
            _ => Err(BeanError::NoMatchingBean { capability: std::any::type_name::<T>() }),
        }
    }

    /// Resolves `T` if a candidate exists, `None` otherwise.
    ///
    /// Ambiguity and creation failures are still errors.
    fn get_optional<T: Any + Send + Sync>(&self) -> BeanResult<Option<Arc<T>>> {
        match self.resolve_descriptor(&DependencyDescriptor::of::<T>().optional())? {
            Injected::One(any) => downcast::<T>(std::any::type_name::<T>(), any).map(Some),
            _ => Ok(None),
        }
    }

    /// Resolves trait object `T` if a candidate exists, `None` otherwise.
    fn get_optional_trait<T: ?Sized + Send + Sync + 'static>(&self) -> BeanResult<Option<Arc<T>>>
    where
        Arc<T>: Any,
    {
        match self.resolve_descriptor(&DependencyDescriptor::of_trait::<T>().optional())? {
            Injected::One(any) => downcast_trait::<T>(std::any::type_name::<T>(), &any).map(Some),
            _ => Ok(None),
        }
    }

    /// Resolves every bean of concrete type `T`, ordered by explicit order then
    /// registration order. Empty when nothing matches.
    fn get_all<T: Any + Send + Sync>(&self) -> BeanResult<Vec<Arc<T>>> {
        let injected = self.resolve_descriptor(&DependencyDescriptor::of::<T>().collection().optional())?;
        match injected {
            Injected::Many(items) => items
                .into_iter()
                .map(|(name, any)| downcast::<T>(&name, any))
                .collect(),
            _ => Ok(Vec::new()),
        }
    }

    /// Resolves every bean providing trait object `T`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_beans::{BeanCollection, BeanDefinition, BeanClass, Resolver};
    /// use std::sync::Arc;
    ///
    /// trait Plugin: Send + Sync {
    ///     fn name(&self) -> &str;
    /// }
    ///
    /// struct PluginA;
    /// impl Plugin for PluginA {
    ///     fn name(&self) -> &str { "Plugin A" }
    /// }
    ///
    /// struct PluginB;
    /// impl Plugin for PluginB {
    ///     fn name(&self) -> &str { "Plugin B" }
    /// }
    ///
    /// let a = BeanClass::builder::<PluginA>()
    ///     .default_constructor(|| PluginA)
    ///     .provides::<dyn Plugin>(|p| p)
    ///     .build();
    /// let b = BeanClass::builder::<PluginB>()
    ///     .default_constructor(|| PluginB)
    ///     .provides::<dyn Plugin>(|p| p)
    ///     .build();
    ///
    /// let mut beans = BeanCollection::new();
    /// beans.register_definition("b", BeanDefinition::of(b).order(2));
    /// beans.register_definition("a", BeanDefinition::of(a).order(1));
    ///
    /// let factory = beans.build().unwrap();
    /// let plugins = factory.get_all_trait::<dyn Plugin>().unwrap();
    /// assert_eq!(plugins.len(), 2);
    /// assert_eq!(plugins[0].name(), "Plugin A");
    /// assert_eq!(plugins[1].name(), "Plugin B");
    /// ```
    fn get_all_trait<T: ?Sized + Send + Sync + 'static>(&self) -> BeanResult<Vec<Arc<T>>>
    where
        Arc<T>: Any,
    {
        let injected = self.resolve_descriptor(&DependencyDescriptor::of_trait::<T>().collection().optional())?;
        match injected {
            Injected::Many(items) => items
                .iter()
                .map(|(name, any)| downcast_trait::<T>(name, any))
                .collect(),
            _ => Ok(Vec::new()),
        }
    }

    /// Resolves the bean named `name` and checks it is a `T`.
    ///
    /// # Errors
    ///
    /// * [`BeanError::NoSuchBean`] - no bean with this name, locally or in a parent
    /// * [`BeanError::TypeMismatch`] - the bean is not a `T`
    fn get_named<T: Any + Send + Sync>(&self, name: &str) -> BeanResult<Arc<T>> {
        let any = self.resolve_named_as(name, &Capability::of::<T>())?;
        downcast::<T>(name, any)
    }

    /// Resolves the bean named `name` as trait object `T`.
    fn get_named_trait<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> BeanResult<Arc<T>>
    where
        Arc<T>: Any,
    {
        let any = self.resolve_named_as(name, &Capability::of_trait::<T>())?;
        downcast_trait::<T>(name, &any)
    }

    /// Lazy handle for beans of concrete type `T`; nothing is resolved until it is used.
    ///
    /// Taken from a [`ResolverContext`](crate::ResolverContext) inside a
    /// constructor, it lets two beans refer to each other without a
    /// construction-time cycle.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_beans::{BeanCollection, BeanProvider, Resolver};
    /// use std::sync::Arc;
    ///
    /// struct Orders { billing: BeanProvider<Billing> }
    /// struct Billing { orders: Arc<Orders> }
    ///
    /// let mut beans = BeanCollection::new();
    /// beans.add_singleton_factory::<Orders, _>("orders", |ctx| Ok(Orders { billing: ctx.provider::<Billing>() }));
    /// beans.add_singleton_factory::<Billing, _>("billing", |ctx| Ok(Billing { orders: ctx.get::<Orders>()? }));
    /// let factory = beans.build().unwrap();
    ///
    /// let orders = factory.get_required::<Orders>();
    /// let billing = orders.billing.get().unwrap();
    /// assert!(Arc::ptr_eq(&billing.orders, &orders));
    /// ```
    fn provider<T: Any + Send + Sync>(&self) -> BeanProvider<T> {
        let (factory, requesting) = self.origin();
        BeanProvider::new(factory, Capability::of::<T>(), requesting, downcast::<T>)
    }

    /// Lazy handle for beans providing trait object `T`.
    fn provider_trait<T: ?Sized + Send + Sync + 'static>(&self) -> BeanProvider<T>
    where
        Arc<T>: Any,
    {
        let (factory, requesting) = self.origin();
        BeanProvider::new(factory, Capability::of_trait::<T>(), requesting, downcast_trait_owned::<T>)
    }

    /// Resolves a concrete bean type, panicking on failure.
    ///
    /// # Panics
    ///
    /// Panics if the bean cannot be resolved (no candidate, ambiguity, creation
    /// failure, closed container).
    fn get_required<T: Any + Send + Sync>(&self) -> Arc<T> {
        self.get::<T>()
            .unwrap_or_else(|e| panic!("Failed to resolve {}: {}", std::any::type_name::<T>(), e))
    }

    /// Resolves a trait object, panicking on failure.
    ///
    /// # Panics
    ///
    /// Panics if the bean cannot be resolved.
    fn get_required_trait<T: ?Sized + Send + Sync + 'static>(&self) -> Arc<T>
    where
        Arc<T>: Any,
    {
        self.get_trait::<T>()
            .unwrap_or_else(|e| panic!("Failed to resolve trait {}: {}", std::any::type_name::<T>(), e))
    }

    /// Resolves a named bean as `T`, panicking on failure.
    fn get_named_required<T: Any + Send + Sync>(&self, name: &str) -> Arc<T> {
        self.get_named::<T>(name)
            .unwrap_or_else(|e| panic!("Failed to resolve named {} ({}): {}", std::any::type_name::<T>(), name, e))
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
