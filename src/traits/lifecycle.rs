//! Lifecycle and awareness traits implemented by bean types.
//!
//! A trait only takes effect once the bean's class binds it with the matching
//! [`ClassBuilder`](crate::ClassBuilder) method (`name_aware`, `factory_aware`,
//! `initializing`, `disposable`, `factory_bean`).

use std::sync::Arc;

use crate::error::BoxError;
use crate::provider::FactoryHandle;

/// Receives the name the bean was registered under, before any initialization hook.
pub trait BeanNameAware: Send + Sync {
    fn set_bean_name(&self, name: &str);
}

/// Receives a handle to the owning container, right after the name callback.
///
/// The handle is weak: holding it does not keep the container alive.
pub trait BeanFactoryAware: Send + Sync {
    fn set_bean_factory(&self, factory: FactoryHandle);
}

/// Initialization hook run after dependencies are injected and pre-initialization
/// interceptors have run.
pub trait InitializingBean: Send + Sync {
    fn after_properties_set(&self) -> Result<(), BoxError>;
}

/// Destruction hook run when the owning container (or scope) tears the bean down.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{BeanClass, BeanCollection, BeanDefinition, BoxError, DisposableBean};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// struct Pool { closed: Arc<AtomicBool> }
///
/// impl DisposableBean for Pool {
///     fn destroy(&self) -> Result<(), BoxError> {
///         self.closed.store(true, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// let closed = Arc::new(AtomicBool::new(false));
/// let flag = closed.clone();
/// let class = BeanClass::builder::<Pool>()
///     .default_constructor(move || Pool { closed: flag.clone() })
///     .disposable()
///     .build();
///
/// let mut beans = BeanCollection::new();
/// beans.register_definition("pool", BeanDefinition::of(class));
/// let factory = beans.build().unwrap();
/// factory.close().unwrap();
/// assert!(closed.load(Ordering::SeqCst));
/// ```
pub trait DisposableBean: Send + Sync {
    fn destroy(&self) -> Result<(), BoxError>;
}

/// A bean whose purpose is to produce another object.
///
/// Looking up the bean by name returns the product; prefixing the name with
/// [`FACTORY_BEAN_PREFIX`](crate::FACTORY_BEAN_PREFIX) returns the factory itself.
/// Type-based resolution matches the product's capabilities, never the factory's.
pub trait FactoryBean: Send + Sync {
    /// Type of the produced object.
    type Object: Send + Sync + 'static;

    /// Produces the object exposed under the bean name.
    fn get_object(&self) -> Result<Arc<Self::Object>, BoxError>;

    /// When true (the default) the product of a singleton factory is cached and
    /// shared; otherwise every lookup asks the factory again.
    fn is_singleton(&self) -> bool {
        true
    }
}
