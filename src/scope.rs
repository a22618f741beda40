//! Bean scopes and pluggable scope providers.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::error::{BeanResult, DestructionErrors};
use crate::internal::{DisposeBag, Map};
use crate::registration::AnyArc;

pub use crate::internal::dispose_bag::DestructionCallback;

/// Caching policy of a bean definition.
///
/// - **Singleton**: one shared instance per container, destroyed on `close()`
/// - **Prototype**: a fresh instance for every lookup, owned by the caller
/// - **Custom**: storage delegated to the [`ScopeProvider`] registered under the name
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::Scope;
///
/// assert_eq!(Scope::from("prototype"), Scope::Prototype);
/// assert_eq!(Scope::from("request"), Scope::custom("request"));
/// assert_eq!(Scope::default().name(), "singleton");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// One shared instance per container
    #[default]
    Singleton,
    /// Independent instance per lookup
    Prototype,
    /// Named custom scope backed by a registered provider
    Custom(String),
}

impl Scope {
    /// Scope by name; the reserved names map to the built-in scopes.
    pub fn custom(name: impl Into<String>) -> Self {
        let name = name.into();
        match name.as_str() {
            "singleton" => Scope::Singleton,
            "prototype" => Scope::Prototype,
            _ => Scope::Custom(name),
        }
    }

    /// Scope name as used in definitions.
    pub fn name(&self) -> &str {
        match self {
            Scope::Singleton => "singleton",
            Scope::Prototype => "prototype",
            Scope::Custom(name) => name,
        }
    }

    pub fn is_singleton(&self) -> bool {
        matches!(self, Scope::Singleton)
    }

    pub fn is_prototype(&self) -> bool {
        matches!(self, Scope::Prototype)
    }
}

impl From<&str> for Scope {
    fn from(name: &str) -> Self {
        match name {
            "" | "singleton" => Scope::Singleton,
            "prototype" => Scope::Prototype,
            other => Scope::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Storage backend for a custom scope.
///
/// The container has no knowledge of what a scope means ("request", "session",
/// "tenant"...). It asks the provider for an object and hands it a creator to call
/// on a miss. Concurrent misses for the same name should call `create` once.
/// Providers must not hold a lock shared across names while calling `create`:
/// creating one bean may resolve others from the same scope.
pub trait ScopeProvider: Send + Sync {
    /// Returns the scoped object for `name`, calling `create` when absent.
    fn get(&self, name: &str, create: &mut dyn FnMut() -> BeanResult<AnyArc>) -> BeanResult<AnyArc>;

    /// Removes the scoped object for `name`, returning it if present.
    ///
    /// Any destruction callback registered for `name` is dropped, the caller
    /// takes over responsibility for the object.
    fn remove(&self, name: &str) -> Option<AnyArc>;

    /// Registers a callback to run when the scoped object for `name` is destroyed.
    fn register_destruction_callback(&self, name: &str, callback: DestructionCallback);
}

/// In-memory [`ScopeProvider`] backed by a map.
///
/// One `MapScope` represents one live scope instance (one request, one session).
/// Call [`MapScope::clear`] when the scope ends to destroy its objects.
///
/// ```rust
/// use ferrous_beans::{BeanCollection, MapScope, Resolver, Scope, BeanDefinition};
/// use std::sync::Arc;
///
/// struct RequestState;
///
/// let request = Arc::new(MapScope::new());
/// let mut beans = BeanCollection::new();
/// beans.register_scope("request", request.clone());
/// beans.add_factory::<RequestState, _>("state", Scope::custom("request"), |_| Ok(RequestState));
/// let factory = beans.build().unwrap();
///
/// let a = factory.get_named::<RequestState>("state").unwrap();
/// let b = factory.get_named::<RequestState>("state").unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// request.clear().unwrap();
/// let c = factory.get_named::<RequestState>("state").unwrap();
/// assert!(!Arc::ptr_eq(&a, &c));
/// ```
#[derive(Default)]
pub struct MapScope {
    objects: Mutex<Map<String, Arc<OnceCell<AnyArc>>>>,
    callbacks: Mutex<DisposeBag>,
}

impl MapScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live objects in this scope.
    pub fn len(&self) -> usize {
        self.objects.lock().values().filter(|cell| cell.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ends the scope: drops every object and runs destruction callbacks in
    /// reverse registration order. All callbacks run even if some fail.
    pub fn clear(&self) -> BeanResult<()> {
        let objects = std::mem::take(&mut *self.objects.lock());
        let mut bag = std::mem::take(&mut *self.callbacks.lock());
        let errors: DestructionErrors = bag.run_all_reverse();
        drop(objects);
        errors.into_result()
    }
}

impl ScopeProvider for MapScope {
    fn get(&self, name: &str, create: &mut dyn FnMut() -> BeanResult<AnyArc>) -> BeanResult<AnyArc> {
        let cell = self.objects.lock().entry(name.to_string()).or_default().clone();
        // Map lock released: other names may be created while this one blocks
        cell.get_or_try_init(|| create()).cloned()
    }

    fn remove(&self, name: &str) -> Option<AnyArc> {
        self.callbacks.lock().forget(name);
        self.objects.lock().remove(name).and_then(|cell| cell.get().cloned())
    }

    fn register_destruction_callback(&self, name: &str, callback: DestructionCallback) {
        self.callbacks.lock().push(name, callback);
    }
}

impl fmt::Debug for MapScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapScope")
            .field("objects", &self.len())
            .finish()
    }
}
