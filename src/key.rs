//! Capability keys and bean-name helpers.

use std::any::{Any, TypeId};
use std::fmt;

/// Prefix that dereferences a factory bean.
///
/// Looking up `"&name"` returns the factory object registered under `name`
/// instead of the object it produces.
pub const FACTORY_BEAN_PREFIX: &str = "&";

/// A capability a bean can satisfy during type-based resolution.
///
/// Beans are matched against capabilities declared on their [`BeanClass`](crate::BeanClass):
/// the concrete type itself plus every trait object the class `provides`.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::Capability;
///
/// trait Greeter: Send + Sync {}
///
/// let concrete = Capability::of::<String>();
/// let service = Capability::of_trait::<dyn Greeter>();
///
/// assert!(concrete.is_type());
/// assert!(!service.is_type());
/// assert_eq!(concrete.display_name(), "alloc::string::String");
/// ```
#[derive(Clone, Copy)]
pub enum Capability {
    /// Concrete type with TypeId and name for diagnostics
    Type(TypeId, &'static str),
    /// Trait object type (`dyn Trait`) with TypeId and name for diagnostics
    Trait(TypeId, &'static str),
}

impl Capability {
    /// Capability of the concrete type `T`.
    pub fn of<T: Any>() -> Self {
        Capability::Type(TypeId::of::<T>(), std::any::type_name::<T>())
    }

    /// Capability of the trait object type `T` (for example `dyn Repository`).
    pub fn of_trait<T: ?Sized + 'static>() -> Self {
        Capability::Trait(TypeId::of::<T>(), std::any::type_name::<T>())
    }

    /// The type or trait name for display.
    pub fn display_name(&self) -> &'static str {
        match self {
            Capability::Type(_, name) | Capability::Trait(_, name) => name,
        }
    }

    /// The TypeId backing this capability.
    pub fn type_id(&self) -> TypeId {
        match self {
            Capability::Type(id, _) | Capability::Trait(id, _) => *id,
        }
    }

    /// True for concrete type capabilities.
    pub fn is_type(&self) -> bool {
        matches!(self, Capability::Type(..))
    }
}

impl PartialEq for Capability {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Capability::Type(a, _), Capability::Type(b, _)) => a == b,
            (Capability::Trait(a, _), Capability::Trait(b, _)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Capability {}

impl std::hash::Hash for Capability {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        self.type_id().hash(state);
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Type(_, name) => write!(f, "Type({})", name),
            Capability::Trait(_, name) => write!(f, "Trait({})", name),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// True if `name` asks for the factory object itself.
pub fn is_factory_dereference(name: &str) -> bool {
    name.starts_with(FACTORY_BEAN_PREFIX)
}

/// Strips every leading factory dereference prefix from `name`.
///
/// ```rust
/// use ferrous_beans::key::transformed_bean_name;
///
/// assert_eq!(transformed_bean_name("&&connection"), "connection");
/// assert_eq!(transformed_bean_name("connection"), "connection");
/// ```
pub fn transformed_bean_name(name: &str) -> &str {
    name.trim_start_matches(FACTORY_BEAN_PREFIX)
}
