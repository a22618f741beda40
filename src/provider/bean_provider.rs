//! Deferred access to the beans of one capability.

use std::fmt;
use std::sync::Arc;

use crate::definition::Value;
use crate::error::{BeanError, BeanResult};
use crate::key::Capability;
use crate::registration::AnyArc;

use super::{BeanFactory, FactoryHandle};

type Cast<T> = fn(&str, AnyArc) -> BeanResult<Arc<T>>;

/// Lazily resolving handle for beans providing `T`.
///
/// Obtained from [`Resolver::provider`](crate::Resolver::provider) or
/// [`Resolver::provider_trait`](crate::Resolver::provider_trait). Nothing is
/// resolved until one of its methods is called, so a constructor can take a
/// provider for a bean that itself depends on the bean being built.
///
/// The provider holds a weak handle: it never keeps the container alive, and
/// every lookup fails with [`BeanError::ContainerClosed`] once the container is
/// closed or dropped.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{BeanCollection, Resolver};
///
/// let mut beans = BeanCollection::new();
/// beans.add_singleton("port", 8080u16);
/// let factory = beans.build().unwrap();
///
/// let ports = factory.provider::<u16>();
/// assert_eq!(*ports.get().unwrap(), 8080);
/// assert!(factory.provider::<u32>().get_if_available().unwrap().is_none());
/// ```
pub struct BeanProvider<T: ?Sized> {
    factory: FactoryHandle,
    capability: Capability,
    requesting: Option<String>,
    cast: Cast<T>,
}

impl<T: ?Sized> BeanProvider<T> {
    pub(crate) fn new(factory: FactoryHandle, capability: Capability, requesting: Option<&str>, cast: Cast<T>) -> Self {
        Self {
            factory,
            capability,
            requesting: requesting.map(str::to_string),
            cast,
        }
    }

    /// The capability this provider resolves.
    pub fn capability(&self) -> Capability {
        self.capability
    }

    fn factory(&self) -> BeanResult<BeanFactory> {
        self.factory.upgrade().ok_or(BeanError::ContainerClosed)
    }

    fn single(&self) -> BeanResult<Option<Arc<T>>> {
        let factory = self.factory()?;
        factory.ensure_open()?;
        match factory.resolve_single(&self.capability, None, self.requesting.as_deref())? {
            Some((name, object)) => (self.cast)(&name, object).map(Some),
            None => Ok(None),
        }
    }

    /// The single matching bean, selected like a type-based lookup.
    ///
    /// # Errors
    ///
    /// * [`BeanError::NoMatchingBean`] - nothing provides the capability
    /// * [`BeanError::AmbiguousBean`] / [`BeanError::AmbiguousPrimary`] - no unique winner
    pub fn get(&self) -> BeanResult<Arc<T>> {
        self.single()?.ok_or_else(|| BeanError::NoMatchingBean { capability: self.capability.display_name() })
    }

    /// The single matching bean, or `None` when nothing matches.
    ///
    /// Ambiguity and creation failures are still errors.
    pub fn get_if_available(&self) -> BeanResult<Option<Arc<T>>> {
        self.single()
    }

    /// The single matching bean, or `None` when nothing matches or no unique
    /// winner exists. Creation failures are still errors.
    pub fn get_if_unique(&self) -> BeanResult<Option<Arc<T>>> {
        match self.single() {
            Err(BeanError::AmbiguousBean { .. }) | Err(BeanError::AmbiguousPrimary { .. }) => Ok(None),
            other => other,
        }
    }

    /// Creates the single matching prototype with explicit arguments.
    pub fn get_with_args(&self, args: Vec<Value>) -> BeanResult<Arc<T>> {
        let object = self.factory()?.create_with_args_as(&self.capability, args)?;
        (self.cast)(self.capability.display_name(), object)
    }

    /// Every matching bean in collection order: explicit order first, then
    /// registration order, then ancestors' beans.
    pub fn iter(&self) -> BeanResult<std::vec::IntoIter<Arc<T>>> {
        let factory = self.factory()?;
        factory.ensure_open()?;
        let all = factory.resolve_all(&self.capability, self.requesting.as_deref())?;
        let beans = all
            .into_iter()
            .map(|(name, object)| (self.cast)(&name, object))
            .collect::<BeanResult<Vec<_>>>()?;
        Ok(beans.into_iter())
    }
}

impl<T: ?Sized> Clone for BeanProvider<T> {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
            capability: self.capability,
            requesting: self.requesting.clone(),
            cast: self.cast,
        }
    }
}

impl<T: ?Sized> fmt::Debug for BeanProvider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanProvider")
            .field("capability", &self.capability.display_name())
            .field("requesting", &self.requesting)
            .finish()
    }
}
