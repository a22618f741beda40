//! Resolver context handed to constructors, factory methods and suppliers.

use crate::descriptors::{DependencyDescriptor, Injected};
use crate::error::BeanResult;
use crate::key::Capability;
use crate::registration::AnyArc;
use crate::traits::ResolverCore;

use super::{BeanFactory, FactoryHandle};

/// Context passed to construction code for resolving dependencies.
///
/// It knows which bean is being built: beans resolved through it are recorded
/// as dependencies of that bean (so they are destroyed after it) and the bean
/// is never offered to itself as an autowire candidate.
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
/// beans.add_factory::<UserService, _>("users", Scope::Prototype, |ctx| {
///     assert_eq!(ctx.requesting_bean(), Some("users"));
///     Ok(UserService { db: ctx.get::<Database>()? })
/// });
///
/// let factory = beans.build().unwrap();
/// let users = factory.get_named::<UserService>("users").unwrap();
/// assert_eq!(users.db.url, "postgres://localhost");
/// ```
pub struct ResolverContext<'a> {
    factory: &'a BeanFactory,
    requesting: Option<&'a str>,
}

impl<'a> ResolverContext<'a> {
    pub(crate) fn new(factory: &'a BeanFactory, requesting: Option<&'a str>) -> Self {
        Self { factory, requesting }
    }

    /// The container doing the resolution.
    pub fn factory(&self) -> &'a BeanFactory {
        self.factory
    }

    /// Name of the bean under construction, if any.
    pub fn requesting_bean(&self) -> Option<&'a str> {
        self.requesting
    }
}

impl<'a> ResolverCore for ResolverContext<'a> {
    fn resolve_named(&self, name: &str) -> BeanResult<AnyArc> {
        self.factory.lookup_bean(name, self.requesting)
    }

    fn resolve_named_as(&self, name: &str, capability: &Capability) -> BeanResult<AnyArc> {
        self.factory.lookup_bean_as(name, capability, self.requesting)
    }

    fn resolve_descriptor(&self, descriptor: &DependencyDescriptor) -> BeanResult<Injected> {
        self.factory.resolve_dependency(descriptor, self.requesting)
    }

    fn origin(&self) -> (FactoryHandle, Option<&str>) {
        (self.factory.handle(), self.requesting)
    }
}
