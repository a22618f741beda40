//! Modular registration: bean modules and external definition sources.

use crate::definition::BeanDefinition;
use crate::error::BeanResult;

use super::BeanCollection;

/// A module that registers beans with a [`BeanCollection`].
///
/// # Example
///
/// ```rust
/// use ferrous_beans::{BeanCollection, BeanModule, BeanCollectionExt, BeanResult, Resolver};
///
/// #[derive(Default)]
/// struct UserConfig;
///
/// struct UserService;
///
/// struct UserModule;
///
/// impl BeanModule for UserModule {
///     fn register_beans(self, beans: &mut BeanCollection) -> BeanResult<()> {
///         beans.add_singleton("userConfig", UserConfig::default());
///         beans.add_prototype_factory::<UserService, _>("userService", |ctx| {
///             let _config = ctx.get::<UserConfig>()?;
///             Ok(UserService)
///         });
///         Ok(())
///     }
/// }
///
/// # fn main() -> BeanResult<()> {
/// let factory = BeanCollection::new().add_module(UserModule)?.build()?;
/// assert!(factory.contains_bean("userService"));
/// # Ok(())
/// # }
/// ```
pub trait BeanModule {
    /// Register this module's beans with the collection.
    fn register_beans(self, beans: &mut BeanCollection) -> BeanResult<()>;
}

/// Extension trait for chaining modules by value.
pub trait BeanCollectionExt {
    /// Add a module to the collection using extension method syntax.
    fn add_module<M: BeanModule>(self, module: M) -> BeanResult<Self>
    where
        Self: Sized;
}

impl BeanCollectionExt for BeanCollection {
    fn add_module<M: BeanModule>(mut self, module: M) -> BeanResult<Self> {
        module.register_beans(&mut self)?;
        Ok(self)
    }
}

/// Extension trait for adding modules in place.
pub trait BeanCollectionModuleExt {
    /// Add a module to the collection in place.
    fn add_module_mut<M: BeanModule>(&mut self, module: M) -> BeanResult<&mut Self>;
}

impl BeanCollectionModuleExt for BeanCollection {
    fn add_module_mut<M: BeanModule>(&mut self, module: M) -> BeanResult<&mut Self> {
        module.register_beans(self)?;
        Ok(self)
    }
}

/// Front-end producing definition records (a configuration reader, a
/// component scanner, a generated registry).
///
/// Definitions and aliases are registered when the source is added; the
/// source's own `validate` runs once during `build()`.
pub trait DefinitionSource: Send + Sync {
    /// Definitions in registration order.
    fn definitions(&self) -> Vec<(String, BeanDefinition)>;

    /// Aliases as `(alias, target)` pairs.
    fn aliases(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Source-specific checks, reported with the startup validation errors.
    fn validate(&self) -> BeanResult<()> {
        Ok(())
    }

    /// Label used in logs.
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}
