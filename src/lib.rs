//! # ferrous-beans
//!
//! Bean resolution and lifecycle engine: named bean definitions, scopes,
//! constructor and property autowiring, circular-reference handling and
//! ordered initialization and destruction.
//!
//! ## Features
//!
//! - **Definitions**: named recipes with aliases, parent inheritance, scopes,
//!   factory methods, explicit arguments and property values
//! - **Autowiring**: by capability (concrete type or trait object) with
//!   primary and order tie-breaks, collections and keyed maps
//! - **Scopes**: singleton, prototype and pluggable custom scopes
//! - **Cycles**: singleton property cycles resolve through early references;
//!   constructor cycles fail with the full creation chain
//! - **Lifecycle**: aware callbacks, post-processors, init and destroy hooks,
//!   reverse-order shutdown with aggregated failures
//! - **Hierarchy**: child factories delegate to a parent
//! - **Thread-safe**: concurrent first requests create a singleton exactly once
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_beans::{BeanCollection, Resolver};
//! use std::sync::Arc;
//!
//! struct Database {
//!     connection_string: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let mut beans = BeanCollection::new();
//! beans.add_singleton("database", Database {
//!     connection_string: "postgres://localhost".to_string(),
//! });
//! beans.add_prototype_factory::<UserService, _>("userService", |ctx| {
//!     Ok(UserService { db: ctx.get::<Database>()? })
//! });
//!
//! let factory = beans.build().unwrap();
//! let users = factory.get_required::<UserService>();
//! assert_eq!(users.db.connection_string, "postgres://localhost");
//! factory.close().unwrap();
//! ```
//!
//! ## Classes and Definitions
//!
//! A [`BeanClass`] describes what a type needs (constructor parameters,
//! properties, lifecycle hooks) and what it provides (capabilities). A
//! [`BeanDefinition`] says how one named bean of that class is produced.
//!
//! ```rust
//! use ferrous_beans::{BeanClass, BeanCollection, BeanDefinition, DependencyDescriptor, Resolver};
//! use std::sync::Arc;
//!
//! trait Notifier: Send + Sync {
//!     fn channel(&self) -> &'static str;
//! }
//!
//! struct Email;
//! impl Notifier for Email {
//!     fn channel(&self) -> &'static str { "email" }
//! }
//!
//! struct Sms;
//! impl Notifier for Sms {
//!     fn channel(&self) -> &'static str { "sms" }
//! }
//!
//! struct Alerts { notifiers: Vec<Arc<dyn Notifier>> }
//!
//! let email = BeanClass::builder::<Email>()
//!     .default_constructor(|| Email)
//!     .provides::<dyn Notifier>(|e| e)
//!     .build();
//! let sms = BeanClass::builder::<Sms>()
//!     .default_constructor(|| Sms)
//!     .provides::<dyn Notifier>(|s| s)
//!     .build();
//! let alerts = BeanClass::builder::<Alerts>()
//!     .constructor(vec![DependencyDescriptor::of_trait::<dyn Notifier>().collection()], |args| {
//!         Ok(Alerts { notifiers: args.all_trait::<dyn Notifier>(0)? })
//!     })
//!     .build();
//!
//! let mut beans = BeanCollection::new();
//! beans.register_definition("sms", BeanDefinition::of(sms).order(2));
//! beans.register_definition("email", BeanDefinition::of(email).order(1));
//! beans.register_definition("alerts", BeanDefinition::of(alerts));
//!
//! let factory = beans.build().unwrap();
//! let channels: Vec<_> = factory
//!     .get_required::<Alerts>()
//!     .notifiers
//!     .iter()
//!     .map(|n| n.channel())
//!     .collect();
//! assert_eq!(channels, vec!["email", "sms"]);
//! ```

pub mod autowired;
pub mod class;
pub mod collection;
pub mod config;
pub mod definition;
pub mod descriptors;
pub mod error;
pub mod key;
pub mod lifecycle;
pub mod observer;
pub mod provider;
pub mod scope;
pub mod traits;
pub mod validation;

// Internal modules
mod internal;
mod registration;

pub use autowired::Autowired;
pub use class::{BeanClass, ClassBuilder, AFTER_PROPERTIES_SET, DESTROY};
pub use collection::{BeanCollection, BeanCollectionExt, BeanCollectionModuleExt, BeanModule, DefinitionSource};
pub use config::{ConfigSource, EnvironmentConfigSource, FactoryConfig};
pub use definition::{BeanDefinition, InstanceSupplier, MergedDefinition, Role, Value};
pub use descriptors::{Args, DependencyDescriptor, Injected, Multiplicity, Target};
pub use error::{BeanError, BeanResult, BoxError, DestructionErrors};
pub use key::{Capability, FACTORY_BEAN_PREFIX};
pub use lifecycle::{BeanFactoryPostProcessor, BeanPostProcessor, DestructionAwareBeanPostProcessor};
pub use observer::{BeanObserver, MetricsObserver, TracingObserver};
pub use provider::{BeanFactory, BeanProvider, FactoryHandle, ResolverContext};
pub use registration::{AnyArc, DefinitionRegistry};
pub use scope::{DestructionCallback, MapScope, Scope, ScopeProvider};
pub use traits::{
    BeanFactoryAware, BeanNameAware, DisposableBean, FactoryBean, InitializingBean, Resolver, ResolverCore,
};
pub use validation::{ValidationResult, ValidationWarning};
