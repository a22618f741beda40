//! Core traits for the bean container.

mod lifecycle;
mod resolver;

pub use lifecycle::{BeanFactoryAware, BeanNameAware, DisposableBean, FactoryBean, InitializingBean};
pub use resolver::{Resolver, ResolverCore};
