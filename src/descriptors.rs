//! Dependency descriptors and resolved injection values.

use std::any::Any;
use std::sync::Arc;

use crate::error::{BeanError, BoxError};
use crate::key::Capability;
use crate::provider::{BeanProvider, ResolverContext};
use crate::registration::AnyArc;
use crate::traits::Resolver;

/// What a dependency descriptor asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Any bean satisfying the capability
    Capability(Capability),
    /// The bean registered under a name (or alias), optionally viewed as a capability
    Named {
        /// Bean name, `&name` for the factory itself
        name: String,
        /// Capability to cast the bean to, raw instance if absent
        capability: Option<Capability>,
    },
}

/// How many matches an injection point takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Multiplicity {
    /// Exactly one bean (tie-breaks apply)
    #[default]
    Single,
    /// Every match as an ordered sequence
    Collection,
    /// Every match keyed by bean name
    Map,
}

/// A typed request for a dependency.
///
/// Produced by the [`BeanClass`](crate::BeanClass) builder for constructor
/// parameters, factory-method parameters and autowired properties.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{DependencyDescriptor, Multiplicity};
///
/// trait Plugin: Send + Sync {}
///
/// let plugins = DependencyDescriptor::of_trait::<dyn Plugin>().collection();
/// assert_eq!(plugins.multiplicity, Multiplicity::Collection);
///
/// let cache = DependencyDescriptor::of::<String>().optional().with_name("cacheName");
/// assert!(!cache.required);
/// assert_eq!(cache.injection_name.as_deref(), Some("cacheName"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyDescriptor {
    /// What is requested
    pub target: Target,
    /// Whether absence is an error
    pub required: bool,
    /// Single bean, ordered collection or keyed map
    pub multiplicity: Multiplicity,
    /// Declared name of the injection point, used as a tie-break
    pub injection_name: Option<String>,
}

impl DependencyDescriptor {
    /// Required single bean of concrete type `T`.
    pub fn of<T: Any>() -> Self {
        Self::capability(Capability::of::<T>())
    }

    /// Required single bean providing trait object `T`.
    pub fn of_trait<T: ?Sized + 'static>() -> Self {
        Self::capability(Capability::of_trait::<T>())
    }

    /// Required single bean satisfying `capability`.
    pub fn capability(capability: Capability) -> Self {
        Self {
            target: Target::Capability(capability),
            required: true,
            multiplicity: Multiplicity::Single,
            injection_name: None,
        }
    }

    /// Required bean by name, injected as the raw instance.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            target: Target::Named { name: name.into(), capability: None },
            required: true,
            multiplicity: Multiplicity::Single,
            injection_name: None,
        }
    }

    /// Required bean by name, cast to `capability`.
    pub fn named_as(name: impl Into<String>, capability: Capability) -> Self {
        Self {
            target: Target::Named { name: name.into(), capability: Some(capability) },
            ..Self::named(String::new())
        }
    }

    /// Absence resolves to nothing instead of failing.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Resolve every match as an ordered collection.
    pub fn collection(mut self) -> Self {
        self.multiplicity = Multiplicity::Collection;
        self
    }

    /// Resolve every match keyed by bean name.
    pub fn map(mut self) -> Self {
        self.multiplicity = Multiplicity::Map;
        self
    }

    /// Declared injection-point name (parameter or field name).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.injection_name = Some(name.into());
        self
    }

    /// The capability a resolved value is cast to, if any.
    pub fn expected_capability(&self) -> Option<Capability> {
        match &self.target {
            Target::Capability(c) => Some(*c),
            Target::Named { capability, .. } => *capability,
        }
    }

    /// True for collection and map injection points.
    pub fn is_multiple(&self) -> bool {
        self.multiplicity != Multiplicity::Single
    }

    pub(crate) fn describe(&self) -> &'static str {
        match &self.target {
            Target::Capability(c) => c.display_name(),
            Target::Named { capability: Some(c), .. } => c.display_name(),
            Target::Named { .. } => "named bean",
        }
    }
}

/// A resolved dependency value.
///
/// Single values hold the bean already cast to the requested capability:
/// `Arc<T>` for concrete types and `Arc<Arc<dyn Trait>>` for trait objects,
/// both erased to [`AnyArc`]. The typed accessors undo that erasure.
#[derive(Clone, Default)]
pub enum Injected {
    /// Optional dependency that is absent
    #[default]
    None,
    /// A single bean
    One(AnyArc),
    /// Every match, in resolution order, paired with the bean name
    Many(Vec<(String, AnyArc)>),
}

fn mismatch<T: ?Sized>() -> BoxError {
    Box::new(BeanError::TypeMismatch {
        name: "injection point".to_string(),
        expected: std::any::type_name::<T>(),
    })
}

fn downcast_one<T: Any + Send + Sync>(value: &AnyArc) -> Result<Arc<T>, BoxError> {
    value.clone().downcast::<T>().map_err(|_| mismatch::<T>())
}

fn downcast_trait<T: ?Sized + 'static>(value: &AnyArc) -> Result<Arc<T>, BoxError>
where
    Arc<T>: Any,
{
    value
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or_else(|| mismatch::<T>())
}

impl Injected {
    /// Required concrete bean.
    pub fn get<T: Any + Send + Sync>(&self) -> Result<Arc<T>, BoxError> {
        self.optional::<T>()?.ok_or_else(|| mismatch::<T>())
    }

    /// Required trait object.
    pub fn get_trait<T: ?Sized + 'static>(&self) -> Result<Arc<T>, BoxError>
    where
        Arc<T>: Any,
    {
        self.optional_trait::<T>()?.ok_or_else(|| mismatch::<T>())
    }

    /// Optional concrete bean.
    pub fn optional<T: Any + Send + Sync>(&self) -> Result<Option<Arc<T>>, BoxError> {
        match self {
            Injected::None => Ok(None),
            Injected::One(v) => downcast_one::<T>(v).map(Some),
            Injected::Many(_) => Err(mismatch::<T>()),
        }
    }

    /// Optional trait object.
    pub fn optional_trait<T: ?Sized + 'static>(&self) -> Result<Option<Arc<T>>, BoxError>
    where
        Arc<T>: Any,
    {
        match self {
            Injected::None => Ok(None),
            Injected::One(v) => downcast_trait::<T>(v).map(Some),
            Injected::Many(_) => Err(mismatch::<T>()),
        }
    }

    /// Every concrete bean of a collection injection point.
    pub fn all<T: Any + Send + Sync>(&self) -> Result<Vec<Arc<T>>, BoxError> {
        Ok(self.keyed::<T>()?.into_iter().map(|(_, v)| v).collect())
    }

    /// Every trait object of a collection injection point.
    pub fn all_trait<T: ?Sized + 'static>(&self) -> Result<Vec<Arc<T>>, BoxError>
    where
        Arc<T>: Any,
    {
        Ok(self.keyed_trait::<T>()?.into_iter().map(|(_, v)| v).collect())
    }

    /// Every concrete bean paired with its name, in resolution order.
    pub fn keyed<T: Any + Send + Sync>(&self) -> Result<Vec<(String, Arc<T>)>, BoxError> {
        match self {
            Injected::None => Ok(Vec::new()),
            Injected::One(v) => Ok(vec![(String::new(), downcast_one::<T>(v)?)]),
            Injected::Many(items) => items
                .iter()
                .map(|(name, v)| downcast_one::<T>(v).map(|arc| (name.clone(), arc)))
                .collect(),
        }
    }

    /// Every trait object paired with its bean name, in resolution order.
    pub fn keyed_trait<T: ?Sized + 'static>(&self) -> Result<Vec<(String, Arc<T>)>, BoxError>
    where
        Arc<T>: Any,
    {
        match self {
            Injected::None => Ok(Vec::new()),
            Injected::One(v) => Ok(vec![(String::new(), downcast_trait::<T>(v)?)]),
            Injected::Many(items) => items
                .iter()
                .map(|(name, v)| downcast_trait::<T>(v).map(|arc| (name.clone(), arc)))
                .collect(),
        }
    }

    /// The raw single value.
    pub fn raw(&self) -> Option<&AnyArc> {
        match self {
            Injected::One(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Injected::None)
    }
}

impl std::fmt::Debug for Injected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Injected::None => f.write_str("None"),
            Injected::One(_) => f.write_str("One(..)"),
            Injected::Many(items) => {
                f.debug_list().entries(items.iter().map(|(n, _)| n)).finish()
            }
        }
    }
}

/// Resolved arguments for a constructor or factory method.
///
/// Arguments are positional, matching the declared parameter descriptors.
pub struct Args<'a> {
    values: Vec<Injected>,
    context: &'a ResolverContext<'a>,
}

impl<'a> Args<'a> {
    pub(crate) fn new(values: Vec<Injected>, context: &'a ResolverContext<'a>) -> Self {
        Self { values, context }
    }

    fn at(&self, index: usize) -> Result<&Injected, BoxError> {
        self.values.get(index).ok_or_else(|| {
            format!("argument index {} out of range ({} arguments)", index, self.values.len()).into()
        })
    }

    /// Required concrete argument.
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>, BoxError> {
        self.at(index)?.get::<T>()
    }

    /// Required trait-object argument.
    pub fn get_trait<T: ?Sized + 'static>(&self, index: usize) -> Result<Arc<T>, BoxError>
    where
        Arc<T>: Any,
    {
        self.at(index)?.get_trait::<T>()
    }

    /// Optional concrete argument.
    pub fn optional<T: Any + Send + Sync>(&self, index: usize) -> Result<Option<Arc<T>>, BoxError> {
        self.at(index)?.optional::<T>()
    }

    /// Optional trait-object argument.
    pub fn optional_trait<T: ?Sized + 'static>(&self, index: usize) -> Result<Option<Arc<T>>, BoxError>
    where
        Arc<T>: Any,
    {
        self.at(index)?.optional_trait::<T>()
    }

    /// Collection argument of concrete beans.
    pub fn all<T: Any + Send + Sync>(&self, index: usize) -> Result<Vec<Arc<T>>, BoxError> {
        self.at(index)?.all::<T>()
    }

    /// Collection argument of trait objects.
    pub fn all_trait<T: ?Sized + 'static>(&self, index: usize) -> Result<Vec<Arc<T>>, BoxError>
    where
        Arc<T>: Any,
    {
        self.at(index)?.all_trait::<T>()
    }

    /// Keyed (map) argument of concrete beans.
    pub fn keyed<T: Any + Send + Sync>(&self, index: usize) -> Result<Vec<(String, Arc<T>)>, BoxError> {
        self.at(index)?.keyed::<T>()
    }

    /// Keyed (map) argument of trait objects.
    pub fn keyed_trait<T: ?Sized + 'static>(&self, index: usize) -> Result<Vec<(String, Arc<T>)>, BoxError>
    where
        Arc<T>: Any,
    {
        self.at(index)?.keyed_trait::<T>()
    }

    /// Raw injected value at `index`.
    pub fn injected(&self, index: usize) -> Option<&Injected> {
        self.values.get(index)
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Lazy provider for `T`, resolving on behalf of the bean under construction.
    pub fn provider<T: Any + Send + Sync>(&self) -> BeanProvider<T> {
        self.context.provider::<T>()
    }

    /// Lazy provider for trait object `T`.
    pub fn provider_trait<T: ?Sized + Send + Sync + 'static>(&self) -> BeanProvider<T>
    where
        Arc<T>: Any,
    {
        self.context.provider_trait::<T>()
    }

    /// Resolver for dependencies not declared as parameters.
    pub fn context(&self) -> &ResolverContext<'a> {
        self.context
    }
}
