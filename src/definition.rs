//! Bean definitions: the declarative recipe for producing a bean.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::class::BeanClass;
use crate::descriptors::DependencyDescriptor;
use crate::error::{BeanError, BeanResult, BoxError};
use crate::provider::ResolverContext;
use crate::registration::{AnyArc, DefinitionRegistry};
use crate::scope::Scope;

/// Construction closure that bypasses constructors and factory methods.
pub type InstanceSupplier = Arc<dyn Fn(&ResolverContext<'_>) -> Result<AnyArc, BoxError> + Send + Sync>;

/// Informational classification of a definition; it never affects resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    /// A component of the application itself
    #[default]
    Application,
    /// Supporting part of some larger configuration
    Support,
    /// Purely internal container infrastructure
    Infrastructure,
}

/// A constructor argument or property value.
#[derive(Clone)]
pub enum Value {
    /// A literal, already in the form the injection point expects
    Literal(AnyArc),
    /// Reference to another bean by name
    Ref(String),
    /// A nested dependency descriptor resolved at creation time
    Descriptor(DependencyDescriptor),
}

impl Value {
    /// Literal of concrete type `T`.
    pub fn literal<T: Send + Sync + 'static>(value: T) -> Self {
        Value::Literal(Arc::new(value))
    }

    /// Literal trait object, stored the way trait-typed injection points expect.
    pub fn trait_object<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Value::Literal(Arc::new(value))
    }

    /// Reference to the bean named `name`.
    pub fn bean_ref(name: impl Into<String>) -> Self {
        Value::Ref(name.into())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Literal(_) => f.write_str("Literal(..)"),
            Value::Ref(name) => f.debug_tuple("Ref").field(name).finish(),
            Value::Descriptor(d) => f.debug_tuple("Descriptor").field(d).finish(),
        }
    }
}

/// Declarative description of how to build one named bean.
///
/// Optional attributes left unset are inherited from the parent definition
/// (`parent_name`) when one is named; `primary`, `autowire_candidate`, `role`
/// and `is_abstract` always belong to the definition itself.
///
/// Definitions are plain data: mutate them freely before the container is
/// built (directly, or from a [`BeanFactoryPostProcessor`](crate::BeanFactoryPostProcessor)).
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{BeanClass, BeanDefinition, Scope, Value};
///
/// struct Connection;
///
/// let class = BeanClass::builder::<Connection>()
///     .default_constructor(|| Connection)
///     .build();
///
/// let template = BeanDefinition::new().abstract_definition(true).scope(Scope::Prototype);
/// let child = BeanDefinition::of(class)
///     .parent("template")
///     .primary(true)
///     .order(10)
///     .property("url", Value::literal("postgres://localhost".to_string()));
///
/// assert!(template.is_abstract);
/// assert_eq!(child.parent_name.as_deref(), Some("template"));
/// assert_eq!(child.scope, None);
/// ```
#[derive(Clone)]
pub struct BeanDefinition {
    /// Definition to inherit unset attributes from
    pub parent_name: Option<String>,
    /// Class of the constructed object (or declaring class of a static factory method)
    pub class: Option<Arc<BeanClass>>,
    /// Scope, `None` inherits or defaults to singleton
    pub scope: Option<Scope>,
    /// Lazy initialization, `None` inherits or defaults to eager
    pub lazy_init: Option<bool>,
    /// Beans that must be fully initialized before this one
    pub depends_on: Vec<String>,
    /// Participates in type-based resolution
    pub autowire_candidate: bool,
    /// Preferred among several type matches
    pub primary: bool,
    /// Explicit ordering metadata, lower first
    pub order: Option<i32>,
    /// Explicit constructor arguments by parameter index
    pub constructor_arguments: BTreeMap<usize, Value>,
    /// Property values, in declaration order
    pub property_values: Vec<(String, Value)>,
    /// Bean on which the factory method is invoked
    pub factory_bean_name: Option<String>,
    /// Factory method producing the bean
    pub factory_method_name: Option<String>,
    /// Named init method of the class
    pub init_method_name: Option<String>,
    /// Named destroy method of the class
    pub destroy_method_name: Option<String>,
    /// Informational role
    pub role: Role,
    /// Template-only definition, never instantiated
    pub is_abstract: bool,
    /// Human readable description
    pub description: Option<String>,
    /// Construction closure used instead of constructors
    pub instance_supplier: Option<InstanceSupplier>,
}

impl Default for BeanDefinition {
    fn default() -> Self {
        Self {
            parent_name: None,
            class: None,
            scope: None,
            lazy_init: None,
            depends_on: Vec::new(),
            autowire_candidate: true,
            primary: false,
            order: None,
            constructor_arguments: BTreeMap::new(),
            property_values: Vec::new(),
            factory_bean_name: None,
            factory_method_name: None,
            init_method_name: None,
            destroy_method_name: None,
            role: Role::Application,
            is_abstract: false,
            description: None,
            instance_supplier: None,
        }
    }
}

impl BeanDefinition {
    /// Empty definition (typically a template or a child of a parent definition).
    pub fn new() -> Self {
        Self::default()
    }

    /// Definition constructing instances of `class`.
    pub fn of(class: Arc<BeanClass>) -> Self {
        Self { class: Some(class), ..Self::default() }
    }

    /// Definition produced by `supplier`; `class` types the result for
    /// capability matching.
    pub fn supplied<F>(class: Arc<BeanClass>, supplier: F) -> Self
    where
        F: Fn(&ResolverContext<'_>) -> Result<AnyArc, BoxError> + Send + Sync + 'static,
    {
        Self {
            class: Some(class),
            instance_supplier: Some(Arc::new(supplier)),
            ..Self::default()
        }
    }

    pub fn parent(mut self, name: impl Into<String>) -> Self {
        self.parent_name = Some(name.into());
        self
    }

    pub fn class(mut self, class: Arc<BeanClass>) -> Self {
        self.class = Some(class);
        self
    }

    pub fn scope(mut self, scope: impl Into<Scope>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy_init = Some(lazy);
        self
    }

    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    pub fn autowire_candidate(mut self, candidate: bool) -> Self {
        self.autowire_candidate = candidate;
        self
    }

    pub fn primary(mut self, primary: bool) -> Self {
        self.primary = primary;
        self
    }

    pub fn order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    /// Explicit constructor argument for parameter `index`.
    pub fn constructor_arg(mut self, index: usize, value: Value) -> Self {
        self.constructor_arguments.insert(index, value);
        self
    }

    /// Property value; a later value for the same property replaces the earlier one.
    pub fn property(mut self, name: impl Into<String>, value: Value) -> Self {
        let name = name.into();
        self.property_values.retain(|(n, _)| *n != name);
        self.property_values.push((name, value));
        self
    }

    /// Static factory method on the definition's class.
    pub fn factory_method(mut self, method: impl Into<String>) -> Self {
        self.factory_method_name = Some(method.into());
        self
    }

    /// Factory method invoked on another bean.
    pub fn factory_bean_method(mut self, bean: impl Into<String>, method: impl Into<String>) -> Self {
        self.factory_bean_name = Some(bean.into());
        self.factory_method_name = Some(method.into());
        self
    }

    pub fn init_method(mut self, name: impl Into<String>) -> Self {
        self.init_method_name = Some(name.into());
        self
    }

    pub fn destroy_method(mut self, name: impl Into<String>) -> Self {
        self.destroy_method_name = Some(name.into());
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn abstract_definition(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn supplier<F>(mut self, supplier: F) -> Self
    where
        F: Fn(&ResolverContext<'_>) -> Result<AnyArc, BoxError> + Send + Sync + 'static,
    {
        self.instance_supplier = Some(Arc::new(supplier));
        self
    }

    /// True if the bean is produced by a factory method.
    pub fn has_factory_method(&self) -> bool {
        self.factory_method_name.is_some()
    }

    /// Copies every attribute set on `child` over this definition.
    fn override_from(&mut self, child: &BeanDefinition) {
        if child.class.is_some() {
            self.class = child.class.clone();
        }
        if child.scope.is_some() {
            self.scope = child.scope.clone();
        }
        if child.lazy_init.is_some() {
            self.lazy_init = child.lazy_init;
        }
        if !child.depends_on.is_empty() {
            self.depends_on = child.depends_on.clone();
        }
        if child.order.is_some() {
            self.order = child.order;
        }
        for (index, value) in &child.constructor_arguments {
            self.constructor_arguments.insert(*index, value.clone());
        }
        for (name, value) in &child.property_values {
            self.property_values.retain(|(n, _)| n != name);
            self.property_values.push((name.clone(), value.clone()));
        }
        if child.factory_bean_name.is_some() {
            self.factory_bean_name = child.factory_bean_name.clone();
        }
        if child.factory_method_name.is_some() {
            self.factory_method_name = child.factory_method_name.clone();
        }
        if child.init_method_name.is_some() {
            self.init_method_name = child.init_method_name.clone();
        }
        if child.destroy_method_name.is_some() {
            self.destroy_method_name = child.destroy_method_name.clone();
        }
        if child.description.is_some() {
            self.description = child.description.clone();
        }
        if child.instance_supplier.is_some() {
            self.instance_supplier = child.instance_supplier.clone();
        }
        self.primary = child.primary;
        self.autowire_candidate = child.autowire_candidate;
        self.role = child.role;
        self.is_abstract = child.is_abstract;
        self.parent_name = None;
    }
}

impl fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("parent_name", &self.parent_name)
            .field("class", &self.class.as_ref().map(|c| c.type_name()))
            .field("scope", &self.scope)
            .field("lazy_init", &self.lazy_init)
            .field("depends_on", &self.depends_on)
            .field("primary", &self.primary)
            .field("order", &self.order)
            .field("factory_bean_name", &self.factory_bean_name)
            .field("factory_method_name", &self.factory_method_name)
            .field("is_abstract", &self.is_abstract)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// A definition with its parent chain folded in, as used for creation.
#[derive(Clone, Debug)]
pub struct MergedDefinition {
    pub(crate) name: String,
    pub(crate) definition: BeanDefinition,
    pub(crate) scope: Scope,
    pub(crate) lazy_init: bool,
    /// Class of the object the definition constructs (possibly a factory bean).
    pub(crate) bean_class: Option<Arc<BeanClass>>,
}

impl MergedDefinition {
    /// Canonical bean name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Effective definition after inheritance.
    pub fn definition(&self) -> &BeanDefinition {
        &self.definition
    }

    /// Effective scope.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy_init
    }

    pub fn is_abstract(&self) -> bool {
        self.definition.is_abstract
    }

    /// Class of the constructed object; for factory beans this is the factory's class.
    pub fn bean_class(&self) -> Option<&Arc<BeanClass>> {
        self.bean_class.as_ref()
    }

    /// Class of the object exposed under the plain bean name.
    pub fn object_class(&self) -> Option<&Arc<BeanClass>> {
        match &self.bean_class {
            Some(class) => Some(class.product_class().unwrap_or(class)),
            None => None,
        }
    }

    pub(crate) fn is_factory_bean(&self) -> bool {
        self.bean_class.as_ref().map(|c| c.is_factory_bean()).unwrap_or(false)
    }
}

/// Folds the parent chain of `name` into one definition.
///
/// The produced class of factory-method beans is not known here; it is filled
/// in by [`resolve_bean_classes`] once every definition is merged.
pub(crate) fn merge(registry: &DefinitionRegistry, name: &str) -> BeanResult<MergedDefinition> {
    let mut chain: Vec<&BeanDefinition> = Vec::new();
    let mut visited: Vec<String> = vec![name.to_string()];
    let mut current = registry.get(name)?;
    chain.push(current);
    while let Some(parent) = &current.parent_name {
        let canonical = registry.canonical_name(parent)?;
        if visited.contains(&canonical) {
            visited.push(canonical);
            return Err(BeanError::ParentCycle(visited));
        }
        current = registry.get(&canonical).map_err(|_| BeanError::InvalidDefinition {
            name: name.to_string(),
            reason: format!("parent definition '{}' not found", parent),
        })?;
        visited.push(canonical);
        chain.push(current);
    }

    let mut merged = BeanDefinition::default();
    for definition in chain.iter().rev() {
        merged.override_from(definition);
    }

    Ok(MergedDefinition {
        name: name.to_string(),
        scope: merged.scope.clone().unwrap_or_default(),
        lazy_init: merged.lazy_init.unwrap_or(false),
        bean_class: None,
        definition: merged,
    })
}

/// Determines the class of the constructed object for every merged definition.
///
/// Factory bean references go through the registry's aliases and fall back to
/// `parent`. Returns the factory-method beans whose class stays unknown.
pub(crate) fn resolve_bean_classes(
    merged: &mut crate::internal::Map<String, MergedDefinition>,
    registry: &DefinitionRegistry,
    parent: Option<&crate::provider::BeanFactory>,
) -> Vec<String> {
    for m in merged.values_mut() {
        m.bean_class = match m.definition.factory_method_name {
            None => m.definition.class.clone(),
            Some(_) => None,
        };
    }

    // A factory bean may itself come from a factory method: repeat until settled
    for _ in 0..merged.len() {
        let known: Vec<(String, Option<Arc<BeanClass>>)> = merged
            .iter()
            .map(|(name, m)| (name.clone(), m.bean_class.clone()))
            .collect();
        let class_of = |bean: &str| -> Option<Arc<BeanClass>> {
            let canonical = registry
                .canonical_name(crate::key::transformed_bean_name(bean))
                .ok()?;
            match known.iter().find(|(n, _)| *n == canonical) {
                Some((_, class)) => class.as_ref().map(|class| {
                    if crate::key::is_factory_dereference(bean) {
                        class.clone()
                    } else {
                        class.product_class().unwrap_or(class).clone()
                    }
                }),
                None => parent.and_then(|p| p.class_of(bean)),
            }
        };

        let mut changed = false;
        for m in merged.values_mut() {
            if m.bean_class.is_some() {
                continue;
            }
            let Some(method) = &m.definition.factory_method_name else {
                continue;
            };
            let declaring = match &m.definition.factory_bean_name {
                Some(bean) => class_of(bean),
                None => m.definition.class.clone(),
            };
            let instance = m.definition.factory_bean_name.is_some();
            let resolved = declaring.and_then(|class| {
                let mut methods = if instance {
                    class.instance_factories_named(method).collect::<Vec<_>>()
                } else {
                    class.static_factories_named(method).collect::<Vec<_>>()
                };
                methods.sort_by_key(|e| std::cmp::Reverse(e.arity()));
                methods.first().and_then(|e| e.returns.clone())
            });
            if resolved.is_some() {
                m.bean_class = resolved;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let mut unresolved: Vec<String> = merged
        .iter()
        .filter(|(_, m)| m.bean_class.is_none() && m.definition.factory_method_name.is_some() && !m.is_abstract())
        .map(|(name, _)| name.clone())
        .collect();
    unresolved.sort();
    unresolved
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Thing;

    #[test]
    fn child_overrides_parent_attributes() {
        let mut registry = DefinitionRegistry::new();
        registry.register(
            "base",
            BeanDefinition::new()
                .abstract_definition(true)
                .scope(Scope::Prototype)
                .lazy(true)
                .property("a", Value::literal(1u8))
                .property("b", Value::literal(2u8))
                .primary(true),
        );
        registry.register(
            "child",
            BeanDefinition::new()
                .parent("base")
                .property("b", Value::literal(3u8))
                .lazy(false),
        );

        let merged = merge(&registry, "child").unwrap();
        assert_eq!(merged.scope, Scope::Prototype);
        assert!(!merged.lazy_init);
        assert!(!merged.is_abstract());
        assert!(!merged.definition.primary);
        let names: Vec<_> = merged.definition.property_values.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn parent_cycle_is_detected() {
        let mut registry = DefinitionRegistry::new();
        registry.register("a", BeanDefinition::new().parent("b"));
        registry.register("b", BeanDefinition::new().parent("a"));
        assert!(matches!(merge(&registry, "a"), Err(BeanError::ParentCycle(chain)) if chain == ["a", "b", "a"]));
    }

    #[test]
    fn missing_parent_is_invalid() {
        let mut registry = DefinitionRegistry::new();
        registry.register("a", BeanDefinition::new().parent("ghost"));
        assert!(matches!(merge(&registry, "a"), Err(BeanError::InvalidDefinition { .. })));
    }

    #[test]
    fn factory_method_resolves_product_class() {
        let config = BeanClass::builder::<Thing>()
            .default_constructor(|| Thing)
            .factory_method::<u64, _>("port", vec![], |_, _| Ok(8080))
            .build();
        let mut registry = DefinitionRegistry::new();
        registry.register("config", BeanDefinition::of(config));
        registry.register("port", BeanDefinition::new().factory_bean_method("config", "port"));

        let mut merged = crate::internal::Map::default();
        for name in ["config", "port"] {
            merged.insert(name.to_string(), merge(&registry, name).unwrap());
        }
        assert!(resolve_bean_classes(&mut merged, &registry, None).is_empty());
        let port = merged.get("port").unwrap();
        assert_eq!(port.bean_class().unwrap().type_name(), "u64");
    }

    #[test]
    fn factory_bean_named_by_alias_resolves_product_class() {
        let config = BeanClass::builder::<Thing>()
            .default_constructor(|| Thing)
            .factory_method::<u64, _>("port", vec![], |_, _| Ok(8080))
            .build();
        let mut registry = DefinitionRegistry::new();
        registry.register("config", BeanDefinition::of(config));
        registry.register_alias("settings", "config").unwrap();
        registry.register("port", BeanDefinition::new().factory_bean_method("settings", "port"));
        registry.register("ghost", BeanDefinition::new().factory_bean_method("missing", "port"));

        let mut merged = crate::internal::Map::default();
        for name in ["config", "port", "ghost"] {
            merged.insert(name.to_string(), merge(&registry, name).unwrap());
        }
        let unresolved = resolve_bean_classes(&mut merged, &registry, None);
        assert_eq!(merged.get("port").unwrap().bean_class().unwrap().type_name(), "u64");
        assert_eq!(unresolved, vec!["ghost"]);
    }
}
