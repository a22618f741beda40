//! Startup validation of bean definitions.
//!
//! Runs once during [`BeanCollection::build`](crate::BeanCollection::build),
//! after definition post-processing and before any bean is created. Every
//! problem is collected instead of stopping at the first one.

use std::fmt;
use std::sync::Arc;

use crate::definition::{merge, resolve_bean_classes, MergedDefinition};
use crate::error::{BeanError, BeanResult};
use crate::internal::Map;
use crate::provider::BeanFactory;
use crate::registration::DefinitionRegistry;
use crate::scope::{Scope, ScopeProvider};

/// Result of definition validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Problems that prevent the factory from being built
    pub errors: Vec<BeanError>,
    /// Suspicious but legal configuration
    pub warnings: Vec<ValidationWarning>,
}

/// A validation warning about potentially problematic configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    /// A name was registered more than once; the last definition won
    DefinitionOverridden { name: String },
    /// Alias whose target is not defined locally
    DanglingAlias { alias: String, target: String },
    /// Primary flag on a definition excluded from autowiring has no effect
    PrimaryNotAutowireCandidate { name: String },
    /// Factory-method bean whose produced class cannot be determined; it is
    /// invisible to lookups by type
    UnknownBeanClass { name: String },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::DefinitionOverridden { name } => {
                write!(f, "bean definition '{}' was overridden", name)
            }
            ValidationWarning::DanglingAlias { alias, target } => {
                write!(f, "alias '{}' points at '{}', which is not defined here", alias, target)
            }
            ValidationWarning::PrimaryNotAutowireCandidate { name } => {
                write!(f, "bean '{}' is primary but not an autowire candidate", name)
            }
            ValidationWarning::UnknownBeanClass { name } => {
                write!(f, "class of bean '{}' cannot be determined before creation", name)
            }
        }
    }
}

impl ValidationResult {
    /// Returns true if validation passed without errors.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns true if there are warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Formats errors and warnings for display.
    pub fn format_issues(&self) -> String {
        let mut output = String::new();

        if !self.errors.is_empty() {
            output.push_str("Validation Errors:\n");
            for error in &self.errors {
                output.push_str(&format!("  - {}\n", error));
            }
        }

        if !self.warnings.is_empty() {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str("Validation Warnings:\n");
            for warning in &self.warnings {
                output.push_str(&format!("  - {}\n", warning));
            }
        }

        output
    }

    /// `Ok` when valid, otherwise every error as [`BeanError::Validation`].
    pub fn into_result(self) -> BeanResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(BeanError::Validation(self.errors))
        }
    }
}

/// What the registry is validated against.
pub(crate) struct ValidationContext<'a> {
    pub(crate) scopes: &'a Map<String, Arc<dyn ScopeProvider>>,
    pub(crate) parent: Option<&'a BeanFactory>,
    pub(crate) allow_overriding: bool,
}

impl ValidationContext<'_> {
    fn is_known(&self, registry: &DefinitionRegistry, name: &str) -> bool {
        let bare = crate::key::transformed_bean_name(name);
        registry.contains(bare) || self.parent.map(|p| p.contains_bean(bare)).unwrap_or(false)
    }
}

/// Validates every definition in `registry`.
pub(crate) fn validate(registry: &DefinitionRegistry, context: &ValidationContext<'_>) -> ValidationResult {
    let mut result = ValidationResult::default();

    check_aliases(registry, &mut result);
    check_overriding(registry, context, &mut result);

    let mut merged_all = Map::default();
    for name in registry.names() {
        match merge(registry, name) {
            Ok(merged) => {
                check_definition(registry, context, &merged, &mut result);
                merged_all.insert(name.clone(), merged);
            }
            Err(e) => result.errors.push(e),
        }
    }
    for name in resolve_bean_classes(&mut merged_all, registry, context.parent) {
        result.warnings.push(ValidationWarning::UnknownBeanClass { name });
    }

    for cycle in depends_on_cycles(registry) {
        result.errors.push(BeanError::InvalidDefinition {
            name: cycle[0].clone(),
            reason: format!("circular depends-on relationship: {}", cycle.join(" -> ")),
        });
    }

    if !result.is_valid() {
        tracing::debug!(errors = result.errors.len(), "bean definition validation failed");
    }
    for warning in &result.warnings {
        tracing::warn!(%warning, "bean definition validation warning");
    }
    result
}

fn check_aliases(registry: &DefinitionRegistry, result: &mut ValidationResult) {
    let mut aliases: Vec<(&str, &str)> = registry.alias_entries().collect();
    aliases.sort();
    for (alias, target) in aliases {
        match registry.canonical_name(alias) {
            Err(e) => {
                let duplicate = result.errors.iter().any(|existing| {
                    matches!((existing, &e), (BeanError::AliasCycle(a), BeanError::AliasCycle(b)) if same_cycle(a, b))
                });
                if !duplicate {
                    result.errors.push(e);
                }
            }
            Ok(canonical) if !registry.contains(&canonical) => {
                result.warnings.push(ValidationWarning::DanglingAlias {
                    alias: alias.to_string(),
                    target: target.to_string(),
                });
            }
            Ok(_) => {}
        }
    }
}

fn same_cycle(a: &[String], b: &[String]) -> bool {
    let mut a: Vec<&String> = a.iter().collect();
    let mut b: Vec<&String> = b.iter().collect();
    a.sort();
    a.dedup();
    b.sort();
    b.dedup();
    a == b
}

fn check_overriding(registry: &DefinitionRegistry, context: &ValidationContext<'_>, result: &mut ValidationResult) {
    let mut seen: Vec<&str> = Vec::new();
    for name in registry.overridden_names() {
        if seen.contains(&name.as_str()) {
            continue;
        }
        seen.push(name);
        if context.allow_overriding {
            result
                .warnings
                .push(ValidationWarning::DefinitionOverridden { name: name.clone() });
        } else {
            result.errors.push(BeanError::InvalidDefinition {
                name: name.clone(),
                reason: "registered more than once while definition overriding is disabled".to_string(),
            });
        }
    }
}

fn check_definition(
    registry: &DefinitionRegistry,
    context: &ValidationContext<'_>,
    merged: &MergedDefinition,
    result: &mut ValidationResult,
) {
    let name = merged.name();
    let def = merged.definition();
    let mut invalid = |reason: String| {
        result.errors.push(BeanError::InvalidDefinition { name: name.to_string(), reason });
    };

    for dependency in &def.depends_on {
        if !context.is_known(registry, dependency) {
            invalid(format!("depends on unknown bean '{}'", dependency));
        }
    }

    if let Scope::Custom(scope) = merged.scope() {
        if !context.scopes.contains_key(scope) {
            invalid(format!("no scope registered for name '{}'", scope));
        }
    }

    if merged.is_abstract() {
        return;
    }

    match (&def.factory_method_name, &def.factory_bean_name) {
        (Some(_), Some(factory_bean)) => {
            if crate::key::transformed_bean_name(factory_bean) == name {
                invalid("factory bean reference points back to the bean itself".to_string());
            } else if !context.is_known(registry, factory_bean) {
                invalid(format!("factory bean '{}' is not defined", factory_bean));
            }
        }
        (Some(method), None) => match &def.class {
            Some(class) if class.static_factories_named(method).next().is_none() => {
                invalid(format!(
                    "no static factory method '{}' declared by {}",
                    method,
                    class.type_name()
                ));
            }
            Some(_) => {}
            None => invalid(format!("static factory method '{}' needs a class", method)),
        },
        (None, Some(factory_bean)) => {
            invalid(format!("factory bean '{}' given without a factory method", factory_bean));
        }
        (None, None) => {
            if def.class.is_none() && def.instance_supplier.is_none() {
                invalid("no class, factory method or instance supplier".to_string());
            }
        }
    }

    // Property and lifecycle names are checked against the class only when
    // the class is the constructed type
    if def.factory_method_name.is_none() {
        if let Some(class) = &def.class {
            for (property, _) in &def.property_values {
                if class.property(property).is_none() {
                    invalid(format!("property '{}' is not declared by {}", property, class.type_name()));
                }
            }
            if let Some(method) = &def.init_method_name {
                let trait_hook = method == crate::class::AFTER_PROPERTIES_SET && class.initializing.is_some();
                if !trait_hook && class.init_method(method).is_none() {
                    invalid(format!("init method '{}' is not declared by {}", method, class.type_name()));
                }
            }
            if let Some(method) = &def.destroy_method_name {
                let trait_hook = method == crate::class::DESTROY && class.disposable.is_some();
                if !trait_hook && class.destroy_method(method).is_none() {
                    invalid(format!("destroy method '{}' is not declared by {}", method, class.type_name()));
                }
            }
        }
    }

    if def.primary && !def.autowire_candidate {
        result
            .warnings
            .push(ValidationWarning::PrimaryNotAutowireCandidate { name: name.to_string() });
    }
}

/// Cycles among `depends_on` edges, each closed with its first name.
fn depends_on_cycles(registry: &DefinitionRegistry) -> Vec<Vec<String>> {
    let mut edges: Map<String, Vec<String>> = Map::default();
    for (name, def) in registry.iter() {
        let targets = def
            .depends_on
            .iter()
            .filter_map(|d| registry.canonical_name(d).ok())
            .collect();
        edges.insert(name.to_string(), targets);
    }

    let mut visited: Vec<String> = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut cycles = Vec::new();
    for name in registry.names() {
        if !visited.contains(name) {
            dfs_cycles(name, &edges, &mut visited, &mut path, &mut cycles);
        }
    }
    cycles
}

fn dfs_cycles(
    current: &str,
    edges: &Map<String, Vec<String>>,
    visited: &mut Vec<String>,
    path: &mut Vec<String>,
    cycles: &mut Vec<Vec<String>>,
) {
    if let Some(start) = path.iter().position(|n| n == current) {
        let mut cycle: Vec<String> = path[start..].to_vec();
        cycle.push(current.to_string());
        cycles.push(cycle);
        return;
    }
    if visited.iter().any(|n| n == current) {
        return;
    }

    visited.push(current.to_string());
    path.push(current.to_string());
    if let Some(targets) = edges.get(current) {
        for target in targets {
            dfs_cycles(target, edges, visited, path, cycles);
        }
    }
    path.pop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::BeanClass;
    use crate::definition::BeanDefinition;

    struct Thing;

    fn class() -> Arc<BeanClass> {
        BeanClass::builder::<Thing>().default_constructor(|| Thing).build()
    }

    fn run(registry: &DefinitionRegistry, allow_overriding: bool) -> ValidationResult {
        let scopes = Map::default();
        validate(registry, &ValidationContext { scopes: &scopes, parent: None, allow_overriding })
    }

    #[test]
    fn valid_registry_has_no_issues() {
        let mut registry = DefinitionRegistry::new();
        registry.register("a", BeanDefinition::of(class()));
        registry.register("b", BeanDefinition::of(class()).depends_on("a"));
        let result = run(&registry, true);
        assert!(result.is_valid(), "{}", result.format_issues());
        assert!(!result.has_warnings());
    }

    #[test]
    fn reports_every_problem() {
        let mut registry = DefinitionRegistry::new();
        registry.register("no_class", BeanDefinition::new());
        registry.register("orphan", BeanDefinition::of(class()).parent("missing"));
        registry.register("scoped", BeanDefinition::of(class()).scope("request"));
        registry.register("dep", BeanDefinition::of(class()).depends_on("ghost"));
        let result = run(&registry, true);
        assert_eq!(result.errors.len(), 4, "{}", result.format_issues());
    }

    #[test]
    fn depends_on_cycle_is_reported() {
        let mut registry = DefinitionRegistry::new();
        registry.register("a", BeanDefinition::of(class()).depends_on("b"));
        registry.register("b", BeanDefinition::of(class()).depends_on("a"));
        let result = run(&registry, true);
        assert!(result.errors.iter().any(|e| e.to_string().contains("a -> b -> a")));
    }

    #[test]
    fn overriding_policy() {
        let mut registry = DefinitionRegistry::new();
        registry.register("a", BeanDefinition::of(class()));
        registry.register("a", BeanDefinition::of(class()));

        let lenient = run(&registry, true);
        assert!(lenient.is_valid());
        assert_eq!(
            lenient.warnings,
            vec![ValidationWarning::DefinitionOverridden { name: "a".into() }]
        );

        let strict = run(&registry, false);
        assert_eq!(strict.errors.len(), 1);
        assert!(matches!(strict.into_result(), Err(BeanError::Validation(errors)) if errors.len() == 1));
    }

    #[test]
    fn unknown_property_and_init_method() {
        let mut registry = DefinitionRegistry::new();
        registry.register(
            "a",
            BeanDefinition::of(class())
                .property("size", crate::definition::Value::literal(1u32))
                .init_method("start"),
        );
        let result = run(&registry, true);
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn abstract_template_needs_no_class() {
        let mut registry = DefinitionRegistry::new();
        registry.register("template", BeanDefinition::new().abstract_definition(true));
        registry.register("child", BeanDefinition::of(class()).parent("template"));
        assert!(run(&registry, true).is_valid());
    }

    #[test]
    fn dangling_alias_is_a_warning() {
        let mut registry = DefinitionRegistry::new();
        registry.register_alias("ds", "dataSource").unwrap();
        let result = run(&registry, true);
        assert!(result.is_valid());
        assert!(result.has_warnings());
        assert!(result.format_issues().contains("alias 'ds'"));
    }
}
