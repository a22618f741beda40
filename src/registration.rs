//! Bean definition registry with alias resolution.

use std::any::Any;
use std::sync::Arc;

use crate::definition::BeanDefinition;
use crate::error::{BeanError, BeanResult};
use crate::internal::Map;

/// Type-erased, shareable bean instance.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// True when both handles point at the same object.
pub(crate) fn same_instance(a: &AnyArc, b: &AnyArc) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// Mapping from canonical bean name to definition, plus aliases.
///
/// Registration order is recorded and is the last-resort tie-break for
/// type-based resolution. Registering a definition under an existing name
/// overwrites it in place: the name keeps its original position.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{BeanDefinition, DefinitionRegistry};
///
/// let mut registry = DefinitionRegistry::new();
/// registry.register("dataSource", BeanDefinition::new());
/// registry.register_alias("ds", "dataSource").unwrap();
/// registry.register_alias("primaryDs", "ds").unwrap();
///
/// assert_eq!(registry.canonical_name("primaryDs").unwrap(), "dataSource");
/// assert!(registry.get("primaryDs").is_ok());
/// assert!(registry.register_alias("dataSource", "primaryDs").is_err());
/// ```
#[derive(Default, Clone)]
pub struct DefinitionRegistry {
    definitions: Map<String, BeanDefinition>,
    order: Vec<String>,
    aliases: Map<String, String>,
    overridden: Vec<String>,
}

impl DefinitionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or overwrites) the definition for `name`.
    ///
    /// An alias with the same name is dropped, the definition takes precedence.
    pub fn register(&mut self, name: impl Into<String>, definition: BeanDefinition) {
        let name = name.into();
        if self.aliases.remove(&name).is_some() {
            tracing::debug!(bean = %name, "definition replaces alias of the same name");
        }
        if self.definitions.insert(name.clone(), definition).is_some() {
            tracing::debug!(bean = %name, "overriding bean definition");
            self.overridden.push(name);
        } else {
            self.order.push(name);
        }
    }

    /// Removes the definition registered under `name` (aliases are kept).
    pub fn remove(&mut self, name: &str) -> BeanResult<BeanDefinition> {
        let definition = self
            .definitions
            .remove(name)
            .ok_or_else(|| BeanError::DefinitionNotFound(name.to_string()))?;
        self.order.retain(|n| n != name);
        Ok(definition)
    }

    /// Returns the definition for `name`, following aliases.
    pub fn get(&self, name: &str) -> BeanResult<&BeanDefinition> {
        let canonical = self.canonical_name(name)?;
        self.definitions
            .get(&canonical)
            .ok_or(BeanError::DefinitionNotFound(canonical))
    }

    /// Mutable access for the definition post-processing phase.
    pub fn get_mut(&mut self, name: &str) -> BeanResult<&mut BeanDefinition> {
        let canonical = self.canonical_name(name)?;
        self.definitions
            .get_mut(&canonical)
            .ok_or(BeanError::DefinitionNotFound(canonical))
    }

    /// True if a definition exists under the (alias-resolved) name.
    pub fn contains(&self, name: &str) -> bool {
        self.canonical_name(name)
            .map(|c| self.definitions.contains_key(&c))
            .unwrap_or(false)
    }

    /// Registers `alias` for `name`.
    ///
    /// An alias equal to the name it points at is removed instead. Fails with
    /// [`BeanError::AliasCycle`] if the alias would close a loop.
    pub fn register_alias(&mut self, alias: impl Into<String>, name: impl Into<String>) -> BeanResult<()> {
        let alias = alias.into();
        let name = name.into();
        if alias == name {
            self.aliases.remove(&alias);
            return Ok(());
        }
        if self.resolves_to(&name, &alias) {
            let mut chain = vec![alias.clone()];
            let mut current = name.clone();
            while current != alias {
                chain.push(current.clone());
                match self.aliases.get(&current) {
                    Some(next) => current = next.clone(),
                    None => break,
                }
            }
            chain.push(alias);
            return Err(BeanError::AliasCycle(chain));
        }
        self.aliases.insert(alias, name);
        Ok(())
    }

    fn resolves_to(&self, start: &str, target: &str) -> bool {
        let mut current = start;
        let mut steps = 0;
        while let Some(next) = self.aliases.get(current) {
            if next == target {
                return true;
            }
            current = next.as_str();
            steps += 1;
            if steps > self.aliases.len() {
                break;
            }
        }
        start == target
    }

    /// Follows the alias chain from `name` to the canonical bean name.
    pub fn canonical_name(&self, name: &str) -> BeanResult<String> {
        let mut current = name;
        let mut seen: Vec<&str> = Vec::new();
        while let Some(next) = self.aliases.get(current) {
            if seen.contains(&current) {
                let mut chain: Vec<String> = seen.iter().map(|s| s.to_string()).collect();
                chain.push(current.to_string());
                return Err(BeanError::AliasCycle(chain));
            }
            seen.push(current);
            current = next.as_str();
        }
        Ok(current.to_string())
    }

    /// All aliases that resolve (directly or transitively) to `name`.
    pub fn aliases(&self, name: &str) -> Vec<String> {
        let mut found = Vec::new();
        let mut frontier = vec![name.to_string()];
        while let Some(target) = frontier.pop() {
            for (alias, registered) in &self.aliases {
                if *registered == target && !found.contains(alias) {
                    found.push(alias.clone());
                    frontier.push(alias.clone());
                }
            }
        }
        found.sort();
        found
    }

    /// Every alias pair as `(alias, target)`.
    pub fn alias_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(a, t)| (a.as_str(), t.as_str()))
    }

    /// Canonical names in registration order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Definitions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BeanDefinition)> {
        self.order
            .iter()
            .filter_map(move |name| self.definitions.get(name).map(|d| (name.as_str(), d)))
    }

    /// Names that were registered more than once.
    pub fn overridden_names(&self) -> &[String] {
        &self.overridden
    }

    /// Number of registered definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
