//! Container configuration.
//!
//! Settings come from code, from `FERROUS_BEANS_*` environment variables or,
//! with the `config` feature, from JSON.

use std::env;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

/// Default nesting limit for bean creation.
pub const DEFAULT_MAX_RESOLUTION_DEPTH: usize = 1024;

/// Key/value source of raw configuration strings.
pub trait ConfigSource {
    /// Raw value for `key` (lower-case, dot-free), if present.
    fn get(&self, key: &str) -> Option<String>;
}

/// Environment variable configuration source
#[derive(Debug, Default, Clone)]
pub struct EnvironmentConfigSource {
    /// Prefix to filter environment variables
    prefix: Option<String>,
}

impl EnvironmentConfigSource {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: Some(prefix.into()) }
    }
}

impl ConfigSource for EnvironmentConfigSource {
    fn get(&self, key: &str) -> Option<String> {
        let env_key = match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), key.to_uppercase()),
            None => key.to_uppercase(),
        };
        env::var(env_key).ok()
    }
}

impl<S: std::hash::BuildHasher> ConfigSource for std::collections::HashMap<String, String, S> {
    fn get(&self, key: &str) -> Option<String> {
        std::collections::HashMap::get(self, key).cloned()
    }
}

/// Behaviour switches of a bean factory.
///
/// ```rust
/// use ferrous_beans::{BeanCollection, FactoryConfig};
///
/// let config = FactoryConfig::default()
///     .allow_circular_references(false)
///     .display_name("orders");
/// let factory = BeanCollection::with_config(config).build().unwrap();
/// assert_eq!(factory.display_name(), "orders");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct FactoryConfig {
    /// Expose early references so singleton property cycles resolve
    pub allow_circular_references: bool,
    /// Registering a name twice replaces the earlier definition; when false
    /// it is a validation error
    pub allow_definition_overriding: bool,
    /// Record prototypes with destroy hooks and destroy them on close
    pub track_prototype_destruction: bool,
    /// Maximum nesting of bean creation on one thread
    pub max_resolution_depth: usize,
    /// Human readable container name
    pub display_name: Option<String>,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            allow_circular_references: true,
            allow_definition_overriding: true,
            track_prototype_destruction: false,
            max_resolution_depth: DEFAULT_MAX_RESOLUTION_DEPTH,
            display_name: None,
        }
    }
}

fn parse_or<T: std::str::FromStr>(source: &dyn ConfigSource, key: &str, default: T) -> T {
    match source.get(key) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "ignoring unparsable configuration value");
                default
            }
        },
        None => default,
    }
}

impl FactoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `FERROUS_BEANS_ALLOW_CIRCULAR_REFERENCES`,
    /// `FERROUS_BEANS_ALLOW_DEFINITION_OVERRIDING`,
    /// `FERROUS_BEANS_TRACK_PROTOTYPE_DESTRUCTION`,
    /// `FERROUS_BEANS_MAX_RESOLUTION_DEPTH` and `FERROUS_BEANS_DISPLAY_NAME`.
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        Self::load(&EnvironmentConfigSource::with_prefix("FERROUS_BEANS"))
    }

    /// Loads settings from any source, falling back to defaults.
    pub fn load(source: &dyn ConfigSource) -> Self {
        let defaults = Self::default();
        Self {
            allow_circular_references: parse_or(
                source,
                "allow_circular_references",
                defaults.allow_circular_references,
            ),
            allow_definition_overriding: parse_or(
                source,
                "allow_definition_overriding",
                defaults.allow_definition_overriding,
            ),
            track_prototype_destruction: parse_or(
                source,
                "track_prototype_destruction",
                defaults.track_prototype_destruction,
            ),
            max_resolution_depth: parse_or(source, "max_resolution_depth", defaults.max_resolution_depth),
            display_name: source.get("display_name").filter(|n| !n.is_empty()),
        }
    }

    /// Parses a JSON document; missing fields keep their defaults.
    #[cfg(feature = "config")]
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn allow_circular_references(mut self, allow: bool) -> Self {
        self.allow_circular_references = allow;
        self
    }

    pub fn allow_definition_overriding(mut self, allow: bool) -> Self {
        self.allow_definition_overriding = allow;
        self
    }

    pub fn track_prototype_destruction(mut self, track: bool) -> Self {
        self.track_prototype_destruction = track;
        self
    }

    pub fn max_resolution_depth(mut self, depth: usize) -> Self {
        self.max_resolution_depth = depth;
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}
