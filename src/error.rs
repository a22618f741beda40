//! Error types for the bean container.

use std::error::Error as StdError;
use std::fmt;

/// Boxed error returned by user code (constructors, factory methods, setters, lifecycle hooks).
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Bean container errors
///
/// Every failure raised while registering, validating, resolving, creating or destroying
/// beans. Errors raised while building a bean are wrapped in [`BeanError::BeanCreation`]
/// together with the failing bean name, so a failure deep inside a dependency graph keeps
/// its full causal chain. Use [`BeanError::root_cause`] to look through the wrapping.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::{BeanCollection, BeanError};
///
/// let factory = BeanCollection::new().build().unwrap();
/// match factory.get_bean("missing") {
///     Err(BeanError::NoSuchBean(name)) => assert_eq!(name, "missing"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum BeanError {
    /// No definition is registered under the name and no alias resolves it
    #[error("no bean definition named '{0}'")]
    DefinitionNotFound(String),
    /// Alias chain loops back on itself
    #[error("alias cycle detected: {}", .0.join(" -> "))]
    AliasCycle(Vec<String>),
    /// Parent-definition chain loops back on itself
    #[error("parent definition cycle detected: {}", .0.join(" -> "))]
    ParentCycle(Vec<String>),
    /// Name-based lookup failed locally and in every ancestor
    #[error("no bean named '{0}' is available")]
    NoSuchBean(String),
    /// Required capability has no autowire candidate
    #[error("no qualifying bean of type '{capability}' available")]
    NoMatchingBean {
        /// Display name of the requested capability
        capability: &'static str,
    },
    /// Several candidates remain for a single-valued injection point
    #[error("expected a single matching bean of type '{capability}' but found {}: {}", .candidates.len(), .candidates.join(", "))]
    AmbiguousBean {
        /// Display name of the requested capability
        capability: &'static str,
        /// Names of the tied candidates
        candidates: Vec<String>,
    },
    /// More than one candidate is marked primary
    #[error("more than one primary bean among candidates of type '{capability}': {}", .candidates.join(", "))]
    AmbiguousPrimary {
        /// Display name of the requested capability
        capability: &'static str,
        /// Names of the primary candidates
        candidates: Vec<String>,
    },
    /// More than one constructor is marked as the required autowire target
    #[error("bean '{name}' declares more than one required autowire constructor")]
    ConflictingConstructor {
        /// Bean name
        name: String,
    },
    /// No constructor (or factory method) could be satisfied
    #[error("no usable constructor for bean '{name}' ({} candidate(s) failed)", .causes.len())]
    NoUsableConstructor {
        /// Bean name
        name: String,
        /// Failure of every attempted candidate, in attempt order
        causes: Vec<BeanError>,
    },
    /// A constructor-phase dependency cycle; no early reference can exist yet
    #[error("unresolvable circular constructor dependency: {}", .chain.join(" -> "))]
    CircularConstructorDependency {
        /// Creation chain ending with the re-requested bean
        chain: Vec<String>,
    },
    /// Bean is being created and cannot be handed out (prototype cycle or cross-thread cycle)
    #[error("bean '{name}' is currently in creation")]
    CurrentlyInCreation {
        /// Bean name
        name: String,
    },
    /// An early reference was handed out and post-processing replaced the object afterwards
    #[error("bean '{name}' was injected into other beans as an early reference but was later replaced by post-processing")]
    IrreconcilableEarlyReference {
        /// Bean name
        name: String,
    },
    /// Bean construction or initialization failed
    #[error("error creating bean '{name}': {source}")]
    BeanCreation {
        /// Bean name
        name: String,
        /// Underlying cause (user error or nested `BeanError`)
        #[source]
        source: BoxError,
    },
    /// Attempt to instantiate an abstract (template-only) definition
    #[error("bean definition '{0}' is abstract")]
    AbstractBean(String),
    /// Factory dereference (`&name`) on a bean that is not a factory bean
    #[error("bean '{0}' is not a factory bean")]
    NotAFactoryBean(String),
    /// Bean exists but is not of the requested type
    #[error("bean '{name}' is not of required type '{expected}'")]
    TypeMismatch {
        /// Bean name (or injection point)
        name: String,
        /// Requested type name
        expected: &'static str,
    },
    /// Structurally invalid definition
    #[error("invalid bean definition '{name}': {reason}")]
    InvalidDefinition {
        /// Bean name
        name: String,
        /// Human readable reason
        reason: String,
    },
    /// Startup validation failed; every problem found is listed
    #[error("bean definition validation failed with {} error(s): {}", .0.len(), join_errors(.0))]
    Validation(Vec<BeanError>),
    /// Resolution recursion went too deep
    #[error("max resolution depth {0} exceeded")]
    DepthExceeded(usize),
    /// One or more destroy hooks failed during close
    #[error(transparent)]
    Destruction(DestructionErrors),
    /// The container was closed
    #[error("bean container has been closed")]
    ContainerClosed,
}

fn join_errors(errors: &[BeanError]) -> String {
    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
}

impl BeanError {
    /// Wraps `source` into a [`BeanError::BeanCreation`] for `name`.
    pub fn creation(name: impl Into<String>, source: impl Into<BoxError>) -> Self {
        BeanError::BeanCreation { name: name.into(), source: source.into() }
    }

    /// Returns the innermost `BeanError` by unwrapping nested creation failures.
    ///
    /// If the innermost cause is a user error, the last `BeanCreation` wrapping it
    /// is returned.
    ///
    /// ```rust
    /// use ferrous_beans::BeanError;
    ///
    /// let inner = BeanError::NoSuchBean("b".into());
    /// let err = BeanError::creation("a", BeanError::creation("c", inner));
    /// assert!(matches!(err.root_cause(), BeanError::NoSuchBean(_)));
    /// ```
    pub fn root_cause(&self) -> &BeanError {
        let mut current = self;
        while let BeanError::BeanCreation { source, .. } = current {
            match source.downcast_ref::<BeanError>() {
                Some(inner) => current = inner,
                None => break,
            }
        }
        current
    }

    /// Iterates this error and every nested `BeanError` cause, outermost first.
    pub fn chain(&self) -> impl Iterator<Item = &BeanError> {
        let mut next = Some(self);
        std::iter::from_fn(move || {
            let current = next?;
            next = match current {
                BeanError::BeanCreation { source, .. } => source.downcast_ref::<BeanError>(),
                _ => None,
            };
            Some(current)
        })
    }

    /// True when the failure means "nothing satisfies this dependency" rather than
    /// "a satisfying bean failed to build". Constructor selection moves on to the
    /// next candidate for these.
    pub(crate) fn is_unsatisfied(&self) -> bool {
        matches!(
            self,
            BeanError::NoMatchingBean { .. }
                | BeanError::NoSuchBean(_)
                | BeanError::DefinitionNotFound(_)
                | BeanError::AmbiguousBean { .. }
                | BeanError::AmbiguousPrimary { .. }
        )
    }
}

/// Destroy-hook failures collected during a single `close()` (or scope clear).
///
/// Destruction never stops at the first failure; every failing bean is listed
/// here in the order its destroy sequence ran.
#[derive(Debug, Default)]
pub struct DestructionErrors {
    failures: Vec<(String, BoxError)>,
}

impl DestructionErrors {
    pub(crate) fn push(&mut self, name: impl Into<String>, error: BoxError) {
        self.failures.push((name.into(), error));
    }

    pub(crate) fn extend(&mut self, other: DestructionErrors) {
        self.failures.extend(other.failures);
    }

    /// True when no destroy hook failed.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of failed beans.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Names of the beans whose destruction failed, in destruction order.
    pub fn bean_names(&self) -> Vec<&str> {
        self.failures.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Failures as `(bean name, error)` pairs.
    pub fn failures(&self) -> &[(String, BoxError)] {
        &self.failures
    }

    pub(crate) fn into_result(self) -> BeanResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(BeanError::Destruction(self))
        }
    }
}

impl fmt::Display for DestructionErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bean(s) failed to destroy", self.failures.len())?;
        for (name, err) in &self.failures {
            write!(f, "; '{}': {}", name, err)?;
        }
        Ok(())
    }
}

impl StdError for DestructionErrors {}

/// Result type for container operations
///
/// A convenience alias for `Result<T, BeanError>`, the crate-wide result type.
///
/// ```rust
/// use ferrous_beans::{BeanResult, BeanError};
///
/// fn lookup() -> BeanResult<()> {
///     Err(BeanError::NoSuchBean("repo".into()))
/// }
/// assert!(lookup().is_err());
/// ```
pub type BeanResult<T> = Result<T, BeanError>;
