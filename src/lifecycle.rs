//! Lifecycle orchestration: post-processor chains, initialization and destruction.
//!
//! A bean moves through `created -> dependencies injected -> pre-init processed
//! -> initialized -> post-init processed -> ready`, and on close through
//! `pre-destroy processed -> destroyed`. Post-processors may substitute the
//! instance at each stage; the substituted object is what later stages, the
//! cache and the caller see.

use std::any::Any;
use std::sync::Arc;

use crate::class::{BeanClass, Hook, AFTER_PROPERTIES_SET, DESTROY};
use crate::definition::MergedDefinition;
use crate::error::{BeanError, BeanResult, BoxError};
use crate::observer::Observers;
use crate::provider::BeanFactory;
use crate::registration::{same_instance, AnyArc, DefinitionRegistry};

/// Hook around bean initialization.
///
/// Processors run in ascending [`order`](BeanPostProcessor::order), ties in
/// registration order. Returning a different object replaces the bean.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{AnyArc, BeanCollection, BeanPostProcessor, BoxError, Resolver};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Default)]
/// struct CountingProcessor(AtomicUsize);
///
/// impl BeanPostProcessor for CountingProcessor {
///     fn post_process_after_initialization(&self, bean: AnyArc, _name: &str) -> Result<AnyArc, BoxError> {
///         self.0.fetch_add(1, Ordering::SeqCst);
///         Ok(bean)
///     }
/// }
///
/// let counter = Arc::new(CountingProcessor::default());
/// let mut beans = BeanCollection::new();
/// beans.add_post_processor(counter.clone());
/// beans.add_singleton("a", 1u8);
/// beans.add_singleton("b", 2u16);
/// let _factory = beans.build().unwrap();
///
/// assert_eq!(counter.0.load(Ordering::SeqCst), 2);
/// ```
pub trait BeanPostProcessor: Send + Sync {
    /// Called after dependency injection and aware callbacks, before init hooks.
    fn post_process_before_initialization(&self, bean: AnyArc, _name: &str) -> Result<AnyArc, BoxError> {
        Ok(bean)
    }

    /// Called after init hooks.
    fn post_process_after_initialization(&self, bean: AnyArc, _name: &str) -> Result<AnyArc, BoxError> {
        Ok(bean)
    }

    /// Position in the chain, lower first.
    fn order(&self) -> i32 {
        0
    }
}

/// Hook run before a bean's own destroy hooks.
pub trait DestructionAwareBeanPostProcessor: Send + Sync {
    /// Called before the bean's destroy hooks.
    fn post_process_before_destruction(&self, bean: &AnyArc, name: &str) -> Result<(), BoxError>;

    /// Whether this processor wants to see `bean` at all.
    fn requires_destruction(&self, _bean: &AnyArc) -> bool {
        true
    }
}

/// Hook over the mutable definition registry, run once during
/// [`BeanCollection::build`](crate::BeanCollection::build) before validation and
/// before any bean exists.
pub trait BeanFactoryPostProcessor: Send + Sync {
    /// Adds, removes or rewrites definitions and aliases.
    fn post_process_definitions(&self, registry: &mut DefinitionRegistry) -> BeanResult<()>;

    /// Position in the chain, lower first.
    fn order(&self) -> i32 {
        0
    }
}

/// Runs aware callbacks, the post-processor chains and init hooks on `raw`.
///
/// Aware callbacks target the constructed object. Init hooks target the
/// pre-init substitute when it is still of the bean's class, otherwise the
/// constructed object. The processor chains thread the possibly substituted
/// object. Returns the exposed object.
pub(crate) fn initialize_bean(factory: &BeanFactory, merged: &MergedDefinition, raw: &AnyArc) -> BeanResult<AnyArc> {
    let name = merged.name();
    let class = merged.bean_class();

    if let Some(class) = class {
        if let Some(aware) = &class.name_aware {
            aware(raw, name).map_err(|e| BeanError::creation(name, e))?;
        }
        if let Some(aware) = &class.factory_aware {
            aware(raw, factory.handle()).map_err(|e| BeanError::creation(name, e))?;
        }
    }

    let processors = factory.post_processors();
    let mut current = raw.clone();
    for processor in processors {
        current = processor
            .post_process_before_initialization(current, name)
            .map_err(|e| BeanError::creation(name, e))?;
    }

    // Init hooks run on a substitute that is still of the bean's class
    let init_target = match class {
        Some(class) if !same_instance(&current, raw) && Any::type_id(&*current) == class.type_id() => &current,
        _ => raw,
    };
    invoke_init_methods(merged, class, init_target)?;

    for processor in processors {
        current = processor
            .post_process_after_initialization(current, name)
            .map_err(|e| BeanError::creation(name, e))?;
    }
    Ok(current)
}

fn invoke_init_methods(merged: &MergedDefinition, class: Option<&Arc<BeanClass>>, raw: &AnyArc) -> BeanResult<()> {
    let name = merged.name();
    let initializing = class.and_then(|c| c.initializing.as_ref());
    if let Some(hook) = initializing {
        tracing::trace!(bean = name, "invoking after_properties_set");
        hook(raw).map_err(|e| BeanError::creation(name, e))?;
    }

    let Some(method) = &merged.definition().init_method_name else {
        return Ok(());
    };
    if method == AFTER_PROPERTIES_SET && initializing.is_some() {
        return Ok(());
    }
    let hook = class
        .and_then(|c| c.init_method(method))
        .ok_or_else(|| BeanError::InvalidDefinition {
            name: name.to_string(),
            reason: format!("init method '{}' is not declared by the bean class", method),
        })?;
    tracing::trace!(bean = name, method = %method, "invoking init method");
    hook(raw).map_err(|e| BeanError::creation(name, e))
}

/// Destruction sequence of one bean: destruction-aware processors, then
/// [`DisposableBean::destroy`](crate::traits::DisposableBean::destroy), then the
/// named destroy method.
pub(crate) struct DisposableBeanAdapter {
    name: String,
    exposed: AnyArc,
    target: AnyArc,
    processors: Vec<Arc<dyn DestructionAwareBeanPostProcessor>>,
    disposable: Option<Hook>,
    destroy_method: Option<Hook>,
    observers: Observers,
}

impl DisposableBeanAdapter {
    /// Adapter for a freshly initialized bean, `None` if nothing needs to run.
    pub(crate) fn for_bean(
        factory: &BeanFactory,
        merged: &MergedDefinition,
        exposed: &AnyArc,
        target: &AnyArc,
    ) -> BeanResult<Option<Self>> {
        let name = merged.name();
        let class = merged.bean_class();
        let disposable = class.and_then(|c| c.disposable.clone());

        let destroy_method = match &merged.definition().destroy_method_name {
            Some(method) if method == DESTROY && disposable.is_some() => None,
            Some(method) => Some(
                class
                    .and_then(|c| c.destroy_method(method))
                    .cloned()
                    .ok_or_else(|| BeanError::InvalidDefinition {
                        name: name.to_string(),
                        reason: format!("destroy method '{}' is not declared by the bean class", method),
                    })?,
            ),
            None => None,
        };

        let processors: Vec<_> = factory
            .destruction_processors()
            .iter()
            .filter(|p| p.requires_destruction(exposed))
            .cloned()
            .collect();

        if processors.is_empty() && disposable.is_none() && destroy_method.is_none() {
            return Ok(None);
        }
        Ok(Some(Self {
            name: name.to_string(),
            exposed: exposed.clone(),
            target: target.clone(),
            processors,
            disposable,
            destroy_method,
            observers: factory.observers().clone(),
        }))
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Runs every step even if one fails; reports the first failure.
    pub(crate) fn destroy(&self) -> Result<(), BoxError> {
        tracing::debug!(bean = %self.name, "destroying bean");
        let mut first: Option<BoxError> = None;
        for processor in &self.processors {
            if let Err(e) = processor.post_process_before_destruction(&self.exposed, &self.name) {
                first.get_or_insert(e);
            }
        }
        if let Some(hook) = &self.disposable {
            if let Err(e) = hook(&self.target) {
                first.get_or_insert(e);
            }
        }
        if let Some(hook) = &self.destroy_method {
            if let Err(e) = hook(&self.target) {
                first.get_or_insert(e);
            }
        }
        match first {
            None => {
                self.observers.destroyed(&self.name);
                Ok(())
            }
            Some(e) => {
                self.observers.destroy_failed(&self.name, e.as_ref());
                Err(e)
            }
        }
    }
}
