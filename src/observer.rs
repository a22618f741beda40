//! Observers for bean lifecycle events.
//!
//! Observers see every bean creation and destruction performed by a container,
//! which makes them the hook for structured tracing, timing and failure
//! accounting without touching bean code.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::BeanError;

/// Observer trait for bean lifecycle events.
///
/// Every method has an empty default, implement only what you need.
///
/// # Performance
///
/// Observer calls are made synchronously on the creating thread. Keep
/// implementations lightweight.
///
/// # Examples
///
/// ```
/// use ferrous_beans::{BeanCollection, BeanObserver, Resolver};
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct Recorder {
///     created: Mutex<Vec<String>>,
/// }
///
/// impl BeanObserver for Recorder {
///     fn created(&self, name: &str, _elapsed: Duration) {
///         self.created.lock().unwrap().push(name.to_string());
///     }
/// }
///
/// let recorder = Arc::new(Recorder::default());
/// let mut beans = BeanCollection::new();
/// beans.add_observer(recorder.clone());
/// beans.add_singleton("greeting", "hello".to_string());
///
/// let factory = beans.build().unwrap();
/// assert_eq!(*recorder.created.lock().unwrap(), vec!["greeting"]);
/// # factory.close().unwrap();
/// ```
pub trait BeanObserver: Send + Sync {
    /// Creation of `name` is starting.
    fn creating(&self, _name: &str) {}

    /// `name` was created and fully initialized.
    fn created(&self, _name: &str, _elapsed: Duration) {}

    /// Creation of `name` failed.
    fn creation_failed(&self, _name: &str, _error: &BeanError) {}

    /// `name` was destroyed.
    fn destroyed(&self, _name: &str) {}

    /// Destruction of `name` failed; remaining beans are still destroyed.
    fn destroy_failed(&self, _name: &str, _error: &(dyn std::error::Error + Send + Sync)) {}
}

/// Collection of observers for lifecycle events.
///
/// Cheap to clone; minimal overhead when no observer is registered.
#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn BeanObserver>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, observer: Arc<dyn BeanObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    #[inline]
    pub(crate) fn creating(&self, name: &str) {
        for observer in &self.observers {
            observer.creating(name);
        }
    }

    #[inline]
    pub(crate) fn created(&self, name: &str, elapsed: Duration) {
        for observer in &self.observers {
            observer.created(name, elapsed);
        }
    }

    #[inline]
    pub(crate) fn creation_failed(&self, name: &str, error: &BeanError) {
        for observer in &self.observers {
            observer.creation_failed(name, error);
        }
    }

    #[inline]
    pub(crate) fn destroyed(&self, name: &str) {
        for observer in &self.observers {
            observer.destroyed(name);
        }
    }

    #[inline]
    pub(crate) fn destroy_failed(&self, name: &str, error: &(dyn std::error::Error + Send + Sync)) {
        for observer in &self.observers {
            observer.destroy_failed(name, error);
        }
    }
}

/// Built-in observer forwarding events to `tracing`.
///
/// ```
/// use ferrous_beans::{BeanCollection, TracingObserver};
/// use std::sync::Arc;
///
/// let mut beans = BeanCollection::new();
/// beans.add_observer(Arc::new(TracingObserver::new()));
/// ```
#[derive(Debug, Clone)]
pub struct TracingObserver {
    target: &'static str,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self { target: "ferrous_beans" }
    }

    /// Observer tagging every event with `target` as its `component` field.
    pub fn with_target(target: &'static str) -> Self {
        Self { target }
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl BeanObserver for TracingObserver {
    fn creating(&self, name: &str) {
        tracing::trace!(component = self.target, bean = name, "creating bean");
    }

    fn created(&self, name: &str, elapsed: Duration) {
        tracing::debug!(component = self.target, bean = name, ?elapsed, "bean created");
    }

    fn creation_failed(&self, name: &str, error: &BeanError) {
        tracing::warn!(component = self.target, bean = name, %error, "bean creation failed");
    }

    fn destroyed(&self, name: &str) {
        tracing::debug!(component = self.target, bean = name, "bean destroyed");
    }

    fn destroy_failed(&self, name: &str, error: &(dyn std::error::Error + Send + Sync)) {
        tracing::warn!(component = self.target, bean = name, %error, "bean destruction failed");
    }
}

/// Observer counting lifecycle events.
#[derive(Debug, Default)]
pub struct MetricsObserver {
    created: AtomicU64,
    creation_nanos: AtomicU64,
    failed: AtomicU64,
    destroyed: AtomicU64,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of beans created.
    pub fn creation_count(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    /// Number of failed creations.
    pub fn failure_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Number of beans destroyed.
    pub fn destruction_count(&self) -> u64 {
        self.destroyed.load(Ordering::Relaxed)
    }

    /// Total time spent creating beans (nested creations are counted in their parents too).
    pub fn total_creation_time(&self) -> Duration {
        Duration::from_nanos(self.creation_nanos.load(Ordering::Relaxed))
    }

    /// Mean creation time, `None` before the first creation.
    pub fn average_creation_time(&self) -> Option<Duration> {
        let count = self.creation_count();
        if count == 0 {
            return None;
        }
        Some(self.total_creation_time() / count as u32)
    }

    pub fn reset(&self) {
        self.created.store(0, Ordering::Relaxed);
        self.creation_nanos.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.destroyed.store(0, Ordering::Relaxed);
    }
}

impl BeanObserver for MetricsObserver {
    fn created(&self, _name: &str, elapsed: Duration) {
        self.created.fetch_add(1, Ordering::Relaxed);
        self.creation_nanos.fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }

    fn creation_failed(&self, _name: &str, _error: &BeanError) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    fn destroyed(&self, _name: &str) {
        self.destroyed.fetch_add(1, Ordering::Relaxed);
    }
}
