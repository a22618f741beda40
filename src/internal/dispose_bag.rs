//! Internal disposal bag for destruction callbacks.

use crate::error::{BoxError, DestructionErrors};

/// A destruction callback: runs once and may fail.
pub type DestructionCallback = Box<dyn FnOnce() -> Result<(), BoxError> + Send>;

/// Named destruction callbacks executed in LIFO order.
///
/// A failing callback never stops the remaining ones; failures are collected
/// and returned together.
#[derive(Default)]
pub(crate) struct DisposeBag {
    entries: Vec<(String, DestructionCallback)>,
}

impl DisposeBag {
    /// Add a callback for the named bean.
    pub(crate) fn push(&mut self, name: impl Into<String>, callback: DestructionCallback) {
        self.entries.push((name.into(), callback));
    }

    /// Drop the callbacks registered for `name` without running them.
    pub(crate) fn forget(&mut self, name: &str) {
        self.entries.retain(|(n, _)| n != name);
    }

    /// Execute all callbacks in reverse order (LIFO).
    pub(crate) fn run_all_reverse(&mut self) -> DestructionErrors {
        let mut errors = DestructionErrors::default();
        while let Some((name, callback)) = self.entries.pop() {
            if let Err(err) = callback() {
                tracing::warn!(bean = %name, error = %err, "destruction callback failed");
                errors.push(name, err);
            }
        }
        errors
    }

    /// Check if the bag is empty.
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
