//! Per-thread tracking of beans currently in creation.
//!
//! Each thread keeps a stack of `(container, bean name)` entries for the beans
//! it is building. Re-encountering a name already on the stack is the cycle
//! signal; what happens next (early reference, constructor-cycle error or
//! prototype error) is decided by the caller.

use std::cell::RefCell;

use smallvec::SmallVec;

use crate::error::{BeanError, BeanResult};

type Entry = (u64, String);

// Thread-local creation stack; unrelated threads never see each other's entries
thread_local! {
    static CREATION_STACK: RefCell<SmallVec<[Entry; 16]>> = RefCell::new(SmallVec::new());
}

/// RAII guard marking a bean as in creation on the current thread.
pub(crate) struct CreationGuard {
    container: u64,
}

impl CreationGuard {
    /// Pushes `name` for `container`, failing when the stack exceeds `max_depth`.
    pub(crate) fn enter(container: u64, name: &str, max_depth: usize) -> BeanResult<Self> {
        CREATION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            // Depth guard
            if stack.len() >= max_depth {
                return Err(BeanError::DepthExceeded(stack.len()));
            }
            stack.push((container, name.to_string()));
            Ok(())
        })?;
        Ok(Self { container })
    }

    /// True if `name` is being created by this thread for `container`.
    pub(crate) fn in_creation(container: u64, name: &str) -> bool {
        CREATION_STACK.with(|stack| {
            stack
                .borrow()
                .iter()
                .any(|(c, n)| *c == container && n == name)
        })
    }

    /// The bean currently being built for `container`, if any.
    pub(crate) fn current(container: u64) -> Option<String> {
        CREATION_STACK.with(|stack| {
            stack
                .borrow()
                .iter()
                .rev()
                .find(|(c, _)| *c == container)
                .map(|(_, n)| n.clone())
        })
    }

    /// Creation chain from the first occurrence of `name` to the top of the stack,
    /// closed with `name` again.
    pub(crate) fn chain_to(container: u64, name: &str) -> Vec<String> {
        CREATION_STACK.with(|stack| {
            let stack = stack.borrow();
            let mut chain: Vec<String> = stack
                .iter()
                .filter(|(c, _)| *c == container)
                .map(|(_, n)| n.clone())
                .skip_while(|n| n != name)
                .collect();
            chain.push(name.to_string());
            chain
        })
    }
}

impl Drop for CreationGuard {
    fn drop(&mut self) {
        CREATION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(pos) = stack.iter().rposition(|(c, _)| *c == self.container) {
                stack.remove(pos);
            }
        });
    }
}
