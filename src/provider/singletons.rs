//! Singleton cache, early references and per-name creation locks.

use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};

use crate::error::{BeanError, BeanResult, DestructionErrors};
use crate::internal::Map;
use crate::lifecycle::DisposableBeanAdapter;
use crate::registration::AnyArc;

struct EarlyReference {
    object: AnyArc,
    exposed: bool,
}

#[derive(Default)]
struct SingletonState {
    completed: Map<String, AnyArc>,
    early: Map<String, EarlyReference>,
    creation_order: Vec<String>,
    disposables: Map<String, DisposableBeanAdapter>,
    /// bean -> beans that depend on it
    dependents: Map<String, Vec<String>>,
    /// factory bean -> cached product
    products: Map<String, AnyArc>,
    /// Set once by `destroy_all`; completions after it are destroyed at once
    closed: bool,
}

#[derive(Default)]
struct LockTable {
    owners: Map<String, (ThreadId, usize)>,
    waiting: Map<ThreadId, String>,
}

/// Per-name mutual exclusion for singleton creation.
///
/// Re-entrant for the owning thread. A thread about to wait on a name whose
/// owner is (transitively) waiting on a name this thread owns fails with
/// [`BeanError::CurrentlyInCreation`] instead of deadlocking.
#[derive(Default)]
pub(crate) struct CreationLocks {
    table: Mutex<LockTable>,
    released: Condvar,
}

pub(crate) struct CreationLockGuard<'a> {
    locks: &'a CreationLocks,
    name: String,
}

impl CreationLocks {
    pub(crate) fn acquire(&self, name: &str) -> BeanResult<CreationLockGuard<'_>> {
        let me = thread::current().id();
        let mut table = self.table.lock();
        loop {
            let owner = match table.owners.get_mut(name) {
                None => {
                    table.owners.insert(name.to_string(), (me, 1));
                    break;
                }
                Some((owner, depth)) if *owner == me => {
                    *depth += 1;
                    break;
                }
                Some((owner, _)) => *owner,
            };

            if Self::would_deadlock(&table, owner, me) {
                tracing::debug!(bean = name, "cross-thread creation cycle detected");
                return Err(BeanError::CurrentlyInCreation { name: name.to_string() });
            }
            table.waiting.insert(me, name.to_string());
            self.released.wait(&mut table);
            table.waiting.remove(&me);
        }
        Ok(CreationLockGuard { locks: self, name: name.to_string() })
    }

    fn would_deadlock(table: &LockTable, mut owner: ThreadId, me: ThreadId) -> bool {
        // Bounded walk of the wait-for graph
        for _ in 0..=table.waiting.len() {
            if owner == me {
                return true;
            }
            let next = table
                .waiting
                .get(&owner)
                .and_then(|wanted| table.owners.get(wanted))
                .map(|(t, _)| *t);
            match next {
                Some(t) => owner = t,
                None => return false,
            }
        }
        false
    }

    fn release(&self, name: &str) {
        let mut table = self.table.lock();
        let done = match table.owners.get_mut(name) {
            Some((_, depth)) => {
                *depth -= 1;
                *depth == 0
            }
            None => false,
        };
        if done {
            table.owners.remove(name);
            self.released.notify_all();
        }
    }
}

impl Drop for CreationLockGuard<'_> {
    fn drop(&mut self) {
        self.locks.release(&self.name);
    }
}

/// Process-lifetime store of a container's singletons.
#[derive(Default)]
pub(crate) struct SingletonRegistry {
    state: Mutex<SingletonState>,
    locks: CreationLocks,
}

impl SingletonRegistry {
    pub(crate) fn completed(&self, name: &str) -> Option<AnyArc> {
        self.state.lock().completed.get(name).cloned()
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.state.lock().completed.contains_key(name)
    }

    /// Hands out the early reference of `name`, if one is registered.
    pub(crate) fn early_reference(&self, name: &str) -> Option<AnyArc> {
        let mut state = self.state.lock();
        let early = state.early.get_mut(name)?;
        early.exposed = true;
        tracing::debug!(bean = name, "returning early reference to bean in creation");
        Some(early.object.clone())
    }

    pub(crate) fn add_early(&self, name: &str, object: AnyArc) {
        self.state
            .lock()
            .early
            .insert(name.to_string(), EarlyReference { object, exposed: false });
    }

    /// True if the early reference of `name` was handed to another bean.
    pub(crate) fn early_exposed(&self, name: &str) -> bool {
        self.state.lock().early.get(name).map(|e| e.exposed).unwrap_or(false)
    }

    /// Returns the singleton, creating it under the per-name lock on a miss.
    ///
    /// On failure every trace of the bean is removed; beans that already
    /// received its early reference are destroyed as well.
    pub(crate) fn get_or_create<F>(&self, name: &str, create: F) -> BeanResult<AnyArc>
    where
        F: FnOnce() -> BeanResult<AnyArc>,
    {
        if let Some(existing) = self.completed(name) {
            return Ok(existing);
        }
        let _lock = self.locks.acquire(name)?;
        if let Some(existing) = self.completed(name) {
            return Ok(existing);
        }

        match create() {
            Ok(object) => {
                let mut state = self.state.lock();
                state.early.remove(name);
                if state.closed {
                    let adapter = state.disposables.remove(name);
                    drop(state);
                    self.discard_after_close(name, adapter);
                    return Err(BeanError::ContainerClosed);
                }
                state.completed.insert(name.to_string(), object.clone());
                state.creation_order.push(name.to_string());
                Ok(object)
            }
            Err(err) => {
                let exposed = self
                    .state
                    .lock()
                    .early
                    .remove(name)
                    .map(|e| e.exposed)
                    .unwrap_or(false);
                if exposed {
                    let errors = self.destroy_dependents(name);
                    if !errors.is_empty() {
                        tracing::warn!(bean = name, failures = errors.len(), "destroying dependents of failed bean reported errors");
                    }
                }
                Err(err)
            }
        }
    }

    /// Destroys a singleton that finished creation after the registry was closed.
    fn discard_after_close(&self, name: &str, adapter: Option<DisposableBeanAdapter>) {
        tracing::debug!(bean = name, "singleton completed after close; destroying it");
        if let Some(adapter) = adapter {
            if let Err(e) = adapter.destroy() {
                tracing::warn!(bean = name, error = %e, "destroy hook failed");
            }
        }
    }

    pub(crate) fn register_disposable(&self, adapter: DisposableBeanAdapter) {
        let name = adapter.name().to_string();
        self.state.lock().disposables.insert(name, adapter);
    }

    /// Records that `dependent` depends on `name`.
    pub(crate) fn register_dependent(&self, name: &str, dependent: &str) {
        if name == dependent {
            return;
        }
        let mut state = self.state.lock();
        let entry = state.dependents.entry(name.to_string()).or_default();
        if !entry.iter().any(|d| d == dependent) {
            entry.push(dependent.to_string());
        }
    }

    /// True if `candidate` depends on `name`, directly or transitively.
    pub(crate) fn is_dependent(&self, name: &str, candidate: &str) -> bool {
        let state = self.state.lock();
        let mut seen: Vec<&str> = Vec::new();
        let mut frontier: Vec<&str> = vec![name];
        while let Some(current) = frontier.pop() {
            if let Some(dependents) = state.dependents.get(current) {
                for dependent in dependents {
                    if dependent == candidate {
                        return true;
                    }
                    if !seen.contains(&dependent.as_str()) {
                        seen.push(dependent);
                        frontier.push(dependent);
                    }
                }
            }
        }
        false
    }

    pub(crate) fn dependents_of(&self, name: &str) -> Vec<String> {
        self.state.lock().dependents.get(name).cloned().unwrap_or_default()
    }

    /// Cached product of a singleton factory bean, created once on a miss.
    pub(crate) fn product_or_create<F>(&self, name: &str, create: F) -> BeanResult<AnyArc>
    where
        F: FnOnce() -> BeanResult<AnyArc>,
    {
        if let Some(product) = self.state.lock().products.get(name) {
            return Ok(product.clone());
        }
        let _lock = self.locks.acquire(name)?;
        if let Some(product) = self.state.lock().products.get(name) {
            return Ok(product.clone());
        }
        let created = create()?;
        let mut state = self.state.lock();
        if state.closed {
            return Err(BeanError::ContainerClosed);
        }
        state.products.insert(name.to_string(), created.clone());
        Ok(created)
    }

    /// Names of completed singletons, in creation order.
    pub(crate) fn names(&self) -> Vec<String> {
        self.state.lock().creation_order.clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().completed.len()
    }

    /// Destroys `name` after every bean depending on it.
    pub(crate) fn destroy_singleton(&self, name: &str) -> DestructionErrors {
        let (found, adapter, dependents) = {
            let mut state = self.state.lock();
            let object = state.completed.remove(name);
            state.early.remove(name);
            state.products.remove(name);
            state.creation_order.retain(|n| n != name);
            let adapter = state.disposables.remove(name);
            let dependents = state.dependents.remove(name).unwrap_or_default();
            (object.is_some() || adapter.is_some(), adapter, dependents)
        };

        let mut errors = DestructionErrors::default();
        for dependent in dependents {
            errors.extend(self.destroy_singleton(&dependent));
        }
        if found {
            tracing::trace!(bean = name, "singleton removed");
        }
        if let Some(adapter) = adapter {
            if let Err(e) = adapter.destroy() {
                tracing::warn!(bean = name, error = %e, "destroy hook failed");
                errors.push(name, e);
            }
        }
        errors
    }

    fn destroy_dependents(&self, name: &str) -> DestructionErrors {
        let dependents = self.state.lock().dependents.remove(name).unwrap_or_default();
        let mut errors = DestructionErrors::default();
        for dependent in dependents {
            errors.extend(self.destroy_singleton(&dependent));
        }
        errors
    }

    /// Destroys every singleton, last created first.
    pub(crate) fn destroy_all(&self) -> DestructionErrors {
        self.state.lock().closed = true;
        let mut errors = DestructionErrors::default();
        loop {
            let next = self.state.lock().creation_order.last().cloned();
            match next {
                Some(name) => errors.extend(self.destroy_singleton(&name)),
                None => break,
            }
        }
        // Adapters whose bean never completed
        let leftovers: Vec<String> = self.state.lock().disposables.keys().cloned().collect();
        for name in leftovers {
            errors.extend(self.destroy_singleton(&name));
        }
        let mut state = self.state.lock();
        state.completed.clear();
        state.early.clear();
        state.products.clear();
        state.dependents.clear();
        errors
    }
}
