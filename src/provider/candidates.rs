//! Candidate selection for type-based dependency resolution.

use crate::definition::Value;
use crate::descriptors::{DependencyDescriptor, Injected, Multiplicity, Target};
use crate::error::{BeanError, BeanResult};
use crate::key::Capability;
use crate::registration::AnyArc;

use super::BeanFactory;

/// A definition whose produced object satisfies a capability.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub(crate) name: String,
    pub(crate) index: usize,
    pub(crate) primary: bool,
    pub(crate) order: Option<i32>,
}

/// Picks the single winner among several candidates.
///
/// Narrowing: injection-point name (or one of the candidate's aliases), then
/// the primary flag, then the lowest explicit order with registration order
/// breaking ties. Candidates without order metadata rank after ordered ones;
/// when none carries order metadata the choice is ambiguous.
pub(crate) fn select_single<'c>(
    candidates: &'c [Candidate],
    capability: &Capability,
    injection_name: Option<&str>,
    aliases_of: impl Fn(&str) -> Vec<String>,
) -> BeanResult<&'c Candidate> {
    match candidates {
        [] => return Err(BeanError::NoMatchingBean { capability: capability.display_name() }),
        [only] => return Ok(only),
        _ => {}
    }

    if let Some(wanted) = injection_name {
        if let Some(hit) = candidates
            .iter()
            .find(|c| c.name == wanted || aliases_of(&c.name).iter().any(|a| a == wanted))
        {
            tracing::trace!(bean = %hit.name, "candidate selected by injection-point name");
            return Ok(hit);
        }
    }

    let primaries: Vec<&Candidate> = candidates.iter().filter(|c| c.primary).collect();
    match primaries.as_slice() {
        [one] => {
            tracing::trace!(bean = %one.name, "candidate selected as primary");
            return Ok(*one);
        }
        [] => {}
        many => {
            return Err(BeanError::AmbiguousPrimary {
                capability: capability.display_name(),
                candidates: many.iter().map(|c| c.name.clone()).collect(),
            })
        }
    }

    let Some(lowest) = candidates.iter().filter_map(|c| c.order).min() else {
        return Err(BeanError::AmbiguousBean {
            capability: capability.display_name(),
            candidates: candidates.iter().map(|c| c.name.clone()).collect(),
        });
    };
    // Equal lowest orders fall back to registration order
    let chosen = candidates
        .iter()
        .filter(|c| c.order == Some(lowest))
        .min_by_key(|c| c.index)
        .ok_or_else(|| BeanError::NoMatchingBean { capability: capability.display_name() })?;
    tracing::trace!(bean = %chosen.name, order = lowest, "candidate selected by order");
    Ok(chosen)
}

/// Orders candidates for multi-valued injection: explicit order ascending,
/// unordered last, registration order for ties.
pub(crate) fn sort_for_collection(candidates: &mut [Candidate]) {
    candidates.sort_by_key(|c| (c.order.is_none(), c.order.unwrap_or(0), c.index));
}

impl BeanFactory {
    /// Local autowire candidates for `capability`, in registration order.
    ///
    /// The requesting bean never matches itself.
    pub(crate) fn candidates(&self, capability: &Capability, requesting: Option<&str>) -> Vec<Candidate> {
        let inner = &self.inner;
        inner
            .registry
            .names()
            .iter()
            .enumerate()
            .filter_map(|(index, name)| {
                let merged = inner.merged.get(name)?;
                let def = merged.definition();
                if merged.is_abstract() || !def.autowire_candidate || requesting == Some(name.as_str()) {
                    return None;
                }
                let class = merged.object_class()?;
                if !class.provides_capability(capability) {
                    return None;
                }
                Some(Candidate {
                    name: name.clone(),
                    index,
                    primary: def.primary,
                    order: def.order,
                })
            })
            .collect()
    }

    /// Resolves a dependency descriptor on behalf of `requesting`.
    pub(crate) fn resolve_dependency(
        &self,
        descriptor: &DependencyDescriptor,
        requesting: Option<&str>,
    ) -> BeanResult<Injected> {
        self.ensure_open()?;
        match &descriptor.target {
            Target::Named { name, capability } => {
                let resolved = match capability {
                    Some(capability) => self.lookup_bean_as(name, capability, requesting),
                    None => self.lookup_bean(name, requesting),
                };
                let object = match resolved {
                    Ok(object) => object,
                    Err(e) if !descriptor.required && e.is_unsatisfied() => return Ok(Injected::None),
                    Err(e) => return Err(e),
                };
                Ok(match descriptor.multiplicity {
                    Multiplicity::Single => Injected::One(object),
                    Multiplicity::Collection | Multiplicity::Map => Injected::Many(vec![(name.clone(), object)]),
                })
            }
            Target::Capability(capability) => match descriptor.multiplicity {
                Multiplicity::Single => {
                    match self.resolve_single(capability, descriptor.injection_name.as_deref(), requesting)? {
                        Some((_, object)) => Ok(Injected::One(object)),
                        None if descriptor.required => {
                            Err(BeanError::NoMatchingBean { capability: capability.display_name() })
                        }
                        None => Ok(Injected::None),
                    }
                }
                Multiplicity::Collection | Multiplicity::Map => {
                    let all = self.resolve_all(capability, requesting)?;
                    if all.is_empty() && descriptor.required {
                        return Err(BeanError::NoMatchingBean { capability: capability.display_name() });
                    }
                    Ok(Injected::Many(all))
                }
            },
        }
    }

    /// The container and name single-valued resolution would pick; `None`
    /// when nothing matches here or in any ancestor.
    pub(crate) fn select_candidate(
        &self,
        capability: &Capability,
        injection_name: Option<&str>,
        requesting: Option<&str>,
    ) -> BeanResult<Option<(BeanFactory, String)>> {
        let candidates = self.candidates(capability, requesting);
        if candidates.is_empty() {
            return match &self.inner.parent {
                Some(parent) => parent.select_candidate(capability, injection_name, None),
                None => Ok(None),
            };
        }
        let chosen = select_single(&candidates, capability, injection_name, |name| {
            self.inner.registry.aliases(name)
        })?;
        tracing::trace!(capability = %capability, bean = %chosen.name, "resolved candidate");
        Ok(Some((self.clone(), chosen.name.clone())))
    }

    /// Single-valued resolution; `None` when nothing matches here or in any ancestor.
    pub(crate) fn resolve_single(
        &self,
        capability: &Capability,
        injection_name: Option<&str>,
        requesting: Option<&str>,
    ) -> BeanResult<Option<(String, AnyArc)>> {
        let Some((owner, name)) = self.select_candidate(capability, injection_name, requesting)? else {
            return Ok(None);
        };
        // Dependencies are only recorded within one container
        let requesting = if owner.id() == self.id() { requesting } else { None };
        let object = owner.lookup_bean_as(&name, capability, requesting)?;
        Ok(Some((name, object)))
    }

    /// Creates the single prototype candidate for `capability` with explicit
    /// constructor or factory-method arguments.
    pub(crate) fn create_with_args_as(&self, capability: &Capability, args: Vec<Value>) -> BeanResult<AnyArc> {
        self.ensure_open()?;
        let Some((owner, name)) = self.select_candidate(capability, None, None)? else {
            return Err(BeanError::NoMatchingBean { capability: capability.display_name() });
        };
        let object = owner.get_bean_with_args(&name, args)?;
        let cast = match owner.class_of(&name) {
            Some(class) => class.cast(&object, capability),
            None => crate::class::cast_by_runtime_type(&object, capability),
        };
        cast.ok_or_else(|| BeanError::TypeMismatch { name, expected: capability.display_name() })
    }

    /// Every match, local beans first in collection order, then ancestors'
    /// beans whose names are not defined locally.
    pub(crate) fn resolve_all(
        &self,
        capability: &Capability,
        requesting: Option<&str>,
    ) -> BeanResult<Vec<(String, AnyArc)>> {
        let mut candidates = self.candidates(capability, requesting);
        sort_for_collection(&mut candidates);

        let mut resolved = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let object = self.lookup_bean_as(&candidate.name, capability, requesting)?;
            resolved.push((candidate.name, object));
        }

        if let Some(parent) = &self.inner.parent {
            for (name, object) in parent.resolve_all(capability, None)? {
                if !self.inner.registry.contains(&name) {
                    resolved.push((name, object));
                }
            }
        }
        Ok(resolved)
    }
}
