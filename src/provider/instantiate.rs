//! Instantiation engine: constructor and factory-method selection, property
//! population and the creation sequence of a single bean.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::time::Instant;

use crate::class::{BeanClass, Executable};
use crate::definition::{MergedDefinition, Value};
use crate::descriptors::{Args, Injected};
use crate::error::{BeanError, BeanResult};
use crate::internal::CreationGuard;
use crate::key::Capability;
use crate::lifecycle::{self, DisposableBeanAdapter};
use crate::registration::{same_instance, AnyArc};
use crate::scope::Scope;
use crate::traits::ResolverCore;

use super::{BeanFactory, ResolverContext};

/// Explicit arguments for constructor or factory-method invocation.
#[derive(Clone, Copy)]
enum Explicit<'v> {
    None,
    /// Arguments passed at lookup time, matched by count
    Positional(&'v [Value]),
    /// Constructor arguments of the definition, by parameter index
    Indexed(&'v BTreeMap<usize, Value>),
}

fn wrap(name: &str, err: BeanError) -> BeanError {
    match err {
        BeanError::BeanCreation { name: ref failed, .. } if failed == name => err,
        other => BeanError::creation(name, other),
    }
}

impl BeanFactory {
    /// Creates one instance of `merged`: instantiate, expose early reference,
    /// populate, initialize, register destruction.
    pub(crate) fn create_bean(&self, merged: &MergedDefinition, explicit: Option<&[Value]>) -> BeanResult<AnyArc> {
        let name = merged.name();
        if merged.is_abstract() {
            return Err(BeanError::AbstractBean(name.to_string()));
        }
        let _guard = CreationGuard::enter(self.inner.container_id, name, self.inner.config.max_resolution_depth)?;

        let observers = &self.inner.observers;
        if observers.has_observers() {
            observers.creating(name);
        }
        tracing::debug!(bean = name, scope = %merged.scope(), "creating bean");
        let started = Instant::now();

        let result = self.do_create_bean(merged, explicit).map_err(|e| wrap(name, e));
        match &result {
            Ok(_) => {
                let elapsed = started.elapsed();
                tracing::debug!(bean = name, ?elapsed, "finished creating bean");
                observers.created(name, elapsed);
            }
            Err(e) => observers.creation_failed(name, e),
        }
        result
    }

    fn do_create_bean(&self, merged: &MergedDefinition, explicit: Option<&[Value]>) -> BeanResult<AnyArc> {
        let name = merged.name();
        let ctx = ResolverContext::new(self, Some(name));
        let raw = self.instantiate(merged, explicit, &ctx)?;

        let expose_early =
            merged.scope().is_singleton() && explicit.is_none() && self.inner.config.allow_circular_references;
        if expose_early {
            tracing::trace!(bean = name, "registering early reference");
            self.inner.singletons.add_early(name, raw.clone());
        }

        self.populate(merged, &raw, &ctx)?;
        let exposed = lifecycle::initialize_bean(self, merged, &raw)?;

        if expose_early && self.inner.singletons.early_exposed(name) && !same_instance(&exposed, &raw) {
            return Err(BeanError::IrreconcilableEarlyReference { name: name.to_string() });
        }

        self.register_destruction(merged, &exposed, &raw)?;
        Ok(exposed)
    }

    fn instantiate(
        &self,
        merged: &MergedDefinition,
        explicit: Option<&[Value]>,
        ctx: &ResolverContext<'_>,
    ) -> BeanResult<AnyArc> {
        let name = merged.name();
        let def = merged.definition();

        if let Some(supplier) = &def.instance_supplier {
            if explicit.map(|args| !args.is_empty()).unwrap_or(false) {
                return Err(BeanError::InvalidDefinition {
                    name: name.to_string(),
                    reason: "explicit arguments are not supported for supplier-backed beans".to_string(),
                });
            }
            return supplier(ctx).map_err(|e| BeanError::creation(name, e));
        }

        let explicit = match explicit {
            Some(values) => Explicit::Positional(values),
            None if !def.constructor_arguments.is_empty() => Explicit::Indexed(&def.constructor_arguments),
            None => Explicit::None,
        };

        if let Some(method) = &def.factory_method_name {
            return self.instantiate_using_factory_method(merged, method, explicit, ctx);
        }

        let class = def.class.as_ref().ok_or_else(|| BeanError::InvalidDefinition {
            name: name.to_string(),
            reason: "no class, factory method or instance supplier".to_string(),
        })?;
        let constructors: Vec<&Executable> = class.constructors.iter().collect();
        self.autowire_executable(name, &constructors, None, explicit, ctx)
    }

    fn instantiate_using_factory_method(
        &self,
        merged: &MergedDefinition,
        method: &str,
        explicit: Explicit<'_>,
        ctx: &ResolverContext<'_>,
    ) -> BeanResult<AnyArc> {
        let name = merged.name();
        let def = merged.definition();
        let invalid = |reason: String| BeanError::InvalidDefinition { name: name.to_string(), reason };

        let (target, class) = match &def.factory_bean_name {
            Some(bean) => {
                if crate::key::transformed_bean_name(bean) == name {
                    return Err(invalid("factory bean reference points back to the bean itself".to_string()));
                }
                let target = ctx.resolve_named(bean)?;
                let class = self
                    .class_of(bean)
                    .ok_or_else(|| invalid(format!("class of factory bean '{}' is unknown", bean)))?;
                (Some(target), class)
            }
            None => {
                let class = def
                    .class
                    .clone()
                    .ok_or_else(|| invalid(format!("static factory method '{}' needs a class", method)))?;
                (None, class)
            }
        };

        let executables: Vec<&Executable> = if target.is_some() {
            class.instance_factories_named(method).collect()
        } else {
            class.static_factories_named(method).collect()
        };
        if executables.is_empty() {
            return Err(invalid(format!(
                "no {} factory method '{}' declared by {}",
                if target.is_some() { "instance" } else { "static" },
                method,
                class.type_name()
            )));
        }
        self.autowire_executable(name, &executables, target.as_ref(), explicit, ctx)
    }

    /// Class of the object `name` resolves to (`&name` for the factory's own class).
    pub(crate) fn class_of(&self, name: &str) -> Option<std::sync::Arc<BeanClass>> {
        let deref = crate::key::is_factory_dereference(name);
        let canonical = self
            .inner
            .registry
            .canonical_name(crate::key::transformed_bean_name(name))
            .ok()?;
        match self.inner.merged.get(&canonical) {
            Some(merged) if deref => merged.bean_class().cloned(),
            Some(merged) => merged.object_class().cloned(),
            None => self.inner.parent.as_ref().and_then(|p| p.class_of(name)),
        }
    }

    /// Picks and invokes a constructor or factory method.
    ///
    /// A single required candidate is used exclusively. Otherwise autowire
    /// candidates are tried greediest first; a candidate whose dependencies are
    /// unsatisfied is skipped, any other failure aborts. The no-argument
    /// executable is the last resort.
    fn autowire_executable(
        &self,
        name: &str,
        executables: &[&Executable],
        target: Option<&AnyArc>,
        explicit: Explicit<'_>,
        ctx: &ResolverContext<'_>,
    ) -> BeanResult<AnyArc> {
        let required: Vec<&Executable> = executables.iter().copied().filter(|e| e.required).collect();
        if required.len() > 1 {
            return Err(BeanError::ConflictingConstructor { name: name.to_string() });
        }

        if let Explicit::Positional(values) = explicit {
            let exe = executables
                .iter()
                .find(|e| e.arity() == values.len())
                .ok_or_else(|| BeanError::NoUsableConstructor {
                    name: name.to_string(),
                    causes: vec![BeanError::InvalidDefinition {
                        name: name.to_string(),
                        reason: format!("no constructor or factory method takes {} argument(s)", values.len()),
                    }],
                })?;
            let args = exe
                .params
                .iter()
                .zip(values)
                .map(|(param, value)| self.resolve_value(value, param.expected_capability(), ctx))
                .collect::<BeanResult<Vec<_>>>()?;
            return self.invoke(name, exe, target, args, ctx);
        }

        let indexed = match explicit {
            Explicit::Indexed(map) => Some(map),
            _ => None,
        };
        let exclusive = required.len() == 1;
        let mut candidates: Vec<&Executable> = if exclusive {
            required
        } else {
            executables
                .iter()
                .copied()
                .filter(|e| e.autowire_candidate)
                .filter(|e| indexed.map_or(true, |m| m.keys().all(|i| *i < e.arity())))
                .collect()
        };
        candidates.sort_by_key(|e| Reverse(e.arity()));

        let mut causes = Vec::new();
        for exe in &candidates {
            match self.resolve_arguments(exe, indexed, ctx) {
                Ok(args) => return self.invoke(name, exe, target, args, ctx),
                Err(e) if !exclusive && e.is_unsatisfied() => {
                    tracing::trace!(bean = name, arity = exe.arity(), error = %e, "skipping unsatisfiable candidate");
                    causes.push(e);
                }
                Err(e) => return Err(e),
            }
        }

        if indexed.is_none() {
            let fallback = executables
                .iter()
                .find(|e| e.arity() == 0 && !candidates.iter().any(|c| std::ptr::eq(*c, **e)));
            if let Some(fallback) = fallback {
                return self.invoke(name, fallback, target, Vec::new(), ctx);
            }
        }
        Err(BeanError::NoUsableConstructor { name: name.to_string(), causes })
    }

    fn resolve_arguments(
        &self,
        exe: &Executable,
        indexed: Option<&BTreeMap<usize, Value>>,
        ctx: &ResolverContext<'_>,
    ) -> BeanResult<Vec<Injected>> {
        exe.params
            .iter()
            .enumerate()
            .map(|(index, param)| match indexed.and_then(|m| m.get(&index)) {
                Some(value) => self.resolve_value(value, param.expected_capability(), ctx),
                None => ctx.resolve_descriptor(param),
            })
            .collect()
    }

    fn resolve_value(
        &self,
        value: &Value,
        capability: Option<Capability>,
        ctx: &ResolverContext<'_>,
    ) -> BeanResult<Injected> {
        match value {
            Value::Literal(literal) => Ok(Injected::One(literal.clone())),
            Value::Ref(bean) => {
                let object = match capability {
                    Some(capability) => ctx.resolve_named_as(bean, &capability)?,
                    None => ctx.resolve_named(bean)?,
                };
                Ok(Injected::One(object))
            }
            Value::Descriptor(descriptor) => ctx.resolve_descriptor(descriptor),
        }
    }

    fn invoke(
        &self,
        name: &str,
        exe: &Executable,
        target: Option<&AnyArc>,
        values: Vec<Injected>,
        ctx: &ResolverContext<'_>,
    ) -> BeanResult<AnyArc> {
        let args = Args::new(values, ctx);
        (exe.invoke)(target, &args).map_err(|e| BeanError::creation(name, e))
    }

    /// Autowired properties first (unless an explicit value is given), then the
    /// definition's property values in order.
    fn populate(&self, merged: &MergedDefinition, raw: &AnyArc, ctx: &ResolverContext<'_>) -> BeanResult<()> {
        let name = merged.name();
        let def = merged.definition();
        let class = merged.bean_class();

        if let Some(class) = class {
            for property in &class.properties {
                let Some(descriptor) = &property.autowire else {
                    continue;
                };
                if def.property_values.iter().any(|(n, _)| *n == property.name) {
                    continue;
                }
                let mut descriptor = descriptor.clone();
                if descriptor.injection_name.is_none() {
                    descriptor.injection_name = Some(property.name.clone());
                }
                let value = ctx.resolve_descriptor(&descriptor)?;
                tracing::trace!(bean = name, property = %property.name, "autowiring property");
                (property.setter)(raw, value).map_err(|e| BeanError::creation(name, e))?;
            }
        }

        for (property_name, value) in &def.property_values {
            let property = class
                .and_then(|c| c.property(property_name))
                .ok_or_else(|| BeanError::InvalidDefinition {
                    name: name.to_string(),
                    reason: format!("property '{}' is not declared by the bean class", property_name),
                })?;
            let injected = self.resolve_value(value, property.capability, ctx)?;
            (property.setter)(raw, injected).map_err(|e| BeanError::creation(name, e))?;
        }
        Ok(())
    }

    fn register_destruction(&self, merged: &MergedDefinition, exposed: &AnyArc, raw: &AnyArc) -> BeanResult<()> {
        let Some(adapter) = DisposableBeanAdapter::for_bean(self, merged, exposed, raw)? else {
            return Ok(());
        };
        let name = merged.name();
        match merged.scope() {
            Scope::Singleton => self.inner.singletons.register_disposable(adapter),
            Scope::Prototype => {
                if self.inner.config.track_prototype_destruction {
                    self.inner
                        .prototypes
                        .lock()
                        .push(name, Box::new(move || adapter.destroy()));
                }
            }
            Scope::Custom(scope) => {
                self.scope_provider(scope, name)?
                    .register_destruction_callback(name, Box::new(move || adapter.destroy()));
            }
        }
        Ok(())
    }
}
