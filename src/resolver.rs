//! Resolution engine
//!
//! Turns ids into values. Type definitions are built by resolving every
//! constructor parameter in declared order, then calling bound methods in
//! the order they were bound. Only type-backed results are cached.
//!
//! Each parameter is resolved by the first rule that applies:
//!
//! 1. a binding under the parameter's name, or under its declared type name
//!    (type names resolve, factories are invoked, anything else is used
//!    as-is)
//! 2. the declared class or interface type, resolved recursively
//! 3. the declared default
//!
//! Otherwise construction fails with [`DiError::MissingArgument`].

use crate::definition::{Bindings, Definition, Factory, FactoryBody};
use crate::introspect::{Arguments, Parameter, ParameterInfo};
use crate::{Container, DiError, Instance, Result, Value};
use std::sync::atomic::Ordering;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Whether a value built for an unknown id may be cached under it
#[derive(Clone, Copy, PartialEq, Eq)]
enum Policy {
    Shared,
    Fresh,
}

pub(crate) struct Resolver<'c> {
    container: &'c Container,
}

impl<'c> Resolver<'c> {
    #[inline]
    pub(crate) fn new(container: &'c Container) -> Self {
        Self { container }
    }

    /// Singleton policy: type-backed ids are built once and cached.
    pub(crate) fn resolve(&self, id: &str) -> Result<Value> {
        self.container.providers.ensure_booted(self.container)?;
        let store = &self.container.store;

        if let Some(cached) = store.cached(id) {
            #[cfg(feature = "logging")]
            trace!(
                target: "di_container",
                id = id,
                location = "cache",
                "Service resolved from singleton cache"
            );
            return Ok(Value::Object(cached));
        }

        let Some(definition) = store.definition(id) else {
            return self.resolve_unknown(id, Policy::Shared);
        };

        #[cfg(feature = "logging")]
        trace!(
            target: "di_container",
            id = id,
            definition = definition.variant_name(),
            "Resolving service (cache miss)"
        );

        match definition {
            Definition::Type(type_name) => {
                let instance = self.build(id, &type_name)?;
                Ok(Value::Object(store.cache(id, instance)))
            }
            Definition::Factory(factory) => self.invoke_factory(&factory, &store.params(id)),
            Definition::Value(value) => Ok(value),
            Definition::Object(instance) => Ok(Value::Object(instance)),
        }
    }

    /// Fresh policy: always constructs, never reads or writes the cache.
    pub(crate) fn make(&self, id: &str) -> Result<Value> {
        self.container.providers.ensure_booted(self.container)?;

        match self.container.store.definition(id) {
            None => self.resolve_unknown(id, Policy::Fresh),
            Some(Definition::Type(type_name)) => self.build(id, &type_name).map(Value::Object),
            Some(_) => {
                #[cfg(feature = "logging")]
                debug!(
                    target: "di_container",
                    id = id,
                    "make called on an id that is not bound to a type"
                );
                Err(DiError::NotConstructible { id: id.to_owned() })
            }
        }
    }

    /// Invoke `method` on the instance behind `id` with explicit arguments.
    pub(crate) fn call(&self, id: &str, method: &str, args: &Bindings) -> Result<Value> {
        // providers may define the id
        self.container.providers.ensure_booted(self.container)?;

        let type_name = match self.container.store.definition(id) {
            Some(Definition::Type(type_name)) => type_name,
            Some(_) => return Err(DiError::NotConstructible { id: id.to_owned() }),
            // autowired or platform type: the id is the type name
            None => id.to_owned(),
        };

        let target = self
            .resolve(id)?
            .into_instance()
            .ok_or_else(|| DiError::NotConstructible { id: id.to_owned() })?;

        self.invoke_method(&type_name, method, &target, args)
    }

    /// Invoke a factory definition with explicit arguments.
    pub(crate) fn call_function(&self, definition: &Definition, args: &Bindings) -> Result<Value> {
        match definition {
            Definition::Factory(factory) => self.invoke_factory(factory, args),
            _ => Err(DiError::NotCallable),
        }
    }

    /// Ids without a definition: platform types are built fresh every time,
    /// anything else needs autowiring.
    fn resolve_unknown(&self, id: &str, policy: Policy) -> Result<Value> {
        let types = &self.container.types;

        if types.type_exists(id) && !types.is_user_defined(id) {
            #[cfg(feature = "logging")]
            trace!(
                target: "di_container",
                id = id,
                "Constructing platform type"
            );

            let params = types.describe_constructor(id)?;
            let args = self.resolve_arguments(id, &params, &Bindings::new())?;
            return types.instantiate(id, args).map(Value::Object);
        }

        if self.container.autowiring.load(Ordering::Acquire) && types.type_exists(id) {
            #[cfg(feature = "logging")]
            debug!(
                target: "di_container",
                id = id,
                cached = policy == Policy::Shared,
                "Autowiring unregistered type"
            );

            let instance = self.build(id, id)?;
            let instance = match policy {
                Policy::Shared => self.container.store.cache(id, instance),
                Policy::Fresh => instance,
            };
            return Ok(Value::Object(instance));
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "di_container",
            id = id,
            autowiring = self.container.autowiring.load(Ordering::Relaxed),
            "Service not found in container"
        );

        Err(DiError::not_found(id))
    }

    /// Construct `type_name` with the bindings stored under `id`, then apply
    /// bound methods in order.
    fn build(&self, id: &str, type_name: &str) -> Result<Instance> {
        let store = &self.container.store;
        let types = &self.container.types;

        let params = types.describe_constructor(type_name)?;
        let args = self.resolve_arguments(type_name, &params, &store.params(id))?;
        let instance = types.instantiate(type_name, args)?;

        for (method, args) in store.methods(id) {
            self.invoke_method(type_name, &method, &instance, &args)?;
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "di_container",
            id = id,
            type_name = type_name,
            "Constructed service"
        );

        Ok(instance)
    }

    fn invoke_method(
        &self,
        type_name: &str,
        method: &str,
        target: &Instance,
        args: &Bindings,
    ) -> Result<Value> {
        let types = &self.container.types;
        let params = types.describe_method(type_name, method)?;
        let owner = format!("{type_name}::{method}");
        let args = self.resolve_arguments(&owner, &params, args)?;

        #[cfg(feature = "logging")]
        trace!(
            target: "di_container",
            method = owner.as_str(),
            arguments = args.len(),
            "Invoking method"
        );

        types.invoke(type_name, method, target, args)
    }

    /// A factory with no parameters gets nothing, one that asked for the
    /// container gets the container, any other gets resolved arguments.
    fn invoke_factory(&self, factory: &Factory, bindings: &Bindings) -> Result<Value> {
        match &factory.body {
            FactoryBody::Nullary(f) => f(),
            FactoryBody::Container(f) => f(self.container),
            FactoryBody::Arguments(f) => {
                let params: Vec<ParameterInfo> = factory.params().iter().map(Parameter::info).collect();
                let args = self.resolve_arguments("factory", &params, bindings)?;
                f(self.container, args)
            }
        }
    }

    fn resolve_arguments(
        &self,
        owner: &str,
        params: &[ParameterInfo],
        bindings: &Bindings,
    ) -> Result<Arguments> {
        let mut args = Arguments::new(owner);

        for param in params {
            // bindings made with the type-name shorthand are keyed by type
            let binding = bindings
                .get(&param.name)
                .or_else(|| param.class_name().and_then(|class| bindings.get(class)));

            let value = if let Some(binding) = binding {
                self.resolve_binding(binding)?
            } else if let Some(class) = param.class_name() {
                self.resolve(class)?
            } else if let Some(default) = &param.default {
                default.clone()
            } else {
                return Err(DiError::MissingArgument {
                    type_name: owner.to_owned(),
                    parameter: param.name.clone(),
                });
            };
            args.push(param.name.as_str(), value);
        }

        Ok(args)
    }

    /// Strings naming a known type are always resolved, never passed through.
    fn resolve_binding(&self, binding: &Definition) -> Result<Value> {
        match binding {
            Definition::Type(type_name) => self.resolve(type_name),
            Definition::Value(Value::Str(s)) if self.container.types.type_exists(s) => self.resolve(s),
            Definition::Factory(factory) => self.invoke_factory(factory, &Bindings::new()),
            Definition::Value(value) => Ok(value.clone()),
            Definition::Object(instance) => Ok(Value::Object(instance.clone())),
        }
    }
}
