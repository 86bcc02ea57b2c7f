//! String-keyed dependency injection container
//!
//! The `Container` maps ids to definitions and resolves them on demand.
//! Cloning a container is cheap and every clone shares the same state.

use crate::definition::{Bindings, Definition, DefinitionEntry};
use crate::introspect::{TypeIntrospector, TypeRegistry};
use crate::provider::{self, ProviderPhase, ProviderRef, ProviderRegistry};
use crate::resolver::Resolver;
use crate::storage::DefinitionStore;
use crate::{DiError, Result, Value};
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Dependency injection container.
///
/// Ids are non-empty strings: type names, interface names or arbitrary
/// aliases. `get` caches type-backed services per id, `make` always builds
/// a fresh instance.
///
/// # Examples
///
/// ```rust
/// use di_container::{Container, Instance, TypeDescriptor, TypeRegistry};
///
/// #[derive(Default)]
/// struct Mailer;
///
/// let types = TypeRegistry::new();
/// types.register(TypeDescriptor::builder::<Mailer>("Mailer").default_constructor().build());
///
/// let container = Container::with_types(types);
/// container.set("mailer", "Mailer").unwrap();
///
/// let a = container.get("mailer").unwrap();
/// let b = container.get("mailer").unwrap();
/// assert_eq!(a, b);
///
/// let fresh = container.make("mailer").unwrap();
/// assert_ne!(a, fresh);
/// ```
#[derive(Clone)]
pub struct Container {
    /// Definitions, bindings and singleton cache
    pub(crate) store: Arc<DefinitionStore>,
    /// Reflection backend
    pub(crate) types: Arc<dyn TypeIntrospector>,
    /// Deferred providers and their lifecycle
    pub(crate) providers: Arc<ProviderRegistry>,
    /// Autowiring switch, never turned off once on
    pub(crate) autowiring: Arc<AtomicBool>,
    /// Target of `set_param`/`set_method`
    last_id: Arc<Mutex<Option<String>>>,
}

impl Container {
    /// Create a container that knows only the platform types.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use di_container::Container;
    /// let container = Container::new();
    /// ```
    #[inline]
    pub fn new() -> Self {
        Self::with_types(TypeRegistry::new())
    }

    /// Create a container backed by a custom introspector.
    pub fn with_types<T: TypeIntrospector + 'static>(types: T) -> Self {
        Self::with_shared_types(Arc::new(types))
    }

    /// Create a container sharing an introspector with other containers.
    pub fn with_shared_types(types: Arc<dyn TypeIntrospector>) -> Self {
        #[cfg(feature = "logging")]
        debug!(
            target: "di_container",
            "Creating new DI container"
        );

        Self {
            store: Arc::new(DefinitionStore::new()),
            types,
            providers: Arc::new(ProviderRegistry::new()),
            autowiring: Arc::new(AtomicBool::new(false)),
            last_id: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a container and apply a bulk definition list.
    ///
    /// Entries follow the rules of [`set_all`](Self::set_all).
    pub fn with_definitions<T, I, E>(types: T, entries: I) -> Result<Self>
    where
        T: TypeIntrospector + 'static,
        I: IntoIterator<Item = E>,
        E: Into<DefinitionEntry>,
    {
        let container = Self::with_types(types);
        container.set_all(entries)?;
        Ok(container)
    }

    /// The introspector backing this container
    #[inline]
    pub fn types(&self) -> &dyn TypeIntrospector {
        self.types.as_ref()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Bind `id` to a definition.
    ///
    /// A string naming a known type becomes a type reference; any other value
    /// is stored as a literal. Re-binding an id drops its cached instance.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use di_container::{Container, Factory, Value};
    ///
    /// let container = Container::new();
    /// container.set("debug", false).unwrap();
    /// container.set("retries", 3).unwrap();
    /// container.set("token", Factory::new(|| "secret")).unwrap();
    ///
    /// assert_eq!(container.get("debug").unwrap(), Value::Bool(false));
    /// assert_eq!(container.get("token").unwrap().as_str(), Some("secret"));
    /// ```
    pub fn set(&self, id: &str, definition: impl Into<Definition>) -> Result<&Self> {
        validate_id(id)?;
        let definition = self.normalize(definition.into())?;

        #[cfg(feature = "logging")]
        debug!(
            target: "di_container",
            id = id,
            definition = definition.variant_name(),
            "Registering definition"
        );

        self.store.set(id, definition);
        *self.cursor() = Some(id.to_owned());
        Ok(self)
    }

    /// Bind a type under its own name.
    pub fn set_type(&self, type_name: &str) -> Result<&Self> {
        validate_id(type_name)?;
        if !self.types.type_exists(type_name) {
            return Err(DiError::invalid_definition(format!(
                "\"{type_name}\" is not a known type"
            )));
        }
        self.set(type_name, Definition::of_type(type_name))
    }

    /// Apply a list of entries in order.
    ///
    /// Entries without an id register under their definition's own type
    /// name. Each entry is applied as definition, then parameters, then
    /// methods.
    pub fn set_all<I, E>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = E>,
        E: Into<DefinitionEntry>,
    {
        for entry in entries {
            let entry = entry.into();
            let id = entry.resolved_id()?;

            match entry.definition {
                // a bare string must name a type, as with `set_type`
                Definition::Value(Value::Str(ref name)) if entry.id.is_none() => {
                    self.set_type(name)?;
                }
                definition => {
                    self.set(&id, definition)?;
                }
            }
            for (name, value) in entry.params.iter() {
                self.store.bind_parameter(&id, name, value.clone())?;
            }
            for (method, args) in entry.methods {
                self.store.bind_method(&id, &method, args)?;
            }
        }
        Ok(())
    }

    /// Bind a parameter of the most recently `set` id.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use di_container::{Container, Parameter, TypeDescriptor, TypeRegistry};
    ///
    /// struct Point { x: i64, y: i64 }
    ///
    /// let types = TypeRegistry::new();
    /// types.register(
    ///     TypeDescriptor::builder::<Point>("Point")
    ///         .constructor(
    ///             [Parameter::primitive("x", "int"), Parameter::primitive("y", "int").with_default(0)],
    ///             |args| Ok(Point { x: args.get("x")?, y: args.get("y")? }),
    ///         )
    ///         .build(),
    /// );
    ///
    /// let container = Container::with_types(types);
    /// container.set_type("Point").unwrap().set_param("x", 4).unwrap();
    ///
    /// let point = container.get_as::<Point>("Point").unwrap();
    /// assert_eq!((point.x, point.y), (4, 0));
    /// ```
    pub fn set_param(&self, name: &str, value: impl Into<Definition>) -> Result<&Self> {
        let id = self.current_id()?;
        let value = value.into();

        #[cfg(feature = "logging")]
        trace!(
            target: "di_container",
            id = id.as_str(),
            parameter = name,
            binding = value.variant_name(),
            "Binding parameter"
        );

        self.store.bind_parameter(&id, name, value)?;
        Ok(self)
    }

    /// Bind a parameter by type name alone.
    ///
    /// Equivalent to binding the parameter declared with that type to the
    /// type itself.
    pub fn set_param_type(&self, type_name: &str) -> Result<&Self> {
        let id = self.current_id()?;
        if !self.types.type_exists(type_name) {
            return Err(DiError::invalid_binding(
                id,
                format!("\"{type_name}\" is not a known type"),
            ));
        }
        self.set_param(type_name, Definition::of_type(type_name))
    }

    /// Call `method` after constructing the most recently `set` id.
    ///
    /// Parameters missing from `args` are resolved by declared type or
    /// default.
    pub fn set_method(&self, method: &str, args: Bindings) -> Result<&Self> {
        let id = self.current_id()?;

        #[cfg(feature = "logging")]
        trace!(
            target: "di_container",
            id = id.as_str(),
            method = method,
            arguments = args.len(),
            "Binding method"
        );

        self.store.bind_method(&id, method, args)?;
        Ok(self)
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Check if an id has a definition
    #[inline]
    pub fn has(&self, id: &str) -> bool {
        self.store.contains(id)
    }

    /// Resolve an id, sharing type-backed instances.
    ///
    /// Runs pending service providers first. Unknown ids fail with
    /// [`DiError::NotFound`] unless they name a platform type or autowiring
    /// is on.
    pub fn get(&self, id: &str) -> Result<Value> {
        Resolver::new(self).resolve(id)
    }

    /// Resolve an id and downcast the object to `T`.
    pub fn get_as<T: Any + Send + Sync>(&self, id: &str) -> Result<Arc<T>> {
        downcast(self.get(id)?)
    }

    /// Build a fresh instance of a type-backed id.
    ///
    /// Fails with [`DiError::NotConstructible`] if `id` is bound to anything
    /// other than a type.
    pub fn make(&self, id: &str) -> Result<Value> {
        Resolver::new(self).make(id)
    }

    /// Build a fresh instance and downcast it to `T`.
    pub fn make_as<T: Any + Send + Sync>(&self, id: &str) -> Result<Arc<T>> {
        downcast(self.make(id)?)
    }

    /// Invoke a method on the service behind `id`.
    ///
    /// Only `args` are used for the method's parameters, not the bindings
    /// registered with [`set_method`](Self::set_method).
    pub fn call(&self, id: &str, method: &str, args: Bindings) -> Result<Value> {
        Resolver::new(self).call(id, method, &args)
    }

    /// Invoke a factory with explicit arguments.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use di_container::{bindings, Container, Factory, Parameter};
    ///
    /// let container = Container::new();
    /// let sum = Factory::with_params(
    ///     [Parameter::primitive("a", "int"), Parameter::primitive("b", "int").with_default(1)],
    ///     |_, args| Ok(args.get::<i64>("a")? + args.get::<i64>("b")?),
    /// );
    ///
    /// let value = container.call_function(sum, bindings! { "a" => 41 }).unwrap();
    /// assert_eq!(value.as_int(), Some(42));
    /// ```
    pub fn call_function(&self, function: impl Into<Definition>, args: Bindings) -> Result<Value> {
        Resolver::new(self).call_function(&function.into(), &args)
    }

    // =========================================================================
    // Providers
    // =========================================================================

    /// Add a service provider.
    ///
    /// Named providers must be user-defined types whose descriptor exposes
    /// the [`ServiceProvider`](crate::ServiceProvider) capability.
    pub fn register_provider(&self, provider: impl Into<ProviderRef>) -> Result<&Self> {
        let provider = match provider.into() {
            ProviderRef::Instance(provider) => provider,
            ProviderRef::Named(name) => provider::instantiate_named(self, &name)?,
        };
        self.providers.push(provider);
        Ok(self)
    }

    /// Add several providers in order, stopping at the first failure.
    pub fn register_providers<I, P>(&self, providers: I) -> Result<&Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<ProviderRef>,
    {
        let providers: Vec<ProviderRef> = providers.into_iter().map(Into::into).collect();
        if providers.is_empty() {
            return Err(DiError::InvalidArgument(
                "register_providers expects a non-empty list".into(),
            ));
        }
        for provider in providers {
            self.register_provider(provider)?;
        }
        Ok(self)
    }

    /// Number of registered providers
    #[inline]
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Where the provider lifecycle currently stands
    #[inline]
    pub fn provider_phase(&self) -> ProviderPhase {
        self.providers.phase()
    }

    // =========================================================================
    // Configuration and inspection
    // =========================================================================

    /// Enable autowiring for the rest of this container's lifetime.
    pub fn autowire(&self) -> &Self {
        self.autowiring.store(true, Ordering::Release);

        #[cfg(feature = "logging")]
        debug!(
            target: "di_container",
            "Autowiring enabled"
        );

        self
    }

    /// Check if autowiring is on
    #[inline]
    pub fn is_autowiring(&self) -> bool {
        self.autowiring.load(Ordering::Acquire)
    }

    /// Get number of definitions
    #[inline]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// All defined ids, unordered
    pub fn ids(&self) -> Vec<String> {
        self.store.ids()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Strings naming a type become type references; type references must
    /// name a known type.
    fn normalize(&self, definition: Definition) -> Result<Definition> {
        match definition {
            Definition::Type(name) if !self.types.type_exists(&name) => Err(
                DiError::invalid_definition(format!("\"{name}\" is not a known type")),
            ),
            Definition::Value(Value::Str(s)) if self.types.type_exists(&s) => {
                Ok(Definition::Type(s))
            }
            other => Ok(other),
        }
    }

    fn cursor(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.last_id.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_id(&self) -> Result<String> {
        self.cursor().clone().ok_or(DiError::NoDefinitionSelected)
    }
}

fn validate_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(DiError::InvalidId);
    }
    Ok(())
}

fn downcast<T: Any + Send + Sync>(value: Value) -> Result<Arc<T>> {
    value.downcast::<T>().ok_or_else(|| DiError::TypeMismatch {
        expected: std::any::type_name::<T>().to_owned(),
        found: match &value {
            Value::Object(instance) => instance.type_name().to_owned(),
            other => other.kind_name().to_owned(),
        },
    })
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("definitions", &self.len())
            .field("providers", &self.providers)
            .field("autowiring", &self.is_autowiring())
            .finish()
    }
}
