//! Type introspection
//!
//! The resolver never touches concrete types directly. It asks a
//! [`TypeIntrospector`] whether a type exists, what its constructor and
//! methods declare, and to instantiate or invoke on its behalf.
//!
//! [`TypeRegistry`] is the built-in introspector: a runtime table of
//! [`TypeDescriptor`]s, written by hand with [`DescriptorBuilder`] or
//! generated with `#[derive(Component)]`.
//!
//! # Example
//!
//! ```rust
//! use di_container::{Container, Definition, Parameter, TypeDescriptor, TypeRegistry};
//!
//! struct Greeting {
//!     text: String,
//! }
//!
//! let types = TypeRegistry::new();
//! types.register(
//!     TypeDescriptor::builder::<Greeting>("Greeting")
//!         .constructor([Parameter::primitive("text", "string").with_default("hello")], |args| {
//!             Ok(Greeting { text: args.get("text")? })
//!         })
//!         .build(),
//! );
//!
//! let container = Container::with_types(types);
//! container.set_type("Greeting").unwrap();
//!
//! let greeting = container.get("Greeting").unwrap();
//! assert_eq!(greeting.downcast::<Greeting>().unwrap().text, "hello");
//! ```

use crate::provider::ServiceProvider;
use crate::{DiError, FromValue, Instance, Result, Value};
use ahash::RandomState;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

// =============================================================================
// Parameters
// =============================================================================

/// Declared type of a parameter
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeclaredType {
    /// No declared type
    Untyped,
    /// Built-in scalar such as `int` or `string`
    Primitive(String),
    /// Class or interface name
    Named(String),
    /// `A|B` - only the first constituent is ever resolved
    Union(Vec<String>),
    /// `A&B` - only the first constituent is ever resolved
    Intersection(Vec<String>),
}

/// A declared constructor, method or factory parameter
#[derive(Clone, Debug)]
pub struct Parameter {
    name: String,
    ty: DeclaredType,
    default: Option<Value>,
}

impl Parameter {
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: DeclaredType::Untyped,
            default: None,
        }
    }

    pub fn primitive(name: impl Into<String>, primitive: impl Into<String>) -> Self {
        Self {
            ty: DeclaredType::Primitive(primitive.into()),
            ..Self::untyped(name)
        }
    }

    /// Parameter declared with a class or interface type
    pub fn typed(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            ty: DeclaredType::Named(type_name.into()),
            ..Self::untyped(name)
        }
    }

    pub fn union<I, S>(name: impl Into<String>, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ty: DeclaredType::Union(types.into_iter().map(Into::into).collect()),
            ..Self::untyped(name)
        }
    }

    pub fn intersection<I, S>(name: impl Into<String>, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ty: DeclaredType::Intersection(types.into_iter().map(Into::into).collect()),
            ..Self::untyped(name)
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn declared_type(&self) -> &DeclaredType {
        &self.ty
    }

    #[inline]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Flatten into the shape the resolver consumes.
    pub fn info(&self) -> ParameterInfo {
        let (type_name, builtin) = match &self.ty {
            DeclaredType::Untyped => (None, false),
            DeclaredType::Primitive(p) => (Some(p.clone()), true),
            DeclaredType::Named(n) => (Some(n.clone()), false),
            DeclaredType::Union(types) | DeclaredType::Intersection(types) => {
                (types.first().cloned(), false)
            }
        };
        ParameterInfo {
            name: self.name.clone(),
            type_name,
            builtin,
            default: self.default.clone(),
        }
    }
}

/// Introspected view of one parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterInfo {
    pub name: String,
    /// Declared type; the first constituent for unions and intersections
    pub type_name: Option<String>,
    /// True when the declared type is a primitive
    pub builtin: bool,
    pub default: Option<Value>,
}

impl ParameterInfo {
    /// Class or interface name the resolver should look up, if any
    #[inline]
    pub fn class_name(&self) -> Option<&str> {
        match (&self.type_name, self.builtin) {
            (Some(name), false) => Some(name),
            _ => None,
        }
    }

    #[inline]
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

// =============================================================================
// Arguments
// =============================================================================

/// Resolved arguments, in declaration order.
#[derive(Clone, Debug, Default)]
pub struct Arguments {
    owner: String,
    values: Vec<(String, Value)>,
}

impl Arguments {
    /// Empty argument list for `owner` (used in error messages)
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            values: Vec::new(),
        }
    }

    /// Append an argument
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.values.push((name.into(), value));
    }

    /// Chaining form of [`push`](Self::push)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value.into());
        self
    }

    /// Raw argument by name
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Typed argument by name
    pub fn get<T: FromValue>(&self, name: &str) -> Result<T> {
        let value = self.value(name).cloned().ok_or_else(|| DiError::MissingArgument {
            type_name: self.owner.clone(),
            parameter: name.to_owned(),
        })?;
        T::try_from_value(value).map_err(|e| {
            DiError::creation_failed(&self.owner, format!("parameter `{name}`: {e}"))
        })
    }

    /// Raw argument by position
    pub fn at(&self, index: usize) -> Option<&Value> {
        self.values.get(index).map(|(_, v)| v)
    }

    #[inline]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }
}

// =============================================================================
// Introspector trait
// =============================================================================

/// Reflection capability the resolver relies on.
///
/// Implementations must be cheap to call repeatedly; the resolver queries
/// them on every construction.
pub trait TypeIntrospector: Send + Sync {
    /// Does a type with this name exist?
    fn type_exists(&self, name: &str) -> bool;

    /// False for platform/built-in types
    fn is_user_defined(&self, name: &str) -> bool;

    /// Ordered constructor parameters; empty when there is no constructor
    fn describe_constructor(&self, name: &str) -> Result<Vec<ParameterInfo>>;

    /// Ordered parameters of a method
    fn describe_method(&self, name: &str, method: &str) -> Result<Vec<ParameterInfo>>;

    /// Run the constructor with fully resolved arguments
    fn instantiate(&self, name: &str, args: Arguments) -> Result<Instance>;

    /// Invoke a method on an instance of the named type
    fn invoke(&self, name: &str, method: &str, target: &Instance, args: Arguments) -> Result<Value>;

    /// Provider capability of the named type, instantiated
    fn service_provider(&self, name: &str) -> Result<Option<Arc<dyn ServiceProvider>>>;
}

// =============================================================================
// Descriptors
// =============================================================================

type ConstructFn = Arc<dyn Fn(Arguments) -> Result<Instance> + Send + Sync>;
type MethodFn = Arc<dyn Fn(&Instance, Arguments) -> Result<Value> + Send + Sync>;
type ProviderCast = Arc<dyn Fn(&Instance) -> Option<Arc<dyn ServiceProvider>> + Send + Sync>;

#[derive(Clone)]
struct Callable<F> {
    params: Arc<[Parameter]>,
    call: F,
}

impl<F> Callable<F> {
    fn infos(&self) -> Vec<ParameterInfo> {
        self.params.iter().map(Parameter::info).collect()
    }
}

/// Everything the registry knows about one type.
#[derive(Clone)]
pub struct TypeDescriptor {
    name: String,
    user_defined: bool,
    constructor: Option<Callable<ConstructFn>>,
    methods: HashMap<String, Callable<MethodFn>>,
    provider: Option<ProviderCast>,
}

impl TypeDescriptor {
    /// Start describing the Rust type `T` under `name`.
    pub fn builder<T: Any + Send + Sync>(name: impl Into<String>) -> DescriptorBuilder<T> {
        DescriptorBuilder {
            descriptor: TypeDescriptor {
                name: name.into(),
                user_defined: true,
                constructor: None,
                methods: HashMap::new(),
                provider: None,
            },
            _marker: PhantomData,
        }
    }

    /// A type that exists but cannot be instantiated (an interface name).
    pub fn interface(name: impl Into<String>) -> Self {
        TypeDescriptor {
            name: name.into(),
            user_defined: true,
            constructor: None,
            methods: HashMap::new(),
            provider: None,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn is_user_defined(&self) -> bool {
        self.user_defined
    }

    #[inline]
    pub fn is_instantiable(&self) -> bool {
        self.constructor.is_some()
    }

    pub fn has_method(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<_> = self.methods.keys().collect();
        methods.sort();
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("user_defined", &self.user_defined)
            .field("instantiable", &self.is_instantiable())
            .field("methods", &methods)
            .finish()
    }
}

/// Typed builder for [`TypeDescriptor`].
pub struct DescriptorBuilder<T> {
    descriptor: TypeDescriptor,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> DescriptorBuilder<T> {
    /// Constructor taking resolved arguments
    pub fn constructor<I, F>(mut self, params: I, f: F) -> Self
    where
        I: IntoIterator<Item = Parameter>,
        F: Fn(Arguments) -> Result<T> + Send + Sync + 'static,
    {
        let name: Arc<str> = Arc::from(self.descriptor.name.as_str());
        let call: ConstructFn = Arc::new(move |args| {
            let value = f(args)?;
            Ok(Instance::named(Arc::clone(&name), value))
        });
        self.descriptor.constructor = Some(Callable {
            params: params.into_iter().collect(),
            call,
        });
        self
    }

    /// Constructor without parameters
    pub fn construct_with<F>(self, f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.constructor([], move |_| Ok(f()))
    }

    /// Constructor without parameters, via `Default`
    pub fn default_constructor(self) -> Self
    where
        T: Default,
    {
        self.construct_with(T::default)
    }

    /// Method callable through bound methods or `Container::call`
    pub fn method<I, R, F>(mut self, method: impl Into<String>, params: I, f: F) -> Self
    where
        I: IntoIterator<Item = Parameter>,
        R: Into<Value>,
        F: Fn(&T, Arguments) -> Result<R> + Send + Sync + 'static,
    {
        let method = method.into();
        let type_name = self.descriptor.name.clone();
        let call: MethodFn = Arc::new(move |target, args| {
            let this = target
                .downcast_ref::<T>()
                .ok_or_else(|| DiError::TypeMismatch {
                    expected: type_name.clone(),
                    found: target.type_name().to_owned(),
                })?;
            f(this, args).map(Into::into)
        });
        self.descriptor.methods.insert(
            method,
            Callable {
                params: params.into_iter().collect(),
                call,
            },
        );
        self
    }

    /// Mark as a platform (non user-defined) type
    pub fn platform(mut self) -> Self {
        self.descriptor.user_defined = false;
        self
    }

    /// Expose the type's [`ServiceProvider`] implementation
    pub fn service_provider(mut self) -> Self
    where
        T: ServiceProvider,
    {
        self.descriptor.provider = Some(Arc::new(|instance: &Instance| {
            instance
                .downcast::<T>()
                .map(|provider| provider as Arc<dyn ServiceProvider>)
        }));
        self
    }

    pub fn build(self) -> TypeDescriptor {
        self.descriptor
    }
}

/// Types that describe themselves, typically via `#[derive(Component)]`.
pub trait Component: Any + Send + Sync + Sized {
    /// Descriptor builder, open for adding methods before registration
    fn describe() -> DescriptorBuilder<Self>;
}

// =============================================================================
// Platform types
// =============================================================================

/// Platform error object, constructible without any registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exception {
    message: String,
}

impl Exception {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Exception {}

static PLATFORM_TYPES: Lazy<Vec<TypeDescriptor>> = Lazy::new(|| {
    vec![
        TypeDescriptor::builder::<Exception>("Exception")
            .constructor(
                [Parameter::primitive("message", "string").with_default("")],
                |args| Ok(Exception::new(args.get::<String>("message")?)),
            )
            .method("getMessage", [], |this: &Exception, _| {
                Ok(this.message().to_owned())
            })
            .platform()
            .build(),
    ]
});

// =============================================================================
// Registry
// =============================================================================

/// Runtime table of type descriptors.
///
/// # Examples
///
/// ```rust
/// use di_container::{TypeDescriptor, TypeIntrospector, TypeRegistry};
///
/// #[derive(Default)]
/// struct Mailer;
///
/// let types = TypeRegistry::new();
/// types.register(TypeDescriptor::builder::<Mailer>("Mailer").default_constructor().build());
///
/// assert!(types.type_exists("Mailer"));
/// assert!(types.is_user_defined("Mailer"));
/// assert!(!types.is_user_defined("Exception"));
/// ```
pub struct TypeRegistry {
    types: DashMap<String, TypeDescriptor, RandomState>,
}

impl TypeRegistry {
    /// Registry holding only the platform types
    pub fn new() -> Self {
        let registry = Self::empty();
        for descriptor in PLATFORM_TYPES.iter() {
            registry.register(descriptor.clone());
        }
        registry
    }

    /// Registry without any types, platform ones included
    pub fn empty() -> Self {
        Self {
            types: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Add or replace a descriptor
    pub fn register(&self, descriptor: TypeDescriptor) -> &Self {
        #[cfg(feature = "logging")]
        trace!(
            target: "di_container",
            type_name = descriptor.name(),
            user_defined = descriptor.is_user_defined(),
            "Registering type descriptor"
        );

        self.types.insert(descriptor.name.clone(), descriptor);
        self
    }

    /// Register a [`Component`]
    pub fn register_component<T: Component>(&self) -> &Self {
        self.register(T::describe().build())
    }

    /// Clone of a registered descriptor
    pub fn descriptor(&self, name: &str) -> Option<TypeDescriptor> {
        self.types.get(name).map(|d| d.value().clone())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn constructor(&self, name: &str) -> Result<Option<Callable<ConstructFn>>> {
        self.types
            .get(name)
            .map(|d| d.constructor.clone())
            .ok_or_else(|| DiError::UnknownType { name: name.into() })
    }

    fn method(&self, name: &str, method: &str) -> Result<Callable<MethodFn>> {
        let descriptor = self
            .types
            .get(name)
            .ok_or_else(|| DiError::UnknownType { name: name.into() })?;
        descriptor
            .methods
            .get(method)
            .cloned()
            .ok_or_else(|| DiError::UnknownMethod {
                type_name: name.into(),
                method: method.into(),
            })
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("count", &self.len())
            .finish()
    }
}

impl TypeIntrospector for TypeRegistry {
    fn type_exists(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    fn is_user_defined(&self, name: &str) -> bool {
        self.types.get(name).is_some_and(|d| d.user_defined)
    }

    fn describe_constructor(&self, name: &str) -> Result<Vec<ParameterInfo>> {
        Ok(self
            .constructor(name)?
            .map(|ctor| ctor.infos())
            .unwrap_or_default())
    }

    fn describe_method(&self, name: &str, method: &str) -> Result<Vec<ParameterInfo>> {
        Ok(self.method(name, method)?.infos())
    }

    fn instantiate(&self, name: &str, args: Arguments) -> Result<Instance> {
        let ctor = self.constructor(name)?.ok_or_else(|| {
            DiError::creation_failed(name, "type cannot be instantiated (no constructor)")
        })?;
        (ctor.call)(args)
    }

    fn invoke(&self, name: &str, method: &str, target: &Instance, args: Arguments) -> Result<Value> {
        let method = self.method(name, method)?;
        (method.call)(target, args)
    }

    fn service_provider(&self, name: &str) -> Result<Option<Arc<dyn ServiceProvider>>> {
        let cast = match self.types.get(name) {
            Some(d) => d.provider.clone(),
            None => return Err(DiError::UnknownType { name: name.into() }),
        };
        let Some(cast) = cast else {
            return Ok(None);
        };
        let instance = self.instantiate(name, Arguments::new(name))?;
        Ok(cast(&instance))
    }
}
