//! Definitions, factories and parameter bindings
//!
//! A [`Definition`] is the recipe stored under an id. The same shape is used
//! for parameter and method-argument bindings.

use crate::introspect::{Arguments, Parameter};
use crate::{Container, DiError, Instance, Result, Value};
use std::fmt;
use std::sync::Arc;

/// Zero-argument factory body
type NullaryFn = Arc<dyn Fn() -> Result<Value> + Send + Sync>;

/// Factory body that receives the container
type ContainerFn = Arc<dyn Fn(&Container) -> Result<Value> + Send + Sync>;

/// Factory body that receives resolved arguments
type ArgumentsFn = Arc<dyn Fn(&Container, Arguments) -> Result<Value> + Send + Sync>;

#[derive(Clone)]
pub(crate) enum FactoryBody {
    Nullary(NullaryFn),
    Container(ContainerFn),
    Arguments(ArgumentsFn),
}

/// A callable definition.
///
/// Factories declare their parameters so the resolver can decide what to
/// pass: nothing, the container, or resolved arguments.
///
/// # Examples
///
/// ```rust
/// use di_container::{Container, Factory};
///
/// let container = Container::new();
/// container.set("a_number", Factory::new(|| 101)).unwrap();
/// container
///     .set("doubled", Factory::with_container(|c| {
///         Ok(c.get("a_number")?.as_int().unwrap_or_default() * 2)
///     }))
///     .unwrap();
///
/// assert_eq!(container.get("doubled").unwrap().as_int(), Some(202));
/// ```
#[derive(Clone)]
pub struct Factory {
    params: Arc<[Parameter]>,
    pub(crate) body: FactoryBody,
}

impl Factory {
    /// Factory with no parameters; invoked with no arguments.
    pub fn new<V, F>(f: F) -> Self
    where
        V: Into<Value>,
        F: Fn() -> V + Send + Sync + 'static,
    {
        Self {
            params: Arc::from(Vec::new()),
            body: FactoryBody::Nullary(Arc::new(move || Ok(f().into()))),
        }
    }

    /// Fallible factory with no parameters.
    pub fn try_new<V, F>(f: F) -> Self
    where
        V: Into<Value>,
        F: Fn() -> Result<V> + Send + Sync + 'static,
    {
        Self {
            params: Arc::from(Vec::new()),
            body: FactoryBody::Nullary(Arc::new(move || f().map(Into::into))),
        }
    }

    /// Factory declaring a single parameter; receives the container.
    pub fn with_container<V, F>(f: F) -> Self
    where
        V: Into<Value>,
        F: Fn(&Container) -> Result<V> + Send + Sync + 'static,
    {
        Self {
            params: Arc::from(vec![Parameter::untyped("container")]),
            body: FactoryBody::Container(Arc::new(move |c| f(c).map(Into::into))),
        }
    }

    /// Factory declaring its own parameters; receives resolved arguments.
    ///
    /// Each parameter is resolved from the bindings supplied for the call,
    /// then from its declared type, then from its default.
    pub fn with_params<I, V, F>(params: I, f: F) -> Self
    where
        I: IntoIterator<Item = Parameter>,
        V: Into<Value>,
        F: Fn(&Container, Arguments) -> Result<V> + Send + Sync + 'static,
    {
        Self {
            params: params.into_iter().collect(),
            body: FactoryBody::Arguments(Arc::new(move |c, args| f(c, args).map(Into::into))),
        }
    }

    /// Declared parameters
    #[inline]
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Number of declared parameters
    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("params", &self.params)
            .finish()
    }
}

/// The recipe bound to an id, or to a single parameter.
#[derive(Clone, Debug)]
pub enum Definition {
    /// Name of a type known to the introspector
    Type(String),
    /// Callable producing the value
    Factory(Factory),
    /// Literal value returned as-is
    Value(Value),
    /// Pre-built object returned as-is
    Object(Instance),
}

impl Definition {
    /// Reference a type by name
    #[inline]
    pub fn of_type(name: impl Into<String>) -> Self {
        Definition::Type(name.into())
    }

    /// Wrap an object
    #[inline]
    pub fn object<T: std::any::Any + Send + Sync>(value: T) -> Self {
        Definition::Object(Instance::new(value))
    }

    #[inline]
    pub fn is_type(&self) -> bool {
        matches!(self, Definition::Type(_))
    }

    #[inline]
    pub fn is_factory(&self) -> bool {
        matches!(self, Definition::Factory(_))
    }

    /// Type name a bare definition registers under, if it has one.
    pub fn own_type_name(&self) -> Option<&str> {
        match self {
            Definition::Type(name) => Some(name),
            Definition::Object(instance) => Some(instance.type_name()),
            Definition::Value(Value::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn variant_name(&self) -> &'static str {
        match self {
            Definition::Type(_) => "type",
            Definition::Factory(_) => "factory",
            Definition::Value(_) => "value",
            Definition::Object(_) => "object",
        }
    }
}

impl From<Factory> for Definition {
    fn from(factory: Factory) -> Self {
        Definition::Factory(factory)
    }
}

impl From<Instance> for Definition {
    fn from(instance: Instance) -> Self {
        Definition::Object(instance)
    }
}

impl From<Value> for Definition {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(instance) => Definition::Object(instance),
            other => Definition::Value(other),
        }
    }
}

macro_rules! impl_definition_from_literal {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Definition {
                fn from(value: $ty) -> Self {
                    Definition::from(Value::from(value))
                }
            }
        )*
    };
}

impl_definition_from_literal!(
    (), bool, i8, i16, i32, i64, u8, u16, u32, isize, f32, f64, &str, String, Vec<Value>
);

// =============================================================================
// Bindings
// =============================================================================

/// Ordered parameter-name to [`Definition`] map.
///
/// Rebinding a name replaces its value in place.
#[derive(Clone, Debug, Default)]
pub struct Bindings {
    entries: Vec<(String, Definition)>,
}

impl Bindings {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a parameter, replacing any earlier binding of the same name
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Definition>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Chaining form of [`insert`](Self::insert)
    #[inline]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Definition>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Definition)> {
        self.entries.iter().map(|(n, d)| (n.as_str(), d))
    }
}

impl<K: Into<String>, V: Into<Definition>> FromIterator<(K, V)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bindings = Bindings::new();
        for (name, value) in iter {
            bindings.insert(name, value);
        }
        bindings
    }
}

/// Build [`Bindings`] from `name => value` pairs.
///
/// ```rust
/// use di_container::{bindings, Definition};
///
/// let args = bindings! {
///     "mailer" => Definition::of_type("Mailer"),
///     "name" => "admin",
///     "retries" => 3,
/// };
/// assert_eq!(args.len(), 3);
/// ```
#[macro_export]
macro_rules! bindings {
    () => {
        $crate::Bindings::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut bindings = $crate::Bindings::new();
        $(
            bindings.insert($name, $value);
        )+
        bindings
    }};
}

// =============================================================================
// Bulk entries
// =============================================================================

/// One entry of a bulk registration.
///
/// Applied in order: definition, then each parameter, then each method.
#[derive(Clone, Debug)]
pub struct DefinitionEntry {
    pub(crate) id: Option<String>,
    pub(crate) definition: Definition,
    pub(crate) params: Bindings,
    pub(crate) methods: Vec<(String, Bindings)>,
}

impl DefinitionEntry {
    /// Entry registered under the definition's own type name
    pub fn new(definition: impl Into<Definition>) -> Self {
        Self {
            id: None,
            definition: definition.into(),
            params: Bindings::new(),
            methods: Vec::new(),
        }
    }

    /// Entry registered under an explicit id
    pub fn with_id(id: impl Into<String>, definition: impl Into<Definition>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::new(definition)
        }
    }

    /// Bind a constructor parameter
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Definition>) -> Self {
        self.params.insert(name, value);
        self
    }

    /// Bind a method to call after construction
    pub fn method(mut self, name: impl Into<String>, args: Bindings) -> Self {
        self.methods.push((name.into(), args));
        self
    }

    /// Id this entry registers under
    pub(crate) fn resolved_id(&self) -> Result<String> {
        match &self.id {
            Some(id) => Ok(id.clone()),
            None => self
                .definition
                .own_type_name()
                .map(str::to_owned)
                .ok_or_else(|| {
                    DiError::InvalidArgument(format!(
                        "a {} definition without an id has no type name to register under",
                        self.definition.variant_name()
                    ))
                }),
        }
    }
}

impl From<Definition> for DefinitionEntry {
    fn from(definition: Definition) -> Self {
        DefinitionEntry::new(definition)
    }
}

impl<K: Into<String>, V: Into<Definition>> From<(K, V)> for DefinitionEntry {
    fn from((id, definition): (K, V)) -> Self {
        DefinitionEntry::with_id(id, definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_conversions() {
        assert!(matches!(Definition::from(123), Definition::Value(Value::Int(123))));
        assert!(matches!(Definition::from(""), Definition::Value(Value::Str(_))));
        assert!(matches!(
            Definition::from(Value::Null),
            Definition::Value(Value::Null)
        ));
        assert!(matches!(
            Definition::from(Value::object(5u8)),
            Definition::Object(_)
        ));
    }

    #[test]
    fn test_factory_arity() {
        assert_eq!(Factory::new(|| true).arity(), 0);
        assert_eq!(Factory::with_container(|_| Ok(true)).arity(), 1);
        let f = Factory::with_params(
            [Parameter::untyped("a"), Parameter::untyped("b")],
            |_, _| Ok(()),
        );
        assert_eq!(f.arity(), 2);
    }

    #[test]
    fn test_bindings_replace_in_place() {
        let args = bindings! {
            "length" => 10,
            "height" => 30,
            "length" => 40,
        };
        assert_eq!(args.len(), 2);
        let names: Vec<_> = args.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["length", "height"]);
        assert!(matches!(
            args.get("length"),
            Some(Definition::Value(Value::Int(40)))
        ));
    }

    #[test]
    fn test_entry_ids() {
        let entry = DefinitionEntry::new(Definition::of_type("Mailer"));
        assert_eq!(entry.resolved_id().unwrap(), "Mailer");

        let entry: DefinitionEntry = ("mailer", Definition::of_type("Mailer")).into();
        assert_eq!(entry.resolved_id().unwrap(), "mailer");

        let entry = DefinitionEntry::new(Factory::new(|| 1));
        assert!(matches!(
            entry.resolved_id(),
            Err(DiError::InvalidArgument(_))
        ));
    }
}
