//! Dynamic values handled by the container
//!
//! Definitions, bindings and resolved services all travel as [`Value`]s.
//! Constructed objects are held as [`Instance`]s: shared, type-erased
//! pointers that remember the name they were registered under.

use crate::{DiError, Result};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A shared, type-erased object.
///
/// Cloning an `Instance` clones the pointer, never the object, so two clones
/// are identity-equal (see [`Instance::ptr_eq`]).
#[derive(Clone)]
pub struct Instance {
    type_name: Arc<str>,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    /// Wrap a value, naming it after its Rust type.
    #[inline]
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wrap an existing `Arc`.
    #[inline]
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            type_name: Arc::from(std::any::type_name::<T>()),
            inner: value,
        }
    }

    /// Wrap a value under an explicit type name.
    #[inline]
    pub fn named<T: Any + Send + Sync>(type_name: impl Into<Arc<str>>, value: T) -> Self {
        Self {
            type_name: type_name.into(),
            inner: Arc::new(value),
        }
    }

    /// Name of the type this instance was created as
    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Check the concrete Rust type
    #[inline]
    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// Downcast to the concrete Rust type
    #[inline]
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).downcast::<T>().ok()
    }

    /// Borrow as the concrete Rust type
    #[inline]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Identity comparison
    #[inline]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Any value the container can store, bind or return.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Object(Instance),
}

impl Value {
    /// Wrap any object
    #[inline]
    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        Value::Object(Instance::new(value))
    }

    /// Short name of the variant, used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Object(_) => "object",
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Ints widen to floats
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Object(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn into_instance(self) -> Option<Instance> {
        match self {
            Value::Object(instance) => Some(instance),
            _ => None,
        }
    }

    /// Downcast an object value to its concrete Rust type
    #[inline]
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.as_instance().and_then(Instance::downcast::<T>)
    }
}

/// Objects compare by identity, everything else by value.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Instance::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Int(value as i64)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32, isize);

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value as f64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl From<Instance> for Value {
    fn from(instance: Instance) -> Self {
        Value::Object(instance)
    }
}

// =============================================================================
// Typed extraction
// =============================================================================

/// Conversion out of a [`Value`], used by [`Arguments::get`](crate::Arguments::get).
pub trait FromValue: Sized {
    /// Name of the expected shape, for error messages
    fn expected() -> String;

    /// Convert, or `None` when the value has the wrong shape
    fn from_value(value: Value) -> Option<Self>;

    /// Convert, reporting a [`DiError::TypeMismatch`] on failure
    fn try_from_value(value: Value) -> Result<Self> {
        let found = value.kind_name().to_owned();
        Self::from_value(value).ok_or_else(|| DiError::TypeMismatch {
            expected: Self::expected(),
            found,
        })
    }
}

impl FromValue for Value {
    fn expected() -> String {
        "any value".into()
    }

    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }
}

impl FromValue for Instance {
    fn expected() -> String {
        "object".into()
    }

    fn from_value(value: Value) -> Option<Self> {
        value.into_instance()
    }
}

impl FromValue for bool {
    fn expected() -> String {
        "bool".into()
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromValue for String {
    fn expected() -> String {
        "string".into()
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    fn expected() -> String {
        "float".into()
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_float()
    }
}

impl FromValue for f32 {
    fn expected() -> String {
        "float".into()
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_float().map(|f| f as f32)
    }
}

macro_rules! impl_from_value_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn expected() -> String {
                    "int".into()
                }

                fn from_value(value: Value) -> Option<Self> {
                    value.as_int().and_then(|i| <$ty>::try_from(i).ok())
                }
            }
        )*
    };
}

impl_from_value_int!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

impl<T: FromValue> FromValue for Option<T> {
    fn expected() -> String {
        format!("optional {}", T::expected())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: Any + Send + Sync> FromValue for Arc<T> {
    fn expected() -> String {
        std::any::type_name::<T>().to_owned()
    }

    fn from_value(value: Value) -> Option<Self> {
        value.downcast::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe {
        id: u32,
    }

    #[test]
    fn test_instance_identity() {
        let a = Instance::new(Probe { id: 1 });
        let b = a.clone();
        let c = Instance::new(Probe { id: 1 });

        assert!(Instance::ptr_eq(&a, &b));
        assert!(!Instance::ptr_eq(&a, &c));
        assert_eq!(Value::Object(a.clone()), Value::Object(b));
        assert_ne!(Value::Object(a), Value::Object(c));
    }

    #[test]
    fn test_instance_downcast() {
        let instance = Instance::named("Probe", Probe { id: 7 });
        assert_eq!(instance.type_name(), "Probe");
        assert!(instance.is::<Probe>());
        assert_eq!(instance.downcast::<Probe>().unwrap().id, 7);
        assert!(instance.downcast::<String>().is_none());
    }

    #[test]
    fn test_from_value_conversions() {
        assert_eq!(i64::try_from_value(Value::from(30)).unwrap(), 30);
        assert_eq!(f64::try_from_value(Value::from(2)).unwrap(), 2.0);
        assert_eq!(
            String::try_from_value(Value::from("admin")).unwrap(),
            "admin"
        );
        assert_eq!(Option::<i64>::try_from_value(Value::Null).unwrap(), None);
        assert!(u8::try_from_value(Value::from(300)).is_err());
    }

    #[test]
    fn test_type_mismatch_reports_shapes() {
        let err = bool::try_from_value(Value::from("yes")).unwrap_err();
        match err {
            DiError::TypeMismatch { expected, found } => {
                assert_eq!(expected, "bool");
                assert_eq!(found, "string");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
