//! Definition storage for the container
//!
//! Uses DashMap for lock-free concurrent access. The store owns four maps
//! keyed by id: definitions, bound parameters, bound methods and the
//! singleton cache.

use crate::definition::{Bindings, Definition};
use crate::{DiError, Instance, Result};
use ahash::RandomState;
use dashmap::DashMap;

/// Thread-safe storage for definitions, bindings and cached instances
pub struct DefinitionStore {
    /// Map from id to definition
    definitions: DashMap<String, Definition, RandomState>,
    /// Constructor/factory parameter bindings per id
    params: DashMap<String, Bindings, RandomState>,
    /// Methods called after construction, in binding order
    methods: DashMap<String, Vec<(String, Bindings)>, RandomState>,
    /// Singleton cache populated by `get`
    instances: DashMap<String, Instance, RandomState>,
}

/// Shard count for small maps.
///
/// DashMap defaults to `num_cpus * 4` shards, far more than a container
/// with a few dozen ids needs.
const SHARDS: usize = 8;

fn map<V>() -> DashMap<String, V, RandomState> {
    DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), SHARDS)
}

impl DefinitionStore {
    #[inline]
    pub fn new() -> Self {
        Self {
            definitions: map(),
            params: map(),
            methods: map(),
            instances: map(),
        }
    }

    /// Store a definition, evicting any cached instance for `id`.
    ///
    /// Bindings already attached to `id` are kept.
    pub fn set(&self, id: &str, definition: Definition) {
        self.instances.remove(id);
        self.definitions.insert(id.to_owned(), definition);
    }

    /// Check if an id has a definition
    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    /// Clone of the definition stored under `id`
    #[inline]
    pub fn definition(&self, id: &str) -> Option<Definition> {
        self.definitions.get(id).map(|d| d.value().clone())
    }

    /// Bind a constructor or factory parameter.
    ///
    /// Only type and factory definitions accept parameters.
    pub fn bind_parameter(&self, id: &str, name: &str, value: Definition) -> Result<()> {
        match self.definitions.get(id).as_deref() {
            Some(Definition::Type(_) | Definition::Factory(_)) => {}
            Some(other) => {
                return Err(DiError::invalid_binding(
                    id,
                    format!(
                        "parameters can only be bound to types or factories, not a {}",
                        other.variant_name()
                    ),
                ));
            }
            None => return Err(DiError::invalid_binding(id, "no definition for this id")),
        }

        self.params.entry(id.to_owned()).or_default().insert(name, value);
        Ok(())
    }

    /// Parameter bindings for `id` (empty when none)
    pub fn params(&self, id: &str) -> Bindings {
        self.params
            .get(id)
            .map(|b| b.value().clone())
            .unwrap_or_default()
    }

    /// Bind a method to call after construction.
    ///
    /// Rebinding a method replaces its arguments but keeps its position.
    pub fn bind_method(&self, id: &str, method: &str, args: Bindings) -> Result<()> {
        match self.definitions.get(id).as_deref() {
            Some(Definition::Type(_)) => {}
            Some(other) => {
                return Err(DiError::invalid_binding(
                    id,
                    format!(
                        "methods can only be bound to types, not a {}",
                        other.variant_name()
                    ),
                ));
            }
            None => return Err(DiError::invalid_binding(id, "no definition for this id")),
        }

        let mut methods = self.methods.entry(id.to_owned()).or_default();
        match methods.iter_mut().find(|(name, _)| name == method) {
            Some(slot) => slot.1 = args,
            None => methods.push((method.to_owned(), args)),
        }
        Ok(())
    }

    /// Bound methods for `id`, in binding order
    pub fn methods(&self, id: &str) -> Vec<(String, Bindings)> {
        self.methods
            .get(id)
            .map(|m| m.value().clone())
            .unwrap_or_default()
    }

    /// Cached singleton for `id`
    #[inline]
    pub fn cached(&self, id: &str) -> Option<Instance> {
        self.instances.get(id).map(|i| i.value().clone())
    }

    /// Cache a singleton.
    ///
    /// If another resolution cached `id` first, that instance wins and is
    /// returned.
    pub fn cache(&self, id: &str, instance: Instance) -> Instance {
        self.instances
            .entry(id.to_owned())
            .or_insert(instance)
            .value()
            .clone()
    }

    /// Check if a singleton is cached
    #[inline]
    pub fn is_cached(&self, id: &str) -> bool {
        self.instances.contains_key(id)
    }

    /// Get number of definitions
    #[inline]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// All defined ids, unordered
    pub fn ids(&self) -> Vec<String> {
        self.definitions.iter().map(|r| r.key().clone()).collect()
    }
}

impl Default for DefinitionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DefinitionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefinitionStore")
            .field("definitions", &self.len())
            .field("cached", &self.instances.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Factory, Value};

    struct TestService {
        value: i32,
    }

    #[test]
    fn test_store_set_and_get() {
        let store = DefinitionStore::new();
        assert!(!store.contains("mailer"));

        store.set("mailer", Definition::of_type("Mailer"));

        assert!(store.contains("mailer"));
        assert!(matches!(store.definition("mailer"), Some(Definition::Type(t)) if t == "Mailer"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_set_evicts_cache() {
        let store = DefinitionStore::new();
        store.set("service", Definition::of_type("TestService"));
        store.cache("service", Instance::new(TestService { value: 42 }));
        assert!(store.is_cached("service"));

        store.set("service", Definition::of_type("TestService"));
        assert!(!store.is_cached("service"));
    }

    #[test]
    fn test_first_cached_instance_wins() {
        let store = DefinitionStore::new();
        let first = store.cache("service", Instance::new(TestService { value: 1 }));
        let second = store.cache("service", Instance::new(TestService { value: 2 }));

        assert!(Instance::ptr_eq(&first, &second));
        assert_eq!(second.downcast::<TestService>().unwrap().value, 1);
    }

    #[test]
    fn test_bind_parameter_requires_type_or_factory() {
        let store = DefinitionStore::new();
        assert!(store.bind_parameter("missing", "a", 1.into()).is_err());

        store.set("literal", Definition::from(123));
        assert!(matches!(
            store.bind_parameter("literal", "a", 1.into()),
            Err(DiError::InvalidBinding { .. })
        ));

        store.set("factory", Factory::new(|| 1).into());
        store.bind_parameter("factory", "a", 1.into()).unwrap();

        store.set("box", Definition::of_type("Box"));
        store.bind_parameter("box", "height", 30.into()).unwrap();
        store.bind_parameter("box", "height", 40.into()).unwrap();
        let params = store.params("box");
        assert_eq!(params.len(), 1);
        assert!(matches!(
            params.get("height"),
            Some(Definition::Value(Value::Int(40)))
        ));
    }

    #[test]
    fn test_bind_method_requires_type() {
        let store = DefinitionStore::new();
        store.set("factory", Factory::new(|| 1).into());
        assert!(store.bind_method("factory", "run", Bindings::new()).is_err());

        store.set("log", Definition::of_type("Log"));
        store.bind_method("log", "setMailer", Bindings::new()).unwrap();
        store.bind_method("log", "setAdmin", Bindings::new()).unwrap();
        store
            .bind_method("log", "setMailer", Bindings::new().with("mailer", "Mailer"))
            .unwrap();

        let methods = store.methods("log");
        let names: Vec<_> = methods.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["setMailer", "setAdmin"]);
        assert_eq!(methods[0].1.len(), 1);
    }

    #[test]
    fn test_rebinding_keeps_bindings() {
        let store = DefinitionStore::new();
        store.set("box", Definition::of_type("Box"));
        store.bind_parameter("box", "height", 30.into()).unwrap();
        store.set("box", Definition::of_type("Box"));
        assert_eq!(store.params("box").len(), 1);
    }
}
