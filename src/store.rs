//! Keyed stores backing the registry
//!
//! Every store satisfies the same contract: reads may run concurrently with
//! each other and with writes, and writes to one key are serialized without
//! blocking unrelated keys. [`ShardedStore`] meets it with a [`DashMap`];
//! another backend only has to implement [`Store`].

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;

use crate::config::StoreConfig;
use crate::fqn::CustomPropertyFqn;
use crate::schema::{CompiledSchema, CustomProperty, Type};

/// Concurrent key-value store
pub trait Store<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Option<V>;

    /// Insert or overwrite, returning the previous value
    fn insert(&self, key: K, value: V) -> Option<V>;

    fn remove(&self, key: &K) -> Option<V>;

    fn contains_key(&self, key: &K) -> bool;

    /// Snapshot of all entries; order is unspecified
    fn entries(&self) -> Vec<(K, V)>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&self);
}

/// Type name -> Type definition
pub type TypeStore = dyn Store<String, Arc<Type>>;

/// Custom property FQN -> CustomProperty
pub type CustomPropertyStore = dyn Store<CustomPropertyFqn, Arc<CustomProperty>>;

/// Custom property FQN -> schema compiled from its property type
pub type SchemaCache = dyn Store<CustomPropertyFqn, Arc<CompiledSchema>>;

/// [`Store`] over a sharded concurrent hash map
pub struct ShardedStore<K, V> {
    map: DashMap<K, V>,
}

impl<K, V> ShardedStore<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self { map: DashMap::new() }
    }

    /// Build with the configured capacity and shard count.
    ///
    /// `shard_amount` must already be validated (power of two, greater than 1).
    pub fn with_config(config: &StoreConfig) -> Self {
        Self {
            map: DashMap::with_capacity_and_shard_amount(
                config.initial_capacity,
                config.shard_amount,
            ),
        }
    }
}

impl<K, V> Default for ShardedStore<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Store<K, V> for ShardedStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<V> {
        self.map.get(key).map(|entry| entry.value().clone())
    }

    fn insert(&self, key: K, value: V) -> Option<V> {
        self.map.insert(key, value)
    }

    fn remove(&self, key: &K) -> Option<V> {
        self.map.remove(key).map(|(_, value)| value)
    }

    fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    fn entries(&self) -> Vec<(K, V)> {
        self.map
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn clear(&self) {
        self.map.clear();
    }
}

/// Name -> set of custom property FQNs.
///
/// Lets the registry find the properties owned by an entity type, or the
/// properties typed by a property type, without scanning the property store.
#[derive(Default)]
pub struct ReferenceIndex {
    map: DashMap<String, HashSet<CustomPropertyFqn>>,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, name: &str, fqn: CustomPropertyFqn) {
        self.map.entry(name.to_string()).or_default().insert(fqn);
    }

    pub fn remove(&self, name: &str, fqn: &CustomPropertyFqn) {
        let emptied = match self.map.get_mut(name) {
            Some(mut fqns) => {
                fqns.remove(fqn);
                fqns.is_empty()
            }
            None => false,
        };
        if emptied {
            self.map.remove_if(name, |_, fqns| fqns.is_empty());
        }
    }

    /// FQNs indexed under `name`, sorted
    pub fn get(&self, name: &str) -> Vec<CustomPropertyFqn> {
        let mut fqns: Vec<_> = self
            .map
            .get(name)
            .map(|entry| entry.iter().cloned().collect())
            .unwrap_or_default();
        fqns.sort();
        fqns
    }

    pub fn clear(&self) {
        self.map.clear();
    }
}
