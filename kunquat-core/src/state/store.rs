//! The flat key/value store.
//!
//! Every piece of sheet data lives under a string key as a dynamically typed
//! [`Value`]. Typed access goes through [`Store::get_as`], which validates at
//! this boundary and nowhere else.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use serde_json::Value;

/// New values per key; `None` removes the key.
pub type Transaction = BTreeMap<String, Option<Value>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Store {
    data: BTreeMap<String, Value>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Decode the value at `key`. Missing keys and values of the wrong shape
    /// both yield `None`; the latter is logged.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.data.get(key)?;
        match T::deserialize(value) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!(target: "store", "ignoring malformed value at {}: {}", key, e);
                None
            }
        }
    }

    pub fn set(&mut self, key: &str, value: Option<Value>) {
        match value {
            Some(v) => {
                self.data.insert(key.to_string(), v);
            }
            None => {
                self.data.remove(key);
            }
        }
    }

    /// Serialize and store `value` at `key`.
    pub fn put<T: Serialize>(&mut self, key: &str, value: &T) {
        self.set(key, encode(value));
    }

    pub fn apply(&mut self, transaction: &Transaction) {
        for (key, value) in transaction {
            self.set(key, value.clone());
        }
    }

    pub fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.data
            .range(prefix.to_string()..)
            .map(|(k, _)| k.as_str())
            .take_while(move |k| k.starts_with(prefix))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Copy of the values under the given keys, for handing to other threads.
    pub fn snapshot<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> BTreeMap<String, Value> {
        keys.into_iter()
            .filter_map(|k| self.data.get(k).map(|v| (k.to_string(), v.clone())))
            .collect()
    }
}

/// Serialize a value for the store. Serialization of the engine's own types
/// cannot fail; a failure is logged and treated as removal.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Option<Value> {
    match serde_json::to_value(value) {
        Ok(v) => Some(v),
        Err(e) => {
            log::error!(target: "store", "could not encode value: {}", e);
            None
        }
    }
}
