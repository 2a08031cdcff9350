//! In-memory (single node) implementation of key-value storage for local
//! development and tests.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use proven_store::{Store, Store1, StoreOp};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Inner {
    map: BTreeMap<String, Bytes>,
    sequences: HashMap<String, u64>,
}

/// In-memory key-value store.
///
/// Scoped stores share the same underlying map, so a scope is only a key
/// prefix.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    prefix: Option<String>,
}

impl MemoryStore {
    /// Creates a new `MemoryStore`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            prefix: None,
        }
    }

    fn with_scope(&self, prefix: String) -> Self {
        Self {
            inner: self.inner.clone(),
            prefix: Some(prefix),
        }
    }

    fn get_key<K: Into<String>>(&self, key: K) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, key.into()),
            None => key.into(),
        }
    }

    fn strip_key<'a>(&self, key: &'a str) -> Option<&'a str> {
        match &self.prefix {
            Some(prefix) => key
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix(':')),
            None => Some(key),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Error = Error;

    async fn apply(&self, ops: Vec<StoreOp>) -> Result<(), Self::Error> {
        let mut inner = self.inner.lock().await;

        for op in ops {
            match op {
                StoreOp::Del { key } => {
                    inner.map.remove(&self.get_key(key));
                }
                StoreOp::Put { key, bytes } => {
                    inner.map.insert(self.get_key(key), bytes);
                }
            }
        }

        Ok(())
    }

    async fn del<K: Into<String> + Send>(&self, key: K) -> Result<(), Self::Error> {
        self.inner.lock().await.map.remove(&self.get_key(key));
        Ok(())
    }

    async fn get<K: Into<String> + Send>(&self, key: K) -> Result<Option<Bytes>, Self::Error> {
        let inner = self.inner.lock().await;
        Ok(inner.map.get(&self.get_key(key)).cloned())
    }

    async fn keys(&self) -> Result<Vec<String>, Self::Error> {
        let inner = self.inner.lock().await;
        Ok(inner
            .map
            .keys()
            .filter_map(|key| self.strip_key(key))
            .map(ToString::to_string)
            .collect())
    }

    async fn next_sequence<K: Into<String> + Send>(&self, name: K) -> Result<u64, Self::Error> {
        let mut inner = self.inner.lock().await;
        let counter = inner.sequences.entry(self.get_key(name)).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn put<K: Into<String> + Send>(&self, key: K, bytes: Bytes) -> Result<(), Self::Error> {
        self.inner
            .lock()
            .await
            .map
            .insert(self.get_key(key), bytes);
        Ok(())
    }

    async fn scan<P: Into<String> + Send>(
        &self,
        prefix: P,
    ) -> Result<Vec<(String, Bytes)>, Self::Error> {
        let full_prefix = self.get_key(prefix);
        let inner = self.inner.lock().await;

        Ok(inner
            .map
            .range(full_prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&full_prefix))
            .filter_map(|(key, bytes)| {
                self.strip_key(key)
                    .map(|stripped| (stripped.to_string(), bytes.clone()))
            })
            .collect())
    }
}

impl Store1 for MemoryStore {
    type Error = Error;
    type Scoped = Self;

    fn scope<S: Into<String> + Send>(&self, scope: S) -> Self::Scoped {
        let new_scope = match &self.prefix {
            Some(existing_scope) => format!("{}:{}", existing_scope, scope.into()),
            None => scope.into(),
        };
        self.with_scope(new_scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryStore::new();
        let key = "test_key".to_string();
        let value = Bytes::from_static(b"test_value");

        store.put(key.clone(), value.clone()).await.unwrap();
        let result = store.get(key).await.unwrap();

        assert_eq!(result, Some(value));
    }

    #[tokio::test]
    async fn test_del() {
        let store = MemoryStore::new();
        let key = "test_key".to_string();
        let value = Bytes::from_static(b"test_value");

        store.put(key.clone(), value.clone()).await.unwrap();
        store.del(key.clone()).await.unwrap();
        let result = store.get(key).await.unwrap();

        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_apply_batch() {
        let store = MemoryStore::new();
        store.put("stale", Bytes::from_static(b"x")).await.unwrap();

        store
            .apply(vec![
                StoreOp::put("a", Bytes::from_static(b"1")),
                StoreOp::put("b", Bytes::from_static(b"2")),
                StoreOp::del("stale"),
            ])
            .await
            .unwrap();

        assert_eq!(store.keys().await.unwrap(), vec!["a", "b"]);
        assert_eq!(store.get("stale").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_scan_is_ordered_and_bounded() {
        let store = MemoryStore::new();
        store.put("barn:2", Bytes::from_static(b"b2")).await.unwrap();
        store.put("animal:1", Bytes::from_static(b"a1")).await.unwrap();
        store.put("barn:1", Bytes::from_static(b"b1")).await.unwrap();
        store.put("barnyard", Bytes::from_static(b"no")).await.unwrap();

        let entries = store.scan("barn:").await.unwrap();

        assert_eq!(
            entries,
            vec![
                ("barn:1".to_string(), Bytes::from_static(b"b1")),
                ("barn:2".to_string(), Bytes::from_static(b"b2")),
            ]
        );
    }

    #[tokio::test]
    async fn test_sequences() {
        let store = MemoryStore::new();

        assert_eq!(store.next_sequence("animal").await.unwrap(), 1);
        assert_eq!(store.next_sequence("animal").await.unwrap(), 2);
        assert_eq!(store.next_sequence("barn").await.unwrap(), 1);

        // Sequences are scoped like keys
        let scoped = Store1::scope(&store, "farm");
        assert_eq!(scoped.next_sequence("animal").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_scope() {
        let store = MemoryStore::new();
        let scoped_store = Store1::scope(&store, "scope".to_string());

        let key = "test_key".to_string();
        let value = Bytes::from_static(b"test_value");

        scoped_store.put(key.clone(), value.clone()).await.unwrap();
        let result = scoped_store.get(key.clone()).await.unwrap();

        assert_eq!(result, Some(value));
        assert_eq!(scoped_store.keys().await.unwrap(), vec![key.clone()]);

        // Ensure the value is not accessible without the scope
        let result_without_scope = store.get(key).await.unwrap();
        assert_eq!(result_without_scope, None);
        assert_eq!(store.keys().await.unwrap(), vec!["scope:test_key"]);
    }

    #[tokio::test]
    async fn test_nested_scope() {
        let store = MemoryStore::new();
        let partial_scoped_store = Store1::scope(&store, "scope1".to_string());
        let scoped_store = Store1::scope(&partial_scoped_store, "scope2".to_string());

        let key = "test_key".to_string();
        let value = Bytes::from_static(b"test_value");

        scoped_store.put(key.clone(), value.clone()).await.unwrap();
        let result = scoped_store.get(key.clone()).await.unwrap();

        assert_eq!(result, Some(value));

        // Ensure the value is not accessible without the nested scope
        let result_without_scope = store.get(key.clone()).await.unwrap();
        assert_eq!(result_without_scope, None);

        let result_with_partial_scope = partial_scoped_store.get(key).await.unwrap();
        assert_eq!(result_with_partial_scope, None);
    }

    #[tokio::test]
    async fn test_sibling_scopes_are_isolated() {
        let store = MemoryStore::new();
        let north = Store1::scope(&store, "north");
        let south = Store1::scope(&store, "south");

        north.put("k", Bytes::from_static(b"n")).await.unwrap();
        south.put("k", Bytes::from_static(b"s")).await.unwrap();

        assert_eq!(north.scan("").await.unwrap().len(), 1);
        assert_eq!(
            south.get("k").await.unwrap(),
            Some(Bytes::from_static(b"s"))
        );
    }
}
