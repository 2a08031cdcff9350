//! In-memory (single node) implementation of locks for local development.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::Error;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use proven_locks::{LockGuard, LockManager, LockManager1};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

/// Guard for a lock held through [`MemoryLockManager`].
#[derive(Debug)]
pub struct MemoryLockGuard {
    _guard: OwnedMutexGuard<()>,
    resource_id: String,
}

impl LockGuard for MemoryLockGuard {
    fn resource_id(&self) -> &str {
        &self.resource_id
    }
}

impl Drop for MemoryLockGuard {
    fn drop(&mut self) {
        trace!(resource_id = %self.resource_id, "released lock");
    }
}

/// In-memory lock manager.
#[derive(Clone, Debug, Default)]
pub struct MemoryLockManager {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
    prefix: Option<String>,
}

impl MemoryLockManager {
    /// Creates a new instance of `MemoryLockManager`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            locks: Arc::new(Mutex::new(HashMap::new())),
            prefix: None,
        }
    }

    fn with_scope(&self, prefix: String) -> Self {
        Self {
            locks: self.locks.clone(),
            prefix: Some(prefix),
        }
    }

    fn get_key(&self, key: String) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{key}"),
            None => key,
        }
    }

    async fn mutex_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(key.to_string())
            .or_default()
            .clone()
    }
}

#[async_trait]
impl LockManager for MemoryLockManager {
    type Error = Error;
    type Guard = MemoryLockGuard;

    async fn lock(&self, resource_id: String) -> Result<Self::Guard, Self::Error> {
        let key = self.get_key(resource_id);
        let mutex = self.mutex_for(&key).await;

        let guard = mutex.lock_owned().await;
        trace!(resource_id = %key, "acquired lock");

        Ok(MemoryLockGuard {
            _guard: guard,
            resource_id: key,
        })
    }

    async fn try_lock(&self, resource_id: String) -> Result<Option<Self::Guard>, Self::Error> {
        let key = self.get_key(resource_id);
        let mutex = self.mutex_for(&key).await;

        Ok(mutex.try_lock_owned().ok().map(|guard| MemoryLockGuard {
            _guard: guard,
            resource_id: key,
        }))
    }
}

impl LockManager1 for MemoryLockManager {
    type Error = Error;
    type Scoped = Self;

    fn scope<S>(&self, scope: S) -> Self::Scoped
    where
        S: AsRef<str> + Send,
    {
        let new_scope = match &self.prefix {
            Some(existing_scope) => format!("{}:{}", existing_scope, scope.as_ref()),
            None => scope.as_ref().to_string(),
        };
        self.with_scope(new_scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_lock_and_release() {
        let manager = MemoryLockManager::new();
        let key = "test_key".to_string();

        let guard = manager.lock(key.clone()).await.unwrap();
        assert_eq!(guard.resource_id(), "test_key");
        assert_matches!(manager.try_lock(key.clone()).await, Ok(None));

        drop(guard);

        assert_matches!(manager.try_lock(key).await, Ok(Some(_)));
    }

    #[tokio::test]
    async fn test_distinct_resources_do_not_block() {
        let manager = MemoryLockManager::new();

        let _red = manager.lock("color:red".to_string()).await.unwrap();
        let blue = manager.try_lock("color:blue".to_string()).await.unwrap();

        assert!(blue.is_some());
    }

    #[tokio::test]
    async fn test_waiter_acquires_after_release() {
        let manager = MemoryLockManager::new();
        let guard = manager.lock("shared".to_string()).await.unwrap();

        let waiter = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.lock("shared".to_string()).await.map(|_| ()) })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        assert!(waiter.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_scoped_lock_manager() {
        let unscoped_manager = MemoryLockManager::new();
        let scoped_manager = LockManager1::scope(&unscoped_manager, "scope");

        let guard = scoped_manager.lock("test_key".to_string()).await.unwrap();
        assert_eq!(guard.resource_id(), "scope:test_key");

        // Scopes share state with the parent manager
        assert_matches!(
            unscoped_manager.try_lock("scope:test_key".to_string()).await,
            Ok(None)
        );
        assert_matches!(
            unscoped_manager.try_lock("test_key".to_string()).await,
            Ok(Some(_))
        );
    }

    #[tokio::test]
    async fn test_sibling_scopes_do_not_block() {
        let manager = MemoryLockManager::new();
        let north = LockManager1::scope(&manager, "north");
        let south = LockManager1::scope(&manager, "south");

        let _north_guard = north.lock("color:red".to_string()).await.unwrap();

        assert_matches!(south.try_lock("color:red".to_string()).await, Ok(Some(_)));
    }
}
