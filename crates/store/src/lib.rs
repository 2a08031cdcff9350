//! Abstract interface for scoped key-value storage with atomic batches.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::error::Error;
use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;

/// Marker trait for `Store` errors
pub trait StoreError: Debug + Error + Send + Sync + 'static {}

/// A single mutation applied as part of an atomic batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreOp {
    /// Delete the key, if present.
    Del {
        /// The key to delete.
        key: String,
    },

    /// Insert or overwrite the key.
    Put {
        /// The key to write.
        key: String,

        /// The value to store.
        bytes: Bytes,
    },
}

impl StoreOp {
    /// Creates a delete operation.
    pub fn del<K: Into<String>>(key: K) -> Self {
        Self::Del { key: key.into() }
    }

    /// Creates a put operation.
    pub fn put<K: Into<String>>(key: K, bytes: Bytes) -> Self {
        Self::Put {
            key: key.into(),
            bytes,
        }
    }

    /// The key this operation touches.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Del { key } | Self::Put { key, .. } => key,
        }
    }
}

/// A trait representing a key-value store with asynchronous operations.
///
/// Keys are ordered lexicographically: `keys` and `scan` return entries in
/// ascending key order.
#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    /// The error type for store operations.
    type Error: StoreError;

    /// Applies every operation in `ops` atomically. Either all operations
    /// become visible or none do.
    async fn apply(&self, ops: Vec<StoreOp>) -> Result<(), Self::Error>;

    /// Deletes a key from the store.
    async fn del<K: Into<String> + Send>(&self, key: K) -> Result<(), Self::Error>;

    /// Retrieves the value associated with a key.
    async fn get<K: Into<String> + Send>(&self, key: K) -> Result<Option<Bytes>, Self::Error>;

    /// Retrieves all keys in the store.
    async fn keys(&self) -> Result<Vec<String>, Self::Error>;

    /// Returns the next value of the named sequence. Sequences start at 1 and
    /// never hand out the same value twice.
    async fn next_sequence<K: Into<String> + Send>(&self, name: K) -> Result<u64, Self::Error>;

    /// Stores a key-value pair.
    async fn put<K: Into<String> + Send>(&self, key: K, bytes: Bytes) -> Result<(), Self::Error>;

    /// Reads every entry whose key starts with `prefix` as one consistent
    /// view.
    async fn scan<P: Into<String> + Send>(
        &self,
        prefix: P,
    ) -> Result<Vec<(String, Bytes)>, Self::Error>;
}

/// A trait representing a single-scoped key-value store with asynchronous operations.
pub trait Store1
where
    Self: Clone + Send + Sync + 'static,
{
    /// The error type for the store.
    type Error: StoreError;

    /// The scoped store type.
    type Scoped: Store<Error = Self::Error>;

    /// Creates a scoped store.
    fn scope<S: Into<String> + Send>(&self, scope: S) -> Self::Scoped;
}
