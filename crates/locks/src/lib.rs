//! Abstract interface for named, guard-based locks used to serialize work on
//! a shared resource.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::error::Error;
use std::fmt::Debug;

use async_trait::async_trait;

/// Marker trait for `LockManager` errors
pub trait LockManagerError: Debug + Error + Send + Sync + 'static {}

/// A held lock. Dropping the guard releases the lock.
pub trait LockGuard: Send + Sync + 'static {
    /// The resource this guard protects.
    fn resource_id(&self) -> &str;
}

/// A trait representing a lock manager with asynchronous operations.
///
/// Locks are represented by a guard that releases the lock when dropped, so
/// a lock can never outlive the work it protects.
#[async_trait]
pub trait LockManager: Send + Sync + 'static {
    /// The error type for lock operations.
    type Error: LockManagerError;

    /// The guard type that releases the lock on drop.
    type Guard: LockGuard;

    /// Acquires a lock, waiting until it becomes available.
    async fn lock(&self, resource_id: String) -> Result<Self::Guard, Self::Error>;

    /// Attempts to acquire a lock without waiting.
    ///
    /// Returns `Ok(None)` if the lock is currently held.
    async fn try_lock(&self, resource_id: String) -> Result<Option<Self::Guard>, Self::Error>;
}

/// A trait representing a single-scoped lock manager with asynchronous operations.
pub trait LockManager1
where
    Self: Clone + Send + Sync + 'static,
{
    /// The error type for the lock manager.
    type Error: LockManagerError;

    /// The scoped lock manager type.
    type Scoped: LockManager<Error = Self::Error>;

    /// Creates a scoped lock manager.
    fn scope<S>(&self, scope: S) -> Self::Scoped
    where
        S: AsRef<str> + Send;
}
