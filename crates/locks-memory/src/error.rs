use proven_locks::LockManagerError;
use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Clone, Debug, Error)]
#[error("memory lock manager error")]
pub struct Error;

impl LockManagerError for Error {}
