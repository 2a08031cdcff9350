use crate::{AnimalId, BarnId};

use proven_store::StoreError;
use thiserror::Error;

/// Result of a farm operation.
pub type Result<T, SE> = std::result::Result<T, Error<SE>>;

/// Failures of the allocation logic itself, independent of any backend.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AllocationError {
    /// The referenced animal does not exist.
    #[error("animal not found: {0}")]
    AnimalNotFound(AnimalId),

    /// The referenced barn does not exist.
    #[error("barn not found: {0}")]
    BarnNotFound(BarnId),

    /// A barn picked for placement is already full.
    #[error("{barn} is already at capacity ({capacity})")]
    CapacityExhausted {
        /// The full barn.
        barn: BarnId,

        /// The configured capacity.
        capacity: usize,
    },

    /// Capacity must be at least one.
    #[error("invalid barn capacity: {0}")]
    InvalidCapacity(usize),

    /// The farm is in a state the allocator refuses to act on.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error<SE>
where
    SE: StoreError,
{
    /// Allocation logic refused the operation.
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    /// A stored entity could not be decoded.
    #[error("failed to decode {key}: {message}")]
    Deserialize {
        /// Store key of the entity.
        key: String,

        /// Decoder message.
        message: String,
    },

    /// The lock manager failed.
    #[error("lock error: {0}")]
    Lock(String),

    /// An entity could not be encoded.
    #[error(transparent)]
    Serialize(#[from] ciborium::ser::Error<std::io::Error>),

    /// Errors passed through from the underlying store.
    #[error(transparent)]
    Store(SE),
}

impl<SE: StoreError> Error<SE> {
    /// The allocation failure, if this error is one.
    #[must_use]
    pub fn as_allocation(&self) -> Option<&AllocationError> {
        match self {
            Self::Allocation(error) => Some(error),
            _ => None,
        }
    }
}
