use crate::AllocationError;

use std::num::NonZeroUsize;

/// Default number of animals a barn can hold.
pub const DEFAULT_BARN_CAPACITY: usize = 20;

/// Configuration for the [`Allocator`](crate::Allocator).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocatorConfig {
    /// Maximum number of animals per barn.
    pub capacity: NonZeroUsize,
}

impl AllocatorConfig {
    /// Creates a config with the given barn capacity.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::InvalidCapacity`] when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, AllocationError> {
        NonZeroUsize::new(capacity)
            .map(|capacity| Self { capacity })
            .ok_or(AllocationError::InvalidCapacity(capacity))
    }

    /// The barn capacity as a plain count.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity.get()
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            capacity: NonZeroUsize::new(DEFAULT_BARN_CAPACITY).unwrap_or(NonZeroUsize::MIN),
        }
    }
}
