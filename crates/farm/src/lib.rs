//! Assigns animals to barns of their favorite color.
//!
//! Barns hold a fixed number of animals. Adding or removing an animal
//! rebalances the barns of its color: barns are opened when the existing ones
//! are full and closed when the remaining animals fit in fewer barns.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod allocator;
mod animal;
mod barn;
mod color;
mod config;
mod error;
mod group_index;
pub mod rebalance;
mod repository;
mod working_set;

pub use allocator::Allocator;
pub use animal::{Animal, AnimalId, NewAnimal};
pub use barn::{Barn, BarnId};
pub use color::{Color, UnknownColor};
pub use config::{AllocatorConfig, DEFAULT_BARN_CAPACITY};
pub use error::{AllocationError, Error, Result};
pub use group_index::{GroupIndex, Partition};
pub use repository::FarmStorage;
pub use working_set::{Changes, WorkingSet};
