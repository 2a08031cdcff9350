use crate::rebalance::{self, InsertPlan, RemovalOutcome};
use crate::{
    AllocationError, AllocatorConfig, Animal, AnimalId, Barn, Color, Error, FarmStorage,
    GroupIndex, NewAnimal, Result,
};

use std::sync::Arc;

use proven_locks::LockManager;
use proven_store::Store;
use tracing::{debug, info};

const FIRST_BARN_NAME: &str = "Barn";
const NEW_BARN_NAME: &str = "NewBarn";

fn lock_resource(color: Color) -> String {
    format!("color:{color}")
}

/// Places animals into barns of their favorite color and keeps barn
/// populations balanced.
///
/// Every operation takes the lock for the affected color, works on a fresh
/// working set, and commits all of its changes in one batch. Operations on
/// different colors can run concurrently.
pub struct Allocator<S, LM>
where
    S: Store,
    LM: LockManager,
{
    config: AllocatorConfig,
    lock_manager: Arc<LM>,
    storage: FarmStorage<S>,
}

impl<S, LM> Clone for Allocator<S, LM>
where
    S: Store,
    LM: LockManager,
{
    fn clone(&self) -> Self {
        Self {
            config: self.config,
            lock_manager: self.lock_manager.clone(),
            storage: self.storage.clone(),
        }
    }
}

impl<S, LM> Allocator<S, LM>
where
    S: Store,
    LM: LockManager,
{
    /// Creates an allocator over `store`, serializing work per color through
    /// `lock_manager`.
    pub fn new(config: AllocatorConfig, store: S, lock_manager: LM) -> Self {
        Self {
            config,
            lock_manager: Arc::new(lock_manager),
            storage: FarmStorage::new(store),
        }
    }

    /// The configuration in use.
    pub const fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Direct access to the underlying storage.
    pub const fn storage(&self) -> &FarmStorage<S> {
        &self.storage
    }

    /// Adds an animal to the farm, creating a barn and rebalancing when the
    /// existing barns of its color are full.
    ///
    /// # Errors
    ///
    /// Fails on store or lock errors, or if the farm is in a state the
    /// allocator refuses to act on. Nothing is written on failure.
    pub async fn insert(&self, animal: NewAnimal) -> Result<Animal, S::Error> {
        let color = animal.favorite_color;
        let capacity = self.config.capacity();
        let _guard = self.lock(color).await?;

        let mut working_set = self.storage.load_working_set().await?;
        let partition = GroupIndex::partition(&working_set, color);
        let plan = rebalance::plan_insert(&partition, capacity)?;

        let mut animal = animal.into_animal(self.storage.next_animal_id().await?);

        match plan {
            InsertPlan::Existing(barn_id) => {
                animal.barn = Some(barn_id);
                working_set.save_animal(animal.clone());
            }
            InsertPlan::FirstBarn | InsertPlan::NewBarn => {
                let name = if plan == InsertPlan::FirstBarn {
                    FIRST_BARN_NAME
                } else {
                    NEW_BARN_NAME
                };
                let barn = Barn::new(self.storage.next_barn_id().await?, name, color);
                info!(barn = %barn.id, %color, "opening barn");

                animal.barn = Some(barn.id);
                working_set.save_barn(barn.clone());
                working_set.save_animal(animal.clone());

                if plan == InsertPlan::NewBarn {
                    let candidates = rebalance::spread_candidates(&partition);
                    rebalance::spread_into_new_barn(
                        &mut working_set,
                        color,
                        barn.id,
                        &candidates,
                        partition.barns().len(),
                    )?;
                }
            }
        }

        self.storage.commit(&working_set).await?;
        debug!(animal = %animal.id, barn = ?animal.barn, ?plan, "placed animal");

        Ok(animal)
    }

    /// Adds animals one after another. Stops at the first failure; animals
    /// placed before it stay placed.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered.
    pub async fn insert_all(&self, animals: Vec<NewAnimal>) -> Result<Vec<Animal>, S::Error> {
        let mut placed = Vec::with_capacity(animals.len());
        for animal in animals {
            placed.push(self.insert(animal).await?);
        }
        Ok(placed)
    }

    /// Removes an animal from the farm and restores balance among the barns
    /// of its color, consolidating barns when the remaining animals fit in
    /// fewer of them.
    ///
    /// # Errors
    ///
    /// Fails with [`AllocationError::AnimalNotFound`] if the animal does not
    /// exist, with [`AllocationError::InvariantViolation`] if it has no barn,
    /// and on store or lock errors. Nothing is written on failure.
    pub async fn remove(&self, animal_id: AnimalId) -> Result<(), S::Error> {
        let color = self
            .storage
            .find_animal(animal_id)
            .await?
            .ok_or(AllocationError::AnimalNotFound(animal_id))?
            .favorite_color;
        let _guard = self.lock(color).await?;

        // Re-read under the lock.
        let mut working_set = self.storage.load_working_set().await?;
        let animal = working_set
            .delete_animal(animal_id)
            .ok_or(AllocationError::AnimalNotFound(animal_id))?;
        let former_barn = animal.barn.ok_or_else(|| {
            AllocationError::InvariantViolation(format!("{animal_id} is not in any barn"))
        })?;

        let outcome = rebalance::rebalance_after_removal(
            &mut working_set,
            color,
            former_barn,
            self.config.capacity(),
        )?;

        self.storage.commit(&working_set).await?;

        if let RemovalOutcome::Consolidated { deleted_barn, .. } = &outcome {
            info!(barn = %deleted_barn, %color, "closed barn");
        }
        debug!(animal = %animal_id, ?outcome, "removed animal");

        Ok(())
    }

    /// Removes animals one after another, re-reading each from storage.
    /// Stops at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered.
    pub async fn remove_all(&self, animal_ids: Vec<AnimalId>) -> Result<(), S::Error> {
        for animal_id in animal_ids {
            self.remove(animal_id).await?;
        }
        Ok(())
    }

    /// Removes every animal and every barn in one batch.
    ///
    /// # Errors
    ///
    /// Fails on store or lock errors. Nothing is deleted on failure.
    pub async fn delete_all(&self) -> Result<(), S::Error> {
        // Fixed lock order across callers.
        let mut guards = Vec::with_capacity(Color::ALL.len());
        for color in Color::ALL {
            guards.push(self.lock(color).await?);
        }

        let (animals, barns) = self.storage.delete_all().await?;
        info!(animals, barns, "cleared farm");

        Ok(())
    }

    /// Every animal, in identity order.
    ///
    /// # Errors
    ///
    /// Fails on store errors.
    pub async fn find_all_animals(&self) -> Result<Vec<Animal>, S::Error> {
        self.storage.find_all_animals().await
    }

    /// Every barn, in identity order.
    ///
    /// # Errors
    ///
    /// Fails on store errors.
    pub async fn find_all_barns(&self) -> Result<Vec<Barn>, S::Error> {
        self.storage.find_all_barns().await
    }

    /// Looks up one animal.
    ///
    /// # Errors
    ///
    /// Fails with [`AllocationError::AnimalNotFound`] if it does not exist.
    pub async fn find_animal(&self, animal_id: AnimalId) -> Result<Animal, S::Error> {
        self.storage
            .find_animal(animal_id)
            .await?
            .ok_or_else(|| AllocationError::AnimalNotFound(animal_id).into())
    }

    /// The barns of `color` with their populations, in identity order.
    ///
    /// # Errors
    ///
    /// Fails on store errors.
    pub async fn populations(&self, color: Color) -> Result<Vec<(Barn, usize)>, S::Error> {
        let working_set = self.storage.load_working_set().await?;
        Ok(GroupIndex::partition(&working_set, color)
            .populations()
            .map(|(barn, population)| (barn.clone(), population))
            .collect())
    }

    async fn lock(&self, color: Color) -> Result<LM::Guard, S::Error> {
        self.lock_manager
            .lock(lock_resource(color))
            .await
            .map_err(|error| Error::Lock(error.to_string()))
    }
}
