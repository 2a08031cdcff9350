//! Persistence of animals and barns on top of a key-value [`Store`].

use crate::{Animal, AnimalId, Barn, BarnId, Error, Result, WorkingSet};

use bytes::Bytes;
use proven_store::{Store, StoreOp};
use tracing::debug;

const ANIMAL_PREFIX: &str = "animal:";
const BARN_PREFIX: &str = "barn:";
const ANIMAL_SEQUENCE: &str = "animal";
const BARN_SEQUENCE: &str = "barn";

// Zero padded so lexicographic key order is identity order.
fn animal_key(id: AnimalId) -> String {
    format!("{ANIMAL_PREFIX}{:020}", id.get())
}

fn barn_key(id: BarnId) -> String {
    format!("{BARN_PREFIX}{:020}", id.get())
}

/// Stores animals and barns as CBOR documents in a [`Store`].
#[derive(Clone, Debug)]
pub struct FarmStorage<S: Store> {
    store: S,
}

impl<S: Store> FarmStorage<S> {
    /// Wraps a store.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Every animal, in identity order.
    ///
    /// # Errors
    ///
    /// Fails if the store fails or a document cannot be decoded.
    pub async fn find_all_animals(&self) -> Result<Vec<Animal>, S::Error> {
        self.scan(ANIMAL_PREFIX).await
    }

    /// Every barn, in identity order.
    ///
    /// # Errors
    ///
    /// Fails if the store fails or a document cannot be decoded.
    pub async fn find_all_barns(&self) -> Result<Vec<Barn>, S::Error> {
        self.scan(BARN_PREFIX).await
    }

    /// Looks up one animal.
    ///
    /// # Errors
    ///
    /// Fails if the store fails or the document cannot be decoded.
    pub async fn find_animal(&self, id: AnimalId) -> Result<Option<Animal>, S::Error> {
        let key = animal_key(id);
        match self.store.get(key.clone()).await.map_err(Error::Store)? {
            Some(bytes) => decode(&key, bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Inserts or updates an animal by identity.
    ///
    /// # Errors
    ///
    /// Fails if the store fails or the animal cannot be encoded.
    pub async fn save_animal(&self, animal: Animal) -> Result<Animal, S::Error> {
        let bytes: Bytes = animal.clone().try_into()?;
        self.store
            .put(animal_key(animal.id), bytes)
            .await
            .map_err(Error::Store)?;
        Ok(animal)
    }

    /// Inserts or updates a barn by identity.
    ///
    /// # Errors
    ///
    /// Fails if the store fails or the barn cannot be encoded.
    pub async fn save_barn(&self, barn: Barn) -> Result<Barn, S::Error> {
        let bytes: Bytes = barn.clone().try_into()?;
        self.store
            .put(barn_key(barn.id), bytes)
            .await
            .map_err(Error::Store)?;
        Ok(barn)
    }

    /// Deletes an animal.
    ///
    /// # Errors
    ///
    /// Fails if the store fails.
    pub async fn delete_animal(&self, animal: &Animal) -> Result<(), S::Error> {
        self.store
            .del(animal_key(animal.id))
            .await
            .map_err(Error::Store)
    }

    /// Deletes a barn.
    ///
    /// # Errors
    ///
    /// Fails if the store fails.
    pub async fn delete_barn(&self, barn: &Barn) -> Result<(), S::Error> {
        self.store.del(barn_key(barn.id)).await.map_err(Error::Store)
    }

    /// Deletes every animal in one batch.
    ///
    /// # Errors
    ///
    /// Fails if the store fails.
    pub async fn delete_all_animals(&self) -> Result<usize, S::Error> {
        self.delete_prefix(ANIMAL_PREFIX).await
    }

    /// Deletes every animal and every barn in one batch.
    /// Returns the number of animals and barns deleted.
    ///
    /// # Errors
    ///
    /// Fails if the store fails. Nothing is deleted in that case.
    pub async fn delete_all(&self) -> Result<(usize, usize), S::Error> {
        let animals = self.delete_ops(ANIMAL_PREFIX).await?;
        let barns = self.delete_ops(BARN_PREFIX).await?;
        let counts = (animals.len(), barns.len());

        let mut ops = animals;
        ops.extend(barns);
        self.store.apply(ops).await.map_err(Error::Store)?;

        Ok(counts)
    }

    /// Allocates a fresh animal identity.
    ///
    /// # Errors
    ///
    /// Fails if the store fails.
    pub async fn next_animal_id(&self) -> Result<AnimalId, S::Error> {
        self.store
            .next_sequence(ANIMAL_SEQUENCE)
            .await
            .map(AnimalId)
            .map_err(Error::Store)
    }

    /// Allocates a fresh barn identity.
    ///
    /// # Errors
    ///
    /// Fails if the store fails.
    pub async fn next_barn_id(&self) -> Result<BarnId, S::Error> {
        self.store
            .next_sequence(BARN_SEQUENCE)
            .await
            .map(BarnId)
            .map_err(Error::Store)
    }

    /// Loads every animal and barn into a fresh working set.
    ///
    /// # Errors
    ///
    /// Fails if the store fails or a document cannot be decoded.
    pub async fn load_working_set(&self) -> Result<WorkingSet, S::Error> {
        let animals = self.find_all_animals().await?;
        let barns = self.find_all_barns().await?;
        Ok(WorkingSet::new(animals, barns))
    }

    /// Writes every change recorded in `working_set` as one atomic batch.
    /// Returns the number of store operations applied.
    ///
    /// # Errors
    ///
    /// Fails if an entity cannot be encoded or the store rejects the batch.
    /// Nothing is written in either case.
    pub async fn commit(&self, working_set: &WorkingSet) -> Result<usize, S::Error> {
        let changes = working_set.changes();
        if changes.is_empty() {
            return Ok(0);
        }

        let mut ops = Vec::new();
        for barn in changes.saved_barns {
            let key = barn_key(barn.id);
            let bytes: Bytes = barn.try_into()?;
            ops.push(StoreOp::put(key, bytes));
        }
        for animal in changes.saved_animals {
            let key = animal_key(animal.id);
            let bytes: Bytes = animal.try_into()?;
            ops.push(StoreOp::put(key, bytes));
        }
        for id in changes.deleted_animals {
            ops.push(StoreOp::del(animal_key(id)));
        }
        for id in changes.deleted_barns {
            ops.push(StoreOp::del(barn_key(id)));
        }

        let count = ops.len();
        self.store.apply(ops).await.map_err(Error::Store)?;
        debug!(operations = count, "committed working set");

        Ok(count)
    }

    async fn scan<T>(&self, prefix: &str) -> Result<Vec<T>, S::Error>
    where
        T: TryFrom<Bytes, Error = ciborium::de::Error<std::io::Error>>,
    {
        self.store
            .scan(prefix)
            .await
            .map_err(Error::Store)?
            .into_iter()
            .map(|(key, bytes)| decode(&key, bytes))
            .collect()
    }

    async fn delete_ops(&self, prefix: &str) -> Result<Vec<StoreOp>, S::Error> {
        Ok(self
            .store
            .scan(prefix)
            .await
            .map_err(Error::Store)?
            .into_iter()
            .map(|(key, _)| StoreOp::del(key))
            .collect())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, S::Error> {
        let ops = self.delete_ops(prefix).await?;
        let count = ops.len();
        self.store.apply(ops).await.map_err(Error::Store)?;
        Ok(count)
    }
}

fn decode<T, SE>(key: &str, bytes: Bytes) -> Result<T, SE>
where
    T: TryFrom<Bytes, Error = ciborium::de::Error<std::io::Error>>,
    SE: proven_store::StoreError,
{
    T::try_from(bytes).map_err(|error| Error::Deserialize {
        key: key.to_string(),
        message: error.to_string(),
    })
}
