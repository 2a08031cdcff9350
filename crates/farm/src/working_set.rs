//! Per-operation copy of the farm.
//!
//! The allocator loads a working set, mutates it while deciding, and commits
//! the recorded changes in one batch. Nothing reaches the store until the
//! whole operation has succeeded.

use crate::{AllocationError, Animal, AnimalId, Barn, BarnId};

use std::collections::{BTreeMap, BTreeSet};

/// Mutations recorded by a [`WorkingSet`], ready to be committed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Changes {
    /// Animals created or updated.
    pub saved_animals: Vec<Animal>,

    /// Animals deleted.
    pub deleted_animals: Vec<AnimalId>,

    /// Barns created or updated.
    pub saved_barns: Vec<Barn>,

    /// Barns deleted.
    pub deleted_barns: Vec<BarnId>,
}

impl Changes {
    /// True when there is nothing to commit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.saved_animals.is_empty()
            && self.deleted_animals.is_empty()
            && self.saved_barns.is_empty()
            && self.deleted_barns.is_empty()
    }
}

/// In-memory animals and barns for the duration of one operation.
#[derive(Clone, Debug, Default)]
pub struct WorkingSet {
    animals: BTreeMap<AnimalId, Animal>,
    barns: BTreeMap<BarnId, Barn>,
    dirty_animals: BTreeSet<AnimalId>,
    deleted_animals: BTreeSet<AnimalId>,
    dirty_barns: BTreeSet<BarnId>,
    deleted_barns: BTreeSet<BarnId>,
}

impl WorkingSet {
    /// Creates a working set from the persisted state. No changes are
    /// recorded for the loaded entities.
    pub fn new(
        animals: impl IntoIterator<Item = Animal>,
        barns: impl IntoIterator<Item = Barn>,
    ) -> Self {
        Self {
            animals: animals.into_iter().map(|a| (a.id, a)).collect(),
            barns: barns.into_iter().map(|b| (b.id, b)).collect(),
            ..Self::default()
        }
    }

    /// Animals in identity order.
    pub fn animals(&self) -> impl Iterator<Item = &Animal> {
        self.animals.values()
    }

    /// Barns in identity order.
    pub fn barns(&self) -> impl Iterator<Item = &Barn> {
        self.barns.values()
    }

    /// Looks up an animal.
    #[must_use]
    pub fn animal(&self, id: AnimalId) -> Option<&Animal> {
        self.animals.get(&id)
    }

    /// Looks up a barn.
    #[must_use]
    pub fn barn(&self, id: BarnId) -> Option<&Barn> {
        self.barns.get(&id)
    }

    /// Inserts or replaces an animal.
    pub fn save_animal(&mut self, animal: Animal) {
        self.deleted_animals.remove(&animal.id);
        self.dirty_animals.insert(animal.id);
        self.animals.insert(animal.id, animal);
    }

    /// Inserts or replaces a barn.
    pub fn save_barn(&mut self, barn: Barn) {
        self.deleted_barns.remove(&barn.id);
        self.dirty_barns.insert(barn.id);
        self.barns.insert(barn.id, barn);
    }

    /// Removes an animal, returning it if it was present.
    pub fn delete_animal(&mut self, id: AnimalId) -> Option<Animal> {
        let removed = self.animals.remove(&id)?;
        self.dirty_animals.remove(&id);
        self.deleted_animals.insert(id);
        Some(removed)
    }

    /// Removes a barn, returning it if it was present. Animals still
    /// referencing the barn are left untouched.
    pub fn delete_barn(&mut self, id: BarnId) -> Option<Barn> {
        let removed = self.barns.remove(&id)?;
        self.dirty_barns.remove(&id);
        self.deleted_barns.insert(id);
        Some(removed)
    }

    /// Points an animal at a barn, or at no barn.
    ///
    /// # Errors
    ///
    /// Fails if the animal or the target barn is not part of the working
    /// set.
    pub fn assign(
        &mut self,
        animal_id: AnimalId,
        barn_id: Option<BarnId>,
    ) -> Result<(), AllocationError> {
        if let Some(barn_id) = barn_id {
            if !self.barns.contains_key(&barn_id) {
                return Err(AllocationError::BarnNotFound(barn_id));
            }
        }

        let animal = self
            .animals
            .get_mut(&animal_id)
            .ok_or(AllocationError::AnimalNotFound(animal_id))?;

        if animal.barn != barn_id {
            animal.barn = barn_id;
            self.dirty_animals.insert(animal_id);
        }

        Ok(())
    }

    /// Everything changed since the working set was loaded.
    #[must_use]
    pub fn changes(&self) -> Changes {
        Changes {
            saved_animals: self
                .dirty_animals
                .iter()
                .filter_map(|id| self.animals.get(id).cloned())
                .collect(),
            deleted_animals: self.deleted_animals.iter().copied().collect(),
            saved_barns: self
                .dirty_barns
                .iter()
                .filter_map(|id| self.barns.get(id).cloned())
                .collect(),
            deleted_barns: self.deleted_barns.iter().copied().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::Color;

    fn animal(id: u64, barn: Option<u64>) -> Animal {
        Animal {
            id: AnimalId(id),
            name: format!("animal {id}"),
            favorite_color: Color::Red,
            barn: barn.map(BarnId),
        }
    }

    #[test]
    fn loaded_entities_are_clean() {
        let working_set = WorkingSet::new(
            vec![animal(1, Some(1))],
            vec![Barn::new(BarnId(1), "Barn", Color::Red)],
        );

        assert!(working_set.changes().is_empty());
    }

    #[test]
    fn assign_records_only_real_changes() {
        let mut working_set = WorkingSet::new(
            vec![animal(1, Some(1)), animal(2, Some(1))],
            vec![
                Barn::new(BarnId(1), "Barn", Color::Red),
                Barn::new(BarnId(2), "NewBarn", Color::Red),
            ],
        );

        working_set.assign(AnimalId(1), Some(BarnId(1))).unwrap();
        assert!(working_set.changes().is_empty());

        working_set.assign(AnimalId(2), Some(BarnId(2))).unwrap();
        let changes = working_set.changes();
        assert_eq!(changes.saved_animals, vec![animal(2, Some(2))]);
    }

    #[test]
    fn assign_rejects_unknown_barn_and_animal() {
        let mut working_set = WorkingSet::new(vec![animal(1, Some(1))], vec![]);

        assert_eq!(
            working_set.assign(AnimalId(1), Some(BarnId(9))),
            Err(AllocationError::BarnNotFound(BarnId(9)))
        );
        assert_eq!(
            working_set.assign(AnimalId(4), None),
            Err(AllocationError::AnimalNotFound(AnimalId(4)))
        );
    }

    #[test]
    fn delete_supersedes_pending_save() {
        let mut working_set = WorkingSet::default();
        working_set.save_barn(Barn::new(BarnId(1), "Barn", Color::Red));
        working_set.save_animal(animal(1, Some(1)));

        working_set.delete_animal(AnimalId(1));
        working_set.delete_barn(BarnId(1));

        let changes = working_set.changes();
        assert!(changes.saved_animals.is_empty());
        assert!(changes.saved_barns.is_empty());
        assert_eq!(changes.deleted_animals, vec![AnimalId(1)]);
        assert_eq!(changes.deleted_barns, vec![BarnId(1)]);
    }
}
