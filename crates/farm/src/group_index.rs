//! Read-side grouping of animals and barns by color.

use crate::{AllocationError, Animal, AnimalId, Barn, BarnId, Color, WorkingSet};

use std::collections::BTreeMap;

/// Derives partitions from a [`WorkingSet`]. Nothing is cached: every call
/// reflects the working set as it is at that moment.
#[derive(Clone, Copy, Debug, Default)]
pub struct GroupIndex;

impl GroupIndex {
    /// Partitions the working set by `color`.
    #[must_use]
    pub fn partition(working_set: &WorkingSet, color: Color) -> Partition {
        let barns: Vec<Barn> = working_set
            .barns()
            .filter(|barn| barn.color == color)
            .cloned()
            .collect();

        let mut members: BTreeMap<BarnId, Vec<AnimalId>> =
            barns.iter().map(|barn| (barn.id, Vec::new())).collect();
        let mut unassigned = Vec::new();
        let mut strays = Vec::new();

        let animals: Vec<Animal> = working_set
            .animals()
            .filter(|animal| animal.favorite_color == color)
            .cloned()
            .collect();

        for animal in &animals {
            match animal.barn {
                None => unassigned.push(animal.id),
                Some(barn_id) => match members.get_mut(&barn_id) {
                    Some(list) => list.push(animal.id),
                    None => strays.push(animal.id),
                },
            }
        }

        Partition {
            animals,
            barns,
            color,
            members,
            strays,
            unassigned,
        }
    }
}

/// Animals and barns sharing one color, with per-barn membership.
#[derive(Clone, Debug)]
pub struct Partition {
    animals: Vec<Animal>,
    barns: Vec<Barn>,
    color: Color,
    members: BTreeMap<BarnId, Vec<AnimalId>>,
    strays: Vec<AnimalId>,
    unassigned: Vec<AnimalId>,
}

impl Partition {
    /// Matching animals in identity order.
    #[must_use]
    pub fn animals(&self) -> &[Animal] {
        &self.animals
    }

    /// Matching barns in identity order.
    #[must_use]
    pub fn barns(&self) -> &[Barn] {
        &self.barns
    }

    /// The color this partition covers.
    #[must_use]
    pub const fn color(&self) -> Color {
        self.color
    }

    /// Ids of the animals living in `barn_id`, in identity order.
    ///
    /// # Errors
    ///
    /// Fails if `barn_id` is not one of this partition's barns.
    pub fn members(&self, barn_id: BarnId) -> Result<&[AnimalId], AllocationError> {
        self.members
            .get(&barn_id)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                AllocationError::InvariantViolation(format!(
                    "{barn_id} is not a {} barn",
                    self.color
                ))
            })
    }

    /// Number of animals living in `barn_id`. Empty barns report zero.
    ///
    /// # Errors
    ///
    /// Fails if `barn_id` is not one of this partition's barns.
    pub fn population(&self, barn_id: BarnId) -> Result<usize, AllocationError> {
        self.members(barn_id).map(<[AnimalId]>::len)
    }

    /// Every barn with its population, in identity order.
    pub fn populations(&self) -> impl Iterator<Item = (&Barn, usize)> {
        self.barns.iter().map(|barn| {
            let population = self.members.get(&barn.id).map_or(0, Vec::len);
            (barn, population)
        })
    }

    /// Matching animals that reference a barn outside this partition.
    #[must_use]
    pub fn strays(&self) -> &[AnimalId] {
        &self.strays
    }

    /// Matching animals with no barn.
    #[must_use]
    pub fn unassigned(&self) -> &[AnimalId] {
        &self.unassigned
    }
}
