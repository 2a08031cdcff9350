//! Placement and rebalancing decisions.
//!
//! Everything here operates on a [`WorkingSet`] and never touches storage.
//! Populations are re-derived through the [`GroupIndex`] after every move so
//! each decision sees the moves made before it.

use crate::{AllocationError, AnimalId, BarnId, Color, GroupIndex, Partition, WorkingSet};

use std::collections::VecDeque;

use tracing::{debug, warn};

/// Where an incoming animal goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertPlan {
    /// No barn of the color exists yet.
    FirstBarn,

    /// Every barn of the color is full; open a new barn and spread animals
    /// into it.
    NewBarn,

    /// Join an existing barn.
    Existing(BarnId),
}

/// What a removal did to the remaining animals of its color.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemovalOutcome {
    /// The former barn was deleted and its animals moved into the others.
    Consolidated {
        /// The deleted barn.
        deleted_barn: BarnId,

        /// Animals rehoused, in the order they were placed.
        rehoused: Vec<(AnimalId, BarnId)>,
    },

    /// One animal was moved into the under-populated former barn.
    Refilled {
        /// The animal that moved.
        animal: AnimalId,

        /// The barn it came from.
        from: BarnId,
    },

    /// The removal left an acceptable distribution.
    Unchanged,
}

fn violation(message: String) -> AllocationError {
    warn!(%message, "refusing to rebalance");
    AllocationError::InvariantViolation(message)
}

// Animals pointing at a barn outside their color are invisible to every
// population count.
fn reject_strays(partition: &Partition) -> Result<(), AllocationError> {
    match partition.strays() {
        [] => Ok(()),
        [first, ..] => Err(violation(format!(
            "{first} references a barn that is not a {} barn",
            partition.color()
        ))),
    }
}

/// Decides where a new animal goes, given the partition of its color
/// before it is added.
///
/// # Errors
///
/// Fails if an animal of the color references a barn of another color, if
/// no barn qualifies, or if the chosen barn is already full. The last two
/// cannot happen while barn populations are balanced.
pub fn plan_insert(partition: &Partition, capacity: usize) -> Result<InsertPlan, AllocationError> {
    reject_strays(partition)?;

    let barn_count = partition.barns().len();
    let animal_count = partition.animals().len();

    if barn_count == 0 {
        return Ok(InsertPlan::FirstBarn);
    }

    if animal_count % capacity == 0 {
        return Ok(InsertPlan::NewBarn);
    }

    let average = animal_count / barn_count;

    // Least populated eligible barn, oldest first on ties.
    let (barn, population) = partition
        .populations()
        .filter(|(_, population)| *population <= average)
        .min_by_key(|(barn, population)| (*population, barn.id))
        .ok_or_else(|| {
            violation(format!(
                "no {} barn at or below average {average}",
                partition.color()
            ))
        })?;

    if population >= capacity {
        return Err(AllocationError::CapacityExhausted {
            barn: barn.id,
            capacity,
        });
    }

    debug!(barn = %barn.id, population, average, "joining existing barn");
    Ok(InsertPlan::Existing(barn.id))
}

/// Orders the members of a partition for [`spread_into_new_barn`]: the
/// first member of every barn, then the second of every barn, and so on.
/// Barns are visited in identity order and members in identity order within
/// a barn, so consecutive moves come from different barns.
#[must_use]
pub fn spread_candidates(partition: &Partition) -> Vec<AnimalId> {
    let rows: Vec<&[AnimalId]> = partition
        .barns()
        .iter()
        .filter_map(|barn| partition.members(barn.id).ok())
        .collect();
    let depth = rows.iter().copied().map(<[AnimalId]>::len).max().unwrap_or(0);

    let mut order = Vec::with_capacity(partition.animals().len());
    for rank in 0..depth {
        order.extend(rows.iter().filter_map(|row| row.get(rank).copied()));
    }
    order
}

/// Moves animals from `candidates` into the freshly created `new_barn`
/// until it reaches the target average.
///
/// `candidates` are the animals of the color that existed before the insert,
/// ordered by [`spread_candidates`]. `existing_barns` is the barn count
/// before `new_barn` was created. Returns the animals moved.
///
/// # Errors
///
/// Fails if a candidate has vanished, has no barn, or lives in a barn of
/// another color.
pub fn spread_into_new_barn(
    working_set: &mut WorkingSet,
    color: Color,
    new_barn: BarnId,
    candidates: &[AnimalId],
    existing_barns: usize,
) -> Result<Vec<AnimalId>, AllocationError> {
    let target = (candidates.len() + 1) / (existing_barns + 1);
    let mut moved = Vec::new();

    for &animal_id in candidates {
        let partition = GroupIndex::partition(working_set, color);

        let current_barn = working_set
            .animal(animal_id)
            .ok_or(AllocationError::AnimalNotFound(animal_id))?
            .barn
            .ok_or_else(|| violation(format!("{animal_id} has no barn")))?;

        let new_population = partition.population(new_barn)?;
        let current_population = partition.population(current_barn)?;

        if new_population < target && current_population > target {
            working_set.assign(animal_id, Some(new_barn))?;
            moved.push(animal_id);
        }
    }

    debug!(barn = %new_barn, target, moved = moved.len(), "spread animals into new barn");
    Ok(moved)
}

/// Restores balance after an animal that lived in `former_barn` has been
/// deleted from the working set.
///
/// # Errors
///
/// Fails if the former barn is not a barn of `color`, if an animal of the
/// color references a barn of another color, if consolidation
/// cannot rehouse exactly the displaced animals, or if no barn can donate
/// an animal to the former barn.
pub fn rebalance_after_removal(
    working_set: &mut WorkingSet,
    color: Color,
    former_barn: BarnId,
    capacity: usize,
) -> Result<RemovalOutcome, AllocationError> {
    let partition = GroupIndex::partition(working_set, color);
    reject_strays(&partition)?;

    let animal_count = partition.animals().len();
    let barn_count = partition.barns().len();
    let former_population = partition.population(former_barn)?;

    if animal_count % capacity == 0 {
        return consolidate(working_set, &partition, former_barn, capacity);
    }

    let average = animal_count / barn_count;
    if former_population >= average {
        debug!(barn = %former_barn, former_population, average, "no rebalancing needed");
        return Ok(RemovalOutcome::Unchanged);
    }

    let donor = partition
        .populations()
        .find(|(_, population)| *population > average)
        .map(|(barn, _)| barn.id)
        .ok_or_else(|| {
            violation(format!(
                "{former_barn} is below average {average} but no {color} barn is above it"
            ))
        })?;

    let animal = *partition
        .members(donor)?
        .first()
        .ok_or_else(|| violation(format!("donor {donor} has no animals")))?;

    working_set.assign(animal, Some(former_barn))?;
    debug!(%animal, from = %donor, to = %former_barn, "refilled under-populated barn");

    Ok(RemovalOutcome::Refilled {
        animal,
        from: donor,
    })
}

fn consolidate(
    working_set: &mut WorkingSet,
    partition: &Partition,
    former_barn: BarnId,
    capacity: usize,
) -> Result<RemovalOutcome, AllocationError> {
    let displaced = partition.members(former_barn)?;

    for &animal_id in displaced {
        working_set.assign(animal_id, None)?;
    }
    working_set.delete_barn(former_barn);

    let mut homeless: VecDeque<AnimalId> = partition
        .unassigned()
        .iter()
        .chain(displaced)
        .copied()
        .collect();
    let mut rehoused = Vec::with_capacity(homeless.len());

    for (barn, population) in partition.populations() {
        if barn.id == former_barn {
            continue;
        }

        for _ in population..capacity {
            let animal_id = homeless.pop_front().ok_or_else(|| {
                violation(format!(
                    "ran out of displaced animals while filling {}",
                    barn.id
                ))
            })?;
            working_set.assign(animal_id, Some(barn.id))?;
            rehoused.push((animal_id, barn.id));
        }
    }

    if !homeless.is_empty() {
        return Err(violation(format!(
            "{} displaced animals left without a barn",
            homeless.len()
        )));
    }

    debug!(barn = %former_barn, rehoused = rehoused.len(), "consolidated barns");
    Ok(RemovalOutcome::Consolidated {
        deleted_barn: former_barn,
        rehoused,
    })
}
