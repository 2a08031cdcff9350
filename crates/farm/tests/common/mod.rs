#![allow(dead_code)]

use std::collections::HashMap;

use proven_farm::{Allocator, AllocatorConfig, Animal, BarnId, Color};
use proven_locks_memory::MemoryLockManager;
use proven_store::Store1;
use proven_store_memory::MemoryStore;

pub type TestAllocator = Allocator<MemoryStore, MemoryLockManager>;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn allocator(capacity: usize) -> TestAllocator {
    init_tracing();
    let store = Store1::scope(&MemoryStore::new(), "farm");
    Allocator::new(
        AllocatorConfig::new(capacity).unwrap(),
        store,
        MemoryLockManager::new(),
    )
}

/// Barn populations for `color`, in barn identity order.
pub async fn populations(allocator: &TestAllocator, color: Color) -> Vec<usize> {
    allocator
        .populations(color)
        .await
        .unwrap()
        .into_iter()
        .map(|(_, population)| population)
        .collect()
}

/// Members of each barn, keyed by barn.
pub async fn members(allocator: &TestAllocator) -> HashMap<BarnId, Vec<Animal>> {
    let mut members: HashMap<BarnId, Vec<Animal>> = HashMap::new();
    for animal in allocator.find_all_animals().await.unwrap() {
        if let Some(barn) = animal.barn {
            members.entry(barn).or_default().push(animal);
        }
    }
    members
}

/// Checks capacity, balance, color agreement, no empty barns, and that each
/// color uses exactly as many barns as it needs.
pub async fn assert_farm_invariants(allocator: &TestAllocator, balanced: bool) {
    let capacity = allocator.config().capacity();
    let animals = allocator.find_all_animals().await.unwrap();
    let barns = allocator.find_all_barns().await.unwrap();

    for animal in &animals {
        let barn_id = animal.barn.expect("every animal has a barn");
        let barn = barns
            .iter()
            .find(|barn| barn.id == barn_id)
            .expect("animal references an existing barn");
        assert_eq!(barn.color, animal.favorite_color, "{animal:?} in {barn:?}");
    }

    for color in Color::ALL {
        let counts = populations(allocator, color).await;
        let total: usize = counts.iter().sum();

        assert!(counts.iter().all(|&count| count <= capacity), "{color}: {counts:?}");
        assert!(counts.iter().all(|&count| count > 0), "{color}: {counts:?}");
        assert_eq!(counts.len(), total.div_ceil(capacity), "{color}: {counts:?}");

        if balanced {
            if let (Some(max), Some(min)) = (counts.iter().max(), counts.iter().min()) {
                assert!(max - min <= 1, "{color}: {counts:?}");
            }
        }
    }
}
