//! CLI binary that runs a plan of arrivals and departures against an
//! in-memory farm and reports the resulting barns.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::Parser;
use proven_farm::{Allocator, AllocatorConfig, AnimalId, Color, DEFAULT_BARN_CAPACITY, NewAnimal};
use proven_locks::LockManager1;
use proven_locks_memory::MemoryLockManager;
use proven_store::Store1;
use proven_store_memory::MemoryStore;
use serde::Deserialize;
use tracing::info;

/// CLI-specific error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid allocator configuration
    #[error("config error: {0}")]
    Config(#[from] proven_farm::AllocationError),

    /// Farm error
    #[error(transparent)]
    Farm(#[from] proven_farm::Error<proven_store_memory::Error>),

    /// Plan file could not be read
    #[error("failed to read plan {path}: {source}")]
    PlanRead {
        /// Path of the plan file
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Plan file is not valid JSON
    #[error("invalid plan: {0}")]
    PlanFormat(#[from] serde_json::Error),

    /// Plan adds two animals under one name
    #[error("plan adds animal `{0}` twice")]
    DuplicateAnimal(String),

    /// Plan removes an animal it never added
    #[error("plan removes unknown animal `{0}`")]
    UnknownAnimal(String),
}

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of animals a barn holds
    #[arg(long, default_value_t = DEFAULT_BARN_CAPACITY, env = "PROVEN_FARM_CAPACITY")]
    capacity: usize,

    /// Store scope the farm lives under
    #[arg(long, default_value = "farm", env = "PROVEN_FARM_SCOPE")]
    scope: String,

    /// JSON plan of `add` and `remove` steps; runs a demo plan when omitted
    #[arg(long)]
    plan: Option<PathBuf>,
}

type MemoryAllocator = Allocator<MemoryStore, MemoryLockManager>;

/// One step of a plan, e.g. `{"add": {"name": "Bessie", "color": "red"}}` or
/// `{"remove": {"name": "Bessie"}}`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum Step {
    Add { name: String, color: Color },
    Remove { name: String },
}

fn demo_plan() -> Vec<Step> {
    let add = |name: &str, color| Step::Add {
        name: name.to_string(),
        color,
    };
    let remove = |name: &str| Step::Remove {
        name: name.to_string(),
    };

    vec![
        add("Bessie", Color::Red),
        add("Clover", Color::Red),
        add("Daisy", Color::Red),
        add("Ferdinand", Color::Blue),
        add("Gertie", Color::Red),
        add("Hamlet", Color::Green),
        add("Ivy", Color::Blue),
        remove("Clover"),
        add("Jasper", Color::Red),
        remove("Ferdinand"),
    ]
}

fn read_plan(path: &Path) -> Result<Vec<Step>, Error> {
    let contents = std::fs::read_to_string(path).map_err(|source| Error::PlanRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&contents)?)
}

/// Applies `steps` in order. Names are unique among living animals; a name
/// becomes free again once its animal is removed.
async fn run_plan(
    allocator: &MemoryAllocator,
    steps: Vec<Step>,
) -> Result<HashMap<String, AnimalId>, Error> {
    let mut names: HashMap<String, AnimalId> = HashMap::new();

    for step in steps {
        match step {
            Step::Add { name, color } => {
                if names.contains_key(&name) {
                    return Err(Error::DuplicateAnimal(name));
                }
                let animal = allocator.insert(NewAnimal::new(name.clone(), color)).await?;
                names.insert(name, animal.id);
            }
            Step::Remove { name } => {
                let id = names.remove(&name).ok_or(Error::UnknownAnimal(name))?;
                allocator.remove(id).await?;
            }
        }
    }

    Ok(names)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = AllocatorConfig::new(args.capacity)?;
    let steps = match &args.plan {
        Some(path) => read_plan(path)?,
        None => demo_plan(),
    };

    let store = Store1::scope(&MemoryStore::new(), args.scope.as_str());
    let lock_manager = LockManager1::scope(&MemoryLockManager::new(), &args.scope);
    let allocator = Allocator::new(config, store, lock_manager);

    info!(capacity = config.capacity(), steps = steps.len(), "running plan");
    let names = run_plan(&allocator, steps).await?;
    info!(animals = names.len(), "plan complete");

    for color in Color::ALL {
        let populations = allocator.populations(color).await?;
        if populations.is_empty() {
            continue;
        }
        let counts: Vec<usize> = populations.iter().map(|(_, count)| *count).collect();
        info!(%color, barns = populations.len(), ?counts, "barn populations");
    }

    Ok(())
}
