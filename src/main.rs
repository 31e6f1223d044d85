// SPDX-License-Identifier: MIT

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use trigger_rs::condition::serialization::DocumentLoader;
use trigger_rs::condition::{ConditionManager, ConditionService, EventBus};
use trigger_rs::runtime::{EngineConfig, GameEvent, SnapshotWorld, WorldSnapshot};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Engine configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check that a condition document can be loaded
    Validate {
        /// Path to the condition document (JSON or YAML)
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Print the status tree of a condition document against a world snapshot
    Inspect {
        #[arg(short, long)]
        file: PathBuf,

        /// World snapshot (JSON or YAML); empty world when omitted
        #[arg(short, long)]
        world: Option<PathBuf>,
    },
    /// Feed a recorded event log through a condition document
    Replay {
        #[arg(short, long)]
        file: PathBuf,

        /// Event log: a list of tagged game events (JSON or YAML)
        #[arg(short, long)]
        events: PathBuf,

        #[arg(short, long)]
        world: Option<PathBuf>,
    },
}

fn load_world(path: Option<&Path>) -> anyhow::Result<Arc<SnapshotWorld>> {
    let snapshot = match path {
        Some(path) => DocumentLoader::read_structured::<WorldSnapshot, _>(path)
            .with_context(|| format!("Failed to read world {}", path.display()))?,
        None => WorldSnapshot::default(),
    };
    Ok(Arc::new(SnapshotWorld::new(snapshot)))
}

fn load_manager(
    file: &Path,
    world: Arc<SnapshotWorld>,
    config: &EngineConfig,
) -> anyhow::Result<ConditionManager> {
    let document = DocumentLoader::read_document(file)?;
    let mut manager = ConditionManager::with_config(world, config);
    manager
        .load_document(&document)
        .with_context(|| format!("Failed to load conditions from {}", file.display()))?;
    Ok(manager)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    }
    .with_env_overrides()?;
    log::debug!("Engine config: {:?}", config);

    match args.command {
        Commands::Validate { file } => {
            let manager = load_manager(&file, load_world(None)?, &config)?;
            println!(
                "{}: OK ({} root, {} conditions)",
                file.display(),
                manager.root_kind(),
                manager.conditions().len()
            );
        }
        Commands::Inspect { file, world } => {
            let world = load_world(world.as_deref())?;
            let mut manager = load_manager(&file, world, &config)?;
            manager.activate();
            println!("{}", manager.status_info(0, true));
            if let Some(next) = manager.next_trigger_time() {
                println!("Next trigger: {}", next.format("%Y-%m-%d %H:%M:%S"));
            }
        }
        Commands::Replay {
            file,
            events,
            world,
        } => {
            let world = load_world(world.as_deref())?;
            let manager = load_manager(&file, Arc::clone(&world), &config)?;
            let events: Vec<GameEvent> = DocumentLoader::read_structured(&events)
                .with_context(|| format!("Failed to read events {}", events.display()))?;

            let bus = EventBus::new();
            let service = ConditionService::new(file.display().to_string(), manager, bus.clone());
            service.register_events().await;

            let mut was_met = service.are_conditions_met().await;
            println!("start: {}", if was_met { "MET" } else { "not met" });
            for (index, event) in events.iter().enumerate() {
                world.apply(event);
                bus.publish(event).await;
                let met = service.are_conditions_met().await;
                if met != was_met {
                    println!(
                        "#{} {}: {}",
                        index,
                        event.name(),
                        if met { "MET" } else { "no longer met" }
                    );
                    was_met = met;
                }
            }
            println!("{}", service.status_info(true).await);
            service.unregister_events().await;
        }
    }

    Ok(())
}
