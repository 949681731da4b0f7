use std::path::PathBuf;

use anyhow::{Context, bail};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use draw_engine::cascade::DrawEngine;
use draw_engine::commands::Command;
use draw_engine::config::EngineConfig;
use draw_engine::persistence::{load_snapshot, save_snapshot_atomic};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "draw_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args_os().skip(1);
    let (Some(snapshot_path), Some(commands_path)) = (args.next(), args.next()) else {
        bail!("usage: draw_engine <snapshot.json> <commands.json>");
    };
    let snapshot_path = PathBuf::from(snapshot_path);
    let commands_path = PathBuf::from(commands_path);

    let config = EngineConfig::from_env().context("loading engine config")?;
    let engine = DrawEngine::new(config);

    let mut draw = load_snapshot(&snapshot_path)
        .with_context(|| format!("loading {}", snapshot_path.display()))?
        .draw;
    let bytes = std::fs::read(&commands_path)
        .with_context(|| format!("reading {}", commands_path.display()))?;
    let commands: Vec<Command> = serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing {}", commands_path.display()))?;

    let mut applied = 0;
    let mut failure = None;
    for (i, command) in commands.iter().enumerate() {
        match engine.apply_in_place(&mut draw, command) {
            Ok(_) => applied += 1,
            Err(e) => {
                failure = Some(anyhow::Error::new(e).context(format!("command {} ({})", i, command.name())));
                break;
            }
        }
    }

    save_snapshot_atomic(&snapshot_path, &draw)
        .with_context(|| format!("saving {}", snapshot_path.display()))?;

    for structure in &draw.structures {
        let (completed, bye, upcoming, pending) = engine
            .buckets(&draw, &structure.structure_id)?
            .counts();
        tracing::info!(
            structure = %structure.structure_id,
            completed,
            bye,
            upcoming,
            pending,
            "structure progress"
        );
    }
    tracing::info!(applied, total = commands.len(), "replay finished");

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
