//! Headless duel over the loopback network.
//!
//! Boots a two-peer match from the embedded content (or `ARENA_DATA_DIR`),
//! plays a scripted duel, logs what each peer saw and prints a JSON summary
//! on stdout.
mod duel;
mod summary;

use std::path::PathBuf;

use anyhow::{Context, Result};
use arena_content::{Content, ContentFactory};
use arena_runtime::{LocalMatch, RuntimeConfig};

use duel::DuelScript;
use summary::MatchSummary;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();
    setup_logging();

    let config = RuntimeConfig::from_env().context("invalid runtime configuration")?;
    let content = load_content()?;
    for (ability, issue) in content.abilities.audit(content.config.min_secs()) {
        tracing::warn!(%ability, %issue, "catalog entry will be clamped");
    }

    let script = DuelScript::standard();
    let mut builder = LocalMatch::builder(content).config(config);
    builder = script.seat(builder);
    let mut game = builder.build().context("failed to set up the match")?;

    let mut summary = MatchSummary::new(game.event_bus());
    tracing::info!(
        hz = game.config().tick_hz,
        duplicate_chance = game.config().faults.duplicate_chance,
        reorder = game.config().faults.reorder,
        "duel starting"
    );

    script.play(&mut game, &mut summary).await?;
    summary.finish(&game);
    game.finish().await?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn load_content() -> Result<Content> {
    match std::env::var_os("ARENA_DATA_DIR") {
        Some(dir) => {
            let dir = PathBuf::from(dir);
            tracing::info!(dir = %dir.display(), "loading content");
            ContentFactory::new(dir).load()
        }
        None => Content::embedded(),
    }
}

/// Logs to stderr, filtered by `RUST_LOG` (default `info`).
fn setup_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
