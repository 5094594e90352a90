//! Arena configuration loader.
//!
//! The TOML file states durations in fractional seconds; anything left out
//! keeps the [`ArenaConfig`] default.

use std::path::Path;
use std::time::Duration;

use arena_core::ArenaConfig;
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

const EMBEDDED: &str = include_str!("../../data/arena.toml");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ArenaConfigToml {
    respawn_delay: f32,
    network_tick_interval: f32,
    snapshot_smoothing: f32,
    mirror_grace: f32,
    dedupe_window: f32,
    min_duration: f32,
    hero_radius: f32,
}

impl Default for ArenaConfigToml {
    fn default() -> Self {
        let config = ArenaConfig::default();
        Self {
            respawn_delay: config.respawn_delay.as_secs_f32(),
            network_tick_interval: config.network_tick_interval.as_secs_f32(),
            snapshot_smoothing: config.snapshot_smoothing,
            mirror_grace: config.mirror_grace.as_secs_f32(),
            dedupe_window: config.dedupe_window.as_secs_f32(),
            min_duration: config.min_duration.as_secs_f32(),
            hero_radius: config.hero_radius,
        }
    }
}

impl ArenaConfigToml {
    fn into_config(self) -> LoadResult<ArenaConfig> {
        for (field, value) in [
            ("respawn_delay", self.respawn_delay),
            ("network_tick_interval", self.network_tick_interval),
            ("mirror_grace", self.mirror_grace),
            ("dedupe_window", self.dedupe_window),
            ("min_duration", self.min_duration),
        ] {
            anyhow::ensure!(
                value.is_finite() && value >= 0.0,
                "{} must be a non-negative number of seconds, got {}",
                field,
                value
            );
        }
        anyhow::ensure!(self.min_duration > 0.0, "min_duration must be positive");
        anyhow::ensure!(
            self.snapshot_smoothing > 0.0 && self.snapshot_smoothing <= 1.0,
            "snapshot_smoothing must be in (0, 1], got {}",
            self.snapshot_smoothing
        );
        anyhow::ensure!(
            self.hero_radius.is_finite() && self.hero_radius > 0.0,
            "hero_radius must be positive, got {}",
            self.hero_radius
        );

        Ok(ArenaConfig {
            respawn_delay: secs(self.respawn_delay),
            network_tick_interval: secs(self.network_tick_interval),
            snapshot_smoothing: self.snapshot_smoothing,
            mirror_grace: secs(self.mirror_grace),
            dedupe_window: secs(self.dedupe_window),
            min_duration: secs(self.min_duration),
            hero_radius: self.hero_radius,
        })
    }
}

/// Whole microseconds, so that `0.05` reads back as exactly 50 ms.
fn secs(value: f32) -> Duration {
    Duration::from_micros((f64::from(value) * 1e6).round() as u64)
}

/// Loader for arena configuration from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(path: &Path) -> LoadResult<ArenaConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("Failed to load config from {}: {}", path.display(), e))
    }

    /// The configuration shipped in `data/arena.toml`.
    pub fn embedded() -> LoadResult<ArenaConfig> {
        Self::parse(EMBEDDED)
    }

    pub fn parse(content: &str) -> LoadResult<ArenaConfig> {
        let raw: ArenaConfigToml = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;
        raw.into_config()
    }
}
