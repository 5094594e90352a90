use std::time::Duration;

/// Arena configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArenaConfig {
    /// Delay between a hero's death and its respawn, measured on the master.
    pub respawn_delay: Duration,
    /// Cadence of the snapshot stream.
    pub network_tick_interval: Duration,
    /// Fraction of the remaining error closed per tick when a mirror chases
    /// its latest snapshot. `1.0` snaps immediately.
    pub snapshot_smoothing: f32,
    /// Extra lifetime granted to a mirrored ability before it removes itself
    /// locally without having seen the owner's destroy message.
    pub mirror_grace: Duration,
    /// How long the master remembers processed damage/heal request keys.
    pub dedupe_window: Duration,
    /// Smallest duration accepted from ability parameters.
    pub min_duration: Duration,
    /// Collision radius of every hero.
    pub hero_radius: f32,
}

impl ArenaConfig {
    // ===== compile-time constants used as type parameters =====
    pub const MAX_BUFFS_PER_HERO: usize = 16;
    /// Upper bound on swept-query iterations inside a single projectile tick.
    pub const MAX_PENETRATION_STEPS: usize = 8;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_RESPAWN_DELAY: Duration = Duration::from_secs(5);
    pub const DEFAULT_NETWORK_TICK_INTERVAL: Duration = Duration::from_millis(50);
    pub const DEFAULT_SNAPSHOT_SMOOTHING: f32 = 0.35;
    pub const DEFAULT_MIRROR_GRACE: Duration = Duration::from_secs(2);
    pub const DEFAULT_DEDUPE_WINDOW: Duration = Duration::from_secs(10);
    pub const DEFAULT_MIN_DURATION: Duration = Duration::from_millis(10);
    pub const DEFAULT_HERO_RADIUS: f32 = 0.5;

    pub fn new() -> Self {
        Self {
            respawn_delay: Self::DEFAULT_RESPAWN_DELAY,
            network_tick_interval: Self::DEFAULT_NETWORK_TICK_INTERVAL,
            snapshot_smoothing: Self::DEFAULT_SNAPSHOT_SMOOTHING,
            mirror_grace: Self::DEFAULT_MIRROR_GRACE,
            dedupe_window: Self::DEFAULT_DEDUPE_WINDOW,
            min_duration: Self::DEFAULT_MIN_DURATION,
            hero_radius: Self::DEFAULT_HERO_RADIUS,
        }
    }

    pub fn with_respawn_delay(mut self, respawn_delay: Duration) -> Self {
        self.respawn_delay = respawn_delay;
        self
    }

    pub fn with_network_tick_interval(mut self, interval: Duration) -> Self {
        self.network_tick_interval = interval;
        self
    }

    pub fn with_snapshot_smoothing(mut self, smoothing: f32) -> Self {
        self.snapshot_smoothing = smoothing;
        self
    }

    /// Smallest duration as fractional seconds, the unit ability parameters use.
    pub fn min_secs(&self) -> f32 {
        self.min_duration.as_secs_f32()
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Longest span [`secs`] produces. Far enough out to mean "never", close
/// enough that adding it to a match clock cannot overflow.
pub const SECS_CEILING: Duration = Duration::from_secs(u32::MAX as u64);

/// Converts fractional seconds to a [`Duration`]. Negative and NaN input
/// gives zero; anything past [`SECS_CEILING`], infinity included, saturates
/// to it.
pub fn secs(value: f32) -> Duration {
    if value.is_nan() || value <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f32(value).map_or(SECS_CEILING, |span| span.min(SECS_CEILING))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secs_never_panics() {
        assert_eq!(secs(-1.0), Duration::ZERO);
        assert_eq!(secs(f32::NAN), Duration::ZERO);
        assert_eq!(secs(0.5), Duration::from_millis(500));
        assert_eq!(secs(f32::INFINITY), SECS_CEILING);
        assert_eq!(secs(f32::MAX), SECS_CEILING);
    }
}
