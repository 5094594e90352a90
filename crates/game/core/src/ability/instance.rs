use std::collections::BTreeSet;
use std::time::Duration;

use glam::Vec3;

use super::context::{ImpactSource, TickContext};
use super::descriptor::{AbilityConfig, AbilityKind};
use super::Simulator;
use crate::config::ArenaConfig;
use crate::error::CombatError;
use crate::replication::{AbilityCounters, AbilitySnapshot, CreateAbility, Interpolator};
use crate::state::{EntityId, HeroTable, Kinematics, PeerId, Team};

/// Lifecycle of an ability instance. `Destroyed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
pub enum AbilityState {
    Initializing,
    Active,
    Destroying,
    Destroyed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum DestroyReason {
    LifetimeElapsed,
    /// Spent on a target.
    Impact,
    /// Struck world geometry.
    Terrain,
    BuffsExpired,
    ScriptFinished,
    /// A scripted step came due after its caster died or left.
    CasterLost,
    /// The owner's `DestroyAbilityInstance` arrived.
    Remote,
    /// A mirror outlived its lifetime plus grace without hearing from the owner.
    GraceExpired,
    /// The tick failed and the instance was removed to contain it.
    Fault,
    MatchEnded,
}

/// Where a cast starts and which way it faces.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpawnTransform {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl SpawnTransform {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Aims from `origin` toward `target`.
    pub fn toward(origin: Vec3, target: Vec3) -> Self {
        Self {
            origin,
            direction: (target - origin).normalize_or(Vec3::X),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Destroy(DestroyReason),
}

/// Read-only copy state kept by non-owners.
#[derive(Clone, Debug, PartialEq)]
struct MirrorState {
    interpolator: Interpolator,
    counters: AbilityCounters,
    seen_impacts: BTreeSet<u32>,
    last_seq: u32,
    /// Elapsed time carried by the latest accepted snapshot.
    last_heard: Duration,
}

/// One active cast.
///
/// The owning peer drives the composed [`Simulator`] every tick; other peers
/// hold a mirror that only follows snapshots. Hits are remembered in the hit
/// set so a target is never hit twice unless the simulator re-triggers by
/// interval.
#[derive(Clone, Debug)]
pub struct AbilityInstance {
    pub id: EntityId,
    pub caster: EntityId,
    pub owner: PeerId,
    pub team: Team,
    pub config: AbilityConfig,
    pub transform: SpawnTransform,
    state: AbilityState,
    elapsed: Duration,
    hit_set: BTreeSet<EntityId>,
    impacts: u32,
    simulator: Simulator,
    mirror: Option<MirrorState>,
}

impl AbilityInstance {
    /// Creates the owner's instance. It stays `Initializing` until [`Self::initialize`].
    pub fn new(
        id: EntityId,
        caster: EntityId,
        owner: PeerId,
        config: AbilityConfig,
        transform: SpawnTransform,
    ) -> Self {
        let simulator = Simulator::from_config(&config, &transform);
        Self {
            id,
            caster,
            owner,
            team: Team::Neutral,
            config,
            transform,
            state: AbilityState::Initializing,
            elapsed: Duration::ZERO,
            hit_set: BTreeSet::new(),
            impacts: 0,
            simulator,
            mirror: None,
        }
    }

    /// Creates a read-only mirror from the owner's broadcast.
    pub fn mirror(create: CreateAbility) -> Self {
        let mut instance = Self::new(
            create.ability,
            create.caster,
            create.owner,
            create.config,
            create.transform,
        );
        instance.team = create.team;
        instance.mirror = Some(MirrorState {
            interpolator: Interpolator::new(instance.kinematics()),
            counters: instance.counters(),
            seen_impacts: BTreeSet::new(),
            last_seq: 0,
            last_heard: Duration::ZERO,
        });
        instance
    }

    pub fn state(&self) -> AbilityState {
        self.state
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn is_mirror(&self) -> bool {
        self.mirror.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.state == AbilityState::Active
    }

    pub fn hit_set(&self) -> &BTreeSet<EntityId> {
        &self.hit_set
    }

    pub fn impacts(&self) -> u32 {
        self.impacts
    }

    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    pub fn lifetime(&self) -> Option<Duration> {
        self.config.lifetime()
    }

    pub fn kinematics(&self) -> Kinematics {
        if let Some(mirror) = &self.mirror {
            return mirror.interpolator.current();
        }
        match &self.simulator {
            Simulator::Projectile(sim) => sim.kinematics(),
            Simulator::AreaScan(scanner) => Kinematics::at(scanner.center()),
            Simulator::PureBuff(aura) => Kinematics::at(aura.center()),
            Simulator::Scripted(_) => Kinematics::at(self.transform.origin),
        }
    }

    pub fn counters(&self) -> AbilityCounters {
        if let Some(mirror) = &self.mirror {
            return mirror.counters;
        }
        match &self.simulator {
            Simulator::Projectile(sim) => sim.counters(self.impacts),
            Simulator::AreaScan(scanner) => scanner.counters(self.impacts),
            Simulator::PureBuff(_) | Simulator::Scripted(_) => AbilityCounters {
                impacts: self.impacts,
                ..AbilityCounters::default()
            },
        }
    }

    /// Binds the caster and performs one-time setup, then enters `Active`.
    ///
    /// # Errors
    ///
    /// [`CombatError::InvalidCaster`] if the caster is gone or dead. Nothing
    /// has been applied in that case and the instance must be discarded.
    pub fn initialize(&mut self, ctx: &mut TickContext<'_>) -> Result<(), CombatError> {
        if self.state != AbilityState::Initializing {
            return Ok(());
        }
        let caster = ctx
            .heroes
            .get(&self.caster)
            .filter(|hero| !hero.is_dead())
            .ok_or(CombatError::InvalidCaster {
                ability: self.id,
                caster: self.caster,
            })?;
        self.team = caster.team;

        let Self {
            id,
            caster,
            team,
            config,
            elapsed,
            hit_set,
            impacts,
            simulator,
            ..
        } = self;
        let config: &AbilityConfig = config;
        let mut source = ImpactSource {
            ability: *id,
            caster: *caster,
            team: *team,
            config,
            elapsed: *elapsed,
            hit_set,
            impacts,
        };
        match (simulator, &config.kind) {
            (Simulator::PureBuff(aura), AbilityKind::PureBuff(params)) => {
                aura.initialize(params, &mut source, ctx)?;
            }
            (Simulator::Scripted(runner), AbilityKind::Scripted(params)) => {
                runner.initialize(params, *id, ctx);
            }
            _ => {}
        }

        self.state = AbilityState::Active;
        tracing::debug!(ability = %self.id, key = %self.config.key, "ability active");
        Ok(())
    }

    /// Mirror-side initialization: only checks that the caster is known.
    pub fn initialize_mirror(&mut self, heroes: &HeroTable) -> Result<(), CombatError> {
        if self.state != AbilityState::Initializing {
            return Ok(());
        }
        if !heroes.contains_key(&self.caster) {
            return Err(CombatError::InvalidCaster {
                ability: self.id,
                caster: self.caster,
            });
        }
        self.state = AbilityState::Active;
        Ok(())
    }

    /// Runs one owner-side tick at the current elapsed time, then advances it.
    pub fn tick(&mut self, ctx: &mut TickContext<'_>, dt: Duration) -> TickOutcome {
        if self.state != AbilityState::Active || self.mirror.is_some() {
            return TickOutcome::Continue;
        }
        let lifetime = self.config.lifetime();

        let Self {
            id,
            caster,
            team,
            config,
            elapsed,
            hit_set,
            impacts,
            simulator,
            ..
        } = self;
        let config: &AbilityConfig = config;
        let mut source = ImpactSource {
            ability: *id,
            caster: *caster,
            team: *team,
            config,
            elapsed: *elapsed,
            hit_set,
            impacts,
        };
        let stepped = match (simulator, &config.kind) {
            (Simulator::Projectile(sim), AbilityKind::Projectile(params)) => {
                Ok(sim.step(params, &mut source, ctx, dt))
            }
            (Simulator::AreaScan(scanner), AbilityKind::AreaScan(params)) => {
                scanner.step(params, &mut source, ctx, dt);
                Ok(None)
            }
            (Simulator::PureBuff(aura), AbilityKind::PureBuff(params)) => {
                Ok(aura.step(params, &source, ctx, lifetime))
            }
            (Simulator::Scripted(runner), AbilityKind::Scripted(params)) => {
                Ok(runner.step(params, lifetime.is_some()))
            }
            _ => Err(config.tag()),
        };
        *elapsed += dt;

        match stepped {
            Ok(Some(reason)) => TickOutcome::Destroy(reason),
            Ok(None) if lifetime.is_some_and(|lifetime| *elapsed >= lifetime) => {
                TickOutcome::Destroy(DestroyReason::LifetimeElapsed)
            }
            Ok(None) => TickOutcome::Continue,
            Err(kind) => {
                tracing::warn!(ability = %id, %kind, "simulator does not match ability kind");
                TickOutcome::Destroy(DestroyReason::Fault)
            }
        }
    }

    /// Fires a scheduled script step. Ignored unless this is an active owner
    /// instance of a scripted ability.
    pub fn run_script_step(&mut self, step: usize, ctx: &mut TickContext<'_>) {
        if self.state != AbilityState::Active || self.mirror.is_some() {
            return;
        }
        let Self {
            id,
            caster,
            team,
            config,
            elapsed,
            hit_set,
            impacts,
            simulator,
            ..
        } = self;
        let config: &AbilityConfig = config;
        if let (Simulator::Scripted(runner), AbilityKind::Scripted(params)) =
            (simulator, &config.kind)
        {
            let mut source = ImpactSource {
                ability: *id,
                caster: *caster,
                team: *team,
                config,
                elapsed: *elapsed,
                hit_set,
                impacts,
            };
            runner.run_step(params, step, &mut source, ctx);
        }
    }

    /// Mirror-side tick: follow the latest snapshot and expire locally once
    /// the owner has been silent past the grace period.
    pub fn advance_mirror(&mut self, dt: Duration, config: &ArenaConfig) -> TickOutcome {
        if self.state != AbilityState::Active {
            return TickOutcome::Continue;
        }
        let lifetime = self.config.lifetime();
        let Some(mirror) = self.mirror.as_mut() else {
            return TickOutcome::Continue;
        };
        self.elapsed += dt;
        mirror.interpolator.advance(dt, config.snapshot_smoothing);

        let expired = match lifetime {
            Some(lifetime) => self.elapsed >= lifetime + config.mirror_grace,
            None => self.elapsed.saturating_sub(mirror.last_heard) >= config.mirror_grace,
        };
        if expired {
            TickOutcome::Destroy(DestroyReason::GraceExpired)
        } else {
            TickOutcome::Continue
        }
    }

    /// Applies an owner snapshot. Returns `false` for stale or duplicate
    /// sequences and for owner instances.
    pub fn apply_snapshot(&mut self, snapshot: &AbilitySnapshot) -> bool {
        let Some(mirror) = self.mirror.as_mut() else {
            return false;
        };
        if snapshot.seq <= mirror.last_seq {
            return false;
        }
        mirror.last_seq = snapshot.seq;
        mirror.last_heard = snapshot.elapsed;
        mirror.counters = snapshot.counters;
        mirror.interpolator.retarget(snapshot.kinematics);
        self.elapsed = snapshot.elapsed;
        self.impacts = snapshot.counters.impacts;
        true
    }

    /// Mirror-side bookkeeping for an impact reported by the owner. Returns
    /// `false` when this impact was already seen.
    pub fn record_remote_impact(&mut self, ordinal: u32, target: Option<EntityId>) -> bool {
        let Some(mirror) = self.mirror.as_mut() else {
            return false;
        };
        if !mirror.seen_impacts.insert(ordinal) {
            return false;
        }
        if let Some(target) = target {
            self.hit_set.insert(target);
        }
        true
    }

    pub fn snapshot(&self, seq: u32) -> AbilitySnapshot {
        AbilitySnapshot {
            ability: self.id,
            seq,
            elapsed: self.elapsed,
            kinematics: self.kinematics(),
            counters: self.counters(),
        }
    }

    pub fn create_message(&self) -> CreateAbility {
        CreateAbility {
            ability: self.id,
            caster: self.caster,
            owner: self.owner,
            team: self.team,
            config: self.config.clone(),
            transform: self.transform,
        }
    }

    /// Enters `Destroying`. Returns `false` if destruction already began.
    pub fn begin_destroy(&mut self) -> bool {
        match self.state {
            AbilityState::Destroying | AbilityState::Destroyed => false,
            AbilityState::Initializing | AbilityState::Active => {
                self.state = AbilityState::Destroying;
                true
            }
        }
    }

    pub fn finish_destroy(&mut self) {
        self.state = AbilityState::Destroyed;
    }
}
