//! One peer's combat simulation.
//!
//! The [`Simulation`] owns every registry of a match (entities, buffs, timers,
//! the combat authority, the outbox) and advances them in a fixed order each
//! tick. Remote messages enter through [`Simulation::receive`]; everything the
//! tick produced leaves through [`Simulation::flush`] once the tick is done, so
//! no effect is ever announced before it has been applied locally.

mod events;
mod handlers;

pub use events::{CombatEvent, CombatEventKind};
pub use handlers::{Handler, HandlerResult, HandlerTable};

use std::collections::BTreeSet;
use std::time::Duration;

use glam::Vec3;

use crate::ability::{
    AbilityInstance, AbilityKey, DestroyReason, Simulator, SpawnTransform, TickContext,
    TickOutcome,
};
use crate::buffs::{BuffLedger, BuffRecord};
use crate::combat::{CombatAuthority, ManaSpend};
use crate::config::ArenaConfig;
use crate::env::ArenaEnv;
use crate::error::{CastError, CombatError, GameError};
use crate::replication::{
    BuffExpire, DestroyAbility, Envelope, HealthUpdate, HeroSnapshot, Interpolator, Message,
    Outbox, SnapshotGate,
};
use crate::schedule::{DelayedEffect, Scheduler};
use crate::state::{EntityDirectory, EntityId, Hero, Kinematics, LifeState, PeerRoles, Tick};

/// Upper bound on local delivery rounds within one tick.
const MAX_LOCAL_ROUNDS: usize = 8;

/// Builds a [`TickContext`] from disjoint fields of a simulation.
macro_rules! tick_context {
    ($sim:ident, $env:ident, $heroes:expr) => {
        TickContext {
            roles: $sim.roles,
            config: &$sim.config,
            now: $sim.clock,
            heroes: $heroes,
            ledger: &mut $sim.ledger,
            scheduler: &mut $sim.scheduler,
            outbox: &mut $sim.outbox,
            events: &mut $sim.events,
            world: $env.world,
            movement: &mut *$env.movement,
        }
    };
}

/// Combat state of one peer for the duration of a match.
pub struct Simulation {
    roles: PeerRoles,
    config: ArenaConfig,
    clock: Duration,
    tick: Tick,
    directory: EntityDirectory,
    ledger: BuffLedger,
    scheduler: Scheduler,
    authority: CombatAuthority,
    outbox: Outbox,
    events: Vec<CombatEvent>,
    handlers: HandlerTable,
    hero_gate: SnapshotGate,
    next_network_tick: Duration,
    /// Heroes whose regenerated vitals have not been broadcast yet.
    dirty_vitals: BTreeSet<EntityId>,
}

impl Simulation {
    pub fn new(roles: PeerRoles, config: ArenaConfig) -> Self {
        Self {
            roles,
            config,
            clock: Duration::ZERO,
            tick: Tick::ZERO,
            directory: EntityDirectory::new(roles.local),
            ledger: BuffLedger::new(),
            scheduler: Scheduler::new(),
            authority: CombatAuthority::new(),
            outbox: Outbox::new(roles.local),
            events: Vec::new(),
            handlers: HandlerTable::standard(),
            hero_gate: SnapshotGate::new(),
            next_network_tick: Duration::ZERO,
            dirty_vitals: BTreeSet::new(),
        }
    }

    pub fn with_handlers(mut self, handlers: HandlerTable) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn roles(&self) -> PeerRoles {
        self.roles
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Sim time at the start of the next tick.
    pub fn now(&self) -> Duration {
        self.clock
    }

    pub fn current_tick(&self) -> Tick {
        self.tick
    }

    pub fn directory(&self) -> &EntityDirectory {
        &self.directory
    }

    pub fn hero(&self, id: EntityId) -> Option<&Hero> {
        self.directory.hero(id)
    }

    pub fn ability(&self, id: EntityId) -> Option<&AbilityInstance> {
        self.directory.ability(id)
    }

    pub fn ledger(&self) -> &BuffLedger {
        &self.ledger
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn authority(&self) -> &CombatAuthority {
        &self.authority
    }

    /// Envelopes queued for the transport but not flushed yet.
    pub fn pending(&self) -> &[Envelope] {
        self.outbox.pending()
    }

    /// Adds a hero to the match. Heroes owned elsewhere follow their owner's
    /// snapshots.
    pub fn spawn_hero(&mut self, mut hero: Hero) {
        if hero.owner != self.roles.local {
            hero.mirror = Some(Interpolator::new(hero.kinematics));
        }
        tracing::debug!(hero = %hero.id, owner = %hero.owner, team = %hero.team, "hero joined");
        self.directory.insert_hero(hero);
    }

    /// Owner-side movement update, streamed on the next network tick.
    pub fn set_hero_kinematics(&mut self, hero: EntityId, kinematics: Kinematics) -> bool {
        match self.directory.hero_mut(hero) {
            Some(hero) if hero.owner == self.roles.local && !hero.is_dead() => {
                hero.kinematics = kinematics;
                true
            }
            _ => false,
        }
    }

    /// Forwards a move order for a locally owned hero to the movement layer.
    pub fn command_move(
        &mut self,
        env: &mut ArenaEnv<'_>,
        hero: EntityId,
        destination: Vec3,
    ) -> bool {
        let owned = self
            .directory
            .hero(hero)
            .is_some_and(|h| h.owner == self.roles.local && !h.is_dead());
        if owned {
            env.movement.set_destination(hero, destination);
        }
        owned
    }

    /// Casts `key` for a locally owned hero.
    ///
    /// On success the instance is live, its cooldown has started, the mana
    /// cost is on its way to the master and every peer has been told to
    /// create a mirror.
    ///
    /// # Errors
    ///
    /// Any [`CastError`]. A rejected cast has no side effects besides a
    /// `CastRejected` event and is never retried.
    pub fn cast(
        &mut self,
        env: &mut ArenaEnv<'_>,
        caster: EntityId,
        key: &AbilityKey,
        transform: SpawnTransform,
    ) -> Result<EntityId, CastError> {
        match self.try_cast(env, caster, key, transform) {
            Ok(id) => Ok(id),
            Err(error) => {
                tracing::debug!(%caster, %key, %error, code = error.error_code(), "cast rejected");
                self.events.push(CombatEvent::CastRejected {
                    caster,
                    key: key.clone(),
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    fn try_cast(
        &mut self,
        env: &mut ArenaEnv<'_>,
        caster: EntityId,
        key: &AbilityKey,
        transform: SpawnTransform,
    ) -> Result<EntityId, CastError> {
        let now = self.clock;
        let hero = self
            .directory
            .hero(caster)
            .ok_or(CastError::CasterNotFound { caster })?;
        if hero.owner != self.roles.local {
            return Err(CastError::NotOwner {
                caster,
                owner: hero.owner,
            });
        }
        if hero.is_dead() {
            return Err(CastError::CasterDead { caster });
        }
        let descriptor = env
            .factory
            .resolve(key)
            .ok_or_else(|| CastError::PrefabNotFound { key: key.clone() })?;
        if let Some(remaining) = hero.cooldown_remaining(key, now) {
            return Err(CastError::OnCooldown {
                ability: key.clone(),
                remaining,
            });
        }
        let (costs, cost_issues) = descriptor.costs();
        for issue in cost_issues {
            tracing::warn!(%caster, %issue, "ability cost clamped");
        }
        if hero.mana() < costs.mana {
            return Err(CastError::InsufficientMana {
                required: costs.mana,
                available: hero.mana(),
            });
        }

        let mut config = descriptor.configure(hero.rank_of(key), hero.stats.damage);
        for issue in config.sanitize(self.config.min_secs()) {
            tracing::warn!(%caster, %issue, "ability configuration clamped");
        }

        let id = self.directory.allocate_id();
        let mut instance = AbilityInstance::new(id, caster, self.roles.local, config, transform);
        {
            let (heroes, _) = self.directory.parts_mut();
            let mut ctx = tick_context!(self, env, heroes);
            instance
                .initialize(&mut ctx)
                .map_err(|_| CastError::InvalidCaster { caster })?;
        }

        if let Some(hero) = self.directory.hero_mut(caster) {
            hero.start_cooldown(key.clone(), now + costs.cooldown);
        }
        if costs.mana > 0.0 {
            self.outbox.to_master(Message::RequestManaSpend(ManaSpend {
                hero: caster,
                amount: costs.mana,
                ability: key.clone(),
                instance: id,
            }));
        }
        self.outbox
            .broadcast(Message::CreateAbilityInstance(instance.create_message()));

        let kind = instance.config.tag();
        tracing::debug!(ability = %id, %caster, %key, %kind, "ability cast");
        self.events.push(CombatEvent::AbilitySpawned {
            ability: id,
            caster,
            key: key.clone(),
        });
        self.directory.insert_ability(instance);
        Ok(id)
    }

    /// Handles one envelope from the transport. Messages not addressed to
    /// this peer are dropped.
    pub fn receive(&mut self, env: &mut ArenaEnv<'_>, envelope: Envelope) {
        if !envelope.addresses(self.roles.local, self.roles.master) {
            tracing::trace!(
                kind = %envelope.kind(),
                from = %envelope.from,
                "envelope not addressed to this peer"
            );
            return;
        }
        self.dispatch(env, envelope);
    }

    fn dispatch(&mut self, env: &mut ArenaEnv<'_>, envelope: Envelope) {
        let kind = envelope.kind();
        let from = envelope.from;
        let handlers = self.handlers;
        match handlers.dispatch(self, env, envelope) {
            Ok(()) => tracing::trace!(%kind, %from, "message handled"),
            Err(err @ CombatError::AuthorityViolation { .. }) => {
                tracing::warn!(%kind, %from, %err, code = err.error_code(), "message rejected");
            }
            Err(err) if err.severity().is_recoverable() => {
                tracing::trace!(%kind, %from, %err, "message ignored");
            }
            Err(err) => {
                tracing::debug!(%kind, %from, %err, code = err.error_code(), "message dropped");
            }
        }
    }

    /// Advances the simulation by `dt`.
    ///
    /// Order: due timers, regeneration (master), ability instances, buff
    /// expiry, hero interpolation, locally addressed messages, snapshots.
    pub fn tick(&mut self, env: &mut ArenaEnv<'_>, dt: Duration) {
        self.fire_timers(env);
        if self.roles.is_master() {
            self.regenerate(dt);
        }
        self.step_abilities(env, dt);
        self.expire_buffs(env);
        self.interpolate_heroes(dt);
        self.process_local(env);

        if self.clock >= self.next_network_tick {
            self.next_network_tick = self.clock + self.config.network_tick_interval;
            self.publish_snapshots();
        }

        let cutoff = self.clock.saturating_sub(self.config.dedupe_window);
        self.authority.prune(cutoff);
        self.directory.prune(cutoff);
        self.ledger.prune_retired(cutoff);

        self.clock += dt;
        self.tick = Tick(self.tick.0 + 1);
    }

    /// Takes everything queued for the transport.
    pub fn flush(&mut self) -> Vec<Envelope> {
        self.outbox.drain()
    }

    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.events)
    }

    /// Tears down an ability instance. Safe to call any number of times;
    /// only the first call has effects. Returns whether this call removed it.
    pub fn destroy_ability(
        &mut self,
        env: &mut ArenaEnv<'_>,
        id: EntityId,
        reason: DestroyReason,
    ) -> bool {
        let Some(mut instance) = self.directory.remove_ability(id, self.clock) else {
            tracing::trace!(ability = %id, %reason, "ability already destroyed");
            return false;
        };
        instance.begin_destroy();
        self.scheduler.cancel_owner(id);

        if matches!(instance.simulator(), Simulator::PureBuff(_)) {
            let removed =
                self.ledger
                    .remove_by_source(id, self.directory.heroes_mut(), &mut *env.movement);
            for record in &removed {
                if !record.mirrored {
                    self.outbox
                        .broadcast(Message::BuffExpire(BuffExpire::from_record(record)));
                }
                self.record_buff_expired(record);
            }
        }
        if !instance.is_mirror() {
            self.outbox
                .broadcast(Message::DestroyAbilityInstance(DestroyAbility { ability: id }));
        }
        self.outbox.forget(id);
        instance.finish_destroy();

        tracing::debug!(ability = %id, key = %instance.config.key, %reason, "ability destroyed");
        self.events
            .push(CombatEvent::AbilityDestroyed { ability: id, reason });
        true
    }

    /// Destroys every ability and restores every buffed stat.
    pub fn end_match(&mut self, env: &mut ArenaEnv<'_>) {
        for id in self.directory.ability_ids() {
            self.destroy_ability(env, id, DestroyReason::MatchEnded);
        }
        for hero in self.directory.heroes_mut().values_mut() {
            self.ledger.clear_target(hero, &mut *env.movement);
        }
        self.scheduler.clear();
        self.authority.clear();
        self.dirty_vitals.clear();
        tracing::info!(tick = %self.tick, "match ended");
    }

    fn fire_timers(&mut self, env: &mut ArenaEnv<'_>) {
        for due in self.scheduler.drain_due(self.clock) {
            match due.effect {
                DelayedEffect::ScriptStep { ability, step } => {
                    let (heroes, abilities) = self.directory.parts_mut();
                    let Some(instance) = abilities.get_mut(&ability) else {
                        tracing::trace!(%ability, step, "script step for removed ability");
                        continue;
                    };
                    if heroes.get(&instance.caster).is_none_or(Hero::is_dead) {
                        tracing::debug!(%ability, step, "script step dropped, caster gone");
                        self.destroy_ability(env, ability, DestroyReason::CasterLost);
                        continue;
                    }
                    let mut ctx = tick_context!(self, env, heroes);
                    instance.run_script_step(step, &mut ctx);
                }
                DelayedEffect::Respawn { hero } => self.respawn(env, hero),
            }
        }
    }

    fn regenerate(&mut self, dt: Duration) {
        for hero in self.directory.heroes_mut().values_mut() {
            if self.authority.regenerate(hero, dt) {
                self.dirty_vitals.insert(hero.id);
            }
        }
    }

    fn step_abilities(&mut self, env: &mut ArenaEnv<'_>, dt: Duration) {
        let mut finished = Vec::new();
        {
            let (heroes, abilities) = self.directory.parts_mut();
            let mut ctx = tick_context!(self, env, heroes);
            for (id, instance) in abilities.iter_mut() {
                let outcome = if instance.is_mirror() {
                    instance.advance_mirror(dt, ctx.config)
                } else {
                    instance.tick(&mut ctx, dt)
                };
                if let TickOutcome::Destroy(reason) = outcome {
                    finished.push((*id, reason));
                }
            }
        }
        for (id, reason) in finished {
            self.destroy_ability(env, id, reason);
        }
    }

    fn expire_buffs(&mut self, env: &mut ArenaEnv<'_>) {
        let expired = self
            .ledger
            .sweep(self.clock, self.directory.heroes_mut(), &mut *env.movement);
        for record in &expired {
            if !record.mirrored {
                self.outbox
                    .broadcast(Message::BuffExpire(BuffExpire::from_record(record)));
            }
            self.record_buff_expired(record);
        }
    }

    fn interpolate_heroes(&mut self, dt: Duration) {
        let smoothing = self.config.snapshot_smoothing;
        let local = self.roles.local;
        for hero in self.directory.heroes_mut().values_mut() {
            if hero.owner == local || hero.is_dead() {
                continue;
            }
            if let Some(mirror) = hero.mirror.as_mut() {
                hero.kinematics = mirror.advance(dt, smoothing);
            }
        }
    }

    /// Handles envelopes this peer addressed to itself, e.g. the master's own
    /// damage requests.
    fn process_local(&mut self, env: &mut ArenaEnv<'_>) {
        for _ in 0..MAX_LOCAL_ROUNDS {
            let local = self.outbox.take_local(self.roles);
            if local.is_empty() {
                return;
            }
            for envelope in local {
                self.dispatch(env, envelope);
            }
        }
        tracing::warn!(tick = %self.tick, "local delivery did not settle");
    }

    fn publish_snapshots(&mut self) {
        let local = self.roles.local;
        for instance in self.directory.abilities() {
            if instance.owner != local || instance.is_mirror() || !instance.is_active() {
                continue;
            }
            let seq = self.outbox.next_seq(instance.id);
            self.outbox
                .broadcast_others(Message::AbilitySnapshot(instance.snapshot(seq)));
        }
        for hero in self.directory.heroes() {
            if hero.owner != local || hero.is_dead() {
                continue;
            }
            let seq = self.outbox.next_seq(hero.id);
            self.outbox.broadcast_others(Message::HeroSnapshot(HeroSnapshot {
                hero: hero.id,
                seq,
                kinematics: hero.kinematics,
            }));
        }

        if self.roles.is_master() {
            for id in std::mem::take(&mut self.dirty_vitals) {
                if let Some(hero) = self.directory.hero_mut(id) {
                    hero.bump_revision();
                }
                self.publish_vitals(id, None);
            }
        }
    }

    /// Master-side respawn timer.
    fn respawn(&mut self, env: &mut ArenaEnv<'_>, id: EntityId) {
        let Some(hero) = self.directory.hero_mut(id) else {
            return;
        };
        if self.authority.respawn(hero).is_none() {
            return;
        }
        self.on_respawn(env, id);
        self.publish_vitals(id, None);
    }

    /// Broadcasts the master's current view of a hero's vitals.
    fn publish_vitals(&mut self, id: EntityId, killer: Option<EntityId>) {
        let Some(hero) = self.directory.hero(id) else {
            return;
        };
        let vitals = hero.vitals();
        self.dirty_vitals.remove(&id);
        self.outbox.broadcast(Message::HealthUpdate(HealthUpdate {
            target: id,
            health: vitals.health,
            mana: vitals.mana,
            is_dead: hero.is_dead(),
            revision: vitals.revision,
            killer,
        }));
    }

    /// Alive to dead, on any peer. Buffs are dropped and the hero's pending
    /// timers cancelled; the master additionally schedules the respawn.
    fn on_death(&mut self, env: &mut ArenaEnv<'_>, id: EntityId, killer: Option<EntityId>) {
        let now = self.clock;
        let Some(hero) = self.directory.hero_mut(id) else {
            return;
        };
        hero.set_life(LifeState::Dead { since: now });
        hero.kinematics.moving = false;
        let owned = hero.owner == self.roles.local;
        self.ledger.clear_target(hero, &mut *env.movement);
        self.scheduler.cancel_owner(id);
        if owned {
            env.movement.stop_movement(id);
        }
        if self.roles.is_master() {
            self.scheduler
                .schedule(id, now + self.config.respawn_delay, DelayedEffect::Respawn { hero: id });
        }
        tracing::info!(hero = %id, killer = ?killer, "hero died");
        self.events.push(CombatEvent::Died { hero: id, killer });
    }

    /// Dead to alive, on any peer.
    fn on_respawn(&mut self, env: &mut ArenaEnv<'_>, id: EntityId) {
        let Some(hero) = self.directory.hero_mut(id) else {
            return;
        };
        hero.set_life(LifeState::Alive);
        hero.kinematics = Kinematics::at(hero.spawn_point);
        hero.clear_cooldowns();
        if let Some(mirror) = hero.mirror.as_mut() {
            *mirror = Interpolator::new(hero.kinematics);
        }
        if hero.owner == self.roles.local {
            env.movement.stop_movement(id);
        }
        tracing::info!(hero = %id, "hero respawned");
        self.events.push(CombatEvent::Respawned { hero: id });
    }

    fn record_buff_expired(&mut self, record: &BuffRecord) {
        let restored = self
            .directory
            .hero(record.target)
            .map_or(record.original, |hero| hero.stats.get(record.stat));
        tracing::debug!(
            target = %record.target,
            stat = %record.stat,
            source = %record.source,
            restored,
            "buff expired"
        );
        self.events.push(CombatEvent::BuffExpired {
            target: record.target,
            stat: record.stat,
            source: record.source,
            restored,
        });
    }

    fn missing_ability(&self, id: EntityId) -> CombatError {
        if self.directory.is_tombstoned(id) {
            CombatError::AlreadyProcessed {
                entity: id,
                what: "destroyed ability",
            }
        } else {
            CombatError::TargetNotFound { target: id }
        }
    }
}
