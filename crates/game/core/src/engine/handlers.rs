//! Receiver side of the message catalogue.
//!
//! Each message kind has one typed handler in [`HandlerTable`]. Handlers must
//! tolerate duplicated, reordered and late deliveries: anything that refers to
//! an entity this peer no longer (or not yet) knows is a recoverable no-op.

use super::{CombatEvent, Simulation};
use crate::ability::{AbilityInstance, DestroyReason, apply_crowd_control};
use crate::combat::{DamageRequest, HealRequest, ManaSpend};
use crate::env::ArenaEnv;
use crate::error::CombatError;
use crate::replication::{
    AbilityImpact, AbilitySnapshot, BuffApply, BuffExpire, CreateAbility, DestroyAbility, Envelope,
    HealthUpdate, HeroSnapshot, Interpolator, Message,
};
use crate::state::PeerId;

pub type HandlerResult = Result<(), CombatError>;

/// Handler of one message kind. Receives the sending peer and the payload.
pub type Handler<M> = fn(&mut Simulation, &mut ArenaEnv<'_>, PeerId, M) -> HandlerResult;

/// Typed dispatch table, one entry per [`crate::replication::MessageKind`].
#[derive(Clone, Copy)]
pub struct HandlerTable {
    pub create_ability: Handler<CreateAbility>,
    pub ability_snapshot: Handler<AbilitySnapshot>,
    pub ability_impact: Handler<AbilityImpact>,
    pub destroy_ability: Handler<DestroyAbility>,
    pub request_damage: Handler<DamageRequest>,
    pub request_heal: Handler<HealRequest>,
    pub request_mana_spend: Handler<ManaSpend>,
    pub health_update: Handler<HealthUpdate>,
    pub buff_apply: Handler<BuffApply>,
    pub buff_expire: Handler<BuffExpire>,
    pub hero_snapshot: Handler<HeroSnapshot>,
}

impl HandlerTable {
    pub fn standard() -> Self {
        Self {
            create_ability: on_create_ability,
            ability_snapshot: on_ability_snapshot,
            ability_impact: on_ability_impact,
            destroy_ability: on_destroy_ability,
            request_damage: on_request_damage,
            request_heal: on_request_heal,
            request_mana_spend: on_request_mana_spend,
            health_update: on_health_update,
            buff_apply: on_buff_apply,
            buff_expire: on_buff_expire,
            hero_snapshot: on_hero_snapshot,
        }
    }

    pub fn dispatch(
        &self,
        sim: &mut Simulation,
        env: &mut ArenaEnv<'_>,
        envelope: Envelope,
    ) -> HandlerResult {
        let from = envelope.from;
        match envelope.message {
            Message::CreateAbilityInstance(m) => (self.create_ability)(sim, env, from, m),
            Message::AbilitySnapshot(m) => (self.ability_snapshot)(sim, env, from, m),
            Message::AbilityImpact(m) => (self.ability_impact)(sim, env, from, m),
            Message::DestroyAbilityInstance(m) => (self.destroy_ability)(sim, env, from, m),
            Message::RequestDamage(m) => (self.request_damage)(sim, env, from, m),
            Message::RequestHeal(m) => (self.request_heal)(sim, env, from, m),
            Message::RequestManaSpend(m) => (self.request_mana_spend)(sim, env, from, m),
            Message::HealthUpdate(m) => (self.health_update)(sim, env, from, m),
            Message::BuffApply(m) => (self.buff_apply)(sim, env, from, m),
            Message::BuffExpire(m) => (self.buff_expire)(sim, env, from, m),
            Message::HeroSnapshot(m) => (self.hero_snapshot)(sim, env, from, m),
        }
    }
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn on_create_ability(
    sim: &mut Simulation,
    _env: &mut ArenaEnv<'_>,
    from: PeerId,
    mut create: CreateAbility,
) -> HandlerResult {
    // The owner already holds the live instance.
    if create.owner == sim.roles.local {
        return Ok(());
    }
    if create.owner != from {
        return Err(CombatError::AuthorityViolation {
            from,
            what: "ability creation",
        });
    }
    let id = create.ability;
    if sim.directory.contains(id) || sim.directory.is_tombstoned(id) {
        return Err(CombatError::AlreadyProcessed {
            entity: id,
            what: "ability creation",
        });
    }

    for issue in create.config.sanitize(sim.config.min_secs()) {
        tracing::warn!(ability = %id, %issue, "mirrored ability configuration clamped");
    }
    let mut instance = AbilityInstance::mirror(create);
    instance.initialize_mirror(sim.directory.heroes_mut())?;
    for (ordinal, target) in sim.directory.take_early_impacts(id) {
        instance.record_remote_impact(ordinal, target);
    }

    let (caster, key) = (instance.caster, instance.config.key.clone());
    sim.directory.insert_ability(instance);
    tracing::debug!(ability = %id, %caster, %key, owner = %from, "ability mirrored");
    sim.events
        .push(CombatEvent::AbilitySpawned { ability: id, caster, key });
    Ok(())
}

fn on_ability_snapshot(
    sim: &mut Simulation,
    _env: &mut ArenaEnv<'_>,
    from: PeerId,
    snapshot: AbilitySnapshot,
) -> HandlerResult {
    let id = snapshot.ability;
    let Some(instance) = sim.directory.ability_mut(id) else {
        return Err(sim.missing_ability(id));
    };
    if instance.owner != from {
        return Err(CombatError::AuthorityViolation {
            from,
            what: "ability snapshot",
        });
    }
    if !instance.apply_snapshot(&snapshot) {
        return Err(CombatError::AlreadyProcessed {
            entity: id,
            what: "ability snapshot",
        });
    }
    Ok(())
}

fn on_ability_impact(
    sim: &mut Simulation,
    env: &mut ArenaEnv<'_>,
    from: PeerId,
    impact: AbilityImpact,
) -> HandlerResult {
    if from == sim.roles.local {
        return Ok(());
    }
    let id = impact.ability;
    if sim.directory.is_tombstoned(id) {
        return Err(sim.missing_ability(id));
    }
    // Impacts may overtake the creation message; crowd control still lands
    // and the ordinal is held until the mirror exists.
    let fresh = match sim.directory.ability_mut(id) {
        Some(instance) if instance.owner != from => {
            return Err(CombatError::AuthorityViolation {
                from,
                what: "ability impact",
            });
        }
        Some(instance) => instance.record_remote_impact(impact.ordinal, impact.target),
        None if id.peer() != from => {
            return Err(CombatError::AuthorityViolation {
                from,
                what: "ability impact",
            });
        }
        None => sim
            .directory
            .hold_early_impact(id, impact.ordinal, impact.target, sim.clock),
    };
    if !fresh {
        return Err(CombatError::AlreadyProcessed {
            entity: id,
            what: "ability impact",
        });
    }
    sim.events.push(CombatEvent::Impact {
        ability: id,
        target: impact.target,
        point: impact.point,
    });

    let (Some(target), Some(cc)) = (impact.target, impact.crowd_control) else {
        return Ok(());
    };
    let Some(hero) = sim.directory.hero(target) else {
        return Err(CombatError::TargetNotFound { target });
    };
    if hero.owner == sim.roles.local && !hero.is_dead() {
        tracing::debug!(ability = %id, %target, kind = ?cc.kind, "crowd control applied");
        apply_crowd_control(&mut *env.movement, target, cc);
    }
    Ok(())
}

fn on_destroy_ability(
    sim: &mut Simulation,
    env: &mut ArenaEnv<'_>,
    from: PeerId,
    destroy: DestroyAbility,
) -> HandlerResult {
    let id = destroy.ability;
    let Some(instance) = sim.directory.ability(id) else {
        // Destroy overtook creation: the tombstone keeps the late mirror out.
        if id.peer() == from && !sim.directory.is_tombstoned(id) {
            tracing::debug!(ability = %id, owner = %from, "destroy arrived before creation");
            sim.directory.tombstone(id, sim.clock);
        }
        return Err(sim.missing_ability(id));
    };
    if instance.owner != from {
        return Err(CombatError::AuthorityViolation {
            from,
            what: "ability destruction",
        });
    }
    sim.destroy_ability(env, id, DestroyReason::Remote);
    Ok(())
}

fn on_request_damage(
    sim: &mut Simulation,
    env: &mut ArenaEnv<'_>,
    _from: PeerId,
    request: DamageRequest,
) -> HandlerResult {
    if !sim.roles.is_master() {
        sim.outbox.to_master(Message::RequestDamage(request));
        return Ok(());
    }
    let now = sim.clock;
    let target = request.target;
    let Some(hero) = sim.directory.hero_mut(target) else {
        return Err(CombatError::TargetNotFound { target });
    };
    let outcome = sim.authority.apply_damage(hero, &request, now)?;

    tracing::debug!(
        %target,
        source = %request.source,
        amount = request.amount,
        mitigated = outcome.mitigated,
        health = outcome.vitals.health,
        "damage applied"
    );
    sim.events.push(CombatEvent::Damaged {
        target,
        source: request.source,
        amount: outcome.mitigated,
        health: outcome.vitals.health,
    });

    let killer = outcome.killed.then_some(request.attacker);
    if outcome.killed {
        sim.on_death(env, target, killer);
    }
    sim.publish_vitals(target, killer);
    Ok(())
}

fn on_request_heal(
    sim: &mut Simulation,
    _env: &mut ArenaEnv<'_>,
    _from: PeerId,
    request: HealRequest,
) -> HandlerResult {
    if !sim.roles.is_master() {
        sim.outbox.to_master(Message::RequestHeal(request));
        return Ok(());
    }
    let now = sim.clock;
    let target = request.target;
    let Some(hero) = sim.directory.hero_mut(target) else {
        return Err(CombatError::TargetNotFound { target });
    };
    let outcome = sim.authority.apply_heal(hero, &request, now)?;

    sim.events.push(CombatEvent::Healed {
        target,
        amount: outcome.healed,
        health: outcome.vitals.health,
    });
    sim.publish_vitals(target, None);
    Ok(())
}

fn on_request_mana_spend(
    sim: &mut Simulation,
    _env: &mut ArenaEnv<'_>,
    _from: PeerId,
    spend: ManaSpend,
) -> HandlerResult {
    if !sim.roles.is_master() {
        sim.outbox.to_master(Message::RequestManaSpend(spend));
        return Ok(());
    }
    let now = sim.clock;
    let Some(hero) = sim.directory.hero_mut(spend.hero) else {
        return Err(CombatError::TargetNotFound { target: spend.hero });
    };
    let vitals = sim.authority.spend_mana(hero, &spend, now)?;
    tracing::trace!(hero = %spend.hero, ability = %spend.ability, mana = vitals.mana, "mana spent");
    sim.publish_vitals(spend.hero, None);
    Ok(())
}

fn on_health_update(
    sim: &mut Simulation,
    env: &mut ArenaEnv<'_>,
    from: PeerId,
    update: HealthUpdate,
) -> HandlerResult {
    if from != sim.roles.master {
        return Err(CombatError::AuthorityViolation {
            from,
            what: "hero vitals",
        });
    }
    // The master wrote these values itself.
    if sim.roles.is_master() {
        return Ok(());
    }
    let target = update.target;
    let Some(hero) = sim.directory.hero_mut(target) else {
        return Err(CombatError::TargetNotFound { target });
    };
    if update.revision < hero.vitals().revision {
        return Err(CombatError::AlreadyProcessed {
            entity: target,
            what: "health revision",
        });
    }

    let was_dead = hero.is_dead();
    hero.set_vitals(update.health, update.mana, update.revision);
    sim.events.push(CombatEvent::HealthChanged {
        hero: target,
        health: update.health,
        is_dead: update.is_dead,
    });
    match (was_dead, update.is_dead) {
        (false, true) => sim.on_death(env, target, update.killer),
        (true, false) => sim.on_respawn(env, target),
        _ => {}
    }
    Ok(())
}

fn on_buff_apply(
    sim: &mut Simulation,
    env: &mut ArenaEnv<'_>,
    from: PeerId,
    apply: BuffApply,
) -> HandlerResult {
    if from == sim.roles.local {
        return Ok(());
    }
    let now = sim.clock;
    let target = apply.target;
    let Some(hero) = sim.directory.hero_mut(target) else {
        return Err(CombatError::TargetNotFound { target });
    };
    if hero.is_dead() || apply.remaining.is_zero() {
        return Err(CombatError::AlreadyProcessed {
            entity: target,
            what: "lapsed buff",
        });
    }
    let record = sim
        .ledger
        .mirror(hero, apply.into_record(now), &mut *env.movement)?;
    let value = hero.stats.get(record.stat);
    sim.events.push(CombatEvent::BuffApplied {
        target,
        stat: record.stat,
        source: record.source,
        value,
    });
    Ok(())
}

fn on_buff_expire(
    sim: &mut Simulation,
    env: &mut ArenaEnv<'_>,
    from: PeerId,
    expire: BuffExpire,
) -> HandlerResult {
    if from == sim.roles.local {
        return Ok(());
    }
    // Retiring an unknown application still refuses its late apply.
    let Some(record) = sim.ledger.retire(
        expire.key(),
        expire.serial,
        sim.directory.heroes_mut(),
        &mut *env.movement,
    ) else {
        return Err(CombatError::AlreadyProcessed {
            entity: expire.target,
            what: "buff expiry",
        });
    };
    sim.record_buff_expired(&record);
    Ok(())
}

fn on_hero_snapshot(
    sim: &mut Simulation,
    _env: &mut ArenaEnv<'_>,
    from: PeerId,
    snapshot: HeroSnapshot,
) -> HandlerResult {
    let target = snapshot.hero;
    let Some(hero) = sim.directory.hero_mut(target) else {
        return Err(CombatError::TargetNotFound { target });
    };
    if hero.owner != from {
        return Err(CombatError::AuthorityViolation {
            from,
            what: "hero movement",
        });
    }
    if !sim.hero_gate.admit(target, snapshot.seq) {
        return Err(CombatError::AlreadyProcessed {
            entity: target,
            what: "hero snapshot",
        });
    }
    match hero.mirror.as_mut() {
        Some(mirror) => mirror.retarget(snapshot.kinematics),
        None => hero.mirror = Some(Interpolator::new(snapshot.kinematics)),
    }
    Ok(())
}
