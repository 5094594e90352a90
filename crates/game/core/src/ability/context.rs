use std::collections::BTreeSet;
use std::time::Duration;

use glam::Vec3;

use super::descriptor::{AbilityConfig, CrowdControl, CrowdControlKind, TargetFilter};
use crate::buffs::{BuffLedger, BuffSpec};
use crate::combat::{DamageRequest, HealRequest, RequestKey};
use crate::config::ArenaConfig;
use crate::engine::CombatEvent;
use crate::env::{MovementCollaborator, WorldQuery};
use crate::error::BuffError;
use crate::replication::{AbilityImpact, BuffApply, Message, Outbox};
use crate::schedule::Scheduler;
use crate::state::{EntityId, HeroTable, PeerRoles, Team};

/// Everything an ability may touch while it runs.
pub struct TickContext<'a> {
    pub roles: PeerRoles,
    pub config: &'a ArenaConfig,
    /// Sim time at the start of the tick.
    pub now: Duration,
    pub heroes: &'a mut HeroTable,
    pub ledger: &'a mut BuffLedger,
    pub scheduler: &'a mut Scheduler,
    pub outbox: &'a mut Outbox,
    pub events: &'a mut Vec<CombatEvent>,
    pub world: &'a dyn WorldQuery,
    pub movement: &'a mut dyn MovementCollaborator,
}

impl TickContext<'_> {
    /// Applies a buff on this peer and mirrors it to the others.
    pub(crate) fn apply_buff(&mut self, target: EntityId, spec: &BuffSpec, source: EntityId) {
        let Some(hero) = self.heroes.get_mut(&target) else {
            tracing::trace!(%target, "buff target vanished");
            return;
        };
        match self
            .ledger
            .apply(hero, spec, source, self.now, &mut *self.movement)
        {
            Ok(record) => {
                let value = hero.stats.get(record.stat);
                tracing::debug!(%target, stat = %record.stat, %source, value, "buff applied");
                self.outbox
                    .broadcast(Message::BuffApply(BuffApply::from_record(&record, self.now)));
                self.events.push(CombatEvent::BuffApplied {
                    target,
                    stat: record.stat,
                    source,
                    value,
                });
            }
            Err(err @ BuffError::AlreadyActive { .. }) => tracing::trace!(%err, "buff not stacked"),
            Err(err) => tracing::warn!(%err, "buff rejected"),
        }
    }

    /// Impairs a hero's movement if this peer drives it. Other peers learn
    /// about it from the `AbilityImpact` broadcast.
    pub(crate) fn crowd_control(&mut self, target: EntityId, cc: CrowdControl) {
        let Some(hero) = self.heroes.get(&target) else {
            return;
        };
        if hero.owner != self.roles.local || hero.is_dead() {
            return;
        }
        apply_crowd_control(&mut *self.movement, target, cc);
    }
}

pub(crate) fn apply_crowd_control(
    movement: &mut dyn MovementCollaborator,
    target: EntityId,
    cc: CrowdControl,
) {
    movement.stop_movement(target);
    match cc.kind {
        CrowdControlKind::Stun => movement.apply_stun(target, cc.duration()),
        CrowdControlKind::Root => movement.apply_root(target, cc.duration()),
    }
}

/// Per-instance hit bookkeeping shared by every simulator.
pub struct ImpactSource<'s> {
    pub ability: EntityId,
    pub caster: EntityId,
    pub team: Team,
    pub config: &'s AbilityConfig,
    /// Elapsed time of the instance at the start of this tick.
    pub elapsed: Duration,
    pub hit_set: &'s mut BTreeSet<EntityId>,
    pub impacts: &'s mut u32,
}

impl ImpactSource<'_> {
    pub fn admits(&self, heroes: &HeroTable, target: EntityId, filter: TargetFilter) -> bool {
        heroes
            .get(&target)
            .is_some_and(|hero| filter.admits(self.caster, self.team, hero))
    }

    /// Records one impact: broadcasts it, asks the master for damage, applies
    /// on-hit buffs and crowd control.
    pub fn impact(
        &mut self,
        ctx: &mut TickContext<'_>,
        target: Option<EntityId>,
        point: Vec3,
        normal: Vec3,
        damage_scale: f32,
        crowd_control: Option<CrowdControl>,
    ) {
        let ordinal = *self.impacts;
        *self.impacts += 1;
        tracing::debug!(ability = %self.ability, target = ?target, ordinal, "impact");

        ctx.outbox.broadcast(Message::AbilityImpact(AbilityImpact {
            ability: self.ability,
            ordinal,
            target,
            point,
            normal,
            crowd_control,
        }));
        ctx.events.push(CombatEvent::Impact {
            ability: self.ability,
            target,
            point,
        });

        let Some(target) = target else {
            return;
        };
        self.hit_set.insert(target);

        let amount = self.config.damage * damage_scale;
        if amount > 0.0 {
            ctx.outbox.to_master(Message::RequestDamage(DamageRequest {
                key: RequestKey {
                    source: self.ability,
                    target,
                    ordinal,
                },
                target,
                amount,
                source: self.ability,
                attacker: self.caster,
                is_magic: self.config.is_magic,
            }));
        }
        for buff in &self.config.on_hit {
            ctx.apply_buff(target, &buff.spec(), self.ability);
        }
        if let Some(cc) = crowd_control {
            ctx.crowd_control(target, cc);
        }
    }

    pub fn heal(&mut self, ctx: &mut TickContext<'_>, target: EntityId, amount: f32) {
        let ordinal = *self.impacts;
        *self.impacts += 1;
        ctx.outbox.to_master(Message::RequestHeal(HealRequest {
            key: RequestKey {
                source: self.ability,
                target,
                ordinal,
            },
            target,
            amount,
            source: self.ability,
        }));
    }
}
