mod common;

use std::time::Duration;

use arena_core::env::MovementCall;
use arena_core::replication::{AbilityCounters, AbilityImpact, AbilitySnapshot, HealthUpdate};
use arena_core::{
    AbilityKey, CombatEvent, CrowdControl, CrowdControlKind, DeliveryTarget, DestroyReason,
    EntityId, Envelope, Kinematics, Message, MessageKind, PeerId, SpawnTransform, StatKind, Team,
};
use glam::Vec3;

use common::{Catalog, DT, GUEST, MASTER, Peer, bolt, catalog, exchange, field, hero, self_buff};

struct Match {
    master: Peer,
    guest: Peer,
    /// Hero driven by the master peer.
    host: EntityId,
    /// Hero driven by the guest peer.
    visitor: EntityId,
}

impl Match {
    fn new() -> Self {
        let mut master = Peer::new(MASTER, MASTER);
        let mut guest = Peer::new(GUEST, MASTER);
        let host = hero(1, MASTER, Team::Red, Vec3::new(10.0, 0.0, 0.0));
        let visitor = hero(2, GUEST, Team::Blue, Vec3::ZERO);
        let ids = (host.id, visitor.id);
        for peer in [&mut master, &mut guest] {
            peer.sim.spawn_hero(host.clone());
            peer.sim.spawn_hero(visitor.clone());
        }
        Self {
            master,
            guest,
            host: ids.0,
            visitor: ids.1,
        }
    }

    fn cast(&mut self, catalog: &Catalog, key: &str, direction: Vec3) -> EntityId {
        let visitor = self.visitor;
        let key = AbilityKey::from(key);
        let transform = SpawnTransform::new(Vec3::ZERO, direction);
        let mut cast = None;
        self.guest.with(
            |sim, env| cast = sim.cast(env, visitor, &key, transform).ok(),
            catalog,
        );
        cast.expect("cast accepted")
    }

    fn run(&mut self, catalog: &Catalog, ticks: usize, copies: usize, dt: Duration) {
        for _ in 0..ticks {
            self.master.tick(catalog, dt);
            self.guest.tick(catalog, dt);
            exchange(&mut [&mut self.master, &mut self.guest], catalog, copies);
        }
    }

    fn health(&self, hero: EntityId) -> (f32, f32) {
        let of = |peer: &Peer| peer.sim.hero(hero).map_or(f32::NAN, |h| h.health());
        (of(&self.master), of(&self.guest))
    }
}

#[test]
fn guest_projectile_damage_is_arbitrated_by_master() {
    let catalog = catalog([bolt("arrow", 50.0, false, 30.0)]);
    let mut game = Match::new();

    let ability = game.cast(&catalog, "arrow", Vec3::X);
    game.run(&catalog, 40, 1, Duration::from_millis(10));

    // 30 physical against 20 armor.
    assert_eq!(game.health(game.host), (475.0, 475.0));
    assert!(game.master.sim.ability(ability).is_none());
    assert!(game.guest.sim.ability(ability).is_none());
    assert_eq!(game.master.count(|e| matches!(e, CombatEvent::Damaged { .. })), 1);
    let spawned = game.master.count(
        |e| matches!(e, CombatEvent::AbilitySpawned { ability: a, .. } if *a == ability),
    );
    assert_eq!(spawned, 1);
}

#[test]
fn duplicated_delivery_does_not_double_apply() {
    let catalog = catalog([bolt("arrow", 50.0, false, 30.0)]);
    let mut game = Match::new();

    game.cast(&catalog, "arrow", Vec3::X);
    game.run(&catalog, 40, 3, Duration::from_millis(10));

    assert_eq!(game.health(game.host), (475.0, 475.0));
    assert_eq!(game.master.count(|e| matches!(e, CombatEvent::Damaged { .. })), 1);
    assert_eq!(
        game.master.count(|e| matches!(e, CombatEvent::AbilityDestroyed { .. })),
        1
    );
}

#[test]
fn mana_cost_is_charged_once_by_master() {
    let mut arrow = bolt("arrow", 50.0, false, 30.0);
    arrow.mana_cost = 40.0;
    let catalog = catalog([arrow]);
    let mut game = Match::new();

    game.cast(&catalog, "arrow", Vec3::NEG_X);
    game.run(&catalog, 5, 2, DT);

    let mana = |peer: &Peer| peer.sim.hero(game.visitor).map(|h| h.mana());
    assert_eq!(mana(&game.master), Some(260.0));
    assert_eq!(mana(&game.guest), Some(260.0));
}

#[test]
fn kill_and_respawn_reach_every_peer() {
    let catalog = catalog([bolt("meteor", 50.0, false, 10_000.0)]);
    let mut game = Match::new();

    game.cast(&catalog, "meteor", Vec3::X);
    game.run(&catalog, 10, 1, DT);

    for peer in [&game.master, &game.guest] {
        let host = peer.sim.hero(game.host).unwrap();
        assert!(host.is_dead());
        assert_eq!(host.health(), 0.0);
        assert_eq!(peer.count(|e| matches!(e, CombatEvent::Died { .. })), 1);
    }
    let killer = game.guest.events.iter().find_map(|e| match e {
        CombatEvent::Died { killer, .. } => *killer,
        _ => None,
    });
    assert_eq!(killer, Some(game.visitor));

    // Default respawn delay is five seconds.
    game.run(&catalog, 55, 1, DT);
    for peer in [&game.master, &game.guest] {
        let host = peer.sim.hero(game.host).unwrap();
        assert!(!host.is_dead());
        assert_eq!(host.health(), host.stats.max_health);
        assert_eq!(peer.count(|e| matches!(e, CombatEvent::Respawned { .. })), 1);
    }
}

#[test]
fn health_updates_from_non_master_are_rejected() {
    let catalog = Catalog::new();
    let mut game = Match::new();
    let forged = Envelope {
        from: GUEST,
        target: DeliveryTarget::All,
        message: Message::HealthUpdate(HealthUpdate {
            target: game.host,
            health: 0.0,
            mana: 0.0,
            is_dead: true,
            revision: 99,
            killer: Some(game.visitor),
        }),
    };
    game.master.receive(&catalog, forged.clone());
    game.guest.receive(&catalog, forged);

    assert_eq!(game.health(game.host), (500.0, 500.0));
    assert_eq!(game.guest.count(|e| matches!(e, CombatEvent::Died { .. })), 0);
}

#[test]
fn stale_ability_snapshots_are_dropped() {
    let catalog = catalog([field("quake", 3.0, 0.5, 10.0)]);
    let mut game = Match::new();
    let ability = game.cast(&catalog, "quake", Vec3::X);
    exchange(&mut [&mut game.master, &mut game.guest], &catalog, 1);
    assert!(game.master.sim.ability(ability).is_some_and(|a| a.is_mirror()));

    let snapshot = |seq: u32, elapsed_ms: u64| Envelope {
        from: GUEST,
        target: DeliveryTarget::AllExceptSender,
        message: Message::AbilitySnapshot(AbilitySnapshot {
            ability,
            seq,
            elapsed: Duration::from_millis(elapsed_ms),
            kinematics: Kinematics::at(Vec3::ZERO),
            counters: AbilityCounters {
                impacts: seq,
                penetrations: 0,
                radius: 3.0,
            },
        }),
    };
    game.master.receive(&catalog, snapshot(5, 1000));
    game.master.receive(&catalog, snapshot(4, 500));
    game.master.receive(&catalog, snapshot(5, 1200));

    let mirror = game.master.sim.ability(ability).unwrap();
    assert_eq!(mirror.elapsed(), Duration::from_millis(1000));
    assert_eq!(mirror.counters().impacts, 5);
}

#[test]
fn snapshots_from_a_non_owner_are_rejected() {
    let catalog = catalog([field("quake", 3.0, 0.5, 10.0)]);
    let mut game = Match::new();
    let ability = game.cast(&catalog, "quake", Vec3::X);
    exchange(&mut [&mut game.master, &mut game.guest], &catalog, 1);

    game.master.receive(
        &catalog,
        Envelope {
            from: PeerId(3),
            target: DeliveryTarget::AllExceptSender,
            message: Message::AbilitySnapshot(AbilitySnapshot {
                ability,
                seq: 50,
                elapsed: Duration::from_secs(9),
                kinematics: Kinematics::at(Vec3::ONE),
                counters: AbilityCounters::default(),
            }),
        },
    );
    assert_eq!(
        game.master.sim.ability(ability).map(|a| a.elapsed()),
        Some(Duration::ZERO)
    );
}

#[test]
fn mirrored_buffs_restore_exactly_on_every_peer() {
    let catalog = catalog([self_buff("haste", StatKind::MoveSpeed, 50.0, true, 2.0)]);
    let mut game = Match::new();
    let ability = game.cast(&catalog, "haste", Vec3::X);
    exchange(&mut [&mut game.master, &mut game.guest], &catalog, 2);

    let visitor = game.visitor;
    let speed = |peer: &Peer| peer.sim.hero(visitor).map(|h| h.stats.move_speed);
    assert_eq!(speed(&game.master), Some(15.0));
    assert_eq!(speed(&game.guest), Some(15.0));

    game.run(&catalog, 40, 2, DT);
    assert_eq!(speed(&game.master), Some(10.0));
    assert_eq!(speed(&game.guest), Some(10.0));
    assert!(game.master.sim.ledger().is_empty());
    assert!(game.guest.sim.ability(ability).is_none());
    assert!(game.master.sim.ability(ability).is_none());
}

#[test]
fn lost_destroy_message_is_covered_by_mirror_grace() {
    let catalog = catalog([field("quake", 3.0, 0.5, 1.0)]);
    let mut game = Match::new();
    let ability = game.cast(&catalog, "quake", Vec3::X);
    exchange(&mut [&mut game.master, &mut game.guest], &catalog, 1);

    // The guest drops off the network: nothing it sends arrives any more.
    for _ in 0..40 {
        game.master.tick(&catalog, DT);
        game.guest.tick(&catalog, DT);
        game.guest.sim.flush();
        game.master.sim.flush();
    }
    assert!(game.guest.sim.ability(ability).is_none());
    assert!(game.master.sim.ability(ability).is_none());
    assert!(game.master.events.iter().any(|e| matches!(
        e,
        CombatEvent::AbilityDestroyed {
            reason: arena_core::DestroyReason::GraceExpired,
            ..
        }
    )));
}

#[test]
fn destroy_overtaking_creation_leaves_no_mirror() {
    let catalog = catalog([field("quake", 3.0, 0.5, 10.0)]);
    let mut game = Match::new();
    let ability = game.cast(&catalog, "quake", Vec3::X);
    game.guest.with(
        |sim, env| {
            sim.destroy_ability(env, ability, DestroyReason::LifetimeElapsed);
        },
        &catalog,
    );

    let mut outgoing = game.guest.sim.flush();
    let kinds: Vec<MessageKind> = outgoing.iter().map(Envelope::kind).collect();
    assert_eq!(
        kinds,
        vec![MessageKind::CreateAbilityInstance, MessageKind::DestroyAbilityInstance]
    );
    outgoing.reverse();
    for envelope in outgoing {
        game.master.receive(&catalog, envelope);
    }

    assert!(game.master.sim.ability(ability).is_none());
    assert!(game.master.sim.directory().is_tombstoned(ability));
    assert_eq!(
        game.master.count(|e| matches!(e, CombatEvent::AbilitySpawned { .. })),
        0
    );
}

#[test]
fn impact_repeated_before_creation_lands_once() {
    let catalog = catalog([bolt("hook", 5.0, false, 10.0)]);
    let mut game = Match::new();
    let ability = game.cast(&catalog, "hook", Vec3::X);
    let create = game.guest.sim.flush();

    let impact = Envelope {
        from: GUEST,
        target: DeliveryTarget::All,
        message: Message::AbilityImpact(AbilityImpact {
            ability,
            ordinal: 0,
            target: Some(game.host),
            point: Vec3::new(9.5, 0.0, 0.0),
            normal: Vec3::NEG_X,
            crowd_control: Some(CrowdControl {
                kind: CrowdControlKind::Stun,
                duration_secs: 1.0,
            }),
        }),
    };
    game.master.receive(&catalog, impact.clone());
    game.master.receive(&catalog, impact.clone());
    for envelope in create {
        game.master.receive(&catalog, envelope);
    }
    game.master.receive(&catalog, impact);

    assert_eq!(game.master.impacts_of(ability), vec![Some(game.host)]);
    let stuns = game
        .master
        .movement
        .calls
        .iter()
        .filter(|call| matches!(call, MovementCall::Stun(..)))
        .count();
    assert_eq!(stuns, 1);
    let mirror = game.master.sim.ability(ability).expect("mirror");
    assert!(mirror.hit_set().contains(&game.host));
}

#[test]
fn buff_apply_reordered_behind_its_expiry_is_refused() {
    let catalog = catalog([self_buff("haste", StatKind::MoveSpeed, 50.0, true, 2.0)]);
    let mut game = Match::new();
    game.cast(&catalog, "haste", Vec3::X);
    for _ in 0..25 {
        game.guest.tick(&catalog, DT);
    }

    let (expiries, rest): (Vec<Envelope>, Vec<Envelope>) = game
        .guest
        .sim
        .flush()
        .into_iter()
        .partition(|envelope| envelope.kind() == MessageKind::BuffExpire);
    assert_eq!(expiries.len(), 1);
    assert!(rest.iter().any(|envelope| envelope.kind() == MessageKind::BuffApply));
    for envelope in expiries.into_iter().chain(rest) {
        game.master.receive(&catalog, envelope);
    }

    let speed = game.master.sim.hero(game.visitor).map(|h| h.stats.move_speed);
    assert_eq!(speed, Some(10.0));
    assert!(game.master.sim.ledger().is_empty());
    assert_eq!(
        game.master.count(|e| matches!(e, CombatEvent::BuffApplied { .. })),
        0
    );
}
