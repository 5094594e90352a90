//! Replication under a misbehaving network.

mod common;

use arena_core::{CombatEvent, DeliveryTarget, DestroyReason, PeerId, SpawnTransform};
use arena_runtime::{Event, FaultInjection, Frame, RuntimeConfig, SessionEvent, Topic, Transport};
use glam::Vec3;

use common::{GUEST, HOST, MASTER, VISITOR, config, duel, health, records};

fn faulty(duplicate_chance: f64, reorder: bool, seed: u64) -> RuntimeConfig {
    RuntimeConfig {
        faults: FaultInjection {
            duplicate_chance,
            reorder,
            seed,
        },
        ..config()
    }
}

#[tokio::test]
async fn duplicated_and_reordered_delivery_applies_damage_once() {
    let mut game = duel(faulty(0.5, true, 7));
    let mut vitals = game.subscribe(Topic::Vitals);

    game.cast(VISITOR, "bolt", SpawnTransform::new(Vec3::ZERO, Vec3::X))
        .unwrap();
    game.run(60).await.unwrap();

    assert_eq!(health(&game, HOST), vec![450.0, 450.0]);
    let damaged = records(&mut vitals)
        .iter()
        .filter(|record| matches!(record.event, CombatEvent::Damaged { .. }))
        .count();
    assert_eq!(damaged, 1);

    let stats = game.network().stats();
    assert!(stats.duplicated > 0);
    assert!(stats.reordered > 0);
}

#[tokio::test]
async fn outcome_does_not_depend_on_the_seed() {
    for seed in 1..=5 {
        let mut game = duel(faulty(1.0, true, seed));
        game.cast(VISITOR, "bolt", SpawnTransform::new(Vec3::ZERO, Vec3::X))
            .unwrap();
        game.run(60).await.unwrap();
        assert_eq!(health(&game, HOST), vec![450.0, 450.0], "seed {seed}");
    }
}

#[tokio::test]
async fn mirror_of_a_departed_owner_expires() {
    let mut game = duel(config());
    let mut abilities = game.subscribe(Topic::Abilities);

    let beacon = game
        .cast(VISITOR, "beacon", SpawnTransform::new(Vec3::new(0.0, 0.0, -20.0), Vec3::X))
        .unwrap();
    game.run(4).await.unwrap();
    assert!(game.session(MASTER).unwrap().simulation().ability(beacon).is_some());

    game.disconnect(GUEST).unwrap();
    // Lifetime 3 s plus 2 s of grace, with margin.
    game.run(120).await.unwrap();

    assert!(game.session(MASTER).unwrap().simulation().ability(beacon).is_none());
    assert!(records(&mut abilities).iter().any(|record| {
        record.peer == MASTER
            && matches!(
                record.event,
                CombatEvent::AbilityDestroyed { ability, reason: DestroyReason::GraceExpired }
                    if ability == beacon
            )
    }));
    assert!(game.network().stats().undeliverable > 0);
}

#[tokio::test]
async fn garbage_frames_are_dropped_and_reported() {
    let mut game = duel(config());
    let mut session = game.subscribe(Topic::Session);
    let mut rogue = game.network().connect(PeerId(9)).unwrap();

    rogue
        .send(Frame {
            from: PeerId(9),
            target: DeliveryTarget::Master,
            payload: vec![0xff; 5],
        })
        .await
        .unwrap();
    let report = game.step().await.unwrap();

    assert_eq!(report.dropped, 1);
    let mut dropped = Vec::new();
    while let Ok(event) = session.try_recv() {
        if let Event::Session(SessionEvent::FrameDropped { peer, .. }) = event {
            dropped.push(peer);
        }
    }
    assert_eq!(dropped, vec![MASTER]);
    assert_eq!(health(&game, HOST), vec![500.0, 500.0]);
}
