mod common;

use arena_content::Content;
use arena_core::{CastError, CombatEvent, DestroyReason, SpawnTransform, Team};
use arena_runtime::{Event, LocalMatch, RuntimeError, Seat, SessionEvent, Topic};
use glam::Vec3;

use common::{GUEST, HOST, MASTER, VISITOR, config, content, duel, health, records};

fn toward_host() -> SpawnTransform {
    SpawnTransform::new(Vec3::ZERO, Vec3::X)
}

#[tokio::test]
async fn guest_bolt_is_arbitrated_by_master_and_mirrored() {
    let mut game = duel(config());
    let mut vitals = game.subscribe(Topic::Vitals);
    let mut abilities = game.subscribe(Topic::Abilities);

    let bolt = game.cast(VISITOR, "bolt", toward_host()).unwrap();
    game.run(40).await.unwrap();

    assert_eq!(health(&game, HOST), vec![450.0, 450.0]);
    for peer in game.peers() {
        assert!(game.session(peer).unwrap().simulation().ability(bolt).is_none());
    }

    let damage: Vec<_> = records(&mut vitals)
        .into_iter()
        .filter(|record| matches!(record.event, CombatEvent::Damaged { .. }))
        .collect();
    assert_eq!(damage.len(), 1);
    assert_eq!(damage[0].peer, MASTER);
    assert!(matches!(
        damage[0].event,
        CombatEvent::Damaged { target, amount, .. } if target == HOST && amount == 50.0
    ));

    let spawned: Vec<_> = records(&mut abilities)
        .into_iter()
        .filter(|record| {
            matches!(record.event, CombatEvent::AbilitySpawned { ability, .. } if ability == bolt)
        })
        .map(|record| record.peer)
        .collect();
    assert_eq!(spawned, vec![GUEST, MASTER], "caster first, then its mirror");
}

#[tokio::test]
async fn steps_report_traffic() {
    let mut game = duel(config());
    game.cast(VISITOR, "bolt", toward_host()).unwrap();

    let report = game.step().await.unwrap();
    assert!(report.sent > 0);
    assert_eq!(report.dropped, 0);

    let report = game.step().await.unwrap();
    assert!(report.received > 0);
}

#[test]
fn casting_for_a_remote_hero_is_refused() {
    let mut game = duel(config());
    let err = game
        .session_mut(MASTER)
        .unwrap()
        .cast(VISITOR, &"bolt".into(), toward_host())
        .unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Cast(CastError::NotOwner { owner, .. }) if owner == GUEST
    ));
}

#[test]
fn unknown_caster_is_refused() {
    let mut game = duel(config());
    let err = game
        .cast(arena_core::EntityId::hero(9), "bolt", toward_host())
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Cast(CastError::CasterNotFound { .. })));
}

#[test]
fn builder_validates_the_roster() {
    let unknown_template = LocalMatch::builder(content(3.0))
        .master(MASTER)
        .seat(Seat::new(1, "nobody", MASTER, Team::Red, Vec3::ZERO))
        .build();
    assert!(matches!(unknown_template, Err(RuntimeError::UnknownHero { .. })));

    let absent_owner = LocalMatch::builder(content(3.0))
        .master(MASTER)
        .seat(Seat::new(1, "duelist", GUEST, Team::Red, Vec3::ZERO))
        .build();
    assert!(matches!(absent_owner, Err(RuntimeError::UnknownPeer { peer }) if peer == GUEST));

    let twice = LocalMatch::builder(content(3.0))
        .master(MASTER)
        .peer(GUEST)
        .peer(GUEST)
        .build();
    assert!(matches!(twice, Err(RuntimeError::DuplicatePeer { .. })));

    let empty = LocalMatch::builder(content(3.0)).build();
    assert!(matches!(empty, Err(RuntimeError::MissingMaster { .. })));
}

#[tokio::test]
async fn finishing_tears_down_live_abilities() {
    let mut game = duel(config());
    let mut abilities = game.subscribe(Topic::Abilities);
    let mut session = game.subscribe(Topic::Session);

    let beacon = game
        .cast(VISITOR, "beacon", SpawnTransform::new(Vec3::new(0.0, 0.0, -20.0), Vec3::X))
        .unwrap();
    game.run(4).await.unwrap();
    assert!(game.session(MASTER).unwrap().simulation().ability(beacon).is_some());

    game.finish().await.unwrap();

    let ended = records(&mut abilities)
        .into_iter()
        .filter(|record| {
            matches!(
                record.event,
                CombatEvent::AbilityDestroyed { ability, reason: DestroyReason::MatchEnded }
                    if ability == beacon
            )
        })
        .count();
    assert_eq!(ended, 2, "owner and mirror both tear it down");

    let mut stopped = 0;
    while let Ok(event) = session.try_recv() {
        if matches!(event, Event::Session(SessionEvent::Stopped { .. })) {
            stopped += 1;
        }
    }
    assert_eq!(stopped, 2);
}

#[tokio::test]
async fn embedded_content_plays_a_duel() {
    let content = Content::embedded().unwrap();
    let max_health = content.heroes.get("sorcerer").unwrap().stats.max_health;
    let mut game = LocalMatch::builder(content)
        .config(config())
        .master(MASTER)
        .peer(GUEST)
        .seat(Seat::new(1, "ranger", MASTER, Team::Red, Vec3::ZERO))
        .seat(Seat::new(2, "sorcerer", GUEST, Team::Blue, Vec3::new(12.0, 0.0, 0.0)))
        .build()
        .unwrap();

    game.cast(HOST, "arrow", SpawnTransform::new(Vec3::ZERO, Vec3::X))
        .unwrap();
    game.run(20).await.unwrap();

    let seen = health(&game, VISITOR);
    assert!(seen[0] < max_health);
    assert_eq!(seen[0], seen[1]);
}
