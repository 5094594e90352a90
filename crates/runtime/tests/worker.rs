//! Background workers driven through session handles.

mod common;

use std::time::Duration;

use arena_core::{CastError, CombatEvent, SpawnTransform};
use arena_runtime::{Event, RuntimeError, Topic};
use glam::Vec3;
use tokio::time::timeout;

use common::{GUEST, HOST, MASTER, VISITOR, config, duel};

const PATIENCE: Duration = Duration::from_secs(5);

#[tokio::test]
async fn workers_tick_and_serve_commands() {
    let runtime = duel(config()).start();
    let master = runtime.handle(MASTER).unwrap();
    let guest = runtime.handle(GUEST).unwrap();
    let mut vitals = runtime.subscribe(Topic::Vitals);

    guest
        .cast(VISITOR, "bolt", SpawnTransform::new(Vec3::ZERO, Vec3::X))
        .await
        .unwrap();

    let damaged = timeout(PATIENCE, async {
        loop {
            match vitals.recv().await {
                Ok(Event::Combat(record)) => {
                    if let CombatEvent::Damaged { target, amount, .. } = record.event {
                        return (record.peer, target, amount);
                    }
                }
                Ok(_) => {}
                Err(error) => panic!("vitals stream ended: {error}"),
            }
        }
    })
    .await
    .expect("damage within the deadline");
    assert_eq!(damaged, (MASTER, HOST, 50.0));

    let on_master = master.hero(HOST).await.unwrap().unwrap();
    assert_eq!(on_master.health(), 450.0);

    // The guest hears about it one tick later at most.
    timeout(PATIENCE, async {
        while guest.hero(HOST).await.unwrap().unwrap().health() != 450.0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("guest converges");

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn rejected_cast_is_returned_to_the_caller() {
    let runtime = duel(config()).start();
    let guest = runtime.handle(GUEST).unwrap();

    let err = guest
        .cast(HOST, "bolt", SpawnTransform::new(Vec3::ZERO, Vec3::X))
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Cast(CastError::NotOwner { .. })));

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn clock_advances_in_fixed_steps() {
    let runtime = duel(config()).start();
    let master = runtime.handle(MASTER).unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    let (tick, now) = master.clock().await.unwrap();
    assert!(tick.0 > 0);
    assert_eq!(now, Duration::from_millis(50) * tick.0 as u32);

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn handles_outliving_the_match_report_closed_channels() {
    let runtime = duel(config()).start();
    let master = runtime.handle(MASTER).unwrap();
    assert!(matches!(
        runtime.handle(arena_core::PeerId(7)),
        Err(RuntimeError::UnknownPeer { .. })
    ));

    runtime.shutdown().await.unwrap();
    assert!(matches!(
        master.clock().await,
        Err(RuntimeError::CommandChannelClosed)
    ));
}
