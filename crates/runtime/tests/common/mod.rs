#![allow(dead_code)]

use arena_content::{AbilityCatalog, Content, HeroRoster, HeroTemplate};
use arena_core::{
    AbilityKey, AbilityKind, AreaParams, ArenaConfig, EntityId, PeerId, ProjectileParams,
    SpawnDescriptor, StatBlock, TargetFilter, Team,
};
use arena_runtime::{CombatRecord, Event, LocalMatch, RuntimeConfig, Seat};
use glam::Vec3;
use tokio::sync::broadcast;

pub const MASTER: PeerId = PeerId(1);
pub const GUEST: PeerId = PeerId(2);

/// Hero driven by the master peer.
pub const HOST: EntityId = EntityId::hero(1);
/// Hero driven by the guest peer.
pub const VISITOR: EntityId = EntityId::hero(2);

fn descriptor(
    key: &str,
    kind: AbilityKind,
    damage: f32,
    lifetime_secs: Option<f32>,
) -> SpawnDescriptor {
    SpawnDescriptor {
        key: AbilityKey::from(key),
        kind,
        damage,
        is_magic: false,
        lifetime_secs,
        cooldown_secs: 0.0,
        mana_cost: 0.0,
        caster_scaling: 0.0,
        on_hit: Vec::new(),
        crowd_control: None,
        ranks: Vec::new(),
    }
}

/// 60 physical damage, which 20 armor mitigates to exactly 50.
pub fn bolt() -> SpawnDescriptor {
    descriptor(
        "bolt",
        AbilityKind::Projectile(ProjectileParams {
            speed: 30.0,
            collision_radius: 0.25,
            gravity: false,
            penetrates: false,
            max_penetrations: 0,
            targets: TargetFilter::ENEMIES,
        }),
        60.0,
        Some(2.0),
    )
}

/// Harmless area left wherever it is cast.
pub fn beacon(lifetime: f32) -> SpawnDescriptor {
    descriptor(
        "beacon",
        AbilityKind::AreaScan(AreaParams {
            radius: 1.0,
            max_radius: None,
            growth_per_sec: 0.0,
            damage_interval_secs: 0.5,
            targets: TargetFilter::ENEMIES,
        }),
        0.0,
        Some(lifetime),
    )
}

/// Default stats without regeneration, so health only moves through combat.
pub fn duelist() -> HeroTemplate {
    HeroTemplate {
        name: "duelist".into(),
        level: 1,
        stats: StatBlock {
            health_regen: 0.0,
            mana_regen: 0.0,
            ..StatBlock::default()
        },
        abilities: vec![(AbilityKey::from("bolt"), 1), (AbilityKey::from("beacon"), 1)],
    }
}

pub fn content(beacon_lifetime: f32) -> Content {
    let mut heroes = HeroRoster::new();
    heroes.insert(duelist());
    Content {
        config: ArenaConfig::default(),
        abilities: AbilityCatalog::from_iter([bolt(), beacon(beacon_lifetime)]),
        heroes,
    }
}

/// 20 Hz: one tick is 50 ms of sim time, which is also the snapshot cadence.
pub fn config() -> RuntimeConfig {
    RuntimeConfig {
        tick_hz: 20,
        ..RuntimeConfig::default()
    }
}

/// Host at x = 10 on Red, visitor at the origin on Blue.
pub fn duel(config: RuntimeConfig) -> LocalMatch {
    LocalMatch::builder(content(3.0))
        .config(config)
        .master(MASTER)
        .peer(GUEST)
        .seat(Seat::new(1, "duelist", MASTER, Team::Red, Vec3::new(10.0, 0.0, 0.0)))
        .seat(Seat::new(2, "duelist", GUEST, Team::Blue, Vec3::ZERO))
        .build()
        .expect("duel builds")
}

pub fn health(game: &LocalMatch, hero: EntityId) -> Vec<f32> {
    game.peers()
        .map(|peer| {
            game.session(peer)
                .and_then(|session| session.hero(hero))
                .map_or(f32::NAN, |hero| hero.health())
        })
        .collect()
}

/// Everything already published on a subscription.
pub fn records(rx: &mut broadcast::Receiver<Event>) -> Vec<CombatRecord> {
    let mut records = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let Event::Combat(record) = event {
            records.push(record);
        }
    }
    records
}
