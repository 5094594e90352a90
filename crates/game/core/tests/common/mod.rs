#![allow(dead_code)]

use std::collections::BTreeMap;
use std::time::Duration;

use arena_core::{
    AbilityKey, AbilityKind, AreaParams, ArenaConfig, ArenaEnv, AuraParams, BuffEffect,
    CollisionWorld, CombatEvent, Envelope, Hero, PeerId, PeerRoles, ProjectileParams,
    RecordingMovement, Simulation, SpawnDescriptor, StatBlock, StatKind, TargetFilter, Team,
};
use glam::Vec3;

pub const MASTER: PeerId = PeerId(1);
pub const GUEST: PeerId = PeerId(2);

pub type Catalog = BTreeMap<AbilityKey, SpawnDescriptor>;

/// Stats without regeneration so health only moves through requests.
pub fn still_stats() -> StatBlock {
    StatBlock {
        health_regen: 0.0,
        mana_regen: 0.0,
        ..StatBlock::default()
    }
}

pub fn hero(slot: u64, owner: PeerId, team: Team, position: Vec3) -> Hero {
    Hero::new(arena_core::EntityId::hero(slot), owner, team, still_stats(), position)
}

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

pub fn bolt(key: &str, speed: f32, penetrates: bool, damage: f32) -> SpawnDescriptor {
    descriptor(
        key,
        AbilityKind::Projectile(ProjectileParams {
            speed,
            collision_radius: 0.25,
            gravity: false,
            penetrates,
            max_penetrations: 0,
            targets: TargetFilter::ENEMIES,
        }),
        damage,
        Some(5.0),
    )
}

pub fn field(key: &str, radius: f32, interval: f32, lifetime: f32) -> SpawnDescriptor {
    descriptor(
        key,
        AbilityKind::AreaScan(AreaParams {
            radius,
            max_radius: None,
            growth_per_sec: 0.0,
            damage_interval_secs: interval,
            targets: TargetFilter::ENEMIES,
        }),
        10.0,
        Some(lifetime),
    )
}

pub fn self_buff(
    key: &str,
    stat: StatKind,
    magnitude: f32,
    is_percentage: bool,
    secs: f32,
) -> SpawnDescriptor {
    descriptor(
        key,
        AbilityKind::PureBuff(AuraParams {
            radius: 0.0,
            buffs: vec![BuffEffect {
                stat,
                magnitude,
                is_percentage,
                duration_secs: secs,
            }],
            targets: TargetFilter::SELF,
            min_active_secs: 0.0,
        }),
        0.0,
        None,
    )
}

pub fn catalog(descriptors: impl IntoIterator<Item = SpawnDescriptor>) -> Catalog {
    descriptors
        .into_iter()
        .map(|descriptor| (descriptor.key.clone(), descriptor))
        .collect()
}

/// One peer with its own collision world and movement layer.
pub struct Peer {
    pub sim: Simulation,
    pub world: CollisionWorld,
    pub movement: RecordingMovement,
    pub events: Vec<CombatEvent>,
}

impl Peer {
    pub fn new(local: PeerId, master: PeerId) -> Self {
        let config = ArenaConfig::default();
        Self {
            world: CollisionWorld::new(config.hero_radius),
            sim: Simulation::new(PeerRoles::new(local, master), config),
            movement: RecordingMovement::new(),
            events: Vec::new(),
        }
    }

    pub fn master() -> Self {
        Self::new(MASTER, MASTER)
    }

    pub fn with(&mut self, f: impl FnOnce(&mut Simulation, &mut ArenaEnv<'_>), catalog: &Catalog) {
        self.world.sync_heroes(self.sim.directory().heroes());
        let mut env = ArenaEnv::new(&self.world, catalog, &mut self.movement);
        f(&mut self.sim, &mut env);
        self.events.extend(self.sim.drain_events());
    }

    pub fn tick(&mut self, catalog: &Catalog, dt: Duration) {
        self.with(|sim, env| sim.tick(env, dt), catalog);
    }

    pub fn receive(&mut self, catalog: &Catalog, envelope: Envelope) {
        self.with(|sim, env| sim.receive(env, envelope), catalog);
    }

    pub fn impacts_of(&self, ability: arena_core::EntityId) -> Vec<Option<arena_core::EntityId>> {
        self.events
            .iter()
            .filter_map(|event| match event {
                CombatEvent::Impact {
                    ability: id,
                    target,
                    ..
                } if *id == ability => Some(*target),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&CombatEvent) -> bool) -> usize {
        self.events.iter().filter(|event| pred(event)).count()
    }
}

/// Delivers every pending envelope of every peer to each addressed peer,
/// `copies` times, until the network is quiet.
pub fn exchange(peers: &mut [&mut Peer], catalog: &Catalog, copies: usize) {
    for _ in 0..8 {
        let outgoing: Vec<Envelope> = peers.iter_mut().flat_map(|peer| peer.sim.flush()).collect();
        if outgoing.is_empty() {
            return;
        }
        for envelope in outgoing {
            for peer in peers.iter_mut() {
                let roles = peer.sim.roles();
                if !envelope.addresses(roles.local, roles.master) {
                    continue;
                }
                for _ in 0..copies {
                    peer.receive(catalog, envelope.clone());
                }
            }
        }
    }
}

pub const DT: Duration = Duration::from_millis(100);
