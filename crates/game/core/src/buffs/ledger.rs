use std::collections::BTreeMap;
use std::time::Duration;

use arrayvec::ArrayVec;

use crate::config::ArenaConfig;
use crate::env::MovementCollaborator;
use crate::error::BuffError;
use crate::state::{EntityId, Hero, HeroTable, StatKind};

/// Timed stat modification requested by an ability.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BuffSpec {
    pub stat: StatKind,
    pub magnitude: f32,
    /// `magnitude` is a percentage of the original value rather than a flat amount.
    pub is_percentage: bool,
    pub duration: Duration,
}

/// Identity of a record: one per (target, stat, source ability).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BuffKey {
    pub target: EntityId,
    pub stat: StatKind,
    pub source: EntityId,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BuffRecord {
    pub target: EntityId,
    pub stat: StatKind,
    pub source: EntityId,
    pub magnitude: f32,
    pub is_percentage: bool,
    /// Value of the stat before any buff on it was active.
    pub original: f32,
    pub end_time: Duration,
    /// Issued by the applying peer's ledger, increasing. Pairs an expiry with
    /// the application it ends.
    pub serial: u32,
    /// Copied from another peer's broadcast rather than applied here.
    pub mirrored: bool,
}

impl BuffRecord {
    pub fn key(&self) -> BuffKey {
        BuffKey {
            target: self.target,
            stat: self.stat,
            source: self.source,
        }
    }

    fn modify(&self, value: f32) -> f32 {
        if self.is_percentage {
            value * (1.0 + self.magnitude / 100.0)
        } else {
            value + self.magnitude
        }
    }
}

type Records = ArrayVec<BuffRecord, { ArenaConfig::MAX_BUFFS_PER_HERO }>;

/// Active buffs per hero, in application order.
///
/// Every record on a (target, stat) pair shares the original captured when the
/// first of them was applied. Removing the last one writes that original back
/// verbatim; removing one of several re-derives the live value from the
/// original and the survivors. The live stat is never used as a restore source.
///
/// Removed keys are remembered with their serial until pruned, so a mirrored
/// application that arrives after its expiry is refused.
#[derive(Debug, Default)]
pub struct BuffLedger {
    records: BTreeMap<EntityId, Records>,
    next_serial: u32,
    /// Highest removed serial per key and the sim time it was removed.
    retired: BTreeMap<BuffKey, (u32, Duration)>,
    clock: Duration,
}

impl BuffLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a buff from `source` to `hero`.
    ///
    /// # Errors
    ///
    /// [`BuffError::AlreadyActive`] if the same source already buffs this stat
    /// on this hero, [`BuffError::LedgerFull`] if the hero is at capacity.
    pub fn apply(
        &mut self,
        hero: &mut Hero,
        spec: &BuffSpec,
        source: EntityId,
        now: Duration,
        movement: &mut dyn MovementCollaborator,
    ) -> Result<BuffRecord, BuffError> {
        self.clock = now;
        let serial = self.next_serial.wrapping_add(1);
        let original = self
            .baseline(hero.id, spec.stat)
            .unwrap_or_else(|| hero.stats.get(spec.stat));
        let record = BuffRecord {
            target: hero.id,
            stat: spec.stat,
            source,
            magnitude: spec.magnitude,
            is_percentage: spec.is_percentage,
            original,
            end_time: now + spec.duration,
            serial,
            mirrored: false,
        };
        self.insert(hero, record, movement)?;
        self.next_serial = serial;
        Ok(record)
    }

    /// Adopts a record applied by another peer. Its original becomes the
    /// baseline only if this peer has no active record on the stat yet.
    ///
    /// # Errors
    ///
    /// [`BuffError::Retired`] if this application already expired here.
    pub fn mirror(
        &mut self,
        hero: &mut Hero,
        mut record: BuffRecord,
        movement: &mut dyn MovementCollaborator,
    ) -> Result<BuffRecord, BuffError> {
        if self.is_retired(record.key(), record.serial) {
            return Err(BuffError::Retired {
                target: record.target,
                stat: record.stat,
                ability: record.source,
            });
        }
        if let Some(baseline) = self.baseline(hero.id, record.stat) {
            record.original = baseline;
        }
        record.mirrored = true;
        self.insert(hero, record, movement)?;
        Ok(record)
    }

    /// Forces a single record to expire now.
    pub fn expire(
        &mut self,
        key: BuffKey,
        heroes: &mut HeroTable,
        movement: &mut dyn MovementCollaborator,
    ) -> Option<BuffRecord> {
        let removed = self.remove_where(key.target, heroes, movement, |r| r.key() == key);
        removed.into_iter().next()
    }

    /// Ends the application `serial` of `key` and every earlier one. A newer
    /// active record under the same key survives. Later mirrors of the
    /// retired application are refused.
    pub fn retire(
        &mut self,
        key: BuffKey,
        serial: u32,
        heroes: &mut HeroTable,
        movement: &mut dyn MovementCollaborator,
    ) -> Option<BuffRecord> {
        self.remember_retired(key, serial);
        let removed = self.remove_where(key.target, heroes, movement, |r| {
            r.key() == key && r.serial <= serial
        });
        removed.into_iter().next()
    }

    /// Whether application `serial` of `key` was already removed here.
    pub fn is_retired(&self, key: BuffKey, serial: u32) -> bool {
        self.retired
            .get(&key)
            .is_some_and(|(retired, _)| *retired >= serial)
    }

    /// Forgets keys retired before `cutoff`.
    pub fn prune_retired(&mut self, cutoff: Duration) {
        self.retired.retain(|_, (_, at)| *at >= cutoff);
    }

    /// Removes every record whose end time has been reached.
    pub fn sweep(
        &mut self,
        now: Duration,
        heroes: &mut HeroTable,
        movement: &mut dyn MovementCollaborator,
    ) -> Vec<BuffRecord> {
        self.clock = now;
        let targets: Vec<EntityId> = self
            .records
            .iter()
            .filter(|(_, records)| records.iter().any(|r| now >= r.end_time))
            .map(|(target, _)| *target)
            .collect();
        let mut expired = Vec::new();
        for target in targets {
            expired.extend(self.remove_where(target, heroes, movement, |r| now >= r.end_time));
        }
        expired
    }

    /// Removes every record created by `source`.
    pub fn remove_by_source(
        &mut self,
        source: EntityId,
        heroes: &mut HeroTable,
        movement: &mut dyn MovementCollaborator,
    ) -> Vec<BuffRecord> {
        let targets: Vec<EntityId> = self
            .records
            .iter()
            .filter(|(_, records)| records.iter().any(|r| r.source == source))
            .map(|(target, _)| *target)
            .collect();
        let mut removed = Vec::new();
        for target in targets {
            removed.extend(self.remove_where(target, heroes, movement, |r| r.source == source));
        }
        removed
    }

    /// Drops every record on a hero, restoring each stat to its original.
    pub fn clear_target(
        &mut self,
        hero: &mut Hero,
        movement: &mut dyn MovementCollaborator,
    ) -> Vec<BuffRecord> {
        let Some(records) = self.records.remove(&hero.id) else {
            return Vec::new();
        };
        let mut restored: Vec<StatKind> = Vec::new();
        for record in &records {
            if !restored.contains(&record.stat) {
                restored.push(record.stat);
                write_stat(hero, record.stat, record.original, movement);
            }
        }
        for record in &records {
            self.remember_retired(record.key(), record.serial);
        }
        records.into_iter().collect()
    }

    pub fn records(&self, target: EntityId) -> &[BuffRecord] {
        self.records
            .get(&target)
            .map_or(&[] as &[BuffRecord], |records| records.as_slice())
    }

    pub fn get(&self, key: BuffKey) -> Option<&BuffRecord> {
        self.records(key.target).iter().find(|r| r.key() == key)
    }

    pub fn has_source(&self, source: EntityId) -> bool {
        self.records
            .values()
            .any(|records| records.iter().any(|r| r.source == source))
    }

    pub fn len(&self) -> usize {
        self.records.values().map(ArrayVec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.retired.clear();
    }

    fn remember_retired(&mut self, key: BuffKey, serial: u32) {
        let clock = self.clock;
        let entry = self.retired.entry(key).or_insert((serial, clock));
        if serial >= entry.0 {
            *entry = (serial, clock);
        }
    }

    fn baseline(&self, target: EntityId, stat: StatKind) -> Option<f32> {
        self.records(target)
            .iter()
            .find(|r| r.stat == stat)
            .map(|r| r.original)
    }

    fn insert(
        &mut self,
        hero: &mut Hero,
        record: BuffRecord,
        movement: &mut dyn MovementCollaborator,
    ) -> Result<(), BuffError> {
        let records = self.records.entry(hero.id).or_default();
        if records.iter().any(|r| r.key() == record.key()) {
            return Err(BuffError::AlreadyActive {
                target: record.target,
                stat: record.stat,
                ability: record.source,
            });
        }
        records
            .try_push(record)
            .map_err(|_| BuffError::LedgerFull { target: hero.id })?;
        let value = compose(record.original, records, record.stat);
        write_stat(hero, record.stat, value, movement);
        Ok(())
    }

    fn remove_where(
        &mut self,
        target: EntityId,
        heroes: &mut HeroTable,
        movement: &mut dyn MovementCollaborator,
        predicate: impl Fn(&BuffRecord) -> bool,
    ) -> Vec<BuffRecord> {
        let Some(records) = self.records.get_mut(&target) else {
            return Vec::new();
        };
        let mut removed = Vec::new();
        records.retain(|record| {
            if predicate(record) {
                removed.push(*record);
                false
            } else {
                true
            }
        });
        if removed.is_empty() {
            return removed;
        }

        if let Some(hero) = heroes.get_mut(&target) {
            let mut touched: Vec<(StatKind, f32)> = Vec::new();
            for record in &removed {
                if !touched.iter().any(|(stat, _)| *stat == record.stat) {
                    touched.push((record.stat, record.original));
                }
            }
            for (stat, original) in touched {
                let value = if records.iter().any(|r| r.stat == stat) {
                    compose(original, records, stat)
                } else {
                    original
                };
                write_stat(hero, stat, value, movement);
            }
        }

        if records.is_empty() {
            self.records.remove(&target);
        }
        for record in &removed {
            self.remember_retired(record.key(), record.serial);
        }
        removed
    }
}

/// Live value of `stat` given its original and the active records.
fn compose(original: f32, records: &[BuffRecord], stat: StatKind) -> f32 {
    records
        .iter()
        .filter(|r| r.stat == stat)
        .fold(original, |value, record| record.modify(value))
}

fn write_stat(
    hero: &mut Hero,
    stat: StatKind,
    value: f32,
    movement: &mut dyn MovementCollaborator,
) {
    hero.stats.set(stat, value);
    if stat == StatKind::MoveSpeed {
        movement.sync_move_speed(hero.id, value);
    }
}
