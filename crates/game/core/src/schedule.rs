//! Delayed effects keyed to the simulation clock.
//!
//! Nothing in the simulation blocks: a scripted "wait, then strike" becomes a
//! timer that fires on a later tick. Every timer has an owning entity so it can
//! be cancelled with that entity's lifetime.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::state::EntityId;

/// Cancellation token of a scheduled effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DelayedEffect {
    /// Step `step` of a scripted ability.
    ScriptStep { ability: EntityId, step: usize },
    /// Master-side respawn of a dead hero.
    Respawn { hero: EntityId },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DueEffect {
    pub timer: TimerId,
    pub owner: EntityId,
    pub at: Duration,
    pub effect: DelayedEffect,
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    owner: EntityId,
    effect: DelayedEffect,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    next_id: u64,
    queue: BTreeMap<(Duration, TimerId), Entry>,
    due_at: BTreeMap<TimerId, Duration>,
    by_owner: BTreeMap<EntityId, BTreeSet<TimerId>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, owner: EntityId, at: Duration, effect: DelayedEffect) -> TimerId {
        let timer = TimerId(self.next_id);
        self.next_id += 1;
        self.queue.insert((at, timer), Entry { owner, effect });
        self.due_at.insert(timer, at);
        self.by_owner.entry(owner).or_default().insert(timer);
        timer
    }

    /// Cancels a single timer. Returns `false` when it already fired or was cancelled.
    pub fn cancel(&mut self, timer: TimerId) -> bool {
        let Some(at) = self.due_at.remove(&timer) else {
            return false;
        };
        if let Some(entry) = self.queue.remove(&(at, timer)) {
            self.unlink(entry.owner, timer);
        }
        true
    }

    /// Cancels every pending timer owned by `owner`, returning how many were dropped.
    pub fn cancel_owner(&mut self, owner: EntityId) -> usize {
        let Some(timers) = self.by_owner.remove(&owner) else {
            return 0;
        };
        for timer in &timers {
            if let Some(at) = self.due_at.remove(timer) {
                self.queue.remove(&(at, *timer));
            }
        }
        timers.len()
    }

    /// Removes and returns every effect due at or before `now`, earliest first.
    pub fn drain_due(&mut self, now: Duration) -> Vec<DueEffect> {
        let mut due = Vec::new();
        while let Some(entry) = self.queue.first_entry() {
            let (at, timer) = *entry.key();
            if at > now {
                break;
            }
            let Entry { owner, effect } = entry.remove();
            self.due_at.remove(&timer);
            self.unlink(owner, timer);
            due.push(DueEffect {
                timer,
                owner,
                at,
                effect,
            });
        }
        due
    }

    pub fn pending_for(&self, owner: EntityId) -> usize {
        self.by_owner.get(&owner).map_or(0, BTreeSet::len)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.due_at.clear();
        self.by_owner.clear();
    }

    fn unlink(&mut self, owner: EntityId, timer: TimerId) {
        if let Some(timers) = self.by_owner.get_mut(&owner) {
            timers.remove(&timer);
            if timers.is_empty() {
                self.by_owner.remove(&owner);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABILITY: EntityId = EntityId(100);
    const HERO: EntityId = EntityId(1);

    fn step(step: usize) -> DelayedEffect {
        DelayedEffect::ScriptStep {
            ability: ABILITY,
            step,
        }
    }

    #[test]
    fn drains_in_time_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(ABILITY, Duration::from_millis(300), step(1));
        scheduler.schedule(ABILITY, Duration::from_millis(100), step(0));
        scheduler.schedule(HERO, Duration::from_secs(5), DelayedEffect::Respawn { hero: HERO });

        let due = scheduler.drain_due(Duration::from_millis(300));
        let effects: Vec<_> = due.iter().map(|d| d.effect).collect();
        assert_eq!(effects, vec![step(0), step(1)]);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.pending_for(ABILITY), 0);
    }

    #[test]
    fn cancelled_owner_never_fires() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(ABILITY, Duration::from_millis(100), step(0));
        scheduler.schedule(ABILITY, Duration::from_millis(200), step(1));
        assert_eq!(scheduler.cancel_owner(ABILITY), 2);
        assert!(scheduler.drain_due(Duration::from_secs(1)).is_empty());
        assert!(scheduler.is_empty());
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut scheduler = Scheduler::new();
        let timer = scheduler.schedule(ABILITY, Duration::from_millis(100), step(0));
        assert!(scheduler.cancel(timer));
        assert!(!scheduler.cancel(timer));
        assert_eq!(scheduler.pending_for(ABILITY), 0);
    }
}
