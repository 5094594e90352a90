use std::collections::BTreeMap;

use super::message::{DeliveryTarget, Envelope, Message};
use crate::state::{EntityId, PeerId, PeerRoles};

/// Outgoing messages produced during a tick.
///
/// Nothing leaves the peer until the tick has applied all of its own effects;
/// the runtime then drains the outbox in one batch.
#[derive(Debug)]
pub struct Outbox {
    local: PeerId,
    queue: Vec<Envelope>,
    seqs: BTreeMap<EntityId, u32>,
}

impl Outbox {
    pub fn new(local: PeerId) -> Self {
        Self {
            local,
            queue: Vec::new(),
            seqs: BTreeMap::new(),
        }
    }

    pub fn send(&mut self, target: DeliveryTarget, message: Message) {
        tracing::trace!(kind = %crate::replication::MessageKind::from(&message), ?target, "queued");
        self.queue.push(Envelope {
            from: self.local,
            target,
            message,
        });
    }

    pub fn broadcast(&mut self, message: Message) {
        self.send(DeliveryTarget::All, message);
    }

    pub fn broadcast_others(&mut self, message: Message) {
        self.send(DeliveryTarget::AllExceptSender, message);
    }

    pub fn to_master(&mut self, message: Message) {
        self.send(DeliveryTarget::Master, message);
    }

    /// Next snapshot sequence number for `entity`, starting at 1.
    pub fn next_seq(&mut self, entity: EntityId) -> u32 {
        let seq = self.seqs.entry(entity).or_insert(0);
        *seq = seq.wrapping_add(1);
        *seq
    }

    pub fn forget(&mut self, entity: EntityId) {
        self.seqs.remove(&entity);
    }

    /// Removes envelopes this peer is the only recipient of, so they can be
    /// handled without a round trip through the transport.
    pub fn take_local(&mut self, roles: PeerRoles) -> Vec<Envelope> {
        let (local, remote): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.queue)
                .into_iter()
                .partition(|envelope| match envelope.target {
                    DeliveryTarget::Master => roles.is_master(),
                    DeliveryTarget::Peer(peer) => peer == roles.local,
                    DeliveryTarget::All | DeliveryTarget::AllExceptSender => false,
                });
        self.queue = remote;
        local
    }

    pub fn drain(&mut self) -> Vec<Envelope> {
        std::mem::take(&mut self.queue)
    }

    pub fn pending(&self) -> &[Envelope] {
        &self.queue
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Enforces the monotonic snapshot rule on the receiving side.
#[derive(Debug, Default)]
pub struct SnapshotGate {
    last: BTreeMap<EntityId, u32>,
}

impl SnapshotGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `seq` only if it is newer than the last accepted one.
    pub fn admit(&mut self, entity: EntityId, seq: u32) -> bool {
        match self.last.get(&entity) {
            Some(last) if seq <= *last => false,
            _ => {
                self.last.insert(entity, seq);
                true
            }
        }
    }

    pub fn last(&self, entity: EntityId) -> Option<u32> {
        self.last.get(&entity).copied()
    }

    pub fn forget(&mut self, entity: EntityId) {
        self.last.remove(&entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replication::DestroyAbility;

    fn destroy(id: u64) -> Message {
        Message::DestroyAbilityInstance(DestroyAbility {
            ability: EntityId(id),
        })
    }

    #[test]
    fn master_keeps_its_own_requests() {
        let roles = PeerRoles::new(PeerId(1), PeerId(1));
        let mut outbox = Outbox::new(PeerId(1));
        outbox.to_master(destroy(1));
        outbox.broadcast(destroy(2));
        outbox.send(DeliveryTarget::Peer(PeerId(1)), destroy(3));

        let local = outbox.take_local(roles);
        assert_eq!(local.len(), 2);
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox.pending()[0].target, DeliveryTarget::All);
    }

    #[test]
    fn non_master_ships_requests() {
        let roles = PeerRoles::new(PeerId(2), PeerId(1));
        let mut outbox = Outbox::new(PeerId(2));
        outbox.to_master(destroy(1));
        assert!(outbox.take_local(roles).is_empty());
        assert_eq!(outbox.drain().len(), 1);
        assert!(outbox.is_empty());
    }

    #[test]
    fn gate_rejects_stale_and_duplicate_sequences() {
        let mut gate = SnapshotGate::new();
        let id = EntityId(7);
        assert!(gate.admit(id, 3));
        assert!(!gate.admit(id, 3));
        assert!(!gate.admit(id, 2));
        assert!(gate.admit(id, 4));
        assert_eq!(gate.last(id), Some(4));
    }

    #[test]
    fn addressing_follows_delivery_target() {
        let envelope = Envelope {
            from: PeerId(2),
            target: DeliveryTarget::AllExceptSender,
            message: destroy(1),
        };
        assert!(!envelope.addresses(PeerId(2), PeerId(1)));
        assert!(envelope.addresses(PeerId(3), PeerId(1)));
    }
}
