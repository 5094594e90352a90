use std::fmt;

/// Network-stable identifier for any combat entity (hero or ability instance).
///
/// The upper 16 bits carry the peer that allocated the id; the lower 48 bits
/// are a per-peer counter. Peers can therefore mint ids for their own ability
/// instances without coordinating. Match setup reserves [`PeerId::MATCH`]
/// for heroes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityId(pub u64);

impl EntityId {
    const LOCAL_BITS: u32 = 48;
    const LOCAL_MASK: u64 = (1 << Self::LOCAL_BITS) - 1;

    /// Builds an id from the allocating peer and its local counter.
    #[inline]
    pub const fn compose(peer: PeerId, local: u64) -> Self {
        Self(((peer.0 as u64) << Self::LOCAL_BITS) | (local & Self::LOCAL_MASK))
    }

    /// Id of the hero occupying `slot` in the match roster.
    #[inline]
    pub const fn hero(slot: u64) -> Self {
        Self::compose(PeerId::MATCH, slot)
    }

    /// Peer that allocated this id.
    #[inline]
    pub const fn peer(self) -> PeerId {
        PeerId((self.0 >> Self::LOCAL_BITS) as u16)
    }

    #[inline]
    pub const fn local(self) -> u64 {
        self.0 & Self::LOCAL_MASK
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.peer().0, self.local())
    }
}

/// Participant in the match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeerId(pub u16);

impl PeerId {
    /// Namespace used by match setup when assigning hero ids. Never a real peer.
    pub const MATCH: Self = Self(0);
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer:{}", self.0)
    }
}

/// Roles of the local peer within the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeerRoles {
    pub local: PeerId,
    pub master: PeerId,
}

impl PeerRoles {
    pub const fn new(local: PeerId, master: PeerId) -> Self {
        Self { local, master }
    }

    #[inline]
    pub const fn is_master(&self) -> bool {
        self.local.0 == self.master.0
    }
}

/// Team affiliation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Team {
    Red,
    Blue,
    /// Hostile to everyone, including other neutrals.
    Neutral,
}

impl Team {
    pub fn is_hostile_to(self, other: Team) -> bool {
        self != other || self == Team::Neutral
    }
}

/// Simulation step counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Self = Self(0);
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
