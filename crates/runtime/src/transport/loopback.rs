//! In-process network for local matches and tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use arena_core::PeerId;
use async_trait::async_trait;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;

use super::{Frame, Transport, TransportError};

/// Deterministic delivery faults.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaultInjection {
    /// Probability that a frame reaches a recipient twice.
    pub duplicate_chance: f64,
    /// Hold back some frames until a later frame has overtaken them.
    pub reorder: bool,
    pub seed: u64,
}

impl FaultInjection {
    pub const NONE: Self = Self {
        duplicate_chance: 0.0,
        reorder: false,
        seed: 0,
    };
}

impl Default for FaultInjection {
    fn default() -> Self {
        Self::NONE
    }
}

/// Delivery counters, summed over every recipient.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NetworkStats {
    pub sent: u64,
    pub delivered: u64,
    pub duplicated: u64,
    pub reordered: u64,
    /// Frames addressed to peers that had already left.
    pub undeliverable: u64,
}

struct Router {
    master: PeerId,
    inboxes: BTreeMap<PeerId, mpsc::UnboundedSender<Frame>>,
    /// Frames held back per recipient, released behind the next delivery.
    held: BTreeMap<PeerId, Vec<Frame>>,
    duplicate_chance: f64,
    reorder: bool,
    rng: SmallRng,
    stats: NetworkStats,
}

impl Router {
    fn route(&mut self, frame: Frame) {
        self.stats.sent += 1;
        let recipients: Vec<PeerId> = self
            .inboxes
            .keys()
            .copied()
            .filter(|&peer| frame.addresses(peer, self.master))
            .collect();
        if recipients.is_empty() {
            self.stats.undeliverable += 1;
            tracing::trace!(from = %frame.from, target = ?frame.target, "frame has no recipient");
        }
        for peer in recipients {
            let duplicate =
                self.duplicate_chance > 0.0 && self.rng.gen_bool(self.duplicate_chance);
            let copies = if duplicate {
                self.stats.duplicated += 1;
                2
            } else {
                1
            };
            for _ in 0..copies {
                self.deliver(peer, frame.clone());
            }
        }
    }

    fn deliver(&mut self, peer: PeerId, frame: Frame) {
        if self.reorder && self.rng.gen_bool(0.5) {
            self.stats.reordered += 1;
            self.held.entry(peer).or_default().push(frame);
            return;
        }
        self.push(peer, frame);
        for held in self.held.remove(&peer).unwrap_or_default() {
            self.push(peer, held);
        }
    }

    fn push(&mut self, peer: PeerId, frame: Frame) {
        let Some(inbox) = self.inboxes.get(&peer) else {
            self.stats.undeliverable += 1;
            return;
        };
        if inbox.send(frame).is_err() {
            self.stats.undeliverable += 1;
            return;
        }
        self.stats.delivered += 1;
    }
}

/// Shared in-process network. Cloning yields another handle to the same
/// network.
#[derive(Clone)]
pub struct LoopbackNetwork {
    router: Arc<Mutex<Router>>,
}

impl LoopbackNetwork {
    pub fn new(master: PeerId, faults: FaultInjection) -> Self {
        let router = Router {
            master,
            inboxes: BTreeMap::new(),
            held: BTreeMap::new(),
            duplicate_chance: faults.duplicate_chance.clamp(0.0, 1.0),
            reorder: faults.reorder,
            rng: SmallRng::seed_from_u64(faults.seed),
            stats: NetworkStats::default(),
        };
        Self {
            router: Arc::new(Mutex::new(router)),
        }
    }

    /// Attaches `peer` and returns its end of the network.
    pub fn connect(&self, peer: PeerId) -> Result<LoopbackTransport, TransportError> {
        let mut router = self.lock()?;
        if router.inboxes.contains_key(&peer) {
            return Err(TransportError::AlreadyConnected { peer });
        }
        let (tx, rx) = mpsc::unbounded_channel();
        router.inboxes.insert(peer, tx);
        tracing::debug!(%peer, "peer connected");
        Ok(LoopbackTransport {
            local: peer,
            network: self.clone(),
            inbox: rx,
        })
    }

    /// Detaches `peer`. Frames still in flight to it are lost, and frames
    /// sent to it afterwards count as undeliverable.
    pub fn disconnect(&self, peer: PeerId) -> Result<(), TransportError> {
        let mut router = self.lock()?;
        router.held.remove(&peer);
        if router.inboxes.remove(&peer).is_none() {
            return Err(TransportError::Disconnected { peer });
        }
        tracing::debug!(%peer, "peer disconnected");
        Ok(())
    }

    pub fn is_connected(&self, peer: PeerId) -> bool {
        self.lock()
            .map(|router| router.inboxes.contains_key(&peer))
            .unwrap_or(false)
    }

    pub fn stats(&self) -> NetworkStats {
        self.lock().map(|router| router.stats).unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Router>, TransportError> {
        self.router.lock().map_err(|_| TransportError::Poisoned)
    }
}

/// One peer's end of a [`LoopbackNetwork`].
pub struct LoopbackTransport {
    local: PeerId,
    network: LoopbackNetwork,
    inbox: mpsc::UnboundedReceiver<Frame>,
}

impl LoopbackTransport {
    pub fn network(&self) -> &LoopbackNetwork {
        &self.network
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    fn local(&self) -> PeerId {
        self.local
    }

    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        let mut router = self.network.lock()?;
        if !router.inboxes.contains_key(&self.local) {
            return Err(TransportError::Disconnected { peer: self.local });
        }
        router.route(frame);
        Ok(())
    }

    fn drain(&mut self) -> Result<Vec<Frame>, TransportError> {
        let mut frames = Vec::new();
        loop {
            match self.inbox.try_recv() {
                Ok(frame) => frames.push(frame),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    if frames.is_empty() {
                        return Err(TransportError::Disconnected { peer: self.local });
                    }
                    return Ok(frames);
                }
            }
        }
        // Held frames are released behind whatever already arrived.
        let mut router = self.network.lock()?;
        if let Some(held) = router.held.remove(&self.local) {
            router.stats.delivered += held.len() as u64;
            frames.extend(held);
        }
        Ok(frames)
    }
}
