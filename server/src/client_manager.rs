//! Peer connection management and input queuing for the authority
//!
//! This module handles the server-side roster of connected peers:
//! - Connection lifecycle (connect, disconnect, timeout)
//! - Peer-to-actor binding for the arena simulation
//! - Input buffering and chronological ordering for deterministic
//!   processing across peers
//!
//! The manager decides who participates; what their actors do is the
//! game state's business.

use log::info;
use shared::actor::ActorId;
use shared::packet::InputState;
use shared::replication::PeerId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// A connected peer and their buffered input.
#[derive(Debug)]
pub struct Peer {
    pub id: PeerId,
    /// Network address for sending responses.
    pub addr: SocketAddr,
    /// The arena actor this peer owns.
    pub actor: Option<ActorId>,
    /// Last time we received any packet from this peer.
    pub last_seen: Instant,
    /// Highest input sequence number we've processed.
    pub last_processed_input: u32,
    /// Buffered inputs waiting to be processed, sorted by sequence.
    pub pending_inputs: Vec<InputState>,
}

impl Peer {
    pub fn new(id: PeerId, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            actor: None,
            last_seen: Instant::now(),
            last_processed_input: 0,
            pending_inputs: Vec::new(),
        }
    }

    /// Buffers an input in sequence order so out-of-order packet
    /// delivery cannot reorder the simulation.
    pub fn add_input(&mut self, input: InputState) {
        self.last_seen = Instant::now();
        self.pending_inputs.push(input);
        self.pending_inputs.sort_by_key(|i| i.sequence);
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Roster of connected peers with capacity enforcement and
/// deterministic cross-peer input ordering.
pub struct ClientManager {
    peers: HashMap<PeerId, Peer>,
    /// Peer ids start at 1; the authority itself is peer 0.
    next_peer_id: u32,
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            peers: HashMap::new(),
            next_peer_id: 1,
            max_clients,
        }
    }

    /// Admits a new peer, or None at capacity.
    pub fn add_client(&mut self, addr: SocketAddr) -> Option<PeerId> {
        if self.peers.len() >= self.max_clients {
            return None;
        }

        let id = PeerId(self.next_peer_id);
        self.next_peer_id += 1;

        info!("{} connected from {}", id, addr);
        self.peers.insert(id, Peer::new(id, addr));
        Some(id)
    }

    /// Binds the actor the game spawned for this peer.
    pub fn assign_actor(&mut self, peer: PeerId, actor: ActorId) {
        if let Some(entry) = self.peers.get_mut(&peer) {
            entry.actor = Some(actor);
        }
    }

    pub fn actor_of(&self, peer: PeerId) -> Option<ActorId> {
        self.peers.get(&peer).and_then(|p| p.actor)
    }

    pub fn addr_of(&self, peer: PeerId) -> Option<SocketAddr> {
        self.peers.get(&peer).map(|p| p.addr)
    }

    pub fn remove_client(&mut self, peer: &PeerId) -> Option<ActorId> {
        if let Some(entry) = self.peers.remove(peer) {
            info!("{} disconnected", entry.id);
            entry.actor
        } else {
            None
        }
    }

    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<PeerId> {
        self.peers
            .iter()
            .find(|(_, peer)| peer.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn add_input(&mut self, peer: PeerId, input: InputState) -> bool {
        if let Some(entry) = self.peers.get_mut(&peer) {
            entry.add_input(input);
            true
        } else {
            false
        }
    }

    pub fn touch(&mut self, peer: PeerId) {
        if let Some(entry) = self.peers.get_mut(&peer) {
            entry.touch();
        }
    }

    /// All unprocessed inputs across peers, sorted by client timestamp.
    ///
    /// Processing in one global chronological order keeps the
    /// authoritative simulation fair and repeatable regardless of
    /// which socket read happened first.
    pub fn get_chronological_inputs(&self) -> Vec<(PeerId, InputState)> {
        let mut all_inputs: Vec<(PeerId, InputState)> = Vec::new();

        for (peer_id, peer) in &self.peers {
            for input in &peer.pending_inputs {
                if input.sequence > peer.last_processed_input {
                    all_inputs.push((*peer_id, input.clone()));
                }
            }
        }

        all_inputs.sort_by_key(|(peer, input)| (input.timestamp, peer.0, input.sequence));
        all_inputs
    }

    /// Records the acknowledgment cursor used for reconciliation.
    pub fn mark_input_processed(&mut self, peer: PeerId, sequence: u32) {
        if let Some(entry) = self.peers.get_mut(&peer) {
            entry.last_processed_input = entry.last_processed_input.max(sequence);
        }
    }

    pub fn cleanup_processed_inputs(&mut self) {
        for peer in self.peers.values_mut() {
            let cursor = peer.last_processed_input;
            peer.pending_inputs.retain(|i| i.sequence > cursor);
        }
    }

    pub fn get_last_processed_inputs(&self) -> HashMap<PeerId, u32> {
        self.peers
            .iter()
            .map(|(id, peer)| (*id, peer.last_processed_input))
            .collect()
    }

    pub fn get_client_addrs(&self) -> Vec<(PeerId, SocketAddr)> {
        self.peers.iter().map(|(id, p)| (*id, p.addr)).collect()
    }

    /// Sweeps for timed-out peers and removes them. Returns the
    /// affected peer/actor pairs so the game can despawn.
    pub fn check_timeouts(&mut self) -> Vec<(PeerId, Option<ActorId>)> {
        let timeout = Duration::from_secs(5);
        let timed_out: Vec<PeerId> = self
            .peers
            .values()
            .filter(|p| p.is_timed_out(timeout))
            .map(|p| p.id)
            .collect();

        timed_out
            .into_iter()
            .map(|id| {
                let actor = self.remove_client(&id);
                (id, actor)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::math::Vec3;
    use std::net::{IpAddr, Ipv4Addr};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port)
    }

    fn input(sequence: u32, timestamp: u64) -> InputState {
        InputState {
            sequence,
            timestamp,
            move_target: None,
            dash_held: false,
            reported_position: Vec3::default(),
        }
    }

    #[test]
    fn test_peer_ids_start_after_authority() {
        let mut manager = ClientManager::new(4);
        let first = manager.add_client(addr(1000)).unwrap();
        assert_eq!(first, PeerId(1));
    }

    #[test]
    fn test_capacity_enforced() {
        let mut manager = ClientManager::new(2);
        assert!(manager.add_client(addr(1)).is_some());
        assert!(manager.add_client(addr(2)).is_some());
        assert!(manager.add_client(addr(3)).is_none());
    }

    #[test]
    fn test_actor_binding_roundtrip() {
        let mut manager = ClientManager::new(4);
        let peer = manager.add_client(addr(1)).unwrap();
        manager.assign_actor(peer, ActorId(42));
        assert_eq!(manager.actor_of(peer), Some(ActorId(42)));
        assert_eq!(manager.remove_client(&peer), Some(ActorId(42)));
        assert_eq!(manager.actor_of(peer), None);
    }

    #[test]
    fn test_inputs_sorted_by_sequence_within_peer() {
        let mut manager = ClientManager::new(4);
        let peer = manager.add_client(addr(1)).unwrap();
        manager.add_input(peer, input(3, 30));
        manager.add_input(peer, input(1, 10));
        manager.add_input(peer, input(2, 20));

        let merged = manager.get_chronological_inputs();
        let sequences: Vec<u32> = merged.iter().map(|(_, i)| i.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
    }

    #[test]
    fn test_chronological_merge_across_peers() {
        let mut manager = ClientManager::new(4);
        let a = manager.add_client(addr(1)).unwrap();
        let b = manager.add_client(addr(2)).unwrap();
        manager.add_input(a, input(1, 100));
        manager.add_input(b, input(1, 50));
        manager.add_input(a, input(2, 150));
        manager.add_input(b, input(2, 120));

        let merged = manager.get_chronological_inputs();
        let timestamps: Vec<u64> = merged.iter().map(|(_, i)| i.timestamp).collect();
        assert_eq!(timestamps, vec![50, 100, 120, 150]);
    }

    #[test]
    fn test_processed_inputs_are_skipped_and_cleaned() {
        let mut manager = ClientManager::new(4);
        let peer = manager.add_client(addr(1)).unwrap();
        manager.add_input(peer, input(1, 10));
        manager.add_input(peer, input(2, 20));

        manager.mark_input_processed(peer, 1);
        let merged = manager.get_chronological_inputs();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].1.sequence, 2);

        manager.cleanup_processed_inputs();
        manager.mark_input_processed(peer, 2);
        manager.cleanup_processed_inputs();
        assert!(manager.get_chronological_inputs().is_empty());
    }

    #[test]
    fn test_ack_cursor_is_monotonic() {
        let mut manager = ClientManager::new(4);
        let peer = manager.add_client(addr(1)).unwrap();
        manager.mark_input_processed(peer, 5);
        manager.mark_input_processed(peer, 3);
        assert_eq!(manager.get_last_processed_inputs()[&peer], 5);
    }
}
