//! Wire protocol between peers
//!
//! Everything on the wire is one `Packet` enum over bincode. Ability
//! activation is request/validate/broadcast: the request names only the
//! ability index, and the authority recomputes direction and distance
//! server-side, so a modified client cannot forge movement parameters.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ability::{AbilityKind, RejectReason};
use crate::actor::ActorId;
use crate::math::{Vec2, Vec3};
use crate::replication::{PeerId, WirePhase};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    // Connection management
    Connect {
        client_version: u32,
    },
    Connected {
        client_id: PeerId,
        actor_id: ActorId,
    },
    Disconnect,
    Disconnected {
        reason: String,
    },

    /// Click-to-move steering and the dash hold state, sequenced for
    /// prediction and reconciliation. `reported_position` is the
    /// sender's predicted position, used for drift detection only.
    Input {
        sequence: u32,
        timestamp: u64,
        move_target: Option<Vec3>,
        dash_held: bool,
        reported_position: Vec3,
    },

    /// "I want to activate ability N", with no other payload.
    AbilityRequest {
        ability: u8,
    },
    /// Canonical activation parameters, authority to all peers.
    AbilityBroadcast {
        origin: PeerId,
        activator: PeerId,
        actor: ActorId,
        ability: u8,
        direction: Vec2,
        distance: f32,
        target: Vec3,
    },
    /// Authority-decided phase transition.
    PhaseUpdate {
        origin: PeerId,
        actor: ActorId,
        ability: u8,
        phase: WirePhase,
    },
    /// Throttled cosmetic position stream for mid-phase actors.
    LivePosition {
        actor: ActorId,
        position: Vec3,
    },
    /// Sent to the requesting peer only; never broadcast.
    AbilityRejected {
        ability: u8,
        reason: RejectReason,
    },

    CooldownSyncRequest,
    CooldownSync {
        entries: Vec<CooldownEntry>,
    },

    /// Authoritative world state for reconciliation.
    StateSnapshot {
        tick: u32,
        timestamp: u64,
        last_processed_input: HashMap<PeerId, u32>,
        actors: Vec<ActorSnapshot>,
    },
    /// Forced correction after drift beyond the desync threshold.
    ForceSnap {
        actor: ActorId,
        position: Vec3,
        facing: Vec2,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct CooldownEntry {
    pub ability: u8,
    pub ready: bool,
    pub remaining: f32,
}

/// Per-actor slice of a state snapshot.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ActorSnapshot {
    pub id: ActorId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub facing: Vec2,
    pub move_target: Option<Vec3>,
    pub mana: f32,
    pub health: f32,
    pub loadout: Vec<AbilityKind>,
    /// True while a movement ability owns this actor's transform.
    pub movement_locked: bool,
}

/// A decoded, buffered `Packet::Input`.
#[derive(Debug, Clone)]
pub struct InputState {
    pub sequence: u32,
    pub timestamp: u64,
    pub move_target: Option<Vec3>,
    pub dash_held: bool,
    pub reported_position: Vec3,
}
