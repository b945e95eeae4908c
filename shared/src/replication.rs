//! Replicated ability state and write provenance
//!
//! The authority owns every replicated variable; observers are
//! read-only. Each replicated write carries the authoring peer so a
//! dual-role host can discard the echo of its own writes instead of
//! re-applying them: single application is a property of the data,
//! not of callback ordering.

use serde::{Deserialize, Serialize};

use crate::intent::MovementIntent;
use crate::math::{Vec2, Vec3};
use crate::LIVE_POS_EPSILON;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord, Default,
)]
pub struct PeerId(pub u32);

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "peer#{}", self.0)
    }
}

/// Compact phase encoding shared by every ability on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WirePhase {
    Idle,
    Phase1,
    Phase2,
    ImpactPause,
}

/// Should a peer apply a replicated write it just received?
///
/// The one rule of host-safe replication: never react to your own
/// writes coming back around.
pub fn should_apply(origin: PeerId, self_peer: PeerId) -> bool {
    origin != self_peer
}

/// The authority-owned mirror of one ability instance's broadcastable
/// state. Reset to neutral between activations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ReplicatedAbilityState {
    pub phase: WirePhase,
    pub direction: Vec2,
    pub origin_pos: Vec3,
    pub target_pos: Vec3,
    pub distance: f32,
    /// Cosmetic position stream; throttled, never gameplay input.
    pub live_position: Vec3,
}

impl Default for WirePhase {
    fn default() -> Self {
        WirePhase::Idle
    }
}

impl ReplicatedAbilityState {
    pub fn stamp_activation(&mut self, intent: &MovementIntent) {
        self.phase = WirePhase::Phase1;
        self.direction = intent.direction;
        self.origin_pos = intent.origin;
        self.target_pos = intent.target;
        self.distance = intent.distance;
        self.live_position = intent.origin;
    }

    pub fn reset_neutral(&mut self) {
        *self = Self::default();
    }

    /// Updates the live position if it moved past the send threshold.
    /// Returns whether a send is due.
    pub fn update_live_position(&mut self, position: Vec3) -> bool {
        if position.distance(&self.live_position) > LIVE_POS_EPSILON {
            self.live_position = position;
            true
        } else {
            false
        }
    }
}
