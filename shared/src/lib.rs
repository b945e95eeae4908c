//! # Shared Simulation Core
//!
//! Everything both peers must agree on lives here: the vector math,
//! the ability definitions and phase machines, the canonical movement
//! intent, the replication primitives and the wire protocol. The
//! server and every client compile the identical simulation from this
//! crate, which is what lets an observer reproduce the authority's
//! trajectory from nothing but the broadcast activation parameters.
//!
//! ## Determinism Contract
//!
//! Phase machines are pure functions of (canonical intent, elapsed
//! phase time). They read and write the actor transform but never
//! consult wall-clock time, randomness, or peer-local state, so the
//! same broadcast applied on any peer produces the same trajectory at
//! the same simulation timestamps.
//!
//! ## Authority Model
//!
//! All gameplay-relevant mutation (resource pools, phase transitions,
//! replicated variables) happens on the authority. Observers simulate
//! for smoothness and react to replicated transitions; they never
//! write back. Every replicated write carries the authoring peer so a
//! host acting as both authority and activator discards echoes of its
//! own writes.

pub mod ability;
pub mod actor;
pub mod curves;
pub mod intent;
pub mod math;
pub mod packet;
pub mod registry;
pub mod replication;
pub mod scheduler;

pub use ability::{
    AbilityDef, AbilityInstance, AbilityKind, ActivationKey, ActivationOutcome, IconId, Phase,
    PhaseEvent, RejectReason,
};
pub use actor::{Actor, ActorId, PhysicsControl, ResourcePool};
pub use intent::MovementIntent;
pub use math::{Vec2, Vec3};
pub use packet::{ActorSnapshot, CooldownEntry, InputState, Packet};
pub use registry::{AbilityRegistry, SlotEntry};
pub use replication::{PeerId, ReplicatedAbilityState, WirePhase};
pub use scheduler::EventQueue;

/// Base click-to-move run speed, units per second.
pub const BASE_MOVE_SPEED: f32 = 6.0;
/// Square arena half-width on the ground plane.
pub const ARENA_HALF_EXTENT: f32 = 40.0;
pub const GROUND_Y: f32 = 0.0;
/// Distance at which a click-to-move order counts as arrived.
pub const CLICK_ARRIVE_EPSILON: f32 = 0.05;

pub const MANA_MAX: f32 = 100.0;
pub const MANA_REGEN_PER_SEC: f32 = 4.0;
pub const HEALTH_MAX: f32 = 200.0;

/// Speed-scaling of directional ability distance: speed ratio clamp
/// and super-linear exponent.
pub const SPEED_SCALE_CAP: f32 = 2.0;
pub const SPEED_SCALE_EXPONENT: f32 = 1.6;
/// Leap distance bonus when a dash ended within the window.
pub const DASH_SYNERGY_WINDOW: f64 = 1.5;
pub const DASH_SYNERGY_BONUS: f32 = 1.5;

/// Authority-to-observer drift beyond which a forced snap is issued.
pub const DESYNC_SNAP_DISTANCE: f32 = 2.0;
/// Minimum movement before another live-position update is sent.
pub const LIVE_POS_EPSILON: f32 = 0.05;
