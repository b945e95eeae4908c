//! Ability definitions, instances and the per-kind phase machines
//!
//! The ability set is a closed enum; behavior is dispatched over the
//! variant tag rather than trait objects, and the kind-to-definition
//! table is resolved at compile time.

pub mod bolt;
pub mod dash;
pub mod jump;
pub mod leap;
pub mod shield;

use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::intent::{aim_direction, MovementIntent};
use crate::math::{Vec2, Vec3};
use crate::replication::WirePhase;

/// Input trigger bound to an ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivationKey {
    Space,
    LeftShift,
    Q,
    E,
    R,
}

/// Handle into the icon atlas; consumed by the HUD collaborator only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconId(pub u16);

/// Static configuration of one ability kind.
///
/// Instances own a mutable copy so heroes and power-ups can override
/// individual fields without touching the kind table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbilityDef {
    pub name: &'static str,
    pub trigger: ActivationKey,
    pub mana_cost: f32,
    /// Seconds from cooldown start until the ability is ready again.
    pub cooldown: f64,
    pub icon: IconId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbilityKind {
    Dash,
    Leap,
    StrongJump,
    Shield,
    Bolt,
}

impl AbilityKind {
    pub const ALL: [AbilityKind; 5] = [
        AbilityKind::Dash,
        AbilityKind::Leap,
        AbilityKind::StrongJump,
        AbilityKind::Shield,
        AbilityKind::Bolt,
    ];

    /// Kind-to-definition table.
    pub fn definition(self) -> AbilityDef {
        match self {
            AbilityKind::Dash => AbilityDef {
                name: "Dash",
                trigger: ActivationKey::LeftShift,
                mana_cost: 10.0,
                cooldown: 4.0,
                icon: IconId(1),
            },
            AbilityKind::Leap => AbilityDef {
                name: "Seismic Leap",
                trigger: ActivationKey::Q,
                mana_cost: 40.0,
                cooldown: 8.0,
                icon: IconId(2),
            },
            AbilityKind::StrongJump => AbilityDef {
                name: "Strong Jump",
                trigger: ActivationKey::Space,
                mana_cost: 25.0,
                cooldown: 5.0,
                icon: IconId(3),
            },
            AbilityKind::Shield => AbilityDef {
                name: "Barrier",
                trigger: ActivationKey::E,
                mana_cost: 30.0,
                cooldown: 10.0,
                icon: IconId(4),
            },
            AbilityKind::Bolt => AbilityDef {
                name: "Arc Bolt",
                trigger: ActivationKey::R,
                mana_cost: 20.0,
                cooldown: 1.5,
                icon: IconId(5),
            },
        }
    }
}

impl std::fmt::Display for AbilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.definition().name)
    }
}

/// Why an activation attempt was refused. Reported to the requesting
/// peer only; carries no side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    InsufficientMana,
    OnCooldown,
    PreconditionNotMet,
}

/// The single outcome of one activation attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActivationOutcome {
    Activated,
    Rejected(RejectReason),
}

/// Phase of the two arc abilities (leap, strong jump).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Rising,
    Falling,
    ImpactPause,
}

/// Phase of the dash, which has no fall or pause stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashPhase {
    Idle,
    Dashing,
    Braking,
}

/// Side effects a phase machine surfaces to its driver.
///
/// The authority turns these into broadcasts and world mutations;
/// observing peers feed them to the effects boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhaseEvent {
    Transition(WirePhase),
    /// The instance's cooldown window opened.
    CooldownStart,
    /// Earthquake landing; the authority applies area damage here.
    Impact { center: Vec3 },
    ProjectileSpawn { origin: Vec3, direction: Vec2 },
    ShieldRaised,
    ShieldDropped,
}

/// Per-kind runtime state.
#[derive(Debug, Clone)]
pub enum AbilityState {
    Dash(dash::DashState),
    Leap(leap::LeapState),
    StrongJump(jump::JumpState),
    Shield(shield::ShieldState),
    Bolt(bolt::BoltState),
}

/// One granted ability on one actor.
#[derive(Debug, Clone)]
pub struct AbilityInstance {
    /// Owned, overridable copy of the kind definition.
    pub def: AbilityDef,
    /// HUD slot assignment, if the UI layer registered one.
    pub slot: Option<u8>,
    /// Mirrors `now >= cooldown_until`; refreshed every tick.
    pub ready: bool,
    pub cooldown_until: f64,
    pub state: AbilityState,
}

impl AbilityInstance {
    pub fn new(kind: AbilityKind) -> Self {
        let state = match kind {
            AbilityKind::Dash => AbilityState::Dash(dash::DashState::new()),
            AbilityKind::Leap => AbilityState::Leap(leap::LeapState::new()),
            AbilityKind::StrongJump => AbilityState::StrongJump(jump::JumpState::new()),
            AbilityKind::Shield => AbilityState::Shield(shield::ShieldState::new()),
            AbilityKind::Bolt => AbilityState::Bolt(bolt::BoltState::new()),
        };
        Self {
            def: kind.definition(),
            slot: None,
            ready: true,
            cooldown_until: 0.0,
            state,
        }
    }

    pub fn kind(&self) -> AbilityKind {
        match self.state {
            AbilityState::Dash(_) => AbilityKind::Dash,
            AbilityState::Leap(_) => AbilityKind::Leap,
            AbilityState::StrongJump(_) => AbilityKind::StrongJump,
            AbilityState::Shield(_) => AbilityKind::Shield,
            AbilityState::Bolt(_) => AbilityKind::Bolt,
        }
    }

    /// Seconds of cooldown left; never negative.
    pub fn remaining_cooldown(&self, now: f64) -> f64 {
        (self.cooldown_until - now).max(0.0)
    }

    /// Re-establishes the readiness invariant for the current time.
    pub fn refresh(&mut self, now: f64) {
        self.ready = now >= self.cooldown_until;
    }

    pub fn start_cooldown(&mut self, now: f64) {
        self.cooldown_until = now + self.def.cooldown;
        self.ready = false;
    }

    /// Gate check: one reason at most, no side effects.
    pub fn can_activate(&self, actor: &Actor, now: f64) -> Result<(), RejectReason> {
        if now < self.cooldown_until {
            return Err(RejectReason::OnCooldown);
        }
        if !actor.mana.can_afford(self.def.mana_cost) {
            return Err(RejectReason::InsufficientMana);
        }
        if self.wire_phase() != WirePhase::Idle {
            return Err(RejectReason::PreconditionNotMet);
        }
        match &self.state {
            AbilityState::Leap(s) => s.precondition(actor),
            _ => Ok(()),
        }
    }

    /// Starts the machine from canonical parameters. The caller has
    /// already passed the gate and deducted the resource cost.
    pub fn activate(
        &mut self,
        actor: &mut Actor,
        intent: MovementIntent,
        now: f64,
    ) -> Vec<PhaseEvent> {
        let events = match &mut self.state {
            AbilityState::Dash(s) => s.begin(actor, intent, now),
            AbilityState::Leap(s) => s.begin(actor, intent, now),
            AbilityState::StrongJump(s) => s.begin(actor, intent, now),
            AbilityState::Shield(s) => s.begin(actor, now),
            AbilityState::Bolt(s) => s.begin(actor, intent),
        };
        self.absorb(&events, now);
        events
    }

    /// Advances the machine one tick. `dash_held` carries the
    /// activator's current trigger state; other kinds ignore it.
    pub fn tick(
        &mut self,
        actor: &mut Actor,
        now: f64,
        dt: f32,
        dash_held: bool,
    ) -> Vec<PhaseEvent> {
        let events = match &mut self.state {
            AbilityState::Dash(s) => s.tick(actor, now, dt, dash_held),
            AbilityState::Leap(s) => s.tick(actor, now),
            AbilityState::StrongJump(s) => s.tick(actor, now),
            AbilityState::Shield(s) => s.tick(actor, now),
            AbilityState::Bolt(_) => Vec::new(),
        };
        self.absorb(&events, now);
        self.refresh(now);
        events
    }

    /// Releases any standing effect before the instance is dropped.
    pub fn cleanup(&mut self, actor: &mut Actor) {
        match &mut self.state {
            AbilityState::Shield(s) => s.cleanup(actor),
            AbilityState::Dash(s) => s.cleanup(actor),
            AbilityState::Leap(s) => s.cleanup(actor),
            AbilityState::StrongJump(s) => s.cleanup(actor),
            AbilityState::Bolt(_) => {}
        }
    }

    /// Observer-side adoption of an activation broadcast.
    pub fn adopt_broadcast(
        &mut self,
        actor: &mut Actor,
        intent: MovementIntent,
        now: f64,
    ) -> Vec<PhaseEvent> {
        // Same machine entry as the authority; the gate ran there.
        self.activate(actor, intent, now)
    }

    /// Observer-side application of an authority phase flag. Re-applying
    /// the phase the machine is already in is a no-op.
    pub fn apply_wire_phase(
        &mut self,
        actor: &mut Actor,
        phase: WirePhase,
        now: f64,
    ) -> Vec<PhaseEvent> {
        if phase == self.wire_phase() {
            return Vec::new();
        }
        let events = match &mut self.state {
            AbilityState::Dash(s) => s.force_phase(actor, phase, now),
            AbilityState::Leap(s) => s.force_phase(actor, phase, now),
            AbilityState::StrongJump(s) => s.force_phase(actor, phase, now),
            AbilityState::Shield(s) => s.force_phase(actor, phase, now),
            AbilityState::Bolt(_) => Vec::new(),
        };
        self.absorb(&events, now);
        events
    }

    /// Early-termination request (dash trigger released).
    pub fn release(&mut self, now: f64) {
        if let AbilityState::Dash(s) = &mut self.state {
            s.release(now);
        }
    }

    /// Authority-side forced dash end (mana ran dry).
    pub fn force_dash_brake(&mut self, now: f64) -> Vec<PhaseEvent> {
        if let AbilityState::Dash(s) = &mut self.state {
            let events = s.force_brake(now);
            self.absorb(&events, now);
            events
        } else {
            Vec::new()
        }
    }

    /// When the dash last finished, for the leap synergy window.
    pub fn dash_last_ended(&self) -> Option<f64> {
        match &self.state {
            AbilityState::Dash(s) => s.last_ended,
            _ => None,
        }
    }

    pub fn wire_phase(&self) -> WirePhase {
        match &self.state {
            AbilityState::Dash(s) => s.wire_phase(),
            AbilityState::Leap(s) => s.wire_phase(),
            AbilityState::StrongJump(s) => s.wire_phase(),
            AbilityState::Shield(s) => s.wire_phase(),
            AbilityState::Bolt(_) => WirePhase::Idle,
        }
    }

    /// True while this ability owns the actor's transform.
    pub fn is_movement_active(&self) -> bool {
        match &self.state {
            AbilityState::Dash(s) => s.phase != DashPhase::Idle,
            AbilityState::Leap(s) => s.phase != Phase::Idle,
            AbilityState::StrongJump(s) => s.phase != Phase::Idle,
            AbilityState::Shield(_) | AbilityState::Bolt(_) => false,
        }
    }

    fn absorb(&mut self, events: &[PhaseEvent], now: f64) {
        for event in events {
            if matches!(event, PhaseEvent::CooldownStart) {
                self.start_cooldown(now);
            }
        }
    }
}

/// Computes the canonical activation parameters for `kind` on the
/// authority. Observers never call this; they adopt the broadcast.
pub fn resolve_intent(
    kind: AbilityKind,
    actor: &Actor,
    now: f64,
    last_dash_ended: Option<f64>,
) -> MovementIntent {
    match kind {
        AbilityKind::Leap => leap::resolve_leap_intent(actor, now, last_dash_ended),
        AbilityKind::StrongJump => {
            MovementIntent::new(actor.position, actor.facing, jump::JUMP_FORWARD_CARRY)
        }
        AbilityKind::Dash | AbilityKind::Bolt => {
            MovementIntent::resolve(actor.position, aim_direction(actor), actor.facing, 0.0)
        }
        AbilityKind::Shield => MovementIntent::new(actor.position, actor.facing, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorId;

    fn actor() -> Actor {
        Actor::new(ActorId(7), Vec3::new(0.0, 0.0, 0.0))
    }

    #[test]
    fn test_instance_starts_ready() {
        let instance = AbilityInstance::new(AbilityKind::Bolt);
        assert!(instance.ready);
        assert_eq!(instance.remaining_cooldown(0.0), 0.0);
        assert_eq!(instance.wire_phase(), WirePhase::Idle);
    }

    #[test]
    fn test_remaining_cooldown_never_negative() {
        let mut instance = AbilityInstance::new(AbilityKind::Bolt);
        instance.start_cooldown(10.0);
        assert!(instance.remaining_cooldown(100.0) >= 0.0);
        assert_eq!(instance.remaining_cooldown(100.0), 0.0);
    }

    #[test]
    fn test_ready_iff_deadline_passed() {
        let mut instance = AbilityInstance::new(AbilityKind::Shield);
        instance.start_cooldown(0.0);
        instance.refresh(5.0);
        assert!(!instance.ready);
        assert_eq!(instance.remaining_cooldown(5.0), 5.0);
        instance.refresh(10.0);
        assert!(instance.ready);
        assert_eq!(instance.remaining_cooldown(10.0), 0.0);
    }

    #[test]
    fn test_gate_rejects_on_cooldown_first() {
        let mut actor = actor();
        actor.mana.current = 0.0;
        let mut instance = AbilityInstance::new(AbilityKind::Bolt);
        instance.start_cooldown(0.0);
        // Both cooldown and mana would fail; exactly one reason comes back.
        assert_eq!(
            instance.can_activate(&actor, 0.5),
            Err(RejectReason::OnCooldown)
        );
    }

    #[test]
    fn test_gate_rejects_insufficient_mana() {
        let mut actor = actor();
        actor.mana.current = 5.0;
        let instance = AbilityInstance::new(AbilityKind::Bolt);
        assert_eq!(
            instance.can_activate(&actor, 0.0),
            Err(RejectReason::InsufficientMana)
        );
    }

    #[test]
    fn test_gate_rejects_mid_phase_reactivation() {
        let mut actor = actor();
        actor.velocity = Vec3::new(crate::BASE_MOVE_SPEED, 0.0, 0.0);
        let mut instance = AbilityInstance::new(AbilityKind::Leap);
        let intent = resolve_intent(AbilityKind::Leap, &actor, 0.0, None);
        instance.activate(&mut actor, intent, 0.0);
        assert_eq!(
            instance.can_activate(&actor, 0.1),
            Err(RejectReason::PreconditionNotMet)
        );
    }

    #[test]
    fn test_definition_table_covers_all_kinds() {
        for kind in AbilityKind::ALL {
            let def = kind.definition();
            assert!(!def.name.is_empty());
            assert!(def.cooldown > 0.0);
            assert!(def.mana_cost >= 0.0);
        }
    }

    #[test]
    fn test_def_override_survives_on_instance() {
        let mut instance = AbilityInstance::new(AbilityKind::Leap);
        instance.def.mana_cost = 60.0;
        instance.def.cooldown = 10.0;
        // The kind table itself is untouched.
        assert_eq!(AbilityKind::Leap.definition().mana_cost, 40.0);
        assert_eq!(instance.def.mana_cost, 60.0);
    }
}
