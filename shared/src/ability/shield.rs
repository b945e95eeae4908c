//! Barrier: a timed damage-reduction effect
//!
//! Not a movement ability: it never owns the transform and has no
//! impact pause. The standing modifier must be dropped on expiry and
//! on removal, whichever comes first.

use crate::ability::PhaseEvent;
use crate::actor::Actor;
use crate::replication::WirePhase;

pub const SHIELD_DURATION: f64 = 4.0;
/// Incoming damage multiplier while the barrier is up.
pub const SHIELD_DAMAGE_SCALE: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct ShieldState {
    pub active: bool,
    pub raised_at: f64,
}

impl ShieldState {
    pub fn new() -> Self {
        Self {
            active: false,
            raised_at: 0.0,
        }
    }

    pub fn begin(&mut self, actor: &mut Actor, now: f64) -> Vec<PhaseEvent> {
        self.active = true;
        self.raised_at = now;
        actor.damage_taken_scale = SHIELD_DAMAGE_SCALE;
        vec![
            PhaseEvent::Transition(WirePhase::Phase1),
            PhaseEvent::ShieldRaised,
        ]
    }

    pub fn tick(&mut self, actor: &mut Actor, now: f64) -> Vec<PhaseEvent> {
        if self.active && now - self.raised_at >= SHIELD_DURATION {
            return self.drop(actor);
        }
        Vec::new()
    }

    pub fn force_phase(&mut self, actor: &mut Actor, wire: WirePhase, _now: f64) -> Vec<PhaseEvent> {
        if wire == WirePhase::Idle && self.active {
            return self.drop(actor);
        }
        Vec::new()
    }

    pub fn cleanup(&mut self, actor: &mut Actor) {
        if self.active {
            actor.damage_taken_scale = 1.0;
            self.active = false;
        }
    }

    pub fn wire_phase(&self) -> WirePhase {
        if self.active {
            WirePhase::Phase1
        } else {
            WirePhase::Idle
        }
    }

    fn drop(&mut self, actor: &mut Actor) -> Vec<PhaseEvent> {
        self.active = false;
        actor.damage_taken_scale = 1.0;
        vec![
            PhaseEvent::ShieldDropped,
            PhaseEvent::Transition(WirePhase::Idle),
            PhaseEvent::CooldownStart,
        ]
    }
}

impl Default for ShieldState {
    fn default() -> Self {
        Self::new()
    }
}
