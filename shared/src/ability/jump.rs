//! Strong jump: a tall arc in place with a small forward carry

use crate::ability::{Phase, PhaseEvent};
use crate::actor::Actor;
use crate::curves;
use crate::intent::MovementIntent;
use crate::math::Vec3;
use crate::replication::WirePhase;

pub const JUMP_RISE_TIME: f64 = 0.6;
pub const JUMP_FALL_TIME: f64 = 0.45;
pub const JUMP_IMPACT_PAUSE: f64 = 0.3;
pub const JUMP_APEX_HEIGHT: f32 = 4.0;
pub const JUMP_FORWARD_CARRY: f32 = 1.5;

#[derive(Debug, Clone)]
pub struct JumpState {
    pub phase: Phase,
    pub phase_started: f64,
    pub intent: MovementIntent,
    pub apex: Option<Vec3>,
}

impl JumpState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            phase_started: 0.0,
            intent: MovementIntent::default(),
            apex: None,
        }
    }

    pub fn begin(&mut self, actor: &mut Actor, intent: MovementIntent, now: f64) -> Vec<PhaseEvent> {
        self.intent = intent;
        self.apex = None;
        self.phase = Phase::Rising;
        self.phase_started = now;
        actor.physics.suspend();
        actor.move_target = None;
        actor.velocity = Vec3::default();
        vec![PhaseEvent::Transition(WirePhase::Phase1)]
    }

    pub fn tick(&mut self, actor: &mut Actor, now: f64) -> Vec<PhaseEvent> {
        let mut events = Vec::new();
        loop {
            match self.phase {
                Phase::Idle => break,
                Phase::Rising => {
                    let elapsed = now - self.phase_started;
                    let p = (elapsed / JUMP_RISE_TIME).min(1.0) as f32;
                    let lead = curves::ease_in_out(p);
                    actor.position = Vec3::new(
                        self.intent.origin.x + self.intent.direction.x * self.intent.distance * lead,
                        self.intent.origin.y + JUMP_APEX_HEIGHT * curves::arc_height(p),
                        self.intent.origin.z + self.intent.direction.z * self.intent.distance * lead,
                    );
                    if elapsed >= JUMP_RISE_TIME {
                        self.apex = Some(actor.position);
                        self.phase = Phase::Falling;
                        self.phase_started += JUMP_RISE_TIME;
                        events.push(PhaseEvent::Transition(WirePhase::Phase2));
                        continue;
                    }
                    break;
                }
                Phase::Falling => {
                    let apex = *self.apex.get_or_insert(actor.position);
                    let elapsed = now - self.phase_started;
                    let p = (elapsed / JUMP_FALL_TIME).min(1.0) as f32;
                    let y = apex.y + (self.intent.origin.y - apex.y) * curves::fall_drop(p);
                    actor.position = Vec3::new(apex.x, y, apex.z);
                    if elapsed >= JUMP_FALL_TIME {
                        self.phase = Phase::ImpactPause;
                        self.phase_started += JUMP_FALL_TIME;
                        actor.position = Vec3::new(apex.x, self.intent.origin.y, apex.z);
                        events.push(PhaseEvent::Transition(WirePhase::ImpactPause));
                        continue;
                    }
                    break;
                }
                Phase::ImpactPause => {
                    if now - self.phase_started >= JUMP_IMPACT_PAUSE {
                        self.finish(actor, &mut events);
                    }
                    break;
                }
            }
        }
        events
    }

    pub fn force_phase(&mut self, actor: &mut Actor, wire: WirePhase, now: f64) -> Vec<PhaseEvent> {
        let mut events = Vec::new();
        match wire {
            WirePhase::Phase1 => {}
            WirePhase::Phase2 => {
                if self.phase == Phase::Rising {
                    self.apex = Some(actor.position);
                    self.phase = Phase::Falling;
                    self.phase_started = now;
                    events.push(PhaseEvent::Transition(WirePhase::Phase2));
                }
            }
            WirePhase::ImpactPause => {
                if self.phase == Phase::Rising || self.phase == Phase::Falling {
                    let apex = *self.apex.get_or_insert(actor.position);
                    actor.position = Vec3::new(apex.x, self.intent.origin.y, apex.z);
                    self.phase = Phase::ImpactPause;
                    self.phase_started = now;
                    events.push(PhaseEvent::Transition(WirePhase::ImpactPause));
                }
            }
            WirePhase::Idle => {
                if self.phase != Phase::Idle {
                    self.finish(actor, &mut events);
                }
            }
        }
        events
    }

    pub fn cleanup(&mut self, actor: &mut Actor) {
        if self.phase != Phase::Idle {
            actor.physics.restore();
            self.phase = Phase::Idle;
        }
    }

    pub fn wire_phase(&self) -> WirePhase {
        match self.phase {
            Phase::Idle => WirePhase::Idle,
            Phase::Rising => WirePhase::Phase1,
            Phase::Falling => WirePhase::Phase2,
            Phase::ImpactPause => WirePhase::ImpactPause,
        }
    }

    fn finish(&mut self, actor: &mut Actor, events: &mut Vec<PhaseEvent>) {
        self.phase = Phase::Idle;
        self.apex = None;
        actor.physics.restore();
        events.push(PhaseEvent::Transition(WirePhase::Idle));
        events.push(PhaseEvent::CooldownStart);
    }
}

impl Default for JumpState {
    fn default() -> Self {
        Self::new()
    }
}
