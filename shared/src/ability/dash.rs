//! Dash: a held, steerable burst of ground speed
//!
//! A single active phase that lasts at least the minimum duration,
//! extends while the trigger is held, and is capped at the maximum.
//! Mana drains continuously on the authority; the direction re-aims
//! toward the current movement target every tick. Ending (release,
//! cap, or mana dry) drops into a short braking tail, and the cooldown
//! opens at braking entry rather than at rest.

use crate::ability::{DashPhase, PhaseEvent};
use crate::actor::Actor;
use crate::curves;
use crate::intent::MovementIntent;
use crate::math::Vec3;
use crate::replication::WirePhase;

pub const DASH_SPEED: f32 = 14.0;
pub const DASH_MIN_DURATION: f64 = 0.25;
pub const DASH_MAX_DURATION: f64 = 2.0;
pub const DASH_BRAKE_TIME: f64 = 0.15;
pub const DASH_DRAIN_PER_SEC: f32 = 15.0;

#[derive(Debug, Clone)]
pub struct DashState {
    pub phase: DashPhase,
    pub phase_started: f64,
    pub intent: MovementIntent,
    /// Set by the early-termination message; honored once the minimum
    /// duration has elapsed.
    pub released: bool,
    /// Sim time the last dash finished braking; read by the leap
    /// synergy window.
    pub last_ended: Option<f64>,
}

impl DashState {
    pub fn new() -> Self {
        Self {
            phase: DashPhase::Idle,
            phase_started: 0.0,
            intent: MovementIntent::default(),
            released: false,
            last_ended: None,
        }
    }

    pub fn begin(&mut self, actor: &mut Actor, intent: MovementIntent, now: f64) -> Vec<PhaseEvent> {
        self.intent = intent;
        self.released = false;
        self.phase = DashPhase::Dashing;
        self.phase_started = now;
        actor.velocity = dash_velocity(&self.intent, 1.0);
        vec![PhaseEvent::Transition(WirePhase::Phase1)]
    }

    pub fn tick(&mut self, actor: &mut Actor, now: f64, dt: f32, held: bool) -> Vec<PhaseEvent> {
        let mut events = Vec::new();
        match self.phase {
            DashPhase::Idle => {}
            DashPhase::Dashing => {
                // Continuous steering toward the live movement target.
                if let Some(target) = actor.move_target {
                    self.intent.re_aim_toward(actor.position, target);
                }
                let step = self.intent.direction.scale(DASH_SPEED * dt);
                actor.position = actor.position.add(&Vec3::new(step.x, 0.0, step.z));
                actor.velocity = dash_velocity(&self.intent, 1.0);
                actor.facing = self.intent.direction;
                actor.clamp_to_arena();

                let elapsed = now - self.phase_started;
                let wants_out = self.released || !held;
                if elapsed >= DASH_MAX_DURATION || (wants_out && elapsed >= DASH_MIN_DURATION) {
                    events.extend(self.enter_brake(now));
                }
            }
            DashPhase::Braking => {
                let elapsed = now - self.phase_started;
                let p = (elapsed / DASH_BRAKE_TIME).min(1.0) as f32;
                let speed = DASH_SPEED * curves::brake_falloff(p);
                let step = self.intent.direction.scale(speed * dt);
                actor.position = actor.position.add(&Vec3::new(step.x, 0.0, step.z));
                actor.velocity = dash_velocity(&self.intent, curves::brake_falloff(p));
                actor.clamp_to_arena();

                if elapsed >= DASH_BRAKE_TIME {
                    self.finish(actor, now, &mut events);
                }
            }
        }
        events
    }

    /// Early-termination message. Takes effect immediately when past
    /// the minimum duration, otherwise at the minimum-duration tick.
    pub fn release(&mut self, _now: f64) {
        if self.phase == DashPhase::Dashing {
            self.released = true;
        }
    }

    /// Authority-side forced end when the mana pool runs dry.
    pub fn force_brake(&mut self, now: f64) -> Vec<PhaseEvent> {
        if self.phase == DashPhase::Dashing {
            self.enter_brake(now)
        } else {
            Vec::new()
        }
    }

    pub fn force_phase(&mut self, actor: &mut Actor, wire: WirePhase, now: f64) -> Vec<PhaseEvent> {
        let mut events = Vec::new();
        match wire {
            WirePhase::Phase1 | WirePhase::ImpactPause => {}
            WirePhase::Phase2 => {
                if self.phase == DashPhase::Dashing {
                    events.extend(self.enter_brake(now));
                }
            }
            WirePhase::Idle => {
                if self.phase != DashPhase::Idle {
                    self.finish(actor, now, &mut events);
                }
            }
        }
        events
    }

    pub fn cleanup(&mut self, actor: &mut Actor) {
        if self.phase != DashPhase::Idle {
            actor.velocity = Vec3::default();
            self.phase = DashPhase::Idle;
        }
    }

    pub fn wire_phase(&self) -> WirePhase {
        match self.phase {
            DashPhase::Idle => WirePhase::Idle,
            DashPhase::Dashing => WirePhase::Phase1,
            DashPhase::Braking => WirePhase::Phase2,
        }
    }

    fn enter_brake(&mut self, now: f64) -> Vec<PhaseEvent> {
        self.phase = DashPhase::Braking;
        self.phase_started = now;
        // Cooldown opens here so an early release shortens the lockout.
        vec![
            PhaseEvent::Transition(WirePhase::Phase2),
            PhaseEvent::CooldownStart,
        ]
    }

    fn finish(&mut self, actor: &mut Actor, now: f64, events: &mut Vec<PhaseEvent>) {
        self.phase = DashPhase::Idle;
        self.last_ended = Some(now);
        actor.velocity = Vec3::default();
        events.push(PhaseEvent::Transition(WirePhase::Idle));
    }
}

impl Default for DashState {
    fn default() -> Self {
        Self::new()
    }
}

fn dash_velocity(intent: &MovementIntent, fraction: f32) -> Vec3 {
    let v = intent.direction.scale(DASH_SPEED * fraction);
    Vec3::new(v.x, 0.0, v.z)
}
