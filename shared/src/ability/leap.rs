//! Directional leap with earthquake impact
//!
//! Rise carries the actor along an eased horizontal lead-in under a
//! sine height arc; fall holds the apex footprint and drops on an
//! accelerating curve; landing applies area damage and pins the actor
//! for the impact pause.

use log::debug;

use crate::ability::{Phase, PhaseEvent, RejectReason};
use crate::actor::Actor;
use crate::curves;
use crate::intent::{aim_direction, MovementIntent};
use crate::math::Vec3;
use crate::replication::WirePhase;
use crate::{DASH_SYNERGY_BONUS, DASH_SYNERGY_WINDOW};

pub const LEAP_RISE_TIME: f64 = 0.8;
pub const LEAP_FALL_TIME: f64 = 0.4;
pub const LEAP_IMPACT_PAUSE: f64 = 0.5;
pub const LEAP_BASE_DISTANCE: f32 = 6.0;
pub const LEAP_APEX_HEIGHT: f32 = 3.5;
/// Minimum horizontal speed to launch at all.
pub const LEAP_MIN_SPEED: f32 = 0.5;
pub const LEAP_IMPACT_RADIUS: f32 = 4.0;
pub const LEAP_IMPACT_DAMAGE: f32 = 35.0;

#[derive(Debug, Clone)]
pub struct LeapState {
    pub phase: Phase,
    /// Sim time the current phase began; advanced by exact phase
    /// durations so chained transitions never accumulate tick slack.
    pub phase_started: f64,
    pub intent: MovementIntent,
    /// Highest point reached, recorded at the rise/fall boundary.
    pub apex: Option<Vec3>,
}

impl LeapState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            phase_started: 0.0,
            intent: MovementIntent::default(),
            apex: None,
        }
    }

    pub fn precondition(&self, actor: &Actor) -> Result<(), RejectReason> {
        if actor.horizontal_speed() < LEAP_MIN_SPEED {
            return Err(RejectReason::PreconditionNotMet);
        }
        Ok(())
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
                    let p = (elapsed / LEAP_RISE_TIME).min(1.0) as f32;
                    let lead = curves::ease_in_out(p);
                    actor.position = Vec3::new(
                        self.intent.origin.x + self.intent.direction.x * self.intent.distance * lead,
                        self.intent.origin.y + LEAP_APEX_HEIGHT * curves::arc_height(p),
                        self.intent.origin.z + self.intent.direction.z * self.intent.distance * lead,
                    );
                    if elapsed >= LEAP_RISE_TIME {
                        self.apex = Some(actor.position);
                        self.phase = Phase::Falling;
                        self.phase_started += LEAP_RISE_TIME;
                        events.push(PhaseEvent::Transition(WirePhase::Phase2));
                        continue;
                    }
                    break;
                }
                Phase::Falling => {
                    let apex = *self.apex.get_or_insert(actor.position);
                    let elapsed = now - self.phase_started;
                    let p = (elapsed / LEAP_FALL_TIME).min(1.0) as f32;
                    let y = apex.y + (self.intent.origin.y - apex.y) * curves::fall_drop(p);
                    actor.position = Vec3::new(apex.x, y, apex.z);
                    if elapsed >= LEAP_FALL_TIME {
                        self.phase = Phase::ImpactPause;
                        self.phase_started += LEAP_FALL_TIME;
                        actor.position = Vec3::new(apex.x, self.intent.origin.y, apex.z);
                        events.push(PhaseEvent::Transition(WirePhase::ImpactPause));
                        events.push(PhaseEvent::Impact {
                            center: actor.position,
                        });
                        continue;
                    }
                    break;
                }
                Phase::ImpactPause => {
                    // Immobilized; position pinned at the landing spot.
                    if now - self.phase_started >= LEAP_IMPACT_PAUSE {
                        self.finish(actor, &mut events);
                    }
                    break;
                }
            }
        }
        events
    }

    /// Authority phase flag applied on an observing peer.
    pub fn force_phase(&mut self, actor: &mut Actor, wire: WirePhase, now: f64) -> Vec<PhaseEvent> {
        let mut events = Vec::new();
        match wire {
            WirePhase::Phase1 => {
                // Activation arrives through the broadcast, not a flag.
                debug!("ignoring rise flag without activation broadcast");
            }
            WirePhase::Phase2 => {
                if self.phase == Phase::Rising {
                    // Apex missing means the boundary tick never ran
                    // locally; the current position stands in for it.
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
                    events.push(PhaseEvent::Impact {
                        center: actor.position,
                    });
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

impl Default for LeapState {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical leap parameters: aim from the click-target (or facing),
/// distance scaled by launch speed and the recent-dash window.
pub fn resolve_leap_intent(actor: &Actor, now: f64, last_dash_ended: Option<f64>) -> MovementIntent {
    let mut distance = LEAP_BASE_DISTANCE * curves::speed_multiplier(actor.horizontal_speed());
    if let Some(ended) = last_dash_ended {
        if now - ended <= DASH_SYNERGY_WINDOW {
            distance *= DASH_SYNERGY_BONUS;
        }
    }
    MovementIntent::resolve(actor.position, aim_direction(actor), actor.facing, distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorId;
    use crate::math::Vec2;
    use crate::BASE_MOVE_SPEED;
    use assert_approx_eq::assert_approx_eq;

    fn runner() -> Actor {
        let mut actor = Actor::new(ActorId(1), Vec3::new(0.0, 0.0, 0.0));
        actor.velocity = Vec3::new(0.0, 0.0, BASE_MOVE_SPEED);
        actor.facing = Vec2::new(0.0, 1.0);
        actor
    }

    fn run_until_idle(state: &mut LeapState, actor: &mut Actor, dt: f64) -> f64 {
        let mut now = 0.0;
        for _ in 0..1000 {
            now += dt;
            state.tick(actor, now);
            if state.phase == Phase::Idle {
                return now;
            }
        }
        panic!("leap never returned to idle");
    }

    #[test]
    fn test_phase_order_is_fixed() {
        let mut actor = runner();
        let mut state = LeapState::new();
        let intent = resolve_leap_intent(&actor, 0.0, None);
        state.begin(&mut actor, intent, 0.0);
        assert_eq!(state.phase, Phase::Rising);

        let mut seen = vec![Phase::Rising];
        let mut now = 0.0;
        while state.phase != Phase::Idle {
            now += 0.05;
            state.tick(&mut actor, now);
            if *seen.last().unwrap() != state.phase {
                seen.push(state.phase);
            }
        }
        assert_eq!(
            seen,
            vec![Phase::Rising, Phase::Falling, Phase::ImpactPause, Phase::Idle]
        );
    }

    #[test]
    fn test_total_active_duration() {
        let mut actor = runner();
        let mut state = LeapState::new();
        let intent = resolve_leap_intent(&actor, 0.0, None);
        state.begin(&mut actor, intent, 0.0);
        let finished_at = run_until_idle(&mut state, &mut actor, 0.05);
        let expected = LEAP_RISE_TIME + LEAP_FALL_TIME + LEAP_IMPACT_PAUSE;
        assert!(finished_at >= expected - 1e-9);
        assert!(finished_at <= expected + 0.05 + 1e-9);
    }

    #[test]
    fn test_lands_at_resolved_distance() {
        let mut actor = runner();
        let mut state = LeapState::new();
        let intent = MovementIntent::new(actor.position, Vec2::new(0.0, 1.0), 6.0);
        state.begin(&mut actor, intent, 0.0);
        run_until_idle(&mut state, &mut actor, 0.01);
        assert_approx_eq!(actor.position.z, 6.0, 1e-3);
        assert_approx_eq!(actor.position.x, 0.0, 1e-5);
        assert_approx_eq!(actor.position.y, 0.0, 1e-5);
    }

    #[test]
    fn test_fall_holds_apex_footprint() {
        let mut actor = runner();
        let mut state = LeapState::new();
        let intent = MovementIntent::new(actor.position, Vec2::new(1.0, 0.0), 8.0);
        state.begin(&mut actor, intent, 0.0);

        // Into the fall phase.
        state.tick(&mut actor, LEAP_RISE_TIME + 0.01);
        assert_eq!(state.phase, Phase::Falling);
        let apex = state.apex.unwrap();
        state.tick(&mut actor, LEAP_RISE_TIME + 0.2);
        assert_eq!(actor.position.x, apex.x);
        assert_eq!(actor.position.z, apex.z);
        assert!(actor.position.y < apex.y);
    }

    #[test]
    fn test_physics_suspended_until_pause_ends() {
        let mut actor = runner();
        let mut state = LeapState::new();
        let intent = resolve_leap_intent(&actor, 0.0, None);
        state.begin(&mut actor, intent, 0.0);
        assert!(actor.physics.is_suspended());

        state.tick(&mut actor, LEAP_RISE_TIME + LEAP_FALL_TIME + 0.01);
        assert_eq!(state.phase, Phase::ImpactPause);
        assert!(actor.physics.is_suspended());

        state.tick(&mut actor, LEAP_RISE_TIME + LEAP_FALL_TIME + LEAP_IMPACT_PAUSE + 0.01);
        assert_eq!(state.phase, Phase::Idle);
        assert!(!actor.physics.is_suspended());
    }

    #[test]
    fn test_impact_event_fires_once_at_landing() {
        let mut actor = runner();
        let mut state = LeapState::new();
        let intent = resolve_leap_intent(&actor, 0.0, None);
        state.begin(&mut actor, intent, 0.0);

        let mut impacts = 0;
        let mut now = 0.0;
        while state.phase != Phase::Idle {
            now += 0.05;
            for event in state.tick(&mut actor, now) {
                if matches!(event, PhaseEvent::Impact { .. }) {
                    impacts += 1;
                }
            }
        }
        assert_eq!(impacts, 1);
    }

    #[test]
    fn test_precondition_requires_motion() {
        let mut actor = runner();
        actor.velocity = Vec3::default();
        let state = LeapState::new();
        assert_eq!(
            state.precondition(&actor),
            Err(RejectReason::PreconditionNotMet)
        );
    }

    #[test]
    fn test_speed_scales_distance() {
        let slow = runner();
        let mut fast = runner();
        fast.velocity = Vec3::new(0.0, 0.0, BASE_MOVE_SPEED * 2.0);
        let near = resolve_leap_intent(&slow, 0.0, None);
        let far = resolve_leap_intent(&fast, 0.0, None);
        assert!(far.distance > near.distance * 2.0);
    }

    #[test]
    fn test_recent_dash_synergy_window() {
        let actor = runner();
        let plain = resolve_leap_intent(&actor, 10.0, None);
        let inside = resolve_leap_intent(&actor, 10.0, Some(10.0 - DASH_SYNERGY_WINDOW + 0.1));
        let outside = resolve_leap_intent(&actor, 10.0, Some(10.0 - DASH_SYNERGY_WINDOW - 0.1));
        assert_approx_eq!(inside.distance, plain.distance * DASH_SYNERGY_BONUS, 1e-4);
        assert_approx_eq!(outside.distance, plain.distance, 1e-6);
    }

    #[test]
    fn test_forced_fall_snapshots_missing_apex() {
        let mut actor = runner();
        let mut state = LeapState::new();
        let intent = resolve_leap_intent(&actor, 0.0, None);
        state.begin(&mut actor, intent, 0.0);

        // Out-of-order flag: fall ordered before the local rise finished.
        state.tick(&mut actor, 0.3);
        let mid_rise = actor.position;
        state.force_phase(&mut actor, WirePhase::Phase2, 0.3);
        assert_eq!(state.phase, Phase::Falling);
        assert_eq!(state.apex, Some(mid_rise));
    }

    #[test]
    fn test_force_phase_is_idempotent() {
        let mut actor = runner();
        let mut state = LeapState::new();
        let intent = resolve_leap_intent(&actor, 0.0, None);
        state.begin(&mut actor, intent, 0.0);
        state.force_phase(&mut actor, WirePhase::Phase2, 0.4);
        let again = state.force_phase(&mut actor, WirePhase::Phase2, 0.4);
        assert!(again.is_empty());
        assert_eq!(state.phase, Phase::Falling);
    }
}
