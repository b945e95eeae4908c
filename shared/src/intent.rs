//! Canonical movement parameters for one ability activation

use log::warn;
use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::math::{Vec2, Vec3};

/// The once-computed, authority-stamped parameters of a movement ability
/// activation.
///
/// Every peer that simulates the activation does so from the same intent,
/// so trajectories agree without further coordination. Only dash mutates
/// its direction mid-flight (continuous re-aim); everything else is fixed
/// until the machine returns to idle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct MovementIntent {
    /// Actor position at activation.
    pub origin: Vec3,
    /// Unit horizontal travel direction.
    pub direction: Vec2,
    /// Resolved horizontal travel distance.
    pub distance: f32,
    /// `origin + direction * distance`, at origin height.
    pub target: Vec3,
}

impl MovementIntent {
    pub fn new(origin: Vec3, direction: Vec2, distance: f32) -> Self {
        let dir = direction.normalize();
        let target = Vec3::new(
            origin.x + dir.x * distance,
            origin.y,
            origin.z + dir.z * distance,
        );
        Self {
            origin,
            direction: dir,
            distance,
            target,
        }
    }

    /// Builds an intent from a raw aim vector, falling back to the
    /// actor's facing when the aim is degenerate.
    pub fn resolve(origin: Vec3, aim: Vec2, facing: Vec2, distance: f32) -> Self {
        let direction = if aim.is_near_zero() {
            warn!("degenerate aim direction, falling back to facing");
            facing.normalize()
        } else {
            aim.normalize()
        };
        Self::new(origin, direction, distance)
    }

    /// Observer-side adoption of broadcast parameters. The broadcast
    /// direction is trusted but still guarded against a zero vector from
    /// a stale or reordered packet.
    pub fn from_broadcast(origin: Vec3, direction: Vec2, distance: f32, facing: Vec2) -> Self {
        Self::resolve(origin, direction, facing, distance)
    }

    /// Re-aims the intent toward a new destination, keeping the origin
    /// and distance. Used by dash steering only.
    pub fn re_aim_toward(&mut self, current: Vec3, destination: Vec3) {
        let aim = destination.sub(&current).horizontal();
        if !aim.is_near_zero() {
            self.direction = aim.normalize();
        }
    }
}

/// The aim vector for an activation: toward the click-target if one is
/// set, otherwise the actor's facing. A missing click-target is the
/// degraded-collaborator path, not an error.
pub fn aim_direction(actor: &Actor) -> Vec2 {
    match actor.move_target {
        Some(target) => {
            let aim = target.sub(&actor.position).horizontal();
            if aim.is_near_zero() {
                actor.facing
            } else {
                aim.normalize()
            }
        }
        None => {
            warn!("{}: no movement target, aiming along facing", actor.id);
            actor.facing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorId;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_intent_target_is_origin_plus_direction_times_distance() {
        let intent = MovementIntent::new(Vec3::new(1.0, 0.5, 2.0), Vec2::new(0.0, 1.0), 6.0);
        assert_approx_eq!(intent.target.x, 1.0, 1e-6);
        assert_approx_eq!(intent.target.y, 0.5, 1e-6);
        assert_approx_eq!(intent.target.z, 8.0, 1e-6);
    }

    #[test]
    fn test_intent_normalizes_direction() {
        let intent = MovementIntent::new(Vec3::default(), Vec2::new(3.0, 4.0), 10.0);
        assert_approx_eq!(intent.direction.magnitude(), 1.0, 1e-6);
        assert_approx_eq!(intent.target.x, 6.0, 1e-5);
        assert_approx_eq!(intent.target.z, 8.0, 1e-5);
    }

    #[test]
    fn test_resolve_falls_back_to_facing_on_zero_aim() {
        let facing = Vec2::new(-1.0, 0.0);
        let intent = MovementIntent::resolve(Vec3::default(), Vec2::default(), facing, 5.0);
        assert_approx_eq!(intent.direction.x, -1.0, 1e-6);
        assert_approx_eq!(intent.target.x, -5.0, 1e-5);
    }

    #[test]
    fn test_aim_direction_prefers_move_target() {
        let mut actor = Actor::new(ActorId(1), Vec3::new(0.0, 0.0, 0.0));
        actor.facing = Vec2::new(0.0, 1.0);
        actor.move_target = Some(Vec3::new(5.0, 0.0, 0.0));
        let aim = aim_direction(&actor);
        assert_approx_eq!(aim.x, 1.0, 1e-6);
        assert_approx_eq!(aim.z, 0.0, 1e-6);
    }

    #[test]
    fn test_aim_direction_facing_fallback_without_target() {
        let mut actor = Actor::new(ActorId(1), Vec3::default());
        actor.facing = Vec2::new(0.0, -1.0);
        let aim = aim_direction(&actor);
        assert_eq!(aim, actor.facing);
    }

    #[test]
    fn test_re_aim_ignores_degenerate_destination() {
        let mut intent = MovementIntent::new(Vec3::default(), Vec2::new(1.0, 0.0), 4.0);
        let current = Vec3::new(2.0, 0.0, 0.0);
        intent.re_aim_toward(current, current);
        assert_approx_eq!(intent.direction.x, 1.0, 1e-6);
    }
}
