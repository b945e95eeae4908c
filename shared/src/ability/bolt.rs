//! Arc bolt: a fired projectile
//!
//! The instance itself is stateless; activation surfaces a spawn event
//! and the authority simulates the projectile (flight, hit detection,
//! damage). Observers render from the broadcast only.

use crate::ability::PhaseEvent;
use crate::actor::Actor;
use crate::intent::MovementIntent;

pub const BOLT_SPEED: f32 = 18.0;
pub const BOLT_RANGE: f32 = 25.0;
pub const BOLT_DAMAGE: f32 = 22.0;
pub const BOLT_HIT_RADIUS: f32 = 0.6;

#[derive(Debug, Clone)]
pub struct BoltState;

impl BoltState {
    pub fn new() -> Self {
        Self
    }

    pub fn begin(&mut self, actor: &mut Actor, intent: MovementIntent) -> Vec<PhaseEvent> {
        vec![
            PhaseEvent::ProjectileSpawn {
                origin: actor.position,
                direction: intent.direction,
            },
            PhaseEvent::CooldownStart,
        ]
    }
}

impl Default for BoltState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorId;
    use crate::math::{Vec2, Vec3};

    #[test]
    fn test_begin_spawns_along_intent_direction() {
        let mut actor = Actor::new(ActorId(5), Vec3::new(1.0, 0.0, 1.0));
        let intent = MovementIntent::new(actor.position, Vec2::new(0.0, -1.0), 0.0);
        let events = BoltState::new().begin(&mut actor, intent);
        assert_eq!(events.len(), 2);
        match events[0] {
            PhaseEvent::ProjectileSpawn { origin, direction } => {
                assert_eq!(origin, actor.position);
                assert_eq!(direction, Vec2::new(0.0, -1.0));
            }
            _ => panic!("expected projectile spawn"),
        }
        assert_eq!(events[1], PhaseEvent::CooldownStart);
    }
}
