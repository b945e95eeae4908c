//! Actor state: transform, resource pools, physics control flags

use serde::{Deserialize, Serialize};

use crate::math::{Vec2, Vec3};
use crate::{ARENA_HALF_EXTENT, BASE_MOVE_SPEED, CLICK_ARRIVE_EPSILON, GROUND_Y};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord, Default,
)]
pub struct ActorId(pub u32);

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

/// A scalar resource (mana, health).
///
/// Mutation is authority-only; clients receive the current value through
/// snapshots and never write it back.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ResourcePool {
    pub current: f32,
    pub max: f32,
    pub regen_per_sec: f32,
}

impl ResourcePool {
    pub fn new(max: f32, regen_per_sec: f32) -> Self {
        Self {
            current: max,
            max,
            regen_per_sec,
        }
    }

    pub fn can_afford(&self, cost: f32) -> bool {
        self.current >= cost
    }

    /// Deducts `cost` if affordable. Returns whether the spend happened.
    pub fn spend(&mut self, cost: f32) -> bool {
        if self.can_afford(cost) {
            self.current -= cost;
            true
        } else {
            false
        }
    }

    /// Drains up to `amount`, flooring at zero. Returns the amount left
    /// after the drain.
    pub fn drain(&mut self, amount: f32) -> f32 {
        self.current = (self.current - amount).max(0.0);
        self.current
    }

    pub fn restore(&mut self, amount: f32) {
        self.current = (self.current + amount).min(self.max);
    }

    pub fn regen(&mut self, dt: f32) {
        self.restore(self.regen_per_sec * dt);
    }

    pub fn is_empty(&self) -> bool {
        self.current <= 0.0
    }
}

/// Engine-facing physics toggles a movement ability suspends while it
/// owns the actor's transform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PhysicsControl {
    pub gravity: bool,
    pub kinematic: bool,
    pub controller: bool,
}

impl Default for PhysicsControl {
    fn default() -> Self {
        Self {
            gravity: true,
            kinematic: false,
            controller: true,
        }
    }
}

impl PhysicsControl {
    /// Hands the transform to a phase machine: gravity off, body
    /// kinematic, character controller disabled.
    pub fn suspend(&mut self) {
        self.gravity = false;
        self.kinematic = true;
        self.controller = false;
    }

    /// Restores normal locomotion control.
    pub fn restore(&mut self) {
        *self = Self::default();
    }

    pub fn is_suspended(&self) -> bool {
        !self.gravity && self.kinematic && !self.controller
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Unit horizontal facing, updated from actual displacement.
    pub facing: Vec2,
    /// Click-to-move destination; cleared on arrival.
    pub move_target: Option<Vec3>,
    pub mana: ResourcePool,
    pub health: ResourcePool,
    /// Incoming damage multiplier; the shield ability writes this.
    pub damage_taken_scale: f32,
    pub physics: PhysicsControl,
}

impl Actor {
    pub fn new(id: ActorId, position: Vec3) -> Self {
        Self {
            id,
            position,
            velocity: Vec3::default(),
            facing: Vec2::new(0.0, 1.0),
            move_target: None,
            mana: ResourcePool::new(crate::MANA_MAX, crate::MANA_REGEN_PER_SEC),
            health: ResourcePool::new(crate::HEALTH_MAX, 0.0),
            damage_taken_scale: 1.0,
            physics: PhysicsControl::default(),
        }
    }

    pub fn horizontal_speed(&self) -> f32 {
        self.velocity.horizontal().magnitude()
    }

    /// Click-to-move locomotion for one tick.
    ///
    /// Only valid while no movement ability owns the transform; the
    /// server suppresses the call for ability-controlled actors.
    pub fn step_locomotion(&mut self, dt: f32) {
        let Some(target) = self.move_target else {
            self.velocity = Vec3::default();
            return;
        };

        let to_target = target.with_y(self.position.y).sub(&self.position);
        let dist = to_target.magnitude();
        if dist <= CLICK_ARRIVE_EPSILON {
            self.position = target.with_y(self.position.y);
            self.move_target = None;
            self.velocity = Vec3::default();
            return;
        }

        let step = BASE_MOVE_SPEED * dt;
        let dir = to_target.scale(1.0 / dist);
        if step >= dist {
            self.position = target.with_y(self.position.y);
            self.move_target = None;
            self.velocity = Vec3::default();
        } else {
            self.position = self.position.add(&dir.scale(step));
            self.velocity = dir.scale(BASE_MOVE_SPEED);
        }

        let heading = dir.horizontal();
        if !heading.is_near_zero() {
            self.facing = heading.normalize();
        }

        self.clamp_to_arena();
    }

    pub fn clamp_to_arena(&mut self) {
        self.position.x = self.position.x.clamp(-ARENA_HALF_EXTENT, ARENA_HALF_EXTENT);
        self.position.z = self.position.z.clamp(-ARENA_HALF_EXTENT, ARENA_HALF_EXTENT);
        self.position.y = self.position.y.max(GROUND_Y);
    }

    /// Applies damage through the current damage-taken multiplier.
    /// Returns the amount actually dealt.
    pub fn apply_damage(&mut self, amount: f32) -> f32 {
        let dealt = amount * self.damage_taken_scale;
        self.health.current = (self.health.current - dealt).max(0.0);
        dealt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn actor_at(x: f32, z: f32) -> Actor {
        Actor::new(ActorId(1), Vec3::new(x, GROUND_Y, z))
    }

    #[test]
    fn test_pool_spend_requires_funds() {
        let mut pool = ResourcePool::new(100.0, 0.0);
        pool.current = 50.0;
        assert!(!pool.spend(70.0));
        assert_eq!(pool.current, 50.0);
        assert!(pool.spend(50.0));
        assert_eq!(pool.current, 0.0);
    }

    #[test]
    fn test_pool_spend_exact_boundary() {
        let mut pool = ResourcePool::new(100.0, 0.0);
        pool.current = 60.0;
        // >= comparison, no epsilon: exactly-affordable succeeds.
        assert!(pool.spend(60.0));
    }

    #[test]
    fn test_pool_regen_caps_at_max() {
        let mut pool = ResourcePool::new(100.0, 10.0);
        pool.current = 95.0;
        pool.regen(2.0);
        assert_eq!(pool.current, 100.0);
    }

    #[test]
    fn test_pool_drain_floors_at_zero() {
        let mut pool = ResourcePool::new(100.0, 0.0);
        pool.current = 3.0;
        let left = pool.drain(10.0);
        assert_eq!(left, 0.0);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_physics_suspend_restore() {
        let mut physics = PhysicsControl::default();
        assert!(!physics.is_suspended());
        physics.suspend();
        assert!(physics.is_suspended());
        assert!(!physics.gravity);
        assert!(physics.kinematic);
        physics.restore();
        assert!(!physics.is_suspended());
        assert!(physics.controller);
    }

    #[test]
    fn test_locomotion_moves_toward_target() {
        let mut actor = actor_at(0.0, 0.0);
        actor.move_target = Some(Vec3::new(10.0, GROUND_Y, 0.0));
        actor.step_locomotion(0.1);
        assert!(actor.position.x > 0.0);
        assert_approx_eq!(actor.position.x, BASE_MOVE_SPEED * 0.1, 1e-5);
        assert_approx_eq!(actor.facing.x, 1.0, 1e-5);
    }

    #[test]
    fn test_locomotion_arrives_and_clears_target() {
        let mut actor = actor_at(0.0, 0.0);
        actor.move_target = Some(Vec3::new(0.2, GROUND_Y, 0.0));
        for _ in 0..10 {
            actor.step_locomotion(0.1);
        }
        assert!(actor.move_target.is_none());
        assert_approx_eq!(actor.position.x, 0.2, 1e-5);
        assert_eq!(actor.velocity, Vec3::default());
    }

    #[test]
    fn test_locomotion_clamps_to_arena() {
        let mut actor = actor_at(ARENA_HALF_EXTENT - 0.1, 0.0);
        actor.move_target = Some(Vec3::new(ARENA_HALF_EXTENT + 50.0, GROUND_Y, 0.0));
        for _ in 0..100 {
            actor.step_locomotion(0.1);
        }
        assert!(actor.position.x <= ARENA_HALF_EXTENT);
    }

    #[test]
    fn test_damage_respects_shield_scale() {
        let mut actor = actor_at(0.0, 0.0);
        actor.damage_taken_scale = 0.5;
        let dealt = actor.apply_damage(40.0);
        assert_eq!(dealt, 20.0);
        assert_eq!(actor.health.current, crate::HEALTH_MAX - 20.0);
    }
}
