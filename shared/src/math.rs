//! Minimal vector math shared by server and client simulation

use serde::{Deserialize, Serialize};

/// A vector on the horizontal (ground) plane.
///
/// Directions of travel, facing vectors and broadcast aim directions all
/// live on this plane; the vertical axis is handled separately by the
/// phase machines.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub z: f32,
}

impl Vec2 {
    pub fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.z * self.z).sqrt()
    }

    /// Returns the normalized vector, or zero if the input is zero.
    pub fn normalize(&self) -> Vec2 {
        let mag = self.magnitude();
        if mag == 0.0 {
            Vec2 { x: 0.0, z: 0.0 }
        } else {
            Vec2 {
                x: self.x / mag,
                z: self.z / mag,
            }
        }
    }

    pub fn scale(&self, scalar: f32) -> Vec2 {
        Vec2 {
            x: self.x * scalar,
            z: self.z * scalar,
        }
    }

    pub fn add(&self, other: &Vec2) -> Vec2 {
        Vec2 {
            x: self.x + other.x,
            z: self.z + other.z,
        }
    }

    pub fn sub(&self, other: &Vec2) -> Vec2 {
        Vec2 {
            x: self.x - other.x,
            z: self.z - other.z,
        }
    }

    pub fn dot(&self, other: &Vec2) -> f32 {
        self.x * other.x + self.z * other.z
    }

    /// True when the vector is too short to define a direction.
    pub fn is_near_zero(&self) -> bool {
        self.magnitude() < 1e-4
    }
}

/// A full world-space position or displacement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn scale(&self, scalar: f32) -> Vec3 {
        Vec3 {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }

    pub fn add(&self, other: &Vec3) -> Vec3 {
        Vec3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }

    pub fn sub(&self, other: &Vec3) -> Vec3 {
        Vec3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }

    pub fn distance(&self, other: &Vec3) -> f32 {
        self.sub(other).magnitude()
    }

    pub fn lerp(&self, other: &Vec3, alpha: f32) -> Vec3 {
        Vec3 {
            x: self.x + (other.x - self.x) * alpha,
            y: self.y + (other.y - self.y) * alpha,
            z: self.z + (other.z - self.z) * alpha,
        }
    }

    /// Projects onto the ground plane.
    pub fn horizontal(&self) -> Vec2 {
        Vec2 {
            x: self.x,
            z: self.z,
        }
    }

    /// Horizontal distance, ignoring the vertical axis.
    pub fn horizontal_distance(&self, other: &Vec3) -> f32 {
        self.horizontal().sub(&other.horizontal()).magnitude()
    }

    pub fn with_y(&self, y: f32) -> Vec3 {
        Vec3 {
            x: self.x,
            y,
            z: self.z,
        }
    }
}
