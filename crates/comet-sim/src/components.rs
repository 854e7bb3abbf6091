//! Gameplay components.

use bevy_ecs::prelude::*;
use glam::Vec2;

/// Player slot in the running session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PlayerRef(pub u8);

/// Marks an entity driven by the ship movement system.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Ship;

/// Associates an entity with the player whose input drives it.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerLink(pub PlayerRef);

/// Position and orientation in the 2D arena. `rotation` is in radians,
/// counter-clockwise, with zero facing +Y.
#[derive(Component, Clone, Copy, Debug, PartialEq, Default)]
pub struct Transform2D {
    pub position: Vec2,
    pub rotation: f32,
}

impl Transform2D {
    pub fn new(position: Vec2, rotation: f32) -> Self {
        Self { position, rotation }
    }

    /// Unit vector the entity is facing.
    pub fn up(&self) -> Vec2 {
        Vec2::from_angle(self.rotation).rotate(Vec2::Y)
    }
}

/// Rigid body state. Forces and torques accumulate until the next
/// integration step clears them.
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct PhysicsBody2D {
    pub velocity: Vec2,
    pub angular_velocity: f32,
    pub mass: f32,
    pub inertia: f32,
    pub force: Vec2,
    pub torque: f32,
}

impl PhysicsBody2D {
    pub fn new(mass: f32, inertia: f32) -> Self {
        Self {
            velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            mass,
            inertia,
            force: Vec2::ZERO,
            torque: 0.0,
        }
    }

    pub fn add_force(&mut self, force: Vec2) {
        self.force += force;
    }

    pub fn add_torque(&mut self, torque: f32) {
        self.torque += torque;
    }
}

impl Default for PhysicsBody2D {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_up_follows_rotation() {
        let facing_up = Transform2D::default();
        assert!((facing_up.up() - Vec2::Y).length() < 1e-6);

        // A quarter turn counter-clockwise faces -X.
        let turned = Transform2D::new(Vec2::ZERO, FRAC_PI_2);
        assert!((turned.up() - Vec2::NEG_X).length() < 1e-6);
    }

    #[test]
    fn test_forces_accumulate() {
        let mut body = PhysicsBody2D::default();
        body.add_force(Vec2::new(1.0, 0.0));
        body.add_force(Vec2::new(0.0, 2.0));
        body.add_torque(0.5);
        body.add_torque(-0.25);
        assert_eq!(body.force, Vec2::new(1.0, 2.0));
        assert_eq!(body.torque, 0.25);
    }
}
