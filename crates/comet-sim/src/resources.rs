//! Simulation-wide resources.

use std::collections::HashMap;

use bevy_ecs::prelude::*;
use comet_config::ShipSettings;
use glam::Vec2;

use crate::components::{PhysicsBody2D, PlayerLink, PlayerRef, Ship, Transform2D};

/// Frame counter and fixed step length.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct SimClock {
    /// Frame being simulated.
    pub frame: u64,
    /// Seconds per frame.
    pub dt: f32,
}

impl SimClock {
    /// Clock ticking `tick_rate` times per second. A zero rate is treated as 1 Hz.
    pub fn new(tick_rate: u32) -> Self {
        Self {
            frame: 0,
            dt: 1.0 / tick_rate.max(1) as f32,
        }
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(60)
    }
}

/// Ship handling constants.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct ShipSpec {
    pub acceleration: f32,
    pub turn_torque: f32,
    pub max_angular_speed: f32,
}

impl From<&ShipSettings> for ShipSpec {
    fn from(settings: &ShipSettings) -> Self {
        Self {
            acceleration: settings.acceleration,
            turn_torque: settings.turn_torque,
            max_angular_speed: settings.max_angular_speed.abs(),
        }
    }
}

impl Default for ShipSpec {
    fn default() -> Self {
        Self::from(&ShipSettings::default())
    }
}

/// Entity template instantiated when a player joins.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarTemplate {
    pub spawn: Vec2,
    pub rotation: f32,
    pub mass: f32,
    pub inertia: f32,
}

impl AvatarTemplate {
    /// Component bundle for `player`'s avatar.
    pub fn instantiate(
        &self,
        player: PlayerRef,
    ) -> (Ship, Transform2D, PhysicsBody2D, PlayerLink) {
        (
            Ship,
            Transform2D::new(self.spawn, self.rotation),
            PhysicsBody2D::new(self.mass, self.inertia),
            PlayerLink(player),
        )
    }
}

/// Avatar templates by name.
#[derive(Resource, Debug, Clone, Default)]
pub struct AvatarRegistry {
    templates: HashMap<String, AvatarTemplate>,
}

impl AvatarRegistry {
    /// Registry holding the stock `ship` and `interceptor` templates.
    pub fn with_defaults(ship: &ShipSettings) -> Self {
        let mut registry = Self::default();
        registry.register(
            "ship",
            AvatarTemplate {
                spawn: Vec2::ZERO,
                rotation: 0.0,
                mass: ship.mass,
                inertia: ship.inertia,
            },
        );
        registry.register(
            "interceptor",
            AvatarTemplate {
                spawn: Vec2::ZERO,
                rotation: 0.0,
                mass: ship.mass * 0.5,
                inertia: ship.inertia * 0.5,
            },
        );
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, template: AvatarTemplate) {
        self.templates.insert(name.into(), template);
    }

    pub fn get(&self, name: &str) -> Option<&AvatarTemplate> {
        self.templates.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }
}

/// Player-join notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerJoined {
    pub player: PlayerRef,
    /// Avatar template name.
    pub avatar: String,
}

/// Join notifications waiting for the next tick.
#[derive(Resource, Debug, Default)]
pub struct JoinQueue {
    pending: Vec<PlayerJoined>,
}

impl JoinQueue {
    pub fn push(&mut self, joined: PlayerJoined) {
        self.pending.push(joined);
    }

    /// Take every pending notification in arrival order.
    pub fn drain(&mut self) -> std::vec::Drain<'_, PlayerJoined> {
        self.pending.drain(..)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_step_length() {
        assert!((SimClock::new(60).dt - 1.0 / 60.0).abs() < 1e-9);
        assert_eq!(SimClock::new(0).dt, 1.0);
    }

    #[test]
    fn test_default_registry_templates() {
        let registry = AvatarRegistry::with_defaults(&ShipSettings::default());
        assert!(registry.contains("ship"));
        assert!(registry.contains("interceptor"));
        assert!(registry.get("freighter").is_none());
    }

    #[test]
    fn test_instantiate_links_player() {
        let registry = AvatarRegistry::with_defaults(&ShipSettings::default());
        let (_, transform, body, link) = registry.get("ship").unwrap().instantiate(PlayerRef(3));
        assert_eq!(link, PlayerLink(PlayerRef(3)));
        assert_eq!(transform.position, Vec2::ZERO);
        assert_eq!(body.velocity, Vec2::ZERO);
    }
}
