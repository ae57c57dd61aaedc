mod character;
mod physics;
mod surface;

pub use character::{
    Ability, AbilityTable, MovementCapabilities, MovementIntent, MovementRequest,
    MovementRequestType,
};
pub use physics::{
    Aabb, BodyKind, Collider, CollisionId, CollisionInfo, CollisionType, GroundInfo,
    PhysicsIntegratable, PhysicsState, Surface, UP,
};
pub use surface::{SoundClass, SurfaceCatalog, SurfaceMaterial, SurfaceProperties};

use glam::Vec2;
use hecs::Entity;

/// Handle for every body owned by the coordinator.
pub type EntityId = Entity;

/// Spatial transform with position, rotation, and scale.
///
/// Only the transform authority stores these; everyone else receives copies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform2D {
    pub position: Vec2,
    /// Radians. Bodies never rotate under physics; this is presentation state.
    pub rotation: f32,
    pub scale: Vec2,
}

impl Transform2D {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            rotation: 0.0,
            scale: Vec2::ONE,
        }
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::new(Vec2::ZERO)
    }
}

/// Read-only position lookup shared by everything that can answer "where is it".
pub trait PositionProvider {
    fn position_of(&self, entity: EntityId) -> Option<Vec2>;
}

/// Everything needed to mount a body into the coordinator.
#[derive(Clone, Debug)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub position: Vec2,
    pub half_extents: Vec2,
    pub mass: f32,
    pub gravity_scale: f32,
    pub friction: f32,
    pub restitution: f32,
    pub surface: SurfaceMaterial,
    pub capabilities: Option<MovementCapabilities>,
}

impl BodyDesc {
    fn base(kind: BodyKind, position: Vec2, half_extents: Vec2) -> Self {
        Self {
            kind,
            position,
            half_extents,
            mass: 1.0,
            gravity_scale: 1.0,
            friction: 1.0,
            restitution: 0.0,
            surface: SurfaceMaterial::None,
            capabilities: None,
        }
    }

    /// A controllable character; capabilities are filled from config on spawn.
    pub fn player(position: Vec2, half_extents: Vec2) -> Self {
        Self::base(BodyKind::Player, position, half_extents)
    }

    pub fn enemy(position: Vec2, half_extents: Vec2) -> Self {
        Self::base(BodyKind::Enemy, position, half_extents)
    }

    /// Immovable level geometry carrying a surface material.
    pub fn platform(position: Vec2, half_extents: Vec2, surface: SurfaceMaterial) -> Self {
        Self {
            surface,
            gravity_scale: 0.0,
            ..Self::base(BodyKind::Platform, position, half_extents)
        }
    }

    pub fn prop(position: Vec2, half_extents: Vec2) -> Self {
        Self {
            restitution: 0.3,
            ..Self::base(BodyKind::Prop, position, half_extents)
        }
    }

    /// Trigger volume: reports contacts but is never pushed and never pushes.
    pub fn sensor(position: Vec2, half_extents: Vec2) -> Self {
        Self {
            gravity_scale: 0.0,
            ..Self::base(BodyKind::Sensor, position, half_extents)
        }
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn with_gravity_scale(mut self, gravity_scale: f32) -> Self {
        self.gravity_scale = gravity_scale;
        self
    }

    pub fn with_capabilities(mut self, capabilities: MovementCapabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }
}
