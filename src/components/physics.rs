use glam::Vec2;
use hecs::Entity;

use super::surface::SurfaceMaterial;

/// Screen-space up. +y points down, so gravity is positive y.
pub const UP: Vec2 = Vec2::new(0.0, -1.0);

/// Tagged entity kind. Drives collision classification and response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BodyKind {
    Player,
    Enemy,
    /// Static level geometry.
    Platform,
    /// Loose dynamic object.
    Prop,
    /// Overlap-only trigger volume.
    Sensor,
}

impl BodyKind {
    pub fn is_static(self) -> bool {
        matches!(self, Self::Platform | Self::Sensor)
    }
}

/// Axis-aligned box collider, centred on the body position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Collider {
    pub half_extents: Vec2,
}

/// Surface material of static geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Surface(pub SurfaceMaterial);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec2 {
        (self.max - self.min) * 0.5
    }

}

/// Stable identifier for the contact between one body and one partner.
///
/// Holds both full handles, generation included, so a recycled slot never
/// continues a contact that belonged to a despawned body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollisionId(pub Entity, pub Entity);

impl CollisionId {
    pub fn between(entity: Entity, other: Entity) -> Self {
        Self(entity, other)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CollisionType {
    Ground,
    Wall,
    Ceiling,
    Enemy,
    Solid,
    Sensor,
}

impl CollisionType {
    /// Contacts of these types push bodies apart.
    pub fn is_blocking(self) -> bool {
        !matches!(self, Self::Enemy | Self::Sensor)
    }
}

/// One live contact, seen from the body that owns it.
///
/// Created when contact starts, refreshed every frame it persists, dropped when
/// it ends.
#[derive(Clone, Debug, PartialEq)]
pub struct CollisionInfo {
    pub collision_id: CollisionId,
    pub other: Entity,
    pub collision_type: CollisionType,
    pub contact_point: Vec2,
    /// Points away from the partner, toward this body.
    pub contact_normal: Vec2,
    /// This body's velocity at the moment of contact, before resolution.
    pub impact_velocity: Vec2,
    pub surface: SurfaceMaterial,
    /// Friction of the partner body.
    pub friction: f32,
}

/// Per-frame verdict about ground contact.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundInfo {
    pub is_grounded: bool,
    pub ground_normal: Vec2,
    pub ground_surface: SurfaceMaterial,
    /// Survives airborne frames; drives coyote time.
    pub last_grounded_time: Option<f64>,
}

impl GroundInfo {
    pub fn airborne() -> Self {
        Self {
            is_grounded: false,
            ground_normal: UP,
            ground_surface: SurfaceMaterial::None,
            last_grounded_time: None,
        }
    }

    pub fn grounded(normal: Vec2, surface: SurfaceMaterial) -> Self {
        Self {
            is_grounded: true,
            ground_normal: normal,
            ground_surface: surface,
            last_grounded_time: None,
        }
    }
}

impl Default for GroundInfo {
    fn default() -> Self {
        Self::airborne()
    }
}

/// Kinematic truth for one entity.
///
/// The coordinator holds the only mutable copy; everything handed out is a clone.
#[derive(Clone, Debug, PartialEq)]
pub struct PhysicsState {
    pub entity_id: Entity,
    pub position: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    pub is_grounded: bool,
    pub was_grounded: bool,
    pub mass: f32,
    pub gravity_scale: f32,
    pub friction: f32,
    pub restitution: f32,
    pub is_static: bool,
    pub affected_by_gravity: bool,
    pub active_collisions: Vec<CollisionInfo>,
    /// Forces applied since the last integration. Cleared every step.
    pub accumulated_forces: Vec2,
    pub contact_point_count: usize,
    pub update_count: u64,
    pub last_update_time: f64,
}

impl PhysicsState {
    pub fn new(entity_id: Entity, position: Vec2) -> Self {
        Self {
            entity_id,
            position,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            is_grounded: false,
            was_grounded: false,
            mass: 1.0,
            gravity_scale: 1.0,
            friction: 1.0,
            restitution: 0.0,
            is_static: false,
            affected_by_gravity: true,
            active_collisions: Vec::new(),
            accumulated_forces: Vec2::ZERO,
            contact_point_count: 0,
            update_count: 0,
            last_update_time: 0.0,
        }
    }

    /// Back to rest: kinematics, ground flags and contacts. Position, body
    /// parameters and bookkeeping counters are kept.
    pub fn reset_dynamics(&mut self) {
        self.velocity = Vec2::ZERO;
        self.acceleration = Vec2::ZERO;
        self.accumulated_forces = Vec2::ZERO;
        self.is_grounded = false;
        self.was_grounded = false;
        self.active_collisions.clear();
        self.contact_point_count = 0;
    }

    pub fn collisions_of(&self, collision_type: CollisionType) -> impl Iterator<Item = &CollisionInfo> {
        self.active_collisions
            .iter()
            .filter(move |c| c.collision_type == collision_type)
    }

    pub fn touching_wall(&self) -> bool {
        self.collisions_of(CollisionType::Wall).next().is_some()
    }
}

/// Anything the coordinator can advance by one tick of semi-implicit Euler.
pub trait PhysicsIntegratable {
    fn integrate(&mut self, gravity: f32, max_velocity: Vec2, dt: f32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collision_id_is_directional() {
        let mut world = hecs::World::new();
        let a = world.spawn(());
        let b = world.spawn(());
        assert_ne!(CollisionId::between(a, b), CollisionId::between(b, a));
        assert_eq!(CollisionId::between(a, b), CollisionId::between(a, b));
    }

    #[test]
    fn collision_id_tells_recycled_slots_apart() {
        let mut world = hecs::World::new();
        let a = world.spawn(());
        let old = world.spawn(());
        world.despawn(old).unwrap();
        let recycled = world.spawn(());
        assert_eq!(old.id(), recycled.id());
        assert_ne!(CollisionId::between(a, old), CollisionId::between(a, recycled));
    }
}
