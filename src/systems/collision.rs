use glam::Vec2;
use hecs::{Entity, World};

use crate::components::{
    Aabb, BodyKind, Collider, CollisionType, PhysicsState, Surface, SurfaceMaterial, UP,
};

use super::physics::PreviousPosition;

/// Below this closing speed a contact is treated as resting (no bounce).
const REST_VELOCITY_THRESHOLD: f32 = 60.0;

/// One side of a detected contact, from the point of view of `entity`.
#[derive(Clone, Debug, PartialEq)]
pub struct Contact {
    pub entity: Entity,
    pub other: Entity,
    pub collision_type: CollisionType,
    /// Points away from `other`, toward `entity`.
    pub normal: Vec2,
    pub penetration: f32,
    pub point: Vec2,
    pub impact_velocity: Vec2,
    pub surface: SurfaceMaterial,
    pub friction: f32,
}

#[derive(Clone, Copy)]
struct ColliderEntry {
    entity: Entity,
    kind: BodyKind,
    position: Vec2,
    previous: Vec2,
    half_extents: Vec2,
    velocity: Vec2,
    is_static: bool,
    restitution: f32,
    friction: f32,
    surface: SurfaceMaterial,
}

impl ColliderEntry {
    fn aabb(&self) -> Aabb {
        Aabb::from_center(self.position, self.half_extents)
    }

    fn previous_aabb(&self) -> Aabb {
        Aabb::from_center(self.previous, self.half_extents)
    }
}

/// Overlap of two boxes along each axis; positive on both axes means penetration.
fn overlap(a: &Aabb, b: &Aabb) -> Vec2 {
    Vec2::new(
        a.max.x.min(b.max.x) - a.min.x.max(b.min.x),
        a.max.y.min(b.max.y) - a.min.y.max(b.min.y),
    )
}

/// Normal pointing from `b` toward `a` along the separating axis, plus depth.
///
/// The axis is the one that was still separated before this step, so a body
/// sliding across the seam between two floor tiles resolves vertically
/// instead of catching on the tile edge. Falls back to least penetration.
fn separating_axis(a: &ColliderEntry, b: &ColliderEntry) -> Option<(Vec2, f32)> {
    let now = overlap(&a.aabb(), &b.aabb());
    if now.x <= 0.0 || now.y <= 0.0 {
        return None;
    }
    let before = overlap(&a.previous_aabb(), &b.previous_aabb());
    let resolve_y = if before.y <= 0.0 && before.x > 0.0 {
        true
    } else if before.x <= 0.0 && before.y > 0.0 {
        false
    } else {
        now.y <= now.x
    };

    let delta = a.position - b.position;
    if resolve_y {
        let sign = if delta.y < 0.0 { -1.0 } else { 1.0 };
        Some((Vec2::new(0.0, sign), now.y))
    } else {
        let sign = if delta.x < 0.0 { -1.0 } else { 1.0 };
        Some((Vec2::new(sign, 0.0), now.x))
    }
}

fn classify(normal: Vec2, other: BodyKind, other_static: bool, ground_threshold: f32) -> CollisionType {
    match other {
        BodyKind::Enemy => return CollisionType::Enemy,
        BodyKind::Sensor => return CollisionType::Sensor,
        _ => {}
    }
    let up = normal.dot(UP);
    if up >= ground_threshold {
        CollisionType::Ground
    } else if !other_static {
        CollisionType::Solid
    } else if up <= -ground_threshold {
        CollisionType::Ceiling
    } else {
        CollisionType::Wall
    }
}

fn contact_point(a: &Aabb, b: &Aabb) -> Vec2 {
    let min = a.min.max(b.min);
    let max = a.max.min(b.max);
    (min + max) * 0.5
}

/// Remove the approaching component of `vel` along `normal`, bouncing if fast enough.
fn reflect_into(vel: &mut Vec2, normal: Vec2, restitution: f32) {
    let vel_along_n = vel.dot(normal);
    // Negative = moving into the partner
    if vel_along_n < 0.0 {
        if vel_along_n.abs() < REST_VELOCITY_THRESHOLD {
            *vel -= vel_along_n * normal;
        } else {
            *vel -= (1.0 + restitution) * vel_along_n * normal;
        }
    }
}

/// Detect overlaps between bodies and push dynamic bodies out of whatever they hit.
///
/// Static geometry is resolved per body, one partner at a time against the
/// already-corrected position, so standing across two tiles does not push the
/// body out twice. Dynamic pairs split the correction 50/50. Enemy and sensor
/// contacts are reported but never resolved.
pub fn collision_system(world: &mut World, ground_threshold: f32) -> Vec<Contact> {
    let entries: Vec<ColliderEntry> = world
        .query_mut::<(
            &PhysicsState,
            &Collider,
            &BodyKind,
            Option<&Surface>,
            Option<&PreviousPosition>,
        )>()
        .into_iter()
        .map(|(entity, (state, collider, kind, surface, prev))| ColliderEntry {
            entity,
            kind: *kind,
            position: state.position,
            previous: prev.map(|p| p.0).unwrap_or(state.position),
            half_extents: collider.half_extents,
            velocity: state.velocity,
            is_static: state.is_static,
            restitution: state.restitution,
            friction: state.friction,
            surface: surface.map(|s| s.0).unwrap_or_default(),
        })
        .collect();

    let (statics, mut dynamics): (Vec<ColliderEntry>, Vec<ColliderEntry>) =
        entries.into_iter().partition(|e| e.is_static);
    let impact: Vec<Vec2> = dynamics.iter().map(|d| d.velocity).collect();

    let mut contacts = Vec::new();

    // Dynamic vs static
    for (i, body) in dynamics.iter_mut().enumerate() {
        // Geometry the body already stood on or leaned against goes first; a
        // neighbouring tile it only grazes is usually clear after that.
        let mut order: Vec<(f32, &ColliderEntry)> = statics
            .iter()
            .map(|s| {
                let o = overlap(&body.previous_aabb(), &s.previous_aabb());
                (o.x.max(o.y), s)
            })
            .collect();
        order.sort_by(|a, b| b.0.total_cmp(&a.0));

        for (_, wall) in order {
            let Some((normal, depth)) = separating_axis(body, wall) else {
                continue;
            };
            let collision_type = classify(normal, wall.kind, true, ground_threshold);
            let point = contact_point(&body.aabb(), &wall.aabb());
            if collision_type.is_blocking() {
                body.position += normal * depth;
                let e = (body.restitution + wall.restitution) * 0.5;
                reflect_into(&mut body.velocity, normal, e);
            }
            contacts.push(Contact {
                entity: body.entity,
                other: wall.entity,
                collision_type,
                normal,
                penetration: depth,
                point,
                impact_velocity: impact[i],
                surface: wall.surface,
                friction: wall.friction,
            });
        }
    }

    // Dynamic vs dynamic, brute force O(n²)
    for i in 0..dynamics.len() {
        for j in (i + 1)..dynamics.len() {
            let (left, right) = dynamics.split_at_mut(j);
            let (a, b) = (&mut left[i], &mut right[0]);
            let Some((normal, depth)) = separating_axis(a, b) else {
                continue;
            };
            let type_a = classify(normal, b.kind, false, ground_threshold);
            let type_b = classify(-normal, a.kind, false, ground_threshold);
            let point = contact_point(&a.aabb(), &b.aabb());

            if type_a.is_blocking() && type_b.is_blocking() {
                a.position += normal * (depth * 0.5);
                b.position -= normal * (depth * 0.5);

                // Positive = A approaching B
                let vel_along_n = (b.velocity - a.velocity).dot(normal);
                if vel_along_n > 0.0 {
                    let e = (a.restitution + b.restitution) * 0.5;
                    let impulse = if vel_along_n < REST_VELOCITY_THRESHOLD {
                        vel_along_n * 0.5
                    } else {
                        (1.0 + e) * vel_along_n * 0.5
                    };
                    a.velocity += impulse * normal;
                    b.velocity -= impulse * normal;
                }
            }

            contacts.push(Contact {
                entity: a.entity,
                other: b.entity,
                collision_type: type_a,
                normal,
                penetration: depth,
                point,
                impact_velocity: impact[i],
                surface: SurfaceMaterial::None,
                friction: b.friction,
            });
            contacts.push(Contact {
                entity: b.entity,
                other: a.entity,
                collision_type: type_b,
                normal: -normal,
                penetration: depth,
                point,
                impact_velocity: impact[j],
                surface: SurfaceMaterial::None,
                friction: a.friction,
            });
        }
    }

    // Write back corrected kinematics
    for body in &dynamics {
        if let Ok(mut state) = world.get::<&mut PhysicsState>(body.entity) {
            state.position = body.position;
            state.velocity = body.velocity;
        }
    }

    contacts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn(world: &mut World, kind: BodyKind, pos: Vec2, half: Vec2, vel: Vec2) -> Entity {
        let e = world.spawn((
            Collider { half_extents: half },
            kind,
            PreviousPosition(pos - vel / 60.0),
        ));
        let mut state = PhysicsState::new(e, pos);
        state.is_static = kind.is_static();
        state.velocity = vel;
        world.insert_one(e, state).unwrap();
        if kind == BodyKind::Platform {
            world.insert_one(e, Surface(SurfaceMaterial::Stone)).unwrap();
        }
        e
    }

    #[test]
    fn body_sinking_into_floor_is_grounded_and_stopped() {
        let mut world = World::new();
        let floor = spawn(&mut world, BodyKind::Platform, Vec2::new(0.0, 100.0), Vec2::new(200.0, 10.0), Vec2::ZERO);
        // Floor top at y = 90; body bottom at 90.5
        let body = spawn(&mut world, BodyKind::Player, Vec2::new(0.0, 74.5), Vec2::splat(16.0), Vec2::new(0.0, 30.0));

        let contacts = collision_system(&mut world, 0.7);
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].entity, body);
        assert_eq!(contacts[0].other, floor);
        assert_eq!(contacts[0].collision_type, CollisionType::Ground);
        assert_eq!(contacts[0].normal, UP);
        assert_eq!(contacts[0].surface, SurfaceMaterial::Stone);

        let state = world.get::<&PhysicsState>(body).unwrap();
        assert!((state.position.y - 74.0).abs() < 1e-4);
        assert_eq!(state.velocity.y, 0.0);
    }

    #[test]
    fn tile_seam_does_not_register_as_wall() {
        let mut world = World::new();
        spawn(&mut world, BodyKind::Platform, Vec2::new(-16.0, 100.0), Vec2::new(16.0, 10.0), Vec2::ZERO);
        spawn(&mut world, BodyKind::Platform, Vec2::new(16.0, 100.0), Vec2::new(16.0, 10.0), Vec2::ZERO);
        let body = spawn(&mut world, BodyKind::Player, Vec2::new(0.5, 74.5), Vec2::splat(16.0), Vec2::new(60.0, 30.0));

        let contacts = collision_system(&mut world, 0.7);
        assert!(contacts.iter().all(|c| c.entity != body || c.collision_type == CollisionType::Ground));
        let state = world.get::<&PhysicsState>(body).unwrap();
        assert!((state.position.y - 74.0).abs() < 1e-4);
        assert_eq!(state.velocity.x, 60.0);
    }

    #[test]
    fn wall_contact_blocks_horizontal_motion() {
        let mut world = World::new();
        spawn(&mut world, BodyKind::Platform, Vec2::new(100.0, 0.0), Vec2::new(10.0, 100.0), Vec2::ZERO);
        let body = spawn(&mut world, BodyKind::Player, Vec2::new(75.0, 0.0), Vec2::splat(16.0), Vec2::new(120.0, 0.0));

        let contacts = collision_system(&mut world, 0.7);
        assert_eq!(contacts[0].collision_type, CollisionType::Wall);
        let state = world.get::<&PhysicsState>(body).unwrap();
        assert!((state.position.x - 74.0).abs() < 1e-4);
        assert!(state.velocity.x <= 0.0);
    }

    #[test]
    fn enemy_overlap_is_reported_not_resolved() {
        let mut world = World::new();
        let player = spawn(&mut world, BodyKind::Player, Vec2::ZERO, Vec2::splat(16.0), Vec2::ZERO);
        let enemy = spawn(&mut world, BodyKind::Enemy, Vec2::new(10.0, 0.0), Vec2::splat(16.0), Vec2::ZERO);

        let contacts = collision_system(&mut world, 0.7);
        assert_eq!(contacts.len(), 2);
        let seen_by_player = contacts.iter().find(|c| c.entity == player).unwrap();
        assert_eq!(seen_by_player.other, enemy);
        assert_eq!(seen_by_player.collision_type, CollisionType::Enemy);
        assert_eq!(world.get::<&PhysicsState>(player).unwrap().position, Vec2::ZERO);
    }

    #[test]
    fn sensors_do_not_block() {
        let mut world = World::new();
        spawn(&mut world, BodyKind::Sensor, Vec2::ZERO, Vec2::splat(50.0), Vec2::ZERO);
        let body = spawn(&mut world, BodyKind::Player, Vec2::new(5.0, 5.0), Vec2::splat(16.0), Vec2::new(0.0, 30.0));

        let contacts = collision_system(&mut world, 0.7);
        assert_eq!(contacts[0].collision_type, CollisionType::Sensor);
        assert_eq!(world.get::<&PhysicsState>(body).unwrap().position, Vec2::new(5.0, 5.0));
    }
}
