use glam::Vec2;
use hecs::World;

use crate::components::{
    MovementCapabilities, MovementIntent, PhysicsIntegratable, PhysicsState, SurfaceCatalog,
};
use crate::config::{MovementConfig, PhysicsConfig};

use super::ground::GroundContactTracker;

/// Pre-step position, kept for collision axis selection and render interpolation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreviousPosition(pub Vec2);

impl PhysicsIntegratable for PhysicsState {
    /// Forces → acceleration → velocity → per-axis clamp → position.
    /// Acceleration and forces do not survive the step; only velocity does.
    fn integrate(&mut self, gravity: f32, max_velocity: Vec2, dt: f32) {
        if self.is_static {
            self.acceleration = Vec2::ZERO;
            self.accumulated_forces = Vec2::ZERO;
            return;
        }
        let inv_mass = if self.mass > 0.0 { 1.0 / self.mass } else { 0.0 };
        self.acceleration += self.accumulated_forces * inv_mass;
        if self.affected_by_gravity {
            self.acceleration.y += gravity * self.gravity_scale;
        }
        // Semi-implicit Euler: update velocity first, then position
        self.velocity += self.acceleration * dt;
        self.velocity = self.velocity.clamp(-max_velocity, max_velocity);
        self.position += self.velocity * dt;

        self.acceleration = Vec2::ZERO;
        self.accumulated_forces = Vec2::ZERO;
    }
}

/// Move `current` toward `target` by at most `max_step`.
fn approach(current: f32, target: f32, max_step: f32) -> f32 {
    let diff = target - current;
    if diff.abs() <= max_step {
        target
    } else {
        current + diff.signum() * max_step
    }
}

/// Turn this frame's accepted requests into velocity changes.
///
/// Returns `true` while climbing, which suspends gravity for this tick.
pub fn apply_movement(
    state: &mut PhysicsState,
    intent: &MovementIntent,
    caps: &MovementCapabilities,
    traction: f32,
    config: &MovementConfig,
    dt: f32,
) -> bool {
    let grounded = state.is_grounded;
    let mut climbing = false;

    match intent.walk {
        Some((direction, speed)) => {
            let rate = if grounded {
                config.walk_acceleration * traction
            } else {
                config.walk_acceleration * config.air_control
            };
            let target = direction.x * speed.min(caps.max_speed);
            state.velocity.x = approach(state.velocity.x, target, rate * dt);

            if direction.y != 0.0 && caps.can_climb && state.touching_wall() {
                state.velocity.y = direction.y.signum() * config.climb_speed;
                climbing = true;
            }
        }
        None if grounded => {
            // No input on the ground: surface traction bleeds off horizontal speed.
            let rate = config.ground_deceleration * traction;
            state.velocity.x = approach(state.velocity.x, 0.0, rate * dt);
        }
        None => {}
    }

    if let Some(speed) = intent.jump {
        state.velocity.y = -speed;
    }

    if let Some((direction, speed)) = intent.dash {
        state.velocity.x = direction.x * speed;
        if direction.y != 0.0 {
            state.velocity.y = direction.y * speed;
        }
    }

    climbing
}

/// Consume pending intents and integrate every dynamic body by `dt`.
pub fn physics_step(world: &mut World, config: &PhysicsConfig, catalog: &SurfaceCatalog, dt: f32) {
    for (_entity, (state, prev, intent, caps, ground)) in world.query_mut::<(
        &mut PhysicsState,
        &mut PreviousPosition,
        Option<&mut MovementIntent>,
        Option<&MovementCapabilities>,
        Option<&GroundContactTracker>,
    )>() {
        prev.0 = state.position;
        if state.is_static {
            if let Some(intent) = intent {
                intent.clear();
            }
            continue;
        }

        let mut climbing = false;
        if let (Some(intent), Some(caps)) = (intent, caps) {
            let surface = ground.map(|g| g.surface()).unwrap_or_default();
            let traction = catalog.friction_multiplier(surface) * state.friction;
            climbing = apply_movement(state, intent, caps, traction, &config.movement, dt);
            intent.clear();
        }

        let gravity = if climbing { 0.0 } else { config.integration.gravity };
        state.integrate(gravity, config.integration.max_velocity, dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> PhysicsState {
        let mut world = World::new();
        PhysicsState::new(world.spawn(()), Vec2::ZERO)
    }

    #[test]
    fn forces_do_not_persist_across_steps() {
        let mut s = state();
        s.affected_by_gravity = false;
        s.accumulated_forces = Vec2::new(60.0, 0.0);
        s.integrate(0.0, Vec2::new(400.0, 800.0), 1.0 / 60.0);
        let v = s.velocity.x;
        assert!(v > 0.0);
        assert_eq!(s.accumulated_forces, Vec2::ZERO);
        assert_eq!(s.acceleration, Vec2::ZERO);

        s.integrate(0.0, Vec2::new(400.0, 800.0), 1.0 / 60.0);
        assert_eq!(s.velocity.x, v);
    }

    #[test]
    fn per_axis_caps_apply() {
        let mut s = state();
        s.velocity = Vec2::new(5000.0, -5000.0);
        s.integrate(1800.0, Vec2::new(400.0, 800.0), 1.0 / 60.0);
        assert_eq!(s.velocity, Vec2::new(400.0, -800.0));
    }

    #[test]
    fn static_bodies_never_move() {
        let mut s = state();
        s.is_static = true;
        s.accumulated_forces = Vec2::splat(1000.0);
        s.integrate(1800.0, Vec2::new(400.0, 800.0), 1.0);
        assert_eq!(s.position, Vec2::ZERO);
        assert_eq!(s.velocity, Vec2::ZERO);
    }

    #[test]
    fn ice_accelerates_slower_than_stone() {
        let config = MovementConfig::default();
        let caps = MovementCapabilities::default();
        let intent = MovementIntent {
            walk: Some((Vec2::X, 200.0)),
            ..Default::default()
        };

        let mut on_stone = state();
        on_stone.is_grounded = true;
        apply_movement(&mut on_stone, &intent, &caps, 1.0, &config, 1.0 / 60.0);

        let mut on_ice = state();
        on_ice.is_grounded = true;
        apply_movement(&mut on_ice, &intent, &caps, 0.1, &config, 1.0 / 60.0);

        assert!(on_stone.velocity.x > on_ice.velocity.x);
        assert!(on_ice.velocity.x > 0.0);
    }

    #[test]
    fn walk_speed_respects_capability_cap() {
        let config = MovementConfig::default();
        let caps = MovementCapabilities::default();
        let intent = MovementIntent {
            walk: Some((Vec2::X, 10_000.0)),
            ..Default::default()
        };
        let mut s = state();
        s.is_grounded = true;
        for _ in 0..120 {
            apply_movement(&mut s, &intent, &caps, 1.0, &config, 1.0 / 60.0);
        }
        assert_eq!(s.velocity.x, caps.max_speed);
    }

    #[test]
    fn jump_sets_upward_velocity() {
        let config = MovementConfig::default();
        let caps = MovementCapabilities::default();
        let intent = MovementIntent {
            jump: Some(500.0),
            ..Default::default()
        };
        let mut s = state();
        apply_movement(&mut s, &intent, &caps, 1.0, &config, 1.0 / 60.0);
        assert_eq!(s.velocity.y, -500.0);
    }
}
