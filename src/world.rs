//! `PhysicsWorld`: the context object handed to the game loop.
//!
//! It ties together the per-entity input state, the coordinator and the
//! notifier, and runs one frame in a fixed order: input to requests, requests
//! to the coordinator, the physics tick, then event delivery. Several worlds
//! can live side by side; nothing here is global.

use std::collections::HashMap;

use glam::Vec2;

use crate::components::{BodyDesc, EntityId};
use crate::config::PhysicsConfig;
use crate::coordinator::PhysicsCoordinator;
use crate::engine::input::{InputEvent, InputState};
use crate::error::{PhysicsError, PhysicsResult};
use crate::events::{CollisionEvent, CollisionListener, CollisionNotifier, ListenerId};

/// Counts from the most recent frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub steps: u32,
    pub requests_accepted: u32,
    pub requests_rejected: u32,
    pub events: u32,
}

pub struct PhysicsWorld {
    coordinator: PhysicsCoordinator,
    notifier: CollisionNotifier,
    inputs: HashMap<EntityId, InputState>,
}

impl PhysicsWorld {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            coordinator: PhysicsCoordinator::new(config),
            notifier: CollisionNotifier::new(),
            inputs: HashMap::new(),
        }
    }

    pub fn coordinator(&self) -> &PhysicsCoordinator {
        &self.coordinator
    }

    /// Mutable access for gameplay code that spawns, respawns or pushes bodies.
    pub fn coordinator_mut(&mut self) -> &mut PhysicsCoordinator {
        &mut self.coordinator
    }

    pub fn notifier(&self) -> &CollisionNotifier {
        &self.notifier
    }

    pub fn add_collision_listener(&mut self, listener: Box<dyn CollisionListener>) -> ListenerId {
        self.notifier.add_collision_listener(listener)
    }

    pub fn remove_collision_listener(&mut self, id: ListenerId) -> bool {
        self.notifier.remove_collision_listener(id)
    }

    pub fn spawn(&mut self, desc: BodyDesc) -> EntityId {
        self.coordinator.spawn(desc)
    }

    /// Spawn a body that reads named actions from [`PhysicsWorld::input`].
    pub fn spawn_controlled(&mut self, desc: BodyDesc) -> EntityId {
        let id = self.coordinator.spawn(desc);
        self.inputs.insert(id, InputState::new());
        id
    }

    pub fn despawn(&mut self, id: EntityId) -> PhysicsResult<()> {
        self.inputs.remove(&id);
        self.coordinator.despawn(id)
    }

    pub fn input(&mut self, id: EntityId, event: InputEvent) -> PhysicsResult<()> {
        self.inputs
            .get_mut(&id)
            .ok_or(PhysicsError::UnknownEntity(id))?
            .apply(event);
        Ok(())
    }

    /// Feed a pre-mapped action name such as `"move_left"` or `"jump"`.
    pub fn input_named(&mut self, id: EntityId, action: &str, pressed: bool, at: f64) -> PhysicsResult<()> {
        self.inputs
            .get_mut(&id)
            .ok_or(PhysicsError::UnknownEntity(id))?
            .apply_named(action, pressed, at);
        Ok(())
    }

    pub fn input_state(&self, id: EntityId) -> Option<&InputState> {
        self.inputs.get(&id)
    }

    /// Respawn and tell listeners about the contacts that were dropped.
    pub fn respawn(&mut self, id: EntityId, position: Vec2) -> PhysicsResult<()> {
        let events = self.coordinator.respawn(id, position)?;
        if let Some(input) = self.inputs.get_mut(&id) {
            input.clear();
        }
        self.notifier.notify_all(&events);
        Ok(())
    }

    pub fn reset_physics_values(&mut self, id: EntityId) -> PhysicsResult<()> {
        let events = self.coordinator.reset_physics_values(id)?;
        self.notifier.notify_all(&events);
        Ok(())
    }

    /// One variable-length frame: exactly one physics tick of `dt`.
    pub fn tick(&mut self, dt: f32) -> FrameReport {
        let (requests_accepted, requests_rejected) = self.dispatch_input();
        let events = self.coordinator.step(dt);
        self.finish_frame(events, 1, requests_accepted, requests_rejected)
    }

    /// One render frame driving as many fixed ticks as `frame_dt` covers.
    /// Returns the report and the interpolation alpha.
    ///
    /// Input is only turned into requests on frames that step. On frames that
    /// do not, press edges are kept for the next frame that does.
    pub fn tick_fixed(&mut self, frame_dt: f32) -> (FrameReport, f32) {
        let due = self.coordinator.accumulate(frame_dt);
        if due == 0 {
            let (_, alpha) = self.coordinator.run_fixed_steps(0);
            return (FrameReport::default(), alpha);
        }
        let (requests_accepted, requests_rejected) = self.dispatch_input();
        let before = self.coordinator.ticks();
        let (events, alpha) = self.coordinator.run_fixed_steps(due);
        let steps = (self.coordinator.ticks() - before) as u32;
        let report = self.finish_frame(events, steps, requests_accepted, requests_rejected);
        (report, alpha)
    }

    fn dispatch_input(&mut self) -> (u32, u32) {
        let mut accepted = 0;
        let mut rejected = 0;
        for (&id, input) in &self.inputs {
            let raw = input.raw_input();
            for request in self.coordinator.generate_requests(id, &raw) {
                if self.coordinator.request_movement(id, request) {
                    accepted += 1;
                } else {
                    rejected += 1;
                }
            }
        }
        (accepted, rejected)
    }

    fn finish_frame(
        &mut self,
        events: Vec<CollisionEvent>,
        steps: u32,
        requests_accepted: u32,
        requests_rejected: u32,
    ) -> FrameReport {
        self.notifier.notify_all(&events);
        for input in self.inputs.values_mut() {
            input.end_frame();
        }
        FrameReport {
            steps,
            requests_accepted,
            requests_rejected,
            events: events.len() as u32,
        }
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::SurfaceMaterial;
    use crate::engine::input::Action;

    fn world_with_player() -> (PhysicsWorld, EntityId) {
        let mut world = PhysicsWorld::default();
        world.spawn(BodyDesc::platform(
            Vec2::new(0.0, 100.0),
            Vec2::new(400.0, 10.0),
            SurfaceMaterial::Grass,
        ));
        let player = world.spawn_controlled(BodyDesc::player(Vec2::new(0.0, 74.0), Vec2::new(8.0, 16.0)));
        for _ in 0..10 {
            world.tick(1.0 / 60.0);
        }
        (world, player)
    }

    #[test]
    fn held_key_moves_the_player() {
        let (mut world, player) = world_with_player();
        world
            .input(player, InputEvent::Pressed(Action::MoveRight, 0.2))
            .unwrap();
        let start = world.coordinator().get_position(player).unwrap().x;
        for _ in 0..10 {
            world.tick(1.0 / 60.0);
        }
        assert!(world.coordinator().get_position(player).unwrap().x > start);
    }

    #[test]
    fn jump_press_is_an_edge() {
        let (mut world, player) = world_with_player();
        world.input_named(player, "jump", true, 0.2).unwrap();
        let report = world.tick(1.0 / 60.0);
        assert_eq!(report.requests_accepted, 1);
        // Still held, but the press edge is gone.
        let report = world.tick(1.0 / 60.0);
        assert_eq!(report.requests_accepted + report.requests_rejected, 0);
    }

    #[test]
    fn jump_pressed_between_fixed_steps_still_happens() {
        let (mut world, player) = world_with_player();
        let frame = 1.0 / 240.0;
        world.input_named(player, "jump", true, 0.2).unwrap();

        let (report, _) = world.tick_fixed(frame);
        assert_eq!(report.steps, 0);
        assert_eq!(report.requests_accepted, 0);
        assert!(world.input_state(player).unwrap().raw_input().jump_pressed);

        let mut accepted = 0;
        let mut lowest_vy = f32::MAX;
        for _ in 0..8 {
            let (report, _) = world.tick_fixed(frame);
            accepted += report.requests_accepted;
            lowest_vy = lowest_vy.min(world.coordinator().get_velocity(player).unwrap().y);
        }
        assert_eq!(accepted, 1);
        assert!(lowest_vy < 0.0, "vy = {lowest_vy}");
        assert!(!world.coordinator().is_grounded(player));
    }

    #[test]
    fn uncontrolled_bodies_reject_input() {
        let mut world = PhysicsWorld::default();
        let prop = world.spawn(BodyDesc::prop(Vec2::ZERO, Vec2::splat(4.0)));
        assert!(world
            .input(prop, InputEvent::Pressed(Action::Jump, 0.0))
            .is_err());
    }
}
