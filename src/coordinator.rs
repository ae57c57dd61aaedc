//! The single writer of spatial state.
//!
//! `PhysicsCoordinator` owns the hecs world every body lives in. Nothing else
//! can reach that world: other systems read copies through the query methods or
//! the transform authority, and route every change through a request.
//!
//! One tick runs integration, collision resolution, ground and edge tracking,
//! the accumulation guard and publishing, in that order, for every body. The
//! events it returns are meant to be delivered before the next tick's input.

use std::collections::HashMap;

use glam::Vec2;
use hecs::{Entity, World};

use crate::components::{
    Aabb, BodyDesc, BodyKind, Collider, CollisionId, CollisionInfo, CollisionType,
    EntityId, GroundInfo, MovementCapabilities, MovementIntent, MovementRequest,
    MovementRequestType, PhysicsState, PositionProvider, SoundClass, Surface, SurfaceCatalog,
    SurfaceMaterial, UP,
};
use crate::config::PhysicsConfig;
use crate::engine::input::RawInput;
use crate::engine::time::{FixedStep, SimClock};
use crate::error::{PhysicsError, PhysicsResult};
use crate::events::CollisionEvent;
use crate::systems::{
    average_normal, collision_system, interpolate, physics_step, AccumulationGuard, Contact,
    EdgeDetector, EdgeState, GroundContactTracker, GroundTransition, MovementValidator,
    PreviousPosition, TransformAuthority, ValidationContext, AUTHORITY,
};

/// Consecutive rejected movement requests for one entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct RejectionStreak(u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Rejection {
    UnknownEntity,
    Static,
    NoCapabilities,
    Capability,
    Frequency,
}

/// Which sound the audio layer is about to play.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AudioCue {
    Footstep,
    Landing,
    Impact,
}

/// What the audio layer needs to pick and scale a surface sound.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceAudioCue {
    pub entity: EntityId,
    pub cue: AudioCue,
    pub surface: SurfaceMaterial,
    pub sound_class: SoundClass,
    pub position: Vec2,
    /// 0..1, derived from how fast the body moves or hit.
    pub volume: f32,
}

pub struct PhysicsCoordinator {
    world: World,
    config: PhysicsConfig,
    catalog: SurfaceCatalog,
    clock: SimClock,
    fixed: FixedStep,
    transforms: TransformAuthority,
}

impl PhysicsCoordinator {
    pub fn new(config: PhysicsConfig) -> Self {
        if let Err(err) = config.validate() {
            log::error!("physics config failed validation: {err}");
        }
        let catalog = SurfaceCatalog::with_overrides(&config.surfaces);
        let fixed = FixedStep::new(
            config.integration.fixed_timestep,
            config.integration.max_substeps,
        );
        Self {
            world: World::new(),
            config,
            catalog,
            clock: SimClock::new(),
            fixed,
            transforms: TransformAuthority::new(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn catalog(&self) -> &SurfaceCatalog {
        &self.catalog
    }

    /// Simulation time in seconds.
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn ticks(&self) -> u64 {
        self.clock.ticks()
    }

    pub fn transforms(&self) -> &TransformAuthority {
        &self.transforms
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Mount a body. Players without explicit capabilities get the configured ones.
    pub fn spawn(&mut self, desc: BodyDesc) -> EntityId {
        let is_static = desc.kind.is_static();
        let entity = self.world.spawn((
            desc.kind,
            Collider {
                half_extents: desc.half_extents,
            },
            Surface(desc.surface),
            PreviousPosition(desc.position),
        ));

        let mut state = PhysicsState::new(entity, desc.position);
        state.mass = desc.mass;
        state.gravity_scale = desc.gravity_scale;
        state.friction = desc.friction;
        state.restitution = desc.restitution;
        state.is_static = is_static;
        state.affected_by_gravity = !is_static && desc.gravity_scale != 0.0;
        let _ = self.world.insert_one(entity, state);

        if !is_static {
            let _ = self.world.insert(
                entity,
                (
                    GroundContactTracker::new(&self.config.ground),
                    EdgeDetector::new(&self.config.ground),
                    AccumulationGuard::new(&self.config.guard),
                    MovementIntent::default(),
                    RejectionStreak::default(),
                ),
            );
            let caps = match (desc.capabilities, desc.kind) {
                (Some(caps), _) => Some(caps),
                (None, BodyKind::Player) => {
                    Some(MovementCapabilities::from_config(&self.config.movement))
                }
                (None, _) => None,
            };
            if let Some(caps) = caps {
                let _ = self.world.insert(
                    entity,
                    (caps, MovementValidator::new(&self.config.movement)),
                );
            }
        }

        self.transforms.mount(entity, desc.position);
        log::info!(
            "spawned {:?} {entity:?} at ({:.1}, {:.1})",
            desc.kind,
            desc.position.x,
            desc.position.y
        );
        entity
    }

    /// Unmount a body. Partners see `CollisionEnd` on the next step.
    pub fn despawn(&mut self, id: EntityId) -> PhysicsResult<()> {
        self.world
            .despawn(id)
            .map_err(|_| PhysicsError::UnknownEntity(id))?;
        self.transforms.unmount(id);
        log::info!("despawned {id:?}");
        Ok(())
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.world.contains(id)
    }

    pub fn entity_count(&self) -> usize {
        self.world.len() as usize
    }

    // -----------------------------------------------------------------------
    // Queries (copies only)
    // -----------------------------------------------------------------------

    pub fn get_position(&self, id: EntityId) -> Option<Vec2> {
        self.world.get::<&PhysicsState>(id).ok().map(|s| s.position)
    }

    pub fn get_velocity(&self, id: EntityId) -> Option<Vec2> {
        self.world.get::<&PhysicsState>(id).ok().map(|s| s.velocity)
    }

    pub fn snapshot(&self, id: EntityId) -> Option<PhysicsState> {
        self.world.get::<&PhysicsState>(id).ok().map(|s| (*s).clone())
    }

    pub fn kind(&self, id: EntityId) -> Option<BodyKind> {
        self.world.get::<&BodyKind>(id).ok().map(|k| *k)
    }

    pub fn aabb(&self, id: EntityId) -> Option<Aabb> {
        let state = self.world.get::<&PhysicsState>(id).ok()?;
        let collider = self.world.get::<&Collider>(id).ok()?;
        Some(Aabb::from_center(state.position, collider.half_extents))
    }

    pub fn is_grounded(&self, id: EntityId) -> bool {
        self.world
            .get::<&GroundContactTracker>(id)
            .is_ok_and(|g| g.is_grounded())
    }

    /// Grounded, or still inside the coyote window.
    pub fn is_effectively_grounded(&self, id: EntityId) -> bool {
        let now = self.clock.now();
        self.world
            .get::<&GroundContactTracker>(id)
            .is_ok_and(|g| g.is_effectively_grounded(now))
    }

    pub fn ground_info(&self, id: EntityId) -> Option<GroundInfo> {
        self.world
            .get::<&GroundContactTracker>(id)
            .ok()
            .map(|g| g.ground_info())
    }

    /// Material underfoot. Airborne or unknown entities stand on `None`.
    pub fn get_current_ground_surface_material(&self, id: EntityId) -> SurfaceMaterial {
        self.world
            .get::<&GroundContactTracker>(id)
            .map(|g| g.surface())
            .unwrap_or_default()
    }

    pub fn edge_state(&self, id: EntityId) -> EdgeState {
        self.world
            .get::<&EdgeDetector>(id)
            .map(|d| d.state())
            .unwrap_or_default()
    }

    pub fn capabilities(&self, id: EntityId) -> Option<MovementCapabilities> {
        self.world.get::<&MovementCapabilities>(id).ok().map(|c| *c)
    }

    /// Grant or revoke abilities, e.g. a climbing power-up.
    pub fn set_capabilities(&mut self, id: EntityId, caps: MovementCapabilities) -> PhysicsResult<()> {
        let is_static = self
            .world
            .get::<&PhysicsState>(id)
            .map_err(|_| PhysicsError::UnknownEntity(id))?
            .is_static;
        if is_static {
            return Err(PhysicsError::UnknownEntity(id));
        }
        if self.world.get::<&MovementValidator>(id).is_err() {
            let _ = self
                .world
                .insert_one(id, MovementValidator::new(&self.config.movement));
        }
        let _ = self.world.insert_one(id, caps);
        Ok(())
    }

    pub fn rejection_streak(&self, id: EntityId) -> u32 {
        self.world
            .get::<&RejectionStreak>(id)
            .map(|s| s.0)
            .unwrap_or(0)
    }

    pub fn is_synchronized(&self, id: EntityId) -> bool {
        self.transforms.is_synchronized(id)
    }

    pub fn last_error(&self, id: EntityId) -> Option<crate::error::PositionAccessViolation> {
        self.transforms.last_error(id)
    }

    /// Position for rendering, blended between the last two fixed steps.
    pub fn interpolated_position(&self, id: EntityId) -> Option<Vec2> {
        let state = self.world.get::<&PhysicsState>(id).ok()?;
        let prev = self.world.get::<&PreviousPosition>(id).ok()?;
        Some(interpolate(prev.0, state.position, self.fixed.alpha()))
    }

    pub fn surface_audio_query(&self, id: EntityId, cue: AudioCue) -> Option<SurfaceAudioCue> {
        let state = self.world.get::<&PhysicsState>(id).ok()?;
        let (surface, volume) = match cue {
            AudioCue::Footstep => {
                let ground = self.world.get::<&GroundContactTracker>(id).ok()?;
                if !ground.is_grounded() {
                    return None;
                }
                (
                    ground.surface(),
                    state.velocity.x.abs() / self.config.movement.max_speed,
                )
            }
            AudioCue::Landing => {
                let contact = state.collisions_of(CollisionType::Ground).next()?;
                (
                    contact.surface,
                    contact.impact_velocity.y.abs() / self.config.integration.max_velocity.y,
                )
            }
            AudioCue::Impact => {
                let contact = state
                    .active_collisions
                    .iter()
                    .filter(|c| c.collision_type.is_blocking())
                    .max_by(|a, b| {
                        a.impact_velocity
                            .length_squared()
                            .total_cmp(&b.impact_velocity.length_squared())
                    })?;
                (
                    contact.surface,
                    contact.impact_velocity.length() / self.config.guard.velocity_safety_clamp,
                )
            }
        };
        Some(SurfaceAudioCue {
            entity: id,
            cue,
            surface,
            sound_class: self.catalog.sound_class(surface),
            position: state.position,
            volume: volume.clamp(0.0, 1.0),
        })
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    /// Build this frame's requests for `id` from raw input. Nothing is applied.
    pub fn generate_requests(&self, id: EntityId, raw: &RawInput) -> Vec<MovementRequest> {
        let now = self.clock.now();
        let Ok(state) = self.world.get::<&PhysicsState>(id) else {
            return Vec::new();
        };
        let (Ok(caps), Ok(validator), Ok(ground)) = (
            self.world.get::<&MovementCapabilities>(id),
            self.world.get::<&MovementValidator>(id),
            self.world.get::<&GroundContactTracker>(id),
        ) else {
            return Vec::new();
        };
        let ctx = ValidationContext {
            state: &state,
            effectively_grounded: ground.is_effectively_grounded(now),
            now,
        };
        validator.generate_movement_requests(raw, &caps, &ctx)
    }

    /// Queue `request` for the next step. `false` means nothing changed.
    pub fn request_movement(&mut self, id: EntityId, request: MovementRequest) -> bool {
        let now = self.clock.now();
        match self.try_request(id, &request, now) {
            Ok(()) => {
                if let Ok(mut streak) = self.world.get::<&mut RejectionStreak>(id) {
                    streak.0 = 0;
                }
                true
            }
            Err(reason) => {
                log::debug!(
                    "{id:?}: {:?} request rejected ({reason:?})",
                    request.request_type
                );
                if let Ok(mut streak) = self.world.get::<&mut RejectionStreak>(id) {
                    streak.0 += 1;
                    let threshold = self.config.guard.rejection_warn_threshold.max(1);
                    if streak.0 % threshold == 0 {
                        log::warn!(
                            "{id:?} has had {} movement requests rejected in a row; last reason {reason:?}",
                            streak.0
                        );
                    }
                }
                false
            }
        }
    }

    fn try_request(&mut self, id: EntityId, request: &MovementRequest, now: f64) -> Result<(), Rejection> {
        let is_static = match self.world.get::<&PhysicsState>(id) {
            Ok(state) => state.is_static,
            Err(_) => return Err(Rejection::UnknownEntity),
        };
        if is_static {
            return Err(Rejection::Static);
        }

        let Ok((state, caps, validator, guard, ground, intent)) = self.world.query_one_mut::<(
            &PhysicsState,
            &mut MovementCapabilities,
            &mut MovementValidator,
            &mut AccumulationGuard,
            &mut GroundContactTracker,
            &mut MovementIntent,
        )>(id) else {
            return Err(Rejection::NoCapabilities);
        };

        let effectively_grounded = ground.is_effectively_grounded(now);
        let ctx = ValidationContext {
            state,
            effectively_grounded,
            now,
        };
        if !validator.validate_request(request, caps, &ctx) {
            return Err(Rejection::Capability);
        }
        let ability = request.request_type.ability();
        if !guard.is_input_frequency_valid(ability, now) {
            return Err(Rejection::Frequency);
        }

        if request.request_type == MovementRequestType::Jump {
            if effectively_grounded {
                ground.consume_coyote();
            } else {
                caps.consume_air_jump();
            }
        }
        validator.record_use(ability, now);
        intent.push(request);
        Ok(())
    }

    pub fn apply_impulse(&mut self, id: EntityId, impulse: Vec2) -> PhysicsResult<()> {
        let clamp = self.config.guard.velocity_safety_clamp;
        let mut state = self
            .world
            .get::<&mut PhysicsState>(id)
            .map_err(|_| PhysicsError::UnknownEntity(id))?;
        if state.is_static || !impulse.is_finite() {
            return Ok(());
        }
        let inv_mass = if state.mass > 0.0 { 1.0 / state.mass } else { 0.0 };
        state.velocity = (state.velocity + impulse * inv_mass).clamp_length_max(clamp);
        Ok(())
    }

    /// Add a force for the next step only.
    pub fn apply_force(&mut self, id: EntityId, force: Vec2) -> PhysicsResult<()> {
        let mut state = self
            .world
            .get::<&mut PhysicsState>(id)
            .map_err(|_| PhysicsError::UnknownEntity(id))?;
        if !state.is_static && force.is_finite() {
            state.accumulated_forces += force;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Put a body back to rest and forget every cached spatial relationship.
    ///
    /// Returns the `CollisionEnd`/`GroundLost` events for contacts the body
    /// had, so listeners stay consistent.
    pub fn reset_physics_values(&mut self, id: EntityId) -> PhysicsResult<Vec<CollisionEvent>> {
        let (state, prev) = self
            .world
            .query_one_mut::<(&mut PhysicsState, &mut PreviousPosition)>(id)
            .map_err(|_| PhysicsError::UnknownEntity(id))?;

        let mut events: Vec<CollisionEvent> = state
            .active_collisions
            .drain(..)
            .map(|info| CollisionEvent::CollisionEnd { entity: id, info })
            .collect();
        let was_grounded = state.is_grounded;
        state.reset_dynamics();
        prev.0 = state.position;
        let position = state.position;

        if let Ok((ground, edges, guard, intent, streak)) = self.world.query_one_mut::<(
            &mut GroundContactTracker,
            &mut EdgeDetector,
            &mut AccumulationGuard,
            &mut MovementIntent,
            &mut RejectionStreak,
        )>(id)
        {
            ground.reset();
            edges.reset();
            guard.reset();
            intent.clear();
            streak.0 = 0;
        }
        if let Ok((caps, validator)) = self
            .world
            .query_one_mut::<(&mut MovementCapabilities, &mut MovementValidator)>(id)
        {
            caps.reset_jumps();
            validator.reset();
        }

        if was_grounded {
            events.push(CollisionEvent::GroundLost { entity: id });
        }
        self.publish_transform(id, position);
        log::info!("reset physics for {id:?} at ({:.1}, {:.1})", position.x, position.y);
        Ok(events)
    }

    /// Move a body without touching its velocity or trackers.
    pub fn teleport(&mut self, id: EntityId, position: Vec2) -> PhysicsResult<()> {
        let (state, prev) = self
            .world
            .query_one_mut::<(&mut PhysicsState, &mut PreviousPosition)>(id)
            .map_err(|_| PhysicsError::UnknownEntity(id))?;
        state.position = position;
        prev.0 = position;
        self.publish_transform(id, position);
        Ok(())
    }

    /// Teleport and fully reset.
    pub fn respawn(&mut self, id: EntityId, position: Vec2) -> PhysicsResult<Vec<CollisionEvent>> {
        self.teleport(id, position)?;
        self.reset_physics_values(id)
    }

    /// Position write on behalf of `caller`; anyone but the authority is refused.
    pub fn set_position(&mut self, id: EntityId, position: Vec2, caller: &str) -> PhysicsResult<()> {
        if !self.world.contains(id) {
            return Err(PhysicsError::UnknownEntity(id));
        }
        self.transforms.authorize(id, caller, "position")?;
        self.teleport(id, position)
    }

    pub fn set_velocity(&mut self, id: EntityId, velocity: Vec2, caller: &str) -> PhysicsResult<()> {
        if !self.world.contains(id) {
            return Err(PhysicsError::UnknownEntity(id));
        }
        self.transforms.authorize(id, caller, "velocity")?;
        let clamp = self.config.guard.velocity_safety_clamp;
        if let Ok(mut state) = self.world.get::<&mut PhysicsState>(id) {
            if !state.is_static && velocity.is_finite() {
                state.velocity = velocity.clamp_length_max(clamp);
            }
        }
        Ok(())
    }

    fn publish_transform(&mut self, id: EntityId, position: Vec2) {
        if let Err(err) = self.transforms.sync_with_physics(id, position, AUTHORITY) {
            log::error!("{err}");
        }
    }

    // -----------------------------------------------------------------------
    // Stepping
    // -----------------------------------------------------------------------

    /// Advance the simulation by one tick of `dt` seconds.
    pub fn step(&mut self, dt: f32) -> Vec<CollisionEvent> {
        if !dt.is_finite() || dt <= 0.0 {
            log::debug!("ignoring step with dt={dt}");
            return Vec::new();
        }
        self.clock.advance(dt);
        let now = self.clock.now();

        physics_step(&mut self.world, &self.config, &self.catalog, dt);
        let contacts = collision_system(&mut self.world, self.config.ground.ground_normal_threshold);

        let mut by_entity: HashMap<Entity, Vec<Contact>> = HashMap::new();
        for contact in contacts {
            by_entity.entry(contact.entity).or_default().push(contact);
        }
        let supports: Vec<Aabb> = self
            .world
            .query_mut::<(&PhysicsState, &Collider, &BodyKind)>()
            .into_iter()
            .filter(|(_, (_, _, kind))| **kind == BodyKind::Platform)
            .map(|(_, (state, collider, _))| Aabb::from_center(state.position, collider.half_extents))
            .collect();

        let mut events = Vec::new();
        let mut published = Vec::new();
        for (entity, (state, ground, edges, guard, collider, caps)) in self.world.query_mut::<(
            &mut PhysicsState,
            &mut GroundContactTracker,
            &mut EdgeDetector,
            &AccumulationGuard,
            &Collider,
            Option<&mut MovementCapabilities>,
        )>() {
            let contacts = by_entity.remove(&entity).unwrap_or_default();

            // Collision lifecycle
            let mut previous: HashMap<CollisionId, CollisionInfo> = state
                .active_collisions
                .drain(..)
                .map(|c| (c.collision_id, c))
                .collect();
            for contact in &contacts {
                let info = CollisionInfo {
                    collision_id: CollisionId::between(entity, contact.other),
                    other: contact.other,
                    collision_type: contact.collision_type,
                    contact_point: contact.point,
                    contact_normal: contact.normal,
                    impact_velocity: contact.impact_velocity,
                    surface: contact.surface,
                    friction: contact.friction * self.catalog.friction_multiplier(contact.surface),
                };
                let event = if previous.remove(&info.collision_id).is_some() {
                    CollisionEvent::CollisionUpdate {
                        entity,
                        info: info.clone(),
                    }
                } else {
                    CollisionEvent::CollisionStart {
                        entity,
                        info: info.clone(),
                    }
                };
                events.push(event);
                state.active_collisions.push(info);
            }
            let mut ended: Vec<CollisionInfo> = previous.into_values().collect();
            ended.sort_by_key(|c| c.collision_id);
            events.extend(
                ended
                    .into_iter()
                    .map(|info| CollisionEvent::CollisionEnd { entity, info }),
            );
            state.contact_point_count = state.active_collisions.len();

            // Ground
            let ground_contacts: Vec<&Contact> = contacts
                .iter()
                .filter(|c| c.collision_type == CollisionType::Ground)
                .collect();
            let info = match average_normal(ground_contacts.iter().map(|c| c.normal)) {
                Some(normal) => {
                    let center = state.position.x;
                    let surface = ground_contacts
                        .iter()
                        .min_by(|a, b| {
                            (a.point.x - center)
                                .abs()
                                .total_cmp(&(b.point.x - center).abs())
                        })
                        .map(|c| c.surface)
                        .unwrap_or_default();
                    GroundInfo::grounded(if normal == Vec2::ZERO { UP } else { normal }, surface)
                }
                None => GroundInfo::airborne(),
            };
            let update = ground.update_ground_state(info, now);
            state.was_grounded = ground.was_grounded();
            state.is_grounded = ground.is_grounded();
            match update.transition {
                GroundTransition::Landed => {
                    log::debug!("{entity:?} landed on {}", info.ground_surface);
                    if let Some(caps) = caps {
                        caps.on_grounded_changed(true);
                    }
                    events.push(CollisionEvent::GroundContact {
                        entity,
                        normal: info.ground_normal,
                        surface: info.ground_surface,
                    });
                }
                GroundTransition::Left => {
                    log::debug!("{entity:?} left the ground");
                    if let Some(caps) = caps {
                        caps.on_grounded_changed(false);
                    }
                    events.push(CollisionEvent::GroundLost { entity });
                }
                GroundTransition::Unchanged => {}
            }
            if let Some(surface) = update.surface_changed {
                events.push(CollisionEvent::SurfaceChanged { entity, surface });
            }

            // Edges
            if state.is_grounded {
                let body = Aabb::from_center(state.position, collider.half_extents);
                edges.update_grounded(&body, &supports);
            } else {
                edges.update_airborne(now);
            }

            // Guard, then publish
            *state = guard.prevent_accumulation(state.clone());
            state.update_count += 1;
            state.last_update_time = now;
            published.push((entity, state.position));
        }

        for (entity, position) in published {
            self.publish_transform(entity, position);
        }
        events
    }

    /// Run as many fixed steps as `frame_dt` pays for.
    ///
    /// Returns the events of every step taken and the interpolation alpha.
    /// Requests queued for a frame that takes no step are dropped.
    pub fn update(&mut self, frame_dt: f32) -> (Vec<CollisionEvent>, f32) {
        let steps = self.accumulate(frame_dt);
        self.run_fixed_steps(steps)
    }

    /// Bank `frame_dt` in the fixed-step accumulator and return how many
    /// steps are now due. Pair with [`PhysicsCoordinator::run_fixed_steps`].
    pub fn accumulate(&mut self, frame_dt: f32) -> u32 {
        self.fixed.accumulate(frame_dt)
    }

    /// Run `steps` fixed steps; with zero steps, pending intents are dropped.
    pub fn run_fixed_steps(&mut self, steps: u32) -> (Vec<CollisionEvent>, f32) {
        let mut events = Vec::new();
        for _ in 0..steps {
            events.extend(self.step(self.fixed.step));
        }
        if steps == 0 {
            self.clear_intents();
        }
        (events, self.fixed.alpha())
    }

    fn clear_intents(&mut self) {
        for (_, intent) in self.world.query_mut::<&mut MovementIntent>() {
            intent.clear();
        }
    }
}

impl Default for PhysicsCoordinator {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}

impl PositionProvider for PhysicsCoordinator {
    fn position_of(&self, entity: EntityId) -> Option<Vec2> {
        self.get_position(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn stone_floor(coord: &mut PhysicsCoordinator) -> EntityId {
        coord.spawn(BodyDesc::platform(
            Vec2::new(0.0, 100.0),
            Vec2::new(400.0, 10.0),
            SurfaceMaterial::Stone,
        ))
    }

    fn settled_player(coord: &mut PhysicsCoordinator) -> EntityId {
        stone_floor(coord);
        let player = coord.spawn(BodyDesc::player(Vec2::new(0.0, 74.0), Vec2::new(8.0, 16.0)));
        for _ in 0..30 {
            coord.step(DT);
        }
        player
    }

    #[test]
    fn body_comes_to_rest_on_the_floor() {
        let mut coord = PhysicsCoordinator::default();
        let player = settled_player(&mut coord);
        assert!(coord.is_grounded(player));
        assert_eq!(
            coord.get_current_ground_surface_material(player),
            SurfaceMaterial::Stone
        );
        let pos = coord.get_position(player).unwrap();
        assert!((pos.y - 74.0).abs() < 1.0, "y = {}", pos.y);
    }

    #[test]
    fn static_bodies_reject_requests() {
        let mut coord = PhysicsCoordinator::default();
        let floor = stone_floor(&mut coord);
        assert!(!coord.request_movement(floor, MovementRequest::walk(floor, Vec2::X, 100.0)));
        assert_eq!(coord.rejection_streak(floor), 0);
    }

    #[test]
    fn landing_emits_ground_contact_once() {
        let mut coord = PhysicsCoordinator::default();
        stone_floor(&mut coord);
        let player = coord.spawn(BodyDesc::player(Vec2::new(0.0, 40.0), Vec2::new(8.0, 16.0)));
        let mut landings = 0;
        let mut starts = 0;
        for _ in 0..60 {
            for event in coord.step(DT) {
                match event {
                    CollisionEvent::GroundContact { entity, surface, .. } => {
                        assert_eq!(entity, player);
                        assert_eq!(surface, SurfaceMaterial::Stone);
                        landings += 1;
                    }
                    CollisionEvent::CollisionStart { .. } => starts += 1,
                    _ => {}
                }
            }
        }
        assert_eq!(landings, 1);
        assert_eq!(starts, 1);
    }

    #[test]
    fn jump_leaves_the_ground() {
        let mut coord = PhysicsCoordinator::default();
        let player = settled_player(&mut coord);
        assert!(coord.request_movement(player, MovementRequest::jump(player, 520.0)));
        let events = coord.step(DT);
        assert!(events
            .iter()
            .any(|e| matches!(e, CollisionEvent::GroundLost { entity } if *entity == player)));
        assert!(coord.get_velocity(player).unwrap().y < 0.0);
        // The grounded jump spent the coyote window.
        assert!(!coord.is_effectively_grounded(player));
    }

    #[test]
    fn reset_clears_contacts_and_reports_them() {
        let mut coord = PhysicsCoordinator::default();
        let player = settled_player(&mut coord);
        let events = coord.reset_physics_values(player).unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, CollisionEvent::CollisionEnd { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, CollisionEvent::GroundLost { .. })));
        let state = coord.snapshot(player).unwrap();
        assert!(state.active_collisions.is_empty());
        assert!(!coord.is_grounded(player));
        assert_eq!(coord.edge_state(player), EdgeState::default());
    }

    #[test]
    fn foreign_velocity_write_is_refused() {
        let mut coord = PhysicsCoordinator::default();
        let player = settled_player(&mut coord);
        let before = coord.snapshot(player).unwrap();
        let err = coord
            .set_velocity(player, Vec2::new(300.0, 0.0), "AiSystem")
            .unwrap_err();
        assert!(matches!(err, PhysicsError::AccessViolation(_)));
        assert_eq!(coord.snapshot(player).unwrap(), before);
        assert!(!coord.is_synchronized(player));
        assert_eq!(coord.last_error(player).unwrap().field, "velocity");
    }

    #[test]
    fn footstep_cue_reports_surface_and_volume() {
        let mut coord = PhysicsCoordinator::default();
        let player = settled_player(&mut coord);
        for _ in 0..30 {
            coord.request_movement(player, MovementRequest::walk(player, Vec2::X, 200.0));
            coord.step(DT);
        }
        let cue = coord.surface_audio_query(player, AudioCue::Footstep).unwrap();
        assert_eq!(cue.surface, SurfaceMaterial::Stone);
        assert_eq!(cue.sound_class, SoundClass::Hard);
        assert!(cue.volume > 0.5 && cue.volume <= 1.0);
    }

    #[test]
    fn update_runs_fixed_steps_and_reports_alpha() {
        let mut coord = PhysicsCoordinator::default();
        let (_, alpha) = coord.update(DT * 2.5);
        assert_eq!(coord.ticks(), 2);
        assert!((alpha - 0.5).abs() < 1e-3);
    }

    #[test]
    fn despawn_ends_partner_contacts() {
        let mut coord = PhysicsCoordinator::default();
        let floor = stone_floor(&mut coord);
        let player = coord.spawn(BodyDesc::player(Vec2::new(0.0, 74.0), Vec2::new(8.0, 16.0)));
        coord.step(DT);
        coord.step(DT);
        coord.despawn(floor).unwrap();
        let events = coord.step(DT);
        assert!(events.iter().any(|e| matches!(
            e,
            CollisionEvent::CollisionEnd { entity, info } if *entity == player && info.other == floor
        )));
        assert!(coord.despawn(floor).is_err());
    }

    #[test]
    fn recycled_partner_slot_starts_a_new_contact() {
        let mut coord = PhysicsCoordinator::default();
        let floor = stone_floor(&mut coord);
        let player = coord.spawn(BodyDesc::player(Vec2::new(0.0, 74.0), Vec2::new(8.0, 16.0)));
        coord.step(DT);
        coord.step(DT);
        coord.despawn(floor).unwrap();
        let replacement = stone_floor(&mut coord);
        assert_eq!(replacement.id(), floor.id());

        let events = coord.step(DT);
        assert!(events.iter().any(|e| matches!(
            e,
            CollisionEvent::CollisionEnd { entity, info } if *entity == player && info.other == floor
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            CollisionEvent::CollisionStart { entity, info } if *entity == player && info.other == replacement
        )));
        assert!(!events
            .iter()
            .any(|e| matches!(e, CollisionEvent::CollisionUpdate { .. })));
    }

    #[test]
    fn interpolated_position_sits_between_fixed_steps() {
        let mut coord = PhysicsCoordinator::default();
        let body = coord.spawn(BodyDesc::prop(Vec2::ZERO, Vec2::splat(4.0)));
        coord.update(DT * 2.0);
        let previous = coord.get_position(body).unwrap();
        let (_, alpha) = coord.update(DT * 1.5);
        let current = coord.get_position(body).unwrap();
        assert!((alpha - 0.5).abs() < 1e-3);

        // Falling under gravity, so y grows every step.
        assert!(current.y > previous.y);
        let drawn = coord.interpolated_position(body).unwrap();
        assert!(drawn.y > previous.y && drawn.y < current.y, "{previous} {drawn} {current}");
        assert_eq!(drawn.x, current.x);
    }

    #[test]
    fn zero_timestep_config_never_produces_nan_alpha() {
        let mut config = PhysicsConfig::default();
        config.integration.fixed_timestep = 0.0;
        let mut coord = PhysicsCoordinator::new(config);
        let (_, alpha) = coord.update(DT);
        assert!(alpha.is_finite());
        assert!((0.0..1.0).contains(&alpha));
    }
}
