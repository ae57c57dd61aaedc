//! Collision, ground and surface events, and the synchronous bus that delivers them.
//!
//! Events are produced by `PhysicsCoordinator::step` and handed to a
//! `CollisionNotifier` in the same frame. Every listener sees every event once,
//! in registration order. A listener that fails or panics is logged and skipped;
//! the remaining listeners and the simulation carry on.

use std::panic::{self, AssertUnwindSafe};

use glam::Vec2;

use crate::components::{CollisionInfo, EntityId, SurfaceMaterial, UP};

#[derive(Clone, Debug, PartialEq)]
pub enum CollisionEvent {
    CollisionStart { entity: EntityId, info: CollisionInfo },
    /// Contact persisted into another frame; `info` carries the fresh values.
    CollisionUpdate { entity: EntityId, info: CollisionInfo },
    CollisionEnd { entity: EntityId, info: CollisionInfo },
    GroundContact {
        entity: EntityId,
        normal: Vec2,
        surface: SurfaceMaterial,
    },
    GroundLost { entity: EntityId },
    SurfaceChanged {
        entity: EntityId,
        surface: SurfaceMaterial,
    },
}

impl CollisionEvent {
    pub fn entity(&self) -> EntityId {
        match self {
            Self::CollisionStart { entity, .. }
            | Self::CollisionUpdate { entity, .. }
            | Self::CollisionEnd { entity, .. }
            | Self::GroundContact { entity, .. }
            | Self::GroundLost { entity }
            | Self::SurfaceChanged { entity, .. } => *entity,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::CollisionStart { .. } => "collision_start",
            Self::CollisionUpdate { .. } => "collision_update",
            Self::CollisionEnd { .. } => "collision_end",
            Self::GroundContact { .. } => "ground_contact",
            Self::GroundLost { .. } => "ground_lost",
            Self::SurfaceChanged { .. } => "surface_changed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("listener `{listener}` failed: {reason}")]
pub struct ListenerError {
    pub listener: String,
    pub reason: String,
}

impl ListenerError {
    pub fn new(listener: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            listener: listener.into(),
            reason: reason.into(),
        }
    }
}

pub type ListenerResult = Result<(), ListenerError>;

/// Receiver for physics events. Every callback defaults to doing nothing.
pub trait CollisionListener {
    fn name(&self) -> &str {
        "unnamed_listener"
    }

    fn on_collision_start(&mut self, _entity: EntityId, _info: &CollisionInfo) -> ListenerResult {
        Ok(())
    }

    fn on_collision_update(&mut self, _entity: EntityId, _info: &CollisionInfo) -> ListenerResult {
        Ok(())
    }

    fn on_collision_end(&mut self, _entity: EntityId, _info: &CollisionInfo) -> ListenerResult {
        Ok(())
    }

    fn on_ground_state_changed(
        &mut self,
        _entity: EntityId,
        _is_grounded: bool,
        _normal: Vec2,
    ) -> ListenerResult {
        Ok(())
    }

    fn on_surface_changed(&mut self, _entity: EntityId, _surface: SurfaceMaterial) -> ListenerResult {
        Ok(())
    }
}

fn dispatch(listener: &mut dyn CollisionListener, event: &CollisionEvent) -> ListenerResult {
    match event {
        CollisionEvent::CollisionStart { entity, info } => listener.on_collision_start(*entity, info),
        CollisionEvent::CollisionUpdate { entity, info } => {
            listener.on_collision_update(*entity, info)
        }
        CollisionEvent::CollisionEnd { entity, info } => listener.on_collision_end(*entity, info),
        CollisionEvent::GroundContact { entity, normal, .. } => {
            listener.on_ground_state_changed(*entity, true, *normal)
        }
        CollisionEvent::GroundLost { entity } => listener.on_ground_state_changed(*entity, false, UP),
        CollisionEvent::SurfaceChanged { entity, surface } => {
            listener.on_surface_changed(*entity, *surface)
        }
    }
}

/// Handle returned by `add_collision_listener`, used to remove it again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NotifierStats {
    pub events_delivered: u64,
    pub listener_errors: u64,
    pub listener_panics: u64,
}

#[derive(Default)]
pub struct CollisionNotifier {
    listeners: Vec<(ListenerId, Box<dyn CollisionListener>)>,
    next_id: u64,
    stats: NotifierStats,
}

impl CollisionNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_collision_listener(&mut self, listener: Box<dyn CollisionListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        log::debug!("registered collision listener `{}` as {id:?}", listener.name());
        self.listeners.push((id, listener));
        id
    }

    pub fn remove_collision_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn stats(&self) -> NotifierStats {
        self.stats
    }

    /// Deliver `event` to every listener, isolating each one.
    pub fn notify(&mut self, event: &CollisionEvent) {
        for (id, listener) in &mut self.listeners {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| dispatch(listener.as_mut(), event)));
            match outcome {
                Ok(Ok(())) => self.stats.events_delivered += 1,
                Ok(Err(err)) => {
                    self.stats.listener_errors += 1;
                    log::warn!("{id:?}: {err} while handling {}", event.kind());
                }
                Err(payload) => {
                    self.stats.listener_panics += 1;
                    let message = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "non-string panic payload".to_owned());
                    log::error!(
                        "listener `{}` ({id:?}) panicked handling {}: {message}",
                        listener.name(),
                        event.kind()
                    );
                }
            }
        }
    }

    pub fn notify_all<'a>(&mut self, events: impl IntoIterator<Item = &'a CollisionEvent>) {
        for event in events {
            self.notify(event);
        }
    }
}
