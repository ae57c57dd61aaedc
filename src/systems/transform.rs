use std::collections::HashMap;

use glam::Vec2;
use hecs::Entity;

use crate::components::{PositionProvider, Transform2D};
use crate::error::{PositionAccessViolation, ViolationKind};

/// The only caller allowed to write spatial state.
pub const AUTHORITY: &str = "PhysicsCoordinator";

#[derive(Clone, Debug, PartialEq)]
struct TransformRecord {
    transform: Transform2D,
    is_synchronized: bool,
    last_error: Option<PositionAccessViolation>,
}

/// Read-only transform facade for everything that is not the coordinator.
///
/// Reads hand out copies. Writes from any caller other than [`AUTHORITY`] are
/// refused, leave the stored transform untouched and mark the entity
/// desynchronized until the next authorized sync.
#[derive(Debug, Default)]
pub struct TransformAuthority {
    records: HashMap<Entity, TransformRecord>,
}

impl TransformAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount(&mut self, entity: Entity, position: Vec2) {
        self.records.insert(
            entity,
            TransformRecord {
                transform: Transform2D::new(position),
                is_synchronized: true,
                last_error: None,
            },
        );
    }

    pub fn unmount(&mut self, entity: Entity) -> bool {
        self.records.remove(&entity).is_some()
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.records.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn transform(&self, entity: Entity) -> Option<Transform2D> {
        self.records.get(&entity).map(|r| r.transform)
    }

    pub fn get_position(&self, entity: Entity) -> Option<Vec2> {
        self.records.get(&entity).map(|r| r.transform.position)
    }

    pub fn get_rotation(&self, entity: Entity) -> Option<f32> {
        self.records.get(&entity).map(|r| r.transform.rotation)
    }

    pub fn get_scale(&self, entity: Entity) -> Option<Vec2> {
        self.records.get(&entity).map(|r| r.transform.scale)
    }

    pub fn is_synchronized(&self, entity: Entity) -> bool {
        self.records.get(&entity).is_some_and(|r| r.is_synchronized)
    }

    pub fn last_error(&self, entity: Entity) -> Option<PositionAccessViolation> {
        self.records.get(&entity).and_then(|r| r.last_error.clone())
    }

    /// Publish a position computed by the coordinator.
    pub fn sync_with_physics(
        &mut self,
        entity: Entity,
        position: Vec2,
        caller: &str,
    ) -> Result<(), PositionAccessViolation> {
        self.authorize(entity, caller, "position")?;
        match self.records.get_mut(&entity) {
            Some(record) => {
                record.transform.position = position;
                record.is_synchronized = true;
                record.last_error = None;
            }
            None => self.mount(entity, position),
        }
        Ok(())
    }

    pub fn set_rotation(
        &mut self,
        entity: Entity,
        rotation: f32,
        caller: &str,
    ) -> Result<(), PositionAccessViolation> {
        self.authorize(entity, caller, "rotation")?;
        if let Some(record) = self.records.get_mut(&entity) {
            record.transform.rotation = rotation;
        }
        Ok(())
    }

    pub fn set_scale(
        &mut self,
        entity: Entity,
        scale: Vec2,
        caller: &str,
    ) -> Result<(), PositionAccessViolation> {
        self.authorize(entity, caller, "scale")?;
        if let Some(record) = self.records.get_mut(&entity) {
            record.transform.scale = scale;
        }
        Ok(())
    }

    /// Refuse `caller` unless it is the authority, recording the violation.
    pub fn authorize(
        &mut self,
        entity: Entity,
        caller: &str,
        field: &'static str,
    ) -> Result<(), PositionAccessViolation> {
        if caller == AUTHORITY {
            return Ok(());
        }
        let violation = PositionAccessViolation {
            entity,
            caller: caller.to_owned(),
            field,
            kind: ViolationKind::UnauthorizedWrite,
        };
        log::warn!("{violation}");
        if let Some(record) = self.records.get_mut(&entity) {
            record.is_synchronized = false;
            record.last_error = Some(violation.clone());
        }
        Err(violation)
    }
}

impl PositionProvider for TransformAuthority {
    fn position_of(&self, entity: Entity) -> Option<Vec2> {
        self.get_position(entity)
    }
}

/// Render position `alpha` of the way from the previous step to the current one.
pub fn interpolate(previous: Vec2, current: Vec2, alpha: f32) -> Vec2 {
    previous.lerp(current, alpha.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mounted() -> (TransformAuthority, Entity) {
        let mut world = hecs::World::new();
        let e = world.spawn(());
        let mut authority = TransformAuthority::new();
        authority.mount(e, Vec2::new(10.0, 20.0));
        (authority, e)
    }

    #[test]
    fn authority_sync_updates_position() {
        let (mut authority, e) = mounted();
        authority
            .sync_with_physics(e, Vec2::new(11.0, 20.0), AUTHORITY)
            .unwrap();
        assert_eq!(authority.get_position(e), Some(Vec2::new(11.0, 20.0)));
        assert!(authority.is_synchronized(e));
    }

    #[test]
    fn foreign_write_is_refused_and_desyncs() {
        let (mut authority, e) = mounted();
        let err = authority
            .sync_with_physics(e, Vec2::ZERO, "MovementSystem")
            .unwrap_err();
        assert_eq!(err.kind, ViolationKind::UnauthorizedWrite);
        assert_eq!(err.caller, "MovementSystem");
        assert_eq!(authority.get_position(e), Some(Vec2::new(10.0, 20.0)));
        assert!(!authority.is_synchronized(e));
        assert_eq!(authority.last_error(e), Some(err));

        // The next authorized sync clears the diagnostic.
        authority
            .sync_with_physics(e, Vec2::new(10.0, 21.0), AUTHORITY)
            .unwrap();
        assert!(authority.is_synchronized(e));
        assert!(authority.last_error(e).is_none());
    }

    #[test]
    fn rotation_and_scale_share_the_check() {
        let (mut authority, e) = mounted();
        assert!(authority.set_scale(e, Vec2::splat(2.0), "Renderer").is_err());
        assert_eq!(authority.get_scale(e), Some(Vec2::ONE));
        authority.set_rotation(e, 0.5, AUTHORITY).unwrap();
        assert_eq!(authority.get_rotation(e), Some(0.5));
    }

    #[test]
    fn reads_are_copies() {
        let (authority, e) = mounted();
        let mut copy = authority.transform(e).unwrap();
        copy.position = Vec2::splat(-99.0);
        assert_eq!(authority.position_of(e), Some(Vec2::new(10.0, 20.0)));
    }

    #[test]
    fn interpolation_clamps_alpha() {
        let a = Vec2::ZERO;
        let b = Vec2::new(10.0, 0.0);
        assert_eq!(interpolate(a, b, 0.5), Vec2::new(5.0, 0.0));
        assert_eq!(interpolate(a, b, 2.0), b);
    }
}
