#![allow(dead_code)]

use aether_physics::{BodyDesc, EntityId, PhysicsCoordinator, SurfaceMaterial};
use glam::Vec2;

pub const DT: f32 = 1.0 / 60.0;
pub const PLAYER_HALF: Vec2 = Vec2::new(8.0, 16.0);

/// Floor top at y = 90, spanning x in [-400, 400].
pub fn floor(coord: &mut PhysicsCoordinator, surface: SurfaceMaterial) -> EntityId {
    coord.spawn(BodyDesc::platform(
        Vec2::new(0.0, 100.0),
        Vec2::new(400.0, 10.0),
        surface,
    ))
}

/// A player standing on the floor, already settled for half a second.
pub fn settled_player(coord: &mut PhysicsCoordinator, x: f32) -> EntityId {
    let player = coord.spawn(BodyDesc::player(Vec2::new(x, 74.0), PLAYER_HALF));
    for _ in 0..30 {
        coord.step(DT);
    }
    assert!(coord.is_grounded(player), "player failed to settle");
    player
}

pub fn stone_level() -> (PhysicsCoordinator, EntityId) {
    let mut coord = PhysicsCoordinator::default();
    floor(&mut coord, SurfaceMaterial::Stone);
    let player = settled_player(&mut coord, 0.0);
    (coord, player)
}
