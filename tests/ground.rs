mod common;

use aether_physics::{
    AudioCue, BodyDesc, MovementRequest, PhysicsCoordinator, SoundClass, SurfaceMaterial,
};
use common::{stone_level, DT, PLAYER_HALF};
use glam::Vec2;

/// Walk the player off into thin air and let exactly `airborne` seconds pass
/// since the ground was lost.
fn airborne_for(airborne: f32) -> (PhysicsCoordinator, aether_physics::EntityId) {
    let (mut coord, player) = stone_level();
    coord.teleport(player, Vec2::new(5000.0, 74.0)).unwrap();
    coord.step(DT);
    assert!(!coord.is_grounded(player));
    let left_at = coord.ground_info(player).unwrap().last_grounded_time.unwrap();
    assert_eq!(left_at, coord.now());
    coord.step(airborne);
    (coord, player)
}

#[test]
fn coyote_jump_inside_window_succeeds() {
    let (mut coord, player) = airborne_for(0.149);
    assert!(coord.is_effectively_grounded(player));
    assert!(coord.request_movement(player, MovementRequest::jump(player, 520.0)));
    coord.step(DT);
    assert!(coord.get_velocity(player).unwrap().y < 0.0);
}

#[test]
fn coyote_jump_after_window_fails() {
    let (mut coord, player) = airborne_for(0.151);
    assert!(!coord.is_effectively_grounded(player));
    assert!(!coord.request_movement(player, MovementRequest::jump(player, 520.0)));
    assert_eq!(coord.rejection_streak(player), 1);
}

#[test]
fn coyote_window_is_spent_by_one_jump() {
    let (mut coord, player) = airborne_for(0.01);
    assert!(coord.request_movement(player, MovementRequest::jump(player, 520.0)));
    coord.step(0.02);
    // Past the input cooldown but still inside the original window.
    coord.step(0.09);
    assert!(!coord.request_movement(player, MovementRequest::jump(player, 520.0)));
}

#[test]
fn walking_on_stone() {
    let (mut coord, player) = stone_level();
    assert_eq!(coord.get_velocity(player).unwrap(), Vec2::ZERO);

    assert!(coord.request_movement(player, MovementRequest::walk(player, Vec2::new(1.0, 0.0), 200.0)));
    coord.step(DT);

    assert!(coord.get_velocity(player).unwrap().x > 0.0);
    assert_eq!(
        coord.get_current_ground_surface_material(player),
        SurfaceMaterial::Stone
    );
    let cue = coord.surface_audio_query(player, AudioCue::Footstep).unwrap();
    assert_eq!(cue.sound_class, SoundClass::Hard);
}

#[test]
fn ice_is_slower_to_get_going_than_stone() {
    let speed_after_walking = |surface| {
        let mut coord = PhysicsCoordinator::default();
        common::floor(&mut coord, surface);
        let player = common::settled_player(&mut coord, 0.0);
        for _ in 0..3 {
            coord.request_movement(player, MovementRequest::walk(player, Vec2::X, 200.0));
            coord.step(DT);
        }
        coord.get_velocity(player).unwrap().x
    };
    assert!(speed_after_walking(SurfaceMaterial::Ice) < speed_after_walking(SurfaceMaterial::Stone));
}

#[test]
fn edges_are_flagged_near_a_drop_and_cleared_in_the_air() {
    let mut coord = PhysicsCoordinator::default();
    // Top at y = 90, spanning x in [-100, 100].
    coord.spawn(BodyDesc::platform(
        Vec2::new(0.0, 100.0),
        Vec2::new(100.0, 10.0),
        SurfaceMaterial::Grass,
    ));
    let player = common::settled_player(&mut coord, 80.0);

    let edges = coord.edge_state(player);
    assert!(edges.is_near_right_edge);
    assert!(!edges.is_near_left_edge);
    let right = edges.right_edge_distance.unwrap();
    assert!((right - 12.0).abs() < 0.5, "right distance {right}");

    // Step off the right side.
    coord.teleport(player, Vec2::new(300.0, 74.0)).unwrap();
    coord.step(DT);
    assert!(!coord.is_grounded(player));
    // Flags survive briefly...
    assert!(coord.edge_state(player).is_near_right_edge);
    // ...and are gone once the buffer has passed.
    for _ in 0..10 {
        coord.step(DT);
    }
    assert!(!coord.edge_state(player).is_near_any_edge());
}

#[test]
fn seam_between_tiles_is_not_an_edge() {
    let mut coord = PhysicsCoordinator::default();
    for i in 0..4 {
        coord.spawn(BodyDesc::platform(
            Vec2::new(-48.0 + 32.0 * i as f32, 100.0),
            Vec2::new(16.0, 10.0),
            SurfaceMaterial::Stone,
        ));
    }
    let player = coord.spawn(BodyDesc::player(Vec2::new(0.0, 74.0), PLAYER_HALF));
    for _ in 0..30 {
        coord.step(DT);
    }
    assert!(coord.is_grounded(player));
    assert!(!coord.edge_state(player).is_near_any_edge());

    // Walking across the seams never snags.
    for _ in 0..20 {
        coord.request_movement(player, MovementRequest::walk(player, Vec2::X, 100.0));
        coord.step(DT);
        assert!(coord.is_grounded(player));
    }
    assert!(coord.get_velocity(player).unwrap().x > 0.0);
}
