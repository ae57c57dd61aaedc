mod collision;
mod ground;
mod guard;
mod movement;
mod physics;
mod transform;

pub use collision::{collision_system, Contact};
pub use ground::{
    average_normal, detect_edges, EdgeDetector, EdgeState, GroundContactTracker, GroundTransition,
    GroundUpdate,
};
pub use guard::AccumulationGuard;
pub use movement::{resolve_opposing, MovementValidator, ValidationContext};
pub use physics::{apply_movement, physics_step, PreviousPosition};
pub use transform::{interpolate, TransformAuthority, AUTHORITY};
