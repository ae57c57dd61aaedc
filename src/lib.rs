//! Authoritative 2D physics core for a platformer.
//!
//! [`PhysicsCoordinator`] is the only writer of positions and velocities.
//! Everything else reads copies or asks for changes through movement requests.
//! [`PhysicsWorld`] wraps it with input handling and event delivery.

pub mod components;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod events;
pub mod systems;
pub mod world;

pub use components::{
    Ability, BodyDesc, BodyKind, CollisionInfo, CollisionType, EntityId, GroundInfo,
    MovementCapabilities, MovementRequest, MovementRequestType, PhysicsState, PositionProvider,
    SoundClass, SurfaceCatalog, SurfaceMaterial, Transform2D, UP,
};
pub use config::PhysicsConfig;
pub use coordinator::{AudioCue, PhysicsCoordinator, SurfaceAudioCue};
pub use engine::input::{Action, InputEvent, InputState, RawInput};
pub use error::{ConfigError, PhysicsError, PhysicsResult, PositionAccessViolation, ViolationKind};
pub use events::{CollisionEvent, CollisionListener, CollisionNotifier, ListenerError, ListenerId};
pub use systems::{EdgeState, AUTHORITY};
pub use world::{FrameReport, PhysicsWorld};
