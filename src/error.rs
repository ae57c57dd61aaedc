use std::path::PathBuf;

use hecs::Entity;

/// What an unauthorized caller tried to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    /// A system other than the coordinator tried to write spatial state.
    UnauthorizedWrite,
}

/// Raised when anything but the coordinator writes position/velocity/transform.
///
/// This is the only error in the crate that callers are expected to treat as a
/// hard failure; everything else degrades to a return value or a default.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("position access violation ({kind:?}): `{caller}` attempted to write {field} of entity {entity:?}")]
pub struct PositionAccessViolation {
    pub entity: Entity,
    pub caller: String,
    pub field: &'static str,
    pub kind: ViolationKind,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum PhysicsError {
    #[error("unknown entity {0:?}")]
    UnknownEntity(Entity),

    #[error(transparent)]
    AccessViolation(#[from] PositionAccessViolation),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type PhysicsResult<T> = Result<T, PhysicsError>;
