//! Tunable constants for the physics core.
//!
//! Every value has a default matching the shipped game feel, and every value can
//! be overridden from a TOML file. Sections that are missing from the file keep
//! their defaults.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::components::{SoundClass, SurfaceMaterial, SurfaceProperties};
use crate::error::ConfigError;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub integration: IntegrationConfig,
    pub ground: GroundConfig,
    pub guard: GuardConfig,
    pub movement: MovementConfig,
    /// Per-material overrides applied on top of the built-in surface catalog.
    pub surfaces: Vec<SurfaceOverride>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig {
    /// Downward acceleration in units/s² (+y is down).
    pub gravity: f32,
    /// Per-axis velocity caps applied right after integrating acceleration.
    pub max_velocity: Vec2,
    /// Step length used by `PhysicsCoordinator::update`.
    pub fixed_timestep: f32,
    /// Upper bound on fixed steps per frame so a stalled frame cannot spiral.
    pub max_substeps: u32,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            gravity: 1800.0,
            max_velocity: Vec2::new(400.0, 800.0),
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 8,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundConfig {
    /// Seconds after leaving the ground during which a jump still counts as grounded.
    pub coyote_time: f64,
    /// Horizontal distance to a drop that flags an edge.
    pub edge_threshold: f32,
    /// How long edge flags survive once airborne.
    pub edge_clear_buffer: f64,
    /// Minimum `normal · up` for a contact to count as ground.
    pub ground_normal_threshold: f32,
    /// Vertical slack when deciding whether a platform top supports the feet.
    pub support_tolerance: f32,
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            coyote_time: 0.150,
            edge_threshold: 32.0,
            edge_clear_buffer: 0.1,
            ground_normal_threshold: 0.7,
            support_tolerance: 2.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Minimum spacing between two accepted firings of the same discrete action.
    pub input_cooldown: f64,
    /// Accepted firings of one action allowed inside any one-second window.
    pub max_inputs_per_second: u32,
    /// Hard cap on velocity magnitude, independent of the per-axis caps.
    pub velocity_safety_clamp: f32,
    /// Consecutive rejected requests before the coordinator warns that an entity is unresponsive.
    pub rejection_warn_threshold: u32,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            input_cooldown: 0.100,
            max_inputs_per_second: 10,
            velocity_safety_clamp: 1000.0,
            rejection_warn_threshold: 30,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub max_speed: f32,
    pub walk_acceleration: f32,
    pub ground_deceleration: f32,
    /// Fraction of ground acceleration available while airborne.
    pub air_control: f32,
    pub jump_speed: f32,
    pub dash_speed: f32,
    pub dash_cooldown: f64,
    pub climb_speed: f32,
    /// Jumps available per grounded cycle, including the one taken from the ground.
    pub max_jumps: u32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            max_speed: 200.0,
            walk_acceleration: 2400.0,
            ground_deceleration: 2000.0,
            air_control: 0.5,
            jump_speed: 520.0,
            dash_speed: 400.0,
            dash_cooldown: 0.5,
            climb_speed: 120.0,
            max_jumps: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurfaceOverride {
    pub material: SurfaceMaterial,
    pub friction_multiplier: f32,
    pub sound_class: SoundClass,
}

impl SurfaceOverride {
    pub fn properties(&self) -> SurfaceProperties {
        SurfaceProperties {
            friction_multiplier: self.friction_multiplier,
            sound_class: self.sound_class,
        }
    }
}

impl PhysicsConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        log::info!("loaded physics config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("integration.gravity", self.integration.gravity, true)?;
        positive("integration.max_velocity.x", self.integration.max_velocity.x, false)?;
        positive("integration.max_velocity.y", self.integration.max_velocity.y, false)?;
        positive("integration.fixed_timestep", self.integration.fixed_timestep, false)?;
        if self.integration.max_substeps == 0 {
            return Err(invalid("integration.max_substeps", "must be at least 1"));
        }

        positive("ground.coyote_time", self.ground.coyote_time as f32, true)?;
        positive("ground.edge_threshold", self.ground.edge_threshold, true)?;
        positive("ground.edge_clear_buffer", self.ground.edge_clear_buffer as f32, true)?;
        let threshold = self.ground.ground_normal_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(invalid(
                "ground.ground_normal_threshold",
                format!("{threshold} is outside (0, 1]"),
            ));
        }

        positive("guard.input_cooldown", self.guard.input_cooldown as f32, true)?;
        if self.guard.max_inputs_per_second == 0 {
            return Err(invalid("guard.max_inputs_per_second", "must be at least 1"));
        }
        positive("guard.velocity_safety_clamp", self.guard.velocity_safety_clamp, false)?;

        positive("movement.max_speed", self.movement.max_speed, false)?;
        positive("movement.walk_acceleration", self.movement.walk_acceleration, false)?;
        positive("movement.ground_deceleration", self.movement.ground_deceleration, true)?;
        positive("movement.air_control", self.movement.air_control, true)?;
        positive("movement.jump_speed", self.movement.jump_speed, false)?;
        positive("movement.dash_speed", self.movement.dash_speed, false)?;
        positive("movement.dash_cooldown", self.movement.dash_cooldown as f32, true)?;
        positive("movement.climb_speed", self.movement.climb_speed, true)?;

        for entry in &self.surfaces {
            positive(
                "surfaces.friction_multiplier",
                entry.friction_multiplier,
                true,
            )?;
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn positive(field: &'static str, value: f32, allow_zero: bool) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(invalid(field, "must be finite"));
    }
    if value < 0.0 || (!allow_zero && value == 0.0) {
        return Err(invalid(field, format!("{value} must be positive")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(PhysicsConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = PhysicsConfig::from_toml_str(
            r#"
            [ground]
            coyote_time = 0.2

            [guard]
            max_inputs_per_second = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.ground.coyote_time, 0.2);
        assert_eq!(config.ground.edge_threshold, 32.0);
        assert_eq!(config.guard.max_inputs_per_second, 4);
        assert_eq!(config.integration.max_velocity, Vec2::new(400.0, 800.0));
    }

    #[test]
    fn surface_overrides_parse() {
        let config = PhysicsConfig::from_toml_str(
            r#"
            [[surfaces]]
            material = "ice"
            friction_multiplier = 0.02
            sound_class = "slick"
            "#,
        )
        .unwrap();
        assert_eq!(config.surfaces.len(), 1);
        assert_eq!(config.surfaces[0].material, SurfaceMaterial::Ice);
        assert_eq!(config.surfaces[0].properties().friction_multiplier, 0.02);
        assert_eq!(config.surfaces[0].sound_class, SoundClass::Slick);
    }

    #[test]
    fn rejects_negative_values() {
        let err = PhysicsConfig::from_toml_str("[guard]\nvelocity_safety_clamp = -5.0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "guard.velocity_safety_clamp",
                ..
            }
        ));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = PhysicsConfig::from_toml_str("[ground\ncoyote_time = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
