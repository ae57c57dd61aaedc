use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::SurfaceOverride;

/// Classification of a contact surface, used for traction and audio cues.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceMaterial {
    /// Not grounded, or the surface could not be resolved.
    #[default]
    None,
    Stone,
    Ice,
    Rubber,
    Metal,
    Wood,
    Grass,
    Water,
    Sand,
    Mud,
}

impl SurfaceMaterial {
    pub const COUNT: usize = 10;

    pub const ALL: [SurfaceMaterial; Self::COUNT] = [
        Self::None,
        Self::Stone,
        Self::Ice,
        Self::Rubber,
        Self::Metal,
        Self::Wood,
        Self::Grass,
        Self::Water,
        Self::Sand,
        Self::Mud,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Stone => "stone",
            Self::Ice => "ice",
            Self::Rubber => "rubber",
            Self::Metal => "metal",
            Self::Wood => "wood",
            Self::Grass => "grass",
            Self::Water => "water",
            Self::Sand => "sand",
            Self::Mud => "mud",
        }
    }
}

impl fmt::Display for SurfaceMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SurfaceMaterial {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown surface material `{s}`"))
    }
}

/// Family of footstep/impact/landing sounds the audio layer should pick from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundClass {
    Silent,
    Hard,
    Slick,
    Bouncy,
    Metallic,
    Wooden,
    Soft,
    Splash,
    Gritty,
    Squelch,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurfaceProperties {
    /// Scales ground acceleration and deceleration. 1.0 = stone.
    pub friction_multiplier: f32,
    pub sound_class: SoundClass,
}

/// Material lookup table, one fixed slot per `SurfaceMaterial`.
#[derive(Clone, Debug)]
pub struct SurfaceCatalog {
    entries: [SurfaceProperties; SurfaceMaterial::COUNT],
}

impl SurfaceCatalog {
    pub fn new() -> Self {
        let entry = |friction_multiplier, sound_class| SurfaceProperties {
            friction_multiplier,
            sound_class,
        };
        Self {
            entries: [
                entry(1.0, SoundClass::Silent),
                entry(1.0, SoundClass::Hard),
                entry(0.1, SoundClass::Slick),
                entry(1.4, SoundClass::Bouncy),
                entry(0.8, SoundClass::Metallic),
                entry(0.9, SoundClass::Wooden),
                entry(0.85, SoundClass::Soft),
                entry(0.4, SoundClass::Splash),
                entry(0.6, SoundClass::Gritty),
                entry(0.5, SoundClass::Squelch),
            ],
        }
    }

    pub fn with_overrides(overrides: &[SurfaceOverride]) -> Self {
        let mut catalog = Self::new();
        for entry in overrides {
            catalog.set(entry.material, entry.properties());
        }
        catalog
    }

    pub fn get(&self, material: SurfaceMaterial) -> SurfaceProperties {
        self.entries[material.index()]
    }

    pub fn set(&mut self, material: SurfaceMaterial, properties: SurfaceProperties) {
        self.entries[material.index()] = properties;
    }

    pub fn friction_multiplier(&self, material: SurfaceMaterial) -> f32 {
        self.get(material).friction_multiplier
    }

    pub fn sound_class(&self, material: SurfaceMaterial) -> SoundClass {
        self.get(material).sound_class
    }

    /// Resolve a level-data surface identifier. Unknown names map to `None`.
    pub fn resolve(&self, identifier: &str) -> SurfaceMaterial {
        identifier.parse().unwrap_or_else(|err| {
            log::debug!("{err}; falling back to `none`");
            SurfaceMaterial::None
        })
    }
}

impl Default for SurfaceCatalog {
    fn default() -> Self {
        Self::new()
    }
}
