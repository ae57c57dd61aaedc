use glam::Vec2;
use hecs::Entity;

use crate::config::MovementConfig;

// ---------------------------------------------------------------------------
// Abilities
// ---------------------------------------------------------------------------

/// Closed set of movement abilities. Indexes `AbilityTable`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Ability {
    Walk,
    Jump,
    Dash,
    Climb,
}

impl Ability {
    pub const COUNT: usize = 4;
    pub const ALL: [Ability; Self::COUNT] = [Self::Walk, Self::Jump, Self::Dash, Self::Climb];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Discrete abilities fire once per press and are rate limited.
    /// Walk and climb are held every frame and are not.
    pub fn is_discrete(self) -> bool {
        matches!(self, Self::Jump | Self::Dash)
    }
}

/// Fixed-size per-ability storage.
#[derive(Clone, Debug, PartialEq)]
pub struct AbilityTable<T>([T; Ability::COUNT]);

impl<T: Copy> AbilityTable<T> {
    pub fn splat(value: T) -> Self {
        Self([value; Ability::COUNT])
    }
}

impl<T> AbilityTable<T> {
    pub fn from_fn(mut f: impl FnMut(Ability) -> T) -> Self {
        Self(Ability::ALL.map(&mut f))
    }

    pub fn get(&self, ability: Ability) -> &T {
        &self.0[ability.index()]
    }

    pub fn get_mut(&mut self, ability: Ability) -> &mut T {
        &mut self.0[ability.index()]
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.0.iter_mut()
    }
}

impl<T: Default> Default for AbilityTable<T> {
    fn default() -> Self {
        Self::from_fn(|_| T::default())
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// What an entity is currently allowed to do.
///
/// `jumps_remaining` counts jumps available while airborne: the jump taken from
/// the ground (or inside the coyote window) does not draw from it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MovementCapabilities {
    pub max_speed: f32,
    pub can_move: bool,
    pub can_jump: bool,
    pub can_dash: bool,
    pub can_climb: bool,
    pub max_jumps: u32,
    pub jumps_remaining: u32,
}

impl MovementCapabilities {
    pub fn from_config(config: &MovementConfig) -> Self {
        let mut caps = Self {
            max_speed: config.max_speed,
            can_move: true,
            can_jump: true,
            can_dash: true,
            can_climb: false,
            max_jumps: config.max_jumps,
            jumps_remaining: 0,
        };
        caps.reset_jumps();
        caps
    }

    pub fn reset_jumps(&mut self) {
        self.jumps_remaining = self.max_jumps.saturating_sub(1);
    }

    /// Recompute after a grounded flip. Landing restores the air-jump pool;
    /// leaving the ground changes nothing until a jump is spent.
    pub fn on_grounded_changed(&mut self, grounded: bool) {
        if grounded {
            self.reset_jumps();
        }
    }

    pub fn consume_air_jump(&mut self) -> bool {
        if self.jumps_remaining == 0 {
            return false;
        }
        self.jumps_remaining -= 1;
        true
    }

    pub fn allows(&self, ability: Ability) -> bool {
        match ability {
            Ability::Walk => self.can_move,
            Ability::Jump => self.can_jump,
            Ability::Dash => self.can_dash,
            Ability::Climb => self.can_climb && self.can_move,
        }
    }
}

impl Default for MovementCapabilities {
    fn default() -> Self {
        Self::from_config(&MovementConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MovementRequestType {
    Walk,
    Jump,
    Dash,
}

impl MovementRequestType {
    pub fn ability(self) -> Ability {
        match self {
            Self::Walk => Ability::Walk,
            Self::Jump => Ability::Jump,
            Self::Dash => Ability::Dash,
        }
    }
}

/// A validated wish to move. Lives for one frame at most.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MovementRequest {
    pub entity_id: Entity,
    pub request_type: MovementRequestType,
    /// Unit length, or zero for a jump with no steering.
    pub direction: Vec2,
    /// Target speed for walk/dash, launch speed for jump.
    pub magnitude: f32,
}

impl MovementRequest {
    pub fn walk(entity_id: Entity, direction: Vec2, magnitude: f32) -> Self {
        Self {
            entity_id,
            request_type: MovementRequestType::Walk,
            direction: direction.normalize_or_zero(),
            magnitude,
        }
    }

    pub fn jump(entity_id: Entity, magnitude: f32) -> Self {
        Self {
            entity_id,
            request_type: MovementRequestType::Jump,
            direction: Vec2::ZERO,
            magnitude,
        }
    }

    pub fn dash(entity_id: Entity, direction: Vec2, magnitude: f32) -> Self {
        Self {
            entity_id,
            request_type: MovementRequestType::Dash,
            direction: direction.normalize_or_zero(),
            magnitude,
        }
    }
}

/// Accepted requests waiting for the next integration step.
///
/// Consumed by that step and cleared whether or not it ran, so nothing leaks
/// into the following frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MovementIntent {
    pub walk: Option<(Vec2, f32)>,
    pub jump: Option<f32>,
    pub dash: Option<(Vec2, f32)>,
}

impl MovementIntent {
    pub fn push(&mut self, request: &MovementRequest) {
        match request.request_type {
            MovementRequestType::Walk => self.walk = Some((request.direction, request.magnitude)),
            MovementRequestType::Jump => self.jump = Some(request.magnitude),
            MovementRequestType::Dash => self.dash = Some((request.direction, request.magnitude)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.walk.is_none() && self.jump.is_none() && self.dash.is_none()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
