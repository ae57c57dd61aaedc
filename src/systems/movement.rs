use glam::Vec2;

use crate::components::{
    Ability, AbilityTable, MovementCapabilities, MovementRequest, MovementRequestType,
    PhysicsState,
};
use crate::config::MovementConfig;
use crate::engine::input::{Action, KeyPress, RawInput};

/// Read-only view of the entity a request is being built for.
#[derive(Clone, Copy, Debug)]
pub struct ValidationContext<'a> {
    pub state: &'a PhysicsState,
    /// Grounded or inside the coyote window.
    pub effectively_grounded: bool,
    pub now: f64,
}

/// Which of two opposing held inputs wins.
///
/// The most recently pressed one wins. Equal timestamps fall back to
/// registration order: the first one registered wins.
pub fn resolve_opposing(negative: Option<KeyPress>, positive: Option<KeyPress>) -> f32 {
    match (negative, positive) {
        (None, None) => 0.0,
        (Some(_), None) => -1.0,
        (None, Some(_)) => 1.0,
        (Some(n), Some(p)) => {
            if n.pressed_at_ms != p.pressed_at_ms {
                if n.pressed_at_ms > p.pressed_at_ms { -1.0 } else { 1.0 }
            } else if n.sequence < p.sequence {
                -1.0
            } else {
                1.0
            }
        }
    }
}

/// Turns raw intent into capability-checked movement requests.
#[derive(Clone, Debug)]
pub struct MovementValidator {
    jump_speed: f32,
    dash_speed: f32,
    cooldowns: AbilityTable<f64>,
    last_used: AbilityTable<Option<f64>>,
}

impl MovementValidator {
    pub fn new(config: &MovementConfig) -> Self {
        let mut cooldowns = AbilityTable::splat(0.0);
        *cooldowns.get_mut(Ability::Dash) = config.dash_cooldown;
        Self {
            jump_speed: config.jump_speed,
            dash_speed: config.dash_speed,
            cooldowns,
            last_used: AbilityTable::splat(None),
        }
    }

    /// Resolved input direction. Vertical input only counts for climbers.
    pub fn resolve_direction(&self, raw: &RawInput, caps: &MovementCapabilities) -> Vec2 {
        let x = resolve_opposing(raw.left, raw.right);
        let y = if caps.allows(Ability::Climb) {
            resolve_opposing(raw.up, raw.down)
        } else {
            0.0
        };
        Vec2::new(x, y)
    }

    pub fn time_since_last(&self, ability: Ability, now: f64) -> f64 {
        self.last_used
            .get(ability)
            .map_or(f64::INFINITY, |t| now - t)
    }

    pub fn can_jump(&self, caps: &MovementCapabilities, ctx: &ValidationContext) -> bool {
        caps.can_jump && (ctx.effectively_grounded || caps.jumps_remaining > 0)
    }

    pub fn can_dash(&self, caps: &MovementCapabilities, now: f64) -> bool {
        caps.can_dash
            && self.time_since_last(Ability::Dash, now) >= *self.cooldowns.get(Ability::Dash)
    }

    pub fn validate_input_action(
        &self,
        action: Action,
        caps: &MovementCapabilities,
        ctx: &ValidationContext,
    ) -> bool {
        if ctx.state.is_static {
            return false;
        }
        match action {
            Action::MoveLeft | Action::MoveRight => caps.allows(Ability::Walk),
            Action::MoveUp | Action::MoveDown => caps.allows(Ability::Climb),
            Action::Jump => self.can_jump(caps, ctx),
            Action::Dash => self.can_dash(caps, ctx.now),
        }
    }

    /// Check a request built elsewhere against the same rules.
    pub fn validate_request(
        &self,
        request: &MovementRequest,
        caps: &MovementCapabilities,
        ctx: &ValidationContext,
    ) -> bool {
        if ctx.state.is_static || !request.magnitude.is_finite() || !request.direction.is_finite() {
            return false;
        }
        match request.request_type {
            MovementRequestType::Walk => caps.allows(Ability::Walk),
            MovementRequestType::Jump => self.can_jump(caps, ctx),
            MovementRequestType::Dash => self.can_dash(caps, ctx.now),
        }
    }

    /// Every request this frame's input calls for, dash first, then jump, then walk.
    pub fn generate_movement_requests(
        &self,
        raw: &RawInput,
        caps: &MovementCapabilities,
        ctx: &ValidationContext,
    ) -> Vec<MovementRequest> {
        let mut requests = Vec::new();
        if ctx.state.is_static || raw.is_idle() {
            return requests;
        }
        let entity = ctx.state.entity_id;
        let direction = self.resolve_direction(raw, caps);

        if raw.dash_pressed && self.validate_input_action(Action::Dash, caps, ctx) {
            let facing = if direction.x != 0.0 {
                direction.x
            } else if ctx.state.velocity.x < 0.0 {
                -1.0
            } else {
                1.0
            };
            requests.push(MovementRequest::dash(entity, Vec2::new(facing, 0.0), self.dash_speed));
        }
        if raw.jump_pressed && self.validate_input_action(Action::Jump, caps, ctx) {
            requests.push(MovementRequest::jump(entity, self.jump_speed));
        }
        if direction != Vec2::ZERO && caps.allows(Ability::Walk) {
            let strength = raw.strength.clamp(0.0, 1.0);
            requests.push(MovementRequest::walk(entity, direction, caps.max_speed * strength));
        }
        requests
    }

    /// The single most important request, or `None` when there is nothing to do.
    pub fn generate_movement_request(
        &self,
        raw: &RawInput,
        caps: &MovementCapabilities,
        ctx: &ValidationContext,
    ) -> Option<MovementRequest> {
        self.generate_movement_requests(raw, caps, ctx).into_iter().next()
    }

    pub fn record_use(&mut self, ability: Ability, now: f64) {
        *self.last_used.get_mut(ability) = Some(now);
    }

    pub fn reset(&mut self) {
        self.last_used = AbilityTable::splat(None);
    }
}
