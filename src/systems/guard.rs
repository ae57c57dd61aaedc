use std::collections::VecDeque;

use glam::Vec2;

use crate::components::{Ability, AbilityTable, PhysicsState};
use crate::config::GuardConfig;

/// Window over which `max_inputs_per_second` is counted.
const FREQUENCY_WINDOW: f64 = 1.0;
const TIME_EPSILON: f64 = 1e-9;
/// Velocities below this are snapped to zero so resting bodies stay at rest.
const VELOCITY_SLEEP: f32 = 1e-4;

/// Keeps numeric and input state from accumulating across frames.
///
/// Runs after integration and collision, before the state is published, so no
/// observer ever sees an unclamped velocity or a stale force. Rejected inputs
/// are dropped, never queued.
#[derive(Clone, Debug)]
pub struct AccumulationGuard {
    cooldown: f64,
    max_per_second: u32,
    velocity_clamp: f32,
    history: AbilityTable<VecDeque<f64>>,
}

impl AccumulationGuard {
    pub fn new(config: &GuardConfig) -> Self {
        Self {
            cooldown: config.input_cooldown,
            max_per_second: config.max_inputs_per_second,
            velocity_clamp: config.velocity_safety_clamp,
            history: AbilityTable::default(),
        }
    }

    pub fn prevent_accumulation(&self, mut state: PhysicsState) -> PhysicsState {
        if !state.velocity.is_finite() || !state.acceleration.is_finite() {
            log::warn!(
                "entity {:?}: non-finite kinematics (v={:?}, a={:?}); zeroing",
                state.entity_id,
                state.velocity,
                state.acceleration
            );
            state.velocity = Vec2::ZERO;
        }
        if !state.position.is_finite() {
            log::error!(
                "entity {:?}: non-finite position {:?}; body needs a respawn",
                state.entity_id,
                state.position
            );
        }

        state.velocity = state.velocity.clamp_length_max(self.velocity_clamp);
        if state.velocity.x.abs() < VELOCITY_SLEEP {
            state.velocity.x = 0.0;
        }
        if state.velocity.y.abs() < VELOCITY_SLEEP {
            state.velocity.y = 0.0;
        }

        state.acceleration = Vec2::ZERO;
        state.accumulated_forces = Vec2::ZERO;
        state
    }

    /// Record and accept a firing of `ability` at `now`, or reject it.
    ///
    /// Held abilities (walk, climb) are never throttled. Discrete ones must be
    /// at least `cooldown` apart and at most `max_per_second` per second.
    pub fn is_input_frequency_valid(&mut self, ability: Ability, now: f64) -> bool {
        if !ability.is_discrete() {
            return true;
        }
        let history = self.history.get_mut(ability);
        while history
            .front()
            .is_some_and(|&t| now - t >= FREQUENCY_WINDOW - TIME_EPSILON)
        {
            history.pop_front();
        }

        if let Some(&last) = history.back() {
            if now - last < self.cooldown - TIME_EPSILON {
                return false;
            }
        }
        if history.len() >= self.max_per_second as usize {
            return false;
        }
        history.push_back(now);
        true
    }

    pub fn reset(&mut self) {
        for history in self.history.iter_mut() {
            history.clear();
        }
    }
}
