use crate::movement::config::MovementConfig;
use crate::movement::state::PlayerState;

/// No legal position component may leave this box; anything outside is a
/// teleport hack or an integration blowup, and either way not applyable.
pub const WORLD_BOUND: f64 = 10_000.0;

/// Small slack so a state sitting exactly on the cap still passes.
const SPEED_EPSILON: f64 = 1e-6;

/// Server anti-cheat check, also used by client self-checks in tests.
/// Pure: no side effects, same answer every call.
pub fn validate(state: &PlayerState, config: &MovementConfig) -> bool {
    if !state.position.is_finite() || !state.velocity.is_finite() || !state.rotation.is_finite() {
        return false;
    }

    let speed_cap = config.max_sprint_speed.max(config.max_air_speed)
        * state.effects.speed_multiplier
        * config.max_speed_tolerance;
    if state.horizontal_speed() > speed_cap + SPEED_EPSILON {
        return false;
    }

    state.position.abs().max_element() <= WORLD_BOUND
}
