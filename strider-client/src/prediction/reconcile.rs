use strider_core::movement::{simulate, MovementConfig, PlayerState, WorldQuery};
use strider_core::networking::CorrectionReason;

use crate::prediction::buffer::InputBuffer;

/// Compare a locally predicted state against the server's authoritative
/// state for the same sequence. None means the prediction held.
pub fn divergence(
    predicted: &PlayerState,
    authoritative: &PlayerState,
    config: &MovementConfig,
) -> Option<CorrectionReason> {
    let position_error = (predicted.position - authoritative.position).length();
    if position_error > config.position_error_threshold {
        return Some(CorrectionReason::PositionError);
    }

    // A velocity this far off becomes a position error within one tick.
    let velocity_threshold = config.position_error_threshold * config.client_tick_rate;
    if (predicted.velocity - authoritative.velocity).length() > velocity_threshold {
        return Some(CorrectionReason::VelocityError);
    }

    if predicted.rotation.angle_between(authoritative.rotation) > config.rotation_error_threshold {
        return Some(CorrectionReason::RotationError);
    }

    None
}

/// Rebuild the current predicted state from an authoritative base by
/// replaying every unacknowledged command newer than the correction's
/// sequence. No input is ever discarded here; each replayed frame's stored
/// prediction is rewritten so later corrections diff against the rebuilt
/// timeline.
pub fn reconcile(
    correct_state: &PlayerState,
    correction_sequence: u64,
    buffer: &mut InputBuffer,
    config: &MovementConfig,
    world: Option<&dyn WorldQuery>,
) -> PlayerState {
    let mut state = correct_state.clone();

    for frame in buffer.pending_after_mut(correction_sequence) {
        state = simulate(&state, &frame.command, config, world);
        frame.last_error = (frame.predicted.position - state.position).length();
        frame.predicted = state.clone();
        frame.corrections += 1;
    }

    state
}
