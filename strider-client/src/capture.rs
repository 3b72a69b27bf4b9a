use glam::{DQuat, DVec3};

use strider_core::movement::{Buttons, InputCommand, MovementConfig};

/// A render frame longer than this only ever produces a bounded burst of
/// catch-up ticks.
const MAX_FRAME_SECONDS: f64 = 0.25;

/// Raw control state as sampled from whatever input devices the front end
/// exposes. The capture layer turns these into fixed-timestep commands.
#[derive(Clone, Copy, Debug)]
pub struct Controls {
    pub buttons: Buttons,
    pub view_angles: DQuat,
    pub move_vector: DVec3,
}

impl Default for Controls {
    fn default() -> Self {
        Controls {
            buttons: Buttons::NONE,
            view_angles: DQuat::IDENTITY,
            move_vector: DVec3::ZERO,
        }
    }
}

/// Fixed-tick input sampler. Leftover frame time carries over in the
/// accumulator, so every emitted command represents exactly one client
/// tick no matter how irregular the render frame rate is.
pub struct InputCapture {
    tick_seconds: f64,
    accumulator: f64,
    next_sequence: u64,
}

impl InputCapture {
    pub fn new(config: &MovementConfig) -> InputCapture {
        InputCapture {
            tick_seconds: config.client_tick_seconds(),
            accumulator: 0.0,
            next_sequence: 1,
        }
    }

    /// Advance by one render frame, emitting zero or more commands.
    pub fn advance(&mut self, frame_seconds: f64, now: f64, controls: &Controls) -> Vec<InputCommand> {
        self.accumulator += frame_seconds.min(MAX_FRAME_SECONDS);

        let mut commands = Vec::new();
        while self.accumulator >= self.tick_seconds {
            self.accumulator -= self.tick_seconds;

            // Each catch-up tick in a burst gets its own timestamp, one
            // tick apart, so downstream consumers never see time stall.
            let timestamp = now + commands.len() as f64 * self.tick_seconds;
            let mut command = InputCommand::new(self.next_sequence, timestamp, self.tick_seconds);
            self.next_sequence += 1;
            command.buttons = controls.buttons;
            command.view_angles = controls.view_angles;
            command.move_vector = controls.move_vector;
            command.checksum = Some(command.compute_checksum());
            commands.push(command);
        }
        commands
    }

    pub fn last_sequence(&self) -> u64 {
        self.next_sequence - 1
    }
}
