use serde::{Deserialize, Serialize};

/// Tunable physics and networking constants shared by client and server.
///
/// This is pure data with no behavior of its own; both roles must run the
/// simulator with an identical copy or prediction will diverge every tick.
/// Deserializable so a deployment can override individual fields from yaml.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    // Physics
    pub gravity: f64,
    pub ground_friction: f64,
    pub air_friction: f64,
    pub max_ground_speed: f64,
    pub max_run_speed: f64,
    pub max_sprint_speed: f64,
    pub max_air_speed: f64,
    pub walk_speed: f64,
    pub ground_acceleration: f64,
    pub air_acceleration: f64,
    pub jump_height: f64,
    pub step_height: f64,
    pub slope_limit: f64,
    pub air_control_ratio: f64,
    pub turn_rate: f64,

    // Tick rates (Hz)
    pub server_tick_rate: f64,
    pub client_tick_rate: f64,

    // Interpolation of remote entities
    pub interpolation_delay: f64,
    pub extrapolation_limit: f64,

    // Prediction-error thresholds
    pub position_error_threshold: f64,
    pub rotation_error_threshold: f64,
    pub teleport_threshold: f64,
    pub max_speed_tolerance: f64,

    // Buffer sizing
    pub input_buffer_size: usize,
    pub state_buffer_size: usize,
    pub position_history_size: usize,
    pub input_retention_secs: f64,

    /// Server ticks between state broadcasts.
    pub snapshot_rate: u64,
}

impl Default for MovementConfig {
    fn default() -> Self {
        MovementConfig {
            gravity: 20.0,
            ground_friction: 6.0,
            air_friction: 0.2,
            max_ground_speed: 6.0,
            max_run_speed: 7.0,
            max_sprint_speed: 10.0,
            max_air_speed: 8.0,
            walk_speed: 3.0,
            ground_acceleration: 10.0,
            air_acceleration: 2.0,
            jump_height: 1.2,
            step_height: 0.35,
            slope_limit: 0.7,
            air_control_ratio: 0.5,
            turn_rate: 10.0,

            server_tick_rate: 30.0,
            client_tick_rate: 60.0,

            interpolation_delay: 0.1,
            extrapolation_limit: 0.25,

            position_error_threshold: 0.05,
            rotation_error_threshold: 0.1,
            teleport_threshold: 5.0,
            max_speed_tolerance: 1.1,

            input_buffer_size: 128,
            state_buffer_size: 32,
            position_history_size: 64,
            input_retention_secs: 1.0,

            snapshot_rate: 2,
        }
    }
}

impl MovementConfig {
    /// Fixed timestep of one client tick.
    pub fn client_tick_seconds(&self) -> f64 {
        1.0 / self.client_tick_rate
    }

    /// Fixed timestep of one server tick.
    pub fn server_tick_seconds(&self) -> f64 {
        1.0 / self.server_tick_rate
    }
}
