use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::movement::effects::StatusEffects;

/// Discrete movement state derived from the physical state each tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveState {
    Idle,
    Walking,
    Running,
    Sprinting,
    Jumping,
    Falling,
    Crouching,
    Sliding,
    Climbing,
    Swimming,
    Flying,
}

// PlayerState is the complete serializable physical state of one player at
// one sequence point. The server's copy is the authority; clients carry a
// predicted copy per buffered input.
//
// Invariants: position and velocity components are always finite; air_time
// is Some iff not grounded; ground_normal is Some iff grounded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub sequence: u64,
    pub timestamp: f64,
    pub position: DVec3,
    pub velocity: DVec3,
    pub acceleration: DVec3,
    pub rotation: DQuat,
    pub move_state: MoveState,
    pub grounded: bool,
    pub ground_normal: Option<DVec3>,
    pub air_time: Option<f64>,
    /// Carried through untouched; owned by gameplay systems.
    pub health: f64,
    /// Read-only inside the simulator; owned by gameplay systems.
    pub effects: StatusEffects,
}

impl PlayerState {
    /// Idle grounded state standing on flat ground at the given position.
    pub fn spawn_at(position: DVec3) -> PlayerState {
        PlayerState {
            sequence: 0,
            timestamp: 0.0,
            position,
            velocity: DVec3::ZERO,
            acceleration: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
            move_state: MoveState::Idle,
            grounded: true,
            ground_normal: Some(DVec3::Y),
            air_time: None,
            health: 100.0,
            effects: StatusEffects::default(),
        }
    }

    /// Speed in the x/z plane only; vertical velocity never counts.
    pub fn horizontal_speed(&self) -> f64 {
        DVec3::new(self.velocity.x, 0.0, self.velocity.z).length()
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        PlayerState::spawn_at(DVec3::ZERO)
    }
}

/// Changed-field bits for delta snapshots.
pub mod delta_fields {
    pub const POSITION: u16 = 1 << 0;
    pub const VELOCITY: u16 = 1 << 1;
    pub const ACCELERATION: u16 = 1 << 2;
    pub const ROTATION: u16 = 1 << 3;
    pub const MOVE_STATE: u16 = 1 << 4;
    pub const GROUNDED: u16 = 1 << 5;
    pub const AIR_TIME: u16 = 1 << 6;
    pub const HEALTH: u16 = 1 << 7;
    pub const EFFECTS: u16 = 1 << 8;
}

/// A state update encoding only the fields that changed since a prior
/// broadcast snapshot, keyed by the bitmask above.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StateDelta {
    pub sequence: u64,
    pub timestamp: f64,
    pub mask: u16,
    pub position: Option<DVec3>,
    pub velocity: Option<DVec3>,
    pub acceleration: Option<DVec3>,
    pub rotation: Option<DQuat>,
    pub move_state: Option<MoveState>,
    pub grounded: Option<bool>,
    pub ground_normal: Option<DVec3>,
    pub air_time: Option<f64>,
    pub health: Option<f64>,
    pub effects: Option<StatusEffects>,
}

impl StateDelta {
    /// Encode the fields of `next` that differ from `prev`.
    pub fn diff(prev: &PlayerState, next: &PlayerState) -> StateDelta {
        let mut delta = StateDelta {
            sequence: next.sequence,
            timestamp: next.timestamp,
            mask: 0,
            position: None,
            velocity: None,
            acceleration: None,
            rotation: None,
            move_state: None,
            grounded: None,
            ground_normal: None,
            air_time: None,
            health: None,
            effects: None,
        };

        if next.position != prev.position {
            delta.mask |= delta_fields::POSITION;
            delta.position = Some(next.position);
        }
        if next.velocity != prev.velocity {
            delta.mask |= delta_fields::VELOCITY;
            delta.velocity = Some(next.velocity);
        }
        if next.acceleration != prev.acceleration {
            delta.mask |= delta_fields::ACCELERATION;
            delta.acceleration = Some(next.acceleration);
        }
        if next.rotation != prev.rotation {
            delta.mask |= delta_fields::ROTATION;
            delta.rotation = Some(next.rotation);
        }
        if next.move_state != prev.move_state {
            delta.mask |= delta_fields::MOVE_STATE;
            delta.move_state = Some(next.move_state);
        }
        if next.grounded != prev.grounded || next.ground_normal != prev.ground_normal {
            delta.mask |= delta_fields::GROUNDED;
            delta.grounded = Some(next.grounded);
            delta.ground_normal = next.ground_normal;
        }
        if next.air_time != prev.air_time {
            delta.mask |= delta_fields::AIR_TIME;
            delta.air_time = next.air_time;
        }
        if next.health != prev.health {
            delta.mask |= delta_fields::HEALTH;
            delta.health = Some(next.health);
        }
        if next.effects != prev.effects {
            delta.mask |= delta_fields::EFFECTS;
            delta.effects = Some(next.effects.clone());
        }

        delta
    }

    /// Overlay this delta onto the snapshot it was diffed against.
    pub fn apply_to(&self, base: &PlayerState) -> PlayerState {
        let mut state = base.clone();
        state.sequence = self.sequence;
        state.timestamp = self.timestamp;

        if self.mask & delta_fields::POSITION != 0 {
            if let Some(position) = self.position {
                state.position = position;
            }
        }
        if self.mask & delta_fields::VELOCITY != 0 {
            if let Some(velocity) = self.velocity {
                state.velocity = velocity;
            }
        }
        if self.mask & delta_fields::ACCELERATION != 0 {
            if let Some(acceleration) = self.acceleration {
                state.acceleration = acceleration;
            }
        }
        if self.mask & delta_fields::ROTATION != 0 {
            if let Some(rotation) = self.rotation {
                state.rotation = rotation;
            }
        }
        if self.mask & delta_fields::MOVE_STATE != 0 {
            if let Some(move_state) = self.move_state {
                state.move_state = move_state;
            }
        }
        if self.mask & delta_fields::GROUNDED != 0 {
            if let Some(grounded) = self.grounded {
                state.grounded = grounded;
            }
            state.ground_normal = self.ground_normal;
        }
        if self.mask & delta_fields::AIR_TIME != 0 {
            state.air_time = self.air_time;
        }
        if self.mask & delta_fields::HEALTH != 0 {
            if let Some(health) = self.health {
                state.health = health;
            }
        }
        if self.mask & delta_fields::EFFECTS != 0 {
            if let Some(effects) = &self.effects {
                state.effects = effects.clone();
            }
        }

        state
    }
}
