use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

/// Commands claiming a longer step than this are clamped on receipt.
pub const MAX_COMMAND_SECONDS: f64 = 0.25;

/// Pressed-control bit field, one bit per button.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buttons(pub u32);

impl Buttons {
    pub const FORWARD: Buttons = Buttons(1 << 0);
    pub const BACK: Buttons = Buttons(1 << 1);
    pub const LEFT: Buttons = Buttons(1 << 2);
    pub const RIGHT: Buttons = Buttons(1 << 3);
    pub const JUMP: Buttons = Buttons(1 << 4);
    pub const CROUCH: Buttons = Buttons(1 << 5);
    pub const SPRINT: Buttons = Buttons(1 << 6);
    pub const WALK: Buttons = Buttons(1 << 7);
    pub const RUN: Buttons = Buttons(1 << 8);
    pub const USE: Buttons = Buttons(1 << 9);
    pub const ATTACK: Buttons = Buttons(1 << 10);

    pub const NONE: Buttons = Buttons(0);

    pub fn contains(self, other: Buttons) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn with(self, other: Buttons) -> Buttons {
        Buttons(self.0 | other.0)
    }
}

// InputCommand gets sent from the client to the server to inform the
// simulation about what a player is doing; the client also feeds the exact
// same value through its local simulator for prediction.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct InputCommand {
    /// Strictly increasing per connection; the key for buffering and acks.
    pub sequence: u64,
    pub client_timestamp: f64,
    /// Stamped by the server on receipt, never by the sender.
    pub server_timestamp: Option<f64>,
    /// Elapsed seconds this command represents.
    pub delta_time: f64,
    /// Normalized-or-zero world-space direction; when non-negligible it
    /// overrides the directional button flags (point-and-click movement).
    pub move_vector: DVec3,
    pub buttons: Buttons,
    /// Orientation used only to project button flags into world space.
    pub view_angles: DQuat,
    /// Cheap integrity value; a mismatch is a signal, not proof, of tampering.
    pub checksum: Option<u32>,
}

impl InputCommand {
    pub fn new(sequence: u64, client_timestamp: f64, delta_time: f64) -> InputCommand {
        InputCommand {
            sequence,
            client_timestamp,
            server_timestamp: None,
            delta_time,
            move_vector: DVec3::ZERO,
            buttons: Buttons::NONE,
            view_angles: DQuat::IDENTITY,
            checksum: None,
        }
    }

    /// FNV-1a over the bit patterns of every field the sender controls.
    pub fn compute_checksum(&self) -> u32 {
        let mut hash: u32 = 0x811c_9dc5;
        let mut mix = |bits: u64| {
            for byte in bits.to_le_bytes() {
                hash ^= u32::from(byte);
                hash = hash.wrapping_mul(0x0100_0193);
            }
        };
        mix(self.sequence);
        mix(self.client_timestamp.to_bits());
        mix(self.delta_time.to_bits());
        mix(self.move_vector.x.to_bits());
        mix(self.move_vector.y.to_bits());
        mix(self.move_vector.z.to_bits());
        mix(u64::from(self.buttons.0));
        mix(self.view_angles.x.to_bits());
        mix(self.view_angles.y.to_bits());
        mix(self.view_angles.z.to_bits());
        mix(self.view_angles.w.to_bits());
        hash
    }

    pub fn checksum_matches(&self) -> bool {
        match self.checksum {
            Some(sum) => sum == self.compute_checksum(),
            None => true,
        }
    }

    /// Clamp or repair fields so nothing non-finite ever reaches the
    /// simulator. Returns false when the command is beyond repair and must
    /// be dropped.
    pub fn sanitize(&mut self) -> bool {
        if !self.delta_time.is_finite() || self.delta_time <= 0.0 {
            return false;
        }
        self.delta_time = self.delta_time.min(MAX_COMMAND_SECONDS);

        if !self.move_vector.is_finite() {
            self.move_vector = DVec3::ZERO;
        } else if self.move_vector.length_squared() > 1.0 {
            self.move_vector = self.move_vector.normalize();
        }

        if !self.view_angles.is_finite() || self.view_angles.length_squared() < 1e-12 {
            self.view_angles = DQuat::IDENTITY;
        } else {
            self.view_angles = self.view_angles.normalize();
        }

        self.client_timestamp.is_finite()
    }
}
