use std::io::{Read, Write};

use bincode::{DefaultOptions, Options, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::movement::input::InputCommand;
use crate::movement::state::{PlayerState, StateDelta};
use crate::PlayerID;

/// Why the server rejected or replaced a predicted state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrectionReason {
    PositionError,
    VelocityError,
    RotationError,
    IllegalMove,
    Collision,
    Teleport,
    EffectApplied,
}

/// Produced exclusively by the authoritative stepper, consumed exclusively
/// by client reconciliation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerCorrection {
    pub sequence: u64,
    pub correct_state: PlayerState,
    pub reason: CorrectionReason,
}

#[derive(Serialize, Deserialize)]
pub enum ServerBoundPacket {
    Input(InputCommand),
}

#[derive(Clone, Serialize, Deserialize)]
pub enum ClientBoundPacket {
    /// Which slot this connection owns; sent once on join.
    PlayerNumber(PlayerID),
    /// Every accepted input is acknowledged; a correction rides along when
    /// the resulting state could not be applied as-is.
    InputAck {
        sequence: u64,
        correction: Option<ServerCorrection>,
    },
    Snapshot {
        player: PlayerID,
        state: PlayerState,
    },
    SnapshotDelta {
        player: PlayerID,
        delta: StateDelta,
    },
}

pub trait Packet: Serialize + DeserializeOwned {
    fn parse_packet<R: Read>(reader: &mut R) -> Result<Self> {
        DefaultOptions::new().deserialize_from(reader)
    }
    fn packet_size(&self) -> Result<u64> {
        DefaultOptions::new().serialized_size(self)
    }
    fn write_packet<W: Write>(&self, write: &mut W) -> Result<()> {
        DefaultOptions::new().serialize_into(write, self)
    }
}

impl Packet for ClientBoundPacket {}
impl Packet for ServerBoundPacket {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::input::Buttons;

    #[test]
    fn input_packet_roundtrips_through_the_wire_format() {
        let mut command = InputCommand::new(42, 0.7, 1.0 / 60.0);
        command.buttons = Buttons::FORWARD.with(Buttons::JUMP);
        command.checksum = Some(command.compute_checksum());

        let packet = ServerBoundPacket::Input(command);
        let mut wire = Vec::new();
        packet.write_packet(&mut wire).unwrap();

        let parsed = ServerBoundPacket::parse_packet(&mut wire.as_slice()).unwrap();
        let ServerBoundPacket::Input(parsed) = parsed;
        assert_eq!(parsed.sequence, 42);
        assert_eq!(parsed.buttons, Buttons::FORWARD.with(Buttons::JUMP));
        assert!(parsed.checksum_matches());
    }
}
