use std::collections::VecDeque;

use glam::DVec3;
use tracing::{debug, info};

use strider_core::movement::{
    simulate, validate, InputCommand, MovementConfig, PlayerState, StateDelta, StatusEffects,
    WorldQuery,
};
use strider_core::networking::{ClientBoundPacket, CorrectionReason, ServerCorrection};
use strider_core::PlayerID;

/// Broadcasts between full snapshots; everything in between is a delta.
const FULL_SNAPSHOT_EVERY: u64 = 10;

/// Authoritative per-connection movement state. Each session is owned
/// exclusively by its connection's processing path, so the simulate call
/// needs no locks.
pub struct PlayerSession {
    pub player_id: PlayerID,
    pub state: PlayerState,
    last_good: PlayerState,
    last_applied_sequence: u64,
    position_history: VecDeque<DVec3>,
    last_broadcast: Option<PlayerState>,
    broadcast_count: u64,

    // Diagnostics: every ignored or rejected input is counted, never
    // silently discarded.
    pub stale_inputs: u64,
    pub rejected_inputs: u64,
    pub checksum_mismatches: u64,
}

impl PlayerSession {
    pub fn new(player_id: PlayerID, spawn: DVec3) -> PlayerSession {
        let state = PlayerState::spawn_at(spawn);
        PlayerSession {
            player_id,
            last_good: state.clone(),
            state,
            last_applied_sequence: 0,
            position_history: VecDeque::new(),
            last_broadcast: None,
            broadcast_count: 0,
            stale_inputs: 0,
            rejected_inputs: 0,
            checksum_mismatches: 0,
        }
    }

    /// Feed one received command through the shared simulator and validate
    /// the result. Returns the acknowledgment to send back, or None when
    /// the command was stale or malformed (both counted, neither fatal).
    pub fn apply_command(
        &mut self,
        mut command: InputCommand,
        received_at: f64,
        config: &MovementConfig,
        world: &dyn WorldQuery,
    ) -> Option<ClientBoundPacket> {
        if !command.sanitize() {
            self.rejected_inputs += 1;
            debug!(player = self.player_id, "dropping malformed input command");
            return None;
        }

        // Out-of-order and duplicate commands are expected under loss;
        // ignore them without error.
        if command.sequence <= self.last_applied_sequence {
            self.stale_inputs += 1;
            return None;
        }

        if !command.checksum_matches() {
            // a signal worth logging, not proof of tampering
            self.checksum_mismatches += 1;
            debug!(player = self.player_id, sequence = command.sequence, "input checksum mismatch");
        }

        command.server_timestamp = Some(received_at);
        self.last_applied_sequence = command.sequence;

        let next = simulate(&self.state, &command, config, Some(world));

        if !validate(&next, config) {
            self.rejected_inputs += 1;
            info!(
                player = self.player_id,
                sequence = command.sequence,
                "rejecting physically invalid state"
            );
            return Some(self.correction(command.sequence, CorrectionReason::IllegalMove));
        }

        if (next.position - self.state.position).length() > config.teleport_threshold {
            self.rejected_inputs += 1;
            info!(
                player = self.player_id,
                sequence = command.sequence,
                "rejecting teleport-sized displacement"
            );
            return Some(self.correction(command.sequence, CorrectionReason::Teleport));
        }

        self.state = next;
        self.last_good = self.state.clone();
        self.record_position(config);

        Some(ClientBoundPacket::InputAck {
            sequence: command.sequence,
            correction: None,
        })
    }

    /// Gameplay systems changed this player's status effects; the client
    /// must resimulate its pending inputs with the new multipliers.
    pub fn apply_effects(&mut self, effects: StatusEffects) -> ClientBoundPacket {
        self.state.effects = effects;
        self.last_good = self.state.clone();
        self.correction_packet(self.last_applied_sequence, CorrectionReason::EffectApplied)
    }

    /// Next broadcast packet for this player: a full snapshot periodically
    /// and on first send, a changed-field delta otherwise.
    pub fn broadcast_packet(&mut self) -> ClientBoundPacket {
        let full_due =
            self.last_broadcast.is_none() || self.broadcast_count % FULL_SNAPSHOT_EVERY == 0;
        self.broadcast_count += 1;

        let packet = if full_due {
            ClientBoundPacket::Snapshot {
                player: self.player_id,
                state: self.state.clone(),
            }
        } else {
            let previous = self.last_broadcast.as_ref().expect("delta requires a prior snapshot");
            ClientBoundPacket::SnapshotDelta {
                player: self.player_id,
                delta: StateDelta::diff(previous, &self.state),
            }
        };

        self.last_broadcast = Some(self.state.clone());
        packet
    }

    pub fn last_applied_sequence(&self) -> u64 {
        self.last_applied_sequence
    }

    /// Recent authoritative positions, newest last.
    pub fn position_history(&self) -> impl Iterator<Item = &DVec3> {
        self.position_history.iter()
    }

    fn record_position(&mut self, config: &MovementConfig) {
        self.position_history.push_back(self.state.position);
        while self.position_history.len() > config.position_history_size {
            self.position_history.pop_front();
        }
    }

    fn correction(&mut self, sequence: u64, reason: CorrectionReason) -> ClientBoundPacket {
        // The bad delta is not applied; the client resets to the last
        // known-good state and replays from there.
        self.state = self.last_good.clone();
        self.correction_packet(sequence, reason)
    }

    fn correction_packet(&self, sequence: u64, reason: CorrectionReason) -> ClientBoundPacket {
        ClientBoundPacket::InputAck {
            sequence,
            correction: Some(ServerCorrection {
                sequence,
                correct_state: self.last_good.clone(),
                reason,
            }),
        }
    }
}
