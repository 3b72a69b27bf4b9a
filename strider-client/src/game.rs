use std::collections::HashMap;
use std::net::TcpStream;

use glam::{DQuat, DVec3};
use tracing::{debug, info};

use strider_core::movement::{
    simulate, FlatGround, MovementConfig, PlayerState, WorldQuery,
};
use strider_core::networking::{
    ClientBoundPacket, ServerBoundPacket, ServerConnection, ServerCorrection,
};
use strider_core::PlayerID;

use crate::capture::{Controls, InputCapture};
use crate::interpolation::{InterpolationBuffer, RemoteSample};
use crate::prediction::smoothing::BLEND_WINDOW;
use crate::prediction::{divergence, reconcile, CorrectionBlend, InputBuffer, PredictionFrame};

pub struct GameClient {
    connection: ServerConnection,
    config: MovementConfig,
    world: Box<dyn WorldQuery>,
    player_id: Option<PlayerID>,

    capture: InputCapture,
    buffer: InputBuffer,
    predicted: PlayerState,
    blend: Option<CorrectionBlend>,
    clock: f64,

    remote_states: HashMap<PlayerID, PlayerState>,
    remote_poses: HashMap<PlayerID, InterpolationBuffer>,
}

impl GameClient {
    pub fn new(ip_addr: String) -> GameClient {
        let connection = TcpStream::connect(&ip_addr).expect("could not connect to game server");
        info!("game client connected to {ip_addr}");
        GameClient::with_connection(ServerConnection::new(connection))
    }

    /// Same client over an already-established connection; used by tests
    /// and by front ends that manage their own sockets.
    pub fn with_connection(connection: ServerConnection) -> GameClient {
        let config = MovementConfig::default();
        GameClient {
            connection,
            capture: InputCapture::new(&config),
            buffer: InputBuffer::new(&config),
            predicted: PlayerState::default(),
            blend: None,
            clock: 0.0,
            player_id: None,
            world: Box::new(FlatGround),
            remote_states: HashMap::new(),
            remote_poses: HashMap::new(),
            config,
        }
    }

    /// Replace the flat default with the real terrain query. Must match
    /// the server's terrain or every prediction will need correcting.
    pub fn set_world(&mut self, world: Box<dyn WorldQuery>) {
        self.world = world;
    }

    pub fn player_id(&self) -> Option<PlayerID> {
        self.player_id
    }

    pub fn predicted_state(&self) -> &PlayerState {
        &self.predicted
    }

    pub fn dropped_inputs(&self) -> u64 {
        self.buffer.dropped_inputs()
    }

    /// Per-frame pump: capture fixed ticks, predict them locally, flush
    /// them to the server, then fold in whatever the server sent back.
    pub fn update(&mut self, frame_seconds: f64, controls: &Controls) {
        self.clock += frame_seconds;

        for command in self.capture.advance(frame_seconds, self.clock, controls) {
            self.predicted = simulate(&self.predicted, &command, &self.config, Some(&*self.world));
            let mut frame = PredictionFrame::new(command, self.predicted.clone(), self.clock);
            frame.sent = true;
            self.buffer.push(frame);
            self.connection.push_outgoing(ServerBoundPacket::Input(command));
        }
        self.connection.sync_outgoing();

        self.connection.fetch_incoming_packets();
        while let Some(packet) = self.connection.pop_incoming() {
            self.handle_packet(packet);
        }

        self.buffer.trim(self.clock);

        if let Some(blend) = &mut self.blend {
            blend.update(frame_seconds);
            if blend.is_complete() {
                self.blend = None;
            }
        }
    }

    /// Where the renderer should draw the local player: the predicted
    /// position plus any decaying correction offset.
    pub fn render_position(&self) -> DVec3 {
        let offset = self
            .blend
            .as_ref()
            .map_or(DVec3::ZERO, CorrectionBlend::offset);
        self.predicted.position + offset
    }

    /// Where the renderer should draw a remote player, delayed by the
    /// interpolation window.
    pub fn remote_pose(&self, player: PlayerID) -> Option<(DVec3, DQuat)> {
        let render_time = self.clock - self.config.interpolation_delay;
        self.remote_poses
            .get(&player)?
            .sample(render_time, self.config.extrapolation_limit)
    }

    fn handle_packet(&mut self, packet: ClientBoundPacket) {
        match packet {
            ClientBoundPacket::PlayerNumber(player_id) => {
                info!("assigned player number {player_id}");
                self.player_id = Some(player_id);
            }
            ClientBoundPacket::InputAck {
                sequence,
                correction,
            } => {
                self.buffer.acknowledge(sequence);
                if let Some(correction) = correction {
                    self.apply_correction(correction);
                }
            }
            ClientBoundPacket::Snapshot { player, state } => {
                if self.player_id == Some(player) {
                    self.handle_local_snapshot(state);
                } else {
                    self.record_remote(player, state);
                }
            }
            ClientBoundPacket::SnapshotDelta { player, delta } => {
                // A delta without a base is unusable; the next full
                // snapshot restores this player.
                let rebuilt = self
                    .remote_states
                    .get(&player)
                    .map(|base| delta.apply_to(base));
                if let Some(rebuilt) = rebuilt {
                    if self.player_id == Some(player) {
                        self.handle_local_snapshot(rebuilt);
                    } else {
                        self.record_remote(player, rebuilt);
                    }
                }
            }
        }
    }

    /// The server confirmed or corrected our own state at some sequence.
    fn handle_local_snapshot(&mut self, state: PlayerState) {
        self.buffer.acknowledge(state.sequence);

        // Keep a base around to decode subsequent deltas against.
        if let Some(player) = self.player_id {
            self.remote_states.insert(player, state.clone());
        }

        let compared = self
            .buffer
            .frame_at(state.sequence)
            .map(|frame| divergence(&frame.predicted, &state, &self.config));

        match compared {
            Some(Some(reason)) => {
                debug!(sequence = state.sequence, ?reason, "prediction diverged");
                self.apply_correction(ServerCorrection {
                    sequence: state.sequence,
                    correct_state: state,
                    reason,
                });
            }
            Some(None) => {}
            // No frame to compare against: we are behind the server, so
            // its state is strictly newer than anything we predicted.
            None => {
                if state.sequence >= self.capture.last_sequence() {
                    self.predicted = state;
                    self.blend = None;
                }
            }
        }
    }

    fn apply_correction(&mut self, correction: ServerCorrection) {
        let before = self.predicted.position;
        self.predicted = reconcile(
            &correction.correct_state,
            correction.sequence,
            &mut self.buffer,
            &self.config,
            Some(&*self.world),
        );

        // Small residual errors glide away; anything teleport-sized snaps.
        let offset = before - self.predicted.position;
        let error = offset.length();
        if error > 1e-9 && error < self.config.teleport_threshold {
            self.blend = Some(CorrectionBlend::start(offset, BLEND_WINDOW));
        } else {
            self.blend = None;
        }
    }

    fn record_remote(&mut self, player: PlayerID, state: PlayerState) {
        // Sample times come from our own clock; the state's timestamp is
        // the mover's clock and is not comparable to ours.
        let received_at = self.clock;
        let poses = self
            .remote_poses
            .entry(player)
            .or_insert_with(|| InterpolationBuffer::new(&self.config));
        poses.push(RemoteSample::from_state(&state, received_at));
        self.remote_states.insert(player, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn client() -> (GameClient, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let stream = TcpStream::connect(addr).unwrap();
        let (server_side, _) = listener.accept().unwrap();
        let client = GameClient::with_connection(ServerConnection::new(stream));
        (client, server_side)
    }

    #[test]
    fn remote_poses_track_snapshots_from_an_unsynchronized_clock() {
        let (mut client, _server_side) = client();
        client.player_id = Some(0);
        client.clock = 0.05;

        // The mover joined long before us, so its snapshot timestamps sit
        // around 100 seconds while our clock has barely started.
        for i in 0..20 {
            let mut state = PlayerState::default();
            state.timestamp = 100.0 + i as f64 * 0.1;
            state.position = DVec3::new(i as f64, 0.0, 0.0);
            client.record_remote(1, state);
            client.clock += 0.1;
        }

        let (position, _) = client.remote_pose(1).unwrap();
        assert!(
            position.x > 15.0,
            "remote pose lags far behind the newest snapshots (x = {})",
            position.x
        );
    }

    #[test]
    fn snapshot_packets_feed_the_remote_interpolation_buffer() {
        let (mut client, _server_side) = client();
        client.player_id = Some(0);
        client.clock = 1.0;

        let mut state = PlayerState::default();
        state.timestamp = 555.5;
        state.position = DVec3::new(3.0, 0.0, 0.0);
        client.handle_packet(ClientBoundPacket::Snapshot { player: 1, state });

        client.clock += client.config.interpolation_delay;
        let (position, _) = client.remote_pose(1).unwrap();
        assert_eq!(position.x, 3.0);
    }
}
