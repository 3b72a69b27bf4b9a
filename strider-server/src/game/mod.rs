use std::net::TcpListener;
use std::thread;
use std::time::{Duration, Instant};

use glam::DVec3;
use tracing::{info, warn};

use strider_core::movement::MovementConfig;
use strider_core::networking::{ClientBoundPacket, ClientConnection, ServerBoundPacket};
use strider_core::GLOBAL_CONFIG;

use crate::terrain::ServerTerrain;

use self::session::PlayerSession;

pub mod session;

#[cfg(test)]
mod tests;

pub struct GameServer {
    listener: TcpListener,
    connections: Vec<ClientConnection>,
    sessions: Vec<PlayerSession>,
    config: MovementConfig,
    terrain: ServerTerrain,
    started_at: Instant,
    tick: u64,
    next_player_id: usize,
}

impl GameServer {
    pub fn new(ip_addr: String) -> GameServer {
        let listener =
            TcpListener::bind(&ip_addr).expect("could not bind to configured server address");
        listener
            .set_nonblocking(true)
            .expect("could not make listener non-blocking");
        info!("game server now listening on {ip_addr}");

        GameServer {
            listener,
            connections: Vec::new(),
            sessions: Vec::new(),
            config: MovementConfig::default(),
            terrain: ServerTerrain::flat(),
            started_at: Instant::now(),
            tick: 0,
            next_player_id: 0,
        }
    }

    // WARNING: this function never returns
    pub fn start_loop(&mut self) {
        let max_server_tick_duration = Duration::from_millis(GLOBAL_CONFIG.server_tick_ms);

        loop {
            let start_time = Instant::now();

            self.accept_new_connections();

            // poll for input commands and add them to the incoming queues
            self.connections
                .iter_mut()
                .for_each(|con| con.fetch_incoming_packets());

            self.process_incoming_packets();
            self.drop_closed_connections();

            self.tick += 1;
            if self.tick % self.config.snapshot_rate == 0 {
                self.broadcast_snapshots();
            }

            // empty outgoing packet queues and send to clients
            self.connections
                .iter_mut()
                .for_each(|con| con.sync_outgoing());

            // wait out the rest of the tick
            let remaining_tick_duration = max_server_tick_duration
                .checked_sub(start_time.elapsed())
                .unwrap_or(Duration::ZERO);
            thread::sleep(remaining_tick_duration);
        }
    }

    fn accept_new_connections(&mut self) {
        while let Ok((socket, addr)) = self.listener.accept() {
            let player_id = self.next_player_id;
            self.next_player_id += 1;
            info!("new connection from {} as player {player_id}", addr.ip());

            let mut connection = ClientConnection::new(socket);
            connection.push_outgoing(ClientBoundPacket::PlayerNumber(player_id));
            self.connections.push(connection);
            self.sessions
                .push(PlayerSession::new(player_id, DVec3::ZERO));
        }
    }

    // handle every packet in received order, strictly in sequence per
    // connection; each session is only ever touched from here
    fn process_incoming_packets(&mut self) {
        let now = self.started_at.elapsed().as_secs_f64();

        for (connection, session) in self.connections.iter_mut().zip(self.sessions.iter_mut()) {
            while let Some(packet) = connection.pop_incoming() {
                match packet {
                    ServerBoundPacket::Input(command) => {
                        if let Some(reply) =
                            session.apply_command(command, now, &self.config, &self.terrain)
                        {
                            connection.push_outgoing(reply);
                        }
                    }
                }
            }
        }
    }

    // a dropped connection simply stops feeding input
    fn drop_closed_connections(&mut self) {
        let mut index = 0;
        while index < self.connections.len() {
            if self.connections[index].is_closed() {
                let session = self.sessions.remove(index);
                self.connections.remove(index);
                warn!(
                    player = session.player_id,
                    stale = session.stale_inputs,
                    rejected = session.rejected_inputs,
                    "dropping closed connection"
                );
            } else {
                index += 1;
            }
        }
    }

    // queue up the current authoritative state for every observer
    fn broadcast_snapshots(&mut self) {
        let packets: Vec<ClientBoundPacket> = self
            .sessions
            .iter_mut()
            .map(|session| session.broadcast_packet())
            .collect();

        for connection in &mut self.connections {
            for packet in &packets {
                connection.push_outgoing(packet.clone());
            }
        }
    }
}
