use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;

use tracing::warn;

use super::Packet;

/// Length-prefixed bincode packets over one TCP stream. Incoming packets
/// queue up until the owner drains them; outgoing packets queue until
/// `sync_outgoing`. Any hard I/O or decode failure marks the connection
/// closed rather than panicking the tick loop.
pub struct Connection<T: Packet, V: Packet> {
    tcp_stream: TcpStream,
    incoming_packets: VecDeque<T>,
    outgoing_packets: VecDeque<V>,
    closed: bool,
    malformed_packets: u64,
}

impl<T: Packet, V: Packet> Connection<T, V> {
    pub fn new(tcp_stream: TcpStream) -> Connection<T, V> {
        // disable the Nagle algorithm to allow for real-time transfers
        tcp_stream
            .set_nodelay(true)
            .expect("could not turn off TCP delay");
        Connection {
            tcp_stream,
            incoming_packets: VecDeque::new(),
            outgoing_packets: VecDeque::new(),
            closed: false,
            malformed_packets: 0,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Packets that failed to decode on this connection so far.
    pub fn malformed_packets(&self) -> u64 {
        self.malformed_packets
    }

    fn set_nonblocking(&self, nonblocking: bool) {
        // losing the socket entirely is handled by the read path
        let _ = self.tcp_stream.set_nonblocking(nonblocking);
    }

    /// Drain the socket into the incoming queue until it would block.
    pub fn fetch_incoming_packets(&mut self) {
        if self.closed {
            return;
        }

        loop {
            // allows us to keep going if there's no new data
            self.set_nonblocking(true);

            // each well-formed packet starts with two bytes carrying the
            // payload size
            let mut buffer: [u8; 2] = [0, 0];
            let packet_size = match self.tcp_stream.read_exact(&mut buffer) {
                Ok(_) => (u16::from(buffer[0]) << 8) | u16::from(buffer[1]),
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("connection lost while polling packets: {e}");
                    self.closed = true;
                    break;
                }
            };

            // we know the size now, so block until the whole payload is here
            self.set_nonblocking(false);
            let mut payload = Read::by_ref(&mut self.tcp_stream).take(u64::from(packet_size));
            match T::parse_packet(&mut payload) {
                Ok(packet) => self.incoming_packets.push_back(packet),
                Err(e) => {
                    // a stream that desyncs once never recovers its framing
                    warn!("dropping undecodable packet ({packet_size} bytes): {e}");
                    self.malformed_packets += 1;
                    self.closed = true;
                    break;
                }
            }
        }
    }

    pub fn pop_incoming(&mut self) -> Option<T> {
        self.incoming_packets.pop_front()
    }

    pub fn push_outgoing(&mut self, packet: V) {
        self.outgoing_packets.push_back(packet);
    }

    /// Send queued packets until exhausted.
    pub fn sync_outgoing(&mut self) {
        if self.closed {
            self.outgoing_packets.clear();
            return;
        }

        self.set_nonblocking(false);
        while let Some(packet) = self.outgoing_packets.pop_front() {
            let written = self.write_one(&packet);
            if let Err(e) = written {
                warn!("connection lost while sending packets: {e}");
                self.closed = true;
                self.outgoing_packets.clear();
                break;
            }
        }
    }

    fn write_one(&mut self, packet: &V) -> std::io::Result<()> {
        let size = packet
            .packet_size()
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;
        self.tcp_stream.write_all(&[(size >> 8) as u8, size as u8])?;
        packet
            .write_packet(&mut self.tcp_stream)
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))
    }
}
