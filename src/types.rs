//! Core data types shared across the pipeline: direction, connection events,
//! framed commands, and the out-of-band handler error record.

use bytes::Bytes;

/// The known UDP ports the sniffer recognizes as belonging to the observed
/// connection. Direction is derived by matching a packet's port pair against
/// this set (§6 "Known ports").
pub const KNOWN_PORTS: [u16; 2] = [23301, 23302];

/// BPF filter expression an external capture source should apply so only
/// relevant traffic reaches the pipeline. The core never attaches this
/// itself.
pub const PCAP_FILTER: &str = "udp portrange 23301-23302";

/// Which side of the connection a packet belongs to, inferred from UDP port
/// matching against [`KNOWN_PORTS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Destination port is a known port: traffic flowing toward the observed peer.
    Received,
    /// Source port is a known port: traffic flowing away from the observed peer.
    Send,
    /// Neither port matched; direction could not be determined.
    Unknown,
}

impl Direction {
    /// Resolve a direction from a UDP source/destination port pair.
    pub fn from_ports(src_port: u16, dst_port: u16) -> Self {
        if KNOWN_PORTS.contains(&dst_port) {
            Direction::Received
        } else if KNOWN_PORTS.contains(&src_port) {
            Direction::Send
        } else {
            tracing::warn!(src_port, dst_port, "packet found with unknown direction");
            Direction::Unknown
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Received => write!(f, "Received"),
            Direction::Send => write!(f, "Send"),
            Direction::Unknown => write!(f, "Unknown"),
        }
    }
}

/// The kind of non-data connection event a short UDP payload encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEventKind {
    /// Control code `0x000000FF`: a handshake is starting. Resets session state.
    HandshakeRequested,
    /// Any control code other than the handshake and disconnect codes.
    HandshakeEstablished,
    /// Control code `0x00000194` (404): the peer disconnected.
    Disconnected,
}

/// A classified connection-control event, annotated with the direction it
/// was observed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionEvent {
    pub kind: ConnectionEventKind,
    pub direction: Direction,
}

/// The outcome of feeding one captured packet to [`crate::session::Session::read_packet`].
#[derive(Debug)]
pub enum PacketOutcome {
    /// A connection-control event (handshake / disconnect).
    Connection(ConnectionEvent),
    /// A data segment was accepted but did not yet complete a whole message.
    Continue,
    /// One or more whole commands were decoded and dispatched from this packet.
    Commands(CommandsBatch),
}

/// A batch of commands decoded from a single UDP segment, in arrival order.
#[derive(Debug)]
pub struct CommandsBatch {
    pub direction: Direction,
    pub commands: Vec<GameCommand>,
}

/// A single framed game command, as parsed by the command framer (§4.6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameCommand {
    /// Command id (header offset 4..6).
    pub id: u16,
    /// Name resolved via the injected schema registry; empty if the id is unknown.
    pub name: String,
    /// Header-extension length `H` (header offset 6..8).
    pub header_bytes_len: u16,
    /// Payload length `D` (header offset 8..12).
    pub payload_bytes_len: u32,
    /// The payload bytes themselves (length `payload_bytes_len`).
    pub payload_bytes: Bytes,
}

/// A handler or schema-decode failure reported out-of-band, never recovered
/// by the core itself.
#[derive(Debug)]
pub struct HandlerError {
    pub command_id: u16,
    pub error: Box<dyn std::error::Error + Send + Sync>,
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "command {:#06x}: {}", self.command_id, self.error)
    }
}
