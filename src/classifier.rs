//! Classifies a captured UDP payload into a connection-control event or a
//! data segment, and resolves its direction (§4.1).

use crate::capture::{extract_udp_layer, CapturedPacket};
use crate::error::{ReliquaryError, Result};
use crate::types::{ConnectionEvent, ConnectionEventKind, Direction};

/// Threshold separating connection-control codes from data segments. Bit-exact,
/// must not change: anything at or under this length is inspected as a
/// 4-byte control code, anything longer is treated as segment data.
const CONTROL_MAX_LEN: usize = 20;

const CODE_HANDSHAKE_REQUESTED: u32 = 0x0000_00FF;
const CODE_DISCONNECTED: u32 = 0x0000_0194;

/// The result of classifying one captured packet.
pub enum Classification<'a> {
    Connection(ConnectionEvent),
    SegmentData {
        direction: Direction,
        payload: &'a [u8],
    },
}

/// Classify a captured packet (§4.1).
pub fn classify(packet: &CapturedPacket) -> Result<Classification<'_>> {
    let udp = extract_udp_layer(packet)?;
    let direction = Direction::from_ports(udp.src_port, udp.dst_port);

    if udp.payload.len() <= CONTROL_MAX_LEN {
        let kind = classify_control_code(udp.payload);
        tracing::debug!(?kind, %direction, "classified connection packet");
        return Ok(Classification::Connection(ConnectionEvent {
            kind,
            direction,
        }));
    }

    Ok(Classification::SegmentData {
        direction,
        payload: udp.payload,
    })
}

fn classify_control_code(payload: &[u8]) -> ConnectionEventKind {
    let code = if payload.len() >= 4 {
        u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]])
    } else {
        let mut buf = [0u8; 4];
        buf[4 - payload.len()..].copy_from_slice(payload);
        u32::from_be_bytes(buf)
    };

    match code {
        CODE_HANDSHAKE_REQUESTED => ConnectionEventKind::HandshakeRequested,
        CODE_DISCONNECTED => ConnectionEventKind::Disconnected,
        _ => ConnectionEventKind::HandshakeEstablished,
    }
}
