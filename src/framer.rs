//! Frames a decrypted message into a single command record (§4.6).

use bytes::Bytes;

use crate::error::{ReliquaryError, Result};
use crate::schema::SchemaRegistry;
use crate::types::GameCommand;

/// Fixed header length: magic(4) + id(2) + header-ext-len(2) + payload-len(4).
pub const HEADER_LEN: usize = 12;
/// Tail magic length.
pub const TAIL_LEN: usize = 4;
/// Lower bound on a valid framed message (header + tail, zero-length body).
pub const HEADER_OVERHEAD: usize = HEADER_LEN + TAIL_LEN;

/// Parse a decrypted message into a [`GameCommand`].
///
/// The leading and trailing magics are not verified here: key selection
/// having chosen the right key is what makes them correct, and checking
/// them again would only duplicate that decision (§4.6).
pub fn frame_command(message: &[u8], schema: &dyn SchemaRegistry) -> Result<GameCommand> {
    if message.len() < HEADER_OVERHEAD {
        return Err(ReliquaryError::HeaderIncomplete {
            got: message.len(),
            need: HEADER_OVERHEAD,
        });
    }

    let id = read_u16_be(message, 4);
    let header_bytes_len = read_u16_be(message, 6);
    let payload_bytes_len = read_u32_be(message, 8);

    let header_ext_start = HEADER_LEN;
    let payload_start = header_ext_start + header_bytes_len as usize;
    let payload_end = payload_start + payload_bytes_len as usize;

    if message.len() < payload_end + TAIL_LEN {
        return Err(ReliquaryError::HeaderIncomplete {
            got: message.len(),
            need: payload_end + TAIL_LEN,
        });
    }

    let payload_bytes = Bytes::copy_from_slice(&message[payload_start..payload_end]);

    let name = match schema.name_for(id) {
        Some(name) => name,
        None => {
            tracing::warn!(id, "framed command with unknown schema id");
            String::new()
        }
    };

    Ok(GameCommand {
        id,
        name,
        header_bytes_len,
        payload_bytes_len,
        payload_bytes,
    })
}

fn read_u16_be(data: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([data[offset], data[offset + 1]])
}

fn read_u32_be(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DecodedMessage, SchemaDecodeError};

    struct StubRegistry;

    impl SchemaRegistry for StubRegistry {
        fn name_for(&self, id: u16) -> Option<String> {
            if id == 0x1234 {
                Some("PlayerGetTokenScRsp".to_string())
            } else {
                None
            }
        }

        fn contains(&self, id: u16) -> bool {
            id == 0x1234
        }

        fn decode(&self, _id: u16, _payload: &[u8]) -> Result<DecodedMessage, SchemaDecodeError> {
            Ok(Box::new(()))
        }

        fn token_response_id(&self) -> u16 {
            0x1234
        }

        fn decode_secret_key_seed(&self, _payload: &[u8]) -> Result<u64, SchemaDecodeError> {
            Ok(0)
        }
    }

    fn build_message(id: u16, header_ext: &[u8], payload: &[u8]) -> Vec<u8> {
        let mut msg = Vec::new();
        msg.extend_from_slice(&0xDEAD_BEEFu32.to_be_bytes());
        msg.extend_from_slice(&id.to_be_bytes());
        msg.extend_from_slice(&(header_ext.len() as u16).to_be_bytes());
        msg.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        msg.extend_from_slice(header_ext);
        msg.extend_from_slice(payload);
        msg.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
        msg
    }

    #[test]
    fn s7_frames_a_known_command() {
        let msg = build_message(0x1234, &[], b"hello");
        let cmd = frame_command(&msg, &StubRegistry).unwrap();
        assert_eq!(cmd.id, 0x1234);
        assert_eq!(cmd.name, "PlayerGetTokenScRsp");
        assert_eq!(cmd.header_bytes_len, 0);
        assert_eq!(cmd.payload_bytes_len, 5);
        assert_eq!(&cmd.payload_bytes[..], b"hello");
    }

    #[test]
    fn frames_a_command_with_header_extension() {
        let msg = build_message(0x1234, &[1, 2, 3], b"payload-data");
        let cmd = frame_command(&msg, &StubRegistry).unwrap();
        assert_eq!(cmd.header_bytes_len, 3);
        assert_eq!(&cmd.payload_bytes[..], b"payload-data");
    }

    #[test]
    fn unknown_id_yields_empty_name() {
        let msg = build_message(0x9999, &[], b"");
        let cmd = frame_command(&msg, &StubRegistry).unwrap();
        assert_eq!(cmd.name, "");
    }

    #[test]
    fn buffer_shorter_than_header_overhead_fails() {
        let err = frame_command(&[0u8; 15], &StubRegistry).unwrap_err();
        assert!(matches!(err, ReliquaryError::HeaderIncomplete { got: 15, need: 16 }));
    }

    #[test]
    fn truncated_payload_fails() {
        let mut msg = build_message(0x1234, &[], b"hello world");
        msg.truncate(msg.len() - 3);
        let err = frame_command(&msg, &StubRegistry).unwrap_err();
        assert!(matches!(err, ReliquaryError::HeaderIncomplete { .. }));
    }
}
