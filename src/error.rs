//! Error types for the sniffing pipeline.

use thiserror::Error;

/// Errors that can occur while driving the pipeline.
#[derive(Error, Debug)]
pub enum ReliquaryError {
    /// The captured frame did not carry a UDP layer we could reach.
    #[error("no UDP layer found in captured packet")]
    NoUdpLayer,

    /// A segment classified as data was too short to seed a reassembler.
    #[error("segment too short to start a reassembler: got {got} bytes, need at least {need}")]
    SegmentTooShort { got: usize, need: usize },

    /// A segment's conversation id did not match the reassembler it was fed to.
    #[error("packet not from conversation: expected {expected:#010x}, got {got:#010x}")]
    ForeignConversation { expected: u32, got: u32 },

    /// A decrypted message was too short to contain a command header and tail.
    #[error("header not complete: got {got} bytes, need at least {need}")]
    HeaderIncomplete { got: usize, need: usize },

    /// A connection event type had no handling branch.
    #[error("unhandled packet")]
    UnhandledPacket,
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ReliquaryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReliquaryError::HeaderIncomplete { got: 8, need: 16 };
        assert_eq!(
            format!("{err}"),
            "header not complete: got 8 bytes, need at least 16"
        );
    }

    #[test]
    fn test_foreign_conversation_display() {
        let err = ReliquaryError::ForeignConversation {
            expected: 1,
            got: 2,
        };
        assert!(format!("{err}").contains("packet not from conversation"));
    }
}
