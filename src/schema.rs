//! The schema registry seam: command id ↔ message type/name mapping and
//! payload decoding are external collaborators (§3, §4.7, §6). The core
//! only hard-codes one exception — extracting the rekey seed from the
//! designated player-get-token response — and even that goes through a
//! dedicated trait method rather than the general decode path.

use std::any::Any;
use std::fmt;

/// A schema-decoded message handle, passed to [`crate::dispatcher::CommandHandler`]
/// alongside the raw [`crate::types::GameCommand`].
pub type DecodedMessage = Box<dyn Any + Send>;

/// Failure to structurally decode a command payload.
#[derive(Debug)]
pub struct SchemaDecodeError(pub String);

impl fmt::Display for SchemaDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema decode failed: {}", self.0)
    }
}

impl std::error::Error for SchemaDecodeError {}

/// Caller-supplied mapping from command id to message name/decoder.
///
/// The core never hard-codes individual message types; it calls into this
/// trait for naming, presence checks, and decoding, with one dedicated
/// extraction method for the rekey seed (§4.7).
pub trait SchemaRegistry: Send + Sync {
    /// Human-readable name for `id`, if known.
    fn name_for(&self, id: u16) -> Option<String>;

    /// Whether `id` is a recognized command id.
    fn contains(&self, id: u16) -> bool;

    /// Decode `payload` into a typed message handle for the given command id.
    fn decode(&self, id: u16, payload: &[u8]) -> Result<DecodedMessage, SchemaDecodeError>;

    /// The command id of the designated player-get-token response, whose
    /// `secretKeySeed` field drives session-key rekeying (§4.4, §4.7).
    fn token_response_id(&self) -> u16;

    /// Extract the 64-bit rekey seed from a token-response payload, without
    /// going through the general-purpose [`SchemaRegistry::decode`] path.
    fn decode_secret_key_seed(&self, payload: &[u8]) -> Result<u64, SchemaDecodeError>;
}
