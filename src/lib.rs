//! A passive, directional UDP packet-sniffing pipeline.
//!
//! This crate reconstructs an application-layer command stream from
//! captured UDP traffic belonging to one observed connection: it
//! demultiplexes two opposing directions by port, feeds a reliable-transport
//! reassembler (a receive-only, headless port of the KCP wire protocol)
//! over each direction, decrypts the resulting application payloads with a
//! stream key that is itself discovered from the decrypted traffic, frames
//! individual commands out of the decrypted byte stream, and dispatches
//! each command to caller-registered handlers after schema-driven decoding.
//!
//! The actual capture source (offline file or live interface), the BPF
//! filter, and the schema registry mapping command ids to message types are
//! external collaborators. This crate consumes an iterator of captured
//! packets and yields a sequence of typed command events.
//!
//! # Example
//!
//! ```no_run
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! use reliquary_core::{CapturedPacket, Key, PacketOutcome, Session};
//! # use reliquary_core::{DecodedMessage, SchemaDecodeError, SchemaRegistry};
//! # struct DemoSchema;
//! # impl SchemaRegistry for DemoSchema {
//! #     fn name_for(&self, _id: u16) -> Option<String> { None }
//! #     fn contains(&self, _id: u16) -> bool { false }
//! #     fn decode(&self, _id: u16, _payload: &[u8]) -> Result<DecodedMessage, SchemaDecodeError> { unimplemented!() }
//! #     fn token_response_id(&self) -> u16 { 0 }
//! #     fn decode_secret_key_seed(&self, _payload: &[u8]) -> Result<u64, SchemaDecodeError> { unimplemented!() }
//! # }
//!
//! let initial_keys: BTreeMap<u32, Key> = BTreeMap::new();
//! let mut session = Session::new(initial_keys, 0xDEAD_BEEF, Arc::new(DemoSchema));
//!
//! for packet in std::iter::empty::<CapturedPacket>() {
//!     match session.read_packet(&packet) {
//!         Ok(PacketOutcome::Commands(batch)) => {
//!             println!("{:?} carried {} commands", batch.direction, batch.commands.len());
//!         }
//!         Ok(_) => {}
//!         Err(err) => eprintln!("packet error: {err}"),
//!     }
//! }
//! ```

pub mod capture;
pub mod cipher;
pub mod classifier;
pub mod dispatcher;
pub mod error;
pub mod framer;
pub mod key_derivation;
pub mod key_oracle;
pub mod reassembler;
pub mod schema;
pub mod segment;
pub mod session;
pub mod types;

pub use capture::{CapturedPacket, UdpLayer};
pub use cipher::Key;
pub use dispatcher::{CommandHandler, Dispatcher};
pub use error::{ReliquaryError, Result};
pub use key_derivation::derive_session_key;
pub use key_oracle::{InitialKeyResolver, MagicProbeResolver};
pub use schema::{DecodedMessage, SchemaDecodeError, SchemaRegistry};
pub use session::Session;
pub use types::{
    CommandsBatch, ConnectionEvent, ConnectionEventKind, Direction, GameCommand, HandlerError,
    PacketOutcome, KNOWN_PORTS, PCAP_FILTER,
};
