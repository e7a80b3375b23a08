//! Top-level pipeline owner: the pair of per-direction reassemblers, the
//! current decryption key, and the dispatcher registry (§4.8, §4.9).

use std::collections::BTreeMap;
use std::sync::{mpsc, Arc};

use crate::capture::CapturedPacket;
use crate::cipher::{xor_in_place, Key};
use crate::classifier::{classify, Classification};
use crate::dispatcher::{CommandHandler, Dispatcher};
use crate::error::Result;
use crate::framer::frame_command;
use crate::key_oracle::{InitialKeyResolver, MagicProbeResolver};
use crate::reassembler::ReassemblerInstance;
use crate::schema::SchemaRegistry;
use crate::types::{CommandsBatch, ConnectionEventKind, Direction, HandlerError, PacketOutcome};

/// Owns everything needed to turn a stream of captured packets into a
/// stream of decoded commands for one observed connection.
///
/// Not `Sync` by construction (no internal locking): run one `Session` per
/// worker if captures are processed concurrently (§5).
pub struct Session {
    reasm_send: Option<ReassemblerInstance>,
    reasm_received: Option<ReassemblerInstance>,
    current_key: Option<Key>,
    key_oracle: Box<dyn InitialKeyResolver>,
    dispatcher: Dispatcher,
    error_rx: mpsc::Receiver<HandlerError>,
}

impl Session {
    /// Construct a session from the initial-key registry (probed against
    /// `expected_magic` before a session key exists) and the caller-owned
    /// schema registry.
    pub fn new(
        initial_key_registry: BTreeMap<u32, Key>,
        expected_magic: u32,
        schema: Arc<dyn SchemaRegistry>,
    ) -> Self {
        let (error_tx, error_rx) = mpsc::channel();
        Self {
            reasm_send: None,
            reasm_received: None,
            current_key: None,
            key_oracle: Box::new(MagicProbeResolver::new(initial_key_registry, expected_magic)),
            dispatcher: Dispatcher::new(schema, error_tx),
            error_rx,
        }
    }

    /// Register a handler for `id`, builder-style. Panics if `id` is not
    /// recognized by the injected schema registry.
    pub fn register(&mut self, id: u16, handler: Box<dyn CommandHandler>) -> &mut Self {
        self.dispatcher.register(id, handler);
        self
    }

    /// A lazy iterator of handler/decode failures reported out-of-band.
    /// Never blocks; drains whatever is currently queued.
    pub fn errors(&self) -> impl Iterator<Item = HandlerError> + '_ {
        self.error_rx.try_iter()
    }

    /// Feed one captured packet through the pipeline (§4.8).
    pub fn read_packet(&mut self, packet: &CapturedPacket) -> Result<PacketOutcome> {
        match classify(packet)? {
            Classification::Connection(event) => {
                if event.kind == ConnectionEventKind::HandshakeRequested {
                    self.reset();
                }
                Ok(PacketOutcome::Connection(event))
            }
            Classification::SegmentData { direction, payload } => {
                self.handle_segment(direction, payload)
            }
        }
    }

    fn reset(&mut self) {
        self.reasm_send = None;
        self.reasm_received = None;
        self.current_key = None;
    }

    fn handle_segment(&mut self, direction: Direction, payload: &[u8]) -> Result<PacketOutcome> {
        let slot = self.slot_for(direction);
        if slot.is_none() {
            *slot = Some(ReassemblerInstance::new(payload)?);
        }
        let messages = slot.as_mut().expect("just populated above").accept(payload)?;

        if messages.is_empty() {
            return Ok(PacketOutcome::Continue);
        }

        let mut commands = Vec::with_capacity(messages.len());
        for mut message in messages {
            // Decrypt and frame one message at a time, rather than framing
            // the whole batch before dispatching: a token-response message
            // can rekey mid-batch, and the very next message drained from
            // this same `accept()` call is encrypted with that new key
            // (§4.7, §4.8c). A framing failure drops only this message and
            // does not abort messages already framed or still to come (§7).
            self.decrypt_in_place(&mut message);

            let command = match frame_command(&message, self.dispatcher.schema()) {
                Ok(command) => command,
                Err(err) => {
                    tracing::warn!(%err, "dropping unframeable command from this batch");
                    continue;
                }
            };

            if let Some(new_key) = self.dispatcher.maybe_rekey(&command) {
                self.current_key = Some(new_key);
            }

            commands.push(command);
        }

        self.dispatcher.dispatch(&commands);

        Ok(PacketOutcome::Commands(CommandsBatch { direction, commands }))
    }

    fn slot_for(&mut self, direction: Direction) -> &mut Option<ReassemblerInstance> {
        match direction {
            Direction::Send => &mut self.reasm_send,
            Direction::Received => &mut self.reasm_received,
            Direction::Unknown => {
                panic!("cannot resolve a reassembler for Direction::Unknown")
            }
        }
    }

    fn decrypt_in_place(&mut self, message: &mut [u8]) {
        let key = match &self.current_key {
            Some(key) => key.clone(),
            None => match self.key_oracle.resolve(message) {
                Some(key) => key,
                None => {
                    tracing::warn!("no initial key matched this message's header magic");
                    return;
                }
            },
        };
        xor_in_place(message, &key);
    }
}

#[allow(dead_code)]
fn _assert_send(session: &Session) {
    fn assert_send<T: Send>(_: &T) {}
    assert_send(session);
}
