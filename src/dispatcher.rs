//! Command-id keyed handler registry and payload dispatch (§4.7).

use std::collections::HashMap;
use std::sync::{mpsc, Arc};

use crate::cipher::Key;
use crate::key_derivation::derive_session_key;
use crate::schema::SchemaRegistry;
use crate::types::{GameCommand, HandlerError};

/// A caller-registered callback invoked once per dispatched command.
pub trait CommandHandler: Send {
    /// Handle one decoded command. Any error is reported out-of-band as a
    /// [`HandlerError`] and does not interrupt the batch.
    fn handle(
        &mut self,
        command: &GameCommand,
        message: &dyn std::any::Any,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Maintains the command-id → handler registry and drives schema-based
/// decoding, handler invocation, and the unconditional player-get-token
/// rekey side effect.
pub struct Dispatcher {
    handlers: HashMap<u16, Box<dyn CommandHandler>>,
    schema: Arc<dyn SchemaRegistry>,
    error_tx: mpsc::Sender<HandlerError>,
}

impl Dispatcher {
    pub fn new(schema: Arc<dyn SchemaRegistry>, error_tx: mpsc::Sender<HandlerError>) -> Self {
        Self {
            handlers: HashMap::new(),
            schema,
            error_tx,
        }
    }

    /// The injected schema registry, for callers (e.g. the command framer)
    /// that need name resolution outside of dispatch itself.
    pub fn schema(&self) -> &dyn SchemaRegistry {
        self.schema.as_ref()
    }

    /// Register a handler for `id`. Panics if `id` is not recognized by the
    /// injected schema registry — this is a program error, not a runtime
    /// condition (§4.7).
    pub fn register(&mut self, id: u16, handler: Box<dyn CommandHandler>) {
        if !self.schema.contains(id) {
            panic!("attempted to register a handler for unknown command id {id:#06x}");
        }
        self.handlers.insert(id, handler);
    }

    /// If `command` is the designated player-get-token response, decode its
    /// rekey seed and derive the new session key.
    ///
    /// Callers must invoke this per message, immediately after framing it
    /// and before decrypting any later message in the same batch (§4.7,
    /// §4.8c): the very next message drained from the same reassembler
    /// `accept()` call is encrypted with whatever key this call installs.
    /// `Dispatcher::dispatch`, which runs once over a whole batch, is too
    /// late for that.
    pub fn maybe_rekey(&self, command: &GameCommand) -> Option<Key> {
        if command.id != self.schema.token_response_id() {
            return None;
        }
        match self.schema.decode_secret_key_seed(&command.payload_bytes) {
            Ok(seed) => {
                tracing::debug!(id = command.id, "rekeying session from token response");
                Some(derive_session_key(seed))
            }
            Err(err) => {
                self.report(command.id, Box::new(err));
                None
            }
        }
    }

    /// Dispatch a batch of already-framed (and, where applicable, already
    /// rekeyed) commands to their registered handlers, in order.
    pub fn dispatch(&mut self, commands: &[GameCommand]) {
        for command in commands {
            let Some(handler) = self.handlers.get_mut(&command.id) else {
                continue;
            };

            let decoded = match self.schema.decode(command.id, &command.payload_bytes) {
                Ok(decoded) => decoded,
                Err(err) => {
                    self.report(command.id, Box::new(err));
                    continue;
                }
            };

            if let Err(err) = handler.handle(command, decoded.as_ref()) {
                self.report(command.id, err);
            }
        }
    }

    fn report(&self, command_id: u16, error: Box<dyn std::error::Error + Send + Sync>) {
        let _ = self.error_tx.send(HandlerError { command_id, error });
    }
}
