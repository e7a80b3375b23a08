//! Per-direction reliable-transport reassembler (§4.3).

mod kcp_engine;

pub use kcp_engine::KCP_OVERHEAD;
use kcp_engine::KcpEngine;

use std::time::Instant;

use crate::error::{ReliquaryError, Result};
use crate::segment::reformat_segments;

/// Receive window used by both directions' reassemblers (§3).
const WINDOW_SIZE: u32 = 1024;

/// Owns one direction's reassembler instance: its conversation id, the
/// receive-only KCP engine, and a monotonic virtual clock anchored at
/// creation time.
pub struct ReassemblerInstance {
    conv_id: u32,
    engine: KcpEngine,
    start: Instant,
    last_elapsed_ms: u64,
}

impl ReassemblerInstance {
    /// Create a new instance from the first segment observed on a
    /// direction. Fails if the segment is too short to even read a
    /// conversation id plus one header (§4.8 step 4a).
    pub fn new(first_segment: &[u8]) -> Result<Self> {
        if first_segment.len() < KCP_OVERHEAD + 1 {
            return Err(ReliquaryError::SegmentTooShort {
                got: first_segment.len(),
                need: KCP_OVERHEAD + 1,
            });
        }
        let conv_id = conversation_id(first_segment);
        tracing::trace!(conv_id, len = first_segment.len(), "creating new reassembler");
        Ok(Self {
            conv_id,
            engine: KcpEngine::new(conv_id, WINDOW_SIZE),
            start: Instant::now(),
            last_elapsed_ms: 0,
        })
    }

    /// Feed one wire-level segment batch. Returns the whole application
    /// messages that became available, in order, or an empty vector if more
    /// segments are needed.
    pub fn accept(&mut self, segment: &[u8]) -> Result<Vec<Vec<u8>>> {
        if segment.len() < KCP_OVERHEAD + 1 {
            return Err(ReliquaryError::SegmentTooShort {
                got: segment.len(),
                need: KCP_OVERHEAD + 1,
            });
        }

        let conv_id = conversation_id(segment);
        if conv_id != self.conv_id {
            return Err(ReliquaryError::ForeignConversation {
                expected: self.conv_id,
                got: conv_id,
            });
        }

        let reformatted = reformat_segments(segment);
        if !self.engine.input(&reformatted) {
            tracing::warn!(conv_id, "could not input to reassembler");
        }

        self.advance_clock();

        let mut out = Vec::new();
        while let Some(message) = self.engine.recv() {
            out.push(message);
        }
        Ok(out)
    }

    /// Conversation id this instance is bound to.
    pub fn conv_id(&self) -> u32 {
        self.conv_id
    }

    fn advance_clock(&mut self) {
        let elapsed_ms = self.start.elapsed().as_millis() as u64;
        if elapsed_ms < self.last_elapsed_ms {
            panic!(
                "clock regression in reassembler: {elapsed_ms}ms < previous {}ms",
                self.last_elapsed_ms
            );
        }
        self.last_elapsed_ms = elapsed_ms;
    }
}

fn conversation_id(segment: &[u8]) -> u32 {
    u32::from_le_bytes(segment[0..4].try_into().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire_segment(conv: u32, sn: u32, frg: u8, content: &[u8]) -> Vec<u8> {
        // conv(4) || extra(4, discarded) || cmd(1) frg(1) wnd(2) ts(4) sn(4) una(4) len(4) || content
        let mut seg = Vec::new();
        seg.extend_from_slice(&conv.to_le_bytes());
        seg.extend_from_slice(&[0xAA; 4]); // extra, discarded by reformatter
        seg.push(81); // CMD_PUSH
        seg.push(frg);
        seg.extend_from_slice(&0u16.to_le_bytes());
        seg.extend_from_slice(&0u32.to_le_bytes());
        seg.extend_from_slice(&sn.to_le_bytes());
        seg.extend_from_slice(&0u32.to_le_bytes());
        seg.extend_from_slice(&(content.len() as u32).to_le_bytes());
        seg.extend_from_slice(content);
        seg
    }

    #[test]
    fn creation_fails_on_too_short_segment() {
        let err = ReassemblerInstance::new(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, ReliquaryError::SegmentTooShort { .. }));
    }

    #[test]
    fn accepts_segment_and_returns_whole_message() {
        let seg = wire_segment(42, 0, 0, b"payload");
        let mut reasm = ReassemblerInstance::new(&seg).unwrap();
        let messages = reasm.accept(&seg).unwrap();
        assert_eq!(messages, vec![b"payload".to_vec()]);
    }

    #[test]
    fn s5_conversation_id_stickiness() {
        let seg = wire_segment(1, 0, 0, b"a");
        let mut reasm = ReassemblerInstance::new(&seg).unwrap();
        let other = wire_segment(2, 0, 0, b"b");
        let err = reasm.accept(&other).unwrap_err();
        assert!(matches!(
            err,
            ReliquaryError::ForeignConversation {
                expected: 1,
                got: 2
            }
        ));
    }

    #[test]
    fn no_whole_message_yields_empty_continue() {
        let seg = wire_segment(9, 0, 1, b"partial");
        let mut reasm = ReassemblerInstance::new(&seg).unwrap();
        let messages = reasm.accept(&seg).unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn accept_fails_on_too_short_segment_instead_of_panicking() {
        let seg = wire_segment(1, 0, 0, b"a");
        let mut reasm = ReassemblerInstance::new(&seg).unwrap();
        let err = reasm.accept(&[0u8; 3]).unwrap_err();
        assert!(matches!(err, ReliquaryError::SegmentTooShort { got: 3, .. }));
    }
}
