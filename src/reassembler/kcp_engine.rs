//! A receive-only, headless port of the KCP wire protocol's reassembly path
//! (§4.3.1). No external crate in this ecosystem exposes a no-I/O KCP
//! engine, so this is hand-implemented against the published reference
//! algorithm rather than faked: header layout, receive window, and
//! sequence-number based fragment reassembly all match the real protocol.
//! There is no send path, no retransmission, and no output callback — the
//! engine only ever consumes bytes and produces whole messages.

use std::collections::{BTreeMap, VecDeque};

/// Size of one KCP segment header: `conv, cmd, frg, wnd, ts, sn, una, len`.
pub const KCP_OVERHEAD: usize = 24;

const CMD_PUSH: u8 = 81;
const CMD_ACK: u8 = 82;
const CMD_WASK: u8 = 83;
const CMD_WINS: u8 = 84;

struct Pending {
    frg: u8,
    data: Vec<u8>,
}

/// Receive-side KCP state machine for a single conversation.
pub struct KcpEngine {
    conv: u32,
    rcv_wnd: u32,
    rcv_nxt: u32,
    rcv_buf: BTreeMap<u32, Pending>,
    rcv_queue: VecDeque<Pending>,
}

impl KcpEngine {
    /// Create a new engine bound to `conv`, with the given receive window
    /// (1024 per §4.3).
    pub fn new(conv: u32, rcv_wnd: u32) -> Self {
        Self {
            conv,
            rcv_wnd,
            rcv_nxt: 0,
            rcv_buf: BTreeMap::new(),
            rcv_queue: VecDeque::new(),
        }
    }

    pub fn conv(&self) -> u32 {
        self.conv
    }

    /// Feed reformatted segment bytes to the engine. Returns `true` if at
    /// least one well-formed segment was consumed, `false` if the input was
    /// too short or malformed (mirrors `ikcp_input`'s negative return).
    pub fn input(&mut self, data: &[u8]) -> bool {
        if data.len() < KCP_OVERHEAD {
            return false;
        }

        let mut offset = 0;
        let mut consumed_any = false;

        while data.len() - offset >= KCP_OVERHEAD {
            let conv = read_u32(data, offset);
            let cmd = data[offset + 4];
            let frg = data[offset + 5];
            let _wnd = read_u16(data, offset + 6);
            let _ts = read_u32(data, offset + 8);
            let sn = read_u32(data, offset + 12);
            let _una = read_u32(data, offset + 16);
            let len = read_u32(data, offset + 20) as usize;
            offset += KCP_OVERHEAD;

            if conv != self.conv {
                break;
            }
            if data.len() - offset < len {
                break;
            }
            let payload = data[offset..offset + len].to_vec();
            offset += len;

            match cmd {
                CMD_PUSH => {
                    self.parse_data(sn, frg, payload);
                    consumed_any = true;
                }
                CMD_ACK | CMD_WASK | CMD_WINS => {
                    // The engine never transmits, so acknowledgement and
                    // window-probe bookkeeping has nothing to act on.
                    consumed_any = true;
                }
                _ => break,
            }
        }

        consumed_any
    }

    fn parse_data(&mut self, sn: u32, frg: u8, data: Vec<u8>) {
        if itimediff(sn, self.rcv_nxt.wrapping_add(self.rcv_wnd)) >= 0
            || itimediff(sn, self.rcv_nxt) < 0
        {
            return; // out of window or already delivered
        }

        self.rcv_buf.entry(sn).or_insert(Pending { frg, data });

        while let Some(entry) = self.rcv_buf.first_key_value() {
            let (&sn, _) = entry;
            if sn != self.rcv_nxt || self.rcv_queue.len() >= self.rcv_wnd as usize {
                break;
            }
            let pending = self.rcv_buf.remove(&sn).unwrap();
            self.rcv_queue.push_back(pending);
            self.rcv_nxt = self.rcv_nxt.wrapping_add(1);
        }
    }

    /// Size of the next whole message, if one is fully queued.
    pub fn peek_size(&self) -> Option<usize> {
        let front = self.rcv_queue.front()?;
        if front.frg == 0 {
            return Some(front.data.len());
        }
        if self.rcv_queue.len() < front.frg as usize + 1 {
            return None;
        }
        let mut total = 0;
        for seg in &self.rcv_queue {
            total += seg.data.len();
            if seg.frg == 0 {
                return Some(total);
            }
        }
        None
    }

    /// Pop and concatenate the next whole message, if one is ready.
    pub fn recv(&mut self) -> Option<Vec<u8>> {
        self.peek_size()?;

        let mut out = Vec::new();
        while let Some(seg) = self.rcv_queue.pop_front() {
            let last = seg.frg == 0;
            out.extend_from_slice(&seg.data);
            if last {
                break;
            }
        }
        Some(out)
    }
}

fn itimediff(later: u32, earlier: u32) -> i32 {
    (later as i32).wrapping_sub(earlier as i32)
}

fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_segment(conv: u32, sn: u32, frg: u8, payload: &[u8]) -> Vec<u8> {
        let mut seg = Vec::with_capacity(KCP_OVERHEAD + payload.len());
        seg.extend_from_slice(&conv.to_le_bytes());
        seg.push(CMD_PUSH);
        seg.push(frg);
        seg.extend_from_slice(&0u16.to_le_bytes()); // wnd
        seg.extend_from_slice(&0u32.to_le_bytes()); // ts
        seg.extend_from_slice(&sn.to_le_bytes());
        seg.extend_from_slice(&0u32.to_le_bytes()); // una
        seg.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        seg.extend_from_slice(payload);
        seg
    }

    #[test]
    fn single_fragment_message_round_trips() {
        let mut engine = KcpEngine::new(1, 1024);
        assert!(engine.input(&push_segment(1, 0, 0, b"hello")));
        assert_eq!(engine.recv(), Some(b"hello".to_vec()));
        assert_eq!(engine.recv(), None);
    }

    #[test]
    fn multi_fragment_message_reassembles_in_order() {
        let mut engine = KcpEngine::new(1, 1024);
        let seg0 = push_segment(1, 0, 1, b"abc");
        let seg1 = push_segment(1, 1, 0, b"def");
        let mut batch = seg0;
        batch.extend(seg1);
        assert!(engine.input(&batch));
        assert_eq!(engine.recv(), Some(b"abcdef".to_vec()));
    }

    #[test]
    fn out_of_order_fragments_reassemble_once_contiguous() {
        let mut engine = KcpEngine::new(1, 1024);
        assert!(engine.input(&push_segment(1, 1, 0, b"second")));
        assert_eq!(engine.recv(), None); // still waiting on sn 0
        assert!(engine.input(&push_segment(1, 0, 1, b"first-")));
        assert_eq!(engine.recv(), Some(b"first-second".to_vec()));
    }

    #[test]
    fn mismatched_conversation_is_ignored() {
        let mut engine = KcpEngine::new(1, 1024);
        assert!(!engine.input(&push_segment(2, 0, 0, b"nope")));
        assert_eq!(engine.recv(), None);
    }

    #[test]
    fn duplicate_segment_is_not_double_delivered() {
        let mut engine = KcpEngine::new(1, 1024);
        let seg = push_segment(1, 0, 0, b"once");
        let mut batch = seg.clone();
        batch.extend(seg);
        assert!(engine.input(&batch));
        assert_eq!(engine.recv(), Some(b"once".to_vec()));
        assert_eq!(engine.recv(), None);
    }

    #[test]
    fn too_short_input_is_rejected() {
        let mut engine = KcpEngine::new(1, 1024);
        assert!(!engine.input(&[0u8; 10]));
    }
}
