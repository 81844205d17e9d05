//! Send-side queue of unacknowledged outbound payloads.
//!
//! [`SendBuffer`] holds every payload chunk read from the input stream that
//! the peer has not yet cumulatively acknowledged, in stream order:
//!
//! ```text
//!   front                                back
//!   ┌──────────┬──────────┬ ─ ─ ─ ┬──────────┐
//!   │ in-flight│ in-flight│  ...  │ unsent   │   (unsent = end_seqno None)
//!   └──────────┴──────────┴───────┴──────────┘
//! ```
//!
//! Entries are stamped with their end sequence number during each transmit
//! pass; an ACK removes every front entry whose stamped end the cumulative
//! `ackno` covers.  On timeout the caller replays the whole in-flight prefix
//! from the left window edge (Go-Back-N), restamping as it goes.
//!
//! This module only manages state; all segment construction and I/O is the
//! caller's responsibility.

use std::collections::VecDeque;

use crate::flow::seq_le;

/// One queued payload chunk awaiting cumulative acknowledgement.
#[derive(Debug)]
pub struct TxEntry {
    /// The payload bytes exactly as read from the input stream.
    pub payload: Vec<u8>,
    /// `seqno_of_first_byte + payload.len()`, stamped at transmission.
    /// `None` until the entry has been through a transmit pass.
    pub end_seqno: Option<u32>,
}

impl TxEntry {
    /// Payload length in sequence-number space.
    pub fn len(&self) -> u32 {
        self.payload.len() as u32
    }
}

/// Ordered queue of unacknowledged outbound payloads for one connection.
#[derive(Debug, Default)]
pub struct SendBuffer {
    queue: VecDeque<TxEntry>,
}

impl SendBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a freshly read chunk.  It stays queued until a cumulative ACK
    /// covers its stamped end sequence number.
    pub fn push(&mut self, payload: Vec<u8>) {
        debug_assert!(!payload.is_empty(), "empty chunks are never queued");
        self.queue.push_back(TxEntry {
            payload,
            end_seqno: None,
        });
    }

    /// Number of queued entries (in-flight and unsent).
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Total queued payload bytes.
    pub fn queued_bytes(&self) -> u32 {
        self.queue.iter().map(TxEntry::len).sum()
    }

    /// Iterate front-to-back for a transmit pass, allowing each entry's
    /// `end_seqno` stamp to be rewritten.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TxEntry> {
        self.queue.iter_mut()
    }

    /// Process a cumulative ACK: remove every front entry whose stamped end
    /// sequence number `ackno` covers (modular comparison), and return the
    /// total payload bytes released.  Unsent entries and partially covered
    /// fronts stop the walk.  Duplicate or stale ACKs release zero bytes.
    pub fn ack(&mut self, ackno: u32) -> u32 {
        let mut released = 0u32;
        while let Some(front) = self.queue.front() {
            match front.end_seqno {
                Some(end) if seq_le(end, ackno) => {
                    released += front.len();
                    self.queue.pop_front();
                }
                _ => break,
            }
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: queue `chunks` and stamp them contiguously from `start`.
    fn stamped(start: u32, chunks: &[&[u8]]) -> SendBuffer {
        let mut buf = SendBuffer::new();
        let mut seq = start;
        for c in chunks {
            buf.push(c.to_vec());
            seq = seq.wrapping_add(c.len() as u32);
            buf.queue.back_mut().unwrap().end_seqno = Some(seq);
        }
        buf
    }

    #[test]
    fn initial_state() {
        let buf = SendBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.queued_bytes(), 0);
    }

    #[test]
    fn push_keeps_entries_unstamped() {
        let mut buf = SendBuffer::new();
        buf.push(b"abc".to_vec());
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.queue.front().unwrap().end_seqno, None);
    }

    #[test]
    fn ack_releases_covered_prefix() {
        let mut buf = stamped(1, &[b"abc", b"de"]); // ends 4, 6
        assert_eq!(buf.ack(4), 3);
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.ack(6), 2);
        assert!(buf.is_empty());
    }

    #[test]
    fn cumulative_ack_releases_multiple() {
        let mut buf = stamped(1, &[b"abc", b"de", b"fghi"]); // ends 4, 6, 10
        assert_eq!(buf.ack(10), 9);
        assert!(buf.is_empty());
    }

    #[test]
    fn duplicate_ack_releases_nothing() {
        let mut buf = stamped(1, &[b"abc"]);
        assert_eq!(buf.ack(4), 3);
        assert_eq!(buf.ack(4), 0);
    }

    #[test]
    fn partial_cover_stops_walk() {
        let mut buf = stamped(1, &[b"abc", b"defg"]); // ends 4, 8
        // 6 covers the first entry but only part of the second.
        assert_eq!(buf.ack(6), 3);
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn unsent_entries_are_never_released() {
        let mut buf = stamped(1, &[b"abc"]);
        buf.push(b"zz".to_vec()); // never transmitted, no stamp
        assert_eq!(buf.ack(100), 3);
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn ack_walk_across_seqno_wrap() {
        let start = u32::MAX - 3;
        let mut buf = stamped(start, &[b"abcdef"]); // end wraps to 2
        assert_eq!(buf.ack(start.wrapping_add(6)), 6);
        assert!(buf.is_empty());
    }
}
