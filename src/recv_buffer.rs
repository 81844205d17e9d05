//! Receive-side queue of accepted in-order payloads.
//!
//! Only the strictly next in-order segment is ever admitted (the driver
//! checks `seqno == ackno` before pushing), so [`RecvBuffer`] never reorders
//! anything: it is a FIFO of payloads waiting for the output stream to have
//! space.  Each entry tracks how many of its bytes have already been written
//! so a partial `conn_output`-style write can resume where it left off.
//!
//! This module only manages state; the drain loop and ACK emission live in
//! [`crate::connection`].

use std::collections::VecDeque;

/// One accepted payload, partially or fully undelivered.
#[derive(Debug)]
pub struct RxEntry {
    payload: Vec<u8>,
    delivered: usize,
}

impl RxEntry {
    /// Bytes not yet written to the output stream.
    pub fn remaining(&self) -> usize {
        self.payload.len() - self.delivered
    }

    /// The undelivered tail of the payload.
    pub fn unread(&self) -> &[u8] {
        &self.payload[self.delivered..]
    }

    /// Record that `n` more bytes reached the output stream.
    pub fn mark_delivered(&mut self, n: usize) {
        debug_assert!(n <= self.remaining());
        self.delivered += n;
    }
}

/// Ordered queue of accepted in-order payloads for one connection.
#[derive(Debug, Default)]
pub struct RecvBuffer {
    queue: VecDeque<RxEntry>,
}

impl RecvBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an accepted in-order payload.
    pub fn push(&mut self, payload: Vec<u8>) {
        debug_assert!(!payload.is_empty(), "empty segments are never buffered");
        self.queue.push_back(RxEntry {
            payload,
            delivered: 0,
        });
    }

    pub fn front_mut(&mut self) -> Option<&mut RxEntry> {
        self.queue.front_mut()
    }

    pub fn pop_front(&mut self) -> Option<RxEntry> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Total undelivered bytes across all entries.
    pub fn pending_bytes(&self) -> usize {
        self.queue.iter().map(RxEntry::remaining).sum()
    }
}
