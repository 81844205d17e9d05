//! Flow and window accounting for one connection.
//!
//! [`FlowState`] owns every sequence-number cursor and window counter the
//! connection driver reads or writes:
//!
//! ```text
//!        seqno            next_seqno
//!          │                  │
//!      ────┼──────────────────┼────────────▶ send seq space
//!          │◀─ window used ──▶│
//! ```
//!
//! `seqno` is the left edge of the send window (highest cumulatively
//! acknowledged byte + 1); `next_seqno` is where the next transmitted byte
//! goes.  On the receive side `ackno` is the next in-order byte expected and
//! `last_ackno` its previous value, kept to recognise duplicates of the
//! segment we most recently accepted.

use crate::adapter::MAX_SEG_DATA_SIZE;
use crate::config::Config;

/// Returns `true` when sequence number `a` is ≤ `b` in wrap-around space.
///
/// Valid as long as the two values are less than `u32::MAX / 2` apart, which
/// any sane window guarantees.
#[inline]
pub fn seq_le(a: u32, b: u32) -> bool {
    b.wrapping_sub(a) <= u32::MAX / 2
}

/// Sequence-number cursors and window occupancy for one connection.
#[derive(Debug)]
pub struct FlowState {
    /// Highest acknowledged sequence number + 1 (left edge of send window).
    pub seqno: u32,
    /// Sequence number assigned to the next byte that will be sent.
    pub next_seqno: u32,
    /// Next in-order byte expected from the peer.
    pub ackno: u32,
    /// Previous value of `ackno`, for duplicate re-ACKs.
    pub last_ackno: u32,
    /// Static limit on unacknowledged outbound bytes.
    pub send_window: u32,
    /// Bytes currently occupying the send window.
    pub send_window_used: u32,
    /// Static limit on buffered inbound bytes.
    pub rcv_window: u32,
    /// Bytes currently buffered awaiting drain to the output stream.
    pub rcv_window_used: u32,
}

impl FlowState {
    /// Fresh cursors for a just-established session.  Both byte streams
    /// start at sequence number 1.
    pub fn new(config: &Config) -> Self {
        Self {
            seqno: 1,
            next_seqno: 1,
            ackno: 1,
            last_ackno: 1,
            send_window: config.send_window as u32,
            send_window_used: 0,
            rcv_window: config.recv_window as u32,
            rcv_window_used: 0,
        }
    }

    /// Receive window to advertise in outbound segments, floored to
    /// whole-segment granularity so the peer never sends a partial trailing
    /// segment.
    pub fn advertised_window(&self) -> u16 {
        let free = self.rcv_window - self.rcv_window_used;
        let seg = MAX_SEG_DATA_SIZE as u32;
        (seg * (free / seg)) as u16
    }

    /// Whether a payload of `len` bytes fits in the remaining receive window.
    pub fn rcv_fits(&self, len: u32) -> bool {
        self.rcv_window_used + len <= self.rcv_window
    }
}
