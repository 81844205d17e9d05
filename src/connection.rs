//! Per-connection protocol driver.
//!
//! A [`Connection`] owns the complete state for one logical peer-to-peer
//! session and binds it to the four external triggers the host delivers:
//!
//! ```text
//!   input ready ──▶ on_input_ready ──▶ read chunks ──▶ SendBuffer ──┐
//!                                                                   │ Go-Back-N
//!   datagram ─────▶ on_datagram ─────▶ decode ─▶ dispatch           │ transmit pass
//!                                        │   (DATA/ACK/FIN)         ▼
//!   output space ─▶ on_output_space ──▶ drain RecvBuffer ──▶ send_datagram
//!                                                                   ▲
//!   tick ─────────▶ on_tick ──────────▶ RetransmitTimer ────────────┘
//! ```
//!
//! The scheduling model is single-threaded cooperative: the host invokes the
//! entry points serially, each runs to completion, and nothing here blocks —
//! every adapter call returns immediately.
//!
//! Reliability mechanisms, in one place:
//! - **Cumulative ACK**: an inbound `ackno` releases every send-buffer entry
//!   it covers and advances the left window edge.
//! - **Go-Back-N**: each transmit pass replays the queue from the left edge,
//!   stopping at the first entry the static send window cannot hold.
//! - **Strict in-order receive**: only `seqno == ackno` segments that fit
//!   the receive window are accepted; everything else is dropped and the
//!   peer's retransmission recovers.
//! - **Four-way teardown**: FIN/ACK exchange driven by [`Teardown`].

use crate::adapter::{Adapter, InputRead, MAX_SEG_DATA_SIZE};
use crate::config::Config;
use crate::flow::FlowState;
use crate::recv_buffer::RecvBuffer;
use crate::segment::{flags, Segment, SegmentKind};
use crate::send_buffer::SendBuffer;
use crate::state::Teardown;
use crate::timer::{RetransmitTimer, TimerTick};

/// Chunk prefix meaning the input stream delivered a truncated read; the
/// read loop stops without queueing it (a convention of the surrounding
/// test harness, honoured only at the start of a chunk).
const TRUNCATE_SENTINEL: &[u8] = b"###truncate###";

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// One reliable byte-stream connection over an unreliable datagram service.
pub struct Connection<A> {
    /// Sequence cursors and window occupancy.
    pub flow: FlowState,
    /// Unacknowledged outbound payloads.
    pub tx: SendBuffer,
    /// Accepted in-order payloads awaiting drain.
    pub rx: RecvBuffer,
    /// Tick-counting retransmit timer.
    pub timer: RetransmitTimer,
    /// Where this connection stands in the FIN exchange.
    pub teardown: Teardown,

    adapter: A,
    closed: bool,
}

impl<A: Adapter> Connection<A> {
    /// Bind a fresh connection to its I/O endpoints.  The datagram layer has
    /// already established the session; both byte streams start at sequence
    /// number 1.
    pub fn new(adapter: A, config: &Config) -> Self {
        Self {
            flow: FlowState::new(config),
            tx: SendBuffer::new(),
            rx: RecvBuffer::new(),
            timer: RetransmitTimer::new(config),
            teardown: Teardown::None,
            adapter,
            closed: false,
        }
    }

    /// Whether this connection has been destroyed and awaits sweeping.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    // -----------------------------------------------------------------------
    // Entry point: input ready
    // -----------------------------------------------------------------------

    /// The input stream has bytes (or EOF) for us.  Read chunks of at most
    /// [`MAX_SEG_DATA_SIZE`] until the stream would block, then run a
    /// transmit pass over everything queued.
    pub fn on_input_ready(&mut self) {
        if self.closed {
            return;
        }

        let mut chunk = vec![0u8; MAX_SEG_DATA_SIZE];
        loop {
            match self.adapter.input(&mut chunk) {
                InputRead::WouldBlock => break,
                InputRead::Eof => {
                    log::debug!("[conn] input EOF — entering active close");
                    self.teardown = Teardown::ActiveClose;
                    let ackno = self.flow.ackno;
                    self.send_control(ackno, flags::FIN);
                    self.timer.arm();
                    break;
                }
                InputRead::Data(n) => {
                    if chunk[..n].starts_with(TRUNCATE_SENTINEL) {
                        break;
                    }
                    self.tx.push(chunk[..n].to_vec());
                }
            }
        }
        self.transmit_ready();
    }

    // -----------------------------------------------------------------------
    // Entry point: datagram arrived
    // -----------------------------------------------------------------------

    /// A raw datagram arrived from the peer.  Malformed frames are dropped
    /// silently — the datagram layer has no error channel and the peer's
    /// retransmission recovers.
    pub fn on_datagram(&mut self, datagram: &[u8]) {
        if self.closed {
            return;
        }

        let seg = match Segment::decode(datagram) {
            Ok(seg) => seg,
            Err(e) => {
                log::debug!("[conn] dropped malformed datagram: {e}");
                return;
            }
        };

        // Duplicate of the segment we most recently accepted: its ACK was
        // lost in flight.  Re-ACK with the previous in-order boundary and
        // drop, leaving all other state untouched.
        if seg.seqno != self.flow.ackno
            && seg.seqno == self.flow.last_ackno
            && seg.flags & flags::ACK == 0
        {
            log::debug!("[conn] ← duplicate seq={} — re-ACK {}", seg.seqno, self.flow.last_ackno);
            let last = self.flow.last_ackno;
            self.send_control(last, flags::ACK);
            return;
        }

        match seg.kind() {
            SegmentKind::Data => self.handle_data(seg),
            SegmentKind::Ack => self.handle_ack(seg),
            SegmentKind::FinAck => self.handle_fin_ack(seg),
            SegmentKind::Fin => self.handle_fin(seg),
        }
    }

    // -----------------------------------------------------------------------
    // Entry point: output space available
    // -----------------------------------------------------------------------

    /// The output stream freed some space; resume draining accepted data.
    pub fn on_output_space(&mut self) {
        if self.closed {
            return;
        }
        self.drain_output();
    }

    // -----------------------------------------------------------------------
    // Entry point: timer tick
    // -----------------------------------------------------------------------

    /// One period of the external tick source elapsed.
    pub fn on_tick(&mut self) {
        if self.closed {
            return;
        }

        match self.timer.on_tick() {
            TimerTick::Idle => {
                // Nothing awaits acknowledgement: progress can only be
                // blocked on input/output space, so nudge both directions.
                self.transmit_ready();
                self.drain_output();
            }
            TimerTick::Counting => {}
            TimerTick::Expired => {
                if self.teardown != Teardown::None {
                    log::debug!("[conn] RTO — resending FIN");
                    let last = self.flow.last_ackno;
                    self.send_control(last, flags::FIN);
                } else {
                    log::debug!("[conn] RTO — replaying send window");
                    self.transmit_ready();
                }
            }
            TimerTick::BudgetExhausted => {
                if self.teardown == Teardown::ActiveClose {
                    // The FIN itself has gone unanswered for a full budget.
                    log::warn!("[conn] retry budget exhausted on FIN — destroying");
                    self.destroy();
                } else {
                    log::warn!("[conn] retry budget exhausted — forcing FIN");
                    let ackno = self.flow.ackno;
                    self.send_control(ackno, flags::FIN);
                    self.teardown = Teardown::ActiveClose;
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Inbound dispatch
    // -----------------------------------------------------------------------

    /// Payload-bearing segment.  Accepted only when strictly in order and
    /// within the receive window; either failure is a silent drop.
    fn handle_data(&mut self, seg: Segment) {
        let payload_len = seg.payload.len() as u32;
        if payload_len == 0 {
            return;
        }
        if seg.seqno != self.flow.ackno {
            log::debug!(
                "[conn] ← DATA seq={} out of order (expected {}) — dropped",
                seg.seqno,
                self.flow.ackno
            );
            return;
        }
        if !self.flow.rcv_fits(payload_len) {
            log::debug!(
                "[conn] ← DATA seq={} len={} exceeds receive window — dropped",
                seg.seqno,
                payload_len
            );
            return;
        }

        self.flow.last_ackno = self.flow.ackno;
        self.flow.ackno = seg.seqno.wrapping_add(payload_len);
        self.flow.rcv_window_used += payload_len;
        self.rx.push(seg.payload);
        log::debug!(
            "[conn] ← DATA seq={} len={} accepted; ackno={}",
            seg.seqno,
            payload_len,
            self.flow.ackno
        );

        self.drain_output();
    }

    /// Pure acknowledgement: slide the send window, settle the timer, and
    /// finish a passive close if this is the exchange's final ACK.
    fn handle_ack(&mut self, seg: Segment) {
        if self.teardown == Teardown::PassiveClose {
            // Our FIN is the only thing left for the peer to acknowledge.
            log::debug!("[conn] ← final ACK — passive close complete");
            self.destroy();
            return;
        }

        let released = self.tx.ack(seg.ackno);
        if released > 0 {
            self.flow.seqno = self.flow.seqno.wrapping_add(released);
            self.flow.send_window_used -= released;
            log::debug!(
                "[conn] ← ACK {} released {} byte(s); seqno={}",
                seg.ackno,
                released,
                self.flow.seqno
            );
        }

        if seg.ackno == self.flow.next_seqno && self.teardown == Teardown::None {
            // Fully caught up; an outstanding FIN keeps the timer running.
            self.timer.disarm();
        } else {
            self.timer.ack_progress();
        }
    }

    /// FIN with a piggybacked ACK: the peer answered our close in one
    /// segment.  Acknowledge it and finish.
    fn handle_fin_ack(&mut self, seg: Segment) {
        self.flow.ackno = seg.seqno.wrapping_add(1);
        let ackno = self.flow.ackno;
        self.send_control(ackno, flags::ACK);
        log::debug!("[conn] ← FIN+ACK — destroying");
        self.destroy();
    }

    /// Plain FIN.  As the active closer this is the answer to our own FIN;
    /// otherwise the peer is initiating and we take the passive role.
    fn handle_fin(&mut self, seg: Segment) {
        self.flow.last_ackno = self.flow.ackno;
        self.flow.ackno = seg.seqno.wrapping_add(1);
        let ackno = self.flow.ackno;

        if self.teardown == Teardown::ActiveClose {
            self.send_control(ackno, flags::ACK);
            log::debug!("[conn] ← FIN (active close) — destroying");
            self.destroy();
            return;
        }

        log::debug!("[conn] ← FIN — entering passive close");
        // Deliver end-of-stream to the output, acknowledge the FIN, flush
        // whatever the output stream will take, then send our own FIN.
        self.adapter.output(&[]);
        self.send_control(ackno, flags::ACK);
        self.drain_output();
        self.send_control(ackno, flags::FIN);
        self.timer.arm();
        self.teardown = Teardown::PassiveClose;
    }

    // -----------------------------------------------------------------------
    // Outbound paths
    // -----------------------------------------------------------------------

    /// Go-Back-N transmit pass: rewind to the left window edge and send
    /// every queued entry the static send window can hold, restamping each
    /// entry's end sequence number on the way.
    fn transmit_ready(&mut self) {
        self.flow.next_seqno = self.flow.seqno;
        self.flow.send_window_used = 0;

        let ackno = self.flow.ackno;
        let window = self.flow.advertised_window();
        let mut sent_any = false;

        let Self {
            flow, tx, adapter, ..
        } = self;
        for entry in tx.iter_mut() {
            let len = entry.len();
            if flow.send_window_used + len > flow.send_window {
                break;
            }
            let seg = Segment {
                seqno: flow.next_seqno,
                ackno,
                flags: 0,
                window,
                payload: entry.payload.clone(),
            };
            entry.end_seqno = Some(flow.next_seqno.wrapping_add(len));
            flow.next_seqno = flow.next_seqno.wrapping_add(len);
            flow.send_window_used += len;
            send_all(adapter, &seg.encode());
            log::debug!("[conn] → DATA seq={} len={} win={}", seg.seqno, len, window);
            sent_any = true;
        }

        if sent_any {
            self.timer.arm();
        }
    }

    /// Drain accepted payloads into the output stream, acknowledging each
    /// fully delivered entry.  An entry larger than the space on offer is
    /// left whole (no half-flushed head); partial writes by the stream
    /// itself are resumed on the next pass.
    fn drain_output(&mut self) {
        loop {
            let space = self.adapter.bufspace();
            let Some(entry) = self.rx.front_mut() else {
                break;
            };
            if space == 0 || entry.remaining() > space {
                break;
            }

            let n = self.adapter.output(entry.unread());
            entry.mark_delivered(n);
            let done = entry.remaining() == 0;
            self.flow.rcv_window_used -= n as u32;

            if !done {
                break;
            }
            self.rx.pop_front();
            let ackno = self.flow.ackno;
            self.send_control(ackno, flags::ACK);
        }
    }

    /// Build and send a payload-free control segment carrying `flag_bits`.
    fn send_control(&mut self, ackno: u32, flag_bits: u32) {
        let seg = Segment {
            seqno: self.flow.seqno,
            ackno,
            flags: flag_bits,
            window: self.flow.advertised_window(),
            payload: Vec::new(),
        };
        send_all(&mut self.adapter, &seg.encode());
        log::debug!(
            "[conn] → ctrl flags={:#x} seq={} ack={}",
            flag_bits,
            seg.seqno,
            ackno
        );
    }

    /// Tear the connection down and notify the adapter.  Idempotent.
    fn destroy(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.timer.disarm();
        self.adapter.removed();
        self.adapter.end_client();
        log::debug!("[conn] destroyed");
    }
}

/// Push a whole datagram through a partial-writing adapter.
fn send_all<A: Adapter>(adapter: &mut A, bytes: &[u8]) {
    let mut sent = 0;
    while sent < bytes.len() {
        sent += adapter.send_datagram(&bytes[sent..]);
    }
}
