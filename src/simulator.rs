//! Deterministic network simulator and in-memory adapter for testing.
//!
//! Real networks drop, reorder, and duplicate datagrams.  To exercise the
//! reliability mechanisms without depending on actual network conditions,
//! this module provides two pieces:
//!
//! - [`Simulator`] — applies a configurable fault model to batches of
//!   datagrams in flight between two endpoints:
//!
//!   | Fault       | Description                                        |
//!   |-------------|----------------------------------------------------|
//!   | Loss        | Drop a datagram with probability `loss_rate`.      |
//!   | Duplication | Deliver a datagram twice.                          |
//!   | Corruption  | Flip one random bit in the datagram.               |
//!   | Reordering  | Hold a datagram back so the next one overtakes it. |
//!
//!   All randomness comes from an explicitly seeded RNG, so any failing
//!   trace replays exactly from its seed.
//!
//! - [`MemoryAdapter`] — an [`Adapter`] backed by in-memory buffers: tests
//!   feed input chunks, collect sent datagrams, and inspect delivered
//!   output without any OS sockets involved.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::adapter::{Adapter, InputRead};

// ---------------------------------------------------------------------------
// Fault model
// ---------------------------------------------------------------------------

/// Configuration for the fault-injection model.
///
/// All probabilities are in the range `[0.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Probability that any given datagram is silently dropped.
    pub loss_rate: f64,
    /// Probability that a datagram is delivered twice.
    pub duplicate_rate: f64,
    /// Probability that one bit of a datagram is flipped.
    pub corrupt_rate: f64,
    /// Probability that a datagram is overtaken by its successor.
    pub reorder_rate: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        // No faults by default — the simulator is a transparent pass-through.
        Self {
            loss_rate: 0.0,
            duplicate_rate: 0.0,
            corrupt_rate: 0.0,
            reorder_rate: 0.0,
        }
    }
}

/// A fault-injecting stand-in for the unreliable datagram network.
pub struct Simulator {
    pub config: SimulatorConfig,
    rng: StdRng,
}

impl Simulator {
    /// Create a simulator whose entire fault schedule is determined by
    /// `seed`.
    pub fn new(config: SimulatorConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// A transparent pass-through simulator (no faults).
    pub fn lossless() -> Self {
        Self::new(SimulatorConfig::default(), 0)
    }

    /// Run a batch of in-flight datagrams through the fault model and
    /// return what actually arrives, in arrival order.
    pub fn apply(&mut self, datagrams: Vec<Vec<u8>>) -> Vec<Vec<u8>> {
        let mut delivered = Vec::with_capacity(datagrams.len());
        let mut held: Option<Vec<u8>> = None;

        for mut dg in datagrams {
            if self.rng.random_bool(self.config.loss_rate) {
                continue;
            }
            if self.rng.random_bool(self.config.corrupt_rate) {
                let byte = self.rng.random_range(0..dg.len());
                let bit = self.rng.random_range(0..8u8);
                dg[byte] ^= 1 << bit;
            }
            let duplicate = self.rng.random_bool(self.config.duplicate_rate);

            if self.rng.random_bool(self.config.reorder_rate) && held.is_none() {
                held = Some(dg);
                continue;
            }

            if duplicate {
                delivered.push(dg.clone());
            }
            delivered.push(dg);
            if let Some(late) = held.take() {
                delivered.push(late);
            }
        }
        // A datagram held back at the end of the batch still arrives.
        if let Some(late) = held {
            delivered.push(late);
        }
        delivered
    }
}

// ---------------------------------------------------------------------------
// In-memory adapter
// ---------------------------------------------------------------------------

/// An [`Adapter`] backed entirely by in-memory buffers.
///
/// Input is chunk-oriented: each fed chunk comes back from one `input` call,
/// which keeps test scenarios in control of how payloads split into
/// segments.  Outbound datagrams are reassembled from possibly partial
/// `send_datagram` writes using the segment's own length field, then parked
/// in `sent` for the test to collect.
#[derive(Debug)]
pub struct MemoryAdapter {
    /// Chunks waiting to be read as input.
    pub input: std::collections::VecDeque<Vec<u8>>,
    /// Set once the input stream has reached end-of-stream.
    pub input_closed: bool,
    /// Complete datagrams handed to the (simulated) network.
    pub sent: Vec<Vec<u8>>,
    /// Bytes delivered to the output stream.
    pub output: Vec<u8>,
    /// Space the output stream will currently accept.
    pub output_space: usize,
    /// Zero-length end-of-stream writes observed.
    pub eof_marks: u32,
    /// `removed` notifier fired.
    pub removed: bool,
    /// `end_client` notifier fired.
    pub ended: bool,
    /// Cap on bytes accepted per `send_datagram` call (forces the core to
    /// loop over partial writes when lowered).
    pub max_datagram_write: usize,

    partial: Vec<u8>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self {
            input: std::collections::VecDeque::new(),
            input_closed: false,
            sent: Vec::new(),
            output: Vec::new(),
            output_space: usize::MAX,
            eof_marks: 0,
            removed: false,
            ended: false,
            max_datagram_write: usize::MAX,
            partial: Vec::new(),
        }
    }

    /// Limit the output stream to `n` bytes of space (replenish by raising
    /// `output_space` again).
    pub fn with_output_space(n: usize) -> Self {
        let mut a = Self::new();
        a.output_space = n;
        a
    }

    /// Queue one input chunk for the next `on_input_ready` read loop.
    pub fn feed_input(&mut self, chunk: &[u8]) {
        self.input.push_back(chunk.to_vec());
    }

    /// Mark the input stream as ended (EOF after remaining chunks drain).
    pub fn close_input(&mut self) {
        self.input_closed = true;
    }

    /// Collect every complete datagram sent since the last call.
    pub fn take_sent(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.sent)
    }
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for MemoryAdapter {
    fn send_datagram(&mut self, buf: &[u8]) -> usize {
        let n = buf.len().min(self.max_datagram_write);
        self.partial.extend_from_slice(&buf[..n]);

        // The length field at offset 8 tells us when the datagram is whole.
        while self.partial.len() >= 10 {
            let claimed = u16::from_be_bytes([self.partial[8], self.partial[9]]) as usize;
            if self.partial.len() < claimed {
                break;
            }
            let rest = self.partial.split_off(claimed);
            self.sent.push(std::mem::replace(&mut self.partial, rest));
        }
        n
    }

    fn input(&mut self, buf: &mut [u8]) -> InputRead {
        match self.input.pop_front() {
            Some(mut chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    chunk.drain(..n);
                    self.input.push_front(chunk);
                }
                InputRead::Data(n)
            }
            None if self.input_closed => InputRead::Eof,
            None => InputRead::WouldBlock,
        }
    }

    fn output(&mut self, buf: &[u8]) -> usize {
        if buf.is_empty() {
            self.eof_marks += 1;
            return 0;
        }
        let n = buf.len().min(self.output_space);
        self.output.extend_from_slice(&buf[..n]);
        self.output_space = self.output_space.saturating_sub(n);
        n
    }

    fn bufspace(&self) -> usize {
        self.output_space
    }

    fn removed(&mut self) {
        self.removed = true;
    }

    fn end_client(&mut self) {
        self.ended = true;
    }
}
