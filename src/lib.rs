//! `stream-over-udp` — a reliable, in-order byte stream over an unreliable
//! datagram service.
//!
//! # Architecture
//!
//! ```text
//!   input stream ──▶ ┌────────────────────────────┐ ──▶ output stream
//!                    │         Connection         │
//!   tick ──────────▶ │  SendBuffer   RecvBuffer   │
//!                    │  FlowState    RetransmitTimer
//!                    │        Teardown FSM        │
//!                    └──────────────┬─────────────┘
//!                          segments │ (encode/decode + checksum)
//!                    ┌──────────────▼─────────────┐
//!                    │   Adapter (datagram I/O)   │
//!                    └────────────────────────────┘
//! ```
//!
//! The core is synchronous and single-threaded: the host delivers four kinds
//! of events (input ready, datagram arrived, output space, timer tick) one
//! at a time, and each runs to completion.  Reliability comes from cumulative
//! acknowledgements, Go-Back-N retransmission on a tick-counted timeout, and
//! strict in-order acceptance; flow control from a static peer-advertised
//! window; shutdown from a four-way FIN exchange.
//!
//! Each module has a single responsibility:
//! - [`segment`]     — wire format (serialise / deserialise / checksum)
//! - [`adapter`]     — the non-blocking I/O contract the core consumes
//! - [`config`]      — per-connection tunables
//! - [`flow`]        — sequence cursors and window accounting
//! - [`send_buffer`] — outbound queue awaiting cumulative ACKs
//! - [`recv_buffer`] — accepted in-order data awaiting drain
//! - [`timer`]       — tick-counted retransmit timer and retry budget
//! - [`state`]       — teardown state machine types
//! - [`connection`]  — the per-connection driver binding it all together
//! - [`registry`]    — owned collection of live connections for the tick fan-out
//! - [`simulator`]   — lossy/reorder network + in-memory adapter for testing
//! - [`host`]        — tokio shell: UDP socket, stdio streams, interval tick

pub mod adapter;
pub mod config;
pub mod connection;
pub mod flow;
pub mod host;
pub mod recv_buffer;
pub mod registry;
pub mod segment;
pub mod send_buffer;
pub mod simulator;
pub mod state;
pub mod timer;
