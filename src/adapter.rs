//! The I/O contract the protocol core consumes.
//!
//! The core never touches a socket or a byte stream directly.  Everything it
//! needs from the outside world — an unreliable datagram service, an input
//! byte stream, an output byte stream — arrives through [`Adapter`].  All
//! calls are non-blocking and return immediately with byte counts or
//! "would block"; the core runs each entry point to completion on top of
//! that guarantee.

/// Largest payload the datagram service carries in one segment.
///
/// Fixed at compile time and assumed stable for the lifetime of every
/// connection; the advertised receive window is floored to multiples of it.
pub const MAX_SEG_DATA_SIZE: usize = 1440;

/// Result of a non-blocking read from the connection's input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRead {
    /// `n > 0` bytes were copied into the caller's buffer.
    Data(usize),
    /// No bytes available right now; try again on the next input event.
    WouldBlock,
    /// End of stream; no further bytes will ever arrive.
    Eof,
}

/// Non-blocking I/O endpoints backing one connection.
///
/// `send_datagram` and `output` may partial-write; the core loops on the
/// former and keeps per-entry progress counters for the latter.  `removed`
/// and `end_client` are teardown notifiers fired exactly once when the
/// connection is destroyed.
pub trait Adapter {
    /// Hand `buf` to the unreliable datagram service.  Returns how many bytes
    /// were accepted; the core calls again with the remainder until the whole
    /// datagram is taken.
    fn send_datagram(&mut self, buf: &[u8]) -> usize;

    /// Read the next chunk from the input stream into `buf`.
    fn input(&mut self, buf: &mut [u8]) -> InputRead;

    /// Write bytes to the output stream.  Returns how many were accepted.
    /// A zero-length `buf` is the end-of-stream marker.
    fn output(&mut self, buf: &[u8]) -> usize;

    /// Bytes the output stream will currently accept without blocking.
    fn bufspace(&self) -> usize;

    /// The connection has been destroyed; release per-connection resources.
    fn removed(&mut self) {}

    /// The whole client session is over (fires after [`Adapter::removed`]).
    fn end_client(&mut self) {}
}
