//! Teardown state machine types.
//!
//! There is no connection-establishment handshake in this protocol — the
//! datagram layer hands the core an already-established session — so the only
//! state machine a connection carries is the graceful-shutdown one.  The
//! transitions themselves live in [`crate::connection`]; this module defines
//! the states.

/// Which side of the four-way FIN exchange this connection is on, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Teardown {
    /// Normal operation; no FIN sent or received.
    #[default]
    None,
    /// This side initiated the close: our FIN is out, we wait for the peer's
    /// FIN (plain or with a piggybacked ACK), then ACK it and destroy.
    ActiveClose,
    /// The peer initiated the close: we ACKed its FIN and sent our own; the
    /// peer's final ACK destroys the connection.
    PassiveClose,
}

impl std::fmt::Display for Teardown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}
