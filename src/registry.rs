//! Owned registry of live connections.
//!
//! The single external tick fans out to every live connection, so something
//! has to know about all of them.  [`Registry`] owns the connections
//! outright, keyed by an opaque [`ConnId`]; connections destroyed while an
//! entry point runs merely mark themselves closed, and the registry sweeps
//! them out after the pass, so removal during iteration is always safe.

use crate::adapter::Adapter;
use crate::connection::Connection;

/// Opaque identity of a registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(u64);

/// All live connections sharing one tick source.
pub struct Registry<A> {
    entries: Vec<(ConnId, Connection<A>)>,
    next_id: u64,
}

impl<A: Adapter> Registry<A> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Register a connection and return its identity.
    pub fn insert(&mut self, conn: Connection<A>) -> ConnId {
        let id = ConnId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, conn));
        id
    }

    /// Look up a live connection.  Returns `None` once it has been swept.
    pub fn get_mut(&mut self, id: ConnId) -> Option<&mut Connection<A>> {
        self.entries
            .iter_mut()
            .find(|(eid, _)| *eid == id)
            .map(|(_, c)| c)
    }

    /// Remove a connection outright, returning it if still present.
    pub fn remove(&mut self, id: ConnId) -> Option<Connection<A>> {
        let idx = self.entries.iter().position(|(eid, _)| *eid == id)?;
        Some(self.entries.remove(idx).1)
    }

    /// Deliver one tick to every live connection, then sweep the ones that
    /// destroyed themselves during the pass.
    pub fn on_tick(&mut self) {
        for (_, conn) in &mut self.entries {
            conn.on_tick();
        }
        self.sweep();
    }

    /// Drop every connection that has marked itself closed.
    pub fn sweep(&mut self) {
        self.entries.retain(|(_, conn)| !conn.is_closed());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<A: Adapter> Default for Registry<A> {
    fn default() -> Self {
        Self::new()
    }
}
