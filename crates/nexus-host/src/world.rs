/// Read-only view of the host's world session consulted by diagnostics.
///
/// The shaper never owns a world. Hosts implement this over whatever session
/// object they keep, or hand over a [`WorldSnapshot`].
pub trait WorldState {
    /// Returns true while the host is joined to a server.
    fn is_connected(&self) -> bool;
    /// Number of replicated world objects the host currently tracks.
    fn object_count(&self) -> usize;
}

/// Plain-value [`WorldState`] captured by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldSnapshot {
    /// Whether a server session is active
    pub connected: bool,
    /// Replicated object count
    pub object_count: usize,
}

impl WorldSnapshot {
    /// A connected session holding `object_count` objects.
    pub fn connected(object_count: usize) -> Self {
        Self { connected: true, object_count }
    }

    /// No session.
    pub fn offline() -> Self {
        Self::default()
    }
}

impl WorldState for WorldSnapshot {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn object_count(&self) -> usize {
        self.object_count
    }
}
