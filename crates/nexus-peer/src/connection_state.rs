//! Per-connection queue accounting.
//!
//! A [`ConnectionQueueState`] exists for every connection the host has
//! registered with the tracker. It models the bytes sitting in that
//! connection's outgoing queue, measured against the budget that was configured
//! when the connection was registered.

/// Queue accounting for one registered connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionQueueState {
    /// Bytes currently modelled as waiting in the outgoing queue
    pub queued_bytes: usize,
    /// Queue budget snapshotted from configuration at registration time
    pub max_bytes: usize,
    /// Packets recorded as queued on this connection
    pub packets_queued: u64,
    /// Packets recorded as dropped on this connection
    pub packets_dropped: u64,
}

impl ConnectionQueueState {
    /// Creates an empty queue state with the given budget.
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes, ..Self::default() }
    }

    /// Returns true if `size` more bytes would still fit within the budget.
    pub fn fits(&self, size: usize) -> bool {
        self.queued_bytes.saturating_add(size) <= self.max_bytes
    }

    /// Returns the queue fill level in percent, 0 when the budget is 0.
    pub fn usage(&self) -> f32 {
        if self.max_bytes == 0 {
            return 0.0;
        }
        self.queued_bytes as f32 / self.max_bytes as f32 * 100.0
    }

    /// Adds a queued packet of `size` bytes.
    pub(crate) fn push(&mut self, size: usize) {
        self.queued_bytes = self.queued_bytes.saturating_add(size);
        self.packets_queued += 1;
    }

    /// Removes `size` bytes from the queue, stopping at zero.
    pub(crate) fn pop(&mut self, size: usize) {
        self.queued_bytes = self.queued_bytes.saturating_sub(size);
    }
}
