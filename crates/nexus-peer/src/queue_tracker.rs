use std::collections::HashMap;

use nexus_core::{Config, PeerId};
use tracing::{debug, warn};

use crate::connection_state::ConnectionQueueState;

/// Advisory backpressure tracker for per-connection outgoing queues.
///
/// The tracker never holds packets. The host asks [`QueueTracker::can_queue`]
/// before enqueuing, then reports what it actually did through
/// [`QueueTracker::record_queued`], [`QueueTracker::record_sent`] and
/// [`QueueTracker::record_dropped`]. Recording is never validated against the
/// admission answer.
#[derive(Debug)]
pub struct QueueTracker {
    outgoing_queue_size: usize,
    connection_buffer_size: usize,
    connections: HashMap<PeerId, ConnectionQueueState>,
    packets_queued: u64,
    packets_dropped: u64,
    queue_overflows: u64,
    peak_queue_size: usize,
    current_queue_size: usize,
}

impl QueueTracker {
    /// Creates a tracker using the queue budgets from `config`.
    pub fn new(config: &Config) -> Self {
        Self {
            outgoing_queue_size: config.outgoing_queue_size,
            connection_buffer_size: config.connection_buffer_size,
            connections: HashMap::new(),
            packets_queued: 0,
            packets_dropped: 0,
            queue_overflows: 0,
            peak_queue_size: 0,
            current_queue_size: 0,
        }
    }

    /// Picks up new queue budgets. Already registered connections keep the
    /// budget they were registered with.
    pub fn refresh_settings(&mut self, config: &Config) {
        self.outgoing_queue_size = config.outgoing_queue_size;
        self.connection_buffer_size = config.connection_buffer_size;
        debug!(
            "Queue settings refreshed: outgoing {} bytes, buffer {} bytes",
            self.outgoing_queue_size, self.connection_buffer_size
        );
    }

    /// Configured per-connection outgoing queue budget in bytes.
    pub fn outgoing_queue_size(&self) -> usize {
        self.outgoing_queue_size
    }

    /// Configured per-connection burst buffer size in bytes.
    pub fn connection_buffer_size(&self) -> usize {
        self.connection_buffer_size
    }

    /// Starts tracking a connection. Re-registering is a no-op.
    pub fn register_connection(&mut self, id: PeerId) {
        if self.connections.contains_key(&id) {
            return;
        }
        self.connections.insert(id, ConnectionQueueState::new(self.outgoing_queue_size));
        debug!("Registered connection queue {}", id);
    }

    /// Stops tracking a connection. Unknown ids are ignored.
    pub fn unregister_connection(&mut self, id: PeerId) {
        if self.connections.remove(&id).is_some() {
            self.current_queue_size = self.total_queued();
            debug!("Unregistered connection queue {}", id);
        }
    }

    /// Returns true if `size` bytes would fit in the connection's queue.
    ///
    /// Unknown connections are always admitted.
    pub fn can_queue(&self, id: PeerId, size: usize) -> bool {
        self.connections.get(&id).map_or(true, |state| state.fits(size))
    }

    /// Records that the host queued `size` bytes on a connection.
    pub fn record_queued(&mut self, id: PeerId, size: usize) {
        self.packets_queued += 1;

        if let Some(state) = self.connections.get_mut(&id) {
            state.push(size);
            self.peak_queue_size = self.peak_queue_size.max(state.queued_bytes);
            self.current_queue_size = self.total_queued();
        }
    }

    /// Records that `size` queued bytes left the connection's queue.
    pub fn record_sent(&mut self, id: PeerId, size: usize) {
        if let Some(state) = self.connections.get_mut(&id) {
            state.pop(size);
            self.current_queue_size = self.total_queued();
        }
    }

    /// Records a packet the host dropped instead of queuing.
    ///
    /// Queued bytes are untouched since the packet never entered the queue.
    pub fn record_dropped(&mut self, id: PeerId, size: usize) {
        self.packets_dropped += 1;
        self.queue_overflows += 1;

        if let Some(state) = self.connections.get_mut(&id) {
            state.packets_dropped += 1;
        }
        warn!("Dropped {} byte packet for connection {}: queue full", size, id);
    }

    /// Queue fill level of a connection in percent, 0 if unknown.
    pub fn queue_usage(&self, id: PeerId) -> f32 {
        self.connections.get(&id).map_or(0.0, ConnectionQueueState::usage)
    }

    /// Snapshot of a connection's queue state.
    pub fn connection(&self, id: PeerId) -> Option<&ConnectionQueueState> {
        self.connections.get(&id)
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Packets recorded as queued, including those on unknown connections.
    pub fn packets_queued(&self) -> u64 {
        self.packets_queued
    }

    /// Packets recorded as dropped.
    pub fn packets_dropped(&self) -> u64 {
        self.packets_dropped
    }

    /// Number of queue overflow events.
    pub fn queue_overflows(&self) -> u64 {
        self.queue_overflows
    }

    /// Largest queue any single connection has reached.
    pub fn peak_queue_size(&self) -> usize {
        self.peak_queue_size
    }

    /// Sum of queued bytes across all connections.
    pub fn current_queue_size(&self) -> usize {
        self.current_queue_size
    }

    /// Forgets every connection. Safe to call repeatedly.
    pub fn cleanup(&mut self) {
        self.connections.clear();
        self.current_queue_size = 0;
    }

    fn total_queued(&self) -> usize {
        self.connections.values().map(|state| state.queued_bytes).sum()
    }
}

impl Default for QueueTracker {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    use super::*;

    fn tracker(outgoing: usize) -> QueueTracker {
        let config = Config { outgoing_queue_size: outgoing, ..Config::default() };
        QueueTracker::new(&config)
    }

    /// Collects formatted log output in memory.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_register_snapshots_budget() {
        let mut queue = tracker(1000);
        queue.register_connection(1);

        let mut config = Config::default();
        config.outgoing_queue_size = 5000;
        queue.refresh_settings(&config);
        queue.register_connection(2);

        assert_eq!(queue.connection(1).map(|s| s.max_bytes), Some(1000));
        assert_eq!(queue.connection(2).map(|s| s.max_bytes), Some(5000));
        assert_eq!(queue.outgoing_queue_size(), 5000);
    }

    #[test]
    fn test_register_twice_keeps_state() {
        let mut queue = tracker(1000);
        queue.register_connection(1);
        queue.record_queued(1, 300);
        queue.register_connection(1);

        assert_eq!(queue.connection_count(), 1);
        assert_eq!(queue.connection(1).map(|s| s.queued_bytes), Some(300));
    }

    #[test]
    fn test_unknown_connection_fails_open() {
        let queue = tracker(1000);
        assert!(queue.can_queue(42, usize::MAX));
        assert_eq!(queue.queue_usage(42), 0.0);
    }

    #[test]
    fn test_can_queue_respects_budget() {
        let mut queue = tracker(1000);
        queue.register_connection(1);
        queue.record_queued(1, 700);

        assert!(queue.can_queue(1, 300));
        assert!(!queue.can_queue(1, 301));
    }

    #[test]
    fn test_record_queued_counts_unknown_connections() {
        let mut queue = tracker(1000);
        queue.record_queued(9, 100);

        assert_eq!(queue.packets_queued(), 1);
        assert_eq!(queue.current_queue_size(), 0);
        assert_eq!(queue.connection_count(), 0);
    }

    #[test]
    fn test_record_sent_clamps_at_zero() {
        let mut queue = tracker(1000);
        queue.register_connection(1);
        queue.record_queued(1, 200);
        queue.record_sent(1, 150);
        queue.record_sent(1, 150);

        assert_eq!(queue.connection(1).map(|s| s.queued_bytes), Some(0));
        assert_eq!(queue.current_queue_size(), 0);
    }

    #[test]
    fn test_record_dropped_leaves_queued_bytes() {
        let mut queue = tracker(1000);
        queue.register_connection(1);
        queue.record_queued(1, 400);
        queue.record_dropped(1, 800);

        let state = queue.connection(1).cloned().unwrap_or_default();
        assert_eq!(state.queued_bytes, 400);
        assert_eq!(state.packets_dropped, 1);
        assert_eq!(queue.packets_dropped(), 1);
        assert_eq!(queue.queue_overflows(), 1);
    }

    #[test]
    fn test_record_dropped_logs_warning() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        let mut queue = tracker(1000);
        queue.register_connection(1);
        tracing::subscriber::with_default(subscriber, || queue.record_dropped(1, 800));

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("WARN"));
        assert!(output.contains("Dropped 800 byte packet for connection 1"));
    }

    #[test]
    fn test_peak_and_current_sizes() {
        let mut queue = tracker(10_000);
        queue.register_connection(1);
        queue.register_connection(2);
        queue.record_queued(1, 3000);
        queue.record_queued(2, 1000);
        queue.record_sent(1, 2500);

        assert_eq!(queue.peak_queue_size(), 3000);
        assert_eq!(queue.current_queue_size(), 1500);
    }

    #[test]
    fn test_queue_usage_percent() {
        let mut queue = tracker(2000);
        queue.register_connection(1);
        queue.record_queued(1, 1000);
        assert!((queue.queue_usage(1) - 50.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_unregister_updates_total() {
        let mut queue = tracker(2000);
        queue.register_connection(1);
        queue.record_queued(1, 1000);
        queue.unregister_connection(1);
        queue.unregister_connection(1);

        assert_eq!(queue.connection_count(), 0);
        assert_eq!(queue.current_queue_size(), 0);
    }

    #[test]
    fn test_cleanup_is_repeatable() {
        let mut queue = QueueTracker::default();
        queue.cleanup();
        queue.register_connection(1);
        queue.record_queued(1, 10);
        queue.cleanup();
        queue.cleanup();

        assert_eq!(queue.connection_count(), 0);
        assert!(queue.can_queue(1, usize::MAX));
    }
}
