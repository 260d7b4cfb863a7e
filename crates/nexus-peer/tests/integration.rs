//! Integration tests for the nexus-peer crate.
//!
//! These tests drive the QueueTracker the way a host send path does and check
//! how admission, recording and aggregation interact.

use nexus_core::config::Config;
use nexus_peer::QueueTracker;

fn create_tracker() -> QueueTracker {
    let config = Config { outgoing_queue_size: 16 * 1024, ..Config::default() };
    QueueTracker::new(&config)
}

#[test]
fn test_record_queued_without_admission_check() {
    let mut queue = create_tracker();
    queue.register_connection(7);

    // Host ignores can_queue entirely and overfills the queue
    for _ in 0..5 {
        queue.record_queued(7, 8 * 1024);
    }

    assert_eq!(queue.connection(7).map(|s| s.queued_bytes), Some(40 * 1024));
    assert_eq!(queue.connection(7).map(|s| s.packets_queued), Some(5));
    assert_eq!(queue.packets_queued(), 5);
    assert!(queue.queue_usage(7) > 100.0);
    assert!(!queue.can_queue(7, 1));
}

#[test]
fn test_send_path_round_trip() {
    let mut queue = create_tracker();
    queue.register_connection(1);
    let packet = 4 * 1024;

    let mut dropped = 0;
    for _ in 0..6 {
        if queue.can_queue(1, packet) {
            queue.record_queued(1, packet);
        } else {
            queue.record_dropped(1, packet);
            dropped += 1;
        }
    }

    assert_eq!(dropped, 2);
    assert_eq!(queue.current_queue_size(), 16 * 1024);
    assert_eq!(queue.packets_dropped(), 2);

    // Drain more than was queued
    for _ in 0..6 {
        queue.record_sent(1, packet);
    }
    assert_eq!(queue.current_queue_size(), 0);
    assert_eq!(queue.peak_queue_size(), 16 * 1024);
    assert!(queue.can_queue(1, 16 * 1024));
}

#[test]
fn test_aggregate_spans_connections() {
    let mut queue = create_tracker();
    for id in 1..=3 {
        queue.register_connection(id);
        queue.record_queued(id, id as usize * 1000);
    }

    assert_eq!(queue.current_queue_size(), 6000);
    assert_eq!(queue.peak_queue_size(), 3000);

    queue.unregister_connection(3);
    assert_eq!(queue.current_queue_size(), 3000);
    assert_eq!(queue.connection_count(), 2);
}
