#![warn(missing_docs)]

//! nexus-peer: per-connection queue accounting and advisory admission control.

/// Queue state kept for each registered connection.
pub mod connection_state;
mod queue_tracker;

pub use connection_state::ConnectionQueueState;
pub use queue_tracker::QueueTracker;
