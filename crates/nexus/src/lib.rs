#![warn(missing_docs)]

//! Nexus: a small public API facade for the workspace.
//!
//! This crate re-exports the types a host needs to shape its traffic:
//!
//! - The context object and its seams (`Shaper`, `WorldState`, `Clock`)
//! - Settings (`Config`, `Limit`)
//! - Individual components for hosts that wire them by hand
//!   (`RateLimiter`, `CompressionEngine`, `QueueTracker`, `QualityScorer`,
//!   `DiagnosticsCampaign`)
//! - The console command surface (`Command`, `CommandOutcome`)
//!
//! Example
//! ```
//! use nexus::prelude::*;
//!
//! let mut shaper = Shaper::new(Config::default());
//! let world = WorldSnapshot::connected(0);
//! let now = shaper.now();
//!
//! shaper.on_connect(1);
//! shaper.on_peer_capable(1);
//!
//! let payload = vec![b'a'; 4096];
//! let wire = shaper.compress_for_peer(1, &payload).into_owned();
//! assert!(wire.len() < payload.len());
//! shaper.on_send(wire.len(), now);
//!
//! assert_eq!(&*shaper.decompress_from_peer(&wire), payload.as_slice());
//! shaper.tick(now, &world);
//! ```

// Core settings and errors
pub use nexus_core::{
    config::{Config, Limit},
    error::{ErrorKind, Result},
    PeerId,
};
// Host: shaper context, scoring, diagnostics, commands
pub use nexus_host::{
    time::{Clock, ManualClock, SystemClock},
    Command, CommandOutcome, DiagnosticResult, DiagnosticsCampaign, QualityScorer, Rating, Shaper,
    TestStatus, WorldSnapshot, WorldState,
};
// Peer: queue accounting
pub use nexus_peer::{ConnectionQueueState, QueueTracker};
// Protocol: bandwidth and compression
pub use nexus_protocol::{CompressionEngine, CompressionStats, RateLimiter};
// Formatting helpers
pub use nexus_utilities::{format_bytes, format_bytes_short};

/// Convenience prelude with the most commonly used items.
pub mod prelude {
    pub use crate::{
        Command, CommandOutcome, Config, Limit, PeerId, Rating, Shaper, TestStatus, WorldSnapshot,
        WorldState,
    };
}
