#![warn(missing_docs)]

//! nexus-host: quality scoring, diagnostics and the shaper context a host drives.

/// Console commands over the shaper.
pub mod commands;
/// On-demand diagnostics campaigns.
pub mod diagnostics;
/// Connection quality scoring.
pub mod quality;
/// The shaper context object.
pub mod shaper;
/// Time utilities for the host.
pub mod time;
/// World session seam consulted by diagnostics.
pub mod world;

pub use commands::{Command, CommandOutcome};
pub use diagnostics::{DiagnosticResult, DiagnosticsCampaign, Rating, TestStatus};
pub use quality::{QualityScorer, QualitySnapshot};
pub use shaper::Shaper;
pub use world::{WorldSnapshot, WorldState};
