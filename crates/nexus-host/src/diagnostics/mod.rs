//! On-demand network diagnostics.
//!
//! A campaign samples ping and byte rates for a fixed five seconds, then grades
//! latency, bandwidth use and world size and renders a report with
//! recommendations. The host drives it with [`DiagnosticsCampaign::tick`].

mod campaign;
mod rating;
mod result;

pub use campaign::{DiagnosticsCampaign, Readings, TestStatus, NOT_CONNECTED_MESSAGE};
pub use rating::Rating;
pub use result::DiagnosticResult;
