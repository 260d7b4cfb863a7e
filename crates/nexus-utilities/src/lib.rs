//! Formatting utilities for nexus statistics.
//!
//! This crate provides the human-readable renderings shared by every textual
//! summary the shaper produces (status lines, stats panels, diagnostics reports):
//!
//! ## Byte Formatting
//! - [`format_bytes`]: two-decimal `B`/`KB`/`MB` rendering for panels and reports
//! - [`format_bytes_short`]: compact `B`/`K`/`M` rendering for one-line summaries
//!
//! ## Percentages
//! - [`format_percent`]: one-decimal percentage of a `0.0..=1.0` ratio
//!
//! Units are binary (1 KB = 1024 B).

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

/// Formats a byte count as `B`, `KB` or `MB` with two decimals above 1 KB.
///
/// # Examples
/// ```
/// use nexus_utilities::format_bytes;
///
/// assert_eq!(format_bytes(512), "512 B");
/// assert_eq!(format_bytes(1536), "1.50 KB");
/// assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= MIB {
        format!("{:.2} MB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.2} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Formats a byte count compactly: `B`, whole `K`, or one-decimal `M`.
///
/// # Examples
/// ```
/// use nexus_utilities::format_bytes_short;
///
/// assert_eq!(format_bytes_short(900), "900B");
/// assert_eq!(format_bytes_short(2048), "2K");
/// assert_eq!(format_bytes_short(5 * 1024 * 1024 / 2), "2.5M");
/// ```
pub fn format_bytes_short(bytes: u64) -> String {
    if bytes >= MIB {
        format!("{:.1}M", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.0}K", bytes as f64 / KIB as f64)
    } else {
        format!("{}B", bytes)
    }
}

/// Formats a `0.0..=1.0` ratio as a percentage with one decimal (`0.255` -> `"25.5%"`).
pub fn format_percent(ratio: f32) -> String {
    format!("{:.1}%", ratio * 100.0)
}
