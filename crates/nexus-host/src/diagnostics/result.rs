use std::fmt;

use chrono::{DateTime, Local};
use nexus_utilities::{format_bytes, format_percent};
use serde::Serialize;

use super::rating::Rating;

/// Jitter above which the connection is reported as unstable, in milliseconds.
const HIGH_JITTER_MS: f32 = 50.0;
/// Compression ratio below which compression is reported as ineffective.
const LOW_COMPRESSION_RATIO: f32 = 0.1;
/// Quality score below which the connection is reported as weak.
const LOW_QUALITY_SCORE: u32 = 50;

/// Outcome of one diagnostics campaign.
///
/// A failed campaign carries only `success = false`, the error message and the
/// timestamp; every measurement is left at zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticResult {
    /// Whether the campaign ran to completion
    pub success: bool,
    /// Why the campaign could not run
    pub error: Option<String>,
    /// Local wall-clock time the result was produced
    pub timestamp: DateTime<Local>,
    /// Campaign length in seconds
    pub duration_secs: f32,
    /// Number of measurement samples taken
    pub sample_count: usize,

    /// Mean of the sampled ping averages in milliseconds
    pub ping_average: f32,
    /// Lowest sampled ping
    pub ping_min: f32,
    /// Highest sampled ping
    pub ping_max: f32,
    /// Spread between highest and lowest sampled ping
    pub ping_jitter: f32,
    /// Latency grade
    pub ping_rating: Rating,

    /// Mean sampled send rate in bytes/sec
    pub send_rate_average: u64,
    /// Highest sampled send rate
    pub send_rate_peak: u64,
    /// Mean sampled receive rate in bytes/sec
    pub receive_rate_average: u64,
    /// Highest sampled receive rate
    pub receive_rate_peak: u64,
    /// Bytes sent plus received while the campaign ran
    pub total_bytes_transferred: u64,
    /// `total_bytes_transferred` spread over the campaign length
    pub throughput: u64,
    /// Bandwidth grade
    pub bandwidth_rating: Rating,

    /// World objects tracked at completion
    pub object_count: usize,
    /// Change in world objects while the campaign ran
    pub object_change: i64,
    /// World size grade
    pub object_rating: Rating,

    /// Whether compression was in effect at completion
    pub compression_enabled: bool,
    /// Fraction of compressed bytes saved at completion
    pub compression_ratio: f32,

    /// Quality score at completion
    pub quality_score: u32,
    /// Truncated average of the known metric grades
    pub overall_rating: Rating,
}

impl DiagnosticResult {
    /// Result recording a campaign that could not start.
    pub fn failed(error: impl Into<String>, timestamp: DateTime<Local>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::empty(timestamp)
        }
    }

    pub(crate) fn empty(timestamp: DateTime<Local>) -> Self {
        Self {
            success: false,
            error: None,
            timestamp,
            duration_secs: 0.0,
            sample_count: 0,
            ping_average: 0.0,
            ping_min: 0.0,
            ping_max: 0.0,
            ping_jitter: 0.0,
            ping_rating: Rating::Unknown,
            send_rate_average: 0,
            send_rate_peak: 0,
            receive_rate_average: 0,
            receive_rate_peak: 0,
            total_bytes_transferred: 0,
            throughput: 0,
            bandwidth_rating: Rating::Unknown,
            object_count: 0,
            object_change: 0,
            object_rating: Rating::Unknown,
            compression_enabled: false,
            compression_ratio: 0.0,
            quality_score: 0,
            overall_rating: Rating::Unknown,
        }
    }

    /// Advice derived from this result, in a fixed order.
    ///
    /// Always returns at least one line.
    pub fn recommendations(&self) -> Vec<&'static str> {
        let mut recs = Vec::new();

        if self.ping_rating == Rating::Poor {
            recs.push("High latency detected. Consider a server closer to your location.");
        }
        if self.ping_jitter > HIGH_JITTER_MS {
            recs.push("High jitter detected. Connection may be unstable.");
        }
        if self.bandwidth_rating == Rating::Poor {
            recs.push(
                "Bandwidth near limit. Consider increasing SendRateLimit or enabling compression.",
            );
        }
        if self.object_rating == Rating::Poor {
            recs.push("High world object count. Large bases or many items can cause lag.");
        }
        if !self.compression_enabled {
            recs.push("Compression is disabled. Enable it to reduce bandwidth usage.");
        }
        if self.compression_enabled && self.compression_ratio < LOW_COMPRESSION_RATIO {
            recs.push("Low compression ratio. Data may already be compressed or too small.");
        }
        if self.quality_score < LOW_QUALITY_SCORE {
            recs.push("Low quality score. Check your internet connection.");
        }

        if recs.is_empty() {
            recs.push("Network performance looks good!");
        }
        recs
    }
}

/// Renders the full multi-line report of a successful campaign.
impl fmt::Display for DiagnosticResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== NEXUS NETWORK DIAGNOSTICS ===")?;
        writeln!(f, "Test Duration: {:.1}s", self.duration_secs)?;
        writeln!(f, "Timestamp: {}", self.timestamp.format("%H:%M:%S"))?;
        writeln!(f)?;

        writeln!(f, "OVERALL: {} {}", self.overall_rating.tag(), self.overall_rating)?;
        writeln!(f, "Quality Score: {}/100", self.quality_score)?;
        writeln!(f)?;

        writeln!(f, "--- LATENCY ---")?;
        writeln!(
            f,
            "{} Ping: {:.1}ms (min: {:.1}, max: {:.1})",
            self.ping_rating.tag(),
            self.ping_average,
            self.ping_min,
            self.ping_max
        )?;
        writeln!(f, "   Jitter: {:.1}ms", self.ping_jitter)?;
        writeln!(f)?;

        writeln!(f, "--- BANDWIDTH ---")?;
        writeln!(
            f,
            "{} Send: {}/s (peak: {}/s)",
            self.bandwidth_rating.tag(),
            format_bytes(self.send_rate_average),
            format_bytes(self.send_rate_peak)
        )?;
        writeln!(
            f,
            "   Recv: {}/s (peak: {}/s)",
            format_bytes(self.receive_rate_average),
            format_bytes(self.receive_rate_peak)
        )?;
        writeln!(f, "   Throughput: {}/s", format_bytes(self.throughput))?;
        writeln!(f)?;

        writeln!(f, "--- WORLD STATE ---")?;
        writeln!(
            f,
            "{} Objects: {} ({:+} during test)",
            self.object_rating.tag(),
            self.object_count,
            self.object_change
        )?;
        writeln!(f)?;

        writeln!(f, "--- COMPRESSION ---")?;
        writeln!(f, "   Enabled: {}", if self.compression_enabled { "Yes" } else { "No" })?;
        writeln!(f, "   Ratio: {} saved", format_percent(self.compression_ratio))?;
        writeln!(f)?;

        writeln!(f, "--- RECOMMENDATIONS ---")?;
        for rec in self.recommendations() {
            writeln!(f, "   * {}", rec)?;
        }
        Ok(())
    }
}
