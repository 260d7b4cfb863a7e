use std::default::Default;

use serde::{Deserialize, Serialize};

/// Effective per-second byte budget for one traffic direction.
#[derive(Clone, Debug, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Limit {
    /// No cap; admission always succeeds.
    #[default]
    Unlimited,
    /// At most this many bytes per accounting window.
    Bounded(u64),
}

impl Limit {
    /// Builds a limit from a raw settings value, where `0` means unlimited.
    pub fn from_bytes_per_sec(bytes_per_sec: u32) -> Self {
        if bytes_per_sec == 0 {
            Limit::Unlimited
        } else {
            Limit::Bounded(bytes_per_sec as u64)
        }
    }

    /// Returns true if this limit never rejects.
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Limit::Unlimited)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Already-validated settings handed to the shaper by its host.
pub struct Config {
    /// Outgoing bandwidth limit in bytes/sec (0 = unlimited).
    pub send_rate_limit: u32,
    /// Incoming bandwidth limit in bytes/sec (0 = unlimited).
    pub receive_rate_limit: u32,
    /// Remove both bandwidth limits regardless of the configured values.
    pub unlimited_bandwidth: bool,
    /// Compress payloads for peers that support the frame format.
    pub compression_enabled: bool,
    /// Server-enforced override: compression is on even if locally disabled.
    pub force_compression: bool,
    /// Gzip compression level (1 = fastest, 9 = smallest).
    pub compression_level: u32,
    /// Minimum payload size in bytes before compression is attempted.
    pub compression_threshold: usize,
    /// Skip payloads whose byte distribution looks incompressible.
    pub compression_entropy_check: bool,
    /// Per-connection outgoing queue budget in bytes.
    pub outgoing_queue_size: usize,
    /// Per-connection burst buffer size in bytes.
    pub connection_buffer_size: usize,
    /// Total queue size in bytes before packets are dropped.
    pub max_queue_size: usize,
    /// Network update rate percentage (100 = unmodified).
    pub default_update_rate: u32,
    /// Floor for the update rate percentage when auto-adjusting.
    pub min_update_rate: u32,
    /// Lower the update rate when connection quality degrades.
    pub auto_adjust_update_rate: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            send_rate_limit: 512_000,
            receive_rate_limit: 512_000,
            unlimited_bandwidth: false,
            compression_enabled: true,
            force_compression: false,
            compression_level: 6,
            compression_threshold: 128, // Don't compress packets smaller than 128 bytes
            compression_entropy_check: false,
            outgoing_queue_size: 48 * 1024,
            connection_buffer_size: 64 * 1024,
            max_queue_size: 128 * 1024,
            default_update_rate: 100,
            min_update_rate: 50,
            auto_adjust_update_rate: true,
        }
    }
}

impl Config {
    /// Returns the outgoing limit, accounting for unlimited mode.
    pub fn effective_send_limit(&self) -> Limit {
        if self.unlimited_bandwidth {
            return Limit::Unlimited;
        }
        Limit::from_bytes_per_sec(self.send_rate_limit)
    }

    /// Returns the incoming limit, accounting for unlimited mode.
    pub fn effective_receive_limit(&self) -> Limit {
        if self.unlimited_bandwidth {
            return Limit::Unlimited;
        }
        Limit::from_bytes_per_sec(self.receive_rate_limit)
    }

    /// Returns a copy with every numeric setting clamped into its accepted range.
    pub fn clamped(mut self) -> Self {
        self.send_rate_limit = clamp_logged("send_rate_limit", self.send_rate_limit, 0, 10_000_000);
        self.receive_rate_limit =
            clamp_logged("receive_rate_limit", self.receive_rate_limit, 0, 10_000_000);
        self.compression_level = clamp_logged("compression_level", self.compression_level, 1, 9);
        self.compression_threshold =
            clamp_logged("compression_threshold", self.compression_threshold, 0, 4096);
        self.outgoing_queue_size =
            clamp_logged("outgoing_queue_size", self.outgoing_queue_size, 16 * 1024, 256 * 1024);
        self.connection_buffer_size = clamp_logged(
            "connection_buffer_size",
            self.connection_buffer_size,
            32 * 1024,
            512 * 1024,
        );
        self.max_queue_size =
            clamp_logged("max_queue_size", self.max_queue_size, 64 * 1024, 1024 * 1024);
        self.default_update_rate =
            clamp_logged("default_update_rate", self.default_update_rate, 25, 200);
        self.min_update_rate = clamp_logged("min_update_rate", self.min_update_rate, 10, 100);
        self
    }
}

fn clamp_logged<T>(name: &str, value: T, min: T, max: T) -> T
where
    T: PartialOrd + Copy + std::fmt::Display,
{
    let clamped = if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    };
    if clamped != value {
        tracing::warn!("{} {} is outside {}..={}, clamping to {}", name, value, min, max, clamped);
    }
    clamped
}
