//! Connection quality scoring.
//!
//! [`QualityScorer`] polls the rate limiter, compression engine and queue
//! tracker at most once per [`QUALITY_UPDATE_INTERVAL`], keeps a display
//! snapshot of what it read, and folds utilization, ping and packet loss into a
//! single 0 to 100 score. Ping and loss arrive from outside as samples and are
//! smoothed with an exponential moving average.

use std::time::Instant;

use nexus_core::{
    config::Config,
    constants::{EMA_SAMPLE_WEIGHT, QUALITY_UPDATE_INTERVAL},
};
use nexus_peer::QueueTracker;
use nexus_protocol::{CompressionEngine, RateLimiter};
use nexus_utilities::{format_bytes, format_bytes_short};

/// Score reported before any penalty applies.
pub const MAX_QUALITY_SCORE: u32 = 100;

/// Values read from the other components on the last update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QualitySnapshot {
    /// Average completed-window send rate in bytes/sec
    pub send_rate: u64,
    /// Average completed-window receive rate in bytes/sec
    pub receive_rate: u64,
    /// Percent of the send limit used in the current window
    pub send_utilization: f32,
    /// Percent of the receive limit used in the current window
    pub receive_utilization: f32,
    /// Fraction of compressed bytes saved
    pub compression_ratio: f32,
    /// Bytes queued across all connections
    pub queue_size: usize,
}

/// Computes the quality score from utilization (percent), packet loss
/// (percent) and average ping (milliseconds).
pub fn compute_score(
    send_utilization: f32,
    receive_utilization: f32,
    packet_loss_percent: f32,
    ping_ms: f32,
) -> u32 {
    let mut score = MAX_QUALITY_SCORE as i32;

    for utilization in [send_utilization, receive_utilization] {
        if utilization > 90.0 {
            score -= 20;
        } else if utilization > 75.0 {
            score -= 10;
        }
    }

    if packet_loss_percent > 5.0 {
        score -= 30;
    } else if packet_loss_percent > 2.0 {
        score -= 15;
    } else if packet_loss_percent > 0.5 {
        score -= 5;
    }

    if ping_ms > 200.0 {
        score -= 20;
    } else if ping_ms > 100.0 {
        score -= 10;
    } else if ping_ms > 50.0 {
        score -= 5;
    }

    score.clamp(0, MAX_QUALITY_SCORE as i32) as u32
}

fn smooth(average: f32, sample: f32) -> f32 {
    average * (1.0 - EMA_SAMPLE_WEIGHT) + sample * EMA_SAMPLE_WEIGHT
}

/// Periodic connection quality scorer.
#[derive(Debug, Clone)]
pub struct QualityScorer {
    last_update: Option<Instant>,
    snapshot: QualitySnapshot,
    ping_average: f32,
    packet_loss_percent: f32,
    quality_score: u32,
}

impl QualityScorer {
    /// Creates a scorer reporting a perfect score until its first update.
    pub fn new() -> Self {
        Self {
            last_update: None,
            snapshot: QualitySnapshot::default(),
            ping_average: 0.0,
            packet_loss_percent: 0.0,
            quality_score: MAX_QUALITY_SCORE,
        }
    }

    /// Refreshes the snapshot and score if the update interval has elapsed.
    ///
    /// The first call always updates. Returns true if an update happened.
    pub fn update(
        &mut self,
        now: Instant,
        limiter: &RateLimiter,
        compression: &CompressionEngine,
        queue: &QueueTracker,
    ) -> bool {
        if let Some(last) = self.last_update {
            if now.saturating_duration_since(last) < QUALITY_UPDATE_INTERVAL {
                return false;
            }
        }
        self.last_update = Some(now);

        self.snapshot = QualitySnapshot {
            send_rate: limiter.current_send_rate(),
            receive_rate: limiter.current_receive_rate(),
            send_utilization: limiter.send_utilization(),
            receive_utilization: limiter.receive_utilization(),
            compression_ratio: compression.compression_ratio(),
            queue_size: queue.current_queue_size(),
        };
        self.quality_score = compute_score(
            self.snapshot.send_utilization,
            self.snapshot.receive_utilization,
            self.packet_loss_percent,
            self.ping_average,
        );
        true
    }

    /// Feeds a round-trip time sample in milliseconds.
    ///
    /// Non-finite samples are ignored.
    pub fn record_ping(&mut self, ping_ms: f32) {
        if !ping_ms.is_finite() {
            return;
        }
        self.ping_average = smooth(self.ping_average, ping_ms);
    }

    /// Feeds a packet loss sample in percent.
    ///
    /// Non-finite samples are ignored.
    pub fn record_packet_loss(&mut self, loss_percent: f32) {
        if !loss_percent.is_finite() {
            return;
        }
        self.packet_loss_percent = smooth(self.packet_loss_percent, loss_percent);
    }

    /// Smoothed ping in milliseconds.
    pub fn ping_average(&self) -> f32 {
        self.ping_average
    }

    /// Smoothed packet loss in percent.
    pub fn packet_loss_percent(&self) -> f32 {
        self.packet_loss_percent
    }

    /// Score computed on the last update.
    pub fn quality_score(&self) -> u32 {
        self.quality_score
    }

    /// Values read on the last update.
    pub fn snapshot(&self) -> &QualitySnapshot {
        &self.snapshot
    }

    /// Advisory multiplier for the host's world update rate.
    ///
    /// Starts from `default_update_rate` percent. With auto-adjust on and a
    /// score below 50 it is scaled by the score, but never below
    /// `min_update_rate` percent.
    pub fn update_rate_multiplier(&self, config: &Config) -> f32 {
        let base = config.default_update_rate as f32 / 100.0;
        if !config.auto_adjust_update_rate || self.quality_score >= 50 {
            return base;
        }
        let adjusted = base * self.quality_score as f32 / 100.0;
        adjusted.max(config.min_update_rate as f32 / 100.0)
    }

    /// Multi-line stats panel.
    pub fn stats_display(&self) -> String {
        let s = &self.snapshot;
        format!(
            "Nexus Network Stats\n\
             Send: {}/s ({:.1}%)\n\
             Recv: {}/s ({:.1}%)\n\
             Compression: {:.1}% saved\n\
             Queue: {}\n\
             Quality: {}/{}",
            format_bytes(s.send_rate),
            s.send_utilization,
            format_bytes(s.receive_rate),
            s.receive_utilization,
            s.compression_ratio * 100.0,
            format_bytes(s.queue_size as u64),
            self.quality_score,
            MAX_QUALITY_SCORE,
        )
    }

    /// One-line stats summary.
    pub fn brief_stats(&self) -> String {
        format!(
            "TX:{}/s RX:{}/s Q:{}",
            format_bytes_short(self.snapshot.send_rate),
            format_bytes_short(self.snapshot.receive_rate),
            self.quality_score
        )
    }

    /// Resets to the freshly constructed state. Safe to call repeatedly.
    pub fn cleanup(&mut self) {
        *self = Self::new();
    }
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use nexus_core::Limit;

    use super::*;

    fn components(now: Instant) -> (RateLimiter, CompressionEngine, QueueTracker) {
        let limiter = RateLimiter::new(Limit::Bounded(1000), Limit::Bounded(1000), now);
        (limiter, CompressionEngine::default(), QueueTracker::default())
    }

    #[test]
    fn test_score_without_penalties() {
        assert_eq!(compute_score(0.0, 0.0, 0.0, 0.0), 100);
        assert_eq!(compute_score(75.0, 75.0, 0.5, 50.0), 100);
    }

    #[test]
    fn test_utilization_penalties_apply_per_direction() {
        assert_eq!(compute_score(80.0, 0.0, 0.0, 0.0), 90);
        assert_eq!(compute_score(80.0, 80.0, 0.0, 0.0), 80);
        assert_eq!(compute_score(95.0, 80.0, 0.0, 0.0), 70);
        assert_eq!(compute_score(95.0, 95.0, 0.0, 0.0), 60);
    }

    #[test]
    fn test_loss_and_ping_penalties() {
        assert_eq!(compute_score(0.0, 0.0, 1.0, 0.0), 95);
        assert_eq!(compute_score(0.0, 0.0, 3.0, 0.0), 85);
        assert_eq!(compute_score(0.0, 0.0, 6.0, 0.0), 70);
        assert_eq!(compute_score(0.0, 0.0, 0.0, 60.0), 95);
        assert_eq!(compute_score(0.0, 0.0, 0.0, 150.0), 90);
        assert_eq!(compute_score(0.0, 0.0, 0.0, 250.0), 80);
    }

    #[test]
    fn test_score_stays_in_bounds() {
        assert_eq!(compute_score(100.0, 100.0, 50.0, 1000.0), 10);
        for util in [0.0, 76.0, 91.0, f32::MAX] {
            for loss in [0.0, 1.0, 3.0, 100.0] {
                for ping in [0.0, 60.0, 150.0, f32::INFINITY] {
                    assert!(compute_score(util, util, loss, ping) <= 100);
                }
            }
        }
    }

    #[test]
    fn test_ping_moving_average() {
        let mut scorer = QualityScorer::new();
        scorer.record_ping(100.0);
        assert!((scorer.ping_average() - 20.0).abs() < 1e-4);
        scorer.record_ping(100.0);
        assert!((scorer.ping_average() - 36.0).abs() < 1e-4);
    }

    #[test]
    fn test_non_finite_samples_are_ignored() {
        let mut scorer = QualityScorer::new();
        scorer.record_ping(100.0);
        scorer.record_packet_loss(10.0);

        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            scorer.record_ping(bad);
            scorer.record_packet_loss(bad);
        }
        assert!((scorer.ping_average() - 20.0).abs() < 1e-4);
        assert!((scorer.packet_loss_percent() - 2.0).abs() < 1e-4);

        scorer.record_ping(100.0);
        assert!((scorer.ping_average() - 36.0).abs() < 1e-4);
    }

    #[test]
    fn test_update_respects_interval() {
        let base = Instant::now();
        let (limiter, compression, queue) = components(base);
        let mut scorer = QualityScorer::new();

        assert!(scorer.update(base, &limiter, &compression, &queue));
        assert!(!scorer.update(base + Duration::from_millis(499), &limiter, &compression, &queue));
        assert!(scorer.update(base + Duration::from_millis(500), &limiter, &compression, &queue));
    }

    #[test]
    fn test_update_reads_utilization() {
        let base = Instant::now();
        let (mut limiter, compression, queue) = components(base);
        limiter.record_sent(950, base);
        limiter.record_received(800, base);

        let mut scorer = QualityScorer::new();
        for _ in 0..20 {
            scorer.record_ping(300.0);
        }
        scorer.update(base, &limiter, &compression, &queue);

        assert!((scorer.snapshot().send_utilization - 95.0).abs() < 1e-3);
        // -20 send, -10 receive, -20 ping
        assert_eq!(scorer.quality_score(), 50);
    }

    #[test]
    fn test_update_rate_multiplier() {
        let mut scorer = QualityScorer::new();
        let config = Config::default();
        assert!((scorer.update_rate_multiplier(&config) - 1.0).abs() < f32::EPSILON);

        scorer.quality_score = 40;
        // 1.0 * 0.4 clamps up to the 0.5 floor
        assert!((scorer.update_rate_multiplier(&config) - 0.5).abs() < f32::EPSILON);

        let generous = Config { default_update_rate: 200, ..Config::default() };
        assert!((scorer.update_rate_multiplier(&generous) - 0.8).abs() < 1e-6);

        let fixed = Config { auto_adjust_update_rate: false, ..Config::default() };
        assert!((scorer.update_rate_multiplier(&fixed) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_display_strings() {
        let base = Instant::now();
        let (mut limiter, compression, mut queue) = components(base);
        limiter.record_sent(2048, base);
        limiter.update_window(base + Duration::from_secs(1));
        queue.register_connection(1);
        queue.record_queued(1, 1536);

        let mut scorer = QualityScorer::new();
        scorer.update(base + Duration::from_secs(1), &limiter, &compression, &queue);

        assert_eq!(scorer.brief_stats(), "TX:2K/s RX:0B/s Q:100");
        assert_eq!(
            scorer.stats_display(),
            "Nexus Network Stats\n\
             Send: 2.00 KB/s (0.0%)\n\
             Recv: 0 B/s (0.0%)\n\
             Compression: 0.0% saved\n\
             Queue: 1.50 KB\n\
             Quality: 100/100"
        );
    }

    #[test]
    fn test_cleanup_restores_defaults() {
        let mut scorer = QualityScorer::new();
        scorer.record_ping(500.0);
        scorer.record_packet_loss(10.0);
        scorer.cleanup();
        scorer.cleanup();
        assert_eq!(scorer.ping_average(), 0.0);
        assert_eq!(scorer.packet_loss_percent(), 0.0);
        assert_eq!(scorer.quality_score(), 100);
    }
}
