use std::time::Instant;

use chrono::Local;
use nexus_core::{
    config::Config,
    constants::{DIAGNOSTICS_DURATION, DIAGNOSTICS_SAMPLE_INTERVAL},
    error::{ErrorKind, Result},
};
use nexus_protocol::{CompressionEngine, RateLimiter};
use serde::Serialize;
use tracing::{info, warn};

use super::{rating::Rating, result::DiagnosticResult};
use crate::{quality::QualityScorer, world::WorldState};

/// Error text recorded when a campaign starts without a server session.
pub const NOT_CONNECTED_MESSAGE: &str = "Not connected to a server. Join a world first.";

const PING_BOUNDS_MS: [f64; 3] = [50.0, 100.0, 200.0];
const UTILIZATION_BOUNDS: [f64; 3] = [50.0, 75.0, 90.0];
const OBJECT_COUNT_BOUNDS: [f64; 3] = [5000.0, 10000.0, 20000.0];

/// Lifecycle state of a [`DiagnosticsCampaign`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum TestStatus {
    /// No campaign has run yet
    #[default]
    Idle,
    /// Sampling is in progress
    Running,
    /// The last campaign finished and produced a result
    Completed,
    /// The last start attempt was rejected
    Failed,
}

/// Read-only access to everything a campaign samples.
#[derive(Clone, Copy)]
pub struct Readings<'a> {
    /// Byte rates and lifetime totals
    pub limiter: &'a RateLimiter,
    /// Compression state and ratio
    pub compression: &'a CompressionEngine,
    /// Ping average and quality score
    pub quality: &'a QualityScorer,
    /// Configured send limit used to grade bandwidth
    pub config: &'a Config,
    /// Connectivity and world size
    pub world: &'a dyn WorldState,
}

impl Readings<'_> {
    fn total_bytes(&self) -> u64 {
        self.limiter.total_bytes_sent().saturating_add(self.limiter.total_bytes_received())
    }
}

/// Five-second on-demand network test.
///
/// [`start`](Self::start) records baselines, [`tick`](Self::tick) samples ping
/// and rates once per elapsed quarter second, and the campaign reduces its
/// samples into a [`DiagnosticResult`] once the full duration has elapsed.
#[derive(Debug, Default)]
pub struct DiagnosticsCampaign {
    status: TestStatus,
    started_at: Option<Instant>,
    /// Sample intervals already consumed
    phase: u128,
    ping_samples: Vec<f32>,
    send_samples: Vec<u64>,
    receive_samples: Vec<u64>,
    bytes_at_start: u64,
    objects_at_start: usize,
    last_result: Option<DiagnosticResult>,
}

impl DiagnosticsCampaign {
    /// Creates an idle campaign with no result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle state.
    pub fn status(&self) -> TestStatus {
        self.status
    }

    /// Result of the last completed or rejected campaign.
    pub fn last_result(&self) -> Option<&DiagnosticResult> {
        self.last_result.as_ref()
    }

    /// Number of samples taken by the running or last campaign.
    pub fn sample_count(&self) -> usize {
        self.ping_samples.len()
    }

    /// Starts a campaign at `now`.
    ///
    /// A running campaign is left untouched. Without a server session the
    /// campaign moves to [`TestStatus::Failed`] and keeps a result carrying
    /// only the error.
    pub fn start(&mut self, now: Instant, readings: &Readings<'_>) -> Result<()> {
        if self.status == TestStatus::Running {
            warn!("Diagnostics test already running");
            return Err(ErrorKind::CampaignRunning);
        }

        if !readings.world.is_connected() {
            warn!("Diagnostics test rejected: not connected to a server");
            self.last_result = Some(DiagnosticResult::failed(NOT_CONNECTED_MESSAGE, Local::now()));
            self.status = TestStatus::Failed;
            return Err(ErrorKind::NotConnected(NOT_CONNECTED_MESSAGE.to_owned()));
        }

        info!("Starting network performance test");
        self.status = TestStatus::Running;
        self.started_at = Some(now);
        self.phase = 0;
        self.ping_samples.clear();
        self.send_samples.clear();
        self.receive_samples.clear();
        self.bytes_at_start = readings.total_bytes();
        self.objects_at_start = readings.world.object_count();
        Ok(())
    }

    /// Advances a running campaign to `now`.
    ///
    /// Takes at most one sample per call, when a new sample interval has been
    /// entered, then completes once the full duration has elapsed. Returns true
    /// on the call that completes the campaign.
    pub fn tick(&mut self, now: Instant, readings: &Readings<'_>) -> bool {
        if self.status != TestStatus::Running {
            return false;
        }
        let Some(started_at) = self.started_at else {
            return false;
        };

        let elapsed = now.saturating_duration_since(started_at);
        let phase = elapsed.as_millis() / DIAGNOSTICS_SAMPLE_INTERVAL.as_millis();
        if phase > self.phase {
            self.phase = phase;
            self.collect_sample(readings);
        }

        if elapsed >= DIAGNOSTICS_DURATION {
            self.complete(readings);
            return true;
        }
        false
    }

    /// Fraction of the campaign elapsed at `now`, 0 unless running.
    pub fn progress(&self, now: Instant) -> f32 {
        match (self.status, self.started_at) {
            (TestStatus::Running, Some(started_at)) => {
                let elapsed = now.saturating_duration_since(started_at);
                (elapsed.as_secs_f32() / DIAGNOSTICS_DURATION.as_secs_f32()).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }

    /// Human-readable report of the last result.
    pub fn report(&self) -> String {
        match &self.last_result {
            None => "No test results available. Run a test first.".to_owned(),
            Some(result) if !result.success => {
                format!("Test failed: {}", result.error.as_deref().unwrap_or("unknown error"))
            }
            Some(result) => result.to_string(),
        }
    }

    /// Advice derived from the last result, empty if there is none.
    pub fn recommendations(&self) -> Vec<&'static str> {
        self.last_result.as_ref().map(DiagnosticResult::recommendations).unwrap_or_default()
    }

    /// Returns to idle and forgets samples and results. Safe to call repeatedly.
    pub fn cleanup(&mut self) {
        *self = Self::default();
    }

    fn collect_sample(&mut self, readings: &Readings<'_>) {
        self.ping_samples.push(readings.quality.ping_average());
        self.send_samples.push(readings.limiter.current_send_rate());
        self.receive_samples.push(readings.limiter.current_receive_rate());
    }

    fn complete(&mut self, readings: &Readings<'_>) {
        self.status = TestStatus::Completed;
        let result = self.reduce(readings);
        info!("Diagnostics test completed - overall: {}", result.overall_rating);
        self.last_result = Some(result);
    }

    fn reduce(&self, readings: &Readings<'_>) -> DiagnosticResult {
        let duration = DIAGNOSTICS_DURATION.as_secs_f32();
        let mut result = DiagnosticResult {
            success: true,
            duration_secs: duration,
            sample_count: self.ping_samples.len(),
            ..DiagnosticResult::empty(Local::now())
        };

        if !self.ping_samples.is_empty() {
            let (sum, min, max) = self.ping_samples.iter().fold(
                (0.0f32, f32::MAX, f32::MIN),
                |(sum, min, max), &p| (sum + p, min.min(p), max.max(p)),
            );
            result.ping_average = sum / self.ping_samples.len() as f32;
            result.ping_min = min;
            result.ping_max = max;
            result.ping_jitter = max - min;
            result.ping_rating =
                Rating::from_thresholds(result.ping_average as f64, PING_BOUNDS_MS);
        }

        (result.send_rate_average, result.send_rate_peak) = mean_and_peak(&self.send_samples);
        (result.receive_rate_average, result.receive_rate_peak) =
            mean_and_peak(&self.receive_samples);

        result.total_bytes_transferred = readings.total_bytes().saturating_sub(self.bytes_at_start);
        result.throughput = (result.total_bytes_transferred as f64 / duration as f64) as u64;

        let send_limit = readings.config.send_rate_limit;
        let utilization = if send_limit > 0 {
            result.send_rate_average as f64 / send_limit as f64 * 100.0
        } else {
            0.0
        };
        result.bandwidth_rating = Rating::from_thresholds(utilization, UTILIZATION_BOUNDS);

        let objects = readings.world.object_count();
        result.object_count = objects;
        result.object_change = objects as i64 - self.objects_at_start as i64;
        result.object_rating = Rating::from_thresholds(objects as f64, OBJECT_COUNT_BOUNDS);

        result.compression_enabled = readings.compression.is_compression_enabled();
        result.compression_ratio = readings.compression.compression_ratio();
        result.quality_score = readings.quality.quality_score();

        result.overall_rating =
            Rating::overall(&[result.ping_rating, result.bandwidth_rating, result.object_rating]);
        result
    }
}

fn mean_and_peak(samples: &[u64]) -> (u64, u64) {
    if samples.is_empty() {
        return (0, 0);
    }
    let sum: u64 = samples.iter().sum();
    let peak = samples.iter().copied().max().unwrap_or(0);
    (sum / samples.len() as u64, peak)
}
