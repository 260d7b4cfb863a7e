//! Bandwidth accounting and advisory rate limiting.
//!
//! This module tracks bytes sent and received within one-second windows and
//! answers whether a transfer would stay within the configured limits.
//!
//! # Windows
//!
//! Each direction keeps a counter for the current window. Once a full second has
//! elapsed, the next operation that observes the clock pushes the finished
//! window's total onto a short history (at most
//! [`RATE_HISTORY_SIZE`](nexus_core::constants::RATE_HISTORY_SIZE) entries,
//! oldest evicted first) and starts a new window at zero. There is no timer:
//! rollover happens lazily in [`RateLimiter::can_send`],
//! [`RateLimiter::record_sent`] and friends, or explicitly via
//! [`RateLimiter::update_window`].
//!
//! # Advisory admission
//!
//! [`RateLimiter::can_send`] only reports whether a transfer fits. Recording is
//! a separate call that always succeeds, so a host may send and record bytes the
//! limiter advised against.

use std::{collections::VecDeque, time::Instant};

use nexus_core::{
    config::{Config, Limit},
    constants::{RATE_HISTORY_SIZE, RATE_WINDOW, UNLIMITED_CAPACITY},
};

/// Per-direction accounting for the current window plus recent history.
#[derive(Debug, Clone, Default)]
struct RateWindow {
    /// Bytes recorded in the current window
    bytes_this_second: u64,
    /// Bytes recorded since construction
    total_bytes: u64,
    /// Totals of the most recent completed windows, oldest first
    history: VecDeque<u64>,
}

impl RateWindow {
    fn roll_over(&mut self) {
        self.history.push_back(self.bytes_this_second);
        while self.history.len() > RATE_HISTORY_SIZE {
            self.history.pop_front();
        }
        self.bytes_this_second = 0;
    }

    fn record(&mut self, bytes: u64) {
        self.bytes_this_second = self.bytes_this_second.saturating_add(bytes);
        self.total_bytes = self.total_bytes.saturating_add(bytes);
    }

    fn admits(&self, bytes: u64, limit: Limit) -> bool {
        match limit {
            Limit::Unlimited => true,
            Limit::Bounded(max) => self.bytes_this_second.saturating_add(bytes) <= max,
        }
    }

    fn average_rate(&self) -> u64 {
        if self.history.is_empty() {
            return 0;
        }
        self.history.iter().sum::<u64>() / self.history.len() as u64
    }

    fn remaining(&self, limit: Limit) -> u64 {
        match limit {
            Limit::Unlimited => UNLIMITED_CAPACITY,
            Limit::Bounded(max) => max.saturating_sub(self.bytes_this_second),
        }
    }

    fn utilization(&self, limit: Limit) -> f32 {
        match limit {
            Limit::Bounded(max) if max > 0 => self.bytes_this_second as f32 / max as f32 * 100.0,
            _ => 0.0,
        }
    }
}

/// Tracks send/receive byte rates against configured per-second limits.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    send_limit: Limit,
    receive_limit: Limit,
    sent: RateWindow,
    received: RateWindow,
    /// Start of the current measurement window
    window_start: Instant,
}

impl RateLimiter {
    /// Creates a rate limiter with explicit limits, starting its first window at `now`.
    pub fn new(send_limit: Limit, receive_limit: Limit, now: Instant) -> Self {
        Self {
            send_limit,
            receive_limit,
            sent: RateWindow::default(),
            received: RateWindow::default(),
            window_start: now,
        }
    }

    /// Creates a rate limiter using the effective limits of `config`.
    pub fn from_config(config: &Config, now: Instant) -> Self {
        Self::new(config.effective_send_limit(), config.effective_receive_limit(), now)
    }

    /// Creates a rate limiter that never rejects.
    pub fn unlimited(now: Instant) -> Self {
        Self::new(Limit::Unlimited, Limit::Unlimited, now)
    }

    /// Re-reads both limits from configuration. Counters and history are kept.
    pub fn refresh_limits(&mut self, config: &Config) {
        self.send_limit = config.effective_send_limit();
        self.receive_limit = config.effective_receive_limit();
        tracing::debug!(
            "Bandwidth limits refreshed - send: {:?}, receive: {:?}",
            self.send_limit,
            self.receive_limit
        );
    }

    /// Rolls the window over if at least one second has elapsed since it started.
    ///
    /// Returns `true` if the window was reset.
    pub fn update_window(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.window_start) >= RATE_WINDOW {
            self.sent.roll_over();
            self.received.roll_over();
            self.window_start = now;
            true
        } else {
            false
        }
    }

    /// Returns whether sending `bytes` more would stay within the outgoing limit.
    pub fn can_send(&mut self, bytes: u64, now: Instant) -> bool {
        self.update_window(now);
        self.sent.admits(bytes, self.send_limit)
    }

    /// Returns whether receiving `bytes` more would stay within the incoming limit.
    pub fn can_receive(&mut self, bytes: u64, now: Instant) -> bool {
        self.update_window(now);
        self.received.admits(bytes, self.receive_limit)
    }

    /// Records bytes sent, regardless of what [`can_send`](Self::can_send) advised.
    pub fn record_sent(&mut self, bytes: u64, now: Instant) {
        self.update_window(now);
        self.sent.record(bytes);
    }

    /// Records bytes received, regardless of what [`can_receive`](Self::can_receive) advised.
    pub fn record_received(&mut self, bytes: u64, now: Instant) {
        self.update_window(now);
        self.received.record(bytes);
    }

    /// Mean of the recent completed send windows, in bytes per second.
    pub fn current_send_rate(&self) -> u64 {
        self.sent.average_rate()
    }

    /// Mean of the recent completed receive windows, in bytes per second.
    pub fn current_receive_rate(&self) -> u64 {
        self.received.average_rate()
    }

    /// Bytes that may still be sent this window, or
    /// [`UNLIMITED_CAPACITY`] when unlimited.
    pub fn remaining_send_capacity(&self) -> u64 {
        self.sent.remaining(self.send_limit)
    }

    /// Bytes that may still be received this window, or
    /// [`UNLIMITED_CAPACITY`] when unlimited.
    pub fn remaining_receive_capacity(&self) -> u64 {
        self.received.remaining(self.receive_limit)
    }

    /// Percentage of the send limit used this window; `0.0` when unlimited.
    pub fn send_utilization(&self) -> f32 {
        self.sent.utilization(self.send_limit)
    }

    /// Percentage of the receive limit used this window; `0.0` when unlimited.
    pub fn receive_utilization(&self) -> f32 {
        self.received.utilization(self.receive_limit)
    }

    /// Bytes sent in the current window.
    pub fn bytes_sent_this_second(&self) -> u64 {
        self.sent.bytes_this_second
    }

    /// Bytes received in the current window.
    pub fn bytes_received_this_second(&self) -> u64 {
        self.received.bytes_this_second
    }

    /// Lifetime bytes sent.
    pub fn total_bytes_sent(&self) -> u64 {
        self.sent.total_bytes
    }

    /// Lifetime bytes received.
    pub fn total_bytes_received(&self) -> u64 {
        self.received.total_bytes
    }

    /// Returns the outgoing limit in force.
    pub fn send_limit(&self) -> Limit {
        self.send_limit
    }

    /// Returns the incoming limit in force.
    pub fn receive_limit(&self) -> Limit {
        self.receive_limit
    }

    /// Number of completed windows currently held in the send history.
    pub fn history_len(&self) -> usize {
        self.sent.history.len()
    }

    /// Clears rate history. Safe to call repeatedly.
    pub fn cleanup(&mut self) {
        self.sent.history.clear();
        self.received.history.clear();
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::unlimited(Instant::now())
    }
}
