use std::{borrow::Cow, sync::Arc, time::Instant};

use nexus_core::{config::Config, error::Result, PeerId};
use nexus_peer::QueueTracker;
use nexus_protocol::{CompressionEngine, RateLimiter};
use tracing::debug;

use crate::{
    diagnostics::{DiagnosticsCampaign, Readings},
    quality::QualityScorer,
    time::{Clock, SystemClock},
    world::WorldState,
};

/// Context object owning every shaper component.
///
/// The host reports socket events through the `on_*` methods, routes payloads
/// through [`compress_for_peer`](Self::compress_for_peer) and
/// [`decompress_from_peer`](Self::decompress_from_peer), and calls
/// [`tick`](Self::tick) once per frame. Nothing here blocks or spawns.
pub struct Shaper {
    config: Config,
    limiter: RateLimiter,
    compression: CompressionEngine,
    queue: QueueTracker,
    quality: QualityScorer,
    diagnostics: DiagnosticsCampaign,
    overlay_visible: bool,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Shaper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shaper")
            .field("config", &self.config)
            .field("limiter", &self.limiter)
            .field("compression", &self.compression)
            .field("queue", &self.queue)
            .field("quality", &self.quality)
            .field("diagnostics", &self.diagnostics)
            .field("overlay_visible", &self.overlay_visible)
            .finish()
    }
}

impl Shaper {
    /// Creates a shaper driven by the system clock.
    pub fn new(config: Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a shaper with a custom clock for the `*_now` helpers.
    ///
    /// Out-of-range settings are clamped first.
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Self {
        let config = config.clamped();
        Self {
            limiter: RateLimiter::from_config(&config, clock.now()),
            compression: CompressionEngine::new(&config),
            queue: QueueTracker::new(&config),
            quality: QualityScorer::new(),
            diagnostics: DiagnosticsCampaign::new(),
            overlay_visible: false,
            config,
            clock,
        }
    }

    /// Current instant according to the shaper's clock.
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Settings in force.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Applies new settings to every component.
    ///
    /// Registered connections keep the queue budget they registered with.
    pub fn refresh_config(&mut self, config: Config) {
        let config = config.clamped();
        self.limiter.refresh_limits(&config);
        self.compression.apply_config(&config);
        self.queue.refresh_settings(&config);
        self.config = config;
        debug!("Shaper configuration refreshed");
    }

    /// Bandwidth accounting.
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Compression state.
    pub fn compression(&self) -> &CompressionEngine {
        &self.compression
    }

    /// Queue accounting.
    pub fn queue(&self) -> &QueueTracker {
        &self.queue
    }

    /// Quality scoring.
    pub fn quality(&self) -> &QualityScorer {
        &self.quality
    }

    /// Diagnostics campaign.
    pub fn diagnostics(&self) -> &DiagnosticsCampaign {
        &self.diagnostics
    }

    // ------------------------------------------------------------------
    // Bandwidth
    // ------------------------------------------------------------------

    /// Whether sending `bytes` now stays within the send limit.
    pub fn can_send(&mut self, bytes: usize, now: Instant) -> bool {
        self.limiter.can_send(bytes as u64, now)
    }

    /// Whether receiving `bytes` now stays within the receive limit.
    pub fn can_receive(&mut self, bytes: usize, now: Instant) -> bool {
        self.limiter.can_receive(bytes as u64, now)
    }

    /// Reports bytes written to the socket.
    pub fn on_send(&mut self, bytes: usize, now: Instant) {
        self.limiter.record_sent(bytes as u64, now);
    }

    /// Reports bytes read from the socket.
    pub fn on_receive(&mut self, bytes: usize, now: Instant) {
        self.limiter.record_received(bytes as u64, now);
    }

    /// [`on_send`](Self::on_send) at the clock's current instant.
    pub fn on_send_now(&mut self, bytes: usize) {
        let now = self.now();
        self.on_send(bytes, now);
    }

    /// [`on_receive`](Self::on_receive) at the clock's current instant.
    pub fn on_receive_now(&mut self, bytes: usize) {
        let now = self.now();
        self.on_receive(bytes, now);
    }

    // ------------------------------------------------------------------
    // Connections and queues
    // ------------------------------------------------------------------

    /// Starts tracking a connection's outgoing queue.
    pub fn on_connect(&mut self, id: PeerId) {
        self.queue.register_connection(id);
    }

    /// Forgets a connection's queue and compression capability.
    pub fn on_disconnect(&mut self, id: PeerId) {
        self.queue.unregister_connection(id);
        self.compression.unregister_peer(id);
    }

    /// Marks a peer as able to read compressed frames.
    pub fn on_peer_capable(&mut self, id: PeerId) {
        self.compression.register_peer(id);
    }

    /// Whether `size` bytes fit in the connection's queue.
    pub fn can_queue(&self, id: PeerId, size: usize) -> bool {
        self.queue.can_queue(id, size)
    }

    /// Reports a packet placed on a connection's queue.
    pub fn on_queued(&mut self, id: PeerId, size: usize) {
        self.queue.record_queued(id, size);
    }

    /// Reports a queued packet leaving the connection's queue.
    pub fn on_dequeued(&mut self, id: PeerId, size: usize) {
        self.queue.record_sent(id, size);
    }

    /// Reports a packet dropped instead of queued.
    pub fn on_dropped(&mut self, id: PeerId, size: usize) {
        self.queue.record_dropped(id, size);
    }

    // ------------------------------------------------------------------
    // Payload transforms
    // ------------------------------------------------------------------

    /// Compresses an outbound payload when the peer and settings allow.
    pub fn compress_for_peer<'a>(&mut self, id: PeerId, payload: &'a [u8]) -> Cow<'a, [u8]> {
        self.compression.compress_for_peer(id, payload)
    }

    /// Unwraps an inbound compressed frame; anything else passes through.
    pub fn decompress_from_peer<'a>(&mut self, payload: &'a [u8]) -> Cow<'a, [u8]> {
        self.compression.decompress_from_peer(payload)
    }

    /// Applies the server-enforced compression override.
    pub fn set_server_forced_compression(&mut self, forced: bool) {
        self.compression.set_forced(forced);
    }

    // ------------------------------------------------------------------
    // Quality
    // ------------------------------------------------------------------

    /// Feeds a round-trip time sample in milliseconds.
    pub fn record_ping(&mut self, ping_ms: f32) {
        self.quality.record_ping(ping_ms);
    }

    /// Feeds a packet loss sample in percent.
    pub fn record_packet_loss(&mut self, loss_percent: f32) {
        self.quality.record_packet_loss(loss_percent);
    }

    /// Advisory multiplier for the host's world update rate.
    pub fn update_rate_multiplier(&self) -> f32 {
        self.quality.update_rate_multiplier(&self.config)
    }

    // ------------------------------------------------------------------
    // Periodic work
    // ------------------------------------------------------------------

    /// Per-frame update: rolls the bandwidth window, refreshes the quality
    /// score on its cadence and advances a running diagnostics campaign.
    pub fn tick(&mut self, now: Instant, world: &dyn WorldState) {
        self.limiter.update_window(now);
        self.quality.update(now, &self.limiter, &self.compression, &self.queue);

        let readings = Readings {
            limiter: &self.limiter,
            compression: &self.compression,
            quality: &self.quality,
            config: &self.config,
            world,
        };
        self.diagnostics.tick(now, &readings);
    }

    /// [`tick`](Self::tick) at the clock's current instant.
    pub fn tick_now(&mut self, world: &dyn WorldState) {
        let now = self.now();
        self.tick(now, world);
    }

    /// Starts a diagnostics campaign at `now`.
    pub fn start_diagnostics(&mut self, now: Instant, world: &dyn WorldState) -> Result<()> {
        let readings = Readings {
            limiter: &self.limiter,
            compression: &self.compression,
            quality: &self.quality,
            config: &self.config,
            world,
        };
        self.diagnostics.start(now, &readings)
    }

    // ------------------------------------------------------------------
    // Overlay
    // ------------------------------------------------------------------

    /// Whether the host should draw the stats overlay.
    pub fn overlay_visible(&self) -> bool {
        self.overlay_visible
    }

    /// Flips overlay visibility and returns the new state.
    pub fn toggle_overlay(&mut self) -> bool {
        self.overlay_visible = !self.overlay_visible;
        self.overlay_visible
    }

    /// Clears every component's collections and history. Safe to call repeatedly.
    pub fn cleanup(&mut self) {
        self.limiter.cleanup();
        self.compression.cleanup();
        self.queue.cleanup();
        self.quality.cleanup();
        self.diagnostics.cleanup();
        self.overlay_visible = false;
    }
}

impl Default for Shaper {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{diagnostics::TestStatus, time::ManualClock, world::WorldSnapshot};

    fn compressible(len: usize) -> Vec<u8> {
        b"position:12.5,0.0,-3.25;rotation:0,90,0;".iter().copied().cycle().take(len).collect()
    }

    #[test]
    fn test_new_clamps_config() {
        let shaper = Shaper::new(Config { compression_level: 42, ..Config::default() });
        assert_eq!(shaper.config().compression_level, 9);
    }

    #[test]
    fn test_connection_lifecycle() {
        let mut shaper = Shaper::default();
        shaper.on_connect(1);
        shaper.on_peer_capable(1);
        assert!(shaper.compression().is_peer_registered(1));
        assert_eq!(shaper.queue().connection_count(), 1);

        shaper.on_disconnect(1);
        assert!(!shaper.compression().is_peer_registered(1));
        assert_eq!(shaper.queue().connection_count(), 0);
    }

    #[test]
    fn test_transforms_route_through_engine() {
        let mut shaper = Shaper::default();
        shaper.on_peer_capable(3);
        let payload = compressible(2048);

        let wire = shaper.compress_for_peer(3, &payload).into_owned();
        assert!(wire.len() < payload.len());
        assert_eq!(&*shaper.decompress_from_peer(&wire), payload.as_slice());

        // Unknown peer gets the original bytes back
        assert_eq!(&*shaper.compress_for_peer(4, &payload), payload.as_slice());
    }

    #[test]
    fn test_server_override_enables_compression() {
        let mut shaper = Shaper::new(Config { compression_enabled: false, ..Config::default() });
        assert!(!shaper.compression().is_compression_enabled());
        shaper.set_server_forced_compression(true);
        assert!(shaper.compression().is_compression_enabled());
    }

    #[test]
    fn test_refresh_config_updates_limits() {
        let mut shaper = Shaper::default();
        let now = shaper.now();
        assert!(!shaper.can_send(10_000_000, now));

        shaper.refresh_config(Config { unlimited_bandwidth: true, ..Config::default() });
        assert!(shaper.can_send(10_000_000, now));
    }

    #[test]
    fn test_tick_rolls_window_without_traffic() {
        let clock = Arc::new(ManualClock::default());
        let mut shaper = Shaper::with_clock(Config::default(), clock.clone());
        let world = WorldSnapshot::connected(0);

        shaper.on_send_now(4096);
        clock.advance(Duration::from_secs(1));
        shaper.tick_now(&world);

        assert_eq!(shaper.limiter().current_send_rate(), 4096);
        assert_eq!(shaper.limiter().bytes_sent_this_second(), 0);
    }

    #[test]
    fn test_diagnostics_through_shaper() {
        let clock = Arc::new(ManualClock::default());
        let mut shaper = Shaper::with_clock(Config::default(), clock.clone());
        let world = WorldSnapshot::connected(250);

        let now = shaper.now();
        shaper.start_diagnostics(now, &world).unwrap();
        for _ in 0..20 {
            clock.advance(Duration::from_millis(250));
            shaper.tick_now(&world);
        }

        assert_eq!(shaper.diagnostics().status(), TestStatus::Completed);
        assert_eq!(shaper.diagnostics().sample_count(), 20);
    }

    #[test]
    fn test_overlay_toggle_and_cleanup() {
        let mut shaper = Shaper::default();
        assert!(shaper.toggle_overlay());
        assert!(shaper.overlay_visible());
        shaper.on_connect(1);
        shaper.cleanup();
        shaper.cleanup();
        assert!(!shaper.overlay_visible());
        assert_eq!(shaper.queue().connection_count(), 0);
    }
}
