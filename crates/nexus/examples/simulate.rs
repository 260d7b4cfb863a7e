//! Simulated session pushing traffic through a Shaper.
//!
//! Three peers exchange world updates for a few seconds of simulated time while
//! a diagnostics test runs, then the stats panel and report are printed.
//!
//! Run:
//! - cargo run -p nexus --example simulate
//! - RUST_LOG=nexus=debug cargo run -p nexus --example simulate

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use nexus::{prelude::*, Clock, ManualClock};
use tracing::info;
use tracing_subscriber::EnvFilter;

const FRAME: Duration = Duration::from_millis(50);
const PEERS: [PeerId; 3] = [1, 2, 3];

fn world_update(peer: PeerId, frame: u32) -> Vec<u8> {
    format!("zdo:{peer}:{frame};pos=10.0,0.5,-4.25;rot=0,90,0;owner={peer};")
        .into_bytes()
        .into_iter()
        .cycle()
        .take(600 + (frame as usize % 7) * 40)
        .collect()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nexus=info")),
        )
        .init();

    let clock = Arc::new(ManualClock::new(Instant::now()));
    let config = Config { send_rate_limit: 64 * 1024, ..Config::default() };
    let mut shaper = Shaper::with_clock(config, clock.clone());
    let world = WorldSnapshot::connected(3200);

    for peer in PEERS {
        shaper.on_connect(peer);
    }
    // Peer 3 never completes the capability handshake
    shaper.on_peer_capable(1);
    shaper.on_peer_capable(2);

    let outcome = Command::Test.execute(&mut shaper, clock.now(), &world);
    info!("{}", outcome);

    for frame in 0..140u32 {
        clock.advance(FRAME);
        let now = clock.now();

        for peer in PEERS {
            let payload = world_update(peer, frame);
            let wire = shaper.compress_for_peer(peer, &payload).into_owned();

            if !shaper.can_queue(peer, wire.len()) {
                shaper.on_dropped(peer, wire.len());
                continue;
            }
            shaper.on_queued(peer, wire.len());

            if shaper.can_send(wire.len(), now) {
                shaper.on_send(wire.len(), now);
                shaper.on_dequeued(peer, wire.len());
            }
        }

        shaper.on_receive(900, now);
        shaper.record_ping(35.0 + (frame % 10) as f32 * 3.0);
        shaper.record_packet_loss(0.0);
        shaper.tick(now, &world);
    }

    println!("{}", shaper.quality().stats_display());
    println!("{}", shaper.quality().brief_stats());
    println!("Update rate multiplier: {:.2}", shaper.update_rate_multiplier());
    println!();

    let report = Command::Report.execute(&mut shaper, clock.now(), &world);
    println!("{}", report);

    shaper.cleanup();
}
