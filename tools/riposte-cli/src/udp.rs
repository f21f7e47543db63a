//! UDP command - one networked peer
//!
//! The simulation runs on its own thread behind an ordered request channel,
//! the way a game would host it. The main thread waits for the peer, then
//! ticks at the fixed rate until the frame budget runs out or the peer leaves.

use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use clap::Args;

use riposte_core::{Session, SessionConfig, TransportEvent, UdpTransport};
use riposte_shared::constants::TICK_RATE_HZ;
use riposte_shared::{SimRequest, Stats};

use crate::config;
use crate::demo::{DemoSimulation, InputScript};

/// How long to wait for the peer before giving up
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Arguments for the udp command
#[derive(Args)]
pub struct UdpArgs {
    /// Local address to bind; overrides the config file
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Peer address; omit to host and wait for a peer
    #[arg(short, long)]
    pub peer: Option<String>,

    /// Frames to simulate once connected
    #[arg(short, long, default_value = "1800")]
    pub frames: u32,

    /// Local input delay in frames (0-10); overrides the config file
    #[arg(long)]
    pub delay: Option<u32>,

    /// Rollback window in frames (1-64); overrides the config file
    #[arg(long)]
    pub max_rollback: Option<u32>,

    /// Seed for the scripted inputs (random if omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Execute the udp command
pub fn execute(args: UdpArgs) -> Result<()> {
    let config = config::load(args.config.as_deref())?;
    let session_config = SessionConfig {
        frame_delay: args.delay.unwrap_or(config.session.frame_delay),
        max_rollback: args.max_rollback.unwrap_or(config.session.max_rollback),
        ..config.session
    }
    .clamped();
    let bind = args.bind.unwrap_or(config.network.bind.clone());
    let peer = args.peer.or(config.network.peer.clone());
    // The peer that dials out plays the second fighter
    let player_two = peer.is_some();

    let (port, requests) = mpsc::channel::<SimRequest>();
    let session = Session::with_config(port, session_config);

    let mut sim = DemoSimulation::new(session.handle(), player_two);
    let sim_thread = thread::Builder::new()
        .name("riposte-sim".to_string())
        .spawn(move || {
            for request in requests {
                sim.apply(request);
            }
            sim.state().checksum()
        })
        .context("Failed to spawn simulation thread")?;

    let mut transport =
        UdpTransport::bind(&bind, session.handle(), config.network.udp_config())?;
    if let Some(peer) = &peer {
        transport.set_peer(peer)?;
    } else {
        println!("Hosting on {}, waiting for a peer...", transport.local_addr());
    }
    session.attach_transport(Box::new(transport));
    session.init(session_config.frame_delay, session_config.max_rollback)?;

    let result = wait_for_peer(&session).and_then(|()| {
        let seed = args.seed.unwrap_or_else(rand::random);
        tracing::info!(seed, player_two, "Match started");
        run_match(&session, args.frames, seed)
    });

    session.shutdown();
    // Dropping the session closes the request channel and ends the sim thread
    drop(session);
    let final_checksum = sim_thread
        .join()
        .map_err(|_| anyhow!("simulation thread panicked"))?;

    let stats = result?;
    println!(
        "Frame {}: {} rollbacks, {} predicted, {} resimulated, {} late, {} early, final state {:016x}",
        stats.current_frame,
        stats.rollback_count,
        stats.predicted_frames,
        stats.resimulated_frames,
        stats.late_inputs_dropped,
        stats.future_inputs_dropped,
        final_checksum
    );
    Ok(())
}

fn wait_for_peer<P: riposte_core::SimulationPort>(session: &Session<P>) -> Result<()> {
    let start = Instant::now();
    while start.elapsed() < CONNECT_TIMEOUT {
        if session
            .poll_transport()?
            .contains(&TransportEvent::Connected)
        {
            tracing::info!("Peer connected");
            return Ok(());
        }
        thread::sleep(Duration::from_millis(16));
    }
    bail!("no peer connected within {:?}", CONNECT_TIMEOUT)
}

fn run_match<P: riposte_core::SimulationPort>(
    session: &Session<P>,
    frames: u32,
    seed: u64,
) -> Result<Stats> {
    let frame_time = Duration::from_secs(1) / TICK_RATE_HZ;
    let mut script = InputScript::new(seed);
    let mut next_tick = Instant::now();
    let mut stats = session.stats();

    for _ in 0..frames {
        session.add_local_input(script.next_input())?;
        stats = session.tick()?;

        for event in session.transport_events() {
            match event {
                TransportEvent::Interrupted { silent_for_ms } => {
                    println!("Connection interrupted ({} ms)", silent_for_ms);
                }
                TransportEvent::Resumed => println!("Connection resumed"),
                TransportEvent::Disconnected => {
                    println!("Peer disconnected");
                    return Ok(stats);
                }
                TransportEvent::Connected => {}
            }
        }

        if stats.current_frame % TICK_RATE_HZ == 0 {
            tracing::info!(
                frame = stats.current_frame,
                rollbacks = stats.rollback_count,
                last_checksum = ?stats.last_checksum,
                "Match progress"
            );
        }

        next_tick += frame_time;
        if let Some(wait) = next_tick.checked_duration_since(Instant::now()) {
            thread::sleep(wait);
        }
    }
    Ok(stats)
}
