//! Loopback command - two peers in one process
//!
//! Both sessions run on this thread and exchange input through a
//! [`LoopbackTransport`] pair with injected latency. Each session's requests
//! are applied to its own [`DemoSimulation`] after every tick. At the end the
//! two peers' confirmed checksums are compared frame by frame.

use std::path::PathBuf;
use std::sync::mpsc;

use anyhow::{Context, Result, bail};
use clap::Args;
use serde::Serialize;

use riposte_core::{LoopbackTransport, Session, SessionConfig, TransportEvent};
use riposte_shared::{Frame, SimRequest, Stats};

use crate::config;
use crate::demo::{DemoSimulation, DemoState, InputScript};

/// Arguments for the loopback command
#[derive(Args)]
pub struct LoopbackArgs {
    /// Frames to simulate
    #[arg(short, long, default_value = "600")]
    pub frames: u32,

    /// Delivery latency in ticks, each direction
    #[arg(short, long, default_value = "3")]
    pub latency: u32,

    /// Local input delay in frames (0-10); overrides the config file
    #[arg(long)]
    pub delay: Option<u32>,

    /// Rollback window in frames (1-64); overrides the config file
    #[arg(long)]
    pub max_rollback: Option<u32>,

    /// Seed for the scripted inputs
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Summary printed at the end of a loopback run
#[derive(Debug, Serialize)]
pub struct LoopbackReport {
    pub frames: u32,
    pub latency: u32,
    pub peers: [Stats; 2],
    pub checksums_compared: usize,
    pub final_state: [DemoState; 2],
}

/// One side of the match: session, its request queue and its game
struct Peer {
    session: Session<mpsc::Sender<SimRequest>>,
    requests: mpsc::Receiver<SimRequest>,
    sim: DemoSimulation,
    script: InputScript,
}

impl Peer {
    fn new(config: SessionConfig, player_two: bool, seed: u64) -> Self {
        let (port, requests) = mpsc::channel();
        let session = Session::with_config(port, config);
        let sim = DemoSimulation::new(session.handle(), player_two);
        Self {
            session,
            requests,
            sim,
            script: InputScript::new(seed),
        }
    }

    fn capture_input(&mut self) -> Result<()> {
        self.session.add_local_input(self.script.next_input())?;
        Ok(())
    }

    fn advance(&mut self) -> Result<()> {
        self.session.tick()?;
        for request in self.requests.try_iter() {
            self.sim.apply(request);
        }
        for event in self.session.transport_events() {
            if event == TransportEvent::Disconnected {
                bail!("loopback peer disconnected");
            }
        }
        Ok(())
    }
}

/// Execute the loopback command
pub fn execute(args: LoopbackArgs) -> Result<()> {
    let report = run(&args)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Simulated {} frames at {} ticks latency",
            report.frames, report.latency
        );
        for (index, stats) in report.peers.iter().enumerate() {
            println!(
                "  peer {}: {} rollbacks, {} predicted, {} resimulated, {} late, {} early",
                index + 1,
                stats.rollback_count,
                stats.predicted_frames,
                stats.resimulated_frames,
                stats.late_inputs_dropped,
                stats.future_inputs_dropped
            );
        }
        println!(
            "  {} confirmed checksums agree",
            report.checksums_compared
        );
    }
    Ok(())
}

fn run(args: &LoopbackArgs) -> Result<LoopbackReport> {
    let config = config::load(args.config.as_deref())?;
    let session_config = SessionConfig {
        frame_delay: args.delay.unwrap_or(config.session.frame_delay),
        max_rollback: args.max_rollback.unwrap_or(config.session.max_rollback),
        ..config.session
    }
    .clamped();

    let mut a = Peer::new(session_config, false, args.seed);
    let mut b = Peer::new(session_config, true, args.seed.wrapping_add(1));

    let (to_b, to_a) = LoopbackTransport::pair(a.session.handle(), b.session.handle());
    a.session
        .attach_transport(Box::new(to_b.with_latency(args.latency)));
    b.session
        .attach_transport(Box::new(to_a.with_latency(args.latency)));

    for peer in [&a, &b] {
        peer.session
            .init(session_config.frame_delay, session_config.max_rollback)?;
    }

    for frame in 0..args.frames {
        a.capture_input()?;
        b.capture_input()?;
        a.advance()
            .with_context(|| format!("peer 1 failed at frame {}", frame))?;
        b.advance()
            .with_context(|| format!("peer 2 failed at frame {}", frame))?;
    }

    let checksums_compared = compare_checksums(&a.session, &b.session)?;
    tracing::info!(
        frames = args.frames,
        compared = checksums_compared,
        "Loopback run complete"
    );

    let report = LoopbackReport {
        frames: args.frames,
        latency: args.latency,
        peers: [a.session.stats(), b.session.stats()],
        checksums_compared,
        final_state: [*a.sim.state(), *b.sim.state()],
    };
    a.session.shutdown();
    b.session.shutdown();
    Ok(report)
}

/// Compare every checksum both peers consider confirmed
fn compare_checksums<P, Q>(a: &Session<P>, b: &Session<Q>) -> Result<usize>
where
    P: riposte_core::SimulationPort,
    Q: riposte_core::SimulationPort,
{
    let frames: Vec<Frame> = a.snapshot_frames();
    let mut compared = 0;
    for frame in frames {
        let (Some(ours), Some(theirs)) = (a.confirmed_checksum(frame), b.confirmed_checksum(frame))
        else {
            continue;
        };
        if ours != theirs {
            bail!(
                "desync at frame {}: {:016x} != {:016x}",
                frame,
                ours,
                theirs
            );
        }
        compared += 1;
    }
    Ok(compared)
}
