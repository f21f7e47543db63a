//! Riposte CLI - Run rollback matches from the command line
//!
//! # Commands
//!
//! - `riposte loopback` - Two sessions in one process with injected latency;
//!   checks that both peers agree on every confirmed checksum
//! - `riposte udp` - One networked peer, paced at 60 Hz
//!
//! # Usage
//!
//! ```bash
//! # Soak test rollback with 4 frames of latency
//! riposte loopback --frames 3600 --latency 4
//!
//! # Host and client on one machine
//! riposte udp --bind 127.0.0.1:7777
//! riposte udp --bind 127.0.0.1:7778 --peer 127.0.0.1:7777
//! ```
//!
//! # Configuration (config.toml)
//!
//! ```toml
//! [session]
//! frame_delay = 2
//! max_rollback = 10
//!
//! [network]
//! bind = "0.0.0.0:7777"
//! peer = "192.168.1.20:7777"
//! redundancy = 8
//! ```

mod config;
mod demo;
mod loopback;
mod udp;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Riposte CLI - Rollback matches over loopback or UDP
#[derive(Parser)]
#[command(name = "riposte")]
#[command(about = "Run rollback netcode matches")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run two peers in one process and verify they stay in sync
    Loopback(loopback::LoopbackArgs),

    /// Run one peer over UDP
    Udp(udp::UdpArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Loopback(args) => loopback::execute(args),
        Commands::Udp(args) => udp::execute(args),
    }
}
