//! Flowerpot Server Binary
//!
//! Serves a simulated flowerpot over TCP.

use clap::Parser;
use flowerpot::device::SimulatedFlowerpot;
use flowerpot::network::Server;
use flowerpot::Config;
use tracing_subscriber::{fmt, EnvFilter};

/// Flowerpot Server
#[derive(Parser, Debug)]
#[command(name = "flowerpot-server")]
#[command(about = "Remote-control server for a simulated flowerpot")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "0.0.0.0:2259")]
    listen: String,

    /// Water reservoir capacity in mL
    #[arg(short, long, default_value = "1000")]
    reservoir_ml: u32,

    /// Socket read timeout in ms (0 disables)
    #[arg(long, default_value = "0")]
    read_timeout_ms: u64,

    /// Socket write timeout in ms (0 disables)
    #[arg(long, default_value = "0")]
    write_timeout_ms: u64,

    /// Idle poll interval in ms
    #[arg(short, long, default_value = "10")]
    poll_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,flowerpot=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let args = Args::parse();

    tracing::info!("Flowerpot Server v{}", flowerpot::VERSION);
    tracing::info!("Listen address: {}", args.listen);
    tracing::info!("Reservoir capacity: {} mL", args.reservoir_ml);

    // Build config from args
    let config = Config::builder()
        .listen_addr(&args.listen)
        .reservoir_capacity_ml(args.reservoir_ml)
        .read_timeout_ms(args.read_timeout_ms)
        .write_timeout_ms(args.write_timeout_ms)
        .poll_interval_ms(args.poll_ms)
        .build();

    let device = SimulatedFlowerpot::from_config(&config);

    let mut server = match Server::bind(config, device) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
