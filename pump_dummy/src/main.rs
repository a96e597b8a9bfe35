//! # Pump Dummy Binary
//!
//! Bench coordinator for the pump controller.
//!
//! ```bash
//! # Listen on the default port, 2 s between pickup/drop/finish
//! pump_dummy
//!
//! # Faster cycle on loopback
//! pump_dummy --bind 127.0.0.1:8888 --step-delay-ms 500 -v
//! ```

use clap::Parser;
use pump_dummy::{DEFAULT_BIND, DEFAULT_STEP_DELAY_MS, DummyCoordinator, DummyError};
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// Stand-in coordinator for the sticker pump controller
#[derive(Parser, Debug)]
#[command(name = "pump_dummy")]
#[command(author = "SciFest")]
#[command(version)]
#[command(about = "Plays the gantry side of the sticker pump protocol")]
#[command(long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = DEFAULT_BIND)]
    bind: SocketAddr,

    /// Pause between scripted replies, in milliseconds
    #[arg(long, default_value_t = DEFAULT_STEP_DELAY_MS)]
    step_delay_ms: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    if let Err(e) = run(&args) {
        error!("Dummy coordinator failed: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), DummyError> {
    info!("Pump dummy v{} starting...", env!("CARGO_PKG_VERSION"));

    let dummy = DummyCoordinator::bind(args.bind, Duration::from_millis(args.step_delay_ms))?;

    let stop = dummy.stop_flag();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        stop.store(true, Ordering::SeqCst);
    }) {
        error!("Signal handler not installed: {}", e);
    }

    dummy.serve()
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
