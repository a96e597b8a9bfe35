//! # Pump Control Binary
//!
//! Connects to the coordinator, requests the valve lines and runs the
//! controller loop until interrupted.
//!
//! # Usage
//!
//! ```bash
//! # Device defaults (coordinator 192.168.0.37:8888, gpiochip0 lines 20/21)
//! pump_control
//!
//! # Config file with a CLI endpoint override
//! pump_control --config config/pump.toml --host 127.0.0.1
//!
//! # Bench run without hardware, verbose
//! pump_control -s -v --host 127.0.0.1
//! ```
//!
//! Exit status is 0 after an interrupt-driven shutdown and 1 on a fatal
//! error or when shutdown arrived while the link was being re-established.

use clap::Parser;
use pump_common::config::{ConfigError, ConfigLoader, ControllerConfig, LogLevel};
use pump_control::{
    Actuators, ConnectError, ConnectionManager, Controller, ControllerError, DriverRegistry,
    RunOutcome, ShutdownFlag, ThreadDelay, ValveSequencer, VentTiming,
};
use std::fs::File;
use std::io;
use std::net::IpAddr;
use std::os::fd::AsFd;
use std::path::PathBuf;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Sticker pump valve controller
#[derive(Parser, Debug)]
#[command(name = "pump_control")]
#[command(author = "SciFest")]
#[command(version)]
#[command(about = "Drives the sticker pump valves from coordinator commands")]
#[command(long_about = None)]
struct Args {
    /// Path to the controller configuration file (pump.toml).
    /// Device defaults are used when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Line driver to use (cdev, sysfs, simulation)
    #[arg(short, long)]
    driver: Option<String>,

    /// Force the simulation driver (ignores --driver)
    #[arg(short = 's', long)]
    simulate: bool,

    /// Coordinator address override
    #[arg(long)]
    host: Option<IpAddr>,

    /// Coordinator port override
    #[arg(long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    let code = match run(&args) {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            error!("Pump controller failed: {}", e);
            1
        }
    };
    std::process::exit(code);
}

fn run(args: &Args) -> Result<RunOutcome, ControllerError> {
    let config = load_config(args);
    setup_tracing(
        args,
        config.as_ref().map_or(LogLevel::default(), |c| c.shared.log_level),
    );
    let config = config?;

    info!(
        "{} v{} starting...",
        config.shared.service_name,
        env!("CARGO_PKG_VERSION")
    );

    let shutdown = ShutdownFlag::new();
    let handler_flag = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        handler_flag.request();
    })?;

    let registry = DriverRegistry::with_builtin();
    let driver = registry.create_driver(&config.lines.driver)?;
    let actuators = Actuators::acquire(driver, &config.lines)?;
    let mut sequencer = ValveSequencer::new(
        actuators,
        VentTiming::from(&config.timing),
        Box::new(ThreadDelay),
    );
    if let Err(e) = sequencer.force_safe() {
        warn!("Initial safe state not confirmed: {}", e);
    }

    let mut connection = ConnectionManager::new(&config.coordinator);
    if let Err(e) = connection.connect(&shutdown) {
        if let Err(release) = sequencer.shutdown() {
            error!("Line release failed: {}", release);
        }
        return match e {
            ConnectError::Abandoned(addr) => {
                warn!("Shutdown requested before connecting to {}", addr);
                Ok(RunOutcome::Abandoned)
            }
            other => Err(other.into()),
        };
    }

    let operator = match operator_input() {
        Ok(input) => Some(input),
        Err(e) => {
            warn!("Operator input unavailable ({}), local start disabled", e);
            None
        }
    };

    let mut controller = Controller::new(connection, sequencer, operator, &config.timing, shutdown);
    let outcome = controller.run();

    if let Err(e) = controller.shutdown() {
        error!("Shutdown incomplete: {}", e);
    }

    info!("Pump controller shutdown complete");
    Ok(outcome)
}

/// Load the config file (or defaults) and apply CLI overrides.
fn load_config(args: &Args) -> Result<ControllerConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => ControllerConfig::load(path)?,
        None => ControllerConfig::default(),
    };

    if let Some(host) = args.host {
        config.coordinator.host = host;
    }
    if let Some(port) = args.port {
        config.coordinator.port = port;
    }
    if args.simulate {
        config.lines.driver = "simulation".to_string();
    } else if let Some(driver) = &args.driver {
        config.lines.driver = driver.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Unbuffered handle on stdin so readiness and reads see the same bytes.
fn operator_input() -> io::Result<File> {
    let fd = io::stdin().as_fd().try_clone_to_owned()?;
    Ok(File::from(fd))
}

/// Tracing level for a configured log level.
fn tracing_level(level: LogLevel) -> Level {
    level.as_directive().parse().unwrap_or(Level::INFO)
}

/// Setup tracing subscriber based on CLI arguments and configured level.
fn setup_tracing(args: &Args, configured: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        tracing_level(configured)
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
