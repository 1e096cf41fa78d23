use std::path::PathBuf;
use std::sync::mpsc;

use anyhow::{Context, Result};
use audio_device::SimulatedObserver;
use clap::{Parser, Subcommand, ValueEnum};
use reconciler::logging::{self, LoggingMode};
use reconciler::{Config, Reconciler};
use tracing::info;

mod settings;
mod source;

/// Amplifier follower
///
/// Powers an amplifier's smart plug on while a chosen audio output is the
/// system default, and off otherwise.
#[derive(Parser, Debug)]
#[command(name = "amp-follower")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to <config dir>/amp-follower/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Logging mode: silent, development or debug (overrides AMP_LOG_MODE)
    #[arg(long, global = true)]
    log: Option<LoggingMode>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Follow the default output device until interrupted (default)
    Run {
        /// Where default device changes come from
        #[arg(long, value_enum, default_value_t = Source::Stdin)]
        source: Source,
    },
    /// Validate the configuration and print the effective values
    Check,
    /// Print the plug's current power state
    Status,
    /// Switch the plug on or off once
    Switch {
        #[arg(value_enum)]
        state: SwitchState,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Source {
    /// One device name per line; an empty line means no default output
    Stdin,
    /// PulseAudio default sink
    Pulse,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SwitchState {
    On,
    Off,
}

/// Why the service is stopping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    Interrupted,
    EndOfInput,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.log {
        Some(mode) => logging::init_logging(mode)?,
        None => logging::init_logging_from_env()?,
    }

    let path = settings::config_path(cli.config.as_deref())?;
    let config = settings::load_config(&path)?;

    match cli.command.unwrap_or(Command::Run {
        source: Source::Stdin,
    }) {
        Command::Run { source } => run(&config, source),
        Command::Check => {
            check(&config, &path);
            Ok(())
        }
        Command::Status => status(&config),
        Command::Switch { state } => switch(&config, state == SwitchState::On),
    }
}

fn run(config: &Config, source: Source) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = mpsc::channel();

    let interrupt_tx = shutdown_tx.clone();
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.send(Shutdown::Interrupted);
    })
    .context("Failed to install signal handler")?;

    let reconciler = match source {
        Source::Stdin => {
            let observer = SimulatedObserver::new();
            let reconciler = Reconciler::start(config, config.plug_client(), observer.clone())
                .context("Failed to start reconciler")?;
            source::spawn_stdin_source(observer, shutdown_tx)
                .context("Failed to start stdin reader")?;
            reconciler
        }
        Source::Pulse => {
            let reconciler = Reconciler::start(config, config.plug_client(), pulse_observer()?)
                .context("Failed to start reconciler")?;
            // Only Ctrl-C stops the service
            drop(shutdown_tx);
            reconciler
        }
    };

    let reason = shutdown_rx.recv().unwrap_or(Shutdown::Interrupted);
    info!("Shutting down ({:?})", reason);
    reconciler.dispose();
    Ok(())
}

#[cfg(feature = "pulse")]
fn pulse_observer() -> Result<audio_device::pulse::PulseObserver> {
    audio_device::pulse::PulseObserver::new(audio_device::pulse::DEFAULT_POLL_INTERVAL)
        .context("Failed to connect to PulseAudio")
}

#[cfg(not(feature = "pulse"))]
fn pulse_observer() -> Result<SimulatedObserver> {
    anyhow::bail!("Built without PulseAudio support; rebuild with `--features pulse`")
}

fn check(config: &Config, path: &std::path::Path) {
    println!("Configuration:   {}", path.display());
    println!("Target device:   {}", config.target_device());
    println!("Plug address:    {}", config.plug_address());
    println!("Plug username:   {}", config.credentials().username());
    println!("Plug password:   ********");
    println!("Max volume:      {:.2}", config.max_volume());
    println!("Cooldown:        {}s", config.cooldown().as_secs());
    println!("Timeout:         {}s", config.timeout().as_secs());
}

fn status(config: &Config) -> Result<()> {
    let client = config.plug_client();
    let state = client
        .power_state()
        .with_context(|| format!("Failed to query plug at {}", client.address()))?;
    println!("{}", state);
    Ok(())
}

fn switch(config: &Config, on: bool) -> Result<()> {
    let client = config.plug_client();
    client
        .set_state(on)
        .with_context(|| format!("Failed to switch plug at {}", client.address()))?;
    println!("{}", if on { "on" } else { "off" });
    Ok(())
}
