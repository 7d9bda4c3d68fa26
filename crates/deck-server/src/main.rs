//! DeckBridge daemon (`deckd`): entry point.
//!
//! Runs the OSC control listener and the virtual device side by side on one
//! current-thread Tokio runtime, with every engine command sent to a logging
//! sink.
//!
//! # Usage
//!
//! ```text
//! deckd [OPTIONS]
//!
//! Options:
//!   --config <PATH>          Config file [default: platform config dir]
//!   --ws-port <PORT>         Emulator WebSocket port (overrides the file)
//!   --control-port <PORT>    OSC control UDP port (overrides the file)
//!   --log-level <LEVEL>      Log level when RUST_LOG is unset
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                   | Flag             |
//! |----------------------------|------------------|
//! | `DECKBRIDGE_CONFIG`        | `--config`       |
//! | `DECKBRIDGE_WS_PORT`       | `--ws-port`      |
//! | `DECKBRIDGE_CONTROL_PORT`  | `--control-port` |
//! | `DECKBRIDGE_LOG_LEVEL`     | `--log-level`    |
//!
//! `RUST_LOG` always wins over `--log-level` and the file's `log_level`.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use deck_core::CommandBus;
use deck_emulator::application::{spawn_device, VirtualDevice};
use deck_emulator::infrastructure::run_server;
use deck_server::application::ControlService;
use deck_server::infrastructure::engine_sink::run_engine_sink;
use deck_server::infrastructure::network::{start_control_listener, ControlHandle};
use deck_server::infrastructure::storage::{config_file_path, load_or_init_config, AppConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// DeckBridge daemon: OSC control listener and virtual key device.
#[derive(Debug, Parser)]
#[command(
    name = "deckd",
    about = "OSC control listener and virtual key device for DeckBridge",
    version
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, env = "DECKBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// WebSocket port for remote emulator clients.
    #[arg(long, env = "DECKBRIDGE_WS_PORT")]
    ws_port: Option<u16>,

    /// UDP port for the OSC control protocol.
    #[arg(long, env = "DECKBRIDGE_CONTROL_PORT")]
    control_port: Option<u16>,

    /// Log level used when `RUST_LOG` is not set (e.g. `debug`).
    #[arg(long, env = "DECKBRIDGE_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(port) = self.ws_port {
            config.emulator.ws_port = port;
        }
        if let Some(port) = self.control_port {
            config.control.port = port;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config_file_path()?,
    };
    let mut config = load_or_init_config(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    cli.apply_overrides(&mut config);

    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!("deckd starting (config: {})", config_path.display());

    // ── Shutdown flag ─────────────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl+C received; shutting down");
                running.store(false, Ordering::Relaxed);
            }
        });
    }

    // ── Engine boundary ───────────────────────────────────────────────────────
    let (bus_tx, bus_rx) = mpsc::unbounded_channel();
    tokio::spawn(run_engine_sink(bus_rx));
    let bus: Arc<dyn CommandBus> = Arc::new(bus_tx);

    // ── Control listener (bind failure is not fatal) ──────────────────────────
    let control: ControlHandle = if config.control.enabled {
        let addr = config.control_addr()?;
        let service = ControlService::new(Arc::clone(&bus));
        start_control_listener(addr, service, Arc::clone(&running)).await
    } else {
        info!("control listener disabled");
        ControlHandle::inert()
    };
    if config.control.enabled && !control.is_active() {
        warn!("continuing without the control protocol");
    }

    // ── Virtual device ────────────────────────────────────────────────────────
    if config.emulator.enabled {
        let emulator = config.emulator_config()?;
        let device = VirtualDevice::new(&emulator, Arc::clone(&bus));
        let (handle, device_task) = spawn_device(device);

        let served =
            run_server(emulator.ws_bind_addr, handle.clone(), Arc::clone(&running)).await;

        let _ = handle.quit();
        let _ = device_task.await;
        served?;
    } else {
        info!("emulator disabled");
        while running.load(Ordering::Relaxed) {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    }

    info!("deckd stopped");
    Ok(())
}
