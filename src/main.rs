//! gesture-daemon: turns held hand gestures into device commands
//!
//! Landmark frames from an external hand tracker arrive as JSON lines. Each
//! frame is classified into a gesture label and fed to the mode controller:
//! - Holding a closed fist arms the controller
//! - Holding a command gesture while armed runs the bound command
//! - Hooks give feedback (console logs, Hue light colour) while armed
//!
//! `gesture-daemon configure hue` runs first-time bridge setup instead.

mod commands;
mod config;
mod controller;
mod events;
mod frames;
mod gesture;
mod hooks;
mod integrations;
mod lifecycle;
mod setup;
mod state;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::commands::{CommandRegistry, Services};
use crate::config::Config;
use crate::controller::{MonotonicClock, ModeController};
use crate::events::EventBus;
use crate::frames::{FrameEvent, FrameListener};
use crate::integrations::{HttpBridge, TuyaCloud};
use crate::lifecycle::ShutdownSignal;
use crate::state::StateMachine;

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "gesture-daemon", version, about)]
struct Args {
    /// Config file [default: $GESTURE_DAEMON_CONFIG or ~/.config/gesture-daemon/config.toml]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read landmark frames from this file instead of stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Fail on mode transitions outside IDLE -> ARMED -> EXECUTING -> IDLE
    #[arg(long)]
    strict: bool,

    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// First-time setup for an integration
    Configure {
        #[command(subcommand)]
        integration: Setup,
    },
}

#[derive(Debug, Subcommand)]
enum Setup {
    /// Discover and pair with a Hue bridge, list its lights and save its address
    Hue {
        /// Skip discovery and use this bridge
        #[arg(long)]
        bridge_ip: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "gesture-daemon starting"
    );

    if let Some(Mode::Configure { integration }) = args.command {
        let config_path = args.config.clone();
        return tokio::task::spawn_blocking(move || match integration {
            Setup::Hue { bridge_ip } => setup::configure_hue(config_path.as_deref(), bridge_ip),
        })
        .await
        .context("setup thread panicked")?;
    }

    let config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    info!(timing = ?config.timing, gestures = config.gestures.len(), hooks = config.hooks.len(), "configuration ready");

    let mut shutdown = ShutdownSignal::new().context("failed to register signal handlers")?;

    // Frame reader thread -> controller
    let (frame_tx, frame_rx) = mpsc::channel(64);
    let frame_listener = FrameListener::new(frame_tx.clone());
    frame_listener
        .start(open_input(args.input.as_ref())?)
        .context("failed to start frame listener")?;

    // A shutdown signal ends the frame stream like end of input does
    tokio::spawn(async move {
        shutdown.wait().await;
        info!("shutdown signal received");
        let _ = frame_tx.send(FrameEvent::EndOfInput).await;
    });

    // Commands and hooks block on device I/O, so the controller lives on a
    // blocking thread and owns everything it builds
    let strict = args.strict;
    tokio::task::spawn_blocking(move || run_controller(&config, strict, frame_rx))
        .await
        .context("controller thread panicked")??;

    info!("shutting down...");
    // A reader blocked on stdin only sees the flag after its next line;
    // process exit ends the thread otherwise
    if frame_listener.is_running() {
        frame_listener.stop();
    }
    info!("gesture-daemon stopped");

    Ok(())
}

/// Build the controller and feed it frames until the input ends
fn run_controller(config: &Config, strict: bool, mut frame_rx: mpsc::Receiver<FrameEvent>) -> Result<()> {
    // Shared services, built once and handed to commands and hooks
    let bus = Rc::new(EventBus::new());
    let mut services = Services::new(Rc::clone(&bus));
    if config.hue.enabled {
        let bridge = HttpBridge::new(&config.hue.bridge_ip, &config.hue.username, config.hue.timeout()?)
            .context("failed to create Hue bridge client")?;
        info!(bridge_ip = %config.hue.bridge_ip, "hue integration enabled");
        services = services.with_hue(Rc::new(bridge));
    }
    if config.tuya.enabled {
        let tuya = &config.tuya;
        let cloud = TuyaCloud::new(
            &tuya.api_key,
            &tuya.api_secret,
            &tuya.api_region,
            tuya.devices.clone(),
            tuya.timeout()?,
        )
        .context("failed to create Tuya cloud client")?;
        info!(region = %tuya.api_region, devices = tuya.devices.len(), "tuya integration enabled");
        services = services.with_tuya(Rc::new(cloud));
    }

    let registry = CommandRegistry::from_bindings(&config.gestures, &services);
    let hooks = hooks::build_hooks(&config.hooks, &services);

    let mut controller = ModeController::new(registry, hooks, bus, Rc::new(MonotonicClock::new()), config.timings()?);
    if strict {
        controller = controller.with_state_machine(StateMachine::strict());
    }

    info!(mode = %controller.mode(), "controller ready, waiting for frames");

    while let Some(event) = frame_rx.blocking_recv() {
        match event {
            FrameEvent::Frame(frame) => {
                // A failing tick is logged and the next frame still runs
                if let Err(e) = controller.tick(&frame) {
                    error!(error = ?e, mode = %controller.mode(), "tick failed");
                }
            }
            FrameEvent::EndOfInput => break,
        }
    }

    info!(
        mode = %controller.mode(),
        transitions = controller.state_machine().transition_count(),
        last = ?controller.state_machine().last_transition(),
        "frame input ended"
    );
    Ok(())
}

fn open_input(path: Option<&PathBuf>) -> Result<Box<dyn BufRead + Send>> {
    match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open frame input {}", path.display()))?;
            info!(path = %path.display(), "reading frames from file");
            Ok(Box::new(BufReader::new(file)))
        }
        None => {
            info!("reading frames from stdin");
            Ok(Box::new(BufReader::new(std::io::stdin())))
        }
    }
}
