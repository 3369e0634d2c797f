use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use scan_bridge::{
    ChannelListener, ScanBridge, ScanEvent, ScannerProfile, SimulatedResult, SimulatedScanner,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{timeout, Duration};
use tracing::{info, warn};
use transport_bus::LocalBus;

mod telemetry;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ResultMode {
    Payload,
    Empty,
    Missing,
    WrongType,
    Silent,
}

#[derive(Debug, Parser)]
#[command(
    name = "scan-sim",
    author,
    version,
    about = "Trigger scans against a simulated broadcast scanner service"
)]
struct Cli {
    /// Tracing filter directive.
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_filter: String,

    /// JSON scanner profile; SCAN_BRIDGE_* variables are used when absent.
    #[arg(long, env = "SCAN_SIM_PROFILE")]
    profile: Option<PathBuf>,

    /// How the simulated scanner answers each trigger.
    #[arg(long, value_enum, default_value_t = ResultMode::Payload)]
    result: ResultMode,

    /// Payload returned in payload mode.
    #[arg(long, default_value = "4006381333931")]
    payload: String,

    /// Number of scans to trigger.
    #[arg(long, default_value_t = 1)]
    scans: u32,

    /// Trigger without registering for results; every result is dropped.
    #[arg(long)]
    skip_register: bool,

    /// How long to wait for each listener event.
    #[arg(long, default_value_t = 500)]
    wait_ms: u64,
}

impl Cli {
    fn simulated_result(&self) -> SimulatedResult {
        match self.result {
            ResultMode::Payload => SimulatedResult::Payload(self.payload.clone()),
            ResultMode::Empty => SimulatedResult::Empty,
            ResultMode::Missing => SimulatedResult::Missing,
            ResultMode::WrongType => SimulatedResult::WrongType,
            ResultMode::Silent => SimulatedResult::Silent,
        }
    }

    fn load_profile(&self) -> Result<ScannerProfile> {
        let Some(path) = &self.profile else {
            let profile = ScannerProfile::from_env();
            profile.validate()?;
            return Ok(profile);
        };
        let document = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read profile {}", path.display()))?;
        ScannerProfile::from_json(&document)
            .with_context(|| format!("failed to load profile {}", path.display()))
    }
}

async fn next_event(rx: &mut UnboundedReceiver<ScanEvent>, wait: Duration) -> Option<ScanEvent> {
    timeout(wait, rx.recv()).await.ok().flatten()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(&cli.log_filter)?;
    let profile = cli.load_profile()?;

    info!(
        result_action = %profile.result_action,
        trigger_action = %profile.trigger_action,
        mode = ?cli.result,
        scans = cli.scans,
        "starting scan-sim"
    );

    let bus = Arc::new(LocalBus::new());
    let scanner = SimulatedScanner::install(bus.clone(), &profile, cli.simulated_result())
        .context("failed to install simulated scanner")?;

    let (listener, mut events) = ChannelListener::new();
    let mut bridge = ScanBridge::new(bus.clone(), &profile, Arc::new(listener));
    if !cli.skip_register {
        bridge.register_receiver();
    }

    let wait = Duration::from_millis(cli.wait_ms);
    let mut received = 0u32;
    for _ in 0..cli.scans {
        bridge.trigger_scan();
        match next_event(&mut events, wait).await {
            Some(event) => {
                received += 1;
                println!("{}", serde_json::to_string(&event)?);
            }
            None => warn!(wait_ms = cli.wait_ms, "no scan event received"),
        }
    }

    bridge.unregister_receiver();
    scanner
        .uninstall()
        .context("failed to uninstall simulated scanner")?;
    info!(triggered = cli.scans, received, "scan-sim finished");
    Ok(())
}
