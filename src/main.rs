//! Virtual Gamepad
//!
//! On-screen touch controls exposed as a synthetic standard gamepad, with
//! real controllers remapped onto it.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use virtual_gamepad::cli;
use virtual_gamepad::config::{AppConfig, ConfigWatcher};
use virtual_gamepad::input::gamepad::{
    print_gamepad_diagnostics, EmulatedGamepad, GilrsSource, Navigator, PollResult,
};
use virtual_gamepad::replay::{self, ReplayScript};
use virtual_gamepad::ui::VirtualGamepadUi;

/// Virtual Gamepad - on-screen controls and controller remapping
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "gamepad.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// List connected controllers and their remap ids
    #[arg(long)]
    list_devices: bool,

    /// Seconds to wait for controllers before listing them
    #[arg(long, default_value = "5")]
    scan_secs: u64,

    /// Run a pointer script and print one JSON line per poll
    #[arg(long, value_name = "SCRIPT", conflicts_with_all = ["list_devices", "repl"])]
    replay: Option<String>,

    /// Drive the on-screen layout interactively
    #[arg(long, conflicts_with = "list_devices")]
    repl: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level, args.json_logs);

    if args.list_devices {
        return print_gamepad_diagnostics(Duration::from_secs(args.scan_secs));
    }

    if let Some(script_path) = &args.replay {
        let config = load_or_default(&args.config).await?;
        let script = ReplayScript::load(script_path).await?;
        for line in replay::run(&script, &config)? {
            println!("{}", serde_json::to_string(&line)?);
        }
        return Ok(());
    }

    if args.repl {
        let config = load_or_default(&args.config).await?;
        return cli::run_repl(&config).await;
    }

    info!("Starting Virtual Gamepad bridge...");

    let (watcher, config) = if Path::new(&args.config).exists() {
        let (watcher, config) = ConfigWatcher::new(args.config.clone()).await?;
        info!("Configuration loaded with hot-reload enabled: {}", args.config);
        (Some(watcher), config)
    } else {
        warn!("Config file {} not found, using the stock layout", args.config);
        (None, AppConfig::default())
    };

    run_bridge(config, watcher, shutdown_signal()).await?;

    info!("Virtual Gamepad shutdown complete");
    Ok(())
}

/// Load the config file if present, defaults otherwise
async fn load_or_default(path: &str) -> Result<AppConfig> {
    if Path::new(path).exists() {
        AppConfig::load(path).await
    } else {
        debug!("No config at {}, using defaults", path);
        Ok(AppConfig::default())
    }
}

/// Poll real controllers through the engine until shutdown
async fn run_bridge(
    config: AppConfig,
    mut watcher: Option<ConfigWatcher>,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    let source = GilrsSource::new().context("Real controller backend unavailable")?;
    let navigator = Navigator::new(source);
    let engine = EmulatedGamepad::new(navigator.clone());
    let mut ui = VirtualGamepadUi::from_config(engine, &config);

    let mut interval = poll_interval(&config);
    let mut last: Option<PollResult> = None;

    info!("✅ Bridge running, polling every {}ms", config.bridge.poll_interval_ms);

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                ui.tick(Instant::now());
                let poll = without_timestamps(navigator.get_gamepads());
                if last.as_ref() != Some(&poll) {
                    log_poll(&poll);
                    last = Some(poll);
                }
            }

            Some(new_config) = next_config(&mut watcher) => {
                info!("📝 Configuration file changed, applying...");
                ui.apply_config(&new_config);
                interval = poll_interval(&new_config);
                info!("✅ Configuration applied");
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping bridge");
                break;
            }
        }
    }

    ui.destroy();
    Ok(())
}

fn poll_interval(config: &AppConfig) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(Duration::from_millis(config.bridge.poll_interval_ms));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

async fn next_config(watcher: &mut Option<ConfigWatcher>) -> Option<AppConfig> {
    match watcher {
        Some(watcher) => watcher.next_config().await,
        None => std::future::pending().await,
    }
}

/// Timestamps move on every poll; compare state only
fn without_timestamps(mut poll: PollResult) -> PollResult {
    for device in poll.iter_mut().flatten() {
        device.timestamp = 0.0;
    }
    poll
}

fn log_poll(poll: &PollResult) {
    for (slot, device) in poll.iter().enumerate() {
        if let Some(device) = device {
            let pressed: Vec<usize> = device.pressed_buttons().collect();
            info!(
                "🎮 [{}] {} axes={:?} pressed={:?}",
                slot, device.id, device.axes, pressed
            );
        }
    }
}

fn init_logging(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries replay output
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
}
