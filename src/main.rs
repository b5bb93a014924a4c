use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::Path;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

use supplystream::{
    arguments::print_debug_info,
    config::StreamConfig,
    logger::{self, LogLevel, LogTag},
    ConnectionState, HistoryEntry, Severity, StreamClient,
};

/// Live monitor for the real-time update stream
///
/// Logging flags are declared here so clap accepts them; the logger reads
/// them from the raw process arguments.
#[allow(dead_code)]
#[derive(Parser, Debug)]
#[command(name = "stream_monitor")]
#[command(about = "Connect to an update stream and print events as they arrive", long_about = None)]
struct Args {
    /// Push source base URL (overrides config and SUPPLYSTREAM_WS_URL)
    #[arg(long)]
    url: Option<String>,

    /// Path to the TOML config file (created with defaults if missing)
    #[arg(long, default_value = "stream_config.toml")]
    config: String,

    /// Channel to subscribe to (repeatable; replaces the configured set)
    #[arg(long = "channel")]
    channels: Vec<String>,

    /// Stop after this many seconds (runs until Ctrl-C when omitted)
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Write plain log lines to this file as well
    #[arg(long)]
    log_file: Option<String>,

    /// Show verbose output for every module
    #[arg(short, long)]
    verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long)]
    quiet: bool,

    #[arg(long = "debug-system")]
    debug_system: bool,
    #[arg(long = "debug-transport")]
    debug_transport: bool,
    #[arg(long = "debug-supervisor")]
    debug_supervisor: bool,
    #[arg(long = "debug-subscription")]
    debug_subscription: bool,
    #[arg(long = "debug-classifier")]
    debug_classifier: bool,
    #[arg(long = "debug-fallback")]
    debug_fallback: bool,
    #[arg(long = "debug-stats")]
    debug_stats: bool,
    #[arg(long = "debug-notifications")]
    debug_notifications: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logger::init();

    if let Err(e) = run(args).await {
        logger::error(LogTag::System, &format!("{:#}", e));
        logger::flush();
        std::process::exit(1);
    }

    logger::flush();
}

async fn run(args: Args) -> Result<()> {
    let mut config = StreamConfig::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?
        .with_env_overrides();

    if let Some(url) = args.url {
        config.base_url = url;
    }
    if !args.channels.is_empty() {
        config.channels = args.channels;
    }
    config.validate().context("Invalid configuration")?;

    apply_logging_config(&config, args.verbose || args.quiet);
    print_debug_info();

    logger::info(
        LogTag::System,
        &format!(
            "stream_monitor starting: {} channels=[{}]",
            config.base_url,
            config.channels.join(", ")
        ),
    );

    let client = StreamClient::new(config);
    let mut events = client.on_event();
    let mut states = client.on_state_change();

    let (stop_tx, mut stop_rx) = mpsc::unbounded_channel::<()>();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .context("Failed to install Ctrl-C handler")?;

    client
        .connect_configured()
        .context("Failed to start stream client")?;

    let duration = args.duration_secs;
    let deadline = async move {
        match duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = stop_rx.recv() => {
                logger::info(LogTag::System, "Received Ctrl-C, disconnecting...");
                break;
            }
            _ = &mut deadline => {
                logger::info(LogTag::System, "Run duration elapsed, disconnecting...");
                break;
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                print_state(state);
            }
            received = events.recv() => match received {
                Ok(entry) => print_event(&entry),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    logger::warning(
                        LogTag::System,
                        &format!("Display lagged, skipped {} events", skipped),
                    );
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    client.disconnect().await;
    print_summary(&client)?;
    Ok(())
}

/// Config-file logging settings; command-line flags win
fn apply_logging_config(config: &StreamConfig, level_from_cli: bool) {
    if !level_from_cli {
        if let Some(level) = LogLevel::from_str(&config.logging.level) {
            logger::update_logger_config(|cfg| cfg.min_level = level);
        } else {
            logger::warning(
                LogTag::System,
                &format!("Unknown logging.level '{}', keeping default", config.logging.level),
            );
        }
    }

    if logger::get_logger_config().file_path.is_none() {
        if let Some(file) = &config.logging.file {
            logger::set_log_file(Path::new(file));
        }
    }
}

fn print_state(state: ConnectionState) {
    let label = match state {
        ConnectionState::Connected => state.as_str().green().bold(),
        ConnectionState::FallbackActive => state.as_str().yellow().bold(),
        ConnectionState::Connecting | ConnectionState::Reconnecting => state.as_str().cyan(),
        ConnectionState::Disconnected => state.as_str().dimmed(),
    };
    println!("{} {}", "● state".bold(), label);
}

fn print_event(entry: &HistoryEntry) {
    let event = &entry.event;
    let level = match event.level {
        Severity::Info => event.level.as_str().blue(),
        Severity::Success => event.level.as_str().green(),
        Severity::Warning => event.level.as_str().yellow(),
        Severity::Error => event.level.as_str().red().bold(),
    };
    println!(
        "#{:<5} {} [{:<11}] {:<7} {}",
        entry.id,
        event.timestamp.format("%H:%M:%S%.3f").to_string().dimmed(),
        event.channel,
        level,
        event.message
    );
}

fn print_summary(client: &StreamClient) -> Result<()> {
    let stats = serde_json::to_string_pretty(&client.stats()).context("Failed to render stats")?;
    let metrics =
        serde_json::to_string_pretty(&client.metrics()).context("Failed to render metrics")?;

    println!("\n{}", "=".repeat(60));
    println!("{}", "Stream summary".bold());
    println!("{}", "=".repeat(60));
    println!("Events retained: {}", client.history().len());
    println!("Active notifications: {}", client.notifications().len());
    println!("Stats:\n{}", stats);
    println!("Metrics:\n{}", metrics);
    Ok(())
}
