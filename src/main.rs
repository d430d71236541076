use anyhow::Context;
use sysinfo::System;

use mqtt_soundboard::config::{Config, DEFAULT_CONFIG_FILE};
use mqtt_soundboard::{AppResult, Dispatcher};

const LOG_TARGET_STARTUP: &str = "mqtt_soundboard::startup";

/// Initialize tracing with file rotation
///
/// Logs are written to:
/// - macOS: ~/Library/Application Support/mqtt-soundboard/logs/
/// - Linux: ~/.config/mqtt-soundboard/logs/
///
/// Log rotation:
/// - Daily rotation (new file each day)
/// - Files named: mqtt-soundboard.YYYY-MM-DD.log
///
/// `RUST_LOG` overrides the configured level.
fn initialize_tracing(loglevel: &str) {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = dirs::config_dir()
        .map(|dir| dir.join("mqtt-soundboard").join("logs"))
        .unwrap_or_else(|| std::path::PathBuf::from("logs"));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    let file_appender = rolling::daily(&log_dir, "mqtt-soundboard.log");

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(loglevel))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .with_line_number(true);

    // Headless service: console output is always on
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_names(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::debug!("Log directory: {}", log_dir.display());
}

fn log_runtime_environment() {
    let version = env!("CARGO_PKG_VERSION");
    let os_name = System::long_os_version()
        .or_else(System::name)
        .unwrap_or_else(|| "Unknown OS".to_string());
    let kernel = System::kernel_version().unwrap_or_else(|| "Unknown Kernel".to_string());
    let architecture = std::env::consts::ARCH;

    tracing::info!(target: LOG_TARGET_STARTUP, "Starting mqtt-soundboard v{} on ({})", version, architecture);
    tracing::info!(target: LOG_TARGET_STARTUP, "Operating System: {} (kernel {})", os_name, kernel);
}

fn run() -> AppResult<()> {
    let config_file = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

    let config = Config::load(&config_file)
        .with_context(|| format!("Failed to load configuration {}", config_file))?;

    initialize_tracing(&config.loglevel);
    log_runtime_environment();
    tracing::info!(
        target: LOG_TARGET_STARTUP,
        "Sounds directory: {}, player: {}",
        config.sounds.directory,
        config.sounds.play_cmd
    );

    Dispatcher::new(&config)
        .connect_and_run(&config.mqtt)
        .context("Soundboard stopped")
}

fn main() {
    // Dispatcher failures are already in the log; config failures happen before it exists
    if let Err(e) = run() {
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}
