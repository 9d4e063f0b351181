//! Main entry point for the level matchmaking service
//!
//! This is the production entry point that initializes and runs the
//! matchmaking microservice with logging, configuration layering and
//! graceful shutdown.

use anyhow::Result;
use clap::Parser;
use level_matchmaker::config::{validate_config, AppConfig};
use level_matchmaker::service::AppState;
use level_matchmaker::utils::parse_duration;
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

/// Level Matchmaker - batches players into level-window competitions
#[derive(Parser)]
#[command(
    name = "level-matchmaker",
    version,
    about = "A matchmaking microservice that batches players into level-window competitions",
    long_about = "Level Matchmaker accepts players over TCP as newline-delimited JSON, places each \
                 one in the first open competition whose level window accepts it, and starts a \
                 competition when it fills up or, once its timeout elapses, when it has enough players."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// TCP port override
    #[arg(short, long, value_name = "PORT", help = "Port players connect to")]
    port: Option<u16>,

    /// Maximum players per competition
    #[arg(long, value_name = "N", help = "Competition starts immediately at this size")]
    max_players: Option<usize>,

    /// Minimum players per competition
    #[arg(long, value_name = "N", help = "Competition starts on timeout at this size")]
    min_players: Option<usize>,

    /// Level matching tolerance
    #[arg(long, value_name = "N", help = "Half-width of a competition's level window")]
    level_matching_tolerance: Option<u32>,

    /// Matchmaking timeout
    #[arg(
        short,
        long,
        value_name = "DURATION",
        value_parser = parse_duration,
        help = "Time a competition waits for players (e.g. 20s, 1500ms, 2m)"
    )]
    timeout: Option<Duration>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Metrics port override
    #[arg(long, value_name = "PORT", help = "Override metrics server port")]
    metrics_port: Option<u16>,

    /// Disable metrics endpoints
    #[arg(long, help = "Do not serve the metrics and health endpoints")]
    no_metrics: bool,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("🚀 Level Matchmaker Service");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   Listening: {}", config.bind_address());
    if config.service.metrics_enabled {
        info!("   Metrics port: {}", config.service.metrics_port);
    } else {
        info!("   Metrics: disabled");
    }
    info!(
        "   Players per competition: {}..={}",
        config.matchmaking.min_players, config.matchmaking.max_players
    );
    info!(
        "   Level tolerance: ±{}",
        config.matchmaking.level_matching_tolerance
    );
    info!("   Timeout: {:?}", config.matchmaking_timeout());
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load and merge configuration from file or environment, then CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(port) = args.port {
        config.server.port = port;
    }

    if let Some(metrics_port) = args.metrics_port {
        config.service.metrics_port = metrics_port;
    }

    if args.no_metrics {
        config.service.metrics_enabled = false;
    }

    if let Some(max_players) = args.max_players {
        config.matchmaking.max_players = max_players;
    }

    if let Some(min_players) = args.min_players {
        config.matchmaking.min_players = min_players;
    }

    if let Some(tolerance) = args.level_matching_tolerance {
        config.matchmaking.level_matching_tolerance = tolerance;
    }

    if let Some(timeout) = args.timeout {
        config.matchmaking.timeout_ms = timeout.as_millis() as u64;
    }

    validate_config(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {:#}", e);
        std::process::exit(1);
    });

    // Initialize logging early (before any other operations)
    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if args.dry_run {
        info!("Configuration validation successful");
        display_startup_banner(&config);
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    display_startup_banner(&config);

    info!("Initializing service components...");
    let mut app_state = match AppState::new(config.clone()).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting service...");
    if let Err(e) = app_state.start().await {
        error!("Failed to start service: {}", e);
        std::process::exit(1);
    }

    info!("✅ Level Matchmaker Service is running");
    info!("Press Ctrl+C to shutdown gracefully...");

    wait_for_shutdown_signal().await;

    info!("🛑 Shutdown signal received, beginning graceful shutdown...");

    match tokio::time::timeout(config.shutdown_timeout(), app_state.shutdown()).await {
        Ok(Ok(())) => {
            info!("✅ Graceful shutdown completed successfully");
        }
        Ok(Err(e)) => {
            error!("Shutdown failed: {}", e);
        }
        Err(_) => {
            warn!("⚠️  Shutdown timeout exceeded, forcing exit");
        }
    }

    info!("🛑 Level Matchmaker Service stopped");
    Ok(())
}
