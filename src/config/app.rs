//! Main application configuration
//!
//! This module defines the primary configuration structures for the
//! matchmaking service, including TOML and environment variable loading
//! and validation.

use crate::config::matchmaking::MatchmakingConfig;
use crate::utils::parse_duration;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub server: ServerSettings,
    pub matchmaking: MatchmakingSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Port for the metrics and health endpoints
    pub metrics_port: u16,
    /// Whether to serve the metrics and health endpoints
    pub metrics_enabled: bool,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// TCP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Interface to bind
    pub host: String,
    /// TCP port players connect to
    pub port: u16,
}

/// Matchmaking-specific settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakingSettings {
    /// Maximum number of players per competition
    pub max_players: usize,
    /// Minimum number of players to start a competition on timeout
    pub min_players: usize,
    /// Level overlap (± window half-width) for matchmaking
    pub level_matching_tolerance: u32,
    /// Matchmaking timeout in milliseconds
    pub timeout_ms: u64,
    /// Capacity of the coordinator's inbound event queue
    pub event_queue_capacity: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "level-matchmaker".to_string(),
            log_level: "info".to_string(),
            metrics_port: 9090,
            metrics_enabled: true,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        Self {
            max_players: 10,
            min_players: 2,
            level_matching_tolerance: 3,
            timeout_ms: 20_000, // 20 seconds
            event_queue_capacity: 1024,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Ok(port) = env::var("METRICS_PORT") {
            config.service.metrics_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid METRICS_PORT value: {}", port))?;
        }
        if let Ok(enabled) = env::var("METRICS_ENABLED") {
            config.service.metrics_enabled = enabled
                .parse()
                .map_err(|_| anyhow!("Invalid METRICS_ENABLED value: {}", enabled))?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            config.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }

        // Server settings
        if let Ok(host) = env::var("HOST") {
            config.server.host = host;
        }
        if let Ok(port) = env::var("PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| anyhow!("Invalid PORT value: {}", port))?;
        }

        // Matchmaking settings
        if let Ok(max_players) = env::var("MAX_PLAYERS") {
            config.matchmaking.max_players = max_players
                .parse()
                .map_err(|_| anyhow!("Invalid MAX_PLAYERS value: {}", max_players))?;
        }
        if let Ok(min_players) = env::var("MIN_PLAYERS") {
            config.matchmaking.min_players = min_players
                .parse()
                .map_err(|_| anyhow!("Invalid MIN_PLAYERS value: {}", min_players))?;
        }
        if let Ok(tolerance) = env::var("LEVEL_MATCHING_TOLERANCE") {
            config.matchmaking.level_matching_tolerance = tolerance
                .parse()
                .map_err(|_| anyhow!("Invalid LEVEL_MATCHING_TOLERANCE value: {}", tolerance))?;
        }
        if let Ok(timeout) = env::var("MATCHMAKING_TIMEOUT") {
            let timeout = parse_duration(&timeout)
                .map_err(|e| anyhow!("Invalid MATCHMAKING_TIMEOUT value: {}", e))?;
            config.matchmaking.timeout_ms = timeout.as_millis() as u64;
        }
        if let Ok(capacity) = env::var("EVENT_QUEUE_CAPACITY") {
            config.matchmaking.event_queue_capacity = capacity
                .parse()
                .map_err(|_| anyhow!("Invalid EVENT_QUEUE_CAPACITY value: {}", capacity))?;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; missing keys take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to load config file {}", path.display()))?;
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents).context("Invalid TOML configuration")?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get matchmaking timeout as Duration
    pub fn matchmaking_timeout(&self) -> Duration {
        Duration::from_millis(self.matchmaking.timeout_ms)
    }

    /// Address the TCP listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Coordinator configuration derived from the matchmaking settings
    pub fn matchmaking_config(&self) -> MatchmakingConfig {
        MatchmakingConfig {
            max_player_count: self.matchmaking.max_players,
            min_player_count: self.matchmaking.min_players,
            level_matching_tolerance: self.matchmaking.level_matching_tolerance,
            matchmaking_timeout: self.matchmaking_timeout(),
            event_queue_capacity: self.matchmaking.event_queue_capacity,
        }
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    // Validate ports
    if config.server.port == 0 {
        return Err(anyhow!("Server port cannot be 0"));
    }
    if config.service.metrics_enabled && config.service.metrics_port == 0 {
        return Err(anyhow!("Metrics port cannot be 0"));
    }
    if config.service.metrics_enabled && config.service.metrics_port == config.server.port {
        return Err(anyhow!(
            "Metrics port and server port must differ (both {})",
            config.server.port
        ));
    }

    // Validate timeouts
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    // Validate matchmaking settings
    config.matchmaking_config().validate()?;

    Ok(())
}
