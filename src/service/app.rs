//! Main application state and service coordination
//!
//! This module contains the production AppState that wires the matchmaking
//! coordinator, the player TCP server, the metrics endpoints and the
//! background tasks together.

use crate::config::AppConfig;
use crate::matchmaking::{JoinHandler, Matchmaker};
use crate::metrics::{HealthServer, HealthServerConfig, MetricsCollector};
use crate::server::MatchmakingTcpServer;
use crate::service::health::HealthCheck;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// How often matchmaking gauges and uptime are refreshed
const STATS_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Handle to the matchmaking coordinator
    matchmaker: Matchmaker,

    /// Coordinator task, awaited on shutdown
    coordinator_task: Option<JoinHandle<()>>,

    /// Metrics collector shared by every component
    metrics_collector: Arc<MetricsCollector>,

    /// Metrics and health endpoints, when enabled
    health_server: Option<Arc<HealthServer>>,

    /// Stops the TCP accept loop and open connections
    shutdown_tx: broadcast::Sender<()>,

    /// Address the TCP server is bound to, once started
    local_addr: Option<SocketAddr>,

    /// Background task handles
    background_tasks: Vec<JoinHandle<()>>,

    /// Service status
    is_running: Arc<RwLock<bool>>,
}

impl AppState {
    /// Initialize the application and spawn the coordinator
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing level-matchmaker service");
        info!(
            "Configuration: service={}, bind={}, max_players={}, min_players={}, tolerance={}, timeout={:?}",
            config.service.name,
            config.bind_address(),
            config.matchmaking.max_players,
            config.matchmaking.min_players,
            config.matchmaking.level_matching_tolerance,
            config.matchmaking_timeout()
        );

        crate::config::validate_config(&config).map_err(|e| ServiceError::Configuration {
            message: e.to_string(),
        })?;

        let metrics_collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let (matchmaker, coordinator_task) =
            Matchmaker::spawn_with_metrics(config.matchmaking_config(), metrics_collector.clone())
                .map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to start matchmaking coordinator: {}", e),
                })?;

        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config,
            matchmaker,
            coordinator_task: Some(coordinator_task),
            metrics_collector,
            health_server: None,
            shutdown_tx,
            local_addr: None,
            background_tasks: Vec::new(),
            is_running: Arc::new(RwLock::new(false)),
        })
    }

    /// Start the TCP server, metrics endpoints and background tasks
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting level-matchmaker service");

        *self.is_running.write().await = true;

        if self.config.service.metrics_enabled {
            self.start_metrics_service().await?;
        } else {
            info!("Metrics endpoints disabled");
        }

        self.start_tcp_server().await?;
        self.start_background_tasks();

        info!("✅ Level-matchmaker service started successfully");
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of level-matchmaker service");

        *self.is_running.write().await = false;

        // Stop accepting players before the coordinator goes away
        if self.shutdown_tx.send(()).is_err() {
            debug!("TCP server was not running");
        }

        if let Some(health_server) = &self.health_server {
            info!("Stopping metrics service...");
            if let Err(e) = health_server.stop().await {
                warn!("Failed to stop metrics service: {}", e);
            } else {
                info!("✅ Metrics service stopped");
            }
        }

        match self.matchmaker.stats().await {
            Ok(stats) => info!("Final matchmaking statistics: {:?}", stats),
            Err(e) => warn!("Failed to get final stats: {}", e),
        }

        if let Err(e) = self.matchmaker.shutdown().await {
            debug!("Coordinator already stopped: {}", e);
        }
        if let Some(task) = self.coordinator_task.take() {
            task.await.map_err(|e| ServiceError::BackgroundTask {
                message: format!("Coordinator task failed: {}", e),
            })?;
        }
        info!("✅ Matchmaking coordinator stopped");

        self.stop_background_tasks().await;

        info!("✅ Level-matchmaker service shutdown completed");
        Ok(())
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Handle to the matchmaking coordinator
    pub fn matchmaker(&self) -> Matchmaker {
        self.matchmaker.clone()
    }

    /// Get metrics collector
    pub fn metrics_collector(&self) -> Arc<MetricsCollector> {
        self.metrics_collector.clone()
    }

    /// Address players connect to, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Start metrics and health endpoints
    async fn start_metrics_service(&mut self) -> Result<(), ServiceError> {
        let port = self.config.service.metrics_port;
        info!("Starting metrics and health endpoints on port {}", port);

        let health_config = HealthServerConfig {
            port,
            host: self.config.server.host.clone(),
        };
        let health_server = Arc::new(
            HealthServer::new(health_config, self.metrics_collector.clone())
                .with_matchmaker(self.matchmaker.clone())
                .with_service_name(self.config.service.name.clone()),
        );

        let server = health_server.clone();
        let metrics_handle = tokio::spawn(async move {
            if let Err(e) = server.start().await {
                error!("Metrics service failed: {}", e);
            } else {
                info!("Metrics service task completed");
            }
        });

        self.health_server = Some(health_server);
        self.background_tasks.push(metrics_handle);

        // Give the server a moment to subscribe to the shutdown signal
        tokio::time::sleep(Duration::from_millis(100)).await;

        info!("✅ Metrics service started on port {}", port);
        Ok(())
    }

    /// Bind the player listener and spawn the accept loop
    async fn start_tcp_server(&mut self) -> Result<(), ServiceError> {
        let handler: Arc<dyn JoinHandler> = Arc::new(self.matchmaker.clone());
        let server = MatchmakingTcpServer::bind(
            &self.config.bind_address(),
            handler,
            self.metrics_collector.clone(),
        )
        .await
        .map_err(|e| ServiceError::Transport {
            message: e.to_string(),
        })?;

        let local_addr = server.local_addr().map_err(|e| ServiceError::Transport {
            message: format!("Failed to read listener address: {}", e),
        })?;
        self.local_addr = Some(local_addr);

        let shutdown_rx = self.shutdown_tx.subscribe();
        let server_handle = tokio::spawn(async move {
            if let Err(e) = server.serve(shutdown_rx).await {
                error!("TCP server failed: {}", e);
            } else {
                info!("TCP server stopped");
            }
        });
        self.background_tasks.push(server_handle);

        info!("✅ Accepting players on {}", local_addr);
        Ok(())
    }

    /// Start background maintenance tasks
    fn start_background_tasks(&mut self) {
        info!(
            "Starting stats refresh task ({}s interval)...",
            STATS_REFRESH_INTERVAL.as_secs()
        );

        let matchmaker = self.matchmaker.clone();
        let metrics_collector = self.metrics_collector.clone();
        let service_name = self.config.service.name.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let stats_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(STATS_REFRESH_INTERVAL);
            let start_time = Instant::now();
            info!("Stats refresh task started");

            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = shutdown_rx.recv() => break,
                }

                metrics_collector
                    .service()
                    .uptime_seconds
                    .set(start_time.elapsed().as_secs() as i64);

                match HealthCheck::check(&matchmaker, &service_name).await {
                    Ok(health) => {
                        metrics_collector.update_health_status(health.status.as_gauge());
                        if let Some(stats) = health.stats {
                            debug!(
                                "Updating metrics - competitions: {}, players: {}, started: {}, aborted: {}",
                                stats.open_competitions,
                                stats.pending_players,
                                stats.competitions_started,
                                stats.competitions_aborted
                            );
                            metrics_collector.update_from_stats(&stats);
                        }
                    }
                    Err(e) => warn!("Failed to refresh matchmaking stats: {}", e),
                }
            }

            info!("Stats refresh task stopped");
        });

        self.background_tasks.push(stats_task);
    }

    /// Stop all background tasks
    async fn stop_background_tasks(&mut self) {
        info!(
            "Stopping {} background tasks...",
            self.background_tasks.len()
        );

        let shutdown_timeout = self.config.shutdown_timeout();
        for task in self.background_tasks.drain(..) {
            let abort_handle = task.abort_handle();
            match tokio::time::timeout(shutdown_timeout, task).await {
                Ok(_) => {}
                Err(_) => {
                    warn!("Background task did not stop in time, aborting");
                    abort_handle.abort();
                }
            }
        }

        info!("✅ All background tasks stopped");
    }
}
