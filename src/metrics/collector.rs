//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the matchmaking service
//! using Prometheus metrics.

use crate::types::{CompetitionState, MatchmakingStats};
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How a competition reached its terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPath {
    /// Reached maximum capacity
    Filled,
    /// Matchmaking timeout elapsed
    TimedOut,
}

impl ResolutionPath {
    fn as_label(&self) -> &'static str {
        match self {
            ResolutionPath::Filled => "filled",
            ResolutionPath::TimedOut => "timed_out",
        }
    }
}

/// Main metrics collector for the matchmaking service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Competition-related metrics
    competition_metrics: CompetitionMetrics,

    /// Player-related metrics
    player_metrics: PlayerMetrics,

    /// Performance metrics
    performance_metrics: PerformanceMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Total TCP connections accepted
    pub connections_total: IntCounter,

    /// TCP connections currently open
    pub connections_open: IntGauge,

    /// Connections closed because of an error, by kind
    pub connection_errors_total: IntCounterVec,
}

/// Competition-related metrics
#[derive(Clone)]
pub struct CompetitionMetrics {
    /// Number of open competitions
    pub open_competitions: IntGauge,

    /// Total competitions created
    pub competitions_created_total: IntCounter,

    /// Total competitions resolved, by outcome and path
    pub competitions_resolved_total: IntCounterVec,

    /// Number of players in a competition when it resolves
    pub competition_size: Histogram,
}

/// Player-related metrics
#[derive(Clone)]
pub struct PlayerMetrics {
    /// Total join events, by result
    pub joins_total: IntCounterVec,

    /// Players currently waiting for their competition to resolve
    pub players_pending: IntGauge,

    /// Notifications that could not be delivered because the reader is gone
    pub notifications_dropped_total: IntCounter,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Time the coordinator spends applying one event
    pub event_processing_duration: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let competition_metrics = CompetitionMetrics::new(&registry)?;
        let player_metrics = PlayerMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            competition_metrics,
            player_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get service metrics
    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    /// Get competition metrics
    pub fn competition(&self) -> &CompetitionMetrics {
        &self.competition_metrics
    }

    /// Get player metrics
    pub fn player(&self) -> &PlayerMetrics {
        &self.player_metrics
    }

    /// Get performance metrics
    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Align gauges with a coordinator snapshot
    pub fn update_from_stats(&self, stats: &MatchmakingStats) {
        self.competition_metrics
            .open_competitions
            .set(stats.open_competitions as i64);
        self.player_metrics
            .players_pending
            .set(stats.pending_players as i64);
    }

    /// Record a join event and whether it placed a new player
    pub fn record_join(&self, duplicate: bool) {
        let result = if duplicate { "duplicate" } else { "placed" };
        self.player_metrics
            .joins_total
            .with_label_values(&[result])
            .inc();
        if !duplicate {
            self.player_metrics.players_pending.inc();
        }
    }

    /// Record a join whose caller went away before it was processed
    pub fn record_abandoned_join(&self) {
        self.player_metrics
            .joins_total
            .with_label_values(&["abandoned"])
            .inc();
    }

    /// Record a competition being created
    pub fn record_competition_created(&self) {
        self.competition_metrics.competitions_created_total.inc();
        self.competition_metrics.open_competitions.inc();
    }

    /// Record a competition reaching a terminal state
    pub fn record_competition_resolved(
        &self,
        outcome: CompetitionState,
        path: ResolutionPath,
        member_count: usize,
    ) {
        self.competition_metrics
            .competitions_resolved_total
            .with_label_values(&[&outcome.to_string(), path.as_label()])
            .inc();
        self.competition_metrics
            .competition_size
            .observe(member_count as f64);
        self.competition_metrics.open_competitions.dec();
        self.player_metrics
            .players_pending
            .sub(member_count as i64);
    }

    /// Record a notification that had no reader
    pub fn record_notification_dropped(&self) {
        self.player_metrics.notifications_dropped_total.inc();
    }

    /// Record the time spent applying one coordinator event
    pub fn record_event_processing(&self, duration: Duration) {
        self.performance_metrics
            .event_processing_duration
            .observe(duration.as_secs_f64());
    }

    /// Record a TCP connection being accepted
    pub fn record_connection_opened(&self) {
        self.service_metrics.connections_total.inc();
        self.service_metrics.connections_open.inc();
    }

    /// Record a TCP connection being closed
    pub fn record_connection_closed(&self) {
        self.service_metrics.connections_open.dec();
    }

    /// Record a connection-level error (`malformed`, `io`, `unavailable`)
    pub fn record_connection_error(&self, kind: &str) {
        self.service_metrics
            .connection_errors_total
            .with_label_values(&[kind])
            .inc();
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds = IntGauge::new(
            "level_matchmaker_uptime_seconds",
            "Service uptime in seconds",
        )?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let health_status = IntGauge::new(
            "level_matchmaker_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let connections_total = IntCounter::new(
            "level_matchmaker_connections_total",
            "Total TCP connections accepted",
        )?;
        registry.register(Box::new(connections_total.clone()))?;

        let connections_open = IntGauge::new(
            "level_matchmaker_connections_open",
            "TCP connections currently open",
        )?;
        registry.register(Box::new(connections_open.clone()))?;

        let connection_errors_total = IntCounterVec::new(
            Opts::new(
                "level_matchmaker_connection_errors_total",
                "Connections closed because of an error",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(connection_errors_total.clone()))?;

        Ok(Self {
            uptime_seconds,
            health_status,
            connections_total,
            connections_open,
            connection_errors_total,
        })
    }
}

impl CompetitionMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let open_competitions = IntGauge::new(
            "level_matchmaker_open_competitions",
            "Number of open competitions",
        )?;
        registry.register(Box::new(open_competitions.clone()))?;

        let competitions_created_total = IntCounter::new(
            "level_matchmaker_competitions_created_total",
            "Total competitions created",
        )?;
        registry.register(Box::new(competitions_created_total.clone()))?;

        let competitions_resolved_total = IntCounterVec::new(
            Opts::new(
                "level_matchmaker_competitions_resolved_total",
                "Total competitions started or aborted",
            ),
            &["outcome", "path"],
        )?;
        registry.register(Box::new(competitions_resolved_total.clone()))?;

        let competition_size = Histogram::with_opts(
            HistogramOpts::new(
                "level_matchmaker_competition_size",
                "Players in a competition when it resolves",
            )
            .buckets(vec![1.0, 2.0, 4.0, 6.0, 8.0, 10.0, 16.0, 32.0]),
        )?;
        registry.register(Box::new(competition_size.clone()))?;

        Ok(Self {
            open_competitions,
            competitions_created_total,
            competitions_resolved_total,
            competition_size,
        })
    }
}

impl PlayerMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let joins_total = IntCounterVec::new(
            Opts::new("level_matchmaker_joins_total", "Total join events"),
            &["result"],
        )?;
        registry.register(Box::new(joins_total.clone()))?;

        let players_pending = IntGauge::new(
            "level_matchmaker_players_pending",
            "Players waiting for their competition to resolve",
        )?;
        registry.register(Box::new(players_pending.clone()))?;

        let notifications_dropped_total = IntCounter::new(
            "level_matchmaker_notifications_dropped_total",
            "Notifications without a reader",
        )?;
        registry.register(Box::new(notifications_dropped_total.clone()))?;

        Ok(Self {
            joins_total,
            players_pending,
            notifications_dropped_total,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let event_processing_duration = Histogram::with_opts(
            HistogramOpts::new(
                "level_matchmaker_event_processing_duration_seconds",
                "Coordinator event processing time",
            )
            .buckets(vec![0.00001, 0.0001, 0.001, 0.005, 0.01, 0.05, 0.1]),
        )?;
        registry.register(Box::new(event_processing_duration.clone()))?;

        Ok(Self {
            event_processing_duration,
        })
    }
}
