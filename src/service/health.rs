//! Health checks
//!
//! This module provides health check functionality for the matchmaking
//! service, including readiness and liveness probes. Every probe goes
//! through the coordinator's event queue, so a stalled coordinator shows up
//! as degraded or unhealthy.

use crate::matchmaking::Matchmaker;
use crate::types::MatchmakingStats;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Longest a probe waits for the coordinator
pub const COORDINATOR_PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Probes slower than this report the coordinator as degraded
const COORDINATOR_DEGRADED_THRESHOLD: Duration = Duration::from_millis(100);

/// Health check status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Value exported through the health status gauge
    pub fn as_gauge(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 2,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 0,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    /// Crate version
    pub version: String,
    /// Current timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    /// Coordinator counters, when the coordinator answered
    pub stats: Option<MatchmakingStats>,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional error message if unhealthy
    pub message: Option<String>,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

impl HealthCheck {
    /// Perform a full health check of the service
    pub async fn check(matchmaker: &Matchmaker, service_name: &str) -> Result<Self> {
        let (coordinator_check, stats) = Self::check_coordinator(matchmaker).await;

        Ok(HealthCheck {
            status: coordinator_check.status,
            service: service_name.to_string(),
            version: crate::VERSION.to_string(),
            timestamp: chrono::Utc::now(),
            checks: vec![coordinator_check],
            stats,
        })
    }

    /// Liveness check - the coordinator task is still consuming events
    pub async fn liveness_check(matchmaker: &Matchmaker) -> Result<HealthStatus> {
        if matchmaker.is_closed() {
            Ok(HealthStatus::Unhealthy)
        } else {
            Ok(HealthStatus::Healthy)
        }
    }

    /// Readiness check - the coordinator answers within the probe timeout
    pub async fn readiness_check(matchmaker: &Matchmaker) -> Result<HealthStatus> {
        let (check, _) = Self::check_coordinator(matchmaker).await;
        Ok(check.status)
    }

    /// Round-trip a snapshot request through the coordinator
    async fn check_coordinator(matchmaker: &Matchmaker) -> (ComponentCheck, Option<MatchmakingStats>) {
        let start = Instant::now();

        let (status, message, stats) =
            match tokio::time::timeout(COORDINATOR_PROBE_TIMEOUT, matchmaker.stats()).await {
                Ok(Ok(stats)) if start.elapsed() > COORDINATOR_DEGRADED_THRESHOLD => (
                    HealthStatus::Degraded,
                    Some(format!("Coordinator answered in {:?}", start.elapsed())),
                    Some(stats),
                ),
                Ok(Ok(stats)) => (HealthStatus::Healthy, None, Some(stats)),
                Ok(Err(e)) => {
                    warn!("Coordinator health probe failed: {}", e);
                    (HealthStatus::Unhealthy, Some(e.to_string()), None)
                }
                Err(_) => (
                    HealthStatus::Unhealthy,
                    Some(format!(
                        "Coordinator did not answer within {:?}",
                        COORDINATOR_PROBE_TIMEOUT
                    )),
                    None,
                ),
            };

        debug!("Coordinator health probe - status: {:?}", status);

        let check = ComponentCheck {
            name: "matchmaking_coordinator".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        (check, stats)
    }

    /// Convert health check to JSON string
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}
