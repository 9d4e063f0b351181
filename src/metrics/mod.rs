//! Metrics and monitoring for the matchmaking service
//!
//! This module provides Prometheus metrics collection and the HTTP
//! endpoints that expose them alongside health probes.

pub mod collector;
pub mod health;

pub use collector::{
    CompetitionMetrics, MetricsCollector, PerformanceMetrics, PlayerMetrics, ResolutionPath,
    ServiceMetrics,
};
pub use health::{HealthServer, HealthServerConfig};
