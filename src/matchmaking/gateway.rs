//! Join gateway
//!
//! [`Matchmaker`] is the cloneable handle callers use to reach the
//! coordinator task. Every operation is a message on the coordinator's
//! bounded queue, answered through a one-shot reply.

use crate::config::MatchmakingConfig;
use crate::error::{MatchmakingError, Result};
use crate::matchmaking::coordinator::MatchmakingCoordinator;
use crate::matchmaking::events::MatchmakingEvent;
use crate::matchmaking::notification::NotificationStream;
use crate::metrics::MetricsCollector;
use crate::types::{CompetitionSummary, MatchmakingStats, Player};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::info;

/// Trait defining the interface transports use to submit players
#[async_trait]
pub trait JoinHandler: Send + Sync {
    /// Submit a player and obtain its notification stream
    async fn handle_join(&self, player: Player) -> Result<NotificationStream>;
}

/// Handle to a running matchmaking coordinator
#[derive(Clone)]
pub struct Matchmaker {
    events: mpsc::Sender<MatchmakingEvent>,
}

impl Matchmaker {
    /// Validate `config` and spawn a coordinator with its own metrics registry
    pub fn spawn(config: MatchmakingConfig) -> Result<(Self, JoinHandle<()>)> {
        let metrics_collector = Arc::new(MetricsCollector::new()?);
        Self::spawn_with_metrics(config, metrics_collector)
    }

    /// Validate `config` and spawn a coordinator recording into `metrics_collector`
    pub fn spawn_with_metrics(
        config: MatchmakingConfig,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Result<(Self, JoinHandle<()>)> {
        config.validate()?;

        let (events_tx, events_rx) = mpsc::channel(config.event_queue_capacity);
        let coordinator =
            MatchmakingCoordinator::new(config, events_tx.downgrade(), events_rx, metrics_collector);
        let handle = tokio::spawn(coordinator.run());

        Ok((Self { events: events_tx }, handle))
    }

    /// Submit a player; safe to call concurrently from any number of tasks
    ///
    /// Suspends while the queue is full and until the coordinator has
    /// registered the player. A second join for a pending id returns the
    /// existing stream.
    pub async fn submit_join(&self, player: Player) -> Result<NotificationStream> {
        let (reply, reply_rx) = oneshot::channel();
        self.send(MatchmakingEvent::PlayerJoin { player, reply })
            .await?;
        reply_rx
            .await
            .map_err(|_| MatchmakingError::CoordinatorUnavailable.into())
    }

    /// Current matchmaking counters
    pub async fn stats(&self) -> Result<MatchmakingStats> {
        let (reply, reply_rx) = oneshot::channel();
        self.send(MatchmakingEvent::Snapshot { reply }).await?;
        reply_rx
            .await
            .map_err(|_| MatchmakingError::CoordinatorUnavailable.into())
    }

    /// Summary of every open competition, lowest identity first
    pub async fn open_competitions(&self) -> Result<Vec<CompetitionSummary>> {
        let (reply, reply_rx) = oneshot::channel();
        self.send(MatchmakingEvent::ListCompetitions { reply })
            .await?;
        reply_rx
            .await
            .map_err(|_| MatchmakingError::CoordinatorUnavailable.into())
    }

    /// Ask the coordinator to stop; pending streams close without a terminal notification
    pub async fn shutdown(&self) -> Result<()> {
        info!("Requesting matchmaking coordinator shutdown");
        self.send(MatchmakingEvent::Shutdown).await
    }

    /// Whether the coordinator has stopped
    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }

    async fn send(&self, event: MatchmakingEvent) -> Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| MatchmakingError::CoordinatorUnavailable.into())
    }
}

#[async_trait]
impl JoinHandler for Matchmaker {
    async fn handle_join(&self, player: Player) -> Result<NotificationStream> {
        self.submit_join(player).await
    }
}
