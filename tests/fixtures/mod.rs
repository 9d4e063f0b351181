//! Test fixtures and mock implementations for integration testing

#![allow(dead_code)]

use async_trait::async_trait;
use level_matchmaker::config::MatchmakingConfig;
use level_matchmaker::error::Result;
use level_matchmaker::matchmaking::{
    notification_channel, JoinHandler, Matchmaker, NotificationOutbox, NotificationStream,
};
use level_matchmaker::metrics::MetricsCollector;
use level_matchmaker::server::MatchmakingTcpServer;
use level_matchmaker::types::{Notification, Player};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Matchmaking rules with the given bounds, tolerance 3 and a 20s timeout
pub fn create_test_config(min_players: usize, max_players: usize) -> MatchmakingConfig {
    MatchmakingConfig {
        max_player_count: max_players,
        min_player_count: min_players,
        level_matching_tolerance: 3,
        matchmaking_timeout: Duration::from_secs(20),
        event_queue_capacity: 64,
    }
}

/// Spawn a coordinator and return its handle together with its metrics
pub fn spawn_matchmaker(
    config: MatchmakingConfig,
) -> (Matchmaker, JoinHandle<()>, Arc<MetricsCollector>) {
    let metrics = Arc::new(MetricsCollector::new().expect("Failed to create metrics collector"));
    let (matchmaker, handle) =
        Matchmaker::spawn_with_metrics(config, metrics.clone()).expect("Invalid test config");
    (matchmaker, handle, metrics)
}

/// Submit one player per `(id, level)` pair, in order
pub async fn join_all_in_order(
    matchmaker: &Matchmaker,
    players: &[(&str, i64)],
) -> Vec<NotificationStream> {
    let mut streams = Vec::with_capacity(players.len());
    for (id, level) in players {
        let stream = matchmaker
            .submit_join(Player::new(*id, *level))
            .await
            .expect("Join failed");
        streams.push(stream);
    }
    streams
}

/// Final notification of a closed stream
pub async fn terminal_of(stream: &NotificationStream) -> Notification {
    let notifications = stream.collect().await;
    let terminal_count = notifications.iter().filter(|n| n.is_terminal()).count();
    assert_eq!(
        terminal_count, 1,
        "expected exactly one terminal notification, got {:?}",
        notifications
    );
    *notifications.last().expect("stream closed without notifications")
}

/// Join handler that records players and hands out streams the test controls
#[derive(Default)]
pub struct RecordingJoinHandler {
    joined: Mutex<Vec<Player>>,
    outboxes: Mutex<Vec<NotificationOutbox>>,
}

impl RecordingJoinHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Players received so far
    pub fn joined(&self) -> Vec<Player> {
        self.joined
            .lock()
            .map(|joined| joined.clone())
            .unwrap_or_default()
    }

    /// Deliver to the stream of the `index`th join
    pub fn deliver(&self, index: usize, notification: Notification) -> bool {
        self.outboxes
            .lock()
            .ok()
            .and_then(|outboxes| outboxes.get(index).map(|o| o.deliver(notification)))
            .unwrap_or(false)
    }

    /// Close every stream handed out so far
    pub fn close_all(&self) {
        if let Ok(mut outboxes) = self.outboxes.lock() {
            outboxes.clear();
        }
    }
}

#[async_trait]
impl JoinHandler for RecordingJoinHandler {
    async fn handle_join(&self, player: Player) -> Result<NotificationStream> {
        let (outbox, stream) = notification_channel();
        if let Ok(mut joined) = self.joined.lock() {
            joined.push(player);
        }
        if let Ok(mut outboxes) = self.outboxes.lock() {
            outboxes.push(outbox);
        }
        Ok(stream)
    }
}

/// Running TCP server bound to an ephemeral local port
pub struct TestServer {
    pub addr: SocketAddr,
    pub metrics: Arc<MetricsCollector>,
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(handler: Arc<dyn JoinHandler>) -> Self {
        let metrics = Arc::new(MetricsCollector::new().expect("Failed to create metrics collector"));
        let server = MatchmakingTcpServer::bind("127.0.0.1:0", handler, metrics.clone())
            .await
            .expect("Failed to bind test server");
        let addr = server.local_addr().expect("No local address");

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(async move {
            server.serve(shutdown_rx).await.expect("Server failed");
        });

        Self {
            addr,
            metrics,
            shutdown_tx,
            handle,
        }
    }

    pub fn addr_string(&self) -> String {
        self.addr.to_string()
    }

    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.handle.await;
    }
}
