//! Matchmaking coordinator
//!
//! This module provides the single consumer that owns all mutable matchmaking
//! state: open competitions keyed by ascending identity, pending players and
//! the identity counter. Events are applied one at a time, so no lock guards
//! any of it.

use crate::competition::{Competition, LevelRange};
use crate::config::MatchmakingConfig;
use crate::matchmaking::events::MatchmakingEvent;
use crate::matchmaking::notification::{notification_channel, NotificationOutbox, NotificationStream};
use crate::matchmaking::timeout::TimeoutClock;
use crate::metrics::collector::ResolutionPath;
use crate::metrics::MetricsCollector;
use crate::types::{
    CompetitionId, CompetitionState, CompetitionSummary, MatchmakingStats, Notification, Player,
    PlayerId,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Competition still accepting players, with its armed clock
#[derive(Debug)]
struct OpenCompetition {
    competition: Competition,
    clock: TimeoutClock,
}

/// Player waiting for its competition to resolve
#[derive(Debug)]
struct PendingPlayer {
    competition_id: CompetitionId,
    outbox: NotificationOutbox,
}

/// The matchmaking coordinator
pub struct MatchmakingCoordinator {
    /// Matchmaking rules
    config: MatchmakingConfig,
    /// Identity of the next competition created
    next_competition_id: CompetitionId,
    /// Open competitions in ascending identity order
    open_competitions: BTreeMap<CompetitionId, OpenCompetition>,
    /// Players whose competition has not resolved yet
    pending_players: HashMap<PlayerId, PendingPlayer>,
    /// Handle given to timeout clocks; weak so the queue closes with the last gateway
    events_tx: mpsc::WeakSender<MatchmakingEvent>,
    /// Inbound event queue
    events_rx: mpsc::Receiver<MatchmakingEvent>,
    /// Metrics collector for recording matchmaking activity
    metrics_collector: Arc<MetricsCollector>,
    /// Coordinator statistics
    stats: MatchmakingStats,
}

impl MatchmakingCoordinator {
    /// Create a coordinator consuming `events_rx`
    pub fn new(
        config: MatchmakingConfig,
        events_tx: mpsc::WeakSender<MatchmakingEvent>,
        events_rx: mpsc::Receiver<MatchmakingEvent>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            config,
            next_competition_id: 1,
            open_competitions: BTreeMap::new(),
            pending_players: HashMap::new(),
            events_tx,
            events_rx,
            metrics_collector,
            stats: MatchmakingStats::default(),
        }
    }

    /// Drain the event queue until shutdown or until every sender is gone
    pub async fn run(mut self) {
        info!(
            "Matchmaking coordinator started - max_players: {}, min_players: {}, tolerance: {}, timeout: {:?}",
            self.config.max_player_count,
            self.config.min_player_count,
            self.config.level_matching_tolerance,
            self.config.matchmaking_timeout
        );

        while let Some(event) = self.events_rx.recv().await {
            let timer = self.metrics_collector.start_timer();
            let kind = event.kind();
            let keep_running = self.handle_event(event);
            let elapsed = timer.stop();
            self.metrics_collector.record_event_processing(elapsed);
            debug!("Processed event - kind: {}, elapsed: {:?}", kind, elapsed);

            if !keep_running {
                break;
            }
        }

        self.close();
        info!(
            "Matchmaking coordinator stopped - joins_processed: {}, competitions_started: {}, competitions_aborted: {}",
            self.stats.joins_processed, self.stats.competitions_started, self.stats.competitions_aborted
        );
    }

    /// Apply one event; returns `false` when the coordinator should stop
    pub fn handle_event(&mut self, event: MatchmakingEvent) -> bool {
        match event {
            MatchmakingEvent::PlayerJoin { player, reply } => {
                self.handle_player_join(player, reply);
            }
            MatchmakingEvent::CompetitionTimeout { competition_id } => {
                self.handle_timeout(competition_id);
            }
            MatchmakingEvent::Snapshot { reply } => {
                if reply.send(self.snapshot()).is_err() {
                    debug!("Snapshot requester went away");
                }
            }
            MatchmakingEvent::ListCompetitions { reply } => {
                if reply.send(self.competition_summaries()).is_err() {
                    debug!("Competition list requester went away");
                }
            }
            MatchmakingEvent::Shutdown => {
                info!("Shutdown requested");
                return false;
            }
        }
        true
    }

    /// Current counters
    pub fn snapshot(&self) -> MatchmakingStats {
        let mut stats = self.stats.clone();
        stats.open_competitions = self.open_competitions.len();
        stats.pending_players = self.pending_players.len();
        stats
    }

    /// Summaries of every open competition, lowest identity first
    pub fn competition_summaries(&self) -> Vec<CompetitionSummary> {
        self.open_competitions
            .values()
            .map(|open| open.competition.summary())
            .collect()
    }

    fn handle_player_join(&mut self, player: Player, reply: oneshot::Sender<NotificationStream>) {
        self.stats.joins_processed += 1;

        if self.pending_players.contains_key(&player.id) {
            self.handle_duplicate_join(player, reply);
            return;
        }

        if reply.is_closed() {
            debug!("Join abandoned before processing - player: {}", player.id);
            self.metrics_collector.record_abandoned_join();
            return;
        }

        let (outbox, stream) = notification_channel();
        if reply.send(stream).is_err() {
            debug!("Join abandoned before processing - player: {}", player.id);
            self.metrics_collector.record_abandoned_join();
            return;
        }

        let player_id = player.id.clone();
        let level = player.level;
        let competition_id = self.place_player(player);
        self.pending_players.insert(
            player_id.clone(),
            PendingPlayer {
                competition_id,
                outbox,
            },
        );
        self.metrics_collector.record_join(false);

        let member_count = self
            .open_competitions
            .get(&competition_id)
            .map(|open| open.competition.member_count())
            .unwrap_or_default();

        debug!(
            "Placed player - player: {}, level: {}, competition_id: {}, members: {}/{}",
            player_id, level, competition_id, member_count, self.config.max_player_count
        );

        if member_count >= self.config.max_player_count {
            self.resolve(competition_id, CompetitionState::Started, ResolutionPath::Filled);
        } else {
            self.notify_player(
                &player_id,
                Notification::new(competition_id, CompetitionState::WaitingForPlayers),
            );
        }
    }

    fn handle_duplicate_join(&mut self, player: Player, reply: oneshot::Sender<NotificationStream>) {
        self.stats.duplicate_joins += 1;
        self.metrics_collector.record_join(true);

        let Some(pending) = self.pending_players.get_mut(&player.id) else {
            return;
        };

        let stream = match pending.outbox.attached_stream() {
            Some(stream) => {
                debug!(
                    "Duplicate join - returning existing stream - player: {}, competition_id: {}",
                    player.id, pending.competition_id
                );
                stream
            }
            None => {
                // Every holder dropped the previous stream
                let (outbox, stream) = notification_channel();
                outbox.deliver(Notification::new(
                    pending.competition_id,
                    CompetitionState::WaitingForPlayers,
                ));
                pending.outbox = outbox;
                info!(
                    "Re-attached player stream - player: {}, competition_id: {}",
                    player.id, pending.competition_id
                );
                stream
            }
        };

        if reply.send(stream).is_err() {
            debug!("Duplicate join abandoned - player: {}", player.id);
        }
    }

    /// First-fit placement; creates a competition when none accepts the level
    fn place_player(&mut self, player: Player) -> CompetitionId {
        let matching = self
            .open_competitions
            .values()
            .find(|open| open.competition.is_level_matching(&player))
            .map(|open| open.competition.id());

        let competition_id = match matching {
            Some(id) => id,
            None => self.create_competition(&player),
        };

        if let Some(open) = self.open_competitions.get_mut(&competition_id) {
            open.competition.add_player(player);
        }
        competition_id
    }

    fn create_competition(&mut self, founder: &Player) -> CompetitionId {
        let competition_id = self.next_competition_id;
        self.next_competition_id += 1;

        let level_range = LevelRange::around(founder.level, self.config.level_matching_tolerance);
        let clock = match self.events_tx.upgrade() {
            Some(_) => TimeoutClock::arm(
                competition_id,
                self.config.matchmaking_timeout,
                self.events_tx.clone(),
            ),
            None => {
                warn!(
                    "Event queue closing, competition will not time out - competition_id: {}",
                    competition_id
                );
                TimeoutClock::disarmed(competition_id)
            }
        };

        self.open_competitions.insert(
            competition_id,
            OpenCompetition {
                competition: Competition::new(competition_id, level_range),
                clock,
            },
        );
        self.stats.competitions_created += 1;
        self.metrics_collector.record_competition_created();

        info!(
            "Created competition - id: {}, level_range: {}, founder: {}",
            competition_id, level_range, founder.id
        );
        competition_id
    }

    fn handle_timeout(&mut self, competition_id: CompetitionId) {
        let Some(open) = self.open_competitions.get(&competition_id) else {
            debug!(
                "Timeout for competition no longer open - competition_id: {}",
                competition_id
            );
            return;
        };

        let member_count = open.competition.member_count();
        if member_count >= self.config.min_player_count {
            self.resolve(competition_id, CompetitionState::Started, ResolutionPath::TimedOut);
        } else {
            self.resolve(competition_id, CompetitionState::Aborted, ResolutionPath::TimedOut);
        }
    }

    /// Move a competition out of the open set and notify every member
    fn resolve(
        &mut self,
        competition_id: CompetitionId,
        outcome: CompetitionState,
        path: ResolutionPath,
    ) {
        let Some(mut open) = self.open_competitions.remove(&competition_id) else {
            debug!(
                "Competition already resolved - competition_id: {}",
                competition_id
            );
            return;
        };

        open.clock.cancel();
        let member_count = open.competition.member_count();

        match outcome {
            CompetitionState::Started => {
                open.competition.begin();
                self.stats.competitions_started += 1;
                self.stats.players_started += member_count as u64;
            }
            _ => {
                info!(
                    "Competition aborted - id: {}, players: {}, min_players: {}",
                    competition_id, member_count, self.config.min_player_count
                );
                self.stats.competitions_aborted += 1;
                self.stats.players_aborted += member_count as u64;
            }
        }

        let notification = Notification::new(competition_id, outcome);
        for player in open.competition.members() {
            // Dropping the pending entry closes the player's stream
            match self.pending_players.remove(&player.id) {
                Some(pending) => {
                    if !pending.outbox.deliver(notification) {
                        warn!(
                            "Player stream has no reader - player: {}, competition_id: {}, state: {}",
                            player.id, competition_id, outcome
                        );
                        self.metrics_collector.record_notification_dropped();
                    }
                }
                None => warn!(
                    "Member not pending at resolution - player: {}, competition_id: {}",
                    player.id, competition_id
                ),
            }
        }

        self.metrics_collector
            .record_competition_resolved(outcome, path, member_count);
    }

    fn notify_player(&self, player_id: &str, notification: Notification) {
        let delivered = self
            .pending_players
            .get(player_id)
            .map(|pending| pending.outbox.deliver(notification))
            .unwrap_or(false);

        if !delivered {
            debug!(
                "Notification not delivered - player: {}, competition_id: {}, state: {}",
                player_id, notification.competition_id, notification.state
            );
            self.metrics_collector.record_notification_dropped();
        }
    }

    /// Disarm every clock and close every pending stream
    fn close(&mut self) {
        for open in self.open_competitions.values_mut() {
            open.clock.cancel();
        }

        if !self.open_competitions.is_empty() || !self.pending_players.is_empty() {
            info!(
                "Closing unresolved matchmaking state - open_competitions: {}, pending_players: {}",
                self.open_competitions.len(),
                self.pending_players.len()
            );
        }

        self.open_competitions.clear();
        self.pending_players.clear();
        self.metrics_collector.update_from_stats(&self.snapshot());
    }
}
