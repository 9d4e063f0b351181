//! Events consumed by the matchmaking coordinator

use crate::matchmaking::notification::NotificationStream;
use crate::types::{CompetitionId, CompetitionSummary, MatchmakingStats, Player};
use tokio::sync::oneshot;

/// Everything the coordinator reacts to, applied strictly in dequeue order
#[derive(Debug)]
pub enum MatchmakingEvent {
    /// A player asks to be placed in a competition
    PlayerJoin {
        player: Player,
        reply: oneshot::Sender<NotificationStream>,
    },
    /// A competition's timeout clock elapsed
    CompetitionTimeout { competition_id: CompetitionId },
    /// Request current counters
    Snapshot {
        reply: oneshot::Sender<MatchmakingStats>,
    },
    /// Request a summary of every open competition
    ListCompetitions {
        reply: oneshot::Sender<Vec<CompetitionSummary>>,
    },
    /// Stop the coordinator
    Shutdown,
}

impl MatchmakingEvent {
    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            MatchmakingEvent::PlayerJoin { .. } => "player_join",
            MatchmakingEvent::CompetitionTimeout { .. } => "competition_timeout",
            MatchmakingEvent::Snapshot { .. } => "snapshot",
            MatchmakingEvent::ListCompetitions { .. } => "list_competitions",
            MatchmakingEvent::Shutdown => "shutdown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind() {
        let (reply, _rx) = oneshot::channel();
        let join = MatchmakingEvent::PlayerJoin {
            player: Player::new("p1", 5),
            reply,
        };
        assert_eq!(join.kind(), "player_join");
        assert_eq!(
            MatchmakingEvent::CompetitionTimeout { competition_id: 1 }.kind(),
            "competition_timeout"
        );
        assert_eq!(MatchmakingEvent::Shutdown.kind(), "shutdown");
    }
}
