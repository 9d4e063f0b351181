//! Common types used throughout the matchmaking service

use crate::competition::LevelRange;
use serde::{Deserialize, Serialize};

/// Caller-supplied player identifier
pub type PlayerId = String;

/// Monotonically increasing competition identifier, starting at 1
pub type CompetitionId = u64;

/// Player skill level
pub type Level = i64;

/// Player taking part in matchmaking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub level: Level,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, level: Level) -> Self {
        Self {
            id: id.into(),
            level,
        }
    }
}

/// State of a competition as reported to its players
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionState {
    /// Competition is open and accepting new players
    WaitingForPlayers,
    /// Competition has started (terminal)
    Started,
    /// Competition timed out below the minimum size (terminal)
    Aborted,
}

impl CompetitionState {
    /// Whether no further notifications follow this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, CompetitionState::Started | CompetitionState::Aborted)
    }
}

impl std::fmt::Display for CompetitionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompetitionState::WaitingForPlayers => write!(f, "waiting_for_players"),
            CompetitionState::Started => write!(f, "started"),
            CompetitionState::Aborted => write!(f, "aborted"),
        }
    }
}

/// Notification delivered to a player about the competition it is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub competition_id: CompetitionId,
    pub state: CompetitionState,
}

impl Notification {
    pub fn new(competition_id: CompetitionId, state: CompetitionState) -> Self {
        Self {
            competition_id,
            state,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Wire message: request to join matchmaking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub id: PlayerId,
    pub level: Level,
}

impl From<JoinRequest> for Player {
    fn from(request: JoinRequest) -> Self {
        Self {
            id: request.id,
            level: request.level,
        }
    }
}

impl From<&Player> for JoinRequest {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id.clone(),
            level: player.level,
        }
    }
}

/// Snapshot of one open competition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitionSummary {
    pub id: CompetitionId,
    pub level_range: LevelRange,
    pub member_ids: Vec<PlayerId>,
    pub age_ms: i64,
}

/// Statistics about coordinator operations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchmakingStats {
    /// Current number of open competitions
    pub open_competitions: usize,
    /// Current number of players waiting for their competition to resolve
    pub pending_players: usize,
    /// Total number of join events processed
    pub joins_processed: u64,
    /// Total number of joins for an already pending player
    pub duplicate_joins: u64,
    /// Total number of competitions created
    pub competitions_created: u64,
    /// Total number of competitions started
    pub competitions_started: u64,
    /// Total number of competitions aborted
    pub competitions_aborted: u64,
    /// Total number of players notified of a started competition
    pub players_started: u64,
    /// Total number of players notified of an aborted competition
    pub players_aborted: u64,
}
