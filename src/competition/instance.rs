//! Competition instance and its bookkeeping
//!
//! Validation (capacity, level window, duplicate membership) is the
//! coordinator's job; the instance stores what it is given.

use crate::competition::range::LevelRange;
use crate::types::{CompetitionId, CompetitionSummary, Player, PlayerId};
use crate::utils::{current_timestamp, millis_since};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::info;

/// A group of players being assembled for a shared match
#[derive(Debug, Clone)]
pub struct Competition {
    id: CompetitionId,
    level_range: LevelRange,
    /// Keyed by player ID; re-adding an ID replaces the previous entry
    players: BTreeMap<PlayerId, Player>,
    created_at: DateTime<Utc>,
    started: bool,
}

impl Competition {
    /// Create an empty competition
    pub fn new(id: CompetitionId, level_range: LevelRange) -> Self {
        Self {
            id,
            level_range,
            players: BTreeMap::new(),
            created_at: current_timestamp(),
            started: false,
        }
    }

    /// Admit a player
    pub fn add_player(&mut self, player: Player) {
        self.players.insert(player.id.clone(), player);
    }

    /// Check if a player's level is within this competition's window
    pub fn is_level_matching(&self, player: &Player) -> bool {
        self.level_range.contains(player.level)
    }

    pub fn member_count(&self) -> usize {
        self.players.len()
    }

    /// Admitted players, ordered by player ID
    pub fn members(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn has_member(&self, player_id: &str) -> bool {
        self.players.contains_key(player_id)
    }

    pub fn id(&self) -> CompetitionId {
        self.id
    }

    pub fn level_range(&self) -> LevelRange {
        self.level_range
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Mark the competition as started
    pub fn begin(&mut self) {
        self.started = true;
        info!(
            "Competition {} started - players: {:?}, level_range: {}, waited: {}ms",
            self.id,
            self.players.keys().collect::<Vec<_>>(),
            self.level_range,
            millis_since(self.created_at)
        );
    }

    pub fn summary(&self) -> CompetitionSummary {
        CompetitionSummary {
            id: self.id,
            level_range: self.level_range,
            member_ids: self.players.keys().cloned().collect(),
            age_ms: millis_since(self.created_at),
        }
    }
}
