//! Runtime configuration of the matchmaking coordinator

use crate::error::{MatchmakingError, Result};
use std::time::Duration;

/// Rules the coordinator applies to every competition
#[derive(Debug, Clone)]
pub struct MatchmakingConfig {
    /// Competition starts immediately once it holds this many players
    pub max_player_count: usize,
    /// Competition starts on timeout only with at least this many players
    pub min_player_count: usize,
    /// Half-width of the level window around the founding player's level
    pub level_matching_tolerance: u32,
    /// Time a competition may wait for players before it is resolved
    pub matchmaking_timeout: Duration,
    /// Capacity of the coordinator's inbound event queue
    pub event_queue_capacity: usize,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            max_player_count: 10,
            min_player_count: 2,
            level_matching_tolerance: 3,
            matchmaking_timeout: Duration::from_secs(20),
            event_queue_capacity: 1024,
        }
    }
}

impl MatchmakingConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_player_count == 0 {
            return Err(MatchmakingError::ConfigurationError {
                message: "Max player count must be greater than 0".to_string(),
            }
            .into());
        }

        if self.min_player_count == 0 {
            return Err(MatchmakingError::ConfigurationError {
                message: "Min player count must be greater than 0".to_string(),
            }
            .into());
        }

        if self.min_player_count > self.max_player_count {
            return Err(MatchmakingError::ConfigurationError {
                message: format!(
                    "Min player count ({}) cannot exceed max player count ({})",
                    self.min_player_count, self.max_player_count
                ),
            }
            .into());
        }

        if self.matchmaking_timeout.is_zero() {
            return Err(MatchmakingError::ConfigurationError {
                message: "Matchmaking timeout must be greater than 0".to_string(),
            }
            .into());
        }

        if self.event_queue_capacity == 0 {
            return Err(MatchmakingError::ConfigurationError {
                message: "Event queue capacity must be greater than 0".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
