//! Level windows accepted by a competition

use crate::types::Level;
use serde::{Deserialize, Serialize};

/// Lowest level a window can start at
pub const MIN_LEVEL: Level = 1;

/// Inclusive range of levels a competition accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRange {
    pub min: Level,
    pub max: Level,
}

impl LevelRange {
    pub fn new(min: Level, max: Level) -> Self {
        Self { min, max }
    }

    /// Window centred on `level` with half-width `tolerance`, floored at [`MIN_LEVEL`]
    pub fn around(level: Level, tolerance: u32) -> Self {
        let tolerance = Level::from(tolerance);
        Self {
            min: level.saturating_sub(tolerance).max(MIN_LEVEL),
            max: level.saturating_add(tolerance),
        }
    }

    pub fn contains(&self, level: Level) -> bool {
        self.min <= level && level <= self.max
    }
}

impl std::fmt::Display for LevelRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}
