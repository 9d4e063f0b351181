//! Level Matchmaker - competition matchmaking microservice
//!
//! This crate groups players arriving over TCP into bounded-size competitions
//! by level window, starting each competition when it fills up or, once its
//! timeout elapses, when it has reached the minimum size.

pub mod client;
pub mod competition;
pub mod config;
pub mod error;
pub mod matchmaking;
pub mod metrics;
pub mod server;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{MatchmakingError, Result};
pub use types::*;

// Re-export key components
pub use competition::{Competition, LevelRange};
pub use matchmaking::{Matchmaker, NotificationStream};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
