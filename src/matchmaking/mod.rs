//! Matchmaking coordination engine
//!
//! A single coordinator task owns every open competition and every pending
//! player. Callers reach it through the [`Matchmaker`] gateway, timeout
//! clocks feed it timeout events, and each admitted player observes its
//! competition through a [`NotificationStream`].

pub mod coordinator;
pub mod events;
pub mod gateway;
pub mod notification;
pub mod timeout;

// Re-export commonly used types
pub use coordinator::MatchmakingCoordinator;
pub use events::MatchmakingEvent;
pub use gateway::{JoinHandler, Matchmaker};
pub use notification::{notification_channel, NotificationOutbox, NotificationStream};
pub use timeout::TimeoutClock;
