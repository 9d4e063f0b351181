//! Competition entity
//!
//! A competition is a bounded group of players with a fixed level window.
//! It has no concurrency of its own: the matchmaking coordinator is the only
//! code that ever touches one.

pub mod instance;
pub mod range;

// Re-export commonly used types
pub use instance::Competition;
pub use range::LevelRange;
