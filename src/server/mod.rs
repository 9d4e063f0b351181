//! Player-facing transport
//!
//! Players connect over TCP and exchange newline-delimited JSON with the
//! matchmaking coordinator.

pub mod codec;
pub mod tcp;

pub use codec::{
    decode_join, decode_join_line, encode_notification, FAREWELL, MAX_LINE_LENGTH,
};
pub use tcp::MatchmakingTcpServer;
