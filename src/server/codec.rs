//! Line-delimited JSON wire format
//!
//! Inbound: one `{"id": string, "level": integer}` object per line.
//! Outbound: one `{"competition_id": integer, "state": string}` object per
//! line, or the plain-text farewell before the server closes a connection.

use crate::competition::range::MIN_LEVEL;
use crate::error::{MatchmakingError, Result};
use crate::types::{JoinRequest, Notification, Player};

/// Written before closing a connection that sent malformed input
pub const FAREWELL: &str = "closing connection... bye\n";

/// Longest accepted inbound line, terminator included
pub const MAX_LINE_LENGTH: usize = 4096;

/// Validate the framing of one raw inbound line, then decode it
///
/// `raw` is what was read up to and including `\n`. A line cut off by end
/// of input or by [`MAX_LINE_LENGTH`] lacks the terminator and is rejected.
pub fn decode_join_line(raw: &[u8]) -> Result<Player> {
    let body = raw
        .strip_suffix(b"\n")
        .ok_or_else(|| MatchmakingError::InvalidJoinRequest {
            reason: if raw.len() >= MAX_LINE_LENGTH {
                format!("Line exceeds {} bytes", MAX_LINE_LENGTH)
            } else {
                "Line is not newline-terminated".to_string()
            },
        })?;
    let body = body.strip_suffix(b"\r").unwrap_or(body);

    let line = std::str::from_utf8(body).map_err(|e| MatchmakingError::InvalidJoinRequest {
        reason: format!("Invalid UTF-8: {}", e),
    })?;

    decode_join(line)
}

/// Parse and validate one inbound line
pub fn decode_join(line: &str) -> Result<Player> {
    let request: JoinRequest =
        serde_json::from_str(line).map_err(|e| MatchmakingError::InvalidJoinRequest {
            reason: format!("Invalid JSON: {}", e),
        })?;

    if request.id.trim().is_empty() {
        return Err(MatchmakingError::InvalidJoinRequest {
            reason: "Player id cannot be empty".to_string(),
        }
        .into());
    }

    if request.level < MIN_LEVEL {
        return Err(MatchmakingError::InvalidJoinRequest {
            reason: format!("Level must be at least {}, got {}", MIN_LEVEL, request.level),
        }
        .into());
    }

    Ok(request.into())
}

/// Serialize a join request as one line, for clients
pub fn encode_join(request: &JoinRequest) -> Result<String> {
    let mut line = serde_json::to_string(request)?;
    line.push('\n');
    Ok(line)
}

/// Serialize a notification as one line
pub fn encode_notification(notification: &Notification) -> Result<String> {
    let mut line = serde_json::to_string(notification)?;
    line.push('\n');
    Ok(line)
}

/// Parse one outbound line, for clients
pub fn decode_notification(line: &str) -> Result<Notification> {
    Ok(serde_json::from_str(line)?)
}
