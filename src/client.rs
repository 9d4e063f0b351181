//! TCP client for the matchmaking service
//!
//! Used by the `join-tester` binary and the transport integration tests.

use crate::error::{MatchmakingError, Result};
use crate::server::codec::{decode_notification, encode_join, FAREWELL};
use crate::types::{JoinRequest, Notification};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

/// What the server sent on one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerLine {
    Notification(Notification),
    Farewell,
}

/// One player connection to the matchmaking service
pub struct MatchmakingClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl MatchmakingClient {
    /// Connect to `addr`
    pub async fn connect(addr: &str) -> Result<Self> {
        let socket =
            TcpStream::connect(addr)
                .await
                .map_err(|e| MatchmakingError::ConnectionFailed {
                    message: format!("Failed to connect to {}: {}", addr, e),
                })?;
        let (reader, writer) = socket.into_split();

        Ok(Self {
            lines: BufReader::new(reader).lines(),
            writer,
        })
    }

    /// Send a join request
    pub async fn join(&mut self, id: &str, level: i64) -> Result<()> {
        let line = encode_join(&JoinRequest {
            id: id.to_string(),
            level,
        })?;
        debug!("Sending join - player: {}, level: {}", id, level);
        self.send_raw(&line).await
    }

    /// Send an arbitrary line; a newline is appended when missing
    pub async fn send_raw(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        if !line.ends_with('\n') {
            self.writer.write_all(b"\n").await?;
        }
        self.writer.flush().await?;
        Ok(())
    }

    /// Read the next server line; `None` once the server closed the connection
    pub async fn next_line(&mut self) -> Result<Option<ServerLine>> {
        let Some(line) = self.lines.next_line().await? else {
            return Ok(None);
        };

        if line == FAREWELL.trim_end() {
            return Ok(Some(ServerLine::Farewell));
        }
        Ok(Some(ServerLine::Notification(decode_notification(&line)?)))
    }

    /// Read the next notification, failing on farewell or disconnect
    pub async fn next_notification(&mut self) -> Result<Notification> {
        match self.next_line().await? {
            Some(ServerLine::Notification(notification)) => Ok(notification),
            Some(ServerLine::Farewell) => Err(MatchmakingError::ConnectionFailed {
                message: "Server rejected the request".to_string(),
            }
            .into()),
            None => Err(MatchmakingError::ConnectionFailed {
                message: "Server closed the connection".to_string(),
            }
            .into()),
        }
    }

    /// Join and collect notifications up to and including the terminal one
    pub async fn join_and_wait(&mut self, id: &str, level: i64) -> Result<Vec<Notification>> {
        self.join(id, level).await?;

        let mut notifications = Vec::new();
        loop {
            let notification = self.next_notification().await?;
            notifications.push(notification);
            if notification.is_terminal() {
                return Ok(notifications);
            }
        }
    }
}
