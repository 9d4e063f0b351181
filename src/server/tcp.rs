//! TCP transport
//!
//! Each connection is served by its own task. A connection reads one join
//! line, forwards that player's notifications until the stream closes, then
//! reads the next line.

use crate::error::{MatchmakingError, Result};
use crate::matchmaking::{JoinHandler, NotificationStream};
use crate::metrics::MetricsCollector;
use crate::server::codec::{decode_join_line, encode_notification, FAREWELL, MAX_LINE_LENGTH};
use crate::utils::generate_connection_id;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Line-JSON TCP server in front of a [`JoinHandler`]
pub struct MatchmakingTcpServer {
    listener: TcpListener,
    handler: Arc<dyn JoinHandler>,
    metrics_collector: Arc<MetricsCollector>,
}

impl MatchmakingTcpServer {
    /// Bind the listener
    pub async fn bind(
        addr: &str,
        handler: Arc<dyn JoinHandler>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Result<Self> {
        let listener =
            TcpListener::bind(addr)
                .await
                .map_err(|e| MatchmakingError::ConnectionFailed {
                    message: format!("Failed to bind {}: {}", addr, e),
                })?;

        info!("Matchmaking TCP server listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            handler,
            metrics_collector,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` fires
    pub async fn serve(self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((socket, peer)) => {
                            let connection = Connection {
                                id: generate_connection_id(),
                                peer,
                                handler: self.handler.clone(),
                                metrics_collector: self.metrics_collector.clone(),
                            };
                            let shutdown = shutdown.resubscribe();
                            tokio::spawn(connection.run(socket, shutdown));
                        }
                        Err(e) => {
                            warn!("Failed to accept connection: {}", e);
                            self.metrics_collector.record_connection_error("accept");
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!("TCP server shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// State of one accepted connection
struct Connection {
    id: Uuid,
    peer: SocketAddr,
    handler: Arc<dyn JoinHandler>,
    metrics_collector: Arc<MetricsCollector>,
}

impl Connection {
    async fn run(self, socket: TcpStream, mut shutdown: broadcast::Receiver<()>) {
        self.metrics_collector.record_connection_opened();
        info!("Connection opened - id: {}, peer: {}", self.id, self.peer);

        let (reader, mut writer) = socket.into_split();
        let mut reader = BufReader::new(reader);
        let mut buffer = Vec::with_capacity(256);

        loop {
            let read = tokio::select! {
                read = read_line(&mut reader, &mut buffer) => read,
                _ = shutdown.recv() => {
                    debug!("Closing connection for shutdown - id: {}", self.id);
                    break;
                }
            };

            match read {
                Ok(0) => {
                    debug!("Connection closed by peer - id: {}", self.id);
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Read failed - id: {}, error: {}", self.id, e);
                    self.metrics_collector.record_connection_error("io");
                    break;
                }
            }

            let player = match decode_join_line(&buffer) {
                Ok(player) => player,
                Err(e) => {
                    warn!("Malformed request - id: {}, error: {}", self.id, e);
                    self.metrics_collector.record_connection_error("malformed");
                    if let Err(e) = writer.write_all(FAREWELL.as_bytes()).await {
                        debug!("Failed to write farewell - id: {}, error: {}", self.id, e);
                    }
                    break;
                }
            };

            debug!(
                "Join received - id: {}, player: {}, level: {}",
                self.id, player.id, player.level
            );

            let stream = match self.handler.handle_join(player).await {
                Ok(stream) => stream,
                Err(e) => {
                    error!("Join rejected - id: {}, error: {}", self.id, e);
                    self.metrics_collector.record_connection_error("unavailable");
                    break;
                }
            };

            if let Err(e) = forward_notifications(&stream, &mut writer).await {
                warn!("Write failed - id: {}, error: {}", self.id, e);
                self.metrics_collector.record_connection_error("io");
                break;
            }
        }

        if let Err(e) = writer.shutdown().await {
            debug!("Socket shutdown failed - id: {}, error: {}", self.id, e);
        }
        self.metrics_collector.record_connection_closed();
        info!("Connection closed - id: {}, peer: {}", self.id, self.peer);
    }
}

/// Read raw bytes up to and including the next `\n` into `buffer`
///
/// At most [`MAX_LINE_LENGTH`] bytes are read; returns 0 at end of input.
async fn read_line<R>(reader: &mut R, buffer: &mut Vec<u8>) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    buffer.clear();
    (&mut *reader)
        .take(MAX_LINE_LENGTH as u64)
        .read_until(b'\n', buffer)
        .await
}

/// Write every notification of `stream` until it closes
async fn forward_notifications<W>(stream: &NotificationStream, writer: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(notification) = stream.recv().await {
        let line = encode_notification(&notification)?;
        writer.write_all(line.as_bytes()).await?;
    }
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchmaking::notification_channel;
    use crate::types::{CompetitionState, Notification};

    #[tokio::test]
    async fn test_read_line_is_bounded_and_keeps_raw_bytes() {
        let mut input: Vec<u8> = b"{\"id\": \"\xff\", \"level\": 3}\n".to_vec();
        input.extend(std::iter::repeat(b'x').take(MAX_LINE_LENGTH + 10));
        let mut reader = &input[..];
        let mut buffer = Vec::new();

        // Invalid UTF-8 is returned as-is for the decoder to reject
        let read = read_line(&mut reader, &mut buffer).await.unwrap();
        assert_eq!(read, buffer.len());
        assert_eq!(buffer.last(), Some(&b'\n'));
        assert!(decode_join_line(&buffer).is_err());

        // A runaway line stops at the cap without a terminator
        let read = read_line(&mut reader, &mut buffer).await.unwrap();
        assert_eq!(read, MAX_LINE_LENGTH);
        assert!(decode_join_line(&buffer).is_err());

        // Unterminated tail before end of input
        let read = read_line(&mut reader, &mut buffer).await.unwrap();
        assert_eq!(read, 10);
        assert!(decode_join_line(&buffer).is_err());

        assert_eq!(read_line(&mut reader, &mut buffer).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_forward_notifications_until_close() {
        let (outbox, stream) = notification_channel();
        outbox.deliver(Notification::new(1, CompetitionState::WaitingForPlayers));
        outbox.deliver(Notification::new(1, CompetitionState::Started));
        drop(outbox);

        let mut buffer: Vec<u8> = Vec::new();
        forward_notifications(&stream, &mut buffer).await.unwrap();

        let written = String::from_utf8(buffer).unwrap();
        assert_eq!(
            written,
            "{\"competition_id\":1,\"state\":\"waiting_for_players\"}\n\
             {\"competition_id\":1,\"state\":\"started\"}\n"
        );
    }
}
