//! One-shot cancellable competition timeout clock

use crate::matchmaking::events::MatchmakingEvent;
use crate::types::CompetitionId;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::sleep;
use tracing::debug;

/// Timer armed for one open competition
///
/// Emits exactly one `CompetitionTimeout` unless cancelled first. Dropping
/// the clock cancels it as well. The clock only holds a weak handle to the
/// event queue, so an armed clock never keeps the queue open.
#[derive(Debug)]
pub struct TimeoutClock {
    competition_id: CompetitionId,
    cancel: Option<oneshot::Sender<()>>,
}

impl TimeoutClock {
    /// Start the timer task
    pub fn arm(
        competition_id: CompetitionId,
        duration: Duration,
        events: mpsc::WeakSender<MatchmakingEvent>,
    ) -> Self {
        let (cancel_tx, cancel_rx) = oneshot::channel();

        tokio::spawn(async move {
            tokio::select! {
                _ = sleep(duration) => {
                    let event = MatchmakingEvent::CompetitionTimeout { competition_id };
                    let delivered = match events.upgrade() {
                        Some(events) => events.send(event).await.is_ok(),
                        None => false,
                    };
                    if !delivered {
                        debug!(
                            "Coordinator gone before timeout delivery - competition_id: {}",
                            competition_id
                        );
                    }
                }
                _ = cancel_rx => {
                    debug!("Timeout clock cancelled - competition_id: {}", competition_id);
                }
            }
        });

        Self {
            competition_id,
            cancel: Some(cancel_tx),
        }
    }

    /// A clock that never fires, for when no event sender is available
    pub fn disarmed(competition_id: CompetitionId) -> Self {
        Self {
            competition_id,
            cancel: None,
        }
    }

    /// Cancel the timer; returns `false` if it was already cancelled
    pub fn cancel(&mut self) -> bool {
        match self.cancel.take() {
            Some(cancel) => {
                // The task may have fired already
                let _ = cancel.send(());
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.cancel.is_some()
    }

    pub fn competition_id(&self) -> CompetitionId {
        self.competition_id
    }
}
