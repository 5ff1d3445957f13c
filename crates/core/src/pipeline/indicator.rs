//! Animated loading indicator on the status message.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, Duration, MissedTickBehavior};

use crate::delivery::{DeliveryError, Messenger, StatusMessage};

const PROGRESS_BAR_LENGTH: usize = 10;
const PROGRESS_FILLED_CHAR: char = '█';
const PROGRESS_EMPTY_CHAR: char = '░';

/// Owned handle to the animation task editing a status message.
///
/// The task appends a cycling progress bar to the current base text every
/// interval. Changing the base text re-renders immediately, so a phase
/// switch shows up without waiting out the tick. Dropping the handle
/// without calling [`stop`](Self::stop) ends the animation on its next
/// wakeup.
pub struct LoadingIndicator {
    stop_tx: watch::Sender<bool>,
    text_tx: watch::Sender<String>,
    handle: JoinHandle<()>,
    stop_timeout: Duration,
}

impl LoadingIndicator {
    /// Spawns the animation task for a status message.
    pub fn start(
        messenger: Arc<dyn Messenger>,
        status: StatusMessage,
        base_text: String,
        tick_interval: Duration,
        stop_timeout: Duration,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (text_tx, text_rx) = watch::channel(base_text);

        let handle = tokio::spawn(animate(
            messenger,
            status,
            tick_interval,
            stop_rx,
            text_rx,
        ));

        Self {
            stop_tx,
            text_tx,
            handle,
            stop_timeout,
        }
    }

    /// Switches the base text shown above the progress bar.
    pub fn set_text(&self, text: impl Into<String>) {
        let _ = self.text_tx.send(text.into());
    }

    /// Signals the task to stop and waits for it within the configured
    /// bound, force-cancelling if it does not come back in time.
    pub async fn stop(mut self) {
        let _ = self.stop_tx.send(true);
        if timeout(self.stop_timeout, &mut self.handle).await.is_err() {
            tracing::debug!("loading indicator did not stop in time, aborting");
            self.handle.abort();
        }
    }
}

async fn animate(
    messenger: Arc<dyn Messenger>,
    status: StatusMessage,
    tick_interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
    mut text_rx: watch::Receiver<String>,
) {
    let mut ticker = interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut step: usize = 0;
    let mut last_sent = String::new();

    loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            changed = text_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                // Restart the bar when the phase switches.
                step = 0;
            }
            _ = ticker.tick() => {}
        }

        let base_text = text_rx.borrow().clone();
        let filled = step % (PROGRESS_BAR_LENGTH + 1);
        let bar: String = std::iter::repeat(PROGRESS_FILLED_CHAR)
            .take(filled)
            .chain(std::iter::repeat(PROGRESS_EMPTY_CHAR).take(PROGRESS_BAR_LENGTH - filled))
            .collect();
        let text = format!("{base_text} <code>[{bar}]</code>");
        step += 1;

        if text == last_sent {
            continue;
        }

        match messenger.edit_status(&status, &text).await {
            Ok(()) => last_sent = text,
            Err(DeliveryError::EditTargetLost) => {
                tracing::debug!("status message gone, stopping animation");
                break;
            }
            Err(DeliveryError::PermissionDenied) => {
                tracing::debug!("cannot edit status message, stopping animation");
                break;
            }
            Err(e) => {
                tracing::debug!(error = %e, "status edit failed, animation continues");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockMessenger;

    #[tokio::test]
    async fn test_indicator_edits_and_stops() {
        let messenger = Arc::new(MockMessenger::new());
        let status = StatusMessage {
            chat_id: 1,
            message_id: 10,
        };

        let indicator = LoadingIndicator::start(
            messenger.clone(),
            status,
            "Processing link...".to_string(),
            Duration::from_millis(10),
            Duration::from_millis(500),
        );

        tokio::time::sleep(Duration::from_millis(60)).await;
        indicator.stop().await;

        let edits = messenger.edits().await;
        assert!(edits.len() >= 2);
        assert!(edits[0].text.starts_with("Processing link... <code>["));

        // No edits after stop.
        let count = messenger.edits().await.len();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(messenger.edits().await.len(), count);
    }

    #[tokio::test]
    async fn test_set_text_rerenders_immediately() {
        let messenger = Arc::new(MockMessenger::new());
        let status = StatusMessage {
            chat_id: 1,
            message_id: 10,
        };

        let indicator = LoadingIndicator::start(
            messenger.clone(),
            status,
            "Processing link...".to_string(),
            Duration::from_secs(60),
            Duration::from_millis(500),
        );

        // First render happens on the immediate initial tick.
        tokio::time::sleep(Duration::from_millis(30)).await;
        indicator.set_text("Sending media...");
        tokio::time::sleep(Duration::from_millis(30)).await;
        indicator.stop().await;

        let edits = messenger.edits().await;
        assert!(edits
            .iter()
            .any(|e| e.text.starts_with("Sending media... <code>[")));
    }

    #[tokio::test]
    async fn test_stops_when_edit_target_lost() {
        let messenger = Arc::new(MockMessenger::new());
        messenger.fail_edits_with_lost_target().await;
        let status = StatusMessage {
            chat_id: 1,
            message_id: 10,
        };

        let indicator = LoadingIndicator::start(
            messenger.clone(),
            status,
            "Processing link...".to_string(),
            Duration::from_millis(10),
            Duration::from_millis(500),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        indicator.stop().await;

        // One attempt, then the task bailed.
        assert_eq!(messenger.edits().await.len(), 0);
        assert_eq!(messenger.edit_attempts().await, 1);
    }
}
