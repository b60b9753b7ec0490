//! Update polling
//!
//! Long-polls `getUpdates` and feeds qualifying group messages to the
//! counter service.

use std::sync::Arc;
use std::time::Duration;

use crate::handlers::{CounterService, IncomingMessage};

use super::{TransportError, Update, UpdateSource};

const INITIAL_BACKOFF_SECS: u64 = 5;
const MAX_BACKOFF_SECS: u64 = 60;

/// Extract the counted part of an update.
///
/// Only text messages with a sender, posted in a group or supergroup and not
/// starting with a bot command, are considered.
pub fn message_from_update(update: &Update) -> Option<IncomingMessage> {
    let message = update.message.as_ref()?;
    let text = message.text.as_ref()?;
    let from = message.from.as_ref()?;

    if !message.chat.is_group() || message.is_command() {
        return None;
    }

    Some(IncomingMessage::new(from.id.to_string(), from.full_name(), text.clone()))
}

/// Inbound loop feeding the counter service
pub struct UpdatePoller {
    source: Arc<dyn UpdateSource>,
    service: CounterService,
    timeout_secs: u64,
    offset: i64,
}

impl UpdatePoller {
    pub fn new(source: Arc<dyn UpdateSource>, service: CounterService, timeout_secs: u64) -> Self {
        Self {
            source,
            service,
            timeout_secs,
            offset: 0,
        }
    }

    /// Start polling in the background
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Poll forever, backing off on transport errors
    async fn run(mut self) {
        tracing::info!("Update polling started");
        let mut backoff_secs = INITIAL_BACKOFF_SECS;

        loop {
            match self.poll_once().await {
                Ok(_) => backoff_secs = INITIAL_BACKOFF_SECS,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        retryable = e.is_retryable(),
                        retry_in_secs = backoff_secs,
                        "Failed to fetch updates"
                    );
                    tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                    backoff_secs = (backoff_secs * 2).min(MAX_BACKOFF_SECS);
                }
            }
        }
    }

    /// Fetch and handle one batch, returning how many updates it held
    async fn poll_once(&mut self) -> Result<usize, TransportError> {
        let updates = self.source.get_updates(self.offset, self.timeout_secs).await?;
        self.process(&updates).await;
        Ok(updates.len())
    }

    /// Handle one batch and advance the offset past it.
    ///
    /// Skipped updates are acknowledged too, otherwise the Bot API would
    /// deliver them again on every poll.
    async fn process(&mut self, updates: &[Update]) {
        for update in updates {
            self.offset = self.offset.max(update.update_id + 1);

            let Some(message) = message_from_update(update) else {
                continue;
            };

            if let Err(e) = self.service.handle_message(&message).await {
                tracing::error!(
                    error = %e,
                    update_id = update.update_id,
                    user_id = %message.user_id,
                    "Failed to count message"
                );
            }
        }
    }
}
