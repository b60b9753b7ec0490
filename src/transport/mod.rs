//! Transport module
//!
//! Telegram Bot API plumbing: outbound report delivery and inbound
//! update polling.

mod polling;
mod telegram;

use async_trait::async_trait;

pub use polling::{message_from_update, UpdatePoller};
pub use telegram::{Chat, Message, MessageEntity, TelegramClient, TelegramUser, Update};

/// Destination for rendered reports
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Deliver one report to the configured chat
    async fn send_report(&self, text: &str) -> Result<(), TransportError>;
}

/// Origin of inbound updates
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Updates with id `offset` or later, waiting up to `timeout_secs` for one
    async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TransportError>;
}

/// Transport error types
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// HTTP-level failure (connect, timeout, body decode)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The Bot API answered with `ok: false`
    #[error("Telegram API error {code}: {description}")]
    Api { code: i64, description: String },

    /// The Bot API answered `ok: true` without a result
    #[error("Malformed API response: {0}")]
    MalformedResponse(String),
}

impl TransportError {
    /// Check if retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            TransportError::Api { code, .. } => *code == 429 || *code >= 500,
            TransportError::MalformedResponse(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_retryable() {
        let throttled = TransportError::Api {
            code: 429,
            description: "Too Many Requests".to_string(),
        };
        let rejected = TransportError::Api {
            code: 400,
            description: "Bad Request".to_string(),
        };

        assert!(throttled.is_retryable());
        assert!(!rejected.is_retryable());
        assert!(rejected.to_string().contains("Bad Request"));
    }
}
