//! Command definitions
//!
//! Inbound events, the commands derived from them and operation results.

use serde::{Deserialize, Serialize};

use crate::domain::{contains_marker, count_markers, UserId, Window};

// =========================================================================
// Inbound message
// =========================================================================

/// A text message from the monitored group, already stripped of transport details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub user_id: UserId,
    pub display_name: String,
    pub text: String,
}

impl IncomingMessage {
    pub fn new(
        user_id: impl Into<UserId>,
        display_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            text: text.into(),
        }
    }
}

// =========================================================================
// IncrementCommand
// =========================================================================

/// Command to add marker occurrences to a user's daily and weekly tallies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementCommand {
    pub user_id: UserId,
    pub display_name: String,
    pub amount: u64,
}

impl IncrementCommand {
    pub fn new(user_id: impl Into<UserId>, display_name: impl Into<String>, amount: u64) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            amount,
        }
    }

    /// Build the command for a message, or `None` when it has no marker
    pub fn from_message(message: &IncomingMessage) -> Option<Self> {
        if !contains_marker(&message.text) {
            return None;
        }

        Some(Self::new(
            message.user_id.clone(),
            message.display_name.clone(),
            count_markers(&message.text),
        ))
    }
}

/// Counts after a successful increment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementResult {
    pub daily_count: u64,
    pub weekly_count: u64,
}

// =========================================================================
// Rollover
// =========================================================================

/// Result of closing a window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloverOutcome {
    pub window: Window,
    /// Rendered report text
    pub report: String,
    /// Sum of all counts in the reported window
    pub total: u64,
    /// Number of users in the reported window
    pub participants: usize,
    /// Whether the transport accepted the report
    pub delivered: bool,
    /// Whether the counters were cleared
    pub reset: bool,
    /// Delivery failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_from_message_counts_all_markers() {
        let message = IncomingMessage::new("U1", "Alice", "+++ nice");
        let cmd = IncrementCommand::from_message(&message).unwrap();

        assert_eq!(cmd, IncrementCommand::new("U1", "Alice", 3));
    }

    #[test]
    fn test_message_without_marker_is_ignored() {
        let message = IncomingMessage::new("U1", "Alice", "hello there");
        assert!(IncrementCommand::from_message(&message).is_none());
    }
}
