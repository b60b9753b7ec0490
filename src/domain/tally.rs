//! Tally types
//!
//! Per-user counters and the aggregate state persisted as one snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stable user identifier (Telegram user id rendered as a decimal string)
pub type UserId = String;

/// Mapping from user to tally for one window
pub type TallyMap = BTreeMap<UserId, UserTally>;

/// A single user's counter inside one window.
///
/// `name` is the latest known display name and is overwritten on every
/// increment. `count` only grows until the owning window is reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTally {
    pub name: String,
    pub count: u64,
}

impl UserTally {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: 0,
        }
    }

    /// Refresh the display name and add `amount` to the counter
    pub fn record(&mut self, name: &str, amount: u64) {
        if self.name != name {
            self.name = name.to_string();
        }
        self.count = self.count.saturating_add(amount);
    }
}

/// Counting period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    Daily,
    Weekly,
}

impl Window {
    pub fn as_str(&self) -> &'static str {
        match self {
            Window::Daily => "daily",
            Window::Weekly => "weekly",
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The complete counter state: two independent windows.
///
/// Both fields default to empty so a snapshot missing either one is still
/// readable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateState {
    #[serde(default)]
    pub daily: TallyMap,

    #[serde(default)]
    pub weekly: TallyMap,
}

impl AggregateState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one increment to both windows.
    ///
    /// Missing entries are created with a zero count before the amount is
    /// added, so a zero amount still registers the user and refreshes the name.
    pub fn record(&mut self, user_id: &str, display_name: &str, amount: u64) {
        for map in [&mut self.daily, &mut self.weekly] {
            map.entry(user_id.to_string())
                .or_insert_with(|| UserTally::new(display_name))
                .record(display_name, amount);
        }
    }

    /// Tallies for a window
    pub fn window(&self, window: Window) -> &TallyMap {
        match window {
            Window::Daily => &self.daily,
            Window::Weekly => &self.weekly,
        }
    }

    /// Clear the tallies a rollover of `window` closes.
    ///
    /// A weekly rollover also closes the daily window.
    pub fn reset(&mut self, window: Window) {
        self.daily.clear();
        if window == Window::Weekly {
            self.weekly.clear();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.daily.is_empty() && self.weekly.is_empty()
    }
}

/// Sum of all counts in a window
pub fn total(tallies: &TallyMap) -> u64 {
    tallies
        .values()
        .fold(0u64, |acc, tally| acc.saturating_add(tally.count))
}
