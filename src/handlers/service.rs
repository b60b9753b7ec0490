//! Counter Service
//!
//! Applies increments and closes windows against the counter store.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::{total, AggregateState, Window};
use crate::error::AppResult;
use crate::report::render_report;
use crate::store::CounterStore;
use crate::transport::ReportSink;

use super::{IncomingMessage, IncrementCommand, IncrementResult, RolloverOutcome};

/// What happens to the counters when a report could not be delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetPolicy {
    /// Clear the window regardless of delivery; a failed report is lost
    #[default]
    Always,
    /// Keep the window so the next trigger reports the accumulated totals
    OnSuccess,
}

impl ResetPolicy {
    pub fn from_defer_flag(defer_reset_on_send_failure: bool) -> Self {
        if defer_reset_on_send_failure {
            Self::OnSuccess
        } else {
            Self::Always
        }
    }

    fn should_reset(&self, delivered: bool) -> bool {
        match self {
            ResetPolicy::Always => true,
            ResetPolicy::OnSuccess => delivered,
        }
    }
}

/// Serializing front door to the counter store.
///
/// Cloning is cheap; clones share the store and the lock.
#[derive(Clone)]
pub struct CounterService {
    store: Arc<dyn CounterStore>,
    lock: Arc<Mutex<()>>,
    reset_policy: ResetPolicy,
}

impl CounterService {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self {
            store,
            lock: Arc::new(Mutex::new(())),
            reset_policy: ResetPolicy::default(),
        }
    }

    pub fn with_reset_policy(mut self, reset_policy: ResetPolicy) -> Self {
        self.reset_policy = reset_policy;
        self
    }

    // =========================================================================
    // Increment
    // =========================================================================

    /// Add the command's amount to the user's daily and weekly tallies.
    ///
    /// Both windows are mutated in memory and persisted with a single save.
    /// A snapshot that cannot be read aborts the increment before any write.
    pub async fn apply_increment(&self, command: IncrementCommand) -> AppResult<IncrementResult> {
        let _guard = self.lock.lock().await;

        let mut state = self.store.load().await?;
        state.record(&command.user_id, &command.display_name, command.amount);
        self.store.save(&state).await?;

        let result = IncrementResult {
            daily_count: state.daily.get(&command.user_id).map_or(0, |t| t.count),
            weekly_count: state.weekly.get(&command.user_id).map_or(0, |t| t.count),
        };

        tracing::info!(
            user_id = %command.user_id,
            user_name = %command.display_name,
            amount = command.amount,
            daily_count = result.daily_count,
            weekly_count = result.weekly_count,
            "Plus counted"
        );

        Ok(result)
    }

    /// Count the markers in an inbound message.
    ///
    /// Returns `None` without touching the store when the text has no marker.
    pub async fn handle_message(
        &self,
        message: &IncomingMessage,
    ) -> AppResult<Option<IncrementResult>> {
        match IncrementCommand::from_message(message) {
            Some(command) => self.apply_increment(command).await.map(Some),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Rollover
    // =========================================================================

    /// Render the report for `window`, hand it to `sink` and clear the window.
    ///
    /// A weekly rollover clears both windows. Delivery failures are recorded in
    /// the outcome; whether the counters survive one depends on the reset policy.
    /// The lock is held for the whole cycle so no increment lands between the
    /// snapshot and the reset.
    pub async fn rollover(
        &self,
        window: Window,
        sink: &dyn ReportSink,
    ) -> AppResult<RolloverOutcome> {
        let _guard = self.lock.lock().await;

        let mut state = self.store.load().await?;
        let tallies = state.window(window);
        let report = render_report(tallies, window);
        let report_total = total(tallies);
        let participants = tallies.len();

        let send_error = match sink.send_report(&report).await {
            Ok(()) => {
                tracing::info!(
                    window = %window,
                    participants = participants,
                    total = report_total,
                    "Report sent"
                );
                None
            }
            Err(e) => {
                tracing::error!(window = %window, error = %e, "Failed to send report");
                Some(e.to_string())
            }
        };
        let delivered = send_error.is_none();

        let reset = self.reset_policy.should_reset(delivered);
        if reset {
            state.reset(window);
            self.store.save(&state).await?;
            tracing::info!(window = %window, "Counters reset");
        } else {
            tracing::warn!(window = %window, "Report not delivered, keeping counters");
        }

        Ok(RolloverOutcome {
            window,
            report,
            total: report_total,
            participants,
            delivered,
            reset,
            send_error,
        })
    }

    /// Current state, read under the lock
    pub async fn snapshot(&self) -> AppResult<AggregateState> {
        let _guard = self.lock.lock().await;
        Ok(self.store.load().await?)
    }
}
