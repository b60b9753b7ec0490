//! Scheduled Jobs
//!
//! Daily and weekly rollover triggers. Each trigger fires at a local
//! wall-clock time; windows missed while the process was down or asleep
//! are skipped.

use chrono::{DateTime, Datelike, Duration as ChronoDuration, Local, NaiveTime, TimeZone, Weekday};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::Config;
use crate::domain::Window;
use crate::error::AppResult;
use crate::handlers::{CounterService, RolloverOutcome};
use crate::transport::ReportSink;

// =========================================================================
// Next fire computation
// =========================================================================

/// Days searched ahead for the next matching local time
const SEARCH_DAYS: i64 = 14;

/// Next instant strictly after `now` at local `time` on a day accepted by `on_day`.
///
/// Local times that do not exist (DST gap) are skipped; ambiguous ones resolve
/// to the earlier instant.
fn next_fire_at<Tz, F>(now: &DateTime<Tz>, time: NaiveTime, on_day: F) -> DateTime<Tz>
where
    Tz: TimeZone,
    F: Fn(Weekday) -> bool,
{
    let tz = now.timezone();
    let today = now.date_naive();

    for offset in 0..SEARCH_DAYS {
        let date = today + ChronoDuration::days(offset);
        if !on_day(date.weekday()) {
            continue;
        }
        if let Some(candidate) = tz.from_local_datetime(&date.and_time(time)).earliest() {
            if candidate > *now {
                return candidate;
            }
        }
    }

    now.clone() + ChronoDuration::days(1)
}

/// Next daily trigger: `hour:00` local, every day
pub fn next_daily_fire<Tz: TimeZone>(now: &DateTime<Tz>, hour: u32) -> DateTime<Tz> {
    let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or_default();
    next_fire_at(now, time, |_| true)
}

/// Next weekly trigger: `hour:minute` local on `weekday`
pub fn next_weekly_fire<Tz: TimeZone>(
    now: &DateTime<Tz>,
    weekday: Weekday,
    hour: u32,
    minute: u32,
) -> DateTime<Tz> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default();
    next_fire_at(now, time, |day| day == weekday)
}

// =========================================================================
// Rollover Scheduler
// =========================================================================

/// Trigger times for the two rollover jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Local hour of the daily report
    pub report_hour: u32,
    /// Day of the weekly report
    pub weekly_day: Weekday,
    /// Weekly trigger runs this many minutes after the daily one, so the
    /// weekly reset of the daily window always comes last
    pub weekly_offset_minutes: u32,
}

impl ScheduleConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            report_hour: config.report_hour,
            weekly_day: config.weekly_report_day,
            weekly_offset_minutes: config.weekly_offset_minutes,
        }
    }

    /// Next trigger of `window` after `now`
    pub fn next_fire<Tz: TimeZone>(&self, window: Window, now: &DateTime<Tz>) -> DateTime<Tz> {
        match window {
            Window::Daily => next_daily_fire(now, self.report_hour),
            Window::Weekly => next_weekly_fire(
                now,
                self.weekly_day,
                self.report_hour,
                self.weekly_offset_minutes,
            ),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            report_hour: 21,
            weekly_day: Weekday::Sun,
            weekly_offset_minutes: 5,
        }
    }
}

/// Late fires beyond this are skipped, never caught up
const FIRE_GRACE_SECS: i64 = 120;

/// Longest single sleep; wall time is re-read after every chunk
const MAX_SLEEP: Duration = Duration::from_secs(60);

/// Source of wall-clock time
pub type Clock<Tz> = Arc<dyn Fn() -> DateTime<Tz> + Send + Sync>;

/// Pending instants of the two triggers
#[derive(Debug, Clone)]
struct Triggers<Tz: TimeZone> {
    daily: DateTime<Tz>,
    weekly: DateTime<Tz>,
}

impl<Tz: TimeZone> Triggers<Tz> {
    fn new(config: &ScheduleConfig, now: &DateTime<Tz>) -> Self {
        Self {
            daily: config.next_fire(Window::Daily, now),
            weekly: config.next_fire(Window::Weekly, now),
        }
    }

    /// Earliest pending trigger; daily wins a tie
    fn earliest(&self) -> (Window, DateTime<Tz>) {
        if self.daily <= self.weekly {
            (Window::Daily, self.daily.clone())
        } else {
            (Window::Weekly, self.weekly.clone())
        }
    }

    /// Move `window` strictly past both its pending instant and `now`.
    ///
    /// A wall clock stepping back never brings a handled instant round again.
    fn advance(&mut self, config: &ScheduleConfig, window: Window, now: &DateTime<Tz>) {
        let slot = match window {
            Window::Daily => &mut self.daily,
            Window::Weekly => &mut self.weekly,
        };
        let base = if *now > *slot { now.clone() } else { slot.clone() };
        *slot = config.next_fire(window, &base);
    }
}

/// Rollover Scheduler - closes the daily and weekly windows on time
pub struct RolloverScheduler<Tz: TimeZone = Local> {
    service: CounterService,
    sink: Arc<dyn ReportSink>,
    config: ScheduleConfig,
    clock: Clock<Tz>,
}

impl RolloverScheduler<Local> {
    /// Create a new scheduler on the system local clock
    pub fn new(service: CounterService, sink: Arc<dyn ReportSink>, config: ScheduleConfig) -> Self {
        Self::with_clock(service, sink, config, Local::now)
    }
}

impl<Tz> RolloverScheduler<Tz>
where
    Tz: TimeZone + Send + Sync + 'static,
    Tz::Offset: Send + Sync + fmt::Display,
{
    /// Create a scheduler reading wall time from `clock`
    pub fn with_clock<F>(
        service: CounterService,
        sink: Arc<dyn ReportSink>,
        config: ScheduleConfig,
        clock: F,
    ) -> Self
    where
        F: Fn() -> DateTime<Tz> + Send + Sync + 'static,
    {
        Self {
            service,
            sink,
            config,
            clock: Arc::new(clock),
        }
    }

    /// Start the scheduler in the background
    /// Returns a handle that can be used to abort the scheduler
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the scheduler loop
    async fn run(&self) {
        let mut triggers = Triggers::new(&self.config, &(self.clock)());

        tracing::info!(
            report_hour = self.config.report_hour,
            weekly_day = ?self.config.weekly_day,
            weekly_offset_minutes = self.config.weekly_offset_minutes,
            next_daily = %triggers.daily,
            next_weekly = %triggers.weekly,
            "Rollover scheduler started"
        );

        loop {
            let now = (self.clock)();
            let (window, due) = triggers.earliest();

            if now < due {
                sleep(until(&now, &due).min(MAX_SLEEP)).await;
                continue;
            }

            let late = now.clone() - due.clone();
            if late > ChronoDuration::seconds(FIRE_GRACE_SECS) {
                tracing::warn!(
                    window = %window,
                    due = %due,
                    late_secs = late.num_seconds(),
                    "Rollover missed, skipping"
                );
            } else {
                self.fire(window).await;
            }

            triggers.advance(&self.config, window, &(self.clock)());
            tracing::debug!(
                next_daily = %triggers.daily,
                next_weekly = %triggers.weekly,
                "Waiting for next rollover"
            );
        }
    }

    async fn fire(&self, window: Window) {
        if let Err(e) = self.run_once(window).await {
            tracing::error!(window = %window, error = %e, "Rollover failed");
        }
    }

    /// Close `window` now (for manual trigger or testing)
    pub async fn run_once(&self, window: Window) -> AppResult<RolloverOutcome> {
        self.service.rollover(window, self.sink.as_ref()).await
    }
}

fn until<Tz: TimeZone>(now: &DateTime<Tz>, at: &DateTime<Tz>) -> Duration {
    (at.clone() - now.clone()).to_std().unwrap_or(Duration::ZERO)
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{FixedOffset, Timelike, Utc};
    use std::sync::Mutex;

    use crate::store::InMemoryStore;
    use crate::transport::TransportError;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn test_next_daily_later_today() {
        let now = utc(2026, 3, 10, 14, 30, 0);
        assert_eq!(next_daily_fire(&now, 21), utc(2026, 3, 10, 21, 0, 0));
    }

    #[test]
    fn test_next_daily_after_hour_is_tomorrow() {
        let now = utc(2026, 3, 10, 21, 0, 1);
        assert_eq!(next_daily_fire(&now, 21), utc(2026, 3, 11, 21, 0, 0));
    }

    #[test]
    fn test_next_daily_at_exact_instant_is_tomorrow() {
        let now = utc(2026, 3, 10, 21, 0, 0);
        assert_eq!(next_daily_fire(&now, 21), utc(2026, 3, 11, 21, 0, 0));
    }

    #[test]
    fn test_next_daily_crosses_month() {
        let now = utc(2026, 1, 31, 23, 0, 0);
        assert_eq!(next_daily_fire(&now, 0), utc(2026, 2, 1, 0, 0, 0));
    }

    #[test]
    fn test_next_weekly_same_day_before_time() {
        // 2026-03-15 is a Sunday
        let now = utc(2026, 3, 15, 21, 0, 0);
        assert_eq!(next_weekly_fire(&now, Weekday::Sun, 21, 5), utc(2026, 3, 15, 21, 5, 0));
    }

    #[test]
    fn test_next_weekly_same_day_after_time() {
        let now = utc(2026, 3, 15, 21, 6, 0);
        assert_eq!(next_weekly_fire(&now, Weekday::Sun, 21, 5), utc(2026, 3, 22, 21, 5, 0));
    }

    #[test]
    fn test_next_weekly_other_day() {
        // Tuesday -> following Sunday
        let now = utc(2026, 3, 10, 9, 0, 0);
        let fire = next_weekly_fire(&now, Weekday::Sun, 21, 5);
        assert_eq!(fire, utc(2026, 3, 15, 21, 5, 0));
        assert_eq!(fire.weekday(), Weekday::Sun);
    }

    #[test]
    fn test_weekly_runs_after_daily_on_report_day() {
        let config = ScheduleConfig::default();
        let now = utc(2026, 3, 15, 12, 0, 0);

        let daily = config.next_fire(Window::Daily, &now);
        let weekly = config.next_fire(Window::Weekly, &now);

        assert!(weekly > daily);
        assert_eq!((weekly - daily).num_minutes(), 5);
    }

    #[test]
    fn test_fixed_offset_local_time() {
        let kyiv = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = kyiv.with_ymd_and_hms(2026, 3, 10, 20, 59, 0).unwrap();

        let fire = next_daily_fire(&now, 21);

        assert_eq!(fire.hour(), 21);
        assert_eq!(fire.minute(), 0);
        assert_eq!(fire.with_timezone(&Utc), utc(2026, 3, 10, 19, 0, 0));
    }

    #[test]
    fn test_schedule_config_default() {
        let config = ScheduleConfig::default();
        assert_eq!(config.report_hour, 21);
        assert_eq!(config.weekly_day, Weekday::Sun);
        assert_eq!(config.weekly_offset_minutes, 5);
    }

    // =========================================================================
    // Trigger bookkeeping
    // =========================================================================

    #[test]
    fn test_triggers_daily_wins_on_report_day() {
        let config = ScheduleConfig::default();
        let triggers = Triggers::new(&config, &utc(2026, 3, 15, 12, 0, 0));

        assert_eq!(triggers.earliest(), (Window::Daily, utc(2026, 3, 15, 21, 0, 0)));
    }

    #[test]
    fn test_triggers_advance_ignores_clock_stepping_back() {
        let config = ScheduleConfig::default();
        let mut triggers = Triggers::new(&config, &utc(2026, 3, 10, 20, 0, 0));

        // Fired at 21:00, then the wall clock jumps back a few seconds
        triggers.advance(&config, Window::Daily, &utc(2026, 3, 10, 20, 59, 58));

        assert_eq!(triggers.daily, utc(2026, 3, 11, 21, 0, 0));
    }

    #[test]
    fn test_triggers_advance_after_long_pause_starts_from_now() {
        let config = ScheduleConfig::default();
        let mut triggers = Triggers::new(&config, &utc(2026, 3, 10, 20, 0, 0));

        triggers.advance(&config, Window::Daily, &utc(2026, 3, 12, 22, 0, 0));

        assert_eq!(triggers.daily, utc(2026, 3, 13, 21, 0, 0));
    }

    // =========================================================================
    // Scheduler loop
    // =========================================================================

    #[derive(Default)]
    struct RecordingSink {
        reports: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        fn reports(&self) -> Vec<String> {
            self.reports.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReportSink for RecordingSink {
        async fn send_report(&self, text: &str) -> Result<(), TransportError> {
            self.reports.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    /// Wall clock moved by hand
    #[derive(Clone)]
    struct ManualClock(Arc<Mutex<DateTime<Utc>>>);

    impl ManualClock {
        fn at(now: DateTime<Utc>) -> Self {
            Self(Arc::new(Mutex::new(now)))
        }

        fn set(&self, now: DateTime<Utc>) {
            *self.0.lock().unwrap() = now;
        }

        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn seeded_service() -> CounterService {
        let store = InMemoryStore::with_snapshot(
            r#"{"daily": {"U1": {"name": "Alice", "count": 3}},
                "weekly": {"U1": {"name": "Alice", "count": 3}}}"#,
        );
        CounterService::new(Arc::new(store))
    }

    fn scheduler_on(
        service: &CounterService,
        sink: &Arc<RecordingSink>,
        clock: &ManualClock,
    ) -> RolloverScheduler<Utc> {
        let clock = clock.clone();
        RolloverScheduler::with_clock(
            service.clone(),
            sink.clone(),
            ScheduleConfig::default(),
            move || clock.now(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_daily_then_weekly_fire_once_on_report_day() {
        let service = seeded_service();
        let sink = Arc::new(RecordingSink::default());

        // Wall time follows the paused tokio clock from Sunday 20:59
        let start = utc(2026, 3, 15, 20, 59, 0);
        let origin = tokio::time::Instant::now();
        let scheduler = RolloverScheduler::with_clock(
            service.clone(),
            sink.clone(),
            ScheduleConfig::default(),
            move || start + ChronoDuration::from_std(origin.elapsed()).unwrap(),
        );
        let handle = scheduler.start();

        sleep(Duration::from_secs(10 * 60)).await;

        let reports = sink.reports();
        assert_eq!(reports.len(), 2);
        assert!(reports[0].contains("▪️ Alice: **3**"));
        assert!(reports[0].ends_with("**Всього за день:** 3"));
        assert!(reports[1].contains("🏆 Alice: **3**"));
        assert!(service.snapshot().await.unwrap().is_empty());

        sleep(Duration::from_secs(30 * 60)).await;
        assert_eq!(sink.reports().len(), 2);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_stepping_back_does_not_fire_twice() {
        let service = seeded_service();
        let sink = Arc::new(RecordingSink::default());
        // Tuesday, no weekly trigger
        let clock = ManualClock::at(utc(2026, 3, 10, 20, 59, 30));
        let handle = scheduler_on(&service, &sink, &clock).start();

        sleep(Duration::from_secs(1)).await;
        clock.set(utc(2026, 3, 10, 21, 0, 1));
        sleep(Duration::from_secs(39)).await;
        assert_eq!(sink.reports().len(), 1);

        // NTP step back to just before the report hour
        clock.set(utc(2026, 3, 10, 20, 59, 59));
        sleep(Duration::from_secs(5 * 60)).await;
        clock.set(utc(2026, 3, 10, 21, 0, 2));
        sleep(Duration::from_secs(5 * 60)).await;

        assert_eq!(sink.reports().len(), 1);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_wake_skips_rollover() {
        let service = seeded_service();
        let sink = Arc::new(RecordingSink::default());
        let clock = ManualClock::at(utc(2026, 3, 10, 20, 59, 30));
        let handle = scheduler_on(&service, &sink, &clock).start();

        sleep(Duration::from_secs(1)).await;
        // Host suspended across the report hour
        clock.set(utc(2026, 3, 10, 23, 30, 0));
        sleep(Duration::from_secs(5 * 60)).await;

        assert!(sink.reports().is_empty());
        assert_eq!(service.snapshot().await.unwrap().daily["U1"].count, 3);
        handle.abort();
    }
}
