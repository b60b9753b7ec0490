//! Report rendering
//!
//! Builds the ranked summary posted to the group when a window closes.
//! Output uses Telegram Markdown (`**bold**`).

use crate::domain::{total, TallyMap, UserTally, Window};

const DAILY_EMPTY: &str = "✨ **Щоденний звіт** ✨\n\nЗа сьогодні ніхто не ставив плюси.";
const DAILY_HEADER: &str = "✨ **Щоденний звіт по плюсах** ✨\n\n";
const DAILY_RANK_MARKER: &str = "▪️";
const DAILY_TOTAL_LABEL: &str = "**Всього за день:**";

const WEEKLY_EMPTY: &str = "🗓️ **Тижневий звіт** 🗓️\n\nЗа весь тиждень плюсиків не було.";
const WEEKLY_HEADER: &str = "🗓️ **Великий тижневий звіт!** 🗓️\n\nРезультати за весь тиждень:\n";
const WEEKLY_RANK_MARKER: &str = "🏆";
const WEEKLY_TOTAL_LABEL: &str = "**Загалом за тиждень:**";
const WEEKLY_TRAILER: &str = "\n\nПочинаємо новий тиждень! Статистику обнулено.";

/// Fixed text used when nobody counted anything in the window
pub fn empty_report(window: Window) -> &'static str {
    match window {
        Window::Daily => DAILY_EMPTY,
        Window::Weekly => WEEKLY_EMPTY,
    }
}

/// Entries ordered by count descending, ties by user id ascending
pub fn ranked(tallies: &TallyMap) -> Vec<(&str, &UserTally)> {
    let mut entries: Vec<(&str, &UserTally)> = tallies
        .iter()
        .map(|(user_id, tally)| (user_id.as_str(), tally))
        .collect();
    entries.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(b.0)));
    entries
}

/// Render the report for `window` from a snapshot of its tallies.
///
/// Pure function; emitting the text and resetting counters happen elsewhere.
pub fn render_report(tallies: &TallyMap, window: Window) -> String {
    if tallies.is_empty() {
        return empty_report(window).to_string();
    }

    let (header, marker) = match window {
        Window::Daily => (DAILY_HEADER, DAILY_RANK_MARKER),
        Window::Weekly => (WEEKLY_HEADER, WEEKLY_RANK_MARKER),
    };

    let mut text = String::from(header);
    for (_, tally) in ranked(tallies) {
        text.push_str(&format!("{} {}: **{}**\n", marker, tally.name, tally.count));
    }

    let sum = total(tallies);
    match window {
        Window::Daily => {
            text.push_str(&format!("\n{} {}", DAILY_TOTAL_LABEL, sum));
        }
        Window::Weekly => {
            text.push_str(&format!("\n{} {}!", WEEKLY_TOTAL_LABEL, sum));
            text.push_str(WEEKLY_TRAILER);
        }
    }

    text
}
