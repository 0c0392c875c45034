//! Plain-text rendering for the terminal screens. Colour is applied by the
//! caller so these stay easy to test.

use std::fmt::Display;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use tasknest_core::views::{has_tasks_on, month_grid};
use tasknest_core::{Priority, Task};

pub const WEEKDAY_HEADER: &str = " Su  Mo  Tu  We  Th  Fr  Sa";

pub fn priority_icon(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "🔴",
        Priority::Medium => "🟡",
        Priority::Low => "🟢",
    }
}

pub fn checkbox(done: bool) -> &'static str {
    if done {
        "[x]"
    } else {
        "[ ]"
    }
}

pub fn due_label<Tz>(due: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    due.with_timezone(tz).format("%b %-d, %H:%M").to_string()
}

/// One list row: `[ ] 🟡 Title · Mar 5, 09:00  WORK`.
pub fn task_line<Tz>(task: &Task, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let due = task
        .due_date
        .map(|d| format!(" · {}", due_label(&d, tz)))
        .unwrap_or_default();
    let reminder = if task.has_reminder() { " 🔔" } else { "" };
    format!(
        "{} {} {}{}{}  {}",
        checkbox(task.is_completed),
        priority_icon(task.priority),
        task.title,
        due,
        reminder,
        task.priority.category_label()
    )
}

pub fn month_title(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarCell {
    pub date: Option<NaiveDate>,
    pub has_tasks: bool,
    pub is_today: bool,
}

impl CalendarCell {
    /// Four columns wide; `*` marks a day with tasks.
    pub fn text(&self) -> String {
        match self.date {
            Some(date) => format!("{:>3}{}", date.day(), if self.has_tasks { '*' } else { ' ' }),
            None => "    ".to_string(),
        }
    }
}

/// The month grid split into week rows.
pub fn calendar_weeks<Tz: TimeZone>(
    year: i32,
    month: u32,
    tasks: &[Task],
    today: NaiveDate,
    tz: &Tz,
) -> Vec<Vec<CalendarCell>> {
    let cells: Vec<CalendarCell> = month_grid(year, month)
        .into_iter()
        .map(|date| CalendarCell {
            date,
            has_tasks: date.is_some_and(|d| has_tasks_on(tasks, d, tz)),
            is_today: date == Some(today),
        })
        .collect();
    cells.chunks(7).map(<[CalendarCell]>::to_vec).collect()
}

/// Reads a `COLORFGBG` value (`"fg;bg"`). White and light grey backgrounds
/// count as light; anything else, including no value, as dark.
pub fn background_is_dark(colorfgbg: Option<&str>) -> bool {
    let background = colorfgbg.and_then(|v| v.rsplit(';').next());
    !matches!(background, Some("7") | Some("15"))
}

/// `#RRGGBB` to an RGB triple for truecolor output.
pub fn hex_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

pub fn progress_bar(percentage: u8, width: usize) -> String {
    let filled = width * usize::from(percentage.min(100)) / 100;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use tasknest_core::TaskDraft;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_task_line() {
        let due = Utc.with_ymd_and_hms(2025, 3, 5, 9, 30, 0).unwrap();
        let mut task = Task::from_draft(
            "1".into(),
            &TaskDraft::new("Standup").priority(Priority::Medium).due(due),
            Some("n".into()),
        );
        assert_eq!(task_line(&task, &utc()), "[ ] 🟡 Standup · Mar 5, 09:30 🔔  WORK");

        task.is_completed = true;
        task.notification_id = None;
        task.due_date = None;
        assert_eq!(task_line(&task, &utc()), "[x] 🟡 Standup  WORK");
    }

    #[test]
    fn test_calendar_weeks_mark_days() {
        // March 2025 starts on a Saturday
        let due = Utc.with_ymd_and_hms(2025, 3, 3, 12, 0, 0).unwrap();
        let tasks = vec![Task::from_draft("1".into(), &TaskDraft::new("x").due(due), None)];
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

        let weeks = calendar_weeks(2025, 3, &tasks, today, &utc());
        assert_eq!(weeks.len(), 6);
        assert_eq!(weeks[0][5].text(), "    ");
        assert!(weeks[0][6].is_today);
        assert_eq!(weeks[0][6].text(), "  1 ");
        assert_eq!(weeks[1][1].text(), "  3*");
        assert_eq!(weeks[5].len(), 2);
        assert_eq!(month_title(2025, 3), "March 2025");
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0, 4), "░░░░");
        assert_eq!(progress_bar(50, 4), "██░░");
        assert_eq!(progress_bar(100, 4), "████");
        assert_eq!(progress_bar(255, 2), "██");
    }

    #[test]
    fn test_background_is_dark() {
        assert!(background_is_dark(None));
        assert!(background_is_dark(Some("15;0")));
        assert!(!background_is_dark(Some("0;15")));
        assert!(!background_is_dark(Some("0;default;7")));
    }

    #[test]
    fn test_hex_rgb() {
        assert_eq!(hex_rgb("#2563EB"), Some((0x25, 0x63, 0xEB)));
        assert_eq!(hex_rgb("2563EB"), None);
        assert_eq!(hex_rgb("#12345"), None);
    }
}
