//! Turning typed form input into drafts.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use tasknest_core::{Priority, SyncError, SyncResult, TaskDraft};

pub const DUE_HINT: &str = "YYYY-MM-DD HH:MM, YYYY-MM-DD or blank";

/// Hour used when only a date is entered.
const DEFAULT_DUE_TIME: (u32, u32) = (9, 0);

/// Parse a due date typed in local time. Blank input means no due date.
pub fn parse_due<Tz: TimeZone>(input: &str, tz: &Tz) -> SyncResult<Option<DateTime<Utc>>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }

    let naive = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M").or_else(|_| {
        let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")?;
        let (hour, minute) = DEFAULT_DUE_TIME;
        Ok::<_, chrono::ParseError>(date.and_time(
            NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default(),
        ))
    });
    let naive = naive.map_err(|_| SyncError::InvalidTask(format!("due date must be {DUE_HINT}")))?;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(local) => Ok(Some(local.with_timezone(&Utc))),
        LocalResult::Ambiguous(earliest, _) => Ok(Some(earliest.with_timezone(&Utc))),
        LocalResult::None => Err(SyncError::InvalidTask(format!(
            "{input} does not exist in the local time zone"
        ))),
    }
}

/// Build a draft from submitted fields, or `None` when the title is blank.
pub fn build_draft(
    title: &str,
    description: &str,
    priority: Priority,
    due_date: Option<DateTime<Utc>>,
) -> Option<TaskDraft> {
    let title = title.trim();
    if title.is_empty() {
        return None;
    }
    let mut draft = TaskDraft::new(title)
        .description(description.trim())
        .priority(priority);
    draft.due_date = due_date;
    Some(draft)
}
