//! Read-only derivations the screens render from the task list.
//!
//! Everything here is generic over a [`TimeZone`] so callers pass
//! `chrono::Local` in the app and a fixed offset in tests.

use chrono::{Datelike, Months, NaiveDate, TimeZone, Timelike};

use crate::models::Task;

/// Number of completed tasks the progress screen lists.
pub const RECENT_COMPLETED_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DayPart {
    Morning,
    Afternoon,
    Evening,
}

impl DayPart {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=11 => DayPart::Morning,
            12..=17 => DayPart::Afternoon,
            _ => DayPart::Evening,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            DayPart::Morning => "Morning",
            DayPart::Afternoon => "Afternoon",
            DayPart::Evening => "Evening",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            DayPart::Morning => "☀",
            DayPart::Afternoon => "⛅",
            DayPart::Evening => "☾",
        }
    }

    /// Whether `task` belongs in this section. Undated tasks are always
    /// due, so they show up in every section.
    pub fn includes<Tz: TimeZone>(&self, task: &Task, tz: &Tz) -> bool {
        match task.due_date {
            Some(due) => Self::from_hour(due.with_timezone(tz).hour()) == *self,
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section<'a> {
    pub part: DayPart,
    pub tasks: Vec<&'a Task>,
}

/// Incomplete tasks grouped by the local hour they are due. Empty sections
/// are omitted. An undated task is listed under every part of the day.
pub fn day_part_sections<'a, Tz: TimeZone>(tasks: &'a [Task], tz: &Tz) -> Vec<Section<'a>> {
    [DayPart::Morning, DayPart::Afternoon, DayPart::Evening]
        .into_iter()
        .filter_map(|part| {
            let grouped: Vec<&Task> = tasks
                .iter()
                .filter(|t| !t.is_completed && part.includes(t, tz))
                .collect();
            (!grouped.is_empty()).then_some(Section {
                part,
                tasks: grouped,
            })
        })
        .collect()
}

pub fn tasks_left(tasks: &[Task]) -> usize {
    tasks.iter().filter(|t| !t.is_completed).count()
}

/// Week of the year, weeks starting on Sunday and January 1st always in week 1.
/// The result depends on the date only, never on the time of day.
pub fn week_number(date: NaiveDate) -> u32 {
    let jan1 = NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date);
    (date.ordinal0() + jan1.weekday().num_days_from_sunday()) / 7 + 1
}

fn local_date<Tz: TimeZone>(task: &Task, tz: &Tz) -> Option<NaiveDate> {
    task.due_date.map(|due| due.with_timezone(tz).date_naive())
}

/// Tasks due on `date` in local time, completed or not. Undated tasks never match.
pub fn tasks_on_date<'a, Tz: TimeZone>(tasks: &'a [Task], date: NaiveDate, tz: &Tz) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|t| local_date(t, tz) == Some(date))
        .collect()
}

pub fn has_tasks_on<Tz: TimeZone>(tasks: &[Task], date: NaiveDate, tz: &Tz) -> bool {
    tasks.iter().any(|t| local_date(t, tz) == Some(date))
}

/// Cells of a Sunday-first month grid: leading `None` blanks, then every day of the month.
pub fn month_grid(year: i32, month: u32) -> Vec<Option<NaiveDate>> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    let offset = first.weekday().num_days_from_sunday() as usize;
    let days = first
        .checked_add_months(Months::new(1))
        .map(|next| (next - first).num_days() as usize)
        .unwrap_or(0);

    let mut cells = vec![None; offset];
    cells.extend(first.iter_days().take(days).map(Some));
    cells
}

/// Move `(year, month)` by `delta` months, wrapping across years.
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressStats {
    pub total: usize,
    pub completed: usize,
    pub percentage: u8,
    pub today_total: usize,
    pub today_completed: usize,
}

/// Completion summary. "Today" counts undated tasks plus tasks due on `today`.
pub fn progress_stats<Tz: TimeZone>(tasks: &[Task], today: NaiveDate, tz: &Tz) -> ProgressStats {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.is_completed).count();
    let percentage = if total > 0 {
        ((completed as f64 / total as f64) * 100.0).round() as u8
    } else {
        0
    };

    let today_tasks: Vec<&Task> = tasks
        .iter()
        .filter(|t| match local_date(t, tz) {
            None => true,
            Some(date) => date == today,
        })
        .collect();

    ProgressStats {
        total,
        completed,
        percentage,
        today_total: today_tasks.len(),
        today_completed: today_tasks.iter().filter(|t| t.is_completed).count(),
    }
}

pub fn recent_completed(tasks: &[Task], limit: usize) -> Vec<&Task> {
    tasks.iter().filter(|t| t.is_completed).take(limit).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileStats {
    pub completed: usize,
    pub pending: usize,
}

impl ProfileStats {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let completed = tasks.iter().filter(|t| t.is_completed).count();
        Self {
            completed,
            pending: tasks.len() - completed,
        }
    }
}
