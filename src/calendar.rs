use chrono::{Datelike, NaiveDate};

use crate::error::PickerError;

pub const WEEKDAY_HEADERS: [&str; 7] = ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthOffset {
    Prev,
    Current,
    Next,
}

/// One cell of a rendered month. Cells tagged `Prev`/`Next` are padding
/// borrowed from the adjacent months and are only shown, never selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDay {
    pub day_number: u32,
    pub month_offset: MonthOffset,
    pub date: NaiveDate,
}

impl CalendarDay {
    pub fn is_selectable(&self) -> bool {
        self.month_offset == MonthOffset::Current
    }
}

/// Lays out the month containing `reference_month` as complete Monday-first
/// weeks, padding with trailing days of the previous month and leading days
/// of the next one. Fails for the first and last months chrono can represent,
/// whose neighbours do not exist.
pub fn build_month_grid(reference_month: NaiveDate) -> Result<Vec<CalendarDay>, PickerError> {
    let first = first_day_of_month(reference_month);
    let days = days_in_month(first.year(), first.month())?;
    let offset = first.weekday().num_days_from_monday();

    let prev_month = shift_month(first, -1)?;
    let prev_days = days_in_month(prev_month.year(), prev_month.month())?;
    let next_month = shift_month(first, 1)?;

    let filled = offset + days;
    let total = filled.div_ceil(7) * 7;
    let mut grid = Vec::with_capacity(total as usize);

    for day_number in (prev_days - offset + 1)..=prev_days {
        grid.push(CalendarDay {
            day_number,
            month_offset: MonthOffset::Prev,
            date: day_of(prev_month, day_number)?,
        });
    }

    for day_number in 1..=days {
        grid.push(CalendarDay {
            day_number,
            month_offset: MonthOffset::Current,
            date: day_of(first, day_number)?,
        });
    }

    for day_number in 1..=(total - filled) {
        grid.push(CalendarDay {
            day_number,
            month_offset: MonthOffset::Next,
            date: day_of(next_month, day_number)?,
        });
    }

    Ok(grid)
}

pub fn weeks(grid: &[CalendarDay]) -> impl Iterator<Item = &[CalendarDay]> {
    grid.chunks(7)
}

pub fn days_in_month(year: i32, month: u32) -> Result<u32, PickerError> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .map(|last| last.day())
        .ok_or_else(|| out_of_range(year, month))
}

pub fn first_day_of_month(day: NaiveDate) -> NaiveDate {
    // The 1st of a representable month is always representable.
    day.with_day(1).unwrap_or(day)
}

pub fn last_day_of_month(day: NaiveDate) -> Result<NaiveDate, PickerError> {
    day_of(day, days_in_month(day.year(), day.month())?)
}

pub fn shift_month(day: NaiveDate, delta: i32) -> Result<NaiveDate, PickerError> {
    let months = i64::from(day.year()) * 12 + i64::from(day.month0()) + i64::from(delta);
    let year = i32::try_from(months.div_euclid(12))
        .map_err(|_| PickerError::invalid(format!("month shift by {delta} leaves the calendar")))?;
    let month = months.rem_euclid(12) as u32 + 1;
    let target_day = day.day().min(days_in_month(year, month)?);
    NaiveDate::from_ymd_opt(year, month, target_day).ok_or_else(|| out_of_range(year, month))
}

pub fn month_title(day: NaiveDate) -> String {
    format!("{} {}", day.format("%B"), day.year())
}

fn day_of(month: NaiveDate, day_number: u32) -> Result<NaiveDate, PickerError> {
    NaiveDate::from_ymd_opt(month.year(), month.month(), day_number)
        .ok_or_else(|| out_of_range(month.year(), month.month()))
}

fn out_of_range(year: i32, month: u32) -> PickerError {
    PickerError::invalid(format!("month {year}-{month:02} is outside the supported calendar"))
}
