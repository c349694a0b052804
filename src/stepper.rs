use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::error::PickerError;

pub const MINUTE_STEP: i64 = 5;

pub fn step_day(current: NaiveDateTime, amount: i64) -> Result<NaiveDateTime, PickerError> {
    shift(current, Duration::try_days(amount), "day")
}

pub fn step_hour(current: NaiveDateTime, amount: i64) -> Result<NaiveDateTime, PickerError> {
    shift(current, Duration::try_hours(amount), "hour")
}

/// Moves the minute field and carries whole hours. A single -5 from :00
/// lands on :55 of the previous hour; +5 from :55 lands on :00 of the next.
pub fn step_minute(current: NaiveDateTime, amount: i64) -> Result<NaiveDateTime, PickerError> {
    let total = i64::from(current.minute()) + amount;
    let minute = total.rem_euclid(60) as u32;
    let carried = step_hour(current, total.div_euclid(60))?;
    carried
        .with_minute(minute)
        .ok_or_else(|| PickerError::invalid(format!("minute out of range: {minute}")))
}

fn shift(
    current: NaiveDateTime,
    delta: Option<Duration>,
    unit: &str,
) -> Result<NaiveDateTime, PickerError> {
    delta
        .and_then(|delta| current.checked_add_signed(delta))
        .ok_or_else(|| PickerError::invalid(format!("{unit} step leaves the supported date range")))
}

pub fn bucket_minute(minute: u32) -> u32 {
    minute / MINUTE_STEP as u32 * MINUTE_STEP as u32
}

pub fn format_hour(instant: NaiveDateTime) -> String {
    format!("{:02}", instant.hour())
}

pub fn format_minute_bucket(instant: NaiveDateTime) -> String {
    format!("{:02}", bucket_minute(instant.minute()))
}

pub fn day_label(instant: NaiveDateTime, today: NaiveDate) -> String {
    if instant.date() == today {
        "Today".to_string()
    } else {
        instant.format("%m.%d").to_string()
    }
}

pub fn parse_instant(input: &str) -> Result<NaiveDateTime, PickerError> {
    const FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"];

    if let Ok(timestamp) = chrono::DateTime::parse_from_rfc3339(input) {
        return Ok(timestamp.naive_local());
    }

    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .ok_or_else(|| PickerError::invalid(format!("not a date-time: {input}")))
}

pub fn parse_date(input: &str) -> Result<NaiveDate, PickerError> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|err| PickerError::invalid(format!("not a date (YYYY-MM-DD): {input}: {err}")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepUnit {
    Day,
    Hour,
    Minute,
}

impl StepUnit {
    pub fn parse(input: &str) -> Result<Self, PickerError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "day" | "days" | "d" => Ok(StepUnit::Day),
            "hour" | "hours" | "h" => Ok(StepUnit::Hour),
            "minute" | "minutes" | "m" => Ok(StepUnit::Minute),
            _ => Err(PickerError::invalid(format!("unknown step unit: {input}"))),
        }
    }

    pub fn next(self) -> Self {
        match self {
            StepUnit::Day => StepUnit::Hour,
            StepUnit::Hour => StepUnit::Minute,
            StepUnit::Minute => StepUnit::Day,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            StepUnit::Day => StepUnit::Minute,
            StepUnit::Hour => StepUnit::Day,
            StepUnit::Minute => StepUnit::Hour,
        }
    }
}

/// The instant shown in the time bar, stepped one unit per click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instant(NaiveDateTime);

impl Instant {
    pub fn new(value: NaiveDateTime) -> Self {
        Self(value)
    }

    pub fn value(self) -> NaiveDateTime {
        self.0
    }

    pub fn step(self, unit: StepUnit, clicks: i64) -> Result<Self, PickerError> {
        let next = match unit {
            StepUnit::Day => step_day(self.0, clicks)?,
            StepUnit::Hour => step_hour(self.0, clicks)?,
            StepUnit::Minute => step_minute(self.0, clicks * MINUTE_STEP)?,
        };
        Ok(Self(next))
    }

    /// The displayed instant: minutes floored to the 5-minute bucket.
    pub fn bucketed(self) -> NaiveDateTime {
        self.0
            .with_minute(bucket_minute(self.0.minute()))
            .and_then(|value| value.with_second(0))
            .and_then(|value| value.with_nanosecond(0))
            .unwrap_or(self.0)
    }
}
