use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::calendar::{first_day_of_month, last_day_of_month, shift_month};
use crate::error::PickerError;
use crate::selection::DateRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickSelectPreset {
    Today,
    Yesterday,
    LastWeek,
    LastMonth,
    LastQuarter,
}

impl QuickSelectPreset {
    pub const ALL: [QuickSelectPreset; 5] = [
        QuickSelectPreset::Today,
        QuickSelectPreset::Yesterday,
        QuickSelectPreset::LastWeek,
        QuickSelectPreset::LastMonth,
        QuickSelectPreset::LastQuarter,
    ];

    pub fn label(self) -> &'static str {
        match self {
            QuickSelectPreset::Today => "Today",
            QuickSelectPreset::Yesterday => "Yesterday",
            QuickSelectPreset::LastWeek => "Last week",
            QuickSelectPreset::LastMonth => "Last month",
            QuickSelectPreset::LastQuarter => "Last quarter",
        }
    }

    /// Resolves the preset against `now`. Always recomputed, so callers can
    /// pass a fixed clock. Fails when the window would fall outside chrono's
    /// calendar.
    pub fn resolve(self, now: NaiveDateTime) -> Result<DateRange, PickerError> {
        let today = now.date();

        match self {
            QuickSelectPreset::Today => Ok(DateRange::new(today, today)),
            QuickSelectPreset::Yesterday => {
                let yesterday = days_before(today, 1)?;
                Ok(DateRange::new(yesterday, yesterday))
            }
            QuickSelectPreset::LastWeek => Ok(DateRange::new(
                days_before(today, 7)?,
                days_before(today, 1)?,
            )),
            QuickSelectPreset::LastMonth => {
                let previous_month = shift_month(first_day_of_month(today), -1)?;
                Ok(DateRange::new(previous_month, last_day_of_month(previous_month)?))
            }
            QuickSelectPreset::LastQuarter => {
                let this_month = first_day_of_month(today);
                let previous_month = shift_month(this_month, -1)?;
                Ok(DateRange::new(
                    shift_month(this_month, -3)?,
                    last_day_of_month(previous_month)?,
                ))
            }
        }
    }
}

fn days_before(day: NaiveDate, days: i64) -> Result<NaiveDate, PickerError> {
    day.checked_sub_signed(Duration::days(days))
        .ok_or_else(|| PickerError::invalid(format!("{days} days before {day} is out of range")))
}

impl Display for QuickSelectPreset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for QuickSelectPreset {
    type Err = PickerError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key = raw
            .chars()
            .filter(|ch| !matches!(ch, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();

        match key.as_str() {
            "today" => Ok(QuickSelectPreset::Today),
            "yesterday" => Ok(QuickSelectPreset::Yesterday),
            "lastweek" => Ok(QuickSelectPreset::LastWeek),
            "lastmonth" => Ok(QuickSelectPreset::LastMonth),
            "lastquarter" => Ok(QuickSelectPreset::LastQuarter),
            _ => Err(PickerError::invalid(format!("unknown quick-select preset: {raw}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::QuickSelectPreset;
    use crate::error::PickerError;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        date(year, month, day).and_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn today_and_yesterday_are_single_days() {
        let now = at(2024, 3, 1, 15, 42);
        let today = QuickSelectPreset::Today.resolve(now).unwrap();
        assert_eq!(today.complete(), Some((date(2024, 3, 1), date(2024, 3, 1))));

        let yesterday = QuickSelectPreset::Yesterday.resolve(now).unwrap();
        assert_eq!(yesterday.complete(), Some((date(2024, 2, 29), date(2024, 2, 29))));
    }

    #[test]
    fn last_week_ends_yesterday() {
        let range = QuickSelectPreset::LastWeek.resolve(at(2024, 1, 3, 8, 0)).unwrap();
        assert_eq!(range.complete(), Some((date(2023, 12, 27), date(2024, 1, 2))));
        assert_eq!(range.days(), Some(7));
    }

    #[test]
    fn last_month_spans_the_previous_calendar_month() {
        let range = QuickSelectPreset::LastMonth.resolve(at(2024, 3, 31, 23, 59)).unwrap();
        assert_eq!(range.complete(), Some((date(2024, 2, 1), date(2024, 2, 29))));

        let january = QuickSelectPreset::LastMonth.resolve(at(2024, 1, 15, 0, 0)).unwrap();
        assert_eq!(january.complete(), Some((date(2023, 12, 1), date(2023, 12, 31))));
    }

    #[test]
    fn last_quarter_covers_three_full_months() {
        let range = QuickSelectPreset::LastQuarter.resolve(at(2024, 2, 10, 12, 0)).unwrap();
        assert_eq!(range.complete(), Some((date(2023, 11, 1), date(2024, 1, 31))));
    }

    #[test]
    fn parses_common_spellings() {
        assert_eq!("last-week".parse::<QuickSelectPreset>(), Ok(QuickSelectPreset::LastWeek));
        assert_eq!("lastQuarter".parse::<QuickSelectPreset>(), Ok(QuickSelectPreset::LastQuarter));
        assert_eq!("LAST_MONTH".parse::<QuickSelectPreset>(), Ok(QuickSelectPreset::LastMonth));
        assert!(matches!(
            "fortnight".parse::<QuickSelectPreset>(),
            Err(PickerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn presets_past_the_calendar_edge_are_rejected() {
        for preset in [
            QuickSelectPreset::Yesterday,
            QuickSelectPreset::LastWeek,
            QuickSelectPreset::LastMonth,
            QuickSelectPreset::LastQuarter,
        ] {
            assert!(
                matches!(preset.resolve(NaiveDateTime::MIN), Err(PickerError::InvalidArgument(_))),
                "{preset}"
            );
        }

        let today = QuickSelectPreset::Today.resolve(NaiveDateTime::MIN).unwrap();
        assert_eq!(today.days(), Some(1));

        let week = QuickSelectPreset::LastWeek.resolve(NaiveDateTime::MAX).unwrap();
        assert_eq!(week.end(), NaiveDate::MAX.pred_opt());
    }
}
