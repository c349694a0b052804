use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::calendar::{first_day_of_month, shift_month};
use crate::error::PickerError;
use crate::presets::QuickSelectPreset;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPhase {
    AwaitingStart,
    AwaitingEnd,
}

/// A possibly partial date range. When both ends are set, `start <= end`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl DateRange {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(first: NaiveDate, second: NaiveDate) -> Self {
        Self {
            start: Some(first.min(second)),
            end: Some(first.max(second)),
        }
    }

    pub fn starting_at(start: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn complete(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    pub fn require_complete(&self) -> Result<(NaiveDate, NaiveDate), PickerError> {
        self.complete().ok_or(PickerError::IncompleteRange)
    }

    /// Inclusive day count of a complete range.
    pub fn days(&self) -> Option<i64> {
        self.complete()
            .map(|(start, end)| (end - start).num_days() + 1)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.complete()
            .is_some_and(|(start, end)| start <= date && date <= end)
    }

    pub fn is_endpoint(&self, date: NaiveDate) -> bool {
        self.start == Some(date) || self.end == Some(date)
    }

    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> {
        let bounds = self.complete();
        bounds
            .into_iter()
            .flat_map(|(start, end)| start.iter_days().take_while(move |day| *day <= end))
    }
}

/// Two-click date range selection. The selector owns its state; callers only
/// see copies, and learn about finished ranges through `on_commit`.
pub struct RangeSelector<F>
where
    F: FnMut(NaiveDate, NaiveDate),
{
    phase: SelectionPhase,
    range: DateRange,
    reference_month: NaiveDate,
    on_commit: F,
}

impl<F> RangeSelector<F>
where
    F: FnMut(NaiveDate, NaiveDate),
{
    pub fn new(reference_month: NaiveDate, on_commit: F) -> Self {
        Self::with_initial_range(DateRange::empty(), reference_month, on_commit)
    }

    /// Seeds the selector without committing. A seed holding only a start
    /// waits for the end click.
    pub fn with_initial_range(range: DateRange, reference_month: NaiveDate, on_commit: F) -> Self {
        let phase = if range.start.is_some() && range.end.is_none() {
            SelectionPhase::AwaitingEnd
        } else {
            SelectionPhase::AwaitingStart
        };

        Self {
            phase,
            range,
            reference_month: first_day_of_month(reference_month),
            on_commit,
        }
    }

    pub fn phase(&self) -> SelectionPhase {
        self.phase
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn reference_month(&self) -> NaiveDate {
        self.reference_month
    }

    pub fn select_day(&mut self, date: NaiveDate) {
        match (self.phase, self.range.start) {
            (SelectionPhase::AwaitingEnd, Some(start)) => {
                self.range = DateRange::new(start, date);
                self.phase = SelectionPhase::AwaitingStart;
                tracing::debug!(%date, "range end selected");
                self.commit();
            }
            _ => {
                self.range = DateRange::starting_at(date);
                self.phase = SelectionPhase::AwaitingEnd;
                tracing::debug!(%date, "range start selected");
            }
        }
    }

    /// Replaces any pending selection with the preset's window and commits it.
    /// A preset that cannot be resolved leaves the selector untouched.
    pub fn apply_preset(
        &mut self,
        preset: QuickSelectPreset,
        now: NaiveDateTime,
    ) -> Result<(), PickerError> {
        let range = preset.resolve(now)?;
        self.range = range;
        self.phase = SelectionPhase::AwaitingStart;
        if let Some(start) = range.start {
            self.reference_month = first_day_of_month(start);
        }
        tracing::debug!(preset = preset.label(), "quick-select preset applied");
        self.commit();
        Ok(())
    }

    /// Clears the selection and shows the month of `today` again.
    pub fn reset(&mut self, today: NaiveDate) {
        self.range = DateRange::empty();
        self.phase = SelectionPhase::AwaitingStart;
        self.reference_month = first_day_of_month(today);
        tracing::debug!("range selection reset");
    }

    pub fn navigate_month(&mut self, delta: i32) -> Result<(), PickerError> {
        self.reference_month = shift_month(self.reference_month, delta)?;
        tracing::debug!(month = %self.reference_month.format("%Y-%m"), "calendar month changed");
        Ok(())
    }

    fn commit(&mut self) {
        if let Some((start, end)) = self.range.complete() {
            tracing::info!(%start, %end, "date range committed");
            (self.on_commit)(start, end);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use chrono::{NaiveDate, NaiveDateTime};

    use super::{DateRange, RangeSelector, SelectionPhase};
    use crate::error::PickerError;
    use crate::presets::QuickSelectPreset;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn noon(year: i32, month: u32, day: u32) -> NaiveDateTime {
        date(year, month, day).and_hms_opt(12, 0, 0).unwrap()
    }

    #[test]
    fn reversed_clicks_are_normalized() {
        let commits = RefCell::new(Vec::new());
        let mut selector = RangeSelector::new(date(2024, 3, 1), |start, end| {
            commits.borrow_mut().push((start, end))
        });

        selector.select_day(date(2024, 3, 10));
        assert_eq!(selector.phase(), SelectionPhase::AwaitingEnd);
        assert!(commits.borrow().is_empty());

        selector.select_day(date(2024, 3, 3));
        assert_eq!(selector.phase(), SelectionPhase::AwaitingStart);
        assert_eq!(
            selector.range().complete(),
            Some((date(2024, 3, 3), date(2024, 3, 10)))
        );
        drop(selector);
        assert_eq!(*commits.borrow(), vec![(date(2024, 3, 3), date(2024, 3, 10))]);
    }

    #[test]
    fn every_commit_is_ordered() {
        let days = [date(2024, 5, 1), date(2024, 5, 17), date(2024, 4, 30), date(2025, 1, 1)];
        for first in days {
            for second in days {
                let mut committed = None;
                let mut selector =
                    RangeSelector::new(first, |start, end| committed = Some((start, end)));
                selector.select_day(first);
                selector.select_day(second);
                drop(selector);
                let (start, end) = committed.expect("second click commits");
                assert!(start <= end);
                assert_eq!((start, end), (first.min(second), first.max(second)));
            }
        }
    }

    #[test]
    fn same_day_twice_commits_single_day() {
        let mut commits = 0;
        let mut selector = RangeSelector::new(date(2024, 6, 1), |start, end| {
            assert_eq!(start, end);
            commits += 1;
        });
        selector.select_day(date(2024, 6, 12));
        selector.select_day(date(2024, 6, 12));
        assert_eq!(selector.range().days(), Some(1));
        drop(selector);
        assert_eq!(commits, 1);
    }

    #[test]
    fn click_after_commit_starts_fresh() {
        let mut commits = 0;
        let mut selector = RangeSelector::with_initial_range(
            DateRange::new(date(2023, 1, 10), date(2023, 1, 28)),
            date(2023, 1, 1),
            |_, _| commits += 1,
        );
        assert_eq!(selector.phase(), SelectionPhase::AwaitingStart);

        selector.select_day(date(2023, 1, 5));
        assert_eq!(selector.range().start(), Some(date(2023, 1, 5)));
        assert_eq!(selector.range().end(), None);
        assert_eq!(
            selector.range().require_complete(),
            Err(PickerError::IncompleteRange)
        );
        drop(selector);
        assert_eq!(commits, 0);
    }

    #[test]
    fn seed_with_only_start_waits_for_end() {
        let mut committed = None;
        let mut selector = RangeSelector::with_initial_range(
            DateRange::starting_at(date(2023, 1, 10)),
            date(2023, 1, 1),
            |start, end| committed = Some((start, end)),
        );
        assert_eq!(selector.phase(), SelectionPhase::AwaitingEnd);
        selector.select_day(date(2023, 1, 2));
        drop(selector);
        assert_eq!(committed, Some((date(2023, 1, 2), date(2023, 1, 10))));
    }

    #[test]
    fn reset_clears_from_any_phase() {
        let commits = Cell::new(0);
        let mut selector =
            RangeSelector::new(date(2024, 3, 1), |_, _| commits.set(commits.get() + 1));
        selector.select_day(date(2024, 3, 4));
        selector.reset(date(2024, 8, 20));
        assert_eq!(selector.phase(), SelectionPhase::AwaitingStart);
        assert!(selector.range().is_empty());
        assert_eq!(selector.reference_month(), date(2024, 8, 1));
        assert_eq!(commits.get(), 0);

        selector.select_day(date(2024, 8, 4));
        selector.select_day(date(2024, 8, 6));
        assert_eq!(commits.get(), 1);
        selector.reset(date(2024, 8, 20));
        assert_eq!(selector.range(), DateRange::empty());
        assert_eq!(commits.get(), 1);

        selector.reset(date(2024, 8, 21));
        assert_eq!(commits.get(), 1);
    }

    #[test]
    fn presets_commit_and_bypass_pending_click() {
        let commits = RefCell::new(Vec::new());
        let mut selector = RangeSelector::new(date(2024, 3, 1), |start, end| {
            commits.borrow_mut().push((start, end))
        });
        selector.select_day(date(2024, 3, 9));
        selector.apply_preset(QuickSelectPreset::Today, noon(2024, 3, 15)).unwrap();
        assert_eq!(selector.phase(), SelectionPhase::AwaitingStart);

        selector.apply_preset(QuickSelectPreset::LastMonth, noon(2024, 3, 15)).unwrap();
        assert_eq!(selector.reference_month(), date(2024, 2, 1));
        drop(selector);

        assert_eq!(
            *commits.borrow(),
            vec![
                (date(2024, 3, 15), date(2024, 3, 15)),
                (date(2024, 2, 1), date(2024, 2, 29)),
            ]
        );
    }

    #[test]
    fn range_queries_cover_highlighting() {
        let range = DateRange::new(date(2024, 2, 27), date(2024, 3, 2));
        assert!(range.contains(date(2024, 2, 29)));
        assert!(!range.contains(date(2024, 3, 3)));
        assert!(range.is_endpoint(date(2024, 3, 2)));
        assert_eq!(range.iter_days().count(), 5);
        assert_eq!(DateRange::empty().iter_days().count(), 0);
        assert!(!DateRange::starting_at(date(2024, 2, 27)).contains(date(2024, 2, 27)));
    }

    #[test]
    fn unresolvable_preset_leaves_selection_alone() {
        let commits = Cell::new(0);
        let mut selector =
            RangeSelector::new(date(2024, 3, 1), |_, _| commits.set(commits.get() + 1));
        selector.select_day(date(2024, 3, 9));

        let result = selector.apply_preset(QuickSelectPreset::LastWeek, NaiveDateTime::MIN);
        assert!(matches!(result, Err(PickerError::InvalidArgument(_))));
        assert_eq!(selector.phase(), SelectionPhase::AwaitingEnd);
        assert_eq!(selector.range(), DateRange::starting_at(date(2024, 3, 9)));
        assert_eq!(selector.reference_month(), date(2024, 3, 1));
        assert_eq!(commits.get(), 0);
    }

    #[test]
    fn navigation_stops_at_the_calendar_edge() {
        let mut selector = RangeSelector::new(NaiveDate::MAX, |_, _| {});
        let before = selector.reference_month();
        assert!(selector.navigate_month(1).is_err());
        assert_eq!(selector.reference_month(), before);

        selector.navigate_month(-2).unwrap();
        assert!(selector.reference_month() < before);
    }
}
