use std::cell::Cell;
use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration as StdDuration;

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime};
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, ExecutableCommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};

use crate::calendar::{build_month_grid, first_day_of_month, month_title, shift_month, weeks, MonthOffset, WEEKDAY_HEADERS};
use crate::config::PickerConfig;
use crate::favorites::{save_favorites, FavoriteKind, Favorites};
use crate::presets::QuickSelectPreset;
use crate::selection::{DateRange, RangeSelector, SelectionPhase};
use crate::stepper::{day_label, format_hour, format_minute_bucket, Instant, StepUnit};
use crate::traffic::{generate_traffic_data, summarize};

const FOCUSED_PANEL_BORDER_COLOR: Color = Color::Yellow;
const INACTIVE_PANEL_BORDER_COLOR: Color = Color::DarkGray;
const HIGHLIGHT_BACKGROUND_COLOR: Color = Color::Rgb(42, 45, 52);
const RANGE_BACKGROUND_COLOR: Color = Color::Rgb(30, 52, 82);

type CommitSlot = Rc<Cell<Option<(NaiveDate, NaiveDate)>>>;
type Selector = RangeSelector<Box<dyn FnMut(NaiveDate, NaiveDate)>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerOutcome {
	Committed {
		start: NaiveDate,
		end: NaiveDate,
		instant: NaiveDateTime,
	},
	Closed,
}

pub struct PreviewTarget {
	pub segment_id: u32,
	pub favorites: Favorites,
	pub favorites_path: PathBuf,
}

pub fn run_picker(config: &PickerConfig, preview: PreviewTarget) -> Result<PickerOutcome, Box<dyn Error>> {
	if !config.is_open {
		tracing::debug!("picker configured closed, nothing to render");
		return Ok(PickerOutcome::Closed);
	}

	enable_raw_mode()?;
	let mut stdout = io::stdout();
	stdout.execute(EnterAlternateScreen)?;
	let backend = CrosstermBackend::new(stdout);
	let mut terminal = Terminal::new(backend)?;

	let mut app = App::new(config, preview, Local::now().naive_local());
	let result = run_event_loop(&mut terminal, &mut app);

	disable_raw_mode()?;
	execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
	terminal.show_cursor()?;

	result?;
	Ok(app.outcome())
}

fn run_event_loop(
	terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
	app: &mut App,
) -> Result<(), Box<dyn Error>> {
	loop {
		terminal.draw(|frame| draw_picker(frame, app))?;

		if event::poll(StdDuration::from_millis(250))? {
			if let CEvent::Key(key) = event::read()? {
				if key.kind != KeyEventKind::Press {
					continue;
				}

				let now = Local::now().naive_local();
				let should_quit = match app.focus {
					FocusPane::Calendar => handle_calendar_key(app, key.code, now),
					FocusPane::TimeBar => handle_time_bar_key(app, key.code),
				};

				if should_quit {
					break;
				}
			}
		}
	}

	Ok(())
}

fn draw_picker(frame: &mut Frame, app: &App) {
	let area = centered_rect(90, 80, frame.area());
	frame.render_widget(Clear, area);

	let layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Min(12), Constraint::Length(3), Constraint::Length(4)])
		.split(area);

	let body = Layout::default()
		.direction(Direction::Horizontal)
		.constraints([
			Constraint::Length(18),
			Constraint::Length(26),
			Constraint::Min(24),
		])
		.split(layout[0]);

	render_preset_sidebar(frame, body[0], app);
	render_calendar_panel(frame, body[1], app);
	render_preview_panel(frame, body[2], app);
	render_time_bar(frame, layout[1], app);
	render_footer(frame, layout[2], app);
}

fn render_preset_sidebar(frame: &mut Frame, area: Rect, app: &App) {
	let mut items = QuickSelectPreset::ALL
		.iter()
		.enumerate()
		.map(|(index, preset)| ListItem::new(format!("{} {}", index + 1, preset.label())))
		.collect::<Vec<_>>();
	items.push(ListItem::new(""));
	items.push(ListItem::new(Span::styled(
		"r Reset",
		Style::default().fg(Color::LightBlue).add_modifier(Modifier::BOLD),
	)));

	let mut state = ListState::default();
	state.select(app.last_preset.and_then(|preset| {
		QuickSelectPreset::ALL.iter().position(|candidate| *candidate == preset)
	}));

	let list = List::new(items)
		.block(Block::default().borders(Borders::ALL).title("Quick select"))
		.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR).add_modifier(Modifier::BOLD));
	frame.render_stateful_widget(list, area, &mut state);
}

fn render_calendar_panel(frame: &mut Frame, area: Rect, app: &App) {
	let month = app.selector.reference_month();
	let range = app.selector.range();
	let calendar_focused = app.focus == FocusPane::Calendar;

	let mut lines = Vec::new();
	lines.push(Line::from(format!("< {} >", month_title(month))));
	lines.push(Line::from(WEEKDAY_HEADERS.join(" ")));

	match build_month_grid(month) {
		Ok(grid) => {
			for week in weeks(&grid) {
				let spans = week
					.iter()
					.map(|cell| {
						let mut style = Style::default();
						if cell.month_offset != MonthOffset::Current {
							style = style.fg(Color::DarkGray);
						} else if range.is_endpoint(cell.date) {
							style = style.fg(Color::Black).bg(Color::Yellow).add_modifier(Modifier::BOLD);
						} else if range.contains(cell.date) {
							style = style.fg(Color::LightYellow).bg(RANGE_BACKGROUND_COLOR);
						}
						if calendar_focused && cell.is_selectable() && cell.date == app.cursor {
							style = style.add_modifier(Modifier::REVERSED);
						}
						Span::styled(format!("{:>2} ", cell.day_number), style)
					})
					.collect::<Vec<_>>();
				lines.push(Line::from(spans));
			}
		}
		Err(err) => lines.push(Line::from(Span::styled(
			format!("error: {err}"),
			Style::default().fg(Color::Red),
		))),
	}

	lines.push(Line::from(""));
	lines.push(Line::from(range_text(range)));

	let block = Block::default()
		.borders(Borders::ALL)
		.title("Calendar")
		.border_style(border_style(calendar_focused));
	frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_preview_panel(frame: &mut Frame, area: Rect, app: &App) {
	let preview = &app.preview;
	let favorite = preview.favorites.contains(FavoriteKind::Segment, preview.segment_id);
	let mut lines = vec![Line::from(vec![
		Span::styled(
			format!("Segment {}", preview.segment_id),
			Style::default().add_modifier(Modifier::BOLD),
		),
		Span::styled(
			if favorite { " *" } else { "" },
			Style::default().fg(Color::Yellow),
		),
	])];

	match app.committed() {
		Some((start, end)) => {
			let range = DateRange::new(start, end);
			let seed = u64::from(preview.segment_id) << 32 | start.num_days_from_ce() as u64;
			let samples = generate_traffic_data(preview.segment_id, &mut StdRng::seed_from_u64(seed));
			let summary = summarize(&samples);
			lines.push(Line::from(format!(
				"{} - {} ({} days)",
				start.format("%Y-%m-%d"),
				end.format("%Y-%m-%d"),
				range.days().unwrap_or(0)
			)));
			lines.push(Line::from(format!("Avg speed: {:.1} km/h", summary.average_speed)));
			lines.push(Line::from(format!("Volume/day: {}", summary.total_volume)));
			lines.push(Line::from(format!(
				"Slowest: {}",
				summary.slowest_hour.unwrap_or_else(|| "-".to_string())
			)));
			lines.push(Line::from(""));

			let max_volume = samples.iter().map(|sample| sample.volume).max().unwrap_or(0).max(1);
			for sample in samples.iter().step_by(2) {
				let width = ((f64::from(sample.volume) / f64::from(max_volume)) * 12.0).round() as usize;
				lines.push(Line::from(format!(
					"{} {:>5.1} {}",
					&sample.hour[..2],
					sample.speed,
					"=".repeat(width.max(1))
				)));
			}
		}
		None => lines.push(Line::from("(no committed range)")),
	}

	let panel = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Preview"));
	frame.render_widget(panel, area);
}

fn render_time_bar(frame: &mut Frame, area: Rect, app: &App) {
	let focused = app.focus == FocusPane::TimeBar;
	let instant = app.instant.value();
	let today = Local::now().date_naive();
	let fields = [
		(StepUnit::Day, day_label(instant, today)),
		(StepUnit::Hour, format_hour(instant)),
		(StepUnit::Minute, format_minute_bucket(instant)),
	];

	let mut spans = Vec::new();
	for (unit, text) in fields {
		let style = if focused && unit == app.time_field {
			Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
		} else {
			Style::default()
		};
		spans.push(Span::raw(" < "));
		spans.push(Span::styled(text, style));
		spans.push(Span::raw(" > "));
	}

	let block = Block::default()
		.borders(Borders::ALL)
		.title("Time")
		.border_style(border_style(focused));
	frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
	let shortcuts = match app.focus {
		FocusPane::Calendar => {
			"arrows/hjkl move | Enter/space pick day | [ ] month | 1-5 preset | r reset | Tab time | q close"
		}
		FocusPane::TimeBar => "left/right field | up/down or < > step | Tab calendar | q close",
	};
	let lines = vec![
		Line::from(shortcuts),
		Line::from(format!("+/- segment | f favorite | {}", app.status)),
	];

	let footer = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Shortcuts"));
	frame.render_widget(footer, area);
}

fn range_text(range: DateRange) -> String {
	if range.is_empty() {
		return "pick start day".to_string();
	}
	match (range.start(), range.end()) {
		(Some(start), Some(end)) => format!("{} - {}", start.format("%m/%d"), end.format("%m/%d")),
		(Some(start), None) => format!("{} - pick end", start.format("%m/%d")),
		(None, _) => "pick start day".to_string(),
	}
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
	let popup_layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([
			Constraint::Percentage((100 - percent_y) / 2),
			Constraint::Percentage(percent_y),
			Constraint::Percentage((100 - percent_y) / 2),
		])
		.split(area);
	Layout::default()
		.direction(Direction::Horizontal)
		.constraints([
			Constraint::Percentage((100 - percent_x) / 2),
			Constraint::Percentage(percent_x),
			Constraint::Percentage((100 - percent_x) / 2),
		])
		.split(popup_layout[1])[1]
}

fn border_style(focused: bool) -> Style {
	if focused {
		Style::default()
			.fg(FOCUSED_PANEL_BORDER_COLOR)
			.add_modifier(Modifier::BOLD)
	} else {
		Style::default().fg(INACTIVE_PANEL_BORDER_COLOR)
	}
}

fn handle_calendar_key(app: &mut App, code: KeyCode, now: NaiveDateTime) -> bool {
	match code {
		KeyCode::Char('q') | KeyCode::Esc => return true,
		KeyCode::Tab | KeyCode::BackTab => app.focus = app.focus.next(),
		KeyCode::Left | KeyCode::Char('h') => app.move_cursor(-1),
		KeyCode::Right | KeyCode::Char('l') => app.move_cursor(1),
		KeyCode::Up | KeyCode::Char('k') => app.move_cursor(-7),
		KeyCode::Down | KeyCode::Char('j') => app.move_cursor(7),
		KeyCode::Char('[') => app.shift_month(-1),
		KeyCode::Char(']') => app.shift_month(1),
		KeyCode::Enter | KeyCode::Char(' ') => app.select_cursor_day(),
		KeyCode::Char('r') => app.reset(now.date()),
		KeyCode::Char(digit @ '1'..='5') => {
			let index = digit as usize - '1' as usize;
			app.apply_preset(QuickSelectPreset::ALL[index], now);
		}
		code => handle_preview_key(app, code),
	}

	false
}

fn handle_time_bar_key(app: &mut App, code: KeyCode) -> bool {
	match code {
		KeyCode::Char('q') | KeyCode::Esc => return true,
		KeyCode::Tab | KeyCode::BackTab => app.focus = app.focus.next(),
		KeyCode::Left | KeyCode::Char('h') => app.time_field = app.time_field.prev(),
		KeyCode::Right | KeyCode::Char('l') => app.time_field = app.time_field.next(),
		KeyCode::Up | KeyCode::Char('k') | KeyCode::Char('>') => app.step_time(1),
		KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('<') => app.step_time(-1),
		code => handle_preview_key(app, code),
	}

	false
}

fn handle_preview_key(app: &mut App, code: KeyCode) {
	match code {
		KeyCode::Char('+') | KeyCode::Char('=') => app.shift_segment(1),
		KeyCode::Char('-') => app.shift_segment(-1),
		KeyCode::Char('f') => app.toggle_favorite(),
		_ => {}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusPane {
	Calendar,
	TimeBar,
}

impl FocusPane {
	fn next(self) -> Self {
		match self {
			FocusPane::Calendar => FocusPane::TimeBar,
			FocusPane::TimeBar => FocusPane::Calendar,
		}
	}
}

struct App {
	selector: Selector,
	committed: CommitSlot,
	cursor: NaiveDate,
	focus: FocusPane,
	time_field: StepUnit,
	instant: Instant,
	last_preset: Option<QuickSelectPreset>,
	preview: PreviewTarget,
	status: String,
}

impl App {
	fn new(config: &PickerConfig, preview: PreviewTarget, now: NaiveDateTime) -> Self {
		let committed: CommitSlot = Rc::new(Cell::new(None));
		let slot = Rc::clone(&committed);
		let on_commit: Box<dyn FnMut(NaiveDate, NaiveDate)> = Box::new(move |start, end| {
			slot.set(Some((start, end)));
		});

		let reference_month = config.reference_month(now.date());
		let selector = RangeSelector::with_initial_range(config.initial_range(), reference_month, on_commit);
		let cursor = config
			.initial_range()
			.start()
			.unwrap_or_else(|| first_day_of_month(reference_month));

		Self {
			selector,
			committed,
			cursor,
			focus: FocusPane::Calendar,
			time_field: StepUnit::Day,
			instant: Instant::new(now),
			last_preset: None,
			preview,
			status: "Ready".to_string(),
		}
	}

	fn committed(&self) -> Option<(NaiveDate, NaiveDate)> {
		self.committed.get()
	}

	fn outcome(&self) -> PickerOutcome {
		match self.committed() {
			Some((start, end)) => PickerOutcome::Committed {
				start,
				end,
				instant: self.instant.bucketed(),
			},
			None => PickerOutcome::Closed,
		}
	}

	fn move_cursor(&mut self, delta_days: i64) {
		let target = Duration::try_days(delta_days).and_then(|delta| self.cursor.checked_add_signed(delta));
		match target {
			Some(cursor) => self.move_cursor_to(cursor),
			None => self.status = "error: no days beyond the calendar edge".to_string(),
		}
	}

	fn shift_month(&mut self, delta_months: i32) {
		match shift_month(self.cursor, delta_months) {
			Ok(cursor) => self.move_cursor_to(cursor),
			Err(err) => self.status = format!("error: {err}"),
		}
	}

	/// The displayed month follows the cursor; the cursor only moves once the
	/// month it lands in can be shown.
	fn move_cursor_to(&mut self, cursor: NaiveDate) {
		let month = self.selector.reference_month();
		let delta = (cursor.year() - month.year()) * 12 + cursor.month() as i32 - month.month() as i32;
		if delta != 0 {
			if let Err(err) = self.selector.navigate_month(delta) {
				self.status = format!("error: {err}");
				return;
			}
		}
		self.cursor = cursor;
	}

	fn select_cursor_day(&mut self) {
		self.last_preset = None;
		self.selector.select_day(self.cursor);
		self.status = match self.selector.phase() {
			SelectionPhase::AwaitingEnd => format!("Start {}; pick the end day", self.cursor.format("%Y-%m-%d")),
			SelectionPhase::AwaitingStart => self.committed_status(),
		};
	}

	fn apply_preset(&mut self, preset: QuickSelectPreset, now: NaiveDateTime) {
		if let Err(err) = self.selector.apply_preset(preset, now) {
			self.status = format!("{}: error: {err}", preset.label());
			return;
		}
		self.last_preset = Some(preset);
		if let Some(start) = self.selector.range().start() {
			self.cursor = start;
		}
		self.status = format!("{}: {}", preset.label(), self.committed_status());
	}

	fn reset(&mut self, today: NaiveDate) {
		self.selector.reset(today);
		self.last_preset = None;
		self.cursor = today;
		self.status = "Selection cleared".to_string();
	}

	fn step_time(&mut self, clicks: i64) {
		match self.instant.step(self.time_field, clicks) {
			Ok(instant) => self.instant = instant,
			Err(err) => self.status = format!("error: {err}"),
		}
	}

	fn shift_segment(&mut self, delta: i64) {
		let next = i64::from(self.preview.segment_id) + delta;
		self.preview.segment_id = u32::try_from(next.max(0)).unwrap_or(0);
		self.status = format!("Segment {}", self.preview.segment_id);
	}

	fn toggle_favorite(&mut self) {
		let id = self.preview.segment_id;
		let now_favorite = self.preview.favorites.toggle(FavoriteKind::Segment, id);
		if let Err(err) = save_favorites(&self.preview.favorites_path, &self.preview.favorites) {
			tracing::warn!(%err, "failed to persist favorites");
		}
		self.status = if now_favorite {
			format!("Segment {id} added to favorites")
		} else {
			format!("Segment {id} removed from favorites")
		};
	}

	fn committed_status(&self) -> String {
		match self.committed() {
			Some((start, end)) => format!("committed {} .. {}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d")),
			None => "no range committed".to_string(),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use chrono::{Datelike, NaiveDate, NaiveDateTime};

	use super::{range_text, run_picker, App, PickerOutcome, PreviewTarget};
	use crate::config::{PickerConfig, RangeSeed};
	use crate::favorites::Favorites;
	use crate::presets::QuickSelectPreset;
	use crate::selection::DateRange;

	fn date(year: i32, month: u32, day: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(year, month, day).unwrap()
	}

	fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
		date(year, month, day).and_hms_opt(hour, minute, 0).unwrap()
	}

	fn preview() -> PreviewTarget {
		PreviewTarget {
			segment_id: 1,
			favorites: Favorites::default(),
			favorites_path: PathBuf::from("unused.toml"),
		}
	}

	#[test]
	fn seeded_range_is_shown_but_not_committed() {
		let config = PickerConfig {
			is_open: true,
			initial_range: Some(RangeSeed {
				start: date(2023, 1, 10),
				end: Some(date(2023, 1, 28)),
			}),
			reference_month: None,
		};
		let app = App::new(&config, preview(), at(2024, 6, 1, 9, 0));
		assert_eq!(app.selector.reference_month(), date(2023, 1, 1));
		assert_eq!(app.cursor, date(2023, 1, 10));
		assert_eq!(app.outcome(), PickerOutcome::Closed);
	}

	#[test]
	fn cursor_moves_across_months_and_commits() {
		let mut app = App::new(&PickerConfig::default(), preview(), at(2024, 3, 10, 9, 7));
		assert_eq!(app.cursor, date(2024, 3, 1));

		app.select_cursor_day();
		app.move_cursor(-7);
		assert_eq!(app.selector.reference_month(), date(2024, 2, 1));
		app.select_cursor_day();

		app.step_time(1);
		assert_eq!(
			app.outcome(),
			PickerOutcome::Committed {
				start: date(2024, 2, 23),
				end: date(2024, 3, 1),
				instant: at(2024, 3, 11, 9, 5),
			}
		);
	}

	#[test]
	fn preset_then_reset_keeps_last_commit() {
		let mut app = App::new(&PickerConfig::default(), preview(), at(2024, 3, 10, 9, 0));
		app.apply_preset(QuickSelectPreset::LastQuarter, at(2024, 3, 10, 9, 0));
		assert_eq!(app.cursor, date(2023, 12, 1));
		assert_eq!(app.selector.reference_month(), date(2023, 12, 1));

		app.reset(date(2024, 3, 10));
		assert!(app.selector.range().is_empty());
		assert_eq!(app.committed(), Some((date(2023, 12, 1), date(2024, 2, 29))));
	}

	#[test]
	fn closed_config_returns_without_a_terminal() {
		let config = PickerConfig {
			is_open: false,
			..PickerConfig::default()
		};
		assert!(matches!(run_picker(&config, preview()), Ok(PickerOutcome::Closed)));
	}

	#[test]
	fn cursor_stops_at_the_calendar_edge() {
		let config = PickerConfig {
			reference_month: Some(NaiveDate::MAX),
			..PickerConfig::default()
		};
		let mut app = App::new(&config, preview(), at(2024, 3, 10, 9, 0));
		app.cursor = NaiveDate::MAX;

		app.move_cursor(1);
		assert_eq!(app.cursor, NaiveDate::MAX);
		assert!(app.status.starts_with("error"));

		app.status.clear();
		app.shift_month(1);
		assert_eq!(app.cursor, NaiveDate::MAX);
		assert!(app.status.starts_with("error"));

		app.move_cursor(i64::MAX);
		assert_eq!(app.cursor, NaiveDate::MAX);

		app.move_cursor(-31);
		assert!(app.cursor < NaiveDate::MAX);
		assert_eq!(app.selector.reference_month().month(), app.cursor.month());
	}

	#[test]
	fn failed_preset_keeps_previous_commit() {
		let mut app = App::new(&PickerConfig::default(), preview(), at(2024, 3, 10, 9, 0));
		app.apply_preset(QuickSelectPreset::Today, at(2024, 3, 10, 9, 0));
		app.apply_preset(QuickSelectPreset::LastMonth, NaiveDateTime::MIN);
		assert_eq!(app.committed(), Some((date(2024, 3, 10), date(2024, 3, 10))));
		assert_eq!(app.last_preset, Some(QuickSelectPreset::Today));
		assert!(app.status.contains("error"));
	}

	#[test]
	fn range_text_tracks_selection_progress() {
		assert_eq!(range_text(DateRange::empty()), "pick start day");
		assert_eq!(range_text(DateRange::starting_at(date(2024, 3, 4))), "03/04 - pick end");
		assert_eq!(
			range_text(DateRange::new(date(2024, 3, 9), date(2024, 3, 4))),
			"03/04 - 03/09"
		);
	}
}
