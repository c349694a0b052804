mod calendar;
mod config;
mod error;
mod favorites;
mod presets;
mod selection;
mod stepper;
mod traffic;
mod ui;

use std::error::Error;
use std::path::PathBuf;

use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::EnvFilter;

use crate::calendar::{build_month_grid, month_title, weeks, MonthOffset, WEEKDAY_HEADERS};
use crate::config::{load_config, resolve_config_path};
use crate::error::PickerError;
use crate::favorites::{favorites_path, load_favorites, save_favorites, FavoriteKind};
use crate::presets::QuickSelectPreset;
use crate::selection::{DateRange, RangeSelector};
use crate::stepper::{format_hour, format_minute_bucket, parse_date, parse_instant, Instant, StepUnit};
use crate::traffic::{compare_segments, daily_samples, summarize};
use crate::ui::{run_picker, PickerOutcome, PreviewTarget};

#[derive(Debug, Parser)]
#[command(name = "traffic-window", about = "Date and time window picker for traffic dashboards")]
struct Cli {
	#[arg(long)]
	config: Option<PathBuf>,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	Pick {
		#[arg(long, default_value_t = 1)]
		segment: u32,
	},
	Grid {
		#[arg(long)]
		month: Option<String>,
	},
	Preset {
		#[arg(long)]
		name: String,
		#[arg(long)]
		now: Option<String>,
	},
	Step {
		#[arg(long)]
		at: String,
		#[arg(long)]
		unit: String,
		#[arg(long, allow_hyphen_values = true)]
		amount: i64,
	},
	Select {
		#[arg(long = "click", required = true)]
		clicks: Vec<String>,
	},
	Traffic {
		#[arg(long)]
		segment: u32,
		#[arg(long)]
		from: Option<String>,
		#[arg(long)]
		to: Option<String>,
		#[arg(long)]
		seed: Option<u64>,
		#[arg(long)]
		json: bool,
	},
	Report {
		#[arg(long = "segment", required = true)]
		segments: Vec<u32>,
		#[arg(long)]
		seed: Option<u64>,
		#[arg(long)]
		json: bool,
	},
	Favorites {
		#[command(subcommand)]
		action: Option<FavoritesAction>,
	},
}

#[derive(Debug, Subcommand)]
enum FavoritesAction {
	List,
	Toggle {
		#[arg(long)]
		kind: String,
		#[arg(long)]
		id: u32,
	},
}

fn main() {
	init_tracing();

	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn init_tracing() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.try_init();
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();

	match cli.command.unwrap_or(Command::Pick { segment: 1 }) {
		Command::Pick { segment } => {
			let config_path = resolve_config_path(cli.config);
			let config = load_config(&config_path)?;
			let path = favorites_path();
			let preview = PreviewTarget {
				segment_id: segment,
				favorites: load_favorites(&path)?,
				favorites_path: path,
			};

			match run_picker(&config, preview)? {
				PickerOutcome::Committed { start, end, instant } => {
					println!(
						"{} {} {}",
						start.format("%Y-%m-%d"),
						end.format("%Y-%m-%d"),
						instant.format("%Y-%m-%dT%H:%M")
					);
				}
				PickerOutcome::Closed => println!("closed"),
			}
		}
		Command::Grid { month } => {
			let month = match month {
				Some(raw) => parse_month(&raw)?,
				None => Local::now().date_naive(),
			};
			print_grid(month)?;
		}
		Command::Preset { name, now } => {
			let preset = name.parse::<QuickSelectPreset>()?;
			let now = parse_now(now.as_deref())?;
			let (start, end) = preset.resolve(now)?.require_complete()?;
			println!("{} | {} | {}", preset.label(), start, end);
		}
		Command::Step { at, unit, amount } => {
			let current = parse_instant(&at)?;
			let unit = StepUnit::parse(&unit)?;
			let next = match unit {
				StepUnit::Day => stepper::step_day(current, amount)?,
				StepUnit::Hour => stepper::step_hour(current, amount)?,
				StepUnit::Minute => stepper::step_minute(current, amount)?,
			};
			println!(
				"{} | {} {}:{}",
				next.format("%Y-%m-%dT%H:%M"),
				next.format("%Y-%m-%d"),
				format_hour(next),
				format_minute_bucket(next)
			);
			println!("bucketed {}", Instant::new(next).bucketed().format("%Y-%m-%dT%H:%M"));
		}
		Command::Select { clicks } => {
			replay_clicks(&clicks)?;
		}
		Command::Traffic {
			segment,
			from,
			to,
			seed,
			json,
		} => {
			let range = traffic_range(from.as_deref(), to.as_deref())?;
			let mut rng = seeded_rng(seed);

			// One line per day, JSON Lines with --json.
			for day in daily_samples(segment, &range, &mut rng) {
				if json {
					println!("{}", serde_json::to_string(&day)?);
				} else {
					let summary = summarize(&day.samples);
					println!(
						"{} | avg {:.1} km/h | volume {} | slowest {}",
						day.date,
						summary.average_speed,
						summary.total_volume,
						summary.slowest_hour.as_deref().unwrap_or("-")
					);
				}
			}
		}
		Command::Report { segments, seed, json } => {
			let report = compare_segments(&segments, &mut seeded_rng(seed));

			if json {
				println!("{}", serde_json::to_string_pretty(&report)?);
			} else {
				for segment in &report.segments {
					println!(
						"segment {} | avg {:.1} km/h | max volume {}",
						segment.segment_id, segment.average_speed, segment.max_volume
					);
				}
				let show = |id: Option<u32>| id.map_or_else(|| "-".to_string(), |id| id.to_string());
				println!("fastest  {}", show(report.fastest));
				println!("slowest  {}", show(report.slowest));
				println!("busiest  {}", show(report.busiest));
				println!("quietest {}", show(report.quietest));
			}
		}
		Command::Favorites { action } => {
			let path = favorites_path();
			let mut favorites = load_favorites(&path)?;
			match action.unwrap_or(FavoritesAction::List) {
				FavoritesAction::List => {
					println!("intersections: {:?}", favorites.intersections);
					println!("segments: {:?}", favorites.segments);
				}
				FavoritesAction::Toggle { kind, id } => {
					let kind = kind.parse::<FavoriteKind>()?;
					let now_favorite = favorites.toggle(kind, id);
					save_favorites(&path, &favorites)?;
					println!("{} {id}", if now_favorite { "added" } else { "removed" });
				}
			}
		}
	}

	Ok(())
}

fn parse_month(input: &str) -> Result<NaiveDate, PickerError> {
	parse_date(&format!("{input}-01")).or_else(|_| parse_date(input))
}

fn parse_now(input: Option<&str>) -> Result<NaiveDateTime, PickerError> {
	match input {
		Some(raw) => parse_instant(raw),
		None => Ok(Local::now().naive_local()),
	}
}

fn traffic_range(from: Option<&str>, to: Option<&str>) -> Result<DateRange, PickerError> {
	let today = Local::now().date_naive();
	let start = from.map(parse_date).transpose()?.unwrap_or(today);
	let end = to.map(parse_date).transpose()?.unwrap_or(start);
	Ok(DateRange::new(start, end))
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
	match seed {
		Some(seed) => StdRng::seed_from_u64(seed),
		None => StdRng::from_entropy(),
	}
}

fn print_grid(month: NaiveDate) -> Result<(), PickerError> {
	let grid = build_month_grid(month)?;
	println!("{}", month_title(month));
	println!("{}", WEEKDAY_HEADERS.map(|header| format!(" {header} ")).join(""));

	for week in weeks(&grid) {
		let row = week
			.iter()
			.map(|cell| match cell.month_offset {
				MonthOffset::Current => format!(" {:>2} ", cell.day_number),
				MonthOffset::Prev | MonthOffset::Next => format!("[{:>2}]", cell.day_number),
			})
			.collect::<String>();
		println!("{row}");
	}

	Ok(())
}

fn replay_clicks(clicks: &[String]) -> Result<(), PickerError> {
	let dates = clicks
		.iter()
		.map(|raw| parse_date(raw))
		.collect::<Result<Vec<_>, _>>()?;
	let reference_month = dates.first().copied().unwrap_or_else(|| Local::now().date_naive());

	let mut selector = RangeSelector::new(reference_month, |start, end| {
		println!("committed {start} .. {end}");
	});
	for date in dates {
		selector.select_day(date);
	}

	if let Some(start) = selector.range().start() {
		if selector.range().end().is_none() {
			println!("pending start {start}");
		}
	}

	Ok(())
}
