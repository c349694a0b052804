use std::env;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::selection::DateRange;

const CONFIG_FILE: &str = "config.toml";
const STATE_DIR_NAME: &str = "traffic_window";

#[derive(Debug)]
pub enum ConfigError {
	Io(std::io::Error),
	TomlDecode(toml::de::Error),
}

impl Display for ConfigError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			ConfigError::Io(err) => write!(f, "io error: {err}"),
			ConfigError::TomlDecode(err) => write!(f, "failed to parse picker config: {err}"),
		}
	}
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSeed {
	pub start: NaiveDate,
	#[serde(default)]
	pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickerConfig {
	pub is_open: bool,
	pub initial_range: Option<RangeSeed>,
	pub reference_month: Option<NaiveDate>,
}

impl Default for PickerConfig {
	fn default() -> Self {
		Self {
			is_open: true,
			initial_range: None,
			reference_month: None,
		}
	}
}

impl PickerConfig {
	pub fn initial_range(&self) -> DateRange {
		match self.initial_range {
			Some(RangeSeed { start, end: Some(end) }) => DateRange::new(start, end),
			Some(RangeSeed { start, end: None }) => DateRange::starting_at(start),
			None => DateRange::empty(),
		}
	}

	/// Month shown first: explicit setting, else the seeded start, else `today`.
	pub fn reference_month(&self, today: NaiveDate) -> NaiveDate {
		self.reference_month
			.or_else(|| self.initial_range().start())
			.unwrap_or(today)
	}
}

pub fn resolve_config_path(cli_path: Option<PathBuf>) -> PathBuf {
	if let Some(path) = cli_path {
		return path;
	}

	if let Some(path) = env::var_os("TRAFFIC_WINDOW_CONFIG") {
		let path = PathBuf::from(path);
		if !path.as_os_str().is_empty() {
			return path;
		}
	}

	state_dir().join(CONFIG_FILE)
}

pub fn load_config(path: &Path) -> Result<PickerConfig, ConfigError> {
	let raw = match fs::read_to_string(path) {
		Ok(raw) => raw,
		Err(err) if err.kind() == ErrorKind::NotFound => {
			tracing::debug!(path = %path.display(), "no picker config, using defaults");
			return Ok(PickerConfig::default());
		}
		Err(err) => return Err(ConfigError::Io(err)),
	};

	toml::from_str(&raw).map_err(ConfigError::TomlDecode)
}

pub fn state_dir() -> PathBuf {
	if let Some(path) = env::var_os("TRAFFIC_WINDOW_STATE_DIR") {
		return PathBuf::from(path);
	}

	#[cfg(target_os = "windows")]
	{
		if let Some(path) = env::var_os("LOCALAPPDATA") {
			return PathBuf::from(path).join(STATE_DIR_NAME);
		}
	}

	if let Some(path) = env::var_os("XDG_STATE_HOME") {
		return PathBuf::from(path).join(STATE_DIR_NAME);
	}

	if let Some(path) = env::var_os("HOME") {
		return PathBuf::from(path)
			.join(".local")
			.join("state")
			.join(STATE_DIR_NAME);
	}

	PathBuf::from(format!(".{STATE_DIR_NAME}"))
}
