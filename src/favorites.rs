use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::state_dir;
use crate::error::PickerError;

const FAVORITES_FILE: &str = "favorites.toml";

#[derive(Debug)]
pub enum FavoritesError {
    Io(std::io::Error),
    TomlDecode(toml::de::Error),
    TomlEncode(toml::ser::Error),
}

impl Display for FavoritesError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FavoritesError::Io(err) => write!(f, "io error: {err}"),
            FavoritesError::TomlDecode(err) => write!(f, "failed to parse favorites: {err}"),
            FavoritesError::TomlEncode(err) => write!(f, "failed to encode favorites: {err}"),
        }
    }
}

impl std::error::Error for FavoritesError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteKind {
    Intersection,
    Segment,
}

impl FromStr for FavoriteKind {
    type Err = PickerError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "intersection" | "intersections" => Ok(FavoriteKind::Intersection),
            "segment" | "segments" | "road-segment" => Ok(FavoriteKind::Segment),
            _ => Err(PickerError::invalid(format!("unknown favorite kind: {raw}"))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Favorites {
    pub intersections: BTreeSet<u32>,
    pub segments: BTreeSet<u32>,
}

impl Favorites {
    fn ids_mut(&mut self, kind: FavoriteKind) -> &mut BTreeSet<u32> {
        match kind {
            FavoriteKind::Intersection => &mut self.intersections,
            FavoriteKind::Segment => &mut self.segments,
        }
    }

    pub fn contains(&self, kind: FavoriteKind, id: u32) -> bool {
        match kind {
            FavoriteKind::Intersection => self.intersections.contains(&id),
            FavoriteKind::Segment => self.segments.contains(&id),
        }
    }

    /// Flips membership and reports whether `id` is now a favorite.
    pub fn toggle(&mut self, kind: FavoriteKind, id: u32) -> bool {
        let ids = self.ids_mut(kind);
        if ids.remove(&id) {
            false
        } else {
            ids.insert(id);
            true
        }
    }
}

pub fn favorites_path() -> PathBuf {
    state_dir().join(FAVORITES_FILE)
}

pub fn load_favorites(path: &Path) -> Result<Favorites, FavoritesError> {
    let raw = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Favorites::default()),
        Err(err) => return Err(FavoritesError::Io(err)),
    };

    if raw.trim().is_empty() {
        return Ok(Favorites::default());
    }

    toml::from_str(&raw).map_err(FavoritesError::TomlDecode)
}

pub fn save_favorites(path: &Path, favorites: &Favorites) -> Result<(), FavoritesError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(FavoritesError::Io)?;
        }
    }

    let encoded = toml::to_string_pretty(favorites).map_err(FavoritesError::TomlEncode)?;
    fs::write(path, encoded).map_err(FavoritesError::Io)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::{FavoriteKind, Favorites, load_favorites, save_favorites};

    #[test]
    fn toggle_adds_then_removes() {
        let mut favorites = Favorites::default();
        assert!(favorites.toggle(FavoriteKind::Segment, 4));
        assert!(favorites.contains(FavoriteKind::Segment, 4));
        assert!(!favorites.contains(FavoriteKind::Intersection, 4));
        assert!(!favorites.toggle(FavoriteKind::Segment, 4));
        assert!(favorites.segments.is_empty());
    }

    #[test]
    fn persists_between_loads() {
        let path = temp_file("traffic_window_favorites.toml");
        let mut favorites = load_favorites(&path).expect("missing file loads empty");
        assert_eq!(favorites, Favorites::default());

        favorites.toggle(FavoriteKind::Intersection, 12);
        favorites.toggle(FavoriteKind::Segment, 3);
        save_favorites(&path, &favorites).expect("save should succeed");

        let loaded = load_favorites(&path).expect("load should succeed");
        assert_eq!(loaded, favorites);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn parses_kind_names() {
        assert_eq!("Segment".parse::<FavoriteKind>().ok(), Some(FavoriteKind::Segment));
        assert!("bridge".parse::<FavoriteKind>().is_err());
    }

    fn temp_file(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("{}_{}", name, std::process::id()));
        path
    }
}
