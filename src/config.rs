/*
config.rs

Copyright 2025 Hervé Quatremain

This file is part of Tilegen.

Tilegen is free software: you can redistribute it and/or modify it under the
terms of the GNU General Public License as published by the Free Software
Foundation, either version 3 of the License, or (at your option) any later
version.

Tilegen is distributed in the hope that it will be useful, but WITHOUT ANY
WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR
A PARTICULAR PURPOSE. See the GNU General Public License for more details.

You should have received a copy of the GNU General Public License along with
Tilegen. If not, see <https://www.gnu.org/licenses/>.

SPDX-License-Identifier: GPL-3.0-or-later
*/

//! Level generation request.
//!
//! A [`LevelConfig`] object describes the board to generate: grid size, number of colored
//! blocks, color palette, layout mode, requested mechanics, and difficulty.
//! The object is usually built by the caller, or loaded from a JSON file with
//! [`LevelConfig::from_json_file`].

use clap::ValueEnum;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::ops::RangeInclusive;
use std::path::Path;
use strum_macros::Display;

use crate::errors::ConfigError;

/// Long version text for the command-line tool.
pub const COPYRIGHT_NOTICE: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "
Copyright 2025 Hervé Quatremain
License GPLv3+: GNU GPL version 3 or later <https://gnu.org/licenses/gpl.html>.
This is free software: you are free to change and redistribute it.
There is NO WARRANTY, to the extent permitted by law."
);

/// Largest accepted grid dimension.
pub const MAX_DIMENSION: usize = 30;

/// Block color.
///
/// Colors are identified by their name, such as `Red` or `Blue`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    /// Create a [`Color`] object from its name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Return the color name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Color {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Board layout mode.
#[derive(
    Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, Default, ValueEnum, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GenerationMode {
    /// Blocks grow from the center in any direction.
    #[default]
    Random,

    /// Blocks are mirrored around the vertical center column.
    Symmetric,
}

/// Level difficulty.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Copy,
    Clone,
    PartialOrd,
    PartialEq,
    Eq,
    Hash,
    Default,
    ValueEnum,
    Display,
)]
pub enum Difficulty {
    #[default]
    Normal,
    Hard,
    #[serde(rename = "Super Hard")]
    #[strum(serialize = "Super Hard")]
    SuperHard,
}

impl Difficulty {
    /// Number of colors a pipe holds.
    pub fn pipe_size_range(self) -> RangeInclusive<usize> {
        match self {
            Difficulty::Normal => 1..=4,
            Difficulty::Hard => 4..=6,
            Difficulty::SuperHard => 6..=8,
        }
    }

    /// Number of colors a moving belt carries.
    pub fn moving_distance_range(self) -> RangeInclusive<usize> {
        match self {
            Difficulty::Normal => 1..=2,
            Difficulty::Hard => 2..=3,
            Difficulty::SuperHard => 3..=4,
        }
    }

    /// Multiplier applied to the difficulty score.
    pub fn score_factor(self) -> f64 {
        match self {
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 1.25,
            Difficulty::SuperHard => 1.5,
        }
    }
}

/// Mechanics that can be requested in addition to the plain color blocks.
#[derive(
    Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display,
)]
pub enum ElementKind {
    /// Holds a queue of colors and pushes them into an adjacent block.
    Pipe,

    /// Lock cell unlocked by picking its paired key cell.
    BlockLock,

    Bomb,
    Ice,
    Barrel,

    /// Non-color obstacle.
    Barrier,

    /// Non-color pin that points at an adjacent block.
    PullPin,

    /// Belt that carries a queue of colors toward an adjacent block.
    Moving,
}

impl ElementKind {
    /// All the element kinds.
    pub const ALL: [ElementKind; 8] = [
        ElementKind::Pipe,
        ElementKind::BlockLock,
        ElementKind::Bomb,
        ElementKind::Ice,
        ElementKind::Barrel,
        ElementKind::Barrier,
        ElementKind::PullPin,
        ElementKind::Moving,
    ];

    /// Whether the element is a non-color housing that holds colors (pipes and belts).
    pub fn is_container(self) -> bool {
        matches!(self, ElementKind::Pipe | ElementKind::Moving)
    }

    /// Whether the element is a colored block grown next to the board (bomb, ice, barrel).
    pub fn is_color_element(self) -> bool {
        matches!(
            self,
            ElementKind::Bomb | ElementKind::Ice | ElementKind::Barrel
        )
    }

    /// Whether the element is a non-color obstacle grown next to the board.
    pub fn is_obstacle(self) -> bool {
        matches!(self, ElementKind::Barrier | ElementKind::PullPin)
    }

    /// Weight of the element in the difficulty score.
    pub fn score_weight(self) -> u32 {
        match self {
            ElementKind::Pipe => 8,
            ElementKind::BlockLock => 10,
            ElementKind::Bomb => 6,
            ElementKind::Ice => 5,
            ElementKind::Barrel => 5,
            ElementKind::Barrier => 3,
            ElementKind::PullPin => 7,
            ElementKind::Moving => 9,
        }
    }

    /// Parse an element name. The comparison is case insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        let name: String = name.trim().to_lowercase().replace(['-', '_', ' '], "");
        ElementKind::ALL
            .into_iter()
            .find(|k| k.to_string().to_lowercase() == name)
    }
}

/// Level generation request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LevelConfig {
    /// Number of columns.
    pub width: usize,

    /// Number of rows.
    pub height: usize,

    /// Exact number of colored cells, including the colors held in pipes and belts.
    pub block_count: usize,

    /// Number of colors. Synchronized with [`LevelConfig::selected_colors`] by
    /// [`LevelConfig::normalized`].
    #[serde(default)]
    pub color_count: usize,

    /// Color palette.
    pub selected_colors: Vec<Color>,

    #[serde(default)]
    pub generation_mode: GenerationMode,

    /// Requested number of instances for each mechanic.
    #[serde(default)]
    pub elements: BTreeMap<ElementKind, usize>,

    #[serde(default)]
    pub difficulty: Difficulty,
}

impl LevelConfig {
    /// Create a [`LevelConfig`] object for a random layout with no mechanics.
    pub fn new(width: usize, height: usize, block_count: usize, colors: &[&str]) -> Self {
        Self {
            width,
            height,
            block_count,
            color_count: colors.len(),
            selected_colors: colors.iter().map(|c| Color::from(*c)).collect(),
            generation_mode: GenerationMode::Random,
            elements: BTreeMap::new(),
            difficulty: Difficulty::Normal,
        }
    }

    /// Set the layout mode.
    pub fn with_mode(mut self, mode: GenerationMode) -> Self {
        self.generation_mode = mode;
        self
    }

    /// Set the difficulty.
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Request `count` instances of the given mechanic.
    pub fn with_element(mut self, kind: ElementKind, count: usize) -> Self {
        self.elements.insert(kind, count);
        self
    }

    /// Number of requested instances for the given mechanic.
    pub fn requested(&self, kind: ElementKind) -> usize {
        self.elements.get(&kind).copied().unwrap_or(0)
    }

    /// Load a [`LevelConfig`] object from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        debug!("Loading level configuration from {path:?}");
        let file: File = File::open(path)?;
        let reader: BufReader<File> = BufReader::new(file);
        let config: LevelConfig = serde_json::from_reader(reader)?;
        Ok(config)
    }

    /// Verify that the configuration can be used for generating a board.
    ///
    /// # Errors
    ///
    /// The method does not repair the configuration: it returns an error for zero or oversized
    /// dimensions, an empty or duplicated palette, or a block count that cannot fit the grid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::ZeroDimension {
                width: self.width,
                height: self.height,
            });
        }
        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(ConfigError::GridTooLarge {
                width: self.width,
                height: self.height,
                max: MAX_DIMENSION,
            });
        }
        if self.selected_colors.is_empty() {
            return Err(ConfigError::NoColors);
        }
        let mut seen: HashSet<&Color> = HashSet::with_capacity(self.selected_colors.len());
        for color in &self.selected_colors {
            if !seen.insert(color) {
                return Err(ConfigError::DuplicateColor(color.clone()));
            }
        }
        if self.block_count == 0 {
            return Err(ConfigError::ZeroBlocks);
        }
        let cells: usize = self.width * self.height;
        if self.block_count > cells {
            return Err(ConfigError::BlockCountExceedsGrid {
                block_count: self.block_count,
                cells,
            });
        }
        if self.selected_colors.len() < 2 {
            warn!("Only one color selected: the level is trivial to solve");
        }
        Ok(())
    }

    /// Return a copy of the configuration with a consistent color count and without zero
    /// element entries.
    pub fn normalized(&self) -> Self {
        let mut config: LevelConfig = self.clone();
        if config.color_count != config.selected_colors.len() {
            if config.color_count != 0 {
                warn!(
                    "Color count {} does not match the {} selected colors, using the selected colors",
                    config.color_count,
                    config.selected_colors.len()
                );
            }
            config.color_count = config.selected_colors.len();
        }
        config.elements.retain(|_, count| *count > 0);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_json_names() {
        let config: LevelConfig = LevelConfig::new(9, 10, 27, &["Red", "Blue", "Green"])
            .with_mode(GenerationMode::Symmetric)
            .with_difficulty(Difficulty::SuperHard)
            .with_element(ElementKind::PullPin, 2);
        let json: String = serde_json::to_string(&config).unwrap();

        assert!(json.contains("\"blockCount\":27"));
        assert!(json.contains("\"selectedColors\":[\"Red\",\"Blue\",\"Green\"]"));
        assert!(json.contains("\"generationMode\":\"symmetric\""));
        assert!(json.contains("\"difficulty\":\"Super Hard\""));
        assert!(json.contains("\"PullPin\":2"));

        let back: LevelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn missing_optional_fields_use_defaults() {
        let json: &str =
            r#"{"width": 7, "height": 7, "blockCount": 18, "selectedColors": ["Red", "Blue"]}"#;
        let config: LevelConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.generation_mode, GenerationMode::Random);
        assert_eq!(config.difficulty, Difficulty::Normal);
        assert!(config.elements.is_empty());
        assert_eq!(config.normalized().color_count, 2);
    }

    #[test]
    fn validation_rejects_malformed_configs() {
        assert_eq!(
            LevelConfig::new(0, 5, 3, &["Red"]).validate(),
            Err(ConfigError::ZeroDimension {
                width: 0,
                height: 5
            })
        );
        assert_eq!(
            LevelConfig::new(5, 5, 3, &[]).validate(),
            Err(ConfigError::NoColors)
        );
        assert_eq!(
            LevelConfig::new(5, 5, 3, &["Red", "Red"]).validate(),
            Err(ConfigError::DuplicateColor(Color::from("Red")))
        );
        assert_eq!(
            LevelConfig::new(3, 3, 10, &["Red", "Blue"]).validate(),
            Err(ConfigError::BlockCountExceedsGrid {
                block_count: 10,
                cells: 9
            })
        );
        assert!(LevelConfig::new(9, 10, 27, &["Red", "Blue", "Green"])
            .validate()
            .is_ok());
    }

    #[test]
    fn normalization_drops_zero_elements() {
        let mut config: LevelConfig = LevelConfig::new(9, 9, 18, &["Red", "Blue"])
            .with_element(ElementKind::Pipe, 0)
            .with_element(ElementKind::Ice, 1);
        config.color_count = 5;
        let normalized: LevelConfig = config.normalized();

        assert_eq!(normalized.color_count, 2);
        assert_eq!(normalized.elements.len(), 1);
        assert_eq!(normalized.requested(ElementKind::Ice), 1);
    }

    #[test]
    fn element_names() {
        assert_eq!(ElementKind::from_name("pipe"), Some(ElementKind::Pipe));
        assert_eq!(ElementKind::from_name("Pull-Pin"), Some(ElementKind::PullPin));
        assert_eq!(ElementKind::from_name("block_lock"), Some(ElementKind::BlockLock));
        assert_eq!(ElementKind::from_name("dragon"), None);
        assert_eq!(Difficulty::SuperHard.to_string(), "Super Hard");
    }
}
