/*
level.rs

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

//! Generated level.
//!
//! A [`GeneratedLevel`] object wraps the canonical board with the configuration that produced
//! it and with a few views computed for the consumers: the pipe and lock lists, the color
//! trays, and a difficulty score.
//! The object is serialized to JSON with camel case field names.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{Color, LevelConfig};
use crate::errors::ElementShortfall;
use crate::generator::adapter::GeneratorKind;
use crate::generator::board::{Board, Element};
use crate::generator::geometry::{Direction, Position};
use crate::generator::pipeline::GeneratorOutput;

/// Number of slots in a color tray.
pub const CONTAINER_SLOTS: usize = 3;

/// Flattened description of a pipe.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PipeInfo {
    pub id: usize,
    pub contents: Vec<Color>,
    pub direction: Option<Direction>,
    pub position: Position,
}

/// Flattened description of a lock and its key.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LockInfo {
    pub id: u32,
    pub lock_position: Position,
    pub key_position: Option<Position>,
    pub color: Option<Color>,
}

/// Tray where the player collects blocks of one color.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Container {
    pub id: usize,
    pub color: Color,
    pub slots: usize,
}

/// Generated level.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedLevel {
    /// Level identifier, such as `level-20250314093000-1a2b3c4d`.
    pub id: String,

    /// Normalized configuration.
    pub config: LevelConfig,

    pub board: Board,

    pub containers: Vec<Container>,

    pub difficulty_score: u32,

    /// Always true: connected boards are considered solvable.
    pub solvable: bool,

    pub timestamp: DateTime<Utc>,

    /// Generator that produced the board.
    pub generator: GeneratorKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipe_info: Option<Vec<PipeInfo>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_info: Option<Vec<LockInfo>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shortfalls: Vec<ElementShortfall>,
}

impl GeneratedLevel {
    /// Wrap a generated board.
    pub fn new<R: Rng>(config: LevelConfig, output: GeneratorOutput, rng: &mut R) -> Self {
        let timestamp: DateTime<Utc> = Utc::now();
        let id: String = format!(
            "level-{}-{:08x}",
            timestamp.format("%Y%m%d%H%M%S"),
            rng.random::<u32>()
        );
        let pipes: Vec<PipeInfo> = pipe_info(&output.board);
        let locks: Vec<LockInfo> = lock_info(&output.board);

        Self {
            id,
            containers: build_containers(&output.plan.targets, rng),
            difficulty_score: difficulty_score(&config),
            config,
            board: output.board,
            solvable: true,
            timestamp,
            generator: output.kind,
            pipe_info: Some(pipes).filter(|p| !p.is_empty()),
            lock_info: Some(locks).filter(|l| !l.is_empty()),
            shortfalls: output.shortfalls,
        }
    }
}

/// Compute the difficulty score.
///
/// The score grows with the grid size, the number of colors and blocks, and the requested
/// mechanics. The difficulty level multiplies the result.
pub fn difficulty_score(config: &LevelConfig) -> u32 {
    let area: f64 = (config.width * config.height) as f64 / 4.0;
    let colors: f64 = config.selected_colors.len() as f64 * 6.0;
    let blocks: f64 = config.block_count as f64 / 3.0;
    let mechanics: f64 = config
        .elements
        .iter()
        .map(|(kind, count)| f64::from(kind.score_weight()) * *count as f64)
        .sum();
    let score: f64 = (area + colors + blocks + mechanics) * config.difficulty.score_factor();
    score.round() as u32
}

/// Build one tray for every three blocks of each color, in random order.
pub fn build_containers<R: Rng>(targets: &BTreeMap<Color, usize>, rng: &mut R) -> Vec<Container> {
    let mut colors: Vec<Color> = targets
        .iter()
        .flat_map(|(color, target)| {
            std::iter::repeat_n(color.clone(), target.div_ceil(CONTAINER_SLOTS))
        })
        .collect();
    colors.shuffle(rng);
    colors
        .into_iter()
        .enumerate()
        .map(|(i, color)| Container {
            id: i + 1,
            color,
            slots: CONTAINER_SLOTS,
        })
        .collect()
}

/// List the pipes in row-major order.
pub fn pipe_info(board: &Board) -> Vec<PipeInfo> {
    board
        .iter()
        .filter(|(_, c)| c.element == Some(Element::Pipe))
        .enumerate()
        .map(|(i, (position, cell))| PipeInfo {
            id: i + 1,
            contents: cell.contents().to_vec(),
            direction: cell.pipe_direction,
            position,
        })
        .collect()
}

/// List the locks, sorted by identifier, with the position of their key.
pub fn lock_info(board: &Board) -> Vec<LockInfo> {
    let keys: BTreeMap<u32, Position> = board
        .iter()
        .filter_map(|(p, c)| c.key_id.map(|id| (id, p)))
        .collect();
    let mut locks: Vec<LockInfo> = board
        .iter()
        .filter_map(|(p, c)| {
            c.lock_id.map(|id| LockInfo {
                id,
                lock_position: p,
                key_position: keys.get(&id).copied(),
                color: c.color.clone(),
            })
        })
        .collect();
    locks.sort_by_key(|l| l.id);
    locks
}
