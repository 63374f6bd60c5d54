/*
errors.rs

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

//! Errors raised while generating a level.
//!
//! Fatal errors are grouped in [`GenerationError`].
//! Mechanics that cannot be placed as many times as requested are not errors: they are
//! reported as [`ElementShortfall`] records.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::{Color, ElementKind};

/// Malformed [`crate::config::LevelConfig`] object.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("grid dimensions must be positive (got {width}x{height})")]
    ZeroDimension { width: usize, height: usize },

    #[error("grid {width}x{height} exceeds the {max}x{max} limit")]
    GridTooLarge {
        width: usize,
        height: usize,
        max: usize,
    },

    #[error("no color selected")]
    NoColors,

    #[error("color {0} is selected twice")]
    DuplicateColor(Color),

    #[error("the block count must be positive")]
    ZeroBlocks,

    #[error("{block_count} blocks do not fit in a grid of {cells} cells")]
    BlockCountExceedsGrid { block_count: usize, cells: usize },
}

/// The block count cannot be split between the colors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DistributionError {
    #[error("{block_count} blocks cannot be split in multiples of {divisor} over {color_count} colors")]
    Indivisible {
        block_count: usize,
        color_count: usize,
        divisor: usize,
    },

    #[error("{reserved} cells reserved for mechanics leave no room in {block_count} blocks")]
    ReservedExceedsBudget { reserved: usize, block_count: usize },

    #[error("no color to distribute")]
    NoColors,

    #[error("{odd} colors need an odd count but a symmetric board only has {singles} unpaired cells")]
    SymmetricParity { odd: usize, singles: usize },
}

/// A generated board breaks one of the level invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("board holds {actual} colored cells instead of {expected}")]
    BlockCount { expected: usize, actual: usize },

    #[error("color {color} has {count} cells (target {target}, divisor {divisor})")]
    Imbalance {
        color: Color,
        count: usize,
        target: usize,
        divisor: usize,
    },

    #[error("only {reached} of {total} block cells are connected")]
    Disconnected { reached: usize, total: usize },

    #[error("container at ({x}, {y}) does not point at a block")]
    PipeDirection { x: usize, y: usize },

    #[error("lock {lock_id} has {keys} keys")]
    LockPairing { lock_id: u32, keys: usize },

    #[error("key {key_id} at ({x}, {y}) is not on a plain colored block")]
    KeyPlacement { key_id: u32, x: usize, y: usize },

    #[error("cell ({x}, {y}) has no matching mirror cell")]
    Symmetry { x: usize, y: usize },
}

/// Fatal generation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("color distribution failed: {0}")]
    Distribution(#[from] DistributionError),

    #[error("placed {placed} of {required} blocks before running out of room")]
    PlacementExhausted { placed: usize, required: usize },

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// A mechanic could not be placed as many times as requested.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementShortfall {
    pub kind: ElementKind,
    pub requested: usize,
    pub placed: usize,
}

impl fmt::Display for ElementShortfall {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}: placed {} of {}",
            self.kind, self.placed, self.requested
        )
    }
}
