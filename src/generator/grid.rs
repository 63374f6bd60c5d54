/*
grid.rs

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

//! Mutable grid interface shared by the generators.
//!
//! Each generator keeps its own cell representation.
//! The generation stages (placement, mechanics, rebalance) only talk to the grid through the
//! [`LevelGrid`] trait, so that the same stages drive both representations.

use std::collections::BTreeMap;

use super::geometry::{Direction, Grid, Position, positions};
use crate::config::{Color, ElementKind};

/// Mechanic to install on a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Mechanic {
    /// Pipe housing on an existing block. The contents are added later.
    Pipe { direction: Direction, capacity: usize },

    /// Moving belt housing on an existing block. The contents are added later.
    Moving { direction: Direction, capacity: usize },

    /// Lock on an existing block. The block keeps its color.
    Lock { id: u32 },

    /// Key on an existing plain block. The block keeps its color.
    Key { id: u32 },

    /// Colored mechanic (bomb, ice, barrel) on an empty cell.
    ColorElement { kind: ElementKind, color: Color },

    /// Non-color obstacle (barrier, pull-pin) on an empty cell.
    Obstacle {
        kind: ElementKind,
        direction: Option<Direction>,
    },
}

/// Mutable access to a generator board.
pub trait LevelGrid: Grid {
    /// Put a plain color block on an empty cell.
    fn place_block(&mut self, position: Position, color: Color);

    /// Install a mechanic on a cell.
    fn apply(&mut self, position: Position, mechanic: Mechanic);

    /// Remove the mechanic from a lock or a key cell. The cell becomes a plain block again.
    fn revert(&mut self, position: Position);

    /// Color of a colored block, or None for empty cells and non-color mechanics.
    fn color_at(&self, position: Position) -> Option<&Color>;

    /// Change the color of a colored block.
    fn repaint(&mut self, position: Position, color: Color);

    /// Whether the cell is a colored block with no mechanic.
    fn is_plain(&self, position: Position) -> bool;

    /// Whether the cell color is bound to a lock and must not change.
    fn is_lock(&self, position: Position) -> bool;

    /// Pipes and moving belts, in placement order.
    fn containers(&self) -> &[Position];

    /// Number of colors the container holds once filled.
    fn capacity(&self, position: Position) -> usize;

    /// Enlarge a container.
    fn grow_capacity(&mut self, position: Position, extra: usize);

    /// Colors currently held by the container.
    fn contents(&self, position: Position) -> &[Color];

    /// Mutable access to the container colors.
    fn contents_mut(&mut self, position: Position) -> Option<&mut Vec<Color>>;
}

/// Return the plain blocks in row-major order.
pub fn plain_positions<G: LevelGrid + ?Sized>(grid: &G) -> Vec<Position> {
    positions(grid.width(), grid.height())
        .filter(|p| grid.is_plain(*p))
        .collect()
}

/// Number of colored board cells (contents excluded).
pub fn colored_count<G: LevelGrid + ?Sized>(grid: &G) -> usize {
    positions(grid.width(), grid.height())
        .filter(|p| grid.color_at(*p).is_some())
        .count()
}

/// Total capacity of the containers.
pub fn reserved_capacity<G: LevelGrid + ?Sized>(grid: &G) -> usize {
    grid.containers().iter().map(|p| grid.capacity(*p)).sum()
}

/// Occurrences of each color on the board (board cells only).
pub fn board_color_totals<G: LevelGrid + ?Sized>(grid: &G) -> BTreeMap<Color, usize> {
    let mut totals: BTreeMap<Color, usize> = BTreeMap::new();
    for p in positions(grid.width(), grid.height()) {
        if let Some(color) = grid.color_at(p) {
            *totals.entry(color.clone()).or_insert(0) += 1;
        }
    }
    totals
}

/// Occurrences of each color, including the container contents.
pub fn color_totals<G: LevelGrid + ?Sized>(grid: &G) -> BTreeMap<Color, usize> {
    let mut totals: BTreeMap<Color, usize> = board_color_totals(grid);
    for p in grid.containers() {
        for color in grid.contents(*p) {
            *totals.entry(color.clone()).or_insert(0) += 1;
        }
    }
    totals
}
