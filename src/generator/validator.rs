/*
validator.rs

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

//! Verify the level invariants on a canonical board.
//!
//! The checks never modify the board.

use serde::Serialize;
use std::collections::BTreeMap;

use super::board::{Board, BoardCell, Element};
use super::geometry::{Grid, Position, block_positions, flood_fill, mirror, step};
use crate::config::Color;
use crate::errors::ValidationError;

/// Expected properties of a board.
#[derive(Debug, Clone, PartialEq)]
pub struct Expectation {
    /// Number of colored cells, container contents included.
    pub block_count: usize,

    /// Color count granularity.
    pub divisor: usize,

    /// Planned count of each color.
    pub targets: BTreeMap<Color, usize>,

    /// Accepted difference between a color count and its target, when not strict.
    pub tolerance: usize,

    /// Whether every color count must be a multiple of the divisor.
    pub strict: bool,

    /// Whether the board must be mirrored around the center column.
    pub symmetric: bool,

    /// Selected colors.
    pub colors: Vec<Color>,
}

/// Counts observed on a valid board.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub colored_cells: usize,
    pub content_cells: usize,
    pub block_cells: usize,
    pub color_totals: BTreeMap<Color, usize>,
    pub containers: usize,
    pub locks: usize,
}

/// Verify the board.
///
/// The checks run in order: total count, color balance, connectivity, container directions,
/// lock and key pairing, and symmetry.
///
/// # Errors
///
/// The method returns the first failed check, with the observed and expected values.
pub fn validate(
    board: &Board,
    expectation: &Expectation,
) -> Result<ValidationSummary, ValidationError> {
    let colored_cells: usize = board.colored_cells();
    let content_cells: usize = board.content_cells();
    let total: usize = colored_cells + content_cells;
    if total != expectation.block_count {
        return Err(ValidationError::BlockCount {
            expected: expectation.block_count,
            actual: total,
        });
    }

    let color_totals: BTreeMap<Color, usize> = board.color_totals();
    check_balance(&color_totals, expectation)?;

    let blocks: Vec<Position> = block_positions(board);
    if let Some(start) = blocks.first() {
        let reached: usize = flood_fill(board, *start);
        if reached != blocks.len() {
            return Err(ValidationError::Disconnected {
                reached,
                total: blocks.len(),
            });
        }
    }

    let containers: usize = check_containers(board)?;
    let locks: usize = check_locks(board)?;
    if expectation.strict && expectation.symmetric {
        check_symmetry(board)?;
    }

    Ok(ValidationSummary {
        colored_cells,
        content_cells,
        block_cells: blocks.len(),
        color_totals,
        containers,
        locks,
    })
}

fn check_balance(
    totals: &BTreeMap<Color, usize>,
    expectation: &Expectation,
) -> Result<(), ValidationError> {
    for color in &expectation.colors {
        let count: usize = totals.get(color).copied().unwrap_or(0);
        let target: usize = expectation.targets.get(color).copied().unwrap_or(0);
        let balanced: bool = if expectation.strict {
            count % expectation.divisor.max(1) == 0
        } else {
            count.abs_diff(target) <= expectation.tolerance
        };
        if !balanced {
            return Err(ValidationError::Imbalance {
                color: color.clone(),
                count,
                target,
                divisor: expectation.divisor,
            });
        }
    }
    Ok(())
}

/// Pipes and moving belts must point at a block.
fn check_containers(board: &Board) -> Result<usize, ValidationError> {
    let mut count: usize = 0;
    for (p, cell) in board.iter() {
        if !matches!(cell.element, Some(Element::Pipe) | Some(Element::Moving)) {
            continue;
        }
        count += 1;
        let target: Option<Position> = cell
            .container_direction()
            .and_then(|d| step(p, d, board.width(), board.height()));
        if !target.is_some_and(|t| board.is_block(t)) {
            return Err(ValidationError::PipeDirection { x: p.x, y: p.y });
        }
    }
    Ok(count)
}

/// Every lock must have exactly one key, and every key must sit on a colored block with no
/// other mechanic.
fn check_locks(board: &Board) -> Result<usize, ValidationError> {
    let mut locks: BTreeMap<u32, usize> = BTreeMap::new();
    let mut keys: BTreeMap<u32, usize> = BTreeMap::new();

    for (p, cell) in board.iter() {
        if let Some(id) = cell.lock_id {
            locks.entry(id).or_insert(0);
        }
        if let Some(id) = cell.key_id {
            if !is_valid_key(cell) {
                return Err(ValidationError::KeyPlacement {
                    key_id: id,
                    x: p.x,
                    y: p.y,
                });
            }
            *keys.entry(id).or_insert(0) += 1;
        }
    }

    for id in locks.keys() {
        let found: usize = keys.get(id).copied().unwrap_or(0);
        if found != 1 {
            return Err(ValidationError::LockPairing {
                lock_id: *id,
                keys: found,
            });
        }
    }
    // Orphan keys
    if let Some((id, found)) = keys.iter().find(|(id, _)| !locks.contains_key(id)) {
        return Err(ValidationError::LockPairing {
            lock_id: *id,
            keys: *found,
        });
    }
    Ok(locks.len())
}

fn is_valid_key(cell: &BoardCell) -> bool {
    cell.is_colored()
        && cell.element == Some(Element::Key)
        && cell.lock_id.is_none()
        && cell.contents().is_empty()
}

fn check_symmetry(board: &Board) -> Result<(), ValidationError> {
    let width: usize = board.width();
    for (p, cell) in board.iter() {
        let m: Position = mirror(p, width);
        if m.x <= p.x {
            continue;
        }
        let twin: Option<&BoardCell> = board.get(m);
        let matched: bool = twin.is_some_and(|t| {
            t.is_block() == cell.is_block() && (!cell.is_block() || t.color == cell.color)
        });
        if !matched {
            return Err(ValidationError::Symmetry { x: p.x, y: p.y });
        }
    }
    Ok(())
}
