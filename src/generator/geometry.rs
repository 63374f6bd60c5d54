/*
geometry.rs

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

//! Grid geometry: 4-directional neighbors, flood fill, and frontier.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use strum_macros::Display;

/// Cell coordinates. `x` is the column and `y` the row.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// The four directions.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Direction seen in a mirror placed on the vertical center column.
    pub fn mirrored(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            d => d,
        }
    }
}

/// Read access to the occupancy of a rectangular grid.
pub trait Grid {
    fn width(&self) -> usize;

    fn height(&self) -> usize;

    /// Whether the cell holds a block (colored or not). Out of grid cells are never blocks.
    fn is_block(&self, position: Position) -> bool;
}

/// Return the neighbor of the given cell in the given direction, or None if the neighbor is
/// outside the grid.
pub fn step(position: Position, direction: Direction, width: usize, height: usize) -> Option<Position> {
    let Position { x, y } = position;
    match direction {
        Direction::Up if y > 0 => Some(Position::new(x, y - 1)),
        Direction::Down if y + 1 < height => Some(Position::new(x, y + 1)),
        Direction::Left if x > 0 => Some(Position::new(x - 1, y)),
        Direction::Right if x + 1 < width => Some(Position::new(x + 1, y)),
        _ => None,
    }
}

/// Return the cells adjacent to the given cell.
pub fn neighbors(position: Position, width: usize, height: usize) -> Vec<Position> {
    Direction::ALL
        .iter()
        .filter_map(|d| step(position, *d, width, height))
        .collect()
}

/// Directions in which the adjacent cell is a block.
pub fn block_directions<G: Grid + ?Sized>(grid: &G, position: Position) -> Vec<Direction> {
    Direction::ALL
        .into_iter()
        .filter(|d| {
            step(position, *d, grid.width(), grid.height()).is_some_and(|n| grid.is_block(n))
        })
        .collect()
}

/// Whether at least one adjacent cell is a block.
pub fn touches_block<G: Grid + ?Sized>(grid: &G, position: Position) -> bool {
    !block_directions(grid, position).is_empty()
}

/// Return all the grid positions in row-major order.
pub fn positions(width: usize, height: usize) -> impl Iterator<Item = Position> {
    (0..height).flat_map(move |y| (0..width).map(move |x| Position::new(x, y)))
}

/// Return the block cells in row-major order.
pub fn block_positions<G: Grid + ?Sized>(grid: &G) -> Vec<Position> {
    positions(grid.width(), grid.height())
        .filter(|p| grid.is_block(*p))
        .collect()
}

/// Number of block cells.
pub fn count_blocks<G: Grid + ?Sized>(grid: &G) -> usize {
    positions(grid.width(), grid.height())
        .filter(|p| grid.is_block(*p))
        .count()
}

/// Return the number of block cells reachable from `start` through adjacent blocks.
pub fn flood_fill<G: Grid + ?Sized>(grid: &G, start: Position) -> usize {
    if !grid.is_block(start) {
        return 0;
    }
    let width: usize = grid.width();
    let height: usize = grid.height();
    let mut visited: Vec<bool> = vec![false; width * height];
    let mut queue: VecDeque<Position> = VecDeque::new();
    let mut reached: usize = 0;

    visited[start.y * width + start.x] = true;
    queue.push_back(start);
    while let Some(p) = queue.pop_front() {
        reached += 1;
        for n in neighbors(p, width, height) {
            let i: usize = n.y * width + n.x;
            if !visited[i] && grid.is_block(n) {
                visited[i] = true;
                queue.push_back(n);
            }
        }
    }
    reached
}

/// Whether all the block cells form a single 4-connected component.
///
/// An empty grid is connected.
pub fn is_connected<G: Grid + ?Sized>(grid: &G) -> bool {
    let blocks: Vec<Position> = block_positions(grid);
    match blocks.first() {
        None => true,
        Some(start) => flood_fill(grid, *start) == blocks.len(),
    }
}

/// Return the empty cells adjacent to at least one block, in row-major order.
pub fn frontier<G: Grid + ?Sized>(grid: &G) -> Vec<Position> {
    positions(grid.width(), grid.height())
        .filter(|p| !grid.is_block(*p) && touches_block(grid, *p))
        .collect()
}

/// Return the mirror of the given cell around the vertical center column.
pub fn mirror(position: Position, width: usize) -> Position {
    Position::new(width - 1 - position.x, position.y)
}

/// Whether the column is the center column (only odd widths have one).
pub fn is_center_column(x: usize, width: usize) -> bool {
    width % 2 == 1 && x == width / 2
}

/// Last column of the left half. The center column, if any, belongs to the left half.
pub fn left_half_end(width: usize) -> usize {
    width.saturating_sub(1) / 2
}

/// Return the cells that move together: the cell alone, or the cell and its mirror in
/// symmetric mode when the cell is not on the center column.
pub fn unit_of(position: Position, width: usize, symmetric: bool) -> Vec<Position> {
    if !symmetric || is_center_column(position.x, width) {
        vec![position]
    } else {
        vec![position, mirror(position, width)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Cells {
        width: usize,
        height: usize,
        blocks: Vec<Position>,
    }

    impl Grid for Cells {
        fn width(&self) -> usize {
            self.width
        }

        fn height(&self) -> usize {
            self.height
        }

        fn is_block(&self, position: Position) -> bool {
            self.blocks.contains(&position)
        }
    }

    fn cells(width: usize, height: usize, blocks: &[(usize, usize)]) -> Cells {
        Cells {
            width,
            height,
            blocks: blocks.iter().map(|(x, y)| Position::new(*x, *y)).collect(),
        }
    }

    #[test]
    fn neighbors_stay_in_grid() {
        assert_eq!(neighbors(Position::new(0, 0), 3, 3).len(), 2);
        assert_eq!(neighbors(Position::new(1, 0), 3, 3).len(), 3);
        assert_eq!(neighbors(Position::new(1, 1), 3, 3).len(), 4);
        assert_eq!(step(Position::new(2, 2), Direction::Right, 3, 3), None);
        assert_eq!(
            step(Position::new(2, 2), Direction::Up, 3, 3),
            Some(Position::new(2, 1))
        );
    }

    #[test]
    fn connectivity() {
        assert!(is_connected(&cells(4, 4, &[])));
        assert!(is_connected(&cells(4, 4, &[(0, 0), (1, 0), (1, 1), (1, 2)])));
        // Diagonal contact does not connect
        assert!(!is_connected(&cells(4, 4, &[(0, 0), (1, 1)])));
        assert_eq!(flood_fill(&cells(4, 4, &[(0, 0), (1, 0), (3, 3)]), Position::new(0, 0)), 2);
    }

    #[test]
    fn frontier_lists_empty_neighbors() {
        let grid: Cells = cells(3, 3, &[(1, 1)]);
        let f: Vec<Position> = frontier(&grid);

        assert_eq!(
            f,
            vec![
                Position::new(1, 0),
                Position::new(0, 1),
                Position::new(2, 1),
                Position::new(1, 2)
            ]
        );
        assert!(frontier(&cells(2, 1, &[(0, 0), (1, 0)])).is_empty());
    }

    #[test]
    fn mirror_helpers() {
        assert_eq!(mirror(Position::new(1, 3), 9), Position::new(7, 3));
        assert!(is_center_column(4, 9));
        assert!(!is_center_column(4, 8));
        assert_eq!(left_half_end(9), 4);
        assert_eq!(left_half_end(8), 3);
        assert_eq!(unit_of(Position::new(4, 0), 9, true).len(), 1);
        assert_eq!(unit_of(Position::new(3, 0), 8, true), vec![Position::new(3, 0), Position::new(4, 0)]);
        assert_eq!(unit_of(Position::new(3, 0), 8, false).len(), 1);
        assert_eq!(Direction::Left.mirrored(), Direction::Right);
        assert_eq!(Direction::Up.mirrored(), Direction::Up);
    }
}
