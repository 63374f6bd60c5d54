/*
legacy.rs

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

//! Legacy generator.
//!
//! The generator works directly on the canonical [`Board`] and uses the lenient
//! [`Policy::LEGACY`] rules: colors are balanced in multiples of three, and small deviations
//! are accepted.

use log::debug;
use rand::Rng;
use std::time::Instant;

use super::adapter::GeneratorKind;
use super::board::{Board, BoardCell, Element};
use super::geometry::{Grid, Position};
use super::grid::{LevelGrid, Mechanic};
use super::pipeline::{self, GeneratorOutput, LevelGenerator, PipelineOutput, Policy};
use crate::config::{Color, LevelConfig};
use crate::errors::GenerationError;

/// Canonical board with the container placement order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyGrid {
    board: Board,
    container_order: Vec<Position>,
}

impl LegacyGrid {
    /// Create a grid of empty cells.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            board: Board::new(width, height),
            container_order: Vec::new(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn into_board(self) -> Board {
        self.board
    }
}

impl Grid for LegacyGrid {
    fn width(&self) -> usize {
        self.board.width()
    }

    fn height(&self) -> usize {
        self.board.height()
    }

    fn is_block(&self, position: Position) -> bool {
        self.board.is_block(position)
    }
}

impl LevelGrid for LegacyGrid {
    fn place_block(&mut self, position: Position, color: Color) {
        self.board.set(position, BoardCell::block(color));
    }

    fn apply(&mut self, position: Position, mechanic: Mechanic) {
        match mechanic {
            Mechanic::Pipe {
                direction,
                capacity,
            } => {
                let mut cell: BoardCell = BoardCell::housing(Element::Pipe);
                cell.pipe_direction = Some(direction);
                cell.pipe_size = Some(capacity);
                cell.pipe_contents = Some(Vec::with_capacity(capacity));
                self.board.set(position, cell);
                self.container_order.push(position);
            }
            Mechanic::Moving {
                direction,
                capacity,
            } => {
                let mut cell: BoardCell = BoardCell::housing(Element::Moving);
                cell.moving_direction = Some(direction);
                cell.moving_distance = Some(capacity);
                cell.moving_contents = Some(Vec::with_capacity(capacity));
                self.board.set(position, cell);
                self.container_order.push(position);
            }
            Mechanic::Lock { id } => {
                if let Some(cell) = self.board.get_mut(position) {
                    cell.element = Some(Element::BlockLock);
                    cell.lock_id = Some(id);
                }
            }
            Mechanic::Key { id } => {
                if let Some(cell) = self.board.get_mut(position) {
                    cell.element = Some(Element::Key);
                    cell.key_id = Some(id);
                }
            }
            Mechanic::ColorElement { kind, color } => {
                let mut cell: BoardCell = BoardCell::block(color);
                cell.element = Some(kind.into());
                self.board.set(position, cell);
            }
            Mechanic::Obstacle { kind, direction } => {
                let mut cell: BoardCell = BoardCell::housing(kind.into());
                cell.pin_direction = direction;
                self.board.set(position, cell);
            }
        }
    }

    fn revert(&mut self, position: Position) {
        if let Some(cell) = self.board.get_mut(position) {
            cell.element = None;
            cell.lock_id = None;
            cell.key_id = None;
        }
    }

    fn color_at(&self, position: Position) -> Option<&Color> {
        self.board
            .get(position)
            .filter(|c| c.is_block())
            .and_then(|c| c.color.as_ref())
    }

    fn repaint(&mut self, position: Position, color: Color) {
        if let Some(cell) = self.board.get_mut(position).filter(|c| c.is_colored()) {
            cell.color = Some(color);
        }
    }

    fn is_plain(&self, position: Position) -> bool {
        self.board.get(position).is_some_and(|c| c.is_plain())
    }

    fn is_lock(&self, position: Position) -> bool {
        self.board
            .get(position)
            .is_some_and(|c| c.lock_id.is_some())
    }

    fn containers(&self) -> &[Position] {
        &self.container_order
    }

    fn capacity(&self, position: Position) -> usize {
        self.board
            .get(position)
            .and_then(|c| c.pipe_size.or(c.moving_distance))
            .unwrap_or(0)
    }

    fn grow_capacity(&mut self, position: Position, extra: usize) {
        if let Some(cell) = self.board.get_mut(position) {
            if let Some(size) = cell.pipe_size.as_mut() {
                *size += extra;
            } else if let Some(distance) = cell.moving_distance.as_mut() {
                *distance += extra;
            }
        }
    }

    fn contents(&self, position: Position) -> &[Color] {
        self.board.get(position).map_or(&[], |c| c.contents())
    }

    fn contents_mut(&mut self, position: Position) -> Option<&mut Vec<Color>> {
        let cell: &mut BoardCell = self.board.get_mut(position)?;
        if cell.pipe_contents.is_some() {
            cell.pipe_contents.as_mut()
        } else {
            cell.moving_contents.as_mut()
        }
    }
}

/// [`LegacyGenerator`] object.
pub struct LegacyGenerator {
    /// Duration in seconds of the last generation.
    pub duration: f32,

    /// Number of repaint operations during the last generation.
    pub rebalance_moves: usize,

    /// Time when the generation started. Used to compute the [`LegacyGenerator::duration`].
    start: Instant,
}

impl LegacyGenerator {
    /// Create the object.
    pub fn new() -> Self {
        Self {
            duration: 0.0,
            rebalance_moves: 0,
            start: Instant::now(),
        }
    }
}

impl Default for LegacyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl LevelGenerator for LegacyGenerator {
    fn kind(&self) -> GeneratorKind {
        GeneratorKind::Legacy
    }

    fn generate<R: Rng>(
        &mut self,
        config: &LevelConfig,
        rng: &mut R,
    ) -> Result<GeneratorOutput, GenerationError> {
        self.start = Instant::now();
        let grid: LegacyGrid = LegacyGrid::new(config.width, config.height);
        let out: PipelineOutput<LegacyGrid> = pipeline::run(config, &Policy::LEGACY, grid, rng)?;
        self.rebalance_moves = out.report.moves;
        self.duration = self.start.elapsed().as_secs_f32();
        debug!(
            "Legacy generator: rebalance moves = {}  Duration = {}",
            self.rebalance_moves, self.duration
        );

        pipeline::finish(
            self.kind(),
            &Policy::LEGACY,
            config,
            out.grid.into_board(),
            out.plan,
            out.shortfalls,
            self.duration,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ElementKind;
    use crate::generator::geometry::{Direction, is_connected};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn mechanics_map_to_canonical_cells() {
        let mut grid: LegacyGrid = LegacyGrid::new(3, 1);
        grid.place_block(Position::new(0, 0), Color::from("Red"));
        grid.place_block(Position::new(1, 0), Color::from("Red"));
        grid.apply(Position::new(0, 0), Mechanic::Lock { id: 4 });
        grid.apply(
            Position::new(1, 0),
            Mechanic::Moving {
                direction: Direction::Left,
                capacity: 2,
            },
        );
        grid.apply(
            Position::new(2, 0),
            Mechanic::Obstacle {
                kind: ElementKind::PullPin,
                direction: Some(Direction::Left),
            },
        );

        assert!(grid.is_lock(Position::new(0, 0)));
        assert_eq!(grid.color_at(Position::new(0, 0)), Some(&Color::from("Red")));
        assert_eq!(grid.color_at(Position::new(1, 0)), None);
        assert_eq!(grid.containers(), &[Position::new(1, 0)]);

        grid.grow_capacity(Position::new(1, 0), 1);
        assert_eq!(grid.capacity(Position::new(1, 0)), 3);
        let board: Board = grid.into_board();
        assert_eq!(
            board.get(Position::new(1, 0)).and_then(|c| c.moving_distance),
            Some(3)
        );
        assert_eq!(
            board.get(Position::new(2, 0)).and_then(|c| c.element),
            Some(Element::PullPin)
        );
    }

    #[test]
    fn over_constrained_config() {
        for seed in 0..10 {
            let mut rng: ChaCha8Rng = ChaCha8Rng::seed_from_u64(seed);
            let config: LevelConfig = LevelConfig::new(9, 10, 5, &["Red", "Blue"])
                .with_element(ElementKind::Pipe, 3)
                .with_element(ElementKind::BlockLock, 2);
            let mut generator: LegacyGenerator = LegacyGenerator::new();

            let out: GeneratorOutput = generator.generate(&config, &mut rng).unwrap();
            assert_eq!(out.kind, GeneratorKind::Legacy);
            assert_eq!(out.board.total_colored(), 5);
            assert!(is_connected(&out.board));
            assert!(!out.shortfalls.is_empty());
        }
    }
}
