/*
placement.rs

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

//! Grow a connected set of plain blocks.
//!
//! Blocks are added one frontier cell at a time, so the placed set stays 4-connected after
//! every step.
//! In symmetric mode, blocks are added by units: a cell of the left half with its mirror, or
//! a single cell of the center column.

use log::{debug, warn};
use rand::Rng;
use rand::seq::IndexedRandom;
use std::time::Instant;
use strum_macros::Display;

use super::distribution::ColorQueue;
use super::geometry::{
    Position, count_blocks, frontier, is_center_column, left_half_end, neighbors, touches_block,
    unit_of,
};
use super::grid::LevelGrid;
use crate::config::{Color, GenerationMode};
use crate::errors::GenerationError;

/// Growth pattern for symmetric boards.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SymmetryTemplate {
    /// Grow along the two central axes first.
    Cross,

    /// Grow by increasing Manhattan distance from the center.
    Diamond,

    /// Grow anywhere on the frontier.
    Freeform,
}

impl SymmetryTemplate {
    pub const ALL: [SymmetryTemplate; 3] = [
        SymmetryTemplate::Cross,
        SymmetryTemplate::Diamond,
        SymmetryTemplate::Freeform,
    ];

    /// Score of a candidate cell. Lower scores are picked first.
    ///
    /// Distances are doubled so that the center of even dimensions stays an integer.
    pub fn score(self, position: Position, width: usize, height: usize) -> usize {
        let dx: usize = (2 * position.x).abs_diff(width.saturating_sub(1));
        let dy: usize = (2 * position.y).abs_diff(height.saturating_sub(1));
        match self {
            SymmetryTemplate::Cross => dx.min(dy),
            SymmetryTemplate::Diamond => dx + dy,
            SymmetryTemplate::Freeform => 0,
        }
    }

    /// Return the index of a random candidate among the best scored ones.
    fn pick<R: Rng>(
        self,
        candidates: &[Position],
        width: usize,
        height: usize,
        rng: &mut R,
    ) -> Option<usize> {
        let best: usize = candidates
            .iter()
            .map(|p| self.score(*p, width, height))
            .min()?;
        let indexes: Vec<usize> = (0..candidates.len())
            .filter(|i| self.score(candidates[*i], width, height) == best)
            .collect();
        indexes.choose(rng).copied()
    }
}

/// [`PlacementEngine`] object.
pub struct PlacementEngine {
    /// Layout mode.
    pub mode: GenerationMode,

    /// Number of candidate cells examined during the last placement.
    pub iteration: usize,

    /// Duration in seconds of the last placement.
    pub duration: f32,

    /// Number of cells that the last symmetric placement had to add without their mirror.
    pub fallback_cells: usize,

    /// Number of center column blocks that symmetric placements try to reach before they
    /// prefer mirrored pairs. Each color with an odd count needs one of these cells.
    pub min_centers: usize,

    /// Time when the placement started. Used to compute the [`PlacementEngine::duration`].
    start: Instant,
}

impl PlacementEngine {
    /// Create the object.
    pub fn new(mode: GenerationMode) -> Self {
        Self {
            mode,
            iteration: 0,
            duration: 0.0,
            fallback_cells: 0,
            min_centers: 0,
            start: Instant::now(),
        }
    }

    /// Add `count` plain blocks to the grid.
    ///
    /// When the grid is empty, the growth starts from the center. Otherwise, the new blocks
    /// extend the existing ones.
    ///
    /// # Errors
    ///
    /// The method returns an error when the frontier is empty before all the blocks are
    /// placed.
    pub fn place<G: LevelGrid, R: Rng>(
        &mut self,
        grid: &mut G,
        count: usize,
        queue: &mut ColorQueue,
        rng: &mut R,
    ) -> Result<(), GenerationError> {
        self.iteration = 0;
        self.duration = 0.0;
        self.fallback_cells = 0;
        self.start = Instant::now();

        let res: Result<(), GenerationError> = match self.mode {
            GenerationMode::Random => self.grow_random(grid, count, 0, queue, rng),
            GenerationMode::Symmetric => self.grow_symmetric(grid, count, queue, rng),
        };
        self.duration = self.start.elapsed().as_secs_f32();
        debug!(
            "Placed {count} blocks  Iterations = {}  Duration = {}",
            self.iteration, self.duration
        );
        res
    }

    /// Add `count` blocks on random frontier cells. `offset` is the number of blocks that the
    /// caller already placed, for error reporting.
    fn grow_random<G: LevelGrid, R: Rng>(
        &mut self,
        grid: &mut G,
        count: usize,
        offset: usize,
        queue: &mut ColorQueue,
        rng: &mut R,
    ) -> Result<(), GenerationError> {
        let mut placed: usize = 0;

        if count > 0 && count_blocks(grid) == 0 {
            let seed: Position = Position::new(grid.width() / 2, grid.height() / 2);
            grid.place_block(seed, queue.pop(rng));
            placed += 1;
        }

        while placed < count {
            self.iteration += 1;
            let cells: Vec<Position> = frontier(grid);
            let Some(p) = cells.choose(rng) else {
                return Err(GenerationError::PlacementExhausted {
                    placed: offset + placed,
                    required: offset + count,
                });
            };
            grid.place_block(*p, queue.pop(rng));
            placed += 1;
        }
        Ok(())
    }

    fn grow_symmetric<G: LevelGrid, R: Rng>(
        &mut self,
        grid: &mut G,
        count: usize,
        queue: &mut ColorQueue,
        rng: &mut R,
    ) -> Result<(), GenerationError> {
        let width: usize = grid.width();
        let height: usize = grid.height();
        let mut remaining: usize = count;
        let mut centers: usize = if width % 2 == 1 {
            (0..height)
                .filter(|y| grid.is_block(Position::new(width / 2, *y)))
                .count()
        } else {
            0
        };

        if remaining > 0 && count_blocks(grid) == 0 {
            let y: usize = height / 2;
            if width % 2 == 1 {
                grid.place_block(Position::new(width / 2, y), queue.pop(rng));
                remaining -= 1;
                centers += 1;
            } else if remaining >= 2 {
                let color: Color = queue.pop_pair(rng);
                grid.place_block(Position::new(width / 2 - 1, y), color.clone());
                grid.place_block(Position::new(width / 2, y), color);
                remaining -= 2;
            }
        }

        let template: SymmetryTemplate = SymmetryTemplate::ALL
            .choose(rng)
            .copied()
            .unwrap_or(SymmetryTemplate::Freeform);
        debug!("Symmetric growth with the {template} template");

        while remaining > 0 {
            let prefer_centers: bool = remaining % 2 == 1 || centers < self.min_centers;
            let Some(unit) = self.pick_unit(grid, remaining, prefer_centers, template, rng) else {
                warn!(
                    "No mirrored position left, adding the last {remaining} blocks without symmetry"
                );
                self.fallback_cells = remaining;
                return self.grow_random(grid, remaining, count - remaining, queue, rng);
            };
            let color: Color = if unit.len() == 2 {
                queue.pop_pair(rng)
            } else {
                centers += 1;
                queue.pop(rng)
            };
            for p in &unit {
                grid.place_block(*p, color.clone());
            }
            remaining -= unit.len();
        }
        Ok(())
    }

    /// Select the next unit to place.
    ///
    /// With `prefer_centers`, center column cells are tried before the mirrored pairs.
    /// A pair is rejected when its mirror cell is already used or is not connected.
    fn pick_unit<G: LevelGrid, R: Rng>(
        &mut self,
        grid: &G,
        remaining: usize,
        prefer_centers: bool,
        template: SymmetryTemplate,
        rng: &mut R,
    ) -> Option<Vec<Position>> {
        let width: usize = grid.width();
        let height: usize = grid.height();
        let candidates: Vec<Position> = frontier(grid)
            .into_iter()
            .filter(|p| p.x <= left_half_end(width))
            .collect();
        let budget: usize = 3 * candidates.len();
        let (centers, pairs): (Vec<Position>, Vec<Position>) = candidates
            .into_iter()
            .partition(|p| is_center_column(p.x, width));
        let pools: [Vec<Position>; 2] = if prefer_centers {
            [centers, pairs]
        } else {
            [pairs, centers]
        };

        let mut attempts: usize = 0;
        for mut pool in pools {
            while attempts < budget {
                let Some(i) = template.pick(&pool, width, height, rng) else {
                    break;
                };
                attempts += 1;
                self.iteration += 1;
                let p: Position = pool.swap_remove(i);
                let unit: Vec<Position> = unit_of(p, width, true);
                if unit.len() > remaining {
                    // Pairs never fit an odd remainder of one
                    break;
                }
                if let Some(m) = unit.get(1) {
                    let linked: bool =
                        touches_block(grid, *m) || neighbors(*m, width, height).contains(&p);
                    if grid.is_block(*m) || !linked {
                        continue;
                    }
                }
                return Some(unit);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::distribution::{ColorPlan, DivisorRule, plan};
    use crate::generator::geometry::{Grid, is_connected, mirror, positions};
    use crate::generator::legacy::LegacyGrid;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn queue(count: usize, rng: &mut ChaCha8Rng) -> ColorQueue {
        let colors: Vec<Color> = vec![Color::from("Red"), Color::from("Blue")];
        let p: ColorPlan = plan(count, &colors, 0, DivisorRule::Fixed(3), false, rng).unwrap();
        ColorQueue::new(&p, rng).unwrap()
    }

    fn assert_mirrored(grid: &LegacyGrid) {
        let width: usize = grid.width();
        for p in positions(width, grid.height()) {
            let m: Position = mirror(p, width);
            assert_eq!(grid.is_block(p), grid.is_block(m), "cell {p:?}");
            assert_eq!(grid.color_at(p), grid.color_at(m), "cell {p:?}");
        }
    }

    #[test]
    fn random_growth_is_connected() {
        for seed in 0..10 {
            let mut rng: ChaCha8Rng = ChaCha8Rng::seed_from_u64(seed);
            let mut q: ColorQueue = queue(30, &mut rng);
            let mut grid: LegacyGrid = LegacyGrid::new(9, 10);
            let mut engine: PlacementEngine = PlacementEngine::new(GenerationMode::Random);

            engine.place(&mut grid, 30, &mut q, &mut rng).unwrap();
            assert_eq!(count_blocks(&grid), 30);
            assert!(is_connected(&grid));
            assert!(grid.is_block(Position::new(4, 5)));
            assert!(engine.iteration >= 29);
        }
    }

    #[test]
    fn growth_extends_existing_blocks() {
        let mut rng: ChaCha8Rng = ChaCha8Rng::seed_from_u64(11);
        let mut q: ColorQueue = queue(12, &mut rng);
        let mut grid: LegacyGrid = LegacyGrid::new(6, 6);
        let mut engine: PlacementEngine = PlacementEngine::new(GenerationMode::Random);

        engine.place(&mut grid, 9, &mut q, &mut rng).unwrap();
        engine.place(&mut grid, 3, &mut q, &mut rng).unwrap();
        assert_eq!(count_blocks(&grid), 12);
        assert!(is_connected(&grid));
    }

    #[test]
    fn full_grid_exhausts_the_frontier() {
        let mut rng: ChaCha8Rng = ChaCha8Rng::seed_from_u64(12);
        let mut q: ColorQueue = queue(6, &mut rng);
        let mut grid: LegacyGrid = LegacyGrid::new(2, 2);
        let mut engine: PlacementEngine = PlacementEngine::new(GenerationMode::Random);

        assert_eq!(
            engine.place(&mut grid, 6, &mut q, &mut rng),
            Err(GenerationError::PlacementExhausted {
                placed: 4,
                required: 6
            })
        );
    }

    #[test]
    fn symmetric_growth_with_odd_width() {
        for seed in 0..10 {
            let mut rng: ChaCha8Rng = ChaCha8Rng::seed_from_u64(seed);
            let mut q: ColorQueue = queue(36, &mut rng);
            let mut grid: LegacyGrid = LegacyGrid::new(9, 10);
            let mut engine: PlacementEngine = PlacementEngine::new(GenerationMode::Symmetric);

            engine.place(&mut grid, 36, &mut q, &mut rng).unwrap();
            assert_eq!(count_blocks(&grid), 36);
            assert!(is_connected(&grid));
            assert_eq!(engine.fallback_cells, 0);
            assert_mirrored(&grid);
        }
    }

    #[test]
    fn symmetric_growth_with_even_width() {
        for seed in 0..10 {
            let mut rng: ChaCha8Rng = ChaCha8Rng::seed_from_u64(seed);
            let mut q: ColorQueue = queue(24, &mut rng);
            let mut grid: LegacyGrid = LegacyGrid::new(8, 8);
            let mut engine: PlacementEngine = PlacementEngine::new(GenerationMode::Symmetric);

            engine.place(&mut grid, 24, &mut q, &mut rng).unwrap();
            assert_eq!(count_blocks(&grid), 24);
            assert!(is_connected(&grid));
            assert_mirrored(&grid);
        }
    }

    #[test]
    fn odd_count_on_even_width_falls_back() {
        let mut rng: ChaCha8Rng = ChaCha8Rng::seed_from_u64(13);
        let mut q: ColorQueue = queue(9, &mut rng);
        let mut grid: LegacyGrid = LegacyGrid::new(6, 6);
        let mut engine: PlacementEngine = PlacementEngine::new(GenerationMode::Symmetric);

        engine.place(&mut grid, 9, &mut q, &mut rng).unwrap();
        assert_eq!(count_blocks(&grid), 9);
        assert!(is_connected(&grid));
        assert_eq!(engine.fallback_cells, 1);
    }

    #[test]
    fn symmetric_growth_reaches_the_center_quota() {
        for seed in 0..10 {
            let mut rng: ChaCha8Rng = ChaCha8Rng::seed_from_u64(seed);
            let mut q: ColorQueue = queue(27, &mut rng);
            let mut grid: LegacyGrid = LegacyGrid::new(9, 10);
            let mut engine: PlacementEngine = PlacementEngine::new(GenerationMode::Symmetric);
            engine.min_centers = 5;

            engine.place(&mut grid, 27, &mut q, &mut rng).unwrap();
            assert_eq!(count_blocks(&grid), 27);
            assert!(is_connected(&grid));
            assert_eq!(engine.fallback_cells, 0);
            let centers: usize = (0..10)
                .filter(|y| grid.is_block(Position::new(4, *y)))
                .count();
            assert!(centers >= 5, "{centers} center blocks");
            // Pairs fill the rest, so the center count keeps the parity of the total
            assert_eq!(centers % 2, 1);
        }
    }

    #[test]
    fn template_scores() {
        let center: Position = Position::new(4, 4);
        let axis: Position = Position::new(4, 0);
        let corner: Position = Position::new(0, 0);

        assert_eq!(SymmetryTemplate::Diamond.score(center, 9, 9), 0);
        assert_eq!(SymmetryTemplate::Cross.score(axis, 9, 9), 0);
        assert!(SymmetryTemplate::Diamond.score(axis, 9, 9) > 0);
        assert!(SymmetryTemplate::Cross.score(corner, 9, 9) > 0);
        assert_eq!(SymmetryTemplate::Freeform.score(corner, 9, 9), 0);
    }
}
