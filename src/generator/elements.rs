/*
elements.rs

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

//! Place the special mechanics.
//!
//! Before the plain blocks are placed, [`Reservations`] samples the container sizes and counts
//! the colored elements, so that the number of plain blocks to grow can be computed.
//! After the plain blocks are placed, [`ElementPlacer`] installs the mechanics.
//!
//! Placement is best effort: a mechanic that cannot be placed as many times as requested is
//! reported as an [`ElementShortfall`].

use log::{Level, debug, log_enabled, warn};
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use std::collections::{BTreeMap, VecDeque};

use super::geometry::{
    Direction, Position, block_directions, frontier, left_half_end, neighbors, step,
    touches_block, unit_of,
};
use super::grid::{LevelGrid, Mechanic, plain_positions};
use crate::config::{Color, ElementKind, GenerationMode, LevelConfig};
use crate::errors::ElementShortfall;

/// Cells promised to the mechanics before the plain blocks are placed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reservations {
    /// Sampled capacity of each pipe and moving belt.
    containers: BTreeMap<ElementKind, VecDeque<usize>>,

    /// Number of bombs, ice blocks, and barrels.
    color_elements: BTreeMap<ElementKind, usize>,
}

impl Reservations {
    /// Sample the container sizes for the requested mechanics.
    pub fn sample<R: Rng>(config: &LevelConfig, rng: &mut R) -> Self {
        let mut reservations: Reservations = Reservations::default();

        for kind in ElementKind::ALL {
            let count: usize = config.requested(kind);
            if count == 0 {
                continue;
            }
            if kind.is_container() {
                let range = if kind == ElementKind::Pipe {
                    config.difficulty.pipe_size_range()
                } else {
                    config.difficulty.moving_distance_range()
                };
                let mut sizes: VecDeque<usize> = VecDeque::with_capacity(count);
                while sizes.len() < count {
                    let size: usize = rng.random_range(range.clone());
                    sizes.push_back(size);
                    // Mirrored containers hold the same number of blocks
                    if config.generation_mode == GenerationMode::Symmetric && sizes.len() < count {
                        sizes.push_back(size);
                    }
                }
                reservations.containers.insert(kind, sizes);
            } else if kind.is_color_element() {
                reservations.color_elements.insert(kind, count);
            }
        }
        reservations
    }

    /// Number of colored cells that do not come from the plain block placement: the container
    /// contents and the colored elements.
    pub fn reserved_cells(&self) -> usize {
        let contents: usize = self.containers.values().flatten().sum();
        contents + self.color_elements.values().sum::<usize>()
    }

    /// Number of plain blocks that become container housings.
    pub fn housings(&self) -> usize {
        self.containers.values().map(|q| q.len()).sum()
    }

    /// Number of plain blocks to grow so that the final board holds `block_count` colored
    /// cells.
    pub fn structural_count(&self, block_count: usize) -> usize {
        (block_count + self.housings()).saturating_sub(self.reserved_cells())
    }

    /// Number of instances of the mechanic that the reservations allow.
    pub fn planned(&self, kind: ElementKind) -> Option<usize> {
        if kind.is_container() {
            Some(self.containers.get(&kind).map_or(0, |q| q.len()))
        } else if kind.is_color_element() {
            Some(self.color_elements.get(&kind).copied().unwrap_or(0))
        } else {
            None
        }
    }

    /// Take the next container size.
    pub fn pop_size(&mut self, kind: ElementKind) -> Option<usize> {
        self.containers.get_mut(&kind)?.pop_front()
    }

    /// Reduce the reservations until they leave room for at least one plain block.
    ///
    /// The largest container is shrunk first. When every container holds a single color,
    /// containers are dropped, and then colored elements.
    pub fn fit(&mut self, block_count: usize) {
        let before: usize = self.reserved_cells();

        while self.reserved_cells() >= block_count {
            let largest: Option<&mut usize> = self
                .containers
                .values_mut()
                .flat_map(|q| q.iter_mut())
                .filter(|s| **s > 1)
                .max_by_key(|s| **s);
            if let Some(size) = largest {
                *size -= 1;
                continue;
            }
            if let Some(q) = self.containers.values_mut().find(|q| !q.is_empty()) {
                q.pop_back();
                continue;
            }
            if let Some(c) = self.color_elements.values_mut().find(|c| **c > 0) {
                *c -= 1;
                continue;
            }
            break;
        }

        if self.reserved_cells() != before {
            warn!(
                "Mechanics reserve {before} of the {block_count} blocks, reduced to {}",
                self.reserved_cells()
            );
        }
    }
}

/// [`ElementPlacer`] object.
pub struct ElementPlacer {
    /// Layout mode. In symmetric mode, mechanics are placed on mirrored cells.
    pub mode: GenerationMode,

    /// Number of placement attempts during the last run.
    pub iteration: usize,

    /// Number of cells that received each mechanic during the last run.
    pub placed: BTreeMap<ElementKind, usize>,

    /// Identifier for the next lock.
    next_lock_id: u32,
}

impl ElementPlacer {
    /// Create the object.
    pub fn new(mode: GenerationMode) -> Self {
        Self {
            mode,
            iteration: 0,
            placed: BTreeMap::new(),
            next_lock_id: 1,
        }
    }

    fn symmetric(&self) -> bool {
        self.mode == GenerationMode::Symmetric
    }

    /// Install the requested mechanics.
    ///
    /// The mechanic kinds are processed in random order. `palette` provides the provisional
    /// colors of the colored elements. The rebalance pass adjusts them later.
    ///
    /// The method returns the mechanics that could not be placed as many times as requested.
    pub fn place_all<G: LevelGrid, R: Rng>(
        &mut self,
        grid: &mut G,
        config: &LevelConfig,
        reservations: &mut Reservations,
        palette: &[Color],
        rng: &mut R,
    ) -> Vec<ElementShortfall> {
        self.iteration = 0;
        self.placed.clear();

        let mut kinds: Vec<ElementKind> = ElementKind::ALL
            .into_iter()
            .filter(|k| config.requested(*k) > 0)
            .collect();
        kinds.shuffle(rng);

        for kind in kinds {
            let wanted: usize = reservations
                .planned(kind)
                .unwrap_or_else(|| config.requested(kind));
            let placed: usize = self.place_kind(grid, kind, wanted, reservations, palette, rng);
            self.placed.insert(kind, placed);
        }

        let mut shortfalls: Vec<ElementShortfall> = Vec::new();
        for (kind, requested) in &config.elements {
            let placed: usize = self.placed.get(kind).copied().unwrap_or(0);
            if placed < *requested {
                let shortfall: ElementShortfall = ElementShortfall {
                    kind: *kind,
                    requested: *requested,
                    placed,
                };
                warn!("Element shortfall: {shortfall}");
                shortfalls.push(shortfall);
            }
        }

        if log_enabled!(Level::Debug) {
            debug!("Element placement: {} attempts", self.iteration);
            for (kind, placed) in &self.placed {
                debug!("    {kind:>10} = {placed}");
            }
        }
        shortfalls
    }

    /// Place up to `wanted` cells of the given mechanic and return the number placed.
    fn place_kind<G: LevelGrid, R: Rng>(
        &mut self,
        grid: &mut G,
        kind: ElementKind,
        wanted: usize,
        reservations: &mut Reservations,
        palette: &[Color],
        rng: &mut R,
    ) -> usize {
        let budget: usize = 3 * self.candidates(grid, kind).len().max(1);
        let width: usize = grid.width();
        let mut placed: usize = 0;
        let mut attempts: usize = 0;

        while placed < wanted && attempts < budget {
            attempts += 1;
            self.iteration += 1;

            let cells: Vec<Position> = self.candidates(grid, kind);
            let Some(p) = cells.choose(rng).copied() else {
                break;
            };
            let unit: Vec<Position> = if kind == ElementKind::BlockLock {
                vec![p]
            } else {
                unit_of(p, width, self.symmetric())
            };
            if unit.len() > wanted - placed {
                continue;
            }

            let done: bool = match kind {
                ElementKind::Pipe | ElementKind::Moving => {
                    self.place_container(grid, kind, &unit, reservations, rng)
                }
                ElementKind::BlockLock => self.place_lock(grid, p, rng),
                ElementKind::Bomb | ElementKind::Ice | ElementKind::Barrel => {
                    Self::place_color_element(grid, kind, &unit, palette, rng)
                }
                ElementKind::Barrier => Self::place_obstacle(grid, kind, &unit, None),
                ElementKind::PullPin => {
                    let directions: Vec<Direction> = block_directions(grid, p);
                    match directions.choose(rng) {
                        Some(d) => Self::place_obstacle(grid, kind, &unit, Some(*d)),
                        None => false,
                    }
                }
            };
            if done {
                placed += unit.len();
            }
        }
        placed
    }

    /// Return the cells where the mechanic can go.
    ///
    /// Mechanics installed on existing blocks use the plain blocks. The others use the
    /// frontier. In symmetric mode, only the left half and the center column are returned:
    /// the mirror cells are derived from them.
    fn candidates<G: LevelGrid>(&self, grid: &G, kind: ElementKind) -> Vec<Position> {
        let on_blocks: bool = kind.is_container() || kind == ElementKind::BlockLock;
        let cells: Vec<Position> = if on_blocks {
            plain_positions(grid)
        } else {
            frontier(grid)
        };
        if !self.symmetric() || kind == ElementKind::BlockLock {
            return cells;
        }

        let width: usize = grid.width();
        let height: usize = grid.height();
        cells
            .into_iter()
            .filter(|p| p.x <= left_half_end(width))
            .filter(|p| match unit_of(*p, width, true).get(1) {
                None => true,
                Some(m) if on_blocks => grid.is_plain(*m),
                Some(m) => {
                    !grid.is_block(*m)
                        && (touches_block(grid, *m) || neighbors(*m, width, height).contains(p))
                }
            })
            .collect()
    }

    fn place_container<G: LevelGrid, R: Rng>(
        &mut self,
        grid: &mut G,
        kind: ElementKind,
        unit: &[Position],
        reservations: &mut Reservations,
        rng: &mut R,
    ) -> bool {
        let width: usize = grid.width();
        let height: usize = grid.height();
        let Some(first) = unit.first() else {
            return false;
        };
        let directions: Vec<Direction> = block_directions(grid, *first);
        let Some(direction) = directions.choose(rng).copied() else {
            return false;
        };
        // The mirrored container points the other way
        if let Some(m) = unit.get(1) {
            let target: Option<Position> = step(*m, direction.mirrored(), width, height);
            if !target.is_some_and(|t| grid.is_block(t)) {
                return false;
            }
        }

        for (i, p) in unit.iter().enumerate() {
            let Some(capacity) = reservations.pop_size(kind) else {
                return i > 0;
            };
            let d: Direction = if i == 0 {
                direction
            } else {
                direction.mirrored()
            };
            let mechanic: Mechanic = if kind == ElementKind::Pipe {
                Mechanic::Pipe {
                    direction: d,
                    capacity,
                }
            } else {
                Mechanic::Moving {
                    direction: d,
                    capacity,
                }
            };
            grid.apply(*p, mechanic);
        }
        true
    }

    /// Place a lock and its key. The lock is removed when no cell is left for the key.
    fn place_lock<G: LevelGrid, R: Rng>(
        &mut self,
        grid: &mut G,
        position: Position,
        rng: &mut R,
    ) -> bool {
        let id: u32 = self.next_lock_id;
        grid.apply(position, Mechanic::Lock { id });

        let cells: Vec<Position> = plain_positions(grid);
        match cells.choose(rng) {
            Some(key) => {
                grid.apply(*key, Mechanic::Key { id });
                self.next_lock_id += 1;
                true
            }
            None => {
                debug!("No room for key {id}, removing the lock");
                grid.revert(position);
                false
            }
        }
    }

    fn place_color_element<G: LevelGrid, R: Rng>(
        grid: &mut G,
        kind: ElementKind,
        unit: &[Position],
        palette: &[Color],
        rng: &mut R,
    ) -> bool {
        let Some(color) = palette.choose(rng) else {
            return false;
        };
        for p in unit {
            grid.apply(
                *p,
                Mechanic::ColorElement {
                    kind,
                    color: color.clone(),
                },
            );
        }
        true
    }

    fn place_obstacle<G: LevelGrid>(
        grid: &mut G,
        kind: ElementKind,
        unit: &[Position],
        direction: Option<Direction>,
    ) -> bool {
        let width: usize = grid.width();
        let height: usize = grid.height();
        if let (Some(m), Some(d)) = (unit.get(1), direction) {
            let first: Option<Position> = unit.first().copied();
            let target: Option<Position> = step(*m, d.mirrored(), width, height);
            // The mirror pin may point at the first pin of the pair
            if !target.is_some_and(|t| grid.is_block(t) || Some(t) == first) {
                return false;
            }
        }
        for (i, p) in unit.iter().enumerate() {
            let d: Option<Direction> = if i == 0 {
                direction
            } else {
                direction.map(|d| d.mirrored())
            };
            grid.apply(*p, Mechanic::Obstacle { kind, direction: d });
        }
        true
    }
}
