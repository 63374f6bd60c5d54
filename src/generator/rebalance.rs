/*
rebalance.rs

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

//! Fill the containers and bring every color back to its planned count.

use log::{debug, warn};
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use std::collections::BTreeMap;

use super::distribution::ColorPlan;
use super::geometry::{Position, is_center_column, mirror, positions};
use super::grid::{LevelGrid, board_color_totals, color_totals};
use crate::config::{Color, GenerationMode};

/// Outcome of the rebalance pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RebalanceReport {
    /// Number of repaint operations.
    pub moves: usize,

    /// Remaining difference between the actual and the planned count, for the colors that do
    /// not match their target.
    pub deviations: BTreeMap<Color, i64>,
}

impl RebalanceReport {
    /// Largest absolute deviation.
    pub fn max_deviation(&self) -> u64 {
        self.deviations
            .values()
            .map(|d| d.unsigned_abs())
            .max()
            .unwrap_or(0)
    }
}

/// Fill the containers, in placement order.
///
/// The colors come from the part of the plan that the board cells do not use yet. When that
/// budget is spent, random planned colors are used and the rebalance pass corrects the
/// counts.
pub fn fill_contents<G: LevelGrid, R: Rng>(grid: &mut G, plan: &ColorPlan, rng: &mut R) {
    let on_board: BTreeMap<Color, usize> = board_color_totals(grid);
    let mut budget: Vec<Color> = plan
        .targets
        .iter()
        .flat_map(|(color, target)| {
            let used: usize = on_board.get(color).copied().unwrap_or(0);
            std::iter::repeat_n(color.clone(), target.saturating_sub(used))
        })
        .collect();
    budget.shuffle(rng);
    let palette: Vec<Color> = plan.colors();

    for p in grid.containers().to_vec() {
        let capacity: usize = grid.capacity(p);
        let Some(contents) = grid.contents_mut(p) else {
            continue;
        };
        while contents.len() < capacity {
            let color: Color = match budget.pop() {
                Some(c) => c,
                None => match palette.choose(rng) {
                    Some(c) => c.clone(),
                    None => return,
                },
            };
            contents.push(color);
        }
    }
}

/// Group of cells repainted together.
#[derive(Debug, Clone, PartialEq)]
enum Donor {
    /// Board cells: a single cell, or a cell and its mirror.
    Cells(Vec<Position>),

    /// One content slot of a container.
    Slot(Position, usize),
}

impl Donor {
    fn weight(&self) -> usize {
        match self {
            Donor::Cells(cells) => cells.len(),
            Donor::Slot(_, _) => 1,
        }
    }
}

/// Return the cells and slots holding the given color that can be repainted.
///
/// Locks never change color. In symmetric mode, a cell and its mirror are repainted together
/// when they share the color, and a cell whose mirror is a lock of the same color is left
/// alone.
fn donors<G: LevelGrid>(grid: &G, color: &Color, symmetric: bool) -> Vec<Donor> {
    let width: usize = grid.width();
    let mut result: Vec<Donor> = Vec::new();

    for p in positions(width, grid.height()) {
        if grid.color_at(p) != Some(color) || grid.is_lock(p) {
            continue;
        }
        if !symmetric || is_center_column(p.x, width) {
            result.push(Donor::Cells(vec![p]));
            continue;
        }
        let m: Position = mirror(p, width);
        if grid.color_at(m) != Some(color) {
            result.push(Donor::Cells(vec![p]));
        } else if !grid.is_lock(m) && p.x < m.x {
            result.push(Donor::Cells(vec![p, m]));
        }
    }

    for p in grid.containers() {
        for (i, c) in grid.contents(*p).iter().enumerate() {
            if c == color {
                result.push(Donor::Slot(*p, i));
            }
        }
    }
    result
}

fn repaint<G: LevelGrid>(grid: &mut G, donor: &Donor, color: &Color) {
    match donor {
        Donor::Cells(cells) => {
            for p in cells {
                grid.repaint(*p, color.clone());
            }
        }
        Donor::Slot(p, i) => {
            if let Some(slot) = grid.contents_mut(*p).and_then(|c| c.get_mut(*i)) {
                *slot = color.clone();
            }
        }
    }
}

/// Difference between the planned and the actual count of each color. Positive values are
/// missing cells. Colors outside the plan have a zero target.
fn gaps<G: LevelGrid>(grid: &G, plan: &ColorPlan) -> BTreeMap<Color, i64> {
    let totals: BTreeMap<Color, usize> = color_totals(grid);
    let mut result: BTreeMap<Color, i64> = plan
        .targets
        .iter()
        .map(|(c, t)| (c.clone(), *t as i64))
        .collect();
    for (color, count) in totals {
        *result.entry(color).or_insert(0) -= count as i64;
    }
    result
}

/// Compute a color for every repaintable unit of a symmetric board so that the counts match
/// the plan. Return the units that change color.
///
/// Mirrored pairs change the count of a color by two, so each color with an odd need first
/// gets a unit of one cell: a center cell, a cell without twin, or a container slot. The
/// other single units go to the colors two at a time, and the pairs fill the rest. Units
/// keep their color whenever that color still needs cells.
///
/// Return `None` when no assignment exists, for example when the colors with an odd need
/// outnumber the single units.
fn assign<G: LevelGrid, R: Rng>(
    grid: &G,
    plan: &ColorPlan,
    rng: &mut R,
) -> Option<Vec<(Donor, Color)>> {
    let mut need: BTreeMap<Color, i64> = gaps(grid, plan);
    let colors: Vec<Color> = need.keys().cloned().collect();
    let mut singles: Vec<(Donor, Color)> = Vec::new();
    let mut pairs: Vec<(Donor, Color)> = Vec::new();

    // Every unit goes back into the pool of its color
    for color in &colors {
        for donor in donors(grid, color, true) {
            *need.entry(color.clone()).or_insert(0) += donor.weight() as i64;
            if donor.weight() == 2 {
                pairs.push((donor, color.clone()));
            } else {
                singles.push((donor, color.clone()));
            }
        }
    }
    if need.values().any(|n| *n < 0) {
        return None;
    }
    singles.shuffle(rng);
    pairs.shuffle(rng);

    let mut single_colors: Vec<Option<Color>> = vec![None; singles.len()];
    let odd: Vec<Color> = need
        .iter()
        .filter(|(_, n)| **n % 2 == 1)
        .map(|(c, _)| c.clone())
        .collect();
    for color in odd {
        let i: usize = (0..singles.len())
            .find(|i| single_colors[*i].is_none() && singles[*i].1 == color)
            .or_else(|| (0..singles.len()).find(|i| single_colors[*i].is_none()))?;
        single_colors[i] = Some(color.clone());
        *need.entry(color).or_insert(0) -= 1;
    }

    // Every need is even now
    let free: Vec<usize> = (0..singles.len())
        .filter(|i| single_colors[*i].is_none())
        .collect();
    for two in free.chunks(2) {
        let [a, b] = two else {
            return None;
        };
        let color: Color = [&singles[*a].1, &singles[*b].1]
            .into_iter()
            .find(|c| need.get(*c).is_some_and(|n| *n >= 2))
            .cloned()
            .or_else(|| neediest(&need))?;
        *need.entry(color.clone()).or_insert(0) -= 2;
        single_colors[*a] = Some(color.clone());
        single_colors[*b] = Some(color);
    }

    let mut pair_colors: Vec<Option<Color>> = vec![None; pairs.len()];
    for (i, (_, color)) in pairs.iter().enumerate() {
        if let Some(n) = need.get_mut(color).filter(|n| **n >= 2) {
            *n -= 2;
            pair_colors[i] = Some(color.clone());
        }
    }
    for slot in pair_colors.iter_mut().filter(|c| c.is_none()) {
        let color: Color = neediest(&need)?;
        *need.entry(color.clone()).or_insert(0) -= 2;
        *slot = Some(color);
    }
    if need.values().any(|n| *n != 0) {
        return None;
    }

    let changes: Vec<(Donor, Color)> = singles
        .into_iter()
        .zip(single_colors)
        .chain(pairs.into_iter().zip(pair_colors))
        .filter_map(|((donor, old), new)| new.filter(|c| *c != old).map(|c| (donor, c)))
        .collect();
    Some(changes)
}

/// Color that misses the most cells, when it misses at least two.
fn neediest(need: &BTreeMap<Color, i64>) -> Option<Color> {
    need.iter()
        .filter(|(_, n)| **n >= 2)
        .max_by_key(|(_, n)| **n)
        .map(|(c, _)| c.clone())
}

/// Repaint cells until every color matches its planned count.
///
/// On symmetric boards, the pass first looks for an exact assignment of the mirrored units.
/// Each move repaints a unit of an over-represented color with the most under-represented
/// color. A move never overshoots: a mirrored pair is only used when both colors are at least
/// two cells away from their target.
/// The pass stops when the counts match, or when no donor fits.
pub fn rebalance<G: LevelGrid, R: Rng>(
    grid: &mut G,
    plan: &ColorPlan,
    mode: GenerationMode,
    rng: &mut R,
) -> RebalanceReport {
    let symmetric: bool = mode == GenerationMode::Symmetric;
    let limit: usize = 2 * plan.total() + 16;
    let mut moves: usize = 0;

    if symmetric {
        match assign(grid, plan, rng) {
            Some(changes) => {
                for (donor, color) in &changes {
                    repaint(grid, donor, color);
                }
                moves = changes.len();
            }
            None => debug!("No exact assignment of the mirrored units"),
        }
    }

    while moves < limit {
        let current: BTreeMap<Color, i64> = gaps(grid, plan);
        let mut deficits: Vec<(&Color, i64)> = current
            .iter()
            .filter(|(_, g)| **g > 0)
            .map(|(c, g)| (c, *g))
            .collect();
        deficits.sort_by(|a, b| b.1.cmp(&a.1));
        let surpluses: Vec<(&Color, i64)> = current
            .iter()
            .filter(|(_, g)| **g < 0)
            .map(|(c, g)| (c, -*g))
            .collect();

        let mut chosen: Option<(Donor, Color)> = None;
        'search: for (target, missing) in &deficits {
            for (source, extra) in &surpluses {
                let need: i64 = (*missing).min(*extra);
                let units: Vec<Donor> = donors(grid, source, symmetric);
                let pairs: Vec<&Donor> = units.iter().filter(|d| d.weight() == 2).collect();
                let singles: Vec<&Donor> = units.iter().filter(|d| d.weight() == 1).collect();
                let pick: Option<&&Donor> = if need >= 2 && !pairs.is_empty() {
                    pairs.choose(rng)
                } else {
                    singles.choose(rng)
                };
                if let Some(donor) = pick {
                    chosen = Some(((*donor).clone(), (*target).clone()));
                    break 'search;
                }
            }
        }

        let Some((donor, color)) = chosen else {
            break;
        };
        repaint(grid, &donor, &color);
        moves += 1;
    }

    let deviations: BTreeMap<Color, i64> = gaps(grid, plan)
        .into_iter()
        .filter(|(_, g)| *g != 0)
        .map(|(c, g)| (c, -g))
        .collect();
    let report: RebalanceReport = RebalanceReport { moves, deviations };
    if report.deviations.is_empty() {
        debug!("Rebalance: {moves} moves");
    } else {
        warn!(
            "Rebalance stopped after {moves} moves with deviations {:?}",
            report.deviations
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::distribution::{DivisorRule, plan};
    use crate::generator::geometry::Direction;
    use crate::generator::grid::{Mechanic, colored_count, reserved_capacity};
    use crate::generator::legacy::LegacyGrid;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn red() -> Color {
        Color::from("Red")
    }

    fn blue() -> Color {
        Color::from("Blue")
    }

    /// Row of blocks, all red.
    fn red_row(width: usize) -> LegacyGrid {
        let mut grid: LegacyGrid = LegacyGrid::new(width, 3);
        for x in 0..width {
            grid.place_block(Position::new(x, 1), red());
        }
        grid
    }

    fn two_color_plan(total: usize, rng: &mut ChaCha8Rng) -> ColorPlan {
        plan(total, &[red(), blue()], 0, DivisorRule::Fixed(3), true, rng).unwrap()
    }

    #[test]
    fn contents_use_the_remaining_budget() {
        let mut rng: ChaCha8Rng = ChaCha8Rng::seed_from_u64(1);
        let p: ColorPlan = two_color_plan(12, &mut rng);
        let mut grid: LegacyGrid = red_row(8);
        grid.apply(
            Position::new(0, 1),
            Mechanic::Pipe {
                direction: Direction::Right,
                capacity: 5,
            },
        );

        fill_contents(&mut grid, &p, &mut rng);
        assert_eq!(grid.contents(Position::new(0, 1)).len(), 5);
        assert_eq!(colored_count(&grid) + reserved_capacity(&grid), 12);
    }

    #[test]
    fn rebalance_reaches_the_targets() {
        for seed in 0..10 {
            let mut rng: ChaCha8Rng = ChaCha8Rng::seed_from_u64(seed);
            let p: ColorPlan = two_color_plan(12, &mut rng);
            let mut grid: LegacyGrid = red_row(12);

            let report: RebalanceReport =
                rebalance(&mut grid, &p, GenerationMode::Random, &mut rng);
            assert!(report.deviations.is_empty());
            assert_eq!(report.moves, p.target(&blue()));
            assert_eq!(color_totals(&grid), p.targets);
        }
    }

    #[test]
    fn locks_keep_their_color() {
        let mut rng: ChaCha8Rng = ChaCha8Rng::seed_from_u64(2);
        let mut targets: BTreeMap<Color, usize> = BTreeMap::new();
        targets.insert(red(), 0);
        targets.insert(blue(), 3);
        let p: ColorPlan = ColorPlan {
            divisor: 3,
            targets,
            exact: false,
        };
        let mut grid: LegacyGrid = red_row(3);
        grid.apply(Position::new(0, 1), Mechanic::Lock { id: 1 });

        let report: RebalanceReport = rebalance(&mut grid, &p, GenerationMode::Random, &mut rng);
        assert_eq!(grid.color_at(Position::new(0, 1)), Some(&red()));
        assert_eq!(report.max_deviation(), 1);
    }

    #[test]
    fn symmetric_rebalance_repaints_pairs() {
        let mut rng: ChaCha8Rng = ChaCha8Rng::seed_from_u64(3);
        let mut targets: BTreeMap<Color, usize> = BTreeMap::new();
        targets.insert(red(), 4);
        targets.insert(blue(), 4);
        let p: ColorPlan = ColorPlan {
            divisor: 1,
            targets,
            exact: true,
        };
        let mut grid: LegacyGrid = red_row(8);

        let report: RebalanceReport =
            rebalance(&mut grid, &p, GenerationMode::Symmetric, &mut rng);
        assert_eq!(report.moves, 2);
        for x in 0..4 {
            let left: Position = Position::new(x, 1);
            assert_eq!(grid.color_at(left), grid.color_at(mirror(left, 8)));
        }
    }

    #[test]
    fn odd_counts_use_the_center_column() {
        let green: Color = Color::from("Green");
        let mut targets: BTreeMap<Color, usize> = BTreeMap::new();
        targets.insert(red(), 5);
        targets.insert(blue(), 5);
        targets.insert(green.clone(), 3);
        let p: ColorPlan = ColorPlan {
            divisor: 1,
            targets,
            exact: true,
        };

        for seed in 0..10 {
            let mut rng: ChaCha8Rng = ChaCha8Rng::seed_from_u64(seed);
            // A cross: five center cells and four mirrored pairs
            let mut grid: LegacyGrid = LegacyGrid::new(9, 5);
            for x in 0..9 {
                grid.place_block(Position::new(x, 2), red());
            }
            for y in [0, 1, 3, 4] {
                grid.place_block(Position::new(4, y), red());
            }

            let report: RebalanceReport =
                rebalance(&mut grid, &p, GenerationMode::Symmetric, &mut rng);
            assert!(report.deviations.is_empty(), "{:?}", report.deviations);
            assert_eq!(color_totals(&grid), p.targets);
            for x in 0..4 {
                let left: Position = Position::new(x, 2);
                assert_eq!(grid.color_at(left), grid.color_at(mirror(left, 9)));
            }
        }
    }

    #[test]
    fn container_slots_fix_the_parity() {
        let mut targets: BTreeMap<Color, usize> = BTreeMap::new();
        targets.insert(red(), 6);
        targets.insert(blue(), 3);
        let p: ColorPlan = ColorPlan {
            divisor: 3,
            targets,
            exact: true,
        };

        for seed in 0..10 {
            let mut rng: ChaCha8Rng = ChaCha8Rng::seed_from_u64(seed);
            let mut grid: LegacyGrid = red_row(8);
            grid.apply(
                Position::new(0, 1),
                Mechanic::Pipe {
                    direction: Direction::Right,
                    capacity: 2,
                },
            );
            fill_contents(&mut grid, &p, &mut rng);

            let report: RebalanceReport =
                rebalance(&mut grid, &p, GenerationMode::Symmetric, &mut rng);
            assert!(report.deviations.is_empty(), "{:?}", report.deviations);
            assert_eq!(color_totals(&grid), p.targets);
            for x in 1..4 {
                let left: Position = Position::new(x, 1);
                assert_eq!(grid.color_at(left), grid.color_at(mirror(left, 8)));
            }
        }
    }
}
