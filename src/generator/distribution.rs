/*
distribution.rs

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

//! Split the block count between the colors.
//!
//! Players pick blocks three at a time, so every color count must be a multiple of three.
//! When the board is large enough, counts are multiples of nine.

use log::{Level, debug, log_enabled, warn};
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::Color;
use crate::errors::DistributionError;

/// Divisor used when every color can get at least nine blocks.
pub const LARGE_DIVISOR: usize = 9;

/// Minimum balance granularity.
pub const SMALL_DIVISOR: usize = 3;

/// How to select the divisor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DivisorRule {
    /// 9 when the block count allows nine blocks per color, otherwise 3.
    Adaptive,

    /// Always the given divisor.
    Fixed(usize),
}

impl DivisorRule {
    /// Return the divisor for the given block and color counts.
    pub fn divisor(self, block_count: usize, color_count: usize) -> usize {
        match self {
            DivisorRule::Adaptive => {
                if block_count >= color_count * LARGE_DIVISOR {
                    LARGE_DIVISOR
                } else {
                    SMALL_DIVISOR
                }
            }
            DivisorRule::Fixed(d) => d.max(1),
        }
    }
}

/// Target number of blocks for each color.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ColorPlan {
    /// Granularity of the targets.
    pub divisor: usize,

    /// Target count for each color. The sum equals the block count.
    pub targets: BTreeMap<Color, usize>,

    /// Whether every target is a multiple of the divisor.
    pub exact: bool,
}

impl ColorPlan {
    /// Target count for the given color. Colors outside the plan have a zero target.
    pub fn target(&self, color: &Color) -> usize {
        self.targets.get(color).copied().unwrap_or(0)
    }

    /// Sum of the targets.
    pub fn total(&self) -> usize {
        self.targets.values().sum()
    }

    /// Planned colors.
    pub fn colors(&self) -> Vec<Color> {
        self.targets.keys().cloned().collect()
    }

    /// Number of colors with an odd target.
    pub fn odd_targets(&self) -> usize {
        self.targets.values().filter(|t| *t % 2 == 1).count()
    }

    /// Keep at most `singles` colors with an odd target.
    ///
    /// On a symmetric board, mirrored cells share their color, so a color can only get an
    /// odd count through a cell that has no twin, such as a cell of the center column.
    /// Blocks move from one odd target to another, in chunks of the divisor when the divisor
    /// is odd. Both targets become even and stay multiples of the divisor.
    ///
    /// # Errors
    ///
    /// In strict mode, the method returns an error when an odd target is too small to give
    /// blocks away. In lenient mode, the method stops with a warning and the board keeps the
    /// extra odd targets.
    pub fn limit_odd_targets(
        &mut self,
        singles: usize,
        strict: bool,
    ) -> Result<(), DistributionError> {
        // An odd total always leaves one odd target
        let limit: usize = singles.max(self.total() % 2);
        let chunk: usize = if self.divisor % 2 == 1 {
            self.divisor
        } else {
            1
        };

        while self.odd_targets() > limit {
            let mut odd: Vec<(Color, usize)> = self
                .targets
                .iter()
                .filter(|(_, t)| *t % 2 == 1)
                .map(|(c, t)| (c.clone(), *t))
                .collect();
            odd.sort_by_key(|(_, t)| *t);
            let (Some((receiver, _)), Some((donor, donor_target))) =
                (odd.first().cloned(), odd.last().cloned())
            else {
                break;
            };

            if donor_target <= chunk {
                if strict {
                    return Err(DistributionError::SymmetricParity {
                        odd: odd.len(),
                        singles,
                    });
                }
                warn!(
                    "{} colors need an odd count for {singles} unpaired cells",
                    odd.len()
                );
                break;
            }

            debug!("Moving {chunk} blocks from {donor} to {receiver} for the symmetry");
            *self.targets.entry(donor).or_insert(0) -= chunk;
            *self.targets.entry(receiver).or_insert(0) += chunk;
            if chunk % self.divisor != 0 {
                self.exact = false;
            }
        }
        Ok(())
    }
}

/// Compute the target count of each color.
///
/// `reserved` is the number of colored cells already promised to mechanics (pipe contents,
/// colored elements). They are part of `block_count`.
///
/// Each color gets the same base share, rounded down to the divisor. The rest is handed out
/// in chunks of the divisor to randomly ordered colors, which gives some colors more blocks
/// than others.
///
/// # Errors
///
/// In strict mode, the method returns an error when the block count is not a multiple of the
/// divisor, or when the reserved cells use the whole block count.
/// In lenient mode, the remainder that is not a multiple of the divisor goes to a single color
/// and the plan is flagged as not exact.
pub fn plan<R: Rng>(
    block_count: usize,
    colors: &[Color],
    reserved: usize,
    rule: DivisorRule,
    strict: bool,
    rng: &mut R,
) -> Result<ColorPlan, DistributionError> {
    if colors.is_empty() {
        return Err(DistributionError::NoColors);
    }
    if strict && reserved >= block_count {
        return Err(DistributionError::ReservedExceedsBudget {
            reserved,
            block_count,
        });
    }

    let color_count: usize = colors.len();
    let divisor: usize = rule.divisor(block_count, color_count);
    if strict && block_count % divisor != 0 {
        return Err(DistributionError::Indivisible {
            block_count,
            color_count,
            divisor,
        });
    }

    let share: usize = block_count / color_count / divisor * divisor;
    let mut targets: BTreeMap<Color, usize> =
        colors.iter().map(|c| (c.clone(), share)).collect();
    let mut remainder: usize = block_count - share * color_count;

    let mut order: Vec<&Color> = colors.iter().collect();
    order.shuffle(rng);
    let mut i: usize = 0;
    while remainder >= divisor {
        *targets.entry(order[i % color_count].clone()).or_insert(0) += divisor;
        remainder -= divisor;
        i += 1;
    }

    let mut exact: bool = true;
    if remainder > 0 {
        let color: &Color = order[i % color_count];
        warn!("{remainder} blocks cannot be split in multiples of {divisor}, giving them to {color}");
        *targets.entry(color.clone()).or_insert(0) += remainder;
        exact = false;
    }

    if log_enabled!(Level::Debug) {
        debug!("Color plan: divisor = {divisor}  reserved = {reserved}");
        for (color, target) in &targets {
            debug!("    {color:>10} = {target}");
        }
    }

    Ok(ColorPlan {
        divisor,
        targets,
        exact,
    })
}

/// Shuffled queue of colors used to paint the blocks while they are placed.
pub struct ColorQueue {
    queue: Vec<Color>,
    palette: Vec<Color>,
}

impl ColorQueue {
    /// Create a [`ColorQueue`] object holding every planned color occurrence, in random order.
    ///
    /// # Errors
    ///
    /// The method returns an error if the plan has no color.
    pub fn new<R: Rng>(plan: &ColorPlan, rng: &mut R) -> Result<Self, DistributionError> {
        let palette: Vec<Color> = plan.colors();
        if palette.is_empty() {
            return Err(DistributionError::NoColors);
        }
        let mut queue: Vec<Color> = Vec::with_capacity(plan.total());
        for (color, target) in &plan.targets {
            queue.extend(std::iter::repeat_n(color.clone(), *target));
        }
        queue.shuffle(rng);
        Ok(Self { queue, palette })
    }

    /// Number of colors left in the queue.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Return the next color. When the queue is empty, a random palette color is returned.
    pub fn pop<R: Rng>(&mut self, rng: &mut R) -> Color {
        match self.queue.pop() {
            Some(c) => c,
            None => self.random(rng),
        }
    }

    /// Return the next color for a pair of mirrored blocks. Two occurrences of the color are
    /// removed from the queue when possible.
    pub fn pop_pair<R: Rng>(&mut self, rng: &mut R) -> Color {
        match self.queue.pop() {
            Some(c) => {
                if let Some(i) = self.queue.iter().rposition(|o| *o == c) {
                    self.queue.remove(i);
                }
                c
            }
            None => self.random(rng),
        }
    }

    /// Return a random palette color.
    pub fn random<R: Rng>(&self, rng: &mut R) -> Color {
        // The palette is never empty (see `ColorQueue::new`)
        self.palette
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| Color::new(""))
    }
}
