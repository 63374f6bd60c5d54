/*
pipeline.rs

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

//! Generation stages shared by the generators.
//!
//! The stages run in order on a [`LevelGrid`] object:
//!
//! 1. Sample the container sizes and count the colored elements ([`Reservations`]).
//! 2. Compute the color targets ([`distribution::plan`]). Symmetric boards limit the number
//!    of colors with an odd target to the cells that have no twin.
//! 3. Grow the plain blocks ([`PlacementEngine`]).
//! 4. Install the mechanics ([`ElementPlacer`]).
//! 5. Close the gap left by the mechanics that could not be placed.
//! 6. Fill the containers and rebalance the colors ([`rebalance`]).
//!
//! The generators differ by their [`Policy`] and by their cell representation.

use log::{Level, debug, log_enabled};
use rand::Rng;

use super::adapter::GeneratorKind;
use super::board::Board;
use super::distribution::{self, ColorPlan, ColorQueue, DivisorRule, SMALL_DIVISOR};
use super::elements::{ElementPlacer, Reservations};
use super::geometry::Position;
use super::grid::{LevelGrid, colored_count, reserved_capacity};
use super::placement::PlacementEngine;
use super::rebalance::{self, RebalanceReport};
use super::validator::{self, Expectation, ValidationSummary};
use crate::config::{ElementKind, GenerationMode, LevelConfig};
use crate::errors::{ElementShortfall, GenerationError};

/// Rules that differ between the generators.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Policy {
    /// Color count granularity.
    pub divisor_rule: DivisorRule,

    /// Strict policies reject configurations that cannot be balanced exactly, and validate
    /// the color counts by divisibility.
    pub strict: bool,

    /// Accepted difference between a color count and its target, for lenient policies.
    pub tolerance: usize,
}

impl Policy {
    /// Policy of the element-classification-aware generator.
    pub const CLASSIFIED: Policy = Policy {
        divisor_rule: DivisorRule::Adaptive,
        strict: true,
        tolerance: 0,
    };

    /// Policy of the legacy generator.
    pub const LEGACY: Policy = Policy {
        divisor_rule: DivisorRule::Fixed(SMALL_DIVISOR),
        strict: false,
        tolerance: 2,
    };

    /// Build the validation expectation for a configuration and its color plan.
    pub fn expectation(&self, config: &LevelConfig, plan: &ColorPlan) -> Expectation {
        Expectation {
            block_count: config.block_count,
            divisor: plan.divisor,
            targets: plan.targets.clone(),
            tolerance: self.tolerance,
            strict: self.strict,
            symmetric: config.generation_mode == GenerationMode::Symmetric,
            colors: config.selected_colors.clone(),
        }
    }
}

/// Result of the generation stages.
pub struct PipelineOutput<G> {
    /// Generated grid, in the generator representation.
    pub grid: G,

    pub plan: ColorPlan,

    /// Mechanics placed fewer times than requested.
    pub shortfalls: Vec<ElementShortfall>,

    pub report: RebalanceReport,
}

/// Run the generation stages on an empty grid.
///
/// # Errors
///
/// The method returns an error when the colors cannot be distributed, or when the grid is too
/// small for the requested blocks.
pub fn run<G: LevelGrid, R: Rng>(
    config: &LevelConfig,
    policy: &Policy,
    mut grid: G,
    rng: &mut R,
) -> Result<PipelineOutput<G>, GenerationError> {
    let mode: GenerationMode = config.generation_mode;

    let mut reservations: Reservations = Reservations::sample(config, rng);
    if !policy.strict {
        reservations.fit(config.block_count);
    }

    let mut plan: ColorPlan = distribution::plan(
        config.block_count,
        &config.selected_colors,
        reservations.reserved_cells(),
        policy.divisor_rule,
        policy.strict,
        rng,
    )?;
    let mut engine: PlacementEngine = PlacementEngine::new(mode);
    if mode == GenerationMode::Symmetric {
        // Only the center column has cells without a twin
        let singles: usize = if config.width % 2 == 1 {
            config.height
        } else {
            0
        };
        plan.limit_odd_targets(singles, policy.strict)?;
        // Locks and containers may take some of the center cells
        engine.min_centers = plan.odd_targets()
            + config.requested(ElementKind::BlockLock)
            + reservations.housings();
    }
    let mut queue: ColorQueue = ColorQueue::new(&plan, rng)?;

    let structural: usize = reservations.structural_count(config.block_count);
    debug!(
        "Reserved = {}  Housings = {}  Plain blocks = {structural}",
        reservations.reserved_cells(),
        reservations.housings()
    );
    engine.place(&mut grid, structural, &mut queue, rng)?;

    let mut placer: ElementPlacer = ElementPlacer::new(mode);
    let shortfalls: Vec<ElementShortfall> =
        placer.place_all(&mut grid, config, &mut reservations, &plan.colors(), rng);

    reconcile(&mut grid, config.block_count, &mut engine, &mut queue, rng)?;

    rebalance::fill_contents(&mut grid, &plan, rng);
    let report: RebalanceReport = rebalance::rebalance(&mut grid, &plan, mode, rng);

    Ok(PipelineOutput {
        grid,
        plan,
        shortfalls,
        report,
    })
}

/// Add the colored cells that the unplaced mechanics were supposed to provide.
///
/// Random boards grow extra plain blocks, and the containers absorb what cannot be grown.
/// Symmetric boards enlarge the containers first, because single blocks would break the
/// symmetry.
fn reconcile<G: LevelGrid, R: Rng>(
    grid: &mut G,
    block_count: usize,
    engine: &mut PlacementEngine,
    queue: &mut ColorQueue,
    rng: &mut R,
) -> Result<(), GenerationError> {
    let filled: usize = colored_count(grid) + reserved_capacity(grid);
    let deficit: usize = block_count.saturating_sub(filled);
    if deficit == 0 {
        return Ok(());
    }
    debug!("Closing a gap of {deficit} cells");

    if engine.mode == GenerationMode::Symmetric && absorb(grid, deficit) {
        return Ok(());
    }

    match engine.place(grid, deficit, queue, rng) {
        Ok(()) => Ok(()),
        Err(e) => {
            let filled: usize = colored_count(grid) + reserved_capacity(grid);
            if absorb(grid, block_count.saturating_sub(filled)) {
                Ok(())
            } else {
                Err(e)
            }
        }
    }
}

/// Spread extra capacity over the containers. Return false when there is no container.
fn absorb<G: LevelGrid>(grid: &mut G, extra: usize) -> bool {
    let containers: Vec<Position> = grid.containers().to_vec();
    if containers.is_empty() {
        return false;
    }
    for i in 0..extra {
        grid.grow_capacity(containers[i % containers.len()], 1);
    }
    true
}

/// Level produced by a generator, already converted to the canonical board.
#[derive(Debug, Clone)]
pub struct GeneratorOutput {
    /// Generator that produced the board.
    pub kind: GeneratorKind,

    pub board: Board,

    pub plan: ColorPlan,

    pub shortfalls: Vec<ElementShortfall>,

    pub summary: ValidationSummary,

    /// Generation duration in seconds.
    pub duration: f32,
}

/// Board generator.
pub trait LevelGenerator {
    /// Identify the generator in the generated levels.
    fn kind(&self) -> GeneratorKind;

    /// Generate and validate a board.
    ///
    /// # Errors
    ///
    /// The method returns an error when a stage fails or when the board does not pass the
    /// validation.
    fn generate<R: Rng>(
        &mut self,
        config: &LevelConfig,
        rng: &mut R,
    ) -> Result<GeneratorOutput, GenerationError>;
}

/// Validate a converted board and build the generator output.
pub fn finish(
    kind: GeneratorKind,
    policy: &Policy,
    config: &LevelConfig,
    board: Board,
    plan: ColorPlan,
    shortfalls: Vec<ElementShortfall>,
    duration: f32,
) -> Result<GeneratorOutput, GenerationError> {
    if log_enabled!(Level::Debug) {
        debug!("Board from the {kind} generator:\n{}", board.render());
    }
    let expectation: Expectation = policy.expectation(config, &plan);
    let summary: ValidationSummary = validator::validate(&board, &expectation)?;
    Ok(GeneratorOutput {
        kind,
        board,
        plan,
        shortfalls,
        summary,
        duration,
    })
}
