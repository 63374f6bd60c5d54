/*
adapter.rs

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

//! Select the generator and fall back to the legacy generator on failure.
//!
//! The selection is a state machine with a single fallback:
//!
//! ```text
//! Idle -> TryPrimary -> Success
//!                    -> PrimaryFailed -> TryFallback -> Success
//!                                                    -> FallbackFailed
//! ```
//!
//! With the [`GeneratorStrategy::Legacy`] strategy, the machine starts directly in
//! `TryFallback`.

use clap::ValueEnum;
use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use super::classified::ClassifiedGenerator;
use super::legacy::LegacyGenerator;
use super::pipeline::{GeneratorOutput, LevelGenerator};
use crate::config::LevelConfig;
use crate::errors::GenerationError;
use crate::level::GeneratedLevel;

/// Generator to try first.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, ValueEnum, Display)]
#[strum(serialize_all = "lowercase")]
pub enum GeneratorStrategy {
    /// Element-classification-aware generator, with the legacy generator as fallback.
    #[default]
    Classified,

    /// Legacy generator only.
    Legacy,
}

/// Generator that produced a level.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GeneratorKind {
    Classified,
    Legacy,
}

/// Adapter states.
#[derive(Debug)]
enum State {
    Idle,
    TryPrimary,
    PrimaryFailed(GenerationError),
    TryFallback,
    Success(GeneratorOutput),
    FallbackFailed(GenerationError),
}

/// Run the generators according to the strategy.
///
/// # Errors
///
/// The method returns the legacy generator error when the fallback fails too.
pub fn select<R: Rng>(
    config: &LevelConfig,
    strategy: GeneratorStrategy,
    rng: &mut R,
) -> Result<GeneratorOutput, GenerationError> {
    let mut state: State = State::Idle;

    loop {
        state = match state {
            State::Idle => match strategy {
                GeneratorStrategy::Classified => State::TryPrimary,
                GeneratorStrategy::Legacy => State::TryFallback,
            },
            State::TryPrimary => match ClassifiedGenerator::new().generate(config, rng) {
                Ok(output) => State::Success(output),
                Err(e) => State::PrimaryFailed(e),
            },
            State::PrimaryFailed(e) => {
                warn!("Classified generator failed ({e}), using the legacy generator");
                State::TryFallback
            }
            State::TryFallback => match LegacyGenerator::new().generate(config, rng) {
                Ok(output) => State::Success(output),
                Err(e) => State::FallbackFailed(e),
            },
            State::Success(output) => {
                debug!("Board generated by the {} generator", output.kind);
                return Ok(output);
            }
            State::FallbackFailed(e) => return Err(e),
        };
    }
}

/// Generate a level.
///
/// The configuration is validated first: malformed configurations are rejected without
/// trying any generator. The level echoes the normalized configuration.
///
/// # Errors
///
/// The method returns an error for malformed configurations, and when no generator can
/// produce a valid board.
///
/// # Example:
///
/// ```
/// use rand::SeedableRng;
/// use rand_chacha::ChaCha8Rng;
/// use tilegen::config::LevelConfig;
/// use tilegen::generator::adapter::{GeneratorStrategy, generate_level};
///
/// let config = LevelConfig::new(9, 10, 27, &["Red", "Blue", "Green"]);
/// let mut rng = ChaCha8Rng::seed_from_u64(42);
/// let level = generate_level(&config, GeneratorStrategy::Classified, &mut rng).unwrap();
/// assert_eq!(level.board.total_colored(), 27);
/// ```
pub fn generate_level<R: Rng>(
    config: &LevelConfig,
    strategy: GeneratorStrategy,
    rng: &mut R,
) -> Result<GeneratedLevel, GenerationError> {
    config.validate()?;
    let config: LevelConfig = config.normalized();
    info!(
        "Generating a {}x{} level with {} blocks ({strategy} strategy)",
        config.width, config.height, config.block_count
    );

    let output: GeneratorOutput = select(&config, strategy, rng)?;
    Ok(GeneratedLevel::new(config, output, rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ElementKind;
    use crate::errors::ConfigError;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn primary_generator_is_used_first() {
        let mut rng: ChaCha8Rng = ChaCha8Rng::seed_from_u64(1);
        let config: LevelConfig = LevelConfig::new(9, 10, 27, &["Red", "Blue", "Green"]);

        let output: GeneratorOutput =
            select(&config, GeneratorStrategy::Classified, &mut rng).unwrap();
        assert_eq!(output.kind, GeneratorKind::Classified);
    }

    #[test]
    fn fallback_on_primary_failure() {
        let mut rng: ChaCha8Rng = ChaCha8Rng::seed_from_u64(2);
        let config: LevelConfig = LevelConfig::new(9, 10, 5, &["Red", "Blue"])
            .with_element(ElementKind::Pipe, 3)
            .with_element(ElementKind::BlockLock, 2);

        let output: GeneratorOutput =
            select(&config, GeneratorStrategy::Classified, &mut rng).unwrap();
        assert_eq!(output.kind, GeneratorKind::Legacy);
    }

    #[test]
    fn legacy_strategy_skips_the_primary() {
        let mut rng: ChaCha8Rng = ChaCha8Rng::seed_from_u64(3);
        let config: LevelConfig = LevelConfig::new(9, 10, 27, &["Red", "Blue", "Green"]);

        let output: GeneratorOutput =
            select(&config, GeneratorStrategy::Legacy, &mut rng).unwrap();
        assert_eq!(output.kind, GeneratorKind::Legacy);
    }

    #[test]
    fn fallback_failure_is_returned() {
        let mut rng: ChaCha8Rng = ChaCha8Rng::seed_from_u64(4);
        // Not validated: more blocks than cells
        let config: LevelConfig = LevelConfig::new(2, 2, 5, &["Red", "Blue"]);

        assert_eq!(
            select(&config, GeneratorStrategy::Classified, &mut rng).map(|o| o.kind),
            Err(GenerationError::PlacementExhausted {
                placed: 4,
                required: 5
            })
        );
    }

    #[test]
    fn malformed_configs_are_rejected() {
        let mut rng: ChaCha8Rng = ChaCha8Rng::seed_from_u64(5);
        let config: LevelConfig = LevelConfig::new(0, 10, 5, &["Red", "Blue"]);

        assert!(matches!(
            generate_level(&config, GeneratorStrategy::Classified, &mut rng),
            Err(GenerationError::Config(ConfigError::ZeroDimension { .. }))
        ));
    }
}
