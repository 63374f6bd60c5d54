/*
cli_options.rs

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

//! Process command-line options.
//!
//! These options are intended for level designers.
//! The tool generates levels and prints them in JSON format on the standard output.
//!
//! # Examples
//!
//! Generate a symmetric level with two pipes:
//!
//! ```text
//! $ tilegen --width 9 --height 10 --blocks 27 --colors Red,Blue,Green \
//!     --mode symmetric --element Pipe=2 --pretty
//! ```
//!
//! Generate 50 levels from a configuration file with a fixed seed, and print some statistics:
//!
//! ```text
//! $ tilegen --config level.json --seed 42 --count 50 --summary > levels.jsonl
//!
//!         total time = 0.0912s
//!       average time = 0.0018s
//!           max time = 0.0044s
//!          fallbacks = 2
//!             errors = 0
//! ```

use clap::Parser;
use env_logger::Env;
use log::{LevelFilter, debug};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use std::time::Instant;

use tilegen::config::{
    COPYRIGHT_NOTICE, Color, Difficulty, ElementKind, GenerationMode, LevelConfig,
};
use tilegen::errors::GenerationError;
use tilegen::generator::adapter::{GeneratorKind, GeneratorStrategy, generate_level};
use tilegen::level::GeneratedLevel;

/// Generate tile-matching puzzle levels.
#[derive(Parser, Debug)]
#[command(about, long_about = None, version, long_version = COPYRIGHT_NOTICE)]
struct Args {
    /// Load the level configuration from a JSON file. The other options override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of columns [default: 9]
    #[arg(long)]
    width: Option<usize>,

    /// Number of rows [default: 10]
    #[arg(long)]
    height: Option<usize>,

    /// Number of colored blocks [default: 27]
    #[arg(short, long)]
    blocks: Option<usize>,

    /// Comma-separated list of colors [default: Red,Blue,Green]
    #[arg(long, value_delimiter = ',')]
    colors: Option<Vec<String>>,

    /// Board layout
    #[arg(value_enum, short, long)]
    mode: Option<GenerationMode>,

    /// Difficulty level
    #[arg(value_enum, short = 'f', long)]
    difficulty: Option<Difficulty>,

    /// Request a mechanic, such as Pipe=2. Can be repeated
    #[arg(short, long = "element", value_name = "KIND=N", value_parser = parse_element)]
    elements: Vec<(ElementKind, usize)>,

    /// Generator to try first
    #[arg(value_enum, long, default_value_t = GeneratorStrategy::Classified)]
    strategy: GeneratorStrategy,

    /// Seed for reproducible levels
    #[arg(long)]
    seed: Option<u64>,

    /// Number of levels to generate
    #[arg(short, long, default_value_t = 1)]
    count: usize,

    /// Indent the JSON output
    #[arg(short, long, default_value_t = false)]
    pretty: bool,

    /// Print some statistics after generating the levels
    #[arg(short, long, default_value_t = false)]
    summary: bool,

    /// Enable debug messages
    #[arg(short, long, default_value_t = false)]
    debug: bool,
}

/// Parse a `KIND=N` element request.
fn parse_element(s: &str) -> Result<(ElementKind, usize), String> {
    let (name, count) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KIND=N, got `{s}`"))?;
    let kind: ElementKind =
        ElementKind::from_name(name).ok_or_else(|| format!("unknown element `{name}`"))?;
    let count: usize = count
        .trim()
        .parse()
        .map_err(|e| format!("invalid count `{count}`: {e}"))?;
    Ok((kind, count))
}

/// Build the level configuration from the file and the options.
fn build_config(args: &Args) -> Result<LevelConfig, String> {
    let mut config: LevelConfig = match &args.config {
        Some(path) => LevelConfig::from_json_file(path)
            .map_err(|e| format!("Cannot load {}: {e}", path.display()))?,
        None => LevelConfig::new(9, 10, 27, &["Red", "Blue", "Green"]),
    };

    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(blocks) = args.blocks {
        config.block_count = blocks;
    }
    if let Some(colors) = &args.colors {
        config.selected_colors = colors.iter().map(|c| Color::from(c.trim())).collect();
        config.color_count = config.selected_colors.len();
    }
    if let Some(mode) = args.mode {
        config.generation_mode = mode;
    }
    if let Some(difficulty) = args.difficulty {
        config.difficulty = difficulty;
    }
    for (kind, count) in &args.elements {
        config.elements.insert(*kind, *count);
    }
    Ok(config)
}

/// Generate the levels and print them. Return the process exit code.
fn run<R: Rng>(args: &Args, config: &LevelConfig, rng: &mut R) -> u8 {
    let mut total: f32 = 0.0;
    let mut max: f32 = 0.0;
    let mut fallbacks: usize = 0;
    let mut errors: usize = 0;

    for i in 0..args.count {
        debug!("Iteration {i}");

        let start: Instant = Instant::now();
        let ret: Result<GeneratedLevel, GenerationError> =
            generate_level(config, args.strategy, rng);
        let duration: f32 = start.elapsed().as_secs_f32();
        total += duration;
        if duration > max {
            max = duration;
        }

        match ret {
            Ok(level) => {
                if args.strategy == GeneratorStrategy::Classified
                    && level.generator == GeneratorKind::Legacy
                {
                    fallbacks += 1;
                }
                let json: Result<String, serde_json::Error> = if args.pretty {
                    serde_json::to_string_pretty(&level)
                } else {
                    serde_json::to_string(&level)
                };
                match json {
                    Ok(s) => println!("{s}"),
                    Err(e) => {
                        eprintln!("Cannot serialize level {}: {e}", level.id);
                        errors += 1;
                    }
                }
            }
            Err(GenerationError::Config(e)) => {
                // Every iteration would fail the same way
                eprintln!("Invalid configuration: {e}");
                return 2;
            }
            Err(e) => {
                eprintln!("Error: {e}");
                errors += 1;
            }
        }
    }

    // Print some stats
    if args.summary {
        eprintln!(
            "
        total time = {}s
      average time = {}s
          max time = {}s
         fallbacks = {}
            errors = {}",
            total,
            total / args.count.max(1) as f32,
            max,
            fallbacks,
            errors
        );
    }

    if errors > 0 { 1 } else { 0 }
}

/// Parse and process command-line options. Return the process exit code.
pub fn parse() -> u8 {
    let args: Args = Args::parse();

    let mut builder: env_logger::Builder =
        env_logger::Builder::from_env(Env::default().default_filter_or("warn"));
    if args.debug {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();

    let config: LevelConfig = match build_config(&args) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return 2;
        }
    };
    debug!("Configuration: {config:?}");

    match args.seed {
        Some(seed) => run(&args, &config, &mut ChaCha8Rng::seed_from_u64(seed)),
        None => run(&args, &config, &mut rand::rng()),
    }
}
