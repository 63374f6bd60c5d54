/*
scenarios.rs

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

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use tilegen::config::{ElementKind, GenerationMode, LevelConfig};
use tilegen::errors::GenerationError;
use tilegen::generator::adapter::{GeneratorKind, GeneratorStrategy, generate_level};
use tilegen::generator::board::{Board, Element};
use tilegen::generator::classified::ClassifiedGenerator;
use tilegen::generator::distribution::DivisorRule;
use tilegen::generator::geometry::{Direction, Grid, Position, is_connected, mirror, step};
use tilegen::generator::pipeline::LevelGenerator;
use tilegen::level::GeneratedLevel;

fn generate(config: &LevelConfig, seed: u64) -> GeneratedLevel {
    let mut rng: ChaCha8Rng = ChaCha8Rng::seed_from_u64(seed);
    generate_level(config, GeneratorStrategy::Classified, &mut rng).unwrap()
}

fn assert_divisible(board: &Board, divisor: usize) {
    for (color, count) in board.color_totals() {
        assert_eq!(count % divisor, 0, "{color} has {count} cells");
    }
}

#[test]
fn single_pipe_on_three_colors() {
    let config: LevelConfig = LevelConfig::new(9, 10, 27, &["Red", "Blue", "Green"])
        .with_element(ElementKind::Pipe, 1);

    for seed in 0..5 {
        let level: GeneratedLevel = generate(&config, seed);
        assert_eq!(level.generator, GeneratorKind::Classified);
        assert_eq!(level.board.total_colored(), 27);
        assert_divisible(&level.board, 9);
        assert_eq!(level.board.color_totals().len(), 3);
        assert!(is_connected(&level.board));

        let pipes: Vec<Position> = level.board.positions_of(Element::Pipe);
        assert_eq!(pipes.len(), 1);
        let direction: Direction = level
            .board
            .get(pipes[0])
            .and_then(|c| c.pipe_direction)
            .unwrap();
        let target: Position = step(pipes[0], direction, 9, 10).unwrap();
        assert!(level.board.is_block(target));
        assert_eq!(level.pipe_info.as_ref().map(Vec::len), Some(1));
    }
}

#[test]
fn divisor_boundary() {
    assert_eq!(DivisorRule::Adaptive.divisor(18, 2), 9);
    assert_eq!(DivisorRule::Adaptive.divisor(15, 2), 3);

    let at_boundary: LevelConfig = LevelConfig::new(9, 10, 18, &["Red", "Blue"]);
    let below: LevelConfig = LevelConfig::new(9, 10, 15, &["Red", "Blue"]);
    for seed in 0..5 {
        let level: GeneratedLevel = generate(&at_boundary, seed);
        assert_eq!(level.generator, GeneratorKind::Classified);
        assert_eq!(level.board.total_colored(), 18);
        assert_divisible(&level.board, 9);

        let level: GeneratedLevel = generate(&below, seed);
        assert_eq!(level.generator, GeneratorKind::Classified);
        assert_eq!(level.board.total_colored(), 15);
        assert_divisible(&level.board, 3);
    }
}

#[test]
fn locks_have_one_key_each() {
    let config: LevelConfig = LevelConfig::new(9, 10, 27, &["Red", "Blue", "Green"])
        .with_element(ElementKind::BlockLock, 2);

    for seed in 0..5 {
        let level: GeneratedLevel = generate(&config, seed);
        assert!(level.shortfalls.is_empty());
        assert!(is_connected(&level.board));

        let locks = level.lock_info.unwrap();
        assert_eq!(locks.len(), 2);
        assert_ne!(locks[0].id, locks[1].id);
        for lock in locks {
            let key: Position = lock.key_position.unwrap();
            let cell = level.board.get(key).unwrap();
            assert_eq!(cell.element, Some(Element::Key));
            assert_eq!(cell.key_id, Some(lock.id));
            assert!(cell.color.is_some());
            assert!(cell.lock_id.is_none());
        }
    }
}

#[test]
fn over_constrained_request_falls_back() {
    let config: LevelConfig = LevelConfig::new(9, 10, 5, &["Red", "Blue"])
        .with_element(ElementKind::Pipe, 3)
        .with_element(ElementKind::BlockLock, 2);

    for seed in 0..5 {
        let mut rng: ChaCha8Rng = ChaCha8Rng::seed_from_u64(seed);
        let primary: Result<_, GenerationError> =
            ClassifiedGenerator::new().generate(&config, &mut rng);
        assert!(primary.is_err());

        let level: GeneratedLevel = generate(&config, seed);
        assert_eq!(level.generator, GeneratorKind::Legacy);
        assert_eq!(level.board.total_colored(), 5);
        assert!(is_connected(&level.board));
    }
}

fn assert_mirrored(board: &Board) {
    let width: usize = board.width();
    for y in 0..board.height() {
        for x in 0..width / 2 {
            let p: Position = Position::new(x, y);
            let m: Position = mirror(p, width);
            assert_eq!(m.x, width - 1 - x);
            assert_eq!(board.is_block(p), board.is_block(m), "({x}, {y})");
            let color = board.get(p).and_then(|c| c.color.clone());
            let twin = board.get(m).and_then(|c| c.color.clone());
            assert_eq!(color, twin, "({x}, {y})");
        }
    }
}

#[test]
fn symmetric_boards_mirror_around_the_center() {
    let config: LevelConfig = LevelConfig::new(9, 10, 27, &["Red", "Blue", "Green"])
        .with_mode(GenerationMode::Symmetric);

    for seed in 0..20 {
        let level: GeneratedLevel = generate(&config, seed);
        let board: &Board = &level.board;
        assert_eq!(level.generator, GeneratorKind::Classified, "seed {seed}");
        assert_eq!(board.total_colored(), 27);
        assert_divisible(board, 9);
        assert_mirrored(board);
    }
}

#[test]
fn symmetric_boards_with_many_colors() {
    let config: LevelConfig = LevelConfig::new(
        9,
        10,
        45,
        &["Red", "Blue", "Green", "Yellow", "Purple"],
    )
    .with_mode(GenerationMode::Symmetric);

    for seed in 0..20 {
        let level: GeneratedLevel = generate(&config, seed);
        assert_eq!(level.board.total_colored(), 45);
        assert_eq!(level.board.color_totals().len(), 5);
        assert_divisible(&level.board, 3);
        assert_mirrored(&level.board);
        assert!(is_connected(&level.board));
    }
}

#[test]
fn even_width_symmetric_boards() {
    let config: LevelConfig =
        LevelConfig::new(8, 8, 18, &["Red", "Blue"]).with_mode(GenerationMode::Symmetric);

    for seed in 0..20 {
        // Two odd counts of nine have no center column to sit on
        let level: GeneratedLevel = generate(&config, seed);
        assert_eq!(level.generator, GeneratorKind::Legacy);
        assert_eq!(level.board.total_colored(), 18);
        assert_divisible(&level.board, 3);
        assert_mirrored(&level.board);
    }
}

#[test]
fn level_serializes_to_camel_case() {
    let config: LevelConfig = LevelConfig::new(9, 10, 27, &["Red", "Blue", "Green"])
        .with_element(ElementKind::Pipe, 1);
    let level: GeneratedLevel = generate(&config, 7);

    let json: serde_json::Value = serde_json::to_value(&level).unwrap();
    assert!(json["id"].as_str().unwrap().starts_with("level-"));
    assert_eq!(json["config"]["blockCount"], 27);
    assert_eq!(json["generator"], "classified");
    assert_eq!(json["solvable"], true);
    assert!(json["difficultyScore"].as_u64().unwrap() > 0);
    assert_eq!(json["board"].as_array().unwrap().len(), 10);
    assert_eq!(json["containers"].as_array().unwrap().len(), 9);
    assert!(json.get("pipeInfo").is_some());
    assert!(json.get("lockInfo").is_none());

    let back: GeneratedLevel = serde_json::from_value(json).unwrap();
    assert_eq!(back.board, level.board);
}
