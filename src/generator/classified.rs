/*
classified.rs

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

//! Element-classification-aware generator.
//!
//! The generator keeps its own cell schema, [`ClassifiedCell`], that tells apart the cells
//! holding a pickable color (`isColorElement`) from the mechanic housings, and stores the
//! mechanic parameters in a separate [`ElementProperties`] record.
//! [`ClassifiedBoard::to_canonical`] converts the schema into the canonical [`Board`] before
//! the board leaves the generator.
//!
//! The generator uses the strict [`Policy::CLASSIFIED`] rules: color counts are exact
//! multiples of nine (or three for small boards) and symmetric boards must be exact mirrors.

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::adapter::GeneratorKind;
use super::board::{Board, BoardCell, CellType, Element};
use super::geometry::{Direction, Grid, Position};
use super::grid::{LevelGrid, Mechanic};
use super::pipeline::{self, GeneratorOutput, LevelGenerator, PipelineOutput, Policy};
use crate::config::{Color, ElementKind, LevelConfig};
use crate::errors::GenerationError;

/// Mechanic installed on a classified cell.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Pipe,
    Lock,
    Key,
    Bomb,
    Ice,
    Barrel,
    Barrier,
    PullPin,
    Moving,
}

impl From<ElementKind> for ElementType {
    fn from(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Pipe => ElementType::Pipe,
            ElementKind::BlockLock => ElementType::Lock,
            ElementKind::Bomb => ElementType::Bomb,
            ElementKind::Ice => ElementType::Ice,
            ElementKind::Barrel => ElementType::Barrel,
            ElementKind::Barrier => ElementType::Barrier,
            ElementKind::PullPin => ElementType::PullPin,
            ElementKind::Moving => ElementType::Moving,
        }
    }
}

impl From<ElementType> for Element {
    fn from(element_type: ElementType) -> Self {
        match element_type {
            ElementType::Pipe => Element::Pipe,
            ElementType::Lock => Element::BlockLock,
            ElementType::Key => Element::Key,
            ElementType::Bomb => Element::Bomb,
            ElementType::Ice => Element::Ice,
            ElementType::Barrel => Element::Barrel,
            ElementType::Barrier => Element::Barrier,
            ElementType::PullPin => Element::PullPin,
            ElementType::Moving => Element::Moving,
        }
    }
}

/// Mechanic parameters.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ElementProperties {
    /// Direction of a pipe, a moving belt, or a pull-pin.
    pub direction: Option<Direction>,

    /// Number of colors a container holds.
    pub capacity: Option<usize>,

    /// Colors held by a container. The first color comes out first.
    pub contents: Vec<Color>,

    /// Identifier shared by a lock and its key.
    pub link_id: Option<u32>,
}

/// Cell of the classified schema.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedCell {
    pub occupied: bool,

    pub color: Option<Color>,

    /// Whether the cell holds a pickable color. False for empty cells and mechanic housings.
    pub is_color_element: bool,

    pub element_type: Option<ElementType>,

    pub element_properties: ElementProperties,
}

impl ClassifiedCell {
    fn colored(color: Color, element_type: Option<ElementType>) -> Self {
        Self {
            occupied: true,
            color: Some(color),
            is_color_element: true,
            element_type,
            element_properties: ElementProperties::default(),
        }
    }

    fn housing(element_type: ElementType, properties: ElementProperties) -> Self {
        Self {
            occupied: true,
            color: None,
            is_color_element: false,
            element_type: Some(element_type),
            element_properties: properties,
        }
    }

    fn is_container(&self) -> bool {
        matches!(
            self.element_type,
            Some(ElementType::Pipe) | Some(ElementType::Moving)
        )
    }

    /// Convert the cell into the canonical schema.
    ///
    /// The mechanic properties are hoisted to the matching top-level fields.
    pub fn to_canonical(&self) -> BoardCell {
        if !self.occupied {
            return BoardCell::empty();
        }
        let props: &ElementProperties = &self.element_properties;
        let mut cell: BoardCell = BoardCell {
            cell_type: CellType::Block,
            color: self.color.clone().filter(|_| self.is_color_element),
            element: self.element_type.map(Element::from),
            ..BoardCell::default()
        };
        match self.element_type {
            Some(ElementType::Pipe) => {
                cell.pipe_direction = props.direction;
                cell.pipe_size = props.capacity;
                cell.pipe_contents = Some(props.contents.clone());
            }
            Some(ElementType::Moving) => {
                cell.moving_direction = props.direction;
                cell.moving_distance = props.capacity;
                cell.moving_contents = Some(props.contents.clone());
            }
            Some(ElementType::Lock) => cell.lock_id = props.link_id,
            Some(ElementType::Key) => cell.key_id = props.link_id,
            Some(ElementType::PullPin) => cell.pin_direction = props.direction,
            _ => (),
        }
        cell
    }
}

/// Grid of [`ClassifiedCell`] objects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedBoard {
    rows: Vec<Vec<ClassifiedCell>>,
    container_order: Vec<Position>,
}

impl ClassifiedBoard {
    /// Create a board of empty cells.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            rows: vec![vec![ClassifiedCell::default(); width]; height],
            container_order: Vec::new(),
        }
    }

    pub fn get(&self, position: Position) -> Option<&ClassifiedCell> {
        self.rows.get(position.y).and_then(|r| r.get(position.x))
    }

    fn get_mut(&mut self, position: Position) -> Option<&mut ClassifiedCell> {
        self.rows.get_mut(position.y).and_then(|r| r.get_mut(position.x))
    }

    fn set(&mut self, position: Position, cell: ClassifiedCell) {
        if let Some(c) = self.get_mut(position) {
            *c = cell;
        }
    }

    fn install_container(
        &mut self,
        position: Position,
        element_type: ElementType,
        direction: Direction,
        capacity: usize,
    ) {
        let properties: ElementProperties = ElementProperties {
            direction: Some(direction),
            capacity: Some(capacity),
            contents: Vec::with_capacity(capacity),
            link_id: None,
        };
        self.set(position, ClassifiedCell::housing(element_type, properties));
        self.container_order.push(position);
    }

    /// Turn a colored cell into a lock or a key. The cell keeps its color.
    fn link(&mut self, position: Position, element_type: ElementType, id: u32) {
        if let Some(cell) = self.get_mut(position) {
            cell.element_type = Some(element_type);
            cell.element_properties.link_id = Some(id);
        }
    }

    /// Convert the board into the canonical schema. The object is not modified.
    pub fn to_canonical(&self) -> Board {
        Board::from_rows(
            self.rows
                .iter()
                .map(|row| row.iter().map(|c| c.to_canonical()).collect())
                .collect(),
        )
    }
}

impl Grid for ClassifiedBoard {
    fn width(&self) -> usize {
        self.rows.first().map_or(0, |r| r.len())
    }

    fn height(&self) -> usize {
        self.rows.len()
    }

    fn is_block(&self, position: Position) -> bool {
        self.get(position).is_some_and(|c| c.occupied)
    }
}

impl LevelGrid for ClassifiedBoard {
    fn place_block(&mut self, position: Position, color: Color) {
        self.set(position, ClassifiedCell::colored(color, None));
    }

    fn apply(&mut self, position: Position, mechanic: Mechanic) {
        match mechanic {
            Mechanic::Pipe {
                direction,
                capacity,
            } => self.install_container(position, ElementType::Pipe, direction, capacity),
            Mechanic::Moving {
                direction,
                capacity,
            } => self.install_container(position, ElementType::Moving, direction, capacity),
            Mechanic::Lock { id } => self.link(position, ElementType::Lock, id),
            Mechanic::Key { id } => self.link(position, ElementType::Key, id),
            Mechanic::ColorElement { kind, color } => {
                self.set(position, ClassifiedCell::colored(color, Some(kind.into())));
            }
            Mechanic::Obstacle { kind, direction } => {
                let properties: ElementProperties = ElementProperties {
                    direction,
                    ..ElementProperties::default()
                };
                self.set(position, ClassifiedCell::housing(kind.into(), properties));
            }
        }
    }

    fn revert(&mut self, position: Position) {
        if let Some(cell) = self.get_mut(position) {
            cell.element_type = None;
            cell.element_properties = ElementProperties::default();
        }
    }

    fn color_at(&self, position: Position) -> Option<&Color> {
        self.get(position)
            .filter(|c| c.occupied && c.is_color_element)
            .and_then(|c| c.color.as_ref())
    }

    fn repaint(&mut self, position: Position, color: Color) {
        if let Some(cell) = self
            .get_mut(position)
            .filter(|c| c.occupied && c.is_color_element)
        {
            cell.color = Some(color);
        }
    }

    fn is_plain(&self, position: Position) -> bool {
        self.get(position)
            .is_some_and(|c| c.occupied && c.is_color_element && c.element_type.is_none())
    }

    fn is_lock(&self, position: Position) -> bool {
        self.get(position)
            .is_some_and(|c| c.element_type == Some(ElementType::Lock))
    }

    fn containers(&self) -> &[Position] {
        &self.container_order
    }

    fn capacity(&self, position: Position) -> usize {
        self.get(position)
            .filter(|c| c.is_container())
            .and_then(|c| c.element_properties.capacity)
            .unwrap_or(0)
    }

    fn grow_capacity(&mut self, position: Position, extra: usize) {
        if let Some(cell) = self.get_mut(position).filter(|c| c.is_container()) {
            let capacity: usize = cell.element_properties.capacity.unwrap_or(0);
            cell.element_properties.capacity = Some(capacity + extra);
        }
    }

    fn contents(&self, position: Position) -> &[Color] {
        self.get(position)
            .filter(|c| c.is_container())
            .map_or(&[], |c| c.element_properties.contents.as_slice())
    }

    fn contents_mut(&mut self, position: Position) -> Option<&mut Vec<Color>> {
        self.get_mut(position)
            .filter(|c| c.is_container())
            .map(|c| &mut c.element_properties.contents)
    }
}

/// [`ClassifiedGenerator`] object.
pub struct ClassifiedGenerator {
    /// Duration in seconds of the last generation.
    pub duration: f32,

    /// Number of repaint operations during the last generation.
    pub rebalance_moves: usize,

    /// Time when the generation started. Used to compute the [`ClassifiedGenerator::duration`].
    start: Instant,
}

impl ClassifiedGenerator {
    /// Create the object.
    pub fn new() -> Self {
        Self {
            duration: 0.0,
            rebalance_moves: 0,
            start: Instant::now(),
        }
    }
}

impl Default for ClassifiedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl LevelGenerator for ClassifiedGenerator {
    fn kind(&self) -> GeneratorKind {
        GeneratorKind::Classified
    }

    fn generate<R: Rng>(
        &mut self,
        config: &LevelConfig,
        rng: &mut R,
    ) -> Result<GeneratorOutput, GenerationError> {
        self.start = Instant::now();
        let grid: ClassifiedBoard = ClassifiedBoard::new(config.width, config.height);
        let out: PipelineOutput<ClassifiedBoard> =
            pipeline::run(config, &Policy::CLASSIFIED, grid, rng)?;
        self.rebalance_moves = out.report.moves;
        self.duration = self.start.elapsed().as_secs_f32();
        debug!(
            "Classified generator: rebalance moves = {}  Duration = {}",
            self.rebalance_moves, self.duration
        );

        pipeline::finish(
            self.kind(),
            &Policy::CLASSIFIED,
            config,
            out.grid.to_canonical(),
            out.plan,
            out.shortfalls,
            self.duration,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{DistributionError, ValidationError};
    use crate::generator::geometry::{is_connected, step};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn pipe_is_hoisted_to_canonical_fields() {
        let mut board: ClassifiedBoard = ClassifiedBoard::new(2, 1);
        board.place_block(Position::new(0, 0), Color::from("Red"));
        board.place_block(Position::new(1, 0), Color::from("Blue"));
        board.apply(
            Position::new(1, 0),
            Mechanic::Pipe {
                direction: Direction::Left,
                capacity: 2,
            },
        );
        if let Some(contents) = board.contents_mut(Position::new(1, 0)) {
            contents.push(Color::from("Blue"));
            contents.push(Color::from("Red"));
        }

        let classified: serde_json::Value =
            serde_json::to_value(board.get(Position::new(1, 0))).unwrap();
        assert_eq!(classified["isColorElement"], false);
        assert_eq!(classified["elementType"], "pipe");
        assert_eq!(classified["elementProperties"]["capacity"], 2);

        let canonical: Board = board.to_canonical();
        let cell: &BoardCell = canonical.get(Position::new(1, 0)).unwrap();
        assert_eq!(cell.element, Some(Element::Pipe));
        assert_eq!(cell.color, None);
        assert_eq!(cell.pipe_direction, Some(Direction::Left));
        assert_eq!(cell.pipe_size, Some(2));
        assert_eq!(
            cell.pipe_contents,
            Some(vec![Color::from("Blue"), Color::from("Red")])
        );
        assert_eq!(canonical.total_colored(), 3);
    }

    #[test]
    fn lock_and_key_keep_their_color() {
        let mut board: ClassifiedBoard = ClassifiedBoard::new(2, 1);
        board.place_block(Position::new(0, 0), Color::from("Red"));
        board.place_block(Position::new(1, 0), Color::from("Blue"));
        board.apply(Position::new(0, 0), Mechanic::Lock { id: 7 });
        board.apply(Position::new(1, 0), Mechanic::Key { id: 7 });

        let canonical: Board = board.to_canonical();
        let lock: &BoardCell = canonical.get(Position::new(0, 0)).unwrap();
        let key: &BoardCell = canonical.get(Position::new(1, 0)).unwrap();
        assert_eq!(lock.element, Some(Element::BlockLock));
        assert_eq!(lock.lock_id, Some(7));
        assert_eq!(lock.color, Some(Color::from("Red")));
        assert_eq!(key.element, Some(Element::Key));
        assert_eq!(key.key_id, Some(7));

        board.revert(Position::new(0, 0));
        assert!(board.is_plain(Position::new(0, 0)));
    }

    #[test]
    fn generates_balanced_boards() {
        for seed in 0..10 {
            let mut rng: ChaCha8Rng = ChaCha8Rng::seed_from_u64(seed);
            let config: LevelConfig = LevelConfig::new(9, 10, 27, &["Red", "Blue", "Green"])
                .with_element(ElementKind::Pipe, 1);
            let mut generator: ClassifiedGenerator = ClassifiedGenerator::new();

            let out: GeneratorOutput = generator.generate(&config, &mut rng).unwrap();
            assert_eq!(out.kind, GeneratorKind::Classified);
            assert_eq!(out.board.total_colored(), 27);
            assert!(out.summary.color_totals.values().all(|c| c % 9 == 0));
            assert!(is_connected(&out.board));

            let pipes: Vec<Position> = out.board.positions_of(Element::Pipe);
            assert_eq!(pipes.len(), 1);
            let d: Direction = out.board.get(pipes[0]).and_then(|c| c.pipe_direction).unwrap();
            assert!(out.board.is_block(step(pipes[0], d, 9, 10).unwrap()));
        }
    }

    #[test]
    fn strict_rules_reject_small_boards() {
        let mut rng: ChaCha8Rng = ChaCha8Rng::seed_from_u64(1);
        let config: LevelConfig = LevelConfig::new(9, 10, 5, &["Red", "Blue"])
            .with_element(ElementKind::Pipe, 3)
            .with_element(ElementKind::BlockLock, 2);
        let err: GenerationError = ClassifiedGenerator::new()
            .generate(&config, &mut rng)
            .unwrap_err();

        assert!(matches!(
            err,
            GenerationError::Distribution(DistributionError::ReservedExceedsBudget { .. })
                | GenerationError::Distribution(DistributionError::Indivisible { .. })
                | GenerationError::Validation(ValidationError::Imbalance { .. })
        ));
    }
}
