/*
board.rs

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

//! Canonical board representation.
//!
//! This is the schema handed to the consumers (rendering, export).
//! Generators may work on a richer private representation, but they always convert it into a
//! [`Board`] before returning.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::Display;

use super::geometry::{Direction, Grid, Position};
use crate::config::{Color, ElementKind};

/// Type of a board cell.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    #[default]
    Empty,
    Block,
}

/// Mechanic tag attached to a block cell.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, Display)]
pub enum Element {
    Pipe,
    BlockLock,
    Key,
    Bomb,
    Ice,
    Barrel,
    Barrier,
    PullPin,
    Moving,
}

impl From<ElementKind> for Element {
    fn from(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Pipe => Element::Pipe,
            ElementKind::BlockLock => Element::BlockLock,
            ElementKind::Bomb => Element::Bomb,
            ElementKind::Ice => Element::Ice,
            ElementKind::Barrel => Element::Barrel,
            ElementKind::Barrier => Element::Barrier,
            ElementKind::PullPin => Element::PullPin,
            ElementKind::Moving => Element::Moving,
        }
    }
}

/// One grid position.
///
/// Mechanic-specific fields are only set for the matching [`Element`].
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BoardCell {
    #[serde(rename = "type")]
    pub cell_type: CellType,

    /// Block color. None for empty cells and for non-color mechanics (pipe housing, barrier...)
    pub color: Option<Color>,

    pub element: Option<Element>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipe_direction: Option<Direction>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipe_size: Option<usize>,

    /// Colors held by the pipe. The first color comes out first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipe_contents: Option<Vec<Color>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_id: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moving_direction: Option<Direction>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moving_distance: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moving_contents: Option<Vec<Color>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin_direction: Option<Direction>,
}

impl BoardCell {
    /// Create an empty cell.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a plain color block.
    pub fn block(color: Color) -> Self {
        Self {
            cell_type: CellType::Block,
            color: Some(color),
            ..Self::default()
        }
    }

    /// Create a block with no color, such as a pipe housing or a barrier.
    pub fn housing(element: Element) -> Self {
        Self {
            cell_type: CellType::Block,
            element: Some(element),
            ..Self::default()
        }
    }

    pub fn is_block(&self) -> bool {
        self.cell_type == CellType::Block
    }

    /// Whether the cell counts as a colored cell.
    pub fn is_colored(&self) -> bool {
        self.is_block() && self.color.is_some()
    }

    /// Whether the cell is a colored block with no mechanic.
    pub fn is_plain(&self) -> bool {
        self.is_colored() && self.element.is_none() && self.lock_id.is_none() && self.key_id.is_none()
    }

    /// Colors held by a pipe or a moving belt.
    pub fn contents(&self) -> &[Color] {
        self.pipe_contents
            .as_deref()
            .or(self.moving_contents.as_deref())
            .unwrap_or(&[])
    }

    /// Configured direction of a pipe or a moving belt.
    pub fn container_direction(&self) -> Option<Direction> {
        self.pipe_direction.or(self.moving_direction)
    }

    /// Single character used in debug dumps.
    fn symbol(&self) -> char {
        match (self.element, &self.color) {
            _ if !self.is_block() => '.',
            (Some(Element::Pipe), _) => 'P',
            (Some(Element::Moving), _) => 'M',
            (Some(Element::BlockLock), _) => 'L',
            (Some(Element::Key), _) => 'K',
            (Some(Element::Bomb), _) => 'B',
            (Some(Element::Ice), _) => 'I',
            (Some(Element::Barrel), _) => 'O',
            (Some(Element::Barrier), _) => '#',
            (Some(Element::PullPin), _) => '!',
            (None, Some(c)) => c
                .name()
                .chars()
                .next()
                .map(|ch| ch.to_ascii_lowercase())
                .unwrap_or('?'),
            (None, None) => '?',
        }
    }
}

/// Grid of [`BoardCell`] objects, stored row by row.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct Board {
    rows: Vec<Vec<BoardCell>>,
}

impl Board {
    /// Create a board of empty cells.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            rows: vec![vec![BoardCell::empty(); width]; height],
        }
    }

    /// Create a board from its rows. Short rows are padded with empty cells.
    pub fn from_rows(mut rows: Vec<Vec<BoardCell>>) -> Self {
        let width: usize = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, BoardCell::empty());
        }
        Self { rows }
    }

    /// Return the rows.
    pub fn rows(&self) -> &[Vec<BoardCell>] {
        &self.rows
    }

    /// Get the cell at the given position, or None if the position is outside the board.
    pub fn get(&self, position: Position) -> Option<&BoardCell> {
        self.rows.get(position.y).and_then(|r| r.get(position.x))
    }

    /// Get a mutable reference to the cell at the given position.
    pub fn get_mut(&mut self, position: Position) -> Option<&mut BoardCell> {
        self.rows.get_mut(position.y).and_then(|r| r.get_mut(position.x))
    }

    /// Replace the cell at the given position.
    pub fn set(&mut self, position: Position, cell: BoardCell) {
        if let Some(c) = self.get_mut(position) {
            *c = cell;
        }
    }

    /// Number of colored board cells (contents excluded).
    pub fn colored_cells(&self) -> usize {
        self.iter().filter(|(_, c)| c.is_colored()).count()
    }

    /// Number of colors held in pipes and moving belts.
    pub fn content_cells(&self) -> usize {
        self.iter().map(|(_, c)| c.contents().len()).sum()
    }

    /// Number of colored cells including pipe and belt contents.
    pub fn total_colored(&self) -> usize {
        self.colored_cells() + self.content_cells()
    }

    /// Occurrences of each color, including pipe and belt contents.
    pub fn color_totals(&self) -> BTreeMap<Color, usize> {
        let mut totals: BTreeMap<Color, usize> = BTreeMap::new();
        for (_, cell) in self.iter() {
            if let Some(color) = cell.color.as_ref().filter(|_| cell.is_block()) {
                *totals.entry(color.clone()).or_insert(0) += 1;
            }
            for color in cell.contents() {
                *totals.entry(color.clone()).or_insert(0) += 1;
            }
        }
        totals
    }

    /// Positions of the cells with the given mechanic, in row-major order.
    pub fn positions_of(&self, element: Element) -> Vec<Position> {
        self.iter()
            .filter(|(_, c)| c.element == Some(element))
            .map(|(p, _)| p)
            .collect()
    }

    /// Render the board as text, one line per row.
    pub fn render(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<String>>()
            .join("\n")
    }

    /// Iterate over the board cells in row-major order.
    ///
    /// # Example:
    ///
    /// ```
    /// use tilegen::generator::board::Board;
    ///
    /// let board = Board::new(3, 2);
    /// for (position, cell) in board.iter().filter(|(_, c)| c.is_block()) {
    ///     println!("{},{} -> {:?}", position.x, position.y, cell.color);
    /// }
    /// ```
    pub fn iter(&self) -> BoardIterator<'_> {
        BoardIterator {
            board: self,
            x: 0,
            y: 0,
        }
    }
}

impl Grid for Board {
    fn width(&self) -> usize {
        self.rows.first().map_or(0, |r| r.len())
    }

    fn height(&self) -> usize {
        self.rows.len()
    }

    fn is_block(&self, position: Position) -> bool {
        self.get(position).is_some_and(|c| c.is_block())
    }
}

/// Iterator for the board cells.
pub struct BoardIterator<'a> {
    board: &'a Board,
    x: usize,
    y: usize,
}

impl<'a> Iterator for BoardIterator<'a> {
    type Item = (Position, &'a BoardCell);

    fn next(&mut self) -> Option<Self::Item> {
        if self.x >= self.board.width() {
            self.x = 0;
            self.y += 1;
        }
        let cell: &BoardCell = self.board.get(Position::new(self.x, self.y))?;
        let result: (Position, &BoardCell) = (Position::new(self.x, self.y), cell);
        self.x += 1;
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Board {
        let mut board: Board = Board::new(3, 2);
        board.set(Position::new(0, 0), BoardCell::block(Color::from("Red")));
        board.set(Position::new(1, 0), BoardCell::block(Color::from("Blue")));
        let mut pipe: BoardCell = BoardCell::housing(Element::Pipe);
        pipe.pipe_direction = Some(Direction::Left);
        pipe.pipe_size = Some(2);
        pipe.pipe_contents = Some(vec![Color::from("Red"), Color::from("Red")]);
        board.set(Position::new(1, 1), pipe);
        board
    }

    #[test]
    fn counts_include_contents() {
        let board: Board = sample();

        assert_eq!(board.colored_cells(), 2);
        assert_eq!(board.content_cells(), 2);
        assert_eq!(board.total_colored(), 4);
        assert_eq!(board.color_totals().get(&Color::from("Red")), Some(&3));
        assert_eq!(board.positions_of(Element::Pipe), vec![Position::new(1, 1)]);
    }

    #[test]
    fn iterator_visits_every_cell() {
        let board: Board = sample();
        let visited: Vec<Position> = board.iter().map(|(p, _)| p).collect();

        assert_eq!(visited.len(), 6);
        assert_eq!(visited[3], Position::new(0, 1));
        assert_eq!(board.render(), "rb.\n.P.");
    }

    #[test]
    fn canonical_json_shape() {
        let board: Board = sample();
        let json: serde_json::Value = serde_json::to_value(&board).unwrap();

        assert_eq!(json[0][0]["type"], "block");
        assert_eq!(json[0][0]["color"], "Red");
        assert!(json[0][0]["element"].is_null());
        assert!(json[0][0].get("pipeContents").is_none());
        assert_eq!(json[0][2]["type"], "empty");
        assert_eq!(json[1][1]["element"], "Pipe");
        assert_eq!(json[1][1]["pipeDirection"], "left");
        assert_eq!(json[1][1]["pipeContents"][1], "Red");

        let back: Board = serde_json::from_value(json).unwrap();
        assert_eq!(back, board);
    }
}
