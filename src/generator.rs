/*
generator.rs

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

//! Generate and validate boards.
//!
//! A board is a grid of cells.
//! Colored cells hold a block that the player collects into trays of three.
//! Some cells host a mechanic: containers ([`board::Element::Pipe`] and
//! [`board::Element::Moving`]) hold a hidden queue of colors, locks need their key to be
//! collected first, and obstacles such as pins and barriers block the way.
//!
//! Two generators share the stages defined in [`pipeline`]:
//!
//! * The [`classified::ClassifiedGenerator`] generator works on its own cell representation,
//!   where each cell carries its element classification.
//!   Its color counts are exact multiples of nine, or of three for small boards.
//! * The [`legacy::LegacyGenerator`] generator works directly on the canonical
//!   [`board::Board`] and accepts small color deviations.
//!
//! The [`adapter`] module tries the first generator and falls back to the second.
//! Both generators convert their result to the canonical board, and the [`validator`] module
//! checks that board before it is returned.
//!
//! The stages rely on these modules:
//!
//! * [`geometry`]: positions, directions, and connectivity.
//! * [`grid`]: the [`grid::LevelGrid`] trait that the stages use to modify a board.
//! * [`distribution`]: the color targets and the queue of colors to place.
//! * [`placement`]: the growth of the connected block shape, random or mirrored.
//! * [`elements`]: the installation of the mechanics.
//! * [`rebalance`]: the container contents and the color corrections.

pub mod adapter;
pub mod board;
pub mod classified;
pub mod distribution;
pub mod elements;
pub mod geometry;
pub mod grid;
pub mod legacy;
pub mod pipeline;
pub mod placement;
pub mod rebalance;
pub mod validator;
