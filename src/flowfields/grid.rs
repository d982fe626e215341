//! The uniform 2D grid every field is laid over. Cells are stored row-major
//! with the origin `(0, 0)` in the top left and `x` varying fastest, so the
//! linear index of a cell is `y * width + x`.
//!
//! ```text
//!  x→  0    1    2    3
//! y  ___________________
//! ↓ |  0 |  1 |  2 |  3 |
//! 0 |____|____|____|____|
//!   |  4 |  5 |  6 |  7 |
//! 1 |____|____|____|____|
//!   |  8 |  9 | 10 | 11 |
//! 2 |____|____|____|____|
//! ```
//!

use crate::prelude::*;
use bevy::prelude::Reflect;

/// ID of a cell within a field, stored as `(column, row)`
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect)]
pub struct FieldCell((usize, usize));

impl FieldCell {
	/// Create a new instance of [FieldCell]
	pub fn new(column: usize, row: usize) -> Self {
		FieldCell((column, row))
	}
	/// Get the `(column, row)` tuple
	pub fn get_column_row(&self) -> (usize, usize) {
		self.0
	}
	/// Get the column (`x`)
	pub fn get_column(&self) -> usize {
		self.0 .0
	}
	/// Get the row (`y`)
	pub fn get_row(&self) -> usize {
		self.0 .1
	}
}

/// Immutable width and height of the grid
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Reflect)]
pub struct GridDimensions {
	/// Number of columns
	width: u32,
	/// Number of rows
	height: u32,
}

impl GridDimensions {
	/// Create a new instance of [GridDimensions]. Both dimensions must be
	/// non-zero and the cell count must be addressable by a `u32` index, as
	/// that is what the direction field stores
	pub fn new(width: u32, height: u32) -> Result<Self, FlowFieldError> {
		if width == 0 || height == 0 {
			return Err(FlowFieldError::InvalidConfiguration(format!(
				"grid dimensions must be greater than zero, got `({}, {})`",
				width, height
			)));
		}
		if (width as u64) * (height as u64) > u32::MAX as u64 {
			return Err(FlowFieldError::InvalidConfiguration(format!(
				"grid `({}, {})` has more cells than a u32 direction index can address",
				width, height
			)));
		}
		Ok(GridDimensions { width, height })
	}
	/// Number of columns
	pub fn get_width(&self) -> u32 {
		self.width
	}
	/// Number of rows
	pub fn get_height(&self) -> u32 {
		self.height
	}
	/// Total number of cells, `width * height`
	pub fn cell_count(&self) -> usize {
		self.width as usize * self.height as usize
	}
	/// Whether a `(column, row)` lies within the grid
	pub fn contains(&self, field_cell: FieldCell) -> bool {
		field_cell.get_column() < self.width as usize && field_cell.get_row() < self.height as usize
	}
	/// Linear index of a cell, [None] if it lies outside the grid
	pub fn get_index(&self, field_cell: FieldCell) -> Option<usize> {
		if self.contains(field_cell) {
			Some(field_cell.get_row() * self.width as usize + field_cell.get_column())
		} else {
			None
		}
	}
	/// The [FieldCell] of a linear index
	pub fn get_field_cell(&self, index: usize) -> FieldCell {
		let width = self.width as usize;
		FieldCell::new(index % width, index / width)
	}
	/// Linear index of the neighbour of `index` in the direction of `ordinal`,
	/// [None] when that step leaves the grid
	pub fn get_neighbour(&self, index: usize, ordinal: Ordinal) -> Option<usize> {
		let width = self.width as i64;
		let height = self.height as i64;
		let (dx, dy) = ordinal.get_offset();
		let x = (index as i64 % width) + dx as i64;
		let y = (index as i64 / width) + dy as i64;
		if x < 0 || y < 0 || x >= width || y >= height {
			None
		} else {
			Some((y * width + x) as usize)
		}
	}
}
