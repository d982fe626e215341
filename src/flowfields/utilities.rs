//! Useful structures and tools used by the fields
//!

use bevy::prelude::Reflect;

/// Cost of stepping to an orthogonally adjacent cell
pub const CARDINAL_STEP_COST: f32 = 1.0;
/// Cost of stepping to a diagonally adjacent cell
pub const DIAGONAL_STEP_COST: f32 = std::f32::consts::SQRT_2;

/// Neighbour scan order when only orthogonal movement is allowed
const CARDINAL_ORDINALS: [Ordinal; 4] = [
	Ordinal::North,
	Ordinal::East,
	Ordinal::South,
	Ordinal::West,
];
/// Neighbour scan order when diagonal movement is allowed, the orthogonal
/// directions are always scanned first
const ALL_ORDINALS: [Ordinal; 8] = [
	Ordinal::North,
	Ordinal::East,
	Ordinal::South,
	Ordinal::West,
	Ordinal::NorthEast,
	Ordinal::SouthEast,
	Ordinal::SouthWest,
	Ordinal::NorthWest,
];

/// Convenience way of accessing the 8 directions of movement around a cell.
/// North points towards row `0`
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Reflect)]
pub enum Ordinal {
	North,
	East,
	South,
	West,
	NorthEast,
	SouthEast,
	SouthWest,
	NorthWest,
	/// Special case, used to indicate a cell that points at itself in the
	/// [crate::prelude::DirectionField] (it has arrived or is unreachable)
	Zero,
}

impl Ordinal {
	/// The `(x, y)` step this direction represents
	pub fn get_offset(&self) -> (i32, i32) {
		match self {
			Ordinal::North => (0, -1),
			Ordinal::East => (1, 0),
			Ordinal::South => (0, 1),
			Ordinal::West => (-1, 0),
			Ordinal::NorthEast => (1, -1),
			Ordinal::SouthEast => (1, 1),
			Ordinal::SouthWest => (-1, 1),
			Ordinal::NorthWest => (-1, -1),
			Ordinal::Zero => (0, 0),
		}
	}
	/// Whether the direction moves along both axes
	pub fn is_diagonal(&self) -> bool {
		matches!(
			self,
			Ordinal::NorthEast | Ordinal::SouthEast | Ordinal::SouthWest | Ordinal::NorthWest
		)
	}
	/// Edge cost of taking one step in this direction
	pub fn get_step_cost(&self) -> f32 {
		match self {
			Ordinal::Zero => 0.0,
			_ if self.is_diagonal() => DIAGONAL_STEP_COST,
			_ => CARDINAL_STEP_COST,
		}
	}
	/// For two cells next to each other it can be useful to find the [Ordinal] point from the `source` to the `target`. Identical cells produce [Ordinal::Zero]
	pub fn cell_to_cell_direction(target: (usize, usize), source: (usize, usize)) -> Self {
		let i32_target = (target.0 as i32, target.1 as i32);
		let i32_source = (source.0 as i32, source.1 as i32);

		let direction = (i32_target.0 - i32_source.0, i32_target.1 - i32_source.1);
		match direction {
			(0, 0) => Ordinal::Zero,
			(0, -1) => Ordinal::North,
			(1, -1) => Ordinal::NorthEast,
			(1, 0) => Ordinal::East,
			(1, 1) => Ordinal::SouthEast,
			(0, 1) => Ordinal::South,
			(-1, 1) => Ordinal::SouthWest,
			(-1, 0) => Ordinal::West,
			(-1, -1) => Ordinal::NorthWest,
			_ => panic!(
				"Cell {:?} is not orthogonally or diagonally adjacent to {:?}",
				target, source
			),
		}
	}
}

/// Which neighbours of a cell take part in propagation and extraction
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash, Reflect)]
pub enum Connectivity {
	/// 4-neighbour, orthogonal movement only
	#[default]
	Cardinal,
	/// 8-neighbour, orthogonal and diagonal movement
	Diagonal,
}

impl Connectivity {
	/// Select the connectivity from a `diagonal_movement` flag
	pub fn from_diagonal_movement(diagonal_movement: bool) -> Self {
		if diagonal_movement {
			Connectivity::Diagonal
		} else {
			Connectivity::Cardinal
		}
	}
	/// The neighbour directions in their fixed scan order. The order is what
	/// breaks ties during direction extraction
	pub fn get_ordinals(&self) -> &'static [Ordinal] {
		match self {
			Connectivity::Cardinal => &CARDINAL_ORDINALS,
			Connectivity::Diagonal => &ALL_ORDINALS,
		}
	}
}
