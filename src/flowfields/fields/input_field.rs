//! The InputField describes the map being baked, one [CellValue] per grid
//! cell. A cell is either an impassable obstacle, free walkable space or a
//! target that agents should flow towards. Targets carry a priority which
//! seeds their distance, so a lower priority biases agents towards it.
//!
//! ```text
//!  _______________________________________
//! |     |     |     |     |     |     |     |
//! |  .  |  .  |  .  |  .  |  .  |  .  |  .  |
//! |_____|_____|_____|_____|_____|_____|_____|
//! |     |     |     |     |     |     |     |
//! |  .  |  #  |  #  |  T0 |  .  |  .  |  .  |
//! |_____|_____|_____|_____|_____|_____|_____|
//! |     |     |     |     |     |     |     |
//! |  .  |  .  |  .  |  .  |  .  |  #  |  T3 |
//! |_____|_____|_____|_____|_____|_____|_____|
//!
//!   .  free    #  obstacle    Tn  target with priority n
//! ```
//!
//! At the system boundary the field can be exchanged as raw `f32` values
//! where two reserved encodings mark obstacles and free space and any other
//! finite value is the priority of a target.
//!

use crate::prelude::*;
use bevy::prelude::Reflect;

/// The kind of a single input cell
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq, Default, Reflect)]
pub enum CellValue {
	/// Impassable, never part of the propagation graph
	Obstacle,
	/// Walkable with an unresolved distance
	#[default]
	Free,
	/// Walkable with an initial distance equal to the priority
	Target(f32),
}

impl CellValue {
	/// Raw encoding of [CellValue::Obstacle]
	pub const RAW_OBSTACLE: f32 = f32::MAX;
	/// Raw encoding of [CellValue::Free]
	pub const RAW_FREE: f32 = f32::INFINITY;

	/// A target with the default priority of `0`
	pub fn target() -> Self {
		CellValue::Target(0.0)
	}
	/// Decode a raw value, [None] if it is not a valid encoding
	pub fn from_raw(value: f32) -> Option<Self> {
		if value == Self::RAW_OBSTACLE {
			Some(CellValue::Obstacle)
		} else if value == Self::RAW_FREE {
			Some(CellValue::Free)
		} else if value.is_finite() {
			Some(CellValue::Target(value))
		} else {
			None
		}
	}
	/// Encode into the raw boundary representation
	pub fn to_raw(self) -> f32 {
		match self {
			CellValue::Obstacle => Self::RAW_OBSTACLE,
			CellValue::Free => Self::RAW_FREE,
			CellValue::Target(priority) => priority,
		}
	}
	/// Whether agents may stand on this cell
	pub fn is_walkable(&self) -> bool {
		!matches!(self, CellValue::Obstacle)
	}
}

/// Dense array of [CellValue] describing obstacles, free space and targets
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct InputField {
	/// Grid the field is laid over
	dimensions: GridDimensions,
	/// Row-major cells
	cells: Vec<CellValue>,
}

impl Field<CellValue> for InputField {
	fn get_dimensions(&self) -> GridDimensions {
		self.dimensions
	}
	fn get(&self) -> &[CellValue] {
		&self.cells
	}
	fn get_mut(&mut self) -> &mut [CellValue] {
		&mut self.cells
	}
}

impl InputField {
	/// Creates a new [InputField] where every cell is [CellValue::Free]
	pub fn new(dimensions: GridDimensions) -> Self {
		InputField {
			dimensions,
			cells: vec![CellValue::Free; dimensions.cell_count()],
		}
	}
	/// Wrap an existing array of cells. The length is not checked here, a
	/// mismatch is reported by [InputField::validate] when a bake starts
	pub fn from_cells(dimensions: GridDimensions, cells: Vec<CellValue>) -> Self {
		InputField { dimensions, cells }
	}
	/// Decode a raw `f32` field, rejecting values which are neither of the
	/// reserved encodings nor a finite priority
	pub fn from_raw(dimensions: GridDimensions, raw: &[f32]) -> Result<Self, FlowFieldError> {
		let cells = raw
			.iter()
			.enumerate()
			.map(|(index, value)| {
				CellValue::from_raw(*value).ok_or(FlowFieldError::InvalidCellValue {
					index,
					value: *value,
				})
			})
			.collect::<Result<Vec<_>, _>>()?;
		Ok(InputField { dimensions, cells })
	}
	/// Encode into the raw boundary representation
	pub fn to_raw(&self) -> Vec<f32> {
		self.cells.iter().map(|c| c.to_raw()).collect()
	}
	/// Mark a cell as a target with a `priority`. The priority must be
	/// finite, [InputField::validate] rejects anything else
	pub fn set_target(&mut self, field_cell: FieldCell, priority: f32) {
		self.set_field_cell_value(CellValue::Target(priority), field_cell);
	}
	/// Mark a cell as impassable
	pub fn set_obstacle(&mut self, field_cell: FieldCell) {
		self.set_field_cell_value(CellValue::Obstacle, field_cell);
	}
	/// Number of target cells
	pub fn target_count(&self) -> usize {
		self.cells
			.iter()
			.filter(|c| matches!(c, CellValue::Target(_)))
			.count()
	}
	/// Ensure the field covers the `expected` grid exactly and every target
	/// priority is finite
	pub fn validate(&self, expected: GridDimensions) -> Result<(), FlowFieldError> {
		if self.cells.len() != expected.cell_count() {
			return Err(FlowFieldError::InvalidDimensions {
				expected: expected.cell_count(),
				actual: self.cells.len(),
			});
		}
		let invalid = self.cells.iter().enumerate().find_map(|(index, cell)| match cell {
			CellValue::Target(priority) if !priority.is_finite() => Some((index, *priority)),
			_ => None,
		});
		if let Some((index, value)) = invalid {
			return Err(FlowFieldError::InvalidCellValue { index, value });
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn raw_encoding() {
		assert_eq!(Some(CellValue::Obstacle), CellValue::from_raw(f32::MAX));
		assert_eq!(Some(CellValue::Free), CellValue::from_raw(f32::INFINITY));
		assert_eq!(Some(CellValue::Target(2.5)), CellValue::from_raw(2.5));
		assert_eq!(None, CellValue::from_raw(f32::NAN));
		assert_eq!(None, CellValue::from_raw(f32::NEG_INFINITY));
	}
	#[test]
	fn raw_field_rejects_nan() {
		let dimensions = GridDimensions::new(3, 1).unwrap();
		let result = InputField::from_raw(dimensions, &[0.0, f32::NAN, f32::INFINITY]);
		match result {
			Err(FlowFieldError::InvalidCellValue { index, .. }) => assert_eq!(1, index),
			_ => panic!("NaN should not decode"),
		}
	}
	#[test]
	fn raw_field_keeps_layout() {
		let dimensions = GridDimensions::new(3, 1).unwrap();
		let raw = [f32::MAX, f32::INFINITY, 4.0];
		let field = InputField::from_raw(dimensions, &raw).unwrap();
		assert_eq!(
			vec![CellValue::Obstacle, CellValue::Free, CellValue::Target(4.0)],
			field.get().to_vec()
		);
		assert_eq!(raw.to_vec(), field.to_raw());
	}
	#[test]
	fn set_cells() {
		let dimensions = GridDimensions::new(7, 3).unwrap();
		let mut field = InputField::new(dimensions);
		field.set_target(FieldCell::new(3, 1), 0.0);
		field.set_obstacle(FieldCell::new(0, 0));
		assert_eq!(1, field.target_count());
		assert_eq!(CellValue::Target(0.0), field.get()[10]);
		assert_eq!(CellValue::Obstacle, field.get_field_cell_value(FieldCell::new(0, 0)));
	}
	#[test]
	#[should_panic]
	fn set_out_of_bounds() {
		let dimensions = GridDimensions::new(7, 3).unwrap();
		let mut field = InputField::new(dimensions);
		field.set_obstacle(FieldCell::new(7, 3));
	}
	#[test]
	fn validate_length() {
		let dimensions = GridDimensions::new(7, 3).unwrap();
		let short = InputField::from_cells(dimensions, vec![CellValue::Free; 20]);
		assert_eq!(
			Err(FlowFieldError::InvalidDimensions {
				expected: 21,
				actual: 20
			}),
			short.validate(dimensions)
		);
		assert!(InputField::new(dimensions).validate(dimensions).is_ok());
	}
	#[test]
	fn validate_non_finite_priority() {
		let dimensions = GridDimensions::new(7, 3).unwrap();
		for priority in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
			let mut field = InputField::new(dimensions);
			field.set_target(FieldCell::new(0, 0), 1.0);
			field.set_target(FieldCell::new(3, 1), priority);
			assert!(matches!(
				field.validate(dimensions),
				Err(FlowFieldError::InvalidCellValue { index: 10, .. })
			));
		}
		let mut field = InputField::new(dimensions);
		field.set_target(FieldCell::new(3, 1), f32::MAX / 2.0);
		assert!(field.validate(dimensions).is_ok());
	}
}
