//! The kinds of fields used by the bake
//!

pub mod direction_field;
pub mod distance_field;
pub mod input_field;

use crate::prelude::*;

/// Defines required access to field arrays. Every field is a dense row-major
/// array covering a [GridDimensions]
pub trait Field<T: Copy> {
	/// Get the grid the field covers
	fn get_dimensions(&self) -> GridDimensions;
	/// Get a reference to the field array
	fn get(&self) -> &[T];
	/// Get a mutable reference to the field array
	fn get_mut(&mut self) -> &mut [T];
	/// Retrieve a field cell value
	fn get_field_cell_value(&self, field_cell: FieldCell) -> T {
		let dimensions = self.get_dimensions();
		match dimensions.get_index(field_cell) {
			Some(index) if index < self.get().len() => self.get()[index],
			_ => panic!(
				"Cannot get a field value, index out of bounds. Asked for column {}, row {}, field is {}x{} with {} cells",
				field_cell.get_column(),
				field_cell.get_row(),
				dimensions.get_width(),
				dimensions.get_height(),
				self.get().len()
			),
		}
	}
	/// Set a field cell to a value
	fn set_field_cell_value(&mut self, value: T, field_cell: FieldCell) {
		let dimensions = self.get_dimensions();
		let len = self.get().len();
		match dimensions.get_index(field_cell) {
			Some(index) if index < len => self.get_mut()[index] = value,
			_ => panic!(
				"Cannot set a field value, index out of bounds. Asked for column {}, row {}, field is {}x{} with {} cells",
				field_cell.get_column(),
				field_cell.get_row(),
				dimensions.get_width(),
				dimensions.get_height(),
				len
			),
		}
	}
}
