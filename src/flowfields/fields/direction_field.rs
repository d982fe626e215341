//! A [DirectionField] is the product of a bake, one entry per cell holding the
//! linear index of the neighbouring cell an agent standing there should step
//! to next. A cell pointing at itself has either arrived at a target or has
//! no known route yet. An agent simulation only needs to read its current
//! cell to steer, any number of agents can share the same field.
//!
//! The field is derived from a [DistanceField] by comparing each cell with
//! its neighbours, scanning them in the fixed [Connectivity] order:
//!
//! * neighbours which are obstacles or still unresolved are ignored
//! * the neighbour with the strictly lowest distance wins, on a tie the one
//!   scanned first is kept
//! * a resolved cell only moves if that neighbour is strictly closer than
//!   itself, otherwise it has arrived
//! * an unresolved cell moves towards any resolved neighbour, which is what
//!   extends the arrows one ring beyond the resolved wavefront
//!

use crate::prelude::*;

/// Dense array of next-step indices covering the grid
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct DirectionField {
	/// Grid the field is laid over
	dimensions: GridDimensions,
	/// Row-major next-step indices
	cells: Vec<u32>,
}

impl Field<u32> for DirectionField {
	fn get_dimensions(&self) -> GridDimensions {
		self.dimensions
	}
	fn get(&self) -> &[u32] {
		&self.cells
	}
	fn get_mut(&mut self) -> &mut [u32] {
		&mut self.cells
	}
}

impl DirectionField {
	/// Creates a new [DirectionField] where every cell points at itself
	pub fn new(dimensions: GridDimensions) -> Self {
		DirectionField {
			dimensions,
			cells: (0..dimensions.cell_count() as u32).collect(),
		}
	}
	/// Calculate every entry from the `distance_field` on the calling thread
	pub fn calculate(&mut self, distance_field: &DistanceField, connectivity: Connectivity) {
		let params = KernelParams::new(self.dimensions, connectivity);
		extract_span(distance_field.get(), &mut self.cells, 0, &params);
	}
	/// Get the [Ordinal] an agent at `field_cell` should move in
	pub fn get_ordinal(&self, field_cell: FieldCell) -> Ordinal {
		let next = self.get_field_cell_value(field_cell);
		let target = self.dimensions.get_field_cell(next as usize);
		Ordinal::cell_to_cell_direction(target.get_column_row(), field_cell.get_column_row())
	}
	/// Number of cells pointing somewhere other than themselves
	pub fn moving_count(&self) -> usize {
		self.cells
			.iter()
			.enumerate()
			.filter(|(i, next)| **next as usize != *i)
			.count()
	}
}

/// Find the next step of the cell at `index`
pub fn extract_cell(distances: &[Distance], params: &KernelParams, index: usize) -> u32 {
	let own = distances[index];
	if own == Distance::Obstacle {
		return index as u32;
	}
	let dimensions = params.get_dimensions();
	// store the cheapest candidate
	let mut cheapest: Option<(usize, f32)> = None;
	for ordinal in params.get_connectivity().get_ordinals() {
		if let Some(n) = dimensions.get_neighbour(index, *ordinal) {
			if let Distance::Resolved(value) = distances[n] {
				if cheapest.is_none_or(|(_, best)| value < best) {
					cheapest = Some((n, value));
				}
			}
		}
	}
	match (cheapest, own) {
		(Some((n, value)), Distance::Resolved(own_value)) if value < own_value => n as u32,
		(Some((n, _)), Distance::Unresolved) => n as u32,
		_ => index as u32,
	}
}

/// Extract a contiguous span of cells starting at linear index `offset`.
/// Spans are disjoint so they may be processed in parallel
pub fn extract_span(distances: &[Distance], out_span: &mut [u32], offset: usize, params: &KernelParams) {
	for (i, cell) in out_span.iter_mut().enumerate() {
		*cell = extract_cell(distances, params, offset + i);
	}
}
