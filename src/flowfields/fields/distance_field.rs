//! The DistanceField holds, for every cell, the cost of reaching the nearest
//! target biased by that target's priority. It is seeded from an
//! [InputField] (targets take their priority, free cells start unresolved,
//! obstacles are fixed) and then improved by a series of relaxation steps.
//!
//! Each step is a Jacobi pass: every walkable cell looks at the values its
//! neighbours held after the *previous* step and keeps the cheapest of its
//! own value and `neighbour + step cost`. Reads only ever touch the front
//! buffer and writes only the back buffer, after which the two swap. Since no
//! cell observes a value written during the same step the whole grid can be
//! updated in parallel.
//!
//! A single target with 4-connectivity resolves as an expanding diamond, one
//! ring per step (`-` is still unresolved):
//!
//! ```text
//!  step 0          step 1          step 2
//!  _ _ _ _ _       _ _ _ _ _       _ _ _ _ _
//! |- - - - -|     |- - - - -|     |- - 2 - -|
//! |- - - - -|     |- - 1 - -|     |- 2 1 2 -|
//! |- - 0 - -|     |- 1 0 1 -|     |2 1 0 1 2|
//! |- - - - -|     |- - 1 - -|     |- 2 1 2 -|
//! |_-_-_-_-_|     |_-_-_-_-_|     |_-_-2_-_-|
//! ```
//!
//! So the field is only fully resolved once enough steps have been run to
//! cover the longest path on the map.
//!

use crate::prelude::*;
use bevy::prelude::Reflect;

/// Per-cell distance state
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq, Default, Reflect)]
pub enum Distance {
	/// Impassable, never read as a source and never written
	Obstacle,
	/// Walkable but not yet reached by the wavefront
	#[default]
	Unresolved,
	/// Cost of reaching the nearest target
	Resolved(f32),
}

impl Distance {
	/// Whether a finite distance has been assigned
	pub fn is_resolved(&self) -> bool {
		matches!(self, Distance::Resolved(_))
	}
	/// The resolved value if there is one
	pub fn get_value(&self) -> Option<f32> {
		match self {
			Distance::Resolved(value) => Some(*value),
			_ => None,
		}
	}
	/// Cost used when comparing candidates, unresolved is treated as
	/// infinitely far away
	fn as_cost(&self) -> f32 {
		match self {
			Distance::Resolved(value) => *value,
			_ => f32::INFINITY,
		}
	}
}

impl From<CellValue> for Distance {
	fn from(value: CellValue) -> Self {
		match value {
			CellValue::Obstacle => Distance::Obstacle,
			CellValue::Free => Distance::Unresolved,
			CellValue::Target(priority) => Distance::Resolved(priority),
		}
	}
}

/// Dense array of [Distance] covering the grid
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct DistanceField {
	/// Grid the field is laid over
	dimensions: GridDimensions,
	/// Row-major cells
	cells: Vec<Distance>,
}

impl Field<Distance> for DistanceField {
	fn get_dimensions(&self) -> GridDimensions {
		self.dimensions
	}
	fn get(&self) -> &[Distance] {
		&self.cells
	}
	fn get_mut(&mut self) -> &mut [Distance] {
		&mut self.cells
	}
}

impl DistanceField {
	/// Creates a new [DistanceField] where every cell is unresolved
	pub fn new(dimensions: GridDimensions) -> Self {
		DistanceField {
			dimensions,
			cells: vec![Distance::Unresolved; dimensions.cell_count()],
		}
	}
	/// Overwrite every cell with the initial encoding of `input`. An input
	/// that is shorter than the grid leaves the remaining cells unresolved,
	/// extra input cells are ignored
	pub fn seed(&mut self, input: &InputField) {
		let source = input.get();
		for (i, cell) in self.cells.iter_mut().enumerate() {
			*cell = source.get(i).map_or(Distance::Unresolved, |v| Distance::from(*v));
		}
	}
	/// Number of cells holding a finite distance
	pub fn resolved_count(&self) -> usize {
		self.cells.iter().filter(|d| d.is_resolved()).count()
	}
}

/// Compute the next value of the cell at `index` from a consistent snapshot
/// of the previous step
pub fn relax_cell(front: &[Distance], params: &KernelParams, index: usize) -> Distance {
	let current = front[index];
	if current == Distance::Obstacle {
		return current;
	}
	let dimensions = params.get_dimensions();
	let mut best = current.as_cost();
	for ordinal in params.get_connectivity().get_ordinals() {
		if let Some(n) = dimensions.get_neighbour(index, *ordinal) {
			if let Distance::Resolved(neighbour) = front[n] {
				let candidate = neighbour + ordinal.get_step_cost();
				if candidate < best {
					best = candidate;
				}
			}
		}
	}
	if best < current.as_cost() {
		Distance::Resolved(best)
	} else {
		current
	}
}

/// Relax a contiguous span of cells starting at linear index `offset`,
/// writing into `back_span`. Spans are disjoint so they may be processed in
/// parallel
pub fn relax_span(front: &[Distance], back_span: &mut [Distance], offset: usize, params: &KernelParams) {
	for (i, cell) in back_span.iter_mut().enumerate() {
		*cell = relax_cell(front, params, offset + i);
	}
}

/// The front/back pair of distance buffers. They are allocated once and reused
/// by every bake, only their roles swap
#[derive(Clone, Debug)]
pub struct DistanceBuffers {
	/// Read-only during a step, holds the latest complete values
	front: DistanceField,
	/// Write-only during a step
	back: DistanceField,
}

impl DistanceBuffers {
	/// Allocate both buffers for a grid
	pub fn new(dimensions: GridDimensions) -> Self {
		DistanceBuffers {
			front: DistanceField::new(dimensions),
			back: DistanceField::new(dimensions),
		}
	}
	/// Seed both buffers from the input field. Obstacles are never written by
	/// a step so both sides must already carry them
	pub fn seed(&mut self, input: &InputField) {
		self.front.seed(input);
		self.back.seed(input);
	}
	/// The latest complete distance values
	pub fn get_front(&self) -> &DistanceField {
		&self.front
	}
	/// Borrow the front buffer for reading alongside the back buffer for
	/// writing
	pub fn split_mut(&mut self) -> (&[Distance], &mut [Distance]) {
		(&self.front.cells, &mut self.back.cells)
	}
	/// Make the values just written the new front
	pub fn swap(&mut self) {
		std::mem::swap(&mut self.front, &mut self.back);
	}
	/// Run `steps` relaxation steps on the calling thread
	pub fn relax(&mut self, params: &KernelParams, steps: u32) {
		for _ in 0..steps {
			let (front, back) = self.split_mut();
			relax_span(front, back, 0, params);
			self.swap();
		}
	}
}
