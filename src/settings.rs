//! Configuration of a [crate::prelude::FlowField] and of each bake
//!

use crate::prelude::*;
use bevy::prelude::Reflect;

/// Options supplied with every bake request
#[cfg_attr(
	feature = "serde",
	derive(serde::Deserialize, serde::Serialize),
	serde(default)
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Reflect)]
pub struct BakeOptions {
	/// Total relaxation steps, bounds how far from a target a route is found
	pub iterations: u32,
	/// Steps run per bake call. `0` runs every step in one call, a value
	/// below `iterations` spreads the bake across several calls
	pub iterations_per_quantum: u32,
	/// Use 8-connectivity rather than 4
	pub diagonal_movement: bool,
}

impl BakeOptions {
	/// A non-incremental bake of `iterations` steps with 4-connectivity
	pub fn new(iterations: u32) -> Self {
		BakeOptions {
			iterations,
			iterations_per_quantum: 0,
			diagonal_movement: false,
		}
	}
	/// Run at most `per_quantum` steps per bake call
	pub fn incremental(mut self, per_quantum: u32) -> Self {
		self.iterations_per_quantum = per_quantum;
		self
	}
	/// Select 8-connectivity
	pub fn with_diagonal_movement(mut self, diagonal_movement: bool) -> Self {
		self.diagonal_movement = diagonal_movement;
		self
	}
	/// Neighbour set implied by the options
	pub fn connectivity(&self) -> Connectivity {
		Connectivity::from_diagonal_movement(self.diagonal_movement)
	}
	/// Whether the bake will span more than one call
	pub fn is_incremental(&self) -> bool {
		self.iterations_per_quantum > 0 && self.iterations_per_quantum < self.iterations
	}
}

/// Construction parameters of a [crate::prelude::FlowField]
#[cfg_attr(
	feature = "serde",
	derive(serde::Deserialize, serde::Serialize),
	serde(default)
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Reflect)]
pub struct FlowFieldSettings {
	/// Number of columns
	pub width: u32,
	/// Number of rows
	pub height: u32,
	/// Buffers allocated up front, at least 2
	pub min_pooled_buffers: usize,
	/// Upper bound of buffers, bounds how many bakes may be in flight
	pub max_pooled_buffers: usize,
	/// Check the input field length when a bake starts
	pub validate_input: bool,
	/// Default options for [crate::prelude::FlowField::bake_default]
	pub bake: BakeOptions,
}

impl Default for FlowFieldSettings {
	fn default() -> Self {
		FlowFieldSettings {
			width: 32,
			height: 32,
			min_pooled_buffers: MIN_POOLED_BUFFERS,
			max_pooled_buffers: 4,
			validate_input: cfg!(debug_assertions),
			bake: BakeOptions::new(64).with_diagonal_movement(true),
		}
	}
}

impl FlowFieldSettings {
	/// Settings for a `width x height` grid with default pooling
	pub fn new(width: u32, height: u32) -> Self {
		FlowFieldSettings {
			width,
			height,
			..Default::default()
		}
	}
	/// Set the pool bounds
	pub fn with_pool(mut self, min: usize, max: usize) -> Self {
		self.min_pooled_buffers = min;
		self.max_pooled_buffers = max;
		self
	}
	/// Enable or disable input validation
	pub fn with_validation(mut self, validate_input: bool) -> Self {
		self.validate_input = validate_input;
		self
	}
	/// Set the default bake options
	pub fn with_bake(mut self, bake: BakeOptions) -> Self {
		self.bake = bake;
		self
	}
	/// The grid the settings describe
	pub fn dimensions(&self) -> Result<GridDimensions, FlowFieldError> {
		GridDimensions::new(self.width, self.height)
	}
	/// From a `ron` file generate the [FlowFieldSettings]
	#[cfg(feature = "ron")]
	pub fn from_ron(path: String) -> Result<Self, FlowFieldError> {
		let file = std::fs::File::open(&path)
			.map_err(|e| FlowFieldError::Settings(format!("failed opening {}: {}", path, e)))?;
		ron::de::from_reader(file)
			.map_err(|e| FlowFieldError::Settings(format!("failed deserializing {}: {}", path, e)))
	}
}
