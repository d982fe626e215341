//! Errors raised while constructing or baking a [crate::prelude::FlowField]
//!

/// Everything that can go wrong when building or driving a flow field bake
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FlowFieldError {
	/// The supplied input field does not cover the grid exactly
	#[error("input field has {actual} cells but the grid expects {expected}")]
	InvalidDimensions {
		/// Number of cells in the grid
		expected: usize,
		/// Number of cells supplied
		actual: usize,
	},
	/// Construction parameters are out of range, fatal to the instance
	#[error("invalid configuration: {0}")]
	InvalidConfiguration(String),
	/// A raw value could not be decoded into a cell kind
	#[error("raw value {value} at cell index {index} is not a valid cell encoding")]
	InvalidCellValue {
		/// Linear index of the offending cell
		index: usize,
		/// The raw value found there
		value: f32,
	},
	/// Every pooled result buffer is rented, retry on a later quantum
	#[error("result pool exhausted, all {capacity} buffers are in use")]
	PoolExhausted {
		/// Upper bound of the pool
		capacity: usize,
	},
	/// An asynchronous transfer reported failure
	#[error(transparent)]
	Transfer(#[from] TransferError),
	/// Settings could not be loaded
	#[error("settings error: {0}")]
	Settings(String),
}

/// Failure reported by a [crate::prelude::ComputeDevice] when completing a transfer
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("transfer failed: {reason}")]
pub struct TransferError {
	/// Human readable cause
	reason: String,
}

impl TransferError {
	/// Create a new instance of [TransferError]
	pub fn new(reason: impl Into<String>) -> Self {
		TransferError {
			reason: reason.into(),
		}
	}
	/// Get the cause of the failure
	pub fn get_reason(&self) -> &str {
		&self.reason
	}
}
