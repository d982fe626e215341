//! The seam between a [crate::prelude::FlowField] and whatever executes its
//! kernels. A device runs the relaxation and extraction passes over the whole
//! grid in parallel and copies a finished direction field into a pooled
//! [ResultBuffer], reporting back through a callback once the copy has
//! landed.
//!
//! ```text
//!  host                         device
//!   |  relax(params, buffers)     |
//!   |---------------------------->|  step k reads front, writes back, swap
//!   |  extract(params, distances) |
//!   |---------------------------->|  every cell scans its neighbours
//!   |  transfer(src, dst, cb)     |
//!   |---------------------------->|  copy queued
//!   |<- - - - - - - - - - - - - - |  cb(dst, Ok(())) some time later
//! ```
//!
//! [CpuDevice] is the provided implementation, it splits the grid into bands
//! of rows processed on the rayon thread pool and completes transfers on
//! Bevy's [AsyncComputeTaskPool].
//!

use crate::prelude::*;
use bevy::tasks::{AsyncComputeTaskPool, TaskPool};
use rayon::prelude::*;
use std::sync::Arc;

/// Invoked exactly once when a transfer finishes, handing the destination
/// buffer back in both outcomes so it can be published or returned to the pool
pub type TransferCallback = Box<dyn FnOnce(ResultBuffer, Result<(), TransferError>) + Send>;

/// Parameters every kernel invocation needs, passed by value with each call
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KernelParams {
	/// Grid being processed
	dimensions: GridDimensions,
	/// Neighbour set and scan order
	connectivity: Connectivity,
}

impl KernelParams {
	/// Create a new instance of [KernelParams]
	pub fn new(dimensions: GridDimensions, connectivity: Connectivity) -> Self {
		KernelParams {
			dimensions,
			connectivity,
		}
	}
	/// Get the grid being processed
	pub fn get_dimensions(&self) -> GridDimensions {
		self.dimensions
	}
	/// Get the neighbour set
	pub fn get_connectivity(&self) -> Connectivity {
		self.connectivity
	}
}

/// Executes the bake kernels
pub trait ComputeDevice: Send + Sync {
	/// Run `steps` relaxation steps, swapping the buffers after each so the
	/// result of the final step is left in the front buffer
	fn relax(&self, params: &KernelParams, buffers: &mut DistanceBuffers, steps: u32);
	/// Derive next-step indices for every cell of `distances` into `out`
	fn extract(&self, params: &KernelParams, distances: &DistanceField, out: &mut [u32]);
	/// Copy `source` into `destination` asynchronously. Must not block the
	/// caller and must invoke `on_complete` exactly once
	fn transfer(&self, source: &[u32], destination: ResultBuffer, on_complete: TransferCallback);
}

impl<T: ComputeDevice + ?Sized> ComputeDevice for Arc<T> {
	fn relax(&self, params: &KernelParams, buffers: &mut DistanceBuffers, steps: u32) {
		(**self).relax(params, buffers, steps);
	}
	fn extract(&self, params: &KernelParams, distances: &DistanceField, out: &mut [u32]) {
		(**self).extract(params, distances, out);
	}
	fn transfer(&self, source: &[u32], destination: ResultBuffer, on_complete: TransferCallback) {
		(**self).transfer(source, destination, on_complete);
	}
}

/// Runs the kernels on the CPU with data-parallel row bands
#[derive(Clone, Copy, Debug)]
pub struct CpuDevice {
	/// Number of grid rows handled by each parallel work item
	rows_per_band: usize,
}

impl Default for CpuDevice {
	fn default() -> Self {
		CpuDevice { rows_per_band: 8 }
	}
}

impl CpuDevice {
	/// Create a new instance of [CpuDevice], a band is always at least one row
	pub fn new(rows_per_band: usize) -> Self {
		CpuDevice {
			rows_per_band: rows_per_band.max(1),
		}
	}
	/// Number of cells in a band for the given grid, never more than the
	/// whole grid
	fn band_len(&self, params: &KernelParams) -> usize {
		let dimensions = params.get_dimensions();
		let rows = self.rows_per_band.min(dimensions.get_height() as usize);
		dimensions.get_width() as usize * rows
	}
}

impl ComputeDevice for CpuDevice {
	fn relax(&self, params: &KernelParams, buffers: &mut DistanceBuffers, steps: u32) {
		let band_len = self.band_len(params);
		for _ in 0..steps {
			let (front, back) = buffers.split_mut();
			back.par_chunks_mut(band_len)
				.enumerate()
				.for_each(|(band, span)| relax_span(front, span, band * band_len, params));
			buffers.swap();
		}
	}
	fn extract(&self, params: &KernelParams, distances: &DistanceField, out: &mut [u32]) {
		let band_len = self.band_len(params);
		let front = distances.get();
		out.par_chunks_mut(band_len)
			.enumerate()
			.for_each(|(band, span)| extract_span(front, span, band * band_len, params));
	}
	fn transfer(&self, source: &[u32], mut destination: ResultBuffer, on_complete: TransferCallback) {
		let outcome = if source.len() == destination.len() {
			destination.copy_from_slice(source);
			Ok(())
		} else {
			Err(TransferError::new(format!(
				"source holds {} cells but the destination holds {}",
				source.len(),
				destination.len()
			)))
		};
		AsyncComputeTaskPool::get_or_init(TaskPool::default)
			.spawn(async move {
				on_complete(destination, outcome);
			})
			.detach();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crossbeam_channel::bounded;
	/// Maze-ish input with obstacles and two targets
	fn input() -> InputField {
		let dimensions = GridDimensions::new(13, 11).unwrap();
		let mut input = InputField::new(dimensions);
		for row in 1..10 {
			input.set_obstacle(FieldCell::new(4, row));
		}
		for row in 0..9 {
			input.set_obstacle(FieldCell::new(8, row));
		}
		input.set_target(FieldCell::new(0, 0), 0.0);
		input.set_target(FieldCell::new(12, 10), 2.0);
		input
	}
	#[test]
	fn parallel_relax_matches_sequential() {
		let input = input();
		for connectivity in [Connectivity::Cardinal, Connectivity::Diagonal] {
			let params = KernelParams::new(input.get_dimensions(), connectivity);
			let mut sequential = DistanceBuffers::new(input.get_dimensions());
			sequential.seed(&input);
			sequential.relax(&params, 17);
			let mut parallel = DistanceBuffers::new(input.get_dimensions());
			parallel.seed(&input);
			CpuDevice::new(3).relax(&params, &mut parallel, 17);
			assert_eq!(sequential.get_front(), parallel.get_front());
		}
	}
	#[test]
	fn parallel_extract_matches_sequential() {
		let input = input();
		let params = KernelParams::new(input.get_dimensions(), Connectivity::Diagonal);
		let mut buffers = DistanceBuffers::new(input.get_dimensions());
		buffers.seed(&input);
		buffers.relax(&params, 40);
		let mut sequential = DirectionField::new(input.get_dimensions());
		sequential.calculate(buffers.get_front(), Connectivity::Diagonal);
		let mut parallel = vec![0; input.get_dimensions().cell_count()];
		CpuDevice::new(2).extract(&params, buffers.get_front(), &mut parallel);
		assert_eq!(sequential.get().to_vec(), parallel);
	}
	#[test]
	fn zero_rows_per_band_is_clamped() {
		let device = CpuDevice::new(0);
		let params = KernelParams::new(GridDimensions::new(5, 5).unwrap(), Connectivity::Cardinal);
		assert_eq!(5, device.band_len(&params));
	}
	#[test]
	fn oversized_band_covers_whole_grid() {
		let input = input();
		let device = CpuDevice::new(usize::MAX);
		let params = KernelParams::new(input.get_dimensions(), Connectivity::Diagonal);
		assert_eq!(input.get_dimensions().cell_count(), device.band_len(&params));
		let mut sequential = DistanceBuffers::new(input.get_dimensions());
		sequential.seed(&input);
		sequential.relax(&params, 17);
		let mut parallel = DistanceBuffers::new(input.get_dimensions());
		parallel.seed(&input);
		device.relax(&params, &mut parallel, 17);
		assert_eq!(sequential.get_front(), parallel.get_front());
		let mut directions = DirectionField::new(input.get_dimensions());
		directions.calculate(sequential.get_front(), Connectivity::Diagonal);
		let mut out = vec![0; input.get_dimensions().cell_count()];
		device.extract(&params, parallel.get_front(), &mut out);
		assert_eq!(directions.get().to_vec(), out);
	}
	#[test]
	fn transfer_completes_asynchronously() {
		let mut pool = ResultPool::new(4, 2, 2).unwrap();
		let destination = pool.rent().unwrap();
		let (sender, receiver) = bounded(1);
		CpuDevice::default().transfer(
			&[3, 1, 4, 1],
			destination,
			Box::new(move |buffer, outcome| {
				let _ = sender.send((buffer.to_vec(), outcome));
			}),
		);
		let (cells, outcome) = receiver.recv().unwrap();
		assert_eq!(Ok(()), outcome);
		assert_eq!(vec![3, 1, 4, 1], cells);
	}
	#[test]
	fn transfer_length_mismatch_reports_error() {
		let mut pool = ResultPool::new(4, 2, 2).unwrap();
		let destination = pool.rent().unwrap();
		let (sender, receiver) = bounded(1);
		CpuDevice::default().transfer(
			&[0, 1],
			destination,
			Box::new(move |_, outcome| {
				let _ = sender.send(outcome);
			}),
		);
		assert!(receiver.recv().unwrap().is_err());
	}
}
