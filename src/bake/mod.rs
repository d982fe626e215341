//! The bake engine. A [FlowField] owns the distance buffers, the result pool
//! and a [ComputeDevice], and turns an [InputField] into a published
//! direction field:
//!
//! ```text
//!  InputField
//!      |  validate + seed (new session only)
//!      v
//!  DistanceBuffers --relax(budget)--> DistanceBuffers
//!      |                                  |
//!      | steps remain: InProgress         | relaxed
//!      v                                  v
//!    (next call continues)          rent ResultBuffer
//!                                         |  PoolExhausted: session kept,
//!                                         |  next call retries the rent
//!                                         v
//!                                      extract -> transfer -> publish
//! ```
//!
//! [FlowField::bake] never blocks. It either reports progress, reports that
//! every pooled buffer is busy, or hands back a [PendingBake] which can be
//! polled, or waited on in tests. Readers always see the most recently
//! completed bake through [FlowField::read_directions].
//!

pub mod device;
pub mod publisher;
pub mod result_pool;
pub mod session;

use crate::prelude::*;
use bevy::log::{debug, trace};
use bevy::prelude::Component;

/// Outcome of a single [FlowField::bake] call
#[derive(Debug)]
pub enum BakeStatus {
	/// Relaxation finished and a transfer is in flight
	Dispatched(PendingBake),
	/// An incremental bake has steps remaining, call again next quantum
	InProgress {
		/// Steps run so far
		completed: u32,
		/// Steps requested
		total: u32,
	},
	/// Every pooled buffer is busy and nothing was dispatched. The relaxed
	/// session is kept, the next call retries the dispatch without relaxing
	/// again
	PoolExhausted,
}

impl BakeStatus {
	/// Whether a transfer was dispatched
	pub fn is_dispatched(&self) -> bool {
		matches!(self, BakeStatus::Dispatched(_))
	}
	/// The completion token if a transfer was dispatched
	pub fn into_pending(self) -> Option<PendingBake> {
		match self {
			BakeStatus::Dispatched(pending) => Some(pending),
			_ => None,
		}
	}
}

/// A grid flow field with its bake machinery. It can be held as a plain
/// value or attached to an entity
#[derive(Component)]
pub struct FlowField {
	/// Grid every buffer covers
	dimensions: GridDimensions,
	/// Check input length when a session opens
	validate_input: bool,
	/// Options used by [FlowField::bake_default]
	default_options: BakeOptions,
	/// Front/back distance pair, reused by every bake
	distances: DistanceBuffers,
	/// Device side output of the extraction, copied into a pooled buffer
	staging: Vec<u32>,
	/// Open incremental session
	session: Option<BakeSession>,
	/// Pool and published result shared with completions
	publisher: CompletionPublisher,
	/// Executes the kernels
	device: Box<dyn ComputeDevice>,
	/// Set once buffers have been released
	disposed: bool,
}

impl FlowField {
	/// Create a new instance of [FlowField] baking on the CPU
	pub fn new(settings: &FlowFieldSettings) -> Result<Self, FlowFieldError> {
		Self::with_device(settings, CpuDevice::default())
	}
	/// Create a new instance of [FlowField] baking on `device`
	pub fn with_device(
		settings: &FlowFieldSettings,
		device: impl ComputeDevice + 'static,
	) -> Result<Self, FlowFieldError> {
		let dimensions = settings.dimensions()?;
		let pool = ResultPool::new(
			dimensions.cell_count(),
			settings.min_pooled_buffers,
			settings.max_pooled_buffers,
		)?;
		Ok(FlowField {
			dimensions,
			validate_input: settings.validate_input,
			default_options: settings.bake,
			distances: DistanceBuffers::new(dimensions),
			staging: vec![0; dimensions.cell_count()],
			session: None,
			publisher: CompletionPublisher::new(pool),
			device: Box::new(device),
			disposed: false,
		})
	}
	/// Get the grid the field covers
	pub fn get_dimensions(&self) -> GridDimensions {
		self.dimensions
	}
	/// Advance the bake by one quantum. When no session is open a new one is
	/// started from `input` and `options`, otherwise the open session
	/// continues and both arguments are ignored
	pub fn bake(&mut self, input: &InputField, options: BakeOptions) -> Result<BakeStatus, FlowFieldError> {
		let quantum = self.publisher.advance_quantum();
		let mut session = match self.session.take() {
			Some(session) => session,
			None => {
				if self.validate_input {
					input.validate(self.dimensions)?;
				}
				self.distances.seed(input);
				BakeSession::new(options)
			}
		};
		let params = KernelParams::new(self.dimensions, session.get_options().connectivity());
		let steps = session.quantum_budget();
		if steps > 0 {
			self.device.relax(&params, &mut self.distances, steps);
			session.advance(steps);
		}
		trace!(
			"Quantum {} relaxed {} steps, {}/{} complete",
			quantum,
			steps,
			session.get_completed(),
			session.get_options().iterations
		);
		if !session.is_relaxed() {
			let status = BakeStatus::InProgress {
				completed: session.get_completed(),
				total: session.get_options().iterations,
			};
			self.session = Some(session);
			return Ok(status);
		}
		let destination = match self.publisher.rent() {
			Ok(buffer) => buffer,
			Err(FlowFieldError::PoolExhausted { capacity }) => {
				debug!(
					"All {} result buffers are busy, holding the relaxed bake from quantum {}",
					capacity, quantum
				);
				self.session = Some(session);
				return Ok(BakeStatus::PoolExhausted);
			}
			Err(e) => return Err(e),
		};
		self.device
			.extract(&params, self.distances.get_front(), &mut self.staging);
		let pending = self.publisher.dispatch(
			self.device.as_ref(),
			&self.staging,
			destination,
			session.into_in_flight(quantum),
		);
		Ok(BakeStatus::Dispatched(pending))
	}
	/// [FlowField::bake] with the options the field was configured with
	pub fn bake_default(&mut self, input: &InputField) -> Result<BakeStatus, FlowFieldError> {
		self.bake(input, self.default_options)
	}
	/// Where the field is in its bake lifecycle
	pub fn state(&self) -> BakeState {
		if let Some(session) = &self.session {
			if session.is_relaxed() {
				BakeState::Finalizing
			} else {
				BakeState::Propagating
			}
		} else if self.publisher.in_flight() > 0 {
			BakeState::AwaitingCompletion
		} else {
			BakeState::Idle
		}
	}
	/// Fraction of the open session's steps run, [None] when no session is open
	pub fn progress(&self) -> Option<f32> {
		self.session.as_ref().map(|s| s.progress())
	}
	/// Run `f` against the published direction field, [None] before the
	/// first bake completes
	pub fn read_directions<R>(&self, f: impl FnOnce(Option<&[u32]>) -> R) -> R {
		self.publisher.read(f)
	}
	/// Index of the cell an agent at `index` should step to
	pub fn next_cell(&self, index: usize) -> Option<usize> {
		self.read_directions(|directions| directions.and_then(|d| d.get(index)).map(|n| *n as usize))
	}
	/// Direction an agent at `field_cell` should step in, [Ordinal::Zero] when
	/// it has arrived or has no route
	pub fn direction_at(&self, field_cell: FieldCell) -> Option<Ordinal> {
		let index = self.dimensions.get_index(field_cell)?;
		let next = self.next_cell(index)?;
		let target = self.dimensions.get_field_cell(next);
		Some(Ordinal::cell_to_cell_direction(
			target.get_column_row(),
			field_cell.get_column_row(),
		))
	}
	/// The live distance values, for visualisation
	pub fn distance_field(&self) -> &DistanceField {
		self.distances.get_front()
	}
	/// Diagnostics of the last publish
	pub fn latest_report(&self) -> Option<BakeReport> {
		self.publisher.latest_report()
	}
	/// Occupancy of the result pool
	pub fn pool_stats(&self) -> PoolStats {
		self.publisher.pool_stats()
	}
	/// Transfers dispatched and not yet completed
	pub fn in_flight(&self) -> usize {
		self.publisher.in_flight()
	}
	/// Release every buffer and return how many were released. In flight
	/// transfers still complete but publish nothing
	pub fn dispose(mut self) -> usize {
		self.release()
	}
	/// Shared by [FlowField::dispose] and [Drop]
	fn release(&mut self) -> usize {
		if self.disposed {
			return 0;
		}
		self.disposed = true;
		self.session = None;
		let released = self.publisher.dispose();
		debug!("Flow field released {} result buffers", released);
		released
	}
}

impl Drop for FlowField {
	fn drop(&mut self) {
		self.release();
	}
}
