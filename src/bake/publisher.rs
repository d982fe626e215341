//! Publishes finished bakes. The publisher is shared between the host, which
//! rents buffers and dispatches transfers, and the completion callbacks,
//! which may fire on another thread at any later point. Both sides go
//! through the same lock so renting and returning buffers can interleave
//! freely.
//!
//! ```text
//!  dispatch        transfer          complete
//!  rent() -----> [ buffer B ] -----> publish B, give back A
//!                                         |
//!  readers see A ........................ | readers see B
//! ```
//!
//! Completions may land in any order. Whatever completes last is the newest
//! known result, earlier dispatches completing later still replace it.
//!

use crate::prelude::*;
use bevy::log::{debug, error};
use crossbeam_channel::{bounded, Receiver, TryRecvError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Diagnostics recorded when a bake is published
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BakeReport {
	/// Relaxation steps the published field was produced with
	pub iterations: u32,
	/// Bake calls made between dispatch and completion
	pub quanta_elapsed: u64,
	/// Wall clock time between dispatch and completion
	pub elapsed: Duration,
}

/// State shared with completion callbacks
#[derive(Debug)]
struct PublishedState {
	/// Every direction buffer
	pool: ResultPool,
	/// Buffer readers currently see
	current: Option<ResultBuffer>,
	/// Diagnostics of the last publish
	latest_report: Option<BakeReport>,
	/// Transfers dispatched and not yet completed
	in_flight: usize,
}

/// Handle onto the published result, cloned into each completion callback
#[derive(Clone, Debug)]
pub struct CompletionPublisher {
	/// Pool and published buffer
	state: Arc<Mutex<PublishedState>>,
	/// Count of bake calls, used for the quanta elapsed diagnostic
	quantum: Arc<AtomicU64>,
}

impl CompletionPublisher {
	/// Create a new instance of [CompletionPublisher] owning `pool`
	pub fn new(pool: ResultPool) -> Self {
		CompletionPublisher {
			state: Arc::new(Mutex::new(PublishedState {
				pool,
				current: None,
				latest_report: None,
				in_flight: 0,
			})),
			quantum: Arc::new(AtomicU64::new(0)),
		}
	}
	/// Lock the shared state, a callback that panicked mid-update leaves the
	/// pool consistent enough to keep using
	fn lock(&self) -> MutexGuard<'_, PublishedState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}
	/// Mark the start of a new scheduling quantum and return its number
	pub fn advance_quantum(&self) -> u64 {
		self.quantum.fetch_add(1, Ordering::AcqRel) + 1
	}
	/// Number of the current scheduling quantum
	pub fn current_quantum(&self) -> u64 {
		self.quantum.load(Ordering::Acquire)
	}
	/// Rent a buffer from the pool
	pub fn rent(&self) -> Result<ResultBuffer, FlowFieldError> {
		self.lock().pool.rent()
	}
	/// Ask `device` to copy `source` into `destination` and publish it once
	/// the copy completes
	pub fn dispatch(
		&self,
		device: &dyn ComputeDevice,
		source: &[u32],
		destination: ResultBuffer,
		bake: InFlightBake,
	) -> PendingBake {
		self.lock().in_flight += 1;
		debug!(
			"Dispatching bake of {} iterations into buffer {} at quantum {}",
			bake.get_iterations(),
			destination.get_slot(),
			bake.get_dispatched_quantum()
		);
		let (sender, receiver) = bounded(1);
		let publisher = self.clone();
		// the lock is not held here, a device may complete synchronously
		device.transfer(
			source,
			destination,
			Box::new(move |buffer, outcome| {
				let result = publisher.complete(buffer, outcome, bake);
				let _ = sender.send(result);
			}),
		);
		PendingBake::new(receiver)
	}
	/// Handle a finished transfer. On success the buffer becomes the published
	/// result and the previous one goes back to the pool, on failure the
	/// published result is left untouched
	pub fn complete(
		&self,
		buffer: ResultBuffer,
		outcome: Result<(), TransferError>,
		bake: InFlightBake,
	) -> Result<BakeReport, FlowFieldError> {
		let report = BakeReport {
			iterations: bake.get_iterations(),
			quanta_elapsed: self.current_quantum().saturating_sub(bake.get_dispatched_quantum()),
			elapsed: bake.get_dispatched_at().elapsed(),
		};
		let mut state = self.lock();
		state.in_flight = state.in_flight.saturating_sub(1);
		if let Err(e) = outcome {
			error!("Bake transfer into buffer {} failed, keeping the previous result: {}", buffer.get_slot(), e);
			state.pool.give_back(buffer);
			return Err(FlowFieldError::Transfer(e));
		}
		if state.pool.is_disposed() {
			// nowhere to publish, the buffer is released here
			return Ok(report);
		}
		let slot = buffer.get_slot();
		if let Some(previous) = state.current.replace(buffer) {
			state.pool.give_back(previous);
		}
		state.latest_report = Some(report);
		debug!(
			"Published buffer {} after {} quanta ({:?}), {} transfers still in flight",
			slot, report.quanta_elapsed, report.elapsed, state.in_flight
		);
		Ok(report)
	}
	/// Run `f` against the published directions, [None] before the first
	/// publish
	pub fn read<R>(&self, f: impl FnOnce(Option<&[u32]>) -> R) -> R {
		let state = self.lock();
		f(state.current.as_deref())
	}
	/// Diagnostics of the last publish
	pub fn latest_report(&self) -> Option<BakeReport> {
		self.lock().latest_report
	}
	/// Occupancy of the result pool
	pub fn pool_stats(&self) -> PoolStats {
		self.lock().pool.stats()
	}
	/// Transfers dispatched and not yet completed
	pub fn in_flight(&self) -> usize {
		self.lock().in_flight
	}
	/// Release the pool and the published buffer, returning how many buffers
	/// were released. Transfers still in flight drop their buffers when they
	/// complete
	pub fn dispose(&self) -> usize {
		let mut state = self.lock();
		let published = usize::from(state.current.take().is_some());
		state.pool.dispose() + published
	}
}

/// Token for a dispatched bake
#[derive(Debug)]
pub struct PendingBake {
	/// Receives the outcome from the completion callback
	receiver: Receiver<Result<BakeReport, FlowFieldError>>,
	/// Outcome once it has been observed by [PendingBake::poll]
	outcome: Option<Result<BakeReport, FlowFieldError>>,
}

impl PendingBake {
	/// Create a new instance of [PendingBake]
	fn new(receiver: Receiver<Result<BakeReport, FlowFieldError>>) -> Self {
		PendingBake {
			receiver,
			outcome: None,
		}
	}
	/// Error reported when a device drops a callback without invoking it
	fn dropped() -> FlowFieldError {
		FlowFieldError::Transfer(TransferError::new("completion callback dropped without running"))
	}
	/// Check for completion without blocking
	pub fn poll(&mut self) -> Option<Result<BakeReport, FlowFieldError>> {
		if self.outcome.is_none() {
			self.outcome = match self.receiver.try_recv() {
				Ok(result) => Some(result),
				Err(TryRecvError::Empty) => None,
				Err(TryRecvError::Disconnected) => Some(Err(Self::dropped())),
			};
		}
		self.outcome.clone()
	}
	/// Block until the transfer completes. Intended for tests and tools, a
	/// simulation should poll instead
	pub fn wait(self) -> Result<BakeReport, FlowFieldError> {
		match self.outcome {
			Some(result) => result,
			None => self.receiver.recv().unwrap_or_else(|_| Err(Self::dropped())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Mutex as StdMutex;
	/// Holds callbacks until told to complete them
	#[derive(Default)]
	struct HeldDevice {
		/// Callbacks with their filled buffers
		held: StdMutex<Vec<(ResultBuffer, TransferCallback)>>,
	}
	impl ComputeDevice for HeldDevice {
		fn relax(&self, _: &KernelParams, _: &mut DistanceBuffers, _: u32) {}
		fn extract(&self, _: &KernelParams, _: &DistanceField, _: &mut [u32]) {}
		fn transfer(&self, source: &[u32], mut destination: ResultBuffer, on_complete: TransferCallback) {
			destination.copy_from_slice(source);
			self.held.lock().unwrap().push((destination, on_complete));
		}
	}
	impl HeldDevice {
		/// Complete the held transfer at `index` with `outcome`
		fn release(&self, index: usize, outcome: Result<(), TransferError>) {
			let (buffer, callback) = self.held.lock().unwrap().remove(index);
			callback(buffer, outcome);
		}
	}
	/// An in flight bake dispatched at quantum 1
	fn bake() -> InFlightBake {
		BakeSession::new(BakeOptions::new(0)).into_in_flight(1)
	}
	#[test]
	fn publish_replaces_and_recycles() {
		let publisher = CompletionPublisher::new(ResultPool::new(2, 2, 3).unwrap());
		let device = HeldDevice::default();
		let first = publisher.rent().unwrap();
		let mut pending = publisher.dispatch(&device, &[0, 0], first, bake());
		assert!(pending.poll().is_none());
		assert_eq!(1, publisher.in_flight());
		device.release(0, Ok(()));
		assert!(pending.poll().unwrap().is_ok());
		let second = publisher.rent().unwrap();
		let pending = publisher.dispatch(&device, &[1, 1], second, bake());
		device.release(0, Ok(()));
		assert!(pending.wait().is_ok());
		assert_eq!(Some(vec![1, 1]), publisher.read(|d| d.map(|d| d.to_vec())));
		let stats = publisher.pool_stats();
		assert_eq!(1, stats.rented);
		assert_eq!(0, publisher.in_flight());
	}
	#[test]
	fn out_of_order_completion_is_newest_wins() {
		let publisher = CompletionPublisher::new(ResultPool::new(1, 2, 3).unwrap());
		let device = HeldDevice::default();
		let a = publisher.rent().unwrap();
		let _pa = publisher.dispatch(&device, &[7], a, bake());
		let b = publisher.rent().unwrap();
		let _pb = publisher.dispatch(&device, &[8], b, bake());
		// the later dispatch lands first
		device.release(1, Ok(()));
		device.release(0, Ok(()));
		assert_eq!(Some(vec![7]), publisher.read(|d| d.map(|d| d.to_vec())));
		assert_eq!(1, publisher.pool_stats().rented);
	}
	#[test]
	fn failed_transfer_keeps_previous() {
		let publisher = CompletionPublisher::new(ResultPool::new(1, 2, 2).unwrap());
		let device = HeldDevice::default();
		let a = publisher.rent().unwrap();
		let pa = publisher.dispatch(&device, &[4], a, bake());
		device.release(0, Ok(()));
		pa.wait().unwrap();
		let b = publisher.rent().unwrap();
		let pb = publisher.dispatch(&device, &[5], b, bake());
		device.release(0, Err(TransferError::new("lost")));
		assert!(matches!(pb.wait(), Err(FlowFieldError::Transfer(_))));
		assert_eq!(Some(vec![4]), publisher.read(|d| d.map(|d| d.to_vec())));
		assert_eq!(1, publisher.pool_stats().free);
	}
	#[test]
	fn dropped_callback_is_reported() {
		let (sender, receiver) = bounded::<Result<BakeReport, FlowFieldError>>(1);
		drop(sender);
		let mut pending = PendingBake::new(receiver);
		assert!(matches!(pending.poll(), Some(Err(FlowFieldError::Transfer(_)))));
	}
	#[test]
	fn quanta_elapsed_is_recorded() {
		let publisher = CompletionPublisher::new(ResultPool::new(1, 2, 2).unwrap());
		let device = HeldDevice::default();
		let quantum = publisher.advance_quantum();
		let session = BakeSession::new(BakeOptions::new(5));
		let a = publisher.rent().unwrap();
		let pending = publisher.dispatch(&device, &[0], a, session.into_in_flight(quantum));
		publisher.advance_quantum();
		publisher.advance_quantum();
		device.release(0, Ok(()));
		let report = pending.wait().unwrap();
		assert_eq!(2, report.quanta_elapsed);
		assert_eq!(Some(report), publisher.latest_report());
	}
	#[test]
	fn dispose_with_transfer_outstanding() {
		let publisher = CompletionPublisher::new(ResultPool::new(1, 2, 2).unwrap());
		let device = HeldDevice::default();
		let a = publisher.rent().unwrap();
		let pending = publisher.dispatch(&device, &[0], a, bake());
		assert_eq!(1, publisher.dispose());
		device.release(0, Ok(()));
		assert!(pending.wait().is_ok());
		assert_eq!(None, publisher.read(|d| d.map(|d| d.to_vec())));
	}
}
