//! Progress tracking for a single bake. A session is opened when a bake
//! starts from [BakeState::Idle] and counts relaxation steps until the
//! requested total has been reached, at which point extraction runs and the
//! session is handed to the publisher as an [InFlightBake].
//!
//! ```text
//!            bake()                  bake()            bake()
//!  Idle ------------> Propagating ------------> ... ----------> Finalizing
//!   ^                (steps remain)                            |
//!   |                                                          v
//!   +-------------------- completion ------------------ AwaitingCompletion
//! ```
//!
//! A non-incremental bake passes straight from `Idle` to `Finalizing` within
//! a single call. When no result buffer is free the session stays in
//! `Finalizing` until a later call can rent one.
//!

use crate::prelude::*;
use bevy::prelude::Reflect;
use std::time::Instant;

/// Where a flow field is in its bake lifecycle
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Reflect)]
pub enum BakeState {
	/// No session is open and nothing is in flight
	#[default]
	Idle,
	/// An incremental session has steps remaining
	Propagating,
	/// Relaxation is complete and the session is waiting for a result buffer
	/// to extract into. Only observable between calls when the pool was
	/// exhausted on the final quantum
	Finalizing,
	/// At least one transfer has been dispatched and not yet completed
	AwaitingCompletion,
}

/// Iteration progress of the open bake
#[derive(Clone, Debug, PartialEq)]
pub struct BakeSession {
	/// What was requested when the session opened
	options: BakeOptions,
	/// Relaxation steps run so far
	completed: u32,
}

impl BakeSession {
	/// Open a session with no steps run
	pub fn new(options: BakeOptions) -> Self {
		BakeSession {
			options,
			completed: 0,
		}
	}
	/// Options the session was opened with
	pub fn get_options(&self) -> &BakeOptions {
		&self.options
	}
	/// Steps run so far
	pub fn get_completed(&self) -> u32 {
		self.completed
	}
	/// Steps still to run
	pub fn remaining(&self) -> u32 {
		self.options.iterations.saturating_sub(self.completed)
	}
	/// Number of steps to run during the current quantum
	pub fn quantum_budget(&self) -> u32 {
		if self.options.is_incremental() {
			self.remaining().min(self.options.iterations_per_quantum)
		} else {
			self.remaining()
		}
	}
	/// Record that `steps` more steps have run
	pub fn advance(&mut self, steps: u32) {
		self.completed = self.completed.saturating_add(steps).min(self.options.iterations);
	}
	/// Whether every requested step has run
	pub fn is_relaxed(&self) -> bool {
		self.completed >= self.options.iterations
	}
	/// Fraction of the requested steps run, `1.0` for a zero step bake
	pub fn progress(&self) -> f32 {
		if self.options.iterations == 0 {
			1.0
		} else {
			self.completed as f32 / self.options.iterations as f32
		}
	}
	/// Close the session as it is dispatched at `quantum`
	pub fn into_in_flight(self, quantum: u64) -> InFlightBake {
		InFlightBake {
			iterations: self.completed,
			dispatched_quantum: quantum,
			dispatched_at: Instant::now(),
		}
	}
}

/// What the publisher needs to know about a dispatched bake
#[derive(Clone, Copy, Debug)]
pub struct InFlightBake {
	/// Relaxation steps the result was produced with
	iterations: u32,
	/// Quantum during which the transfer was requested
	dispatched_quantum: u64,
	/// Wall clock time of the request
	dispatched_at: Instant,
}

impl InFlightBake {
	/// Relaxation steps the result was produced with
	pub fn get_iterations(&self) -> u32 {
		self.iterations
	}
	/// Quantum during which the transfer was requested
	pub fn get_dispatched_quantum(&self) -> u64 {
		self.dispatched_quantum
	}
	/// Wall clock time of the request
	pub fn get_dispatched_at(&self) -> Instant {
		self.dispatched_at
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn non_incremental_runs_everything() {
		let session = BakeSession::new(BakeOptions::new(20));
		assert_eq!(20, session.quantum_budget());
	}
	#[test]
	fn incremental_slices() {
		let mut session = BakeSession::new(BakeOptions::new(10).incremental(4));
		let mut budgets = vec![];
		while !session.is_relaxed() {
			let budget = session.quantum_budget();
			budgets.push(budget);
			session.advance(budget);
		}
		assert_eq!(vec![4, 4, 2], budgets);
		assert_eq!(10, session.get_completed());
		assert_eq!(1.0, session.progress());
	}
	#[test]
	fn zero_iterations_is_relaxed_immediately() {
		let session = BakeSession::new(BakeOptions::new(0).incremental(4));
		assert!(session.is_relaxed());
		assert_eq!(0, session.quantum_budget());
	}
	#[test]
	fn advance_is_clamped() {
		let mut session = BakeSession::new(BakeOptions::new(3));
		session.advance(7);
		assert_eq!(3, session.get_completed());
		assert_eq!(0, session.remaining());
	}
	#[test]
	fn in_flight_keeps_iterations() {
		let mut session = BakeSession::new(BakeOptions::new(6).incremental(3));
		session.advance(3);
		assert_eq!(0.5, session.progress());
		session.advance(3);
		let in_flight = session.into_in_flight(12);
		assert_eq!(6, in_flight.get_iterations());
		assert_eq!(12, in_flight.get_dispatched_quantum());
	}
}
