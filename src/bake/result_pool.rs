//! A bounded set of reusable direction buffers. Completion of a bake is
//! asynchronous so several buffers may be in flight at once, each being
//! written by a transfer, alongside the one currently published for readers.
//!
//! ```text
//!  slot   0        1        2        3 (capacity)
//!       [free]  [rented] [rented]   (not yet allocated)
//!                  ^        ^
//!          published     in flight
//! ```
//!
//! Renting moves the buffer out of its slot so nothing else can touch it
//! until it is given back, the slot index travels with the [ResultBuffer].
//! The pool starts with the minimum number of buffers allocated and grows one
//! at a time up to its capacity. It never shrinks.
//!

use crate::prelude::*;
use bevy::log::warn;
use std::ops::{Deref, DerefMut};

/// Smallest pool allowed, one buffer published plus one being written
pub const MIN_POOLED_BUFFERS: usize = 2;

/// A direction buffer rented from a [ResultPool]
#[derive(Debug, PartialEq)]
pub struct ResultBuffer {
	/// Slot it must return to
	slot: usize,
	/// Next-step indices
	cells: Vec<u32>,
}

impl ResultBuffer {
	/// Index of the pool slot that owns this buffer
	pub fn get_slot(&self) -> usize {
		self.slot
	}
}

impl Deref for ResultBuffer {
	type Target = [u32];
	fn deref(&self) -> &[u32] {
		&self.cells
	}
}

impl DerefMut for ResultBuffer {
	fn deref_mut(&mut self) -> &mut [u32] {
		&mut self.cells
	}
}

/// Snapshot of pool occupancy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct PoolStats {
	/// Buffers created so far
	pub allocated: usize,
	/// Buffers sitting in the pool
	pub free: usize,
	/// Buffers handed out, `allocated - free`
	pub rented: usize,
	/// Upper bound on `allocated`
	pub capacity: usize,
}

/// Owns every direction buffer of a flow field
#[derive(Debug)]
pub struct ResultPool {
	/// Cell count of each buffer
	buffer_len: usize,
	/// Upper bound of allocated buffers
	capacity: usize,
	/// One entry per allocated buffer, [None] while it is rented
	slots: Vec<Option<Vec<u32>>>,
	/// Once disposed returned buffers are dropped rather than stored
	disposed: bool,
}

impl ResultPool {
	/// Create a new instance of [ResultPool] holding `min` preallocated
	/// buffers of `buffer_len` cells and able to grow to `max`
	pub fn new(buffer_len: usize, min: usize, max: usize) -> Result<Self, FlowFieldError> {
		if min < MIN_POOLED_BUFFERS {
			return Err(FlowFieldError::InvalidConfiguration(format!(
				"minimum pooled buffers must be at least {}, got {}",
				MIN_POOLED_BUFFERS, min
			)));
		}
		if max < min {
			return Err(FlowFieldError::InvalidConfiguration(format!(
				"maximum pooled buffers ({}) is below the minimum ({})",
				max, min
			)));
		}
		Ok(ResultPool {
			buffer_len,
			capacity: max,
			slots: (0..min).map(|_| Some(vec![0; buffer_len])).collect(),
			disposed: false,
		})
	}
	/// Take a free buffer, allocating a new one if every existing buffer is
	/// rented and there is still headroom
	pub fn rent(&mut self) -> Result<ResultBuffer, FlowFieldError> {
		if self.disposed {
			return Err(FlowFieldError::PoolExhausted { capacity: 0 });
		}
		if let Some(slot) = self.slots.iter().position(|s| s.is_some()) {
			if let Some(cells) = self.slots[slot].take() {
				return Ok(ResultBuffer { slot, cells });
			}
		}
		if self.slots.len() < self.capacity {
			self.slots.push(None);
			return Ok(ResultBuffer {
				slot: self.slots.len() - 1,
				cells: vec![0; self.buffer_len],
			});
		}
		Err(FlowFieldError::PoolExhausted {
			capacity: self.capacity,
		})
	}
	/// Put a rented buffer back into its slot
	pub fn give_back(&mut self, buffer: ResultBuffer) {
		if self.disposed {
			return;
		}
		let ResultBuffer { slot, cells } = buffer;
		match self.slots.get_mut(slot) {
			Some(entry) if entry.is_none() => *entry = Some(cells),
			Some(_) => warn!("Result buffer {} returned twice, dropping it", slot),
			None => warn!("Result buffer {} does not belong to this pool", slot),
		}
	}
	/// Number of buffers waiting in the pool
	pub fn free_count(&self) -> usize {
		self.slots.iter().filter(|s| s.is_some()).count()
	}
	/// Number of buffers created
	pub fn allocated(&self) -> usize {
		self.slots.len()
	}
	/// Number of buffers currently handed out
	pub fn rented_count(&self) -> usize {
		self.allocated() - self.free_count()
	}
	/// Upper bound of allocated buffers
	pub fn capacity(&self) -> usize {
		self.capacity
	}
	/// Cell count of each buffer
	pub fn buffer_len(&self) -> usize {
		self.buffer_len
	}
	/// Occupancy snapshot
	pub fn stats(&self) -> PoolStats {
		PoolStats {
			allocated: self.allocated(),
			free: self.free_count(),
			rented: self.rented_count(),
			capacity: self.capacity,
		}
	}
	/// Whether [ResultPool::dispose] has run
	pub fn is_disposed(&self) -> bool {
		self.disposed
	}
	/// Release every free buffer and return how many were released. Buffers
	/// still rented are dropped by whoever holds them, late returns are
	/// ignored
	pub fn dispose(&mut self) -> usize {
		let released = self.free_count();
		self.slots.clear();
		self.disposed = true;
		released
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn minimum_bound_enforced() {
		let result = ResultPool::new(4, 1, 4);
		assert!(matches!(result, Err(FlowFieldError::InvalidConfiguration(_))));
	}
	#[test]
	fn maximum_below_minimum_rejected() {
		let result = ResultPool::new(4, 3, 2);
		assert!(matches!(result, Err(FlowFieldError::InvalidConfiguration(_))));
	}
	#[test]
	fn preallocates_minimum() {
		let pool = ResultPool::new(4, 2, 4).unwrap();
		let actual = PoolStats {
			allocated: 2,
			free: 2,
			rented: 0,
			capacity: 4,
		};
		assert_eq!(actual, pool.stats());
	}
	#[test]
	fn grows_lazily_to_capacity() {
		let mut pool = ResultPool::new(4, 2, 3).unwrap();
		let a = pool.rent().unwrap();
		let b = pool.rent().unwrap();
		assert_eq!(2, pool.allocated());
		let c = pool.rent().unwrap();
		assert_eq!(3, pool.allocated());
		assert_eq!(4, c.len());
		assert_eq!(
			Err(FlowFieldError::PoolExhausted { capacity: 3 }),
			pool.rent()
		);
		assert_eq!(3, pool.rented_count());
		let slots: Vec<usize> = [&a, &b, &c].iter().map(|r| r.get_slot()).collect();
		assert_eq!(vec![0, 1, 2], slots);
	}
	#[test]
	fn returned_buffer_is_reused() {
		let mut pool = ResultPool::new(4, 2, 2).unwrap();
		let _a = pool.rent().unwrap();
		let mut b = pool.rent().unwrap();
		b[0] = 9;
		pool.give_back(b);
		assert_eq!(1, pool.free_count());
		let again = pool.rent().unwrap();
		assert_eq!(1, again.get_slot());
		assert_eq!(9, again[0]);
	}
	#[test]
	fn double_return_is_ignored() {
		let mut pool = ResultPool::new(4, 2, 2).unwrap();
		let forged = ResultBuffer {
			slot: 0,
			cells: vec![0; 4],
		};
		pool.give_back(forged);
		assert_eq!(2, pool.free_count());
		assert_eq!(2, pool.allocated());
	}
	#[test]
	fn dispose_releases_free_buffers() {
		let mut pool = ResultPool::new(4, 3, 3).unwrap();
		let rented = pool.rent().unwrap();
		assert_eq!(2, pool.dispose());
		// a transfer completing after disposal hands its buffer back
		pool.give_back(rented);
		assert_eq!(0, pool.allocated());
		assert!(pool.is_disposed());
		assert!(pool.rent().is_err());
	}
}
