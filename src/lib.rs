//! Bake engine for grid flow fields (Dijkstra maps). A [prelude::FlowField]
//! relaxes distances outwards from weighted targets in parallel, derives a
//! next-step index for every cell and publishes the result asynchronously so
//! any number of agents can steer by a single lookup.
//!
//! ```rust
//! use bevy_flowfield_bake::prelude::*;
//!
//! let settings = FlowFieldSettings::new(7, 3);
//! let mut field = FlowField::new(&settings).unwrap();
//! let mut input = InputField::new(settings.dimensions().unwrap());
//! input.set_target(FieldCell::new(3, 1), 0.0);
//! let options = BakeOptions::new(20).with_diagonal_movement(true);
//! if let BakeStatus::Dispatched(pending) = field.bake(&input, options).unwrap() {
//! 	pending.wait().unwrap();
//! }
//! assert_eq!(Some(Ordinal::SouthEast), field.direction_at(FieldCell::new(0, 0)));
//! ```
//!

pub mod bake;
pub mod error;
pub mod flowfields;
pub mod settings;

pub mod prelude;
