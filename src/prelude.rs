//! `use bevy_flowfield_bake::prelude::*;` to import common structures and methods
//!

#[doc(hidden)]
pub use crate::flowfields::{
	fields::{direction_field::*, distance_field::*, input_field::*, *},
	grid::*,
	utilities::*,
};

#[doc(hidden)]
pub use crate::{
	bake::{device::*, publisher::*, result_pool::*, session::*, *},
	error::*,
	settings::*,
};
