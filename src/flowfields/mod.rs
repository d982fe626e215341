//! Flowfields (also known as Dijkstra maps) are a means of handling pathfinding for a crowd of actors.
//!
//! [Fixing Pathfinding Once and For All](https://web.archive.org/web/20150905073624/http://www.ai-blog.net/archives/000152.html)
//!
//! [The Incredible Power of Dijkstra Maps](https://www.roguebasin.com/index.php/The_Incredible_Power_of_Dijkstra_Maps)
//!
//! [leifnode](https://leifnode.com/2013/12/flow-field-pathfinding/)
//!
//! Rather than searching a path per actor, the whole map is processed once
//! and every cell learns which neighbour leads closer to the nearest target.
//! Any number of actors can then steer by looking up the cell they stand on.
//!
//! Definitions:
//!
//! * Grid - a uniform `width x height` area, every field below is a dense row-major array laid over it
//!
//! ```text
//!  _____________________________
//! |__|__|__|__|__|__|__|__|__|__|
//! |__|__|__|__|__|__|__|__|__|__|
//! |__|__|__|__|__|__|__|__|__|__|
//! |__|__|__|__|__|__|__|__|__|__|
//! |__|__|__|__|__|__|__|__|__|__|
//! ```
//!
//! * Input field - describes each cell as an obstacle, free space or a target with a priority
//! * Distance field - the cost of reaching the nearest target from each cell, grown outwards from the targets by a fixed number of relaxation steps
//! * Direction field - for each cell the index of the neighbouring cell to step to next, a cell pointing at itself has arrived or has not been reached yet
//!

pub mod fields;
pub mod grid;
pub mod utilities;
