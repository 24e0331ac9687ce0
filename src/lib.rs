pub mod drivers;
pub mod generators;
pub mod maze;
pub mod render;
pub mod robot;

pub use maze::{CardinalDirection, Floorplan, Maze, Wallboard};
