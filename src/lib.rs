//! Slime mould growth on a tile grid.
//!
//! Mould heads grow tile by tile along A* routes, eat the food they stumble
//! on, and fade away unless growth keeps passing back through them. The
//! [`Simulation`] engine owns all state; rendering and timing live outside
//! and talk to it through [`RenderSink`] and `tick()`.

pub mod api;
pub mod config;
pub mod error;
pub mod frontier;
pub mod grid;
pub mod pathfinding;
pub mod render;
pub mod simulation;
pub mod types;

pub use config::SimulationConfig;
pub use error::{ConfigError, SimError};
pub use grid::Grid;
pub use render::{CellEvent, NullSink, RecordingSink, RenderSink, TallySink};
pub use simulation::{Simulation, SimulationStats, TickReport};
pub use types::{CellState, Position};
