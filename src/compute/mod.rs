//! Compute module - Encoding, symmetry, constraints, models and simulators.

mod constraint;
mod grid;
mod model;
mod process;
mod simulator;
mod space;
mod symmetry;

pub mod evolution;

pub use constraint::*;
pub use grid::*;
pub use model::*;
pub use process::*;
pub use simulator::*;
pub use space::*;
pub use symmetry::*;
