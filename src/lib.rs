//! lattice-opt - Constrained black-box design optimization for physical lattices.
//!
//! A candidate design is a flat vector. It is decoded into a square lattice
//! (optionally through a symmetry reduction) or a set of control settings,
//! turned into a model, scored by an expensive stochastic simulator, and
//! searched over by a population-based optimizer.
//!
//! # Architecture
//!
//! - `schema`: Configuration, design-space and result types
//! - `compute`: Grid codec, symmetry reducer, constraint penalizer, model
//!   builders, simulators, and the fitness/search pipeline in
//!   `compute::evolution`
//!
//! # Example
//!
//! ```rust,no_run
//! use lattice_opt::{
//!     compute::{SymmetryMap, evolution::OptimizationDriver},
//!     schema::{RunConfig, SymmetryGroup},
//! };
//!
//! // 11x11 lattice under quarter symmetry: 36 independent cells
//! let map = SymmetryMap::new(11, SymmetryGroup::Quarter);
//! assert_eq!(map.dimension(), 36);
//!
//! // Run the fuel-budget study against the configured simulator
//! let report = OptimizationDriver::from_config(RunConfig::assembly_max_keff())?.run()?;
//! println!("best k-eff: {:.5}", report.best_score);
//! # Ok::<(), lattice_opt::compute::evolution::DriverError>(())
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{FitnessEvaluator, OptimizationDriver};
pub use compute::{Grid, SymmetryMap};
pub use schema::{DesignVector, RunConfig, RunReport};
