//! Fitness evaluation and search for lattice design optimization.
//!
//! # Overview
//!
//! - **Fitness** (`fitness`): design vector to penalized, rounded scalar, with
//!   simulator failures absorbed into a sentinel
//! - **Randomness** (`rng`): seeded initialization and trial-vector moves
//! - **Search** (`search`): the `Optimizer` trait with differential evolution
//!   and Jaya implementations
//! - **Driver** (`driver`): configuration to report, owning symmetry and pool
//!   setup
//!
//! # Example
//!
//! ```rust,no_run
//! use lattice_opt::compute::evolution::OptimizationDriver;
//! use lattice_opt::schema::RunConfig;
//!
//! let driver = OptimizationDriver::from_config(RunConfig::pin_cell_target())?;
//! let report = driver.run()?;
//! println!("best enrichment {:?}, |k - 1.10| = {:.5}", report.full_vector, report.best_score);
//! # Ok::<(), lattice_opt::compute::evolution::DriverError>(())
//! ```

mod driver;
mod fitness;
mod rng;
mod search;

pub use driver::{DriverError, OptimizationDriver};
pub use fitness::{EvaluationError, FAILURE_FITNESS, FitnessEvaluator, round_to};
pub use rng::DesignRng;
pub use search::{
    DifferentialEvolution, FitnessFn, Jaya, Optimizer, SearchError, optimizer_for,
};
