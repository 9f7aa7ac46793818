//! Optimization driver: wires a configuration to an optimizer and collects
//! the run report.

use std::sync::Arc;
use std::time::Instant;

use log::info;

use crate::compute::model::{ModelBuilder, builder_for};
use crate::compute::simulator::{Simulator, simulator_for};
use crate::compute::symmetry::SymmetryError;
use crate::schema::{ConfigError, DesignVector, RunConfig, RunReport, SearchSettings};

use super::fitness::FitnessEvaluator;
use super::search::{Optimizer, SearchError, optimizer_for};

/// Driver errors.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Search failed: {0}")]
    Search(#[from] SearchError),
    #[error("Could not expand best design: {0}")]
    Symmetry(#[from] SymmetryError),
    #[error("Could not build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Runs one configured search.
pub struct OptimizationDriver {
    config: RunConfig,
    evaluator: FitnessEvaluator,
    optimizer: Box<dyn Optimizer>,
}

impl OptimizationDriver {
    /// Validate `config` and wire it to the given builder and simulator.
    pub fn new(
        config: RunConfig,
        builder: Arc<dyn ModelBuilder>,
        simulator: Arc<dyn Simulator>,
    ) -> Result<Self, DriverError> {
        config.validate()?;
        let evaluator = FitnessEvaluator::from_config(&config, builder, simulator);
        let optimizer = optimizer_for(&config.search.algorithm);
        Ok(Self {
            config,
            evaluator,
            optimizer,
        })
    }

    /// Use the builder and simulator the configuration names.
    pub fn from_config(config: RunConfig) -> Result<Self, DriverError> {
        let builder = builder_for(&config.model);
        let simulator = simulator_for(&config.simulator);
        Self::new(config, builder, simulator)
    }

    /// Replace the configured optimizer.
    pub fn with_optimizer(mut self, optimizer: Box<dyn Optimizer>) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &FitnessEvaluator {
        &self.evaluator
    }

    /// Run the search to completion.
    pub fn run(&self) -> Result<RunReport, DriverError> {
        let search = &self.config.search;
        let seed = search.random_seed.unwrap_or_else(rand::random);
        let settings = SearchSettings {
            population_size: search.population_size,
            generations: search.generations,
            seed,
        };

        // 0 threads lets rayon pick one per core
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(search.workers)
            .build()?;

        let evaluator = &self.evaluator;
        info!(
            "searching {} variables: population {}, {} generations, seed {seed}, {} workers",
            evaluator.bounds().len(),
            settings.population_size,
            settings.generations,
            pool.current_num_threads()
        );

        let start = Instant::now();
        let fitness = |vector: &DesignVector| evaluator.evaluate(vector);
        let outcome =
            pool.install(|| self.optimizer.search(evaluator.bounds(), &fitness, &settings))?;
        let elapsed_seconds = start.elapsed().as_secs_f64();

        let full_vector = evaluator.space().expand(&outcome.best.vector)?;
        let best_score = self
            .config
            .objective
            .display_score(outcome.best.record.value);
        info!(
            "finished {} evaluations in {elapsed_seconds:.1}s, best score {best_score}",
            outcome.evaluations
        );

        Ok(RunReport {
            best: outcome.best,
            full_vector,
            best_score,
            history: outcome.history,
            evaluations: outcome.evaluations,
            random_seed: seed,
            elapsed_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::simulator::SurrogateSimulator;
    use crate::schema::{SearchConfig, SymmetryGroup, DesignSpaceConfig};

    fn small_assembly() -> RunConfig {
        let mut config = RunConfig::assembly_max_keff();
        config.design = DesignSpaceConfig::Lattice {
            side: 11,
            symmetry: SymmetryGroup::Quarter,
        };
        config.search = SearchConfig {
            population_size: 6,
            generations: 3,
            random_seed: Some(100),
            workers: 2,
            ..config.search
        };
        config
    }

    #[test]
    fn test_run_report() {
        let driver = OptimizationDriver::from_config(small_assembly()).unwrap();
        let report = driver.run().unwrap();
        assert_eq!(report.best.vector.len(), 36);
        assert_eq!(report.full_vector.len(), 121);
        assert_eq!(report.history.len(), 4);
        assert_eq!(report.evaluations, 24);
        assert_eq!(report.random_seed, 100);
        assert_eq!(report.best_score, report.best.record.value);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = small_assembly();
        config.search.population_size = 2;
        assert!(matches!(
            OptimizationDriver::from_config(config),
            Err(DriverError::Config(_))
        ));
    }

    #[test]
    fn test_unbuildable_bounds_rejected_before_search() {
        let mut config = RunConfig::control_bank_critical();
        if let DesignSpaceConfig::Continuous { variables } = &mut config.design {
            for v in variables.iter_mut() {
                v.hi = 400.0;
            }
        }
        assert!(matches!(
            OptimizationDriver::from_config(config),
            Err(DriverError::Config(ConfigError::BoundsOutsideModel { .. }))
        ));
    }

    #[test]
    fn test_target_score_is_distance() {
        let mut config = RunConfig::pin_cell_target();
        config.search.generations = 2;
        let driver = OptimizationDriver::new(
            config.clone(),
            builder_for(&config.model),
            Arc::new(SurrogateSimulator::new(0.0, 0)),
        )
        .unwrap();
        let report = driver.run().unwrap();
        assert!(report.best_score >= 0.0);
        assert_eq!(report.best_score, -report.best.record.value);
    }
}
