//! Search configuration and result types.
//!
//! Everything here is plain serde data: settings handed to an optimizer,
//! per-evaluation fitness records and the per-generation history a run
//! accumulates.

use serde::{Deserialize, Serialize};

use super::{ConfigError, DesignVector};

/// Optimizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search algorithm to use.
    #[serde(default)]
    pub algorithm: SearchAlgorithm,
    /// Candidates per generation.
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Generations after the initial population.
    #[serde(default = "default_generations")]
    pub generations: usize,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Parallel evaluation workers (0 = one per core).
    #[serde(default)]
    pub workers: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            algorithm: SearchAlgorithm::default(),
            population_size: default_population_size(),
            generations: default_generations(),
            random_seed: None,
            workers: 0,
        }
    }
}

fn default_population_size() -> usize {
    50
}
fn default_generations() -> usize {
    100
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let min_population = self.algorithm.min_population();
        if self.population_size < min_population {
            return Err(ConfigError::InvalidSearch(format!(
                "population size must be at least {min_population}"
            )));
        }
        if let SearchAlgorithm::DifferentialEvolution { f, cr } = self.algorithm {
            if !(f > 0.0 && f <= 2.0) {
                return Err(ConfigError::InvalidSearch(format!(
                    "differential weight {f} outside (0, 2]"
                )));
            }
            if !(0.0..=1.0).contains(&cr) {
                return Err(ConfigError::InvalidSearch(format!(
                    "crossover rate {cr} outside [0, 1]"
                )));
            }
        }
        Ok(())
    }
}

/// Search algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SearchAlgorithm {
    /// DE/rand/1/bin.
    DifferentialEvolution {
        #[serde(default = "default_de_f")]
        f: f64,
        #[serde(default = "default_de_cr")]
        cr: f64,
    },
    /// Parameter-free Jaya.
    Jaya,
}

impl Default for SearchAlgorithm {
    fn default() -> Self {
        Self::DifferentialEvolution {
            f: default_de_f(),
            cr: default_de_cr(),
        }
    }
}

fn default_de_f() -> f64 {
    0.5
}
fn default_de_cr() -> f64 {
    0.3
}

impl SearchAlgorithm {
    /// Smallest population the update rule can work with.
    pub fn min_population(&self) -> usize {
        match self {
            // target plus three distinct donors
            SearchAlgorithm::DifferentialEvolution { .. } => 4,
            SearchAlgorithm::Jaya => 2,
        }
    }
}

/// Settings passed to an optimizer for one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSettings {
    pub population_size: usize,
    pub generations: usize,
    pub seed: u64,
}

// ============================================================================
// Evaluation records
// ============================================================================

/// Nominal value and one-sigma uncertainty of a simulated metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub nominal: f64,
    pub std_dev: f64,
}

/// Whether a fitness came from a measurement or from the failure sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FitnessStatus {
    Valid,
    SimulationFailed { reason: String },
}

/// Outcome of evaluating one design vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessRecord {
    /// Scalar handed to the optimizer (higher is better).
    pub value: f64,
    pub status: FitnessStatus,
    /// Raw simulator output, absent when the simulation failed.
    pub measurement: Option<Measurement>,
    /// Objective value before the constraint penalty.
    pub objective: Option<f64>,
    /// Whether the resource budget was respected.
    pub feasible: bool,
    /// Cells carrying the constrained label, when a constraint applies.
    pub usage: Option<usize>,
}

impl FitnessRecord {
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.status == FitnessStatus::Valid
    }
}

/// A design vector together with its fitness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub vector: DesignVector,
    pub record: FitnessRecord,
}

/// Summary of one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    /// Generation index (0 is the initial population).
    pub generation: usize,
    /// Best candidate seen up to and including this generation.
    pub best: Candidate,
    /// Mean fitness of the current population.
    pub mean_fitness: f64,
    /// Candidates of this generation whose simulation failed.
    pub failures: usize,
}

/// Append-only per-generation history of one search.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvaluationHistory {
    generations: Vec<GenerationSummary>,
}

impl EvaluationHistory {
    pub fn push(&mut self, summary: GenerationSummary) {
        self.generations.push(summary);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.generations.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GenerationSummary> {
        self.generations.iter()
    }

    pub fn last(&self) -> Option<&GenerationSummary> {
        self.generations.last()
    }

    /// Best-so-far fitness per generation.
    pub fn best_fitness(&self) -> Vec<f64> {
        self.generations
            .iter()
            .map(|g| g.best.record.value)
            .collect()
    }
}

/// What an optimizer returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub best: Candidate,
    pub history: EvaluationHistory,
    /// Fitness evaluations performed.
    pub evaluations: u64,
}

/// Final result of a driver run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Best candidate in search space.
    pub best: Candidate,
    /// Best candidate expanded to the full design (symmetry undone).
    pub full_vector: Vec<f64>,
    /// Best fitness in objective units (distance for target objectives).
    pub best_score: f64,
    pub history: EvaluationHistory,
    pub evaluations: u64,
    pub random_seed: u64,
    pub elapsed_seconds: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_search_valid() {
        SearchConfig::default().validate().unwrap();
    }

    #[test]
    fn test_population_minimum() {
        let config = SearchConfig {
            population_size: 3,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SearchConfig {
            algorithm: SearchAlgorithm::Jaya,
            population_size: 3,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_de_parameters() {
        let config = SearchConfig {
            algorithm: SearchAlgorithm::DifferentialEvolution { f: 0.5, cr: 1.5 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_algorithm_defaults_from_json() {
        let algorithm: SearchAlgorithm =
            serde_json::from_str(r#"{ "type": "DifferentialEvolution" }"#).unwrap();
        assert_eq!(
            algorithm,
            SearchAlgorithm::DifferentialEvolution { f: 0.5, cr: 0.3 }
        );
    }
}
