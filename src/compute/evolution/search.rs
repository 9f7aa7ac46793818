//! Reference optimizers behind the [`Optimizer`] trait.
//!
//! Generations are synchronous: every trial vector of a generation is drawn
//! from the seeded RNG first, then the whole batch is evaluated in parallel on
//! the current rayon pool. Results are therefore reproducible for a fixed
//! seed whatever the worker count.

use log::info;
use rayon::prelude::*;

use crate::schema::{
    Bounds, Candidate, DesignVector, EvaluationHistory, FitnessRecord, GenerationSummary,
    SearchAlgorithm, SearchOutcome, SearchSettings,
};

use super::fitness::EvaluationError;
use super::rng::DesignRng;

/// Fitness function handed to an optimizer. Higher is better.
pub type FitnessFn<'a> =
    dyn Fn(&DesignVector) -> Result<FitnessRecord, EvaluationError> + Sync + 'a;

/// A black-box search over a bounded design space.
pub trait Optimizer: Send + Sync {
    fn search(
        &self,
        bounds: &Bounds,
        fitness: &FitnessFn<'_>,
        settings: &SearchSettings,
    ) -> Result<SearchOutcome, SearchError>;
}

/// Search errors.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error("Invalid search settings: {0}")]
    InvalidSettings(String),
}

/// Optimizer matching a configured algorithm.
pub fn optimizer_for(algorithm: &SearchAlgorithm) -> Box<dyn Optimizer> {
    match *algorithm {
        SearchAlgorithm::DifferentialEvolution { f, cr } => {
            Box::new(DifferentialEvolution::new(f, cr))
        }
        SearchAlgorithm::Jaya => Box::new(Jaya),
    }
}

/// Evaluate a batch in parallel, keeping input order.
fn evaluate_batch(
    vectors: Vec<DesignVector>,
    fitness: &FitnessFn<'_>,
) -> Result<Vec<Candidate>, EvaluationError> {
    vectors
        .into_par_iter()
        .map(|vector| {
            let record = fitness(&vector)?;
            Ok(Candidate { vector, record })
        })
        .collect()
}

fn check_settings(
    bounds: &Bounds,
    settings: &SearchSettings,
    min_population: usize,
) -> Result<(), SearchError> {
    if bounds.is_empty() {
        return Err(SearchError::InvalidSettings("empty design space".into()));
    }
    if settings.population_size < min_population {
        return Err(SearchError::InvalidSettings(format!(
            "population size {} below minimum {min_population}",
            settings.population_size
        )));
    }
    Ok(())
}

/// Best candidate of a slice; the earliest wins ties.
fn fittest(population: &[Candidate]) -> Option<&Candidate> {
    population.iter().reduce(|best, c| {
        if c.record.value > best.record.value {
            c
        } else {
            best
        }
    })
}

/// Best-so-far tracking and history for one search.
#[derive(Default)]
struct Progress {
    history: EvaluationHistory,
    best: Option<Candidate>,
    evaluations: u64,
}

impl Progress {
    /// Record a finished generation. `evaluated` are the candidates scored
    /// during it, `population` the survivors.
    fn record(&mut self, generation: usize, population: &[Candidate], evaluated: &[Candidate]) {
        self.evaluations += evaluated.len() as u64;

        if let Some(gen_best) = fittest(evaluated)
            && self
                .best
                .as_ref()
                .is_none_or(|b| gen_best.record.value > b.record.value)
        {
            self.best = Some(gen_best.clone());
        }
        let Some(best) = self.best.clone() else {
            return;
        };

        let mean_fitness = population.iter().map(|c| c.record.value).sum::<f64>()
            / population.len().max(1) as f64;
        let failures = evaluated.iter().filter(|c| !c.record.is_valid()).count();

        info!(
            "generation {generation}: best {:.5}, mean {mean_fitness:.5}, {failures} failed",
            best.record.value
        );
        self.history.push(GenerationSummary {
            generation,
            best,
            mean_fitness,
            failures,
        });
    }

    fn finish(self) -> Result<SearchOutcome, SearchError> {
        let best = self
            .best
            .ok_or_else(|| SearchError::InvalidSettings("no candidate was evaluated".into()))?;
        Ok(SearchOutcome {
            best,
            history: self.history,
            evaluations: self.evaluations,
        })
    }
}

/// DE/rand/1/bin with greedy one-to-one replacement.
#[derive(Debug, Clone, Copy)]
pub struct DifferentialEvolution {
    /// Differential weight.
    pub f: f64,
    /// Crossover rate.
    pub cr: f64,
}

impl DifferentialEvolution {
    pub fn new(f: f64, cr: f64) -> Self {
        Self { f, cr }
    }
}

impl Optimizer for DifferentialEvolution {
    fn search(
        &self,
        bounds: &Bounds,
        fitness: &FitnessFn<'_>,
        settings: &SearchSettings,
    ) -> Result<SearchOutcome, SearchError> {
        check_settings(bounds, settings, 4)?;
        let n = settings.population_size;
        let mut rng = DesignRng::new(settings.seed);
        let mut progress = Progress::default();

        let initial = (0..n).map(|_| rng.random_vector(bounds)).collect();
        let mut population = evaluate_batch(initial, fitness)?;
        progress.record(0, &population, &population);

        for generation in 1..=settings.generations {
            let trials = (0..n)
                .map(|i| {
                    let donors = rng.distinct_indices(n, i, 3);
                    rng.differential_trial(
                        &population[i].vector,
                        [
                            &population[donors[0]].vector[..],
                            &population[donors[1]].vector[..],
                            &population[donors[2]].vector[..],
                        ],
                        self.f,
                        self.cr,
                        bounds,
                    )
                })
                .collect();
            let evaluated = evaluate_batch(trials, fitness)?;

            for (slot, trial) in population.iter_mut().zip(&evaluated) {
                if trial.record.value >= slot.record.value {
                    *slot = trial.clone();
                }
            }
            progress.record(generation, &population, &evaluated);
        }

        progress.finish()
    }
}

/// Parameter-free Jaya: move toward the best, away from the worst.
#[derive(Debug, Clone, Copy, Default)]
pub struct Jaya;

impl Optimizer for Jaya {
    fn search(
        &self,
        bounds: &Bounds,
        fitness: &FitnessFn<'_>,
        settings: &SearchSettings,
    ) -> Result<SearchOutcome, SearchError> {
        check_settings(bounds, settings, 2)?;
        let n = settings.population_size;
        let mut rng = DesignRng::new(settings.seed);
        let mut progress = Progress::default();

        let initial = (0..n).map(|_| rng.random_vector(bounds)).collect();
        let mut population = evaluate_batch(initial, fitness)?;
        progress.record(0, &population, &population);

        for generation in 1..=settings.generations {
            let (Some(best), Some(worst)) = (
                fittest(&population).map(|c| c.vector.clone()),
                population
                    .iter()
                    .reduce(|w, c| if c.record.value < w.record.value { c } else { w })
                    .map(|c| c.vector.clone()),
            ) else {
                break;
            };

            let trials = population
                .iter()
                .map(|c| rng.jaya_move(&c.vector, &best, &worst, bounds))
                .collect();
            let evaluated = evaluate_batch(trials, fitness)?;

            for (slot, trial) in population.iter_mut().zip(&evaluated) {
                if trial.record.value > slot.record.value {
                    *slot = trial.clone();
                }
            }
            progress.record(generation, &population, &evaluated);
        }

        progress.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Bound, FitnessStatus};

    fn record(value: f64) -> FitnessRecord {
        FitnessRecord {
            value,
            status: FitnessStatus::Valid,
            measurement: None,
            objective: Some(value),
            feasible: true,
            usage: None,
        }
    }

    fn settings(population_size: usize, generations: usize) -> SearchSettings {
        SearchSettings {
            population_size,
            generations,
            seed: 100,
        }
    }

    /// Maximize the number of ones.
    fn count_ones(v: &DesignVector) -> Result<FitnessRecord, EvaluationError> {
        Ok(record(v.iter().sum()))
    }

    /// Maximize `-(x - 1.1)^2` per position.
    fn near_target(v: &DesignVector) -> Result<FitnessRecord, EvaluationError> {
        Ok(record(-v.iter().map(|x| (x - 1.1).powi(2)).sum::<f64>()))
    }

    #[test]
    fn test_de_history_shape() {
        let bounds = Bounds::uniform(12, Bound::BINARY);
        let outcome = DifferentialEvolution::new(0.5, 0.3)
            .search(&bounds, &count_ones, &settings(8, 10))
            .unwrap();
        assert_eq!(outcome.history.len(), 11);
        assert_eq!(outcome.evaluations, 8 * 11);
        let best = outcome.history.best_fitness();
        assert!(best.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(best.last().copied(), Some(outcome.best.record.value));
    }

    #[test]
    fn test_de_improves_onemax() {
        let bounds = Bounds::uniform(12, Bound::BINARY);
        let outcome = DifferentialEvolution::new(0.5, 0.3)
            .search(&bounds, &count_ones, &settings(20, 40))
            .unwrap();
        let history = outcome.history.best_fitness();
        assert!(history.last() >= history.first());
        assert!(outcome.best.record.value >= 9.0);
    }

    #[test]
    fn test_jaya_approaches_target() {
        let bounds = Bounds::uniform(1, Bound::Continuous { lo: 0.0, hi: 4.0 });
        let outcome = Jaya
            .search(&bounds, &near_target, &settings(10, 30))
            .unwrap();
        assert_eq!(outcome.history.len(), 31);
        assert!((outcome.best.vector[0] - 1.1).abs() < 0.25);
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let bounds = Bounds::uniform(6, Bound::BINARY);
        let a = DifferentialEvolution::new(0.5, 0.3)
            .search(&bounds, &count_ones, &settings(6, 5))
            .unwrap();
        let b = DifferentialEvolution::new(0.5, 0.3)
            .search(&bounds, &count_ones, &settings(6, 5))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_population_too_small() {
        let bounds = Bounds::uniform(3, Bound::BINARY);
        assert!(matches!(
            DifferentialEvolution::new(0.5, 0.3).search(&bounds, &count_ones, &settings(3, 1)),
            Err(SearchError::InvalidSettings(_))
        ));
        assert!(matches!(
            Jaya.search(&Bounds::default(), &count_ones, &settings(5, 1)),
            Err(SearchError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_evaluation_error_propagates() {
        let bounds = Bounds::uniform(3, Bound::BINARY);
        let broken = |_: &DesignVector| -> Result<FitnessRecord, EvaluationError> {
            Err(EvaluationError::InvalidDesignVector(
                crate::schema::BoundsViolation::Length {
                    expected: 4,
                    actual: 3,
                },
            ))
        };
        assert!(matches!(
            Jaya.search(&bounds, &broken, &settings(4, 2)),
            Err(SearchError::Evaluation(_))
        ));
    }
}
