//! Fitness evaluation: design vector in, one comparable scalar out.
//!
//! Contract violations (wrong length, out-of-bounds values, a builder that
//! rejects the decoded design) are returned as [`EvaluationError`]. Simulator
//! failures are absorbed into [`FAILURE_FITNESS`] so a single bad run never
//! aborts a search.

use std::sync::Arc;

use log::{debug, warn};

use crate::compute::constraint::{Penalty, penalty};
use crate::compute::grid::CodecError;
use crate::compute::model::{BuildError, Design, ModelBuilder};
use crate::compute::simulator::Simulator;
use crate::compute::space::DesignSpace;
use crate::compute::symmetry::SymmetryError;
use crate::schema::{
    Bounds, BoundsViolation, ConstraintSpec, DesignVector, FitnessRecord, FitnessStatus,
    MAX_PRECISION, Objective, RunConfig, RunParams,
};

/// Fitness assigned when the simulator produces no usable estimate.
///
/// Lies below any penalized candidate, so failed designs always rank last.
pub const FAILURE_FITNESS: f64 = -1.0e6;

/// Caller-level evaluation errors. Never absorbed.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("Invalid design vector: {0}")]
    InvalidDesignVector(#[from] BoundsViolation),
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("Symmetry error: {0}")]
    Symmetry(#[from] SymmetryError),
    #[error("Model construction failed: {0}")]
    ModelBuild(#[from] BuildError),
}

/// Round to `precision` decimal places, at most [`MAX_PRECISION`].
#[inline]
pub fn round_to(value: f64, precision: u32) -> f64 {
    let scale = 10f64.powi(precision.min(MAX_PRECISION) as i32);
    (value * scale).round() / scale
}

/// Evaluates design vectors against a model builder and simulator.
pub struct FitnessEvaluator {
    space: DesignSpace,
    bounds: Bounds,
    builder: Arc<dyn ModelBuilder>,
    simulator: Arc<dyn Simulator>,
    run: RunParams,
    objective: Objective,
    constraint: Option<ConstraintSpec>,
    precision: u32,
}

impl FitnessEvaluator {
    /// Create an unconstrained evaluator with five-decimal rounding.
    pub fn new(
        space: DesignSpace,
        builder: Arc<dyn ModelBuilder>,
        simulator: Arc<dyn Simulator>,
        run: RunParams,
        objective: Objective,
    ) -> Self {
        let bounds = space.bounds();
        Self {
            space,
            bounds,
            builder,
            simulator,
            run,
            objective,
            constraint: None,
            precision: 5,
        }
    }

    /// Wire an evaluator from a run configuration.
    pub fn from_config(
        config: &RunConfig,
        builder: Arc<dyn ModelBuilder>,
        simulator: Arc<dyn Simulator>,
    ) -> Self {
        let mut evaluator = Self::new(
            DesignSpace::from_config(&config.design),
            builder,
            simulator,
            config.simulator.run.clone(),
            config.objective,
        )
        .with_precision(config.precision);
        if let Some(spec) = &config.constraint {
            evaluator = evaluator.with_constraint(spec.clone());
        }
        evaluator
    }

    /// Penalize lattices exceeding the resource budget.
    pub fn with_constraint(mut self, spec: ConstraintSpec) -> Self {
        self.constraint = Some(spec);
        self
    }

    /// Decimal places kept in fitness values, clamped to [`MAX_PRECISION`].
    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision.min(MAX_PRECISION);
        self
    }

    pub fn space(&self) -> &DesignSpace {
        &self.space
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    /// Score one design vector.
    pub fn evaluate(&self, vector: &DesignVector) -> Result<FitnessRecord, EvaluationError> {
        self.bounds.check(vector)?;
        let design = self.space.decode(vector)?;

        let penalty = match (&design, &self.constraint) {
            (Design::Lattice(grid), Some(spec)) => Some(penalty(grid, spec)),
            _ => None,
        };

        let model = self.builder.build(&design)?;

        let measurement = match self.simulator.run(&model, &self.run) {
            Ok(m) if m.nominal.is_finite() => m,
            Ok(m) => return Ok(self.failure(format!("non-finite estimate {}", m.nominal), penalty)),
            Err(e) => return Ok(self.failure(e.to_string(), penalty)),
        };

        let objective = self.objective.transform(measurement.nominal);
        let adjustment = penalty.map_or(0.0, |p| p.adjustment);
        let value = round_to(objective + adjustment, self.precision);

        debug!(
            "metric {:.5} +/- {:.5}, fitness {value}{}",
            measurement.nominal,
            measurement.std_dev,
            match penalty {
                Some(p) if !p.feasible => format!(" (usage {} over budget)", p.usage),
                _ => String::new(),
            }
        );

        Ok(FitnessRecord {
            value,
            status: FitnessStatus::Valid,
            measurement: Some(measurement),
            objective: Some(objective),
            feasible: penalty.is_none_or(|p| p.feasible),
            usage: penalty.map(|p| p.usage),
        })
    }

    fn failure(&self, reason: String, penalty: Option<Penalty>) -> FitnessRecord {
        warn!("simulation failed, assigning fitness {FAILURE_FITNESS}: {reason}");
        FitnessRecord {
            value: FAILURE_FITNESS,
            status: FitnessStatus::SimulationFailed { reason },
            measurement: None,
            objective: None,
            feasible: penalty.is_none_or(|p| p.feasible),
            usage: penalty.map(|p| p.usage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::model::{AssemblyLatticeBuilder, ModelDescription, PinCellBuilder};
    use crate::compute::simulator::SimulationError;
    use crate::schema::{
        AssemblyLatticeConfig, ControlVariable, DesignSpaceConfig, Label, Measurement,
        PenaltyPolicy, PinCellConfig, SymmetryGroup,
    };

    /// Returns the same metric for every model.
    struct Constant(f64);

    impl Simulator for Constant {
        fn run(&self, _: &ModelDescription, _: &RunParams) -> Result<Measurement, SimulationError> {
            Ok(Measurement {
                nominal: self.0,
                std_dev: 1e-4,
            })
        }
    }

    struct Failing;

    impl Simulator for Failing {
        fn run(&self, _: &ModelDescription, _: &RunParams) -> Result<Measurement, SimulationError> {
            Err(SimulationError::Divergence("all neutrons leak".into()))
        }
    }

    fn lattice_evaluator(sim: Arc<dyn Simulator>, budget: usize) -> FitnessEvaluator {
        FitnessEvaluator::new(
            DesignSpace::from_config(&DesignSpaceConfig::Lattice {
                side: 11,
                symmetry: SymmetryGroup::None,
            }),
            Arc::new(AssemblyLatticeBuilder::new(AssemblyLatticeConfig::default())),
            sim,
            RunParams::default(),
            Objective::Maximize,
        )
        .with_constraint(ConstraintSpec {
            label: Label::PRESENT,
            budget,
            penalty: PenaltyPolicy::default(),
        })
    }

    fn ones(count: usize) -> DesignVector {
        (0..121)
            .map(|i| if i < count { 1.0 } else { 0.0 })
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.234_567_89, 5), 1.23457);
        assert_eq!(round_to(-0.000_004, 5), -0.0);
        assert_eq!(round_to(2.5, 0), 3.0);
        assert_eq!(round_to(1.25, 400), 1.25);
    }

    #[test]
    fn test_excess_precision_stays_finite() {
        let evaluator = lattice_evaluator(Arc::new(Constant(1.123_456_7)), 61).with_precision(400);
        let record = evaluator.evaluate(&ones(60)).unwrap();
        assert!(record.value.is_finite());
        assert_eq!(record.value, round_to(1.123_456_7, MAX_PRECISION));
    }

    #[test]
    fn test_feasible_keeps_raw_metric() {
        let evaluator = lattice_evaluator(Arc::new(Constant(1.123_456_7)), 61);
        let record = evaluator.evaluate(&ones(60)).unwrap();
        assert!(record.is_valid());
        assert!(record.feasible);
        assert_eq!(record.usage, Some(60));
        assert_eq!(record.value, 1.12346);
    }

    #[test]
    fn test_infeasible_is_penalized() {
        let evaluator = lattice_evaluator(Arc::new(Constant(1.2)), 61);
        let record = evaluator.evaluate(&ones(121)).unwrap();
        assert!(!record.feasible);
        assert_eq!(record.usage, Some(121));
        assert_eq!(record.value, round_to(1.2 - 1.0e5, 5));
        assert_eq!(record.objective, Some(1.2));
    }

    #[test]
    fn test_failure_becomes_sentinel() {
        let evaluator = lattice_evaluator(Arc::new(Failing), 61);
        let record = evaluator.evaluate(&ones(10)).unwrap();
        assert_eq!(record.value, FAILURE_FITNESS);
        assert!(matches!(
            record.status,
            FitnessStatus::SimulationFailed { .. }
        ));
        assert!(record.measurement.is_none());
    }

    #[test]
    fn test_non_finite_measurement_is_failure() {
        let evaluator = lattice_evaluator(Arc::new(Constant(f64::NAN)), 61);
        let record = evaluator.evaluate(&ones(10)).unwrap();
        assert_eq!(record.value, FAILURE_FITNESS);
    }

    #[test]
    fn test_invalid_vectors_are_errors() {
        let evaluator = lattice_evaluator(Arc::new(Constant(1.0)), 61);
        let short: DesignVector = vec![0.0; 120].into();
        assert!(matches!(
            evaluator.evaluate(&short),
            Err(EvaluationError::InvalidDesignVector(BoundsViolation::Length { .. }))
        ));

        let mut values = vec![0.0; 121];
        values[7] = 0.5;
        assert!(matches!(
            evaluator.evaluate(&values.into()),
            Err(EvaluationError::InvalidDesignVector(BoundsViolation::NotInteger { index: 7, .. }))
        ));
    }

    #[test]
    fn test_target_objective() {
        let evaluator = FitnessEvaluator::new(
            DesignSpace::from_config(&DesignSpaceConfig::Continuous {
                variables: vec![ControlVariable {
                    name: "enrichment".into(),
                    lo: 0.0,
                    hi: 4.0,
                }],
            }),
            Arc::new(PinCellBuilder::new(PinCellConfig::default())),
            Arc::new(Constant(1.05)),
            RunParams::default(),
            Objective::Target { value: 1.10 },
        );
        let record = evaluator.evaluate(&vec![2.0].into()).unwrap();
        assert_eq!(record.value, -0.05);
        assert!(record.feasible);
        assert_eq!(record.usage, None);
        assert!(evaluator.evaluate(&vec![5.0].into()).is_err());
    }
}
