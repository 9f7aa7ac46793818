//! Configuration types for a design-optimization run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{Label, SearchAlgorithm, SearchConfig, SymmetryGroup};

/// Most decimal places a fitness value can keep.
pub const MAX_PRECISION: u32 = 12;

/// Decimal places kept in every fitness value.
fn default_precision() -> u32 {
    5
}

/// Top-level run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Shape of the search space.
    pub design: DesignSpaceConfig,
    /// Physical system the design is turned into.
    pub model: ModelConfig,
    /// How the raw metric becomes a fitness.
    pub objective: Objective,
    /// Resource budget (lattice designs only).
    #[serde(default)]
    pub constraint: Option<ConstraintSpec>,
    /// Decimal places kept in fitness values.
    #[serde(default = "default_precision")]
    pub precision: u32,
    /// Simulator backend and run parameters.
    #[serde(default)]
    pub simulator: SimulatorConfig,
    /// Optimizer settings.
    #[serde(default)]
    pub search: SearchConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::assembly_max_keff()
    }
}

/// Shape of the search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DesignSpaceConfig {
    /// Square lattice of presence flags, optionally reduced by symmetry.
    Lattice {
        side: usize,
        #[serde(default)]
        symmetry: SymmetryGroup,
    },
    /// Named continuous control variables.
    Continuous { variables: Vec<ControlVariable> },
}

/// A continuous control variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlVariable {
    pub name: String,
    pub lo: f64,
    pub hi: f64,
}

/// Physical system configuration, one per supported model builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ModelConfig {
    AssemblyLattice(AssemblyLatticeConfig),
    PinCell(PinCellConfig),
    ControlBanks(ControlBankConfig),
}

/// Highest admissible fuel enrichment, in weight percent.
pub const MAX_ENRICHMENT_PCT: f64 = 100.0;

impl ModelConfig {
    /// Range the builder accepts for every control variable, `None` for
    /// lattice models.
    pub fn control_range(&self) -> Option<(f64, f64)> {
        match self {
            ModelConfig::AssemblyLattice(_) => None,
            ModelConfig::PinCell(_) => Some((0.0, MAX_ENRICHMENT_PCT)),
            ModelConfig::ControlBanks(banks) => Some((0.0, banks.max_insertion)),
        }
    }
}

/// Outer boundary condition of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Boundary {
    Vacuum,
    Reflective,
}

/// Fuel assembly with a lattice of fuel or void pins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyLatticeConfig {
    /// Assembly width in cm (the lattice pitch is `width / side`).
    pub width_cm: f64,
    pub fuel_radius_cm: f64,
    pub clad_radius_cm: f64,
    pub boundary: Boundary,
    /// Cells carrying this label hold a fuel pin; all others are void.
    pub fuel_label: Label,
}

impl Default for AssemblyLatticeConfig {
    fn default() -> Self {
        Self {
            width_cm: 22.0,
            fuel_radius_cm: 0.75,
            clad_radius_cm: 0.85,
            boundary: Boundary::Vacuum,
            fuel_label: Label::PRESENT,
        }
    }
}

/// Single fuel pin in an infinite lattice, parameterized by enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinCellConfig {
    pub pitch_cm: f64,
    pub fuel_radius_cm: f64,
    pub clad_radius_cm: f64,
    pub boundary: Boundary,
}

impl Default for PinCellConfig {
    fn default() -> Self {
        Self {
            pitch_cm: 1.26,
            fuel_radius_cm: 0.39218,
            clad_radius_cm: 0.45720,
            boundary: Boundary::Reflective,
        }
    }
}

/// Small modular core parameterized by control-bank insertion depths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlBankConfig {
    /// Bank names, one design variable each.
    pub banks: Vec<String>,
    /// Fully inserted depth (steps).
    pub max_insertion: f64,
    /// Annular regions per fuel pin.
    pub rings: usize,
    /// Axial subdivisions of the fuel.
    pub axial: usize,
    /// Whether fuel compositions represent depleted fuel.
    pub depleted: bool,
}

impl Default for ControlBankConfig {
    fn default() -> Self {
        Self {
            banks: ["A", "B", "C", "D"].map(String::from).to_vec(),
            max_insertion: 359.634,
            rings: 10,
            axial: 196,
            depleted: false,
        }
    }
}

/// Objective transform, fixed for a whole run.
///
/// Fitness is always "higher is better": a target objective scores the
/// negated distance from the target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Objective {
    /// Maximize the raw metric.
    Maximize,
    /// Minimize `|metric - value|`.
    Target { value: f64 },
}

impl Objective {
    /// Map a raw metric to an unpenalized fitness.
    #[inline]
    pub fn transform(&self, metric: f64) -> f64 {
        match self {
            Objective::Maximize => metric,
            Objective::Target { value } => -(metric - value).abs(),
        }
    }

    /// Fitness expressed in the objective's natural units (distance for targets).
    pub fn display_score(&self, fitness: f64) -> f64 {
        match self {
            Objective::Maximize => fitness,
            Objective::Target { .. } => -fitness,
        }
    }
}

/// Resource budget over a lattice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSpec {
    /// Label being counted.
    pub label: Label,
    /// Maximum number of cells carrying `label`.
    pub budget: usize,
    #[serde(default)]
    pub penalty: PenaltyPolicy,
}

/// Penalty applied to infeasible candidates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PenaltyPolicy {
    /// Subtract `amount` regardless of the excess.
    Fixed { amount: f64 },
    /// Subtract `base + per_cell * excess`.
    Scaled { base: f64, per_cell: f64 },
}

impl Default for PenaltyPolicy {
    fn default() -> Self {
        Self::Fixed { amount: 1.0e5 }
    }
}

/// Simulator backend plus fixed run parameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default)]
    pub backend: SimulatorBackend,
    #[serde(default)]
    pub run: RunParams,
    /// Cross-section library handed to the transport code.
    #[serde(default)]
    pub cross_sections: Option<PathBuf>,
}

fn default_noise() -> f64 {
    5.0e-4
}

/// Which simulator evaluates models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SimulatorBackend {
    /// External transport code run once per evaluation in a scratch directory.
    ///
    /// Arguments may contain `{workdir}`, `{model}`, `{settings}` and
    /// `{threads}` placeholders.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
    /// Analytic stand-in with seeded Gaussian jitter, for dry runs.
    Surrogate {
        #[serde(default = "default_noise")]
        noise: f64,
        #[serde(default)]
        seed: u64,
    },
}

impl Default for SimulatorBackend {
    fn default() -> Self {
        Self::Surrogate {
            noise: default_noise(),
            seed: 0,
        }
    }
}

/// Fixed transport run parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParams {
    /// Particles per batch.
    pub particles: u64,
    /// Total batches.
    pub batches: u32,
    /// Inactive (warm-up) batches.
    pub inactive: u32,
    /// Threads used inside one simulator run.
    pub threads: usize,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            particles: 10_000,
            batches: 100,
            inactive: 30,
            threads: 1,
        }
    }
}

impl RunParams {
    /// Batches that contribute to the estimate.
    #[inline]
    pub fn active_batches(&self) -> u32 {
        self.batches.saturating_sub(self.inactive)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.particles == 0 {
            return Err(ConfigError::InvalidRunParams(
                "particle count must be positive".into(),
            ));
        }
        if self.batches <= self.inactive {
            return Err(ConfigError::InvalidRunParams(format!(
                "batches ({}) must exceed inactive batches ({})",
                self.batches, self.inactive
            )));
        }
        if self.threads == 0 {
            return Err(ConfigError::InvalidRunParams(
                "thread count must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl RunConfig {
    /// 11x11 assembly, fuel budget of 61 pins, maximize k-eff with DE.
    pub fn assembly_max_keff() -> Self {
        Self {
            design: DesignSpaceConfig::Lattice {
                side: 11,
                symmetry: SymmetryGroup::None,
            },
            model: ModelConfig::AssemblyLattice(AssemblyLatticeConfig::default()),
            objective: Objective::Maximize,
            constraint: Some(ConstraintSpec {
                label: Label::PRESENT,
                budget: 61,
                penalty: PenaltyPolicy::default(),
            }),
            precision: default_precision(),
            simulator: SimulatorConfig {
                run: RunParams {
                    particles: 10_000,
                    batches: 100,
                    inactive: 30,
                    threads: 128,
                },
                ..Default::default()
            },
            search: SearchConfig {
                algorithm: SearchAlgorithm::DifferentialEvolution { f: 0.5, cr: 0.3 },
                population_size: 50,
                generations: 400,
                random_seed: Some(100),
                workers: 1,
            },
        }
    }

    /// Pin-cell enrichment in `[0, 4]` reaching k-eff = 1.10 with Jaya.
    pub fn pin_cell_target() -> Self {
        Self {
            design: DesignSpaceConfig::Continuous {
                variables: vec![ControlVariable {
                    name: "enrichment".into(),
                    lo: 0.0,
                    hi: 4.0,
                }],
            },
            model: ModelConfig::PinCell(PinCellConfig::default()),
            objective: Objective::Target { value: 1.10 },
            constraint: None,
            precision: default_precision(),
            simulator: SimulatorConfig {
                run: RunParams {
                    particles: 10_000,
                    batches: 150,
                    inactive: 30,
                    threads: 1,
                },
                ..Default::default()
            },
            search: SearchConfig {
                algorithm: SearchAlgorithm::Jaya,
                population_size: 10,
                generations: 5,
                random_seed: Some(100),
                workers: 1,
            },
        }
    }

    /// Four control banks searched for a critical core (k-eff = 1.0) with Jaya.
    pub fn control_bank_critical() -> Self {
        let banks = ControlBankConfig::default();
        let variables = banks
            .banks
            .iter()
            .map(|name| ControlVariable {
                name: format!("bank_{name}"),
                lo: 0.0,
                hi: banks.max_insertion,
            })
            .collect();

        Self {
            design: DesignSpaceConfig::Continuous { variables },
            model: ModelConfig::ControlBanks(banks),
            objective: Objective::Target { value: 1.0 },
            constraint: None,
            precision: default_precision(),
            simulator: SimulatorConfig {
                run: RunParams {
                    particles: 10_000,
                    batches: 150,
                    inactive: 30,
                    threads: 16,
                },
                ..Default::default()
            },
            search: SearchConfig {
                algorithm: SearchAlgorithm::Jaya,
                population_size: 10,
                generations: 30,
                random_seed: Some(100),
                workers: 1,
            },
        }
    }

    /// Validate configuration parameters and their compatibility.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.design {
            DesignSpaceConfig::Lattice { side, .. } => {
                if *side == 0 {
                    return Err(ConfigError::InvalidDimensions);
                }
                if !matches!(self.model, ModelConfig::AssemblyLattice(_)) {
                    return Err(ConfigError::Incompatible(
                        "lattice designs need a lattice model".into(),
                    ));
                }
            }
            DesignSpaceConfig::Continuous { variables } => {
                if variables.is_empty() {
                    return Err(ConfigError::InvalidDimensions);
                }
                for v in variables {
                    if !(v.lo.is_finite() && v.hi.is_finite() && v.lo <= v.hi) {
                        return Err(ConfigError::InvalidBounds {
                            name: v.name.clone(),
                            lo: v.lo,
                            hi: v.hi,
                        });
                    }
                }
                let expected = match &self.model {
                    ModelConfig::PinCell(_) => 1,
                    ModelConfig::ControlBanks(banks) => banks.banks.len(),
                    ModelConfig::AssemblyLattice(_) => {
                        return Err(ConfigError::Incompatible(
                            "a lattice model needs a lattice design".into(),
                        ));
                    }
                };
                if variables.len() != expected {
                    return Err(ConfigError::Incompatible(format!(
                        "model takes {expected} control variables, design has {}",
                        variables.len()
                    )));
                }
                // every in-bounds vector must be buildable
                if let Some((min, max)) = self.model.control_range() {
                    if !(min.is_finite() && max.is_finite() && min <= max) {
                        return Err(ConfigError::Incompatible(format!(
                            "model accepts no control values: [{min}, {max}]"
                        )));
                    }
                    if let Some(v) = variables.iter().find(|v| v.lo < min || v.hi > max) {
                        return Err(ConfigError::BoundsOutsideModel {
                            name: v.name.clone(),
                            lo: v.lo,
                            hi: v.hi,
                            min,
                            max,
                        });
                    }
                }
                if self.constraint.is_some() {
                    return Err(ConfigError::Incompatible(
                        "resource constraints apply to lattice designs only".into(),
                    ));
                }
            }
        }

        if let Objective::Target { value } = self.objective
            && !value.is_finite()
        {
            return Err(ConfigError::InvalidObjective);
        }

        if let Some(constraint) = &self.constraint {
            let ok = match constraint.penalty {
                PenaltyPolicy::Fixed { amount } => amount.is_finite() && amount > 0.0,
                PenaltyPolicy::Scaled { base, per_cell } => {
                    let cells = match self.design {
                        DesignSpaceConfig::Lattice { side, .. } => (side as f64).powi(2),
                        DesignSpaceConfig::Continuous { .. } => 0.0,
                    };
                    base.is_finite()
                        && per_cell.is_finite()
                        && base > 0.0
                        && per_cell >= 0.0
                        && (base + per_cell * cells).is_finite()
                }
            };
            if !ok {
                return Err(ConfigError::InvalidPenalty);
            }
        }

        if self.precision > MAX_PRECISION {
            return Err(ConfigError::InvalidPrecision(self.precision));
        }

        if let SimulatorBackend::Surrogate { noise, .. } = self.simulator.backend
            && !(noise.is_finite() && noise >= 0.0)
        {
            return Err(ConfigError::InvalidRunParams(
                "surrogate noise must be non-negative".into(),
            ));
        }
        self.simulator.run.validate()?;
        self.search.validate()?;
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Design space must have at least one variable")]
    InvalidDimensions,
    #[error("Invalid bounds for {name}: [{lo}, {hi}]")]
    InvalidBounds { name: String, lo: f64, hi: f64 },
    #[error("Bounds of {name} [{lo}, {hi}] leave the model's range [{min}, {max}]")]
    BoundsOutsideModel {
        name: String,
        lo: f64,
        hi: f64,
        min: f64,
        max: f64,
    },
    #[error("Incompatible configuration: {0}")]
    Incompatible(String),
    #[error("Target value must be finite")]
    InvalidObjective,
    #[error("Penalty must be positive and finite")]
    InvalidPenalty,
    #[error("Precision {0} exceeds 12 decimal places")]
    InvalidPrecision(u32),
    #[error("Invalid run parameters: {0}")]
    InvalidRunParams(String),
    #[error("Invalid search settings: {0}")]
    InvalidSearch(String),
}
