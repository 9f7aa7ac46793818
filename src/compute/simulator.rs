//! Simulator interface and the analytic surrogate backend.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use rand::prelude::*;
use rand_distr::Normal;

use crate::schema::{Boundary, Measurement, RunParams, SimulatorBackend, SimulatorConfig};

use super::model::{ModelDescription, Universe};
use super::process::CommandSimulator;

/// Runs a transport calculation for a fully specified model.
///
/// A returned error is a recoverable failure: the caller substitutes a
/// sentinel fitness instead of aborting the search.
pub trait Simulator: Send + Sync {
    fn run(&self, model: &ModelDescription, params: &RunParams)
    -> Result<Measurement, SimulationError>;
}

/// Ways a simulation can fail to produce a usable estimate.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Simulation diverged: {0}")]
    Divergence(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Simulator exited with {status}: {stderr}")]
    Process { status: String, stderr: String },
    #[error("Simulator exceeded its {0:?} time limit")]
    Timeout(Duration),
    #[error("Invalid simulator output: {0}")]
    InvalidOutput(String),
}

/// Build the simulator selected by a configuration.
pub fn simulator_for(config: &SimulatorConfig) -> Arc<dyn Simulator> {
    match &config.backend {
        SimulatorBackend::Command {
            program,
            args,
            timeout_secs,
        } => {
            let mut simulator = CommandSimulator::new(program.clone(), args.clone());
            if let Some(secs) = timeout_secs {
                simulator = simulator.with_timeout(Duration::from_secs(*secs));
            }
            if let Some(path) = &config.cross_sections {
                simulator = simulator.with_cross_sections(path.clone());
            }
            Arc::new(simulator)
        }
        SimulatorBackend::Surrogate { noise, seed } => {
            Arc::new(SurrogateSimulator::new(*noise, *seed))
        }
    }
}

/// Reactivity worth of each control bank when fully inserted.
const BANK_WORTH: [f64; 4] = [0.030, 0.025, 0.020, 0.020];

/// Cheap analytic stand-in for a transport code.
///
/// Produces a multiplication-factor-like metric with Gaussian jitter whose
/// width shrinks with the particle histories simulated. The jitter is seeded
/// from the model itself, so one model always yields one measurement.
#[derive(Debug, Clone)]
pub struct SurrogateSimulator {
    noise: f64,
    seed: u64,
}

impl SurrogateSimulator {
    /// `noise` is the one-sigma jitter at one million active histories.
    pub fn new(noise: f64, seed: u64) -> Self {
        Self { noise, seed }
    }

    /// Noise-free metric of a model.
    pub fn expected(&self, model: &ModelDescription) -> Result<f64, SimulationError> {
        match model {
            ModelDescription::AssemblyLattice {
                universes,
                boundary,
                ..
            } => lattice_multiplication(universes, *boundary),
            ModelDescription::PinCell {
                enrichment_pct,
                boundary,
                ..
            } => {
                let k_inf = 0.62 + 0.58 * (1.0 - (-enrichment_pct / 1.2).exp());
                Ok(match boundary {
                    Boundary::Reflective => k_inf,
                    Boundary::Vacuum => 0.3 * k_inf,
                })
            }
            ModelDescription::ControlBanks {
                insertions,
                depleted,
                ..
            } => {
                let excess = if *depleted { 1.01 } else { 1.06 };
                let inserted: f64 = insertions
                    .iter()
                    .enumerate()
                    .map(|(i, ins)| BANK_WORTH[i % BANK_WORTH.len()] * integral_worth(ins.fraction))
                    .sum();
                Ok(excess - inserted)
            }
        }
    }
}

impl Simulator for SurrogateSimulator {
    fn run(
        &self,
        model: &ModelDescription,
        params: &RunParams,
    ) -> Result<Measurement, SimulationError> {
        let nominal = self.expected(model)?;

        let histories = params.particles as f64 * params.active_batches().max(1) as f64;
        let std_dev = self.noise * (1.0e6 / histories).sqrt();

        let mut hasher = DefaultHasher::new();
        serde_json::to_vec(model)?.hash(&mut hasher);
        let mut rng = StdRng::seed_from_u64(self.seed ^ hasher.finish());
        let jitter = Normal::new(nominal, std_dev)
            .map_err(|e| SimulationError::InvalidOutput(e.to_string()))?;

        Ok(Measurement {
            nominal: rng.sample(jitter),
            std_dev,
        })
    }
}

/// S-shaped integral rod worth for an insertion fraction in `[0, 1]`.
fn integral_worth(fraction: f64) -> f64 {
    let t = fraction.clamp(0.0, 1.0);
    t - (2.0 * std::f64::consts::PI * t).sin() / (2.0 * std::f64::consts::PI)
}

/// Multiplication of a fuel/void lattice: an infinite-medium term from the
/// fuel fraction times a non-leakage term from exposed fuel faces.
fn lattice_multiplication(
    universes: &[Vec<Universe>],
    boundary: Boundary,
) -> Result<f64, SimulationError> {
    let side = universes.len();
    let fuel = universes
        .iter()
        .flatten()
        .filter(|&&u| u == Universe::FuelPin)
        .count();
    if fuel == 0 {
        return Err(SimulationError::Divergence(
            "no fissionable material, every particle leaks".into(),
        ));
    }

    let fraction = fuel as f64 / (side * side) as f64;
    let k_inf = 0.95 + 0.45 * fraction - 0.25 * fraction * fraction;

    let outer = match boundary {
        Boundary::Vacuum => 1.0,
        Boundary::Reflective => 0.0,
    };
    let mut exposed = 0.0;
    for (row, cells) in universes.iter().enumerate() {
        for (col, &u) in cells.iter().enumerate() {
            if u != Universe::FuelPin {
                continue;
            }
            let neighbours = [
                row.checked_sub(1).map(|r| (r, col)),
                (row + 1 < side).then_some((row + 1, col)),
                col.checked_sub(1).map(|c| (row, c)),
                (col + 1 < cells.len()).then_some((row, col + 1)),
            ];
            for neighbour in neighbours {
                exposed += match neighbour {
                    None => outer,
                    Some((r, c)) if universes[r][c] == Universe::Void => 0.5,
                    Some(_) => 0.0,
                };
            }
        }
    }
    let leakage = 0.6 * exposed / (4.0 * fuel as f64);
    Ok(k_inf * (1.0 - leakage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::model::BankInsertion;

    fn lattice(universes: Vec<Vec<Universe>>) -> ModelDescription {
        ModelDescription::AssemblyLattice {
            side: universes.len(),
            pitch_cm: 2.0,
            width_cm: 2.0 * universes.len() as f64,
            fuel_radius_cm: 0.75,
            clad_radius_cm: 0.85,
            boundary: Boundary::Vacuum,
            universes,
        }
    }

    #[test]
    fn test_empty_lattice_diverges() {
        let sim = SurrogateSimulator::new(0.0, 0);
        let model = lattice(vec![vec![Universe::Void; 3]; 3]);
        assert!(matches!(
            sim.run(&model, &RunParams::default()),
            Err(SimulationError::Divergence(_))
        ));
    }

    #[test]
    fn test_compact_fuel_beats_scattered() {
        let sim = SurrogateSimulator::new(0.0, 0);
        let f = Universe::FuelPin;
        let v = Universe::Void;
        let compact = lattice(vec![vec![v, v, v], vec![v, f, f], vec![v, f, f]]);
        let scattered = lattice(vec![vec![f, v, f], vec![v, v, v], vec![f, v, f]]);
        assert!(sim.expected(&compact).unwrap() > sim.expected(&scattered).unwrap());
    }

    #[test]
    fn test_pin_cell_monotone_in_enrichment() {
        let sim = SurrogateSimulator::new(0.0, 0);
        let pin = |e: f64| ModelDescription::PinCell {
            enrichment_pct: e,
            pitch_cm: 1.26,
            fuel_radius_cm: 0.39218,
            clad_radius_cm: 0.4572,
            boundary: Boundary::Reflective,
        };
        let low = sim.expected(&pin(1.0)).unwrap();
        let high = sim.expected(&pin(3.0)).unwrap();
        assert!(high > low);
        // 1.10 lies inside the [0, 4] enrichment range
        assert!(sim.expected(&pin(0.0)).unwrap() < 1.10);
        assert!(sim.expected(&pin(4.0)).unwrap() > 1.10);
    }

    #[test]
    fn test_control_banks_bracket_criticality() {
        let sim = SurrogateSimulator::new(0.0, 0);
        let banks = |fraction: f64| ModelDescription::ControlBanks {
            insertions: ["A", "B", "C", "D"]
                .iter()
                .map(|b| BankInsertion {
                    bank: b.to_string(),
                    depth: fraction * 359.634,
                    fraction,
                })
                .collect(),
            rings: 10,
            axial: 196,
            depleted: false,
        };
        assert!(sim.expected(&banks(0.0)).unwrap() > 1.0);
        assert!(sim.expected(&banks(1.0)).unwrap() < 1.0);
    }

    #[test]
    fn test_jitter_is_reproducible() {
        let sim = SurrogateSimulator::new(1e-3, 7);
        let model = lattice(vec![vec![Universe::FuelPin; 2]; 2]);
        let params = RunParams::default();
        let a = sim.run(&model, &params).unwrap();
        let b = sim.run(&model, &params).unwrap();
        assert_eq!(a, b);
        assert!(a.std_dev > 0.0);
    }

    #[test]
    fn test_more_histories_less_noise() {
        let sim = SurrogateSimulator::new(1e-3, 0);
        let model = lattice(vec![vec![Universe::FuelPin; 2]; 2]);
        let few = RunParams {
            particles: 1_000,
            ..Default::default()
        };
        let many = RunParams {
            particles: 100_000,
            ..Default::default()
        };
        assert!(sim.run(&model, &many).unwrap().std_dev < sim.run(&model, &few).unwrap().std_dev);
    }
}
