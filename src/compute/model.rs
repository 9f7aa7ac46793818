//! Model builders: turn a decoded design into a simulator-ready description.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::schema::{
    AssemblyLatticeConfig, Boundary, ControlBankConfig, MAX_ENRICHMENT_PCT, ModelConfig,
    PinCellConfig,
};

use super::grid::Grid;

/// A decoded design, before model construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Design {
    /// Full lattice configuration.
    Lattice(Grid),
    /// Continuous control settings, in design-variable order.
    Controls(Vec<f64>),
}

/// Pin universe placed in one lattice position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Universe {
    FuelPin,
    Void,
}

/// Insertion depth of one control bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankInsertion {
    pub bank: String,
    /// Steps inserted, `0` is fully withdrawn.
    pub depth: f64,
    /// `depth / max_insertion`.
    pub fraction: f64,
}

/// Serializable model handed to a simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ModelDescription {
    AssemblyLattice {
        side: usize,
        pitch_cm: f64,
        width_cm: f64,
        fuel_radius_cm: f64,
        clad_radius_cm: f64,
        boundary: Boundary,
        /// Row-major universes, one row per lattice row.
        universes: Vec<Vec<Universe>>,
    },
    PinCell {
        enrichment_pct: f64,
        pitch_cm: f64,
        fuel_radius_cm: f64,
        clad_radius_cm: f64,
        boundary: Boundary,
    },
    ControlBanks {
        insertions: Vec<BankInsertion>,
        rings: usize,
        axial: usize,
        depleted: bool,
    },
}

/// Builds a model from a design. Must be a pure function of its input.
pub trait ModelBuilder: Send + Sync {
    fn build(&self, design: &Design) -> Result<ModelDescription, BuildError>;
}

/// Model construction errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    #[error("Builder expects a {expected} design")]
    UnexpectedDesign { expected: &'static str },
    #[error("Builder expects {expected} parameters, got {actual}")]
    ParameterCount { expected: usize, actual: usize },
    #[error("Parameter {name} = {value} is out of range")]
    InvalidParameter { name: String, value: f64 },
}

/// Assembly whose lattice positions hold fuel pins or void.
#[derive(Debug, Clone)]
pub struct AssemblyLatticeBuilder {
    config: AssemblyLatticeConfig,
}

impl AssemblyLatticeBuilder {
    pub fn new(config: AssemblyLatticeConfig) -> Self {
        Self { config }
    }
}

impl ModelBuilder for AssemblyLatticeBuilder {
    fn build(&self, design: &Design) -> Result<ModelDescription, BuildError> {
        let Design::Lattice(grid) = design else {
            return Err(BuildError::UnexpectedDesign { expected: "lattice" });
        };
        let universes = grid
            .rows()
            .map(|row| {
                row.iter()
                    .map(|&label| {
                        if label == self.config.fuel_label {
                            Universe::FuelPin
                        } else {
                            Universe::Void
                        }
                    })
                    .collect()
            })
            .collect();

        Ok(ModelDescription::AssemblyLattice {
            side: grid.side(),
            pitch_cm: self.config.width_cm / grid.side().max(1) as f64,
            width_cm: self.config.width_cm,
            fuel_radius_cm: self.config.fuel_radius_cm,
            clad_radius_cm: self.config.clad_radius_cm,
            boundary: self.config.boundary,
            universes,
        })
    }
}

/// Single pin cell parameterized by U-235 enrichment (w/o).
#[derive(Debug, Clone)]
pub struct PinCellBuilder {
    config: PinCellConfig,
}

impl PinCellBuilder {
    pub fn new(config: PinCellConfig) -> Self {
        Self { config }
    }
}

impl ModelBuilder for PinCellBuilder {
    fn build(&self, design: &Design) -> Result<ModelDescription, BuildError> {
        let Design::Controls(params) = design else {
            return Err(BuildError::UnexpectedDesign { expected: "control" });
        };
        let [enrichment] = params.as_slice() else {
            return Err(BuildError::ParameterCount {
                expected: 1,
                actual: params.len(),
            });
        };
        if !(0.0..=MAX_ENRICHMENT_PCT).contains(enrichment) {
            return Err(BuildError::InvalidParameter {
                name: "enrichment".into(),
                value: *enrichment,
            });
        }

        Ok(ModelDescription::PinCell {
            enrichment_pct: *enrichment,
            pitch_cm: self.config.pitch_cm,
            fuel_radius_cm: self.config.fuel_radius_cm,
            clad_radius_cm: self.config.clad_radius_cm,
            boundary: self.config.boundary,
        })
    }
}

/// Core with control banks inserted to the given depths.
#[derive(Debug, Clone)]
pub struct ControlBankBuilder {
    config: ControlBankConfig,
}

impl ControlBankBuilder {
    pub fn new(config: ControlBankConfig) -> Self {
        Self { config }
    }
}

impl ModelBuilder for ControlBankBuilder {
    fn build(&self, design: &Design) -> Result<ModelDescription, BuildError> {
        let Design::Controls(depths) = design else {
            return Err(BuildError::UnexpectedDesign { expected: "control" });
        };
        if depths.len() != self.config.banks.len() {
            return Err(BuildError::ParameterCount {
                expected: self.config.banks.len(),
                actual: depths.len(),
            });
        }

        let max = self.config.max_insertion;
        let insertions = self
            .config
            .banks
            .iter()
            .zip(depths)
            .map(|(bank, &depth)| {
                if !(0.0..=max).contains(&depth) {
                    return Err(BuildError::InvalidParameter {
                        name: format!("bank_{bank}"),
                        value: depth,
                    });
                }
                Ok(BankInsertion {
                    bank: bank.clone(),
                    depth,
                    fraction: if max > 0.0 { depth / max } else { 0.0 },
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ModelDescription::ControlBanks {
            insertions,
            rings: self.config.rings,
            axial: self.config.axial,
            depleted: self.config.depleted,
        })
    }
}

/// Builder matching a model configuration.
pub fn builder_for(config: &ModelConfig) -> Arc<dyn ModelBuilder> {
    match config {
        ModelConfig::AssemblyLattice(c) => Arc::new(AssemblyLatticeBuilder::new(c.clone())),
        ModelConfig::PinCell(c) => Arc::new(PinCellBuilder::new(c.clone())),
        ModelConfig::ControlBanks(c) => Arc::new(ControlBankBuilder::new(c.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::grid::encode;

    #[test]
    fn test_assembly_lattice() {
        let builder = AssemblyLatticeBuilder::new(AssemblyLatticeConfig::default());
        let mut values = vec![1.0; 121];
        values[0] = 0.0;
        values[120] = 0.0;
        let grid = encode(&values, 11).unwrap();

        let model = builder.build(&Design::Lattice(grid)).unwrap();
        let ModelDescription::AssemblyLattice {
            side,
            pitch_cm,
            universes,
            ..
        } = model
        else {
            panic!("wrong model type");
        };
        assert_eq!(side, 11);
        assert!((pitch_cm - 2.0).abs() < 1e-12);
        assert_eq!(universes[0][0], Universe::Void);
        assert_eq!(universes[10][10], Universe::Void);
        assert_eq!(universes[5][5], Universe::FuelPin);
    }

    #[test]
    fn test_pin_cell() {
        let builder = PinCellBuilder::new(PinCellConfig::default());
        let model = builder.build(&Design::Controls(vec![2.4])).unwrap();
        assert!(matches!(
            model,
            ModelDescription::PinCell { enrichment_pct, .. } if enrichment_pct == 2.4
        ));
        assert_eq!(
            builder.build(&Design::Controls(vec![1.0, 2.0])),
            Err(BuildError::ParameterCount {
                expected: 1,
                actual: 2
            })
        );
    }

    #[test]
    fn test_control_banks() {
        let builder = ControlBankBuilder::new(ControlBankConfig::default());
        let model = builder
            .build(&Design::Controls(vec![0.0, 100.0, 200.0, 359.634]))
            .unwrap();
        let ModelDescription::ControlBanks { insertions, .. } = model else {
            panic!("wrong model type");
        };
        assert_eq!(insertions.len(), 4);
        assert_eq!(insertions[1].bank, "B");
        assert!((insertions[3].fraction - 1.0).abs() < 1e-12);

        assert!(matches!(
            builder.build(&Design::Controls(vec![0.0, 0.0, 0.0, 400.0])),
            Err(BuildError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_design_kind_mismatch() {
        let builder = PinCellBuilder::new(PinCellConfig::default());
        let grid = Grid::filled(2, crate::schema::Label::ABSENT);
        assert!(matches!(
            builder.build(&Design::Lattice(grid)),
            Err(BuildError::UnexpectedDesign { .. })
        ));
    }

    #[test]
    fn test_model_serializes_with_tag() {
        let builder = PinCellBuilder::new(PinCellConfig::default());
        let model = builder.build(&Design::Controls(vec![3.0])).unwrap();
        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["type"], "PinCell");
        assert_eq!(json["boundary"], "reflective");
    }
}
