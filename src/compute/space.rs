//! Search-space view of a design: bounds, decoding and symmetry expansion.

use crate::schema::{Bound, Bounds, ControlVariable, DesignSpaceConfig, Variable};

use super::evolution::EvaluationError;
use super::grid::encode;
use super::model::Design;
use super::symmetry::{SymmetryError, SymmetryMap};

/// The space an optimizer searches.
#[derive(Debug, Clone)]
pub enum DesignSpace {
    /// Binary presence flags, one per symmetry orbit of a square lattice.
    Lattice { map: SymmetryMap },
    /// Continuous control variables passed straight to the model builder.
    Continuous { variables: Vec<ControlVariable> },
}

impl DesignSpace {
    pub fn from_config(config: &DesignSpaceConfig) -> Self {
        match config {
            DesignSpaceConfig::Lattice { side, symmetry } => DesignSpace::Lattice {
                map: SymmetryMap::new(*side, *symmetry),
            },
            DesignSpaceConfig::Continuous { variables } => DesignSpace::Continuous {
                variables: variables.clone(),
            },
        }
    }

    /// Length of a search-space vector.
    pub fn dimension(&self) -> usize {
        match self {
            DesignSpace::Lattice { map } => map.dimension(),
            DesignSpace::Continuous { variables } => variables.len(),
        }
    }

    /// Per-position bounds handed to the optimizer.
    pub fn bounds(&self) -> Bounds {
        match self {
            DesignSpace::Lattice { map } => Bounds::uniform(map.dimension(), Bound::BINARY),
            DesignSpace::Continuous { variables } => Bounds::new(
                variables
                    .iter()
                    .map(|v| Variable {
                        name: v.name.clone(),
                        bound: Bound::Continuous { lo: v.lo, hi: v.hi },
                    })
                    .collect(),
            ),
        }
    }

    /// Full-space vector: symmetry undone for lattices, unchanged otherwise.
    pub fn expand(&self, values: &[f64]) -> Result<Vec<f64>, SymmetryError> {
        match self {
            DesignSpace::Lattice { map } => map.expand(values),
            DesignSpace::Continuous { .. } => Ok(values.to_vec()),
        }
    }

    /// Turn a search-space vector into a design for the model builder.
    pub fn decode(&self, values: &[f64]) -> Result<Design, EvaluationError> {
        match self {
            DesignSpace::Lattice { map } => {
                let full = map.expand(values)?;
                Ok(Design::Lattice(encode(&full, map.side())?))
            }
            DesignSpace::Continuous { .. } => Ok(Design::Controls(values.to_vec())),
        }
    }
}
