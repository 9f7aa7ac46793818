//! Soft resource-budget constraint over a lattice.

use crate::schema::{ConstraintSpec, PenaltyPolicy};

use super::grid::Grid;

/// Result of checking a grid against its budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penalty {
    pub feasible: bool,
    /// Cells carrying the constrained label.
    pub usage: usize,
    /// Added to the fitness: `0.0` when feasible, negative otherwise.
    pub adjustment: f64,
}

impl PenaltyPolicy {
    /// Magnitude subtracted for `excess` cells over budget. Always finite.
    pub fn magnitude(&self, excess: usize) -> f64 {
        let magnitude = match *self {
            PenaltyPolicy::Fixed { amount } => amount,
            PenaltyPolicy::Scaled { base, per_cell } => base + per_cell * excess as f64,
        };
        magnitude.min(f64::MAX)
    }
}

/// Count the constrained label in `grid` and price any excess.
pub fn penalty(grid: &Grid, spec: &ConstraintSpec) -> Penalty {
    let usage = grid.count(spec.label);
    if usage <= spec.budget {
        return Penalty {
            feasible: true,
            usage,
            adjustment: 0.0,
        };
    }
    Penalty {
        feasible: false,
        usage,
        adjustment: -spec.penalty.magnitude(usage - spec.budget),
    }
}
