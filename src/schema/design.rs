//! Design-space types: per-position bounds, design vectors and cell labels.

use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// Typing of a single design-vector position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Bound {
    /// Integer-valued position in `[lo, hi]` (presence flags use `{0, 1}`).
    Integer { lo: i64, hi: i64 },
    /// Real-valued position in `[lo, hi]`.
    Continuous { lo: f64, hi: f64 },
}

impl Bound {
    /// Presence/absence flag.
    pub const BINARY: Bound = Bound::Integer { lo: 0, hi: 1 };

    pub fn lo(&self) -> f64 {
        match *self {
            Bound::Integer { lo, .. } => lo as f64,
            Bound::Continuous { lo, .. } => lo,
        }
    }

    pub fn hi(&self) -> f64 {
        match *self {
            Bound::Integer { hi, .. } => hi as f64,
            Bound::Continuous { hi, .. } => hi,
        }
    }

    #[inline]
    pub fn is_integer(&self) -> bool {
        matches!(self, Bound::Integer { .. })
    }

    /// Whether `value` is admissible at this position.
    pub fn contains(&self, value: f64) -> bool {
        if !value.is_finite() || value < self.lo() || value > self.hi() {
            return false;
        }
        !self.is_integer() || value.fract() == 0.0
    }

    /// Clamp into range, snapping integer positions to the nearest integer.
    pub fn repair(&self, value: f64) -> f64 {
        let value = if value.is_finite() { value } else { self.lo() };
        let clamped = value.clamp(self.lo(), self.hi());
        if self.is_integer() {
            clamped.round()
        } else {
            clamped
        }
    }
}

/// A named design-vector position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub bound: Bound,
}

/// Per-position bounds of a design vector.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    variables: Vec<Variable>,
}

impl Bounds {
    pub fn new(variables: Vec<Variable>) -> Self {
        Self { variables }
    }

    /// `len` positions sharing one bound, named `x1..xN`.
    pub fn uniform(len: usize, bound: Bound) -> Self {
        let variables = (1..=len)
            .map(|i| Variable {
                name: format!("x{i}"),
                bound,
            })
            .collect();
        Self { variables }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Bound> {
        self.variables.get(index).map(|v| &v.bound)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }

    /// Check a vector against these bounds.
    pub fn check(&self, values: &[f64]) -> Result<(), BoundsViolation> {
        if values.len() != self.variables.len() {
            return Err(BoundsViolation::Length {
                expected: self.variables.len(),
                actual: values.len(),
            });
        }
        for (index, (value, variable)) in values.iter().zip(&self.variables).enumerate() {
            if variable.bound.contains(*value) {
                continue;
            }
            let in_range = value.is_finite()
                && *value >= variable.bound.lo()
                && *value <= variable.bound.hi();
            return Err(if in_range {
                BoundsViolation::NotInteger {
                    index,
                    name: variable.name.clone(),
                    value: *value,
                }
            } else {
                BoundsViolation::OutOfBounds {
                    index,
                    name: variable.name.clone(),
                    value: *value,
                    lo: variable.bound.lo(),
                    hi: variable.bound.hi(),
                }
            });
        }
        Ok(())
    }

    /// Repair every position of `values` in place.
    pub fn repair(&self, values: &mut [f64]) {
        for (value, variable) in values.iter_mut().zip(&self.variables) {
            *value = variable.bound.repair(*value);
        }
    }
}

/// Ways a vector can fail its bounds.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BoundsViolation {
    #[error("expected {expected} positions, got {actual}")]
    Length { expected: usize, actual: usize },
    #[error("{name} (position {index}) = {value} outside [{lo}, {hi}]")]
    OutOfBounds {
        index: usize,
        name: String,
        value: f64,
        lo: f64,
        hi: f64,
    },
    #[error("{name} (position {index}) = {value} is not an integer")]
    NotInteger {
        index: usize,
        name: String,
        value: f64,
    },
}

/// One candidate design as produced by the optimizer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesignVector(Vec<f64>);

impl DesignVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl Deref for DesignVector {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

impl From<Vec<f64>> for DesignVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// Material/state label carried by one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(pub u8);

impl Label {
    pub const ABSENT: Label = Label(0);
    pub const PRESENT: Label = Label(1);

    /// Interpret a design-vector value as a label.
    pub fn from_value(value: f64) -> Option<Label> {
        if value.is_finite() && value.fract() == 0.0 && (0.0..=u8::MAX as f64).contains(&value) {
            Some(Label(value as u8))
        } else {
            None
        }
    }

    #[inline]
    pub fn value(self) -> f64 {
        self.0 as f64
    }
}

/// Symmetry group under which equivalent lattice configurations are identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SymmetryGroup {
    /// Identity only: every cell is independent.
    #[default]
    None,
    /// Mirror about the vertical midline.
    Half,
    /// Mirror about the vertical and horizontal midlines.
    Quarter,
    /// Quarter mirrors plus the main diagonal.
    Octant,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_contains() {
        assert!(Bound::BINARY.contains(0.0));
        assert!(Bound::BINARY.contains(1.0));
        assert!(!Bound::BINARY.contains(0.5));
        assert!(!Bound::BINARY.contains(2.0));
        assert!(!Bound::BINARY.contains(f64::NAN));

        let b = Bound::Continuous { lo: 0.0, hi: 4.0 };
        assert!(b.contains(2.37));
        assert!(!b.contains(-0.1));
    }

    #[test]
    fn test_repair() {
        assert_eq!(Bound::BINARY.repair(0.7), 1.0);
        assert_eq!(Bound::BINARY.repair(-3.0), 0.0);
        let b = Bound::Continuous { lo: 0.0, hi: 359.634 };
        assert_eq!(b.repair(400.0), 359.634);
        assert_eq!(b.repair(f64::NAN), 0.0);
    }

    #[test]
    fn test_bounds_check() {
        let bounds = Bounds::uniform(3, Bound::BINARY);
        assert!(bounds.check(&[0.0, 1.0, 1.0]).is_ok());
        assert_eq!(
            bounds.check(&[0.0, 1.0]),
            Err(BoundsViolation::Length {
                expected: 3,
                actual: 2
            })
        );
        assert!(matches!(
            bounds.check(&[0.0, 0.5, 1.0]),
            Err(BoundsViolation::NotInteger { index: 1, .. })
        ));
        assert!(matches!(
            bounds.check(&[0.0, 1.0, 3.0]),
            Err(BoundsViolation::OutOfBounds { index: 2, .. })
        ));
    }

    #[test]
    fn test_uniform_names() {
        let bounds = Bounds::uniform(2, Bound::BINARY);
        let names: Vec<_> = bounds.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["x1", "x2"]);
    }

    #[test]
    fn test_label_from_value() {
        assert_eq!(Label::from_value(1.0), Some(Label::PRESENT));
        assert_eq!(Label::from_value(0.0), Some(Label::ABSENT));
        assert_eq!(Label::from_value(0.5), None);
        assert_eq!(Label::from_value(-1.0), None);
        assert_eq!(Label::from_value(300.0), None);
    }
}
