//! Symmetry reduction of square lattices.
//!
//! A [`SymmetryMap`] partitions the `side * side` cells into orbits under a
//! [`SymmetryGroup`]. Each orbit becomes one reduced design variable. The
//! canonical representative of an orbit is its top-left member (smallest
//! row-major index), and reduced indices follow the row-major order of the
//! representatives. Under quarter symmetry this makes the reduced space the
//! top-left `ceil(side/2)` square, with cells on the midlines forming their
//! own smaller orbits.

use crate::schema::SymmetryGroup;

use super::grid::{cell_to_index, index_to_cell};

/// Number of independent cells of a `side x side` lattice under `group`.
pub fn reduce_dimension(side: usize, group: SymmetryGroup) -> usize {
    let half = side.div_ceil(2);
    match group {
        SymmetryGroup::None => side * side,
        SymmetryGroup::Half => side * half,
        SymmetryGroup::Quarter => half * half,
        SymmetryGroup::Octant => half * (half + 1) / 2,
    }
}

/// All images of `(row, col)` under the group, duplicates included.
fn images(group: SymmetryGroup, row: usize, col: usize, side: usize) -> Vec<(usize, usize)> {
    let r = side - 1 - row;
    let c = side - 1 - col;
    match group {
        SymmetryGroup::None => vec![(row, col)],
        SymmetryGroup::Half => vec![(row, col), (row, c)],
        SymmetryGroup::Quarter => vec![(row, col), (row, c), (r, col), (r, c)],
        SymmetryGroup::Octant => vec![
            (row, col),
            (row, c),
            (r, col),
            (r, c),
            (col, row),
            (col, r),
            (c, row),
            (c, r),
        ],
    }
}

/// Cell-to-orbit mapping for one `(side, group)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymmetryMap {
    side: usize,
    group: SymmetryGroup,
    cell_to_reduced: Vec<usize>,
    orbits: Vec<Vec<usize>>,
}

impl SymmetryMap {
    pub fn new(side: usize, group: SymmetryGroup) -> Self {
        let cells = side * side;
        let mut cell_to_reduced = vec![usize::MAX; cells];
        let mut orbits: Vec<Vec<usize>> = Vec::with_capacity(reduce_dimension(side, group));

        // Row-major sweep: the first unassigned cell is the smallest member
        // of its orbit.
        for index in 0..cells {
            if cell_to_reduced[index] != usize::MAX {
                continue;
            }
            let (row, col) = index_to_cell(index, side);
            let mut orbit: Vec<usize> = images(group, row, col, side)
                .into_iter()
                .map(|(r, c)| cell_to_index(r, c, side))
                .collect();
            orbit.sort_unstable();
            orbit.dedup();

            let reduced = orbits.len();
            for &member in &orbit {
                cell_to_reduced[member] = reduced;
            }
            orbits.push(orbit);
        }

        Self {
            side,
            group,
            cell_to_reduced,
            orbits,
        }
    }

    #[inline]
    pub fn side(&self) -> usize {
        self.side
    }

    #[inline]
    pub fn group(&self) -> SymmetryGroup {
        self.group
    }

    /// Length of a reduced vector.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.orbits.len()
    }

    /// Length of a full vector.
    #[inline]
    pub fn full_len(&self) -> usize {
        self.cell_to_reduced.len()
    }

    /// Reduced index owning full cell `(row, col)`.
    pub fn reduced_index(&self, row: usize, col: usize) -> Option<usize> {
        if row < self.side && col < self.side {
            Some(self.cell_to_reduced[cell_to_index(row, col, self.side)])
        } else {
            None
        }
    }

    /// Full-cell indices of one orbit, ascending.
    pub fn orbit(&self, reduced: usize) -> Option<&[usize]> {
        self.orbits.get(reduced).map(Vec::as_slice)
    }

    /// `(row, col)` of an orbit's canonical representative.
    pub fn representative(&self, reduced: usize) -> Option<(usize, usize)> {
        self.orbits
            .get(reduced)
            .map(|orbit| index_to_cell(orbit[0], self.side))
    }

    pub fn orbit_sizes(&self) -> impl Iterator<Item = usize> + '_ {
        self.orbits.iter().map(Vec::len)
    }

    /// Assign every full cell the value of its orbit.
    pub fn expand<T: Copy>(&self, reduced: &[T]) -> Result<Vec<T>, SymmetryError> {
        if reduced.len() != self.dimension() {
            return Err(SymmetryError::InvalidVectorLength {
                expected: self.dimension(),
                actual: reduced.len(),
            });
        }
        Ok(self.cell_to_reduced.iter().map(|&r| reduced[r]).collect())
    }

    /// Collapse a full vector onto its orbit representatives.
    ///
    /// Fails on the first cell (row-major) that disagrees with its
    /// representative.
    pub fn project<T: Copy + PartialEq>(&self, full: &[T]) -> Result<Vec<T>, SymmetryError> {
        if full.len() != self.full_len() {
            return Err(SymmetryError::InvalidVectorLength {
                expected: self.full_len(),
                actual: full.len(),
            });
        }
        for (index, &reduced) in self.cell_to_reduced.iter().enumerate() {
            if full[index] != full[self.orbits[reduced][0]] {
                let (row, col) = index_to_cell(index, self.side);
                return Err(SymmetryError::AsymmetricConfiguration { row, col });
            }
        }
        Ok(self.orbits.iter().map(|orbit| full[orbit[0]]).collect())
    }

    /// Number of full cells equal to `target` once `reduced` is expanded.
    pub fn usage<T: PartialEq>(&self, reduced: &[T], target: &T) -> Result<usize, SymmetryError> {
        if reduced.len() != self.dimension() {
            return Err(SymmetryError::InvalidVectorLength {
                expected: self.dimension(),
                actual: reduced.len(),
            });
        }
        Ok(reduced
            .iter()
            .zip(&self.orbits)
            .filter(|(value, _)| *value == target)
            .map(|(_, orbit)| orbit.len())
            .sum())
    }
}

/// Symmetry reduction errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SymmetryError {
    #[error("Vector length {actual} does not match expected {expected}")]
    InvalidVectorLength { expected: usize, actual: usize },
    #[error("Cell ({row}, {col}) breaks the declared symmetry")]
    AsymmetricConfiguration { row: usize, col: usize },
}
