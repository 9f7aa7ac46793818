//! Grid codec: flat design vectors to square label grids and back.
//!
//! Position `i` of a vector maps to `row = i / side`, `col = i % side`.

use crate::schema::Label;

/// Square lattice of cell labels, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    side: usize,
    cells: Vec<Label>,
}

impl Grid {
    /// Grid with every cell set to `label`.
    pub fn filled(side: usize, label: Label) -> Self {
        Self {
            side,
            cells: vec![label; side * side],
        }
    }

    /// Grid from row-major labels.
    pub fn from_labels(side: usize, cells: Vec<Label>) -> Result<Self, CodecError> {
        if cells.len() != side * side {
            return Err(CodecError::InvalidVectorLength {
                expected: side * side,
                actual: cells.len(),
            });
        }
        Ok(Self { side, cells })
    }

    #[inline]
    pub fn side(&self) -> usize {
        self.side
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Label> {
        if row < self.side && col < self.side {
            Some(self.cells[row * self.side + col])
        } else {
            None
        }
    }

    pub fn labels(&self) -> &[Label] {
        &self.cells
    }

    /// Iterate rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Label]> {
        // chunks panics on zero
        self.cells.chunks(self.side.max(1))
    }

    /// Number of cells carrying `label`.
    pub fn count(&self, label: Label) -> usize {
        self.cells.iter().filter(|&&l| l == label).count()
    }

    /// `(row, col)` of every cell carrying `label`, row-major.
    pub fn cells_with(&self, label: Label) -> Vec<(usize, usize)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &l)| l == label)
            .map(|(i, _)| index_to_cell(i, self.side))
            .collect()
    }
}

/// Row-major position to `(row, col)`.
#[inline]
pub fn index_to_cell(index: usize, side: usize) -> (usize, usize) {
    (index / side, index % side)
}

/// `(row, col)` to row-major position.
#[inline]
pub fn cell_to_index(row: usize, col: usize, side: usize) -> usize {
    row * side + col
}

/// Convert a flat vector of length `side * side` into a grid.
pub fn encode(values: &[f64], side: usize) -> Result<Grid, CodecError> {
    if values.len() != side * side {
        return Err(CodecError::InvalidVectorLength {
            expected: side * side,
            actual: values.len(),
        });
    }
    let cells = values
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            Label::from_value(value).ok_or(CodecError::InvalidLabel { index, value })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Grid { side, cells })
}

/// Flatten a grid back into a vector.
pub fn decode(grid: &Grid) -> Vec<f64> {
    grid.cells.iter().map(|l| l.value()).collect()
}

/// Grid codec errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    #[error("Vector length {actual} does not match grid size {expected}")]
    InvalidVectorLength { expected: usize, actual: usize },
    #[error("Value {value} at position {index} is not a cell label")]
    InvalidLabel { index: usize, value: f64 },
}
