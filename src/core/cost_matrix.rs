use crate::core::distance::{edge_cost, CostError};
use crate::models::Cohort;
use thiserror::Error;

/// Errors raised while building a cost matrix
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CostMatrixError {
    #[error("Negative cost {cost} at ({row}, {col})")]
    NegativeCost { row: usize, col: usize, cost: i64 },

    #[error("Cost {cost} at ({row}, {col}) exceeds the solvable limit {limit}")]
    CostTooLarge {
        row: usize,
        col: usize,
        cost: u64,
        limit: i64,
    },

    #[error("Shape mismatch: expected {expected} entries, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Cost model error: {0}")]
    Cost(#[from] CostError),
}

/// Dense row-major cost matrix of a complete bipartite graph
///
/// Rows are subject records, columns are comparison records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostMatrix {
    rows: usize,
    cols: usize,
    data: Vec<i64>,
}

/// Largest edge cost for which potentials and path lengths cannot overflow
pub fn max_cost_for(rows: usize, cols: usize) -> i64 {
    let size = rows.max(cols) as i64;
    i64::MAX / (4 * (size + 1))
}

impl CostMatrix {
    /// Build from row-major data
    pub fn new(rows: usize, cols: usize, data: Vec<i64>) -> Result<Self, CostMatrixError> {
        let expected = rows * cols;
        if data.len() != expected {
            return Err(CostMatrixError::ShapeMismatch {
                expected,
                actual: data.len(),
            });
        }

        let limit = max_cost_for(rows, cols);
        for (index, &cost) in data.iter().enumerate() {
            let (row, col) = (index / cols, index % cols);
            if cost < 0 {
                return Err(CostMatrixError::NegativeCost { row, col, cost });
            }
            if cost > limit {
                return Err(CostMatrixError::CostTooLarge {
                    row,
                    col,
                    cost: cost as u64,
                    limit,
                });
            }
        }

        Ok(Self { rows, cols, data })
    }

    /// Build from nested rows; every row must have the same length
    pub fn from_rows(rows: Vec<Vec<i64>>) -> Result<Self, CostMatrixError> {
        let row_count = rows.len();
        let cols = rows.first().map_or(0, Vec::len);
        let data: Vec<i64> = rows.into_iter().flatten().collect();
        Self::new(row_count, cols, data)
    }

    /// Build the subject × comparison matrix for exponent `k`
    pub fn from_cohorts(
        subjects: &Cohort,
        comparisons: &Cohort,
        k: u32,
    ) -> Result<Self, CostMatrixError> {
        let rows = subjects.len();
        let cols = comparisons.len();
        let limit = max_cost_for(rows, cols);
        let mut data = Vec::with_capacity(rows * cols);

        for (row, subject) in subjects.iter().enumerate() {
            for (col, comparison) in comparisons.iter().enumerate() {
                let cost = edge_cost(subject.age, comparison.age, k)?;
                let cost = i64::try_from(cost)
                    .ok()
                    .filter(|c| *c <= limit)
                    .ok_or(CostMatrixError::CostTooLarge {
                        row,
                        col,
                        cost,
                        limit,
                    })?;
                data.push(cost);
            }
        }

        Ok(Self { rows, cols, data })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> i64 {
        self.data[row * self.cols + col]
    }

    pub fn transposed(&self) -> Self {
        let mut data = Vec::with_capacity(self.data.len());
        for col in 0..self.cols {
            for row in 0..self.rows {
                data.push(self.get(row, col));
            }
        }
        Self {
            rows: self.cols,
            cols: self.rows,
            data,
        }
    }

    /// Sum of the costs of the given (row, col) pairs
    pub fn total(&self, pairs: &[(usize, usize)]) -> i64 {
        pairs.iter().map(|&(row, col)| self.get(row, col)).sum()
    }
}
