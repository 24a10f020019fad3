use crate::core::cost_matrix::CostMatrix;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors that can occur while solving an assignment
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SolverError {
    /// Cannot happen for a complete bipartite matrix; signals a solver bug.
    #[error("Internal invariant violated: no augmenting path for row {row}")]
    NoAugmentingPath { row: usize },

    #[error("Solver exceeded its time limit of {limit:?} after {rows_done} of {rows_total} rows")]
    TimedOut {
        limit: Duration,
        rows_done: usize,
        rows_total: usize,
    },
}

/// Minimum-cost maximum-cardinality matching over a cost matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// (row, col) pairs, ordered by row
    pub pairs: Vec<(usize, usize)>,
    pub total: i64,
}

impl Assignment {
    pub fn empty() -> Self {
        Self {
            pairs: Vec::new(),
            total: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

const INF: i64 = i64::MAX / 2;

/// Hungarian (Kuhn–Munkres) solver with row/column potentials
///
/// # Algorithm
/// Rows are added one at a time. For each new row a Dijkstra-style search
/// over reduced costs finds the cheapest augmenting path to a free column,
/// then potentials are shifted so every reduced cost stays non-negative.
/// Runs in O(n² m) for an n × m matrix with n <= m; a taller matrix is
/// transposed first, which is the same as padding the short side with
/// zero-cost dummy columns.
///
/// Ties are broken towards the lowest column index, so a given matrix
/// always produces the same pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Solver {
    time_limit: Option<Duration>,
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time_limit(limit: Duration) -> Self {
        Self {
            time_limit: Some(limit),
        }
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }

    /// Solve the assignment problem for `matrix`
    ///
    /// # Returns
    /// An assignment of size min(rows, cols) with minimum total cost. An
    /// empty side yields the empty assignment.
    pub fn solve(&self, matrix: &CostMatrix) -> Result<Assignment, SolverError> {
        if matrix.is_empty() {
            return Ok(Assignment::empty());
        }

        tracing::trace!("Solving {}x{} assignment", matrix.rows(), matrix.cols());

        let mut pairs = if matrix.rows() <= matrix.cols() {
            self.solve_wide(matrix)?
        } else {
            self.solve_wide(&matrix.transposed())?
                .into_iter()
                .map(|(col, row)| (row, col))
                .collect()
        };
        pairs.sort_unstable();

        let total = matrix.total(&pairs);
        Ok(Assignment { pairs, total })
    }

    /// Core loop for rows <= cols. Returns (row, col) pairs.
    fn solve_wide(&self, matrix: &CostMatrix) -> Result<Vec<(usize, usize)>, SolverError> {
        let n = matrix.rows();
        let m = matrix.cols();
        let started = Instant::now();

        // 1-based; index 0 of the column arrays is the virtual source column
        let mut u = vec![0i64; n + 1];
        let mut v = vec![0i64; m + 1];
        let mut p = vec![0usize; m + 1];
        let mut way = vec![0usize; m + 1];
        let mut minv = vec![INF; m + 1];
        let mut used = vec![false; m + 1];

        for i in 1..=n {
            if let Some(limit) = self.time_limit {
                if started.elapsed() >= limit {
                    return Err(SolverError::TimedOut {
                        limit,
                        rows_done: i - 1,
                        rows_total: n,
                    });
                }
            }

            p[0] = i;
            let mut j0 = 0usize;
            minv.fill(INF);
            used.fill(false);

            loop {
                used[j0] = true;
                let i0 = p[j0];
                let mut delta = INF;
                let mut j1 = 0usize;

                for j in 1..=m {
                    if used[j] {
                        continue;
                    }
                    let reduced = matrix.get(i0 - 1, j - 1) - u[i0] - v[j];
                    if reduced < minv[j] {
                        minv[j] = reduced;
                        way[j] = j0;
                    }
                    if minv[j] < delta {
                        delta = minv[j];
                        j1 = j;
                    }
                }

                if j1 == 0 {
                    return Err(SolverError::NoAugmentingPath { row: i - 1 });
                }

                for j in 0..=m {
                    if used[j] {
                        u[p[j]] += delta;
                        v[j] -= delta;
                    } else {
                        minv[j] -= delta;
                    }
                }

                j0 = j1;
                if p[j0] == 0 {
                    break;
                }
            }

            // Flip the augmenting path back to the source
            loop {
                let j1 = way[j0];
                p[j0] = p[j1];
                j0 = j1;
                if j0 == 0 {
                    break;
                }
            }
        }

        Ok((1..=m)
            .filter(|&j| p[j] != 0)
            .map(|j| (p[j] - 1, j - 1))
            .collect())
    }
}

/// Solve with no time limit
pub fn solve(matrix: &CostMatrix) -> Result<Assignment, SolverError> {
    Solver::new().solve(matrix)
}
