//! Cohort Match - optimal age matching of research cohorts
//!
//! This library pairs a subject cohort with a comparison cohort so that the
//! total age disparity is minimal, once per (sex, cost exponent) stratum.
//! The core is an exact Hungarian assignment solver over a complete
//! bipartite cost matrix.

pub mod cli;
pub mod config;
pub mod core;
pub mod models;
pub mod runner;
pub mod services;

// Re-export commonly used types
pub use core::{decode, edge_cost, solve, CostMatrix, Matcher, Solver};
pub use models::{Cohort, CohortSide, Exponent, Record, SexFilter, StrataPlan, Stratum, StratumResult};
pub use runner::{run_matching, RunError, RunOutcome};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Verify that the library exports work correctly
        let matrix = CostMatrix::from_rows(vec![vec![edge_cost(30, 32, 1).unwrap() as i64]]).unwrap();
        let assignment = solve(&matrix).unwrap();
        assert_eq!(decode(assignment.total as u64, 1), 2);
    }
}
