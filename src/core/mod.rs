// Core algorithm exports
pub mod assignment;
pub mod cost_matrix;
pub mod distance;
pub mod filters;
pub mod matcher;

pub use assignment::{solve, Assignment, Solver, SolverError};
pub use cost_matrix::{CostMatrix, CostMatrixError};
pub use distance::{age_difference, decode, edge_cost, CostError};
pub use filters::filter_by_sex;
pub use matcher::{run_concurrently, MatchError, Matcher, StratumError};
