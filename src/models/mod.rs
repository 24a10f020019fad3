// Model exports
pub mod domain;
pub mod summary;

pub use domain::{
    Cohort, CohortError, CohortSide, Exponent, MatchedPair, Record, SexFilter, StrataPlan, Stratum,
    StratumResult,
};
pub use summary::{RunSummary, StratumSummary};
