use crate::core::{
    assignment::{Solver, SolverError},
    cost_matrix::{CostMatrix, CostMatrixError},
    distance::decode,
    filters::filter_by_sex,
};
use crate::models::{Cohort, MatchedPair, StrataPlan, Stratum, StratumResult};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;

/// Failure inside a single stratum
#[derive(Debug, Error)]
pub enum StratumError {
    #[error("Cost matrix error: {0}")]
    CostMatrix(#[from] CostMatrixError),

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),
}

/// Errors that can occur while running the stratified matching
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Stratum (sex: {sex}, exponent: {exponent}) failed: {source}")]
    Stratum {
        sex: String,
        exponent: u32,
        source: StratumError,
    },

    #[error("Stratum worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl MatchError {
    fn in_stratum(stratum: &Stratum, source: impl Into<StratumError>) -> Self {
        MatchError::Stratum {
            sex: stratum.sex.label().to_string(),
            exponent: stratum.exponent.power,
            source: source.into(),
        }
    }
}

/// Stratified matching driver
///
/// # Pipeline Stages (per stratum)
/// 1. Sex filtering of both cohorts
/// 2. Cost matrix construction with the stratum's exponent
/// 3. Optimal assignment
/// 4. Decoding of per-edge gaps and aggregation
#[derive(Debug, Clone, Copy, Default)]
pub struct Matcher {
    solver: Solver,
}

impl Matcher {
    pub fn new(solver: Solver) -> Self {
        Self { solver }
    }

    pub fn solver(&self) -> &Solver {
        &self.solver
    }

    /// Match one stratum
    ///
    /// # Arguments
    /// * `subjects` - Full subject cohort (U), filtered here by sex
    /// * `comparisons` - Full comparison cohort (V), filtered here by sex
    /// * `stratum` - Sex filter and exponent to apply
    pub fn run_stratum(
        &self,
        subjects: &Cohort,
        comparisons: &Cohort,
        stratum: &Stratum,
    ) -> Result<StratumResult, MatchError> {
        let k = stratum.exponent.power;
        let subjects = filter_by_sex(subjects, &stratum.sex);
        let comparisons = filter_by_sex(comparisons, &stratum.sex);

        tracing::info!(
            sex = %stratum.sex,
            exponent = k,
            "Matching stratum with exponent {}",
            stratum.exponent.name
        );
        tracing::info!("Subjects: {}", subjects.len());
        tracing::info!("Comparisons: {}", comparisons.len());

        let matrix = CostMatrix::from_cohorts(&subjects, &comparisons, k)
            .map_err(|e| MatchError::in_stratum(stratum, e))?;
        let assignment = self
            .solver
            .solve(&matrix)
            .map_err(|e| MatchError::in_stratum(stratum, e))?;

        let mut pairs = Vec::with_capacity(assignment.len());
        let mut raw_total = 0u64;
        let mut total_gap = 0u64;

        for &(row, col) in &assignment.pairs {
            let subject = &subjects.records()[row];
            let comparison = &comparisons.records()[col];
            let raw_cost = matrix.get(row, col).unsigned_abs();
            let gap = decode(raw_cost, k);

            tracing::debug!("Edge {} --> {}: {}", subject.identity, comparison.identity, gap);

            raw_total += raw_cost;
            total_gap += gap;
            pairs.push(MatchedPair {
                subject: subject.identity.clone(),
                comparison: comparison.identity.clone(),
                raw_cost,
                gap,
            });
        }

        let result = StratumResult {
            stratum: stratum.clone(),
            subject_count: subjects.len(),
            comparison_count: comparisons.len(),
            pairs,
            raw_total,
            total_gap,
            effective_gap: decode(raw_total, k),
        };

        tracing::info!("Total gap: {}", result.total_gap);
        tracing::info!("Edges: {}", result.cardinality());

        Ok(result)
    }

    /// Match every stratum of the plan in order
    pub fn run_all(
        &self,
        subjects: &Cohort,
        comparisons: &Cohort,
        plan: &StrataPlan,
    ) -> Result<Vec<StratumResult>, MatchError> {
        plan.strata()
            .iter()
            .map(|stratum| self.run_stratum(subjects, comparisons, stratum))
            .collect()
    }
}

/// Match every stratum of the plan on the blocking thread pool
///
/// Results come back in plan order regardless of completion order. The first
/// failing stratum aborts the run.
pub async fn run_concurrently(
    matcher: Matcher,
    subjects: Arc<Cohort>,
    comparisons: Arc<Cohort>,
    plan: &StrataPlan,
) -> Result<Vec<StratumResult>, MatchError> {
    let mut tasks = JoinSet::new();

    for (index, stratum) in plan.strata().iter().cloned().enumerate() {
        let subjects = Arc::clone(&subjects);
        let comparisons = Arc::clone(&comparisons);
        tasks.spawn_blocking(move || {
            (index, matcher.run_stratum(&subjects, &comparisons, &stratum))
        });
    }

    let mut slots: Vec<Option<StratumResult>> = vec![None; plan.len()];
    while let Some(joined) = tasks.join_next().await {
        let (index, result) = joined?;
        slots[index] = Some(result?);
    }

    Ok(slots.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CohortSide, Exponent, Record, SexFilter};

    fn subjects(records: Vec<Record>) -> Cohort {
        Cohort::new(CohortSide::Subject, records).unwrap()
    }

    fn comparisons(records: Vec<Record>) -> Cohort {
        Cohort::new(CohortSide::Comparison, records).unwrap()
    }

    fn stratum(sex: &str, k: u32) -> Stratum {
        Stratum::new(SexFilter::from(sex), Exponent::with_default_name(k))
    }

    #[test]
    fn test_single_pair() {
        let u = subjects(vec![Record::new("p1", 30, "m")]);
        let v = comparisons(vec![Record::new("c1", 32, "m")]);

        let result = Matcher::default().run_stratum(&u, &v, &stratum("all", 1)).unwrap();

        assert_eq!(result.cardinality(), 1);
        assert_eq!(result.pairs[0].subject, "p1");
        assert_eq!(result.pairs[0].comparison, "c1");
        assert_eq!(result.pairs[0].gap, 2);
        assert_eq!(result.total_gap, 2);
    }

    #[test]
    fn test_two_pairs_avoid_crossing() {
        let u = subjects(vec![Record::new("p1", 20, "m"), Record::new("p2", 40, "m")]);
        let v = comparisons(vec![Record::new("c1", 21, "m"), Record::new("c2", 41, "m")]);

        let result = Matcher::default().run_stratum(&u, &v, &stratum("all", 1)).unwrap();

        let pairs: Vec<(&str, &str, u64)> = result
            .pairs
            .iter()
            .map(|p| (p.subject.as_str(), p.comparison.as_str(), p.gap))
            .collect();
        assert_eq!(pairs, vec![("p1", "c1", 1), ("p2", "c2", 1)]);
        assert_eq!(result.total_gap, 2);
    }

    #[test]
    fn test_squared_cost_decodes_to_gap() {
        let u = subjects(vec![Record::new("p1", 10, "w")]);
        let v = comparisons(vec![Record::new("c1", 13, "w")]);

        let result = Matcher::default().run_stratum(&u, &v, &stratum("all", 2)).unwrap();

        assert_eq!(result.pairs[0].raw_cost, 9);
        assert_eq!(result.pairs[0].gap, 3);
        assert_eq!(result.raw_total, 9);
        assert_eq!(result.effective_gap, 3);
    }

    #[test]
    fn test_total_gap_differs_from_effective_gap() {
        // gaps 1, 2, 2 with k = 2: raw total 9
        let u = subjects(vec![
            Record::new("p1", 10, "m"),
            Record::new("p2", 50, "m"),
            Record::new("p3", 90, "m"),
        ]);
        let v = comparisons(vec![
            Record::new("c1", 11, "m"),
            Record::new("c2", 52, "m"),
            Record::new("c3", 92, "m"),
        ]);

        let result = Matcher::default().run_stratum(&u, &v, &stratum("all", 2)).unwrap();

        assert_eq!(result.raw_total, 9);
        assert_eq!(result.total_gap, 5);
        assert_eq!(result.effective_gap, 3);
    }

    #[test]
    fn test_unequal_sizes_pick_cheapest() {
        let u = subjects(vec![
            Record::new("p1", 20, "m"),
            Record::new("p2", 35, "m"),
            Record::new("p3", 60, "m"),
        ]);
        let v = comparisons(vec![Record::new("c1", 33, "m")]);

        let result = Matcher::default().run_stratum(&u, &v, &stratum("all", 1)).unwrap();

        assert_eq!(result.cardinality(), 1);
        assert_eq!(result.pairs[0].subject, "p2");
        assert_eq!(result.total_gap, 2);
    }

    #[test]
    fn test_empty_side() {
        let u = subjects(vec![Record::new("p1", 20, "m")]);
        let v = Cohort::empty(CohortSide::Comparison);

        let result = Matcher::default().run_stratum(&u, &v, &stratum("all", 3)).unwrap();

        assert!(result.pairs.is_empty());
        assert_eq!(result.total_gap, 0);
        assert_eq!(result.raw_total, 0);
        assert_eq!(result.subject_count, 1);
        assert_eq!(result.comparison_count, 0);
    }

    #[test]
    fn test_sex_stratum_only_pairs_same_sex() {
        let u = subjects(vec![Record::new("p1", 30, "m"), Record::new("p2", 30, "w")]);
        let v = comparisons(vec![Record::new("c1", 30, "w"), Record::new("c2", 60, "m")]);

        let result = Matcher::default().run_stratum(&u, &v, &stratum("m", 1)).unwrap();

        assert_eq!(result.cardinality(), 1);
        assert_eq!(result.pairs[0].subject, "p1");
        assert_eq!(result.pairs[0].comparison, "c2");
        assert_eq!(result.total_gap, 30);
    }

    #[test]
    fn test_error_names_stratum() {
        let u = subjects(vec![Record::new("p1", 0, "m")]);
        let v = comparisons(vec![Record::new("c1", 1000, "m")]);

        let err = Matcher::default().run_stratum(&u, &v, &stratum("m", 9)).unwrap_err();

        match err {
            MatchError::Stratum { sex, exponent, .. } => {
                assert_eq!(sex, "m");
                assert_eq!(exponent, 9);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_run_all_follows_plan_order() {
        let u = subjects(vec![Record::new("p1", 30, "m"), Record::new("p2", 44, "w")]);
        let v = comparisons(vec![Record::new("c1", 31, "m"), Record::new("c2", 40, "w")]);
        let plan = StrataPlan::default();

        let results = Matcher::default().run_all(&u, &v, &plan).unwrap();

        assert_eq!(results.len(), plan.len());
        for (result, stratum) in results.iter().zip(plan.strata()) {
            assert_eq!(&result.stratum, stratum);
        }
        // m: gap 1, w: gap 4, all: 1 + 4
        assert_eq!(results[0].total_gap, 1);
        assert_eq!(results[3].total_gap, 4);
        assert_eq!(results[6].total_gap, 5);
    }

    #[tokio::test]
    async fn test_concurrent_matches_sequential() {
        let u = subjects((0..12).map(|i| Record::new(format!("p{i}"), 20 + i * 3, if i % 2 == 0 { "m" } else { "w" })).collect());
        let v = comparisons((0..9).map(|i| Record::new(format!("c{i}"), 25 + i * 4, if i % 3 == 0 { "m" } else { "w" })).collect());
        let plan = StrataPlan::default();
        let matcher = Matcher::default();

        let sequential = matcher.run_all(&u, &v, &plan).unwrap();
        let concurrent = run_concurrently(matcher, Arc::new(u), Arc::new(v), &plan)
            .await
            .unwrap();

        assert_eq!(sequential, concurrent);
    }
}
