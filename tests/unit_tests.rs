// Unit tests for Cohort Match

use cohort_match::core::{
    age_difference, decode, edge_cost, filter_by_sex, solve, CostError, CostMatrix,
};
use cohort_match::models::{Cohort, CohortSide, Record, SexFilter};
use proptest::prelude::*;

fn create_cohort(side: CohortSide, records: &[(&str, u32, &str)]) -> Cohort {
    Cohort::new(
        side,
        records
            .iter()
            .map(|(id, age, sex)| Record::new(*id, *age, *sex))
            .collect(),
    )
    .unwrap()
}

#[test]
fn test_age_difference_is_symmetric() {
    assert_eq!(age_difference(30, 32), 2);
    assert_eq!(age_difference(32, 30), 2);
    assert_eq!(age_difference(0, 0), 0);
}

#[test]
fn test_edge_cost_exponents() {
    assert_eq!(edge_cost(10, 13, 1), Ok(3));
    assert_eq!(edge_cost(10, 13, 2), Ok(9));
    assert_eq!(edge_cost(10, 13, 3), Ok(27));
    assert_eq!(edge_cost(10, 13, 0), Err(CostError::ZeroExponent));
}

#[test]
fn test_decode_single_edge_recovers_gap() {
    for gap in 0u32..=120 {
        for k in 1..=3 {
            let cost = edge_cost(0, gap, k).unwrap();
            assert_eq!(decode(cost, k), u64::from(gap), "gap {} k {}", gap, k);
        }
    }
}

#[test]
fn test_decode_zero_and_linear() {
    for k in 1..=6 {
        assert_eq!(decode(0, k), 0);
    }
    for x in [0u64, 1, 2, 99, 1_000_000] {
        assert_eq!(decode(x, 1), x);
    }
}

#[test]
fn test_cost_matrix_from_filtered_cohorts() {
    let subjects = create_cohort(CohortSide::Subject, &[("p1", 30, "m"), ("p2", 50, "w")]);
    let comparisons = create_cohort(
        CohortSide::Comparison,
        &[("c1", 33, "m"), ("c2", 52, "w"), ("c3", 70, "m")],
    );

    let u = filter_by_sex(&subjects, &SexFilter::from("m"));
    let v = filter_by_sex(&comparisons, &SexFilter::from("m"));
    let matrix = CostMatrix::from_cohorts(&u, &v, 1).unwrap();

    assert_eq!(matrix.rows(), 1);
    assert_eq!(matrix.cols(), 2);
    assert_eq!(matrix.get(0, 0), 3);
    assert_eq!(matrix.get(0, 1), 40);
}

#[test]
fn test_solver_on_age_matrix() {
    // Subjects 20, 30, 40 against comparisons 29, 41, 21
    let subjects = create_cohort(
        CohortSide::Subject,
        &[("p1", 20, "m"), ("p2", 30, "m"), ("p3", 40, "m")],
    );
    let comparisons = create_cohort(
        CohortSide::Comparison,
        &[("c1", 29, "m"), ("c2", 41, "m"), ("c3", 21, "m")],
    );

    let matrix = CostMatrix::from_cohorts(&subjects, &comparisons, 1).unwrap();
    let assignment = solve(&matrix).unwrap();

    assert_eq!(assignment.pairs, vec![(0, 2), (1, 0), (2, 1)]);
    assert_eq!(assignment.total, 3);
}

#[test]
fn test_exponent_changes_optimum() {
    // k = 1 ties at 10 for both pairings; k = 2 prefers two gaps of 5
    // over gaps of 0 and 10.
    let matrix_for = |k| {
        let subjects = create_cohort(CohortSide::Subject, &[("p1", 40, "m"), ("p2", 45, "m")]);
        let comparisons = create_cohort(CohortSide::Comparison, &[("c1", 45, "m"), ("c2", 50, "m")]);
        CostMatrix::from_cohorts(&subjects, &comparisons, k).unwrap()
    };

    assert_eq!(solve(&matrix_for(1)).unwrap().total, 10);
    let quadratic = solve(&matrix_for(2)).unwrap();
    assert_eq!(quadratic.total, 50);
    assert_eq!(quadratic.pairs, vec![(0, 0), (1, 1)]);
}

proptest! {
    #[test]
    fn prop_decode_is_monotone(x in 0u64..10_000_000, step in 0u64..1000, k in 1u32..6) {
        prop_assert!(decode(x, k) <= decode(x + step, k));
    }

    #[test]
    fn prop_decode_is_ceiling_root(x in 1u64..1_000_000_000, k in 1u32..6) {
        let r = decode(x, k);
        prop_assert!(r.pow(k) >= x);
        prop_assert!((r - 1).pow(k) < x);
    }
}
