use crate::models::{Cohort, Record, SexFilter};

/// Restrict a cohort to the records accepted by a sex filter
///
/// Record order is preserved, so the solver sees the same row/column order
/// on every run.
pub fn filter_by_sex(cohort: &Cohort, filter: &SexFilter) -> Cohort {
    if matches!(filter, SexFilter::All) {
        return cohort.clone();
    }

    let records: Vec<Record> = cohort
        .iter()
        .filter(|record| filter.accepts(record))
        .cloned()
        .collect();

    Cohort::from_unique(cohort.side(), records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CohortSide;

    fn create_cohort() -> Cohort {
        Cohort::new(
            CohortSide::Subject,
            vec![
                Record::new("p1", 30, "m"),
                Record::new("p2", 41, "w"),
                Record::new("p3", 52, "m"),
                Record::new("p4", 63, "d"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_filter_keeps_matching_sex() {
        let filtered = filter_by_sex(&create_cohort(), &SexFilter::from("m"));
        let ids: Vec<&str> = filtered.iter().map(|r| r.identity.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p3"]);
        assert_eq!(filtered.side(), CohortSide::Subject);
    }

    #[test]
    fn test_filter_all_keeps_everything() {
        let cohort = create_cohort();
        assert_eq!(filter_by_sex(&cohort, &SexFilter::All), cohort);
    }

    #[test]
    fn test_filter_unknown_label_is_empty() {
        let filtered = filter_by_sex(&create_cohort(), &SexFilter::from("x"));
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_filter_is_case_sensitive() {
        let filtered = filter_by_sex(&create_cohort(), &SexFilter::from("M"));
        assert!(filtered.is_empty());
    }
}
