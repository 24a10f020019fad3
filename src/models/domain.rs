use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Errors raised while assembling a cohort
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CohortError {
    #[error("Duplicate identity '{identity}' in {side} cohort (line {line})")]
    DuplicateIdentity {
        side: CohortSide,
        identity: String,
        line: usize,
    },
}

/// A single extracted row: identity token plus the attributes used for matching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub identity: String,
    pub age: u32,
    pub sex: String,
    /// 1-based line in the input, 0 for records built in code
    #[serde(default)]
    pub line: usize,
}

impl Record {
    pub fn new(identity: impl Into<String>, age: u32, sex: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            age,
            sex: sex.into(),
            line: 0,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }
}

/// Which side of the bipartite graph a cohort sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CohortSide {
    Subject,
    Comparison,
}

impl fmt::Display for CohortSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CohortSide::Subject => write!(f, "subject"),
            CohortSide::Comparison => write!(f, "comparison"),
        }
    }
}

/// Ordered set of records with unique identity tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cohort {
    side: CohortSide,
    records: Vec<Record>,
}

impl Cohort {
    /// Build a cohort, rejecting repeated identity tokens
    pub fn new(side: CohortSide, records: Vec<Record>) -> Result<Self, CohortError> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert(record.identity.as_str()) {
                return Err(CohortError::DuplicateIdentity {
                    side,
                    identity: record.identity.clone(),
                    line: record.line,
                });
            }
        }
        Ok(Self { side, records })
    }

    pub fn empty(side: CohortSide) -> Self {
        Self {
            side,
            records: Vec::new(),
        }
    }

    /// Subsets of a valid cohort keep identities unique, so no re-check is needed.
    pub(crate) fn from_unique(side: CohortSide, records: Vec<Record>) -> Self {
        Self { side, records }
    }

    pub fn side(&self) -> CohortSide {
        self.side
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}

/// Sex stratum selector
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SexFilter {
    Only(String),
    All,
}

impl SexFilter {
    pub const ALL_LABEL: &'static str = "all";

    pub fn label(&self) -> &str {
        match self {
            SexFilter::Only(label) => label,
            SexFilter::All => Self::ALL_LABEL,
        }
    }

    #[inline]
    pub fn accepts(&self, record: &Record) -> bool {
        match self {
            SexFilter::Only(label) => record.sex == *label,
            SexFilter::All => true,
        }
    }
}

impl From<String> for SexFilter {
    fn from(value: String) -> Self {
        if value == Self::ALL_LABEL {
            SexFilter::All
        } else {
            SexFilter::Only(value)
        }
    }
}

impl From<&str> for SexFilter {
    fn from(value: &str) -> Self {
        SexFilter::from(value.to_string())
    }
}

impl From<SexFilter> for String {
    fn from(value: SexFilter) -> Self {
        value.label().to_string()
    }
}

impl fmt::Display for SexFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Cost exponent k with the name used in output file names
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Exponent {
    pub power: u32,
    pub name: String,
}

impl Exponent {
    pub fn new(power: u32, name: impl Into<String>) -> Self {
        Self {
            power,
            name: name.into(),
        }
    }

    /// Exponent with its conventional name
    pub fn with_default_name(power: u32) -> Self {
        Self::new(power, default_exponent_name(power))
    }
}

impl fmt::Display for Exponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.power, self.name)
    }
}

pub fn default_exponent_name(power: u32) -> String {
    match power {
        1 => "linear".to_string(),
        2 => "quadratisch".to_string(),
        3 => "kubisch".to_string(),
        k => format!("power{}", k),
    }
}

/// One (sex filter, exponent) combination
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stratum {
    pub sex: SexFilter,
    pub exponent: Exponent,
}

impl Stratum {
    pub fn new(sex: SexFilter, exponent: Exponent) -> Self {
        Self { sex, exponent }
    }
}

impl fmt::Display for Stratum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sex={}, exponent={}", self.sex, self.exponent)
    }
}

/// Ordered enumeration of strata: sex filters outer, exponents inner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrataPlan {
    strata: Vec<Stratum>,
}

impl StrataPlan {
    pub fn new(sexes: &[SexFilter], exponents: &[Exponent]) -> Self {
        let strata = sexes
            .iter()
            .flat_map(|sex| {
                exponents
                    .iter()
                    .map(move |exponent| Stratum::new(sex.clone(), exponent.clone()))
            })
            .collect();
        Self { strata }
    }

    pub fn strata(&self) -> &[Stratum] {
        &self.strata
    }

    pub fn len(&self) -> usize {
        self.strata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strata.is_empty()
    }
}

impl Default for StrataPlan {
    fn default() -> Self {
        let sexes = [SexFilter::from("m"), SexFilter::from("w"), SexFilter::All];
        let exponents: Vec<Exponent> = (1..=3).map(Exponent::with_default_name).collect();
        Self::new(&sexes, &exponents)
    }
}

/// One matched edge of a stratum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedPair {
    pub subject: String,
    pub comparison: String,
    pub raw_cost: u64,
    /// Per-edge decoded age gap
    pub gap: u64,
}

/// Result of running the solver on one stratum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StratumResult {
    pub stratum: Stratum,
    pub subject_count: usize,
    pub comparison_count: usize,
    pub pairs: Vec<MatchedPair>,
    /// Sum of raw (exponentiated) edge costs
    pub raw_total: u64,
    /// Sum of per-edge decoded gaps
    pub total_gap: u64,
    /// decode(raw_total, k)
    pub effective_gap: u64,
}

impl StratumResult {
    pub fn cardinality(&self) -> usize {
        self.pairs.len()
    }
}
