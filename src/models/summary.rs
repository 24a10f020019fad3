use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::models::domain::StratumResult;

/// Manifest written next to the per-stratum files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub version: String,
    pub input: String,
    pub strata: Vec<StratumSummary>,
}

/// Per-stratum line of the run manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StratumSummary {
    pub sex: String,
    pub exponent: u32,
    pub exponent_name: String,
    pub subject_count: usize,
    pub comparison_count: usize,
    pub cardinality: usize,
    pub raw_total: u64,
    pub total_gap: u64,
    pub effective_gap: u64,
    pub file: String,
}

impl StratumSummary {
    pub fn from_result(result: &StratumResult, file: impl Into<String>) -> Self {
        Self {
            sex: result.stratum.sex.label().to_string(),
            exponent: result.stratum.exponent.power,
            exponent_name: result.stratum.exponent.name.clone(),
            subject_count: result.subject_count,
            comparison_count: result.comparison_count,
            cardinality: result.cardinality(),
            raw_total: result.raw_total,
            total_gap: result.total_gap,
            effective_gap: result.effective_gap,
            file: file.into(),
        }
    }
}

impl RunSummary {
    pub fn new(input: &Path) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            input: input.display().to_string(),
            strata: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: StratumSummary) {
        self.strata.push(entry);
    }
}
