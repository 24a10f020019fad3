use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use validator::ValidationErrors;

use crate::config::Settings;
use crate::core::{run_concurrently, MatchError, Matcher};
use crate::models::StratumResult;
use crate::services::{
    CohortExtractor, DirectorySink, ExtractError, OutputError, ReportFormat, StratumSink,
};

/// Errors that halt a matching run
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ValidationErrors),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

/// What a completed run produced
#[derive(Debug)]
pub struct RunOutcome {
    pub results: Vec<StratumResult>,
    pub results_dir: PathBuf,
    pub summary_path: PathBuf,
}

/// Extract, match every stratum and write the results
///
/// Nothing is written until the settings are valid and extraction has
/// succeeded, so a bad configuration or input leaves no output directory
/// behind.
pub async fn run_matching(settings: &Settings, input: &Path) -> Result<RunOutcome, RunError> {
    settings.validate()?;
    let extractor = CohortExtractor::from_settings(&settings.cohort)?;
    let extraction = extractor.extract_path(input)?;

    tracing::info!(
        "Loaded {} subjects and {} comparisons from {}",
        extraction.subjects.len(),
        extraction.comparisons.len(),
        input.display()
    );

    let plan = settings.strata.plan();
    let matcher = Matcher::new(settings.solver.solver());

    let results = if settings.runner.parallel {
        tracing::debug!("Running {} strata concurrently", plan.len());
        run_concurrently(
            matcher,
            Arc::new(extraction.subjects),
            Arc::new(extraction.comparisons),
            &plan,
        )
        .await?
    } else {
        matcher.run_all(&extraction.subjects, &extraction.comparisons, &plan)?
    };

    let format = ReportFormat::new(
        extraction.header.as_deref(),
        &settings.output.default_header,
        extractor.delimiter(),
    );
    let mut sink = DirectorySink::create(
        &settings.output.results_dir,
        format,
        input,
        settings.output.summary_file.clone(),
    )?;
    for result in &results {
        sink.write_stratum(result)?;
    }
    let results_dir = sink.dir().to_path_buf();
    let summary_path = sink.finish()?;

    Ok(RunOutcome {
        results,
        results_dir,
        summary_path,
    })
}
