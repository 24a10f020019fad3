use crate::models::{RunSummary, StratumResult, StratumSummary};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while writing results
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Consumer of finished strata
///
/// The directory writer is the only sink shipped here; a plotting tool
/// would implement the same trait.
pub trait StratumSink {
    fn write_stratum(&mut self, result: &StratumResult) -> Result<(), OutputError>;
}

/// Text layout of a stratum file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFormat {
    header_line: String,
    delimiter: char,
}

impl ReportFormat {
    /// Use the input header when there is one, otherwise `default_header`
    pub fn new(header: Option<&[String]>, default_header: &str, delimiter: char) -> Self {
        let header_line = match header {
            Some(fields) => fields.join(&delimiter.to_string()),
            None => default_header.to_string(),
        };
        Self {
            header_line,
            delimiter,
        }
    }

    pub fn header_line(&self) -> &str {
        &self.header_line
    }

    /// Header line followed by one `subject;comparison;gap` row per pair
    pub fn render(&self, result: &StratumResult) -> String {
        let d = self.delimiter;
        let mut body = String::with_capacity(self.header_line.len() + 1 + result.pairs.len() * 24);
        body.push_str(&self.header_line);
        body.push('\n');
        for pair in &result.pairs {
            body.push_str(&format!("{}{d}{}{d}{}\n", pair.subject, pair.comparison, pair.gap));
        }
        body
    }
}

/// `{sex}_{exponent name}_{total gap}`
pub fn stratum_file_name(result: &StratumResult) -> String {
    format!(
        "{}_{}_{}",
        result.stratum.sex.label(),
        result.stratum.exponent.name,
        result.total_gap
    )
}

/// Writes one file per stratum into a directory, plus a JSON run summary
pub struct DirectorySink {
    dir: PathBuf,
    format: ReportFormat,
    summary: RunSummary,
    summary_file: String,
}

impl DirectorySink {
    /// Create the output directory if needed
    pub fn create(
        dir: &Path,
        format: ReportFormat,
        input: &Path,
        summary_file: impl Into<String>,
    ) -> Result<Self, OutputError> {
        if !dir.exists() {
            tracing::info!("Creating output directory {}", dir.display());
        }
        fs::create_dir_all(dir).map_err(|source| OutputError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        Ok(Self {
            dir: dir.to_path_buf(),
            format,
            summary: RunSummary::new(input),
            summary_file: summary_file.into(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Write the run summary and return its path
    pub fn finish(self) -> Result<PathBuf, OutputError> {
        let path = self.dir.join(&self.summary_file);
        let json = serde_json::to_string_pretty(&self.summary)?;
        fs::write(&path, json).map_err(|source| OutputError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!(
            "Wrote summary of {} strata to {}",
            self.summary.strata.len(),
            path.display()
        );
        Ok(path)
    }
}

impl StratumSink for DirectorySink {
    fn write_stratum(&mut self, result: &StratumResult) -> Result<(), OutputError> {
        let name = stratum_file_name(result);
        let path = self.dir.join(&name);
        fs::write(&path, self.format.render(result)).map_err(|source| OutputError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::debug!("Wrote {}", path.display());
        self.summary.push(StratumSummary::from_result(result, name));
        Ok(())
    }
}
