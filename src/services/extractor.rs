use crate::config::CohortSettings;
use crate::models::{Cohort, CohortError, CohortSide, Record};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while reading cohort records
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("A subject label or a comparison label must be specified")]
    MissingLabel,

    #[error("Could not find csv file: {}", .0.display())]
    InputMissing(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error(transparent)]
    Cohort(#[from] CohortError),
}

/// Subject and comparison cohorts read from one input
#[derive(Debug, Clone)]
pub struct Extraction {
    pub subjects: Cohort,
    pub comparisons: Cohort,
    /// Header fields, when the input carries a header row
    pub header: Option<Vec<String>>,
}

/// Splits delimited rows into the subject and comparison cohorts
///
/// Row layout: `tag;age;sex;identity[;...]`. The tag is matched by prefix:
/// with a subject label, matching rows are subjects and all others are
/// comparisons; with only a comparison label, matching rows are comparisons
/// and all others are subjects.
#[derive(Debug, Clone)]
pub struct CohortExtractor {
    subject_label: Option<String>,
    comparison_label: Option<String>,
    delimiter: char,
    has_header: bool,
}

const MIN_FIELDS: usize = 4;

impl CohortExtractor {
    pub fn new(
        subject_label: Option<String>,
        comparison_label: Option<String>,
    ) -> Result<Self, ExtractError> {
        if subject_label.is_none() && comparison_label.is_none() {
            return Err(ExtractError::MissingLabel);
        }
        Ok(Self {
            subject_label,
            comparison_label,
            delimiter: ';',
            has_header: true,
        })
    }

    pub fn from_settings(settings: &CohortSettings) -> Result<Self, ExtractError> {
        Ok(Self::new(
            settings.subject_label.clone(),
            settings.comparison_label.clone(),
        )?
        .with_delimiter(settings.delimiter_char())
        .with_header(settings.has_header))
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Read and split the file at `path`
    pub fn extract_path(&self, path: &Path) -> Result<Extraction, ExtractError> {
        if !path.exists() {
            return Err(ExtractError::InputMissing(path.to_path_buf()));
        }
        let input = std::fs::read_to_string(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!("Read {} bytes from {}", input.len(), path.display());
        self.extract_str(&input)
    }

    /// Split already loaded input text
    pub fn extract_str(&self, input: &str) -> Result<Extraction, ExtractError> {
        let mut lines = input.lines().enumerate().map(|(index, line)| (index + 1, line));

        let header = if self.has_header {
            lines.next().map(|(_, line)| {
                line.split(self.delimiter)
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
        } else {
            None
        };

        let mut subjects = Vec::new();
        let mut comparisons = Vec::new();

        for (line_no, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(self.delimiter).collect();
            let record = self.parse_record(&fields, line_no)?;

            match self.classify(fields[0]) {
                CohortSide::Subject => subjects.push(record),
                CohortSide::Comparison => comparisons.push(record),
            }
        }

        tracing::debug!(
            "Extracted {} subject and {} comparison records",
            subjects.len(),
            comparisons.len()
        );

        Ok(Extraction {
            subjects: Cohort::new(CohortSide::Subject, subjects)?,
            comparisons: Cohort::new(CohortSide::Comparison, comparisons)?,
            header,
        })
    }

    fn classify(&self, tag: &str) -> CohortSide {
        match (&self.subject_label, &self.comparison_label) {
            (Some(label), _) if tag.starts_with(label.as_str()) => CohortSide::Subject,
            (Some(_), _) => CohortSide::Comparison,
            (None, Some(label)) if tag.starts_with(label.as_str()) => CohortSide::Comparison,
            (None, _) => CohortSide::Subject,
        }
    }

    fn parse_record(&self, fields: &[&str], line: usize) -> Result<Record, ExtractError> {
        if fields.len() < MIN_FIELDS {
            return Err(ExtractError::MalformedRecord {
                line,
                reason: format!(
                    "expected at least {} fields, found {}",
                    MIN_FIELDS,
                    fields.len()
                ),
            });
        }

        let age = fields[1]
            .trim()
            .parse::<u32>()
            .map_err(|e| ExtractError::MalformedRecord {
                line,
                reason: format!("invalid age '{}': {}", fields[1], e),
            })?;

        let identity = fields[3];
        if identity.trim().is_empty() {
            return Err(ExtractError::MalformedRecord {
                line,
                reason: "empty identity".to_string(),
            });
        }

        Ok(Record::new(identity, age, fields[2]).at_line(line))
    }
}
