use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::core::Solver;
use crate::models::{domain::default_exponent_name, Exponent, SexFilter, StrataPlan};

/// Errors raised while loading or rendering configuration
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ValidationErrors),

    #[error("Failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub cohort: CohortSettings,
    #[serde(default)]
    pub strata: StrataSettings,
    #[serde(default)]
    pub solver: SolverSettings,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub runner: RunnerSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CohortSettings {
    /// Prefix of the first column marking subject rows
    #[serde(default)]
    pub subject_label: Option<String>,
    /// Prefix of the first column marking comparison rows
    #[serde(default = "default_comparison_label")]
    pub comparison_label: Option<String>,
    #[validate(length(equal = 1))]
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default = "default_true")]
    pub has_header: bool,
}

impl CohortSettings {
    /// The validated single-character delimiter
    pub fn delimiter_char(&self) -> char {
        self.delimiter.chars().next().unwrap_or(';')
    }
}

impl Default for CohortSettings {
    fn default() -> Self {
        Self {
            subject_label: None,
            comparison_label: default_comparison_label(),
            delimiter: default_delimiter(),
            has_header: true,
        }
    }
}

fn default_comparison_label() -> Option<String> { Some("Kontrolle".to_string()) }
fn default_delimiter() -> String { ";".to_string() }
fn default_true() -> bool { true }

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct StrataSettings {
    /// Sex labels to stratify by; `all` disables the filter
    #[validate(length(min = 1), custom(function = "validate_sexes"))]
    #[serde(default = "default_sexes")]
    pub sexes: Vec<String>,
    #[validate(length(min = 1), custom(function = "validate_exponents"))]
    #[serde(default = "default_exponents")]
    pub exponents: Vec<ExponentSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExponentSettings {
    pub power: u32,
    #[serde(default)]
    pub name: Option<String>,
}

impl StrataSettings {
    pub fn sex_filters(&self) -> Vec<SexFilter> {
        self.sexes.iter().map(|s| SexFilter::from(s.as_str())).collect()
    }

    pub fn exponents(&self) -> Vec<Exponent> {
        self.exponents
            .iter()
            .map(|e| {
                let name = e.name.clone().unwrap_or_else(|| default_exponent_name(e.power));
                Exponent::new(e.power, name)
            })
            .collect()
    }

    /// Sex filters outer, exponents inner, in configured order
    pub fn plan(&self) -> StrataPlan {
        StrataPlan::new(&self.sex_filters(), &self.exponents())
    }
}

impl Default for StrataSettings {
    fn default() -> Self {
        Self {
            sexes: default_sexes(),
            exponents: default_exponents(),
        }
    }
}

fn default_sexes() -> Vec<String> {
    vec!["m".to_string(), "w".to_string(), SexFilter::ALL_LABEL.to_string()]
}

fn default_exponents() -> Vec<ExponentSettings> {
    (1..=3)
        .map(|power| ExponentSettings {
            power,
            name: Some(default_exponent_name(power)),
        })
        .collect()
}

/// A label usable as one component of an output file name
fn is_file_name_safe(label: &str) -> bool {
    !label.is_empty()
        && label != "."
        && label != ".."
        && !label.contains(&['/', '\\', '\0'][..])
}

fn validate_sexes(sexes: &[String]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for sex in sexes {
        if !is_file_name_safe(sex) {
            return Err(ValidationError::new("sex_label_not_a_file_name"));
        }
        if !seen.insert(sex.as_str()) {
            return Err(ValidationError::new("sex_label_repeated"));
        }
    }
    Ok(())
}

fn validate_exponents(exponents: &[ExponentSettings]) -> Result<(), ValidationError> {
    let mut powers = HashSet::new();
    let mut names = HashSet::new();
    for exponent in exponents {
        if exponent.power == 0 {
            return Err(ValidationError::new("exponent_must_be_positive"));
        }
        if !powers.insert(exponent.power) {
            return Err(ValidationError::new("exponent_repeated"));
        }
        let name = exponent
            .name
            .clone()
            .unwrap_or_else(|| default_exponent_name(exponent.power));
        if !is_file_name_safe(&name) {
            return Err(ValidationError::new("exponent_name_not_a_file_name"));
        }
        if !names.insert(name) {
            return Err(ValidationError::new("exponent_name_repeated"));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SolverSettings {
    /// Abort a stratum whose solver runs longer than this
    #[serde(default)]
    pub time_limit_secs: Option<u64>,
}

impl SolverSettings {
    pub fn solver(&self) -> Solver {
        match self.time_limit_secs {
            Some(secs) => Solver::with_time_limit(Duration::from_secs(secs)),
            None => Solver::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputSettings {
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    /// Header written when the input has none
    #[serde(default = "default_header")]
    pub default_header: String,
    #[serde(default = "default_summary_file")]
    pub summary_file: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
            default_header: default_header(),
            summary_file: default_summary_file(),
        }
    }
}

fn default_results_dir() -> PathBuf { PathBuf::from("big_k_min") }
fn default_header() -> String { "patient;kontrolle;altersabstand".to_string() }
fn default_summary_file() -> String { "summary.json".to_string() }

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunnerSettings {
    /// Run strata on the blocking thread pool instead of one after another
    #[serde(default = "default_true")]
    pub parallel: bool,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self { parallel: true }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "compact".to_string() }

impl Settings {
    /// Load configuration from files and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with COHORT__)
    pub fn load() -> Result<Self, SettingsError> {
        let settings: Settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., COHORT__SOLVER__TIME_LIMIT_SECS -> solver.time_limit_secs
            .add_source(env_source())
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let settings: Settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        self.cohort.validate()?;
        self.strata.validate()?;
        Ok(())
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("COHORT")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
