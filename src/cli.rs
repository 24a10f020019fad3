use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Settings;

#[derive(Parser, Debug)]
#[command(
    name = "cohort-match",
    version,
    about = "Optimal age matching of subject and comparison cohorts"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Configuration file (defaults to config/default.toml)")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Match the cohorts of a csv file for every stratum
    Run(RunArgs),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(short = 'f', long = "file", help = "Path to csv file")]
    pub file: PathBuf,
    #[arg(short = 'U', long = "u-name", help = "Prefix marking subject (U) rows")]
    pub u_name: Option<String>,
    #[arg(short = 'V', long = "v-name", help = "Prefix marking comparison (V) rows")]
    pub v_name: Option<String>,
    #[arg(short = 'r', long = "results-dir", help = "Directory for results")]
    pub results_dir: Option<PathBuf>,
    #[arg(long, default_value_t = false, help = "Input has no header row")]
    pub no_header: bool,
    #[arg(long, default_value_t = false, help = "Run strata one after another")]
    pub sequential: bool,
}

impl RunArgs {
    /// Command-line flags override the loaded configuration
    pub fn apply(&self, settings: &mut Settings) {
        match (&self.u_name, &self.v_name) {
            (Some(u), v) => {
                settings.cohort.subject_label = Some(u.clone());
                if let Some(v) = v {
                    settings.cohort.comparison_label = Some(v.clone());
                }
            }
            (None, Some(v)) => {
                settings.cohort.subject_label = None;
                settings.cohort.comparison_label = Some(v.clone());
            }
            (None, None) => {}
        }
        if let Some(dir) = &self.results_dir {
            settings.output.results_dir = dir.clone();
        }
        if self.no_header {
            settings.cohort.has_header = false;
        }
        if self.sequential {
            settings.runner.parallel = false;
        }
    }
}
