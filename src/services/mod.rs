// Service exports
pub mod extractor;
pub mod output;

pub use extractor::{CohortExtractor, ExtractError, Extraction};
pub use output::{stratum_file_name, DirectorySink, OutputError, ReportFormat, StratumSink};
