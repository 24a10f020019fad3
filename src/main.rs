use clap::Parser;
use cohort_match::cli::{Cli, Commands};
use cohort_match::config::{LoggingSettings, Settings, SettingsError};
use cohort_match::run_matching;
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LoggingSettings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings, SettingsError> {
    match path {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let mut settings = match load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&settings.logging);

    match cli.command {
        Commands::Config => match settings.to_toml() {
            Ok(rendered) => {
                print!("{}", rendered);
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("{}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Run(args) => {
            args.apply(&mut settings);
            if let Err(e) = settings.validate() {
                error!("Invalid configuration: {}", e);
                eprintln!("Invalid configuration: {}", e);
                return ExitCode::FAILURE;
            }

            if !args.file.exists() {
                println!("Could not find csv file: {}", args.file.display());
                println!("Abort!");
                return ExitCode::FAILURE;
            }
            info!("csv exists ...");

            match run_matching(&settings, &args.file).await {
                Ok(outcome) => {
                    for result in &outcome.results {
                        println!(
                            "{:>4} {:<12} edges: {:>4}  total gap: {:>6}  effective gap: {:>6}",
                            result.stratum.sex.label(),
                            result.stratum.exponent.name,
                            result.cardinality(),
                            result.total_gap,
                            result.effective_gap
                        );
                    }
                    info!(
                        "Wrote {} strata to {}",
                        outcome.results.len(),
                        outcome.results_dir.display()
                    );
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("Matching failed: {}", e);
                    eprintln!("Error: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}
