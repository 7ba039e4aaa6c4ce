//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `log_geo` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use log_geo::initialization::init_logger_with;
use log_geo::{run_pipeline, Opt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    // This allows setting IP_GEOLOCATION_KEY in .env without exporting it manually
    // Try loading from current directory first, then from the executable's directory
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let opt = Opt::parse();

    let log_level = opt.log_level.clone();
    let log_format = opt.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    match run_pipeline(opt).await {
        Ok(report) => {
            println!(
                "✅ Enriched {} candidate address{} ({} from cache, {} fetched, {} failed) in {:.1}s",
                report.candidates,
                if report.candidates == 1 { "" } else { "es" },
                report.cache_hits,
                report.fetched,
                report.failed,
                report.elapsed_seconds
            );
            println!("Results saved in {}", report.db_path.display());
            Ok(())
        }
        Err(e) => {
            eprintln!("log_geo error: {:#}", e);
            process::exit(1);
        }
    }
}
