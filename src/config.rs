use std::path::PathBuf;

use clap::{Parser, ValueEnum};

// constants (used as defaults)
pub const DEFAULT_ACCESS_LOG_PATH: &str = "/var/log/nginx/access.log";
pub const DEFAULT_FALLBACK_DIR: &str = "./nginx";
pub const DB_PATH: &str = "./iplocation.db";

/// Environment variable holding the geolocation API credential.
pub const API_KEY_ENV: &str = "IP_GEOLOCATION_KEY";

/// Base URL of the geolocation lookup service.
///
/// Overridable via `--api-base` so tests can point the client at a local stub.
pub const DEFAULT_API_BASE: &str = "https://api.ipgeolocation.io";

/// How many of the most frequent client addresses are enriched per run.
pub const DEFAULT_TOP_ADDRESSES: usize = 3000;

/// Fixed size of the enrichment worker pool.
pub const DEFAULT_WORKER_COUNT: usize = 10;

/// How many entries each report section shows.
pub const REPORT_TOP_N: usize = 10;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace). Used with the `--log-level` CLI option.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// Controls how log messages are formatted:
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Plain,
    Json,
}

/// Command-line options and configuration.
///
/// This struct is automatically generated by `clap` from the field attributes.
/// All options have sensible defaults and can be overridden via command-line flags.
///
/// # Examples
///
/// ```bash
/// # Basic usage (reads /var/log/nginx/access.log)
/// log_geo
///
/// # Against a local log copy with a smaller pool
/// log_geo ./nginx/access.log --workers 4
///
/// # With a custom database path
/// log_geo --db-path ./custom.db
/// ```
#[derive(Debug, Clone, Parser)]
#[command(
    name = "log_geo",
    about = "Parses an nginx access log and enriches client addresses with geolocation data."
)]
pub struct Opt {
    /// Access log file to read
    #[arg(value_parser, default_value = DEFAULT_ACCESS_LOG_PATH)]
    pub file: PathBuf,

    /// Directory searched for a same-named log copy when `file` is missing
    #[arg(long, value_parser, default_value = DEFAULT_FALLBACK_DIR)]
    pub fallback_dir: PathBuf,

    /// Database path (SQLite file)
    #[arg(long, value_parser, default_value = DB_PATH)]
    pub db_path: PathBuf,

    /// Enrich only the N most frequent client addresses
    #[arg(long, default_value_t = DEFAULT_TOP_ADDRESSES)]
    pub top: usize,

    /// Number of enrichment workers (each processes one chunk of addresses)
    #[arg(long, default_value_t = DEFAULT_WORKER_COUNT)]
    pub workers: usize,

    /// Per-lookup timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_seconds: u64,

    /// Lookup requests per second rate limit (0 disables limiting)
    ///
    /// The free ipgeolocation.io tier throttles aggressively; enable this when
    /// enriching large address sets to stay under the provider's ceiling.
    #[arg(long, default_value_t = 0)]
    pub rate_limit_rps: u32,

    /// Geolocation API base URL
    #[arg(long, default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Skip the aggregate traffic report after enrichment
    #[arg(long, default_value_t = false)]
    pub skip_report: bool,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,
}

impl Default for Opt {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_ACCESS_LOG_PATH),
            fallback_dir: PathBuf::from(DEFAULT_FALLBACK_DIR),
            db_path: PathBuf::from(DB_PATH),
            top: DEFAULT_TOP_ADDRESSES,
            workers: DEFAULT_WORKER_COUNT,
            timeout_seconds: 10,
            rate_limit_rps: 0,
            api_base: DEFAULT_API_BASE.to_string(),
            skip_report: false,
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Info),
            log::LevelFilter::Info
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_defaults_match_cli_defaults() {
        let opt = Opt::default();
        assert_eq!(opt.file, PathBuf::from(DEFAULT_ACCESS_LOG_PATH));
        assert_eq!(opt.db_path, PathBuf::from(DB_PATH));
        assert_eq!(opt.top, DEFAULT_TOP_ADDRESSES);
        assert_eq!(opt.workers, DEFAULT_WORKER_COUNT);
        assert_eq!(opt.rate_limit_rps, 0);
        assert!(!opt.skip_report);
    }
}
