//! log_geo library: access log geolocation enrichment
//!
//! This library parses an nginx access log, selects the most frequent client
//! addresses, and enriches each address with geolocation metadata from a
//! remote lookup service. Results are cached in a local SQLite database so an
//! address is fetched at most once across runs, and at most once across all
//! workers within a run.
//!
//! # Example
//!
//! ```no_run
//! use log_geo::{run_pipeline, Opt};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let opt = Opt {
//!     file: std::path::PathBuf::from("./nginx/access.log"),
//!     workers: 4,
//!     ..Default::default()
//! };
//!
//! let report = run_pipeline(opt).await?;
//! println!("Enriched {} of {} candidate addresses",
//!          report.fetched, report.candidates);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or ensure you're calling library functions within an async
//! context.

pub mod config;
mod coordinator;
mod error_handling;
pub mod initialization;
mod input;
mod models;
mod parser;
mod provider;
mod rate_limiter;
mod report;
mod selector;
mod store;

// Re-export public API
pub use config::{LogFormat, LogLevel, Opt};
pub use coordinator::{enrich, partition, EnrichmentSummary};
pub use error_handling::{
    print_failure_statistics, EnrichmentStats, FailureKind, InitializationError, ProviderError,
    StoreError,
};
pub use models::GeoRecord;
pub use parser::{LogParser, LogRecord, ParseStats};
pub use provider::{GeoProvider, IpGeolocationClient};
pub use rate_limiter::{init_rate_limiter, RateLimiter};
pub use run::{run_pipeline, RunReport};
pub use selector::{candidate_addresses, distinct_count, top_by};
pub use store::GeoStore;

// Internal run module (contains the main pipeline logic)
mod run {
    use std::path::PathBuf;
    use std::sync::Arc;

    use anyhow::{Context, Result};
    use log::{info, warn};

    use crate::config::{self, Opt};
    use crate::coordinator;
    use crate::error_handling::{self, EnrichmentStats};
    use crate::initialization::init_client;
    use crate::parser::LogParser;
    use crate::provider::{GeoProvider, IpGeolocationClient};
    use crate::store::GeoStore;
    use crate::{input, rate_limiter, report, selector};

    /// Results of one enrichment run.
    #[derive(Debug, Clone)]
    pub struct RunReport {
        /// Raw lines read from the access log
        pub total_lines: usize,
        /// Lines parsed into records
        pub parsed: usize,
        /// Lines skipped (pattern or timestamp mismatch)
        pub unmatched: usize,
        /// Candidate addresses handed to the worker pool
        pub candidates: usize,
        /// Addresses already present in the store
        pub cache_hits: usize,
        /// Addresses fetched and stored this run
        pub fetched: usize,
        /// Addresses left unenriched this run
        pub failed: usize,
        /// Path to the SQLite database containing the enriched dataset
        pub db_path: PathBuf,
        /// Elapsed time in seconds
        pub elapsed_seconds: f64,
    }

    /// Runs the full enrichment pipeline with the provided configuration.
    ///
    /// Reads the access log (falling back per the configuration when the
    /// primary path is missing, and proceeding with zero records when neither
    /// exists), parses it, selects the most frequent client addresses, and
    /// drives the enrichment worker pool against the persistent store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be initialized or the HTTP client
    /// cannot be built. Per-address lookup and storage failures are counted
    /// and logged, never propagated.
    pub async fn run_pipeline(opt: Opt) -> Result<RunReport> {
        let start_time = std::time::Instant::now();

        let lines = input::read_log_lines(&opt.file, &opt.fallback_dir).await;
        let parser = LogParser::new();
        let (records, parse_stats) = parser.parse_lines(lines);

        let candidates = selector::candidate_addresses(&records, Some(opt.top));
        info!(
            "Selected {} candidate address(es) for enrichment",
            candidates.len()
        );

        let store = GeoStore::open(&opt.db_path)
            .await
            .context("Failed to initialize geolocation store")?;

        let api_key = std::env::var(config::API_KEY_ENV).unwrap_or_default();
        if api_key.is_empty() && !candidates.is_empty() {
            warn!(
                "{} is not set; geolocation lookups will be rejected by the provider",
                config::API_KEY_ENV
            );
        }
        let client = init_client(opt.timeout_seconds).context("Failed to initialize HTTP client")?;
        let provider: Arc<dyn GeoProvider> =
            Arc::new(IpGeolocationClient::new(client, api_key, opt.api_base.clone()));

        let rate_burst = if opt.rate_limit_rps > 0 {
            std::cmp::min(
                opt.workers.max(1),
                (opt.rate_limit_rps as usize).saturating_mul(2),
            )
        } else {
            opt.workers.max(1)
        };
        let (request_limiter, limiter_shutdown) =
            match rate_limiter::init_rate_limiter(opt.rate_limit_rps, rate_burst) {
                Some((limiter, shutdown)) => (Some(limiter), Some(shutdown)),
                None => (None, None),
            };

        let stats = Arc::new(EnrichmentStats::new());
        let summary = coordinator::enrich(
            &store,
            provider,
            request_limiter,
            candidates,
            opt.workers,
            &stats,
        )
        .await;

        if let Some(shutdown) = limiter_shutdown {
            shutdown.cancel();
        }

        info!(
            "Enrichment finished: {} candidate(s), {} cache hit(s), {} fetched, {} failed",
            summary.candidates, summary.cache_hits, summary.fetched, summary.failed
        );
        error_handling::print_failure_statistics(&stats);

        if !opt.skip_report {
            match store.all().await {
                Ok(geo_records) => report::print_report(&records, &geo_records),
                Err(e) => warn!("Skipping report; failed to scan geolocation store: {e}"),
            }
        }

        store.close().await;

        Ok(RunReport {
            total_lines: parse_stats.total,
            parsed: parse_stats.matched,
            unmatched: parse_stats.unmatched,
            candidates: summary.candidates,
            cache_hits: summary.cache_hits,
            fetched: summary.fetched,
            failed: summary.failed,
            db_path: opt.db_path.clone(),
            elapsed_seconds: start_time.elapsed().as_secs_f64(),
        })
    }
}
