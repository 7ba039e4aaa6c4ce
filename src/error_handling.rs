//! Error types and enrichment failure statistics.
//!
//! This module defines the typed errors used throughout the pipeline and a
//! thread-safe counter set that tallies failure kinds during an enrichment run.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{info, SetLoggerError};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] reqwest::Error),
}

/// Error types for the persistent geolocation store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error creating the database file.
    #[error("Store file creation error: {0}")]
    FileCreation(String),

    /// The underlying storage could not be opened, read, or written.
    #[error("Geolocation store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    /// A record already exists for the address.
    ///
    /// Chunk partitioning guarantees no two workers ever share an address, so
    /// this surfacing at runtime signals a broken partition, not a routine
    /// conflict.
    #[error("Geolocation record already exists for {address}")]
    DuplicateKey { address: String },
}

/// Error types for geolocation lookups.
///
/// A lookup failure is never retried within a run; the address is simply left
/// unenriched until a future run misses on it again.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider rejected the request due to rate limiting (HTTP 429).
    #[error("Lookup rate limited")]
    RateLimited,

    /// The provider has no data for the address.
    #[error("Address not found by provider")]
    NotFound,

    /// Any other non-success HTTP status.
    #[error("Lookup failed with HTTP status {0}")]
    Status(u16),

    /// The lookup did not complete within the configured timeout.
    #[error("Lookup timed out")]
    Timeout,

    /// Transport-level failure (connection, TLS, body decode).
    #[error("Lookup transport error: {0}")]
    Transport(#[source] reqwest::Error),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Transport(e)
        }
    }
}

/// Kinds of per-address failures that can occur during enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum FailureKind {
    StoreUnavailable,
    DuplicateKey,
    ProviderRateLimited,
    ProviderNotFound,
    ProviderStatus,
    ProviderTimeout,
    ProviderTransport,
    WorkerPanic,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::StoreUnavailable => "Store unavailable",
            FailureKind::DuplicateKey => "Duplicate key (partition violation)",
            FailureKind::ProviderRateLimited => "Lookup rate limited",
            FailureKind::ProviderNotFound => "Address not found",
            FailureKind::ProviderStatus => "Lookup HTTP error",
            FailureKind::ProviderTimeout => "Lookup timeout",
            FailureKind::ProviderTransport => "Lookup transport error",
            FailureKind::WorkerPanic => "Worker panic",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&ProviderError> for FailureKind {
    fn from(e: &ProviderError) -> Self {
        match e {
            ProviderError::RateLimited => FailureKind::ProviderRateLimited,
            ProviderError::NotFound => FailureKind::ProviderNotFound,
            ProviderError::Status(_) => FailureKind::ProviderStatus,
            ProviderError::Timeout => FailureKind::ProviderTimeout,
            ProviderError::Transport(_) => FailureKind::ProviderTransport,
        }
    }
}

/// Thread-safe failure statistics for one enrichment run.
///
/// Counts each [`FailureKind`] with atomic counters so workers can record
/// failures concurrently. All kinds are initialized to zero on creation and
/// the struct is shared across workers via `Arc`.
pub struct EnrichmentStats {
    failures: HashMap<FailureKind, AtomicUsize>,
}

impl EnrichmentStats {
    pub fn new() -> Self {
        let mut failures = HashMap::new();
        for kind in FailureKind::iter() {
            failures.insert(kind, AtomicUsize::new(0));
        }
        EnrichmentStats { failures }
    }

    /// Increment a failure counter.
    ///
    /// All kinds are initialized in the constructor, so the lookup can only
    /// miss if a new enum variant was not added to `new()`.
    pub fn increment(&self, kind: FailureKind) {
        if let Some(counter) = self.failures.get(&kind) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment failure counter for {:?} which is not in the map.",
                kind
            );
        }
    }

    /// Get the count for a failure kind.
    pub fn get_count(&self, kind: FailureKind) -> usize {
        self.failures
            .get(&kind)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Get total failure count across all kinds.
    pub fn total(&self) -> usize {
        FailureKind::iter().map(|k| self.get_count(k)).sum()
    }
}

impl Default for EnrichmentStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Prints non-zero failure counts to the log.
pub fn print_failure_statistics(stats: &EnrichmentStats) {
    let total = stats.total();
    if total == 0 {
        return;
    }

    info!("Failure Counts ({} total):", total);
    for kind in FailureKind::iter() {
        let count = stats.get_count(kind);
        if count > 0 {
            info!("   {}: {}", kind.as_str(), count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_as_str() {
        assert_eq!(FailureKind::StoreUnavailable.as_str(), "Store unavailable");
        assert_eq!(FailureKind::ProviderTimeout.as_str(), "Lookup timeout");
        assert_eq!(
            FailureKind::DuplicateKey.as_str(),
            "Duplicate key (partition violation)"
        );
    }

    #[test]
    fn test_all_failure_kinds_have_string_representation() {
        for kind in FailureKind::iter() {
            assert!(
                !kind.as_str().is_empty(),
                "{:?} should have non-empty string",
                kind
            );
        }
    }

    #[test]
    fn test_stats_increment_and_totals() {
        let stats = EnrichmentStats::new();
        assert_eq!(stats.total(), 0);

        stats.increment(FailureKind::ProviderTimeout);
        stats.increment(FailureKind::ProviderTimeout);
        stats.increment(FailureKind::StoreUnavailable);

        assert_eq!(stats.get_count(FailureKind::ProviderTimeout), 2);
        assert_eq!(stats.get_count(FailureKind::StoreUnavailable), 1);
        assert_eq!(stats.get_count(FailureKind::DuplicateKey), 0);
        assert_eq!(stats.total(), 3);
    }

    #[test]
    fn test_failure_kind_from_provider_error() {
        assert_eq!(
            FailureKind::from(&ProviderError::RateLimited),
            FailureKind::ProviderRateLimited
        );
        assert_eq!(
            FailureKind::from(&ProviderError::NotFound),
            FailureKind::ProviderNotFound
        );
        assert_eq!(
            FailureKind::from(&ProviderError::Status(500)),
            FailureKind::ProviderStatus
        );
        assert_eq!(
            FailureKind::from(&ProviderError::Timeout),
            FailureKind::ProviderTimeout
        );
    }

    #[test]
    fn test_print_failure_statistics_does_not_panic() {
        let stats = EnrichmentStats::new();
        print_failure_statistics(&stats);

        stats.increment(FailureKind::ProviderNotFound);
        print_failure_statistics(&stats);
    }
}
