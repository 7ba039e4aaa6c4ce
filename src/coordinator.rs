//! Concurrent enrichment of the candidate address set.
//!
//! Partitions the candidates into disjoint contiguous chunks, one per worker,
//! and drives a fixed pool of workers over them. Workers share no state
//! beyond atomic counters; all coordination is mediated through the store.
//! Because the chunks are disjoint, get-then-put for a given address is never
//! contended across workers and needs no transaction.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use log::{debug, error, warn};

use crate::error_handling::{EnrichmentStats, FailureKind, StoreError};
use crate::provider::GeoProvider;
use crate::rate_limiter::RateLimiter;
use crate::store::GeoStore;

/// Outcome totals for one enrichment run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentSummary {
    /// Candidate addresses handed to the worker pool
    pub candidates: usize,
    /// Addresses already present in the store
    pub cache_hits: usize,
    /// Addresses fetched and inserted this run
    pub fetched: usize,
    /// Addresses left unenriched (lookup or store failure)
    pub failed: usize,
}

/// Splits the candidate list into at most `workers` disjoint contiguous chunks.
///
/// Chunks are sized by ceiling division so every candidate is assigned to
/// exactly one chunk; a remainder shortens the last chunk instead of dropping
/// addresses. Disjointness of the chunks is the core correctness invariant of
/// the enrichment run.
pub fn partition(candidates: Vec<String>, workers: usize) -> Vec<Vec<String>> {
    if candidates.is_empty() {
        return Vec::new();
    }
    let workers = workers.max(1);
    let chunk_size = candidates.len().div_ceil(workers);
    candidates
        .chunks(chunk_size)
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Enriches every candidate address with bounded parallelism.
///
/// Each worker runs independently over its chunk: `get` from the store, on a
/// miss `fetch` from the provider, on success `put` the record back. A
/// failure of any single address is isolated to that address; the worker
/// continues with the rest of its chunk. Blocks until every worker has
/// processed its entire chunk.
pub async fn enrich(
    store: &GeoStore,
    provider: Arc<dyn GeoProvider>,
    limiter: Option<Arc<RateLimiter>>,
    candidates: Vec<String>,
    workers: usize,
    stats: &Arc<EnrichmentStats>,
) -> EnrichmentSummary {
    let total_candidates = candidates.len();
    if total_candidates == 0 {
        return EnrichmentSummary::default();
    }

    let cache_hits = Arc::new(AtomicUsize::new(0));
    let fetched = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    let mut tasks = FuturesUnordered::new();
    for (worker_id, chunk) in partition(candidates, workers).into_iter().enumerate() {
        let store = store.clone();
        let provider = Arc::clone(&provider);
        let limiter = limiter.clone();
        let stats = Arc::clone(stats);
        let cache_hits = Arc::clone(&cache_hits);
        let fetched = Arc::clone(&fetched);
        let failed = Arc::clone(&failed);

        tasks.push(tokio::spawn(async move {
            for address in chunk {
                match store.get(&address).await {
                    Ok(Some(_)) => {
                        debug!("worker {worker_id}: cache hit for {address}");
                        cache_hits.fetch_add(1, Ordering::SeqCst);
                        continue;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!("worker {worker_id}: store lookup failed for {address}: {e}");
                        stats.increment(FailureKind::StoreUnavailable);
                        failed.fetch_add(1, Ordering::SeqCst);
                        continue;
                    }
                }

                if let Some(ref limiter) = limiter {
                    limiter.acquire().await;
                }

                let record = match provider.fetch(&address).await {
                    Ok(record) => record,
                    Err(e) => {
                        warn!("worker {worker_id}: lookup failed for {address}: {e}");
                        stats.increment(FailureKind::from(&e));
                        failed.fetch_add(1, Ordering::SeqCst);
                        continue;
                    }
                };

                match store.put(&record).await {
                    Ok(()) => {
                        debug!("worker {worker_id}: fetched and stored {address}");
                        fetched.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e @ StoreError::DuplicateKey { .. }) => {
                        // Disjoint chunks make this unreachable; reaching it
                        // means the partition invariant broke upstream.
                        error!("worker {worker_id}: {e}");
                        stats.increment(FailureKind::DuplicateKey);
                        failed.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => {
                        warn!("worker {worker_id}: store write failed for {address}: {e}");
                        stats.increment(FailureKind::StoreUnavailable);
                        failed.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
        }));
    }

    while let Some(task_result) = tasks.next().await {
        if let Err(join_error) = task_result {
            warn!("Enrichment worker panicked: {join_error:?}");
            stats.increment(FailureKind::WorkerPanic);
        }
    }

    EnrichmentSummary {
        candidates: total_candidates,
        cache_hits: cache_hits.load(Ordering::SeqCst),
        fetched: fetched.load(Ordering::SeqCst),
        failed: failed.load(Ordering::SeqCst),
    }
}
