//! Lookup rate limiting.
//!
//! Token-bucket limiter gating calls to the geolocation provider. Tokens are
//! replenished by a background task at the configured rate; each lookup
//! consumes one token and blocks while the bucket is empty.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;

/// Token-bucket rate limiter for provider lookups.
pub struct RateLimiter {
    permits: Arc<Semaphore>,
    #[allow(dead_code)] // Read by tests; the replenishment task captures its own copy
    capacity: usize,
}

impl RateLimiter {
    /// Waits for a token. Consumed tokens are never returned; the background
    /// replenishment task is the only producer.
    pub async fn acquire(&self) {
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
    }
}

/// Initializes a token-bucket rate limiter.
///
/// Returns `None` when `rps` is 0 (rate limiting disabled). The bucket starts
/// full at `burst` tokens and never grows beyond it. The cancellation token
/// stops the background replenishment task on shutdown.
pub fn init_rate_limiter(rps: u32, burst: usize) -> Option<(Arc<RateLimiter>, CancellationToken)> {
    if rps == 0 {
        return None;
    }
    let capacity = burst.max(1);
    let shutdown = CancellationToken::new();
    let shutdown_clone = shutdown.clone();

    let limiter = Arc::new(RateLimiter {
        permits: Arc::new(Semaphore::new(capacity)),
        capacity,
    });

    let permits = Arc::clone(&limiter.permits);
    // Fast ticker; fractional tokens carry over so low rates still add up
    let mut ticker = interval(Duration::from_millis(100));
    tokio::spawn(async move {
        let mut last_time = tokio::time::Instant::now();
        let mut fractional = 0.0f64;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = tokio::time::Instant::now();
                    let elapsed = now.duration_since(last_time);
                    let earned = f64::from(rps) * elapsed.as_secs_f64() + fractional;
                    let whole = earned.floor();
                    fractional = earned - whole;

                    let available = permits.available_permits();
                    let headroom = capacity.saturating_sub(available);
                    let to_add = (whole as usize).min(headroom);
                    if to_add > 0 {
                        permits.add_permits(to_add);
                    }

                    last_time = now;
                }
                _ = shutdown_clone.cancelled() => {
                    log::debug!("Rate limiter background task shutting down");
                    break;
                }
            }
        }
    });

    Some((limiter, shutdown))
}
