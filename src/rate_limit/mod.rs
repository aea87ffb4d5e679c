//! Per-client fixed-window rate limiting.
//!
//! `RateLimiter` is created once with the application state and owns the
//! background task that sweeps expired windows. Call
//! [`RateLimiter::shutdown`] before the process exits.

pub mod client;
pub mod store;

use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::core::config::settings::RateLimitSettings;
use crate::core::errors::ApiError;

pub use client::client_identifier;
pub use store::{InMemoryStore, RateLimitEntry, RateLimitStore, WindowHit};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitOutcome {
    pub success: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset: DateTime<Utc>,
}

impl RateLimitOutcome {
    /// Whole seconds until the window resets, never less than one.
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> u64 {
        let millis = (self.reset - now).num_milliseconds().max(0) as u64;
        millis.div_ceil(1000).max(1)
    }
}

pub struct RateLimiter {
    limit: u32,
    window: Duration,
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
    shutdown_tx: watch::Sender<bool>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl RateLimiter {
    /// In-memory limiter on the system clock. Must run inside a Tokio runtime.
    pub fn in_memory(settings: &RateLimitSettings) -> Self {
        Self::new(settings, Arc::new(InMemoryStore::new()), Arc::new(SystemClock))
    }

    pub fn new(
        settings: &RateLimitSettings,
        store: Arc<dyn RateLimitStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sweeper = spawn_sweeper(
            store.clone(),
            clock.clone(),
            StdDuration::from_millis(settings.sweep_interval_ms),
            shutdown_rx,
        );

        Self {
            limit: settings.requests,
            window: Duration::milliseconds(settings.window_ms as i64),
            store,
            clock,
            shutdown_tx,
            sweeper: Mutex::new(Some(sweeper)),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn check(&self, identifier: &str) -> Result<RateLimitOutcome, ApiError> {
        let hit = self
            .store
            .hit(identifier, self.clock.now(), self.window, self.limit)
            .await?;

        let remaining = if hit.admitted {
            self.limit.saturating_sub(hit.entry.count)
        } else {
            0
        };

        Ok(RateLimitOutcome {
            success: hit.admitted,
            limit: self.limit,
            remaining,
            reset: hit.entry.reset_at,
        })
    }

    /// Stops the sweep task and waits for it to finish. Safe to call twice.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let handle = match self.sweeper.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                tracing::warn!("Rate limit sweeper ended abnormally: {}", err);
            }
        }
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

fn spawn_sweeper(
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
    period: StdDuration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = period.max(StdDuration::from_millis(1));
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match store.sweep(clock.now()).await {
                        Ok(0) => {}
                        Ok(removed) => tracing::debug!(removed, "Swept expired rate limit windows"),
                        Err(err) => tracing::warn!("Rate limit sweep failed: {}", err),
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("Rate limit sweeper stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct ManualClock(AtomicI64);

    impl ManualClock {
        fn at(ms: i64) -> Arc<Self> {
            Arc::new(Self(AtomicI64::new(ms)))
        }

        fn set(&self, ms: i64) {
            self.0.store(ms, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            DateTime::from_timestamp_millis(self.0.load(Ordering::SeqCst)).expect("valid timestamp")
        }
    }

    fn settings() -> RateLimitSettings {
        RateLimitSettings {
            requests: 20,
            window_ms: 60_000,
            sweep_interval_ms: 60_000,
        }
    }

    #[tokio::test]
    async fn twenty_per_minute_sequence() {
        let clock = ManualClock::at(1_000_000);
        let limiter = RateLimiter::new(&settings(), Arc::new(InMemoryStore::new()), clock.clone());

        let mut remaining = Vec::new();
        for _ in 0..20 {
            let outcome = limiter.check("10.0.0.1").await.expect("check");
            assert!(outcome.success);
            assert_eq!(outcome.limit, 20);
            remaining.push(outcome.remaining);
        }
        assert_eq!(remaining, (0..20).rev().collect::<Vec<u32>>());

        let refused = limiter.check("10.0.0.1").await.expect("check");
        assert!(!refused.success);
        assert_eq!(refused.remaining, 0);
        assert_eq!(refused.reset.timestamp_millis(), 1_060_000);

        clock.set(1_060_001);
        let renewed = limiter.check("10.0.0.1").await.expect("check");
        assert!(renewed.success);
        assert_eq!(renewed.remaining, 19);
        assert_eq!(renewed.reset.timestamp_millis(), 1_120_001);

        limiter.shutdown().await;
    }

    #[tokio::test]
    async fn identifiers_are_counted_separately() {
        let limiter = RateLimiter::new(
            &RateLimitSettings {
                requests: 1,
                ..settings()
            },
            Arc::new(InMemoryStore::new()),
            ManualClock::at(0),
        );

        assert!(limiter.check("a").await.expect("check").success);
        assert!(limiter.check("b").await.expect("check").success);
        assert!(!limiter.check("a").await.expect("check").success);

        limiter.shutdown().await;
    }

    #[tokio::test]
    async fn concurrent_checks_never_exceed_limit() {
        let limiter = Arc::new(RateLimiter::new(
            &settings(),
            Arc::new(InMemoryStore::new()),
            ManualClock::at(0),
        ));

        let mut tasks = Vec::new();
        for _ in 0..50 {
            let limiter = limiter.clone();
            tasks.push(tokio::spawn(async move {
                limiter.check("shared").await.expect("check").success
            }));
        }

        let mut admitted = 0;
        for task in tasks {
            if task.await.expect("task") {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 20);

        limiter.shutdown().await;
    }

    #[tokio::test]
    async fn sweeper_removes_expired_entries_until_shutdown() {
        let store = Arc::new(InMemoryStore::new());
        let clock = ManualClock::at(0);
        let limiter = RateLimiter::new(
            &RateLimitSettings {
                requests: 5,
                window_ms: 100,
                sweep_interval_ms: 10,
            },
            store.clone(),
            clock.clone(),
        );

        limiter.check("client").await.expect("check");
        assert_eq!(store.len().await, 1);

        clock.set(500);
        for _ in 0..100 {
            if store.is_empty().await {
                break;
            }
            tokio::time::sleep(StdDuration::from_millis(5)).await;
        }
        assert!(store.is_empty().await);

        limiter.shutdown().await;
        limiter.shutdown().await;
    }

    #[test]
    fn retry_after_rounds_up_to_whole_seconds() {
        let now = DateTime::from_timestamp_millis(0).expect("valid timestamp");
        let outcome = RateLimitOutcome {
            success: false,
            limit: 20,
            remaining: 0,
            reset: DateTime::from_timestamp_millis(1_500).expect("valid timestamp"),
        };
        assert_eq!(outcome.retry_after_secs(now), 2);

        let elapsed = DateTime::from_timestamp_millis(5_000).expect("valid timestamp");
        assert_eq!(outcome.retry_after_secs(elapsed), 1);
    }
}
