//! Bounded notification worker pool.
//!
//! # Responsibility
//! - Run sink calls off the request thread on a dedicated tokio runtime.
//! - Bound in-flight work and give each job a deadline.
//! - Drain or abandon outstanding work deterministically.
//!
//! # Invariants
//! - At most `capacity` jobs are in flight; extra jobs are dropped and
//!   counted, never queued.
//! - A job's permit is released only after its outcome is counted.
//! - `drain` and `shutdown` must not be called from inside a tokio runtime.

use crate::notify::{Notification, NotificationSink};
use log::{info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::Semaphore;

/// Pool sizing and per-job deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanoutSettings {
    pub workers: usize,
    /// Maximum in-flight jobs.
    pub capacity: u32,
    pub job_deadline: Duration,
}

impl Default for FanoutSettings {
    fn default() -> Self {
        Self {
            workers: 2,
            capacity: 64,
            job_deadline: Duration::from_secs(5),
        }
    }
}

/// Counter snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutStats {
    pub submitted: u64,
    pub delivered: u64,
    pub failed: u64,
    /// Rejected because the pool was full.
    pub dropped: u64,
    pub timed_out: u64,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    timed_out: AtomicU64,
}

/// Fire-and-forget dispatcher with bounded concurrency.
pub struct NotificationFanout {
    runtime: Runtime,
    permits: Arc<Semaphore>,
    capacity: u32,
    job_deadline: Duration,
    sink: Arc<dyn NotificationSink>,
    counters: Arc<Counters>,
}

impl NotificationFanout {
    /// Starts the worker runtime.
    ///
    /// # Errors
    /// - Returns an error when the tokio runtime cannot be built.
    pub fn new(
        settings: FanoutSettings,
        sink: Arc<dyn NotificationSink>,
    ) -> std::io::Result<Self> {
        let workers = settings.workers.max(1);
        let capacity = settings.capacity.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(workers)
            .thread_name("feed-fanout")
            .enable_time()
            .build()?;

        info!(
            "event=fanout_start module=notify status=ok workers={} capacity={} deadline_ms={}",
            workers,
            capacity,
            settings.job_deadline.as_millis()
        );

        Ok(Self {
            runtime,
            permits: Arc::new(Semaphore::new(capacity as usize)),
            capacity,
            job_deadline: settings.job_deadline,
            sink,
            counters: Arc::new(Counters::default()),
        })
    }

    /// Submits one notification. Returns `false` when the pool is full and
    /// the notification was dropped.
    pub fn dispatch(&self, notification: Notification) -> bool {
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        let permit = match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "event=notification_dropped module=notify status=warn recipient_id={} reason=pool_full",
                    notification.recipient.id
                );
                return false;
            }
        };

        let sink = Arc::clone(&self.sink);
        let counters = Arc::clone(&self.counters);
        let deadline = self.job_deadline;
        self.runtime.spawn(async move {
            let _permit = permit;
            let recipient_id = notification.recipient.id;
            let job = tokio::task::spawn_blocking(move || sink.send(&notification));
            match tokio::time::timeout(deadline, job).await {
                Ok(Ok(Ok(()))) => {
                    counters.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Ok(Ok(Err(err))) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        "event=notification_send module=notify status=error recipient_id={} error={}",
                        recipient_id, err
                    );
                }
                Ok(Err(join_err)) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        "event=notification_send module=notify status=error recipient_id={} error=sink_panicked detail={}",
                        recipient_id, join_err
                    );
                }
                Err(_) => {
                    counters.timed_out.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        "event=notification_send module=notify status=timeout recipient_id={} deadline_ms={}",
                        recipient_id,
                        deadline.as_millis()
                    );
                }
            }
        });
        true
    }

    /// Waits until no job is in flight. Returns `false` on timeout.
    pub fn drain(&self, timeout: Duration) -> bool {
        let permits = Arc::clone(&self.permits);
        let capacity = self.capacity;
        self.runtime.block_on(async move {
            matches!(
                tokio::time::timeout(timeout, permits.acquire_many(capacity)).await,
                Ok(Ok(_))
            )
        })
    }

    pub fn stats(&self) -> FanoutStats {
        FanoutStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            timed_out: self.counters.timed_out.load(Ordering::Relaxed),
        }
    }

    /// Drains for up to `grace`, then abandons anything still running.
    pub fn shutdown(self, grace: Duration) {
        let drained = self.drain(grace);
        let stats = self.stats();
        self.runtime.shutdown_timeout(grace);
        info!(
            "event=fanout_stop module=notify status={} submitted={} delivered={} failed={} dropped={} timed_out={}",
            if drained { "ok" } else { "abandoned" },
            stats.submitted,
            stats.delivered,
            stats.failed,
            stats.dropped,
            stats.timed_out
        );
    }
}
