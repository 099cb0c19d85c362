//! Load generation: concurrent workers, deadline races and escalating
//! sequential batches.
//!
//! Timing uses `tokio::time::Instant`, so tests under a paused clock see
//! deterministic durations.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::{HarnessError, Result};

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Outcome of a load run.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub workers: usize,
    pub operations: usize,
    /// Wall clock from first launch to last completion.
    pub duration: Duration,
    /// One entry per operation, sorted ascending.
    pub latencies: Vec<Duration>,
}

impl LoadReport {
    fn new(workers: usize, duration: Duration, mut latencies: Vec<Duration>) -> Self {
        latencies.sort_unstable();
        Self {
            workers,
            operations: latencies.len(),
            duration,
            latencies,
        }
    }

    /// Operations per second over the whole run.
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            return f64::INFINITY;
        }
        self.operations as f64 / secs
    }

    /// Nearest-rank percentile, `p` in `0.0..=100.0`.
    pub fn percentile(&self, p: f64) -> Option<Duration> {
        if self.latencies.is_empty() {
            return None;
        }
        let p = p.clamp(0.0, 100.0);
        let rank = ((p / 100.0) * self.latencies.len() as f64).ceil() as usize;
        let idx = rank.saturating_sub(1).min(self.latencies.len() - 1);
        Some(self.latencies[idx])
    }

    pub fn mean(&self) -> Option<Duration> {
        if self.latencies.is_empty() {
            return None;
        }
        let total: Duration = self.latencies.iter().sum();
        Some(total / self.latencies.len() as u32)
    }

    /// Sanity ceiling on total duration.
    pub fn assert_within(&self, ceiling: Duration) -> Result<()> {
        if self.duration > ceiling {
            return Err(HarnessError::Assertion(format!(
                "expected {} operations to complete within {ceiling:?}, took {:?}",
                self.operations, self.duration
            )));
        }
        Ok(())
    }

    pub fn assert_min_throughput(&self, min_ops_per_sec: f64) -> Result<()> {
        let actual = self.throughput();
        if actual < min_ops_per_sec {
            return Err(HarnessError::Assertion(format!(
                "throughput too low: {actual:.2} ops/sec (expected at least {min_ops_per_sec:.2})"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} operations across {} worker(s) in {:?} ({:.2} ops/sec)",
            self.operations,
            self.workers,
            self.duration,
            self.throughput()
        )?;
        if let (Some(p50), Some(p95), Some(max)) = (
            self.percentile(50.0),
            self.percentile(95.0),
            self.latencies.last(),
        ) {
            write!(f, ", p50 {p50:?}, p95 {p95:?}, max {max:?}")?;
        }
        Ok(())
    }
}

/// One escalating batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub size: usize,
    pub elapsed: Duration,
    pub allowance: Duration,
}

// ---------------------------------------------------------------------------
// Drivers
// ---------------------------------------------------------------------------

/// Run `op(worker, i)` `ops_per_worker` times on each of `workers` tasks.
///
/// Calls within one worker run in order, with no ordering across workers.
/// Waits for every worker even after one fails, then returns the first
/// failure by worker index.
pub async fn run_concurrent<F, Fut>(
    workers: usize,
    ops_per_worker: usize,
    op: F,
) -> Result<LoadReport>
where
    F: Fn(usize, usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let op = Arc::new(op);
    let started = Instant::now();

    let handles: Vec<_> = (0..workers)
        .map(|worker| {
            let op = op.clone();
            tokio::spawn(async move {
                let mut latencies = Vec::with_capacity(ops_per_worker);
                for i in 0..ops_per_worker {
                    let call_started = Instant::now();
                    op(worker, i).await.map_err(|source| HarnessError::Worker {
                        worker,
                        operation: i,
                        source: Box::new(source),
                    })?;
                    latencies.push(call_started.elapsed());
                }
                debug!(worker, ops = ops_per_worker, "worker finished");
                Ok::<_, HarnessError>(latencies)
            })
        })
        .collect();

    let mut latencies = Vec::with_capacity(workers * ops_per_worker);
    let mut first_error = None;
    for (worker, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(Ok(mut worker_latencies)) => latencies.append(&mut worker_latencies),
            Ok(Err(err)) => {
                first_error.get_or_insert(err);
            }
            Err(join_err) => {
                first_error.get_or_insert(HarnessError::WorkerPanicked {
                    worker,
                    message: join_err.to_string(),
                });
            }
        }
    }
    let duration = started.elapsed();

    if let Some(err) = first_error {
        return Err(err);
    }

    let report = LoadReport::new(workers, duration, latencies);
    info!(report = %report, "concurrent load completed");
    Ok(report)
}

/// Race `op` against `deadline`.
///
/// On timeout the operation's future is dropped, which cancels it. Any
/// tool call it had in flight is abandoned and the session notifies the
/// server.
pub async fn run_with_deadline<T, Fut>(operation: &str, deadline: Duration, op: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    match tokio::time::timeout(deadline, op).await {
        Ok(result) => result,
        Err(_) => Err(HarnessError::Timeout {
            operation: operation.to_string(),
            deadline,
        }),
    }
}

/// Run `op` `n` times in sequence for each `n` in `sizes`; each batch must
/// finish within `n * allowance_per_op`.
pub async fn run_escalating_batches<F, Fut>(
    sizes: &[usize],
    allowance_per_op: Duration,
    mut op: F,
) -> Result<Vec<BatchReport>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut reports = Vec::with_capacity(sizes.len());
    for &size in sizes {
        let allowance = allowance_per_op.saturating_mul(size as u32);
        let started = Instant::now();
        for i in 0..size {
            op(i).await?;
        }
        let elapsed = started.elapsed();
        info!(size, ?elapsed, ?allowance, "batch completed");

        if elapsed > allowance {
            return Err(HarnessError::BatchTooSlow {
                size,
                elapsed,
                allowance,
            });
        }
        reports.push(BatchReport {
            size,
            elapsed,
            allowance,
        });
    }
    Ok(reports)
}

/// `n` operations on the current task, one after another.
pub async fn run_sequential<F, Fut>(n: usize, mut op: F) -> Result<LoadReport>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let started = Instant::now();
    let mut latencies = Vec::with_capacity(n);
    for i in 0..n {
        let call_started = Instant::now();
        op(i).await?;
        latencies.push(call_started.elapsed());
    }
    let report = LoadReport::new(1, started.elapsed(), latencies);
    info!(report = %report, "sequential load completed");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn concurrent_runs_every_operation() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let report = run_concurrent(5, 10, move |_, _| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await
        .unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 50);
        assert_eq!(report.operations, 50);
        assert_eq!(report.workers, 5);
    }

    #[tokio::test]
    async fn concurrent_reports_failing_worker() {
        let err = run_concurrent(3, 4, |worker, i| async move {
            if worker == 1 && i == 2 {
                Err(HarnessError::Assertion("bad response".to_string()))
            } else {
                Ok(())
            }
        })
        .await
        .unwrap_err();

        match err {
            HarnessError::Worker {
                worker, operation, ..
            } => {
                assert_eq!(worker, 1);
                assert_eq!(operation, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn concurrent_reports_panicking_worker() {
        let err = run_concurrent(2, 1, |worker, _| async move {
            if worker == 0 {
                panic!("worker blew up");
            }
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, HarnessError::WorkerPanicked { worker: 0, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_times_out_slow_operation() {
        let err = run_with_deadline("slow_op", Duration::from_secs(1), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "slow_op operation timed out after 1s");
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_passes_through_result() {
        let value = run_with_deadline("fast_op", Duration::from_secs(5), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(42)
        })
        .await
        .unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test(start_paused = true)]
    async fn escalating_batches_flag_slow_batch() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        // 10ms per op until the batch of 5, then 100ms.
        let err = run_escalating_batches(&[1, 3, 5], Duration::from_millis(50), |_| {
            let calls = CALLS.fetch_add(1, Ordering::SeqCst);
            async move {
                let delay = if calls >= 4 { 100 } else { 10 };
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(())
            }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, HarnessError::BatchTooSlow { size: 5, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn escalating_batches_report_each_size() {
        let reports = run_escalating_batches(&[1, 5, 10], Duration::from_millis(100), |_| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(())
        })
        .await
        .unwrap();
        let sizes: Vec<_> = reports.iter().map(|r| r.size).collect();
        assert_eq!(sizes, vec![1, 5, 10]);
        assert_eq!(reports[2].allowance, Duration::from_secs(1));
        assert!(reports[2].elapsed >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_report_statistics() {
        let report = run_sequential(4, |i| async move {
            tokio::time::sleep(Duration::from_millis(10 * (i as u64 + 1))).await;
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(report.operations, 4);
        assert!(report.duration >= Duration::from_millis(100));
        assert!(report.duration < Duration::from_millis(110));

        let p50 = report.percentile(50.0).unwrap();
        let max = report.percentile(100.0).unwrap();
        assert!(p50 >= Duration::from_millis(20) && p50 < Duration::from_millis(30));
        assert!(max >= Duration::from_millis(40));
        assert!(report.mean().unwrap() >= Duration::from_millis(25));
        report.assert_min_throughput(10.0).unwrap();
        assert!(report.assert_within(Duration::from_millis(50)).is_err());
    }
}
