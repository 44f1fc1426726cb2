//! Background worker loops shared by the sync, retry, and health-check
//! tasks (spec §4.4, §4.5, §4.6).
//!
//! The upstream control plane runs a work-stealing task executor with
//! heartbeats, spawn/send/suspend semantics, and a database-backed queue --
//! none of which apply here. Every background task in this system runs one
//! fixed-interval cycle at a time against a single owned resource, so a
//! plain cancellable sleep loop (spec §9: "daemon thread with sleep loop")
//! is the whole abstraction that's needed.

use std::time::Duration;

/// One task that does its work in discrete cycles, sleeping `interval`
/// between them.
pub trait PeriodicWorker: Send {
    /// Human-readable name used in log lines, e.g. `"windows-sync"`.
    fn name(&self) -> &str;

    /// Runs a single cycle. Errors are logged and swallowed by `run` -- a
    /// failed cycle never stops the loop, it just waits for the next tick.
    fn run_once(&mut self) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}

/// Drives `worker` on a fixed `interval` until `shutdown` resolves.
/// Mirrors the select-loop shape of the upstream executor's serve loop,
/// stripped of permits, heartbeats, and dequeue batching.
pub async fn run<W: PeriodicWorker>(
    mut worker: W,
    interval: Duration,
    shutdown: impl std::future::Future<Output = ()>,
) {
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = worker.run_once().await {
                    tracing::error!(worker = worker.name(), ?err, "worker cycle failed, will retry next tick");
                }
            }
            () = &mut shutdown => break,
        }
    }
    tracing::info!(worker = worker.name(), "worker loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counter {
        count: Arc<AtomicUsize>,
        fail_first: bool,
    }

    impl PeriodicWorker for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        async fn run_once(&mut self) -> anyhow::Result<()> {
            let n = self.count.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && n == 0 {
                anyhow::bail!("first cycle deliberately fails");
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_until_shutdown_is_signaled() {
        let count = Arc::new(AtomicUsize::new(0));
        let worker = Counter { count: count.clone(), fail_first: false };

        let (tx, rx) = tokio::sync::oneshot::channel();
        let handle = tokio::spawn(run(worker, Duration::from_millis(10), async {
            let _ = rx.await;
        }));

        tokio::time::advance(Duration::from_millis(35)).await;
        tx.send(()).unwrap();
        handle.await.unwrap();

        assert!(count.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn a_failing_cycle_does_not_stop_the_loop() {
        let count = Arc::new(AtomicUsize::new(0));
        let worker = Counter { count: count.clone(), fail_first: true };

        let (tx, rx) = tokio::sync::oneshot::channel();
        let handle = tokio::spawn(run(worker, Duration::from_millis(10), async {
            let _ = rx.await;
        }));

        tokio::time::advance(Duration::from_millis(25)).await;
        tx.send(()).unwrap();
        handle.await.unwrap();

        assert!(count.load(Ordering::SeqCst) >= 2);
    }
}
