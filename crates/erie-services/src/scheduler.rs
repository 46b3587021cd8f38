//! # Scheduler
//!
//! Delayed effects with a cancellation handle. A task waits out its delay
//! while watching a [`CancellationToken`]; cancelling before the delay ends
//! means the effect never runs. Once the effect has started it runs to
//! completion and a late cancel is ignored.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use erie_core::{AppError, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome<T> {
    Completed(T),
    Cancelled,
}

impl<T> TaskOutcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskOutcome::Cancelled)
    }
}

/// Handle to one scheduled effect.
pub struct ScheduledTask<T> {
    id: u64,
    token: CancellationToken,
    handle: JoinHandle<Option<T>>,
}

impl<T> std::fmt::Debug for ScheduledTask<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("id", &self.id)
            .field("cancelled", &self.token.is_cancelled())
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}

impl<T> ScheduledTask<T> {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stops the task if its delay has not elapsed yet.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the task to settle.
    pub async fn outcome(self) -> Result<TaskOutcome<T>> {
        match self.handle.await {
            Ok(Some(value)) => Ok(TaskOutcome::Completed(value)),
            Ok(None) => Ok(TaskOutcome::Cancelled),
            Err(e) if e.is_cancelled() => Ok(TaskOutcome::Cancelled),
            Err(e) => Err(AppError::Internal(format!("scheduled task {} failed: {e}", self.id))),
        }
    }
}

#[derive(Default)]
struct Pending {
    next_id: AtomicU64,
    /// Tasks still waiting out their delay
    tokens: DashMap<u64, CancellationToken>,
}

/// Cheap to clone; clones share the pending set.
#[derive(Clone, Default)]
pub struct Scheduler {
    pending: Arc<Pending>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `job` after `delay` unless cancelled first.
    pub fn schedule<F, Fut, T>(&self, delay: Duration, job: F) -> ScheduledTask<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let id = self.pending.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        self.pending.tokens.insert(id, token.clone());

        let pending = Arc::clone(&self.pending);
        let watch = token.clone();
        let handle = tokio::spawn(async move {
            let fired = tokio::select! {
                biased;
                _ = watch.cancelled() => false,
                _ = tokio::time::sleep(delay) => true,
            };
            pending.tokens.remove(&id);
            if !fired {
                debug!(task_id = id, "scheduled task cancelled");
                return None;
            }
            debug!(task_id = id, "scheduled task firing");
            Some(job().await)
        });

        debug!(task_id = id, delay_ms = delay.as_millis() as u64, "task scheduled");
        ScheduledTask { id, token, handle }
    }

    /// Cancels every task still waiting. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let ids: Vec<u64> = self.pending.tokens.iter().map(|entry| *entry.key()).collect();
        let mut cancelled = 0;
        for id in ids {
            if let Some((_, token)) = self.pending.tokens.remove(&id) {
                token.cancel();
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            debug!(cancelled, "pending tasks cancelled");
        }
        cancelled
    }

    pub fn pending_count(&self) -> usize {
        self.pending.tokens.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test(start_paused = true)]
    async fn handle_reports_its_state_when_printed() {
        let scheduler = Scheduler::new();
        let task = scheduler.schedule(Duration::from_secs(15), || async { 7 });
        let printed = format!("{task:?}");
        assert!(printed.contains("id: "));
        assert!(printed.contains("cancelled: false"));
        task.cancel();
        assert!(format!("{task:?}").contains("cancelled: true"));
    }

    #[tokio::test(start_paused = true)]
    async fn runs_after_the_delay() {
        let scheduler = Scheduler::new();
        let task = scheduler.schedule(Duration::from_secs(15), || async { 7 });
        assert_eq!(scheduler.pending_count(), 1);

        assert_eq!(task.outcome().await.unwrap(), TaskOutcome::Completed(7));
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_task_never_runs_its_effect() {
        let scheduler = Scheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let task = scheduler.schedule(Duration::from_secs(15), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(5)).await;
        task.cancel();
        assert!(task.outcome().await.unwrap().is_cancelled());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_only_touches_waiting_tasks() {
        let scheduler = Scheduler::new();
        let quick = scheduler.schedule(Duration::from_secs(1), || async { "quick" });
        let slow = scheduler.schedule(Duration::from_secs(60), || async { "slow" });

        assert_eq!(quick.outcome().await.unwrap(), TaskOutcome::Completed("quick"));
        assert_eq!(scheduler.cancel_all(), 1);
        assert_eq!(slow.outcome().await.unwrap(), TaskOutcome::Cancelled);
        assert_eq!(scheduler.cancel_all(), 0);
    }
}
