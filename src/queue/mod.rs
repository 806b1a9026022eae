//! Single-flight request queue for inference calls.
//!
//! Every call to the generation service goes through one [`RequestQueue`], so at
//! most one call is in flight across the whole application no matter how many
//! prompts ask for one. Work is executed in FIFO order; after a task finishes and
//! more work is waiting, the next drain is scheduled after a fixed cooldown instead
//! of immediately.
//!
//! ## Usage
//!
//! ```no_run
//! use std::time::Duration;
//! use tribunal::queue::RequestQueue;
//!
//! # async fn example() {
//! let queue = RequestQueue::new(Duration::from_millis(1000));
//! let answer = queue.submit(|| async { 40 + 2 }).await;
//! assert_eq!(answer.await.unwrap(), 42);
//! # }
//! ```

use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, error};

/// Idle interval between two queued tasks.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(1000);

/// One deferred unit of work. Runs exactly once; errors are logged, never returned.
pub type QueueTask = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<()>> + Send>;

#[derive(Default)]
struct QueueState {
    pending: VecDeque<QueueTask>,
    busy: bool,
    /// A cooldown sleeper owns the next drain.
    cooling: bool,
    completed: u64,
}

/// FIFO queue with a busy flag and a post-task cooldown.
///
/// Cloning is cheap; all clones share the same pending list and busy flag.
#[derive(Clone)]
pub struct RequestQueue {
    state: Arc<Mutex<QueueState>>,
    cooldown: Duration,
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl RequestQueue {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState::default())),
            cooldown,
        }
    }

    /// Append a task to the back of the pending list. Does not start it.
    pub async fn enqueue(&self, task: QueueTask) {
        let mut state = self.state.lock().await;
        state.pending.push_back(task);
        debug!(pending = state.pending.len(), "Task enqueued");
    }

    /// Enqueue an async closure.
    pub async fn enqueue_fn<F, Fut>(&self, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.enqueue(Box::new(move || f().boxed())).await;
    }

    /// Run the front task if the queue is idle.
    ///
    /// Returns immediately when a task is already executing or nothing is pending.
    /// Otherwise executes one task to completion, then, if more work is waiting,
    /// schedules the next drain after the cooldown.
    pub fn drain(&self) -> BoxFuture<'static, ()> {
        let queue = self.clone();
        async move { queue.run_front().await }.boxed()
    }

    /// Spawn a drain on the runtime without waiting for it.
    pub fn kick(&self) {
        tokio::spawn(self.drain());
    }

    /// Enqueue a value-producing job, kick a drain, and return a receiver for its output.
    ///
    /// The receiver resolves once the job has run; it errors only if the job panicked.
    pub async fn submit<T, F, Fut>(&self, f: F) -> oneshot::Receiver<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.enqueue_fn(move || async move {
            let output = f().await;
            if tx.send(output).is_err() {
                debug!("Submitter dropped its receiver before the task finished");
            }
            Ok::<(), anyhow::Error>(())
        })
        .await;
        self.kick();
        rx
    }

    pub async fn is_busy(&self) -> bool {
        self.state.lock().await.busy
    }

    pub async fn pending_len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    /// Number of tasks that have finished (successfully or not).
    pub async fn completed(&self) -> u64 {
        self.state.lock().await.completed
    }

    async fn run_front(self) {
        let task = {
            let mut state = self.state.lock().await;
            if state.busy || state.cooling {
                return;
            }
            let Some(task) = state.pending.pop_front() else {
                return;
            };
            state.busy = true;
            task
        };

        match AssertUnwindSafe(async move { task().await })
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => error!(error = %err, "Queue task failed"),
            Err(_) => error!("Queue task panicked"),
        }

        let more = {
            let mut state = self.state.lock().await;
            state.busy = false;
            state.completed += 1;
            let more = !state.pending.is_empty();
            state.cooling = more;
            more
        };

        if more {
            debug!(cooldown_ms = self.cooldown.as_millis() as u64, "Scheduling next drain after cooldown");
            let queue = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(queue.cooldown).await;
                queue.state.lock().await.cooling = false;
                queue.drain().await;
            });
        }
    }
}
