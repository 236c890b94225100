//! FIFO task queue with a lazily spawned single consumer.
//!
//! `enqueue` only takes the lock long enough to push; if no consumer is
//! running it starts one. The consumer pops one task at a time, releases the
//! lock, runs it, and exits once the queue is drained. The next `enqueue`
//! starts a fresh consumer.
//!
//! Each task runs in its own spawned task so a panic is contained: it is
//! reported to the task's `handle_error` and the consumer moves on.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, trace};

use super::task::Task;

struct QueueState {
    tasks: VecDeque<Box<dyn Task>>,
    running: bool,
}

/// Ordered holder of pending tasks for one consumption context (e.g. a channel).
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct TaskQueue {
    state: Arc<Mutex<QueueState>>,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState {
                tasks: VecDeque::new(),
                running: false,
            })),
        }
    }

    /// Append a task, starting a consumer if none is active.
    pub async fn enqueue(&self, task: Box<dyn Task>) {
        let mut state = self.state.lock().await;
        trace!(prompt = %task.prompt(), position = state.tasks.len() + 1, "Task enqueued");
        state.tasks.push_back(task);

        if !state.running {
            state.running = true;
            tokio::spawn(run_loop(Arc::clone(&self.state)));
        }
    }

    /// Number of tasks waiting (the executing task is not counted).
    pub async fn len(&self) -> usize {
        self.state.lock().await.tasks.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.tasks.is_empty()
    }

    /// Whether a consumer is currently active.
    pub async fn is_running(&self) -> bool {
        self.state.lock().await.running
    }

    /// Prompts of the first `limit` waiting tasks, plus the total waiting count.
    pub async fn snapshot(&self, limit: usize) -> (Vec<String>, usize) {
        let state = self.state.lock().await;
        let prompts = state.tasks.iter().take(limit).map(|t| t.prompt()).collect();
        (prompts, state.tasks.len())
    }
}

async fn run_loop(state: Arc<Mutex<QueueState>>) {
    debug!("Task queue consumer started");
    loop {
        let task = {
            let mut guard = state.lock().await;
            match guard.tasks.pop_front() {
                Some(task) => task,
                None => {
                    guard.running = false;
                    debug!("Task queue drained, consumer exiting");
                    return;
                }
            }
        };

        run_one(Arc::from(task)).await;
    }
}

async fn run_one(task: Arc<dyn Task>) {
    let runner = Arc::clone(&task);
    let outcome = match tokio::spawn(async move { runner.apply().await }).await {
        Ok(result) => result,
        Err(e) => {
            error!(prompt = %task.prompt(), error = %e, "Task panicked");
            Err(anyhow::anyhow!("task panicked: {e}"))
        }
    };

    let Err(e) = outcome else {
        return;
    };
    trace!(prompt = %task.prompt(), "Task failed, handing error back to task");
    let handler = Arc::clone(&task);
    if let Err(e) = tokio::spawn(async move { handler.handle_error(e).await }).await {
        error!(prompt = %task.prompt(), error = %e, "Task error handler panicked");
    }
}
