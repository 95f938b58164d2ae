//! Fixed-size pool of dedicated OS threads running blocking executors.
//!
//! Each worker thread owns one [`WorkerExecutor`]. Submissions queue in FIFO
//! order and are claimed by whichever worker is idle, so a pool of size 1
//! serializes every submission against a single executor state.
//!
//! Cancellation is asymmetric. A submission cancelled while still queued is
//! removed and never runs. Once a worker has claimed it, cancellation only
//! detaches the caller: the executor finishes and its result is discarded.

use std::collections::VecDeque;
use std::io;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

use contend_types::Failure;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::{Operation, Scope};

/// Blocking, stateful work run on a pool thread.
pub trait WorkerExecutor: Send + 'static {
    fn execute(&mut self) -> Result<u64, String>;
}

/// Yields successive Fibonacci numbers: 0, 1, 1, 2, 3, 5, ...
///
/// Fails once the next value no longer fits in a `u64`.
#[derive(Debug, Clone)]
pub struct Fibonacci {
    current: Option<u64>,
    next: Option<u64>,
}

impl Default for Fibonacci {
    fn default() -> Self {
        Self {
            current: Some(0),
            next: Some(1),
        }
    }
}

impl Fibonacci {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkerExecutor for Fibonacci {
    fn execute(&mut self) -> Result<u64, String> {
        let current = self
            .current
            .ok_or_else(|| "fibonacci sequence exceeded u64".to_string())?;
        self.current = self.next;
        self.next = self.next.and_then(|next| current.checked_add(next));
        Ok(current)
    }
}

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to spawn worker thread {index}: {source}")]
    Spawn {
        index: usize,
        #[source]
        source: io::Error,
    },
}

struct Job {
    id: u64,
    cancel: Scope,
    reply: oneshot::Sender<Result<u64, Failure>>,
}

#[derive(Default)]
struct PoolState {
    queue: VecDeque<Job>,
    stopping: bool,
    next_id: u64,
}

#[derive(Default)]
struct Shared {
    state: Mutex<PoolState>,
    ready: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark the pool stopping and drop every queued job. Returns how many
    /// were dropped.
    fn stop(&self) -> usize {
        let dropped = {
            let mut state = self.lock();
            state.stopping = true;
            std::mem::take(&mut state.queue).len()
        };
        self.ready.notify_all();
        dropped
    }

    fn remove(&self, id: u64) -> bool {
        let mut state = self.lock();
        let before = state.queue.len();
        state.queue.retain(|job| job.id != id);
        state.queue.len() != before
    }

    /// Block until a job is available. `None` once the pool is stopping.
    fn claim(&self) -> Option<Job> {
        let mut state = self.lock();
        loop {
            if let Some(job) = state.queue.pop_front() {
                return Some(job);
            }
            if state.stopping {
                return None;
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.size())
            .field("queued", &self.queued())
            .finish()
    }
}

impl WorkerPool {
    /// Spawn `size` worker threads, each owning `factory(index)`.
    pub fn start<E, F>(size: NonZeroUsize, factory: F) -> Result<Self, PoolError>
    where
        E: WorkerExecutor,
        F: Fn(usize) -> E,
    {
        let shared = Arc::new(Shared::default());
        let mut pool = Self {
            shared: Arc::clone(&shared),
            workers: Vec::with_capacity(size.get()),
        };

        for index in 0..size.get() {
            let executor = factory(index);
            let shared = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name(format!("contend-worker-{index}"))
                .spawn(move || worker_loop(index, &shared, executor))
                .map_err(|source| PoolError::Spawn { index, source })?;
            pool.workers.push(handle);
        }

        tracing::debug!(size = size.get(), "worker pool started");
        Ok(pool)
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Submissions waiting for a worker.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.shared.lock().queue.len()
    }

    /// One execution on the pool.
    ///
    /// Each run of the returned operation is a fresh submission. Executor
    /// errors and panics settle as [`Failure::Worker`]; so does submitting to
    /// a pool that has been shut down.
    pub fn submit(&self) -> Operation<u64> {
        let shared = Arc::clone(&self.shared);
        Operation::new(move |scope| {
            let shared = Arc::clone(&shared);
            async move {
                scope.check()?;
                let (reply, response) = oneshot::channel();
                let job_scope = scope.child();
                let id = {
                    let mut state = shared.lock();
                    if state.stopping {
                        return Err(Failure::worker("worker pool is shut down"));
                    }
                    let id = state.next_id;
                    state.next_id += 1;
                    state.queue.push_back(Job {
                        id,
                        cancel: job_scope.clone(),
                        reply,
                    });
                    id
                };
                shared.ready.notify_one();

                tokio::select! {
                    biased;
                    () = scope.cancelled() => {
                        job_scope.cancel();
                        let dequeued = shared.remove(id);
                        tracing::debug!(job = id, dequeued, "pool submission cancelled");
                        Err(Failure::Cancelled)
                    }
                    reply = response => reply.unwrap_or(Err(Failure::Cancelled)),
                }
            }
        })
    }

    /// Stop accepting work, cancel queued submissions, and join every worker.
    ///
    /// A worker that is mid-execution finishes that execution first.
    pub async fn shutdown(mut self) {
        let dropped = self.shared.stop();
        let workers = std::mem::take(&mut self.workers);
        let size = workers.len();
        let joined = tokio::task::spawn_blocking(move || {
            workers
                .into_iter()
                .map(thread::JoinHandle::join)
                .filter(Result::is_err)
                .count()
        })
        .await;
        match joined {
            Ok(0) => tracing::debug!(size, dropped, "worker pool stopped"),
            Ok(panicked) => tracing::warn!(size, panicked, "worker threads panicked"),
            Err(err) => tracing::warn!(error = %err, "failed to join worker threads"),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            // Threads exit once idle; nothing here can wait for them.
            self.shared.stop();
        }
    }
}

fn worker_loop<E: WorkerExecutor>(index: usize, shared: &Shared, mut executor: E) {
    while let Some(job) = shared.claim() {
        if job.cancel.is_cancelled() || job.reply.is_closed() {
            tracing::debug!(worker = index, job = job.id, "skipping cancelled submission");
            continue;
        }

        let result = match panic::catch_unwind(AssertUnwindSafe(|| executor.execute())) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(message)) => Err(Failure::worker(message)),
            Err(_) => {
                tracing::warn!(worker = index, job = job.id, "executor panicked");
                Err(Failure::worker("executor panicked"))
            }
        };

        // The caller may have been cancelled after the claim.
        let _ = job.reply.send(result);
    }
    tracing::trace!(worker = index, "worker exiting");
}
