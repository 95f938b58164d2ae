//! Acquire / use / release under cancellation.
//!
//! # Guarantees
//!
//! - A failed or cancelled acquire never triggers a release.
//! - After a successful acquire, release runs exactly once, whatever the use
//!   step does (succeeds, fails, or observes cancellation).
//! - Release runs under [`Scope::detached`] on its own task and is awaited
//!   before the runner settles. A race that contains this runner as a loser
//!   therefore does not settle before the release is done.
//! - If the runner's future is dropped while it holds a resource, the release
//!   is spawned on the current runtime instead of being lost.
//! - Release failures are logged and swallowed; they never replace the use
//!   step's result.

use std::sync::Arc;

use contend_types::Failure;

use crate::{Operation, Scope};

type UseFn<R, T> = dyn Fn(R) -> Operation<T> + Send + Sync;
type ReleaseFn<R> = dyn Fn(R) -> Operation<()> + Send + Sync;

pub fn with_resource<R, T, U, L>(acquire: Operation<R>, use_fn: U, release: L) -> Operation<T>
where
    R: Clone + Send + Sync + 'static,
    T: Send + 'static,
    U: Fn(R) -> Operation<T> + Send + Sync + 'static,
    L: Fn(R) -> Operation<()> + Send + Sync + 'static,
{
    let use_fn: Arc<UseFn<R, T>> = Arc::new(use_fn);
    let release: Arc<ReleaseFn<R>> = Arc::new(release);
    Operation::new(move |scope| {
        let acquire = acquire.clone();
        let use_fn = Arc::clone(&use_fn);
        let release = Arc::clone(&release);
        async move {
            let resource = acquire.run(&scope).await?;
            let mut guard = ReleaseGuard::armed(resource.clone(), release);
            let outcome = use_fn(resource).run(&scope).await;
            guard.release().await;
            outcome
        }
    })
}

/// Holds the pending release until it has been handed to a task.
struct ReleaseGuard<R: Send + 'static> {
    pending: Option<(R, Arc<ReleaseFn<R>>)>,
}

impl<R: Send + 'static> ReleaseGuard<R> {
    fn armed(resource: R, release: Arc<ReleaseFn<R>>) -> Self {
        Self {
            pending: Some((resource, release)),
        }
    }

    /// Run the release on its own task and wait for it.
    ///
    /// The task is detached if this future is dropped mid-wait, so the
    /// release still completes exactly once.
    async fn release(&mut self) {
        if let Some((resource, release)) = self.pending.take() {
            let handle = tokio::spawn(run_release(release, resource));
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "resource release task did not complete");
            }
        }
    }
}

impl<R: Send + 'static> Drop for ReleaseGuard<R> {
    fn drop(&mut self) {
        let Some((resource, release)) = self.pending.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!("resource runner dropped mid-use; spawning release");
                handle.spawn(run_release(release, resource));
            }
            Err(_) => {
                tracing::warn!("resource runner dropped outside a runtime; release skipped");
            }
        }
    }
}

async fn run_release<R>(release: Arc<ReleaseFn<R>>, resource: R) {
    if let Err(failure) = release(resource).run(&Scope::detached()).await {
        tracing::warn!(%failure, "resource release failed");
    }
}
