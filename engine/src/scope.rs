//! Cooperative cancellation scopes.
//!
//! Every [`Operation`](crate::Operation) runs inside a [`Scope`]. Combinators
//! hand their children a [`Scope::child`], cancel that child when the children
//! are no longer wanted, and then wait for them to settle. Cancellation flows
//! downward only: cancelling a child never touches its parent or siblings.

use std::future::Future;
use std::time::Duration;

use contend_types::Failure;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct Scope {
    token: CancellationToken,
}

impl Scope {
    /// A root scope with no parent.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A root scope for work that must finish even when the caller is being
    /// cancelled, such as resource release.
    #[must_use]
    pub fn detached() -> Self {
        Self::default()
    }

    /// A scope that is cancelled whenever `self` is.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the scope is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// `Err(Failure::Cancelled)` if the scope has already been cancelled.
    pub fn check(&self) -> Result<(), Failure> {
        if self.is_cancelled() {
            Err(Failure::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Drive `fut` until it completes or the scope is cancelled.
    ///
    /// Cancellation is checked first, so an already-cancelled scope never
    /// polls `fut`. On cancellation `fut` is dropped.
    pub async fn guard<F: Future>(&self, fut: F) -> Result<F::Output, Failure> {
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(Failure::Cancelled),
            output = fut => Ok(output),
        }
    }

    /// Cancellable sleep.
    pub async fn sleep(&self, duration: Duration) -> Result<(), Failure> {
        self.guard(tokio::time::sleep(duration)).await
    }
}
