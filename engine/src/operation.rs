//! The uniform unit of work every combinator accepts and returns.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use contend_types::Failure;
use futures_util::future::BoxFuture;

use crate::Scope;
use crate::poller::Schedule;

type RunFn<T> = dyn Fn(Scope) -> BoxFuture<'static, Result<T, Failure>> + Send + Sync;

/// A re-runnable description of asynchronous work.
///
/// Cloning is cheap and shares the description, not an execution: each
/// [`Operation::run`] starts a fresh execution. The execution must observe
/// the [`Scope`] it is given at its suspension points and return
/// [`Failure::Cancelled`] once the scope is cancelled.
pub struct Operation<T> {
    run: Arc<RunFn<T>>,
}

impl<T> Clone for Operation<T> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
        }
    }
}

impl<T> fmt::Debug for Operation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("output", &std::any::type_name::<T>())
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> Operation<T> {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Scope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, Failure>> + Send + 'static,
    {
        Self {
            run: Arc::new(move |scope| Box::pin(f(scope))),
        }
    }

    /// Start one execution under `scope`.
    pub fn run(&self, scope: &Scope) -> BoxFuture<'static, Result<T, Failure>> {
        (self.run)(scope.clone())
    }

    /// An operation that fails immediately with `failure`.
    pub fn fail(failure: Failure) -> Self {
        Self::new(move |_| {
            let failure = failure.clone();
            async move { Err(failure) }
        })
    }

    pub fn map<U, F>(self, f: F) -> Operation<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Operation::new(move |scope| {
            let run = self.run(&scope);
            let f = Arc::clone(&f);
            async move { run.await.map(|value| f(value)) }
        })
    }

    /// `n` handles to the same description, ready to race or collect.
    #[must_use]
    pub fn replicate(&self, n: usize) -> Vec<Self> {
        vec![self.clone(); n]
    }

    /// Race this operation against `other`.
    pub fn race_with(self, other: Self) -> Self {
        crate::race(vec![self, other])
    }

    pub fn with_deadline(self, after: Duration) -> Self {
        crate::with_deadline(self, after)
    }

    pub fn delayed(self, by: Duration) -> Self {
        crate::delay(self, by)
    }

    pub fn repeat_while<P>(self, schedule: Schedule, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        crate::repeat_while(self, schedule, predicate)
    }
}

impl<T: Clone + Send + Sync + 'static> Operation<T> {
    /// An operation that succeeds immediately with `value`.
    pub fn ready(value: T) -> Self {
        Self::new(move |_| {
            let value = value.clone();
            async move { Ok(value) }
        })
    }
}

/// Run `left` and `right` concurrently and return both values.
///
/// The first failure cancels the other side, which is awaited before the
/// failure is returned.
pub fn zip<A, B>(left: Operation<A>, right: Operation<B>) -> Operation<(A, B)>
where
    A: Send + 'static,
    B: Send + 'static,
{
    Operation::new(move |scope| {
        let pair = scope.child();
        let mut left = left.run(&pair);
        let mut right = right.run(&pair);
        async move {
            let mut left_value = None;
            let mut right_value = None;

            loop {
                tokio::select! {
                    result = &mut left, if left_value.is_none() => match result {
                        Ok(value) => left_value = Some(value),
                        Err(failure) => {
                            pair.cancel();
                            if right_value.is_none() {
                                let _ = (&mut right).await;
                            }
                            return Err(failure);
                        }
                    },
                    result = &mut right, if right_value.is_none() => match result {
                        Ok(value) => right_value = Some(value),
                        Err(failure) => {
                            pair.cancel();
                            if left_value.is_none() {
                                let _ = (&mut left).await;
                            }
                            return Err(failure);
                        }
                    },
                }

                if let (Some(_), Some(_)) = (&left_value, &right_value) {
                    break;
                }
            }

            match (left_value, right_value) {
                (Some(l), Some(r)) => Ok((l, r)),
                _ => Err(Failure::Cancelled),
            }
        }
    })
}
