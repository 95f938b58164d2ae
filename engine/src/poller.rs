//! Re-running an operation on a fixed schedule while a predicate holds.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::Operation;

/// Spacing between runs, optionally capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    interval: Duration,
    max_runs: Option<NonZeroU32>,
}

impl Schedule {
    /// Runs separated by `interval`, with no cap.
    #[must_use]
    pub const fn spaced(interval: Duration) -> Self {
        Self {
            interval,
            max_runs: None,
        }
    }

    #[must_use]
    pub const fn with_max_runs(mut self, max_runs: NonZeroU32) -> Self {
        self.max_runs = Some(max_runs);
        self
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub const fn max_runs(&self) -> Option<NonZeroU32> {
        self.max_runs
    }
}

/// Run `op`, then keep re-running it while `predicate` accepts the last
/// result, sleeping the schedule's interval between runs.
///
/// Settles with the first result the predicate rejects, or with the last
/// result once the schedule's run cap is reached. A failed run settles the
/// poller immediately with that failure.
pub fn repeat_while<T, P>(op: Operation<T>, schedule: Schedule, predicate: P) -> Operation<T>
where
    T: Send + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    let predicate = Arc::new(predicate);
    Operation::new(move |scope| {
        let op = op.clone();
        let predicate = Arc::clone(&predicate);
        async move {
            let mut runs = 0_u32;
            loop {
                let value = op.run(&scope).await?;
                runs = runs.saturating_add(1);

                if !predicate(&value) {
                    tracing::debug!(runs, "poll condition cleared");
                    return Ok(value);
                }
                if schedule.max_runs.is_some_and(|max| runs >= max.get()) {
                    tracing::debug!(runs, "poll run cap reached");
                    return Ok(value);
                }

                scope.sleep(schedule.interval).await?;
            }
        }
    })
}
