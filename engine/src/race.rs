//! First-success racing with cleanup-before-completion.
//!
//! # Policy
//!
//! - Every participant runs on its own tokio task, all sharing one child
//!   scope of the caller. Peak usage is one task per participant.
//! - The first `Ok` wins. The shared scope is cancelled and every other
//!   participant is awaited before the race settles, so a losing
//!   [`with_resource`](crate::with_resource) has released its resource by
//!   the time the caller sees the winner.
//! - When every participant fails, the first failure in completion order is
//!   returned.
//! - An empty race has nothing that could win and settles as
//!   [`Failure::Cancelled`].
//! - A panicking participant cancels the rest; once they have settled the
//!   panic is resumed on the caller.

use std::sync::Arc;

use contend_types::Failure;
use tokio::task::JoinSet;

use crate::{Operation, Scope};

/// Race `ops` against each other. See the module docs for the policy.
pub fn race<T: Send + 'static>(ops: Vec<Operation<T>>) -> Operation<T> {
    let ops: Arc<[Operation<T>]> = ops.into();
    Operation::new(move |scope| {
        let ops = Arc::clone(&ops);
        async move { run_race(&ops, &scope).await }
    })
}

/// Two-way [`race`].
pub fn race2<T: Send + 'static>(first: Operation<T>, second: Operation<T>) -> Operation<T> {
    race(vec![first, second])
}

async fn run_race<T: Send + 'static>(ops: &[Operation<T>], scope: &Scope) -> Result<T, Failure> {
    if ops.is_empty() {
        return Err(Failure::Cancelled);
    }

    let racers = scope.child();
    let mut set = JoinSet::new();
    for op in ops {
        set.spawn(op.run(&racers));
    }
    tracing::debug!(participants = ops.len(), "race started");

    let mut winner = None;
    let mut first_failure = None;
    let mut panic = None;
    let mut losers = 0_usize;

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(value)) => {
                if winner.is_none() {
                    racers.cancel();
                    winner = Some(value);
                } else {
                    losers += 1;
                }
            }
            Ok(Err(failure)) => {
                losers += 1;
                if first_failure.is_none() {
                    first_failure = Some(failure);
                }
            }
            Err(err) => {
                racers.cancel();
                losers += 1;
                if err.is_panic() {
                    if panic.is_none() {
                        panic = Some(err.into_panic());
                    }
                } else if first_failure.is_none() {
                    first_failure = Some(Failure::Cancelled);
                }
            }
        }
    }

    if let Some(payload) = panic {
        std::panic::resume_unwind(payload);
    }

    tracing::debug!(
        participants = ops.len(),
        losers,
        won = winner.is_some(),
        "race settled"
    );

    match winner {
        Some(value) => Ok(value),
        None => Err(first_failure.unwrap_or(Failure::Cancelled)),
    }
}
