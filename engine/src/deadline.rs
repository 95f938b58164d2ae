//! Bounding an operation's end, and postponing its start.
//!
//! A deadline cancels work that runs too long; a delay holds work back before
//! it begins. Neither is built from the other.

use std::time::Duration;

use contend_types::Failure;

use crate::Operation;

/// Bound `op` to `after`.
///
/// When the timer fires first, `op` is cancelled and awaited (so its cleanup
/// runs) and the result is [`Failure::Timeout`]. When `op` and the timer are
/// ready in the same poll, `op`'s result wins.
pub fn with_deadline<T: Send + 'static>(op: Operation<T>, after: Duration) -> Operation<T> {
    Operation::new(move |scope| {
        let bounded = scope.child();
        let mut run = op.run(&bounded);
        async move {
            tokio::select! {
                biased;
                result = &mut run => result,
                () = tokio::time::sleep(after) => {
                    bounded.cancel();
                    let _ = run.await;
                    tracing::debug!(after_ms = after.as_millis() as u64, "deadline exceeded");
                    Err(Failure::Timeout { after })
                }
            }
        }
    })
}

/// Start `op` only after `by` has elapsed.
///
/// Cancellation during the wait settles as [`Failure::Cancelled`] without
/// ever starting `op`.
pub fn delay<T: Send + 'static>(op: Operation<T>, by: Duration) -> Operation<T> {
    Operation::new(move |scope| {
        let op = op.clone();
        async move {
            scope.sleep(by).await?;
            op.run(&scope).await
        }
    })
}
