//! Bounded fan-in of concurrently produced results.
//!
//! [`BoundedCollector`] is a fixed-capacity FIFO. Producers registered with
//! [`BoundedCollector::producer`] offer items and are suspended while the
//! buffer is full. [`collect_into`] launches producers with unbounded
//! concurrency, takes items as they arrive so producers never deadlock on a
//! full buffer, and drains the remainder once every producer has settled.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use contend_types::Failure;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::{Operation, Scope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CollectorError {
    #[error("collector is closed")]
    Closed,
    #[error("cannot drain while {0} producers are outstanding")]
    ProducersOutstanding(usize),
}

pub struct BoundedCollector<T> {
    sender: Option<mpsc::Sender<T>>,
    receiver: mpsc::Receiver<T>,
    capacity: NonZeroUsize,
    outstanding: Arc<AtomicUsize>,
}

impl<T: Send> std::fmt::Debug for BoundedCollector<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedCollector")
            .field("capacity", &self.capacity)
            .field("buffered", &self.receiver.len())
            .field("outstanding", &self.outstanding())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<T: Send> BoundedCollector<T> {
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.get());
        Self {
            sender: Some(sender),
            receiver,
            capacity,
            outstanding: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Items accepted but not yet taken.
    #[must_use]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_none()
    }

    /// Producers that have been registered and not yet dropped.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Register a producer. It counts as outstanding until dropped.
    pub fn producer(&self) -> Result<Producer<T>, CollectorError> {
        let sender = self.sender.clone().ok_or(CollectorError::Closed)?;
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        Ok(Producer {
            sender,
            outstanding: Arc::clone(&self.outstanding),
        })
    }

    /// Wait for the next accepted item.
    ///
    /// Returns `None` once the collector is closed and empty.
    pub async fn take(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Stop accepting items. Buffered items stay available to drain.
    pub fn close(&mut self) {
        self.sender = None;
        self.receiver.close();
    }

    /// Close and return every buffered item in arrival order.
    pub fn drain(&mut self) -> Result<Vec<T>, CollectorError> {
        let outstanding = self.outstanding();
        if outstanding > 0 {
            return Err(CollectorError::ProducersOutstanding(outstanding));
        }
        self.close();
        let mut items = Vec::with_capacity(self.receiver.len());
        while let Ok(item) = self.receiver.try_recv() {
            items.push(item);
        }
        Ok(items)
    }
}

/// Offering side of a [`BoundedCollector`].
pub struct Producer<T> {
    sender: mpsc::Sender<T>,
    outstanding: Arc<AtomicUsize>,
}

impl<T> Producer<T> {
    /// Offer an item, waiting while the collector is full.
    pub async fn offer(&self, item: T) -> Result<(), CollectorError> {
        self.sender
            .send(item)
            .await
            .map_err(|_| CollectorError::Closed)
    }
}

impl<T> Drop for Producer<T> {
    fn drop(&mut self) {
        self.outstanding.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Run every producer concurrently and collect the successes.
///
/// Individual failures are ignored. Zero successes is an empty `Vec`. The
/// only failure is [`Failure::Cancelled`], when the caller's scope closes.
pub fn collect_into<T: Send + 'static>(
    capacity: NonZeroUsize,
    producers: Vec<Operation<T>>,
) -> Operation<Vec<T>> {
    let producers: Arc<[Operation<T>]> = producers.into();
    Operation::new(move |scope| {
        let producers = Arc::clone(&producers);
        async move { run_collect(capacity, &producers, &scope).await }
    })
}

async fn run_collect<T: Send + 'static>(
    capacity: NonZeroUsize,
    producers: &[Operation<T>],
    scope: &Scope,
) -> Result<Vec<T>, Failure> {
    let mut collector = BoundedCollector::new(capacity);
    let fan_out = scope.child();
    let mut set = JoinSet::new();

    for op in producers {
        let producer = collector.producer().map_err(|_| Failure::Cancelled)?;
        let run = op.run(&fan_out);
        let offer_scope = fan_out.clone();
        set.spawn(async move {
            let outcome = match run.await {
                Ok(item) => match offer_scope.guard(producer.offer(item)).await {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(CollectorError::Closed | CollectorError::ProducersOutstanding(_))) => {
                        Err(Failure::Cancelled)
                    }
                    Err(failure) => Err(failure),
                },
                Err(failure) => Err(failure),
            };
            // Settle before the task reports completion.
            drop(producer);
            outcome
        });
    }

    let mut accepted = Vec::with_capacity(producers.len());
    let mut ignored = 0_usize;
    let mut panic = None;

    loop {
        tokio::select! {
            joined = set.join_next() => match joined {
                None => break,
                Some(Ok(Ok(()))) => {}
                Some(Ok(Err(failure))) => {
                    ignored += 1;
                    tracing::debug!(%failure, "producer failed; ignoring");
                }
                Some(Err(err)) => {
                    ignored += 1;
                    if err.is_panic() {
                        fan_out.cancel();
                        panic.get_or_insert(err.into_panic());
                    }
                }
            },
            Some(item) = collector.take() => accepted.push(item),
        }
    }

    if let Some(payload) = panic {
        std::panic::resume_unwind(payload);
    }

    let remaining = collector.drain().map_err(|_| Failure::Cancelled)?;
    accepted.extend(remaining);

    if scope.is_cancelled() {
        return Err(Failure::Cancelled);
    }

    tracing::debug!(
        producers = producers.len(),
        collected = accepted.len(),
        ignored,
        "collector drained"
    );
    Ok(accepted)
}
