//! Cancellable concurrency combinators.
//!
//! # Architecture
//!
//! Everything is built on two types:
//!
//! - [`Scope`] - a cooperative cancellation signal, arranged as a tree
//! - [`Operation`] - a re-runnable description of work that observes a scope
//!
//! Each combinator takes operations and returns a new one. Combinators never
//! abandon their children: they cancel the child scope and wait for every
//! child to settle before they settle themselves.
//!
//! | Combinator | Module | Settles with |
//! |------------|--------|--------------|
//! | [`race`] | `race` | first success; losers cancelled and awaited |
//! | [`with_deadline`] | `deadline` | the result, or `Timeout` after cancelling the work |
//! | [`delay`] | `deadline` | the result of work started after a wait |
//! | [`with_resource`] | `resource` | the use result; release always runs |
//! | [`collect_into`] | `collector` | every success, in arrival order |
//! | [`repeat_while`] | `poller` | the first result the predicate rejects |
//! | [`WorkerPool::submit`] | `pool` | one execution on a dedicated thread |

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

mod collector;
mod deadline;
mod operation;
mod poller;
mod pool;
mod race;
mod resource;
mod scope;

pub use collector::{BoundedCollector, CollectorError, Producer, collect_into};
pub use deadline::{delay, with_deadline};
pub use operation::{Operation, zip};
pub use poller::{Schedule, repeat_while};
pub use pool::{Fibonacci, PoolError, WorkerExecutor, WorkerPool};
pub use race::{race, race2};
pub use resource::with_resource;
pub use scope::Scope;
