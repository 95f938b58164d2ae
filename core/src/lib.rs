//! Scenario registry and orchestrator.
//!
//! [`Scenario::all`] defines the ten scenarios, each built from engine
//! combinators against one numbered endpoint. [`Harness`] runs a selection of
//! them concurrently and returns a [`RunReport`](contend_types::RunReport)
//! with one outcome per scenario, ordered by id.

mod orchestrator;
mod scenarios;

pub use orchestrator::{Harness, HarnessError, program, program_on_port};
pub use scenarios::{Scenario, ScenarioContext};
