//! Core domain types for contend.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the harness.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod failure;
mod ids;
mod outcome;
mod settings;

pub use failure::{Failure, FailureKind};
pub use ids::{ScenarioId, ScenarioIdError};
pub use outcome::{EndpointResponse, RunReport, ScenarioOutcome};
pub use settings::{
    DEFAULT_BASE_URL, EndpointSettings, PoolSettings, ScenarioSettings, Settings,
};
