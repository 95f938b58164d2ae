//! Results produced by a harness run.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::{Failure, ScenarioId};

/// Status and body of an endpoint answer, whatever its status class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointResponse {
    pub status: u16,
    pub body: String,
}

impl EndpointResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    #[must_use]
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

/// The settled result of one scenario within a run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    pub scenario: ScenarioId,
    pub name: &'static str,
    pub result: Result<String, Failure>,
    #[serde(serialize_with = "as_millis")]
    pub elapsed: Duration,
}

impl ScenarioOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// The body on success, `None` on failure.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.result.as_deref().ok()
    }
}

/// Every outcome of one orchestrator run, ordered by scenario id.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub base_url: String,
    #[serde(serialize_with = "as_millis")]
    pub elapsed: Duration,
    pub outcomes: Vec<ScenarioOutcome>,
}

impl RunReport {
    #[must_use]
    pub fn outcome(&self, scenario: ScenarioId) -> Option<&ScenarioOutcome> {
        self.outcomes.iter().find(|o| o.scenario == scenario)
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}
