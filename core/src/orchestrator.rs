//! Runs scenarios concurrently and gathers one outcome per scenario.

use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use chrono::Utc;
use contend_endpoint::{Endpoint, EndpointError};
use contend_engine::{Fibonacci, PoolError, Scope, WorkerPool};
use contend_types::{Failure, RunReport, ScenarioId, ScenarioOutcome, Settings};
use futures_util::FutureExt;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::scenarios::{Scenario, ScenarioContext};

/// Failures that prevent a run from starting at all. Individual scenario
/// failures are recorded in their outcomes instead.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
    #[error("failed to start worker pool: {0}")]
    Pool(#[from] PoolError),
}

#[derive(Debug)]
pub struct Harness {
    settings: Settings,
    endpoint: Endpoint,
    only: Option<BTreeSet<ScenarioId>>,
}

impl Harness {
    pub fn new(settings: Settings) -> Result<Self, HarnessError> {
        let endpoint = Endpoint::new(&settings.endpoint)?;
        Ok(Self {
            settings,
            endpoint,
            only: None,
        })
    }

    /// Restrict the run to `ids`. An empty selection runs everything.
    pub fn only(mut self, ids: impl IntoIterator<Item = ScenarioId>) -> Self {
        let ids: BTreeSet<_> = ids.into_iter().collect();
        self.only = (!ids.is_empty()).then_some(ids);
        self
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn selected(&self) -> Vec<Scenario> {
        Scenario::all()
            .into_iter()
            .filter(|scenario| {
                self.only
                    .as_ref()
                    .is_none_or(|only| only.contains(&scenario.id))
            })
            .collect()
    }

    /// Run every selected scenario concurrently under `scope`.
    ///
    /// Each scenario gets its own child scope, so one failing never cancels
    /// another. Cancelling `scope` settles every unfinished scenario as
    /// [`Failure::Cancelled`]. The worker pool lives for exactly this call.
    pub async fn run(&self, scope: &Scope) -> Result<RunReport, HarnessError> {
        let started_at = Utc::now();
        let start = Instant::now();

        let pool = WorkerPool::start(self.settings.pool.size, |_| Fibonacci::new())?;
        let ctx = ScenarioContext {
            endpoint: self.endpoint.clone(),
            pool_job: pool.submit(),
            settings: self.settings.scenarios.clone(),
        };

        let selected = self.selected();
        tracing::info!(
            base_url = %self.endpoint.base_url(),
            scenarios = selected.len(),
            "run started"
        );

        let mut set = JoinSet::new();
        for scenario in selected {
            let op = scenario.build(&ctx);
            let child = scope.child();
            let span = tracing::info_span!("scenario", id = %scenario.id, name = scenario.name);
            set.spawn(
                async move {
                    let began = Instant::now();
                    let result = AssertUnwindSafe(op.run(&child))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|_| Err(Failure::worker("scenario panicked")));
                    let elapsed = began.elapsed();
                    let elapsed_ms = elapsed.as_millis() as u64;
                    match &result {
                        Ok(_) => tracing::info!(elapsed_ms, "scenario succeeded"),
                        Err(failure) => {
                            let kind = failure.kind();
                            tracing::info!(elapsed_ms, %kind, %failure, "scenario failed");
                        }
                    }
                    ScenarioOutcome {
                        scenario: scenario.id,
                        name: scenario.name,
                        result,
                        elapsed,
                    }
                }
                .instrument(span),
            );
        }

        let mut outcomes = Vec::with_capacity(set.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => tracing::error!(error = %err, "scenario task did not complete"),
            }
        }
        outcomes.sort_by_key(|outcome| outcome.scenario);

        pool.shutdown().await;

        let report = RunReport {
            started_at,
            base_url: self.endpoint.base_url().to_string(),
            elapsed: start.elapsed(),
            outcomes,
        };
        tracing::info!(
            elapsed_ms = report.elapsed.as_millis() as u64,
            failed = report.failed(),
            "run finished"
        );
        Ok(report)
    }
}

/// Run all ten scenarios with default settings against `base_url`.
pub async fn program(base_url: &str) -> Result<RunReport, HarnessError> {
    run_defaults(Settings::for_base_url(base_url)).await
}

/// Run all ten scenarios with default settings against `http://localhost:{port}`.
pub async fn program_on_port(port: u16) -> Result<RunReport, HarnessError> {
    run_defaults(Settings::for_port(port)).await
}

async fn run_defaults(settings: Settings) -> Result<RunReport, HarnessError> {
    Harness::new(settings)?.run(&Scope::new()).await
}
