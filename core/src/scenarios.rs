//! The ten scenarios, each a composition of engine combinators against one
//! numbered endpoint.

use contend_endpoint::Endpoint;
use contend_engine::{Operation, Schedule, collect_into, race, race2, with_resource, zip};
use contend_types::{EndpointResponse, ScenarioId, ScenarioSettings};

const OPEN_QUERY: &str = "open";
const ID_PARAM: &str = "id";
/// Load value scenario 10 sends while polling; the endpoint treats it as a
/// placeholder.
const PLACEHOLDER_LOAD: &str = "null";
/// What scenario 10 settles with once both branches succeed.
const ZIP_MARKER: &str = "right";

/// Everything a scenario needs to build its operation.
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    pub endpoint: Endpoint,
    /// One submission to the run's worker pool.
    pub pool_job: Operation<u64>,
    pub settings: ScenarioSettings,
}

type Build = fn(ScenarioId, &ScenarioContext) -> Operation<String>;

#[derive(Clone, Copy)]
pub struct Scenario {
    pub id: ScenarioId,
    pub name: &'static str,
    build: Build,
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

const DEFINITIONS: [(&str, Build); ScenarioId::MAX as usize] = [
    ("race_pair", race_pair),
    ("race_pair", race_pair),
    ("race_stress", race_stress),
    ("race_deadline", race_deadline),
    ("race_pair", race_pair),
    ("race_width", race_width),
    ("race_delay", race_delay),
    ("race_resource", race_resource),
    ("collect_bounded", collect_bounded),
    ("zip_worker_poll", zip_worker_poll),
];

impl Scenario {
    /// Every scenario, ordered by id.
    #[must_use]
    pub fn all() -> Vec<Self> {
        ScenarioId::all()
            .zip(DEFINITIONS)
            .map(|(id, (name, build))| Self { id, name, build })
            .collect()
    }

    #[must_use]
    pub fn get(id: ScenarioId) -> Option<Self> {
        Self::all().into_iter().find(|scenario| scenario.id == id)
    }

    /// Build a fresh operation for this scenario.
    #[must_use]
    pub fn build(&self, ctx: &ScenarioContext) -> Operation<String> {
        (self.build)(self.id, ctx)
    }
}

/// Scenarios 1, 2 and 5: two identical calls, first success wins.
fn race_pair(id: ScenarioId, ctx: &ScenarioContext) -> Operation<String> {
    let call = ctx.endpoint.fetch_text(id, None);
    race2(call.clone(), call)
}

fn race_stress(id: ScenarioId, ctx: &ScenarioContext) -> Operation<String> {
    let call = ctx.endpoint.fetch_text(id, None);
    race(call.replicate(ctx.settings.stress_replicas.get()))
}

fn race_deadline(id: ScenarioId, ctx: &ScenarioContext) -> Operation<String> {
    let call = ctx.endpoint.fetch_text(id, None);
    race2(call.clone(), call.with_deadline(ctx.settings.deadline))
}

fn race_width(id: ScenarioId, ctx: &ScenarioContext) -> Operation<String> {
    let call = ctx.endpoint.fetch_text(id, None);
    race(call.replicate(ctx.settings.race_width.get()))
}

fn race_delay(id: ScenarioId, ctx: &ScenarioContext) -> Operation<String> {
    let call = ctx.endpoint.fetch_text(id, None);
    race2(call.clone(), call.delayed(ctx.settings.delay))
}

/// Two open/use/close runners raced; the loser must have closed its handle
/// before the race settles.
fn race_resource(id: ScenarioId, ctx: &ScenarioContext) -> Operation<String> {
    let open = ctx.endpoint.fetch_text(id, Some(OPEN_QUERY));
    let use_endpoint = ctx.endpoint.clone();
    let close_endpoint = ctx.endpoint.clone();

    let runner = with_resource(
        open,
        move |handle: String| use_endpoint.fetch_text(id, Some(&format!("use={handle}"))),
        move |handle: String| {
            close_endpoint
                .fetch_text(id, Some(&format!("close={handle}")))
                .map(|_| ())
        },
    );
    race2(runner.clone(), runner)
}

fn collect_bounded(id: ScenarioId, ctx: &ScenarioContext) -> Operation<String> {
    let call = ctx.endpoint.fetch_text(id, None);
    let producers = call.replicate(ctx.settings.collector_producers.get());
    collect_into(ctx.settings.collector_capacity, producers).map(|bodies| bodies.concat())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FirstResponder {
    Endpoint { status: u16 },
    Worker { value: u64 },
}

/// Concurrently: race the raw endpoint against a pool submission, and poll
/// the endpoint while it keeps redirecting.
fn zip_worker_poll(id: ScenarioId, ctx: &ScenarioContext) -> Operation<String> {
    let endpoint_side = ctx
        .endpoint
        .fetch(id, Some(ID_PARAM))
        .map(|response| FirstResponder::Endpoint {
            status: response.status,
        });
    let worker_side = ctx
        .pool_job
        .clone()
        .map(|value| FirstResponder::Worker { value });
    let first = race2(endpoint_side, worker_side);

    let poll = ctx
        .endpoint
        .fetch(id, Some(&format!("{ID_PARAM}={PLACEHOLDER_LOAD}")))
        .repeat_while(
            Schedule::spaced(ctx.settings.poll_interval),
            EndpointResponse::is_redirect,
        );

    zip(first, poll).map(|(first, settled)| {
        tracing::debug!(?first, status = settled.status, "both branches settled");
        ZIP_MARKER.to_string()
    })
}
