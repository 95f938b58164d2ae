//! Full harness runs against a mock scenario endpoint

use std::time::{Duration, Instant};

use contend_core::{Harness, HarnessError, program};
use contend_engine::Scope;
use contend_types::{Failure, FailureKind, Settings};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{
    BODY, closed_port_uri, fast_settings, healthy_server, id, mount_plain, stalled_server,
};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_scenario_succeeds_against_a_healthy_endpoint() {
    let server = healthy_server().await;
    let harness = Harness::new(fast_settings(&server.uri())).unwrap();

    let report = harness.run(&Scope::new()).await.unwrap();

    assert_eq!(report.failed(), 0, "{:#?}", report.outcomes);
    let ids: Vec<u8> = report.outcomes.iter().map(|o| o.scenario.value()).collect();
    assert_eq!(ids, (1..=10).collect::<Vec<_>>());
    for n in [1, 2, 3, 4, 5, 6, 7, 8] {
        assert_eq!(report.outcome(id(n)).unwrap().value(), Some(BODY), "scenario {n}");
    }
    assert_eq!(report.outcome(id(9)).unwrap().value(), Some("x".repeat(10).as_str()));
    assert_eq!(report.outcome(id(10)).unwrap().value(), Some("right"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn raced_duplicates_cost_one_response_time() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("ok")
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&server)
        .await;

    let harness = Harness::new(fast_settings(&server.uri()))
        .unwrap()
        .only([id(1)]);
    let report = harness.run(&Scope::new()).await.unwrap();

    assert_eq!(report.outcomes.len(), 1);
    let outcome = &report.outcomes[0];
    assert_eq!(outcome.value(), Some("ok"));
    assert!(outcome.elapsed >= Duration::from_millis(100));
    // Sequential duplicates would take 200ms.
    assert!(
        outcome.elapsed < Duration::from_millis(190),
        "took {:?}",
        outcome.elapsed
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn one_failing_scenario_leaves_the_rest_alone() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/5"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_plain(&server, &[1, 2, 6]).await;

    let harness = Harness::new(fast_settings(&server.uri()))
        .unwrap()
        .only([id(1), id(2), id(5), id(6)]);
    let report = harness.run(&Scope::new()).await.unwrap();

    assert_eq!(report.failed(), 1);
    let failed = report.outcome(id(5)).unwrap();
    assert!(matches!(
        failed.result,
        Err(Failure::NonSuccessStatus { status: 500, .. })
    ));
    for n in [1, 2, 6] {
        assert!(report.outcome(id(n)).unwrap().is_success(), "scenario {n}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn deadline_race_times_out_only_the_bounded_copy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/4"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(BODY)
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&server)
        .await;

    // The bounded copy gives up after 500ms; the plain call still wins.
    let harness = Harness::new(fast_settings(&server.uri()))
        .unwrap()
        .only([id(4)]);
    let report = harness.run(&Scope::new()).await.unwrap();
    assert_eq!(report.outcome(id(4)).unwrap().value(), Some(BODY));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancelling_the_run_settles_every_scenario_as_cancelled() {
    let server = stalled_server().await;
    let harness = Harness::new(fast_settings(&server.uri())).unwrap();

    let root = Scope::new();
    let trigger = root.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let report = harness.run(&root).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(report.outcomes.len(), 10);
    for outcome in &report.outcomes {
        let failure = outcome.result.as_ref().unwrap_err();
        assert_eq!(failure.kind(), FailureKind::Cancelled, "scenario {}", outcome.scenario);
    }
}

#[tokio::test]
async fn unreachable_endpoint_fails_scenarios_not_the_run() {
    let harness = Harness::new(fast_settings(&closed_port_uri()))
        .unwrap()
        .only([id(1), id(9)]);
    let report = harness.run(&Scope::new()).await.unwrap();

    let first = report.outcome(id(1)).unwrap();
    assert_eq!(
        first.result.as_ref().unwrap_err().kind(),
        FailureKind::Network
    );
    // Every producer failed, which the collector tolerates.
    assert_eq!(report.outcome(id(9)).unwrap().value(), Some(""));
}

#[tokio::test]
async fn program_rejects_an_invalid_base_url() {
    let err = program("definitely not a url").await.unwrap_err();
    assert!(matches!(err, HarnessError::Endpoint(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn report_serializes_for_the_json_output() {
    let server = healthy_server().await;
    let harness = Harness::new(fast_settings(&server.uri()))
        .unwrap()
        .only([id(1), id(10)]);
    let report = harness.run(&Scope::new()).await.unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["base_url"], format!("{}/", server.uri()));
    assert_eq!(json["outcomes"].as_array().unwrap().len(), 2);
    assert_eq!(json["outcomes"][1]["scenario"], 10);
    assert_eq!(json["outcomes"][1]["result"]["Ok"], "right");
}

#[test]
fn default_settings_target_localhost() {
    let harness = Harness::new(Settings::default()).unwrap();
    assert_eq!(harness.settings().endpoint.base_url, "http://localhost:8080");
}
