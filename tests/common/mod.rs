//! Shared test utilities and fixtures
//!
//! A well-behaved scenario endpoint on a wiremock server, plus settings
//! scaled down so a full run finishes quickly.

#![allow(dead_code)]

use std::num::NonZeroUsize;
use std::time::Duration;

use contend_types::{ScenarioId, ScenarioSettings, Settings};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Body every plain scenario answers with.
pub const BODY: &str = "right";
/// Handle returned by scenario 8's open call.
pub const HANDLE: &str = "h1";

pub fn id(n: u64) -> ScenarioId {
    ScenarioId::new(n).unwrap()
}

/// Defaults aimed at `base_url`, with every count and wait shrunk.
pub fn fast_settings(base_url: &str) -> Settings {
    let mut settings = Settings::for_base_url(base_url);
    settings.scenarios = ScenarioSettings {
        stress_replicas: NonZeroUsize::new(50).unwrap(),
        deadline: Duration::from_millis(500),
        delay: Duration::from_millis(500),
        poll_interval: Duration::from_millis(10),
        ..ScenarioSettings::default()
    };
    settings
}

/// Mount a `200 BODY` answer on `/<n>` for each plain racing scenario.
pub async fn mount_plain(server: &MockServer, scenarios: &[u8]) {
    for n in scenarios {
        Mock::given(method("GET"))
            .and(path(format!("/{n}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(BODY))
            .mount(server)
            .await;
    }
}

pub async fn mount_resource(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/8"))
        .and(query_param("open", ""))
        .respond_with(ResponseTemplate::new(200).set_body_string(HANDLE))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/8"))
        .and(query_param("use", HANDLE))
        .respond_with(ResponseTemplate::new(200).set_body_string(BODY))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/8"))
        .and(query_param("close", HANDLE))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

pub async fn mount_collector(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/9"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x"))
        .mount(server)
        .await;
}

/// Scenario 10: the raw call answers, and polling redirects once first.
pub async fn mount_zip(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/10"))
        .and(query_param("id", "null"))
        .respond_with(ResponseTemplate::new(307))
        .up_to_n_times(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/10"))
        .and(query_param("id", "null"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/10"))
        .and(query_param("id", ""))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

/// A server on which every scenario succeeds.
pub async fn healthy_server() -> MockServer {
    let server = MockServer::start().await;
    mount_plain(&server, &[1, 2, 3, 4, 5, 6, 7]).await;
    mount_resource(&server).await;
    mount_collector(&server).await;
    mount_zip(&server).await;
    server
}

/// A server that accepts every request and never answers in time.
pub async fn stalled_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;
    server
}

/// Base URL on a local port that was just released, so connections are refused.
pub fn closed_port_uri() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}
