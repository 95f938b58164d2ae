//! Config file driving a harness run

use std::io::Write;
use std::time::Duration;

use contend_config::{EnvOverrides, load_settings};
use contend_core::Harness;
use contend_engine::Scope;

use crate::common::{BODY, healthy_server, id};

fn config_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn file_settings_reach_the_scenarios() {
    let server = healthy_server().await;
    let file = config_file(&format!(
        r#"
[endpoint]
base_url = "{}"
request_timeout_ms = 5000

[scenarios]
stress_replicas = 25
race_width = 5
delay_ms = 200
poll_interval_ms = 5

[pool]
size = 2
"#,
        server.uri()
    ));

    let settings = load_settings(Some(file.path()), &EnvOverrides::default()).unwrap();
    assert_eq!(settings.scenarios.stress_replicas.get(), 25);
    assert_eq!(settings.scenarios.delay, Duration::from_millis(200));
    assert_eq!(settings.pool.size.get(), 2);

    let report = Harness::new(settings)
        .unwrap()
        .only([id(3), id(6), id(7), id(10)])
        .run(&Scope::new())
        .await
        .unwrap();

    assert_eq!(report.failed(), 0, "{:#?}", report.outcomes);
    assert_eq!(report.outcome(id(6)).unwrap().value(), Some(BODY));
}

#[test]
fn env_port_overrides_the_file_endpoint() {
    let file = config_file("[endpoint]\nbase_url = \"http://10.255.255.1:1\"\n");
    let env = EnvOverrides {
        base_url: None,
        port: Some("4321".to_string()),
    };
    let settings = load_settings(Some(file.path()), &env).unwrap();
    let harness = Harness::new(settings).unwrap();
    assert_eq!(harness.settings().endpoint.base_url, "http://localhost:4321");
}
