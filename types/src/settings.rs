//! Resolved configuration types shared across crates.
//!
//! These types represent fully-validated, resolved configuration state.
//! Raw TOML deserialization structs (with `Option` fields) stay in
//! `contend-config`. The config loader resolves them into these types at
//! the parse boundary.
//!
//! Counts are `NonZeroUsize`: a zero-width race or a zero-capacity
//! collector cannot be expressed.

use std::num::NonZeroUsize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub endpoint: EndpointSettings,
    pub scenarios: ScenarioSettings,
    pub pool: PoolSettings,
}

impl Settings {
    /// Defaults pointed at `http://localhost:{port}`.
    #[must_use]
    pub fn for_port(port: u16) -> Self {
        Self::for_base_url(format!("http://localhost:{port}"))
    }

    #[must_use]
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        Self {
            endpoint: EndpointSettings {
                base_url: base_url.into(),
                ..EndpointSettings::default()
            },
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Whole-request timeout enforced by the HTTP client. `None` leaves
    /// bounding to the scenario combinators.
    pub request_timeout: Option<Duration>,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(30),
            request_timeout: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioSettings {
    /// Duplicate racers launched by scenario 3.
    pub stress_replicas: NonZeroUsize,
    /// Duplicate racers launched by scenario 6.
    pub race_width: NonZeroUsize,
    /// Bound applied to the second racer of scenario 4.
    pub deadline: Duration,
    /// Start delay applied to the second racer of scenario 7.
    pub delay: Duration,
    /// Spacing between polls in scenario 10.
    pub poll_interval: Duration,
    pub collector_capacity: NonZeroUsize,
    pub collector_producers: NonZeroUsize,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            stress_replicas: NonZeroUsize::new(10_000).unwrap_or(NonZeroUsize::MIN),
            race_width: NonZeroUsize::new(3).unwrap_or(NonZeroUsize::MIN),
            deadline: Duration::from_secs(3),
            delay: Duration::from_secs(3),
            poll_interval: Duration::from_secs(1),
            collector_capacity: NonZeroUsize::new(5).unwrap_or(NonZeroUsize::MIN),
            collector_producers: NonZeroUsize::new(10).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub size: NonZeroUsize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            size: NonZeroUsize::MIN,
        }
    }
}
