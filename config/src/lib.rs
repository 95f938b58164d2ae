//! Configuration loading for contend.
//!
//! ```toml
//! [endpoint]
//! base_url = "http://localhost:8080"
//! connect_timeout_ms = 30000
//! request_timeout_ms = 10000
//!
//! [scenarios]
//! stress_replicas = 10000
//! race_width = 3
//! deadline_ms = 3000
//! delay_ms = 3000
//! poll_interval_ms = 1000
//! collector_capacity = 5
//! collector_producers = 10
//!
//! [pool]
//! size = 1
//! ```
//!
//! Every field is optional. Precedence, lowest first: built-in defaults, the
//! config file, then `CONTEND_PORT` and `CONTEND_BASE_URL`.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use contend_types::Settings;
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_ENV: &str = "CONTEND_CONFIG";
pub const BASE_URL_ENV: &str = "CONTEND_BASE_URL";
pub const PORT_ENV: &str = "CONTEND_PORT";

#[derive(Debug, Default, Deserialize)]
pub struct HarnessConfig {
    pub endpoint: Option<EndpointConfig>,
    pub scenarios: Option<ScenariosConfig>,
    pub pool: Option<PoolConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EndpointConfig {
    pub base_url: Option<String>,
    pub connect_timeout_ms: Option<u64>,
    /// Whole-request bound applied by the HTTP client. Unset by default.
    pub request_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScenariosConfig {
    pub stress_replicas: Option<usize>,
    pub race_width: Option<usize>,
    pub deadline_ms: Option<u64>,
    pub delay_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub collector_capacity: Option<usize>,
    pub collector_producers: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PoolConfig {
    pub size: Option<usize>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => Some(path),
            ConfigError::Invalid { .. } => None,
        }
    }

    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

impl HarnessConfig {
    /// Read and parse `path`. A missing file is `Ok(None)`.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    /// Validate and fill defaults.
    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        let mut settings = Settings::default();

        if let Some(endpoint) = &self.endpoint {
            if let Some(base_url) = &endpoint.base_url {
                settings.endpoint.base_url = non_empty("endpoint.base_url", base_url)?;
            }
            if let Some(ms) = endpoint.connect_timeout_ms {
                settings.endpoint.connect_timeout = positive_ms("endpoint.connect_timeout_ms", ms)?;
            }
            if let Some(ms) = endpoint.request_timeout_ms {
                settings.endpoint.request_timeout =
                    Some(positive_ms("endpoint.request_timeout_ms", ms)?);
            }
        }

        if let Some(scenarios) = &self.scenarios {
            let target = &mut settings.scenarios;
            if let Some(n) = scenarios.stress_replicas {
                target.stress_replicas = at_least_one("scenarios.stress_replicas", n)?;
            }
            if let Some(n) = scenarios.race_width {
                target.race_width = at_least_one("scenarios.race_width", n)?;
            }
            if let Some(n) = scenarios.collector_capacity {
                target.collector_capacity = at_least_one("scenarios.collector_capacity", n)?;
            }
            if let Some(n) = scenarios.collector_producers {
                target.collector_producers = at_least_one("scenarios.collector_producers", n)?;
            }
            if let Some(ms) = scenarios.deadline_ms {
                target.deadline = Duration::from_millis(ms);
            }
            if let Some(ms) = scenarios.delay_ms {
                target.delay = Duration::from_millis(ms);
            }
            if let Some(ms) = scenarios.poll_interval_ms {
                target.poll_interval = Duration::from_millis(ms);
            }
        }

        if let Some(size) = self.pool.as_ref().and_then(|pool| pool.size) {
            settings.pool.size = at_least_one("pool.size", size)?;
        }

        Ok(settings)
    }
}

/// `CONTEND_BASE_URL` / `CONTEND_PORT` overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub base_url: Option<String>,
    pub port: Option<String>,
}

impl EnvOverrides {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            base_url: read(BASE_URL_ENV),
            port: read(PORT_ENV),
        }
    }

    /// A full base URL wins over a bare port.
    pub fn apply(&self, settings: &mut Settings) -> Result<(), ConfigError> {
        if let Some(base_url) = &self.base_url {
            settings.endpoint.base_url = base_url.trim().to_string();
        } else if let Some(port) = &self.port {
            let port =
                parse_port(port).map_err(|reason| ConfigError::invalid(PORT_ENV, reason))?;
            settings.endpoint.base_url = format!("http://localhost:{port}");
        }
        Ok(())
    }
}

pub fn parse_port(raw: &str) -> Result<u16, String> {
    match raw.trim().parse::<u16>() {
        Ok(0) => Err("port must be between 1 and 65535".to_string()),
        Ok(port) => Ok(port),
        Err(err) => Err(format!("{raw:?} is not a port: {err}")),
    }
}

/// Default config location: `$CONTEND_CONFIG`, else `~/.contend/config.toml`.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|path| !path.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".contend").join("config.toml"))
}

/// Load, resolve, and apply environment overrides.
///
/// An explicit `path` must exist; the default location may be absent.
pub fn load_settings(path: Option<&Path>, env: &EnvOverrides) -> Result<Settings, ConfigError> {
    let config = match path {
        Some(path) => match HarnessConfig::load(path)? {
            Some(config) => config,
            None => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
                });
            }
        },
        None => config_path()
            .map(|path| HarnessConfig::load(&path))
            .transpose()?
            .flatten()
            .unwrap_or_default(),
    };

    let mut settings = config.resolve()?;
    env.apply(&mut settings)?;
    tracing::debug!(base_url = %settings.endpoint.base_url, "configuration resolved");
    Ok(settings)
}

fn non_empty(field: &'static str, value: &str) -> Result<String, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::invalid(field, "must not be empty"));
    }
    Ok(value.to_string())
}

fn positive_ms(field: &'static str, ms: u64) -> Result<Duration, ConfigError> {
    if ms == 0 {
        return Err(ConfigError::invalid(field, "must be greater than zero"));
    }
    Ok(Duration::from_millis(ms))
}

fn at_least_one(field: &'static str, n: usize) -> Result<NonZeroUsize, ConfigError> {
    NonZeroUsize::new(n).ok_or_else(|| ConfigError::invalid(field, "must be at least 1"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use contend_types::DEFAULT_BASE_URL;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parse_empty_config() {
        let config: HarnessConfig = toml::from_str("").unwrap();
        assert!(config.endpoint.is_none());
        assert!(config.scenarios.is_none());
        assert!(config.pool.is_none());
        assert_eq!(config.resolve().unwrap(), Settings::default());
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
[endpoint]
base_url = "http://127.0.0.1:9000"
connect_timeout_ms = 500
request_timeout_ms = 2000

[scenarios]
stress_replicas = 200
race_width = 4
deadline_ms = 100
delay_ms = 250
poll_interval_ms = 10
collector_capacity = 2
collector_producers = 6

[pool]
size = 2
"#;
        let config: HarnessConfig = toml::from_str(toml_str).unwrap();
        let settings = config.resolve().unwrap();

        assert_eq!(settings.endpoint.base_url, "http://127.0.0.1:9000");
        assert_eq!(settings.endpoint.connect_timeout, Duration::from_millis(500));
        assert_eq!(
            settings.endpoint.request_timeout,
            Some(Duration::from_secs(2))
        );
        assert_eq!(settings.scenarios.stress_replicas.get(), 200);
        assert_eq!(settings.scenarios.race_width.get(), 4);
        assert_eq!(settings.scenarios.deadline, Duration::from_millis(100));
        assert_eq!(settings.scenarios.delay, Duration::from_millis(250));
        assert_eq!(settings.scenarios.poll_interval, Duration::from_millis(10));
        assert_eq!(settings.scenarios.collector_capacity.get(), 2);
        assert_eq!(settings.scenarios.collector_producers.get(), 6);
        assert_eq!(settings.pool.size.get(), 2);
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config: HarnessConfig = toml::from_str("[scenarios]\nstress_replicas = 50\n").unwrap();
        let settings = config.resolve().unwrap();
        assert_eq!(settings.scenarios.stress_replicas.get(), 50);
        assert_eq!(settings.scenarios.race_width.get(), 3);
        assert_eq!(settings.endpoint.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn zero_counts_are_rejected() {
        let config: HarnessConfig = toml::from_str("[pool]\nsize = 0\n").unwrap();
        let err = config.resolve().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "pool.size", .. }));

        let config: HarnessConfig =
            toml::from_str("[scenarios]\ncollector_capacity = 0\n").unwrap();
        assert!(config.resolve().is_err());
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        let config: HarnessConfig =
            toml::from_str("[endpoint]\nconnect_timeout_ms = 0\n").unwrap();
        assert!(matches!(
            config.resolve(),
            Err(ConfigError::Invalid {
                field: "endpoint.connect_timeout_ms",
                ..
            })
        ));
    }

    #[test]
    fn load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = HarnessConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let file = write_config("[endpoint\nbase_url = ");
        let err = HarnessConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.path(), Some(file.path()));
    }

    #[test]
    fn load_settings_requires_an_explicit_file_to_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("contend.toml");
        let err = load_settings(Some(&missing), &EnvOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn load_settings_reads_an_explicit_file() {
        let file = write_config("[endpoint]\nbase_url = \"http://10.0.0.1:81\"\n");
        let settings = load_settings(Some(file.path()), &EnvOverrides::default()).unwrap();
        assert_eq!(settings.endpoint.base_url, "http://10.0.0.1:81");
    }

    #[test]
    fn env_port_overrides_file_base_url() {
        let file = write_config("[endpoint]\nbase_url = \"http://10.0.0.1:81\"\n");
        let env = EnvOverrides::from_lookup(|key| (key == PORT_ENV).then(|| "4000".to_string()));
        let settings = load_settings(Some(file.path()), &env).unwrap();
        assert_eq!(settings.endpoint.base_url, "http://localhost:4000");
    }

    #[test]
    fn env_base_url_wins_over_port() {
        let env = EnvOverrides::from_lookup(|key| match key {
            BASE_URL_ENV => Some("http://mock.test:7".to_string()),
            PORT_ENV => Some("4000".to_string()),
            _ => None,
        });
        let mut settings = Settings::default();
        env.apply(&mut settings).unwrap();
        assert_eq!(settings.endpoint.base_url, "http://mock.test:7");
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let env = EnvOverrides::from_lookup(|_| Some("  ".to_string()));
        assert_eq!(env, EnvOverrides::default());
    }

    #[test]
    fn bad_env_port_is_invalid() {
        let env = EnvOverrides {
            base_url: None,
            port: Some("http".to_string()),
        };
        let err = env.apply(&mut Settings::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "CONTEND_PORT", .. }));
    }

    #[test]
    fn parse_port_bounds() {
        assert_eq!(parse_port("8080"), Ok(8080));
        assert_eq!(parse_port(" 1 "), Ok(1));
        assert!(parse_port("0").is_err());
        assert!(parse_port("65536").is_err());
    }
}
