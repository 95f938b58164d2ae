//! Remote scenario endpoint.
//!
//! Every scenario talks to `<base>/<n>[?query]`. [`Endpoint::fetch`] returns
//! the status and body whatever the status class; [`Endpoint::fetch_text`]
//! insists on a 2xx answer. Redirects are never followed so callers can
//! observe 3xx statuses, and nothing is retried.

use std::time::Duration;

use contend_engine::{Operation, Scope};
use contend_types::{EndpointResponse, EndpointSettings, Failure, ScenarioId};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("invalid base URL {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("base URL {0:?} cannot carry a path")]
    NotABase(String),
    #[error("unsupported base URL scheme {0:?}")]
    UnsupportedScheme(String),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Handle to the scenario endpoint. Cloning shares the connection pool.
#[derive(Debug, Clone)]
pub struct Endpoint {
    client: reqwest::Client,
    base: Url,
    connect_timeout: Duration,
    request_timeout: Option<Duration>,
}

impl Endpoint {
    pub fn new(settings: &EndpointSettings) -> Result<Self, EndpointError> {
        let base = parse_base(&settings.base_url)?;

        let mut builder = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .redirect(reqwest::redirect::Policy::none());
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base,
            connect_timeout: settings.connect_timeout,
            request_timeout: settings.request_timeout,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// `<base>/<scenario>` with `query` appended verbatim after `?`.
    #[must_use]
    pub fn url(&self, scenario: ScenarioId, query: Option<&str>) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&scenario.to_string());
        }
        url.set_query(query);
        url
    }

    /// GET the scenario URL and return its status and body, for any status.
    pub fn fetch(&self, scenario: ScenarioId, query: Option<&str>) -> Operation<EndpointResponse> {
        let endpoint = self.clone();
        let url = self.url(scenario, query);
        Operation::new(move |scope| {
            let endpoint = endpoint.clone();
            let url = url.clone();
            async move { endpoint.get(&scope, url).await }
        })
    }

    /// GET the scenario URL and return its body, requiring a 2xx status.
    pub fn fetch_text(&self, scenario: ScenarioId, query: Option<&str>) -> Operation<String> {
        let endpoint = self.clone();
        let url = self.url(scenario, query);
        Operation::new(move |scope| {
            let endpoint = endpoint.clone();
            let url = url.clone();
            async move {
                let response = endpoint.get(&scope, url.clone()).await?;
                if response.is_success() {
                    Ok(response.body)
                } else {
                    Err(Failure::NonSuccessStatus {
                        url: url.into(),
                        status: response.status,
                    })
                }
            }
        })
    }

    async fn get(&self, scope: &Scope, url: Url) -> Result<EndpointResponse, Failure> {
        scope.check()?;
        let request = async {
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|err| self.transport_failure(&url, &err))?;
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|err| self.transport_failure(&url, &err))?;
            Ok(EndpointResponse { status, body })
        };

        let response = scope.guard(request).await??;
        tracing::debug!(url = %url, status = response.status, "endpoint answered");
        Ok(response)
    }

    fn transport_failure(&self, url: &Url, err: &reqwest::Error) -> Failure {
        if err.is_timeout() {
            let after = if err.is_connect() {
                self.connect_timeout
            } else {
                self.request_timeout.unwrap_or(self.connect_timeout)
            };
            tracing::debug!(url = %url, after_ms = after.as_millis() as u64, "endpoint timed out");
            return Failure::Timeout { after };
        }
        tracing::debug!(url = %url, error = %err, "endpoint transport error");
        Failure::network(url.as_str(), err)
    }
}

fn parse_base(raw: &str) -> Result<Url, EndpointError> {
    let base = Url::parse(raw).map_err(|source| EndpointError::InvalidBaseUrl {
        url: raw.to_string(),
        source,
    })?;
    if base.cannot_be_a_base() {
        return Err(EndpointError::NotABase(raw.to_string()));
    }
    match base.scheme() {
        "http" | "https" => Ok(base),
        other => Err(EndpointError::UnsupportedScheme(other.to_string())),
    }
}
