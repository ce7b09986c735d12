//! Multi-endpoint Overpass executor.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use lumigram_core::{PlaceOfWorship, SpatialQuery};
use reqwest::Client;
use thiserror::Error;

use super::build_query;
use super::response::{OverpassElement, OverpassResponse};
use crate::error::FetchError;
use crate::query::{FetchedPlaces, QueryExecutor, dedup_by_stable_id};

/// Public Overpass interpreters, tried in this order.
pub const DEFAULT_ENDPOINTS: [&str; 3] = [
    "https://overpass-api.de/api/interpreter",
    "https://overpass.kumi.systems/api/interpreter",
    "https://lz4.overpass-api.de/api/interpreter",
];

/// Default user agent for Overpass requests.
pub const DEFAULT_USER_AGENT: &str = "lumigram-overpass/0.1";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Error type for [`OverpassExecutor`] construction failures.
#[derive(Debug, Error)]
pub enum ExecutorBuildError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Configuration for [`OverpassExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverpassConfig {
    /// Equivalent interpreter URLs, tried in order.
    pub endpoints: Vec<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            endpoints: DEFAULT_ENDPOINTS.iter().map(|url| (*url).to_owned()).collect(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl OverpassConfig {
    /// Configuration using `endpoints` instead of the public interpreters.
    #[must_use]
    pub fn new<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            endpoints: endpoints.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// [`QueryExecutor`] backed by the Overpass API.
///
/// Each query is posted to the configured endpoints in order. A transport
/// failure, non-success status or malformed payload moves on to the next
/// endpoint with the same query; the last error is returned once every
/// endpoint has failed.
#[derive(Debug, Clone)]
pub struct OverpassExecutor {
    client: Client,
    config: OverpassConfig,
}

impl OverpassExecutor {
    /// Create an executor for the public interpreters.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new() -> Result<Self, ExecutorBuildError> {
        Self::with_config(OverpassConfig::default())
    }

    /// Create an executor with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn with_config(config: OverpassConfig) -> Result<Self, ExecutorBuildError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &OverpassConfig {
        &self.config
    }

    async fn fetch_from(&self, url: &str, body: &str) -> Result<Vec<OverpassElement>, FetchError> {
        let response = self
            .client
            .post(url)
            .form(&[("data", body)])
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err, url))?;
        let text = response
            .text()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?;
        let parsed: OverpassResponse =
            serde_json::from_str(&text).map_err(|err| FetchError::Malformed {
                url: url.to_owned(),
                message: err.to_string(),
            })?;
        Ok(parsed.elements)
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> FetchError {
        if error.is_timeout() {
            return FetchError::Timeout {
                url: url.to_owned(),
                timeout: self.config.timeout,
            };
        }

        if let Some(status) = error.status() {
            return FetchError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
            };
        }

        FetchError::Transport {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }
}

fn convert_elements(query: &SpatialQuery, elements: Vec<OverpassElement>) -> Vec<PlaceOfWorship> {
    let places = elements.into_iter().filter_map(OverpassElement::into_place);
    let unique = dedup_by_stable_id(places);
    match query {
        SpatialQuery::Radius { center, .. } => unique
            .into_iter()
            .map(|place| {
                let meters = place.coordinate.distance_to(center);
                place.with_distance(meters)
            })
            .collect(),
        SpatialQuery::Viewport(_) => unique,
    }
}

#[async_trait]
impl QueryExecutor for OverpassExecutor {
    async fn execute(&self, query: &SpatialQuery) -> Result<FetchedPlaces, FetchError> {
        let body = build_query(query);
        let mut last_error = None;
        for url in &self.config.endpoints {
            match self.fetch_from(url, &body).await {
                Ok(elements) => {
                    debug!("{url} answered {} with {} elements", query.key(), elements.len());
                    return Ok(convert_elements(query, elements).into());
                }
                Err(err) => {
                    warn!("overpass endpoint failed: {err}");
                    last_error = Some(err);
                }
            }
        }
        Err(last_error.unwrap_or(FetchError::NoEndpoints))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumigram_core::{BoundingBox, Coordinate};
    use rstest::rstest;

    #[rstest]
    fn config_builder_pattern() {
        let config = OverpassConfig::new(["http://a.example/api", "http://b.example/api"])
            .with_timeout(Duration::from_secs(3))
            .with_user_agent("test-agent/1.0");

        assert_eq!(config.endpoints, vec!["http://a.example/api", "http://b.example/api"]);
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.user_agent, "test-agent/1.0");
    }

    #[rstest]
    fn default_config_lists_public_interpreters() {
        let config = OverpassConfig::default();
        assert_eq!(config.endpoints.len(), 3);
        assert_eq!(config.endpoints[0], "https://overpass-api.de/api/interpreter");
    }

    fn element(kind: &str, id: i64, lat: f64, lon: f64) -> OverpassElement {
        OverpassElement {
            kind: kind.to_owned(),
            id,
            lat: Some(lat),
            lon: Some(lon),
            center: None,
            tags: Default::default(),
        }
    }

    #[rstest]
    fn radius_results_carry_distance() {
        let center = Coordinate::new(46.0, 14.0).expect("valid coordinate");
        let query = SpatialQuery::Radius {
            center,
            radius_m: 500.0,
        };
        let places = convert_elements(&query, vec![element("node", 1, 46.0, 14.0)]);
        assert_eq!(places[0].distance_from_origin, Some(0.0));
    }

    #[rstest]
    fn viewport_results_are_deduplicated() {
        let bbox = BoundingBox::new(45.0, 13.0, 47.0, 15.0).expect("valid bbox");
        let places = convert_elements(
            &SpatialQuery::Viewport(bbox),
            vec![
                element("way", 7, 46.0, 14.0),
                element("way", 7, 46.1, 14.1),
                element("node", 7, 46.2, 14.2),
            ],
        );
        let ids: Vec<_> = places.iter().map(|p| p.stable_id.as_str()).collect();
        assert_eq!(ids, vec!["way/7", "node/7"]);
        assert!(places.iter().all(|p| p.distance_from_origin.is_none()));
    }
}
