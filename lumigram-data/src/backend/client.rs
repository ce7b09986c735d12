//! HTTP client for the closest-places endpoint.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use lumigram_core::{Coordinate, PlaceOfWorship, SpatialQuery};
use reqwest::Client;
use thiserror::Error;
use url::Url;

use super::response::{ClosestPoiResponse, error_message};
use crate::error::FetchError;
use crate::query::{CategoryCount, FetchedPlaces, QueryExecutor, dedup_by_stable_id};

/// Origin used when neither a base URL nor a host origin is configured.
pub const DEFAULT_ORIGIN: &str = "http://localhost:3000";

/// Path of the endpoint, relative to the base URL.
pub const API_PATH: &str = "api/closest-poi";

/// Default user agent for backend requests.
pub const DEFAULT_USER_AGENT: &str = "lumigram-backend/0.1";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default search radius.
pub const DEFAULT_RADIUS_KM: f64 = 10.0;

/// Smallest accepted search radius.
pub const MIN_RADIUS_KM: f64 = 0.0;

/// Largest accepted search radius.
pub const MAX_RADIUS_KM: f64 = 100.0;

/// Message used when an error response carries none.
pub const DEFAULT_ERROR_MESSAGE: &str = "Unable to retrieve nearby places of worship.";

/// Error type for [`ClosestPoiClient`] construction failures.
#[derive(Debug, Error)]
pub enum ClientBuildError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    /// The configured base URL or origin is not a valid URL.
    #[error("invalid backend URL {url}: {source}")]
    InvalidUrl {
        /// Offending value.
        url: String,
        /// Parser diagnostic.
        #[source]
        source: url::ParseError,
    },
}

/// Configuration for [`ClosestPoiClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosestPoiConfig {
    /// Explicit API base URL; takes precedence over the host origin.
    pub base_url: Option<String>,
    /// Origin of the hosting page or service.
    pub host_origin: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for ClosestPoiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            host_origin: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl ClosestPoiConfig {
    /// Create a configuration with an explicit base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Self::default()
        }
    }

    /// Set the host origin used when no base URL is configured.
    #[must_use]
    pub fn with_host_origin(mut self, origin: impl Into<String>) -> Self {
        self.host_origin = Some(origin.into());
        self
    }

    /// Set the request timeout.
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

    /// Resolve the endpoint URL.
    ///
    /// A non-blank base URL gains a trailing slash and the path is joined
    /// relative to it, so `https://host/app` resolves to
    /// `https://host/app/api/closest-poi`. Otherwise the path is resolved
    /// against the host origin, falling back to [`DEFAULT_ORIGIN`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError::InvalidUrl`] when the chosen value does not
    /// parse.
    pub fn resolve_api_url(&self) -> Result<Url, ClientBuildError> {
        let configured = self
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|base| !base.is_empty());
        let (raw, path) = match configured {
            Some(base) if base.ends_with('/') => (base.to_owned(), API_PATH.to_owned()),
            Some(base) => (format!("{base}/"), API_PATH.to_owned()),
            None => (
                self.host_origin
                    .as_deref()
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .unwrap_or(DEFAULT_ORIGIN)
                    .to_owned(),
                format!("/{API_PATH}"),
            ),
        };
        Url::parse(&raw)
            .and_then(|base| base.join(&path))
            .map_err(|source| ClientBuildError::InvalidUrl { url: raw, source })
    }
}

/// Clamp a requested radius into the accepted range.
///
/// Non-finite input yields [`DEFAULT_RADIUS_KM`].
#[must_use]
pub fn clamp_radius_km(radius_km: f64) -> f64 {
    if radius_km.is_finite() {
        radius_km.clamp(MIN_RADIUS_KM, MAX_RADIUS_KM)
    } else {
        DEFAULT_RADIUS_KM
    }
}

/// Places returned by the backend for one centre.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosestPlaces {
    /// Radius the backend searched, in metres.
    pub radius_meters: f64,
    /// Number of places the backend reported, falling back to the number of
    /// items when it omits the count.
    pub count: usize,
    /// Upstream the backend queried.
    pub source: String,
    /// Category summary, passed through unchanged.
    pub categories: Vec<CategoryCount>,
    /// Places in response order, each with its distance from the centre.
    pub items: Vec<PlaceOfWorship>,
}

impl From<ClosestPlaces> for FetchedPlaces {
    fn from(places: ClosestPlaces) -> Self {
        Self {
            items: places.items,
            categories: places.categories,
            reported_count: Some(places.count),
            radius_m: Some(places.radius_meters),
        }
    }
}

/// Client for the backend `closest-poi` endpoint.
///
/// Also usable as a [`QueryExecutor`] for [`SpatialQuery::Radius`] queries.
#[derive(Debug, Clone)]
pub struct ClosestPoiClient {
    client: Client,
    config: ClosestPoiConfig,
    api_url: Url,
}

impl ClosestPoiClient {
    /// Create a client for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client fails to
    /// build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientBuildError> {
        Self::with_config(ClosestPoiConfig::new(base_url))
    }

    /// Create a client with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client fails to
    /// build.
    pub fn with_config(config: ClosestPoiConfig) -> Result<Self, ClientBuildError> {
        let api_url = config.resolve_api_url()?;
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            config,
            api_url,
        })
    }

    /// Resolved endpoint URL, without query parameters.
    #[must_use]
    pub const fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// Fetch the places within `radius_km` of `center`.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Backend`] when the backend answers with a non-success
    ///   status; the message comes from the payload when present.
    /// - [`FetchError::Malformed`] when a success payload does not parse.
    /// - [`FetchError::Timeout`] or [`FetchError::Transport`] on network
    ///   failure.
    pub async fn closest(
        &self,
        center: Coordinate,
        radius_km: f64,
    ) -> Result<ClosestPlaces, FetchError> {
        let radius = clamp_radius_km(radius_km);
        let url = self.api_url.as_str();
        let response = self
            .client
            .get(self.api_url.clone())
            .query(&[
                ("lat", center.latitude().to_string()),
                ("lon", center.longitude().to_string()),
                ("radiusKm", radius.to_string()),
            ])
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?;

        if !status.is_success() {
            let message = error_message(&body).unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_owned());
            warn!("backend {url} answered HTTP {status}: {message}");
            return Err(FetchError::Backend {
                url: url.to_owned(),
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ClosestPoiResponse =
            serde_json::from_str(&body).map_err(|err| FetchError::Malformed {
                url: url.to_owned(),
                message: err.to_string(),
            })?;
        debug!(
            "backend returned {} of {:?} items from {}",
            parsed.items.len(),
            parsed.count,
            parsed.source
        );
        let items = dedup_by_stable_id(
            parsed
                .items
                .into_iter()
                .filter_map(super::response::ClosestPoiItem::into_place),
        );
        Ok(ClosestPlaces {
            radius_meters: parsed.radius_meters,
            count: parsed.count.unwrap_or(items.len()),
            source: parsed.source,
            categories: parsed.categories,
            items,
        })
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

#[async_trait]
impl QueryExecutor for ClosestPoiClient {
    async fn execute(&self, query: &SpatialQuery) -> Result<FetchedPlaces, FetchError> {
        match query {
            SpatialQuery::Radius { center, radius_m } => self
                .closest(*center, radius_m / 1000.0)
                .await
                .map(FetchedPlaces::from),
            SpatialQuery::Viewport(_) => Err(FetchError::Unsupported {
                query: query.key().to_string(),
            }),
        }
    }
}
