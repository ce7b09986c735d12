//! Selection and construction of the places data source.

use std::sync::Arc;

use clap::ValueEnum;
use lumigram_data::{
    ClosestPoiClient, ClosestPoiConfig, OverpassConfig, OverpassExecutor, QueryExecutor,
};
use serde::{Deserialize, Serialize};

use crate::CliError;

/// Upstream answering places queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum PlaceSource {
    /// The closest-places backend service.
    #[default]
    Backend,
    /// Public Overpass interpreters.
    Overpass,
}

/// Resolved data source settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SourceConfig {
    pub(crate) kind: PlaceSource,
    pub(crate) backend_url: Option<String>,
    pub(crate) host_origin: Option<String>,
    pub(crate) overpass_endpoints: Vec<String>,
}

impl SourceConfig {
    /// Settings for an Overpass source, using the public interpreters when
    /// `endpoints` is empty.
    pub(crate) fn overpass(endpoints: Option<Vec<String>>) -> Self {
        Self {
            kind: PlaceSource::Overpass,
            overpass_endpoints: endpoints.unwrap_or_default(),
            ..Self::default()
        }
    }

    pub(crate) fn overpass_config(&self) -> OverpassConfig {
        if self.overpass_endpoints.is_empty() {
            OverpassConfig::default()
        } else {
            OverpassConfig::new(self.overpass_endpoints.iter().cloned())
        }
    }

    pub(crate) fn backend_config(&self) -> ClosestPoiConfig {
        let config = self
            .backend_url
            .as_ref()
            .map_or_else(ClosestPoiConfig::default, ClosestPoiConfig::new);
        match &self.host_origin {
            Some(origin) => config.with_host_origin(origin.clone()),
            None => config,
        }
    }
}

/// Builds the query executor for the current invocation.
pub(crate) trait PlaceSourceBuilder {
    fn build(&self, config: &SourceConfig) -> Result<Arc<dyn QueryExecutor>, CliError>;
}

pub(crate) struct DefaultPlaceSourceBuilder;

impl PlaceSourceBuilder for DefaultPlaceSourceBuilder {
    fn build(&self, config: &SourceConfig) -> Result<Arc<dyn QueryExecutor>, CliError> {
        match config.kind {
            PlaceSource::Overpass => {
                let executor = OverpassExecutor::with_config(config.overpass_config())
                    .map_err(CliError::BuildOverpass)?;
                Ok(Arc::new(executor))
            }
            PlaceSource::Backend => {
                let client = ClosestPoiClient::with_config(config.backend_config())
                    .map_err(CliError::BuildBackend)?;
                Ok(Arc::new(client))
            }
        }
    }
}
