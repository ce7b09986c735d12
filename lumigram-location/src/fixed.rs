//! A provider answering with a configured coordinate.

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use lumigram_core::Coordinate;

use crate::error::ProviderError;
use crate::provider::{LocationProvider, LocationStream, ProviderOptions};

/// Provider reporting a fixed coordinate, such as one given on the command
/// line.
///
/// Its live stream yields the coordinate once and then stays open without
/// further updates.
#[derive(Debug, Clone)]
pub struct FixedProvider {
    name: String,
    coordinate: Coordinate,
    options: ProviderOptions,
}

impl FixedProvider {
    /// Create a provider reporting `coordinate`.
    #[must_use]
    pub fn new(name: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            name: name.into(),
            coordinate,
            options: ProviderOptions::default(),
        }
    }

    /// Override the request options.
    #[must_use]
    pub fn with_options(mut self, options: ProviderOptions) -> Self {
        self.options = options;
        self
    }
}

#[async_trait]
impl LocationProvider for FixedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_usable(&self) -> bool {
        true
    }

    fn options(&self) -> ProviderOptions {
        self.options
    }

    async fn request_once(&self, _options: &ProviderOptions) -> Result<Coordinate, ProviderError> {
        Ok(self.coordinate)
    }

    fn watch(&self, _options: &ProviderOptions) -> Result<LocationStream, ProviderError> {
        Ok(stream::once(std::future::ready(Ok(self.coordinate)))
            .chain(stream::pending())
            .boxed())
    }
}
