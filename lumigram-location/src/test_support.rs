//! Test utilities for location providers.
//!
//! [`StubProvider`] answers with a pre-configured result after an optional
//! delay, counting how often it was asked and how often a request ran to
//! completion. Clones share their counters.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use lumigram_core::Coordinate;

use crate::error::ProviderError;
use crate::provider::{LocationProvider, LocationStream, ProviderOptions};

/// Deterministic [`LocationProvider`] for tests.
///
/// # Example
///
/// ```
/// use lumigram_core::Coordinate;
/// use lumigram_location::{LocationResolver, test_support::StubProvider};
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let here = Coordinate::new(1.0, 2.0)?;
/// let stub = StubProvider::succeeding("stub", here);
/// let resolver = LocationResolver::new().with_provider(stub.clone());
/// assert_eq!(resolver.resolve_once(&CancellationToken::new()).await?, here);
/// assert_eq!(stub.calls(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct StubProvider {
    name: String,
    usable: bool,
    delay: Duration,
    options: ProviderOptions,
    result: Result<Coordinate, ProviderError>,
    watch_items: Option<Vec<Result<Coordinate, ProviderError>>>,
    calls: Arc<AtomicUsize>,
    completions: Arc<AtomicUsize>,
}

impl StubProvider {
    fn with_result(name: &str, result: Result<Coordinate, ProviderError>) -> Self {
        Self {
            name: name.to_owned(),
            usable: true,
            delay: Duration::ZERO,
            options: ProviderOptions::default(),
            result,
            watch_items: None,
            calls: Arc::new(AtomicUsize::new(0)),
            completions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Provider that answers with `coordinate`.
    #[must_use]
    pub fn succeeding(name: &str, coordinate: Coordinate) -> Self {
        Self::with_result(name, Ok(coordinate))
    }

    /// Provider that answers with `error`.
    #[must_use]
    pub fn failing(name: &str, error: ProviderError) -> Self {
        Self::with_result(name, Err(error))
    }

    /// Mark the provider unusable in this environment.
    #[must_use]
    pub const fn unusable(mut self) -> Self {
        self.usable = false;
        self
    }

    /// Delay every one-shot answer.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Override the timeout the resolver applies to this provider.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.with_timeout(timeout);
        self
    }

    /// Support continuous tracking, yielding `items` and then staying open.
    #[must_use]
    pub fn with_watch(mut self, items: Vec<Result<Coordinate, ProviderError>>) -> Self {
        self.watch_items = Some(items);
        self
    }

    /// Number of one-shot requests started.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of one-shot requests that ran to completion.
    #[must_use]
    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationProvider for StubProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_usable(&self) -> bool {
        self.usable
    }

    fn options(&self) -> ProviderOptions {
        self.options
    }

    async fn request_once(&self, _options: &ProviderOptions) -> Result<Coordinate, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.completions.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }

    fn watch(&self, _options: &ProviderOptions) -> Result<LocationStream, ProviderError> {
        let items = self.watch_items.clone().ok_or(ProviderError::Unsupported)?;
        Ok(stream::iter(items).chain(stream::pending()).boxed())
    }
}
