//! Ordered provider chain with fallback, timeouts and cancellation.

use std::sync::Arc;

use futures_util::StreamExt;
use log::{debug, info, warn};
use lumigram_core::Coordinate;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::error::{LocationError, ProviderError};
use crate::provider::{LocationProvider, LocationStream};

/// Resolves the device location from an ordered list of providers.
///
/// Providers are consulted in the order they were added. Each is skipped
/// unless [`LocationProvider::is_usable`] holds, and each is tried at most
/// once per resolution.
///
/// # Examples
///
/// ```
/// use lumigram_core::Coordinate;
/// use lumigram_location::{FixedProvider, LocationResolver};
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let here = Coordinate::new(46.05, 14.5)?;
/// let resolver = LocationResolver::new().with_provider(FixedProvider::new("fixed", here));
/// let fix = resolver.resolve_once(&CancellationToken::new()).await?;
/// assert_eq!(fix, here);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct LocationResolver {
    providers: Vec<Arc<dyn LocationProvider>>,
}

impl LocationResolver {
    /// Create a resolver with no providers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider to the end of the chain.
    #[must_use]
    pub fn with_provider<P>(mut self, provider: P) -> Self
    where
        P: LocationProvider + 'static,
    {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Append an already shared provider.
    #[must_use]
    pub fn with_shared_provider(mut self, provider: Arc<dyn LocationProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Names of the configured providers, in priority order.
    pub fn provider_names(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(|provider| provider.name())
    }

    fn usable(&self) -> impl Iterator<Item = &Arc<dyn LocationProvider>> {
        self.providers.iter().filter(|provider| {
            let usable = provider.is_usable();
            if !usable {
                debug!("skipping unusable location provider {}", provider.name());
            }
            usable
        })
    }

    /// Obtain a single fix from the first provider that succeeds.
    ///
    /// Cancelling `cancel` drops the in-flight provider request, which stops
    /// its platform subscription before this future resolves.
    ///
    /// # Errors
    ///
    /// - [`LocationError::NoProviderAvailable`] when no provider is usable.
    /// - [`LocationError::AllProvidersFailed`] with the last provider error
    ///   once every usable provider has failed or timed out.
    /// - [`LocationError::Cancelled`] when `cancel` fires first.
    pub async fn resolve_once(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Coordinate, LocationError> {
        let mut last_error = None;
        for provider in self.usable() {
            if cancel.is_cancelled() {
                return Err(LocationError::Cancelled);
            }
            let options = provider.options();
            let attempt = timeout(options.timeout(), provider.request_once(&options));
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(LocationError::Cancelled),
                outcome = attempt => outcome,
            };
            let error = match outcome {
                Ok(Ok(coordinate)) => {
                    debug!("location resolved via {}", provider.name());
                    return Ok(coordinate);
                }
                Ok(Err(error)) => error,
                Err(_) => ProviderError::Timeout {
                    timeout: options.timeout(),
                },
            };
            warn!("location provider {} failed: {error}", provider.name());
            last_error = Some(error);
        }
        Err(last_error.map_or(LocationError::NoProviderAvailable, |last_error| {
            LocationError::AllProvidersFailed { last_error }
        }))
    }

    /// Open continuous tracking on the first provider whose watch succeeds.
    ///
    /// The returned stream stays bound to that provider; it does not migrate
    /// to another provider if the stream later reports errors.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::NoProviderAvailable`] when no provider is
    /// usable, or [`LocationError::AllProvidersFailed`] when none could open
    /// a watch.
    pub fn subscribe(&self) -> Result<LiveTracking, LocationError> {
        let mut last_error = None;
        for provider in self.usable() {
            match provider.watch(&provider.options()) {
                Ok(stream) => {
                    info!("live tracking via {}", provider.name());
                    return Ok(LiveTracking {
                        provider: provider.name().to_owned(),
                        stream: Some(stream),
                    });
                }
                Err(error) => {
                    warn!("cannot track via {}: {error}", provider.name());
                    last_error = Some(error);
                }
            }
        }
        Err(last_error.map_or(LocationError::NoProviderAvailable, |last_error| {
            LocationError::AllProvidersFailed { last_error }
        }))
    }
}

/// Handle to a live location stream.
///
/// [`stop`](Self::stop) and `Drop` release the provider subscription
/// synchronously; no update is yielded afterwards.
pub struct LiveTracking {
    provider: String,
    stream: Option<LocationStream>,
}

impl std::fmt::Debug for LiveTracking {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveTracking")
            .field("provider", &self.provider)
            .field("active", &self.is_active())
            .finish()
    }
}

impl LiveTracking {
    /// Name of the provider feeding this stream.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Whether the stream is still open.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    /// Wait for the next fix or provider error.
    ///
    /// Returns `None` once tracking has stopped or the provider closed the
    /// stream.
    pub async fn next(&mut self) -> Option<Result<Coordinate, ProviderError>> {
        let stream = self.stream.as_mut()?;
        let item = stream.next().await;
        if item.is_none() {
            debug!("live tracking via {} ended", self.provider);
            self.stream = None;
        }
        item
    }

    /// Stop tracking and release the provider subscription.
    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            debug!("stopped live tracking via {}", self.provider);
        }
    }
}
