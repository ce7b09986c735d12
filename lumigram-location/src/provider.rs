//! The location provider port.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use lumigram_core::Coordinate;

use crate::error::ProviderError;

/// Default timeout for platform location services.
pub const DEFAULT_PLATFORM_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for the standards-based fallback provider.
pub const DEFAULT_FALLBACK_TIMEOUT: Duration = Duration::from_secs(12);

/// Default maximum age of a cached fix.
pub const DEFAULT_MAXIMUM_AGE: Duration = Duration::from_secs(30);

/// Continuous stream of fixes or provider failures.
pub type LocationStream = BoxStream<'static, Result<Coordinate, ProviderError>>;

/// Per-provider request options.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use lumigram_location::ProviderOptions;
///
/// let options = ProviderOptions::default().with_timeout(Duration::from_secs(5));
/// assert_eq!(options.timeout(), Duration::from_secs(5));
/// assert!(options.high_accuracy());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderOptions {
    timeout: Duration,
    maximum_age: Duration,
    high_accuracy: bool,
}

impl ProviderOptions {
    /// Create options with the platform defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: DEFAULT_PLATFORM_TIMEOUT,
            maximum_age: DEFAULT_MAXIMUM_AGE,
            high_accuracy: true,
        }
    }

    /// Override the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override how old a cached fix may be.
    #[must_use]
    pub const fn with_maximum_age(mut self, maximum_age: Duration) -> Self {
        self.maximum_age = maximum_age;
        self
    }

    /// Request or waive high-accuracy positioning.
    #[must_use]
    pub const fn with_high_accuracy(mut self, high_accuracy: bool) -> Self {
        self.high_accuracy = high_accuracy;
        self
    }

    /// Request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Maximum age of a cached fix.
    #[must_use]
    pub const fn maximum_age(&self) -> Duration {
        self.maximum_age
    }

    /// Whether high accuracy is requested.
    #[must_use]
    pub const fn high_accuracy(&self) -> bool {
        self.high_accuracy
    }
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// A source of device location.
///
/// Implementations must stop any platform subscription when the future
/// returned by [`request_once`](Self::request_once) or the stream returned by
/// [`watch`](Self::watch) is dropped.
#[async_trait]
pub trait LocationProvider: Send + Sync + fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Cheap synchronous check that the provider can run here.
    fn is_usable(&self) -> bool;

    /// Options applied to requests against this provider.
    fn options(&self) -> ProviderOptions;

    /// Obtain a single fix.
    ///
    /// The resolver enforces [`ProviderOptions::timeout`]; implementations
    /// need not.
    async fn request_once(&self, options: &ProviderOptions) -> Result<Coordinate, ProviderError>;

    /// Open a continuous stream of fixes.
    ///
    /// # Errors
    ///
    /// The default implementation returns [`ProviderError::Unsupported`].
    fn watch(&self, options: &ProviderOptions) -> Result<LocationStream, ProviderError> {
        let _ = options;
        Err(ProviderError::Unsupported)
    }
}
