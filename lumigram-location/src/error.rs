//! Error types for location providers and the resolver.

use std::time::Duration;

use thiserror::Error;

/// Failure of a single location provider.
///
/// These are absorbed by the resolver's fallback chain and only surface as
/// the `last_error` of [`LocationError::AllProvidersFailed`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The provider lacks permission or capability in this environment.
    #[error("location provider unavailable: {reason}")]
    Unavailable {
        /// Why the provider cannot be used.
        reason: String,
    },
    /// No fix arrived before the provider's timeout.
    #[error("location request timed out after {timeout:?}")]
    Timeout {
        /// Timeout that elapsed.
        timeout: Duration,
    },
    /// The user or host denied access to location.
    #[error("location permission denied")]
    PermissionDenied,
    /// The provider does not offer continuous tracking.
    #[error("continuous tracking is not supported by this provider")]
    Unsupported,
    /// Any other provider-reported failure.
    #[error("location request failed: {message}")]
    Failed {
        /// Provider diagnostic.
        message: String,
    },
}

/// Failure of a whole resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// No provider is usable in this environment.
    #[error("no location provider is available")]
    NoProviderAvailable,
    /// Every usable provider was tried and failed.
    #[error("unable to determine location: {last_error}")]
    AllProvidersFailed {
        /// Error reported by the last provider tried.
        #[source]
        last_error: ProviderError,
    },
    /// The caller cancelled the attempt.
    #[error("location request cancelled")]
    Cancelled,
}

impl LocationError {
    /// Whether this error is a cancellation that must not be shown to users.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
