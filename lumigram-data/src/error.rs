//! Error types for spatial fetches and cached queries.

use std::time::Duration;

use thiserror::Error;

/// Failure of a single executor fetch.
///
/// Every variant except [`FetchError::Unsupported`] is eligible for endpoint
/// failover. Variants are `Clone` so one result can be shared with every
/// caller waiting on the same fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request could not be sent or the response body could not be read.
    #[error("network error contacting {url}: {message}")]
    Transport {
        /// Endpoint that failed.
        url: String,
        /// Transport diagnostic.
        message: String,
    },
    /// The endpoint did not answer within the per-request timeout.
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout {
        /// Endpoint that timed out.
        url: String,
        /// Per-request timeout.
        timeout: Duration,
    },
    /// The endpoint answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Endpoint that failed.
        url: String,
        /// HTTP status code.
        status: u16,
    },
    /// The payload did not have the expected shape.
    #[error("malformed response from {url}: {message}")]
    Malformed {
        /// Endpoint that answered.
        url: String,
        /// Parser diagnostic.
        message: String,
    },
    /// The backend reported an error payload.
    #[error("{message} (HTTP {status} from {url})")]
    Backend {
        /// Endpoint that answered.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Human-readable message from the payload.
        message: String,
    },
    /// The executor cannot answer this kind of query.
    #[error("query not supported by this executor: {query}")]
    Unsupported {
        /// Key of the rejected query.
        query: String,
    },
    /// No endpoint is configured.
    #[error("no endpoints configured")]
    NoEndpoints,
}

impl FetchError {
    /// Short message suitable for end users.
    ///
    /// Backend payload messages are passed through; everything else collapses
    /// to a generic sentence.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Backend { message, .. } => message.clone(),
            Self::Timeout { .. } => String::from("The places service took too long to respond."),
            _ => String::from("Unable to retrieve nearby places of worship."),
        }
    }
}

/// Failure of a cached or debounced query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The fetch exceeded the absolute query deadline.
    #[error("query exceeded its {deadline:?} deadline")]
    Timeout {
        /// Deadline that elapsed.
        deadline: Duration,
    },
    /// A newer query superseded this one, or its caller went away.
    #[error("query cancelled")]
    Cancelled,
    /// The executor failed after exhausting its endpoints.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl QueryError {
    /// Whether this error is a cancellation that must not be shown to users.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Short message suitable for end users.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Timeout { .. } => String::from("The places service took too long to respond."),
            Self::Cancelled => String::new(),
            Self::Fetch(error) => error.user_message(),
        }
    }
}
