//! Data access for the Lumigram engine.
//!
//! Responsibilities:
//! - Cache spatial query results and collapse bursts of viewport changes.
//! - Provide executors for the Overpass API and the backend REST endpoint.
//! - Persist the collected set to disk.
//!
//! Boundaries:
//! - Do not encode domain rules (live in `lumigram-core`).
//! - Keep blocking I/O off async executors; HTTP goes through `reqwest`.
//!
//! Invariants:
//! - A superseded fetch never writes to the cache.
//! - Cancellation is reported as [`QueryError::Cancelled`] and never as a
//!   user-facing failure.

pub mod backend;
pub mod collected;
mod error;
pub mod overpass;
pub mod query;

#[doc(hidden)]
pub mod test_support;

pub use backend::{ClosestPlaces, ClosestPoiClient, ClosestPoiConfig};
pub use collected::JsonFileCollectedStore;
pub use error::{FetchError, QueryError};
pub use overpass::{OverpassConfig, OverpassExecutor};
pub use query::{
    CacheConfig, CacheEntry, DebounceConfig, QueryDebouncer, QueryExecutor, QueryIntent,
    SpatialQueryCache, Trigger,
};
