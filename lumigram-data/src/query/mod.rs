//! Spatial query caching, debouncing and the executor port.
//!
//! ```text
//! viewport change -> QueryDebouncer -> SpatialQueryCache -> QueryExecutor
//! ```
//!
//! The debouncer collapses bursts of map events into one settled request.
//! The cache answers repeated keys without network traffic, lets concurrent
//! callers share a fetch and discards results of superseded fetches.

mod cache;
mod debounce;
mod executor;

pub use cache::{CacheConfig, CacheEntry, DEFAULT_CAPACITY, DEFAULT_DEADLINE, SpatialQueryCache};
pub use debounce::{
    DEFAULT_MIN_FETCH_ZOOM, DEFAULT_MOVE_END_DELAY, DEFAULT_ZOOM_END_DELAY, DebounceConfig,
    QueryDebouncer, QueryIntent, Trigger,
};
pub use executor::{CategoryCount, FetchedPlaces, QueryExecutor, dedup_by_stable_id};

#[cfg(test)]
mod tests;
