//! Facade crate for the Lumigram engine.
//!
//! This crate re-exports the core domain types and exposes the places data
//! layer and the location provider chain behind feature flags.

#![forbid(unsafe_code)]

pub use lumigram_core::{
    BoundingBox, Category, CheckInState, CollectedSet, CollectedStore, Coordinate, OriginMode,
    PlaceOfWorship, ProximityConfig, ProximityEngine, ProximityEvent, ProximitySnapshot,
    SpatialQuery, SpatialQueryKey, StableId, haversine_distance,
};

#[cfg(feature = "data")]
pub use lumigram_data::{
    CacheConfig, ClosestPoiClient, DebounceConfig, FetchError, JsonFileCollectedStore,
    OverpassExecutor, QueryDebouncer, QueryError, QueryExecutor, QueryIntent, SpatialQueryCache,
    Trigger,
};

#[cfg(feature = "location")]
pub use lumigram_location::{
    FixedProvider, LiveTracking, LocationError, LocationProvider, LocationResolver, PlatformFeed,
    ProviderOptions,
};
