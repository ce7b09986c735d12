//! Core domain types for the Lumigram engine.
//!
//! The crate is synchronous and free of I/O. It models the values exchanged
//! between the location, query and check-in layers and hosts the
//! [`ProximityEngine`] state machine that gates collecting a place behind
//! physical proximity and a hold gesture.
//!
//! Constructors validate their input and return `Result` so invalid
//! coordinates or keys are rejected at the boundary.

pub mod category;
pub mod collected;
pub mod coordinate;
pub mod distance;
pub mod place;
pub mod proximity;
pub mod query;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use category::{Category, classify, pick_name};
pub use collected::{CollectedSet, CollectedStore, MemoryCollectedStore, PersistenceError};
pub use coordinate::{Coordinate, CoordinateError, EARTH_RADIUS_METERS, haversine_distance};
pub use distance::{distance_progress, format_distance};
pub use place::{ElementKind, PlaceOfWorship, StableId, Tags};
pub use proximity::{
    CheckInState, Haptics, HoldTimer, OriginMode, ProximityConfig, ProximityEngine,
    ProximityEvent, ProximitySnapshot,
};
pub use query::{BoundingBox, BoundingBoxError, SpatialQuery, SpatialQueryKey};
