//! Test doubles and fixtures shared by unit and behaviour tests.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{
    CollectedSet, CollectedStore, Coordinate, Haptics, PersistenceError, PlaceOfWorship,
    StableId, Tags,
};

/// Build a place at `(latitude, longitude)` tagged as a church.
///
/// # Panics
///
/// Panics when the coordinate is invalid.
#[must_use]
#[expect(clippy::expect_used, reason = "fixture input is a literal")]
pub fn place_at(id: &str, latitude: f64, longitude: f64) -> PlaceOfWorship {
    let coordinate = Coordinate::new(latitude, longitude).expect("fixture coordinate");
    let tags = Tags::from([
        (String::from("amenity"), String::from("place_of_worship")),
        (String::from("building"), String::from("church")),
        (String::from("name"), format!("Place {id}")),
    ]);
    PlaceOfWorship::from_tags(StableId::new(id), coordinate, tags)
}

/// Offset `origin` northwards by `meters`, for building fixtures at a known
/// distance.
///
/// # Panics
///
/// Panics when the shifted latitude leaves the valid range.
#[must_use]
#[expect(clippy::expect_used, reason = "fixture input is a literal")]
#[expect(clippy::float_arithmetic, reason = "metres to degrees of latitude")]
pub fn north_of(origin: Coordinate, meters: f64) -> Coordinate {
    let degrees = (meters / crate::EARTH_RADIUS_METERS).to_degrees();
    Coordinate::new(origin.latitude() + degrees, origin.longitude()).expect("shifted coordinate")
}

/// [`Haptics`] implementation counting success signals.
#[derive(Debug, Clone, Default)]
pub struct RecordingHaptics {
    successes: Arc<AtomicUsize>,
}

impl RecordingHaptics {
    /// Number of success signals fired so far.
    #[must_use]
    pub fn successes(&self) -> usize {
        self.successes.load(Ordering::SeqCst)
    }
}

impl Haptics for RecordingHaptics {
    fn success(&self) {
        self.successes.fetch_add(1, Ordering::SeqCst);
    }
}

/// [`CollectedStore`] whose writes always fail.
#[derive(Debug, Default)]
pub struct FailingCollectedStore {
    initial: CollectedSet,
}

impl FailingCollectedStore {
    /// Create a store that loads `initial` but refuses to save.
    #[must_use]
    pub const fn with_set(initial: CollectedSet) -> Self {
        Self { initial }
    }
}

impl CollectedStore for FailingCollectedStore {
    fn load(&self) -> CollectedSet {
        self.initial.clone()
    }

    fn save(&self, _set: &CollectedSet) -> Result<(), PersistenceError> {
        Err(PersistenceError::Storage(io::Error::other("storage quota exceeded")))
    }
}
