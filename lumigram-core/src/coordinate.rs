//! WGS84 coordinates and great-circle distance.
//!
//! Distances use the haversine formula on a spherical Earth with a radius of
//! 6,371,000 metres. This is not geodesic-exact: errors of up to roughly 0.5%
//! are expected compared with an ellipsoidal model, which is well below the
//! horizontal accuracy of consumer GPS at check-in distances.

use geo::{Coord, Point};
use thiserror::Error;

/// Mean Earth radius used by [`haversine_distance`], in metres.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A validated latitude/longitude pair in degrees.
///
/// Latitude lies in `[-90, 90]` and longitude in `[-180, 180]`; both are
/// finite. Values are immutable once constructed.
///
/// # Examples
///
/// ```
/// use lumigram_core::Coordinate;
///
/// # fn main() -> Result<(), lumigram_core::CoordinateError> {
/// let ljubljana = Coordinate::new(46.0569, 14.5058)?;
/// assert_eq!(ljubljana.latitude(), 46.0569);
/// assert!(Coordinate::new(91.0, 0.0).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawCoordinate", rename_all = "camelCase")
)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

/// Errors returned by [`Coordinate::new`].
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CoordinateError {
    /// Latitude or longitude was NaN or infinite.
    #[error("coordinate components must be finite")]
    NonFinite,
    /// Latitude fell outside `[-90, 90]`.
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    /// Longitude fell outside `[-180, 180]`.
    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
}

impl Coordinate {
    /// Validate and construct a coordinate from degrees.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] when either component is non-finite or
    /// out of range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(CoordinateError::NonFinite);
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Great-circle distance to `other` in metres.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        haversine_distance(*self, *other)
    }
}

impl From<Coordinate> for Coord<f64> {
    fn from(value: Coordinate) -> Self {
        Self {
            x: value.longitude,
            y: value.latitude,
        }
    }
}

impl From<Coordinate> for Point<f64> {
    fn from(value: Coordinate) -> Self {
        Self::from(Coord::from(value))
    }
}

impl TryFrom<Coord<f64>> for Coordinate {
    type Error = CoordinateError;

    /// Interpret a `geo` coordinate as `x = longitude`, `y = latitude`.
    fn try_from(value: Coord<f64>) -> Result<Self, Self::Error> {
        Self::new(value.y, value.x)
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoordinateError;

    fn try_from(value: RawCoordinate) -> Result<Self, Self::Error> {
        Self::new(value.latitude, value.longitude)
    }
}

/// Great-circle distance between two coordinates in metres.
///
/// Uses the haversine formula on a sphere of radius [`EARTH_RADIUS_METERS`].
///
/// # Examples
///
/// ```
/// use lumigram_core::{Coordinate, haversine_distance};
///
/// # fn main() -> Result<(), lumigram_core::CoordinateError> {
/// let a = Coordinate::new(0.0, 0.0)?;
/// let b = Coordinate::new(0.0, 1.0)?;
/// let metres = haversine_distance(a, b);
/// assert!((metres - 111_194.9).abs() < 1.0);
/// # Ok(())
/// # }
/// ```
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "great-circle distance is floating-point trigonometry"
)]
pub fn haversine_distance(from: Coordinate, to: Coordinate) -> f64 {
    let lat_from = from.latitude.to_radians();
    let lat_to = to.latitude.to_radians();
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    let half_chord = (d_lat / 2.0).sin().powi(2)
        + lat_from.cos() * lat_to.cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push the term marginally outside [0, 1] for antipodal points.
    let half_chord = half_chord.clamp(0.0, 1.0);
    let angle = 2.0 * half_chord.sqrt().atan2((1.0 - half_chord).sqrt());
    EARTH_RADIUS_METERS * angle
}
