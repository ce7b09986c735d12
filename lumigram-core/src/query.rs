//! Spatial queries and their normalized cache keys.

use std::fmt;

use geo::{Coord, Intersects, Rect};
use thiserror::Error;

use crate::coordinate::{Coordinate, CoordinateError};

/// Decimal places kept when quantizing coordinates into a key.
///
/// Four places resolve roughly 11 m at the equator, enough to merge viewports
/// that differ by a sub-pixel pan while keeping distinct views apart at the
/// minimum fetch zoom.
pub const KEY_PRECISION: usize = 4;

const KEY_SCALE: f64 = 10_000.0;

/// A south/west/north/east rectangle describing a map viewport.
///
/// Internally the box is stored as a [`geo::Rect`] with `x = longitude`
/// and `y = latitude`. Boxes crossing the antimeridian are not supported.
///
/// # Examples
///
/// ```
/// use lumigram_core::BoundingBox;
///
/// # fn main() -> Result<(), lumigram_core::BoundingBoxError> {
/// let bbox = BoundingBox::new(46.0, 14.4, 46.1, 14.6)?;
/// assert_eq!(bbox.key().as_str(), "46.0000,14.4000,46.1000,14.6000");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    rect: Rect<f64>,
}

/// Errors returned by [`BoundingBox::new`].
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum BoundingBoxError {
    /// One of the corners is not a valid coordinate.
    #[error("invalid bounding box corner: {0}")]
    InvalidCorner(#[from] CoordinateError),
    /// South edge lies north of the north edge.
    #[error("south edge {south} lies north of north edge {north}")]
    InvertedLatitude {
        /// Southern latitude supplied.
        south: f64,
        /// Northern latitude supplied.
        north: f64,
    },
    /// West edge lies east of the east edge.
    #[error("west edge {west} lies east of east edge {east}")]
    InvertedLongitude {
        /// Western longitude supplied.
        west: f64,
        /// Eastern longitude supplied.
        east: f64,
    },
}

impl BoundingBox {
    /// Build a box from its edges in degrees.
    ///
    /// # Errors
    ///
    /// Returns [`BoundingBoxError`] when a corner is invalid or the edges are
    /// inverted.
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Result<Self, BoundingBoxError> {
        let south_west = Coordinate::new(south, west)?;
        let north_east = Coordinate::new(north, east)?;
        if south > north {
            return Err(BoundingBoxError::InvertedLatitude { south, north });
        }
        if west > east {
            return Err(BoundingBoxError::InvertedLongitude { west, east });
        }
        Ok(Self {
            rect: Rect::new(Coord::from(south_west), Coord::from(north_east)),
        })
    }

    /// Southern latitude.
    #[must_use]
    pub fn south(&self) -> f64 {
        self.rect.min().y
    }

    /// Western longitude.
    #[must_use]
    pub fn west(&self) -> f64 {
        self.rect.min().x
    }

    /// Northern latitude.
    #[must_use]
    pub fn north(&self) -> f64 {
        self.rect.max().y
    }

    /// Eastern longitude.
    #[must_use]
    pub fn east(&self) -> f64 {
        self.rect.max().x
    }

    /// Whether `coordinate` lies inside the box, boundary included.
    #[must_use]
    pub fn contains(&self, coordinate: Coordinate) -> bool {
        self.rect.intersects(&Coord::from(coordinate))
    }

    /// The underlying `geo` rectangle.
    #[must_use]
    pub const fn as_rect(&self) -> &Rect<f64> {
        &self.rect
    }

    /// Normalized cache key in `south,west,north,east` order.
    #[must_use]
    pub fn key(&self) -> SpatialQueryKey {
        SpatialQueryKey(format!(
            "{},{},{},{}",
            quantize(self.south()),
            quantize(self.west()),
            quantize(self.north()),
            quantize(self.east()),
        ))
    }
}

/// A request for places either inside a viewport or around a point.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpatialQuery {
    /// Everything inside the visible map rectangle.
    Viewport(BoundingBox),
    /// Everything within `radius_m` metres of `center`.
    Radius {
        /// Origin of the search.
        center: Coordinate,
        /// Search radius in metres.
        radius_m: f64,
    },
}

impl SpatialQuery {
    /// Normalized key under which results for this query are cached.
    ///
    /// Radius queries quantize the centre like a bounding box and round the
    /// radius to whole metres.
    #[must_use]
    pub fn key(&self) -> SpatialQueryKey {
        match self {
            Self::Viewport(bbox) => bbox.key(),
            Self::Radius { center, radius_m } => SpatialQueryKey(format!(
                "around:{},{},{}",
                round_meters(*radius_m),
                quantize(center.latitude()),
                quantize(center.longitude()),
            )),
        }
    }
}

/// Normalized string identifying a cache entry.
///
/// Two queries producing equal keys share one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpatialQueryKey(String);

impl SpatialQueryKey {
    /// Borrow the key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpatialQueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<SpatialQueryKey> for String {
    fn from(value: SpatialQueryKey) -> Self {
        value.0
    }
}

#[expect(clippy::float_arithmetic, reason = "fixed-point quantization")]
fn quantize(value: f64) -> String {
    // Adding zero folds negative zero so "-0.0000" never appears in a key.
    let rounded = (value * KEY_SCALE).round() / KEY_SCALE + 0.0;
    format!("{rounded:.KEY_PRECISION$}")
}

#[expect(clippy::float_arithmetic, reason = "folds negative zero")]
fn round_meters(value: f64) -> String {
    format!("{:.0}", value.max(0.0).round() + 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn bbox(s: f64, w: f64, n: f64, e: f64) -> BoundingBox {
        BoundingBox::new(s, w, n, e).expect("valid bbox")
    }

    #[rstest]
    fn key_uses_south_west_north_east_order() {
        let key = bbox(46.01, 14.02, 46.03, 14.04).key();
        assert_eq!(key.as_str(), "46.0100,14.0200,46.0300,14.0400");
    }

    #[rstest]
    fn near_identical_viewports_share_a_key() {
        let a = bbox(46.050_01, 14.500_02, 46.060_03, 14.510_04);
        let b = bbox(46.050_04, 14.499_98, 46.059_99, 14.510_01);
        assert_eq!(a.key(), b.key());
    }

    #[rstest]
    fn distinct_viewports_do_not_collapse() {
        let a = bbox(46.0500, 14.5000, 46.0600, 14.5100);
        let b = bbox(46.0502, 14.5000, 46.0600, 14.5100);
        assert_ne!(a.key(), b.key());
    }

    #[rstest]
    fn negative_zero_is_normalized() {
        let key = bbox(-0.000_01, -0.000_02, 0.1, 0.1).key();
        assert_eq!(key.as_str(), "0.0000,0.0000,0.1000,0.1000");
    }

    #[rstest]
    #[case(46.1, 14.0, 46.0, 14.1)]
    #[case(46.0, 14.1, 46.1, 14.0)]
    #[case(91.0, 14.0, 92.0, 14.1)]
    fn rejects_invalid_boxes(#[case] s: f64, #[case] w: f64, #[case] n: f64, #[case] e: f64) {
        assert!(BoundingBox::new(s, w, n, e).is_err());
    }

    #[rstest]
    fn radius_key_rounds_radius_and_centre() {
        let center = Coordinate::new(46.05, 14.5).expect("valid centre");
        let query = SpatialQuery::Radius {
            center,
            radius_m: 10_000.4,
        };
        assert_eq!(query.key().as_str(), "around:10000,46.0500,14.5000");
    }

    #[rstest]
    fn contains_includes_the_boundary() {
        let area = bbox(46.0, 14.0, 46.1, 14.1);
        let edge = Coordinate::new(46.0, 14.05).expect("valid coordinate");
        let outside = Coordinate::new(45.9, 14.05).expect("valid coordinate");
        assert!(area.contains(edge));
        assert!(!area.contains(outside));
    }

    proptest! {
        #[test]
        fn sub_resolution_jitter_keeps_the_key(
            s in -80.0f64..80.0,
            w in -170.0f64..170.0,
            jitter in -0.000_04f64..0.000_04,
        ) {
            let base = bbox(
                (s * KEY_SCALE).round() / KEY_SCALE,
                (w * KEY_SCALE).round() / KEY_SCALE,
                (s * KEY_SCALE).round() / KEY_SCALE + 0.01,
                (w * KEY_SCALE).round() / KEY_SCALE + 0.01,
            );
            let moved = bbox(
                base.south() + jitter,
                base.west() + jitter,
                base.north() + jitter,
                base.east() + jitter,
            );
            prop_assert_eq!(base.key(), moved.key());
        }
    }
}
