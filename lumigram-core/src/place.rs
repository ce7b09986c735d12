//! Places of worship returned by spatial queries.

use std::collections::BTreeMap;
use std::fmt;

use log::warn;

use crate::category::{Category, classify, pick_name};
use crate::coordinate::Coordinate;

/// Free-form upstream key/value tags.
///
/// Ordered so serialized output and debug dumps are deterministic.
pub type Tags = BTreeMap<String, String>;

/// Upstream element type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum ElementKind {
    /// A single point.
    Node,
    /// An ordered list of nodes, usually a building outline.
    Way,
    /// A group of other elements.
    Relation,
}

impl ElementKind {
    /// Lowercase name used in stable identifiers.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }

    /// Parse an element type, ignoring ASCII case.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        [Self::Node, Self::Way, Self::Relation]
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value))
    }
}

/// Deterministic identifier of a real-world place.
///
/// Derived from the upstream element type and numeric id as `"<type>/<id>"`,
/// so the same object maps to the same id whichever endpoint answered. Ids
/// loaded from storage are accepted verbatim.
///
/// # Examples
///
/// ```
/// use lumigram_core::{ElementKind, StableId};
///
/// let id = StableId::from_element(ElementKind::Way, 42).expect("positive id");
/// assert_eq!(id.as_str(), "way/42");
/// assert!(StableId::from_element(ElementKind::Node, -1).is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct StableId(String);

impl StableId {
    /// Wrap an already-derived identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Derive an identifier from an upstream element.
    ///
    /// Negative identifiers denote unsaved upstream edits and are skipped
    /// with a warning.
    #[must_use]
    pub fn from_element(kind: ElementKind, raw_id: i64) -> Option<Self> {
        if let Ok(id) = u64::try_from(raw_id) {
            Some(Self(format!("{}/{id}", kind.as_str())))
        } else {
            warn!(
                "Skipped element: kind={kind:?}, raw_id={raw_id} (negative identifiers are unsupported)"
            );
            None
        }
    }

    /// Borrow the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StableId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A single query result.
///
/// Values are created from a successful fetch and replaced wholesale when the
/// same query is fetched again.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct PlaceOfWorship {
    /// Deterministic identifier.
    pub stable_id: StableId,
    /// Name suitable for display.
    pub display_name: String,
    /// Location of the place, or of its centre for areas.
    pub coordinate: Coordinate,
    /// Classified category.
    pub category: Category,
    /// Distance from the query origin, when the query had one.
    pub distance_from_origin: Option<f64>,
    /// Upstream tags, kept opaque.
    pub source_tags: Tags,
}

impl PlaceOfWorship {
    /// Build a place from raw upstream tags, deriving its name and category.
    ///
    /// # Examples
    ///
    /// ```
    /// use lumigram_core::{Category, Coordinate, PlaceOfWorship, StableId, Tags};
    ///
    /// # fn main() -> Result<(), lumigram_core::CoordinateError> {
    /// let tags = Tags::from([
    ///     ("name".to_owned(), "Sv. Jakob".to_owned()),
    ///     ("building".to_owned(), "church".to_owned()),
    /// ]);
    /// let place = PlaceOfWorship::from_tags(
    ///     StableId::new("way/7"),
    ///     Coordinate::new(46.05, 14.5)?,
    ///     tags,
    /// );
    /// assert_eq!(place.display_name, "Sv. Jakob");
    /// assert_eq!(place.category, Category::Church);
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn from_tags(stable_id: StableId, coordinate: Coordinate, source_tags: Tags) -> Self {
        Self {
            stable_id,
            display_name: pick_name(&source_tags).to_owned(),
            coordinate,
            category: classify(&source_tags),
            distance_from_origin: None,
            source_tags,
        }
    }

    /// Attach a distance from the query origin.
    #[must_use]
    pub fn with_distance(mut self, meters: f64) -> Self {
        self.distance_from_origin = Some(meters);
        self
    }
}
