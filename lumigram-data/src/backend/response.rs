//! Wire types for the closest-places endpoint.

use log::debug;
use lumigram_core::{Coordinate, PlaceOfWorship, StableId, Tags};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;

use crate::query::CategoryCount;

static OSM_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(node|way|relation)/(\d+)").expect("valid OSM id regex")
});

/// Successful response body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosestPoiResponse {
    /// Radius the backend searched, in metres.
    pub radius_meters: f64,
    /// Number of items reported by the backend.
    #[serde(default)]
    pub count: Option<usize>,
    /// Upstream the backend queried.
    #[serde(default)]
    pub source: String,
    /// Category summary.
    #[serde(default)]
    pub categories: Vec<CategoryCount>,
    /// Places, nearest first.
    pub items: Vec<ClosestPoiItem>,
}

/// Position of one item.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ItemCoordinates {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

/// Category tag the backend assigned to one item.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemCategory {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
    /// Display label.
    #[serde(default)]
    pub label: String,
}

/// One place in a successful response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosestPoiItem {
    /// Display name chosen by the backend.
    #[serde(default)]
    pub name: String,
    /// Distance from the requested centre.
    pub distance_meters: f64,
    /// Item position.
    pub coordinates: ItemCoordinates,
    /// OpenStreetMap URL of the element.
    pub osm_url: String,
    /// Upstream tags.
    #[serde(default)]
    pub tags: Tags,
    /// Backend category.
    pub category: ItemCategory,
}

impl ClosestPoiItem {
    /// Convert into a place, skipping items with an invalid position.
    ///
    /// The backend category tag is merged into the source tags when absent so
    /// classification sees it.
    pub fn into_place(self) -> Option<PlaceOfWorship> {
        let coordinate =
            match Coordinate::new(self.coordinates.latitude, self.coordinates.longitude) {
                Ok(coordinate) => coordinate,
                Err(err) => {
                    debug!("skipping {}: {err}", self.osm_url);
                    return None;
                }
            };
        let stable_id = stable_id_from_osm_url(&self.osm_url);
        let mut tags = self.tags;
        tags.entry(self.category.key).or_insert(self.category.value);
        let mut place = PlaceOfWorship::from_tags(stable_id, coordinate, tags);
        if !self.name.trim().is_empty() {
            place.display_name = self.name;
        }
        Some(place.with_distance(self.distance_meters))
    }
}

/// Derive a stable id from an OpenStreetMap URL.
///
/// URLs naming an element yield `kind/id` with a lowercase kind; anything
/// else is used verbatim.
///
/// # Examples
///
/// ```
/// use lumigram_data::backend::stable_id_from_osm_url;
///
/// let id = stable_id_from_osm_url("https://www.openstreetmap.org/Way/42");
/// assert_eq!(id.as_str(), "way/42");
/// ```
#[must_use]
pub fn stable_id_from_osm_url(osm_url: &str) -> StableId {
    OSM_ID
        .captures(osm_url)
        .and_then(|caps| Some((caps.get(1)?, caps.get(2)?)))
        .map_or_else(
            || StableId::new(osm_url),
            |(kind, id)| {
                StableId::new(format!("{}/{}", kind.as_str().to_lowercase(), id.as_str()))
            },
        )
}

/// Extract the message from an error payload.
///
/// The message may be a string or an array of strings, which are joined.
#[must_use]
pub fn error_message(body: &str) -> Option<String> {
    let payload: Value = serde_json::from_str(body).ok()?;
    let message = match payload.get("message")? {
        Value::String(text) => text.trim().to_owned(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        _ => return None,
    };
    (!message.is_empty()).then_some(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumigram_core::Category;
    use rstest::rstest;

    #[rstest]
    #[case("https://www.openstreetmap.org/node/123", "node/123")]
    #[case("https://osm.org/RELATION/9", "relation/9")]
    #[case("way/5", "way/5")]
    #[case("https://example.com/place", "https://example.com/place")]
    fn stable_ids_from_urls(#[case] url: &str, #[case] expected: &str) {
        assert_eq!(stable_id_from_osm_url(url).as_str(), expected);
    }

    #[rstest]
    #[case(r#"{"statusCode": 400, "message": "radiusKm must be positive"}"#, Some("radiusKm must be positive"))]
    #[case(r#"{"statusCode": 400, "message": ["lat is required", "lon is required"]}"#, Some("lat is required, lon is required"))]
    #[case(r#"{"statusCode": 500}"#, None)]
    #[case(r#"{"message": ""}"#, None)]
    #[case("<html>Bad Gateway</html>", None)]
    fn error_messages(#[case] body: &str, #[case] expected: Option<&str>) {
        assert_eq!(error_message(body).as_deref(), expected);
    }

    #[rstest]
    fn deserialise_success_response() {
        let json = r#"{
            "radiusMeters": 10000,
            "count": 1,
            "source": "openstreetmap-overpass",
            "categories": [{"key": "building", "value": "chapel", "label": "Chapel", "count": 1}],
            "items": [{
                "name": "Kapelica",
                "distanceMeters": 420.5,
                "coordinates": {"latitude": 46.1, "longitude": 14.6},
                "osmUrl": "https://www.openstreetmap.org/node/77",
                "tags": {"amenity": "place_of_worship"},
                "category": {"key": "building", "value": "chapel", "label": "Chapel"}
            }]
        }"#;
        let response: ClosestPoiResponse = serde_json::from_str(json).expect("should deserialise");
        assert_eq!(response.count, Some(1));
        assert_eq!(response.categories[0].label, "Chapel");

        let item = response.items.into_iter().next().expect("one item");
        let place = item.into_place().expect("valid item");
        assert_eq!(place.stable_id.as_str(), "node/77");
        assert_eq!(place.display_name, "Kapelica");
        assert_eq!(place.category, Category::Chapel);
        assert_eq!(place.distance_from_origin, Some(420.5));
    }
}
