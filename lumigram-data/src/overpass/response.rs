//! Overpass JSON response types.
//!
//! See: <https://wiki.openstreetmap.org/wiki/Overpass_API/Output_Formats#JSON>

use log::debug;
use lumigram_core::{Coordinate, ElementKind, PlaceOfWorship, StableId, Tags};
use serde::Deserialize;

/// Overpass `[out:json]` response.
///
/// `elements` is required; a payload without it is malformed.
#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    /// Matched elements, in upstream order.
    pub elements: Vec<OverpassElement>,
}

/// Bare latitude/longitude pair.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LatLon {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

/// One element of an Overpass response.
///
/// Nodes carry `lat`/`lon`; ways and relations queried with `out center`
/// carry a `center`.
#[derive(Debug, Deserialize)]
pub struct OverpassElement {
    /// Element type: `node`, `way` or `relation`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Upstream numeric id.
    pub id: i64,
    /// Node latitude.
    pub lat: Option<f64>,
    /// Node longitude.
    pub lon: Option<f64>,
    /// Centre of a way or relation.
    pub center: Option<LatLon>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Tags,
}

impl OverpassElement {
    fn position(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => self.center.map(|c| (c.lat, c.lon)),
        }
    }

    /// Convert into a place, skipping elements with an unknown kind, a
    /// negative id or no valid position.
    pub fn into_place(self) -> Option<PlaceOfWorship> {
        let Some(kind) = ElementKind::parse(&self.kind) else {
            debug!("skipping element of unknown type {}", self.kind);
            return None;
        };
        let stable_id = StableId::from_element(kind, self.id)?;
        let Some((lat, lon)) = self.position() else {
            debug!("skipping {stable_id}: no position");
            return None;
        };
        let coordinate = match Coordinate::new(lat, lon) {
            Ok(coordinate) => coordinate,
            Err(err) => {
                debug!("skipping {stable_id}: {err}");
                return None;
            }
        };
        Some(PlaceOfWorship::from_tags(stable_id, coordinate, self.tags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumigram_core::Category;
    use rstest::rstest;

    #[rstest]
    fn deserialise_mixed_elements() {
        let json = r#"{
            "version": 0.6,
            "elements": [
                {"type": "node", "id": 1, "lat": 46.05, "lon": 14.5,
                 "tags": {"amenity": "place_of_worship", "religion": "christian", "name": "Sv. Ana"}},
                {"type": "way", "id": 2, "center": {"lat": 46.06, "lon": 14.51},
                 "tags": {"building": "church", "name:sl": "Cerkev"}},
                {"type": "relation", "id": 3}
            ]
        }"#;
        let response: OverpassResponse = serde_json::from_str(json).expect("should deserialise");
        let places: Vec<_> = response
            .elements
            .into_iter()
            .filter_map(OverpassElement::into_place)
            .collect();

        assert_eq!(places.len(), 2);
        assert_eq!(places[0].stable_id.as_str(), "node/1");
        assert_eq!(places[0].display_name, "Sv. Ana");
        assert_eq!(places[1].stable_id.as_str(), "way/2");
        assert_eq!(places[1].category, Category::Church);
        assert_eq!(places[1].display_name, "Cerkev");
    }

    #[rstest]
    fn missing_elements_is_an_error() {
        let result = serde_json::from_str::<OverpassResponse>(r#"{"remark": "runtime error"}"#);
        assert!(result.is_err());
    }

    #[rstest]
    #[case(r#"{"type": "area", "id": 4, "lat": 46.0, "lon": 14.0}"#)]
    #[case(r#"{"type": "node", "id": 5, "lat": 91.0, "lon": 14.0}"#)]
    #[case(r#"{"type": "node", "id": -6, "lat": 46.0, "lon": 14.0}"#)]
    fn unusable_elements_are_skipped(#[case] json: &str) {
        let element: OverpassElement = serde_json::from_str(json).expect("should deserialise");
        assert!(element.into_place().is_none());
    }
}
