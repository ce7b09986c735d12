//! Overpass API executor for viewport and radius queries.
//!
//! Queries select nodes, ways and relations tagged
//! `amenity=place_of_worship` that carry a `religion` tag. They are sent as a
//! form-encoded POST to each configured endpoint in turn until one answers
//! with a well-formed payload.
//!
//! # Example
//!
//! ```no_run
//! use lumigram_core::{BoundingBox, SpatialQuery};
//! use lumigram_data::overpass::{OverpassConfig, OverpassExecutor};
//! use lumigram_data::query::QueryExecutor;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let executor = OverpassExecutor::with_config(OverpassConfig::default())?;
//! let query = SpatialQuery::Viewport(BoundingBox::new(46.04, 14.49, 46.06, 14.52)?);
//! let places = executor.execute(&query).await?;
//! println!("{} places", places.items.len());
//! # Ok(())
//! # }
//! ```

mod executor;
mod response;

pub use executor::{
    DEFAULT_ENDPOINTS, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, ExecutorBuildError, OverpassConfig,
    OverpassExecutor,
};

use lumigram_core::SpatialQuery;

const SELECTOR: &str = r#"["amenity"="place_of_worship"]["religion"]"#;

/// Render `query` in Overpass QL.
///
/// # Examples
///
/// ```
/// use lumigram_core::{BoundingBox, SpatialQuery};
/// use lumigram_data::overpass::build_query;
///
/// # fn main() -> Result<(), lumigram_core::BoundingBoxError> {
/// let bbox = BoundingBox::new(46.0, 14.0, 46.5, 14.5)?;
/// let ql = build_query(&SpatialQuery::Viewport(bbox));
/// assert!(ql.starts_with("[out:json][timeout:20];"));
/// assert!(ql.contains("(46,14,46.5,14.5)"));
/// # Ok(())
/// # }
/// ```
#[must_use]
pub fn build_query(query: &SpatialQuery) -> String {
    let filter = match query {
        SpatialQuery::Viewport(bbox) => format!(
            "({},{},{},{})",
            bbox.south(),
            bbox.west(),
            bbox.north(),
            bbox.east()
        ),
        SpatialQuery::Radius { center, radius_m } => format!(
            "(around:{},{},{})",
            radius_m.max(0.0).round(),
            center.latitude(),
            center.longitude()
        ),
    };
    let statements: String = ["node", "way", "relation"]
        .iter()
        .map(|kind| format!("  {kind}{SELECTOR}{filter};\n"))
        .collect();
    format!("[out:json][timeout:20];\n(\n{statements});\nout center;")
}
