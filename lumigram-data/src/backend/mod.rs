//! Client for the application's own closest-places REST endpoint.
//!
//! The endpoint is `GET <base>/api/closest-poi?lat=&lon=&radiusKm=`. Error
//! responses carry `{statusCode, message}`; the message is surfaced to users
//! through [`FetchError::Backend`](crate::FetchError::Backend).
//!
//! # Example
//!
//! ```no_run
//! use lumigram_core::Coordinate;
//! use lumigram_data::backend::ClosestPoiClient;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ClosestPoiClient::new("https://lumigram.example")?;
//! let places = client.closest(Coordinate::new(46.05, 14.5)?, 10.0).await?;
//! println!("{} places within {} m", places.items.len(), places.radius_meters);
//! # Ok(())
//! # }
//! ```

mod client;
mod response;

pub use client::{
    API_PATH, ClientBuildError, ClosestPlaces, ClosestPoiClient, ClosestPoiConfig,
    DEFAULT_ERROR_MESSAGE, DEFAULT_ORIGIN, DEFAULT_RADIUS_KM, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT,
    MAX_RADIUS_KM, MIN_RADIUS_KM, clamp_radius_km,
};
pub use response::{error_message, stable_id_from_osm_url};
