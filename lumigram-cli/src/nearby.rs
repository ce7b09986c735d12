//! Nearby command: list the places of worship around a position.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use lumigram_core::{
    CollectedSet, CollectedStore, Coordinate, PlaceOfWorship, ProximityConfig, ProximityEngine,
    format_distance,
};
use lumigram_data::JsonFileCollectedStore;
use lumigram_data::backend::{DEFAULT_RADIUS_KM, clamp_radius_km};
use lumigram_location::{FixedProvider, LocationResolver};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::explorer::Explorer;
use crate::source::{DefaultPlaceSourceBuilder, PlaceSource, PlaceSourceBuilder, SourceConfig};
use crate::{
    ARG_BACKEND_URL, ARG_DATA_DIR, ARG_HOST_ORIGIN, ARG_LAT, ARG_LON, ARG_OVERPASS_ENDPOINT,
    ARG_RADIUS_KM, ARG_SOURCE, CliError, ENV_NEARBY_LAT, ENV_NEARBY_LON,
};

/// CLI arguments for the `nearby` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "List places of worship within a radius of a position, \
                 closest first. Places already collected are marked with \
                 an asterisk.",
    about = "List places of worship near a position"
)]
#[ortho_config(prefix = "LUMIGRAM")]
pub(crate) struct NearbyArgs {
    /// Latitude of the search centre in degrees.
    #[arg(long = ARG_LAT, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) lat: Option<f64>,
    /// Longitude of the search centre in degrees.
    #[arg(long = ARG_LON, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) lon: Option<f64>,
    /// Search radius in kilometres (0 to 100).
    #[arg(long = ARG_RADIUS_KM, value_name = "km")]
    #[serde(default)]
    pub(crate) radius_km: Option<f64>,
    /// Upstream answering the query.
    #[arg(long = ARG_SOURCE, value_enum, value_name = "source")]
    #[serde(default)]
    pub(crate) source: Option<PlaceSource>,
    /// Base URL of the closest-places backend.
    #[arg(long = ARG_BACKEND_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) backend_url: Option<String>,
    /// Origin used to reach the backend when no base URL is set.
    #[arg(long = ARG_HOST_ORIGIN, value_name = "url")]
    #[serde(default)]
    pub(crate) host_origin: Option<String>,
    /// Overpass interpreter URL; repeat to add fallbacks.
    #[arg(long = ARG_OVERPASS_ENDPOINT, value_name = "url")]
    #[serde(default)]
    pub(crate) overpass_endpoint: Option<Vec<String>>,
    /// Directory holding the collected places file.
    #[arg(long = ARG_DATA_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) data_dir: Option<Utf8PathBuf>,
}

impl NearbyArgs {
    pub(crate) fn into_config(self) -> Result<NearbyConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        NearbyConfig::try_from(merged)
    }
}

/// Resolved `nearby` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NearbyConfig {
    pub(crate) origin: Coordinate,
    pub(crate) radius_km: f64,
    pub(crate) source: SourceConfig,
    pub(crate) data_dir: Utf8PathBuf,
}

impl TryFrom<NearbyArgs> for NearbyConfig {
    type Error = CliError;

    fn try_from(args: NearbyArgs) -> Result<Self, Self::Error> {
        let lat = args.lat.ok_or(CliError::MissingArgument {
            field: ARG_LAT,
            env: ENV_NEARBY_LAT,
        })?;
        let lon = args.lon.ok_or(CliError::MissingArgument {
            field: ARG_LON,
            env: ENV_NEARBY_LON,
        })?;
        Ok(Self {
            origin: Coordinate::new(lat, lon)?,
            radius_km: clamp_radius_km(args.radius_km.unwrap_or(DEFAULT_RADIUS_KM)),
            source: SourceConfig {
                kind: args.source.unwrap_or_default(),
                backend_url: args.backend_url,
                host_origin: args.host_origin,
                overpass_endpoints: args.overpass_endpoint.unwrap_or_default(),
            },
            data_dir: args.data_dir.unwrap_or_else(|| Utf8PathBuf::from(".")),
        })
    }
}

pub(crate) async fn run_nearby(args: NearbyArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_nearby_with(args, &DefaultPlaceSourceBuilder, &mut stdout).await
}

pub(crate) async fn run_nearby_with(
    args: NearbyArgs,
    builder: &dyn PlaceSourceBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let executor = builder.build(&config.source)?;
    let resolver =
        LocationResolver::new().with_provider(FixedProvider::new("command line", config.origin));
    let engine = ProximityEngine::new(
        ProximityConfig::default(),
        JsonFileCollectedStore::in_data_dir(&config.data_dir),
    );
    let mut explorer = Explorer::new(resolver, executor, engine);

    let origin = explorer.locate(&CancellationToken::new()).await?;
    explorer
        .search_nearby(origin, config.radius_km * 1000.0)
        .await?;
    write_status(writer, &explorer)?;
    write_places(writer, explorer.results(), explorer.engine().collected())
}

pub(crate) fn write_status<S: CollectedStore>(
    writer: &mut dyn Write,
    explorer: &Explorer<S>,
) -> Result<(), CliError> {
    if let Some(status) = explorer.status() {
        writeln!(writer, "{status}")?;
    }
    Ok(())
}

/// Write one line per place, closest first.
pub(crate) fn write_places(
    writer: &mut dyn Write,
    places: &[PlaceOfWorship],
    collected: &CollectedSet,
) -> Result<(), CliError> {
    let mut ordered: Vec<&PlaceOfWorship> = places.iter().collect();
    ordered.sort_by(|a, b| {
        let left = a.distance_from_origin.unwrap_or(f64::INFINITY);
        let right = b.distance_from_origin.unwrap_or(f64::INFINITY);
        left.total_cmp(&right)
    });
    for place in ordered {
        let marker = if collected.contains(&place.stable_id) {
            '*'
        } else {
            ' '
        };
        let distance = place
            .distance_from_origin
            .map_or_else(|| String::from("-"), format_distance);
        writeln!(
            writer,
            "{marker} {id:<20} {name} ({category}, {distance})",
            id = place.stable_id.as_str(),
            name = place.display_name,
            category = place.category.label(),
        )?;
    }
    Ok(())
}
