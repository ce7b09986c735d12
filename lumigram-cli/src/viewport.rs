//! Viewport command: list the places of worship inside a bounding box.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use lumigram_core::{BoundingBox, ProximityConfig, ProximityEngine};
use lumigram_data::{JsonFileCollectedStore, Trigger};
use lumigram_location::LocationResolver;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::explorer::Explorer;
use crate::nearby::{write_places, write_status};
use crate::source::{DefaultPlaceSourceBuilder, PlaceSourceBuilder, SourceConfig};
use crate::{
    ARG_DATA_DIR, ARG_EAST, ARG_NORTH, ARG_OVERPASS_ENDPOINT, ARG_SOUTH, ARG_WEST, ARG_ZOOM,
    CliError, ENV_VIEWPORT_EAST, ENV_VIEWPORT_NORTH, ENV_VIEWPORT_SOUTH, ENV_VIEWPORT_WEST,
};

/// CLI arguments for the `viewport` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Query Overpass for places of worship inside a map \
                 viewport. Below the minimum zoom nothing is fetched.",
    about = "List places of worship inside a viewport"
)]
#[ortho_config(prefix = "LUMIGRAM")]
pub(crate) struct ViewportArgs {
    /// Southern edge latitude.
    #[arg(long = ARG_SOUTH, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) south: Option<f64>,
    /// Western edge longitude.
    #[arg(long = ARG_WEST, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) west: Option<f64>,
    /// Northern edge latitude.
    #[arg(long = ARG_NORTH, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) north: Option<f64>,
    /// Eastern edge longitude.
    #[arg(long = ARG_EAST, value_name = "degrees", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) east: Option<f64>,
    /// Map zoom level of the viewport.
    #[arg(long = ARG_ZOOM, value_name = "level")]
    #[serde(default)]
    pub(crate) zoom: Option<f64>,
    /// Overpass interpreter URL; repeat to add fallbacks.
    #[arg(long = ARG_OVERPASS_ENDPOINT, value_name = "url")]
    #[serde(default)]
    pub(crate) overpass_endpoint: Option<Vec<String>>,
    /// Directory holding the collected places file.
    #[arg(long = ARG_DATA_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) data_dir: Option<Utf8PathBuf>,
}

impl ViewportArgs {
    pub(crate) fn into_config(self) -> Result<ViewportConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ViewportConfig::try_from(merged)
    }
}

/// Resolved `viewport` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ViewportConfig {
    pub(crate) bbox: BoundingBox,
    pub(crate) zoom: Option<f64>,
    pub(crate) source: SourceConfig,
    pub(crate) data_dir: Utf8PathBuf,
}

impl TryFrom<ViewportArgs> for ViewportConfig {
    type Error = CliError;

    fn try_from(args: ViewportArgs) -> Result<Self, Self::Error> {
        let south = args.south.ok_or(CliError::MissingArgument {
            field: ARG_SOUTH,
            env: ENV_VIEWPORT_SOUTH,
        })?;
        let west = args.west.ok_or(CliError::MissingArgument {
            field: ARG_WEST,
            env: ENV_VIEWPORT_WEST,
        })?;
        let north = args.north.ok_or(CliError::MissingArgument {
            field: ARG_NORTH,
            env: ENV_VIEWPORT_NORTH,
        })?;
        let east = args.east.ok_or(CliError::MissingArgument {
            field: ARG_EAST,
            env: ENV_VIEWPORT_EAST,
        })?;
        Ok(Self {
            bbox: BoundingBox::new(south, west, north, east)?,
            zoom: args.zoom,
            source: SourceConfig::overpass(args.overpass_endpoint),
            data_dir: args.data_dir.unwrap_or_else(|| Utf8PathBuf::from(".")),
        })
    }
}

pub(crate) async fn run_viewport(args: ViewportArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_viewport_with(args, &DefaultPlaceSourceBuilder, &mut stdout).await
}

pub(crate) async fn run_viewport_with(
    args: ViewportArgs,
    builder: &dyn PlaceSourceBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let executor = builder.build(&config.source)?;
    let engine = ProximityEngine::new(
        ProximityConfig::default(),
        JsonFileCollectedStore::in_data_dir(&config.data_dir),
    );
    let mut explorer = Explorer::new(LocationResolver::new(), executor, engine);

    explorer
        .search_viewport(config.bbox, config.zoom, Trigger::Immediate)
        .await?;
    write_status(writer, &explorer)?;
    write_places(writer, explorer.results(), explorer.engine().collected())
}
