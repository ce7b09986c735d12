//! Check-in command: replay a recorded track and collect a place.
//!
//! The track file holds one `lat,lon` pair per line; blank lines and lines
//! starting with `#` are ignored. Positions are fed through the live
//! tracking pipeline one at a time. Whenever the target is within range the
//! command holds the check-in control until the place is collected.
//!
//! With `--map-center` the positions instead pan a map centre, which becomes
//! the check-in origin, and no live tracking is opened.

use std::io::Write;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::info;
use lumigram_core::{
    CollectedStore, Coordinate, OriginMode, ProximityConfig, ProximityEngine, StableId,
};
use lumigram_data::JsonFileCollectedStore;
use lumigram_data::backend::{DEFAULT_RADIUS_KM, clamp_radius_km};
use lumigram_location::{LocationResolver, PlatformFeed, ProviderOptions};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::explorer::Explorer;
use crate::nearby::write_status;
use crate::source::{DefaultPlaceSourceBuilder, PlaceSource, PlaceSourceBuilder, SourceConfig};
use crate::{
    ARG_BACKEND_URL, ARG_DATA_DIR, ARG_HOST_ORIGIN, ARG_MAP_CENTER, ARG_OVERPASS_ENDPOINT,
    ARG_PLACE, ARG_RADIUS_KM, ARG_SOURCE, ARG_TRACK, CliError, ENV_CHECK_IN_PLACE,
    ENV_CHECK_IN_TRACK,
};

/// Interval between hold progress samples.
pub(crate) const HOLD_TICK: Duration = Duration::from_millis(100);

/// CLI arguments for the `check-in` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Search around the first position of a recorded track, \
                 select a place by id and replay the remaining positions as \
                 live location updates. The place is collected once a \
                 position falls within the check-in radius and the hold \
                 completes.",
    about = "Check in at a place by replaying a track"
)]
#[ortho_config(prefix = "LUMIGRAM")]
pub(crate) struct CheckInArgs {
    /// Stable id of the place, such as `node/123`.
    #[arg(value_name = "id")]
    #[serde(default)]
    pub(crate) place: Option<String>,
    /// File with one `lat,lon` position per line.
    #[arg(long = ARG_TRACK, value_name = "path")]
    #[serde(default)]
    pub(crate) track: Option<Utf8PathBuf>,
    /// Search radius in kilometres around the first position.
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
    /// Treat track positions as map centre pans instead of live fixes.
    #[arg(long = ARG_MAP_CENTER)]
    #[serde(default)]
    pub(crate) map_center: bool,
}

impl CheckInArgs {
    pub(crate) fn into_config(self) -> Result<CheckInConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        CheckInConfig::try_from(merged)
    }
}

/// Resolved `check-in` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CheckInConfig {
    pub(crate) place: StableId,
    pub(crate) track: Utf8PathBuf,
    pub(crate) radius_km: f64,
    pub(crate) source: SourceConfig,
    pub(crate) data_dir: Utf8PathBuf,
    pub(crate) origin_mode: OriginMode,
}

impl TryFrom<CheckInArgs> for CheckInConfig {
    type Error = CliError;

    fn try_from(args: CheckInArgs) -> Result<Self, Self::Error> {
        let place = args
            .place
            .filter(|id| !id.trim().is_empty())
            .ok_or(CliError::MissingArgument {
                field: ARG_PLACE,
                env: ENV_CHECK_IN_PLACE,
            })?;
        let track = args.track.ok_or(CliError::MissingArgument {
            field: ARG_TRACK,
            env: ENV_CHECK_IN_TRACK,
        })?;
        Ok(Self {
            place: StableId::new(place.trim()),
            track,
            radius_km: clamp_radius_km(args.radius_km.unwrap_or(DEFAULT_RADIUS_KM)),
            source: SourceConfig {
                kind: args.source.unwrap_or_default(),
                backend_url: args.backend_url,
                host_origin: args.host_origin,
                overpass_endpoints: args.overpass_endpoint.unwrap_or_default(),
            },
            data_dir: args.data_dir.unwrap_or_else(|| Utf8PathBuf::from(".")),
            origin_mode: if args.map_center {
                OriginMode::MapCenter
            } else {
                OriginMode::LiveTracking
            },
        })
    }
}

/// Read the positions of a track file.
pub(crate) fn load_track(path: &Utf8Path) -> Result<Vec<Coordinate>, CliError> {
    let contents = lumigram_fs::read_to_string_if_exists(path)
        .and_then(|contents| {
            contents.ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
        })
        .map_err(|source| CliError::OpenTrack {
            path: path.to_path_buf(),
            source,
        })?;
    let mut positions = Vec::new();
    for (index, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let position = parse_position(line).map_err(|message| CliError::ParseTrack {
            path: path.to_path_buf(),
            line: index + 1,
            message,
        })?;
        positions.push(position);
    }
    if positions.is_empty() {
        return Err(CliError::EmptyTrack {
            path: path.to_path_buf(),
        });
    }
    Ok(positions)
}

fn parse_position(line: &str) -> Result<Coordinate, String> {
    let (lat, lon) = line
        .split_once(',')
        .ok_or_else(|| String::from("expected `lat,lon`"))?;
    let latitude: f64 = lat
        .trim()
        .parse()
        .map_err(|err| format!("latitude {:?}: {err}", lat.trim()))?;
    let longitude: f64 = lon
        .trim()
        .parse()
        .map_err(|err| format!("longitude {:?}: {err}", lon.trim()))?;
    Coordinate::new(latitude, longitude).map_err(|err| err.to_string())
}

pub(crate) async fn run_check_in(args: CheckInArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_check_in_with(args, &DefaultPlaceSourceBuilder, &mut stdout).await
}

pub(crate) async fn run_check_in_with(
    args: CheckInArgs,
    builder: &dyn PlaceSourceBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let mut positions = load_track(&config.track)?.into_iter();
    let executor = builder.build(&config.source)?;
    let feed = PlatformFeed::new();
    let resolver =
        LocationResolver::new().with_provider(feed.provider("track", ProviderOptions::default()));
    let engine = ProximityEngine::new(
        ProximityConfig::default(),
        JsonFileCollectedStore::in_data_dir(&config.data_dir),
    );
    let mut explorer = Explorer::new(resolver, executor, engine);

    let origin = match config.origin_mode {
        OriginMode::LiveTracking => {
            if let Some(first) = positions.next() {
                feed.publish(first);
            }
            explorer.locate(&CancellationToken::new()).await?
        }
        OriginMode::MapCenter => {
            let first = positions.next().ok_or_else(|| CliError::EmptyTrack {
                path: config.track.clone(),
            })?;
            explorer.use_map_center();
            explorer.pan_to(first);
            first
        }
    };
    explorer
        .search_nearby(origin, config.radius_km * 1000.0)
        .await?;
    write_status(writer, &explorer)?;
    explorer.select(&config.place)?;
    writeln!(writer, "{}", explorer.prompt())?;
    if explorer.engine().is_collected(&config.place) {
        explorer.finish();
        return Ok(());
    }

    let collected = match config.origin_mode {
        OriginMode::LiveTracking => follow_track(&mut explorer, &feed, positions, writer).await?,
        OriginMode::MapCenter => pan_along_track(&mut explorer, positions, writer).await?,
    };
    explorer.finish();
    if collected {
        info!("checked in at {}", config.place);
        writeln!(writer, "Collected {}.", config.place)?;
    } else {
        writeln!(writer, "Track ended before check-in.")?;
    }
    Ok(())
}

/// Feed track positions until the target is collected or the track ends.
async fn follow_track<S, I>(
    explorer: &mut Explorer<S>,
    feed: &PlatformFeed,
    mut remaining: I,
    writer: &mut dyn Write,
) -> Result<bool, CliError>
where
    S: CollectedStore,
    I: Iterator<Item = Coordinate>,
{
    while explorer.is_tracking() && explorer.next_fix().await {
        writeln!(writer, "{}", explorer.prompt())?;
        if explorer.engine().snapshot().can_check_in() && explorer.hold(HOLD_TICK).await {
            writeln!(writer, "{}", explorer.prompt())?;
            return Ok(true);
        }
        let Some(position) = remaining.next() else {
            break;
        };
        feed.publish(position);
    }
    Ok(false)
}

/// Pan the map centre along the track until the target is collected or the
/// track ends.
async fn pan_along_track<S, I>(
    explorer: &mut Explorer<S>,
    mut remaining: I,
    writer: &mut dyn Write,
) -> Result<bool, CliError>
where
    S: CollectedStore,
    I: Iterator<Item = Coordinate>,
{
    loop {
        if explorer.engine().snapshot().can_check_in() && explorer.hold(HOLD_TICK).await {
            writeln!(writer, "{}", explorer.prompt())?;
            return Ok(true);
        }
        let Some(center) = remaining.next() else {
            return Ok(false);
        };
        explorer.pan_to(center);
        writeln!(writer, "{}", explorer.prompt())?;
    }
}
