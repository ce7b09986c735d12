//! Command-line interface for exploring and collecting places of worship.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod check_in;
mod collected;
mod error;
mod explorer;
mod nearby;
mod source;
mod status;
mod viewport;

pub use error::CliError;

use check_in::{CheckInArgs, run_check_in};
use collected::{CollectedArgs, run_collected};
use nearby::{NearbyArgs, run_nearby};
use viewport::{ViewportArgs, run_viewport};

pub(crate) const ARG_LAT: &str = "lat";
pub(crate) const ARG_LON: &str = "lon";
pub(crate) const ARG_RADIUS_KM: &str = "radius-km";
pub(crate) const ARG_SOURCE: &str = "source";
pub(crate) const ARG_BACKEND_URL: &str = "backend-url";
pub(crate) const ARG_HOST_ORIGIN: &str = "host-origin";
pub(crate) const ARG_OVERPASS_ENDPOINT: &str = "overpass-endpoint";
pub(crate) const ARG_DATA_DIR: &str = "data-dir";
pub(crate) const ARG_SOUTH: &str = "south";
pub(crate) const ARG_WEST: &str = "west";
pub(crate) const ARG_NORTH: &str = "north";
pub(crate) const ARG_EAST: &str = "east";
pub(crate) const ARG_ZOOM: &str = "zoom";
pub(crate) const ARG_PLACE: &str = "place";
pub(crate) const ARG_TRACK: &str = "track";
pub(crate) const ARG_CLEAR: &str = "clear";
pub(crate) const ARG_MAP_CENTER: &str = "map-center";
pub(crate) const ENV_NEARBY_LAT: &str = "LUMIGRAM_CMDS_NEARBY_LAT";
pub(crate) const ENV_NEARBY_LON: &str = "LUMIGRAM_CMDS_NEARBY_LON";
pub(crate) const ENV_VIEWPORT_SOUTH: &str = "LUMIGRAM_CMDS_VIEWPORT_SOUTH";
pub(crate) const ENV_VIEWPORT_WEST: &str = "LUMIGRAM_CMDS_VIEWPORT_WEST";
pub(crate) const ENV_VIEWPORT_NORTH: &str = "LUMIGRAM_CMDS_VIEWPORT_NORTH";
pub(crate) const ENV_VIEWPORT_EAST: &str = "LUMIGRAM_CMDS_VIEWPORT_EAST";
pub(crate) const ENV_CHECK_IN_PLACE: &str = "LUMIGRAM_CMDS_CHECK_IN_PLACE";
pub(crate) const ENV_CHECK_IN_TRACK: &str = "LUMIGRAM_CMDS_CHECK_IN_TRACK";

/// Run the Lumigram CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    runtime.block_on(async move {
        match cli.command {
            Command::Nearby(args) => run_nearby(args).await,
            Command::Viewport(args) => run_viewport(args).await,
            Command::CheckIn(args) => run_check_in(args).await,
            Command::Collected(args) => run_collected(args),
        }
    })
}

#[derive(Debug, Parser)]
#[command(
    name = "lumigram",
    about = "Find nearby places of worship and collect them in person",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List places of worship around a position.
    Nearby(NearbyArgs),
    /// List places of worship inside a map viewport.
    Viewport(ViewportArgs),
    /// Walk a recorded track and check in at a place.
    CheckIn(CheckInArgs),
    /// Show or clear the collected places.
    Collected(CollectedArgs),
}

#[cfg(test)]
mod tests;
