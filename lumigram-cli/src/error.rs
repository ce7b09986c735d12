//! Error types emitted by the Lumigram CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use lumigram_core::{BoundingBoxError, CoordinateError};
use lumigram_data::QueryError;
use lumigram_data::backend::ClientBuildError;
use lumigram_data::overpass::ExecutorBuildError;
use lumigram_location::LocationError;
use thiserror::Error;

/// Errors emitted by the Lumigram CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A latitude/longitude pair is out of range.
    #[error(transparent)]
    InvalidCoordinate(#[from] CoordinateError),
    /// The viewport corners do not form a valid box.
    #[error(transparent)]
    InvalidBoundingBox(#[from] BoundingBoxError),
    /// The async runtime could not start.
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// No location provider produced a fix.
    #[error(transparent)]
    Location(#[from] LocationError),
    /// The places query failed.
    #[error("{}", .0.user_message())]
    Query(#[from] QueryError),
    /// Constructing the Overpass executor failed.
    #[error("failed to build Overpass client: {0}")]
    BuildOverpass(#[source] ExecutorBuildError),
    /// Constructing the backend client failed.
    #[error("failed to build backend client: {0}")]
    BuildBackend(#[source] ClientBuildError),
    /// The requested place is not among the search results.
    #[error("place {id} was not found near the first track position")]
    UnknownPlace { id: String },
    /// Opening the track file failed.
    #[error("failed to open track at {path:?}: {source}")]
    OpenTrack {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A track line is not a `lat,lon` pair.
    #[error("invalid track position at {path:?}:{line}: {message}")]
    ParseTrack {
        path: Utf8PathBuf,
        line: usize,
        message: String,
    },
    /// The track file has no positions.
    #[error("track at {path:?} contains no positions")]
    EmptyTrack { path: Utf8PathBuf },
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}

impl From<std::io::Error> for CliError {
    fn from(source: std::io::Error) -> Self {
        Self::WriteOutput(source)
    }
}
