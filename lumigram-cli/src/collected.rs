//! Collected command: show or clear the collected places.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use lumigram_core::{ProximityConfig, ProximityEngine};
use lumigram_data::JsonFileCollectedStore;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{ARG_CLEAR, ARG_DATA_DIR, CliError};

/// CLI arguments for the `collected` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(about = "Show or clear the collected places")]
#[ortho_config(prefix = "LUMIGRAM")]
pub(crate) struct CollectedArgs {
    /// Directory holding the collected places file.
    #[arg(long = ARG_DATA_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) data_dir: Option<Utf8PathBuf>,
    /// Forget every collected place.
    #[arg(long = ARG_CLEAR)]
    #[serde(default)]
    pub(crate) clear: bool,
}

/// Resolved `collected` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CollectedConfig {
    pub(crate) data_dir: Utf8PathBuf,
    pub(crate) clear: bool,
}

impl From<CollectedArgs> for CollectedConfig {
    fn from(args: CollectedArgs) -> Self {
        Self {
            data_dir: args.data_dir.unwrap_or_else(|| Utf8PathBuf::from(".")),
            clear: args.clear,
        }
    }
}

pub(crate) fn run_collected(args: CollectedArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_collected_with(args, &mut stdout)
}

pub(crate) fn run_collected_with(
    args: CollectedArgs,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = CollectedConfig::from(merged);
    let store = JsonFileCollectedStore::in_data_dir(&config.data_dir);
    let mut engine = ProximityEngine::new(ProximityConfig::default(), store);

    if config.clear {
        let cleared = engine.collected().len();
        engine.clear_collected();
        writeln!(writer, "Cleared {cleared} collected places.")?;
        return Ok(());
    }
    let collected = engine.collected();
    if collected.is_empty() {
        writeln!(writer, "No places collected yet.")?;
        return Ok(());
    }
    for id in collected.sorted_ids() {
        writeln!(writer, "{id}")?;
    }
    match collected.updated_at() {
        Some(updated_at) => writeln!(
            writer,
            "{} collected, last on {}.",
            collected.len(),
            updated_at.format("%Y-%m-%d")
        )?,
        None => writeln!(writer, "{} collected.", collected.len())?,
    }
    Ok(())
}
