//! Helpers shared by the three subcommands.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use sds_collab::{
    CatalogStore, Collaborators, GridArchive, InventoryService, ObjectStore, WaveformAnalysis, fakes,
};
use sds_collector::Collector;
use sds_config::Config;
use sds_ledger::Ledger;

use super::CommandError;
use crate::cli::args::SortArg;

/// `--dir` overrides the configured `data_dir` when given.
pub fn resolve_dir(cli_dir: Option<&Path>, config: &Config) -> PathBuf {
    cli_dir.map(Path::to_path_buf).unwrap_or_else(|| config.data_dir.clone())
}

/// Read one filename per line from `path`, or from stdin when `path` is
/// `"-"`. Blank lines are skipped.
pub fn read_filename_list(path: &str) -> Result<Vec<String>, CommandError> {
    let lines: Vec<String> = if path == "-" {
        io::stdin()
            .lock()
            .lines()
            .collect::<Result<_, _>>()
            .map_err(CommandError::Io)?
    } else {
        fs::read_to_string(path)
            .map_err(CommandError::Io)?
            .lines()
            .map(str::to_string)
            .collect()
    };
    Ok(lines.into_iter().filter(|l| !l.trim().is_empty()).collect())
}

/// Write one filename per line to `path`, or to stdout when `path` is
/// `"-"`.
pub fn write_filename_list(path: &str, filenames: &[String]) -> Result<(), CommandError> {
    if path == "-" {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        for filename in filenames {
            writeln!(out, "{filename}").map_err(CommandError::Io)?;
        }
    } else {
        let contents = filenames.iter().map(|f| format!("{f}\n")).collect::<String>();
        fs::write(path, contents).map_err(CommandError::Io)?;
    }
    Ok(())
}

/// Apply the wildcard / finished-minutes / sort filters common to
/// `collect` and `run` to an already-loaded [`Collector`].
pub fn apply_common_filters(
    collector: &mut Collector,
    wildcards: &[String],
    finished_minutes: Option<i64>,
    sort: SortArg,
) -> Result<(), CommandError> {
    if !wildcards.is_empty() {
        collector.filter_wildcards(wildcards)?;
    }
    if let Some(minutes) = finished_minutes {
        collector.filter_finished(minutes);
    }
    collector.sort(sort.into());
    Ok(())
}

/// Build a [`Collaborators`] bundle around a real, disk-backed deletion
/// ledger and the in-memory fakes for every other collaborator.
///
/// Real `ObjectStore`/`GridArchive`/`CatalogStore`/`WaveformAnalysis`/
/// `InventoryService` clients are out of scope (spec.md §1): this is the
/// wiring point where a deployment would substitute production
/// implementations behind the same traits. The deletion ledger is in
/// scope (spec.md §4.6) and always backed by `sds-ledger`. The backend
/// config (`object_store`, `catalogs`, `grid_archive`,
/// `inventory_service_url`, `grid_root`, `quarantine_root`) is logged
/// here so a misconfigured deployment is visible even before a real
/// client reads it.
pub fn collaborators_with_ledger(ledger: Ledger, config: &Config) -> Collaborators {
    tracing::info!(
        object_store_bucket = %config.object_store.bucket_name,
        object_store_prefix = %config.object_store.prefix,
        catalogs = ?config.catalogs.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        grid_archive_host = %config.grid_archive.host,
        grid_archive_zone = %config.grid_archive.zone,
        inventory_service_url = %config.inventory_service_url,
        grid_root = %config.grid_root.display(),
        quarantine_root = %config.quarantine_root.display(),
        "wiring collaborators (fakes; no real backend clients in this build)"
    );
    Collaborators {
        object_store: Box::new(fakes::FakeObjectStore::default()) as Box<dyn ObjectStore>,
        grid_archive: Box::new(fakes::FakeGridArchive::default()) as Box<dyn GridArchive>,
        catalog_store: Box::new(fakes::FakeCatalogStore::default()) as Box<dyn CatalogStore>,
        waveform_analysis: Box::new(fakes::FakeWaveformAnalysis::default()) as Box<dyn WaveformAnalysis>,
        inventory_service: Box::new(fakes::FakeInventoryService::default()) as Box<dyn InventoryService>,
        deletion_ledger: Box::new(ledger),
    }
}
