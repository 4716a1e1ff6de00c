//! The named rule-action catalog, grounded on `rules/sdsrules.py`.

use std::collections::HashMap;
use std::fs;

use sds_collab::{Collaborators, Collection};
use sds_descriptor::{Descriptor, Quality};

use crate::options::Options;
use crate::outcome::RuleOutcome;

pub type ActionFn = fn(&Options, &Descriptor, &Collaborators) -> RuleOutcome;

macro_rules! try_outcome {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(err) => return RuleOutcome::Error(err.to_string()),
        }
    };
}

/// Like `try_outcome!`, but for collaborator calls: when the rule is
/// configured `exit_on_failure=true`, a collaborator error converts into a
/// `PipelineExit(error)` instead of an ordinary `Error`, per spec.md §7.
macro_rules! try_collab {
    ($options:expr, $expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(err) => {
                if $options.bool_or("exit_on_failure", false) {
                    return RuleOutcome::PipelineExit {
                        success: false,
                        message: Some(err.to_string()),
                    };
                }
                return RuleOutcome::Error(err.to_string());
            }
        }
    };
}

fn local_checksum(descriptor: &Descriptor) -> Result<String, String> {
    descriptor
        .checksum()
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("file '{}' is absent, cannot compute checksum", descriptor.filename()))
}

fn ingest_object_store(options: &Options, descriptor: &Descriptor, collab: &Collaborators) -> RuleOutcome {
    let checksum = try_outcome!(local_checksum(descriptor));
    try_collab!(options, collab.object_store.put(descriptor, &checksum));
    tracing::debug!(file = %descriptor.filename(), checksum, "ingested into object store");
    RuleOutcome::Success
}

fn ingest_grid(options: &Options, descriptor: &Descriptor, collab: &Collaborators) -> RuleOutcome {
    let bytes = try_outcome!(fs::read(descriptor.filepath()).map_err(|e| e.to_string()));
    try_collab!(options, collab.grid_archive.put(descriptor, &bytes));
    tracing::debug!(file = %descriptor.filename(), "ingested into grid archive");
    RuleOutcome::Success
}

fn replicate(options: &Options, descriptor: &Descriptor, collab: &Collaborators) -> RuleOutcome {
    let remote_root = try_outcome!(options.string("remote_root"));
    try_collab!(options, collab.grid_archive.replicate(descriptor, remote_root));
    tracing::debug!(file = %descriptor.filename(), remote_root, "replicated");
    RuleOutcome::Success
}

fn assign_pid(options: &Options, descriptor: &Descriptor, collab: &Collaborators) -> RuleOutcome {
    if try_collab!(options, collab.grid_archive.get_pid(descriptor)).is_some() {
        tracing::info!(file = %descriptor.filename(), "file was already assigned a PID");
        return RuleOutcome::Success;
    }
    let pid = try_collab!(options, collab.grid_archive.assign_pid(descriptor));
    tracing::info!(file = %descriptor.filename(), pid, "assigned PID");
    RuleOutcome::Success
}

fn add_pid_to_catalog(options: &Options, descriptor: &Descriptor, collab: &Collaborators) -> RuleOutcome {
    let Some(pid) = try_collab!(options, collab.grid_archive.get_pid(descriptor)) else {
        return RuleOutcome::Error(format!("file '{}' has no PID", descriptor.filename()));
    };
    let doc = serde_json::json!({"file_id": descriptor.filename(), "dc_identifier": pid});
    try_collab!(options, collab.catalog_store.save(Collection::WfCatalogDaily, doc, false));
    RuleOutcome::Success
}

fn compute_waveform_metadata(options: &Options, descriptor: &Descriptor, collab: &Collaborators) -> RuleOutcome {
    let doc = try_collab!(options, collab.waveform_analysis.quality_metadata(descriptor));
    try_collab!(options, collab.catalog_store.save(Collection::WfCatalogDaily, doc, true));
    RuleOutcome::Success
}

fn delete_waveform_metadata(options: &Options, descriptor: &Descriptor, collab: &Collaborators) -> RuleOutcome {
    try_collab!(options, collab.catalog_store.delete_many(Collection::WfCatalogDaily, &descriptor.filename()));
    RuleOutcome::Success
}

fn compute_dc_metadata(options: &Options, descriptor: &Descriptor, collab: &Collaborators) -> RuleOutcome {
    let Some(pid) = try_collab!(options, collab.grid_archive.get_pid(descriptor)) else {
        return RuleOutcome::Error(format!("file '{}' has no PID, cannot build Dublin Core record", descriptor.filename()));
    };
    let location = try_collab!(options, collab.inventory_service.station_location(descriptor));
    let doc = serde_json::json!({
        "file_id": descriptor.filename(),
        "dc_identifier": pid,
        "location": location.map(|loc| serde_json::json!({
            "latitude": loc.latitude,
            "longitude": loc.longitude,
            "elevation": loc.elevation,
        })),
    });
    try_collab!(options, collab.catalog_store.save(Collection::DublinCore, doc, true));
    RuleOutcome::Success
}

fn delete_dc_metadata(options: &Options, descriptor: &Descriptor, collab: &Collaborators) -> RuleOutcome {
    try_collab!(options, collab.catalog_store.delete_many(Collection::DublinCore, &descriptor.filename()));
    RuleOutcome::Success
}

fn compute_ppsd_metadata(options: &Options, descriptor: &Descriptor, collab: &Collaborators) -> RuleOutcome {
    let documents = try_collab!(options, collab.waveform_analysis.ppsd_segments(descriptor));
    try_collab!(options, collab.catalog_store.delete_many(Collection::Ppsd, &descriptor.filename()));
    for doc in documents {
        try_collab!(options, collab.catalog_store.save(Collection::Ppsd, doc, false));
    }
    RuleOutcome::Success
}

fn delete_ppsd_metadata(options: &Options, descriptor: &Descriptor, collab: &Collaborators) -> RuleOutcome {
    try_collab!(options, collab.catalog_store.delete_many(Collection::Ppsd, &descriptor.filename()));
    RuleOutcome::Success
}

/// Repacks the raw `.D` file into a `.Q` sibling under the temporary
/// archive root. The actual waveform repacking (record-size/overlap
/// handling) is the waveform-analysis collaborator's concern; this action
/// only materializes the `.Q` artifact the rest of the pipeline keys off.
fn prune(options: &Options, descriptor: &Descriptor, _collab: &Collaborators) -> RuleOutcome {
    let temp_root = try_outcome!(options.string("temp_root"));
    let source = try_outcome!(fs::read(descriptor.filepath()).map_err(|e| e.to_string()));
    let destination = descriptor.with_quality(Quality::Q).grid_path(std::path::Path::new(temp_root));
    if let Some(parent) = destination.parent() {
        try_outcome!(fs::create_dir_all(parent).map_err(|e| e.to_string()));
    }
    try_outcome!(sds_utils::atomic_write::write_atomic(&destination, &source).map_err(|e| e.to_string()));
    RuleOutcome::Success
}

/// Deletes the pruned `.Q` file from the temporary archive. Idempotent:
/// a file already absent is not an error.
fn purge(options: &Options, descriptor: &Descriptor, _collab: &Collaborators) -> RuleOutcome {
    let temp_root = try_outcome!(options.string("temp_root"));
    let path = descriptor.with_quality(Quality::Q).grid_path(std::path::Path::new(temp_root));
    match fs::remove_file(&path) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(file = %descriptor.filename(), "not present in temporary archive");
        }
        Err(err) => return RuleOutcome::Error(err.to_string()),
    }
    RuleOutcome::Success
}

/// Moves the raw `.D` file into the quarantine area and removes the local
/// `.Q` sibling, if any. Called with the `.Q` file but acts on both,
/// matching the original's `quarantineRule`.
fn quarantine(options: &Options, descriptor: &Descriptor, _collab: &Collaborators) -> RuleOutcome {
    let quarantine_root = try_outcome!(options.string("quarantine_path"));
    let dry_run = options.bool_or("dry_run", false);

    let d_file = descriptor.with_quality(Quality::D);
    let destination = d_file.quarantine_path(std::path::Path::new(quarantine_root), Quality::D);

    if dry_run {
        tracing::debug!(file = %d_file.filename(), destination = %destination.display(), "dry run: would quarantine");
        return RuleOutcome::Success;
    }

    if let Some(parent) = destination.parent() {
        try_outcome!(fs::create_dir_all(parent).map_err(|e| e.to_string()));
    }
    try_outcome!(fs::rename(d_file.filepath(), &destination).map_err(|e| e.to_string()));

    let q_file = descriptor.with_quality(Quality::Q);
    if q_file.exists() {
        try_outcome!(fs::remove_file(q_file.filepath()).map_err(|e| e.to_string()));
    }
    RuleOutcome::Success
}

fn delete_from_object_store(options: &Options, descriptor: &Descriptor, collab: &Collaborators) -> RuleOutcome {
    try_collab!(options, collab.object_store.delete(descriptor));
    RuleOutcome::Success
}

fn delete_from_grid(options: &Options, descriptor: &Descriptor, collab: &Collaborators) -> RuleOutcome {
    try_collab!(options, collab.grid_archive.delete(descriptor));
    RuleOutcome::Success
}

/// The deletion pipeline's terminal rule (spec.md §4.6): once every
/// archive/catalog has confirmed deletion, drop the ledger entry.
fn remove_from_deletion_ledger(options: &Options, descriptor: &Descriptor, collab: &Collaborators) -> RuleOutcome {
    try_collab!(options, collab.deletion_ledger.remove(&descriptor.filename()));
    RuleOutcome::Success
}

pub fn registry() -> HashMap<&'static str, ActionFn> {
    let mut map: HashMap<&'static str, ActionFn> = HashMap::new();
    map.insert("ingest_object_store", ingest_object_store);
    map.insert("ingest_grid", ingest_grid);
    map.insert("replicate", replicate);
    map.insert("assign_pid", assign_pid);
    map.insert("add_pid_to_catalog", add_pid_to_catalog);
    map.insert("compute_waveform_metadata", compute_waveform_metadata);
    map.insert("delete_waveform_metadata", delete_waveform_metadata);
    map.insert("compute_dc_metadata", compute_dc_metadata);
    map.insert("delete_dc_metadata", delete_dc_metadata);
    map.insert("compute_ppsd_metadata", compute_ppsd_metadata);
    map.insert("delete_ppsd_metadata", delete_ppsd_metadata);
    map.insert("prune", prune);
    map.insert("quarantine", quarantine);
    map.insert("purge", purge);
    map.insert("delete_from_object_store", delete_from_object_store);
    map.insert("delete_from_grid", delete_from_grid);
    map.insert("remove_from_deletion_ledger", remove_from_deletion_ledger);
    map
}
