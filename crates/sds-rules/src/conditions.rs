//! The named condition catalog, grounded on `conditions/sdsconditions.py`.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use sds_collab::{Collaborators, Collection};
use sds_descriptor::{Descriptor, Quality};

use crate::options::Options;

#[derive(Debug, thiserror::Error)]
pub enum ConditionError {
    #[error(transparent)]
    Options(#[from] crate::options::OptionsError),
    #[error("descriptor error: {0}")]
    Descriptor(String),
    #[error("collaborator error: {0}")]
    Collab(#[from] sds_collab::CollabError),
}

pub type ConditionFn = fn(&Options, &Descriptor, &Collaborators) -> Result<bool, ConditionError>;

/// "Document absent ⇒ condition false": the shared shape behind every
/// `*_metadata_exists` / `*_catalog_exists` condition.
fn document_matches_checksum(doc: Option<serde_json::Value>, local_checksum: Option<&str>) -> bool {
    match doc {
        None => false,
        Some(doc) => doc.get("checksum").and_then(|v| v.as_str()) == local_checksum,
    }
}

fn quality_in(options: &Options, descriptor: &Descriptor, _collab: &Collaborators) -> Result<bool, ConditionError> {
    let qualities = options.string_list("qualities")?;
    Ok(qualities.iter().any(|q| q == &descriptor.quality().to_string()))
}

/// Resolves the `apply_to ∈ {previous, current, next}` option against the
/// bound descriptor. Defaults to `current` when the option is absent.
fn resolve_target(options: &Options, descriptor: &Descriptor) -> Result<Descriptor, ConditionError> {
    match options.string_or("apply_to", "current") {
        "previous" => Ok(descriptor.previous()),
        "current" => Ok(descriptor.clone()),
        "next" => Ok(descriptor.next()),
        other => Err(ConditionError::Descriptor(format!(
            "invalid apply_to '{other}', expected previous|current|next"
        ))),
    }
}

fn modified_newer_than(options: &Options, descriptor: &Descriptor, _collab: &Collaborators) -> Result<bool, ConditionError> {
    let cutoff = Utc::now() - Duration::days(options.i64("days")?);
    let target = resolve_target(options, descriptor)?;
    Ok(matches!(target.modified(), Some(m) if m > cutoff))
}

fn modified_older_than(options: &Options, descriptor: &Descriptor, _collab: &Collaborators) -> Result<bool, ConditionError> {
    let cutoff = Utc::now() - Duration::days(options.i64("days")?);
    let target = resolve_target(options, descriptor)?;
    match target.modified() {
        Some(m) => Ok(m < cutoff),
        None => Ok(true),
    }
}

fn data_time_newer_than(options: &Options, descriptor: &Descriptor, _collab: &Collaborators) -> Result<bool, ConditionError> {
    let cutoff = Utc::now() - Duration::days(options.i64("days")?);
    let target = resolve_target(options, descriptor)?;
    if !target.exists() {
        return Ok(false);
    }
    Ok(target.start() > cutoff)
}

fn data_time_older_than(options: &Options, descriptor: &Descriptor, _collab: &Collaborators) -> Result<bool, ConditionError> {
    let cutoff = Utc::now() - Duration::days(options.i64("days")?);
    let target = resolve_target(options, descriptor)?;
    if !target.exists() {
        return Ok(true);
    }
    Ok(target.start() < cutoff)
}

fn object_store_exists(options: &Options, descriptor: &Descriptor, collab: &Collaborators) -> Result<bool, ConditionError> {
    let Some(remote_checksum) = collab.object_store.checksum(descriptor)? else {
        return Ok(false);
    };
    if !options.bool_or("check_checksum", true) {
        return Ok(true);
    }
    let local = descriptor
        .checksum()
        .map_err(|e| ConditionError::Descriptor(e.to_string()))?;
    Ok(local.as_deref() == Some(remote_checksum.as_str()))
}

fn grid_exists(_options: &Options, descriptor: &Descriptor, collab: &Collaborators) -> Result<bool, ConditionError> {
    Ok(collab.grid_archive.exists(descriptor)?)
}

fn grid_not_exists(options: &Options, descriptor: &Descriptor, collab: &Collaborators) -> Result<bool, ConditionError> {
    Ok(!grid_exists(options, descriptor, collab)?)
}

fn waveform_catalog_exists(options: &Options, descriptor: &Descriptor, collab: &Collaborators) -> Result<bool, ConditionError> {
    let doc = collab
        .catalog_store
        .find_one(Collection::WfCatalogDaily, &descriptor.filename())?;
    if !options.bool_or("check_checksum", true) {
        return Ok(doc.is_some());
    }
    let local = descriptor
        .checksum()
        .map_err(|e| ConditionError::Descriptor(e.to_string()))?;
    Ok(document_matches_checksum(doc, local.as_deref()))
}

fn dc_metadata_exists(_options: &Options, descriptor: &Descriptor, collab: &Collaborators) -> Result<bool, ConditionError> {
    let doc = collab
        .catalog_store
        .find_one(Collection::DublinCore, &descriptor.filename())?;
    let local = descriptor
        .checksum()
        .map_err(|e| ConditionError::Descriptor(e.to_string()))?;
    Ok(document_matches_checksum(doc, local.as_deref()))
}

/// PPSD documents must all agree on `checksum`, `checksum_prev` and
/// `checksum_next`; an empty result set is "not present" (false).
fn ppsd_metadata_exists(options: &Options, descriptor: &Descriptor, collab: &Collaborators) -> Result<bool, ConditionError> {
    let docs = collab
        .catalog_store
        .find_many(Collection::Ppsd, &descriptor.filename())?;
    let Some(first) = docs.first() else {
        return Ok(false);
    };
    if !options.bool_or("check_checksum", true) {
        return Ok(true);
    }
    let fields = ["checksum", "checksum_prev", "checksum_next"];
    let agrees = docs.iter().all(|doc| fields.iter().all(|field| doc.get(*field) == first.get(*field)));
    Ok(agrees)
}

fn pruned_file_exists(_options: &Options, descriptor: &Descriptor, _collab: &Collaborators) -> Result<bool, ConditionError> {
    Ok(descriptor.with_quality(Quality::Q).exists())
}

fn temp_archive_exists(options: &Options, descriptor: &Descriptor, _collab: &Collaborators) -> Result<bool, ConditionError> {
    let temp_root = options.string("temp_root")?;
    Ok(descriptor
        .with_quality(Quality::Q)
        .grid_path(std::path::Path::new(temp_root))
        .exists())
}

fn file_replicated(options: &Options, descriptor: &Descriptor, collab: &Collaborators) -> Result<bool, ConditionError> {
    let remote_root = options.string("remote_root")?;
    Ok(collab.grid_archive.federated_exists(descriptor, remote_root)?)
}

fn pid_assigned(_options: &Options, descriptor: &Descriptor, collab: &Collaborators) -> Result<bool, ConditionError> {
    Ok(collab.grid_archive.get_pid(descriptor)?.is_some())
}

fn replica_pid_assigned(options: &Options, descriptor: &Descriptor, collab: &Collaborators) -> Result<bool, ConditionError> {
    let remote_root = options.string("remote_root")?;
    Ok(collab.grid_archive.federated_get_pid(descriptor, remote_root)?.is_some())
}

pub fn registry() -> HashMap<&'static str, ConditionFn> {
    let mut map: HashMap<&'static str, ConditionFn> = HashMap::new();
    map.insert("quality_in", quality_in);
    map.insert("modified_newer_than", modified_newer_than);
    map.insert("modified_older_than", modified_older_than);
    map.insert("data_time_newer_than", data_time_newer_than);
    map.insert("data_time_older_than", data_time_older_than);
    map.insert("object_store_exists", object_store_exists);
    map.insert("grid_exists", grid_exists);
    map.insert("grid_not_exists", grid_not_exists);
    map.insert("waveform_catalog_exists", waveform_catalog_exists);
    map.insert("dc_metadata_exists", dc_metadata_exists);
    map.insert("ppsd_metadata_exists", ppsd_metadata_exists);
    map.insert("pruned_file_exists", pruned_file_exists);
    map.insert("temp_archive_exists", temp_archive_exists);
    map.insert("file_replicated", file_replicated);
    map.insert("pid_assigned", pid_assigned);
    map.insert("replica_pid_assigned", replica_pid_assigned);
    map
}
