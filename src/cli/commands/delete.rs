//! `sds-rulemgr delete`: append filenames to the deletion ledger, then
//! drive the pipeline over the ledger's full contents (spec.md §4.6 —
//! the ledger, not the CLI's own input, is the source of truth for what
//! gets processed).

use std::sync::Arc;

use sds_config::Config;
use sds_descriptor::Descriptor;
use sds_ledger::Ledger;
use tracing::info;

use super::CommandError;
use super::common::{collaborators_with_ledger, read_filename_list, resolve_dir};
use crate::cli::args::DeleteArgs;

pub fn delete(args: &DeleteArgs, config: &Config) -> Result<(), CommandError> {
    let filenames = read_filename_list(&args.from_file)?;

    let ledger = Ledger::open(&config.deletion_db_path)?;
    ledger.add_many(&filenames)?;

    let pending = ledger.list()?;
    info!(count = pending.len(), "driving deletion pipeline over ledger contents");

    let dir = resolve_dir(args.dir.as_deref(), config);
    let items = pending
        .iter()
        .map(|filename| Descriptor::new(filename, dir.as_path()))
        .collect::<Result<Vec<_>, _>>()?;

    let rules = sds_catalog::load(&args.rule_sequence, config.default_rule_timeout)?;
    let collaborators = Arc::new(collaborators_with_ledger(ledger, config));

    let summary = sds_engine::run(&items, &rules, collaborators);
    info!(?summary, "deletion pipeline finished");
    Ok(())
}
