//! `sds-rulemgr run`: collect descriptors, load a rule sequence, and
//! drive the pipeline executor over the collected set.

use std::sync::Arc;

use sds_collector::Collector;
use sds_config::Config;
use sds_ledger::Ledger;
use tracing::info;

use super::CommandError;
use super::common::{apply_common_filters, collaborators_with_ledger, read_filename_list, resolve_dir};
use crate::cli::args::RunArgs;

pub fn run_rules(args: &RunArgs, config: &Config) -> Result<(), CommandError> {
    let dir = resolve_dir(args.dir.as_deref(), config);
    let mut collector = Collector::load(&dir)?;

    if let Some(from_file) = &args.from_file {
        let filenames = read_filename_list(from_file)?;
        collector.filter_from_list(&filenames);
    }

    apply_common_filters(
        &mut collector,
        &args.wildcards,
        args.finished_minutes,
        args.sort,
    )?;

    let items = collector.into_files();
    info!(count = items.len(), "running rule sequence over collected items");

    let rules = sds_catalog::load(&args.rule_sequence, config.default_rule_timeout)?;
    let ledger = Ledger::open(&config.deletion_db_path)?;
    let collaborators = Arc::new(collaborators_with_ledger(ledger, config));

    let summary = sds_engine::run(&items, &rules, collaborators);
    info!(?summary, "rule sequence finished");
    Ok(())
}
