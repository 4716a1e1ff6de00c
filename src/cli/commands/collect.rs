//! `sds-rulemgr collect`: scan an archive root, filter, and print or
//! write the resulting descriptor filenames.

use sds_collector::Collector;
use sds_config::Config;
use tracing::info;

use super::CommandError;
use super::common::{apply_common_filters, resolve_dir, write_filename_list};
use crate::cli::args::CollectArgs;

pub fn collect(args: &CollectArgs, config: &Config) -> Result<(), CommandError> {
    let dir = resolve_dir(args.dir.as_deref(), config);
    let mut collector = Collector::load(&dir)?;
    info!(count = collector.len(), dir = %dir.display(), "collected descriptors");

    apply_common_filters(
        &mut collector,
        &args.wildcards,
        args.finished_minutes,
        args.sort,
    )?;

    let filenames: Vec<String> = collector.into_files().iter().map(|d| d.filename()).collect();
    write_filename_list(&args.output, &filenames)?;
    Ok(())
}
