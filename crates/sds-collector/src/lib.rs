//! Recursive SDS archive scanning plus the composable filter chain
//! (wildcards, finished-file cutoff, date range, explicit list) described
//! in spec.md §4.2.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use globset::Glob;
use sds_descriptor::Descriptor;

#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("failed to read directory '{path}': {source}")]
    ReadDir { path: String, source: std::io::Error },

    #[error("invalid wildcard pattern '{pattern}': expected 7 dot-separated fields")]
    InvalidPattern { pattern: String },

    #[error("invalid wildcard glob '{pattern}': {source}")]
    InvalidGlob { pattern: String, source: globset::Error },

    #[error("unsupported date-range mode '{0}', expected 'file_name' or 'mod_time'")]
    InvalidMode(String),
}

/// Sort order for [`Collector::sort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
    None,
}

/// Which timestamp a date-range filter compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateMode {
    FileName,
    ModTime,
}

impl DateMode {
    fn parse(s: &str) -> Result<Self, CollectorError> {
        match s {
            "file_name" => Ok(DateMode::FileName),
            "mod_time" => Ok(DateMode::ModTime),
            other => Err(CollectorError::InvalidMode(other.to_string())),
        }
    }
}

/// A recursively-scanned, filterable set of [`Descriptor`]s rooted at one
/// archive directory.
pub struct Collector {
    root: std::path::PathBuf,
    files: Vec<Descriptor>,
}

impl Collector {
    /// Walk `root` recursively, parsing every basename as an SDS filename.
    /// Entries that fail to parse are logged at `debug` and skipped, per
    /// the original `SDSFileCollector` behavior.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, CollectorError> {
        let root = root.as_ref().to_path_buf();
        let mut files = Vec::new();
        walk(&root, &root, &mut files)?;
        Ok(Self { root, files })
    }

    pub fn files(&self) -> &[Descriptor] {
        &self.files
    }

    pub fn into_files(self) -> Vec<Descriptor> {
        self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Keep files whose filename matches any of `patterns` (7-field glob
    /// expressions, e.g. `NL.HGN.*.BHZ.D.????.???`). Accumulates matches
    /// across all patterns and de-duplicates, matching the original's
    /// `filterFromWildcardsArray`.
    pub fn filter_wildcards(&mut self, patterns: &[String]) -> Result<(), CollectorError> {
        let mut globs = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            if pattern.split('.').count() != 7 {
                return Err(CollectorError::InvalidPattern {
                    pattern: pattern.clone(),
                });
            }
            let glob = Glob::new(pattern)
                .map_err(|source| CollectorError::InvalidGlob {
                    pattern: pattern.clone(),
                    source,
                })?
                .compile_matcher();
            globs.push(glob);
        }

        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        for file in self.files.drain(..) {
            if globs.iter().any(|g| g.is_match(file.filename())) && seen.insert(file.filename()) {
                kept.push(file);
            }
        }
        self.files = kept;
        Ok(())
    }

    /// Keep files whose modification time is strictly before
    /// `today's UTC midnight + tolerance minutes`.
    pub fn filter_finished(&mut self, tolerance_minutes: i64) {
        let cutoff = Utc::now()
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive))
            .expect("midnight is always representable")
            + Duration::minutes(tolerance_minutes);
        self.files.retain(|f| matches!(f.modified(), Some(m) if m < cutoff));
    }

    /// Keep files within `[anchor, anchor + days - 1]` (days > 0),
    /// `[anchor - |days|, anchor - 1]` (days < 0), or none (days == 0).
    pub fn filter_date_range(
        &mut self,
        anchor: NaiveDate,
        days: i64,
        mode: &str,
    ) -> Result<(), CollectorError> {
        let mode = DateMode::parse(mode)?;
        if days == 0 {
            self.files.clear();
            return Ok(());
        }
        let (start, stop) = if days > 0 { (0, days) } else { (days, 0) };

        let mut kept = Vec::new();
        for offset in start..stop {
            let day = anchor + Duration::days(offset);
            for file in &self.files {
                let matches = match mode {
                    DateMode::FileName => {
                        file.year() == format!("{:04}", day.year())
                            && file.day() == format!("{:03}", day.ordinal())
                    }
                    DateMode::ModTime => {
                        let day_start = Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).unwrap());
                        let day_end = day_start + Duration::days(1);
                        matches!(file.modified(), Some(m) if m >= day_start && m < day_end)
                    }
                };
                if matches {
                    kept.push(file.clone());
                }
            }
        }
        self.files = kept;
        Ok(())
    }

    /// Convenience wrapper: `[today - days, yesterday]`, skipping today.
    pub fn filter_from_past_days(&mut self, days: i64, mode: &str) -> Result<(), CollectorError> {
        self.filter_date_range(Utc::now().date_naive(), -days, mode)
    }

    /// Keep files whose filename is in `filenames`.
    pub fn filter_from_list(&mut self, filenames: &[String]) {
        let wanted: HashSet<&str> = filenames.iter().map(String::as_str).collect();
        self.files.retain(|f| wanted.contains(f.filename().as_str()));
    }

    pub fn sort(&mut self, order: SortOrder) {
        match order {
            SortOrder::Ascending => self.files.sort_by_key(Descriptor::filename),
            SortOrder::Descending => {
                self.files.sort_by_key(Descriptor::filename);
                self.files.reverse();
            }
            SortOrder::None => {}
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

use chrono::Datelike;

fn walk(root: &Path, dir: &Path, out: &mut Vec<Descriptor>) -> Result<(), CollectorError> {
    let entries = fs::read_dir(dir).map_err(|source| CollectorError::ReadDir {
        path: dir.display().to_string(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| CollectorError::ReadDir {
            path: dir.display().to_string(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            walk(root, &path, out)?;
            continue;
        }
        let Some(basename) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        match Descriptor::new(basename, root) {
            Ok(descriptor) => out.push(descriptor),
            Err(err) => {
                tracing::debug!(file = basename, error = %err, "skipping unparseable SDS filename");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, filename: &str) {
        let descriptor = Descriptor::new(filename, root).unwrap();
        let path = descriptor.filepath();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn load_collects_only_parseable_names() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "NL.HGN.02.BHZ.D.1970.001");
        touch(dir.path(), "NL.HGN.02.BHZ.D.1970.002");
        fs::write(dir.path().join("not-an-sds-file.txt"), b"x").unwrap();

        let collector = Collector::load(dir.path()).unwrap();
        assert_eq!(collector.len(), 2);
    }

    #[test]
    fn filter_wildcards_rejects_non_seven_field_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let mut collector = Collector::load(dir.path()).unwrap();
        let err = collector
            .filter_wildcards(&["NL.HGN.BHZ".to_string()])
            .unwrap_err();
        assert!(matches!(err, CollectorError::InvalidPattern { .. }));
    }

    #[test]
    fn filter_wildcards_matches_and_dedups() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "NL.HGN.02.BHZ.D.1970.001");
        touch(dir.path(), "NL.G010.02.BHZ.D.1970.001");
        let mut collector = Collector::load(dir.path()).unwrap();
        collector
            .filter_wildcards(&[
                "NL.HGN.*.BHZ.D.????.???".to_string(),
                "NL.*.*.*.*.*.*".to_string(),
            ])
            .unwrap();
        assert_eq!(collector.len(), 2);
    }

    /// S3: 12 descriptors spanning `G010..G014`, `HGN` with `{L,B,H}HZ`,
    /// and `OPLO` across four days, with the documented match counts
    /// 5/3/4 for three distinct wildcard patterns.
    fn s3_fixture(dir: &Path) {
        for station in ["G010", "G011", "G012", "G013", "G014"] {
            touch(dir, &format!("NL.{station}..HGZ.D.2019.001"));
        }
        for channel in ["LHZ", "BHZ", "HHZ"] {
            touch(dir, &format!("NL.HGN.02.{channel}.D.2019.001"));
        }
        for day in ["001", "010", "100", "365"] {
            touch(dir, &format!("NL.OPLO.02.HHZ.D.2019.{day}"));
        }
    }

    #[test]
    fn filter_wildcards_s3_matches_documented_counts() {
        let dir = tempfile::tempdir().unwrap();
        s3_fixture(dir.path());
        assert_eq!(Collector::load(dir.path()).unwrap().len(), 12);

        let mut g0_stations = Collector::load(dir.path()).unwrap();
        g0_stations
            .filter_wildcards(&["NL.G0*..HGZ.D.2019.001".to_string()])
            .unwrap();
        assert_eq!(g0_stations.len(), 5);

        let mut hgn_channels = Collector::load(dir.path()).unwrap();
        hgn_channels
            .filter_wildcards(&["NL.HGN.02.?HZ.D.2019.001".to_string()])
            .unwrap();
        assert_eq!(hgn_channels.len(), 3);

        let mut oplo_days = Collector::load(dir.path()).unwrap();
        oplo_days
            .filter_wildcards(&["NL.OPLO.02.HHZ.D.2019.*".to_string()])
            .unwrap();
        assert_eq!(oplo_days.len(), 4);
    }

    #[test]
    fn filter_from_list_keeps_only_named_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "NL.HGN.02.BHZ.D.1970.001");
        touch(dir.path(), "NL.G010.02.BHZ.D.1970.001");
        let mut collector = Collector::load(dir.path()).unwrap();
        collector.filter_from_list(&["NL.HGN.02.BHZ.D.1970.001".to_string()]);
        assert_eq!(collector.len(), 1);
    }

    #[test]
    fn filter_date_range_zero_days_clears() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "NL.HGN.02.BHZ.D.1970.001");
        let mut collector = Collector::load(dir.path()).unwrap();
        collector
            .filter_date_range(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(), 0, "file_name")
            .unwrap();
        assert!(collector.is_empty());
    }

    #[test]
    fn filter_date_range_forward_window() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "NL.HGN.02.BHZ.D.1970.001");
        touch(dir.path(), "NL.HGN.02.BHZ.D.1970.002");
        touch(dir.path(), "NL.HGN.02.BHZ.D.1970.010");
        let mut collector = Collector::load(dir.path()).unwrap();
        collector
            .filter_date_range(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(), 2, "file_name")
            .unwrap();
        assert_eq!(collector.len(), 2);
    }

    #[test]
    fn filter_date_range_invalid_mode() {
        let dir = tempfile::tempdir().unwrap();
        let mut collector = Collector::load(dir.path()).unwrap();
        let err = collector
            .filter_date_range(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(), 1, "bogus")
            .unwrap_err();
        assert!(matches!(err, CollectorError::InvalidMode(_)));
    }

    #[test]
    fn sort_orders_by_filename() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "NL.HGN.02.BHZ.D.1970.002");
        touch(dir.path(), "NL.HGN.02.BHZ.D.1970.001");
        let mut collector = Collector::load(dir.path()).unwrap();
        collector.sort(SortOrder::Ascending);
        assert_eq!(collector.files()[0].day(), "001");
        collector.sort(SortOrder::Descending);
        assert_eq!(collector.files()[0].day(), "002");
    }
}
