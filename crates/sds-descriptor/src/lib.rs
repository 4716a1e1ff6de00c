//! The SDS file descriptor: an immutable value object describing one file
//! in a SeisComP Data Structure archive.
//!
//! A [`Descriptor`] is constructed from a canonical seven-field filename and
//! an archive root. Every path, neighbor, and time property is a pure
//! function of those two inputs; only `size`/`modified`/`created`/`checksum`
//! touch the filesystem, and they are cached for the lifetime of the
//! `Descriptor` instance (a clone starts with an empty cache).

mod quality;

use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use sha2::{Digest, Sha256};

pub use quality::Quality;

#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("invalid SDS filename '{filename}': expected 7 dot-separated fields, got {found}")]
    WrongFieldCount { filename: String, found: usize },

    #[error("invalid SDS filename '{filename}': field '{field}' is empty or contains '/' or '..'")]
    UnsafeField { filename: String, field: String },

    #[error("invalid SDS filename '{filename}': quality '{quality}' is not one of D, R, Q, M")]
    InvalidQuality { filename: String, quality: String },

    #[error("invalid SDS filename '{filename}': year '{year}' is not 4 digits")]
    InvalidYear { filename: String, year: String },

    #[error("invalid SDS filename '{filename}': day '{day}' is not a valid day-of-year (001-366)")]
    InvalidDay { filename: String, day: String },

    #[error("io error reading '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, Copy)]
struct StatInfo {
    size: u64,
    modified: DateTime<Utc>,
    created: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Cache {
    stat: Option<Option<StatInfo>>,
    checksum: Option<Option<String>>,
}

/// One file in an SDS archive, identified by network/station/location/
/// channel/quality/year/day and an archive root.
pub struct Descriptor {
    network: String,
    station: String,
    location: String,
    channel: String,
    quality: Quality,
    year: String,
    day: String,
    archive_root: PathBuf,
    cache: RefCell<Cache>,
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("filename", &self.filename())
            .field("archive_root", &self.archive_root)
            .finish()
    }
}

impl Clone for Descriptor {
    fn clone(&self) -> Self {
        Self {
            network: self.network.clone(),
            station: self.station.clone(),
            location: self.location.clone(),
            channel: self.channel.clone(),
            quality: self.quality,
            year: self.year.clone(),
            day: self.day.clone(),
            archive_root: self.archive_root.clone(),
            cache: RefCell::new(Cache::default()),
        }
    }
}

impl PartialEq for Descriptor {
    fn eq(&self, other: &Self) -> bool {
        self.network == other.network
            && self.station == other.station
            && self.location == other.location
            && self.channel == other.channel
            && self.quality == other.quality
            && self.year == other.year
            && self.day == other.day
            && self.archive_root == other.archive_root
    }
}

impl Eq for Descriptor {}

fn validate_field(filename: &str, field: &str, name: &str, allow_empty: bool) -> Result<(), DescriptorError> {
    if (!allow_empty && field.is_empty()) || field.contains('/') || field.contains("..") {
        return Err(DescriptorError::UnsafeField {
            filename: filename.to_string(),
            field: name.to_string(),
        });
    }
    Ok(())
}

impl Descriptor {
    /// Parse a canonical SDS filename
    /// (`<NET>.<STA>.<LOC>.<CHA>.<QUAL>.<YYYY>.<DDD>`) against `archive_root`.
    pub fn new(filename: &str, archive_root: impl Into<PathBuf>) -> Result<Self, DescriptorError> {
        let parts: Vec<&str> = filename.split('.').collect();
        if parts.len() != 7 {
            return Err(DescriptorError::WrongFieldCount {
                filename: filename.to_string(),
                found: parts.len(),
            });
        }
        let [network, station, location, channel, quality, year, day] = [
            parts[0], parts[1], parts[2], parts[3], parts[4], parts[5], parts[6],
        ];

        validate_field(filename, network, "network", false)?;
        validate_field(filename, station, "station", false)?;
        validate_field(filename, location, "location", true)?;
        validate_field(filename, channel, "channel", false)?;

        let quality = Quality::parse(quality).map_err(|_| DescriptorError::InvalidQuality {
            filename: filename.to_string(),
            quality: quality.to_string(),
        })?;

        if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
            return Err(DescriptorError::InvalidYear {
                filename: filename.to_string(),
                year: year.to_string(),
            });
        }

        if day.len() != 3 || !day.chars().all(|c| c.is_ascii_digit()) {
            return Err(DescriptorError::InvalidDay {
                filename: filename.to_string(),
                day: day.to_string(),
            });
        }
        let day_num: u32 = day.parse().unwrap_or(0);
        if !(1..=366).contains(&day_num) {
            return Err(DescriptorError::InvalidDay {
                filename: filename.to_string(),
                day: day.to_string(),
            });
        }

        Ok(Self {
            network: network.to_string(),
            station: station.to_string(),
            location: location.to_string(),
            channel: channel.to_string(),
            quality,
            year: year.to_string(),
            day: day.to_string(),
            archive_root: archive_root.into(),
            cache: RefCell::new(Cache::default()),
        })
    }

    pub fn network(&self) -> &str {
        &self.network
    }
    pub fn station(&self) -> &str {
        &self.station
    }
    pub fn location(&self) -> &str {
        &self.location
    }
    pub fn channel(&self) -> &str {
        &self.channel
    }
    pub fn quality(&self) -> Quality {
        self.quality
    }
    pub fn year(&self) -> &str {
        &self.year
    }
    pub fn day(&self) -> &str {
        &self.day
    }
    pub fn archive_root(&self) -> &Path {
        &self.archive_root
    }

    /// `<net>.<sta>.<loc>.<cha>` — identifies the stream independent of
    /// quality and time.
    pub fn stream_id(&self) -> String {
        format!("{}.{}.{}.{}", self.network, self.station, self.location, self.channel)
    }

    pub fn filename(&self) -> String {
        format!(
            "{}.{}.{}.{}.{}.{}.{}",
            self.network, self.station, self.location, self.channel, self.quality, self.year, self.day
        )
    }

    fn channel_directory(&self) -> String {
        format!("{}.{}", self.channel, self.quality)
    }

    pub fn sub_directory(&self) -> PathBuf {
        PathBuf::from(&self.year)
            .join(&self.network)
            .join(&self.station)
            .join(self.channel_directory())
    }

    fn sub_directory_key(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.year,
            self.network,
            self.station,
            self.channel_directory()
        )
    }

    pub fn filepath(&self) -> PathBuf {
        self.archive_root.join(self.sub_directory()).join(self.filename())
    }

    /// Object-store key under `prefix` (always `/`-joined, not OS-specific).
    pub fn object_key(&self, prefix: &str) -> String {
        format!("{}/{}/{}", prefix.trim_end_matches('/'), self.sub_directory_key(), self.filename())
    }

    /// Path under a federated grid-archive root.
    pub fn grid_path(&self, root: &Path) -> PathBuf {
        root.join(self.sub_directory()).join(self.filename())
    }

    /// Path of a sibling file of quality `quality` under `root`.
    pub fn quarantine_path(&self, quarantine_root: &Path, quality: Quality) -> PathBuf {
        self.with_quality(quality).grid_path(quarantine_root)
    }

    /// A descriptor with the same identity except `quality`.
    pub fn with_quality(&self, quality: Quality) -> Descriptor {
        Descriptor {
            network: self.network.clone(),
            station: self.station.clone(),
            location: self.location.clone(),
            channel: self.channel.clone(),
            quality,
            year: self.year.clone(),
            day: self.day.clone(),
            archive_root: self.archive_root.clone(),
            cache: RefCell::new(Cache::default()),
        }
    }

    fn date(&self) -> NaiveDate {
        let year: i32 = self.year.parse().expect("validated 4-digit year");
        let day: u32 = self.day.parse().expect("validated day-of-year");
        NaiveDate::from_yo_opt(year, day).expect("validated day-of-year in range")
    }

    pub fn start(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.date().and_hms_opt(0, 0, 0).expect("midnight is valid"))
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.start() + Duration::days(1)
    }

    pub fn sample_start(&self) -> String {
        format!("{},{},00,00,00.000000", self.year, self.day)
    }

    pub fn sample_end(&self) -> String {
        format!("{},{},23,59,59.999999", self.year, self.day)
    }

    pub fn is_pressure_channel(&self) -> bool {
        self.channel.ends_with("DF")
    }

    fn shifted(&self, direction: i64) -> Descriptor {
        let new_date = self.date() + Duration::days(direction);
        Descriptor {
            network: self.network.clone(),
            station: self.station.clone(),
            location: self.location.clone(),
            channel: self.channel.clone(),
            quality: self.quality,
            year: format!("{:04}", new_date.year()),
            day: format!("{:03}", new_date.ordinal()),
            archive_root: self.archive_root.clone(),
            cache: RefCell::new(Cache::default()),
        }
    }

    pub fn next(&self) -> Descriptor {
        self.shifted(1)
    }

    pub fn previous(&self) -> Descriptor {
        self.shifted(-1)
    }

    /// The subset of `{previous, self, next}` that exist on disk, in that order.
    pub fn neighbors(&self) -> Vec<Descriptor> {
        [self.previous(), self.clone(), self.next()]
            .into_iter()
            .filter(|d| d.exists())
            .collect()
    }

    fn stat(&self) -> Option<StatInfo> {
        if let Some(cached) = self.cache.borrow().stat {
            return cached;
        }
        let info = fs::metadata(self.filepath()).ok().map(|meta| StatInfo {
            size: meta.len(),
            modified: meta
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or(DateTime::<Utc>::from(UNIX_EPOCH)),
            created: meta.created().ok().map(DateTime::<Utc>::from),
        });
        self.cache.borrow_mut().stat = Some(info);
        info
    }

    pub fn exists(&self) -> bool {
        self.stat().is_some()
    }

    pub fn size(&self) -> Option<u64> {
        self.stat().map(|s| s.size)
    }

    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.stat().map(|s| s.modified)
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.stat().and_then(|s| s.created)
    }

    /// SHA-256 checksum of the file, as `sha2:<base64>`. `Ok(None)` if the
    /// file is absent; `Err` only if the file exists but cannot be read.
    pub fn checksum(&self) -> Result<Option<String>, DescriptorError> {
        if let Some(cached) = self.cache.borrow().checksum.clone() {
            return Ok(cached);
        }
        if !self.exists() {
            self.cache.borrow_mut().checksum = Some(None);
            return Ok(None);
        }

        let path = self.filepath();
        let mut file = fs::File::open(&path).map_err(|source| DescriptorError::Io {
            path: path.clone(),
            source,
        })?;
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 0x10000];
        loop {
            let n = io::Read::read(&mut file, &mut buf).map_err(|source| DescriptorError::Io {
                path: path.clone(),
                source,
            })?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        let value = format!("sha2:{}", BASE64.encode(hasher.finalize()));
        self.cache.borrow_mut().checksum = Some(Some(value.clone()));
        Ok(Some(value))
    }
}
