//! Typed representation of `.sds-rulemgr/config.toml`, grounded on the
//! original deployment's `configuration.sample.py` keys (`IRODS_ROOT`,
//! `FDSNWS_ADDRESS`, `MONGO.*`, `IRODS.*`, `LOGGING.*`,
//! `DEFAULT_RULE_TIMEOUT`, `DELETION_DB`), generalized to named,
//! multi-catalog collaborators.

use std::path::PathBuf;

use serde::Deserialize;

use crate::redacted::Redacted;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub grid_root: PathBuf,
    pub temp_root: PathBuf,
    pub quarantine_root: PathBuf,
    pub inventory_service_url: String,
    pub object_store: ObjectStoreConfig,
    pub catalogs: Vec<CatalogConfig>,
    pub grid_archive: GridArchiveConfig,
    pub logging: LoggingConfig,
    pub default_rule_timeout: u64,
    pub deletion_db_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/data/sds"),
            grid_root: PathBuf::from("/data/grid"),
            temp_root: PathBuf::from("/data/sds-tmp"),
            quarantine_root: PathBuf::from("/data/sds-quarantine"),
            inventory_service_url: "http://localhost:8080".to_string(),
            object_store: ObjectStoreConfig::default(),
            catalogs: Vec::new(),
            grid_archive: GridArchiveConfig::default(),
            logging: LoggingConfig::default(),
            default_rule_timeout: 300,
            deletion_db_path: PathBuf::from("/data/sds/deletion.sqlite3"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObjectStoreConfig {
    pub bucket_name: String,
    pub prefix: String,
    pub profile: Option<String>,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            bucket_name: String::new(),
            prefix: String::new(),
            profile: None,
        }
    }
}

/// One catalog database, generalizing the original's single hard-coded
/// Mongo connection (`MONGO.HOST`/`PORT`/`USER`/`PASS`/`DATABASE` plus the
/// two hard-coded collection names) into a named, repeatable entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Redacted,
    pub database: String,
    pub dc_metadata_collection: String,
    pub wf_metadata_collection: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GridArchiveConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Redacted,
    pub zone: String,
}

impl Default for GridArchiveConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 1247,
            user: String::new(),
            password: Redacted::default(),
            zone: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub filename: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            filename: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_fallbacks() {
        let config = Config::default();
        assert_eq!(config.default_rule_timeout, 300);
        assert!(config.catalogs.is_empty());
        assert_eq!(config.logging.level, "info");
    }
}
