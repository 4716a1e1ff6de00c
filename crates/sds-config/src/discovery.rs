//! Config file discovery, grounded on
//! `xchecker-config::config::discovery::discover_config_file_from` /
//! `load_config_file`: walk up from a starting directory looking for
//! `.sds-rulemgr/config.toml`, stopping at a repository-root marker.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use sds_utils::exit_codes::{ExitCode, ToExitCode};

use crate::model::Config;

const MARKER_FILE: &str = ".sds-rulemgr/config.toml";
const REPO_ROOT_MARKERS: [&str; 3] = [".git", ".hg", ".svn"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config file '{path}': {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
}

impl ToExitCode for ConfigError {
    fn to_exit_code(&self) -> ExitCode {
        ExitCode::CONFIG_ERROR
    }
}

/// Resolve the effective configuration.
///
/// Precedence: `cli_override` (an explicit `--config` path) > a
/// `.sds-rulemgr/config.toml` found by walking up from the current
/// directory > `SDS_RULEMGR_HOME/config.toml` > built-in defaults.
pub fn discover(cli_override: Option<&Path>) -> Result<Config, ConfigError> {
    if let Some(path) = cli_override {
        return load_config_file(path);
    }

    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    if let Some(found) = discover_config_file_from(&cwd) {
        return load_config_file(&found);
    }

    if let Ok(home) = env::var("SDS_RULEMGR_HOME") {
        let path = PathBuf::from(home).join("config.toml");
        if path.is_file() {
            return load_config_file(&path);
        }
    }

    Ok(Config::default())
}

/// Walk up from `start`, returning the first `.sds-rulemgr/config.toml`
/// found, stopping once a repository-root marker is seen in the same
/// directory (the marker directory itself is still checked).
fn discover_config_file_from(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(MARKER_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if REPO_ROOT_MARKERS.iter().any(|marker| current.join(marker).exists()) {
            return None;
        }
        dir = current.parent();
    }
    None
}

/// Load and parse a config file. A missing file is not an error: the
/// caller falls through to defaults.
fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Config::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_file(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.default_rule_timeout, 300);
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "not valid toml [[[").unwrap();
        assert!(matches!(load_config_file(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn valid_config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "default_rule_timeout = 60\ndata_dir = \"/archive\"\n").unwrap();
        let config = load_config_file(&path).unwrap();
        assert_eq!(config.default_rule_timeout, 60);
        assert_eq!(config.data_dir, PathBuf::from("/archive"));
    }

    #[test]
    fn discover_walks_up_and_finds_marker_in_parent() {
        let root = tempfile::tempdir().unwrap();
        let marker_dir = root.path().join(".sds-rulemgr");
        fs::create_dir_all(&marker_dir).unwrap();
        fs::write(marker_dir.join("config.toml"), "default_rule_timeout = 42\n").unwrap();

        let nested = root.path().join("a/b/c");
        fs::create_dir_all(&nested).unwrap();

        let found = discover_config_file_from(&nested).unwrap();
        assert_eq!(found, marker_dir.join("config.toml"));
    }

    #[test]
    fn discover_stops_at_repo_root_marker() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join(".git")).unwrap();
        let nested = root.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();

        assert!(discover_config_file_from(&nested).is_none());
    }

    #[test]
    fn discover_finds_marker_colocated_with_repo_root() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join(".git")).unwrap();
        fs::create_dir_all(root.path().join(".sds-rulemgr")).unwrap();
        fs::write(root.path().join(".sds-rulemgr/config.toml"), "default_rule_timeout = 7\n").unwrap();

        let found = discover_config_file_from(root.path()).unwrap();
        assert_eq!(found, root.path().join(".sds-rulemgr/config.toml"));
    }
}
