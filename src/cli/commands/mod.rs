//! Command implementations: `collect`, `run`, `delete`.

mod collect;
mod common;
mod delete;
mod run_cmd;

pub use collect::collect;
pub use delete::delete;
pub use run_cmd::run_rules;

use sds_utils::exit_codes::{ExitCode, ToExitCode};

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("config error: {0}")]
    Config(#[from] sds_config::ConfigError),
    #[error(transparent)]
    Collector(#[from] sds_collector::CollectorError),
    #[error(transparent)]
    Catalog(#[from] sds_catalog::CatalogError),
    #[error(transparent)]
    Descriptor(#[from] sds_descriptor::DescriptorError),
    #[error(transparent)]
    Ledger(#[from] sds_ledger::LedgerError),
    #[error("I/O error: {0}")]
    Io(std::io::Error),
}

impl ToExitCode for CommandError {
    fn to_exit_code(&self) -> ExitCode {
        match self {
            CommandError::Config(e) => e.to_exit_code(),
            CommandError::Collector(_) | CommandError::Descriptor(_) => ExitCode::INVALID_INPUT,
            CommandError::Catalog(_) => ExitCode::CONFIG_ERROR,
            CommandError::Ledger(_) | CommandError::Io(_) => ExitCode::INTERNAL,
        }
    }
}
