//! Configuration loading for `sds-rulemgr`: typed config structs, a
//! redacting newtype for catalog and grid-archive credentials, and
//! config-file discovery.

mod discovery;
mod model;
mod redacted;

pub use discovery::{ConfigError, discover};
pub use model::{CatalogConfig, Config, GridArchiveConfig, LoggingConfig, ObjectStoreConfig};
pub use redacted::Redacted;
