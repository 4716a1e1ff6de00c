//! Structured logging setup shared by all three CLI entry points.
//!
//! Built on `tracing` + `tracing-subscriber`, matching the `logging.level` /
//! `logging.filename` configuration keys (compact by default, a `RUST_LOG`
//! style filter when set, optional file output for the manager daemon).

use std::fs::OpenOptions;
use std::path::Path;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
///
/// `level` follows `tracing_subscriber::EnvFilter` syntax (e.g. `"info"`,
/// `"debug"`). When `filename` is `Some`, log lines are appended to that
/// file instead of stderr.
pub fn init(level: &str, filename: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match filename {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(file).with_ansi(false))
                .try_init()
                .map_err(|e| anyhow::anyhow!("failed to install logger: {e}"))?;
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| anyhow::anyhow!("failed to install logger: {e}"))?;
        }
    }

    Ok(())
}
