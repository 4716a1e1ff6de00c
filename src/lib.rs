//! `sds-rulemgr`: a rule-driven file-processing engine for an SDS
//! seismological waveform archive.
//!
//! The library is a thin wiring layer over the workspace crates
//! (`sds-descriptor`, `sds-collector`, `sds-rules`, `sds-catalog`,
//! `sds-engine`, `sds-ledger`, `sds-collab`, `sds-config`): the CLI
//! commands parse arguments, discover configuration, build a collector
//! or rule catalog, and hand off to the library crates for the actual
//! work.

pub mod cli;
