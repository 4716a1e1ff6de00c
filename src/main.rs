//! `sds-rulemgr` CLI binary.
//!
//! All logic lives in the library; main.rs only invokes `cli::run()` and
//! maps its result to a process exit code.

fn main() {
    if let Err(code) = sds_rulemgr::cli::run() {
        std::process::exit(code.as_i32());
    }
}
