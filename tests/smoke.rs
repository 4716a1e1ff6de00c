//! Smoke tests for the `sds-rulemgr` CLI: exercise the compiled binary
//! end to end against a throwaway archive tree, without any real
//! collaborator services.

use std::fs;
use std::process::Command;

use sds_descriptor::Descriptor;

fn sds_rulemgr() -> Command {
    Command::new(env!("CARGO_BIN_EXE_sds-rulemgr"))
}

fn make_archive(root: &std::path::Path, filenames: &[&str]) {
    for name in filenames {
        let descriptor = Descriptor::new(name, root).unwrap();
        let path = descriptor.filepath();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"waveform-bytes").unwrap();
    }
}

#[test]
fn collect_lists_matching_descriptors() {
    let dir = tempfile::tempdir().unwrap();
    make_archive(dir.path(), &["NL.HGN.02.BHZ.D.2024.050", "NL.HGN.02.BHZ.D.2024.051"]);

    let output = sds_rulemgr()
        .args([
            "collect",
            "--dir",
            dir.path().to_str().unwrap(),
            "--sort",
            "asc",
        ])
        .output()
        .expect("failed to run sds-rulemgr collect");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("NL.HGN.02.BHZ.D.2024.050"));
    assert!(stdout.contains("NL.HGN.02.BHZ.D.2024.051"));
}

#[test]
fn collect_on_empty_directory_succeeds_with_no_output() {
    let dir = tempfile::tempdir().unwrap();

    let output = sds_rulemgr()
        .args(["collect", "--dir", dir.path().to_str().unwrap()])
        .output()
        .expect("failed to run sds-rulemgr collect");

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).trim().is_empty());
}

#[test]
fn collect_rejects_nonexistent_directory() {
    let output = sds_rulemgr()
        .args(["collect", "--dir", "/no/such/sds-archive-root"])
        .output()
        .expect("failed to run sds-rulemgr collect");

    assert!(!output.status.success());
}
