use std::process::Command;

#[test]
fn cli_compiles_without_warnings() {
    let status = Command::new(env!("CARGO"))
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .args(["check", "--quiet", "--bin", "settler-ai"])
        .status()
        .expect("failed to invoke cargo check for settler-ai CLI binary");

    assert!(status.success(), "cargo check --bin settler-ai should succeed");
}

#[test]
fn cli_prints_its_default_config() {
    let output = Command::new(env!("CARGO_BIN_EXE_settler-ai"))
        .args(["--print-config"])
        .output()
        .expect("failed to run settler-ai");

    assert!(output.status.success(), "settler-ai --print-config should succeed");
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("[player]"), "config lists the player section: {text}");
    assert!(text.contains("emergency_queue_cap = 2000"), "config lists defaults: {text}");
}
