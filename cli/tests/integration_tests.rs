use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("core")
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Runs the binary with config and cache isolated under `home`.
fn portscope(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_portscope"))
        .args(args)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_CACHE_HOME", home.join("cache"))
        .env("HOME", "/Users/dev")
        .output()
        .expect("failed to run portscope")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn parse_dev_machine(home: &Path, extra: &[&str]) -> Output {
    let listing = fixture("lsof-dev-machine.txt");
    let ps = fixture("ps-dev-machine.txt");
    let mut args = vec![
        "parse-file",
        "--input",
        listing.to_str().unwrap(),
        "--args",
        ps.to_str().unwrap(),
    ];
    args.extend_from_slice(extra);
    portscope(home, &args)
}

// ---------------------------------------------------------------------------
// parse-file / parse-stdin
// ---------------------------------------------------------------------------

#[test]
fn parse_file_prints_title() {
    let home = tempfile::tempdir().unwrap();
    let out = parse_dev_machine(home.path(), &["--view", "title", "--format", "table"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out).trim(), "3000 · 5173");
}

#[test]
fn parse_file_json_snapshot() {
    let home = tempfile::tempdir().unwrap();
    let out = parse_dev_machine(home.path(), &[]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let value: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    let processes = value["processes"].as_array().unwrap();
    assert_eq!(processes.len(), 6);
    assert_eq!(processes[0]["pid"], 412);
    assert_eq!(
        processes[0]["args"],
        "node /Users/dev/projects/web/node_modules/.bin/next dev"
    );
    assert!(processes[5].get("args").is_none());
}

#[test]
fn parse_file_sections_honor_hide_args_flag() {
    let home = tempfile::tempdir().unwrap();
    let out = parse_dev_machine(
        home.path(),
        &[
            "--view",
            "sections",
            "--hide-args",
            "node /Users/dev/projects/web/node_modules/.bin/next dev",
        ],
    );
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let value: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(value["hidden_tracked"][0]["pid"], 412);
    assert_eq!(value["shown_tracked"][0]["pid"], 418);
    assert_eq!(value["other_local"][0]["pid"], 733);
    assert_eq!(value["other_external"][0]["pid"], 901);
}

#[test]
fn parse_file_uses_config_file() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("prefs.yml");
    fs::write(&config, "tracked_command: ControlCe\n").unwrap();

    let out = parse_dev_machine(
        home.path(),
        &[
            "--config",
            config.to_str().unwrap(),
            "--view",
            "title",
            "--format",
            "json",
        ],
    );
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let value: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(value["title"], "7000 · 5000");
}

#[test]
fn parse_file_table_shortens_labels() {
    let home = tempfile::tempdir().unwrap();
    let out = parse_dev_machine(home.path(), &["--format", "table"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let text = stdout(&out);
    assert!(text.contains("Processes: 6"));
    assert!(text.contains("127.0.0.1:3000 → 127.0.0.1:52344"));
    assert!(text.contains("Slack.app"));
}

#[test]
fn parse_stdin_reads_listing() {
    let home = tempfile::tempdir().unwrap();
    let mut child = Command::new(env!("CARGO_BIN_EXE_portscope"))
        .args(["parse-stdin", "--view", "title", "--format", "table"])
        .env("XDG_CONFIG_HOME", home.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn portscope");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"p7\ncnode\nLdev\nf3\nPTCP\nn127.0.0.1:4000\nTST=LISTEN\n")
        .unwrap();
    let out = child.wait_with_output().unwrap();
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out).trim(), "4000");
}

#[test]
fn parse_file_reports_malformed_records_as_warnings() {
    let home = tempfile::tempdir().unwrap();
    let listing = fixture("lsof-malformed.txt");
    let out = portscope(
        home.path(),
        &["parse-file", "--input", listing.to_str().unwrap()],
    );
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let value: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(value["processes"].as_array().unwrap().len(), 2);
    assert_eq!(value["warnings"].as_array().unwrap().len(), 4);
}

#[test]
fn parse_file_missing_input_fails() {
    let home = tempfile::tempdir().unwrap();
    let out = portscope(
        home.path(),
        &["parse-file", "--input", "/nonexistent/listing.txt"],
    );
    assert!(!out.status.success());
    assert!(stderr(&out).starts_with("error: Failed to read"));
}

#[test]
fn invalid_config_fails() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("prefs.yml");
    fs::write(&config, "label_max_chars: 1\n").unwrap();

    let out = parse_dev_machine(home.path(), &["--config", config.to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("label_max_chars"));
}

// ---------------------------------------------------------------------------
// list / cache
// ---------------------------------------------------------------------------

#[test]
fn list_with_missing_lister_fails_and_keeps_cache_empty() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("prefs.yml");
    fs::write(&config, "lsof_path: /nonexistent/lsof\n").unwrap();

    let out = portscope(home.path(), &["list", "--config", config.to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("socket listing unavailable"));

    let show = portscope(home.path(), &["cache", "show"]);
    assert!(!show.status.success());
    assert!(stderr(&show).contains("no cached snapshot"));
}

#[test]
fn cache_clear_without_snapshot_succeeds() {
    let home = tempfile::tempdir().unwrap();
    let out = portscope(home.path(), &["cache", "clear"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
}

#[test]
fn cache_show_reads_snapshot_from_cache_dir() {
    let home = tempfile::tempdir().unwrap();
    let cache_dir = home.path().join("custom-cache");
    fs::create_dir_all(&cache_dir).unwrap();
    fs::write(
        cache_dir.join("snapshot.json"),
        r#"{"captured_at":"2026-01-01T00:00:00+00:00","processes":[{"pid":9,"cmd":"node","user":"dev","connections":[]}]}"#,
    )
    .unwrap();

    let out = portscope(
        home.path(),
        &["cache", "show", "--cache-dir", cache_dir.to_str().unwrap()],
    );
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let value: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(value["processes"][0]["pid"], 9);

    let clear = portscope(
        home.path(),
        &["cache", "clear", "--cache-dir", cache_dir.to_str().unwrap()],
    );
    assert!(clear.status.success());
    assert!(!cache_dir.join("snapshot.json").exists());
}

// ---------------------------------------------------------------------------
// kill
// ---------------------------------------------------------------------------

#[test]
fn kill_refuses_pid_zero() {
    let home = tempfile::tempdir().unwrap();
    let out = portscope(home.path(), &["kill", "0"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("failed to signal process 0"));
}
