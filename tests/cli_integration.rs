use std::path::Path;
use std::process::Command;

fn gatherer(config_home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_gatherer"));
    cmd.env("XDG_CONFIG_HOME", config_home)
        .env("LANG", "en_US.UTF-8")
        .env_remove("RUST_LOG")
        .env_remove("GATHERER_BASE_URL");
    cmd
}

#[test]
fn test_help_exits_zero() {
    let home = tempfile::tempdir().unwrap();
    let output = gatherer(home.path()).arg("--help").output().expect("failed to run");
    assert!(output.status.success(), "gatherer --help should exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Get your wallpaper"));
    assert!(stdout.contains("--pack"));
}

#[test]
fn test_version_exits_zero() {
    let home = tempfile::tempdir().unwrap();
    let output = gatherer(home.path()).arg("--version").output().expect("failed to run");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("gatherer"));
}

#[test]
fn test_invalid_filter_fails_before_any_request() {
    let home = tempfile::tempdir().unwrap();
    let output = gatherer(home.path())
        // 如果真的发出请求，这个地址会得到 "failed to fetch"
        .env("GATHERER_BASE_URL", "http://127.0.0.1:1/see-more")
        .args(["--filter-by", "random"])
        .output()
        .expect("failed to run");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid filter `random`"), "{stderr}");
    assert!(!stderr.contains("failed to fetch"), "{stderr}");
    assert!(!stderr.contains("panicked"));
}

#[test]
fn test_unreachable_listing_exits_non_zero() {
    let home = tempfile::tempdir().unwrap();
    let dest = tempfile::tempdir().unwrap();
    let output = gatherer(home.path())
        .env("GATHERER_BASE_URL", "http://127.0.0.1:1/see-more")
        .args(["--timeout", "5", "-p"])
        .arg(dest.path())
        .output()
        .expect("failed to run");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to fetch"), "{stderr}");
    assert_eq!(std::fs::read_dir(dest.path()).unwrap().count(), 0);
}

#[test]
fn test_config_set_persists() {
    let home = tempfile::tempdir().unwrap();
    let output = gatherer(home.path())
        .args(["config", "set", "size", "1920x1080"])
        .output()
        .expect("failed to run");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(home.path().join("gatherer").join("config.toml").exists());

    let output = gatherer(home.path())
        .args(["config", "dump"])
        .output()
        .expect("failed to run");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("size = \"1920x1080\""), "{stdout}");
}

#[test]
fn test_config_set_rejects_unknown_key() {
    let home = tempfile::tempdir().unwrap();
    let output = gatherer(home.path())
        .args(["config", "set", "colour", "blue"])
        .output()
        .expect("failed to run");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown config key"));
}

#[test]
fn test_completions_mention_binary() {
    let home = tempfile::tempdir().unwrap();
    let output = gatherer(home.path())
        .args(["completions", "bash"])
        .output()
        .expect("failed to run");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("gatherer"));
}
