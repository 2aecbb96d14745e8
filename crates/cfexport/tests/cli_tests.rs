use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// cfexport without mock mode, isolated from the user's config and environment
fn cfexport(home: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("cfexport");
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("NO_COLOR", "1")
        .env_remove("CFEXPORT_MOCK_DIR")
        .env_remove("CFEXPORT_CONFIG")
        .env_remove("CFEXPORT_CONFLUENCE__URL")
        .env_remove("CFEXPORT_CONFLUENCE__TOKEN")
        .env_remove("CONFLUENCE_URL")
        .env_remove("CONFLUENCE_USERNAME")
        .env_remove("CONFLUENCE_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_command() {
    cargo_bin_cmd!("cfexport")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Export Confluence spaces"))
        .stdout(predicate::str::contains("page-tree"));
}

#[test]
fn test_version_command() {
    cargo_bin_cmd!("cfexport")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cfexport"));
}

#[test]
fn test_space_requires_a_key() {
    cargo_bin_cmd!("cfexport")
        .arg("space")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_missing_config() {
    let home = TempDir::new().unwrap();
    cfexport(home.path())
        .args(["space", "DOCS"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("URL not configured"));
}

#[test]
fn test_missing_token() {
    let home = TempDir::new().unwrap();
    cfexport(home.path())
        .args(["space", "DOCS", "--url", "http://127.0.0.1:9"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("token not configured"));
}

#[test]
fn test_invalid_template_fails_before_connecting() {
    let home = TempDir::new().unwrap();
    cfexport(home.path())
        .args(["space", "DOCS", "--page-path", "{space_key}/{nope}.md"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid export settings"))
        .stderr(predicate::str::contains("{nope}"));
}

#[test]
fn test_json_error_output() {
    let home = TempDir::new().unwrap();
    cfexport(home.path())
        .args(["page", "1", "-o", "json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("\"error\": true"));
}

#[test]
fn test_unreachable_server_is_recorded() {
    let home = TempDir::new().unwrap();
    let out = home.path().join("out");
    cfexport(home.path())
        .args([
            "space",
            "DOCS",
            "--url",
            "http://127.0.0.1:9",
            "--token",
            "secret",
            "--output-path",
        ])
        .arg(&out)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("space DOCS"));
}

#[test]
fn test_config_show_redacts_token() {
    let home = TempDir::new().unwrap();
    fs::write(
        home.path().join("cfexport.toml"),
        r#"
[confluence]
url = "https://example.atlassian.net/wiki"
username = "me@example.com"
token = "super-secret"

[export]
export_format = "html"
"#,
    )
    .unwrap();

    cfexport(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://example.atlassian.net/wiki"))
        .stdout(predicate::str::contains("export_format = \"html\""))
        .stdout(predicate::str::contains("super-secret").not());
}

#[test]
fn test_config_show_json_with_env_override() {
    let home = TempDir::new().unwrap();
    cfexport(home.path())
        .env("CONFLUENCE_URL", "https://legacy.example.com")
        .env("CFEXPORT_EXPORT__PAGE_BREADCRUMBS", "false")
        .args(["config", "show", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"url\": \"https://legacy.example.com\""))
        .stdout(predicate::str::contains("\"page_breadcrumbs\": false"));
}

#[test]
fn test_config_path_lists_local_file() {
    let home = TempDir::new().unwrap();
    fs::write(home.path().join("cfexport.toml"), "").unwrap();

    cfexport(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cfexport.toml (found)"));
}

#[test]
fn test_explicit_missing_config_file() {
    let home = TempDir::new().unwrap();
    cfexport(home.path())
        .args(["--config", "missing.toml", "config", "show"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn test_completions() {
    cargo_bin_cmd!("cfexport")
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cfexport"));
}
