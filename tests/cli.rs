use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use tempfile::TempDir;

/// Command with the store and cache redirected into `dir`.
fn orko(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("orko").expect("Binary exists");
    cmd.current_dir(dir.path())
        .env("ORKO_STORE_PATH", dir.path().join("config.json"))
        .env("ORKO_CACHE_DIR", dir.path().join(".cache"))
        .env("RUST_LOG", "warn");
    cmd
}

#[test]
fn help_lists_the_subcommands() {
    let dir = TempDir::new().unwrap();
    orko(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("refresh")
                .and(predicate::str::contains("update"))
                .and(predicate::str::contains("list")),
        );
}

#[test]
fn update_before_refresh_fails_with_a_hint() {
    let dir = TempDir::new().unwrap();
    orko(&dir)
        .args(["update", "-u", "nobody"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("orko refresh"));
    assert!(!dir.path().join(".cache").exists());
}

#[test]
fn list_prints_the_cached_names() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path().join("config.json"),
        r#"{
  "github": {
    "catpea": {
      "refreshed": "2021-06-01T12:00:00Z",
      "repositories": [
        { "name": "alpha", "ssh_url": "git@github.com:catpea/alpha.git" },
        { "name": "beta", "ssh_url": "git@github.com:catpea/beta.git" }
      ]
    }
  }
}
"#,
    )
    .unwrap();

    orko(&dir)
        .args(["list", "-u", "catpea"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("# The catpea repository listing was last refreshed")
                .and(predicate::str::contains("alpha\nbeta\n")),
        );
}

#[test]
fn corrupt_store_is_reported() {
    let dir = TempDir::new().unwrap();
    write(dir.path().join("config.json"), "{ not json").unwrap();

    orko(&dir)
        .args(["list", "-u", "catpea"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to parse"));
}

#[test]
fn progress_goes_to_stdout_and_failures_to_stderr() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path().join("config.json"),
        r#"{ "github": { "catpea": { "refreshed": "2021-06-01T12:00:00Z", "repositories": [] } } }"#,
    )
    .unwrap();

    orko(&dir)
        .env("RUST_LOG", "info")
        .args(["update", "-u", "catpea"])
        .assert()
        .code(1)
        .stdout(
            predicate::str::contains("The catpea repository listing was last refreshed")
                .and(predicate::str::contains("\u{1b}[").not()),
        )
        .stderr(
            predicate::str::contains("repository listing is empty")
                .and(predicate::str::contains("last refreshed").not()),
        );
}
