//! CLI integration tests
use predicates::prelude::*;
use tempfile::TempDir;

struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        Self { dir: TempDir::new().unwrap() }
    }

    fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("shelfmark");
        cmd.env("XDG_CONFIG_HOME", self.dir.path().join("config"))
            .env_remove("SHELFMARK_DIR")
            .arg("--data-dir")
            .arg(self.dir.path().join("data"));
        cmd
    }

    fn add(&self, url: &str, extra: &[&str]) {
        self.cmd().args(["add", url, "--offline"]).args(extra).assert().success();
    }

    fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.cmd().args(args).arg("--json").output().unwrap();
        assert!(output.status.success());
        serde_json::from_slice(&output.stdout).unwrap()
    }
}

#[test]
fn test_cli_add_offline() {
    let env = Env::new();
    env.cmd()
        .args(["add", "https://ex.com/post?utm_source=feed", "--offline", "-t", "A   good  post", "-i", "News,rust"])
        .assert()
        .success()
        .stdout(predicate::str::contains("A good post"))
        .stdout(predicate::str::contains("https://ex.com/post"));

    let printed = env.json(&["print"]);
    assert_eq!(printed[0]["id"], 1);
    assert_eq!(printed[0]["url"], "https://ex.com/post");
    assert_eq!(printed[0]["tags"][0]["name"], "news");
    assert_eq!(printed[0]["tags"][1]["name"], "rust");
    assert!(env.dir.path().join("data").join("shelfmark.db").exists());
}

#[test]
fn test_cli_add_without_title_uses_url() {
    let env = Env::new();
    env.add("https://ex.com/untitled", &[]);
    assert_eq!(env.json(&["print", "1"])[0]["title"], "https://ex.com/untitled");
}

#[test]
fn test_cli_add_invalid_url() {
    Env::new()
        .cmd()
        .args(["add", "ftp://ex.com/file", "--offline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("URL is not valid"));
}

#[test]
fn test_cli_add_duplicate() {
    let env = Env::new();
    env.add("https://ex.com/a", &[]);
    env.cmd()
        .args(["add", "https://ex.com/a#section", "--offline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already saved as bookmark 1"));
}

#[test]
fn test_cli_search() {
    let env = Env::new();
    env.add("https://ex.com/rust-tips", &["-i", "rust"]);
    env.add("https://ex.com/go-tips", &["-i", "go"]);
    env.add("https://ex.com/rust-news", &[]);

    let found = env.json(&["search", "rust"]);
    assert_eq!(found.as_array().unwrap().len(), 2);

    let tagged = env.json(&["search", "tips", "-t", "rust"]);
    assert_eq!(tagged.as_array().unwrap().len(), 1);
    assert_eq!(tagged[0]["url"], "https://ex.com/rust-tips");

    let latest = env.json(&["search", "--latest"]);
    assert_eq!(latest[0]["id"], 3);

    env.cmd()
        .args(["search", "nothing-like-this"])
        .assert()
        .success()
        .stderr(predicate::str::contains("No matching bookmarks found"));
}

#[test]
fn test_cli_update_offline_tag_diff() {
    let env = Env::new();
    env.add("https://ex.com/a", &["-i", "news,tech"]);

    env.cmd()
        .args(["update", "1", "--offline", "-i", "-news,long-read", "-t", "Renamed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Renamed"));

    let printed = env.json(&["print", "1"]);
    let tags: Vec<&str> = printed[0]["tags"].as_array().unwrap().iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(tags, ["long-read", "tech"]);
    assert_eq!(printed[0]["title"], "Renamed");
}

#[test]
fn test_cli_delete_compacts_indices() {
    let env = Env::new();
    for n in 1..=5 {
        env.add(&format!("https://ex.com/{n}"), &[]);
    }

    env.cmd()
        .args(["delete", "2", "4"])
        .assert()
        .success()
        .stderr(predicate::str::contains("moved to index 2"));

    env.cmd()
        .args(["print", "--index-only"])
        .assert()
        .success()
        .stdout(predicate::str::diff("1 2 3\n"));
    assert_eq!(env.json(&["print", "2"])[0]["url"], "https://ex.com/5");
}

#[test]
fn test_cli_delete_all_needs_confirmation() {
    let env = Env::new();
    env.add("https://ex.com/a", &[]);

    env.cmd()
        .arg("delete")
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("No bookmarks deleted"));
    assert_eq!(env.json(&["print"]).as_array().unwrap().len(), 1);

    env.cmd().args(["delete", "-y"]).assert().success();
    assert!(env.json(&["print"]).as_array().unwrap().is_empty());
}

#[test]
fn test_cli_invalid_index() {
    Env::new()
        .cmd()
        .args(["print", "3-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Index is not valid"));
}

#[test]
fn test_cli_open_without_content() {
    let env = Env::new();
    env.add("https://ex.com/a", &[]);

    env.cmd()
        .args(["open", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("doesn't have any cached content"));
    env.cmd().args(["open", "1", "--archive"]).assert().failure();
    env.cmd().args(["open", "9"]).assert().failure();
}

#[test]
fn test_cli_tags() {
    let env = Env::new();
    env.add("https://ex.com/a", &["-i", "rust,web"]);
    env.add("https://ex.com/b", &["-i", "rust"]);

    env.cmd()
        .arg("tags")
        .assert()
        .success()
        .stdout(predicate::str::diff("rust (2)\nweb (1)\n"));
}

#[test]
fn test_cli_accounts() {
    let env = Env::new();
    env.cmd().args(["account", "add", "alice", "-p", "secret"]).assert().success();
    env.cmd().args(["account", "add", "bob", "-p", "hunter2"]).assert().success();
    env.cmd().args(["account", "add", "carol", "-p", ""]).assert().failure();

    env.cmd()
        .args(["account", "list", "li"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alice").and(predicate::str::contains("bob").not()));

    env.cmd()
        .args(["account", "remove", "alice", "bob"])
        .assert()
        .success()
        .stderr(predicate::str::contains("2 account(s) removed"));
}

#[test]
fn test_cli_completions() {
    Env::new()
        .cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("shelfmark"));
}

#[test]
fn test_cli_version() {
    assert_cmd::cargo::cargo_bin_cmd!("shelfmark")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("shelfmark"));
}
