#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orko::contract::{CommandOutput, CommandRunner, Invocation};
use orko::repository::RepositoryDescriptor;
use orko::store::{refreshed_key, repositories_key, ConfigStore, MemoryStore};
use orko::OrkoError;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const PUBLISHER: &str = "catpea <catpea@example.com>";

pub fn npm_manifest(author: &str) -> String {
    format!(
        "{{\n  \"name\": \"alpha\",\n  \"version\": \"1.0.0\",\n  \"description\": \"Test package\",\n  \"main\": \"index.js\",\n  \"scripts\": {{\n    \"test\": \"node test.js\"\n  }},\n  \"author\": \"{author}\",\n  \"license\": \"MIT\",\n  \"dependencies\": {{\n    \"lodash\": \"^4.17.21\"\n  }}\n}}\n"
    )
}

/// `npm_manifest` converted to CRLF line endings.
pub fn crlf_manifest(author: &str) -> String {
    npm_manifest(author).replace('\n', "\r\n")
}

pub fn electron_manifest() -> String {
    "{\n  \"name\": \"alpha\",\n  \"author\": \"catpea\",\n  \"devDependencies\": {\n    \"electron\": \"^13.0.0\"\n  }\n}\n".to_string()
}

/// Store with a fresh listing for `catpea`.
pub fn refreshed_store(names: &[&str], refreshed: DateTime<Utc>) -> MemoryStore {
    let mut store = MemoryStore::new();
    let repos: Vec<RepositoryDescriptor> = names
        .iter()
        .map(|n| RepositoryDescriptor::new(n, &format!("git@github.com:catpea/{n}.git")))
        .collect();
    store
        .set(&refreshed_key("catpea"), serde_json::Value::String(refreshed.to_rfc3339()))
        .unwrap();
    store
        .set(&repositories_key("catpea"), serde_json::to_value(repos).unwrap())
        .unwrap();
    store
}

/// Stand-in for git and npm. `git clone` materialises a workspace holding
/// `manifest`, `git status -s` diffs the workspace root against the last
/// clone/commit, and any invocation listed in `fail_on` exits with status 1.
pub struct FakeRunner {
    pub manifest: Option<String>,
    pub publisher: Option<String>,
    pub fail_on: Vec<String>,
    /// `npm update` rewrites `package-lock.json` when set.
    pub update_touches_lockfile: bool,
    /// Fixed `git status -s` output instead of the computed diff.
    pub status_output: Option<String>,
    calls: Mutex<Vec<Invocation>>,
    committed: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
}

impl FakeRunner {
    pub fn new(manifest: Option<String>, publisher: Option<&str>) -> Self {
        Self {
            manifest,
            publisher: publisher.map(str::to_string),
            fail_on: Vec::new(),
            update_touches_lockfile: false,
            status_output: None,
            calls: Mutex::new(Vec::new()),
            committed: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn failing_on(mut self, command: &str) -> Self {
        self.fail_on.push(command.to_string());
        self
    }

    pub fn with_status(mut self, output: &str) -> Self {
        self.status_output = Some(output.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(Invocation::display).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        let mut files = BTreeMap::new();
        if let Ok(entries) = fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_file() {
                    files.insert(path.clone(), fs::read(&path).unwrap());
                }
            }
        }
        files
    }

    fn status(&self, dir: &Path) -> String {
        let committed = self.committed.lock().unwrap();
        let current = Self::snapshot(dir);
        let mut lines = Vec::new();
        for (path, content) in &current {
            let name = path.file_name().unwrap().to_string_lossy();
            match committed.get(path) {
                None => lines.push(format!("?? {name}")),
                Some(old) if old != content => lines.push(format!(" M {name}")),
                Some(_) => {}
            }
        }
        for path in committed.keys() {
            if path.starts_with(dir) && !current.contains_key(path) {
                lines.push(format!(" D {}", path.file_name().unwrap().to_string_lossy()));
            }
        }
        lines.join("\n")
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, OrkoError> {
        self.calls.lock().unwrap().push(invocation.clone());
        if self.fail_on.contains(&invocation.display()) {
            return Ok(CommandOutput::failure(1, "simulated failure"));
        }

        let cwd = invocation.cwd.as_path();
        let args: Vec<&str> = invocation.args.iter().map(String::as_str).collect();
        let output = match (invocation.program.as_str(), args.as_slice()) {
            ("git", ["clone", _url, name]) => {
                let dir = cwd.join(name);
                fs::create_dir_all(&dir).unwrap();
                if let Some(manifest) = &self.manifest {
                    fs::write(dir.join("package.json"), manifest).unwrap();
                }
                fs::write(dir.join("index.js"), "module.exports = 1;\n").unwrap();
                self.committed.lock().unwrap().extend(Self::snapshot(&dir));
                CommandOutput::success("")
            }
            ("git", ["status", "-s"]) => match &self.status_output {
                Some(output) => CommandOutput::success(output),
                None => CommandOutput::success(&self.status(cwd)),
            },
            ("git", ["commit", "-m", _]) => {
                self.committed.lock().unwrap().extend(Self::snapshot(cwd));
                CommandOutput::success("")
            }
            ("npm", ["info", "--json", _]) => match &self.publisher {
                Some(user) => CommandOutput::success(
                    &serde_json::json!({ "name": "alpha", "_npmUser": user }).to_string(),
                ),
                None => CommandOutput::failure(1, "npm ERR! code E404"),
            },
            ("npm", ["update"]) => {
                if self.update_touches_lockfile {
                    fs::write(cwd.join("package-lock.json"), "{\n  \"lockfileVersion\": 2\n}\n").unwrap();
                }
                CommandOutput::success("")
            }
            _ => CommandOutput::success(""),
        };
        Ok(output)
    }
}
