//! Persistent key/value store addressed by dotted key paths
//! (`github.<user>.refreshed`, `github.<user>.repositories`, ...).
//!
//! The pipelines receive a `&mut impl ConfigStore`; production uses
//! [`JsonFileStore`], tests use [`MemoryStore`].

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::error::OrkoError;

pub trait ConfigStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value) -> Result<(), OrkoError>;

    /// Sets several keys as one write. Either every entry is stored or none is.
    fn set_all(&mut self, entries: Vec<(String, Value)>) -> Result<(), OrkoError> {
        for (key, value) in entries {
            self.set(&key, value)?;
        }
        Ok(())
    }
}

/// Key under which the repository listing of `username` is stored.
pub fn repositories_key(username: &str) -> String {
    format!("github.{username}.repositories")
}

/// Key holding the RFC 3339 time of the last successful refresh.
pub fn refreshed_key(username: &str) -> String {
    format!("github.{username}.refreshed")
}

/// Key holding the RFC 3339 time of the last completed update.
pub fn updated_key(username: &str) -> String {
    format!("github.{username}.updated")
}

fn lookup<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.')
        .try_fold(root, |node, segment| node.as_object()?.get(segment))
}

fn insert(root: &mut Value, key: &str, value: Value) -> Result<(), OrkoError> {
    let mut segments: Vec<&str> = key.split('.').collect();
    let last = segments
        .pop()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| OrkoError::Store(format!("invalid key {key:?}")))?;

    let mut node = root;
    for segment in segments {
        let map = node
            .as_object_mut()
            .ok_or_else(|| OrkoError::Store(format!("{key:?} passes through a non-object value")))?;
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
    }
    match node.as_object_mut() {
        Some(map) => {
            map.insert(last.to_string(), value);
            Ok(())
        }
        None => Err(OrkoError::Store(format!("{key:?} passes through a non-object value"))),
    }
}

/// In-memory store, used as a fake in tests.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    root: Value,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        lookup(&self.root, key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), OrkoError> {
        insert(&mut self.root, key, value)
    }
}

/// A JSON document on disk, loaded once and rewritten on every `set`.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    root: Value,
}

impl JsonFileStore {
    /// Opens the store at `path`. A missing file is an empty store; the file
    /// is only created on the first `set`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, OrkoError> {
        let path = path.as_ref().to_path_buf();
        let root = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                error!(error = ?e, path = %path.display(), "Failed to read configuration store");
                OrkoError::Store(format!("failed to read {}: {e}", path.display()))
            })?;
            if content.trim().is_empty() {
                Value::Object(Map::new())
            } else {
                serde_json::from_str(&content).map_err(|e| {
                    error!(error = ?e, path = %path.display(), "Configuration store is not valid JSON");
                    OrkoError::Store(format!("failed to parse {}: {e}", path.display()))
                })?
            }
        } else {
            info!(path = %path.display(), "No configuration store yet, starting empty");
            Value::Object(Map::new())
        };
        if !root.is_object() {
            return Err(OrkoError::Store(format!(
                "{} does not contain a JSON object",
                path.display()
            )));
        }
        Ok(Self { path, root })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, root: &Value) -> Result<(), OrkoError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(root)
            .map_err(|e| OrkoError::Store(format!("failed to serialise store: {e}")))?;
        fs::write(&self.path, content + "\n")?;
        debug!(path = %self.path.display(), "Configuration store written");
        Ok(())
    }
}

impl ConfigStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        lookup(&self.root, key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), OrkoError> {
        self.set_all(vec![(key.to_string(), value)])
    }

    fn set_all(&mut self, entries: Vec<(String, Value)>) -> Result<(), OrkoError> {
        let mut root = self.root.clone();
        for (key, value) in entries {
            insert(&mut root, &key, value)?;
        }
        self.persist(&root)?;
        self.root = root;
        Ok(())
    }
}
