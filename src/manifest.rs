//! Read-modify-write access to a workspace's `package.json`.
//!
//! Fields are kept in file order and untouched fields are written back
//! verbatim. The file's indentation, line ending and trailing newline are
//! detected on load and reproduced on save, so a rewrite without changes is byte-identical for
//! any manifest npm itself formatted.

use regex::Regex;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, error};

use crate::error::OrkoError;

pub const MANIFEST_FILE: &str = "package.json";

/// Files a dependency update or audit fix may rewrite.
pub const LOCK_FILES: [&str; 2] = ["package-lock.json", "npm-shrinkwrap.json"];

#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    fields: Map<String, Value>,
    indent: String,
    crlf: bool,
    trailing_newline: bool,
}

fn indent_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?m)^([ \t]+)\S").expect("static regex is valid"))
}

fn detect_indent(content: &str) -> String {
    indent_pattern()
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "  ".to_string())
}

impl Manifest {
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(MANIFEST_FILE)
    }

    pub fn exists_in(dir: &Path) -> bool {
        Self::path_in(dir).is_file()
    }

    pub fn load(dir: &Path) -> Result<Self, OrkoError> {
        let path = Self::path_in(dir);
        let content = fs::read_to_string(&path).map_err(|e| {
            error!(error = ?e, path = %path.display(), "Failed to read package manifest");
            OrkoError::Io(e)
        })?;
        Self::parse(path, &content)
    }

    fn parse(path: PathBuf, content: &str) -> Result<Self, OrkoError> {
        let value: Value = serde_json::from_str(content).map_err(|e| OrkoError::Manifest {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let Value::Object(fields) = value else {
            return Err(OrkoError::Manifest {
                path: path.display().to_string(),
                message: "top level is not an object".to_string(),
            });
        };
        Ok(Self {
            indent: detect_indent(content),
            crlf: content.contains("\r\n"),
            trailing_newline: content.ends_with('\n'),
            path,
            fields,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    pub fn author(&self) -> Option<&Value> {
        self.fields.get("author")
    }

    pub fn license(&self) -> Option<&str> {
        self.fields.get("license").and_then(Value::as_str)
    }

    /// Replaces `field` with the string `value`, returning whether it changed.
    fn set_string(&mut self, field: &str, value: &str) -> bool {
        if self.fields.get(field).and_then(Value::as_str) == Some(value) {
            return false;
        }
        self.fields
            .insert(field.to_string(), Value::String(value.to_string()));
        true
    }

    pub fn set_author(&mut self, author: &str) -> bool {
        self.set_string("author", author)
    }

    pub fn set_license(&mut self, license: &str) -> bool {
        self.set_string("license", license)
    }

    /// True when `package` appears in `dependencies` or `devDependencies`.
    pub fn depends_on(&self, package: &str) -> bool {
        ["dependencies", "devDependencies"].iter().any(|table| {
            self.fields
                .get(*table)
                .and_then(Value::as_object)
                .is_some_and(|deps| deps.contains_key(package))
        })
    }

    pub fn has_script(&self, name: &str) -> bool {
        self.fields
            .get("scripts")
            .and_then(Value::as_object)
            .is_some_and(|scripts| scripts.contains_key(name))
    }

    /// Adds a script when none of that name exists, creating the `scripts`
    /// table if needed. Returns whether the manifest changed.
    pub fn insert_script(&mut self, name: &str, command: &str) -> Result<bool, OrkoError> {
        if self.has_script(name) {
            return Ok(false);
        }
        let scripts = self
            .fields
            .entry("scripts")
            .or_insert_with(|| Value::Object(Map::new()));
        match scripts.as_object_mut() {
            Some(table) => {
                table.insert(name.to_string(), Value::String(command.to_string()));
                Ok(true)
            }
            None => Err(OrkoError::Manifest {
                path: self.path.display().to_string(),
                message: "\"scripts\" is not an object".to_string(),
            }),
        }
    }

    pub fn render(&self) -> Result<String, OrkoError> {
        let mut out = Vec::new();
        let formatter = PrettyFormatter::with_indent(self.indent.as_bytes());
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.fields
            .serialize(&mut serializer)
            .map_err(|e| OrkoError::Manifest {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;
        let mut rendered = String::from_utf8(out).map_err(|e| OrkoError::Manifest {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;
        if self.trailing_newline {
            rendered.push('\n');
        }
        // serialised strings escape their newlines, so every raw one is structural
        if self.crlf {
            rendered = rendered.replace('\n', "\r\n");
        }
        Ok(rendered)
    }

    pub fn save(&self) -> Result<(), OrkoError> {
        let rendered = self.render()?;
        fs::write(&self.path, rendered).map_err(|e| {
            error!(error = ?e, path = %self.path.display(), "Failed to write package manifest");
            OrkoError::Io(e)
        })?;
        debug!(path = %self.path.display(), "Package manifest written");
        Ok(())
    }
}

/// Contents of the manifest and lock files, used to tell whether an npm
/// subcommand rewrote any of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSnapshot(Vec<Option<Vec<u8>>>);

impl PackageSnapshot {
    pub fn take(dir: &Path) -> Self {
        let files = std::iter::once(MANIFEST_FILE).chain(LOCK_FILES);
        Self(files.map(|f| fs::read(dir.join(f)).ok()).collect())
    }
}
