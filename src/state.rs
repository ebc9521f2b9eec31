//! The single mutable record threaded through one update run.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::repository::RepositoryDescriptor;

/// Per-run state of the update pipeline. Created fresh for every invocation
/// and never persisted. Fields only move from unset to set; the update log is
/// append-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineState {
    cache_path: PathBuf,
    repository_name: Option<String>,
    repository_url: Option<String>,
    repository_path: Option<PathBuf>,
    classified: bool,
    is_published: bool,
    is_disqualified: bool,
    package_author: Option<String>,
    update_log: Vec<String>,
}

impl PipelineState {
    pub fn new<P: Into<PathBuf>>(cache_path: P) -> Self {
        Self {
            cache_path: cache_path.into(),
            repository_name: None,
            repository_url: None,
            repository_path: None,
            classified: false,
            is_published: false,
            is_disqualified: false,
            package_author: None,
            update_log: Vec::new(),
        }
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    pub fn repository_name(&self) -> Option<&str> {
        self.repository_name.as_deref()
    }

    pub fn repository_url(&self) -> Option<&str> {
        self.repository_url.as_deref()
    }

    /// Set only once the workspace synchronizer has succeeded.
    pub fn repository_path(&self) -> Option<&Path> {
        self.repository_path.as_deref()
    }

    pub fn is_classified(&self) -> bool {
        self.classified
    }

    pub fn is_published(&self) -> bool {
        self.is_published
    }

    pub fn is_disqualified(&self) -> bool {
        self.is_disqualified
    }

    pub fn package_author(&self) -> Option<&str> {
        self.package_author.as_deref()
    }

    pub fn update_log(&self) -> &[String] {
        &self.update_log
    }

    /// Maintenance may only touch the workspace of a published, qualified package.
    pub fn is_eligible(&self) -> bool {
        self.classified && self.is_published && !self.is_disqualified
    }

    pub(crate) fn set_selection(&mut self, repository: &RepositoryDescriptor) {
        debug_assert!(self.repository_name.is_none(), "selection is set once");
        self.repository_name = Some(repository.name.clone());
        self.repository_url = Some(repository.remote_url.clone());
    }

    pub(crate) fn set_repository_path(&mut self, path: PathBuf) {
        debug_assert!(self.repository_path.is_none(), "workspace path is set once");
        self.repository_path = Some(path);
    }

    pub(crate) fn set_classification(
        &mut self,
        is_published: bool,
        is_disqualified: bool,
        package_author: Option<String>,
    ) {
        debug_assert!(!self.classified, "classification runs once");
        self.classified = true;
        self.is_published = is_published;
        self.is_disqualified = is_disqualified;
        self.package_author = package_author;
    }

    /// Appends an entry describing a change a maintenance step made.
    pub fn record(&mut self, entry: &str) {
        debug!(entry, "Recording update log entry");
        self.update_log.push(entry.to_string());
    }
}
