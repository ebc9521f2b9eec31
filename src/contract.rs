//! # contract: seams between the pipelines and the outside world
//!
//! The update and refresh pipelines never spawn processes or open sockets
//! directly. They go through the two traits defined here:
//! - [`CommandRunner`] for the version-control and package-manager executables
//! - [`RepositoryListing`] for the remote repository listing
//!
//! ## Mocking & Testing
//! Both traits are annotated for `mockall`, so tests (in-crate or downstream
//! with the `test-export-mocks` feature) can script every external call.

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use std::path::{Path, PathBuf};

use crate::error::OrkoError;
use crate::repository::RepositoryDescriptor;

/// A single subprocess call: program, arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl Invocation {
    pub fn new(program: &str, args: &[&str], cwd: &Path) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            cwd: cwd.to_path_buf(),
        }
    }

    /// `git <args>` in `cwd`.
    pub fn git(args: &[&str], cwd: &Path) -> Self {
        Self::new("git", args, cwd)
    }

    /// `npm <args>` in `cwd`.
    pub fn npm(args: &[&str], cwd: &Path) -> Self {
        Self::new("npm", args, cwd)
    }

    /// True when this is `program` invoked with exactly `args`.
    pub fn is(&self, program: &str, args: &[&str]) -> bool {
        self.program == program && self.args.iter().map(String::as_str).eq(args.iter().copied())
    }

    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Captured outcome of a finished subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: &str) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: &str) -> Self {
        Self {
            status: Some(code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Some(0)
    }

    /// Turns a non-zero exit into [`OrkoError::ExternalCommand`].
    pub fn into_success(self, invocation: &Invocation) -> Result<CommandOutput, OrkoError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(OrkoError::ExternalCommand {
                program: invocation.program.clone(),
                args: invocation.args.clone(),
                status: match self.status {
                    Some(code) => format!("exit status {code}"),
                    None => "terminated by signal".to_string(),
                },
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Runs external executables. A process that cannot be spawned is an error;
/// a process that exits non-zero is returned as data so the caller decides
/// whether that is fatal.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, OrkoError>;
}

/// Runs `invocation` and fails with [`OrkoError::ExternalCommand`] on a non-zero exit.
pub async fn run_checked<R>(runner: &R, invocation: &Invocation) -> Result<CommandOutput, OrkoError>
where
    R: CommandRunner + ?Sized,
{
    runner.run(invocation).await?.into_success(invocation)
}

/// Source of a user's repository listing (e.g. the GitHub REST API).
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RepositoryListing: Send + Sync {
    /// Fetch every source repository owned by `username`, in listing order.
    async fn fetch_repositories(
        &self,
        username: &str,
    ) -> Result<Vec<RepositoryDescriptor>, OrkoError>;
}
