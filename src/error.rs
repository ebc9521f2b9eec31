//! Error type shared by every pipeline stage.
//!
//! Every stage returns `Result<_, OrkoError>` and propagates with `?`. Nothing
//! below the binary terminates the process; `main` is the single place where an
//! error becomes an exit status (see [`OrkoError::exit_code`]).

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrkoError {
    /// No repository matched the request, or there was nothing to pick from.
    #[error("repository selection failed: {0}")]
    Selection(String),

    /// A subprocess or network call failed to start or reported failure.
    #[error("external command `{program} {}` failed ({status}): {stderr}", .args.join(" "))]
    ExternalCommand {
        program: String,
        args: Vec<String>,
        status: String,
        stderr: String,
    },

    #[error(
        "cooling down, please wait {} or lower the cooldown (currently {})",
        human_duration(.remaining),
        human_duration(.interval)
    )]
    CooldownActive { remaining: Duration, interval: Duration },

    #[error("user {username} is not in the database, did you forget to run \"orko refresh -u {username}\" to download the repositories?")]
    NotRefreshed { username: String },

    /// The selected repository is out of scope for automated maintenance.
    #[error("repository is not eligible for maintenance: {reason}")]
    Ineligible { reason: String },

    #[error("nothing to update")]
    NothingToUpdate,

    #[error("invalid package manifest {path}: {message}")]
    Manifest { path: String, message: String },

    #[error("configuration store error: {0}")]
    Store(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Renders a duration rounded to whole seconds, e.g. `12m 5s`.
pub fn human_duration(d: &Duration) -> String {
    humantime::format_duration(Duration::from_secs(d.as_secs())).to_string()
}

impl OrkoError {
    /// Process exit status for this error. Every failure, including the
    /// "nothing to do" short-circuits, is reported as a non-zero status.
    pub fn exit_code(&self) -> u8 {
        match self {
            OrkoError::Selection(_)
            | OrkoError::ExternalCommand { .. }
            | OrkoError::CooldownActive { .. }
            | OrkoError::NotRefreshed { .. }
            | OrkoError::Ineligible { .. }
            | OrkoError::NothingToUpdate
            | OrkoError::Manifest { .. }
            | OrkoError::Store(_)
            | OrkoError::Config(_)
            | OrkoError::Io(_)
            | OrkoError::Http(_) => 1,
        }
    }
}
