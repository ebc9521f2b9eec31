//! Update pipeline: picks one repository from the cached listing and runs the
//! maintenance routine on it.
//!
//! Control flow:
//! refresh precondition → cooldown gate → selection → workspace sync →
//! classification (early exit) → maintenance chain → change detection
//! (early exit) → publish → record `github.<user>.updated`.
//!
//! # Error Handling
//! The first failure of any stage is returned as-is; nothing is retried or
//! rolled back. Only the audit-fix step tolerates failure (see
//! [`crate::maintenance`]).

use chrono::{DateTime, Utc};
use rand::Rng;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::changes::count_changes;
use crate::classify::{classify, Classification};
use crate::contract::CommandRunner;
use crate::cooldown::{self, format_timestamp, parse_timestamp, time_ago};
use crate::error::OrkoError;
use crate::maintenance::run_chain;
use crate::publish::publish;
use crate::repository::{select, RepositoryDescriptor};
use crate::state::PipelineState;
use crate::store::{refreshed_key, repositories_key, updated_key, ConfigStore};
use crate::workspace::{synchronize, SyncAction};

#[derive(Debug, Clone)]
pub struct UpdateOptions {
    pub username: String,
    /// Explicit repository name; a random one is picked when `None`.
    pub repository: Option<String>,
    pub cooldown: Duration,
    pub license: Option<String>,
    /// Prefix the registry publisher identity must start with.
    pub registry_user: String,
    pub cache_dir: PathBuf,
    /// Skip the cooldown gate.
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub repository: String,
    pub path: PathBuf,
    pub sync: SyncAction,
    pub update_log: Vec<String>,
    pub changed_paths: usize,
    pub commit_message: String,
}

/// Reads the cached repository listing of `username`. A missing listing is empty.
pub fn cached_repositories<S>(store: &S, username: &str) -> Result<Vec<RepositoryDescriptor>, OrkoError>
where
    S: ConfigStore + ?Sized,
{
    match store.get(&repositories_key(username)) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value).map_err(|e| {
            error!(error = ?e, username, "Cached repository listing is malformed");
            OrkoError::Store(format!("malformed repository listing for {username}: {e}"))
        }),
    }
}

/// Ensures a listing has been downloaded for `username` and returns when.
pub fn require_refreshed<S>(store: &S, username: &str) -> Result<DateTime<Utc>, OrkoError>
where
    S: ConfigStore + ?Sized,
{
    store
        .get(&refreshed_key(username))
        .as_ref()
        .and_then(parse_timestamp)
        .ok_or_else(|| OrkoError::NotRefreshed {
            username: username.to_string(),
        })
}

/// Runs the repository selector and records the choice in `state`.
pub fn select_into<G>(
    state: &mut PipelineState,
    repositories: &[RepositoryDescriptor],
    requested: Option<&str>,
    rng: &mut G,
) -> Result<(), OrkoError>
where
    G: Rng + ?Sized,
{
    let selected = select(repositories, requested, rng)?;
    state.set_selection(selected);
    Ok(())
}

pub async fn update<S, R, G>(
    store: &mut S,
    runner: &R,
    rng: &mut G,
    options: &UpdateOptions,
    now: DateTime<Utc>,
) -> Result<UpdateReport, OrkoError>
where
    S: ConfigStore + ?Sized,
    R: CommandRunner + ?Sized,
    G: Rng + ?Sized,
{
    let username = options.username.as_str();

    let refreshed = require_refreshed(store, username)?;
    info!(
        username,
        "[UPDATE] The {username} repository listing was last refreshed {}",
        time_ago(refreshed, now)
    );

    if options.force {
        warn!(username, "[UPDATE] Forced run, skipping update cooldown");
    } else {
        let last_update = store.get(&updated_key(username)).as_ref().and_then(parse_timestamp);
        cooldown::check("update", last_update, options.cooldown, now)?;
    }

    let repositories = cached_repositories(store, username)?;
    let mut state = PipelineState::new(&options.cache_dir);
    select_into(&mut state, &repositories, options.repository.as_deref(), rng)?;
    let name = state.repository_name().unwrap_or_default().to_string();

    let sync = synchronize(&mut state, runner).await?;

    let classification = classify(&mut state, runner, &options.registry_user).await?;
    if let Some(reason) = classification.rejection(&options.registry_user) {
        info!(repository = %name, reason = %reason, "[UPDATE] Skipping maintenance");
        return Err(OrkoError::Ineligible { reason });
    }
    debug_assert!(matches!(classification, Classification::Package { .. }));

    run_chain(&mut state, runner, options.license.as_deref()).await?;

    let path = state
        .repository_path()
        .map(PathBuf::from)
        .ok_or_else(|| OrkoError::Selection("workspace was not synchronised".to_string()))?;
    let changed_paths = count_changes(&path, runner).await?;

    match (state.update_log().is_empty(), changed_paths) {
        (true, 0) => {
            info!(repository = %name, "[UPDATE] Nothing to update");
            return Err(OrkoError::NothingToUpdate);
        }
        (true, n) => {
            warn!(
                repository = %name,
                changed_paths = n,
                "[UPDATE] Workspace has changes no maintenance step reported, not publishing"
            );
            return Err(OrkoError::NothingToUpdate);
        }
        (false, 0) => {
            warn!(
                repository = %name,
                update_log = ?state.update_log(),
                "[UPDATE] Maintenance reported changes but the workspace is clean, not publishing"
            );
            return Err(OrkoError::NothingToUpdate);
        }
        (false, _) => {}
    }

    let commit_message = publish(&path, state.update_log(), runner).await?;

    store.set(&updated_key(username), Value::String(format_timestamp(now)))?;
    info!(repository = %name, message = %commit_message, "[UPDATE] Repository updated and published");

    Ok(UpdateReport {
        repository: name,
        path,
        sync,
        update_log: state.update_log().to_vec(),
        changed_paths,
        commit_message,
    })
}
