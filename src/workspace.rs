use std::fs;
use std::path::PathBuf;
use tracing::{error, info};

use crate::contract::{run_checked, CommandRunner, Invocation};
use crate::error::OrkoError;
use crate::state::PipelineState;

/// Which of the two synchronisation paths ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Cloned,
    Pulled,
}

/// Ensures `<cache>/<name>` holds an up-to-date working copy of the selected
/// repository: `git clone` when the directory is missing, `git pull` when it
/// exists. Exactly one of the two runs. A failed clone is left on disk.
pub async fn synchronize<R>(state: &mut PipelineState, runner: &R) -> Result<SyncAction, OrkoError>
where
    R: CommandRunner + ?Sized,
{
    let (name, url) = match (state.repository_name(), state.repository_url()) {
        (Some(name), Some(url)) => (name.to_string(), url.to_string()),
        _ => {
            return Err(OrkoError::Selection(
                "no repository selected before synchronisation".to_string(),
            ))
        }
    };

    let cache = state.cache_path().to_path_buf();
    fs::create_dir_all(&cache).map_err(|e| {
        error!(error = ?e, path = %cache.display(), "Failed to create cache directory");
        OrkoError::Io(e)
    })?;

    let path: PathBuf = cache.join(&name);
    let action = if path.exists() {
        info!(repository = %name, path = %path.display(), "[SYNC] Already cloned, running git pull");
        run_checked(runner, &Invocation::git(&["pull"], &path)).await?;
        SyncAction::Pulled
    } else {
        info!(repository = %name, remote_url = %url, "[SYNC] Never cloned, running git clone");
        run_checked(runner, &Invocation::git(&["clone", &url, &name], &cache)).await?;
        SyncAction::Cloned
    };

    info!(repository = %name, path = %path.display(), ?action, "[SYNC] Workspace ready");
    state.set_repository_path(path);
    Ok(action)
}
