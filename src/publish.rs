use std::path::Path;
use tracing::{error, info};

use crate::contract::{run_checked, CommandRunner, Invocation};
use crate::error::OrkoError;

/// Update log entries joined with `", "` and closed with a period.
pub fn commit_message(update_log: &[String]) -> String {
    format!("{}.", update_log.join(", "))
}

/// The publish sequence, in the order it must run.
pub fn publish_sequence(workspace: &Path, message: &str) -> Vec<Invocation> {
    vec![
        Invocation::git(&["add", "."], workspace),
        Invocation::git(&["commit", "-m", message], workspace),
        Invocation::git(&["push"], workspace),
        Invocation::npm(&["version", "minor"], workspace),
        Invocation::npm(&["publish"], workspace),
        // `npm version` made its own commit and tag
        Invocation::git(&["push"], workspace),
    ]
}

/// Commits, pushes, bumps the minor version, publishes and pushes again.
/// The first failure aborts; steps that already succeeded are not undone.
pub async fn publish<R>(workspace: &Path, update_log: &[String], runner: &R) -> Result<String, OrkoError>
where
    R: CommandRunner + ?Sized,
{
    let message = commit_message(update_log);
    info!(path = %workspace.display(), message = %message, "[PUBLISH] Starting publish sequence");
    for invocation in publish_sequence(workspace, &message) {
        if let Err(e) = run_checked(runner, &invocation).await {
            error!(command = %invocation.display(), error = %e, "[PUBLISH] Step failed, aborting");
            return Err(e);
        }
        info!(command = %invocation.display(), "[PUBLISH] Step succeeded");
    }
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_message_joins_log_entries() {
        let log = vec!["update package author".to_string(), "add save script".to_string()];
        assert_eq!(commit_message(&log), "update package author, add save script.");
        assert_eq!(commit_message(&["set license".to_string()]), "set license.");
    }
}
