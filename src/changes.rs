use std::path::Path;
use tracing::info;

use crate::contract::{run_checked, CommandRunner, Invocation};
use crate::error::OrkoError;

/// Number of entries in `git status -s` output.
pub fn count_status_lines(status: &str) -> usize {
    status.lines().filter(|l| !l.trim().is_empty()).count()
}

/// Asks git how many paths in the workspace are modified or untracked.
pub async fn count_changes<R>(workspace: &Path, runner: &R) -> Result<usize, OrkoError>
where
    R: CommandRunner + ?Sized,
{
    let output = run_checked(runner, &Invocation::git(&["status", "-s"], workspace)).await?;
    let count = count_status_lines(&output.stdout);
    info!(path = %workspace.display(), changed_paths = count, "[CHANGES] Workspace status read");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_short_status_entries() {
        assert_eq!(count_status_lines(""), 0);
        assert_eq!(count_status_lines("\n"), 0);
        assert_eq!(count_status_lines(" M package.json\n?? notes.txt\n M package-lock.json\n"), 3);
    }
}
